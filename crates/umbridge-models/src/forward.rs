//! `y = 2x`, the seed evaluate-only model.

use umbridge_protocol::ProtocolError;
use umbridge_server::Model;

/// Evaluate-only scalar model: one input, one output, `y = 2x`.
pub struct Forward;

impl Model for Forward {
    fn name(&self) -> &str {
        "forward"
    }

    fn input_sizes(&self, _config: &serde_json::Value) -> Vec<usize> {
        vec![1]
    }

    fn output_sizes(&self, _config: &serde_json::Value) -> Vec<usize> {
        vec![1]
    }

    fn evaluate(
        &self,
        input: Vec<Vec<f64>>,
        _config: serde_json::Value,
    ) -> Result<Vec<Vec<f64>>, ProtocolError> {
        Ok(vec![vec![2.0 * input[0][0]]])
    }

    fn supports_evaluate(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_its_input() {
        let model = Forward;
        let output = model
            .evaluate(vec![vec![21.0]], serde_json::json!({}))
            .unwrap();
        assert_eq!(output, vec![vec![42.0]]);
    }
}
