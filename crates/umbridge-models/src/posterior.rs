//! Log-density of `N(2,1)`, with its closed-form gradient.

use std::f64::consts::PI;

use umbridge_protocol::ProtocolError;
use umbridge_server::Model;

const MEAN: f64 = 2.0;

fn log_pdf(x: f64) -> f64 {
    -0.5 * (2.0 * PI).ln() - 0.5 * (x - MEAN).powi(2)
}

/// `Evaluate` + `Gradient` model: the log-density of a unit-variance normal
/// centered at 2, and its derivative with respect to the input.
pub struct Posterior;

impl Model for Posterior {
    fn name(&self) -> &str {
        "posterior"
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
        Ok(vec![vec![log_pdf(input[0][0])]])
    }

    fn gradient(
        &self,
        _out_wrt: usize,
        _in_wrt: usize,
        input: Vec<Vec<f64>>,
        sens: Vec<f64>,
        _config: serde_json::Value,
    ) -> Result<Vec<f64>, ProtocolError> {
        let derivative = -(input[0][0] - MEAN);
        Ok(vec![sens[0] * derivative])
    }

    fn supports_evaluate(&self) -> bool {
        true
    }

    fn supports_gradient(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peaks_at_the_mean() {
        let model = Posterior;
        let at_mean = model
            .evaluate(vec![vec![2.0]], serde_json::json!({}))
            .unwrap()[0][0];
        let off_mean = model
            .evaluate(vec![vec![3.0]], serde_json::json!({}))
            .unwrap()[0][0];
        assert!(at_mean > off_mean);
    }

    #[test]
    fn gradient_vanishes_at_the_mean() {
        let model = Posterior;
        let grad = model
            .gradient(0, 0, vec![vec![2.0]], vec![1.0], serde_json::json!({}))
            .unwrap();
        assert!((grad[0]).abs() < 1e-12);
    }

    #[test]
    fn gradient_points_toward_the_mean() {
        let model = Posterior;
        let grad = model
            .gradient(0, 0, vec![vec![3.0]], vec![1.0], serde_json::json!({}))
            .unwrap();
        assert!(grad[0] < 0.0);
    }
}
