//! The server's model registry — read-only after construction.

use crate::model::Model;
use std::sync::Arc;

/// The set of models a server hosts, looked up by name.
///
/// Registration happens once at server construction; the registry never
/// mutates afterwards, so lookups need no locking.
#[derive(Clone, Default)]
pub struct Registry {
    models: Vec<Arc<dyn Model>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_model(mut self, model: Arc<dyn Model>) -> Self {
        self.models.push(model);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Model>> {
        self.models.iter().find(|m| m.name() == name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.models.iter().map(|m| m.name().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbridge_protocol::ProtocolError;

    struct Stub;
    impl Model for Stub {
        fn name(&self) -> &str {
            "stub"
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
            Ok(input)
        }
        fn supports_evaluate(&self) -> bool {
            true
        }
    }

    #[test]
    fn looks_up_registered_model_by_name() {
        let registry = Registry::new().with_model(Arc::new(Stub));
        assert!(registry.get("stub").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names(), vec!["stub".to_string()]);
    }
}
