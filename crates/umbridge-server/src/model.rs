//! The model capability interface — the contract a hosted model satisfies.

use umbridge_protocol::ProtocolError;

/// A named, stateless map from a tuple of real vectors to another, plus
/// optional derivative operations.
///
/// Model methods are synchronous: they are the numerical core the
/// [`crate::executor::Executor`] runs on dedicated worker threads, never on
/// the async I/O thread. Capability predicates default to `false` — a model
/// only needs to implement the operations it supports and override the
/// matching predicate.
pub trait Model: Send + Sync {
    /// Short name, unique within a server.
    fn name(&self) -> &str;

    /// Per-vector input dimensions for the given (opaque) configuration.
    fn input_sizes(&self, config: &serde_json::Value) -> Vec<usize>;

    /// Per-vector output dimensions for the given (opaque) configuration.
    fn output_sizes(&self, config: &serde_json::Value) -> Vec<usize>;

    /// Evaluates the model. Only called when [`Self::supports_evaluate`] is
    /// true and the pipeline has already validated `input`'s shape.
    fn evaluate(
        &self,
        input: Vec<Vec<f64>>,
        config: serde_json::Value,
    ) -> Result<Vec<Vec<f64>>, ProtocolError> {
        let _ = (input, config);
        Err(ProtocolError::unsupported_feature(
            "Evaluate not supported by model!",
        ))
    }

    /// Vector-Jacobian product: `sens` has length `output_sizes[out_wrt]`,
    /// result has length `input_sizes[in_wrt]`.
    fn gradient(
        &self,
        out_wrt: usize,
        in_wrt: usize,
        input: Vec<Vec<f64>>,
        sens: Vec<f64>,
        config: serde_json::Value,
    ) -> Result<Vec<f64>, ProtocolError> {
        let _ = (out_wrt, in_wrt, input, sens, config);
        Err(ProtocolError::unsupported_feature(
            "Gradient not supported by model!",
        ))
    }

    /// Jacobian-vector product: `vec` has length `input_sizes[in_wrt]`,
    /// result has length `output_sizes[out_wrt]`.
    fn apply_jacobian(
        &self,
        out_wrt: usize,
        in_wrt: usize,
        input: Vec<Vec<f64>>,
        vec: Vec<f64>,
        config: serde_json::Value,
    ) -> Result<Vec<f64>, ProtocolError> {
        let _ = (out_wrt, in_wrt, input, vec, config);
        Err(ProtocolError::unsupported_feature(
            "ApplyJacobian not supported by model!",
        ))
    }

    /// Vector-Hessian product: `sens` has length `output_sizes[out_wrt]`,
    /// `vec` has length `input_sizes[in_wrt2]`, result has length
    /// `input_sizes[in_wrt1]`.
    #[allow(clippy::too_many_arguments)]
    fn apply_hessian(
        &self,
        out_wrt: usize,
        in_wrt1: usize,
        in_wrt2: usize,
        input: Vec<Vec<f64>>,
        sens: Vec<f64>,
        vec: Vec<f64>,
        config: serde_json::Value,
    ) -> Result<Vec<f64>, ProtocolError> {
        let _ = (out_wrt, in_wrt1, in_wrt2, input, sens, vec, config);
        Err(ProtocolError::unsupported_feature(
            "ApplyHessian not supported by model!",
        ))
    }

    fn supports_evaluate(&self) -> bool {
        false
    }
    fn supports_gradient(&self) -> bool {
        false
    }
    fn supports_apply_jacobian(&self) -> bool {
        false
    }
    fn supports_apply_hessian(&self) -> bool {
        false
    }

    /// Shared-memory variants default to tracking their HTTP counterpart —
    /// a model that supports `Evaluate` is assumed safe for the fast path
    /// unless it overrides this to opt out.
    fn supports_evaluate_shmem(&self) -> bool {
        self.supports_evaluate()
    }
    fn supports_gradient_shmem(&self) -> bool {
        self.supports_gradient()
    }
    fn supports_apply_jacobian_shmem(&self) -> bool {
        self.supports_apply_jacobian()
    }
    fn supports_apply_hessian_shmem(&self) -> bool {
        self.supports_apply_hessian()
    }
}
