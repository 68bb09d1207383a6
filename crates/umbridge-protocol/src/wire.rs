//! JSON shapes for every UM-Bridge 1.0 endpoint.
//!
//! Config remains an opaque [`serde_json::Value`] passed through verbatim —
//! see the Design Notes on why this crate never attempts to type it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_config() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

// ---------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------

/// `GET /Info` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfoResponse {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: f64,
    pub models: Vec<String>,
}

/// `POST /ModelInfo` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelInfoRequest {
    pub name: String,
}

/// The four required capabilities plus their shared-memory variants.
///
/// Unknown fields default to `false` on the client side, matching
/// `response["support"].get("X", False)` in the reference implementation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelSupport {
    #[serde(rename = "Evaluate", default)]
    pub evaluate: bool,
    #[serde(rename = "Gradient", default)]
    pub gradient: bool,
    #[serde(rename = "ApplyJacobian", default)]
    pub apply_jacobian: bool,
    #[serde(rename = "ApplyHessian", default)]
    pub apply_hessian: bool,
    #[serde(rename = "EvaluateShMem", default)]
    pub evaluate_shmem: bool,
    #[serde(rename = "GradientShMem", default)]
    pub gradient_shmem: bool,
    #[serde(rename = "ApplyJacobianShMem", default)]
    pub apply_jacobian_shmem: bool,
    #[serde(rename = "ApplyHessianShMem", default)]
    pub apply_hessian_shmem: bool,
}

/// `POST /ModelInfo` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelInfoResponse {
    pub support: ModelSupport,
}

// ---------------------------------------------------------------------
// Sizes
// ---------------------------------------------------------------------

/// `POST /InputSizes` and `POST /OutputSizes` request (identical shape).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SizesRequest {
    pub name: String,
    #[serde(default = "default_config")]
    pub config: serde_json::Value,
}

/// `POST /InputSizes` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputSizesResponse {
    #[serde(rename = "inputSizes")]
    pub input_sizes: Vec<usize>,
}

/// `POST /OutputSizes` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputSizesResponse {
    #[serde(rename = "outputSizes")]
    pub output_sizes: Vec<usize>,
}

// ---------------------------------------------------------------------
// Operations (HTTP/JSON path)
// ---------------------------------------------------------------------

/// `POST /Evaluate` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluateRequest {
    pub name: String,
    pub input: Vec<Vec<f64>>,
    #[serde(default = "default_config")]
    pub config: serde_json::Value,
}

/// `POST /Evaluate` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluateResponse {
    pub output: Vec<Vec<f64>>,
}

/// `POST /Gradient` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradientRequest {
    pub name: String,
    pub input: Vec<Vec<f64>>,
    #[serde(rename = "outWrt")]
    pub out_wrt: usize,
    #[serde(rename = "inWrt")]
    pub in_wrt: usize,
    pub sens: Vec<f64>,
    #[serde(default = "default_config")]
    pub config: serde_json::Value,
}

/// `POST /ApplyJacobian` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplyJacobianRequest {
    pub name: String,
    pub input: Vec<Vec<f64>>,
    #[serde(rename = "outWrt")]
    pub out_wrt: usize,
    #[serde(rename = "inWrt")]
    pub in_wrt: usize,
    pub vec: Vec<f64>,
    #[serde(default = "default_config")]
    pub config: serde_json::Value,
}

/// `POST /ApplyHessian` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplyHessianRequest {
    pub name: String,
    pub input: Vec<Vec<f64>>,
    #[serde(rename = "outWrt")]
    pub out_wrt: usize,
    #[serde(rename = "inWrt1")]
    pub in_wrt1: usize,
    #[serde(rename = "inWrt2")]
    pub in_wrt2: usize,
    pub sens: Vec<f64>,
    pub vec: Vec<f64>,
    #[serde(default = "default_config")]
    pub config: serde_json::Value,
}

/// Shared response shape for `/Gradient`, `/ApplyJacobian`, `/ApplyHessian`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorResponse {
    pub output: Vec<f64>,
}

// ---------------------------------------------------------------------
// Operations (shared-memory fast path)
// ---------------------------------------------------------------------

/// `POST /TestShMem` request — the fast-path negotiation probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestShMemRequest {
    pub name: String,
    pub tid: String,
}

/// `POST /TestShMem` response. Empty on success; the actual round-trip
/// value travels through the shared-memory segments, not this body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestShMemResponse {}

/// Common header shared by every `*ShMem` operation request: which named
/// segments to open and how large each one is.
///
/// The per-vector sizes travel as dynamically named top-level fields
/// (`shmem_size_0`, `shmem_size_1`, ...) rather than a single array, which
/// is why they are collected via `#[serde(flatten)]` instead of a typed
/// field. [`ShMemHeader::sizes`] recovers them in index order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShMemHeader {
    pub tid: String,
    pub shmem_name: String,
    pub shmem_num_inputs: usize,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ShMemHeader {
    #[must_use]
    pub fn new(tid: String, shmem_name: impl Into<String>, input_sizes: &[usize]) -> Self {
        let shmem_name = shmem_name.into();
        let mut extra = HashMap::new();
        for (i, size) in input_sizes.iter().enumerate() {
            extra.insert(format!("shmem_size_{i}"), serde_json::json!(size));
        }
        Self {
            tid,
            shmem_name,
            shmem_num_inputs: input_sizes.len(),
            extra,
        }
    }

    /// Recovers `shmem_size_0..shmem_num_inputs` in order.
    ///
    /// # Errors
    /// Returns an error message naming the missing or malformed slot.
    pub fn sizes(&self) -> Result<Vec<usize>, String> {
        (0..self.shmem_num_inputs)
            .map(|i| {
                let key = format!("shmem_size_{i}");
                self.extra
                    .get(&key)
                    .and_then(serde_json::Value::as_u64)
                    .map(|v| v as usize)
                    .ok_or_else(|| format!("missing or non-integer field `{key}`"))
            })
            .collect()
    }
}

/// `POST /EvaluateShMem` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluateShMemRequest {
    pub name: String,
    #[serde(default = "default_config")]
    pub config: serde_json::Value,
    #[serde(flatten)]
    pub header: ShMemHeader,
}

/// `POST /GradientShMem` request. `sens` stays JSON-encoded; only the
/// parameter vectors go through shared memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradientShMemRequest {
    pub name: String,
    #[serde(rename = "outWrt")]
    pub out_wrt: usize,
    #[serde(rename = "inWrt")]
    pub in_wrt: usize,
    pub sens: Vec<f64>,
    #[serde(default = "default_config")]
    pub config: serde_json::Value,
    #[serde(flatten)]
    pub header: ShMemHeader,
}

/// `POST /ApplyJacobianShMem` request. `vec` stays JSON-encoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplyJacobianShMemRequest {
    pub name: String,
    #[serde(rename = "outWrt")]
    pub out_wrt: usize,
    #[serde(rename = "inWrt")]
    pub in_wrt: usize,
    pub vec: Vec<f64>,
    #[serde(default = "default_config")]
    pub config: serde_json::Value,
    #[serde(flatten)]
    pub header: ShMemHeader,
}

/// `POST /ApplyHessianShMem` request. `sens` and `vec` stay JSON-encoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplyHessianShMemRequest {
    pub name: String,
    #[serde(rename = "outWrt")]
    pub out_wrt: usize,
    #[serde(rename = "inWrt1")]
    pub in_wrt1: usize,
    #[serde(rename = "inWrt2")]
    pub in_wrt2: usize,
    pub sens: Vec<f64>,
    pub vec: Vec<f64>,
    #[serde(default = "default_config")]
    pub config: serde_json::Value,
    #[serde(flatten)]
    pub header: ShMemHeader,
}

/// Empty success body shared by every `*ShMem` operation endpoint — the
/// result travels through the output segment(s), not this response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShMemOpResponse {}
