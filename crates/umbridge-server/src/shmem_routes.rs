//! Shared-memory fast-path endpoints: `/TestShMem` and the four `*ShMem`
//! operation routes. Each mirrors its HTTP sibling in `router.rs` but reads
//! parameter vectors from, and writes results into, segments the client
//! already created — never through the JSON body.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use umbridge_protocol::wire::{
    ApplyHessianShMemRequest, ApplyJacobianShMemRequest, EvaluateShMemRequest,
    GradientShMemRequest, ShMemHeader, ShMemOpResponse, TestShMemRequest, TestShMemResponse,
};
use umbridge_protocol::ProtocolError;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::router::{get_model, AppState};
use crate::shmem;
use crate::validation;

/// Probe segments created by the client as `/umbridge_test_shmem_{in,out}_<tid>`,
/// one double each. The server echoes what it read back into the output
/// segment so the client can confirm a working fast path before relying on
/// it for real calls.
pub async fn test_shmem(
    ApiJson(req): ApiJson<TestShMemRequest>,
) -> Result<Json<TestShMemResponse>, ApiError> {
    let input = shmem::open(&format!("/umbridge_test_shmem_in_{}", req.tid))?;
    let value = shmem::read_f64(&input, 1)?;
    let output = shmem::open(&format!("/umbridge_test_shmem_out_{}", req.tid))?;
    shmem::write_f64(&output, &value)?;
    Ok(Json(TestShMemResponse::default()))
}

fn read_inputs(header: &ShMemHeader) -> Result<Vec<Vec<f64>>, ApiError> {
    let sizes = header
        .sizes()
        .map_err(|e| ApiError(ProtocolError::invalid_input(e)))?;
    sizes
        .into_iter()
        .enumerate()
        .map(|(i, len)| -> Result<Vec<f64>, ProtocolError> {
            let name = shmem::input_segment_name(&header.shmem_name, &header.tid, i);
            let segment = shmem::open(&name)?;
            shmem::read_f64(&segment, len)
        })
        .collect::<Result<Vec<_>, ProtocolError>>()
        .map_err(ApiError)
}

fn write_output(header: &ShMemHeader, index: usize, data: &[f64]) -> Result<(), ApiError> {
    let name = shmem::output_segment_name(&header.shmem_name, &header.tid, index);
    let segment = shmem::open(&name)?;
    shmem::write_f64(&segment, data).map_err(ApiError)
}

pub async fn evaluate_shmem(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<EvaluateShMemRequest>,
) -> Result<Json<ShMemOpResponse>, ApiError> {
    let model = get_model(&state.registry, &req.name)?.clone();
    if !model.supports_evaluate_shmem() {
        return Err(ApiError(ProtocolError::unsupported_feature(
            "EvaluateShMem not supported by model!",
        )));
    }

    let input_sizes = model.input_sizes(&req.config);
    let output_sizes = model.output_sizes(&req.config);
    let input = read_inputs(&req.header)?;
    validation::validate_input(&input, &input_sizes)?;

    let config = req.config;
    let output = state
        .executor
        .submit(move || model.evaluate(input, config))
        .await?;
    validation::validate_bundle_output(&output, &output_sizes)?;

    for (i, vector) in output.iter().enumerate() {
        write_output(&req.header, i, vector)?;
    }
    Ok(Json(ShMemOpResponse::default()))
}

pub async fn gradient_shmem(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<GradientShMemRequest>,
) -> Result<Json<ShMemOpResponse>, ApiError> {
    let model = get_model(&state.registry, &req.name)?.clone();
    if !model.supports_gradient_shmem() {
        return Err(ApiError(ProtocolError::unsupported_feature(
            "GradientShMem not supported by model!",
        )));
    }

    let input_sizes = model.input_sizes(&req.config);
    let output_sizes = model.output_sizes(&req.config);
    let input = read_inputs(&req.header)?;
    validation::validate_input(&input, &input_sizes)?;
    validation::validate_index(req.out_wrt, output_sizes.len(), "outWrt")?;
    validation::validate_index(req.in_wrt, input_sizes.len(), "inWrt")?;
    validation::validate_vector_len(&req.sens, output_sizes[req.out_wrt], "sens")?;

    let (out_wrt, in_wrt) = (req.out_wrt, req.in_wrt);
    let (sens, config) = (req.sens, req.config);
    let output = state
        .executor
        .submit(move || model.gradient(out_wrt, in_wrt, input, sens, config))
        .await?;
    validation::validate_vector_output(&output, input_sizes[in_wrt])?;

    write_output(&req.header, 0, &output)?;
    Ok(Json(ShMemOpResponse::default()))
}

pub async fn apply_jacobian_shmem(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ApplyJacobianShMemRequest>,
) -> Result<Json<ShMemOpResponse>, ApiError> {
    let model = get_model(&state.registry, &req.name)?.clone();
    if !model.supports_apply_jacobian_shmem() {
        return Err(ApiError(ProtocolError::unsupported_feature(
            "ApplyJacobianShMem not supported by model!",
        )));
    }

    let input_sizes = model.input_sizes(&req.config);
    let output_sizes = model.output_sizes(&req.config);
    let input = read_inputs(&req.header)?;
    validation::validate_input(&input, &input_sizes)?;
    validation::validate_index(req.out_wrt, output_sizes.len(), "outWrt")?;
    validation::validate_index(req.in_wrt, input_sizes.len(), "inWrt")?;
    validation::validate_vector_len(&req.vec, input_sizes[req.in_wrt], "vec")?;

    let (out_wrt, in_wrt) = (req.out_wrt, req.in_wrt);
    let (vec, config) = (req.vec, req.config);
    let output = state
        .executor
        .submit(move || model.apply_jacobian(out_wrt, in_wrt, input, vec, config))
        .await?;
    validation::validate_vector_output(&output, output_sizes[out_wrt])?;

    write_output(&req.header, 0, &output)?;
    Ok(Json(ShMemOpResponse::default()))
}

pub async fn apply_hessian_shmem(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ApplyHessianShMemRequest>,
) -> Result<Json<ShMemOpResponse>, ApiError> {
    let model = get_model(&state.registry, &req.name)?.clone();
    if !model.supports_apply_hessian_shmem() {
        return Err(ApiError(ProtocolError::unsupported_feature(
            "ApplyHessianShMem not supported by model!",
        )));
    }

    let input_sizes = model.input_sizes(&req.config);
    let output_sizes = model.output_sizes(&req.config);
    let input = read_inputs(&req.header)?;
    validation::validate_input(&input, &input_sizes)?;
    validation::validate_index(req.out_wrt, output_sizes.len(), "outWrt")?;
    validation::validate_index(req.in_wrt1, input_sizes.len(), "inWrt1")?;
    validation::validate_index(req.in_wrt2, input_sizes.len(), "inWrt2")?;
    validation::validate_vector_len(&req.sens, output_sizes[req.out_wrt], "sens")?;
    validation::validate_vector_len(&req.vec, input_sizes[req.in_wrt2], "vec")?;

    let (out_wrt, in_wrt1, in_wrt2) = (req.out_wrt, req.in_wrt1, req.in_wrt2);
    let (sens, vec, config) = (req.sens, req.vec, req.config);
    let output = state
        .executor
        .submit(move || model.apply_hessian(out_wrt, in_wrt1, in_wrt2, input, sens, vec, config))
        .await?;
    // Same fix as the non-ShMem endpoint: length checked against
    // input_sizes[in_wrt1], not output_sizes[out_wrt].
    validation::validate_vector_output(&output, input_sizes[in_wrt1])?;

    write_output(&req.header, 0, &output)?;
    Ok(Json(ShMemOpResponse::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::registry::Registry;
    use shared_memory::ShmemConf;

    struct Forward;
    impl Model for Forward {
        fn name(&self) -> &str {
            "forward"
        }
        fn input_sizes(&self, _: &serde_json::Value) -> Vec<usize> {
            vec![1]
        }
        fn output_sizes(&self, _: &serde_json::Value) -> Vec<usize> {
            vec![1]
        }
        fn evaluate(
            &self,
            input: Vec<Vec<f64>>,
            _: serde_json::Value,
        ) -> Result<Vec<Vec<f64>>, ProtocolError> {
            Ok(vec![vec![2.0 * input[0][0]]])
        }
        fn supports_evaluate(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn evaluate_shmem_round_trips_through_segments() {
        let tid = format!("{}", std::process::id());
        let shmem_name = "/umbridge_router_test";
        let in_name = shmem::input_segment_name(shmem_name, &tid, 0);
        let out_name = shmem::output_segment_name(shmem_name, &tid, 0);

        let in_seg = ShmemConf::new().os_id(&in_name).size(8).create().unwrap();
        shmem::write_f64(&in_seg, &[4.0]).unwrap();
        let out_seg = ShmemConf::new().os_id(&out_name).size(8).create().unwrap();

        let state = Arc::new(AppState {
            registry: Registry::new().with_model(Arc::new(Forward)),
            executor: crate::executor::Executor::new(1),
        });
        let header = ShMemHeader::new(tid, shmem_name, &[1]);
        let req = EvaluateShMemRequest {
            name: "forward".to_string(),
            config: serde_json::json!({}),
            header,
        };

        let _ = evaluate_shmem(State(state), ApiJson(req)).await.unwrap();
        assert_eq!(shmem::read_f64(&out_seg, 1).unwrap(), vec![8.0]);
    }
}
