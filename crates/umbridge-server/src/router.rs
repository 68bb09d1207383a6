//! The HTTP request pipeline: route dispatch, parse, validate, submit to
//! the executor, validate the response, serialize.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use umbridge_protocol::wire::*;
use umbridge_protocol::{ProtocolError, PROTOCOL_VERSION};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::executor::Executor;
use crate::extract::ApiJson;
use crate::model::Model;
use crate::registry::Registry;
use crate::validation;

pub struct AppState {
    pub registry: Registry,
    pub executor: Executor,
}

/// Builds the axum router for a registry of hosted models, without binding
/// a listener. Useful for tests that drive the app in-process.
pub fn app(registry: Registry, config: &ServerConfig) -> Router {
    let state = Arc::new(AppState {
        registry,
        executor: Executor::new(config.pool_size),
    });

    let router = Router::new()
        .route("/Info", get(info))
        .route("/ModelInfo", post(model_info))
        .route("/InputSizes", post(input_sizes))
        .route("/OutputSizes", post(output_sizes))
        .route("/Evaluate", post(evaluate))
        .route("/Gradient", post(gradient))
        .route("/ApplyJacobian", post(apply_jacobian))
        .route("/ApplyHessian", post(apply_hessian));

    #[cfg(feature = "shmem")]
    let router = router
        .route("/TestShMem", post(crate::shmem_routes::test_shmem))
        .route("/EvaluateShMem", post(crate::shmem_routes::evaluate_shmem))
        .route("/GradientShMem", post(crate::shmem_routes::gradient_shmem))
        .route(
            "/ApplyJacobianShMem",
            post(crate::shmem_routes::apply_jacobian_shmem),
        )
        .route(
            "/ApplyHessianShMem",
            post(crate::shmem_routes::apply_hessian_shmem),
        );

    let body_limit = match config.max_body_size {
        // Parameter vectors may be large; the transport layer must not
        // reject a body the protocol itself places no limit on.
        Some(bytes) => DefaultBodyLimit::max(bytes),
        None => DefaultBodyLimit::disable(),
    };

    router.layer(body_limit).with_state(state)
}

/// Binds a listener at `config`'s address and serves `registry` until the
/// process is killed.
///
/// # Errors
/// Propagates the listener bind failure.
pub async fn serve(registry: Registry, config: ServerConfig) -> std::io::Result<()> {
    let addr = config.socket_addr();
    let router = app(registry, &config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, pool_size = config.pool_size, "umbridge server listening");
    axum::serve(listener, router).await
}

pub(crate) fn get_model<'a>(
    registry: &'a Registry,
    name: &str,
) -> Result<&'a Arc<dyn Model>, ApiError> {
    registry.get(name).map_or_else(
        || {
            Err(ApiError(ProtocolError::model_not_found(format!(
                "Model {name} not found! The following are available: {:?}.",
                registry.names()
            ))))
        },
        Ok,
    )
}

fn model_support(model: &dyn Model) -> ModelSupport {
    ModelSupport {
        evaluate: model.supports_evaluate(),
        gradient: model.supports_gradient(),
        apply_jacobian: model.supports_apply_jacobian(),
        apply_hessian: model.supports_apply_hessian(),
        evaluate_shmem: model.supports_evaluate_shmem(),
        gradient_shmem: model.supports_gradient_shmem(),
        apply_jacobian_shmem: model.supports_apply_jacobian_shmem(),
        apply_hessian_shmem: model.supports_apply_hessian_shmem(),
    }
}

async fn info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    Json(InfoResponse {
        protocol_version: PROTOCOL_VERSION,
        models: state.registry.names(),
    })
}

async fn model_info(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ModelInfoRequest>,
) -> Result<Json<ModelInfoResponse>, ApiError> {
    let model = get_model(&state.registry, &req.name)?;
    Ok(Json(ModelInfoResponse {
        support: model_support(model.as_ref()),
    }))
}

async fn input_sizes(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SizesRequest>,
) -> Result<Json<InputSizesResponse>, ApiError> {
    let model = get_model(&state.registry, &req.name)?;
    Ok(Json(InputSizesResponse {
        input_sizes: model.input_sizes(&req.config),
    }))
}

async fn output_sizes(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SizesRequest>,
) -> Result<Json<OutputSizesResponse>, ApiError> {
    let model = get_model(&state.registry, &req.name)?;
    Ok(Json(OutputSizesResponse {
        output_sizes: model.output_sizes(&req.config),
    }))
}

async fn evaluate(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    tracing::info!(endpoint = "Evaluate", model = %req.name, "request received");
    let model = get_model(&state.registry, &req.name)?.clone();
    if !model.supports_evaluate() {
        return Err(ApiError(ProtocolError::unsupported_feature(
            "Evaluate not supported by model!",
        )));
    }

    let input_sizes = model.input_sizes(&req.config);
    let output_sizes = model.output_sizes(&req.config);
    validation::validate_input(&req.input, &input_sizes)?;

    let input = req.input;
    let config = req.config;
    tracing::debug!(endpoint = "Evaluate", "dispatching to executor");
    let output = state
        .executor
        .submit(move || model.evaluate(input, config))
        .await?;

    validation::validate_bundle_output(&output, &output_sizes)?;
    tracing::info!(endpoint = "Evaluate", "response sent");
    Ok(Json(EvaluateResponse { output }))
}

async fn gradient(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<GradientRequest>,
) -> Result<Json<VectorResponse>, ApiError> {
    tracing::info!(endpoint = "Gradient", model = %req.name, "request received");
    let model = get_model(&state.registry, &req.name)?.clone();
    if !model.supports_gradient() {
        return Err(ApiError(ProtocolError::unsupported_feature(
            "Gradient not supported by model!",
        )));
    }

    let input_sizes = model.input_sizes(&req.config);
    let output_sizes = model.output_sizes(&req.config);
    validation::validate_input(&req.input, &input_sizes)?;
    validation::validate_index(req.out_wrt, output_sizes.len(), "outWrt")?;
    validation::validate_index(req.in_wrt, input_sizes.len(), "inWrt")?;
    validation::validate_vector_len(&req.sens, output_sizes[req.out_wrt], "sens")?;

    let (out_wrt, in_wrt) = (req.out_wrt, req.in_wrt);
    let (input, sens, config) = (req.input, req.sens, req.config);
    tracing::debug!(endpoint = "Gradient", "dispatching to executor");
    let output = state
        .executor
        .submit(move || model.gradient(out_wrt, in_wrt, input, sens, config))
        .await?;

    validation::validate_vector_output(&output, input_sizes[in_wrt])?;
    tracing::info!(endpoint = "Gradient", "response sent");
    Ok(Json(VectorResponse { output }))
}

async fn apply_jacobian(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ApplyJacobianRequest>,
) -> Result<Json<VectorResponse>, ApiError> {
    tracing::info!(endpoint = "ApplyJacobian", model = %req.name, "request received");
    let model = get_model(&state.registry, &req.name)?.clone();
    if !model.supports_apply_jacobian() {
        return Err(ApiError(ProtocolError::unsupported_feature(
            "ApplyJacobian not supported by model!",
        )));
    }

    let input_sizes = model.input_sizes(&req.config);
    let output_sizes = model.output_sizes(&req.config);
    validation::validate_input(&req.input, &input_sizes)?;
    validation::validate_index(req.out_wrt, output_sizes.len(), "outWrt")?;
    validation::validate_index(req.in_wrt, input_sizes.len(), "inWrt")?;
    validation::validate_vector_len(&req.vec, input_sizes[req.in_wrt], "vec")?;

    let (out_wrt, in_wrt) = (req.out_wrt, req.in_wrt);
    let (input, vec, config) = (req.input, req.vec, req.config);
    tracing::debug!(endpoint = "ApplyJacobian", "dispatching to executor");
    let output = state
        .executor
        .submit(move || model.apply_jacobian(out_wrt, in_wrt, input, vec, config))
        .await?;

    validation::validate_vector_output(&output, output_sizes[out_wrt])?;
    tracing::info!(endpoint = "ApplyJacobian", "response sent");
    Ok(Json(VectorResponse { output }))
}

async fn apply_hessian(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ApplyHessianRequest>,
) -> Result<Json<VectorResponse>, ApiError> {
    tracing::info!(endpoint = "ApplyHessian", model = %req.name, "request received");
    let model = get_model(&state.registry, &req.name)?.clone();
    if !model.supports_apply_hessian() {
        return Err(ApiError(ProtocolError::unsupported_feature(
            "ApplyHessian not supported by model!",
        )));
    }

    let input_sizes = model.input_sizes(&req.config);
    let output_sizes = model.output_sizes(&req.config);
    validation::validate_input(&req.input, &input_sizes)?;
    validation::validate_index(req.out_wrt, output_sizes.len(), "outWrt")?;
    validation::validate_index(req.in_wrt1, input_sizes.len(), "inWrt1")?;
    validation::validate_index(req.in_wrt2, input_sizes.len(), "inWrt2")?;
    validation::validate_vector_len(&req.sens, output_sizes[req.out_wrt], "sens")?;
    validation::validate_vector_len(&req.vec, input_sizes[req.in_wrt2], "vec")?;

    let (out_wrt, in_wrt1, in_wrt2) = (req.out_wrt, req.in_wrt1, req.in_wrt2);
    let (input, sens, vec, config) = (req.input, req.sens, req.vec, req.config);
    tracing::debug!(endpoint = "ApplyHessian", "dispatching to executor");
    let output = state
        .executor
        .submit(move || model.apply_hessian(out_wrt, in_wrt1, in_wrt2, input, sens, vec, config))
        .await?;

    // The vector-Hessian product is a covector on the input side: its
    // length is always input_sizes[in_wrt1], never output_sizes[out_wrt].
    // The reference implementation checks the two inconsistently across
    // its ShMem and non-ShMem endpoints; this is the mathematically
    // correct one, applied uniformly.
    validation::validate_vector_output(&output, input_sizes[in_wrt1])?;
    tracing::info!(endpoint = "ApplyHessian", "response sent");
    Ok(Json(VectorResponse { output }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc as StdArc;
    use tower::ServiceExt;

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

    fn test_app() -> Router {
        app(
            Registry::new().with_model(StdArc::new(Forward)),
            &crate::config::ServerConfig::builder().pool_size(1).build(),
        )
    }

    async fn post_json(app: Router, path: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(path)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn evaluate_doubles_input() {
        let (status, json) = post_json(
            test_app(),
            "/Evaluate",
            serde_json::json!({"name": "forward", "input": [[3.0]], "config": {}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["output"], serde_json::json!([[6.0]]));
    }

    #[tokio::test]
    async fn gradient_on_evaluate_only_model_is_unsupported() {
        let (status, json) = post_json(
            test_app(),
            "/Gradient",
            serde_json::json!({"name": "forward", "input": [[3.0]], "outWrt": 0, "inWrt": 0, "sens": [1.0], "config": {}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["type"], "UnsupportedFeature");
    }

    #[tokio::test]
    async fn unknown_model_lists_available_names() {
        let (status, json) = post_json(
            test_app(),
            "/Evaluate",
            serde_json::json!({"name": "nope", "input": [[0.0]], "config": {}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["type"], "ModelNotFound");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("forward"));
    }

    #[tokio::test]
    async fn wrong_input_length_is_rejected_before_reaching_model() {
        let (status, json) = post_json(
            test_app(),
            "/Evaluate",
            serde_json::json!({"name": "forward", "input": [[0.0, 0.0]], "config": {}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["type"], "InvalidInput");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Expected 1 but got 2"));
    }

    #[tokio::test]
    async fn max_body_size_none_lets_a_large_body_through_the_transport_layer() {
        // Larger than axum's built-in 2 MiB default limit, which `app()`
        // must disable when `max_body_size` is `None`: the protocol itself
        // places no limit on parameter vectors.
        let padding = "0".repeat(3 * 1024 * 1024);
        let body = serde_json::json!({"name": "forward", "input": [[1.0]], "config": {"padding": padding}});
        let (status, _) = post_json(test_app(), "/Evaluate", body).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn max_body_size_some_rejects_an_oversized_body_before_it_reaches_the_model() {
        // The closed error taxonomy has no "too large" kind, so a body the
        // transport layer refuses still comes back as the usual
        // InvalidInput envelope, just without ever reaching the model.
        let app = app(
            Registry::new().with_model(StdArc::new(Forward)),
            &crate::config::ServerConfig::builder()
                .pool_size(1)
                .max_body_size(16)
                .build(),
        );
        let body = serde_json::json!({"name": "forward", "input": [[1.0]], "config": {}});
        let (status, json) = post_json(app, "/Evaluate", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["type"], "InvalidInput");
    }
}
