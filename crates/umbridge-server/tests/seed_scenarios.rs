//! Real axum server on an ephemeral port, driven with `reqwest` — the six
//! seed scenarios plus dimension/index rejection and pool concurrency.

use std::sync::Arc;

use serde_json::json;
use umbridge_server::{Registry, ServerConfig};

mod models {
    use umbridge_protocol::ProtocolError;
    use umbridge_server::Model;

    /// `y = 2x`, Evaluate-only — seed scenarios 1-4.
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

    /// Log-pdf of N(2, 1) — seed scenario 5.
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
            let x = input[0][0];
            let log_pdf = -0.5 * (2.0 * std::f64::consts::PI).ln() - 0.5 * (x - 2.0).powi(2);
            Ok(vec![vec![log_pdf]])
        }
        fn supports_evaluate(&self) -> bool {
            true
        }
        fn gradient(
            &self,
            _out_wrt: usize,
            _in_wrt: usize,
            input: Vec<Vec<f64>>,
            sens: Vec<f64>,
            _config: serde_json::Value,
        ) -> Result<Vec<f64>, ProtocolError> {
            Ok(vec![sens[0] * -(input[0][0] - 2.0)])
        }
        fn supports_gradient(&self) -> bool {
            true
        }
    }

    /// Echoes its input back unchanged — used to detect cross-request data
    /// mixing under a shared worker pool (seed scenario 6).
    pub struct Identity;
    impl Model for Identity {
        fn name(&self) -> &str {
            "identity"
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
}

use models::{Forward, Identity, Posterior};

async fn spawn(registry: Registry, pool_size: usize) -> String {
    let config = ServerConfig::builder()
        .bind_addr([127, 0, 0, 1].into())
        .port(0)
        .pool_size(pool_size)
        .build();
    let router = umbridge_server::app(registry, &config);
    let listener = tokio::net::TcpListener::bind(config.socket_addr())
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn scenario_1_evaluate_doubles_its_input() {
    let url = spawn(Registry::new().with_model(Arc::new(Forward)), 1).await;
    let resp = reqwest::Client::new()
        .post(format!("{url}/Evaluate"))
        .json(&json!({"name": "forward", "input": [[3.0]], "config": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"output": [[6.0]]}));
}

#[tokio::test]
async fn scenario_2_gradient_on_evaluate_only_model_is_unsupported() {
    let url = spawn(Registry::new().with_model(Arc::new(Forward)), 1).await;
    let resp = reqwest::Client::new()
        .post(format!("{url}/Gradient"))
        .json(&json!({"name": "forward", "input": [[3.0]], "outWrt": 0, "inWrt": 0, "sens": [1.0], "config": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["type"], json!("UnsupportedFeature"));
}

#[tokio::test]
async fn scenario_3_unknown_model_lists_available_names() {
    let url = spawn(Registry::new().with_model(Arc::new(Forward)), 1).await;
    let resp = reqwest::Client::new()
        .post(format!("{url}/Evaluate"))
        .json(&json!({"name": "nope", "input": [[0.0]], "config": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["type"], json!("ModelNotFound"));
    assert!(body["error"]["message"].as_str().unwrap().contains("forward"));
}

#[tokio::test]
async fn scenario_4_wrong_input_length_is_rejected() {
    let url = spawn(Registry::new().with_model(Arc::new(Forward)), 1).await;
    let resp = reqwest::Client::new()
        .post(format!("{url}/Evaluate"))
        .json(&json!({"name": "forward", "input": [[0.0, 0.0]], "config": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["type"], json!("InvalidInput"));
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Expected 1 but got 2"));
}

#[tokio::test]
async fn scenario_5_posterior_log_pdf_at_the_mean() {
    let url = spawn(Registry::new().with_model(Arc::new(Posterior)), 1).await;
    let resp = reqwest::Client::new()
        .post(format!("{url}/Evaluate"))
        .json(&json!({"name": "posterior", "input": [[2.0]], "config": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    let output = body["output"][0][0].as_f64().unwrap();
    assert!((output - (-0.918_938_5)).abs() < 1e-6);
}

#[tokio::test]
async fn scenario_6_concurrent_callers_never_cross_contaminate() {
    let url = spawn(Registry::new().with_model(Arc::new(Identity)), 4).await;
    let client = reqwest::Client::new();

    let mut tasks = Vec::new();
    for caller in 0..10 {
        for call in 0..10 {
            let client = client.clone();
            let url = url.clone();
            let id = caller as f64 * 1000.0 + call as f64;
            tasks.push(tokio::spawn(async move {
                let resp = client
                    .post(format!("{url}/Evaluate"))
                    .json(&json!({"name": "identity", "input": [[id]], "config": {}}))
                    .send()
                    .await
                    .unwrap();
                let body: serde_json::Value = resp.json().await.unwrap();
                (id, body["output"][0][0].as_f64().unwrap())
            }));
        }
    }
    for task in tasks {
        let (id, output) = task.await.unwrap();
        assert_eq!(id, output, "call embedding {id} came back as {output}");
    }
}

#[tokio::test]
async fn out_of_range_index_is_rejected_before_reaching_the_model() {
    let url = spawn(Registry::new().with_model(Arc::new(Posterior)), 1).await;

    let resp = reqwest::Client::new()
        .post(format!("{url}/Gradient"))
        .json(&json!({"name": "posterior", "input": [[2.0]], "outWrt": 5, "inWrt": 0, "sens": [1.0], "config": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["type"], json!("InvalidInput"));
}
