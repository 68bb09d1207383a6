//! The client proxy: one [`Client`] per `(url, model name)` pair.
//!
//! Construction runs the full handshake — `/Info` (version, model presence),
//! `/ModelInfo` (capability snapshot) and, if the `shmem` feature is on, the
//! `/TestShMem` probe — before returning. Every later method maps one-to-one
//! onto a POST and never re-queries capabilities.

use serde::Serialize;
use serde::de::DeserializeOwned;
use umbridge_protocol::wire::{
    ApplyHessianRequest, ApplyJacobianRequest, EvaluateRequest, EvaluateResponse, GradientRequest,
    InfoResponse, ModelInfoRequest, ModelInfoResponse, ModelSupport, SizesRequest, VectorResponse,
};
use umbridge_protocol::{is_compatible, ErrorResponse, ProtocolError, PROTOCOL_VERSION};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// A handle to one model hosted by one UM-Bridge server.
#[derive(Debug)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    name: String,
    support: ModelSupport,
    shmem_enabled: bool,
}

impl Client {
    /// Runs the handshake against `base_url` for the model `name` and
    /// returns a ready-to-use proxy.
    ///
    /// # Errors
    /// [`ClientError::VersionMismatch`] if the server's protocol version
    /// differs from [`PROTOCOL_VERSION`]; [`ClientError::UnknownModel`] if
    /// `name` is not hosted; [`ClientError::Transport`] for any network
    /// failure along the way.
    pub async fn connect(base_url: impl Into<String>, name: impl Into<String>) -> Result<Self, ClientError> {
        Self::connect_with_config(ClientConfig::new(base_url), name).await
    }

    /// Like [`Client::connect`], but with an explicit [`ClientConfig`]
    /// controlling the request timeout and whether the shared-memory probe
    /// runs at all.
    ///
    /// # Errors
    /// Same as [`Client::connect`].
    pub async fn connect_with_config(
        config: ClientConfig,
        name: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let base_url = config.base_url;
        let name = name.into();
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        let info: InfoResponse = http
            .get(format!("{base_url}/Info"))
            .send()
            .await?
            .json()
            .await?;
        if !is_compatible(info.protocol_version) {
            return Err(ClientError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                found: info.protocol_version,
            });
        }
        if !info.models.iter().any(|m| m == &name) {
            return Err(ClientError::UnknownModel {
                name,
                available: info.models,
            });
        }

        let model_info: ModelInfoResponse = http
            .post(format!("{base_url}/ModelInfo"))
            .json(&ModelInfoRequest { name: name.clone() })
            .send()
            .await?
            .json()
            .await?;

        let mut client = Self {
            http,
            base_url,
            name,
            support: model_info.support,
            shmem_enabled: false,
        };

        #[cfg(feature = "shmem")]
        if !config.shmem_opt_out {
            client.shmem_enabled = client.probe_shmem().await;
        }

        Ok(client)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn supports_evaluate(&self) -> bool {
        self.support.evaluate
    }
    #[must_use]
    pub fn supports_gradient(&self) -> bool {
        self.support.gradient
    }
    #[must_use]
    pub fn supports_apply_jacobian(&self) -> bool {
        self.support.apply_jacobian
    }
    #[must_use]
    pub fn supports_apply_hessian(&self) -> bool {
        self.support.apply_hessian
    }

    /// Whether the shared-memory fast path is usable for `Evaluate`: the
    /// server declared it *and* the construction-time probe succeeded.
    #[must_use]
    pub fn supports_evaluate_shmem(&self) -> bool {
        self.support.evaluate_shmem && self.shmem_enabled
    }
    #[must_use]
    pub fn supports_gradient_shmem(&self) -> bool {
        self.support.gradient_shmem && self.shmem_enabled
    }
    #[must_use]
    pub fn supports_apply_jacobian_shmem(&self) -> bool {
        self.support.apply_jacobian_shmem && self.shmem_enabled
    }
    #[must_use]
    pub fn supports_apply_hessian_shmem(&self) -> bool {
        self.support.apply_hessian_shmem && self.shmem_enabled
    }

    /// # Errors
    /// [`ClientError::Transport`] on a network failure.
    pub async fn input_sizes(&self, config: serde_json::Value) -> Result<Vec<usize>, ClientError> {
        let resp: umbridge_protocol::wire::InputSizesResponse = self
            .post(
                "/InputSizes",
                &SizesRequest {
                    name: self.name.clone(),
                    config,
                },
            )
            .await?;
        Ok(resp.input_sizes)
    }

    /// # Errors
    /// [`ClientError::Transport`] on a network failure.
    pub async fn output_sizes(&self, config: serde_json::Value) -> Result<Vec<usize>, ClientError> {
        let resp: umbridge_protocol::wire::OutputSizesResponse = self
            .post(
                "/OutputSizes",
                &SizesRequest {
                    name: self.name.clone(),
                    config,
                },
            )
            .await?;
        Ok(resp.output_sizes)
    }

    /// # Errors
    /// [`ClientError::LocalValidation`] if the cached capability flag is
    /// false; [`ClientError::Remote`] or [`ClientError::Transport`]
    /// otherwise.
    pub async fn evaluate(
        &self,
        input: Vec<Vec<f64>>,
        config: serde_json::Value,
    ) -> Result<Vec<Vec<f64>>, ClientError> {
        if !self.supports_evaluate() {
            return Err(ClientError::LocalValidation(
                "model does not support Evaluate".to_string(),
            ));
        }
        #[cfg(feature = "shmem")]
        if self.supports_evaluate_shmem() {
            return self.evaluate_shmem(input, config).await;
        }
        let resp: EvaluateResponse = self
            .post(
                "/Evaluate",
                &EvaluateRequest {
                    name: self.name.clone(),
                    input,
                    config,
                },
            )
            .await?;
        Ok(resp.output)
    }

    /// # Errors
    /// See [`Client::evaluate`].
    pub async fn gradient(
        &self,
        out_wrt: usize,
        in_wrt: usize,
        input: Vec<Vec<f64>>,
        sens: Vec<f64>,
        config: serde_json::Value,
    ) -> Result<Vec<f64>, ClientError> {
        if !self.supports_gradient() {
            return Err(ClientError::LocalValidation(
                "model does not support Gradient".to_string(),
            ));
        }
        #[cfg(feature = "shmem")]
        if self.supports_gradient_shmem() {
            return self
                .gradient_shmem(out_wrt, in_wrt, input, sens, config)
                .await;
        }
        let resp: VectorResponse = self
            .post(
                "/Gradient",
                &GradientRequest {
                    name: self.name.clone(),
                    input,
                    out_wrt,
                    in_wrt,
                    sens,
                    config,
                },
            )
            .await?;
        Ok(resp.output)
    }

    /// # Errors
    /// See [`Client::evaluate`].
    pub async fn apply_jacobian(
        &self,
        out_wrt: usize,
        in_wrt: usize,
        input: Vec<Vec<f64>>,
        vec: Vec<f64>,
        config: serde_json::Value,
    ) -> Result<Vec<f64>, ClientError> {
        if !self.supports_apply_jacobian() {
            return Err(ClientError::LocalValidation(
                "model does not support ApplyJacobian".to_string(),
            ));
        }
        #[cfg(feature = "shmem")]
        if self.supports_apply_jacobian_shmem() {
            return self
                .apply_jacobian_shmem(out_wrt, in_wrt, input, vec, config)
                .await;
        }
        let resp: VectorResponse = self
            .post(
                "/ApplyJacobian",
                &ApplyJacobianRequest {
                    name: self.name.clone(),
                    input,
                    out_wrt,
                    in_wrt,
                    vec,
                    config,
                },
            )
            .await?;
        Ok(resp.output)
    }

    /// # Errors
    /// See [`Client::evaluate`].
    #[allow(clippy::too_many_arguments)]
    pub async fn apply_hessian(
        &self,
        out_wrt: usize,
        in_wrt1: usize,
        in_wrt2: usize,
        input: Vec<Vec<f64>>,
        sens: Vec<f64>,
        vec: Vec<f64>,
        config: serde_json::Value,
    ) -> Result<Vec<f64>, ClientError> {
        if !self.supports_apply_hessian() {
            return Err(ClientError::LocalValidation(
                "model does not support ApplyHessian".to_string(),
            ));
        }
        #[cfg(feature = "shmem")]
        if self.supports_apply_hessian_shmem() {
            return self
                .apply_hessian_shmem(out_wrt, in_wrt1, in_wrt2, input, sens, vec, config)
                .await;
        }
        let resp: VectorResponse = self
            .post(
                "/ApplyHessian",
                &ApplyHessianRequest {
                    name: self.name.clone(),
                    input,
                    out_wrt,
                    in_wrt1,
                    in_wrt2,
                    sens,
                    vec,
                    config,
                },
            )
            .await?;
        Ok(resp.output)
    }

    async fn post<Req: Serialize + ?Sized, Resp: DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, ClientError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let body: ErrorResponse = response.json().await?;
            Err(ClientError::Remote(ProtocolError::new(
                body.error.kind,
                body.error.message,
            )))
        }
    }

    #[cfg(feature = "shmem")]
    async fn probe_shmem(&self) -> bool {
        match self.try_probe_shmem().await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(%err, "shared-memory probe failed, falling back to HTTP-only");
                false
            }
        }
    }

    #[cfg(feature = "shmem")]
    async fn try_probe_shmem(&self) -> Result<(), ClientError> {
        use umbridge_protocol::wire::TestShMemRequest;

        let tid = crate::tid::current();
        const SENTINEL: f64 = 42.0;
        let in_name = format!("/umbridge_test_shmem_in_{tid}");
        let out_name = format!("/umbridge_test_shmem_out_{tid}");

        let _input = crate::shmem::create_input(&in_name, &[SENTINEL])
            .map_err(|e| ClientError::LocalValidation(e.to_string()))?;
        let output = crate::shmem::create_output(&out_name, 1)
            .map_err(|e| ClientError::LocalValidation(e.to_string()))?;

        let _: umbridge_protocol::wire::TestShMemResponse =
            self.post("/TestShMem", &TestShMemRequest { name: self.name.clone(), tid }).await?;

        let echoed = crate::shmem::read(&output, 1);
        if echoed != [SENTINEL] {
            return Err(ClientError::LocalValidation(
                "shared-memory probe round-trip mismatch".to_string(),
            ));
        }
        Ok(())
    }

    #[cfg(feature = "shmem")]
    async fn evaluate_shmem(
        &self,
        input: Vec<Vec<f64>>,
        config: serde_json::Value,
    ) -> Result<Vec<Vec<f64>>, ClientError> {
        use umbridge_protocol::wire::{EvaluateShMemRequest, ShMemHeader};

        let output_sizes = self.output_sizes(config.clone()).await?;
        let tid = crate::tid::current();
        let sizes: Vec<usize> = input.iter().map(Vec::len).collect();

        let in_segments: Vec<_> = input
            .iter()
            .enumerate()
            .map(|(i, v)| {
                crate::shmem::create_input(&crate::shmem::input_segment_name("/umbridge", &tid, i), v)
            })
            .collect::<Result<_, _>>()
            .map_err(|e| ClientError::LocalValidation(e.to_string()))?;

        let out_segments: Vec<_> = output_sizes
            .iter()
            .enumerate()
            .map(|(j, &len)| {
                crate::shmem::create_output(&crate::shmem::output_segment_name("/umbridge", &tid, j), len)
            })
            .collect::<Result<_, _>>()
            .map_err(|e| ClientError::LocalValidation(e.to_string()))?;

        let header = ShMemHeader::new(tid, "/umbridge", &sizes);
        let req = EvaluateShMemRequest {
            name: self.name.clone(),
            config,
            header,
        };
        let _: umbridge_protocol::wire::ShMemOpResponse = self.post("/EvaluateShMem", &req).await?;

        let output = out_segments
            .iter()
            .zip(&output_sizes)
            .map(|(seg, &len)| crate::shmem::read(seg, len))
            .collect();
        drop(in_segments);
        drop(out_segments);
        Ok(output)
    }

    #[cfg(feature = "shmem")]
    #[allow(clippy::too_many_arguments)]
    async fn gradient_shmem(
        &self,
        out_wrt: usize,
        in_wrt: usize,
        input: Vec<Vec<f64>>,
        sens: Vec<f64>,
        config: serde_json::Value,
    ) -> Result<Vec<f64>, ClientError> {
        use umbridge_protocol::wire::{GradientShMemRequest, ShMemHeader};

        let tid = crate::tid::current();
        let sizes: Vec<usize> = input.iter().map(Vec::len).collect();
        let in_len = sizes[in_wrt];

        let in_segments: Vec<_> = input
            .iter()
            .enumerate()
            .map(|(i, v)| {
                crate::shmem::create_input(&crate::shmem::input_segment_name("/umbridge", &tid, i), v)
            })
            .collect::<Result<_, _>>()
            .map_err(|e| ClientError::LocalValidation(e.to_string()))?;
        let out_segment = crate::shmem::create_output(
            &crate::shmem::output_segment_name("/umbridge", &tid, 0),
            in_len,
        )
        .map_err(|e| ClientError::LocalValidation(e.to_string()))?;

        let header = ShMemHeader::new(tid, "/umbridge", &sizes);
        let req = GradientShMemRequest {
            name: self.name.clone(),
            out_wrt,
            in_wrt,
            sens,
            config,
            header,
        };
        let _: umbridge_protocol::wire::ShMemOpResponse = self.post("/GradientShMem", &req).await?;

        let output = crate::shmem::read(&out_segment, in_len);
        drop(in_segments);
        drop(out_segment);
        Ok(output)
    }

    #[cfg(feature = "shmem")]
    #[allow(clippy::too_many_arguments)]
    async fn apply_jacobian_shmem(
        &self,
        out_wrt: usize,
        in_wrt: usize,
        input: Vec<Vec<f64>>,
        vec: Vec<f64>,
        config: serde_json::Value,
    ) -> Result<Vec<f64>, ClientError> {
        use umbridge_protocol::wire::{ApplyJacobianShMemRequest, ShMemHeader};

        let output_sizes = self.output_sizes(config.clone()).await?;
        let tid = crate::tid::current();
        let sizes: Vec<usize> = input.iter().map(Vec::len).collect();
        let out_len = output_sizes[out_wrt];

        let in_segments: Vec<_> = input
            .iter()
            .enumerate()
            .map(|(i, v)| {
                crate::shmem::create_input(&crate::shmem::input_segment_name("/umbridge", &tid, i), v)
            })
            .collect::<Result<_, _>>()
            .map_err(|e| ClientError::LocalValidation(e.to_string()))?;
        let out_segment = crate::shmem::create_output(
            &crate::shmem::output_segment_name("/umbridge", &tid, 0),
            out_len,
        )
        .map_err(|e| ClientError::LocalValidation(e.to_string()))?;

        let header = ShMemHeader::new(tid, "/umbridge", &sizes);
        let req = ApplyJacobianShMemRequest {
            name: self.name.clone(),
            out_wrt,
            in_wrt,
            vec,
            config,
            header,
        };
        let _: umbridge_protocol::wire::ShMemOpResponse =
            self.post("/ApplyJacobianShMem", &req).await?;

        let output = crate::shmem::read(&out_segment, out_len);
        drop(in_segments);
        drop(out_segment);
        Ok(output)
    }

    #[cfg(feature = "shmem")]
    #[allow(clippy::too_many_arguments)]
    async fn apply_hessian_shmem(
        &self,
        out_wrt: usize,
        in_wrt1: usize,
        in_wrt2: usize,
        input: Vec<Vec<f64>>,
        sens: Vec<f64>,
        vec: Vec<f64>,
        config: serde_json::Value,
    ) -> Result<Vec<f64>, ClientError> {
        use umbridge_protocol::wire::{ApplyHessianShMemRequest, ShMemHeader};

        let tid = crate::tid::current();
        let sizes: Vec<usize> = input.iter().map(Vec::len).collect();
        // The vector-Hessian product's length matches input_sizes[in_wrt1],
        // not output_sizes[out_wrt] (see the matching note on the server).
        let out_len = sizes[in_wrt1];

        let in_segments: Vec<_> = input
            .iter()
            .enumerate()
            .map(|(i, v)| {
                crate::shmem::create_input(&crate::shmem::input_segment_name("/umbridge", &tid, i), v)
            })
            .collect::<Result<_, _>>()
            .map_err(|e| ClientError::LocalValidation(e.to_string()))?;
        let out_segment = crate::shmem::create_output(
            &crate::shmem::output_segment_name("/umbridge", &tid, 0),
            out_len,
        )
        .map_err(|e| ClientError::LocalValidation(e.to_string()))?;

        let header = ShMemHeader::new(tid, "/umbridge", &sizes);
        let req = ApplyHessianShMemRequest {
            name: self.name.clone(),
            out_wrt,
            in_wrt1,
            in_wrt2,
            sens,
            vec,
            config,
            header,
        };
        let _: umbridge_protocol::wire::ShMemOpResponse =
            self.post("/ApplyHessianShMem", &req).await?;

        let output = crate::shmem::read(&out_segment, out_len);
        drop(in_segments);
        drop(out_segment);
        Ok(output)
    }
}
