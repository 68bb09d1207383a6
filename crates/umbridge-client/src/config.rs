//! Client configuration: base URL, request timeout, and a way to opt out of
//! the shared-memory fast path regardless of what the probe would find.

use std::time::Duration;

/// Configuration for [`crate::Client::connect_with_config`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL, e.g. `http://localhost:4242`.
    pub base_url: String,
    /// Per-request timeout. `None` means no timeout, matching `reqwest`'s
    /// own default.
    pub timeout: Option<Duration>,
    /// When `true`, the construction-time `/TestShMem` probe is skipped
    /// entirely and every call goes over HTTP, even if the server
    /// advertises shared-memory support and the probe would succeed.
    pub shmem_opt_out: bool,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            shmem_opt_out: false,
        }
    }

    #[must_use]
    pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder {
            base_url: base_url.into(),
            timeout: None,
            shmem_opt_out: false,
        }
    }
}

/// Builder for [`ClientConfig`]; always succeeds.
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    base_url: String,
    timeout: Option<Duration>,
    shmem_opt_out: bool,
}

impl ClientConfigBuilder {
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn shmem_opt_out(mut self, opt_out: bool) -> Self {
        self.shmem_opt_out = opt_out;
        self
    }

    #[must_use]
    pub fn build(self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url,
            timeout: self.timeout,
            shmem_opt_out: self.shmem_opt_out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_no_timeout_and_shmem_enabled() {
        let config = ClientConfig::new("http://localhost:4242");
        assert_eq!(config.timeout, None);
        assert!(!config.shmem_opt_out);
    }

    #[test]
    fn builder_sets_fields() {
        let config = ClientConfig::builder("http://localhost:4242")
            .timeout(Duration::from_secs(5))
            .shmem_opt_out(true)
            .build();
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert!(config.shmem_opt_out);
    }
}
