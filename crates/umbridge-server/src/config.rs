//! Server configuration.

/// Default bind port, per the UM-Bridge external-interface convention.
pub const DEFAULT_PORT: u16 = 4242;

/// Default evaluator pool size — one worker, i.e. fully serialized model
/// calls, safe for non-reentrant scientific code.
pub const DEFAULT_POOL_SIZE: usize = 1;

/// Server configuration: bind address, evaluator pool size, and request
/// body limits.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: std::net::IpAddr,
    /// Port to bind the HTTP listener to.
    pub port: u16,
    /// Number of worker threads in the evaluator execution pool.
    pub pool_size: usize,
    /// Maximum request body size in bytes. `None` means unbounded, matching
    /// the protocol's requirement that large parameter vectors not be
    /// rejected by the transport layer.
    pub max_body_size: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            pool_size: DEFAULT_POOL_SIZE,
            max_body_size: None,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    #[must_use]
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::new(self.bind_addr, self.port)
    }
}

/// Builder for [`ServerConfig`]; always succeeds, defaulting unset fields.
#[derive(Debug, Clone, Default)]
pub struct ServerConfigBuilder {
    bind_addr: Option<std::net::IpAddr>,
    port: Option<u16>,
    pool_size: Option<usize>,
    max_body_size: Option<usize>,
}

impl ServerConfigBuilder {
    #[must_use]
    pub fn bind_addr(mut self, addr: std::net::IpAddr) -> Self {
        self.bind_addr = Some(addr);
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = Some(size);
        self
    }

    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = Some(size);
        self
    }

    #[must_use]
    pub fn build(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            bind_addr: self.bind_addr.unwrap_or(defaults.bind_addr),
            port: self.port.unwrap_or(defaults.port),
            pool_size: self.pool_size.unwrap_or(defaults.pool_size).max(1),
            max_body_size: self.max_body_size.or(defaults.max_body_size),
        }
    }
}
