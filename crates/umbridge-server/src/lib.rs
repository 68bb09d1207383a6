//! # UM-Bridge Server
//!
//! Hosts [`model::Model`] implementations behind the UM-Bridge 1.0 HTTP API:
//! request validation, a bounded evaluator pool, and (optionally) the
//! shared-memory fast path, wired up through [`router::app`] and
//! [`router::serve`].

pub mod config;
pub mod error;
pub mod executor;
pub mod extract;
pub mod model;
pub mod registry;
pub mod router;
#[cfg(feature = "shmem")]
pub mod shmem;
#[cfg(feature = "shmem")]
pub mod shmem_routes;
pub mod validation;

pub use config::ServerConfig;
pub use error::ApiError;
pub use executor::Executor;
pub use model::Model;
pub use registry::Registry;
pub use router::{app, serve};
