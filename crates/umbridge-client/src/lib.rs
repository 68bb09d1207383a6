//! # UM-Bridge Client
//!
//! A [`Client`] proxies one model hosted by one UM-Bridge server: the
//! handshake (`/Info`, `/ModelInfo`, and — with the `shmem` feature — a
//! `/TestShMem` probe) runs once at [`Client::connect`], after which every
//! method maps one-to-one onto a POST.

mod client;
mod config;
mod error;
#[cfg(feature = "shmem")]
mod shmem;
#[cfg(feature = "shmem")]
mod tid;

pub use client::Client;
pub use config::ClientConfig;
pub use error::ClientError;
