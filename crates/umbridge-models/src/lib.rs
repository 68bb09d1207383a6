//! Demonstration models hosted by the example server binary.

pub mod forward;
pub mod posterior;

pub use forward::Forward;
pub use posterior::Posterior;
