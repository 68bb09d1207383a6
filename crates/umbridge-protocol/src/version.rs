//! Protocol version negotiation.
//!
//! UM-Bridge 1.0 is the only version this crate speaks. The original Python
//! implementation's 0.9 dialect (`/GetInputSizes`, unnamed single-model
//! servers) is not supported.

/// The protocol version this implementation speaks, as carried in `/Info`.
pub const PROTOCOL_VERSION: f64 = 1.0;

/// Returns whether a version reported by a peer is compatible with this
/// implementation.
///
/// UM-Bridge versions are exact-match: a client built against `1.0` refuses
/// to couple with any server that doesn't report exactly `1.0`.
#[must_use]
pub fn is_compatible(reported: f64) -> bool {
    reported == PROTOCOL_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_version_is_compatible() {
        assert!(is_compatible(1.0));
    }

    #[test]
    fn other_versions_are_not_compatible() {
        assert!(!is_compatible(0.9));
        assert!(!is_compatible(1.1));
        assert!(!is_compatible(2.0));
    }
}
