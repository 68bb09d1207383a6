//! Server side of the shared-memory fast path.
//!
//! The server only ever *opens* segments the caller already created — it
//! never creates or unlinks one, so that a crashed server cannot leak
//! segments owned by a live client. Each segment holds `len * 8` bytes of
//! little-endian `f64`.

use shared_memory::{Shmem, ShmemConf};
use umbridge_protocol::ProtocolError;

/// Opens an existing named segment for reading or writing. The server does
/// not create, resize, or unlink it.
pub fn open(name: &str) -> Result<Shmem, ProtocolError> {
    ShmemConf::new().os_id(name).open().map_err(|e| {
        ProtocolError::invalid_input(format!("could not open shared-memory segment {name}: {e}"))
    })
}

/// Reads `len` little-endian doubles out of an opened segment.
pub fn read_f64(shmem: &Shmem, len: usize) -> Result<Vec<f64>, ProtocolError> {
    let needed = len * std::mem::size_of::<f64>();
    if shmem.len() < needed {
        return Err(ProtocolError::invalid_input(format!(
            "segment {} is {} bytes, need {needed} for {len} doubles",
            shmem.get_os_id(),
            shmem.len()
        )));
    }
    // SAFETY: the segment is at least `needed` bytes (checked above) and
    // outlives this read — the caller only replies after writing/unlinking.
    let bytes = unsafe { std::slice::from_raw_parts(shmem.as_ptr(), needed) };
    Ok(bytes
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes(c.try_into().expect("chunk is exactly 8 bytes")))
        .collect())
}

/// Writes `data` as little-endian doubles into an opened segment.
pub fn write_f64(shmem: &Shmem, data: &[f64]) -> Result<(), ProtocolError> {
    let needed = std::mem::size_of_val(data);
    if shmem.len() < needed {
        return Err(ProtocolError::invalid_output(format!(
            "segment {} is {} bytes, too small for {} doubles",
            shmem.get_os_id(),
            shmem.len(),
            data.len()
        )));
    }
    // SAFETY: the segment is at least `needed` bytes (checked above); the
    // caller created it and will read it only after this handler replies.
    let bytes = unsafe { std::slice::from_raw_parts_mut(shmem.as_ptr(), needed) };
    for (chunk, value) in bytes.chunks_exact_mut(8).zip(data) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
    Ok(())
}

/// Segment name for a numbered input vector: `/umbridge_in_<tid>_<i>`.
#[must_use]
pub fn input_segment_name(shmem_name: &str, tid: &str, i: usize) -> String {
    format!("{shmem_name}_in_{tid}_{i}")
}

/// Segment name for a numbered output vector: `/umbridge_out_<tid>_<j>`.
#[must_use]
pub fn output_segment_name(shmem_name: &str, tid: &str, j: usize) -> String {
    format!("{shmem_name}_out_{tid}_{j}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_doubles_through_a_real_segment() {
        let name = format!("/umbridge_test_{}", std::process::id());
        let owner = ShmemConf::new()
            .os_id(&name)
            .size(3 * 8)
            .create()
            .expect("create test segment");

        write_f64(&owner, &[1.5, -2.0, 3.25]).unwrap();
        let opened = open(&name).unwrap();
        let values = read_f64(&opened, 3).unwrap();
        assert_eq!(values, vec![1.5, -2.0, 3.25]);
    }

    #[test]
    fn naming_matches_protocol_scheme() {
        assert_eq!(
            input_segment_name("/umbridge", "123", 0),
            "/umbridge_in_123_0"
        );
        assert_eq!(
            output_segment_name("/umbridge", "123", 1),
            "/umbridge_out_123_1"
        );
    }
}
