//! Client side of the shared-memory fast path: the caller creates every
//! segment, writes or reads it, and unlinks it by dropping its `Shmem`
//! handle after the HTTP round-trip completes.

use shared_memory::{Shmem, ShmemConf};
use umbridge_protocol::ProtocolError;

fn create(name: &str, bytes: usize) -> Result<Shmem, ProtocolError> {
    ShmemConf::new().os_id(name).size(bytes).create().map_err(|e| {
        ProtocolError::invalid_input(format!("could not create shared-memory segment {name}: {e}"))
    })
}

/// Creates a segment sized for `data` and writes it.
pub fn create_input(name: &str, data: &[f64]) -> Result<Shmem, ProtocolError> {
    let shmem = create(name, std::mem::size_of_val(data))?;
    // SAFETY: just created at exactly this size; nothing else has mapped it yet.
    let bytes = unsafe { std::slice::from_raw_parts_mut(shmem.as_ptr(), shmem.len()) };
    for (chunk, value) in bytes.chunks_exact_mut(8).zip(data) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
    Ok(shmem)
}

/// Creates an empty segment sized to receive `len` doubles.
pub fn create_output(name: &str, len: usize) -> Result<Shmem, ProtocolError> {
    create(name, len * std::mem::size_of::<f64>())
}

/// Reads `len` little-endian doubles out of a segment this client created.
#[must_use]
pub fn read(shmem: &Shmem, len: usize) -> Vec<f64> {
    let needed = len * std::mem::size_of::<f64>();
    // SAFETY: the caller sized this segment for at least `len` doubles.
    let bytes = unsafe { std::slice::from_raw_parts(shmem.as_ptr(), needed) };
    bytes
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes(c.try_into().expect("chunk is exactly 8 bytes")))
        .collect()
}

pub fn input_segment_name(shmem_name: &str, tid: &str, i: usize) -> String {
    format!("{shmem_name}_in_{tid}_{i}")
}

pub fn output_segment_name(shmem_name: &str, tid: &str, j: usize) -> String {
    format!("{shmem_name}_out_{tid}_{j}")
}
