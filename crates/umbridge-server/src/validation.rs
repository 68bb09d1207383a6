//! Shape and index-bounds validation shared by every operation endpoint.
//!
//! Request validation and response validation are symmetric:
//! [`validate_input`] checks a caller-supplied parameter bundle against a
//! model's declared input sizes; [`validate_vector_output`] and
//! [`validate_bundle_output`] perform the matching check on what the model
//! returned. Neither a malformed request nor a malformed reply passes
//! silently.

use umbridge_protocol::ProtocolError;

/// Checks that `input` has exactly one vector per declared input size, each
/// of the declared length.
pub fn validate_input(input: &[Vec<f64>], input_sizes: &[usize]) -> Result<(), ProtocolError> {
    if input.len() != input_sizes.len() {
        return Err(ProtocolError::invalid_input(
            "Number of input parameters does not match model number of model inputs!",
        ));
    }
    for (i, (vector, &expected)) in input.iter().zip(input_sizes).enumerate() {
        if vector.len() != expected {
            return Err(ProtocolError::invalid_input(format!(
                "Input parameter {i} has invalid length! Expected {expected} but got {}.",
                vector.len()
            )));
        }
    }
    Ok(())
}

/// Checks that `index` is a valid position into a sequence of the given
/// length, naming `field` in the error message on failure.
pub fn validate_index(index: usize, len: usize, field: &str) -> Result<(), ProtocolError> {
    if index >= len {
        return Err(ProtocolError::invalid_input(format!(
            "Invalid {field} index! Expected between 0 and {} inclusive, but got {index}",
            len.saturating_sub(1)
        )));
    }
    Ok(())
}

/// Checks a sensitivity or tangent vector's length against its expected
/// slot size.
pub fn validate_vector_len(
    vector: &[f64],
    expected: usize,
    field: &str,
) -> Result<(), ProtocolError> {
    if vector.len() != expected {
        return Err(ProtocolError::invalid_input(format!(
            "Vector {field} has invalid length! Expected {expected} but got {}.",
            vector.len()
        )));
    }
    Ok(())
}

/// Checks a model's `Evaluate` output: a list of lists matching
/// `output_sizes` exactly.
pub fn validate_bundle_output(
    output: &[Vec<f64>],
    output_sizes: &[usize],
) -> Result<(), ProtocolError> {
    if output.len() != output_sizes.len() {
        return Err(ProtocolError::invalid_output(
            "Number of output vectors returned by model does not match number of model outputs declared by model!",
        ));
    }
    for (i, (vector, &expected)) in output.iter().zip(output_sizes).enumerate() {
        if vector.len() != expected {
            return Err(ProtocolError::invalid_output(format!(
                "Output vector {i} has invalid length! Model declared {expected} but returned {}.",
                vector.len()
            )));
        }
    }
    Ok(())
}

/// Checks a derivative operation's output: a single vector of the expected
/// length.
pub fn validate_vector_output(output: &[f64], expected: usize) -> Result<(), ProtocolError> {
    if output.len() != expected {
        return Err(ProtocolError::invalid_output(format!(
            "Output vector has invalid length! Model declared {expected} but returned {}.",
            output.len()
        )));
    }
    Ok(())
}
