//! Register word decoding.

/// Why a register payload could not be turned into a value.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DecodeError {
    #[error("no register words to decode")]
    Empty,

    #[error("register words {words:04X?} do not hold a finite float")]
    Malformed { words: Vec<u16> },
}

/// Decode holding-register words into a number, then apply `scaling_factor`.
///
/// - one word: unsigned 16-bit integer
/// - two words: big-endian IEEE-754 `f32`, first word high
/// - more: sum of the words
pub fn decode_registers(words: &[u16], scaling_factor: f64) -> Result<f64, DecodeError> {
    let raw = match words {
        [] => return Err(DecodeError::Empty),
        [single] => f64::from(*single),
        [high, low] => {
            let bits = (u32::from(*high) << 16) | u32::from(*low);
            let value = f32::from_bits(bits);
            if !value.is_finite() {
                return Err(DecodeError::Malformed {
                    words: words.to_vec(),
                });
            }
            f64::from(value)
        }
        // No layout is defined for wider reads.
        many => many.iter().map(|w| f64::from(*w)).sum(),
    };

    Ok(raw * scaling_factor)
}
