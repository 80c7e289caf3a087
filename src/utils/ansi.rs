use encoding::{DecoderTrap, EncodingRef};

use crate::err::{DeserializationError, DeserializationResult};

/// Decode a single-byte string (heap strings, the ASCII super-class mirror) using `ansi_codec`.
pub(crate) fn decode_ansi(bytes: &[u8], ansi_codec: EncodingRef) -> DeserializationResult<String> {
    // Plain ASCII is by far the common case and every supported codepage agrees on it.
    if bytes.is_ascii() {
        return Ok(bytes.iter().map(|&b| b as char).collect());
    }

    ansi_codec
        .decode(bytes, DecoderTrap::Strict)
        .map_err(|m| DeserializationError::AnsiDecodeError {
            encoding_used: ansi_codec.name(),
            inner_message: m.to_string(),
        })
}
