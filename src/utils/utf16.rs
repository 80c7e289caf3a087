#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Utf16LeDecodeError {
    OddLength,
    InvalidData,
}

/// Decode a UTF-16LE byte slice until the first NUL (0x0000), if present.
pub(crate) fn decode_utf16le_bytes_z(bytes: &[u8]) -> Result<String, Utf16LeDecodeError> {
    if !bytes.len().is_multiple_of(2) {
        return Err(Utf16LeDecodeError::OddLength);
    }

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .take_while(|&c| c != 0)
        .collect();

    String::from_utf16(&units).map_err(|_| Utf16LeDecodeError::InvalidData)
}

/// Encode a name the way the repository index hashes it: uppercased, UTF-16LE, no terminator.
pub(crate) fn encode_utf16le_upper(name: &str) -> Vec<u8> {
    name.to_uppercase()
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_until_nul() {
        let bytes = [b'r', 0, b'o', 0, 0, 0, b'z', 0];
        assert_eq!(decode_utf16le_bytes_z(&bytes).unwrap(), "ro");
    }

    #[test]
    fn rejects_odd_length() {
        assert_eq!(
            decode_utf16le_bytes_z(&[0x41]),
            Err(Utf16LeDecodeError::OddLength)
        );
    }

    #[test]
    fn rejects_lone_surrogate() {
        let bytes = 0xD800u16.to_le_bytes();
        assert_eq!(
            decode_utf16le_bytes_z(&bytes),
            Err(Utf16LeDecodeError::InvalidData)
        );
    }

    #[test]
    fn encodes_uppercase_utf16le() {
        assert_eq!(encode_utf16le_upper("Ns"), vec![b'N', 0, b'S', 0]);
    }
}
