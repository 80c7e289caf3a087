use crate::err::{DeserializationError, DeserializationResult};
use crate::utils::bytes;
use crate::utils::utf16::decode_utf16le_bytes_z;

/// A lightweight cursor over an immutable byte slice.
///
/// This is the slice/offset equivalent of `Cursor<&[u8]>`: records are already in memory, so
/// we want explicit bounds/offset control without IO-style error plumbing.
///
/// All reads are little-endian and advance the cursor on success.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    #[inline]
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    pub(crate) fn with_pos(buf: &'a [u8], pos: usize) -> DeserializationResult<Self> {
        // Allow pos == len (EOF), reject pos > len.
        let _ = bytes::slice_r(buf, pos, 0, "cursor.position")?;
        Ok(Self { buf, pos })
    }

    #[inline]
    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub(crate) fn position(&self) -> u64 {
        self.pos as u64
    }

    #[inline]
    pub(crate) fn set_pos(&mut self, pos: usize, what: &'static str) -> DeserializationResult<()> {
        let _ = bytes::slice_r(self.buf, pos, 0, what)?;
        self.pos = pos;
        Ok(())
    }

    #[inline]
    pub(crate) fn advance(&mut self, n: usize, what: &'static str) -> DeserializationResult<()> {
        let new_pos = self
            .pos
            .checked_add(n)
            .ok_or_else(|| bytes::truncated(what, self.pos, n, self.buf.len()))?;
        // Report the skip itself as the truncated field, not the position check.
        if new_pos > self.buf.len() {
            return Err(bytes::truncated(what, self.pos, n, self.buf.len()));
        }
        self.set_pos(new_pos, what)
    }

    #[inline]
    pub(crate) fn take_bytes(
        &mut self,
        len: usize,
        what: &'static str,
    ) -> DeserializationResult<&'a [u8]> {
        let out = bytes::slice_r(self.buf, self.pos, len, what)?;
        self.pos += len;
        Ok(out)
    }

    #[inline]
    pub(crate) fn array<const N: usize>(
        &mut self,
        what: &'static str,
    ) -> DeserializationResult<[u8; N]> {
        let v = bytes::read_array_r::<N>(self.buf, self.pos, what)?;
        self.pos += N;
        Ok(v)
    }

    #[inline]
    pub(crate) fn u8_named(&mut self, what: &'static str) -> DeserializationResult<u8> {
        let b = bytes::read_u8(self.buf, self.pos)
            .ok_or_else(|| bytes::truncated(what, self.pos, 1, self.buf.len()))?;
        self.pos += 1;
        Ok(b)
    }

    #[inline]
    pub(crate) fn u16_named(&mut self, what: &'static str) -> DeserializationResult<u16> {
        let v = bytes::read_u16_le_r(self.buf, self.pos, what)?;
        self.pos += 2;
        Ok(v)
    }

    #[inline]
    pub(crate) fn u32_named(&mut self, what: &'static str) -> DeserializationResult<u32> {
        let v = bytes::read_u32_le_r(self.buf, self.pos, what)?;
        self.pos += 4;
        Ok(v)
    }

    #[inline]
    pub(crate) fn u64_named(&mut self, what: &'static str) -> DeserializationResult<u64> {
        let v = bytes::read_u64_le_r(self.buf, self.pos, what)?;
        self.pos += 8;
        Ok(v)
    }

    #[inline]
    pub(crate) fn f32_named(&mut self, what: &'static str) -> DeserializationResult<f32> {
        let v = bytes::read_f32_le_r(self.buf, self.pos, what)?;
        self.pos += 4;
        Ok(v)
    }

    /// Read a `u32` length-or-size field whose top bit is reserved, masking the bit off.
    #[inline]
    pub(crate) fn masked_len_named(&mut self, what: &'static str) -> DeserializationResult<usize> {
        Ok((self.u32_named(what)? & 0x7FFF_FFFF) as usize)
    }

    /// Read `char_count` UTF-16 code units (little-endian) and decode them, stopping at NUL
    /// if one is present.
    pub(crate) fn utf16_by_char_count(
        &mut self,
        char_count: usize,
        what: &'static str,
    ) -> DeserializationResult<String> {
        let start = self.pos;
        let byte_len = char_count
            .checked_mul(2)
            .ok_or_else(|| bytes::truncated(what, start, usize::MAX, self.buf.len()))?;
        let raw = self.take_bytes(byte_len, what)?;
        decode_utf16le_bytes_z(raw).map_err(|_| DeserializationError::InvalidUtf16 {
            what,
            offset: start as u64,
        })
    }

    /// Read bytes up to (not including) the next NUL byte, consuming the terminator.
    pub(crate) fn null_terminated_bytes(
        &mut self,
        what: &'static str,
    ) -> DeserializationResult<&'a [u8]> {
        let start = self.pos;
        let rest = self
            .buf
            .get(start..)
            .ok_or_else(|| bytes::truncated(what, start, 1, self.buf.len()))?;
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| bytes::truncated(what, start, rest.len() + 1, self.buf.len()))?;
        self.pos = start + len + 1;
        Ok(&rest[..len])
    }
}
