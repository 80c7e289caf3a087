mod ansi;
mod byte_cursor;
pub(crate) mod bytes;
mod utf16;
mod windows;

pub(crate) use self::ansi::decode_ansi;
pub(crate) use self::byte_cursor::ByteCursor;
pub(crate) use self::utf16::encode_utf16le_upper;
pub(crate) use self::windows::{filetime_to_timestamp, read_filetime};
