use jiff::Timestamp;

use crate::err::{DeserializationError, DeserializationResult};
use crate::utils::ByteCursor;

const WINDOWS_TO_UNIX_SECS: i64 = 11_644_473_600;
const TICKS_PER_SECOND: u64 = 10_000_000;

/// Convert a FILETIME tick count (100ns units since 1601-01-01) into a UTC instant.
#[inline]
pub(crate) fn filetime_to_timestamp(filetime: u64) -> DeserializationResult<Timestamp> {
    let secs = (filetime / TICKS_PER_SECOND) as i64 - WINDOWS_TO_UNIX_SECS;
    let nanos = ((filetime % TICKS_PER_SECOND) * 100) as i32;
    Timestamp::new(secs, nanos).map_err(|_| DeserializationError::InvalidDateTime { filetime })
}

pub(crate) fn read_filetime(
    cursor: &mut ByteCursor<'_>,
    what: &'static str,
) -> DeserializationResult<Timestamp> {
    let ticks = cursor.u64_named(what)?;
    filetime_to_timestamp(ticks)
}
