//! Decoders for EBML scalar payloads.

use crate::error::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};
use std::borrow::Cow;

/// 2001-01-01T00:00:00Z, the origin of EBML dates, as Unix seconds.
const EBML_EPOCH: i64 = 978_307_200;

/// Big-endian unsigned integer of up to 8 bytes. An empty payload is 0.
pub fn decode_unsigned(bytes: &[u8]) -> Result<u64> {
    if bytes.len() > 8 {
        return Err(Error::size(format!(
            "buffer too large for u64 ({})",
            bytes.len()
        )));
    }

    Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64))
}

/// Big-endian two's-complement integer of up to 8 bytes, sign-extended from
/// the high bit of the first byte.
pub fn decode_signed(bytes: &[u8]) -> Result<i64> {
    if bytes.len() > 8 {
        return Err(Error::size(format!(
            "buffer too large for i64 ({})",
            bytes.len()
        )));
    }

    let init: i64 = match bytes.first() {
        Some(b) if b & 0x80 != 0 => -1,
        _ => 0,
    };
    Ok(bytes.iter().fold(init, |acc, b| (acc << 8) | *b as i64))
}

/// 4-byte single or 8-byte double precision float.
pub fn decode_float(bytes: &[u8]) -> Result<f64> {
    match bytes.len() {
        4 => {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(bytes);
            Ok(f32::from_be_bytes(buf) as f64)
        }
        8 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(bytes);
            Ok(f64::from_be_bytes(buf))
        }
        n => Err(Error::size(format!("invalid length for float or double ({})", n))),
    }
}

pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// EBML date: signed nanoseconds since 2001-01-01T00:00:00Z.
pub fn decode_date(bytes: &[u8]) -> Result<DateTime<Utc>> {
    date_from_nanos(decode_signed(bytes)?)
}

pub fn date_from_nanos(nanos: i64) -> Result<DateTime<Utc>> {
    let secs = EBML_EPOCH + nanos.div_euclid(1_000_000_000);
    let subsec = nanos.rem_euclid(1_000_000_000) as u32;
    Utc.timestamp_opt(secs, subsec)
        .single()
        .ok_or_else(|| Error::parse(format!("date out of range ({})", nanos)))
}
