//! Canonical point encoding
//!
//! Points are serialized as `<curve-name> ':' <compressed-point-bytes>`.
//! Decoding reads the curve tag first and dispatches on it, so a point from a
//! curve the crate does not know is rejected instead of being misread.

use crate::crypto::suite::CurveId;
use crate::error::{Error, Result};
use secp256kfun::prelude::*;

/// Separator between the curve tag and the point bytes.
pub const SEPARATOR: u8 = b':';

/// Encode a point as `<curve-name>:<compressed bytes>`.
pub fn encode_point(curve: CurveId, point: &Point) -> Vec<u8> {
    let name = curve.name().as_bytes();
    let compressed = match curve {
        CurveId::Secp256k1 => point.to_bytes(),
    };

    let mut output = Vec::with_capacity(name.len() + 1 + compressed.len());
    output.extend_from_slice(name);
    output.push(SEPARATOR);
    output.extend_from_slice(&compressed);
    output
}

/// Decode a canonically encoded point, returning the curve it was tagged with.
pub fn decode_point(bytes: &[u8]) -> Result<(CurveId, Point)> {
    let separator = bytes
        .iter()
        .position(|b| *b == SEPARATOR)
        .ok_or_else(|| Error::Serialization("missing curve tag separator".into()))?;

    let tag = std::str::from_utf8(&bytes[..separator])
        .map_err(|_| Error::Serialization("curve tag is not valid UTF-8".into()))?;
    let curve = CurveId::from_name(tag)
        .ok_or_else(|| Error::Serialization(format!("unknown curve tag '{}'", tag)))?;

    let expected_len = separator + 1 + curve.compressed_point_len();
    if bytes.len() < expected_len {
        return Err(Error::Serialization(format!(
            "encoded {} point too short: {} bytes, need {}",
            curve,
            bytes.len(),
            expected_len
        )));
    }
    if bytes.len() > expected_len {
        return Err(Error::Serialization(format!(
            "trailing bytes after encoded {} point",
            curve
        )));
    }

    let point_bytes = &bytes[separator + 1..];
    let point = match curve {
        CurveId::Secp256k1 => {
            let compressed: [u8; 33] = point_bytes
                .try_into()
                .map_err(|_| Error::Serialization("invalid point length".into()))?;
            Point::from_bytes(compressed)
                .ok_or_else(|| Error::Serialization("bytes are not a valid secp256k1 point".into()))?
        }
    };

    Ok((curve, point))
}

/// Decode a point and require it to be tagged with `curve`.
pub fn decode_point_on(curve: CurveId, bytes: &[u8]) -> Result<Point> {
    let (tagged, point) = decode_point(bytes)?;
    if tagged != curve {
        return Err(Error::Serialization(format!(
            "expected a {} point, got a {} point",
            curve, tagged
        )));
    }
    Ok(point)
}

/// SEC1 uncompressed encoding (0x04 || x || y), used to seed child keys.
pub fn encode_uncompressed(point: &Point) -> [u8; 65] {
    point.to_bytes_uncompressed()
}
