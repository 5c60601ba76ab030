//! Encoded polyline codec.
//!
//! Implements the variable-length signed delta format: every coordinate is
//! scaled by `10^precision`, rounded, delta-encoded against the previous
//! point, zig-zag encoded and emitted as 5-bit groups offset by 63 with a
//! `0x20` continuation bit. Latitude comes before longitude in each pair.
//!
//! Decoding is strict. Input that ends in the middle of a value, ends after a
//! latitude without its longitude, or contains a byte outside the alphabet
//! fails with [`RouteError::PolylineDecode`] instead of returning a
//! shortened path. So do values whose running sum leaves the i64 range or
//! lands outside valid latitude/longitude.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteError};
use crate::geo_utils::{compute_bounds, compute_center, polyline_length};
use crate::{Bounds, GpsPoint};

/// Precision used by the classic format (1e5).
pub const DEFAULT_PRECISION: u32 = 5;

const MAX_PRECISION: u32 = 9;
const CONTINUATION: i64 = 0x20;
const CHUNK_MASK: i64 = 0x1f;
const OFFSET: u8 = 63;
// 12 chunks of 5 bits is already past what an i64 delta can carry
const MAX_SHIFT: u32 = 55;

/// Decode a precision-5 polyline.
///
/// # Example
/// ```
/// use route_planner::polyline;
///
/// let points = polyline::decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
/// assert_eq!(points.len(), 3);
/// assert!((points[0].latitude - 38.5).abs() < 1e-9);
/// assert!((points[0].longitude + 120.2).abs() < 1e-9);
///
/// assert!(polyline::decode("").unwrap().is_empty());
/// assert!(polyline::decode("_p~iF~ps|").is_err());
/// ```
pub fn decode(encoded: &str) -> Result<Vec<GpsPoint>> {
    decode_with_precision(encoded, DEFAULT_PRECISION)
}

/// Decode a polyline encoded with `10^precision` scaling.
pub fn decode_with_precision(encoded: &str, precision: u32) -> Result<Vec<GpsPoint>> {
    let factor = scale_factor(precision)?;
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut points = Vec::with_capacity(bytes.len() / 4);

    while index < bytes.len() {
        let start = index;
        lat = accumulate(lat, next_value(bytes, &mut index)?, start)?;
        if index >= bytes.len() {
            return Err(RouteError::PolylineDecode {
                position: index,
                message: "latitude without a longitude".to_string(),
            });
        }
        lng = accumulate(lng, next_value(bytes, &mut index)?, start)?;

        let point = GpsPoint::new(lat as f64 / factor, lng as f64 / factor);
        if !point.is_valid() {
            return Err(out_of_range(start));
        }
        points.push(point);
    }

    Ok(points)
}

/// Encode points as a precision-5 polyline.
///
/// Fails when a point is non-finite or outside the valid lat/lng range.
pub fn encode(points: &[GpsPoint]) -> Result<String> {
    encode_with_precision(points, DEFAULT_PRECISION)
}

/// Encode points with `10^precision` scaling.
pub fn encode_with_precision(points: &[GpsPoint], precision: u32) -> Result<String> {
    let factor = scale_factor(precision)?;
    let mut out = String::with_capacity(points.len() * 8);
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for p in points {
        p.validate()?;
        // |coordinate| <= 180 and factor <= 1e9, so the scaled values and
        // their deltas stay far inside i64
        let lat = (p.latitude * factor).round() as i64;
        let lng = (p.longitude * factor).round() as i64;
        push_value(&mut out, lat - prev_lat);
        push_value(&mut out, lng - prev_lng);
        prev_lat = lat;
        prev_lng = lng;
    }

    Ok(out)
}

fn out_of_range(position: usize) -> RouteError {
    RouteError::PolylineDecode {
        position,
        message: "coordinate out of range".to_string(),
    }
}

fn accumulate(total: i64, delta: i64, position: usize) -> Result<i64> {
    total
        .checked_add(delta)
        .ok_or_else(|| out_of_range(position))
}

fn scale_factor(precision: u32) -> Result<f64> {
    if precision > MAX_PRECISION {
        return Err(RouteError::Config {
            message: format!(
                "polyline precision {} out of range (max {})",
                precision, MAX_PRECISION
            ),
        });
    }
    Ok(10f64.powi(precision as i32))
}

fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;

    loop {
        let byte = *bytes.get(*index).ok_or_else(|| RouteError::PolylineDecode {
            position: *index,
            message: "input ends inside a value".to_string(),
        })?;
        if !(OFFSET..=OFFSET + 63).contains(&byte) {
            return Err(RouteError::PolylineDecode {
                position: *index,
                message: format!("unexpected character {:?}", byte as char),
            });
        }
        if shift > MAX_SHIFT {
            return Err(RouteError::PolylineDecode {
                position: *index,
                message: "value too long".to_string(),
            });
        }

        let chunk = (byte - OFFSET) as i64;
        *index += 1;
        result |= (chunk & CHUNK_MASK) << shift;
        shift += 5;

        if chunk < CONTINUATION {
            break;
        }
    }

    // zig-zag
    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

fn push_value(out: &mut String, delta: i64) {
    let mut value = if delta < 0 { !(delta << 1) } else { delta << 1 };
    while value >= CONTINUATION {
        out.push(((CONTINUATION | (value & CHUNK_MASK)) as u8 + OFFSET) as char);
        value >>= 5;
    }
    out.push((value as u8 + OFFSET) as char);
}

/// A previously recorded path brought in from its encoded form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedPath {
    pub points: Vec<GpsPoint>,
    /// Arithmetic centroid, (0, 0) for an empty path
    pub centroid: GpsPoint,
    /// Bounding box, degenerate at (0, 0) for an empty path
    pub bounds: Bounds,
    /// Haversine length in meters
    pub length_m: f64,
}

impl ImportedPath {
    /// Decode a precision-5 polyline and derive its summary values.
    pub fn from_encoded(encoded: &str) -> Result<Self> {
        Self::from_encoded_with_precision(encoded, DEFAULT_PRECISION)
    }

    pub fn from_encoded_with_precision(encoded: &str, precision: u32) -> Result<Self> {
        let points = decode_with_precision(encoded, precision)?;
        debug!("[PolylineCodec] Imported path with {} points", points.len());
        Ok(Self::from_points(points))
    }

    pub fn from_points(points: Vec<GpsPoint>) -> Self {
        Self {
            centroid: compute_center(&points),
            bounds: compute_bounds(&points),
            length_m: polyline_length(&points),
            points,
        }
    }
}
