//! Decoder for the encoded polyline format used by directions lookups.
//!
//! Route geometry arrives as an encoded polyline: latitude/longitude deltas
//! at 1e-5 precision, zigzag-signed, packed into 5-bit groups with a
//! continuation bit at 0x20 and armored into printable ASCII with an offset
//! of 63. Decoding happens here at the API boundary; everything downstream
//! works with plain [`GeoPoint`] sequences.

use crate::error::LookupError;
use crate::GeoPoint;

const PRECISION: f64 = 1e5;

/// Decode an encoded polyline into an ordered sequence of points.
///
/// An empty string decodes to an empty path. Truncated chunks and characters
/// outside the armored range are reported as [`LookupError::Malformed`].
///
/// # Example
/// ```
/// use waypoint_matcher::polyline;
///
/// let path = polyline::decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
/// assert_eq!(path.len(), 3);
/// assert!((path[0].latitude - 38.5).abs() < 1e-9);
/// assert!((path[0].longitude + 120.2).abs() < 1e-9);
/// ```
pub fn decode(encoded: &str) -> Result<Vec<GeoPoint>, LookupError> {
    let mut points = Vec::new();
    let mut bytes = encoded.bytes();
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    loop {
        let d_lat = match next_delta(&mut bytes)? {
            Some(delta) => delta,
            None => break,
        };
        let d_lng = next_delta(&mut bytes)?.ok_or_else(|| {
            LookupError::Malformed("polyline ends mid-coordinate".to_string())
        })?;

        lat += d_lat;
        lng += d_lng;
        points.push(GeoPoint::new(lat as f64 / PRECISION, lng as f64 / PRECISION));
    }

    Ok(points)
}

/// Read one zigzag-encoded delta from the byte stream.
///
/// Returns `Ok(None)` at a clean end of input, i.e. before the first byte of
/// a chunk.
fn next_delta(bytes: &mut std::str::Bytes<'_>) -> Result<Option<i64>, LookupError> {
    let mut value: i64 = 0;
    let mut shift: u32 = 0;
    let mut started = false;

    for byte in bytes.by_ref() {
        if !(63..=126).contains(&byte) {
            return Err(LookupError::Malformed(format!(
                "invalid polyline character 0x{:02x}",
                byte
            )));
        }
        if shift >= 64 {
            return Err(LookupError::Malformed(
                "polyline chunk exceeds 64 bits".to_string(),
            ));
        }
        started = true;

        let chunk = (byte - 63) as i64;
        value |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk & 0x20 == 0 {
            let delta = if value & 1 != 0 { !(value >> 1) } else { value >> 1 };
            return Ok(Some(delta));
        }
    }

    if started {
        Err(LookupError::Malformed("polyline ends mid-chunk".to_string()))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_decode_reference_vector() {
        // Published reference example for the encoding
        let path = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();

        assert_eq!(path.len(), 3);
        assert!(approx_eq(path[0].latitude, 38.5));
        assert!(approx_eq(path[0].longitude, -120.2));
        assert!(approx_eq(path[1].latitude, 40.7));
        assert!(approx_eq(path[1].longitude, -120.95));
        assert!(approx_eq(path[2].latitude, 43.252));
        assert!(approx_eq(path[2].longitude, -126.453));
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_single_point() {
        let path = decode("_p~iF~ps|U").unwrap();
        assert_eq!(path.len(), 1);
        assert!(approx_eq(path[0].latitude, 38.5));
        assert!(approx_eq(path[0].longitude, -120.2));
    }

    #[test]
    fn test_decode_missing_longitude() {
        // A latitude delta with no following longitude delta
        let err = decode("_p~iF").unwrap_err();
        assert!(err.to_string().contains("mid-coordinate"));
    }

    #[test]
    fn test_decode_truncated_chunk() {
        // '_' has the continuation bit set, then the input ends
        let err = decode("_").unwrap_err();
        assert!(err.to_string().contains("mid-chunk"));
    }

    #[test]
    fn test_decode_invalid_character() {
        let err = decode("_p~iF~ps|U _ulL").unwrap_err();
        assert!(err.to_string().contains("invalid polyline character"));
    }
}
