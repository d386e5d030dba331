//! Location string decoding
//!
//! Place locations arrive as `"<label>:<lat>,<lon>"`, e.g. `"geo:40.7128,-74.0060"`.

use crate::error::TimelineError;

/// Decode an encoded location string into `(latitude, longitude)`.
///
/// An absent or empty string decodes to `(None, None)`. Anything else must
/// contain exactly one `:` and exactly one `,` after it, with both halves
/// parsing as floats; otherwise the string is malformed.
pub fn extract_lat_lon(
    location: Option<&str>,
) -> Result<(Option<f64>, Option<f64>), TimelineError> {
    let location = match location {
        Some(s) if !s.is_empty() => s,
        _ => return Ok((None, None)),
    };

    let malformed = || TimelineError::MalformedLocation(location.to_string());

    let mut parts = location.split(':');
    let (Some(_label), Some(coords), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(malformed());
    };

    let mut coords = coords.split(',');
    let (Some(lat), Some(lon), None) = (coords.next(), coords.next(), coords.next()) else {
        return Err(malformed());
    };

    let lat = lat.trim().parse::<f64>().map_err(|_| malformed())?;
    let lon = lon.trim().parse::<f64>().map_err(|_| malformed())?;

    Ok((Some(lat), Some(lon)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_lat_lon_labelled() {
        let (lat, lon) = extract_lat_lon(Some("label:12.5,-71.25")).unwrap();
        assert_eq!(lat, Some(12.5));
        assert_eq!(lon, Some(-71.25));
    }

    #[test]
    fn test_extract_lat_lon_geo_prefix() {
        let (lat, lon) = extract_lat_lon(Some("geo:40.712800,-74.006000")).unwrap();
        assert!((lat.unwrap() - 40.7128).abs() < 1e-9);
        assert!((lon.unwrap() + 74.006).abs() < 1e-9);
    }

    #[test]
    fn test_extract_lat_lon_absent() {
        assert_eq!(extract_lat_lon(None).unwrap(), (None, None));
        assert_eq!(extract_lat_lon(Some("")).unwrap(), (None, None));
    }

    #[test]
    fn test_extract_lat_lon_tolerates_spaces() {
        let (lat, lon) = extract_lat_lon(Some("geo: 1.5, 2.5")).unwrap();
        assert_eq!((lat, lon), (Some(1.5), Some(2.5)));
    }

    #[test]
    fn test_extract_lat_lon_malformed() {
        for bad in [
            "12.5,-71.25",
            "a:b:12.5,-71.25",
            "geo:12.5",
            "geo:1,2,3",
            "geo:north,south",
        ] {
            let err = extract_lat_lon(Some(bad)).unwrap_err();
            assert!(
                matches!(err, TimelineError::MalformedLocation(ref s) if s == bad),
                "expected malformed for {bad:?}, got {err:?}"
            );
        }
    }
}
