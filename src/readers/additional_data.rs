//! Extractors for tagged sections of the ISD additional-data tail.
//!
//! Each section starts with a three-character tag; values sit at fixed
//! offsets from the tag. All extractors return `None` for a missing tag, a
//! tail too short to hold the value, a non-numeric value, or a sentinel.

const SKY_COVER_SENTINEL: f64 = 99.0;
const SOLAR_ANGLE_SENTINEL: f64 = 9999.0;
const SOLAR_ANGLE_SCALE: f64 = 10.0;
const HUMIDITY_SENTINEL: f64 = 999.0;

fn tagged_value(data: &str, tag: &str, start: usize, end: usize, scale: f64, sentinel: f64) -> Option<f64> {
    let loc = data.find(tag)?;
    let raw = data.get(loc + start..loc + end)?.trim();
    let value: f64 = raw.parse().ok()?;
    if value == sentinel {
        None
    } else {
        Some(value / scale)
    }
}

/// `GF1` total sky cover, on the source's 0-20 coverage scale.
pub fn total_sky_cover(data: &str) -> Option<f64> {
    tagged_value(data, "GF1", 3, 5, 1.0, SKY_COVER_SENTINEL)
}

/// `GF1` opaque sky cover, same 0-20 scale.
pub fn opaque_sky_cover(data: &str) -> Option<f64> {
    tagged_value(data, "GF1", 5, 7, 1.0, SKY_COVER_SENTINEL)
}

/// `GQ1` solar zenith angle, degrees.
pub fn solar_zenith(data: &str) -> Option<f64> {
    tagged_value(data, "GQ1", 7, 11, SOLAR_ANGLE_SCALE, SOLAR_ANGLE_SENTINEL)
}

/// `GQ1` solar azimuth angle, degrees.
pub fn solar_azimuth(data: &str) -> Option<f64> {
    tagged_value(data, "GQ1", 12, 16, SOLAR_ANGLE_SCALE, SOLAR_ANGLE_SENTINEL)
}

/// `RH1` relative humidity, percent.
pub fn relative_humidity(data: &str) -> Option<f64> {
    tagged_value(data, "RH1", 7, 10, 1.0, HUMIDITY_SENTINEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gf1_sky_cover() {
        let data = "ADDAA101000095GF108991081999009001999999MA1101861999999";
        assert_eq!(total_sky_cover(data), Some(8.0));
        assert_eq!(opaque_sky_cover(data), None);
        assert_eq!(opaque_sky_cover("GF10402"), Some(2.0));
        assert_eq!(total_sky_cover("GF19999"), None);
    }

    #[test]
    fn test_missing_tag() {
        let data = "ADDAA101000095MA1101861999999";
        assert_eq!(total_sky_cover(data), None);
        assert_eq!(solar_zenith(data), None);
        assert_eq!(relative_humidity(data), None);
    }

    #[test]
    fn test_short_tail() {
        assert_eq!(total_sky_cover("GF1"), None);
        assert_eq!(solar_azimuth("GQ10060"), None);
    }

    #[test]
    fn test_gq1_solar_angles() {
        let data = "GQ100601231104511";
        assert_eq!(solar_zenith(data), Some(123.1));
        assert_eq!(solar_azimuth(data), Some(45.1));
        assert_eq!(solar_zenith("GQ1006099999999999"), None);
    }

    #[test]
    fn test_rh1_humidity() {
        assert_eq!(relative_humidity("RH1024M0851"), Some(85.0));
        assert_eq!(relative_humidity("RH1024M9991"), None);
        assert_eq!(relative_humidity("RH3024M0851"), None);
    }
}
