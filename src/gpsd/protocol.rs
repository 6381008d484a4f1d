//! # gpsd JSON Protocol Types
//!
//! Report objects streamed by gpsd after a `?WATCH` command. Only the `TPV`
//! and `SKY` classes are interpreted; every other class (`VERSION`,
//! `DEVICES`, `WATCH`, `PPS`, ...) deserializes to [`GpsdReport::Other`].
//!
//! All fields are optional because gpsd omits anything it does not know.

use serde::Deserialize;

/// Default gpsd port
pub const GPSD_DEFAULT_PORT: u16 = 2947;

/// Command enabling the JSON report stream
pub const WATCH_COMMAND: &str = "?WATCH={\"enable\":true,\"json\":true};\n";

/// Metres per second to miles per hour
pub const MPS_TO_MPH: f64 = 2.237;

/// Longest line accepted from gpsd before it is discarded
pub const MAX_LINE_LENGTH: usize = 16 * 1024;

/// One decoded gpsd report
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "class")]
pub enum GpsdReport {
    #[serde(rename = "TPV")]
    Tpv(TpvReport),
    #[serde(rename = "SKY")]
    Sky(SkyReport),
    #[serde(other)]
    Other,
}

/// Time-position-velocity report
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TpvReport {
    /// 0 unknown, 1 no fix, 2 2D, 3 3D
    pub mode: Option<i64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Deprecated by gpsd 3.20 in favour of `altHAE`/`altMSL`
    pub alt: Option<f64>,
    #[serde(rename = "altMSL")]
    pub alt_msl: Option<f64>,
    #[serde(rename = "altHAE")]
    pub alt_hae: Option<f64>,
    /// Ground speed, m/s
    pub speed: Option<f64>,
}

impl TpvReport {
    /// Altitude in metres, preferring the legacy `alt` field
    pub fn altitude(&self) -> Option<f64> {
        self.alt.or(self.alt_msl).or(self.alt_hae)
    }

    /// Ground speed in mph
    pub fn speed_mph(&self) -> Option<f64> {
        self.speed.map(|s| s * MPS_TO_MPH)
    }
}

/// Sky view report
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SkyReport {
    pub satellites: Option<Vec<Satellite>>,
    #[serde(rename = "nSat")]
    pub n_sat: Option<u32>,
    #[serde(rename = "uSat")]
    pub u_sat: Option<u32>,
}

impl SkyReport {
    /// Satellites seen and used
    ///
    /// Counts the satellite list when present, otherwise falls back to the
    /// `nSat`/`uSat` summary fields.
    pub fn counts(&self) -> (u32, u32) {
        match &self.satellites {
            Some(list) => {
                let used = list.iter().filter(|s| s.used).count();
                (list.len() as u32, used as u32)
            }
            None => (self.n_sat.unwrap_or(0), self.u_sat.unwrap_or(0)),
        }
    }
}

/// One entry of a `SKY` satellite list
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Satellite {
    #[serde(rename = "PRN")]
    pub prn: Option<i64>,
    /// Elevation, degrees
    pub el: Option<f64>,
    /// Azimuth, degrees
    pub az: Option<f64>,
    /// Signal strength, dB-Hz
    pub ss: Option<f64>,
    #[serde(default)]
    pub used: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tpv() {
        let line = r#"{"class":"TPV","device":"/dev/ttyACM0","mode":3,"time":"2024-05-01T12:00:00.000Z","lat":51.5,"lon":-0.12,"alt":35.2,"speed":10.0}"#;
        match serde_json::from_str::<GpsdReport>(line).unwrap() {
            GpsdReport::Tpv(tpv) => {
                assert_eq!(tpv.mode, Some(3));
                assert_eq!(tpv.lat, Some(51.5));
                assert_eq!(tpv.lon, Some(-0.12));
                assert_eq!(tpv.altitude(), Some(35.2));
                assert!((tpv.speed_mph().unwrap() - 22.37).abs() < 1e-9);
            }
            other => panic!("Expected TPV, got: {:?}", other),
        }
    }

    #[test]
    fn test_tpv_altitude_fallbacks() {
        let msl: TpvReport = serde_json::from_str(r#"{"altMSL":12.0,"altHAE":60.0}"#).unwrap();
        assert_eq!(msl.altitude(), Some(12.0));

        let hae: TpvReport = serde_json::from_str(r#"{"altHAE":60.0}"#).unwrap();
        assert_eq!(hae.altitude(), Some(60.0));

        let none: TpvReport = serde_json::from_str(r#"{"mode":1}"#).unwrap();
        assert_eq!(none.altitude(), None);
        assert_eq!(none.speed_mph(), None);
    }

    #[test]
    fn test_parse_sky_with_satellites() {
        let line = r#"{"class":"SKY","satellites":[
            {"PRN":5,"el":45.0,"az":120.0,"ss":38.0,"used":true},
            {"PRN":12,"el":10.0,"az":300.0,"ss":20.0,"used":false},
            {"PRN":29,"el":70.0,"az":10.0,"ss":42.0,"used":true}
        ]}"#;
        match serde_json::from_str::<GpsdReport>(line).unwrap() {
            GpsdReport::Sky(sky) => {
                assert_eq!(sky.counts(), (3, 2));
                let list = sky.satellites.unwrap();
                assert_eq!(list[0].prn, Some(5));
                assert!(list[0].used);
            }
            other => panic!("Expected SKY, got: {:?}", other),
        }
    }

    #[test]
    fn test_sky_summary_counts() {
        let sky: SkyReport = serde_json::from_str(r#"{"nSat":9,"uSat":6}"#).unwrap();
        assert_eq!(sky.counts(), (9, 6));

        let empty: SkyReport = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.counts(), (0, 0));
    }

    #[test]
    fn test_other_classes() {
        let line = r#"{"class":"VERSION","release":"3.22","rev":"3.22","proto_major":3,"proto_minor":14}"#;
        assert_eq!(serde_json::from_str::<GpsdReport>(line).unwrap(), GpsdReport::Other);
    }

    #[test]
    fn test_malformed_line_is_error() {
        assert!(serde_json::from_str::<GpsdReport>("{\"class\":\"TPV\",").is_err());
        assert!(serde_json::from_str::<GpsdReport>("{\"mode\":3}").is_err());
    }
}
