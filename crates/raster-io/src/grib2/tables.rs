//! WMO/NCEP code tables used to describe GRIB2 fields.

/// Short name, description and units of a parameter (Code Table 4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub short_name: String,
    pub description: &'static str,
    pub units: &'static str,
}

pub fn parameter(discipline: u8, category: u8, number: u8) -> Parameter {
    let known = |short: &str, description, units| Parameter {
        short_name: short.to_string(),
        description,
        units,
    };
    match (discipline, category, number) {
        // Temperature
        (0, 0, 0) => known("TMP", "Temperature", "K"),
        (0, 0, 2) => known("POT", "Potential temperature", "K"),
        (0, 0, 6) => known("DPT", "Dew point temperature", "K"),
        // Moisture
        (0, 1, 0) => known("SPFH", "Specific humidity", "kg/kg"),
        (0, 1, 1) => known("RH", "Relative humidity", "%"),
        (0, 1, 3) => known("PWAT", "Precipitable water", "kg/m^2"),
        (0, 1, 7) => known("PRATE", "Precipitation rate", "kg/m^2/s"),
        (0, 1, 8) => known("APCP", "Total precipitation", "kg/m^2"),
        // Momentum
        (0, 2, 0) => known("WDIR", "Wind direction", "deg"),
        (0, 2, 1) => known("WIND", "Wind speed", "m/s"),
        (0, 2, 2) => known("UGRD", "U-component of wind", "m/s"),
        (0, 2, 3) => known("VGRD", "V-component of wind", "m/s"),
        (0, 2, 8) => known("VVEL", "Vertical velocity (pressure)", "Pa/s"),
        (0, 2, 22) => known("GUST", "Wind speed (gust)", "m/s"),
        // Mass
        (0, 3, 0) => known("PRES", "Pressure", "Pa"),
        (0, 3, 1) => known("PRMSL", "Pressure reduced to MSL", "Pa"),
        (0, 3, 5) => known("HGT", "Geopotential height", "gpm"),
        // Cloud
        (0, 6, 1) => known("TCDC", "Total cloud cover", "%"),
        // Stability
        (0, 7, 6) => known("CAPE", "Convective available potential energy", "J/kg"),
        (0, 7, 7) => known("CIN", "Convective inhibition", "J/kg"),
        // Physical atmospheric properties
        (0, 19, 0) => known("VIS", "Visibility", "m"),
        // Oceanographic
        (10, 0, 3) => known("HTSGW", "Significant height of combined wind waves and swell", "m"),
        (10, 3, 0) => known("WTMP", "Water temperature", "K"),
        _ => Parameter {
            short_name: format!("P{}_{}_{}", discipline, category, number),
            description: "unknown",
            units: "",
        },
    }
}

/// Human-readable level (Code Table 4.5).
pub fn level_description(level_type: u8, value: f64) -> String {
    match level_type {
        1 => "surface".to_string(),
        2 => "cloud base".to_string(),
        3 => "cloud top".to_string(),
        4 => "0C isotherm".to_string(),
        6 => "max wind".to_string(),
        7 => "tropopause".to_string(),
        8 => "top of atmosphere".to_string(),
        10 | 200 => "entire atmosphere".to_string(),
        100 => format!("{} mb", value / 100.0),
        101 => "mean sea level".to_string(),
        102 => format!("{} m above MSL", value),
        103 => format!("{} m above ground", value),
        104 => format!("sigma level {}", value),
        105 => format!("hybrid level {}", value),
        106 => format!("{} m below surface", value),
        108 => format!("{} mb above ground", value / 100.0),
        220 => "planetary boundary layer".to_string(),
        _ => format!("level type {} value {}", level_type, value),
    }
}

/// Originating centre (Common Code Table C-11).
pub fn center_name(center: u16) -> &'static str {
    match center {
        7 => "US-NCEP",
        8 => "US-NWSTG",
        34 => "JMA",
        54 => "CMC",
        74 => "UK-Met",
        78 => "DWD",
        82 => "Norrkoping",
        85 => "Meteo-France",
        88 => "Oslo",
        98 => "ECMWF",
        161 => "US-NOAA-OAR",
        _ => "unknown",
    }
}

/// Seconds in one unit of Code Table 4.4, for the units we expect to meet.
pub fn time_unit_seconds(unit: u8) -> Option<i64> {
    match unit {
        0 => Some(60),
        1 => Some(3_600),
        2 => Some(86_400),
        10 => Some(3 * 3_600),
        11 => Some(6 * 3_600),
        12 => Some(12 * 3_600),
        13 => Some(1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_parameters() {
        assert_eq!(parameter(0, 0, 0).short_name, "TMP");
        assert_eq!(parameter(0, 2, 2).units, "m/s");
        assert_eq!(parameter(0, 250, 1).short_name, "P0_250_1");
    }

    #[test]
    fn test_level_description() {
        assert_eq!(level_description(103, 2.0), "2 m above ground");
        assert_eq!(level_description(100, 50000.0), "500 mb");
        assert_eq!(level_description(1, 0.0), "surface");
    }
}
