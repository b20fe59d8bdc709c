// core/src/names.rs
// Kolonnenavn brukt i tabellene. Avledede navn bygges med delta/sqr/avg.

pub const TIME: &str = "time";
pub const DELTA_TIME: &str = "delta_time";

pub const DISTANCE: &str = "distance";
pub const SPEED: &str = "speed";
pub const ELEVATION: &str = "elevation";
pub const CADENCE: &str = "cadence";
pub const HEART_RATE: &str = "heart_rate";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const HEADING: &str = "heading";
pub const AIR_SPEED: &str = "air_speed";

pub const SPEED_2: &str = "speed_2";
pub const DELTA_SPEED_2: &str = "delta_speed_2";
pub const DELTA_ELEVATION: &str = "delta_elevation";
pub const DELTA_DISTANCE: &str = "delta_distance";
pub const AVG_AIR_SPEED_2: &str = "avg_air_speed_2";

pub const DELTA_ENERGY: &str = "delta_energy";
pub const LOSS: &str = "loss";
pub const POWER_ESTIMATE: &str = "power_estimate";
pub const ENERGY: &str = "energy";
pub const CDA: &str = "cda";
pub const CRR: &str = "crr";

pub const DETRENDED_HEART_RATE: &str = "detrended_heart_rate";
pub const PREDICTED_HEART_RATE: &str = "predicted_heart_rate";

// totaler / skalarer som leveres ut av pipeline
pub const ENERGY_ESTIMATE: &str = "energy_estimate";
pub const CALORIE_ESTIMATE: &str = "calorie_estimate";
pub const POWER_HR: &str = "power_hr";
pub const POWER_HR_LAG: &str = "power_hr_lag";
pub const WIND_SPEED: &str = "wind_speed";
pub const WIND_HEADING: &str = "wind_heading";

/// `speed` -> `delta_speed`
#[inline]
pub fn delta(name: &str) -> String {
    format!("delta_{name}")
}

/// `speed` -> `speed_2`
#[inline]
pub fn sqr(name: &str) -> String {
    format!("{name}_2")
}

/// `air_speed_2` -> `avg_air_speed_2`
#[inline]
pub fn avg(name: &str) -> String {
    format!("avg_{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_names_match_constants() {
        assert_eq!(delta(&sqr(SPEED)), DELTA_SPEED_2);
        assert_eq!(delta(ELEVATION), DELTA_ELEVATION);
        assert_eq!(avg(&sqr(AIR_SPEED)), AVG_AIR_SPEED_2);
    }
}
