// core/src/config.rs
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_path_to_error as spte;

use crate::error::{PowerError, Result};
use crate::models::{Param, PowerModel};
use crate::physics::CALORIC_EFF_DEFAULT;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bike {
    pub cda: f64,
    pub crr: f64,
    pub weight: f64, // kg
}

impl Default for Bike {
    fn default() -> Self {
        Self { cda: 0.42, crr: 0.0055, weight: 12.0 }
    }
}

fn default_rider_weight() -> f64 {
    64.0
}

fn default_caloric_eff() -> f64 {
    CALORIC_EFF_DEFAULT
}

/// Parameterbunt for kraftberegning (sykkel, rytter, og hva som skal tilpasses).
///
/// ```json
/// {"bike": {"cda": 0.42, "crr": 0.0055, "weight": 12},
///  "rider_weight": 64, "vary": "wind_speed, wind_heading, slope, delay"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerConfig {
    pub bike: Bike,
    #[serde(default = "default_rider_weight")]
    pub rider_weight: f64,
    /// Fritekst: parameternavn skilt med komma og/eller mellomrom. Tom = ingen tilpasning.
    #[serde(default)]
    pub vary: String,
    #[serde(default = "default_caloric_eff")]
    pub caloric_eff: f64,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            bike: Bike::default(),
            rider_weight: default_rider_weight(),
            vary: String::new(),
            caloric_eff: default_caloric_eff(),
        }
    }
}

impl PowerConfig {
    /// Total masse (kg) = rytter + sykkel.
    #[inline]
    pub fn total_mass(&self) -> f64 {
        self.bike.weight + self.rider_weight
    }

    /// Parametre som skal tilpasses; ukjente navn er en konfigurasjonsfeil.
    pub fn varying(&self) -> Result<Vec<Param>> {
        parse_vary(&self.vary)
    }

    /// Modell for enkel (ikke-tilpasset) effekt: ingen vind.
    pub fn basic_model(&self) -> PowerModel {
        PowerModel {
            cda: self.bike.cda,
            crr: self.bike.crr,
            m: self.total_mass(),
            ..PowerModel::default()
        }
    }

    /// Startmodell for tilpasning: moderat vind fra sør så optimeringen
    /// ikke starter i et symmetripunkt.
    pub fn initial_model(&self) -> PowerModel {
        PowerModel { wind_speed: 10.0, wind_heading: 180.0, ..self.basic_model() }
    }

    fn validate(self) -> Result<Self> {
        let values = [
            ("bike.cda", self.bike.cda),
            ("bike.crr", self.bike.crr),
            ("bike.weight", self.bike.weight),
            ("rider_weight", self.rider_weight),
        ];
        for (name, v) in values {
            if !v.is_finite() || v < 0.0 {
                return Err(PowerError::Config(format!("{name} must be a non-negative number, got {v}")));
            }
        }
        if self.total_mass() <= 0.0 {
            return Err(PowerError::Config("total mass must be positive".into()));
        }
        if !(self.caloric_eff > 0.0 && self.caloric_eff <= 1.0) {
            return Err(PowerError::Config(format!("caloric_eff must be in (0, 1], got {}", self.caloric_eff)));
        }
        self.varying()?;
        Ok(self)
    }
}

/// Fritekst vary-liste -> parametre, f.eks. "wind_speed, wind_heading slope".
pub fn parse_vary(vary: &str) -> Result<Vec<Param>> {
    vary.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

/// Parse og valider en parameterbunt (JSON). Feil inkluderer JSON-stien.
pub fn parse_power_config(json: &str) -> Result<PowerConfig> {
    let mut de = serde_json::Deserializer::from_str(json);
    let cfg: PowerConfig = spte::deserialize(&mut de)?;
    cfg.validate()
}

/// Leser parameterbunt fra disk.
pub fn load_power_config(path: impl AsRef<Path>) -> anyhow::Result<PowerConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading power config {}", path.display()))?;
    let cfg = parse_power_config(&contents)
        .with_context(|| format!("parsing power config {}", path.display()))?;
    log::info!("power config loaded from {} (vary='{}')", path.display(), cfg.vary);
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vary_list_is_split_on_commas_and_spaces() {
        let cfg = PowerConfig { vary: " wind_speed,wind_heading  slope, delay ".into(), ..Default::default() };
        assert_eq!(
            cfg.varying().unwrap(),
            vec![Param::WindSpeed, Param::WindHeading, Param::Slope, Param::Delay]
        );
        assert!(PowerConfig::default().varying().unwrap().is_empty());
    }

    #[test]
    fn unknown_vary_name_is_config_error() {
        let err = parse_power_config(r#"{"bike": {"cda": 0.4, "crr": 0.005, "weight": 10}, "vary": "slope, cadence"}"#)
            .unwrap_err();
        assert!(matches!(err, PowerError::Config(_)), "{err}");
    }

    #[test]
    fn parse_error_reports_json_path() {
        let err = parse_power_config(r#"{"bike": {"cda": "fast", "crr": 0.005, "weight": 10}}"#).unwrap_err();
        assert!(err.to_string().contains("bike.cda"), "{err}");
    }

    #[test]
    fn defaults_and_models() {
        let cfg = parse_power_config(r#"{"bike": {"cda": 0.3, "crr": 0.004, "weight": 8}}"#).unwrap();
        assert_eq!(cfg.rider_weight, 64.0);
        assert_eq!(cfg.total_mass(), 72.0);
        let m = cfg.initial_model();
        assert_eq!((m.cda, m.crr, m.m), (0.3, 0.004, 72.0));
        assert_eq!((m.wind_speed, m.wind_heading), (10.0, 180.0));
        assert_eq!(cfg.basic_model().wind_speed, 0.0);
    }
}
