use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PowerError;
use crate::fit::Parameters;

/// Parametre for kraft- og pulsmodellen.
///
/// Verdien endres aldri på stedet: `with` gir et nytt sett, og tilpasning
/// (`fit_power`) returnerer et nytt `PowerModel`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerModel {
    pub cda: f64,          // m²
    pub crr: f64,          // -
    pub slope: f64,        // bpm / W
    pub intercept: f64,    // bpm
    pub window: f64,       // sek, vindu for detrending
    pub delay: f64,        // sek, halveringstid puls
    pub m: f64,            // kg, rytter + sykkel
    pub wind_speed: f64,   // m/s
    pub wind_heading: f64, // grader
}

impl Default for PowerModel {
    fn default() -> Self {
        Self {
            cda: 0.0,
            crr: 0.0,
            slope: 0.0,
            intercept: 0.0,
            window: 60.0 * 60.0,
            delay: 40.0,
            m: 70.0,
            wind_speed: 0.0,
            wind_heading: 0.0,
        }
    }
}

/// Navn på en parameter i `PowerModel` (brukes i vary-lista).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    Cda,
    Crr,
    Slope,
    Intercept,
    Window,
    Delay,
    M,
    WindSpeed,
    WindHeading,
}

impl Param {
    pub const ALL: [Param; 9] = [
        Param::Cda,
        Param::Crr,
        Param::Slope,
        Param::Intercept,
        Param::Window,
        Param::Delay,
        Param::M,
        Param::WindSpeed,
        Param::WindHeading,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Param::Cda => "cda",
            Param::Crr => "crr",
            Param::Slope => "slope",
            Param::Intercept => "intercept",
            Param::Window => "window",
            Param::Delay => "delay",
            Param::M => "m",
            Param::WindSpeed => "wind_speed",
            Param::WindHeading => "wind_heading",
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Param {
    type Err = PowerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Param::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PowerError::Config(format!("unknown model parameter '{s}'")))
    }
}

impl PowerModel {
    pub fn get(&self, param: Param) -> f64 {
        match param {
            Param::Cda => self.cda,
            Param::Crr => self.crr,
            Param::Slope => self.slope,
            Param::Intercept => self.intercept,
            Param::Window => self.window,
            Param::Delay => self.delay,
            Param::M => self.m,
            Param::WindSpeed => self.wind_speed,
            Param::WindHeading => self.wind_heading,
        }
    }

    /// Kopi med én parameter endret.
    #[must_use]
    pub fn with(&self, param: Param, value: f64) -> Self {
        let mut next = *self;
        match param {
            Param::Cda => next.cda = value,
            Param::Crr => next.crr = value,
            Param::Slope => next.slope = value,
            Param::Intercept => next.intercept = value,
            Param::Window => next.window = value,
            Param::Delay => next.delay = value,
            Param::M => next.m = value,
            Param::WindSpeed => next.wind_speed = value,
            Param::WindHeading => next.wind_heading = value,
        }
        next
    }
}

impl Parameters for PowerModel {
    type Name = Param;

    fn get(&self, name: Param) -> f64 {
        PowerModel::get(self, name)
    }

    fn with(&self, name: Param, value: f64) -> Self {
        PowerModel::with(self, name, value)
    }
}
