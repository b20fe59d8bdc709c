// core/src/lib.rs
//! Effektestimat fra turdata: energibudsjett + tapsmodell, og (valgfritt)
//! tilpasning av modellparametre mot målt puls.

pub mod config;
pub mod differentials;
pub mod error;
pub mod fit;
pub mod fitter;
pub mod frame;
pub mod heart_rate;
pub mod json_api;
pub mod lag;
pub mod metrics;
pub mod models;
pub mod names;
pub mod physics;
pub mod pipeline;
pub mod resample;

#[cfg(feature = "python")]
mod py;

pub use config::{load_power_config, parse_power_config, Bike, PowerConfig};
pub use differentials::{add_differentials, differentiate, mean_square_linear};
pub use error::PowerError;
pub use fitter::{fit_power, normalize_wind, MIN_DELAY};
pub use frame::Table;
pub use heart_rate::add_modeled_hr;
pub use json_api::{evaluate_json, fit_power_json, process_activity_json};
pub use lag::{measure_initial_delay, measure_initial_scaling, InitialScaling};
pub use models::{Param, PowerModel};
pub use physics::{
    add_air_speed, add_cda_estimate, add_crr_estimate, add_energy_budget, add_loss_estimate,
    add_power_estimate, evaluate,
};
pub use pipeline::{process_activity, ActivityOutput, StatisticRecord, Summary, Units};
pub use resample::{linear_resample, median_dt, ResampleOptions};
