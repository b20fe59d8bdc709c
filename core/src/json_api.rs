// core/src/json_api.rs
// JSON inn, JSON ut. Samme funksjoner brukes av Python-modulen.
use serde_path_to_error as spte;

use crate::config::{parse_power_config, parse_vary};
use crate::error::Result;
use crate::fitter::fit_power;
use crate::frame::Table;
use crate::models::PowerModel;
use crate::physics::evaluate;
use crate::pipeline::{prepare, process_activity};

fn parse<T: serde::de::DeserializeOwned>(json_in: &str) -> Result<T> {
    let mut de = serde_json::Deserializer::from_str(json_in);
    Ok(spte::deserialize(&mut de)?)
}

/// Omsampler, deriverer og evaluerer modellen; returnerer hele tabellen.
pub fn evaluate_json(table_json: &str, model_json: &str) -> Result<String> {
    let table: Table = parse(table_json)?;
    let model: PowerModel = parse(model_json)?;
    let out = evaluate(&prepare(&table)?, &model)?;
    Ok(serde_json::to_string(&out)?)
}

/// Tilpasser parametrene i `vary` (fritekst, komma/mellomrom) og returnerer modellen.
pub fn fit_power_json(table_json: &str, model_json: &str, vary: &str) -> Result<String> {
    let table: Table = parse(table_json)?;
    let model: PowerModel = parse(model_json)?;
    let vary = parse_vary(vary)?;
    let fitted = fit_power(&prepare(&table)?, &model, &vary)?;
    Ok(serde_json::to_string(&fitted)?)
}

/// Hele aktiviteten. Kun en tabell som ikke kan leses gir feil; ugyldig
/// konfigurasjon logges og behandles som manglende.
pub fn process_activity_json(table_json: &str, config_json: Option<&str>) -> Result<String> {
    let table: Table = parse(table_json)?;
    let config = match config_json.map(parse_power_config) {
        Some(Ok(cfg)) => Some(cfg),
        Some(Err(e)) => {
            log::warn!("power configuration incorrect ({e})");
            None
        }
        None => None,
    };
    let out = process_activity(&table, config.as_ref());
    Ok(serde_json::to_string(&out)?)
}
