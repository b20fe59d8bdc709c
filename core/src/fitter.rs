// core/src/fitter.rs
use crate::error::{PowerError, Result};
use crate::fit::Fit;
use crate::frame::Table;
use crate::heart_rate::{add_detrended_hr, add_modeled_hr, add_predicted_hr};
use crate::lag::measure_initial_scaling;
use crate::metrics::METRICS;
use crate::models::{Param, PowerModel};
use crate::names::{DETRENDED_HEART_RATE, PREDICTED_HEART_RATE};
use crate::physics::evaluate;
use crate::resample::median_dt;

/// Minste tillatte pulsforsinkelse (sek).
pub const MIN_DELAY: f64 = 1.0;

/// Ytre -> indre forsinkelse. Indre verdi er ubegrenset.
#[inline]
pub fn delay_forwards(delay: f64) -> f64 {
    delay - MIN_DELAY
}

/// Indre -> ytre forsinkelse; alltid >= MIN_DELAY.
#[inline]
pub fn delay_backwards(internal: f64) -> f64 {
    internal.abs() + MIN_DELAY
}

fn forwards(param: Param, value: f64) -> f64 {
    match param {
        Param::Delay => delay_forwards(value),
        _ => value,
    }
}

fn backwards(param: Param, value: f64) -> f64 {
    match param {
        Param::Delay => delay_backwards(value),
        _ => value,
    }
}

/// Negativ vindfart => snu retningen 180°; retning alltid i [0, 360).
#[must_use]
pub fn normalize_wind(model: PowerModel) -> PowerModel {
    let model = if model.wind_speed < 0.0 {
        model
            .with(Param::WindSpeed, -model.wind_speed)
            .with(Param::WindHeading, model.wind_heading + 180.0)
    } else {
        model
    };
    model.with(Param::WindHeading, model.wind_heading.rem_euclid(360.0))
}

/// Vindu (sek) -> antall rader ved steg `dt`.
#[inline]
pub fn window_rows(window: f64, dt: f64) -> usize {
    ((window / dt).round() as usize).max(1)
}

/// Full modell: effekt + modellert/detrendet puls.
pub fn evaluate_and_extend(table: &Table, model: &PowerModel, dt: f64) -> Result<Table> {
    let out = evaluate(table, model)?;
    add_modeled_hr(&out, window_rows(model.window, dt), model.slope, model.intercept, model.delay / dt)
}

/// Som `evaluate_and_extend`, men målt puls må allerede være detrendet
/// (`detrended_heart_rate` finnes i `table`).
pub fn evaluate_and_predict(table: &Table, model: &PowerModel, dt: f64) -> Result<Table> {
    let out = evaluate(table, model)?;
    add_predicted_hr(&out, window_rows(model.window, dt), model.slope, model.intercept, model.delay / dt)
}

/// Tilpass parametrene i `vary` slik at modellert puls følger målt puls.
///
/// Tabellen må være omsamplet og derivert (se `pipeline::prepare`).
/// Returnerer et nytt parametersett; `model` endres ikke.
pub fn fit_power(table: &Table, model: &PowerModel, vary: &[Param]) -> Result<PowerModel> {
    log::debug!("fit power: varying {:?}", vary);
    if vary.is_empty() {
        return Err(PowerError::Config("no parameters to vary - fitting disabled".into()));
    }
    METRICS.fits_total.inc();

    let evaluated = evaluate(table, model)?;
    let dt = median_dt(&evaluated)?;
    let seed = measure_initial_scaling(&evaluated)?;
    let model = model
        .with(Param::Slope, seed.slope)
        .with(Param::Intercept, seed.intercept)
        .with(Param::Delay, seed.delay);
    log::debug!("fit power: initial model {:?}", model);

    let fit = Fit::<PowerModel>::new(DETRENDED_HEART_RATE, PREDICTED_HEART_RATE, vary)
        .with_transforms(forwards, backwards);
    let fitted = if vary.contains(&Param::Window) {
        fit.run(table, &model, |t, m| evaluate_and_extend(t, m, dt))?
    } else {
        // fast vindu: målt puls detrendes én gang
        let observed = add_detrended_hr(table, window_rows(model.window, dt))?;
        fit.run(&observed, &model, |t, m| evaluate_and_predict(t, m, dt))?
    };
    log::debug!("fit power: model before fixing {:?}", fitted);

    let fitted = normalize_wind(fitted);
    log::debug!("fit power: final model {:?}", fitted);
    Ok(fitted)
}
