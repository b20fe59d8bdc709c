// core/tests/test_fit_power.rs
// Puls generert fra selve modellen: tilpasningen skal finne parametrene igjen.
mod common;

use common::{approx, loop_ride, start, with_heart_rate};
use ridepower_core::fit::{sum_squared_residuals, Fit};
use ridepower_core::fitter::{evaluate_and_extend, evaluate_and_predict, window_rows};
use ridepower_core::heart_rate::{add_detrended_hr, ewm_mean};
use ridepower_core::names::{
    DETRENDED_HEART_RATE, HEART_RATE, POWER_ESTIMATE, PREDICTED_HEART_RATE,
};
use ridepower_core::pipeline::prepare;
use ridepower_core::{
    add_modeled_hr, evaluate, fit_power, measure_initial_scaling, normalize_wind, Bike, Param,
    PowerConfig, PowerError, PowerModel, Table,
};

/// Deterministisk "støy" (LCG) så korrelasjonen har en entydig topp.
fn jagged_power(n: usize) -> Vec<Option<f64>> {
    let mut state: u64 = 12345;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            Some(100.0 + ((state >> 33) % 200) as f64)
        })
        .collect()
}

#[test]
fn exact_linear_heart_rate_is_matched_without_delay() {
    let n = 200;
    let power = jagged_power(n);
    let hr: Vec<Option<f64>> = power.iter().map(|p| p.map(|p| 0.25 * p + 70.0)).collect();
    let t = Table::new(start(), (0..n).map(|i| i as f64).collect())
        .unwrap()
        .with_column(POWER_ESTIMATE, power)
        .unwrap()
        .with_column(HEART_RATE, hr)
        .unwrap();

    let seed = measure_initial_scaling(&t).unwrap();
    assert_eq!(seed.delay, 0.0);
    assert!(approx(seed.slope, 0.25, 1e-9), "{seed:?}");
    assert!(approx(seed.intercept, 70.0, 1e-6), "{seed:?}");

    // halveringstid 0 rader => ingen glatting; modell og måling er like
    let out = add_modeled_hr(&t, 30, 0.25, 70.0, 0.0).unwrap();
    let ssr = sum_squared_residuals(&out, DETRENDED_HEART_RATE, PREDICTED_HEART_RATE).unwrap();
    assert!(ssr < 1e-12, "{ssr}");
}

#[test]
fn heart_rate_leading_power_is_rejected() {
    let n = 200;
    let power = jagged_power(n);
    // puls 5 s *før* effekten
    let hr: Vec<Option<f64>> = (0..n).map(|i| power.get(i + 5).copied().flatten().map(|p| 0.3 * p + 60.0)).collect();
    let t = Table::new(start(), (0..n).map(|i| i as f64).collect())
        .unwrap()
        .with_column(POWER_ESTIMATE, power)
        .unwrap()
        .with_column(HEART_RATE, hr)
        .unwrap();
    let err = measure_initial_scaling(&t).unwrap_err();
    assert!(matches!(err, PowerError::NegativeDelay(d) if d == -5.0), "{err}");
    assert!(err.is_recoverable());
}

const TRUE_SLOPE: f64 = 0.3;
const TRUE_DELAY: f64 = 10.0;

/// Tur + puls som følger modellen eksakt (halveringstid TRUE_DELAY s).
fn synthetic_ride(model: &PowerModel) -> Table {
    let ldf = prepare(&loop_ride(600, 200.0)).unwrap();
    let power = evaluate(&ldf, model).unwrap().column(POWER_ESTIMATE).unwrap().to_vec();
    let drive: Vec<Option<f64>> = power.iter().map(|p| p.map(|p| TRUE_SLOPE * p + 60.0)).collect();
    with_heart_rate(&ldf, ewm_mean(&drive, TRUE_DELAY))
}

#[test]
fn fit_recovers_slope_and_delay() {
    let model = PowerModel { cda: 0.3, crr: 0.004, m: 75.0, ..Default::default() };
    let ldf = synthetic_ride(&model);

    let fitted = fit_power(&ldf, &model, &[Param::Slope, Param::Delay]).unwrap();
    assert!(approx(fitted.slope, TRUE_SLOPE, 0.01), "{fitted:?}");
    assert!(approx(fitted.delay, TRUE_DELAY, 0.5), "{fitted:?}");
    // ikke-varierte parametre er urørt
    assert_eq!((fitted.cda, fitted.crr, fitted.m), (0.3, 0.004, 75.0));
    assert_eq!(fitted.wind_speed, 0.0);
}

#[test]
fn fit_without_parameters_is_a_config_error() {
    let model = PowerModel { cda: 0.3, crr: 0.004, m: 75.0, ..Default::default() };
    let ldf = synthetic_ride(&model);
    let err = fit_power(&ldf, &model, &[]).unwrap_err();
    assert!(matches!(err, PowerError::Config(_)));
    assert!(!err.is_recoverable());
}

fn assert_wind_normalized(m: &PowerModel) {
    assert!(m.wind_speed >= 0.0, "{m:?}");
    assert!((0.0..360.0).contains(&m.wind_heading), "{m:?}");
}

fn bike_config() -> PowerConfig {
    PowerConfig {
        bike: Bike { cda: 0.3, crr: 0.004, weight: 11.0 },
        rider_weight: 64.0,
        ..Default::default()
    }
}

/// Sann vind 4 m/s fra 250°.
fn windy_truth(cfg: &PowerConfig) -> PowerModel {
    PowerModel { wind_speed: 4.0, wind_heading: 250.0, ..cfg.basic_model() }
}

const ALL_WIND: [Param; 4] = [Param::WindSpeed, Param::WindHeading, Param::Slope, Param::Delay];

#[test]
fn fit_recovers_wind_from_the_default_seed() {
    let cfg = bike_config();
    let ldf = synthetic_ride(&windy_truth(&cfg));

    // start: 10 m/s fra 180°
    let fitted = fit_power(&ldf, &cfg.initial_model(), &ALL_WIND).unwrap();
    assert_wind_normalized(&fitted);
    assert!(approx(fitted.wind_speed, 4.0, 0.1), "{fitted:?}");
    assert!(approx(fitted.wind_heading, 250.0, 1.5), "{fitted:?}");
    assert!(approx(fitted.slope, TRUE_SLOPE, 0.01), "{fitted:?}");
    assert!(approx(fitted.delay, TRUE_DELAY, 0.5), "{fitted:?}");
}

#[test]
fn negative_fitted_wind_is_turned_around() {
    let cfg = bike_config();
    let truth = windy_truth(&cfg);
    let ldf = synthetic_ride(&truth);
    // -4 m/s fra 70° er samme vind som 4 m/s fra 250°
    let seed = PowerModel { wind_speed: -2.0, wind_heading: 70.0, slope: TRUE_SLOPE, delay: TRUE_DELAY, ..truth };

    // rå optimering (uten normalisering) havner på negativ fart
    let raw = Fit::<PowerModel>::new(DETRENDED_HEART_RATE, PREDICTED_HEART_RATE, &[Param::WindSpeed, Param::WindHeading])
        .run(&ldf, &seed, |t, m| evaluate_and_extend(t, m, 1.0))
        .unwrap();
    assert!(raw.wind_speed < 0.0, "{raw:?}");
    assert!(approx(raw.wind_speed, -4.0, 0.1), "{raw:?}");
    let turned = normalize_wind(raw);
    assert!(approx(turned.wind_speed, 4.0, 0.1), "{turned:?}");
    assert!(approx(turned.wind_heading, 250.0, 1.5), "{turned:?}");

    // og fit_power leverer den normaliserte varianten
    let fitted = fit_power(&ldf, &seed, &ALL_WIND).unwrap();
    assert_wind_normalized(&fitted);
    assert!(approx(fitted.wind_speed, 4.0, 0.1), "{fitted:?}");
    assert!(approx(fitted.wind_heading, 250.0, 1.5), "{fitted:?}");
}

#[test]
fn detrending_once_matches_full_evaluation() {
    let model = PowerModel { cda: 0.3, crr: 0.004, m: 75.0, slope: 0.25, intercept: 70.0, delay: 8.0, ..Default::default() };
    let ldf = synthetic_ride(&model);

    let full = evaluate_and_extend(&ldf, &model, 1.0).unwrap();
    let observed = add_detrended_hr(&ldf, window_rows(model.window, 1.0)).unwrap();
    let cached = evaluate_and_predict(&observed, &model, 1.0).unwrap();
    assert_eq!(full.column(DETRENDED_HEART_RATE), cached.column(DETRENDED_HEART_RATE));
    assert_eq!(full.column(PREDICTED_HEART_RATE), cached.column(PREDICTED_HEART_RATE));
}
