// core/tests/common/mod.rs
// Syntetiske turer for integrasjonstestene.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};

use ridepower_core::names::{
    CADENCE, DISTANCE, ELEVATION, HEART_RATE, LATITUDE, LONGITUDE, SPEED,
};
use ridepower_core::Table;

pub const METERS_PER_DEGREE: f64 = 111_320.0;

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 2, 7, 30, 0).unwrap()
}

fn some(xs: &[f64]) -> Vec<Option<f64>> {
    xs.iter().copied().map(Some).collect()
}

/// Rett nordover i konstant fart, 1 Hz, flatt.
pub fn flat_ride(n: usize, speed: f64) -> Table {
    let index: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let distance: Vec<f64> = index.iter().map(|t| t * speed).collect();
    let latitude: Vec<f64> = distance.iter().map(|d| d / METERS_PER_DEGREE).collect();
    Table::new(start(), index)
        .unwrap()
        .with_column(SPEED, some(&vec![speed; n]))
        .unwrap()
        .with_column(DISTANCE, some(&distance))
        .unwrap()
        .with_column(ELEVATION, some(&vec![0.0; n]))
        .unwrap()
        .with_column(LATITUDE, some(&latitude))
        .unwrap()
        .with_column(LONGITUDE, some(&vec![0.0; n]))
        .unwrap()
        .with_column(CADENCE, some(&vec![90.0; n]))
        .unwrap()
        .with_timespan(vec![Some(1); n])
        .unwrap()
}

/// Runde med radius `radius` (m): varierende fart, én bakke per runde og
/// skiftende retning (så vinden betyr noe). 1 Hz, ett segment.
pub fn loop_ride(n: usize, radius: f64) -> Table {
    use std::f64::consts::PI;

    let index: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let speed: Vec<f64> = index
        .iter()
        .map(|t| 8.0 + 2.0 * (2.0 * PI * t / 45.0).sin() + (2.0 * PI * t / 13.0).sin())
        .collect();
    let mut distance = vec![0.0; n];
    for i in 1..n {
        distance[i] = distance[i - 1] + 0.5 * (speed[i - 1] + speed[i]);
    }
    let theta: Vec<f64> = distance.iter().map(|d| d / radius).collect();
    let latitude: Vec<f64> = theta.iter().map(|a| radius * a.cos() / METERS_PER_DEGREE).collect();
    let longitude: Vec<f64> = theta.iter().map(|a| radius * a.sin() / METERS_PER_DEGREE).collect();
    let elevation: Vec<f64> = theta.iter().map(|a| 50.0 + 10.0 * a.sin()).collect();

    Table::new(start(), index)
        .unwrap()
        .with_column(SPEED, some(&speed))
        .unwrap()
        .with_column(DISTANCE, some(&distance))
        .unwrap()
        .with_column(ELEVATION, some(&elevation))
        .unwrap()
        .with_column(LATITUDE, some(&latitude))
        .unwrap()
        .with_column(LONGITUDE, some(&longitude))
        .unwrap()
        .with_column(CADENCE, some(&vec![88.0; n]))
        .unwrap()
        .with_timespan(vec![Some(1); n])
        .unwrap()
}

/// Legger til målt puls (erstatter eventuell eksisterende).
pub fn with_heart_rate(table: &Table, hr: Vec<Option<f64>>) -> Table {
    table.clone().with_column(HEART_RATE, hr).unwrap()
}

pub fn approx(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}
