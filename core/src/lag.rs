// core/src/lag.rs
// Startverdier for tilpasningen: forsinkelse puls vs. effekt (krysskorrelasjon)
// og lineær skala (minste kvadrater).
use std::cmp::Reverse;

use ordered_float::OrderedFloat;

use crate::error::{PowerError, Result};
use crate::frame::Table;
use crate::names::{HEART_RATE, POWER_ESTIMATE};
use crate::resample::median_dt;

pub const DELAY_SEARCH_STEPS: i64 = 20;

/// Startpunkt for tilpasning: puls ≈ slope·effekt(t - delay) + intercept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialScaling {
    pub slope: f64,
    pub intercept: f64,
    pub delay: f64,
}

/// Par (a[k], b[k - shift]) der begge finnes. Positiv `shift` => `b` ligger foran `a`.
fn shifted_pairs(a: &[Option<f64>], b: &[Option<f64>], shift: i64) -> Vec<(f64, f64)> {
    let n = a.len() as i64;
    (0..n)
        .filter_map(|k| {
            let j = k - shift;
            if j < 0 || j >= n {
                return None;
            }
            match (a[k as usize], b[j as usize]) {
                (Some(x), Some(y)) => Some((x, y)),
                _ => None,
            }
        })
        .collect()
}

/// Pearson-korrelasjon; `None` ved < 2 par eller null varians.
pub fn correlation(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx) * (x - mx);
        syy += (y - my) * (y - my);
    }
    let r = sxy / (sxx * syy).sqrt();
    if r.is_finite() { Some(r) } else { None }
}

/// Minste kvadraters linje y = slope·x + intercept.
pub fn linear_regression(pairs: &[(f64, f64)]) -> Option<(f64, f64)> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (x, y) in pairs {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx) * (x - mx);
    }
    if sxx <= 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, my - slope * mx))
}

/// Forsinkelsen (sek) som gir høyest korrelasjon mellom puls og effekt,
/// søkt over i·dt for i ∈ [-n, n]. Krever jevnt tidsgitter (omsamplet tabell).
pub fn measure_initial_delay(table: &Table, dt: Option<f64>, n: i64) -> Result<f64> {
    let dt = match dt {
        Some(dt) => dt,
        None => median_dt(table)?,
    };
    let hr = table.require(HEART_RATE)?;
    let power = table.require(POWER_ESTIMATE)?;

    let mut correlations: Vec<(i64, f64)> = (-n..=n)
        .filter_map(|i| correlation(&shifted_pairs(hr, power, i)).map(|r| (i, r)))
        .collect();
    // stabil sortering: ved lik korrelasjon vinner første lag
    correlations.sort_by_key(|(_, r)| Reverse(OrderedFloat(*r)));

    let (best, r) = correlations
        .first()
        .copied()
        .ok_or_else(|| PowerError::MissingData("no overlapping heart rate and power".into()))?;
    log::debug!("initial delay: lag {} (r = {:.3})", best, r);
    Ok(dt * best as f64)
}

/// Startverdier (slope, intercept, delay) fra korrelasjon + regresjon.
///
/// Negativ beste forsinkelse (puls foran effekt) gir `NegativeDelay`.
pub fn measure_initial_scaling(table: &Table) -> Result<InitialScaling> {
    let dt = median_dt(table)?;
    let delay = measure_initial_delay(table, Some(dt), DELAY_SEARCH_STEPS)?;
    if delay < 0.0 {
        return Err(PowerError::NegativeDelay(delay));
    }
    let shift = (delay / dt).round() as i64;
    let pairs: Vec<(f64, f64)> =
        shifted_pairs(table.require(HEART_RATE)?, table.require(POWER_ESTIMATE)?, shift)
            .into_iter()
            .map(|(hr, p)| (p, hr))
            .collect();
    let (slope, intercept) = linear_regression(&pairs)
        .ok_or_else(|| PowerError::MissingData("cannot regress heart rate on delayed power".into()))?;
    log::debug!("initial fit: slope {:.4}, intercept {:.2}, delay {}", slope, intercept, delay);
    Ok(InitialScaling { slope, intercept, delay })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_pairs_hr_with_earlier_power() {
        let hr = [Some(1.0), Some(2.0), Some(3.0)];
        let p = [Some(10.0), Some(20.0), Some(30.0)];
        assert_eq!(shifted_pairs(&hr, &p, 1), vec![(2.0, 10.0), (3.0, 20.0)]);
        assert_eq!(shifted_pairs(&hr, &p, -1), vec![(1.0, 20.0), (2.0, 30.0)]);
    }

    #[test]
    fn regression_and_correlation_on_exact_line() {
        let pairs: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, 0.5 * i as f64 + 60.0)).collect();
        let (s, c) = linear_regression(&pairs).unwrap();
        assert!((s - 0.5).abs() < 1e-12);
        assert!((c - 60.0).abs() < 1e-12);
        assert!((correlation(&pairs).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(correlation(&[(1.0, 2.0), (1.0, 3.0)]), None);
    }
}
