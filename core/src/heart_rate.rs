// core/src/heart_rate.rs
use ordered_float::OrderedFloat;

use crate::error::Result;
use crate::frame::{Column, Table};
use crate::names::{DETRENDED_HEART_RATE, HEART_RATE, POWER_ESTIMATE, PREDICTED_HEART_RATE};

/// Sentrert glidende median over `window` rader.
///
/// Vinduet krymper ved kantene og manglende verdier ignoreres; rader uten
/// noen gyldige verdier i vinduet blir `None`. For partall `window` går
/// vinduet én rad lenger bakover enn fremover.
pub fn rolling_median(values: &[Option<f64>], window: usize) -> Column {
    let n = values.len();
    let w = window.max(1);
    let ahead = (w - 1) / 2;
    let mut sorted: Vec<OrderedFloat<f64>> = Vec::with_capacity(w);
    let mut out = Vec::with_capacity(n);
    let (mut lo, mut hi) = (0usize, 0usize); // vindu = [lo, hi)

    for i in 0..n {
        let want_hi = (i + ahead + 1).min(n);
        let want_lo = (i + ahead + 1).saturating_sub(w);
        while hi < want_hi {
            if let Some(v) = values[hi] {
                let v = OrderedFloat(v);
                let pos = sorted.partition_point(|x| *x < v);
                sorted.insert(pos, v);
            }
            hi += 1;
        }
        while lo < want_lo {
            if let Some(v) = values[lo] {
                if let Ok(pos) = sorted.binary_search(&OrderedFloat(v)) {
                    sorted.remove(pos);
                }
            }
            lo += 1;
        }
        out.push(match sorted.len() {
            0 => None,
            k if k % 2 == 1 => Some(sorted[k / 2].0),
            k => Some(0.5 * (sorted[k / 2 - 1].0 + sorted[k / 2].0)),
        });
    }
    out
}

/// Eksponentielt vektet glidende snitt med halveringstid `halflife` (rader).
///
/// Justerte vekter (1-α)^i normalisert med summen av vektene; manglende
/// verdier bidrar ikke, men vektene fortsetter å avta.
pub fn ewm_mean(values: &[Option<f64>], halflife: f64) -> Column {
    let alpha = if halflife > 0.0 { 1.0 - (-std::f64::consts::LN_2 / halflife).exp() } else { 1.0 };
    let decay = 1.0 - alpha;
    let (mut num, mut den) = (0.0, 0.0);
    values
        .iter()
        .map(|v| {
            num *= decay;
            den *= decay;
            if let Some(v) = v {
                num += v;
                den += 1.0;
            }
            if den > 0.0 { Some(num / den) } else { None }
        })
        .collect()
}

/// Trekker fra sentrert glidende median (fjerner langsom drift).
pub fn detrend(values: &[Option<f64>], window: usize) -> Column {
    values
        .iter()
        .zip(rolling_median(values, window))
        .map(|(v, m)| match (v, m) {
            (Some(v), Some(m)) => Some(v - m),
            _ => None,
        })
        .collect()
}

/// Detrendet målt puls. Avhenger kun av `window` (rader), ikke av effekten.
pub fn add_detrended_hr(table: &Table, window: usize) -> Result<Table> {
    let hr = table.require(HEART_RATE)?;
    let mut out = table.clone();
    out.set(DETRENDED_HEART_RATE, detrend(hr, window));
    Ok(out)
}

/// Modellert (detrendet) puls fra estimert effekt.
///
/// `window` i rader; `delay` er halveringstiden (rader) for pulsresponsen.
pub fn add_predicted_hr(table: &Table, window: usize, slope: f64, intercept: f64, delay: f64) -> Result<Table> {
    let power = table.require(POWER_ESTIMATE)?;
    let drive: Column = power.iter().map(|p| p.map(|p| p * slope + intercept)).collect();
    let predicted = ewm_mean(&drive, delay);

    let mut out = table.clone();
    out.set(PREDICTED_HEART_RATE, detrend(&predicted, window));
    Ok(out)
}

/// Detrendet målt puls og modellert puls fra estimert effekt.
pub fn add_modeled_hr(table: &Table, window: usize, slope: f64, intercept: f64, delay: f64) -> Result<Table> {
    let out = add_detrended_hr(table, window)?;
    add_predicted_hr(&out, window, slope, intercept, delay)
}
