// core/src/differentials.rs
// Differanser per segment. Et hull i opptaket (ny timespan) gir aldri en
// derivert over hullet: tabellen deles i segmenter, hvert segment
// deriveres for seg, og resultatene settes sammen igjen.

use std::ops::Range;

use crate::error::{PowerError, Result};
use crate::frame::{finite, Column, Table};
use crate::names::{self, DISTANCE, ELEVATION, HEADING, LATITUDE, LONGITUDE, SPEED, SPEED_2};

/// Snitt av v² over et intervall der v går lineært fra `a` til `b`.
///
/// Integralet av (a + (b-a)s)² over s ∈ [0,1] er (a² + ab + b²)/3,
/// ikke (a² + b²)/2.
#[inline]
pub fn mean_square_linear(a: f64, b: f64) -> f64 {
    (a * a + a * b + b * b) / 3.0
}

/// Standard differanser for kraftmodellen (referansefart `speed`).
pub fn add_differentials(table: &Table) -> Result<Table> {
    differentiate(table, SPEED, &[DISTANCE, ELEVATION, SPEED, SPEED_2, LATITUDE, LONGITUDE])
}

/// Utdata for ett segment: radområde + avledede kolonner for disse radene.
struct SpanDiff {
    rows: Range<usize>,
    columns: Vec<(String, Vec<Option<f64>>)>,
}

fn diff(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    out.push(None);
    for w in values.windows(2) {
        out.push(match (w[0], w[1]) {
            (Some(a), Some(b)) => Some(b - a),
            _ => None,
        });
    }
    out
}

fn diff_span(
    table: &Table,
    rows: Range<usize>,
    speed: &str,
    names: &[&str],
    with_heading: bool,
) -> Result<Option<SpanDiff>> {
    // hopp over segmentet hvis en påkrevd kolonne har hull
    for name in names {
        let values = &table.require(name)?[rows.clone()];
        if values.iter().any(|v| v.is_none()) {
            log::debug!("skipping span {:?}: missing values in '{}'", rows, name);
            return Ok(None);
        }
    }

    let mut columns = Vec::with_capacity(names.len() + 2);
    for name in names {
        columns.push((names::delta(name), diff(&table.require(name)?[rows.clone()])));
    }

    if with_heading {
        let d_lat = diff(&table.require(LATITUDE)?[rows.clone()]);
        let d_lon = diff(&table.require(LONGITUDE)?[rows.clone()]);
        let heading = d_lon
            .iter()
            .zip(d_lat.iter())
            .map(|(x, y)| match (x, y) {
                (Some(x), Some(y)) => finite(x.atan2(*y).to_degrees()),
                _ => None,
            })
            .collect();
        columns.push((HEADING.to_string(), heading));
    }

    let v = &table.require(speed)?[rows.clone()];
    let mut avg_speed_2 = Vec::with_capacity(v.len());
    avg_speed_2.push(None);
    for w in v.windows(2) {
        avg_speed_2.push(match (w[0], w[1]) {
            (Some(a), Some(b)) => Some(mean_square_linear(a, b)),
            _ => None,
        });
    }
    columns.push((names::avg(&names::sqr(speed)), avg_speed_2));

    Ok(Some(SpanDiff { rows, columns }))
}

/// Differanser av `names` per segment, pluss `<speed>_2`, `avg_<speed>_2`
/// og (hvis tabellen ikke har den fra før) `heading` i grader.
///
/// Segmenter med manglende verdier i `names` hoppes over (avledede celler
/// mangler der). Ingen brukbare segmenter => `PowerError::MissingData`.
pub fn differentiate(table: &Table, speed: &str, names: &[&str]) -> Result<Table> {
    let mut out = table.clone();
    let speed_2: Column = table.require(speed)?.iter().map(|v| v.map(|v| v * v)).collect();
    out.set(&names::sqr(speed), speed_2);

    let with_heading =
        !table.has(HEADING) && names.contains(&LATITUDE) && names.contains(&LONGITUDE);

    let mut spans = Vec::new();
    for rows in out.segments() {
        if let Some(span) = diff_span(&out, rows, speed, names, with_heading)? {
            spans.push(span);
        }
    }
    if spans.is_empty() {
        return Err(PowerError::MissingData("found no spans without missing values".into()));
    }

    // concat: radene utenfor brukte segmenter forblir None
    let n = out.len();
    let mut merged: Vec<(String, Column)> = spans[0]
        .columns
        .iter()
        .map(|(name, _)| (name.clone(), vec![None; n]))
        .collect();
    for span in &spans {
        for ((_, dst), (_, src)) in merged.iter_mut().zip(span.columns.iter()) {
            dst[span.rows.clone()].copy_from_slice(src);
        }
    }
    for (name, values) in merged {
        out.set(&name, values);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ramp_mean_numeric(a: f64, b: f64) -> f64 {
        let n = 100_000;
        (0..n)
            .map(|i| {
                let s = (i as f64 + 0.5) / n as f64;
                let v = a + (b - a) * s;
                v * v
            })
            .sum::<f64>()
            / n as f64
    }

    #[test]
    fn mean_square_matches_numeric_integral() {
        for &(a, b) in &[(0.0, 0.0), (0.0, 10.0), (3.0, 7.5), (12.0, 2.0), (5.0, 5.0)] {
            let exact = mean_square_linear(a, b);
            let numeric = ramp_mean_numeric(a, b);
            assert!((exact - numeric).abs() < 1e-6 * (1.0 + exact), "a={a} b={b}");
        }
        // ikke det naive snittet av endepunktene
        assert!((mean_square_linear(0.0, 6.0) - 12.0).abs() < 1e-12);
    }

    #[test]
    fn heading_in_degrees_from_lat_lon() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let t = Table::new(start, vec![0.0, 1.0, 2.0])
            .unwrap()
            .with_column(SPEED, vec![Some(1.0); 3])
            .unwrap()
            .with_column(LATITUDE, vec![Some(0.0), Some(0.001), Some(0.001)])
            .unwrap()
            .with_column(LONGITUDE, vec![Some(0.0), Some(0.0), Some(0.001)])
            .unwrap();
        let d = differentiate(&t, SPEED, &[LATITUDE, LONGITUDE]).unwrap();
        let h = d.column(HEADING).unwrap();
        assert_eq!(h[0], None); // ingen bevegelse ennå
        assert!(h[1].unwrap().abs() < 1e-9); // nord
        assert!((h[2].unwrap() - 90.0).abs() < 1e-9); // øst
    }

    #[test]
    fn all_spans_missing_is_an_error() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let t = Table::new(start, vec![0.0, 1.0])
            .unwrap()
            .with_column(SPEED, vec![Some(1.0), None])
            .unwrap();
        let err = differentiate(&t, SPEED, &[SPEED]).unwrap_err();
        assert!(matches!(err, PowerError::MissingData(_)));
    }
}
