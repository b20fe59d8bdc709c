// core/src/resample.rs
// Lineær omsampling til jevnt tidsgitter. Interpolerer kun *innenfor* ekte
// data, og markerer (eller fjerner) rader som havner i opptakshull.

use crate::error::{PowerError, Result};
use crate::frame::{median, Column, Table};
use crate::names::{DELTA_TIME, TIME};

/// Median tidssteg mellom påfølgende rader (sek).
pub fn median_dt(table: &Table) -> Result<f64> {
    let dts: Vec<f64> = table.index().windows(2).map(|w| w[1] - w[0]).collect();
    median(dts).ok_or_else(|| PowerError::MissingData("need at least two samples for dt".into()))
}

#[derive(Debug, Clone, Copy)]
pub struct ResampleOptions {
    /// Tidssteg (sek). `None` => median av målt steg.
    pub dt: Option<f64>,
    /// Start/slutt (sek, relativt til tabellens start). `None` => første/siste rad.
    pub start: Option<f64>,
    pub finish: Option<f64>,
    /// Rader utenfor alle segmenter: `true` => alle verdier mangler, `false` => fjernes.
    pub keep_nan: bool,
}

impl Default for ResampleOptions {
    fn default() -> Self {
        Self { dt: None, start: None, finish: None, keep_nan: true }
    }
}

/// Ekte (ikke-manglende) punkter i en kolonne, som (tid, verdi).
fn genuine(index: &[f64], values: &[Option<f64>]) -> Vec<(f64, f64)> {
    index
        .iter()
        .zip(values.iter())
        .filter_map(|(t, v)| v.map(|v| (*t, v)))
        .collect()
}

/// Lineær interpolasjon i `t`; `None` hvis `t` ikke er omsluttet av ekte data.
fn interpolate_at(points: &[(f64, f64)], t: f64) -> Option<f64> {
    let i = points.partition_point(|(x, _)| *x < t);
    let (t1, v1) = *points.get(i)?;
    if t1 == t {
        return Some(v1);
    }
    let (t0, v0) = *points.get(i.checked_sub(1)?)?;
    Some(v0 + (v1 - v0) * (t - t0) / (t1 - t0))
}

/// Segment-id for et tidspunkt: raden selv ved eksakt treff, ellers må
/// nabopunktene på begge sider tilhøre samme segment.
fn enclosing_segment(index: &[f64], ids: &[Option<i64>], t: f64) -> Option<i64> {
    let i = index.partition_point(|x| *x < t);
    if i < index.len() && index[i] == t {
        return ids[i];
    }
    if i == 0 || i >= index.len() {
        return None;
    }
    match (ids[i - 1], ids[i]) {
        (Some(a), Some(b)) if a == b => Some(a),
        _ => None,
    }
}

fn interpolate_column(index: &[f64], values: &[Option<f64>], ticks: &[f64]) -> Column {
    let points = genuine(index, values);
    ticks.iter().map(|t| interpolate_at(&points, *t)).collect()
}

/// Omsampler `table` til jevnt gitter.
///
/// Legger til `time` (sek siden start) og `delta_time` (mangler på første rad).
pub fn linear_resample(table: &Table, opts: ResampleOptions) -> Result<Table> {
    if table.is_empty() {
        return Err(PowerError::MissingData("cannot resample an empty table".into()));
    }
    let dt = match opts.dt {
        Some(dt) => dt,
        None => median_dt(table)?,
    };
    if !(dt.is_finite() && dt > 0.0) {
        return Err(PowerError::InvalidTable(format!("resample step must be positive, got {dt}")));
    }

    let index = table.index();
    let start = opts.start.unwrap_or(index[0]);
    let finish = opts.finish.unwrap_or(index[index.len() - 1]);
    if finish < start {
        return Err(PowerError::InvalidTable("resample finish is before start".into()));
    }
    let n = ((finish - start) / dt + 1e-9).floor() as usize + 1;
    let ticks: Vec<f64> = (0..n).map(|k| start + k as f64 * dt).collect();

    let mut out = Table::new(table.start(), ticks.clone())?;
    for name in table.column_names() {
        if name == TIME || name == DELTA_TIME {
            continue;
        }
        let values = table.require(name)?;
        out.set(name, interpolate_column(index, values, &ticks));
    }
    out.set(TIME, ticks.iter().map(|t| Some(*t)).collect());
    let mut delta_time: Column = vec![None; n];
    for k in 1..n {
        delta_time[k] = Some(ticks[k] - ticks[k - 1]);
    }
    out.set(DELTA_TIME, delta_time);

    let Some(ids) = table.timespan() else {
        return Ok(out);
    };

    let spans: Vec<Option<i64>> = ticks.iter().map(|t| enclosing_segment(index, ids, *t)).collect();

    if opts.keep_nan {
        let names: Vec<String> = out.column_names().map(str::to_string).collect();
        for name in names {
            let mut values = out.require(&name)?.to_vec();
            for (v, id) in values.iter_mut().zip(spans.iter()) {
                if id.is_none() {
                    *v = None;
                }
            }
            out.set(&name, values);
        }
        out.set_timespan(Some(spans));
        Ok(out)
    } else {
        out.set_timespan(Some(spans.clone()));
        let rows: Vec<usize> = (0..n).filter(|&k| spans[k].is_some()).collect();
        log::debug!("resample dropped {} rows outside segments", n - rows.len());
        Ok(out.select_rows(&rows))
    }
}

/// Interpolerer kolonnene `names` fra `source` over på tidspunktene i `target`.
/// Samme regel som omsamplingen: ingen ekstrapolering.
pub fn interpolate_to_index(target: &Table, source: &Table, names: &[&str]) -> Result<Table> {
    let offset = (target.start() - source.start()).num_milliseconds() as f64 / 1000.0;
    let times: Vec<f64> = target.index().iter().map(|t| t + offset).collect();
    let mut out = target.clone();
    for name in names {
        let values = source.require(name)?;
        out.set(name, interpolate_column(source.index(), values, &times));
    }
    Ok(out)
}
