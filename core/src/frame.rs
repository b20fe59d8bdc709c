// core/src/frame.rs
use std::collections::BTreeMap;
use std::ops::Range;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PowerError, Result};

/// En kolonne: én verdi per rad, `None` = manglende celle.
pub type Column = Vec<Option<f64>>;

/// Tidsindeksert tabell for én aktivitet.
///
/// Indeksen er sekunder relativt til `start` og er strengt stigende.
/// `timespan` (valgfri) deler radene i sammenhengende opptakssegmenter.
/// Stegene i modellen tar `&Table` og returnerer en utvidet kopi.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    start: DateTime<Utc>,
    index: Vec<f64>,
    timespan: Option<Vec<Option<i64>>>,
    columns: BTreeMap<String, Column>,
}

#[derive(Deserialize)]
struct RawTable {
    start: DateTime<Utc>,
    index: Vec<f64>,
    #[serde(default)]
    timespan: Option<Vec<Option<i64>>>,
    #[serde(default)]
    columns: BTreeMap<String, Column>,
}

impl TryFrom<RawTable> for Table {
    type Error = PowerError;

    fn try_from(raw: RawTable) -> Result<Self> {
        let mut table = Table::new(raw.start, raw.index)?;
        if let Some(ids) = raw.timespan {
            table = table.with_timespan(ids)?;
        }
        for (name, values) in raw.columns {
            table = table.with_column(&name, values)?;
        }
        Ok(table)
    }
}

impl Table {
    pub fn new(start: DateTime<Utc>, index: Vec<f64>) -> Result<Self> {
        if index.iter().any(|t| !t.is_finite()) {
            return Err(PowerError::InvalidTable("non-finite time index".into()));
        }
        if index.windows(2).any(|w| w[1] <= w[0]) {
            return Err(PowerError::InvalidTable("time index must be strictly increasing".into()));
        }
        Ok(Self { start, index, timespan: None, columns: BTreeMap::new() })
    }

    /// Bygg tabell fra tidsstempler (må være strengt stigende).
    pub fn from_times(times: &[DateTime<Utc>]) -> Result<Self> {
        let start = *times
            .first()
            .ok_or_else(|| PowerError::InvalidTable("no timestamps".into()))?;
        let index = times
            .iter()
            .map(|t| (*t - start).num_milliseconds() as f64 / 1000.0)
            .collect();
        Self::new(start, index)
    }

    pub fn with_column(mut self, name: &str, values: Column) -> Result<Self> {
        self.check_len(name, values.len())?;
        self.columns.insert(name.to_string(), values);
        Ok(self)
    }

    pub fn with_timespan(mut self, ids: Vec<Option<i64>>) -> Result<Self> {
        self.check_len("timespan", ids.len())?;
        self.timespan = Some(ids);
        Ok(self)
    }

    fn check_len(&self, name: &str, n: usize) -> Result<()> {
        if n != self.index.len() {
            return Err(PowerError::InvalidTable(format!(
                "column '{}' has {} rows, index has {}",
                name,
                n,
                self.index.len()
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[inline]
    pub fn index(&self) -> &[f64] {
        &self.index
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn timespan(&self) -> Option<&[Option<i64>]> {
        self.timespan.as_deref()
    }

    pub fn has(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(|c| c.as_slice())
    }

    /// Som `column`, men manglende kolonne er en feil.
    pub fn require(&self, name: &str) -> Result<&[Option<f64>]> {
        self.column(name).ok_or_else(|| PowerError::MissingColumn(name.to_string()))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    /// Absolutt tidspunkt for rad `row`.
    pub fn time_at(&self, row: usize) -> DateTime<Utc> {
        self.start + Duration::milliseconds((self.index[row] * 1000.0).round() as i64)
    }

    /// Erstatter (eller legger til) en kolonne. Kun for bruk inne i crate,
    /// der lengden alltid er lik indeksens.
    pub(crate) fn set(&mut self, name: &str, values: Column) {
        debug_assert_eq!(values.len(), self.index.len(), "column {name}");
        self.columns.insert(name.to_string(), values);
    }

    pub(crate) fn set_timespan(&mut self, ids: Option<Vec<Option<i64>>>) {
        self.timespan = ids;
    }

    /// Ny tabell med kun radene i `rows` (stigende).
    pub(crate) fn select_rows(&self, rows: &[usize]) -> Table {
        Table {
            start: self.start,
            index: rows.iter().map(|&i| self.index[i]).collect(),
            timespan: self
                .timespan
                .as_ref()
                .map(|ids| rows.iter().map(|&i| ids[i]).collect()),
            columns: self
                .columns
                .iter()
                .map(|(k, c)| (k.clone(), rows.iter().map(|&i| c[i]).collect()))
                .collect(),
        }
    }

    /// Sammenhengende segmenter (rader med samme timespan-id).
    /// Rader uten id hører ikke til noe segment. Uten timespan-kolonne er
    /// hele tabellen ett segment.
    pub fn segments(&self) -> Vec<Range<usize>> {
        let Some(ids) = &self.timespan else {
            return if self.is_empty() { vec![] } else { vec![0..self.len()] };
        };
        let mut out = Vec::new();
        let mut i = 0;
        while i < ids.len() {
            let Some(id) = ids[i] else {
                i += 1;
                continue;
            };
            let mut j = i + 1;
            while j < ids.len() && ids[j] == Some(id) {
                j += 1;
            }
            out.push(i..j);
            i = j;
        }
        out
    }
}

/// Elementvis operasjon på to kolonner; ikke-endelige resultater blir `None`.
pub(crate) fn map2(a: &[Option<f64>], b: &[Option<f64>], f: impl Fn(f64, f64) -> f64) -> Column {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => finite(f(*x, *y)),
            _ => None,
        })
        .collect()
}

#[inline]
pub(crate) fn finite(x: f64) -> Option<f64> {
    if x.is_finite() { Some(x) } else { None }
}

/// Median av en (usortert) liste; tom liste gir `None`.
pub(crate) fn median(mut xs: Vec<f64>) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    xs.sort_by(|a, b| a.total_cmp(b));
    let n = xs.len();
    Some(if n % 2 == 1 { xs[n / 2] } else { 0.5 * (xs[n / 2 - 1] + xs[n / 2]) })
}
