// core/src/fit.rs
// Generisk tilpasning: justerer et utvalg navngitte parametre slik at to
// kolonner (målt / modellert) stemmer best mulig (minste kvadraters sum).
// Minimeringen er Nelder–Mead i et internt, ubegrenset rom; `forwards` /
// `backwards` mapper mellom ytre og indre verdier.

use std::fmt;

use crate::error::{PowerError, Result};
use crate::frame::Table;

/// Et parametersett med navngitte, flyttalls-felter. Verdien er immutabel:
/// `with` returnerer et nytt sett.
pub trait Parameters: Clone + fmt::Debug {
    type Name: Copy + fmt::Debug + fmt::Display + PartialEq;

    fn get(&self, name: Self::Name) -> f64;
    fn with(&self, name: Self::Name, value: f64) -> Self;
}

type Transform<'a, N> = Box<dyn Fn(N, f64) -> f64 + 'a>;

pub struct Fit<'a, P: Parameters> {
    observed: &'a str,
    predicted: &'a str,
    vary: Vec<P::Name>,
    forwards: Option<Transform<'a, P::Name>>,
    backwards: Option<Transform<'a, P::Name>>,
    max_iterations: usize,
    xtol: f64,
    ftol: f64,
}

/// Sum av kvadrerte avvik der begge kolonnene har verdi; ingen overlapp => ∞.
pub fn sum_squared_residuals(table: &Table, observed: &str, predicted: &str) -> Result<f64> {
    let a = table.require(observed)?;
    let b = table.require(predicted)?;
    let mut sum = 0.0;
    let mut n = 0usize;
    for (x, y) in a.iter().zip(b.iter()) {
        if let (Some(x), Some(y)) = (x, y) {
            sum += (x - y) * (x - y);
            n += 1;
        }
    }
    Ok(if n == 0 || !sum.is_finite() { f64::INFINITY } else { sum })
}

struct Vertex {
    x: Vec<f64>,
    f: f64,
}

impl<'a, P: Parameters> Fit<'a, P> {
    pub fn new(observed: &'a str, predicted: &'a str, vary: &[P::Name]) -> Self {
        Self {
            observed,
            predicted,
            vary: vary.to_vec(),
            forwards: None,
            backwards: None,
            max_iterations: 400 * vary.len().max(1),
            xtol: 1e-4,
            ftol: 1e-6,
        }
    }

    /// `forwards`: ytre -> indre verdi (startpunktet). `backwards`: indre -> ytre
    /// (hver kandidat før evaluering, og resultatet).
    pub fn with_transforms(
        mut self,
        forwards: impl Fn(P::Name, f64) -> f64 + 'a,
        backwards: impl Fn(P::Name, f64) -> f64 + 'a,
    ) -> Self {
        self.forwards = Some(Box::new(forwards));
        self.backwards = Some(Box::new(backwards));
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    fn to_internal(&self, initial: &P) -> Vec<f64> {
        self.vary
            .iter()
            .map(|&name| {
                let v = initial.get(name);
                match &self.forwards {
                    Some(f) => f(name, v),
                    None => v,
                }
            })
            .collect()
    }

    fn to_external(&self, initial: &P, x: &[f64]) -> P {
        self.vary.iter().zip(x.iter()).fold(initial.clone(), |p, (&name, &v)| {
            let v = match &self.backwards {
                Some(b) => b(name, v),
                None => v,
            };
            p.with(name, v)
        })
    }

    /// Kjør tilpasningen. `evaluate` kalles (minst) én gang per kandidat.
    pub fn run<E>(&self, table: &Table, initial: &P, evaluate: E) -> Result<P>
    where
        E: Fn(&Table, &P) -> Result<Table>,
    {
        if self.vary.is_empty() {
            return Err(PowerError::Config("no parameters to vary".into()));
        }

        let cost = |x: &[f64]| -> f64 {
            let params = self.to_external(initial, x);
            match evaluate(table, &params)
                .and_then(|t| sum_squared_residuals(&t, self.observed, self.predicted))
            {
                Ok(f) => f,
                Err(e) => {
                    log::debug!("fit: evaluation failed at {:?}: {}", params, e);
                    f64::INFINITY
                }
            }
        };

        let x0 = self.to_internal(initial);
        let n = x0.len();

        let mut simplex = Vec::with_capacity(n + 1);
        simplex.push(Vertex { f: cost(&x0), x: x0.clone() });
        if !simplex[0].f.is_finite() {
            return Err(PowerError::MissingData(format!(
                "no overlap between '{}' and '{}' at the initial parameters",
                self.observed, self.predicted
            )));
        }
        for i in 0..n {
            let mut x = x0.clone();
            x[i] = if x[i] != 0.0 { x[i] * 1.05 } else { 0.00025 };
            simplex.push(Vertex { f: cost(&x), x });
        }

        for iteration in 0..self.max_iterations {
            simplex.sort_by(|a, b| a.f.total_cmp(&b.f));

            let best = &simplex[0];
            let x_spread = simplex[1..]
                .iter()
                .flat_map(|v| v.x.iter().zip(best.x.iter()).map(|(a, b)| (a - b).abs() / (1.0 + b.abs())))
                .fold(0.0, f64::max);
            let f_spread = simplex[1..].iter().map(|v| (v.f - best.f).abs()).fold(0.0, f64::max);
            if x_spread <= self.xtol && f_spread <= self.ftol * (1.0 + best.f.abs()) {
                log::debug!("fit: converged after {} iterations (cost {:.4})", iteration, best.f);
                return Ok(self.to_external(initial, &best.x));
            }

            // tyngdepunkt uten dårligste punkt
            let mut centroid = vec![0.0; n];
            for v in &simplex[..n] {
                for (c, x) in centroid.iter_mut().zip(v.x.iter()) {
                    *c += x / n as f64;
                }
            }
            let worst_x = simplex[n].x.clone();
            let worst_f = simplex[n].f;
            let toward = |t: f64| -> Vec<f64> {
                centroid.iter().zip(worst_x.iter()).map(|(c, w)| c + t * (c - w)).collect()
            };

            let xr = toward(1.0);
            let fr = cost(&xr);
            if fr < simplex[0].f {
                let xe = toward(2.0);
                let fe = cost(&xe);
                simplex[n] = if fe < fr { Vertex { x: xe, f: fe } } else { Vertex { x: xr, f: fr } };
                continue;
            }
            if fr < simplex[n - 1].f {
                simplex[n] = Vertex { x: xr, f: fr };
                continue;
            }

            // kontraksjon (utvendig hvis refleksjonen var bedre enn dårligste)
            let (xc, fc) = if fr < worst_f {
                let xc = toward(0.5);
                let fc = cost(&xc);
                (xc, fc)
            } else {
                let xc = toward(-0.5);
                let fc = cost(&xc);
                (xc, fc)
            };
            if fc < fr.min(worst_f) {
                simplex[n] = Vertex { x: xc, f: fc };
                continue;
            }

            // krymp mot beste punkt
            let best_x = simplex[0].x.clone();
            for v in simplex.iter_mut().skip(1) {
                let x: Vec<f64> = best_x.iter().zip(v.x.iter()).map(|(b, x)| b + 0.5 * (x - b)).collect();
                v.f = cost(&x);
                v.x = x;
            }
        }

        Err(PowerError::NotConverged { iterations: self.max_iterations })
    }
}
