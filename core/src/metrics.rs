// core/src/metrics.rs
// Prosessvide tellere (Prometheus). Eneste delte tilstand i crate; tellerne er atomiske.
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

pub struct PowerMetrics {
    pub registry: Registry,
    pub evaluations_total: IntCounter,
    pub fits_total: IntCounter,
    pub fit_failures_total: IntCounter,
    pub fallbacks_total: IntCounter,
    pub incomplete_activities_total: IntCounter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    let c = IntCounter::new(name, help).expect("valid metric name");
    registry.register(Box::new(c.clone())).expect("metric registered once");
    c
}

impl PowerMetrics {
    fn new() -> Self {
        let registry = Registry::new_custom(Some("ridepower".into()), None)
            .expect("valid registry prefix");
        Self {
            evaluations_total: counter(&registry, "evaluations_total", "Forward model evaluations"),
            fits_total: counter(&registry, "fits_total", "Power fits started"),
            fit_failures_total: counter(&registry, "fit_failures_total", "Power fits that failed"),
            fallbacks_total: counter(
                &registry,
                "fallbacks_total",
                "Activities that fell back to the basic power estimate",
            ),
            incomplete_activities_total: counter(
                &registry,
                "incomplete_activities_total",
                "Activities processed without power results",
            ),
            registry,
        }
    }
}

pub static METRICS: Lazy<PowerMetrics> = Lazy::new(PowerMetrics::new);

/// Tekstformat (Prometheus exposition) for alle tellere.
pub fn gather_text() -> anyhow::Result<String> {
    let mut buf = Vec::new();
    TextEncoder::new().encode(&METRICS.registry.gather(), &mut buf)?;
    Ok(String::from_utf8(buf)?)
}
