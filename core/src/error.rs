// core/src/error.rs
use thiserror::Error;

/// Feil fra kraftmodellen.
///
/// `MissingData` og `NegativeDelay`/`NotConverged` betyr at aktiviteten mangler
/// brukbare data for den utvidede modellen. Kalleren kan da falle tilbake til
/// enkel (ikke-tilpasset) effekt i stedet for å droppe hele aktiviteten.
#[derive(Debug, Error)]
pub enum PowerError {
    #[error("missing data: {0}")]
    MissingData(String),

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("invalid table: {0}")]
    InvalidTable(String),

    #[error("power configuration incorrect: {0}")]
    Config(String),

    #[error("cannot estimate delay (best lag {0}s is negative, insufficient data?)")]
    NegativeDelay(f64),

    #[error("fit did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error("json parse at {}: {}", .0.path(), .0.inner())]
    Json(#[from] serde_path_to_error::Error<serde_json::Error>),

    #[error("json encode: {0}")]
    Encode(#[from] serde_json::Error),
}

impl PowerError {
    /// Data-/numerikkfeil der enkel effekt fortsatt kan beregnes.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PowerError::MissingData(_)
                | PowerError::NegativeDelay(_)
                | PowerError::NotConverged { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PowerError>;
