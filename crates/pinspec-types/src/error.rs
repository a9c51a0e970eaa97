// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Error Types
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

/// Every fatal condition raised by the simulator.
///
/// Statistical non-convergence is not represented here: it only drives
/// batch extension in the kernel.
#[derive(Error, Debug)]
pub enum PinSpecError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Nuclear data error: {0}")]
    DataError(String),

    #[error("Sampling failure in {context}: draw {draw} exceeded cumulative fraction {cumulative}")]
    SamplingFailure {
        context: String,
        draw: f64,
        cumulative: f64,
    },

    #[error("Index {index} out of range [0, {len}) for {what}")]
    IndexOutOfRange {
        what: String,
        index: usize,
        len: usize,
    },

    #[error("Batch statistics have not been computed for tally {0}")]
    StatisticsUnavailable(String),

    #[error("Fatal diagnostic: {0}")]
    Fatal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type PinSpecResult<T> = Result<T, PinSpecError>;

/// Reject non-finite or non-positive parameters.
pub fn require_positive(value: f64, label: &str) -> PinSpecResult<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PinSpecError::ConfigError(format!(
            "{label} must be finite and > 0, got {value}"
        )));
    }
    Ok(value)
}

/// Reject non-finite or negative parameters.
pub fn require_non_negative(value: f64, label: &str) -> PinSpecResult<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(PinSpecError::ConfigError(format!(
            "{label} must be finite and >= 0, got {value}"
        )));
    }
    Ok(value)
}

/// Check that a caller-supplied buffer matches the expected length.
pub fn require_len(actual: usize, expected: usize, what: &str) -> PinSpecResult<()> {
    if actual != expected {
        return Err(PinSpecError::ConfigError(format!(
            "{what} has length {actual}, expected {expected}"
        )));
    }
    Ok(())
}
