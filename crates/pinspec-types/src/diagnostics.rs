// ─────────────────────────────────────────────────────────────────────
// SCPN PinSpec — Diagnostics
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Severity-tagged diagnostics routed onto `tracing`.
//!
//! `Severity::Error` is fatal: `report` returns it as an error so the
//! caller unwinds the run with `?`.

use crate::error::{PinSpecError, PinSpecResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Normal,
    Warning,
    Critical,
    Result,
    Error,
}

pub fn report(severity: Severity, message: &str) -> PinSpecResult<()> {
    match severity {
        Severity::Debug => tracing::debug!("{message}"),
        Severity::Info | Severity::Normal => tracing::info!("{message}"),
        Severity::Warning => tracing::warn!("{message}"),
        Severity::Critical => tracing::error!(critical = true, "{message}"),
        Severity::Result => tracing::info!(target: "pinspec::result", "{message}"),
        Severity::Error => {
            tracing::error!("{message}");
            return Err(PinSpecError::Fatal(message.to_string()));
        }
    }
    Ok(())
}
