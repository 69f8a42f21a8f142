//! Resource quantity normalization
//!
//! Converts the string encodings reported by the metrics API and declared in
//! pod specs into canonical numbers:
//! - CPU in millicores (`n`, `m` or bare cores)
//! - memory in MiB (`Ki`, `Mi` or a bare MiB count)
//!
//! Anything else is rejected rather than guessed at.

use crate::error::{ResizeError, Result};
use crate::models::ResourceKind;

const NANOCORES_PER_MILLICORE: f64 = 1_000_000.0;
const MILLICORES_PER_CORE: f64 = 1000.0;
const KIB_PER_MIB: f64 = 1024.0;

/// Normalize a CPU quantity to millicores
pub fn normalize_cpu(raw: &str) -> Result<f64> {
    let (number, suffix) = split_suffix(raw);
    let value = parse_number(raw, number)?;

    match suffix {
        "n" => Ok(value / NANOCORES_PER_MILLICORE),
        "m" => Ok(value),
        "" => Ok(value * MILLICORES_PER_CORE),
        other => Err(ResizeError::parse(
            raw,
            format!("unsupported cpu suffix {other:?}"),
        )),
    }
}

/// Normalize a memory quantity to MiB
pub fn normalize_memory(raw: &str) -> Result<f64> {
    let (number, suffix) = split_suffix(raw);
    let value = parse_number(raw, number)?;

    match suffix {
        "Ki" => Ok(value / KIB_PER_MIB),
        // Requests written back by the updater use this form
        "Mi" | "" => Ok(value),
        other => Err(ResizeError::parse(
            raw,
            format!("unsupported memory suffix {other:?}"),
        )),
    }
}

/// Normalize a quantity of the given resource kind
pub fn normalize(kind: ResourceKind, raw: &str) -> Result<f64> {
    match kind {
        ResourceKind::Cpu => normalize_cpu(raw),
        ResourceKind::Memory => normalize_memory(raw),
    }
}

/// Encode a canonical value the way the updater writes it into a pod spec
pub fn encode(kind: ResourceKind, canonical: f64) -> String {
    let whole = canonical.round().max(0.0) as u64;
    match kind {
        ResourceKind::Cpu => format!("{whole}m"),
        ResourceKind::Memory => format!("{whole}Mi"),
    }
}

/// Split "131072Ki" into ("131072", "Ki")
fn split_suffix(raw: &str) -> (&str, &str) {
    let trimmed = raw.trim();
    let idx = trimmed
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(trimmed.len());
    trimmed.split_at(idx)
}

fn parse_number(raw: &str, number: &str) -> Result<f64> {
    if number.is_empty() {
        return Err(ResizeError::parse(raw, "missing numeric value"));
    }

    let dots = number.chars().filter(|c| *c == '.').count();
    if dots > 1 || !number.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(ResizeError::parse(raw, "malformed numeric value"));
    }

    number
        .parse::<f64>()
        .map_err(|e| ResizeError::parse(raw, e.to_string()))
}
