//! Usage-to-request utilization

use crate::error::{ResizeError, Result};
use crate::models::{ContainerResourceSpec, UtilizationReport};

/// Percentage of `request` consumed by `usage`, both in the same canonical unit
///
/// A request that is zero, negative or not finite cannot be a baseline and is
/// reported as `InvalidSpec` instead of yielding an infinite utilization.
pub fn utilization_pct(container: &str, usage: f64, request: f64) -> Result<f64> {
    if !request.is_finite() || request <= 0.0 {
        return Err(ResizeError::invalid_spec(
            container,
            format!("request must be positive, got {request}"),
        ));
    }
    if !usage.is_finite() || usage < 0.0 {
        return Err(ResizeError::invalid_spec(
            container,
            format!("usage must be non-negative, got {usage}"),
        ));
    }

    Ok(usage / request * 100.0)
}

/// Compute the utilization report for one container
pub fn compute_report(
    spec: &ContainerResourceSpec,
    cpu_usage: f64,
    memory_usage: f64,
) -> Result<UtilizationReport> {
    let name = &spec.container_name;
    Ok(UtilizationReport {
        container_name: name.clone(),
        cpu_pct: utilization_pct(name, cpu_usage, spec.cpu_request)?,
        mem_pct: utilization_pct(name, memory_usage, spec.memory_request)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(cpu: f64, mem: f64) -> ContainerResourceSpec {
        ContainerResourceSpec {
            container_name: "app".to_string(),
            cpu_request: cpu,
            memory_request: mem,
            raw_cpu_request: format!("{cpu}m"),
            raw_memory_request: format!("{mem}Mi"),
        }
    }

    #[test]
    fn test_utilization_matches_formula() {
        let cases = [(800.0, 1000.0), (500.0, 1100.0), (1.0, 3.0), (0.0, 42.0), (7.5, 0.25)];
        for (usage, request) in cases {
            let pct = utilization_pct("app", usage, request).unwrap();
            assert!((pct - 100.0 * usage / request).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zero_request_is_invalid_spec() {
        let err = utilization_pct("app", 10.0, 0.0).unwrap_err();
        assert_eq!(err.kind(), "invalid_spec");
        assert!(utilization_pct("app", 10.0, -1.0).is_err());
        assert!(utilization_pct("app", 10.0, f64::NAN).is_err());
    }

    #[test]
    fn test_compute_report() {
        let report = compute_report(&spec(1000.0, 200.0), 800.0, 198.0).unwrap();
        assert_eq!(report.container_name, "app");
        assert!((report.cpu_pct - 80.0).abs() < 1e-9);
        assert!((report.mem_pct - 99.0).abs() < 1e-9);
    }

    #[test]
    fn test_compute_report_rejects_zero_memory_request() {
        let err = compute_report(&spec(1000.0, 0.0), 800.0, 10.0).unwrap_err();
        assert!(matches!(err, ResizeError::InvalidSpec { .. }));
    }
}
