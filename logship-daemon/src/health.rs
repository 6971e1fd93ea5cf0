//! Aggregated health reporting.
//!
//! The overall daemon status is the worst status among all components.
//!
//! # Aggregation Rule
//!
//! - All Healthy -> Healthy
//! - Any Degraded, none Unhealthy -> Degraded(reason)
//! - Any Unhealthy -> Unhealthy(reason)

use serde::Serialize;

use logship_core::pipeline::HealthStatus;

/// Whether a component is an input or an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// Listener
    Input,
    /// Output sender
    Output,
}

/// Health status for a single component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    /// Component name from the configuration.
    pub name: String,
    /// Input or output.
    pub kind: ComponentKind,
    /// Current health status.
    pub status: HealthStatus,
}

/// Aggregated health report for the entire daemon.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonHealth {
    /// Overall status (worst of all components).
    pub status: HealthStatus,
    /// Uptime in seconds since the manager was built.
    pub uptime_secs: u64,
    /// Per-component reports.
    pub components: Vec<ComponentHealth>,
}

/// Aggregate component statuses into a single status.
///
/// Returns the worst status found, with the reasons of every component
/// at that level joined by `; `.
pub fn aggregate_status(components: &[ComponentHealth]) -> HealthStatus {
    let worst = components
        .iter()
        .fold(HealthStatus::Healthy, |acc, c| acc.worst(c.status.clone()));

    let reasons = |degraded: bool| {
        components
            .iter()
            .filter_map(|c| match (&c.status, degraded) {
                (HealthStatus::Degraded(r), true) | (HealthStatus::Unhealthy(r), false) => {
                    Some(format!("{}: {}", c.name, r))
                }
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("; ")
    };

    match worst {
        HealthStatus::Healthy => HealthStatus::Healthy,
        HealthStatus::Degraded(_) => HealthStatus::Degraded(reasons(true)),
        HealthStatus::Unhealthy(_) => HealthStatus::Unhealthy(reasons(false)),
    }
}
