//! Observability surface for the cleanup daemon (spec.md §6, §10.4):
//! Prometheus metrics and the `/healthz` / `/readyz` / `/metrics` router.

pub mod health;
pub mod metrics;

pub use health::{health_router, CycleControl, CycleReadiness, HealthState, ReadinessChecker};
pub use metrics::Metrics;
