// Focused sub-traits for recording Prometheus metrics, grouped by concern.
//
// All methods take `&self` because the underlying implementation uses
// atomic operations (interior mutability via `prometheus-client`).
//
// Default implementations are no-ops, allowing test mocks to implement
// only the sub-traits relevant to the service under test.

// ── Compilation metrics ────────────────────────────────────────────

pub trait CompileMetrics: Send + Sync {
    /// Record a compilation pass with its result (`success` / `failure`).
    fn record_compilation(&self, _result: &str) {}

    /// Record a failed pass by error category.
    fn record_compile_error(&self, _category: &str) {}

    /// Observe the wall time of one compilation pass in seconds.
    fn observe_compile_duration(&self, _duration_seconds: f64) {}
}

// ── Rule set metrics ───────────────────────────────────────────────

pub trait RuleMetrics: Send + Sync {
    /// Set the number of compiled packet-filter rules of a zone.
    fn set_zone_rules(&self, _zone: &str, _count: u64) {}

    /// Set the number of explicit dispatch rules of an edge.
    fn set_dispatch_rules(&self, _edge: &str, _count: u64) {}

    /// Set the number of DNS records handed to the DNS collaborator.
    fn set_dns_records(&self, _count: u64) {}

    /// Drop every per-zone and per-edge rule gauge before a new deployment
    /// is reported.
    fn clear_rule_gauges(&self) {}
}

// ── Target group health metrics ────────────────────────────────────

pub trait HealthMetrics: Send + Sync {
    /// Set the health of a target group (true=healthy).
    fn set_target_group_health(&self, _target_group: &str, _healthy: bool) {}

    /// Drop the health gauge of every target group.
    fn clear_target_group_health(&self) {}

    /// Record a request that matched an unavailable target group.
    fn record_target_unavailable(&self, _edge: &str) {}
}

// ── Configuration metrics ──────────────────────────────────────────

pub trait ConfigMetrics: Send + Sync {
    /// Record a configuration reload attempt (success or failure).
    fn record_config_reload(&self, _result: &str) {}
}

// ── Composite super-trait ──────────────────────────────────────────

/// Unified metrics port composing all sub-traits.
///
/// Services accept `Arc<dyn MetricsPort>` for full access. The sub-traits
/// provide default no-op implementations so that test mocks only need to
/// override the methods they care about.
pub trait MetricsPort: CompileMetrics + RuleMetrics + HealthMetrics + ConfigMetrics {}

/// Blanket implementation: any type implementing all sub-traits automatically
/// implements `MetricsPort`.
impl<T> MetricsPort for T where T: CompileMetrics + RuleMetrics + HealthMetrics + ConfigMetrics {}
