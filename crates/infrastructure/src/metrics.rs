use ports::secondary::metrics_port::{CompileMetrics, ConfigMetrics, HealthMetrics, RuleMetrics};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets_range};
use prometheus_client::registry::Registry;

// ── Label types ─────────────────────────────────────────────────────

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ResultLabels {
    pub result: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct CategoryLabels {
    pub category: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ZoneLabels {
    pub zone: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct EdgeLabels {
    pub edge: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct TargetGroupLabels {
    pub target_group: String,
}

// ── Compiler metrics registry ───────────────────────────────────────

/// Prometheus metrics registry for the policy compiler.
///
/// All metric families use interior mutability (atomics), so recording
/// metrics only requires `&self`. Wrap in `Arc` for sharing.
pub struct CompilerMetrics {
    registry: Registry,
    pub compilations_total: Family<ResultLabels, Counter>,
    pub compile_errors_total: Family<CategoryLabels, Counter>,
    pub compile_duration: Histogram,
    pub zone_rules: Family<ZoneLabels, Gauge>,
    pub dispatch_rules: Family<EdgeLabels, Gauge>,
    pub dns_records: Gauge,
    pub target_group_healthy: Family<TargetGroupLabels, Gauge>,
    pub target_unavailable_total: Family<EdgeLabels, Counter>,
    pub config_reloads_total: Family<ResultLabels, Counter>,
}

impl CompilerMetrics {
    /// Create a new metrics registry with all metrics registered under
    /// the `netladder` prefix.
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("netladder");

        let compilations_total = Family::<ResultLabels, Counter>::default();
        registry.register(
            "compilations",
            "Compilation passes by result",
            compilations_total.clone(),
        );

        let compile_errors_total = Family::<CategoryLabels, Counter>::default();
        registry.register(
            "compile_errors",
            "Failed compilation passes by error category",
            compile_errors_total.clone(),
        );

        // Exponential buckets from 10μs to 1s (12 buckets)
        let compile_duration = Histogram::new(exponential_buckets_range(0.000_01, 1.0, 12));
        registry.register(
            "compile_duration_seconds",
            "Wall time of one compilation pass in seconds",
            compile_duration.clone(),
        );

        let zone_rules = Family::<ZoneLabels, Gauge>::default();
        registry.register(
            "zone_rules",
            "Compiled packet-filter rules per zone",
            zone_rules.clone(),
        );

        let dispatch_rules = Family::<EdgeLabels, Gauge>::default();
        registry.register(
            "dispatch_rules",
            "Explicit dispatch rules per edge",
            dispatch_rules.clone(),
        );

        let dns_records = Gauge::default();
        registry.register(
            "dns_records",
            "DNS records emitted by the last compilation",
            dns_records.clone(),
        );

        let target_group_healthy = Family::<TargetGroupLabels, Gauge>::default();
        registry.register(
            "target_group_healthy",
            "Target group health (1=healthy, 0=unhealthy)",
            target_group_healthy.clone(),
        );

        let target_unavailable_total = Family::<EdgeLabels, Counter>::default();
        registry.register(
            "target_unavailable",
            "Requests that matched an unavailable target group",
            target_unavailable_total.clone(),
        );

        let config_reloads_total = Family::<ResultLabels, Counter>::default();
        registry.register(
            "config_reloads",
            "Configuration reload attempts",
            config_reloads_total.clone(),
        );

        Self {
            registry,
            compilations_total,
            compile_errors_total,
            compile_duration,
            zone_rules,
            dispatch_rules,
            dns_records,
            target_group_healthy,
            target_unavailable_total,
            config_reloads_total,
        }
    }

    /// Encode all registered metrics to `OpenMetrics` text format.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if let Err(e) = prometheus_client::encoding::text::encode(&mut buffer, &self.registry) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        buffer
    }
}

impl Default for CompilerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn gauge_value(count: u64) -> i64 {
    count.try_into().unwrap_or(i64::MAX)
}

// ── Sub-trait implementations ──────────────────────────────────────

impl CompileMetrics for CompilerMetrics {
    fn record_compilation(&self, result: &str) {
        self.compilations_total
            .get_or_create(&ResultLabels {
                result: result.to_string(),
            })
            .inc();
    }

    fn record_compile_error(&self, category: &str) {
        self.compile_errors_total
            .get_or_create(&CategoryLabels {
                category: category.to_string(),
            })
            .inc();
    }

    fn observe_compile_duration(&self, duration_seconds: f64) {
        self.compile_duration.observe(duration_seconds);
    }
}

impl RuleMetrics for CompilerMetrics {
    fn set_zone_rules(&self, zone: &str, count: u64) {
        self.zone_rules
            .get_or_create(&ZoneLabels {
                zone: zone.to_string(),
            })
            .set(gauge_value(count));
    }

    fn set_dispatch_rules(&self, edge: &str, count: u64) {
        self.dispatch_rules
            .get_or_create(&EdgeLabels {
                edge: edge.to_string(),
            })
            .set(gauge_value(count));
    }

    fn set_dns_records(&self, count: u64) {
        self.dns_records.set(gauge_value(count));
    }

    fn clear_rule_gauges(&self) {
        self.zone_rules.clear();
        self.dispatch_rules.clear();
    }
}

impl HealthMetrics for CompilerMetrics {
    fn set_target_group_health(&self, target_group: &str, healthy: bool) {
        self.target_group_healthy
            .get_or_create(&TargetGroupLabels {
                target_group: target_group.to_string(),
            })
            .set(i64::from(healthy));
    }

    fn clear_target_group_health(&self) {
        self.target_group_healthy.clear();
    }

    fn record_target_unavailable(&self, edge: &str) {
        self.target_unavailable_total
            .get_or_create(&EdgeLabels {
                edge: edge.to_string(),
            })
            .inc();
    }
}

impl ConfigMetrics for CompilerMetrics {
    fn record_config_reload(&self, result: &str) {
        self.config_reloads_total
            .get_or_create(&ResultLabels {
                result: result.to_string(),
            })
            .inc();
    }
}

// MetricsPort is automatically implemented via the blanket impl
// since CompilerMetrics implements all sub-traits.
