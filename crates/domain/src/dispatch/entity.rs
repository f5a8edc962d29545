use serde::{Deserialize, Serialize};

use super::error::DispatchError;

/// Routing header used by internal-only edges.
pub const DEFAULT_ROUTING_HEADER: &str = "X-ISP-Desired-Service";

/// Listener port of a public-facing edge.
pub const DEFAULT_LISTENER_PORT: u16 = 443;

/// TTL of every emitted DNS record.
pub const DNS_TTL_SECS: u32 = 60;

// ── Match kind ──────────────────────────────────────────────────────

/// How the dispatcher picks a rule for a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    /// Match on the request host name. Used by public-facing edges.
    Host,
    /// Match on the value of a routing header. Used by internal edges,
    /// where host-based matching is not available.
    Header { name: String },
}

impl MatchKind {
    /// Header matching on [`DEFAULT_ROUTING_HEADER`].
    pub fn routing_header() -> Self {
        Self::Header {
            name: DEFAULT_ROUTING_HEADER.to_string(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Header { .. } => "header",
        }
    }

    pub fn is_header(&self) -> bool {
        matches!(self, Self::Header { .. })
    }

    /// Key used for duplicate detection. Host names are case-insensitive.
    pub(crate) fn normalize_key(&self, key: &str) -> String {
        match self {
            Self::Host => key.to_ascii_lowercase(),
            Self::Header { .. } => key.to_string(),
        }
    }
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Header { name } => write!(f, "header:{name}"),
        }
    }
}

// ── Service endpoint ────────────────────────────────────────────────

/// A backend service pool reachable at `port` inside `zone`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub name: String,
    pub zone: String,
    pub port: u16,
    #[serde(default = "default_health_check_path")]
    pub health_check_path: String,
}

fn default_health_check_path() -> String {
    "/".to_string()
}

impl ServiceEndpoint {
    pub fn new(name: impl Into<String>, zone: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            zone: zone.into(),
            port,
            health_check_path: default_health_check_path(),
        }
    }

    pub fn validate(&self, edge: &str) -> Result<(), DispatchError> {
        let invalid = |reason: &str| DispatchError::InvalidEndpoint {
            edge: edge.to_string(),
            service: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.is_empty() {
            return Err(invalid("service name must not be empty"));
        }
        if self.port == 0 {
            return Err(invalid("port must not be 0"));
        }
        if !self.health_check_path.starts_with('/') {
            return Err(invalid("health check path must start with '/'"));
        }
        Ok(())
    }
}

impl std::fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.name, self.zone, self.port)
    }
}

// ── Edge spec ───────────────────────────────────────────────────────

/// One declared match key and the service it routes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchEntry {
    pub key: String,
    pub endpoint: ServiceEndpoint,
}

/// Input of one dispatch compilation: a dispatcher and its ordered
/// key -> service mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub name: String,
    pub match_kind: MatchKind,
    /// Address DNS records point at.
    pub dispatcher_address: String,
    pub listener_port: u16,
    /// Opaque; only labels the output.
    #[serde(default)]
    pub certificate_ref: Option<String>,
    /// Opaque; only labels the output.
    #[serde(default)]
    pub dns_zone_ref: Option<String>,
    pub entries: Vec<DispatchEntry>,
}

impl EdgeSpec {
    pub fn new(
        name: impl Into<String>,
        match_kind: MatchKind,
        dispatcher_address: impl Into<String>,
        listener_port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            match_kind,
            dispatcher_address: dispatcher_address.into(),
            listener_port,
            certificate_ref: None,
            dns_zone_ref: None,
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, endpoint: ServiceEndpoint) -> Self {
        self.entries.push(DispatchEntry {
            key: key.into(),
            endpoint,
        });
        self
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        let invalid = |reason: String| DispatchError::InvalidEdge {
            edge: self.name.clone(),
            reason,
        };
        if self.name.is_empty() {
            return Err(invalid("edge name must not be empty".to_string()));
        }
        if self.name.contains(TARGET_GROUP_SEPARATOR) {
            return Err(invalid(format!(
                "edge name must not contain '{TARGET_GROUP_SEPARATOR}'"
            )));
        }
        if self.dispatcher_address.is_empty() {
            return Err(invalid("dispatcher address must not be empty".to_string()));
        }
        if self.listener_port == 0 {
            return Err(invalid("listener port must not be 0".to_string()));
        }
        if let MatchKind::Header { name } = &self.match_kind
            && name.is_empty()
        {
            return Err(invalid("header name must not be empty".to_string()));
        }
        if let Some(entry) = self.entries.iter().find(|e| e.key.is_empty()) {
            return Err(invalid(format!(
                "empty match key for service '{}'",
                entry.endpoint.name
            )));
        }
        Ok(())
    }
}

// ── Target groups ───────────────────────────────────────────────────

/// Active health check run against every member of a target group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckPolicy {
    pub path: String,
    pub interval_secs: u32,
    /// Consecutive successes before an unhealthy group routes again.
    pub healthy_threshold: u32,
    /// Consecutive failures before a group stops receiving traffic.
    pub unhealthy_threshold: u32,
}

impl HealthCheckPolicy {
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

impl Default for HealthCheckPolicy {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            interval_secs: 10,
            healthy_threshold: 2,
            unhealthy_threshold: 2,
        }
    }
}

/// Forwarding target bound to one service endpoint. Backends are short
/// lived, so deregistration drains fast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    pub name: String,
    pub endpoint: ServiceEndpoint,
    pub port: u16,
    pub deregistration_delay_secs: u32,
    pub health_check: HealthCheckPolicy,
}

/// Separates the parts of a target group name. Edge names may not contain
/// it, so names stay unique across every edge of a deployment.
pub const TARGET_GROUP_SEPARATOR: char = '/';

impl TargetGroup {
    pub const DEREGISTRATION_DELAY_SECS: u32 = 2;

    /// Name of the group behind rule `priority` of `edge`.
    pub fn scoped_name(edge: &str, priority: u32, service: &str) -> String {
        let sep = TARGET_GROUP_SEPARATOR;
        format!("{edge}{sep}{priority}{sep}{service}")
    }

    pub fn for_endpoint(name: impl Into<String>, endpoint: &ServiceEndpoint) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.clone(),
            port: endpoint.port,
            deregistration_delay_secs: Self::DEREGISTRATION_DELAY_SECS,
            health_check: HealthCheckPolicy::for_path(endpoint.health_check_path.clone()),
        }
    }
}

// ── Rules ───────────────────────────────────────────────────────────

/// Explicit rule: when the request's `match_kind` equals `match_value`,
/// forward to `target` and nowhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRule {
    pub priority: u32,
    pub match_kind: MatchKind,
    pub match_value: String,
    pub target: TargetGroup,
}

impl DispatchRule {
    pub fn matches(&self, request: &DispatchRequest) -> bool {
        match &self.match_kind {
            MatchKind::Host => request
                .host_name()
                .is_some_and(|host| host.eq_ignore_ascii_case(&self.match_value)),
            MatchKind::Header { name } => request.header(name) == Some(self.match_value.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedResponse {
    pub status_code: u16,
    pub content_type: String,
    pub body: String,
}

impl FixedResponse {
    pub fn not_found() -> Self {
        Self {
            status_code: 404,
            content_type: "text/plain".to_string(),
            body: "Fallback action says: not found\n".to_string(),
        }
    }
}

/// Unconditional last rule; has no priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRule {
    pub response: FixedResponse,
}

impl Default for FallbackRule {
    fn default() -> Self {
        Self {
            response: FixedResponse::not_found(),
        }
    }
}

// ── Requests ────────────────────────────────────────────────────────

/// The parts of an incoming request the dispatcher inspects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchRequest {
    pub host: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl DispatchRequest {
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Host without any `:port` suffix.
    pub fn host_name(&self) -> Option<&str> {
        self.host
            .as_deref()
            .map(|h| h.split_once(':').map_or(h, |(name, _)| name))
    }

    /// First value of a header. Header names are case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Outcome of dispatching one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    Forward {
        priority: u32,
        target: &'a TargetGroup,
    },
    Fallback(&'a FixedResponse),
}

// ── DNS ─────────────────────────────────────────────────────────────

/// A name -> address pair handed to the DNS collaborator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DnsRecord {
    pub name: String,
    pub target: String,
    pub ttl_secs: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_ref: Option<String>,
}

// ── Dispatch table ──────────────────────────────────────────────────

/// Compiled dispatcher configuration for one edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchTable {
    pub edge: String,
    pub match_kind: MatchKind,
    pub listener_port: u16,
    pub dispatcher_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_zone_ref: Option<String>,
    /// Ordered by priority, 1..=n.
    pub rules: Vec<DispatchRule>,
    pub fallback: FallbackRule,
}

impl DispatchTable {
    /// First matching rule by priority, otherwise the fallback. Total: every
    /// request gets a defined answer.
    pub fn resolve(&self, request: &DispatchRequest) -> Resolution<'_> {
        self.rules
            .iter()
            .find(|r| r.matches(request))
            .map_or(Resolution::Fallback(&self.fallback.response), |r| {
                Resolution::Forward {
                    priority: r.priority,
                    target: &r.target,
                }
            })
    }

    /// One record per host key, pointing at the dispatcher. Header-matched
    /// edges are not reachable by name and publish nothing.
    pub fn dns_records(&self) -> Vec<DnsRecord> {
        if self.match_kind != MatchKind::Host {
            return Vec::new();
        }
        self.rules
            .iter()
            .map(|r| DnsRecord {
                name: r.match_value.clone(),
                target: self.dispatcher_address.clone(),
                ttl_secs: DNS_TTL_SECS,
                zone_ref: self.dns_zone_ref.clone(),
            })
            .collect()
    }

    pub fn target_groups(&self) -> impl Iterator<Item = &TargetGroup> {
        self.rules.iter().map(|r| &r.target)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_kind_serde_is_tagged() {
        let json = serde_json::to_string(&MatchKind::routing_header()).unwrap();
        assert_eq!(json, r#"{"kind":"header","name":"X-ISP-Desired-Service"}"#);
        let host: MatchKind = serde_json::from_str(r#"{"kind":"host"}"#).unwrap();
        assert_eq!(host, MatchKind::Host);
    }

    #[test]
    fn host_keys_normalize_case() {
        assert_eq!(MatchKind::Host.normalize_key("Svc-A.Example.com"), "svc-a.example.com");
        assert_eq!(MatchKind::routing_header().normalize_key("Svc-A"), "Svc-A");
    }

    #[test]
    fn request_host_strips_port() {
        let req = DispatchRequest::for_host("svc-a.example.com:443");
        assert_eq!(req.host_name(), Some("svc-a.example.com"));
        assert_eq!(DispatchRequest::default().host_name(), None);
    }

    #[test]
    fn request_header_name_is_case_insensitive() {
        let req = DispatchRequest::default().with_header("x-isp-desired-service", "svc-a");
        assert_eq!(req.header(DEFAULT_ROUTING_HEADER), Some("svc-a"));
        assert_eq!(req.header("x-other"), None);
    }

    #[test]
    fn endpoint_validation() {
        assert!(ServiceEndpoint::new("svc-a", "app", 3000).validate("edge").is_ok());
        assert!(ServiceEndpoint::new("svc-a", "app", 0).validate("edge").is_err());
        let mut ep = ServiceEndpoint::new("svc-a", "app", 3000);
        ep.health_check_path = "health".to_string();
        assert!(ep.validate("edge").is_err());
    }

    #[test]
    fn edge_validation() {
        let edge = EdgeSpec::new("public", MatchKind::Host, "10.0.0.10", 443)
            .with_entry("svc-a", ServiceEndpoint::new("svc-a", "app", 3000));
        assert!(edge.validate().is_ok());

        let empty_key = EdgeSpec::new("public", MatchKind::Host, "10.0.0.10", 443)
            .with_entry("", ServiceEndpoint::new("svc-a", "app", 3000));
        assert!(empty_key.validate().is_err());

        let no_header = EdgeSpec::new(
            "internal",
            MatchKind::Header {
                name: String::new(),
            },
            "10.64.0.10",
            80,
        );
        assert!(no_header.validate().is_err());
    }

    #[test]
    fn target_group_defaults() {
        let tg = TargetGroup::for_endpoint("tg", &ServiceEndpoint::new("svc-a", "app", 3000));
        assert_eq!(tg.port, 3000);
        assert_eq!(tg.deregistration_delay_secs, 2);
        assert_eq!(tg.health_check.interval_secs, 10);
        assert_eq!(tg.health_check.healthy_threshold, 2);
        assert_eq!(tg.health_check.path, "/");
    }

    #[test]
    fn fallback_is_fixed_not_found() {
        let fallback = FallbackRule::default();
        assert_eq!(fallback.response.status_code, 404);
        assert_eq!(fallback.response.content_type, "text/plain");
        assert_eq!(fallback.response.body, "Fallback action says: not found\n");
    }
}
