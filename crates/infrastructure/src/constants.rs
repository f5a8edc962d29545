// ── Paths ──────────────────────────────────────────────────────────

pub const DEFAULT_CONFIG_PATH: &str = "/etc/netladder/config.yaml";
pub const DEFAULT_OUTPUT_PATH: &str = "/var/lib/netladder/compiled.json";
