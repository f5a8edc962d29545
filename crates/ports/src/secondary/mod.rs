pub mod metrics_port;
pub mod policy_sink;
