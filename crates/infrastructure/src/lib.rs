#![forbid(unsafe_code)]

pub mod config;
pub mod constants;
pub mod logging;
pub mod metrics;
pub mod output;
