#![forbid(unsafe_code)]

pub mod bridge;
pub mod common;
pub mod deployment;
pub mod dispatch;
pub mod firewall;
pub mod flow;
pub mod zone;
