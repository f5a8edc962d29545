#![forbid(unsafe_code)]

pub mod policy_service_impl;
