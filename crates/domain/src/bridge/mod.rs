pub mod adapter;
pub mod entity;
pub mod error;
