pub mod compiler;
pub mod entity;
pub mod posture;
