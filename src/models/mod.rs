//! Domain model module declarations.

pub mod event;
pub mod request;
pub mod wire;
pub mod workflow;
