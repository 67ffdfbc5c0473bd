//! Model Context Protocol integration.

pub mod discovery;
