//! Session orchestration modules.
//!
//! Covers thread resolution, translation of engine events into wire
//! events, interrupt packaging, framing, and the streaming pipeline that
//! ties them to the checkpoint backend and the side log.

pub mod framer;
pub mod interrupt;
pub mod sanitize;
pub mod session_manager;
pub mod streamer;
pub mod thread_registry;
pub mod translator;
