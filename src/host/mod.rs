//! Renderer-facing contract, channel and stdio bridge.

pub mod channel;
pub mod contract;
pub mod stdio;
