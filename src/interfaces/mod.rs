//! Outer adapters driving the machine from batch input.

pub mod csv;
pub mod replay;
