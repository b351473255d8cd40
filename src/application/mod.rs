//! Application layer orchestrating the domain rules over the store ports.
//!
//! [`machine::VendingMachine`] wires the services together; each service
//! serializes its read-modify-write sequences through the shared
//! [`ledger::Ledger`] lock registry.

pub mod catalog;
pub mod credentials;
pub mod directory;
pub mod engine;
pub mod ledger;
pub mod machine;
pub mod session;
