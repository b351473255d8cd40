//! Domain model: money and coins, accounts, products, and the storage ports
//! the application layer is written against.

pub mod account;
pub mod coin;
pub mod ports;
pub mod product;
