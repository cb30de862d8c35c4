//! Exchange stream lifecycle plugins

pub mod connection;

pub use connection::{ConnectionApi, ConnectionPlugin};
