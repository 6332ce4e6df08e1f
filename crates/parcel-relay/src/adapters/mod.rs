//! Adapters layer: codec, TCP server and TCP client.

pub mod client;
pub mod codec;
pub mod server;

pub use client::ParcelClient;
pub use codec::BincodeCodec;
pub use server::{serve_connection, ParcelServer};
