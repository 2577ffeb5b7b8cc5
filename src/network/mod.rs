pub mod client;
pub mod protocol;
#[cfg(test)]
pub mod testing;
pub mod transport;

pub use client::ChatClient;
pub use transport::WsConnector;
