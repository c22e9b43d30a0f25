pub mod client;
pub mod error;
pub(crate) mod retry;
pub mod types;

pub use client::AivisClient;
pub use error::ClientError;
