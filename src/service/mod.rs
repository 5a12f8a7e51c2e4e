//! Talking to the remote processing service
//!
//! - `client.rs` - the HTTP requests (multipart upload, URL reference, result download)
//! - `response.rs` - reading success bodies and error bodies

pub mod client;
pub mod response;

pub use client::ProcessingClient;
