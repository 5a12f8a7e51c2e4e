//! State management module
//!
//! This module handles all application state:
//! - The upload session controller (session.rs)
//! - Shared data structures (data.rs)
//! - Upload acceptance rules (policy.rs)

pub mod data;
pub mod policy;
pub mod session;

pub use session::{Phase, UploadSession};
