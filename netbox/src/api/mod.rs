//! NetBox REST API client

pub mod client;
pub mod common;
pub mod error;
pub mod users;

pub use client::{Client, ClientConfig};
pub use error::ApiError;
