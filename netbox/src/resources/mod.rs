//! Resource implementations

pub mod users;

pub use users::TokenResource;
