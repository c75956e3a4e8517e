pub mod resource_token;

pub use resource_token::TokenResource;
