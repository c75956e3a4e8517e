//! Protocol buffer types for Terraform Plugin Protocol v6
//!
//! This module includes and re-exports the generated protobuf types from
//! proto/tfplugin6.proto. The protobuf code is generated at build time by
//! tonic_build and included here.
//!
//! Generated types share names with framework types (`DynamicValue`,
//! `Diagnostic`, `Schema`, ...), so refer to them through the module:
//!
//! ```rust,ignore
//! use tfplug::proto;
//!
//! let request = proto::read_resource::Request::default();
//! let encoded = proto::DynamicValue::default();
//! ```
//!
//! RPC request and response messages live in snake_case modules named after
//! the RPC; the service trait is `provider_server::Provider`.

// The file name is based on the proto package name (tfplugin6)
include!(concat!(env!("OUT_DIR"), "/tfplugin6.rs"));

// Re-export the gRPC service trait and server
pub use provider_server::{Provider as ProviderService, ProviderServer};
