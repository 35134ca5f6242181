//! Declarative Azure Resource Manager resources
//!
//! - [`resourceids`] - Parsing and formatting of ARM resource IDs
//! - [`sdk`] - Per-service models and REST clients
//! - [`resource`] - Resource types with schemas and CRUD operations
//! - [`azure`] - Authentication, environments and the ARM client
//! - [`config`] - File and environment configuration

pub mod azure;
pub mod config;
pub mod error;
pub mod resource;
pub mod resourceids;
pub mod sdk;

pub use error::{Error, Result};
