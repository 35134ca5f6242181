//! Azure API interaction module
//!
//! This module provides the core functionality for talking to Azure Resource
//! Manager: authentication, token exchange, the HTTP client and the client
//! that ties them together.
//!
//! # Module Structure
//!
//! - [`auth`] - Service principal authentication methods (client certificate, client secret)
//! - [`authorizer`] - Request authorizers with token caching
//! - [`client`] - Main ARM client for executing operations
//! - [`environment`] - Azure clouds and their endpoints
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use azrm::azure::{auth::AuthBuilder, client::ArmClient, environment::Environment, http::ArmHttpClient};
//!
//! async fn example(builder: AuthBuilder) -> azrm::Result<ArmClient> {
//!     let environment = Environment::public();
//!     let http = ArmHttpClient::new()?;
//!     let method = builder.build()?;
//!     method.validate()?;
//!     let authorizer = method
//!         .authorizer(http.inner(), &environment, &environment.token_audience)
//!         .await?;
//!     Ok(ArmClient::new(authorizer, http, &environment.resource_manager))
//! }
//! ```

pub mod auth;
pub mod authorizer;
pub mod client;
pub mod environment;
pub mod http;
mod token;
