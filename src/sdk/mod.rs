//! Service clients
//!
//! Each submodule covers one ARM resource provider: its resource ID types,
//! its request/response models and a thin client whose methods map one to
//! one onto REST operations.
//!
//! - [`costmanagement`] - Cost Management exports (subscription, resource group and management group scope)
//! - [`datalake`] - Data Lake Analytics storage account registrations
//! - [`eventhub`] - Event Hub namespace authorization rules
//! - [`servicefabric`] - Service Fabric managed cluster services and scaling policies

pub mod costmanagement;
pub mod datalake;
pub mod eventhub;
pub mod servicefabric;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Metadata about creation and last modification of a resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_by_type: Option<String>,
}

/// Encode a request model
pub(crate) fn to_body<T: Serialize>(operation: &str, input: &T) -> Result<Value> {
    serde_json::to_value(input).map_err(|source| Error::Decode {
        what: format!("{} request", operation),
        source,
    })
}
