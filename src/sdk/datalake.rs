//! Data Lake Analytics storage account registrations (API version 2016-11-01)

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::to_body;
use crate::azure::client::{ArmClient, Operation};
use crate::error::Result;
use crate::resourceids::{KeyMatch, ParsedResourceId, ResourceId};

pub const API_VERSION: &str = "2016-11-01";

const PROVIDER: &str = "Microsoft.DataLakeAnalytics";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAccountId {
    pub subscription_id: String,
    pub resource_group: String,
    pub account_name: String,
    pub name: String,
}

impl StorageAccountId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        account_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            account_name: account_name.into(),
            name: name.into(),
        }
    }

    fn parse_with(input: &str, mode: KeyMatch) -> Result<Self> {
        let mut id = ParsedResourceId::parse(input, mode)?;
        let resource_group = id.require_resource_group()?;
        id.pop_provider(PROVIDER)?;
        let account_name = id.pop_segment("accounts")?;
        let name = id.pop_segment("storageAccounts")?;
        id.validate_no_remaining_segments()?;

        Ok(Self::new(id.subscription_id(), resource_group, account_name, name))
    }
}

impl ResourceId for StorageAccountId {
    fn parse(input: &str) -> Result<Self> {
        Self::parse_with(input, KeyMatch::Exact)
    }

    fn parse_insensitively(input: &str) -> Result<Self> {
        Self::parse_with(input, KeyMatch::Insensitive)
    }

    fn id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/accounts/{}/storageAccounts/{}",
            self.subscription_id, self.resource_group, PROVIDER, self.account_name, self.name
        )
    }
}

impl fmt::Display for StorageAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Storage Account: (Name {:?} / Account Name {:?} / Resource Group {:?})",
            self.name, self.account_name, self.resource_group
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStorageAccountProperties {
    pub access_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddStorageAccountParameters {
    pub properties: AddStorageAccountProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStorageAccountProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateStorageAccountParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<UpdateStorageAccountProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageAccountProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

/// The access key is write-only and never returned
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageAccountInformation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<StorageAccountProperties>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
}

#[derive(Clone)]
pub struct StorageAccountsClient {
    client: ArmClient,
}

impl StorageAccountsClient {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    /// Register a storage account; the service answers 200 with an empty body
    pub async fn add(&self, id: &StorageAccountId, input: &AddStorageAccountParameters) -> Result<()> {
        const OP: &str = "StorageAccounts.Add";
        let operation = Operation::new(OP, Method::PUT, id.id(), API_VERSION).with_body(to_body(OP, input)?);
        self.client.execute(operation).await.map(|_| ())
    }

    pub async fn get(&self, id: &StorageAccountId) -> Result<StorageAccountInformation> {
        const OP: &str = "StorageAccounts.Get";
        let operation = Operation::new(OP, Method::GET, id.id(), API_VERSION);
        self.client.execute(operation).await?.model(OP)
    }

    pub async fn update(&self, id: &StorageAccountId, input: &UpdateStorageAccountParameters) -> Result<()> {
        const OP: &str = "StorageAccounts.Update";
        let operation = Operation::new(OP, Method::PATCH, id.id(), API_VERSION).with_body(to_body(OP, input)?);
        self.client.execute(operation).await.map(|_| ())
    }

    pub async fn delete(&self, id: &StorageAccountId) -> Result<()> {
        const OP: &str = "StorageAccounts.Delete";
        let operation = Operation::new(OP, Method::DELETE, id.id(), API_VERSION).expecting(&[200, 204]);
        self.client.execute(operation).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let id = StorageAccountId::new("sub", "rg", "analytics", "store");
        assert_eq!(
            id.id(),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.DataLakeAnalytics/accounts/analytics/storageAccounts/store"
        );
        assert_eq!(StorageAccountId::parse(&id.id()).unwrap(), id);
    }

    #[test]
    fn test_update_omits_unset_fields() {
        let input = UpdateStorageAccountParameters {
            properties: Some(UpdateStorageAccountProperties {
                access_key: Some("key".into()),
                suffix: None,
            }),
        };
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            serde_json::json!({"properties": {"accessKey": "key"}})
        );
    }
}
