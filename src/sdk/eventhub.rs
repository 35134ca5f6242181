//! Event Hub namespace authorization rules (API version 2017-04-01)

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{to_body, SystemData};
use crate::azure::client::{ArmClient, Operation};
use crate::error::Result;
use crate::resourceids::{KeyMatch, ParsedResourceId, ResourceId};

pub const API_VERSION: &str = "2017-04-01";

const PROVIDER: &str = "Microsoft.EventHub";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRuleId {
    pub subscription_id: String,
    pub resource_group: String,
    pub namespace_name: String,
    pub name: String,
}

impl AuthorizationRuleId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        namespace_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            namespace_name: namespace_name.into(),
            name: name.into(),
        }
    }

    fn parse_with(input: &str, mode: KeyMatch) -> Result<Self> {
        let mut id = ParsedResourceId::parse(input, mode)?;
        let resource_group = id.require_resource_group()?;
        id.pop_provider(PROVIDER)?;
        let namespace_name = id.pop_segment("namespaces")?;
        let name = id.pop_segment("authorizationRules")?;
        id.validate_no_remaining_segments()?;

        Ok(Self::new(id.subscription_id(), resource_group, namespace_name, name))
    }
}

impl ResourceId for AuthorizationRuleId {
    fn parse(input: &str) -> Result<Self> {
        Self::parse_with(input, KeyMatch::Exact)
    }

    fn parse_insensitively(input: &str) -> Result<Self> {
        Self::parse_with(input, KeyMatch::Insensitive)
    }

    fn id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/namespaces/{}/authorizationRules/{}",
            self.subscription_id, self.resource_group, PROVIDER, self.namespace_name, self.name
        )
    }
}

impl fmt::Display for AuthorizationRuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Authorization Rule: (Name {:?} / Namespace Name {:?} / Resource Group {:?})",
            self.name, self.namespace_name, self.resource_group
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessRights {
    Listen,
    Manage,
    Send,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRuleProperties {
    pub rights: Vec<AccessRights>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<AuthorizationRuleProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_data: Option<SystemData>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
}

#[derive(Clone)]
pub struct AuthorizationRulesClient {
    client: ArmClient,
}

impl AuthorizationRulesClient {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    pub async fn create_or_update(&self, id: &AuthorizationRuleId, input: &AuthorizationRule) -> Result<AuthorizationRule> {
        const OP: &str = "AuthorizationRules.CreateOrUpdate";
        let operation = Operation::new(OP, Method::PUT, id.id(), API_VERSION).with_body(to_body(OP, input)?);
        self.client.execute(operation).await?.model(OP)
    }

    pub async fn get(&self, id: &AuthorizationRuleId) -> Result<AuthorizationRule> {
        const OP: &str = "AuthorizationRules.Get";
        let operation = Operation::new(OP, Method::GET, id.id(), API_VERSION);
        self.client.execute(operation).await?.model(OP)
    }

    pub async fn delete(&self, id: &AuthorizationRuleId) -> Result<()> {
        const OP: &str = "AuthorizationRules.Delete";
        let operation = Operation::new(OP, Method::DELETE, id.id(), API_VERSION).expecting(&[200, 204]);
        self.client.execute(operation).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const ID: &str = "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/example-resource-group/providers/Microsoft.EventHub/namespaces/namespaceValue/authorizationRules/authorizationRuleValue";

    #[test]
    fn test_parse_and_format() {
        let id = AuthorizationRuleId::parse(ID).unwrap();
        assert_eq!(id.subscription_id, "12345678-1234-9876-4563-123456789012");
        assert_eq!(id.resource_group, "example-resource-group");
        assert_eq!(id.namespace_name, "namespaceValue");
        assert_eq!(id.name, "authorizationRuleValue");
        assert_eq!(id.id(), ID);
    }

    #[test]
    fn test_parse_rejects_partial_ids() {
        let partial = "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/example-resource-group/providers/Microsoft.EventHub/namespaces/namespaceValue";
        let err = AuthorizationRuleId::parse(partial).unwrap_err();
        assert!(matches!(err, Error::MissingSegment { ref segment, .. } if segment == "authorizationRules"));
    }

    #[test]
    fn test_parse_rejects_extra_segments() {
        let extra = format!("{}/extra/value", ID);
        assert!(matches!(
            AuthorizationRuleId::parse(&extra),
            Err(Error::UnexpectedSegments { .. })
        ));
    }

    #[test]
    fn test_parse_insensitively_restores_casing() {
        let shouty = "/SUBSCRIPTIONS/12345678-1234-9876-4563-123456789012/RESOURCEGROUPS/example-resource-group/PROVIDERS/MICROSOFT.EVENTHUB/NAMESPACES/namespaceValue/AUTHORIZATIONRULES/authorizationRuleValue";
        assert!(AuthorizationRuleId::parse(shouty).is_err());
        let id = AuthorizationRuleId::parse_insensitively(shouty).unwrap();
        assert_eq!(id.id(), ID);
    }

    #[test]
    fn test_display() {
        let id = AuthorizationRuleId::new("sub", "rg", "ns", "rule");
        assert_eq!(
            id.to_string(),
            r#"Authorization Rule: (Name "rule" / Namespace Name "ns" / Resource Group "rg")"#
        );
    }

    #[test]
    fn test_rights_serialize_as_strings() {
        let rule = AuthorizationRule {
            properties: Some(AuthorizationRuleProperties {
                rights: vec![AccessRights::Listen, AccessRights::Send],
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json, serde_json::json!({"properties": {"rights": ["Listen", "Send"]}}));
    }
}
