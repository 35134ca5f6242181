//! Cost Management exports (API version 2020-06-01)
//!
//! Exports are scope resources: the same API serves exports defined on a
//! subscription, a resource group or a management group, so the client is
//! generic over the identifier type.

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::to_body;
use crate::azure::client::{ArmClient, Operation};
use crate::error::Result;
use crate::resourceids::{KeyMatch, ManagementGroupId, ParsedResourceId, ResourceId};

pub const API_VERSION: &str = "2020-06-01";

const PROVIDER: &str = "Microsoft.CostManagement";

pub const RECURRENCE_TYPES: &[&str] = &["Annually", "Daily", "Monthly", "Weekly"];
pub const EXPORT_TYPES: &[&str] = &["ActualCost", "AmortizedCost", "Usage"];
pub const TIME_FRAMES: &[&str] = &[
    "BillingMonthToDate",
    "Custom",
    "MonthToDate",
    "TheLastBillingMonth",
    "TheLastMonth",
    "WeekToDate",
];

/// `/subscriptions/{sub}/providers/Microsoft.CostManagement/exports/{name}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionExportId {
    pub subscription_id: String,
    pub name: String,
}

impl SubscriptionExportId {
    pub fn new(subscription_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            name: name.into(),
        }
    }

    fn parse_with(input: &str, mode: KeyMatch) -> Result<Self> {
        let mut id = ParsedResourceId::parse(input, mode)?;
        id.pop_provider(PROVIDER)?;
        let name = id.pop_segment("exports")?;
        id.validate_no_remaining_segments()?;

        Ok(Self::new(id.subscription_id(), name))
    }
}

impl ResourceId for SubscriptionExportId {
    fn parse(input: &str) -> Result<Self> {
        Self::parse_with(input, KeyMatch::Exact)
    }

    fn parse_insensitively(input: &str) -> Result<Self> {
        Self::parse_with(input, KeyMatch::Insensitive)
    }

    fn id(&self) -> String {
        format!(
            "/subscriptions/{}/providers/{}/exports/{}",
            self.subscription_id, PROVIDER, self.name
        )
    }
}

impl fmt::Display for SubscriptionExportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Subscription Cost Management Export: (Name {:?} / Subscription {:?})",
            self.name, self.subscription_id
        )
    }
}

/// `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.CostManagement/exports/{name}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGroupExportId {
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
}

impl ResourceGroupExportId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            name: name.into(),
        }
    }

    fn parse_with(input: &str, mode: KeyMatch) -> Result<Self> {
        let mut id = ParsedResourceId::parse(input, mode)?;
        let resource_group = id.require_resource_group()?;
        id.pop_provider(PROVIDER)?;
        let name = id.pop_segment("exports")?;
        id.validate_no_remaining_segments()?;

        Ok(Self::new(id.subscription_id(), resource_group, name))
    }
}

impl ResourceId for ResourceGroupExportId {
    fn parse(input: &str) -> Result<Self> {
        Self::parse_with(input, KeyMatch::Exact)
    }

    fn parse_insensitively(input: &str) -> Result<Self> {
        Self::parse_with(input, KeyMatch::Insensitive)
    }

    fn id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/exports/{}",
            self.subscription_id, self.resource_group, PROVIDER, self.name
        )
    }
}

impl fmt::Display for ResourceGroupExportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Resource Group Cost Management Export: (Name {:?} / Resource Group {:?})",
            self.name, self.resource_group
        )
    }
}

/// `/providers/Microsoft.Management/managementGroups/{mg}/providers/Microsoft.CostManagement/exports/{name}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagementGroupExportId {
    pub management_group: String,
    pub name: String,
}

impl ManagementGroupExportId {
    pub fn new(management_group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            management_group: management_group.into(),
            name: name.into(),
        }
    }

    fn parse_with(input: &str, mode: KeyMatch) -> Result<Self> {
        let mut id = ParsedResourceId::parse_tenant_scoped(input, mode)?;
        id.pop_provider(ManagementGroupId::PROVIDER)?;
        let management_group = id.pop_segment("managementGroups")?;
        id.pop_provider(PROVIDER)?;
        let name = id.pop_segment("exports")?;
        id.validate_no_remaining_segments()?;

        Ok(Self::new(management_group, name))
    }
}

impl ResourceId for ManagementGroupExportId {
    fn parse(input: &str) -> Result<Self> {
        Self::parse_with(input, KeyMatch::Exact)
    }

    fn parse_insensitively(input: &str) -> Result<Self> {
        Self::parse_with(input, KeyMatch::Insensitive)
    }

    fn id(&self) -> String {
        format!(
            "{}/providers/{}/exports/{}",
            ManagementGroupId::new(&self.management_group).id(),
            PROVIDER,
            self.name
        )
    }
}

impl fmt::Display for ManagementGroupExportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Management Group Cost Management Export: (Name {:?} / Management Group {:?})",
            self.name, self.management_group
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecurrencePeriod {
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSchedule {
    /// `Active` or `Inactive`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_period: Option<ExportRecurrencePeriod>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDeliveryDestination {
    /// Storage account ID
    pub resource_id: String,
    pub container: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_folder_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportDeliveryInfo {
    pub destination: ExportDeliveryDestination,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportDefinition {
    #[serde(rename = "type")]
    pub type_: String,
    pub timeframe: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub delivery_info: ExportDeliveryInfo,
    pub definition: ExportDefinition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ExportSchedule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Export {
    #[serde(rename = "eTag", skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<ExportProperties>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
}

#[derive(Clone)]
pub struct ExportsClient {
    client: ArmClient,
}

impl ExportsClient {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    pub async fn create_or_update<I: ResourceId>(&self, id: &I, input: &Export) -> Result<Export> {
        const OP: &str = "Exports.CreateOrUpdate";
        let operation = Operation::new(OP, Method::PUT, id.id(), API_VERSION)
            .with_body(to_body(OP, input)?)
            .expecting(&[200, 201]);
        self.client.execute(operation).await?.model(OP)
    }

    pub async fn get<I: ResourceId>(&self, id: &I) -> Result<Export> {
        const OP: &str = "Exports.Get";
        let operation = Operation::new(OP, Method::GET, id.id(), API_VERSION);
        self.client.execute(operation).await?.model(OP)
    }

    pub async fn delete<I: ResourceId>(&self, id: &I) -> Result<()> {
        const OP: &str = "Exports.Delete";
        let operation = Operation::new(OP, Method::DELETE, id.id(), API_VERSION).expecting(&[200, 204]);
        self.client.execute(operation).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_subscription_export_id() {
        let input = "/subscriptions/sub/providers/Microsoft.CostManagement/exports/monthly";
        let id = SubscriptionExportId::parse(input).unwrap();
        assert_eq!(id, SubscriptionExportId::new("sub", "monthly"));
        assert_eq!(id.id(), input);
    }

    #[test]
    fn test_subscription_export_id_rejects_resource_group_scope() {
        let input = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.CostManagement/exports/monthly";
        assert!(matches!(
            SubscriptionExportId::parse(input),
            Err(Error::UnexpectedSegments { .. })
        ));
        assert!(ResourceGroupExportId::parse(input).is_ok());
    }

    #[test]
    fn test_resource_group_export_id_requires_group() {
        let input = "/subscriptions/sub/providers/Microsoft.CostManagement/exports/monthly";
        assert!(matches!(
            ResourceGroupExportId::parse(input),
            Err(Error::MalformedId { .. })
        ));
    }

    #[test]
    fn test_management_group_export_id() {
        let input = "/providers/Microsoft.Management/managementGroups/finance/providers/Microsoft.CostManagement/exports/monthly";
        let id = ManagementGroupExportId::parse(input).unwrap();
        assert_eq!(id, ManagementGroupExportId::new("finance", "monthly"));
        assert_eq!(id.id(), input);

        let shouted = "/PROVIDERS/Microsoft.Management/MANAGEMENTGROUPS/finance/providers/microsoft.costmanagement/Exports/monthly";
        assert_eq!(ManagementGroupExportId::parse_insensitively(shouted).unwrap().id(), input);
    }

    #[test]
    fn test_management_group_export_id_rejects_other_scopes() {
        let subscription = "/subscriptions/sub/providers/Microsoft.CostManagement/exports/monthly";
        assert!(matches!(
            ManagementGroupExportId::parse(subscription),
            Err(Error::MissingSegment { .. })
        ));

        let nested = "/subscriptions/sub/providers/Microsoft.Management/managementGroups/finance/providers/Microsoft.CostManagement/exports/monthly";
        assert!(matches!(
            ManagementGroupExportId::parse(nested),
            Err(Error::UnexpectedSegments { .. })
        ));
    }

    #[test]
    fn test_export_wire_format() {
        let export = Export {
            properties: Some(ExportProperties {
                format: Some("Csv".into()),
                delivery_info: ExportDeliveryInfo {
                    destination: ExportDeliveryDestination {
                        resource_id: "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/acct".into(),
                        container: "exports".into(),
                        root_folder_path: Some("/root".into()),
                    },
                },
                definition: ExportDefinition {
                    type_: "Usage".into(),
                    timeframe: "TheLastMonth".into(),
                },
                schedule: None,
            }),
            ..Default::default()
        };

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["properties"]["deliveryInfo"]["destination"]["rootFolderPath"], "/root");
        assert_eq!(json["properties"]["definition"]["type"], "Usage");
        assert!(json.get("eTag").is_none());
    }
}
