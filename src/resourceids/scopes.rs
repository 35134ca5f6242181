use std::fmt;

use super::{KeyMatch, ParsedResourceId, ResourceId};
use crate::error::Result;

/// `/subscriptions/{subscriptionId}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionId {
    pub subscription_id: String,
}

impl SubscriptionId {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
        }
    }

    fn parse_with(input: &str, mode: KeyMatch) -> Result<Self> {
        let id = ParsedResourceId::parse(input, mode)?;
        id.validate_no_remaining_segments()?;
        Ok(Self::new(id.subscription_id()))
    }
}

impl ResourceId for SubscriptionId {
    fn parse(input: &str) -> Result<Self> {
        Self::parse_with(input, KeyMatch::Exact)
    }

    fn parse_insensitively(input: &str) -> Result<Self> {
        Self::parse_with(input, KeyMatch::Insensitive)
    }

    fn id(&self) -> String {
        format!("/subscriptions/{}", self.subscription_id)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscription: (Subscription {:?})", self.subscription_id)
    }
}

/// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroup}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGroupId {
    pub subscription_id: String,
    pub resource_group: String,
}

impl ResourceGroupId {
    pub fn new(subscription_id: impl Into<String>, resource_group: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
        }
    }

    fn parse_with(input: &str, mode: KeyMatch) -> Result<Self> {
        let mut id = ParsedResourceId::parse(input, mode)?;
        let resource_group = id.require_resource_group()?;
        id.validate_no_remaining_segments()?;
        Ok(Self::new(id.subscription_id(), resource_group))
    }
}

impl ResourceId for ResourceGroupId {
    fn parse(input: &str) -> Result<Self> {
        Self::parse_with(input, KeyMatch::Exact)
    }

    fn parse_insensitively(input: &str) -> Result<Self> {
        Self::parse_with(input, KeyMatch::Insensitive)
    }

    fn id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.resource_group
        )
    }
}

impl fmt::Display for ResourceGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resource Group: (Name {:?})", self.resource_group)
    }
}

/// `/providers/Microsoft.Management/managementGroups/{managementGroupName}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagementGroupId {
    pub management_group: String,
}

impl ManagementGroupId {
    pub const PROVIDER: &'static str = "Microsoft.Management";

    pub fn new(management_group: impl Into<String>) -> Self {
        Self {
            management_group: management_group.into(),
        }
    }

    fn parse_with(input: &str, mode: KeyMatch) -> Result<Self> {
        let mut id = ParsedResourceId::parse_tenant_scoped(input, mode)?;
        id.pop_provider(Self::PROVIDER)?;
        let management_group = id.pop_segment("managementGroups")?;
        id.validate_no_remaining_segments()?;
        Ok(Self::new(management_group))
    }
}

impl ResourceId for ManagementGroupId {
    fn parse(input: &str) -> Result<Self> {
        Self::parse_with(input, KeyMatch::Exact)
    }

    fn parse_insensitively(input: &str) -> Result<Self> {
        Self::parse_with(input, KeyMatch::Insensitive)
    }

    fn id(&self) -> String {
        format!("/providers/{}/managementGroups/{}", Self::PROVIDER, self.management_group)
    }
}

impl fmt::Display for ManagementGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Management Group: (Name {:?})", self.management_group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_subscription_id_round_trip() {
        let id = SubscriptionId::parse("/subscriptions/00000000-0000-0000-0000-000000000000").unwrap();
        assert_eq!(id.id(), "/subscriptions/00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_subscription_id_rejects_resource_group() {
        let err = SubscriptionId::parse("/subscriptions/sub/resourceGroups/rg").unwrap_err();
        assert!(matches!(err, Error::UnexpectedSegments { .. }));
    }

    #[test]
    fn test_resource_group_id_requires_group() {
        let err = ResourceGroupId::parse("/subscriptions/sub").unwrap_err();
        assert!(matches!(err, Error::MalformedId { .. }));
    }

    #[test]
    fn test_resource_group_id_normalizes_casing() {
        let id = ResourceGroupId::parse_insensitively("/Subscriptions/sub/resourcegroups/rg").unwrap();
        assert_eq!(id.id(), "/subscriptions/sub/resourceGroups/rg");
    }

    #[test]
    fn test_management_group_id() {
        let id = ManagementGroupId::parse("/providers/Microsoft.Management/managementGroups/finance").unwrap();
        assert_eq!(id.management_group, "finance");
        assert_eq!(id.id(), "/providers/Microsoft.Management/managementGroups/finance");

        let id = ManagementGroupId::parse_insensitively("/PROVIDERS/microsoft.management/managementgroups/finance").unwrap();
        assert_eq!(id.id(), "/providers/Microsoft.Management/managementGroups/finance");
    }

    #[test]
    fn test_management_group_id_rejects_subscription_scope() {
        let err = ManagementGroupId::parse("/subscriptions/sub/providers/Microsoft.Management/managementGroups/finance")
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedSegments { .. }));

        let err = ManagementGroupId::parse("/providers/Microsoft.Management").unwrap_err();
        assert!(matches!(err, Error::MissingSegment { .. }));
    }
}
