//! Resource ID parsing
//!
//! ARM addresses every object with a path such as
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}`.
//! [`ParsedResourceId`] splits such a path into key/value pairs and lets a
//! concrete identifier pop the segments it expects, in order. Concrete
//! identifiers live next to the client that uses them (see [`crate::sdk`])
//! and implement [`ResourceId`].
//!
//! Two matching modes exist:
//!
//! - [`KeyMatch::Exact`] validates an ID exactly as the API emits it
//! - [`KeyMatch::Insensitive`] accepts any casing of the segment keys and the
//!   provider namespace; it only exists to rewrite user supplied IDs into the
//!   canonical casing and should not be used for validation

mod scopes;

pub use scopes::{ManagementGroupId, ResourceGroupId, SubscriptionId};

use crate::error::{Error, Result};

/// How segment keys are compared while popping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMatch {
    Exact,
    Insensitive,
}

impl KeyMatch {
    fn matches(self, candidate: &str, expected: &str) -> bool {
        match self {
            KeyMatch::Exact => candidate == expected,
            KeyMatch::Insensitive => candidate.eq_ignore_ascii_case(expected),
        }
    }
}

/// A strongly typed ARM identifier
pub trait ResourceId: Sized {
    /// Parse an ID, requiring the canonical casing
    fn parse(input: &str) -> Result<Self>;

    /// Parse an ID whose segment keys may use any casing
    fn parse_insensitively(input: &str) -> Result<Self>;

    /// Format the canonical path
    fn id(&self) -> String;
}

/// Rewrite an externally supplied ID into its canonical casing
pub fn normalize<I: ResourceId>(input: &str) -> Result<String> {
    I::parse_insensitively(input).map(|id| id.id())
}

/// An ARM path split into key/value pairs with the scope segments removed
#[derive(Debug, Clone)]
pub struct ParsedResourceId {
    input: String,
    mode: KeyMatch,
    subscription_id: String,
    resource_group: Option<String>,
    segments: Vec<(String, String)>,
}

impl ParsedResourceId {
    /// Split `input` into segments and extract the subscription (required)
    /// and resource group (optional) scopes
    pub fn parse(input: &str, mode: KeyMatch) -> Result<Self> {
        let mut id = Self::parse_tenant_scoped(input, mode)?;

        id.subscription_id = take(&mut id.segments, "subscriptions", mode)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| Error::malformed(input, "ID was missing the 'subscriptions' element"))?;

        id.resource_group = match take(&mut id.segments, "resourceGroups", mode) {
            Some(value) if value.is_empty() => {
                return Err(Error::malformed(
                    input,
                    "ID was missing the 'resourceGroups' element",
                ))
            },
            other => other,
        };

        Ok(id)
    }

    /// Split an ID that lives above any subscription, such as one under a
    /// management group. No scope segments are extracted, so a
    /// `subscriptions` segment is left over like any other.
    pub fn parse_tenant_scoped(input: &str, mode: KeyMatch) -> Result<Self> {
        let trimmed = input.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(Error::malformed(input, "ID was empty"));
        }

        let components: Vec<&str> = trimmed.split('/').collect();
        if components.len() % 2 != 0 {
            return Err(Error::malformed(
                input,
                "the number of path segments is not divisible by 2",
            ));
        }

        let segments: Vec<(String, String)> = components
            .chunks(2)
            .map(|pair| (pair[0].to_string(), pair[1].to_string()))
            .collect();

        if segments.iter().any(|(key, _)| key.is_empty()) {
            return Err(Error::malformed(input, "ID contained an empty segment key"));
        }

        Ok(Self {
            input: input.to_string(),
            mode,
            subscription_id: String::new(),
            resource_group: None,
            segments,
        })
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// The resource group, which resource-group scoped IDs must carry
    pub fn require_resource_group(&mut self) -> Result<String> {
        self.resource_group
            .take()
            .ok_or_else(|| Error::malformed(&self.input, "ID was missing the 'resourceGroups' element"))
    }

    /// Remove the segment named `key` and return its value
    pub fn pop_segment(&mut self, key: &str) -> Result<String> {
        match take(&mut self.segments, key, self.mode) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(Error::MissingSegment {
                input: self.input.clone(),
                segment: key.to_string(),
            }),
        }
    }

    /// Remove the `providers` segment, requiring it to name `namespace`
    pub fn pop_provider(&mut self, namespace: &str) -> Result<()> {
        let mode = self.mode;
        let position = self.segments.iter().position(|(key, value)| {
            mode.matches(key, "providers") && mode.matches(value, namespace)
        });

        match position {
            Some(index) => {
                self.segments.remove(index);
                Ok(())
            },
            None => Err(Error::MissingSegment {
                input: self.input.clone(),
                segment: format!("providers/{}", namespace),
            }),
        }
    }

    /// Fail if any segment was not consumed
    pub fn validate_no_remaining_segments(&self) -> Result<()> {
        if self.segments.is_empty() && self.resource_group.is_none() {
            return Ok(());
        }

        let mut remaining: Vec<String> = self
            .resource_group
            .iter()
            .map(|rg| format!("resourceGroups/{}", rg))
            .collect();
        remaining.extend(self.segments.iter().map(|(k, v)| format!("{}/{}", k, v)));

        Err(Error::UnexpectedSegments {
            input: self.input.clone(),
            remaining,
        })
    }
}

fn take(segments: &mut Vec<(String, String)>, key: &str, mode: KeyMatch) -> Option<String> {
    let index = segments.iter().position(|(k, _)| mode.matches(k, key))?;
    Some(segments.remove(index).1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "/subscriptions/sub-1/resourceGroups/group1/providers/Microsoft.EventHub/namespaces/ns1/authorizationRules/rule1";

    #[test]
    fn test_parse_extracts_scopes() {
        let mut id = ParsedResourceId::parse(ID, KeyMatch::Exact).unwrap();
        assert_eq!(id.subscription_id(), "sub-1");
        assert_eq!(id.require_resource_group().unwrap(), "group1");
    }

    #[test]
    fn test_pop_segments_in_order() {
        let mut id = ParsedResourceId::parse(ID, KeyMatch::Exact).unwrap();
        id.require_resource_group().unwrap();
        id.pop_provider("Microsoft.EventHub").unwrap();
        assert_eq!(id.pop_segment("namespaces").unwrap(), "ns1");
        assert_eq!(id.pop_segment("authorizationRules").unwrap(), "rule1");
        assert!(id.validate_no_remaining_segments().is_ok());
    }

    #[test]
    fn test_tenant_scoped_ids_keep_every_segment() {
        let mut id = ParsedResourceId::parse_tenant_scoped(
            "/providers/Microsoft.Management/managementGroups/mg1/providers/Microsoft.CostManagement/exports/e1",
            KeyMatch::Exact,
        )
        .unwrap();
        id.pop_provider("Microsoft.Management").unwrap();
        assert_eq!(id.pop_segment("managementGroups").unwrap(), "mg1");
        id.pop_provider("Microsoft.CostManagement").unwrap();
        assert_eq!(id.pop_segment("exports").unwrap(), "e1");
        assert!(id.validate_no_remaining_segments().is_ok());
    }

    #[test]
    fn test_tenant_scoped_parse_leaves_subscription_over() {
        let id = ParsedResourceId::parse_tenant_scoped("/subscriptions/sub-1", KeyMatch::Exact).unwrap();
        assert!(matches!(
            id.validate_no_remaining_segments(),
            Err(Error::UnexpectedSegments { .. })
        ));
    }

    #[test]
    fn test_odd_segment_count_is_malformed() {
        let err = ParsedResourceId::parse("/subscriptions/sub-1/resourceGroups", KeyMatch::Exact)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedId { .. }));
    }

    #[test]
    fn test_missing_subscription_is_malformed() {
        let err = ParsedResourceId::parse("/resourceGroups/group1", KeyMatch::Exact).unwrap_err();
        assert!(matches!(err, Error::MalformedId { .. }));

        let err = ParsedResourceId::parse("/subscriptions//resourceGroups/group1", KeyMatch::Exact)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedId { .. }));
    }

    #[test]
    fn test_exact_mode_rejects_other_casing() {
        let mut id = ParsedResourceId::parse(
            "/subscriptions/sub-1/resourceGroups/group1/providers/Microsoft.EventHub/NAMESPACES/ns1",
            KeyMatch::Exact,
        )
        .unwrap();
        let err = id.pop_segment("namespaces").unwrap_err();
        assert!(matches!(err, Error::MissingSegment { ref segment, .. } if segment == "namespaces"));
    }

    #[test]
    fn test_insensitive_mode_accepts_other_casing() {
        let mut id = ParsedResourceId::parse(
            "/SUBSCRIPTIONS/sub-1/resourcegroups/group1/providers/microsoft.eventhub/NAMESPACES/ns1",
            KeyMatch::Insensitive,
        )
        .unwrap();
        assert_eq!(id.require_resource_group().unwrap(), "group1");
        id.pop_provider("Microsoft.EventHub").unwrap();
        assert_eq!(id.pop_segment("namespaces").unwrap(), "ns1");
    }

    #[test]
    fn test_wrong_provider_is_missing_segment() {
        let mut id = ParsedResourceId::parse(
            "/subscriptions/sub-1/resourceGroups/group1/providers/Microsoft.Storage/namespaces/ns1",
            KeyMatch::Exact,
        )
        .unwrap();
        assert!(matches!(
            id.pop_provider("Microsoft.EventHub"),
            Err(Error::MissingSegment { .. })
        ));
    }

    #[test]
    fn test_leftover_segments_are_reported() {
        let mut id = ParsedResourceId::parse(
            "/subscriptions/sub-1/resourceGroups/group1/providers/Microsoft.EventHub/namespaces/ns1/extra/value",
            KeyMatch::Exact,
        )
        .unwrap();
        id.require_resource_group().unwrap();
        id.pop_provider("Microsoft.EventHub").unwrap();
        id.pop_segment("namespaces").unwrap();
        match id.validate_no_remaining_segments() {
            Err(Error::UnexpectedSegments { remaining, .. }) => {
                assert_eq!(remaining, vec!["extra/value".to_string()]);
            },
            other => panic!("expected UnexpectedSegments, got {:?}", other),
        }
    }
}
