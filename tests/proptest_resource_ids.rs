//! Property-based tests using proptest
//!
//! These tests check resource ID parsing and formatting against randomized
//! names, casings and truncations.

use proptest::prelude::*;

use azrm::resourceids::{normalize, ManagementGroupId, ResourceGroupId, ResourceId, SubscriptionId};
use azrm::sdk::costmanagement::{ManagementGroupExportId, ResourceGroupExportId, SubscriptionExportId};
use azrm::sdk::datalake::StorageAccountId;
use azrm::sdk::eventhub::AuthorizationRuleId;
use azrm::sdk::servicefabric::ServiceId;
use azrm::Error;

/// Names as they appear in ID segments: no slashes, never empty
fn arb_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9._-]{0,30}"
}

fn arb_rule_id() -> impl Strategy<Value = AuthorizationRuleId> {
    (arb_name(), arb_name(), arb_name(), arb_name())
        .prop_map(|(sub, rg, namespace, name)| AuthorizationRuleId::new(sub, rg, namespace, name))
}

fn arb_service_id() -> impl Strategy<Value = ServiceId> {
    (arb_name(), arb_name(), arb_name(), arb_name(), arb_name())
        .prop_map(|(sub, rg, cluster, app, name)| ServiceId::new(sub, rg, cluster, app, name))
}

/// Upper-case every key segment, leaving the values alone
fn shout_keys(id: &str) -> String {
    id.split('/')
        .enumerate()
        .map(|(i, part)| if i % 2 == 1 { part.to_ascii_uppercase() } else { part.to_string() })
        .collect::<Vec<_>>()
        .join("/")
}

proptest! {
    /// Formatting then parsing gives back the same ID
    #[test]
    fn rule_id_parses_its_own_output(id in arb_rule_id()) {
        prop_assert_eq!(AuthorizationRuleId::parse(&id.id()).unwrap(), id);
    }

    #[test]
    fn service_id_parses_its_own_output(id in arb_service_id()) {
        prop_assert_eq!(ServiceId::parse(&id.id()).unwrap(), id);
    }

    #[test]
    fn storage_account_id_parses_its_own_output(
        (sub, rg, account, name) in (arb_name(), arb_name(), arb_name(), arb_name())
    ) {
        let id = StorageAccountId::new(sub, rg, account, name);
        prop_assert_eq!(StorageAccountId::parse(&id.id()).unwrap(), id);
    }

    #[test]
    fn export_ids_parse_their_own_output((sub, rg, name) in (arb_name(), arb_name(), arb_name())) {
        let subscription = SubscriptionExportId::new(sub.clone(), name.clone());
        prop_assert_eq!(SubscriptionExportId::parse(&subscription.id()).unwrap(), subscription);

        let group = ResourceGroupExportId::new(sub, rg.clone(), name.clone());
        prop_assert_eq!(ResourceGroupExportId::parse(&group.id()).unwrap(), group);

        let management = ManagementGroupExportId::new(rg, name);
        prop_assert_eq!(ManagementGroupExportId::parse(&management.id()).unwrap(), management.clone());
        prop_assert_eq!(
            ManagementGroupExportId::parse_insensitively(&shout_keys(&management.id())).unwrap(),
            management
        );
    }

    /// Key casing does not matter to the insensitive parser, and
    /// normalizing restores the canonical form
    #[test]
    fn insensitive_parse_ignores_key_casing(id in arb_rule_id()) {
        let shouted = shout_keys(&id.id());
        prop_assert_eq!(AuthorizationRuleId::parse_insensitively(&shouted).unwrap(), id.clone());
        prop_assert_eq!(normalize::<AuthorizationRuleId>(&shouted).unwrap(), id.id());
    }

    /// The exact parser rejects keys in the wrong casing
    #[test]
    fn exact_parse_rejects_other_casing(id in arb_service_id()) {
        prop_assert!(ServiceId::parse(&shout_keys(&id.id())).is_err());
    }

    /// Leading and trailing slashes are not significant
    #[test]
    fn surrounding_slashes_are_ignored(id in arb_rule_id()) {
        let padded = format!("/{}/", id.id().trim_start_matches('/'));
        prop_assert_eq!(AuthorizationRuleId::parse(&padded).unwrap(), id);
    }

    /// Without a subscription nothing parses
    #[test]
    fn missing_subscription_is_malformed(id in arb_rule_id()) {
        let path = id.id().replacen(&format!("/subscriptions/{}", id.subscription_id), "", 1);
        let err = AuthorizationRuleId::parse(&path).unwrap_err();
        prop_assert!(matches!(err, Error::MalformedId { .. }), "unexpected error: {}", err);
    }

    /// Resource group scoped IDs require the resource group
    #[test]
    fn missing_resource_group_is_malformed(id in arb_service_id()) {
        let path = id.id().replacen(&format!("/resourceGroups/{}", id.resource_group), "", 1);
        let err = ServiceId::parse(&path).unwrap_err();
        prop_assert!(matches!(err, Error::MalformedId { .. }), "unexpected error: {}", err);
    }

    /// Extra trailing segments are reported, not dropped
    #[test]
    fn trailing_segments_are_rejected(id in arb_rule_id(), extra in arb_name()) {
        let path = format!("{}/extra/{}", id.id(), extra);
        let err = AuthorizationRuleId::parse(&path).unwrap_err();
        prop_assert!(matches!(err, Error::UnexpectedSegments { .. }), "unexpected error: {}", err);
    }

    /// A dangling key makes the segment count odd
    #[test]
    fn odd_segment_count_is_malformed(id in arb_rule_id()) {
        let path = format!("{}/dangling", id.id());
        prop_assert!(matches!(AuthorizationRuleId::parse(&path), Err(Error::MalformedId { .. })), "expected MalformedId");
    }

    #[test]
    fn scope_ids_round_trip((sub, rg) in (arb_name(), arb_name())) {
        let subscription = SubscriptionId::new(sub.clone());
        prop_assert_eq!(SubscriptionId::parse(&subscription.id()).unwrap(), subscription);

        let group = ResourceGroupId::new(sub, rg.clone());
        prop_assert_eq!(ResourceGroupId::parse(&group.id()).unwrap(), group);

        let management = ManagementGroupId::new(rg);
        prop_assert_eq!(ManagementGroupId::parse(&management.id()).unwrap(), management);
    }
}
