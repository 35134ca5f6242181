//! `azurerm_eventhub_namespace_authorization_rule`

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::schema::{self, Schema, SchemaMap, SchemaType, ValidateFunc};
use super::{ensure_in_place, found, ignore_not_found, removed, ReadOutcome, Resource, ResourceContext, ResourceData, ServiceRegistration};
use crate::error::{Result, Violations};
use crate::resourceids::{normalize, ResourceId};
use crate::sdk::eventhub::{AccessRights, AuthorizationRule, AuthorizationRuleId, AuthorizationRuleProperties, AuthorizationRulesClient};

pub fn registration() -> ServiceRegistration {
    ServiceRegistration {
        name: "EventHub",
        website_categories: &["Messaging"],
        resources: vec![Box::new(EventHubNamespaceAuthorizationRuleResource)],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct AuthorizationRuleModel {
    name: String,
    namespace_name: String,
    resource_group_name: String,
    #[serde(default)]
    listen: bool,
    #[serde(default)]
    send: bool,
    #[serde(default)]
    manage: bool,
}

impl AuthorizationRuleModel {
    fn rights(&self) -> Vec<AccessRights> {
        let mut rights = Vec::new();
        if self.listen {
            rights.push(AccessRights::Listen);
        }
        if self.send {
            rights.push(AccessRights::Send);
        }
        if self.manage {
            rights.push(AccessRights::Manage);
        }
        rights
    }

    fn to_rule(&self) -> AuthorizationRule {
        AuthorizationRule {
            properties: Some(AuthorizationRuleProperties { rights: self.rights() }),
            ..Default::default()
        }
    }
}

/// `manage` is only accepted together with `listen` and `send`
fn check_rights(listen: bool, send: bool, manage: bool) -> Option<String> {
    (manage && !(listen && send))
        .then(|| "the `listen` and `send` rights must be enabled when `manage` is enabled".to_string())
}

fn name_matches(value: &str, min: usize, max: usize, first: fn(char) -> bool, middle: fn(char) -> bool) -> bool {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < min || chars.len() > max {
        return false;
    }
    match chars.as_slice() {
        [only] => first(*only),
        [head, body @ .., tail] => first(*head) && body.iter().all(|c| middle(*c)) && tail.is_ascii_alphanumeric(),
        [] => false,
    }
}

fn authorization_rule_name() -> ValidateFunc {
    Arc::new(|value, key| match value.as_str() {
        Some(s)
            if name_matches(s, 1, 50, |c| c.is_ascii_alphanumeric(), |c| {
                c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_')
            }) =>
        {
            Vec::new()
        },
        _ => vec![format!(
            "{} can contain only letters, numbers, periods, hyphens and underscores, must start and end with a letter or number and be at most 50 characters",
            key
        )],
    })
}

fn namespace_name() -> ValidateFunc {
    Arc::new(|value, key| match value.as_str() {
        Some(s) if name_matches(s, 6, 50, |c| c.is_ascii_alphabetic(), |c| c.is_ascii_alphanumeric() || c == '-') => {
            Vec::new()
        },
        _ => vec![format!(
            "{} can contain only letters, numbers and hyphens, must start with a letter, end with a letter or number and be between 6 and 50 characters",
            key
        )],
    })
}

pub struct EventHubNamespaceAuthorizationRuleResource;

impl Resource for EventHubNamespaceAuthorizationRuleResource {
    fn resource_type(&self) -> &'static str {
        "azurerm_eventhub_namespace_authorization_rule"
    }

    fn arguments(&self) -> SchemaMap {
        let mut fields = SchemaMap::new();
        fields.insert("name", Schema::required(SchemaType::String).force_new().validate(authorization_rule_name()));
        fields.insert("namespace_name", Schema::required(SchemaType::String).force_new().validate(namespace_name()));
        fields.insert(
            "resource_group_name",
            Schema::required(SchemaType::String).force_new().validate(schema::string_is_not_white_space()),
        );
        fields.insert("listen", Schema::optional(SchemaType::Bool).default(false));
        fields.insert("send", Schema::optional(SchemaType::Bool).default(false));
        fields.insert("manage", Schema::optional(SchemaType::Bool).default(false));
        fields
    }

    fn validate_config(&self, config: &Map<String, Value>) -> Result<()> {
        let mut violations = Violations::new();
        schema::check(&self.schema(), config, "", &mut violations);

        let flag = |key: &str| config.get(key).and_then(Value::as_bool).unwrap_or(false);
        if let Some(problem) = check_rights(flag("listen"), flag("send"), flag("manage")) {
            violations.push(problem);
        }
        violations.into_result()
    }

    fn validate_id(&self, id: &str) -> Result<()> {
        AuthorizationRuleId::parse(id).map(|_| ())
    }

    fn normalize_id(&self, id: &str) -> Result<String> {
        normalize::<AuthorizationRuleId>(id)
    }

    fn create<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let model: AuthorizationRuleModel = data.decode(self.resource_type())?;
            let id = AuthorizationRuleId::new(
                ctx.subscription_id()?,
                &model.resource_group_name,
                &model.namespace_name,
                &model.name,
            );

            let client = AuthorizationRulesClient::new(ctx.client.clone());
            client.create_or_update(&id, &model.to_rule()).await?;

            tracing::info!("created {}", id);
            data.set_id(Some(id.id()));
            Ok(())
        })
    }

    fn read<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<ReadOutcome>> {
        Box::pin(async move {
            let id = AuthorizationRuleId::parse(data.require_id()?)?;
            let client = AuthorizationRulesClient::new(ctx.client.clone());
            let Some(rule) = found(client.get(&id).await)? else {
                return Ok(removed(self, data));
            };

            let rights = rule.properties.map(|p| p.rights).unwrap_or_default();
            let model = AuthorizationRuleModel {
                name: id.name.clone(),
                namespace_name: id.namespace_name.clone(),
                resource_group_name: id.resource_group.clone(),
                listen: rights.contains(&AccessRights::Listen),
                send: rights.contains(&AccessRights::Send),
                manage: rights.contains(&AccessRights::Manage),
            };
            data.encode(self.resource_type(), &model, &[])?;
            Ok(ReadOutcome::Found)
        })
    }

    fn update<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            ensure_in_place(self, data)?;
            let id = AuthorizationRuleId::parse(data.require_id()?)?;
            let model: AuthorizationRuleModel = data.decode(self.resource_type())?;

            let client = AuthorizationRulesClient::new(ctx.client.clone());
            client.create_or_update(&id, &model.to_rule()).await?;
            tracing::info!("updated {}", id);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let id = AuthorizationRuleId::parse(data.require_id()?)?;
            let client = AuthorizationRulesClient::new(ctx.client.clone());
            ignore_not_found(client.delete(&id).await)?;
            tracing::info!("deleted {}", id);
            data.set_id(None);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{plan_change, ChangePlan};
    use crate::Error;
    use serde_json::json;

    fn config(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_manage_requires_listen_and_send() {
        let resource = EventHubNamespaceAuthorizationRuleResource;
        let err = resource
            .validate_config(&config(json!({
                "name": "rule",
                "namespace_name": "example-ns",
                "resource_group_name": "rg",
                "listen": true,
                "manage": true
            })))
            .unwrap_err();
        match err {
            Error::Validation(messages) => {
                assert_eq!(messages.len(), 1);
                assert!(messages[0].contains("`listen` and `send`"));
            },
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_all_rights_is_valid() {
        let resource = EventHubNamespaceAuthorizationRuleResource;
        assert!(resource
            .validate_config(&config(json!({
                "name": "rule.1",
                "namespace_name": "example-ns",
                "resource_group_name": "rg",
                "listen": true,
                "send": true,
                "manage": true
            })))
            .is_ok());
    }

    #[test]
    fn test_name_validation() {
        let validate = authorization_rule_name();
        assert!(validate(&json!("a"), "name").is_empty());
        assert!(validate(&json!("rule_1-x.y"), "name").is_empty());
        assert!(!validate(&json!("-rule"), "name").is_empty());
        assert!(!validate(&json!("rule-"), "name").is_empty());
        assert!(!validate(&json!("a".repeat(51)), "name").is_empty());

        let validate = namespace_name();
        assert!(validate(&json!("example-ns"), "namespace_name").is_empty());
        assert!(!validate(&json!("short"), "namespace_name").is_empty());
        assert!(!validate(&json!("1namespace"), "namespace_name").is_empty());
    }

    #[test]
    fn test_rights_expand_in_order() {
        let model = AuthorizationRuleModel {
            name: "rule".into(),
            namespace_name: "example-ns".into(),
            resource_group_name: "rg".into(),
            listen: true,
            send: false,
            manage: false,
        };
        assert_eq!(model.rights(), vec![AccessRights::Listen]);
    }

    #[test]
    fn test_plan_change() {
        let resource = EventHubNamespaceAuthorizationRuleResource;
        let prior = config(json!({"name": "rule", "namespace_name": "example-ns", "resource_group_name": "rg", "listen": true}));

        assert_eq!(plan_change(&resource, &prior, &prior), ChangePlan::NoChange);

        let mut proposed = prior.clone();
        proposed.insert("send".into(), json!(true));
        assert_eq!(plan_change(&resource, &prior, &proposed), ChangePlan::Update(vec!["send".into()]));

        proposed.insert("name".into(), json!("renamed"));
        assert_eq!(plan_change(&resource, &prior, &proposed), ChangePlan::Replace(vec!["name".into()]));
    }

    #[test]
    fn test_normalize_id() {
        let resource = EventHubNamespaceAuthorizationRuleResource;
        let id = "/subscriptions/sub/resourcegroups/rg/providers/microsoft.eventhub/namespaces/ns/authorizationrules/rule";
        assert!(resource.validate_id(id).is_err());
        assert_eq!(
            resource.normalize_id(id).unwrap(),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.EventHub/namespaces/ns/authorizationRules/rule"
        );
    }
}
