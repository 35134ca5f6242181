//! Typed resources
//!
//! Each resource type declares its field schema and maps Create, Read,
//! Update and Delete onto a service client from [`crate::sdk`]. Operations
//! are handed an explicit [`ResourceContext`] and the [`ResourceData`] they
//! work on; every operation issues exactly one ARM request.
//!
//! # Module Structure
//!
//! - [`schema`] - Field declarations, validators and configuration checks
//! - [`registry`] - Service registrations and lookup by resource type
//! - [`costmanagement`], [`datalake`], [`eventhub`], [`servicefabric`] - Resource types
//!
//! # Example
//!
//! ```ignore
//! use azrm::resource::{get_resource, prepare, ReadOutcome};
//!
//! async fn example(ctx: &azrm::resource::ResourceContext, config: serde_json::Value) -> azrm::Result<()> {
//!     let resource = get_resource("azurerm_eventhub_namespace_authorization_rule").unwrap();
//!     let mut data = prepare(resource, config)?;
//!     resource.create(ctx, &mut data).await?;
//!     if let ReadOutcome::Removed = resource.read(ctx, &mut data).await? {
//!         println!("gone already");
//!     }
//!     Ok(())
//! }
//! ```

pub mod costmanagement;
pub mod datalake;
pub mod eventhub;
mod registry;
pub mod schema;
pub mod servicefabric;

pub use registry::*;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::azure::client::ArmClient;
use crate::error::{Error, Result};
use schema::SchemaMap;

/// What operations need besides the resource data
#[derive(Clone)]
pub struct ResourceContext {
    pub client: ArmClient,
    /// Subscription for resources addressed by resource group name
    subscription_id: Option<String>,
}

impl ResourceContext {
    pub fn new(client: ArmClient, subscription_id: impl Into<String>) -> Self {
        Self {
            client,
            subscription_id: Some(subscription_id.into()),
        }
    }

    /// A context for resources whose IDs carry their whole scope
    pub fn without_subscription(client: ArmClient) -> Self {
        Self {
            client,
            subscription_id: None,
        }
    }

    /// The subscription resource group names are resolved in
    pub fn subscription_id(&self) -> Result<&str> {
        self.subscription_id
            .as_deref()
            .ok_or_else(|| Error::Config("no subscription configured; set ARM_SUBSCRIPTION_ID".to_string()))
    }
}

/// The state of one resource instance
///
/// `values` holds the configuration (or last known state) keyed by field
/// name. `prior` is the state the values are compared against by
/// [`ResourceData::has_change`]; it is absent while creating.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData {
    id: Option<String>,
    values: Map<String, Value>,
    prior: Option<Map<String, Value>>,
}

impl ResourceData {
    /// Data for a resource that does not exist yet
    pub fn new(values: Map<String, Value>) -> Self {
        Self {
            id: None,
            values,
            prior: None,
        }
    }

    /// Data for an existing resource, unchanged since it was last read
    pub fn from_state(id: impl Into<String>, state: Map<String, Value>) -> Self {
        Self {
            id: Some(id.into()),
            prior: Some(state.clone()),
            values: state,
        }
    }

    /// Data for an existing resource about to move from `prior` to `proposed`
    pub fn for_update(id: impl Into<String>, prior: Map<String, Value>, proposed: Map<String, Value>) -> Self {
        Self {
            id: Some(id.into()),
            values: proposed,
            prior: Some(prior),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    pub(crate) fn require_id(&self) -> Result<&str> {
        self.id
            .as_deref()
            .ok_or_else(|| Error::Config("resource has no ID; it must be created or imported first".into()))
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// True when `key` differs from the prior state; always true while creating
    pub fn has_change(&self, key: &str) -> bool {
        match &self.prior {
            None => true,
            Some(prior) => prior.get(key).filter(|v| !v.is_null()) != self.get(key),
        }
    }

    /// Decode the values into a typed model
    pub fn decode<T: DeserializeOwned>(&self, what: &str) -> Result<T> {
        serde_json::from_value(Value::Object(self.values.clone())).map_err(|source| Error::Decode {
            what: what.to_string(),
            source,
        })
    }

    /// Replace the values with an encoded model, keeping `preserved` fields
    ///
    /// Preserved fields are those the API never returns (secrets).
    pub fn encode<T: Serialize>(&mut self, what: &str, model: &T, preserved: &[&str]) -> Result<()> {
        let encoded = serde_json::to_value(model).map_err(|source| Error::Decode {
            what: what.to_string(),
            source,
        })?;
        let Value::Object(mut values) = encoded else {
            return Err(Error::Config(format!("{} did not encode to an object", what)));
        };
        for key in preserved {
            if let Some(value) = self.values.get(*key) {
                values.insert(key.to_string(), value.clone());
            }
        }
        self.values = values;
        Ok(())
    }
}

/// Result of a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Found,
    /// The remote object is gone; the ID has been cleared
    Removed,
}

/// What an orchestrator has to do to move from one state to another
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangePlan {
    NoChange,
    Update(Vec<String>),
    /// At least one ForceNew field changed; delete and create again
    Replace(Vec<String>),
}

/// A declaratively managed ARM resource type
pub trait Resource: Send + Sync {
    /// e.g. `azurerm_eventhub_namespace_authorization_rule`
    fn resource_type(&self) -> &'static str;

    /// Fields set by configuration
    fn arguments(&self) -> SchemaMap;

    /// Fields only ever set by the API
    fn attributes(&self) -> SchemaMap {
        SchemaMap::new()
    }

    fn schema(&self) -> SchemaMap {
        let mut schema = self.arguments();
        schema.extend(self.attributes());
        schema
    }

    /// Check a configuration object against the schema
    fn validate_config(&self, config: &Map<String, Value>) -> Result<()> {
        schema::validate_config(&self.schema(), config)
    }

    /// Check that `id` is a canonical ID of this resource type
    fn validate_id(&self, id: &str) -> Result<()>;

    /// Rewrite an externally supplied ID into canonical casing
    fn normalize_id(&self, id: &str) -> Result<String>;

    fn create<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>>;

    fn read<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<ReadOutcome>>;

    fn update<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>>;

    fn delete<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>>;
}

/// Validate a configuration and fill in defaults, ready for create
pub fn prepare(resource: &dyn Resource, config: Value) -> Result<ResourceData> {
    let mut values = into_object(config)?;
    resource.validate_config(&values)?;
    let fields = resource.schema();
    schema::apply_defaults(&fields, &mut values);
    schema::normalize_values(&fields, &mut values);
    Ok(ResourceData::new(values))
}

/// Validate a proposed configuration for an existing resource
pub fn prepare_update(resource: &dyn Resource, id: &str, prior: Map<String, Value>, proposed: Value) -> Result<ResourceData> {
    resource.validate_id(id)?;
    let mut values = into_object(proposed)?;
    resource.validate_config(&values)?;
    let fields = resource.schema();
    schema::apply_defaults(&fields, &mut values);
    schema::normalize_values(&fields, &mut values);

    // computed attributes carry over from the known state
    for name in resource.attributes().keys() {
        if let Some(value) = prior.get(*name) {
            values.entry(name.to_string()).or_insert_with(|| value.clone());
        }
    }
    Ok(ResourceData::for_update(id, prior, values))
}

fn into_object(config: Value) -> Result<Map<String, Value>> {
    match config {
        Value::Object(values) => Ok(values),
        other => Err(Error::Validation(vec![format!(
            "configuration must be an object, got {}",
            other
        )])),
    }
}

fn changed_arguments(resource: &dyn Resource, data: &ResourceData) -> (Vec<String>, Vec<String>) {
    let mut in_place = Vec::new();
    let mut replace = Vec::new();
    for (name, field) in resource.arguments() {
        if !data.has_change(name) {
            continue;
        }
        if field.force_new {
            replace.push(name.to_string());
        } else {
            in_place.push(name.to_string());
        }
    }
    (in_place, replace)
}

/// Decide how `prior` turns into `proposed`
pub fn plan_change(resource: &dyn Resource, prior: &Map<String, Value>, proposed: &Map<String, Value>) -> ChangePlan {
    let fields = resource.schema();
    let (mut prior, mut proposed) = (prior.clone(), proposed.clone());
    schema::normalize_values(&fields, &mut prior);
    schema::normalize_values(&fields, &mut proposed);
    let data = ResourceData::for_update("", prior, proposed);
    let (in_place, replace) = changed_arguments(resource, &data);
    if !replace.is_empty() {
        ChangePlan::Replace(replace)
    } else if !in_place.is_empty() {
        ChangePlan::Update(in_place)
    } else {
        ChangePlan::NoChange
    }
}

/// Fail when an update would have to change a ForceNew field
pub(crate) fn ensure_in_place(resource: &dyn Resource, data: &ResourceData) -> Result<()> {
    let (_, replace) = changed_arguments(resource, data);
    if replace.is_empty() {
        Ok(())
    } else {
        Err(Error::RequiresReplacement {
            resource: resource.resource_type().to_string(),
            fields: replace,
        })
    }
}

/// Turn a 404 into `None`
pub(crate) fn found<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Deleting something that is already gone succeeds
pub(crate) fn ignore_not_found(result: Result<()>) -> Result<()> {
    found(result).map(|_| ())
}

/// Clear the ID after a read found nothing
pub(crate) fn removed(resource: &dyn Resource, data: &mut ResourceData) -> ReadOutcome {
    tracing::info!(
        "{} {} no longer exists, removing from state",
        resource.resource_type(),
        data.id().unwrap_or_default()
    );
    data.set_id(None);
    ReadOutcome::Removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_has_change_while_creating() {
        let data = ResourceData::new(object(json!({"name": "a"})));
        assert!(data.has_change("name"));
        assert!(data.has_change("anything"));
    }

    /// Null and absent are the same value
    #[test]
    fn test_has_change_ignores_null() {
        let data = ResourceData::for_update(
            "/id",
            object(json!({"name": "a", "suffix": null})),
            object(json!({"name": "a"})),
        );
        assert!(!data.has_change("name"));
        assert!(!data.has_change("suffix"));

        let data = ResourceData::for_update("/id", object(json!({"name": "a"})), object(json!({"name": "b"})));
        assert!(data.has_change("name"));
    }

    #[test]
    fn test_encode_keeps_preserved_fields() {
        let mut data = ResourceData::from_state("/id", object(json!({"access_key": "secret", "suffix": "old"})));
        data.encode("state", &json!({"suffix": "new"}), &["access_key"]).unwrap();
        assert_eq!(data.values(), &object(json!({"access_key": "secret", "suffix": "new"})));
    }

    #[test]
    fn test_found_maps_404_to_none() {
        let not_found: Result<()> = Err(Error::Api {
            operation: "Services.Get".into(),
            id: "/id".into(),
            status: 404,
            code: Some("NotFound".into()),
            message: "gone".into(),
        });
        assert!(found(not_found).unwrap().is_none());
        assert!(found(Err::<(), _>(Error::Config("x".into()))).is_err());
    }

    #[test]
    fn test_into_object_rejects_scalars() {
        assert!(matches!(into_object(json!([1])), Err(Error::Validation(_))));
    }
}
