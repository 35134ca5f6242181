//! Cost Management exports
//!
//! `azurerm_cost_management_export_subscription`,
//! `azurerm_cost_management_export_resource_group` and
//! `azurerm_cost_management_export_management_group` differ only in the scope
//! argument and their ID type. Each holds a [`CostManagementExportBase`] that
//! provides the shared fields and the CRUD bodies.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::schema::{self, Schema, SchemaMap, SchemaType, ValidateFunc};
use super::{ensure_in_place, found, ignore_not_found, removed, ReadOutcome, Resource, ResourceContext, ResourceData, ServiceRegistration};
use crate::error::{Error, Result};
use crate::resourceids::{
    normalize, KeyMatch, ManagementGroupId, ParsedResourceId, ResourceGroupId, ResourceId, SubscriptionId,
};
use crate::sdk::costmanagement::{
    Export, ExportDefinition, ExportDeliveryDestination, ExportDeliveryInfo, ExportProperties, ExportRecurrencePeriod,
    ExportSchedule, ExportsClient, ManagementGroupExportId, ResourceGroupExportId, SubscriptionExportId, EXPORT_TYPES,
    RECURRENCE_TYPES,
    TIME_FRAMES,
};

pub fn registration() -> ServiceRegistration {
    ServiceRegistration {
        name: "Cost Management",
        website_categories: &["Cost Management"],
        resources: vec![
            Box::new(SubscriptionCostManagementExportResource::default()),
            Box::new(ResourceGroupCostManagementExportResource::default()),
            Box::new(ManagementGroupCostManagementExportResource::default()),
        ],
    }
}

/// Storage accounts are addressed as
/// `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Storage/storageAccounts/{name}`
fn storage_account_id() -> ValidateFunc {
    Arc::new(|value, key| {
        let parsed = value
            .as_str()
            .ok_or_else(|| Error::Config(format!("expected type of {} to be string", key)))
            .and_then(|s| {
                let mut id = ParsedResourceId::parse(s, KeyMatch::Exact)?;
                id.require_resource_group()?;
                id.pop_provider("Microsoft.Storage")?;
                id.pop_segment("storageAccounts")?;
                id.validate_no_remaining_segments()
            });
        match parsed {
            Ok(()) => Vec::new(),
            Err(e) => vec![format!("{}: {}", key, e)],
        }
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StorageLocationModel {
    storage_account_id: String,
    container_name: String,
    root_folder_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DefinitionModel {
    #[serde(rename = "type")]
    type_: String,
    time_frame: String,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ExportModel {
    name: String,
    #[serde(default = "default_active")]
    active: bool,
    recurrence_type: String,
    recurrence_period_start: String,
    recurrence_period_end: String,
    export_data_storage_location: Vec<StorageLocationModel>,
    export_data_definition: Vec<DefinitionModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    e_tag: Option<String>,
}

impl ExportModel {
    fn to_export(&self) -> Result<Export> {
        let (Some(location), Some(definition)) = (
            self.export_data_storage_location.first(),
            self.export_data_definition.first(),
        ) else {
            return Err(Error::Validation(vec![
                "`export_data_storage_location` and `export_data_definition` must each contain one block".into(),
            ]));
        };

        Ok(Export {
            e_tag: self.e_tag.clone(),
            properties: Some(ExportProperties {
                format: Some("Csv".into()),
                delivery_info: ExportDeliveryInfo {
                    destination: ExportDeliveryDestination {
                        resource_id: location.storage_account_id.clone(),
                        container: location.container_name.clone(),
                        root_folder_path: Some(location.root_folder_path.clone()),
                    },
                },
                definition: ExportDefinition {
                    type_: definition.type_.clone(),
                    timeframe: definition.time_frame.clone(),
                },
                schedule: Some(ExportSchedule {
                    status: Some(if self.active { "Active" } else { "Inactive" }.into()),
                    recurrence: Some(self.recurrence_type.clone()),
                    recurrence_period: Some(ExportRecurrencePeriod {
                        from: self.recurrence_period_start.clone(),
                        to: Some(self.recurrence_period_end.clone()),
                    }),
                }),
            }),
            ..Default::default()
        })
    }

    fn from_export(name: &str, export: Export) -> Self {
        let properties = export.properties.unwrap_or_default();
        let schedule = properties.schedule.unwrap_or_default();
        let period = schedule.recurrence_period.unwrap_or_default();
        let destination = properties.delivery_info.destination;

        Self {
            name: name.to_string(),
            active: schedule.status.as_deref() == Some("Active"),
            recurrence_type: schedule.recurrence.unwrap_or_default(),
            recurrence_period_start: period.from,
            recurrence_period_end: period.to.unwrap_or_default(),
            export_data_storage_location: vec![StorageLocationModel {
                storage_account_id: destination.resource_id,
                container_name: destination.container,
                root_folder_path: destination.root_folder_path.unwrap_or_default(),
            }],
            export_data_definition: vec![DefinitionModel {
                type_: properties.definition.type_,
                time_frame: properties.definition.timeframe,
            }],
            e_tag: export.e_tag,
        }
    }
}

/// Fields and CRUD shared by every export scope
#[derive(Debug, Clone, Copy, Default)]
pub struct CostManagementExportBase;

impl CostManagementExportBase {
    /// The scope specific fields plus the common ones
    pub fn arguments(&self, mut fields: SchemaMap) -> SchemaMap {
        let mut location = SchemaMap::new();
        location.insert(
            "storage_account_id",
            Schema::required(SchemaType::String)
                .force_new()
                .validate(storage_account_id()),
        );
        location.insert(
            "container_name",
            Schema::required(SchemaType::String).force_new().validate(schema::string_is_not_white_space()),
        );
        location.insert(
            "root_folder_path",
            Schema::required(SchemaType::String).force_new().validate(schema::string_is_not_white_space()),
        );

        let mut definition = SchemaMap::new();
        definition.insert("type", Schema::required(SchemaType::String).validate(schema::string_in_slice(EXPORT_TYPES)));
        definition.insert("time_frame", Schema::required(SchemaType::String).validate(schema::string_in_slice(TIME_FRAMES)));

        fields.insert("active", Schema::optional(SchemaType::Bool).default(true));
        fields.insert(
            "recurrence_type",
            Schema::required(SchemaType::String).validate(schema::string_in_slice(RECURRENCE_TYPES)),
        );
        fields.insert("recurrence_period_start", Schema::required(SchemaType::String).validate(schema::is_rfc3339_time()));
        fields.insert("recurrence_period_end", Schema::required(SchemaType::String).validate(schema::is_rfc3339_time()));
        fields.insert(
            "export_data_storage_location",
            Schema::required(SchemaType::List(Box::new(SchemaType::Block(location))))
                .max_items(1)
                .force_new(),
        );
        fields.insert(
            "export_data_definition",
            Schema::required(SchemaType::List(Box::new(SchemaType::Block(definition)))).max_items(1),
        );
        fields
    }

    pub fn attributes(&self) -> SchemaMap {
        let mut fields = SchemaMap::new();
        fields.insert("e_tag", Schema::computed(SchemaType::String));
        fields
    }

    pub async fn create<I>(&self, ctx: &ResourceContext, data: &mut ResourceData, resource_type: &str, id: I) -> Result<()>
    where
        I: ResourceId + fmt::Display + Sync,
    {
        let model: ExportModel = data.decode(resource_type)?;
        let client = ExportsClient::new(ctx.client.clone());
        let created = client.create_or_update(&id, &model.to_export()?).await?;

        tracing::info!("created {}", id);
        if let Some(e_tag) = created.e_tag {
            data.set("e_tag", e_tag);
        }
        data.set_id(Some(id.id()));
        Ok(())
    }

    /// Flatten the remote export, writing `scope` back into `scope_field`
    pub async fn read<I>(
        &self,
        resource: &dyn Resource,
        ctx: &ResourceContext,
        data: &mut ResourceData,
        id: I,
        name: &str,
        (scope_field, scope): (&str, String),
    ) -> Result<ReadOutcome>
    where
        I: ResourceId + Sync,
    {
        let client = ExportsClient::new(ctx.client.clone());
        let Some(export) = found(client.get(&id).await)? else {
            return Ok(removed(resource, data));
        };

        data.encode(resource.resource_type(), &ExportModel::from_export(name, export), &[])?;
        data.set(scope_field, scope);
        Ok(ReadOutcome::Found)
    }

    /// Send the whole definition again, guarded by the last known eTag
    pub async fn update<I>(&self, ctx: &ResourceContext, data: &mut ResourceData, resource_type: &str, id: I) -> Result<()>
    where
        I: ResourceId + fmt::Display + Sync,
    {
        let model: ExportModel = data.decode(resource_type)?;
        let client = ExportsClient::new(ctx.client.clone());
        let updated = client.create_or_update(&id, &model.to_export()?).await?;

        tracing::info!("updated {}", id);
        if let Some(e_tag) = updated.e_tag {
            data.set("e_tag", e_tag);
        }
        Ok(())
    }

    pub async fn delete<I>(&self, ctx: &ResourceContext, data: &mut ResourceData, id: I) -> Result<()>
    where
        I: ResourceId + fmt::Display + Sync,
    {
        let client = ExportsClient::new(ctx.client.clone());
        ignore_not_found(client.delete(&id).await)?;
        tracing::info!("deleted {}", id);
        data.set_id(None);
        Ok(())
    }
}

fn required_str<'a>(data: &'a ResourceData, key: &str) -> Result<&'a str> {
    data.get_str(key)
        .ok_or_else(|| Error::Validation(vec![format!("{:?}: required field is not set", key)]))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SubscriptionCostManagementExportResource {
    base: CostManagementExportBase,
}

impl Resource for SubscriptionCostManagementExportResource {
    fn resource_type(&self) -> &'static str {
        "azurerm_cost_management_export_subscription"
    }

    fn arguments(&self) -> SchemaMap {
        let mut fields = SchemaMap::new();
        fields.insert("name", Schema::required(SchemaType::String).force_new().validate(schema::string_is_not_white_space()));
        fields.insert(
            "subscription_id",
            Schema::required(SchemaType::String).force_new().validate(schema::resource_id::<SubscriptionId>()),
        );
        self.base.arguments(fields)
    }

    fn attributes(&self) -> SchemaMap {
        self.base.attributes()
    }

    fn validate_id(&self, id: &str) -> Result<()> {
        SubscriptionExportId::parse(id).map(|_| ())
    }

    fn normalize_id(&self, id: &str) -> Result<String> {
        normalize::<SubscriptionExportId>(id)
    }

    fn create<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let subscription = SubscriptionId::parse(required_str(data, "subscription_id")?)?;
            let id = SubscriptionExportId::new(subscription.subscription_id, required_str(data, "name")?);
            self.base.create(ctx, data, self.resource_type(), id).await
        })
    }

    fn read<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<ReadOutcome>> {
        Box::pin(async move {
            let id = SubscriptionExportId::parse(data.require_id()?)?;
            let name = id.name.clone();
            let scope = SubscriptionId::new(&id.subscription_id).id();
            self.base.read(self, ctx, data, id, &name, ("subscription_id", scope)).await
        })
    }

    fn update<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            ensure_in_place(self, data)?;
            let id = SubscriptionExportId::parse(data.require_id()?)?;
            self.base.update(ctx, data, self.resource_type(), id).await
        })
    }

    fn delete<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let id = SubscriptionExportId::parse(data.require_id()?)?;
            self.base.delete(ctx, data, id).await
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceGroupCostManagementExportResource {
    base: CostManagementExportBase,
}

impl Resource for ResourceGroupCostManagementExportResource {
    fn resource_type(&self) -> &'static str {
        "azurerm_cost_management_export_resource_group"
    }

    fn arguments(&self) -> SchemaMap {
        let mut fields = SchemaMap::new();
        fields.insert("name", Schema::required(SchemaType::String).force_new().validate(schema::string_is_not_white_space()));
        fields.insert(
            "resource_group_id",
            Schema::required(SchemaType::String).force_new().validate(schema::resource_id::<ResourceGroupId>()),
        );
        self.base.arguments(fields)
    }

    fn attributes(&self) -> SchemaMap {
        self.base.attributes()
    }

    fn validate_id(&self, id: &str) -> Result<()> {
        ResourceGroupExportId::parse(id).map(|_| ())
    }

    fn normalize_id(&self, id: &str) -> Result<String> {
        normalize::<ResourceGroupExportId>(id)
    }

    fn create<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let group = ResourceGroupId::parse(required_str(data, "resource_group_id")?)?;
            let id = ResourceGroupExportId::new(group.subscription_id, group.resource_group, required_str(data, "name")?);
            self.base.create(ctx, data, self.resource_type(), id).await
        })
    }

    fn read<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<ReadOutcome>> {
        Box::pin(async move {
            let id = ResourceGroupExportId::parse(data.require_id()?)?;
            let name = id.name.clone();
            let scope = ResourceGroupId::new(&id.subscription_id, &id.resource_group).id();
            self.base.read(self, ctx, data, id, &name, ("resource_group_id", scope)).await
        })
    }

    fn update<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            ensure_in_place(self, data)?;
            let id = ResourceGroupExportId::parse(data.require_id()?)?;
            self.base.update(ctx, data, self.resource_type(), id).await
        })
    }

    fn delete<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let id = ResourceGroupExportId::parse(data.require_id()?)?;
            self.base.delete(ctx, data, id).await
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ManagementGroupCostManagementExportResource {
    base: CostManagementExportBase,
}

impl Resource for ManagementGroupCostManagementExportResource {
    fn resource_type(&self) -> &'static str {
        "azurerm_cost_management_export_management_group"
    }

    fn arguments(&self) -> SchemaMap {
        let mut fields = SchemaMap::new();
        fields.insert("name", Schema::required(SchemaType::String).force_new().validate(schema::string_is_not_white_space()));
        fields.insert(
            "management_group_id",
            Schema::required(SchemaType::String).force_new().validate(schema::resource_id::<ManagementGroupId>()),
        );
        self.base.arguments(fields)
    }

    fn attributes(&self) -> SchemaMap {
        self.base.attributes()
    }

    fn validate_id(&self, id: &str) -> Result<()> {
        ManagementGroupExportId::parse(id).map(|_| ())
    }

    fn normalize_id(&self, id: &str) -> Result<String> {
        normalize::<ManagementGroupExportId>(id)
    }

    fn create<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let group = ManagementGroupId::parse(required_str(data, "management_group_id")?)?;
            let id = ManagementGroupExportId::new(group.management_group, required_str(data, "name")?);
            self.base.create(ctx, data, self.resource_type(), id).await
        })
    }

    fn read<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<ReadOutcome>> {
        Box::pin(async move {
            let id = ManagementGroupExportId::parse(data.require_id()?)?;
            let name = id.name.clone();
            let scope = ManagementGroupId::new(&id.management_group).id();
            self.base.read(self, ctx, data, id, &name, ("management_group_id", scope)).await
        })
    }

    fn update<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            ensure_in_place(self, data)?;
            let id = ManagementGroupExportId::parse(data.require_id()?)?;
            self.base.update(ctx, data, self.resource_type(), id).await
        })
    }

    fn delete<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let id = ManagementGroupExportId::parse(data.require_id()?)?;
            self.base.delete(ctx, data, id).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{plan_change, ChangePlan};
    use serde_json::{json, Map, Value};

    fn config() -> Map<String, Value> {
        json!({
            "name": "monthly",
            "subscription_id": "/subscriptions/00000000-0000-0000-0000-000000000000",
            "recurrence_type": "Monthly",
            "recurrence_period_start": "2030-09-18T00:00:00Z",
            "recurrence_period_end": "2031-09-18T00:00:00Z",
            "export_data_storage_location": [{
                "storage_account_id": "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/acct",
                "container_name": "exports",
                "root_folder_path": "/root"
            }],
            "export_data_definition": [{"type": "Usage", "time_frame": "TheLastMonth"}]
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_subscription_export_config_is_valid() {
        let resource = SubscriptionCostManagementExportResource::default();
        resource.validate_config(&config()).unwrap();
    }

    #[test]
    fn test_resource_group_scope_rejects_subscription_argument() {
        let resource = ResourceGroupCostManagementExportResource::default();
        let err = resource.validate_config(&config()).unwrap_err();
        match err {
            Error::Validation(messages) => {
                assert!(messages.iter().any(|m| m == "subscription_id: unsupported argument"));
                assert!(messages.iter().any(|m| m.contains("\"resource_group_id\": required field is not set")));
            },
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_storage_account_id_is_validated() {
        let resource = SubscriptionCostManagementExportResource::default();
        let mut config = config();
        config["export_data_storage_location"][0]["storage_account_id"] = json!("/subscriptions/sub/resourceGroups/rg");
        assert!(resource.validate_config(&config).is_err());
    }

    #[test]
    fn test_model_to_export() {
        let mut values = config();
        values.insert("active".into(), json!(false));
        let data = ResourceData::new(values);
        let model: ExportModel = data.decode("export").unwrap();
        let export = model.to_export().unwrap();

        let properties = export.properties.unwrap();
        assert_eq!(properties.format.as_deref(), Some("Csv"));
        assert_eq!(properties.delivery_info.destination.container, "exports");
        assert_eq!(properties.definition.timeframe, "TheLastMonth");
        let schedule = properties.schedule.unwrap();
        assert_eq!(schedule.status.as_deref(), Some("Inactive"));
        assert_eq!(schedule.recurrence_period.unwrap().from, "2030-09-18T00:00:00Z");
    }

    #[test]
    fn test_model_round_trips_through_export() {
        let data = ResourceData::new(config());
        let model: ExportModel = data.decode("export").unwrap();
        let back = ExportModel::from_export("monthly", model.to_export().unwrap());
        assert_eq!(back, model);
    }

    #[test]
    fn test_storage_location_change_requires_replacement() {
        let resource = SubscriptionCostManagementExportResource::default();
        let prior = config();
        let mut proposed = prior.clone();
        proposed["export_data_storage_location"][0]["container_name"] = json!("other");
        assert_eq!(
            plan_change(&resource, &prior, &proposed),
            ChangePlan::Replace(vec!["export_data_storage_location".into()])
        );

        let mut proposed = prior.clone();
        proposed["recurrence_type"] = json!("Weekly");
        assert_eq!(
            plan_change(&resource, &prior, &proposed),
            ChangePlan::Update(vec!["recurrence_type".into()])
        );
    }

    #[test]
    fn test_management_group_export_config() {
        let resource = ManagementGroupCostManagementExportResource::default();
        let mut values = config();
        values.remove("subscription_id");
        values.insert(
            "management_group_id".into(),
            json!("/providers/Microsoft.Management/managementGroups/finance"),
        );
        resource.validate_config(&values).unwrap();

        values.insert(
            "management_group_id".into(),
            json!("/subscriptions/00000000-0000-0000-0000-000000000000"),
        );
        match resource.validate_config(&values).unwrap_err() {
            Error::Validation(messages) => {
                assert!(messages.iter().any(|m| m.starts_with("management_group_id:")), "{:?}", messages);
            },
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_management_group_export_normalize_id() {
        let resource = ManagementGroupCostManagementExportResource::default();
        let id = resource
            .normalize_id("/providers/microsoft.management/MANAGEMENTGROUPS/finance/providers/Microsoft.CostManagement/exports/monthly")
            .unwrap();
        assert_eq!(
            id,
            "/providers/Microsoft.Management/managementGroups/finance/providers/Microsoft.CostManagement/exports/monthly"
        );
        assert!(resource
            .validate_id("/subscriptions/sub/providers/Microsoft.CostManagement/exports/monthly")
            .is_err());
    }
}
