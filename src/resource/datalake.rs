//! `azurerm_data_lake_analytics_storage_account`
//!
//! Registers an existing storage account with a Data Lake Analytics
//! account. The access key is write-only: reads keep the configured value.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::schema::{self, Schema, SchemaMap, SchemaType};
use super::{ensure_in_place, found, ignore_not_found, removed, ReadOutcome, Resource, ResourceContext, ResourceData, ServiceRegistration};
use crate::error::Result;
use crate::resourceids::{normalize, ResourceId};
use crate::sdk::datalake::{
    AddStorageAccountParameters, AddStorageAccountProperties, StorageAccountId, StorageAccountsClient,
    UpdateStorageAccountParameters, UpdateStorageAccountProperties,
};

pub fn registration() -> ServiceRegistration {
    ServiceRegistration {
        name: "Data Lake",
        website_categories: &["Data Lake"],
        resources: vec![Box::new(DataLakeAnalyticsStorageAccountResource)],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StorageAccountModel {
    name: String,
    account_name: String,
    resource_group_name: String,
    #[serde(default)]
    access_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    suffix: Option<String>,
}

pub struct DataLakeAnalyticsStorageAccountResource;

impl Resource for DataLakeAnalyticsStorageAccountResource {
    fn resource_type(&self) -> &'static str {
        "azurerm_data_lake_analytics_storage_account"
    }

    fn arguments(&self) -> SchemaMap {
        let not_blank = schema::string_is_not_white_space;
        let mut fields = SchemaMap::new();
        fields.insert("name", Schema::required(SchemaType::String).force_new().validate(not_blank()));
        fields.insert("account_name", Schema::required(SchemaType::String).force_new().validate(not_blank()));
        fields.insert("resource_group_name", Schema::required(SchemaType::String).force_new().validate(not_blank()));
        fields.insert("access_key", Schema::required(SchemaType::String).sensitive().validate(not_blank()));
        fields.insert("suffix", Schema::optional(SchemaType::String).or_computed().validate(not_blank()));
        fields
    }

    fn validate_id(&self, id: &str) -> Result<()> {
        StorageAccountId::parse(id).map(|_| ())
    }

    fn normalize_id(&self, id: &str) -> Result<String> {
        normalize::<StorageAccountId>(id)
    }

    fn create<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let model: StorageAccountModel = data.decode(self.resource_type())?;
            let id = StorageAccountId::new(
                ctx.subscription_id()?,
                &model.resource_group_name,
                &model.account_name,
                &model.name,
            );

            let input = AddStorageAccountParameters {
                properties: AddStorageAccountProperties {
                    access_key: model.access_key,
                    suffix: model.suffix,
                },
            };
            StorageAccountsClient::new(ctx.client.clone()).add(&id, &input).await?;

            tracing::info!("added {}", id);
            data.set_id(Some(id.id()));
            Ok(())
        })
    }

    fn read<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<ReadOutcome>> {
        Box::pin(async move {
            let id = StorageAccountId::parse(data.require_id()?)?;
            let client = StorageAccountsClient::new(ctx.client.clone());
            let Some(account) = found(client.get(&id).await)? else {
                return Ok(removed(self, data));
            };

            let model = StorageAccountModel {
                name: id.name,
                account_name: id.account_name,
                resource_group_name: id.resource_group,
                access_key: String::new(),
                suffix: account.properties.and_then(|p| p.suffix),
            };
            data.encode(self.resource_type(), &model, &["access_key"])?;
            Ok(ReadOutcome::Found)
        })
    }

    fn update<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            ensure_in_place(self, data)?;
            let id = StorageAccountId::parse(data.require_id()?)?;
            let model: StorageAccountModel = data.decode(self.resource_type())?;

            let input = UpdateStorageAccountParameters {
                properties: Some(UpdateStorageAccountProperties {
                    access_key: Some(model.access_key),
                    suffix: model.suffix,
                }),
            };
            StorageAccountsClient::new(ctx.client.clone()).update(&id, &input).await?;
            tracing::info!("updated {}", id);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let id = StorageAccountId::parse(data.require_id()?)?;
            ignore_not_found(StorageAccountsClient::new(ctx.client.clone()).delete(&id).await)?;
            tracing::info!("deleted {}", id);
            data.set_id(None);
            Ok(())
        })
    }
}
