//! `azurerm_service_fabric_managed_stateless_service`

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::schema::{self, Schema, SchemaMap, SchemaType, ValidateFunc};
use super::{ensure_in_place, found, ignore_not_found, removed, ReadOutcome, Resource, ResourceContext, ResourceData, ServiceRegistration};
use crate::error::{Error, Result, Violations};
use crate::resourceids::{normalize, ResourceId};
use crate::sdk::servicefabric::{
    Partition, ScalingMechanism, ScalingPolicy, ScalingTrigger, ServiceId, ServiceResource, ServiceResourceProperties,
    ServicesClient, StatelessServiceProperties,
};

pub fn registration() -> ServiceRegistration {
    ServiceRegistration {
        name: "Service Fabric Managed Clusters",
        website_categories: &["Service Fabric Managed Clusters"],
        resources: vec![Box::new(ServiceFabricManagedStatelessServiceResource)],
    }
}

const MECHANISM_KINDS: &[&str] = &["AddRemoveIncrementalNamedPartition", "ScalePartitionInstanceCount"];
const TRIGGER_KINDS: &[&str] = &["AveragePartitionLoadTrigger", "AverageServiceLoadTrigger"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
enum MechanismModel {
    AddRemoveIncrementalNamedPartition {
        min_partition_count: i64,
        max_partition_count: i64,
        scale_increment: i64,
    },
    ScalePartitionInstanceCount {
        min_instance_count: i64,
        max_instance_count: i64,
        scale_increment: i64,
    },
}

impl From<MechanismModel> for ScalingMechanism {
    fn from(model: MechanismModel) -> Self {
        match model {
            MechanismModel::AddRemoveIncrementalNamedPartition {
                min_partition_count,
                max_partition_count,
                scale_increment,
            } => ScalingMechanism::AddRemoveIncrementalNamedPartition {
                max_partition_count,
                min_partition_count,
                scale_increment,
            },
            MechanismModel::ScalePartitionInstanceCount {
                min_instance_count,
                max_instance_count,
                scale_increment,
            } => ScalingMechanism::ScalePartitionInstanceCount {
                max_instance_count,
                min_instance_count,
                scale_increment,
            },
        }
    }
}

impl From<ScalingMechanism> for MechanismModel {
    fn from(mechanism: ScalingMechanism) -> Self {
        match mechanism {
            ScalingMechanism::AddRemoveIncrementalNamedPartition {
                max_partition_count,
                min_partition_count,
                scale_increment,
            } => MechanismModel::AddRemoveIncrementalNamedPartition {
                min_partition_count,
                max_partition_count,
                scale_increment,
            },
            ScalingMechanism::ScalePartitionInstanceCount {
                max_instance_count,
                min_instance_count,
                scale_increment,
            } => MechanismModel::ScalePartitionInstanceCount {
                min_instance_count,
                max_instance_count,
                scale_increment,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
enum TriggerModel {
    AveragePartitionLoadTrigger {
        metric_name: String,
        lower_load_threshold: f64,
        upper_load_threshold: f64,
        scale_interval: String,
    },
    AverageServiceLoadTrigger {
        metric_name: String,
        lower_load_threshold: f64,
        upper_load_threshold: f64,
        scale_interval: String,
        #[serde(default)]
        use_only_primary_load: bool,
    },
}

impl From<TriggerModel> for ScalingTrigger {
    fn from(model: TriggerModel) -> Self {
        match model {
            TriggerModel::AveragePartitionLoadTrigger {
                metric_name,
                lower_load_threshold,
                upper_load_threshold,
                scale_interval,
            } => ScalingTrigger::AveragePartitionLoadTrigger {
                lower_load_threshold,
                metric_name,
                scale_interval,
                upper_load_threshold,
            },
            TriggerModel::AverageServiceLoadTrigger {
                metric_name,
                lower_load_threshold,
                upper_load_threshold,
                scale_interval,
                use_only_primary_load,
            } => ScalingTrigger::AverageServiceLoadTrigger {
                lower_load_threshold,
                metric_name,
                scale_interval,
                upper_load_threshold,
                use_only_primary_load,
            },
        }
    }
}

impl From<ScalingTrigger> for TriggerModel {
    fn from(trigger: ScalingTrigger) -> Self {
        match trigger {
            ScalingTrigger::AveragePartitionLoadTrigger {
                lower_load_threshold,
                metric_name,
                scale_interval,
                upper_load_threshold,
            } => TriggerModel::AveragePartitionLoadTrigger {
                metric_name,
                lower_load_threshold,
                upper_load_threshold,
                scale_interval,
            },
            ScalingTrigger::AverageServiceLoadTrigger {
                lower_load_threshold,
                metric_name,
                scale_interval,
                upper_load_threshold,
                use_only_primary_load,
            } => TriggerModel::AverageServiceLoadTrigger {
                metric_name,
                lower_load_threshold,
                upper_load_threshold,
                scale_interval,
                use_only_primary_load,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ScalingPolicyModel {
    mechanism: MechanismModel,
    trigger: TriggerModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StatelessServiceModel {
    name: String,
    resource_group_name: String,
    cluster_name: String,
    application_name: String,
    service_type_name: String,
    location: String,
    instance_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    placement_constraints: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    scaling_policy: Vec<ScalingPolicyModel>,
}

impl StatelessServiceModel {
    fn service_id(&self, subscription_id: &str) -> ServiceId {
        ServiceId::new(
            subscription_id,
            &self.resource_group_name,
            &self.cluster_name,
            &self.application_name,
            &self.name,
        )
    }

    fn to_service(&self) -> ServiceResource {
        ServiceResource {
            location: Some(schema::normalize_location(&self.location)),
            properties: Some(ServiceResourceProperties::Stateless(StatelessServiceProperties {
                service_type_name: self.service_type_name.clone(),
                partition_description: Partition::Singleton,
                instance_count: self.instance_count,
                scaling_policies: self
                    .scaling_policy
                    .iter()
                    .cloned()
                    .map(|policy| ScalingPolicy {
                        scaling_mechanism: policy.mechanism.into(),
                        scaling_trigger: policy.trigger.into(),
                    })
                    .collect(),
                placement_constraints: self.placement_constraints.clone(),
                provisioning_state: None,
            })),
            ..Default::default()
        }
    }

    fn from_service(id: ServiceId, service: ServiceResource) -> Result<Self> {
        let properties = match service.properties {
            Some(ServiceResourceProperties::Stateless(properties)) => properties,
            Some(ServiceResourceProperties::Stateful(_)) => {
                return Err(Error::Config(format!("{} is a stateful service", id)));
            },
            None => return Err(Error::Config(format!("{} was returned without properties", id))),
        };

        Ok(Self {
            name: id.name,
            resource_group_name: id.resource_group,
            cluster_name: id.cluster_name,
            application_name: id.application_name,
            service_type_name: properties.service_type_name,
            location: service.location.as_deref().map(schema::normalize_location).unwrap_or_default(),
            instance_count: properties.instance_count,
            placement_constraints: properties.placement_constraints,
            scaling_policy: properties
                .scaling_policies
                .into_iter()
                .map(|policy| ScalingPolicyModel {
                    mechanism: policy.scaling_mechanism.into(),
                    trigger: policy.scaling_trigger.into(),
                })
                .collect(),
        })
    }
}

/// ISO 8601 duration such as `PT1H30M`
fn iso8601_duration() -> ValidateFunc {
    Arc::new(|value, key| {
        let valid = value.as_str().is_some_and(|s| {
            s.len() > 1
                && s.starts_with('P')
                && s[1..].chars().all(|c| c.is_ascii_digit() || "YMWDTHS.".contains(c))
                && s[1..].chars().any(|c| c.is_ascii_digit())
        });
        if valid {
            Vec::new()
        } else {
            vec![format!("{} must be an ISO 8601 duration, e.g. PT5M", key)]
        }
    })
}

fn mechanism_schema() -> SchemaMap {
    let count = || Schema::optional(SchemaType::Int).validate(schema::int_between(0, i64::from(i32::MAX)));
    let mut fields = SchemaMap::new();
    fields.insert("kind", Schema::required(SchemaType::String).validate(schema::string_in_slice(MECHANISM_KINDS)));
    fields.insert("min_partition_count", count());
    fields.insert("max_partition_count", count());
    fields.insert("min_instance_count", count());
    fields.insert("max_instance_count", count());
    fields.insert(
        "scale_increment",
        Schema::required(SchemaType::Int).validate(schema::int_between(1, i64::from(i32::MAX))),
    );
    fields
}

fn trigger_schema() -> SchemaMap {
    let threshold = || Schema::required(SchemaType::Float).validate(schema::float_between(0.0, f64::MAX));
    let mut fields = SchemaMap::new();
    fields.insert("kind", Schema::required(SchemaType::String).validate(schema::string_in_slice(TRIGGER_KINDS)));
    fields.insert("metric_name", Schema::required(SchemaType::String).validate(schema::string_is_not_white_space()));
    fields.insert("lower_load_threshold", threshold());
    fields.insert("upper_load_threshold", threshold());
    fields.insert("scale_interval", Schema::required(SchemaType::String).validate(iso8601_duration()));
    fields.insert("use_only_primary_load", Schema::optional(SchemaType::Bool));
    fields
}

/// Fields that depend on the chosen `kind`
fn check_policy(policy: &Value, path: &str, violations: &mut Violations) {
    let mechanism = &policy["mechanism"];
    let (min_key, max_key) = match mechanism["kind"].as_str() {
        Some("AddRemoveIncrementalNamedPartition") => ("min_partition_count", "max_partition_count"),
        Some("ScalePartitionInstanceCount") => ("min_instance_count", "max_instance_count"),
        _ => return,
    };

    match (mechanism[min_key].as_i64(), mechanism[max_key].as_i64()) {
        (Some(min), Some(max)) if min > max => violations.push(format!(
            "{}.mechanism: {} ({}) must not exceed {} ({})",
            path, min_key, min, max_key, max
        )),
        (Some(_), Some(_)) => {},
        _ => violations.push(format!(
            "{}.mechanism: {} and {} are required for kind {}",
            path,
            min_key,
            max_key,
            mechanism["kind"].as_str().unwrap_or_default()
        )),
    }

    let trigger = &policy["trigger"];
    if let (Some(lower), Some(upper)) = (trigger["lower_load_threshold"].as_f64(), trigger["upper_load_threshold"].as_f64()) {
        if lower > upper {
            violations.push(format!(
                "{}.trigger: lower_load_threshold ({}) must not exceed upper_load_threshold ({})",
                path, lower, upper
            ));
        }
    }
    if trigger["kind"] == "AveragePartitionLoadTrigger" && !trigger["use_only_primary_load"].is_null() {
        violations.push(format!(
            "{}.trigger: use_only_primary_load only applies to AverageServiceLoadTrigger",
            path
        ));
    }
}

pub struct ServiceFabricManagedStatelessServiceResource;

impl Resource for ServiceFabricManagedStatelessServiceResource {
    fn resource_type(&self) -> &'static str {
        "azurerm_service_fabric_managed_stateless_service"
    }

    fn arguments(&self) -> SchemaMap {
        let identity = || Schema::required(SchemaType::String).force_new().validate(schema::string_is_not_white_space());

        let mut policy = SchemaMap::new();
        policy.insert("mechanism", Schema::required(SchemaType::Block(mechanism_schema())));
        policy.insert("trigger", Schema::required(SchemaType::Block(trigger_schema())));

        let mut fields = SchemaMap::new();
        fields.insert("name", identity());
        fields.insert("resource_group_name", identity());
        fields.insert("cluster_name", identity());
        fields.insert("application_name", identity());
        fields.insert("service_type_name", identity());
        fields.insert("location", identity().state_func(schema::normalize_location));
        fields.insert(
            "instance_count",
            Schema::required(SchemaType::Int).validate(schema::int_between(-1, i64::from(i32::MAX))),
        );
        fields.insert(
            "placement_constraints",
            Schema::optional(SchemaType::String).validate(schema::string_is_not_white_space()),
        );
        fields.insert(
            "scaling_policy",
            Schema::optional(SchemaType::List(Box::new(SchemaType::Block(policy)))),
        );
        fields
    }

    fn validate_config(&self, config: &Map<String, Value>) -> Result<()> {
        let mut violations = Violations::new();
        schema::check(&self.schema(), config, "", &mut violations);

        if let Some(Value::Array(policies)) = config.get("scaling_policy") {
            for (i, policy) in policies.iter().enumerate() {
                check_policy(policy, &format!("scaling_policy.{}", i), &mut violations);
            }
        }
        violations.into_result()
    }

    fn validate_id(&self, id: &str) -> Result<()> {
        ServiceId::parse(id).map(|_| ())
    }

    fn normalize_id(&self, id: &str) -> Result<String> {
        normalize::<ServiceId>(id)
    }

    fn create<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let model: StatelessServiceModel = data.decode(self.resource_type())?;
            let id = model.service_id(ctx.subscription_id()?);

            ServicesClient::new(ctx.client.clone())
                .create_or_update(&id, &model.to_service())
                .await?;

            tracing::info!("created {}", id);
            data.set_id(Some(id.id()));
            Ok(())
        })
    }

    fn read<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<ReadOutcome>> {
        Box::pin(async move {
            let id = ServiceId::parse(data.require_id()?)?;
            let client = ServicesClient::new(ctx.client.clone());
            let Some(service) = found(client.get(&id).await)? else {
                return Ok(removed(self, data));
            };

            let model = StatelessServiceModel::from_service(id, service)?;
            data.encode(self.resource_type(), &model, &[])?;
            Ok(ReadOutcome::Found)
        })
    }

    fn update<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            ensure_in_place(self, data)?;
            let id = ServiceId::parse(data.require_id()?)?;
            let model: StatelessServiceModel = data.decode(self.resource_type())?;

            ServicesClient::new(ctx.client.clone())
                .create_or_update(&id, &model.to_service())
                .await?;
            tracing::info!("updated {}", id);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, ctx: &'a ResourceContext, data: &'a mut ResourceData) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let id = ServiceId::parse(data.require_id()?)?;
            ignore_not_found(ServicesClient::new(ctx.client.clone()).delete(&id).await)?;
            tracing::info!("deleted {}", id);
            data.set_id(None);
            Ok(())
        })
    }
}
