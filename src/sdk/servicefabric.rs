//! Service Fabric managed cluster services (API version 2021-05-01)
//!
//! Polymorphic models are internally tagged: each variant writes its own
//! discriminator (`kind`, `serviceKind`, `partitionScheme`) on encode and is
//! selected by it on decode.

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{to_body, SystemData};
use crate::azure::client::{ArmClient, Operation};
use crate::error::Result;
use crate::resourceids::{KeyMatch, ParsedResourceId, ResourceId};

pub const API_VERSION: &str = "2021-05-01";

const PROVIDER: &str = "Microsoft.ServiceFabric";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceId {
    pub subscription_id: String,
    pub resource_group: String,
    pub cluster_name: String,
    pub application_name: String,
    pub name: String,
}

impl ServiceId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        cluster_name: impl Into<String>,
        application_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            cluster_name: cluster_name.into(),
            application_name: application_name.into(),
            name: name.into(),
        }
    }

    fn parse_with(input: &str, mode: KeyMatch) -> Result<Self> {
        let mut id = ParsedResourceId::parse(input, mode)?;
        let resource_group = id.require_resource_group()?;
        id.pop_provider(PROVIDER)?;
        let cluster_name = id.pop_segment("managedClusters")?;
        let application_name = id.pop_segment("applications")?;
        let name = id.pop_segment("services")?;
        id.validate_no_remaining_segments()?;

        Ok(Self::new(
            id.subscription_id(),
            resource_group,
            cluster_name,
            application_name,
            name,
        ))
    }
}

impl ResourceId for ServiceId {
    fn parse(input: &str) -> Result<Self> {
        Self::parse_with(input, KeyMatch::Exact)
    }

    fn parse_insensitively(input: &str) -> Result<Self> {
        Self::parse_with(input, KeyMatch::Insensitive)
    }

    fn id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/managedClusters/{}/applications/{}/services/{}",
            self.subscription_id,
            self.resource_group,
            PROVIDER,
            self.cluster_name,
            self.application_name,
            self.name
        )
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Service: (Name {:?} / Application Name {:?} / Managed Cluster Name {:?} / Resource Group {:?})",
            self.name, self.application_name, self.cluster_name, self.resource_group
        )
    }
}

/// How a service scales once its trigger fires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ScalingMechanism {
    #[serde(rename_all = "camelCase")]
    AddRemoveIncrementalNamedPartition {
        max_partition_count: i64,
        min_partition_count: i64,
        scale_increment: i64,
    },
    #[serde(rename_all = "camelCase")]
    ScalePartitionInstanceCount {
        max_instance_count: i64,
        min_instance_count: i64,
        scale_increment: i64,
    },
}

impl ScalingMechanism {
    pub fn kind(&self) -> &'static str {
        match self {
            ScalingMechanism::AddRemoveIncrementalNamedPartition { .. } => "AddRemoveIncrementalNamedPartition",
            ScalingMechanism::ScalePartitionInstanceCount { .. } => "ScalePartitionInstanceCount",
        }
    }
}

/// Load condition that fires a scaling mechanism
///
/// `scale_interval` is an ISO 8601 duration (`PT5M`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ScalingTrigger {
    #[serde(rename_all = "camelCase")]
    AveragePartitionLoadTrigger {
        lower_load_threshold: f64,
        metric_name: String,
        scale_interval: String,
        upper_load_threshold: f64,
    },
    #[serde(rename_all = "camelCase")]
    AverageServiceLoadTrigger {
        lower_load_threshold: f64,
        metric_name: String,
        scale_interval: String,
        upper_load_threshold: f64,
        use_only_primary_load: bool,
    },
}

impl ScalingTrigger {
    pub fn kind(&self) -> &'static str {
        match self {
            ScalingTrigger::AveragePartitionLoadTrigger { .. } => "AveragePartitionLoadTrigger",
            ScalingTrigger::AverageServiceLoadTrigger { .. } => "AverageServiceLoadTrigger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalingPolicy {
    pub scaling_mechanism: ScalingMechanism,
    pub scaling_trigger: ScalingTrigger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "partitionScheme")]
pub enum Partition {
    Singleton,
    #[serde(rename_all = "camelCase")]
    UniformInt64Range { count: i64, high_key: i64, low_key: i64 },
    #[serde(rename_all = "camelCase")]
    Named { count: i64, names: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatelessServiceProperties {
    pub service_type_name: String,
    pub partition_description: Partition,
    pub instance_count: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scaling_policies: Vec<ScalingPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement_constraints: Option<String>,
    #[serde(skip_serializing)]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatefulServiceProperties {
    pub service_type_name: String,
    pub partition_description: Partition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_replica_set_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_replica_set_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_persisted_state: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scaling_policies: Vec<ScalingPolicy>,
    #[serde(skip_serializing)]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "serviceKind")]
pub enum ServiceResourceProperties {
    Stateless(StatelessServiceProperties),
    Stateful(StatefulServiceProperties),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<ServiceResourceProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_data: Option<SystemData>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
}

#[derive(Clone)]
pub struct ServicesClient {
    client: ArmClient,
}

impl ServicesClient {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    /// Submit the service definition
    ///
    /// The service accepts the request asynchronously (202) or applies it
    /// straight away (200/201); either way nothing is polled here.
    pub async fn create_or_update(&self, id: &ServiceId, input: &ServiceResource) -> Result<()> {
        const OP: &str = "Services.CreateOrUpdate";
        let operation = Operation::new(OP, Method::PUT, id.id(), API_VERSION)
            .with_body(to_body(OP, input)?)
            .expecting(&[200, 201, 202]);
        self.client.execute(operation).await.map(|_| ())
    }

    pub async fn get(&self, id: &ServiceId) -> Result<ServiceResource> {
        const OP: &str = "Services.Get";
        let operation = Operation::new(OP, Method::GET, id.id(), API_VERSION);
        self.client.execute(operation).await?.model(OP)
    }

    pub async fn delete(&self, id: &ServiceId) -> Result<()> {
        const OP: &str = "Services.Delete";
        let operation = Operation::new(OP, Method::DELETE, id.id(), API_VERSION).expecting(&[200, 202, 204]);
        self.client.execute(operation).await.map(|_| ())
    }
}
