//! Resource Registry - Lookup of resource types by name
//!
//! Every service module contributes a [`ServiceRegistration`]. The registry
//! is built on first access and lives for the rest of the process.

use std::sync::OnceLock;

use super::{costmanagement, datalake, eventhub, servicefabric, Resource};

/// The resources one service contributes
pub struct ServiceRegistration {
    pub name: &'static str,
    /// Categories used to group the service in documentation
    pub website_categories: &'static [&'static str],
    pub resources: Vec<Box<dyn Resource>>,
}

/// Global registry
static REGISTRY: OnceLock<Vec<ServiceRegistration>> = OnceLock::new();

/// Get every service registration
pub fn get_registry() -> &'static [ServiceRegistration] {
    REGISTRY.get_or_init(|| {
        vec![
            costmanagement::registration(),
            datalake::registration(),
            eventhub::registration(),
            servicefabric::registration(),
        ]
    })
}

/// Get a resource by its type name
pub fn get_resource(resource_type: &str) -> Option<&'static dyn Resource> {
    get_registry()
        .iter()
        .flat_map(|service| service.resources.iter())
        .find(|resource| resource.resource_type() == resource_type)
        .map(|resource| resource.as_ref())
}

/// Get all resource type names, sorted
pub fn get_all_resource_types() -> Vec<&'static str> {
    let mut types: Vec<&'static str> = get_registry()
        .iter()
        .flat_map(|service| service.resources.iter())
        .map(|resource| resource.resource_type())
        .collect();
    types.sort_unstable();
    types
}
