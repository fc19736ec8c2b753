use crate::model::DependentResource;

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use kube::{
    api::{Api, Patch, PatchParams, ResourceExt},
    Resource,
};

use async_trait::async_trait;
use serde_json::json;
use serde_json::Value;
use tracing::{info, warn};
use watchdog_core::{Error, Result};

/// Applies replica targets to a namespace's dependent workloads. Both
/// directions attempt every resource regardless of earlier failures and
/// return the full set of failures, never just the first.
#[async_trait]
pub trait Scaler: Send + Sync {
    async fn scale_down(&self, resources: &[DependentResource]) -> Result<()>;
    async fn scale_up(&self, resources: &[DependentResource]) -> Result<()>;
}

pub struct WorkloadScaler {
    client: kube::Client,
    namespace: String,
}

impl WorkloadScaler {
    pub fn new(client: kube::Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    async fn apply(&self, resources: &[DependentResource], target: impl Fn(&DependentResource) -> i32) -> Result<()> {
        let mut failures = Vec::new();
        for resource in resources {
            let replicas = target(resource);
            if let Err(err) = self.scale_resource(resource, replicas).await {
                warn!(
                    "Failed to scale {} {}/{} to {}: {}",
                    resource.kind, self.namespace, resource.name, replicas, err,
                );
                failures.push(format!("{}/{}: {}", resource.kind, resource.name, err));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::ScaleFailed(failures))
        }
    }

    async fn scale_resource(&self, resource: &DependentResource, replicas: i32) -> Result<()> {
        let ps = PatchParams::apply("partition-watchdog").force();
        match resource.kind.as_str() {
            "Deployment" => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), &self.namespace);
                let current = api.get(&resource.name).await.map_err(Error::KubeError)?;
                let Some(patch) = generate_deployment_scale_patch(&current, replicas) else {
                    return Ok(());
                };
                api.patch(&resource.name, &ps, &patch).await.map_err(Error::KubeError)?;
            }
            "StatefulSet" => {
                let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), &self.namespace);
                let current = api.get(&resource.name).await.map_err(Error::KubeError)?;
                let Some(patch) = generate_stateful_set_scale_patch(&current, replicas) else {
                    return Ok(());
                };
                api.patch(&resource.name, &ps, &patch).await.map_err(Error::KubeError)?;
            }
            other => {
                return Err(Error::ConstructionError(format!(
                    "unsupported dependent resource kind: {other}"
                )));
            }
        }
        info!(
            "Scaled {} {}/{} to {}",
            resource.kind, self.namespace, resource.name, replicas,
        );
        Ok(())
    }
}

#[async_trait]
impl Scaler for WorkloadScaler {
    async fn scale_down(&self, resources: &[DependentResource]) -> Result<()> {
        self.apply(resources, |resource| resource.down_replicas).await
    }

    async fn scale_up(&self, resources: &[DependentResource]) -> Result<()> {
        self.apply(resources, |resource| resource.up_replicas).await
    }
}

pub(crate) fn generate_deployment_scale_patch(resource: &Deployment, replicas: i32) -> Option<Patch<Value>> {
    let api_version = Deployment::api_version(&());
    let kind = Deployment::kind(&());

    let current_replicas = resource.spec.as_ref()?.replicas?;
    if current_replicas == replicas {
        info!(
            "Skipping {} {}/{} because it is already scaled to {}",
            kind,
            resource.namespace().unwrap_or_default(),
            resource.name_any(),
            replicas,
        );
        return None;
    }

    let patch: Patch<Value> = Patch::Apply(json!({
        "apiVersion": api_version,
        "kind": kind,
        "spec": {
            "replicas": replicas,
        }
    }));
    Some(patch)
}

pub(crate) fn generate_stateful_set_scale_patch(resource: &StatefulSet, replicas: i32) -> Option<Patch<Value>> {
    let api_version = StatefulSet::api_version(&());
    let kind = StatefulSet::kind(&());

    let current_replicas = resource.spec.as_ref()?.replicas?;
    if current_replicas == replicas {
        info!(
            "Skipping {} {}/{} because it is already scaled to {}",
            kind,
            resource.namespace().unwrap_or_default(),
            resource.name_any(),
            replicas,
        );
        return None;
    }

    let patch: Patch<Value> = Patch::Apply(json!({
        "apiVersion": api_version,
        "kind": kind,
        "spec": {
            "replicas": replicas,
        }
    }));
    Some(patch)
}
