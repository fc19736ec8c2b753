use serde::{Deserialize, Serialize};
use std::time::Duration;
use watchdog_core::{Error, Result};

/// Workload kinds the scaler knows how to patch.
pub const SUPPORTED_KINDS: [&str; 2] = ["Deployment", "StatefulSet"];

fn deployment() -> String {
    "Deployment".to_string()
}

fn default_probe_interval() -> u64 {
    10
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_success_threshold() -> u32 {
    1
}

fn default_failure_threshold() -> u32 {
    3
}

/// One workload whose replica count is driven by the prober. `down_replicas`
/// is applied when an internal partition is confirmed, `up_replicas` when
/// connectivity is healthy again.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DependentResource {
    #[serde(default = "deployment")]
    pub kind: String,
    pub name: String,
    pub down_replicas: i32,
    pub up_replicas: i32,
}

/// Configuration snapshot for one namespace's prober. Immutable once the
/// prober is constructed; a config change is an unregister-then-register.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProberConfig {
    pub namespace: String,
    /// Secret holding the kubeconfig routed over the in-cluster network.
    pub internal_kube_config_secret_name: String,
    /// Secret holding the externally-routed kubeconfig. Without it a
    /// partition cannot be told apart from a full apiserver outage, so
    /// scale-down is suppressed.
    #[serde(default)]
    pub external_kube_config_secret_name: Option<String>,
    /// Tick cadence in seconds.
    #[serde(default = "default_probe_interval")]
    pub probe_interval: u64,
    /// Upper bound for a single probe attempt in seconds; a timeout counts
    /// as a failed probe.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: u64,
    /// Consecutive internal successes required before scaling back up.
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
    /// Consecutive internal failures (with the external path healthy)
    /// required before scaling down.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Workloads to scale, in order.
    #[serde(default)]
    pub dependent_resource_list: Vec<DependentResource>,
}

impl ProberConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout)
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(Error::ConstructionError("namespace must not be empty".into()));
        }
        if self.internal_kube_config_secret_name.is_empty() {
            return Err(Error::ConstructionError(
                "internalKubeConfigSecretName must not be empty".into(),
            ));
        }
        if self.probe_interval == 0 {
            return Err(Error::ConstructionError("probeInterval must be greater than zero".into()));
        }
        if self.probe_timeout == 0 {
            return Err(Error::ConstructionError("probeTimeout must be greater than zero".into()));
        }
        if self.success_threshold == 0 {
            return Err(Error::ConstructionError(
                "successThreshold must be greater than zero".into(),
            ));
        }
        if self.failure_threshold == 0 {
            return Err(Error::ConstructionError(
                "failureThreshold must be greater than zero".into(),
            ));
        }
        for resource in &self.dependent_resource_list {
            if resource.name.is_empty() {
                return Err(Error::ConstructionError(
                    "dependent resource name must not be empty".into(),
                ));
            }
            if !SUPPORTED_KINDS.contains(&resource.kind.as_str()) {
                return Err(Error::ConstructionError(format!(
                    "unsupported dependent resource kind: {}",
                    resource.kind
                )));
            }
            if resource.down_replicas < 0 || resource.up_replicas < 0 {
                return Err(Error::ConstructionError(format!(
                    "replica targets for {} {} must not be negative",
                    resource.kind, resource.name
                )));
            }
        }
        Ok(())
    }
}

/// Decode and validate a prober config document.
pub fn decode_config(data: &str) -> Result<ProberConfig> {
    let config: ProberConfig = serde_yaml::from_str(data).map_err(Error::ConfigError)?;
    config.validate()?;
    Ok(config)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Healthy,
    Degraded,
    /// Neither path can reach the apiserver. Observability only; the signal
    /// is too ambiguous to act on.
    ExternalUnreachable,
    ScaledDown,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProbePath {
    Internal,
    External,
}

impl ProbePath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbePath::Internal => "internal",
            ProbePath::External => "external",
        }
    }
}

/// Outcome of one probe attempt. Produced and consumed within a single tick.
#[derive(Clone, Debug)]
pub struct ProbeResult {
    pub path: ProbePath,
    pub success: bool,
    pub error: Option<String>,
    pub at: chrono::DateTime<chrono::Utc>,
}

impl ProbeResult {
    pub fn new(path: ProbePath, outcome: &Result<()>) -> Self {
        Self {
            path,
            success: outcome.is_ok(),
            error: outcome.as_ref().err().map(ToString::to_string),
            at: chrono::Utc::now(),
        }
    }
}
