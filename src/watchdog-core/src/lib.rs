use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration or unusable credentials. Fatal only to the
    /// creation of the prober it belongs to; a running loop never emits it.
    #[error("ConstructionError: {0}")]
    ConstructionError(String),

    /// One failed probe attempt. Counted by the owning prober, never fatal.
    #[error("ProbeError: {0}")]
    ProbeError(String),

    /// Aggregated per-resource scale failures. Every failed resource is
    /// listed; the action is retried on the next tick.
    #[error("ScaleFailed: {}", .0.join("; "))]
    ScaleFailed(Vec<String>),

    #[error("SerializationError: {0}")]
    SerializationError(#[source] serde_json::Error),

    #[error("ConfigError: {0}")]
    ConfigError(#[source] serde_yaml::Error),

    #[error("Kube Error: {0}")]
    KubeError(#[source] kube::Error),
}
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Log and trace integrations
pub mod telemetry;

/// Metrics
mod metrics;
pub use metrics::Metrics;
