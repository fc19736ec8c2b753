use async_trait::async_trait;
use std::time::Duration;
use watchdog_core::{Error, Result};

/// One bounded connectivity check against an apiserver endpoint. There is no
/// internal retry: the retry cadence is the prober's tick, which keeps the
/// failure-to-action latency bounded and observable.
#[async_trait]
pub trait ProbeClient: Send + Sync {
    async fn probe(&self) -> Result<()>;
}

/// Probes an apiserver with a single lightweight version read, using the
/// credentials baked into `client` for this path.
pub struct ApiServerProbe {
    client: kube::Client,
    timeout: Duration,
}

impl ApiServerProbe {
    pub fn new(client: kube::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl ProbeClient for ApiServerProbe {
    async fn probe(&self) -> Result<()> {
        match tokio::time::timeout(self.timeout, self.client.apiserver_version()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(Error::ProbeError(err.to_string())),
            Err(_) => Err(Error::ProbeError(format!(
                "probe timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}
