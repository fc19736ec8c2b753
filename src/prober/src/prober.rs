use crate::model::{Mode, ProbePath, ProbeResult, ProberConfig};
use crate::probe::ProbeClient;
use crate::scale::Scaler;

use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use watchdog_core::Metrics;

const SCALE_DOWN: &str = "down";
const SCALE_UP: &str = "up";

/// Handle to one namespace's probe loop. Cheap to clone; all clones share the
/// same cancellation token, so closing any of them closes the loop. The probe
/// counters and mode live inside the loop task and are never observed from
/// outside, only `is_closed` is.
#[derive(Clone)]
pub struct Prober {
    namespace: String,
    config: Arc<ProberConfig>,
    internal: Arc<dyn ProbeClient>,
    external: Option<Arc<dyn ProbeClient>>,
    scaler: Arc<dyn Scaler>,
    cancel: CancellationToken,
    metrics: Metrics,
}

/// Per-loop mutable state, owned by the loop task only.
struct ProbeStatus {
    successes: u32,
    failures: u32,
    mode: Mode,
}

impl ProbeStatus {
    fn new() -> Self {
        Self {
            successes: 0,
            failures: 0,
            mode: Mode::Healthy,
        }
    }
}

impl Prober {
    pub fn new(
        namespace: &str,
        config: ProberConfig,
        internal: Arc<dyn ProbeClient>,
        external: Option<Arc<dyn ProbeClient>>,
        scaler: Arc<dyn Scaler>,
        metrics: Metrics,
    ) -> Self {
        Self {
            namespace: namespace.to_string(),
            config: Arc::new(config),
            internal,
            external,
            scaler,
            cancel: CancellationToken::new(),
            metrics,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn config(&self) -> &ProberConfig {
        &self.config
    }

    /// Non-blocking check of the lifecycle token. The loop exits at its next
    /// suspension point after this turns true.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel the loop. Idempotent; repeated calls are no-ops.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Run the probe loop until the prober is closed. Ticks are strictly
    /// sequential: the next tick cannot start before the previous tick's
    /// evaluation, including any scale action, has finished.
    pub async fn run(&self) {
        let mut ticker = interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut status = ProbeStatus::new();

        info!("Starting prober for namespace {}", self.namespace);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Prober for namespace {} closed, exiting", self.namespace);
                    return;
                }
                _ = ticker.tick() => {}
            }

            self.tick(&mut status).await;

            // An in-flight probe or scale call is never aborted mid-flight;
            // cancellation is observed once the tick's work has completed.
            if self.is_closed() {
                info!("Prober for namespace {} closed, exiting", self.namespace);
                return;
            }
        }
    }

    async fn tick(&self, status: &mut ProbeStatus) {
        let internal = self.probe_path(ProbePath::Internal, &self.internal).await;
        if internal.success {
            self.on_internal_success(status).await;
            return;
        }

        let Some(external) = &self.external else {
            // No external vantage point, so a partition cannot be confirmed.
            // Count the failure for observability but never act on it.
            status.successes = 0;
            status.failures = status.failures.saturating_add(1);
            if status.mode != Mode::ScaledDown {
                status.mode = Mode::Degraded;
            }
            warn!(
                "Internal probe failed for namespace {} ({} consecutive) with no external kubeconfig configured; skipping scale-down",
                self.namespace, status.failures,
            );
            return;
        };

        let external = self.probe_path(ProbePath::External, external).await;
        if external.success {
            self.on_internal_failure(status).await;
        } else {
            // Both paths down points at a cluster-wide apiserver outage
            // rather than a local partition; the signal is too ambiguous to
            // act on. ScaledDown is preserved so a later recovery still
            // scales the dependents back up.
            if status.mode != Mode::ScaledDown {
                status.mode = Mode::ExternalUnreachable;
            }
            warn!(
                "Both probe paths failed for namespace {}; taking no action",
                self.namespace,
            );
        }
    }

    async fn on_internal_success(&self, status: &mut ProbeStatus) {
        status.failures = 0;
        status.successes = status.successes.saturating_add(1);

        if status.mode != Mode::ScaledDown {
            status.mode = Mode::Healthy;
            return;
        }
        if status.successes < self.config.success_threshold {
            debug!(
                "Internal probe healthy for namespace {} ({}/{} consecutive successes)",
                self.namespace, status.successes, self.config.success_threshold,
            );
            return;
        }

        info!(
            "Connectivity to namespace {} confirmed healthy after {} consecutive successes, scaling dependents up",
            self.namespace, status.successes,
        );
        match self.scaler.scale_up(&self.config.dependent_resource_list).await {
            Ok(()) => {
                self.metrics.observe_scale_action(&self.namespace, SCALE_UP, true);
                status.mode = Mode::Healthy;
                status.successes = 0;
                status.failures = 0;
            }
            Err(err) => {
                // Mode stays ScaledDown and the counters are kept, so the
                // very next healthy tick retries the scale-up.
                self.metrics.observe_scale_action(&self.namespace, SCALE_UP, false);
                error!(
                    "Failed to scale up dependents of namespace {}: {}; retrying next tick",
                    self.namespace, err,
                );
            }
        }
    }

    async fn on_internal_failure(&self, status: &mut ProbeStatus) {
        status.successes = 0;
        status.failures = status.failures.saturating_add(1);

        if status.mode == Mode::ScaledDown {
            debug!(
                "Internal probe still failing for namespace {}, dependents already scaled down",
                self.namespace,
            );
            return;
        }
        if status.failures < self.config.failure_threshold {
            status.mode = Mode::Degraded;
            warn!(
                "Internal probe failed for namespace {} ({}/{} consecutive failures)",
                self.namespace, status.failures, self.config.failure_threshold,
            );
            return;
        }

        warn!(
            "Internal path to namespace {} unreachable for {} consecutive probes while external path is healthy, scaling dependents down",
            self.namespace, status.failures,
        );
        match self.scaler.scale_down(&self.config.dependent_resource_list).await {
            Ok(()) => {
                self.metrics.observe_scale_action(&self.namespace, SCALE_DOWN, true);
                status.mode = Mode::ScaledDown;
            }
            Err(err) => {
                // Mode does not advance past the attempted transition; the
                // threshold stays crossed so the next tick retries.
                self.metrics.observe_scale_action(&self.namespace, SCALE_DOWN, false);
                status.mode = Mode::Degraded;
                error!(
                    "Failed to scale down dependents of namespace {}: {}; retrying next tick",
                    self.namespace, err,
                );
            }
        }
    }

    async fn probe_path(&self, path: ProbePath, client: &Arc<dyn ProbeClient>) -> ProbeResult {
        let outcome = client.probe().await;
        let result = ProbeResult::new(path, &outcome);
        self.metrics
            .observe_probe(&self.namespace, path.as_str(), result.success);
        if let Some(err) = &result.error {
            debug!(
                "{} probe for namespace {} failed: {}",
                path.as_str(),
                self.namespace,
                err,
            );
        }
        result
    }
}
