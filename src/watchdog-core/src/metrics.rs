use prometheus::{opts, IntCounterVec, Registry};

/// Counters incremented by the probe loops. Constructed unregistered so each
/// test can hold its own instance; the binary registers one into its registry.
#[derive(Clone)]
pub struct Metrics {
    pub probes: IntCounterVec,
    pub scale_actions: IntCounterVec,
}

impl Default for Metrics {
    fn default() -> Self {
        let probes = IntCounterVec::new(
            opts!(
                "watchdog_probe_results_total",
                "Probe attempts partitioned by namespace, path and outcome"
            ),
            &["namespace", "path", "outcome"],
        )
        .unwrap();
        let scale_actions = IntCounterVec::new(
            opts!(
                "watchdog_scale_actions_total",
                "Scale actions partitioned by namespace, direction and outcome"
            ),
            &["namespace", "direction", "outcome"],
        )
        .unwrap();
        Metrics { probes, scale_actions }
    }
}

impl Metrics {
    /// Register all counters in `registry` and hand the metrics back.
    pub fn register(self, registry: &Registry) -> Result<Self, prometheus::Error> {
        registry.register(Box::new(self.probes.clone()))?;
        registry.register(Box::new(self.scale_actions.clone()))?;
        Ok(self)
    }

    pub fn observe_probe(&self, namespace: &str, path: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.probes.with_label_values(&[namespace, path, outcome]).inc();
    }

    pub fn observe_scale_action(&self, namespace: &str, direction: &str, success: bool) {
        let outcome = if success { "success" } else { "error" };
        self.scale_actions
            .with_label_values(&[namespace, direction, outcome])
            .inc();
    }
}
