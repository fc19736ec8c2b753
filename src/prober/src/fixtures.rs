//! Test doubles shared by the manager and prober tests.

use crate::model::{DependentResource, ProberConfig};
use crate::probe::ProbeClient;
use crate::prober::Prober;
use crate::scale::Scaler;

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use watchdog_core::{Error, Metrics, Result};

/// Probe client answering from a script, then from a fixed fallback.
pub struct ScriptedProbe {
    outcomes: Mutex<VecDeque<bool>>,
    fallback: bool,
}

impl ScriptedProbe {
    pub fn always(success: bool) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(VecDeque::new()),
            fallback: success,
        })
    }

    pub fn sequence(outcomes: &[bool]) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.iter().copied().collect()),
            fallback: true,
        })
    }
}

#[async_trait]
impl ProbeClient for ScriptedProbe {
    async fn probe(&self) -> Result<()> {
        let success = self.outcomes.lock().unwrap().pop_front().unwrap_or(self.fallback);
        if success {
            Ok(())
        } else {
            Err(Error::ProbeError("scripted probe failure".into()))
        }
    }
}

/// Scaler recording every attempt, optionally failing the first N calls in
/// one direction.
#[derive(Default)]
pub struct RecordingScaler {
    scale_downs: Mutex<u32>,
    scale_ups: Mutex<u32>,
    failing_downs: Mutex<u32>,
    failing_ups: Mutex<u32>,
}

impl RecordingScaler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_scale_downs(n: u32) -> Arc<Self> {
        let scaler = Self::default();
        *scaler.failing_downs.lock().unwrap() = n;
        Arc::new(scaler)
    }

    pub fn failing_scale_ups(n: u32) -> Arc<Self> {
        let scaler = Self::default();
        *scaler.failing_ups.lock().unwrap() = n;
        Arc::new(scaler)
    }

    pub fn downs(&self) -> u32 {
        *self.scale_downs.lock().unwrap()
    }

    pub fn ups(&self) -> u32 {
        *self.scale_ups.lock().unwrap()
    }
}

#[async_trait]
impl Scaler for RecordingScaler {
    async fn scale_down(&self, _resources: &[DependentResource]) -> Result<()> {
        *self.scale_downs.lock().unwrap() += 1;
        let mut failing = self.failing_downs.lock().unwrap();
        if *failing > 0 {
            *failing -= 1;
            return Err(Error::ScaleFailed(vec![
                "Deployment/kube-controller-manager: scripted failure".into(),
            ]));
        }
        Ok(())
    }

    async fn scale_up(&self, _resources: &[DependentResource]) -> Result<()> {
        *self.scale_ups.lock().unwrap() += 1;
        let mut failing = self.failing_ups.lock().unwrap();
        if *failing > 0 {
            *failing -= 1;
            return Err(Error::ScaleFailed(vec![
                "Deployment/kube-controller-manager: scripted failure".into(),
            ]));
        }
        Ok(())
    }
}

pub fn prober_config(namespace: &str, internal_secret: &str) -> ProberConfig {
    ProberConfig {
        namespace: namespace.to_string(),
        internal_kube_config_secret_name: internal_secret.to_string(),
        external_kube_config_secret_name: Some("external-kubeconfig".to_string()),
        probe_interval: 1,
        probe_timeout: 1,
        success_threshold: 1,
        failure_threshold: 3,
        dependent_resource_list: vec![DependentResource {
            kind: "Deployment".to_string(),
            name: "kube-controller-manager".to_string(),
            down_replicas: 0,
            up_replicas: 1,
        }],
    }
}

pub fn test_prober(
    config: ProberConfig,
    internal: Arc<dyn ProbeClient>,
    external: Option<Arc<ScriptedProbe>>,
    scaler: Arc<dyn Scaler>,
) -> Prober {
    let namespace = config.namespace.clone();
    Prober::new(
        &namespace,
        config,
        internal,
        external.map(|probe| probe as Arc<dyn ProbeClient>),
        scaler,
        Metrics::default(),
    )
}

/// A prober that never probes: always-healthy paths and a no-op scaler.
pub fn new_prober(namespace: &str, internal_secret: &str) -> Prober {
    test_prober(
        prober_config(namespace, internal_secret),
        ScriptedProbe::always(true),
        Some(ScriptedProbe::always(true)),
        RecordingScaler::new(),
    )
}
