use std::sync::Arc;

use watchdog_core::{telemetry, Metrics};
use watchdog_prober::{
    client::client_from_kubeconfig_secret,
    model,
    probe::{ApiServerProbe, ProbeClient},
    scale::WorkloadScaler,
    Manager, Prober,
};

#[tokio::main]
async fn main() {
    telemetry::init().await.expect("Failed to initialize telemetry");

    let mut args = std::env::args();
    args.next();

    let config_path = args.next().expect("No prober config file provided");
    let raw = std::fs::read_to_string(&config_path).expect("Failed to read prober config file");
    let config = model::decode_config(&raw).expect("Invalid prober config");
    let namespace = config.namespace.clone();

    let host_client = kube::Client::try_default()
        .await
        .expect("failed to create kube Client");

    let internal = client_from_kubeconfig_secret(
        host_client.clone(),
        &namespace,
        &config.internal_kube_config_secret_name,
    )
    .await
    .expect("failed to build internal probe client");
    let internal = Arc::new(ApiServerProbe::new(internal, config.timeout()));

    let external = match &config.external_kube_config_secret_name {
        Some(secret_name) => {
            let client = client_from_kubeconfig_secret(host_client.clone(), &namespace, secret_name)
                .await
                .expect("failed to build external probe client");
            Some(Arc::new(ApiServerProbe::new(client, config.timeout())) as Arc<dyn ProbeClient>)
        }
        None => None,
    };

    let scaler = Arc::new(WorkloadScaler::new(host_client, &namespace));
    let registry = prometheus::Registry::new();
    let metrics = Metrics::default()
        .register(&registry)
        .expect("failed to register metrics");

    let manager = Manager::new();
    let prober = Prober::new(&namespace, config, internal, external, scaler, metrics);
    let handle = prober.clone();
    if !manager.register(prober).await {
        panic!("A prober for namespace {} is already registered", namespace);
    }
    let loop_task = tokio::spawn(async move { handle.run().await });

    tokio::signal::ctrl_c().await.expect("failed to listen for ctrl-c");
    manager.unregister(&namespace).await;
    let _ = loop_task.await;
}
