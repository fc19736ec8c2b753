use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::Api,
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use watchdog_core::{Error, Result};

const KUBECONFIG_SECRET_KEY: &str = "kubeconfig";

/// Builds the client for one probe path from a kubeconfig stored in a Secret.
/// A missing secret, missing key or malformed kubeconfig fails here, before
/// any loop is spawned, so a prober never starts with unusable credentials.
pub async fn client_from_kubeconfig_secret(
    host_client: Client,
    namespace: &str,
    secret_name: &str,
) -> Result<Client> {
    let secrets: Api<Secret> = Api::namespaced(host_client, namespace);
    let secret = secrets.get(secret_name).await.map_err(Error::KubeError)?;
    let data = secret
        .data
        .as_ref()
        .and_then(|data| data.get(KUBECONFIG_SECRET_KEY))
        .ok_or_else(|| {
            Error::ConstructionError(format!(
                "secret {namespace}/{secret_name} has no {KUBECONFIG_SECRET_KEY} key"
            ))
        })?;
    let raw = std::str::from_utf8(&data.0).map_err(|err| {
        Error::ConstructionError(format!(
            "kubeconfig in secret {namespace}/{secret_name} is not valid UTF-8: {err}"
        ))
    })?;
    let kubeconfig = Kubeconfig::from_yaml(raw).map_err(|err| {
        Error::ConstructionError(format!(
            "kubeconfig in secret {namespace}/{secret_name} is malformed: {err}"
        ))
    })?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|err| {
            Error::ConstructionError(format!(
                "failed to build client config from secret {namespace}/{secret_name}: {err}"
            ))
        })?;
    Client::try_from(config).map_err(Error::KubeError)
}
