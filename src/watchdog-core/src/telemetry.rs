use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` controls the filter (default `info`); setting `LOG_JSON`
/// switches the output to one JSON object per line for log collectors.
pub async fn init() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let logger = if std::env::var("LOG_JSON").is_ok() {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().compact().boxed()
    };

    Registry::default().with(logger).with(env_filter).try_init()?;
    Ok(())
}
