use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor the config names one.
pub const DEFAULT_FILTER: &str = "warn";

/// `RUST_LOG` wins over the configured filter, which wins over the default.
pub fn resolve_filter(env: Option<String>, configured: Option<&str>) -> String {
    env.filter(|s| !s.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_FILTER.into())
}

/// Installs the global fmt subscriber on stderr. Calling it twice is harmless.
pub fn init(configured: Option<&str>) {
    let filter = resolve_filter(std::env::var("RUST_LOG").ok(), configured);
    let env_filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
