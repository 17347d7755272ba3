use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "info,covidsql=debug"
    } else {
        "info,covidsql=info"
    }
}

/// Install the global subscriber. `RUST_LOG` wins; otherwise `debug` picks
/// the level for this crate. Logs go to stderr so stdout stays clean.
pub fn init(debug: bool) {
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(debug)));
    let _ = fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
