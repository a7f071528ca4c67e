use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Everything goes to stderr so stdout stays
/// free for command output and the MCP stream.
///
/// `RUST_LOG` overrides the default level.
pub fn init(default_level: &str, verbose: bool) {
    let level = if verbose { "debug" } else { default_level };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("macro_tracker={level}").into());

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
