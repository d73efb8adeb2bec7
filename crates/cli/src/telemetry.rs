use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging. `RUST_LOG` overrides the default filter.
pub fn init_telemetry(quiet: bool) {
    let default = if quiet {
        "flashguard=warn,flashguard_cli=warn"
    } else {
        "flashguard=info,flashguard_cli=info"
    };

    // A second init (tests calling commands repeatedly) is not an error.
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}
