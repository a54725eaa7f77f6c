use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Install the global fmt subscriber. `RUST_LOG` replaces the default
/// `water_service=info` directive when set.
pub fn init_tracing() {
    let default_directive = "water_service=info"
        .parse()
        .unwrap_or_else(|_| LevelFilter::INFO.into());

    let filter = EnvFilter::builder()
        .with_default_directive(default_directive)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
