use tracing_subscriber::{
    filter::{Directive, LevelFilter},
    EnvFilter,
};

/// Install the global fmt subscriber, logging to stderr so report binaries
/// can keep stdout for their JSON output. `RUST_LOG` overrides the default.
pub fn init_tracing() {
    init_tracing_with("billing_service=info");
}

pub fn init_tracing_with(default_directive: &str) {
    let directive: Directive = default_directive
        .parse()
        .unwrap_or_else(|_| LevelFilter::INFO.into());
    let filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
