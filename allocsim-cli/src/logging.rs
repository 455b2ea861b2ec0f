//! Console logging setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Crates whose events are shown at the requested level; everything else is `warn`.
const OWN_CRATES: [&str; 3] = ["allocsim", "allocsim_core", "allocsim_runner"];

fn directives(level: &str) -> String {
    let mut out = String::from("warn");
    for krate in OWN_CRATES {
        out.push_str(&format!(",{krate}={level}"));
    }
    out
}

/// Install the global subscriber. `RUST_LOG` wins over `level` when set.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives(level)))
        .unwrap_or_else(|_| EnvFilter::new(directives("info")));

    let console_layer = fmt::Layer::new()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    // a second init (tests) keeps the first subscriber
    let _ = tracing_subscriber::registry().with(console_layer).try_init();
}
