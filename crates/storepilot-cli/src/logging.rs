use storepilot_security::RedactingWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "storepilot=info,tower_http=info";

/// Logs go to stderr with credentials masked. `RUST_LOG` overrides the filter.
pub fn init(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(RedactingWriter::stderr())
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}
