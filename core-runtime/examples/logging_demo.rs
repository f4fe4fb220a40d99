//! Prints a launch-like sequence of log lines in the chosen format.
//!
//! ```bash
//! cargo run -p core-runtime --example logging_demo
//! cargo run -p core-runtime --example logging_demo -- json
//! cargo run -p core-runtime --example logging_demo -- compact "core_runtime=trace"
//! ```

use bridge_traits::time::{ConsoleLogger, LogLevel};
use core_runtime::config::CdnConfig;
use core_runtime::logging::{
    init_logging, redact_if_sensitive, strip_path, LogFormat, LoggingConfig,
};
use std::env;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_spans(true)
        .with_logger_sink(Arc::new(ConsoleLogger::default()));

    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }

    if let Err(e) = init_logging(config) {
        eprintln!("logging setup failed: {}", e);
        return;
    }

    info!(?format, "Logging initialized");
    launch(&["alafasy", "husary", "minshawi"]).await;
    record_download("/data/user/0/app/files/alafasy/036.mp3");
}

#[instrument(fields(reciters = ids.len()))]
async fn launch(ids: &[&str]) {
    let cdn = CdnConfig::default();
    debug!(url = %cdn.catalog_url(1_704_067_200_000), "Fetching catalog");
    tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

    info!(
        count = ids.len(),
        support_email = %redact_if_sensitive("support_email", "support@qariee.app"),
        "Applied catalog"
    );
    warn!(current = "1.0.0", latest = "1.2.0", "App update available");
}

fn record_download(path: &str) {
    info!(file = %strip_path(path), "Recorded download");
}
