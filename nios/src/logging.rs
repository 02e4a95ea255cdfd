//! Provider log setup
//!
//! Terraform captures the provider's stderr, so logs go there. The level
//! follows `TF_LOG_PROVIDER`, then `TF_LOG`, and defaults to `info`.

use tracing_subscriber::EnvFilter;

const DEFAULT_LEVEL: &str = "info";

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|l| !l.is_empty())
}

/// Terraform spells levels in upper case and also accepts `JSON` and `OFF`
fn directive(provider: Option<&str>, global: Option<&str>) -> String {
    let level = non_blank(provider)
        .or_else(|| non_blank(global))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string());

    match level.as_str() {
        "json" => "trace".to_string(),
        "trace" | "debug" | "info" | "warn" | "error" | "off" => level,
        _ => DEFAULT_LEVEL.to_string(),
    }
}

/// Install the global subscriber; later calls are no-ops
pub fn init() {
    let provider = std::env::var("TF_LOG_PROVIDER").ok();
    let global = std::env::var("TF_LOG").ok();
    let filter = EnvFilter::new(directive(provider.as_deref(), global.as_deref()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .try_init();
}
