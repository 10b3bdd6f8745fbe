//! Tracing subscriber setup.
//!
//! Production emits JSON lines; every other environment gets human-readable
//! output. `RUST_LOG` overrides the configured level when set.

use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// Dependencies that log far more than the service itself.
const NOISY_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls", "tower_http"];

/// Build the filter directive string for a settings level.
#[must_use]
pub fn filter_directives(level: &str) -> String {
    let mut directives = vec![level.to_string()];
    directives.extend(NOISY_TARGETS.iter().map(|target| format!("{target}=warn")));
    directives.join(",")
}

/// Install the global subscriber. Safe to call once per process.
pub fn init(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(settings.log_level.directive())));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = if settings.is_production() {
        builder.json().flatten_event(true).with_current_span(true).try_init()
    } else {
        builder.with_ansi(true).try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_cap_noisy_targets() {
        let directives = filter_directives("info");
        assert!(directives.starts_with("info,"));
        assert!(directives.contains("hyper=warn"));
        assert!(directives.contains("reqwest=warn"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }
}
