//! Logging setup.
//!
//! The host may already own a global subscriber, so installation is
//! best-effort.

use tracing_subscriber::EnvFilter;
use warps_core::config::GeneralConfig;

/// Install a `tracing` subscriber for `general.log_level` and
/// `general.log_format` ("pretty" or "json"). `RUST_LOG` overrides the
/// configured level.
///
/// Returns `false` if a global subscriber was already set.
pub fn init_logging(general: &GeneralConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&general.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if general.log_format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_reports_false() {
        let general = GeneralConfig::default();
        init_logging(&general);
        assert!(!init_logging(&general));
    }
}
