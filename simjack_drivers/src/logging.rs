use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Parses a configured level name, `None` for anything unknown.
pub fn parse_level(level: Option<&str>) -> Option<Level> {
    level.and_then(|text| text.trim().parse().ok())
}

/// Installs a stderr subscriber. `RUST_LOG` wins over the configured level,
/// which wins over INFO.
pub fn init_tracing(level: Option<&str>) {
    let level = parse_level(level).unwrap_or(Level::INFO);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    // Already set when running in tests.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_levels_only() {
        assert_eq!(parse_level(Some("debug")), Some(Level::DEBUG));
        assert_eq!(parse_level(Some(" WARN ")), Some(Level::WARN));
        assert_eq!(parse_level(Some("chatty")), None);
        assert_eq!(parse_level(None), None);
    }

    #[test]
    fn init_twice_is_harmless() {
        init_tracing(Some("trace"));
        init_tracing(None);
    }
}
