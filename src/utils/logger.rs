use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Builds the default filter directive for the configured level.
pub fn default_directive(level: &str, verbose: bool) -> String {
    if verbose {
        "package_tracker=debug,info".to_string()
    } else {
        format!("package_tracker={}", level)
    }
}

pub fn init_logger(level: &str, verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level, verbose)));

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .json(),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .compact(),
            )
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_level() {
        assert_eq!(default_directive("warn", false), "package_tracker=warn");
        assert_eq!(default_directive("warn", true), "package_tracker=debug,info");
    }
}
