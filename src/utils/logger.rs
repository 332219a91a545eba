use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive when `RUST_LOG` is unset. `level` comes from
/// the config file and wins over `verbose`.
pub fn default_directive(level: Option<&str>, verbose: bool) -> String {
    match level {
        Some(level) => format!("handson_etl={}", level.trim().to_ascii_lowercase()),
        None if verbose => "handson_etl=debug,info".to_string(),
        None => "handson_etl=info".to_string(),
    }
}

fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
}

pub fn init_cli_logger(verbose: bool) {
    init_cli_logger_with(None, verbose);
}

pub fn init_cli_logger_with(level: Option<&str>, verbose: bool) {
    tracing_subscriber::registry()
        .with(env_filter(&default_directive(level, verbose)))
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

pub fn init_json_logger() {
    init_json_logger_with(None);
}

/// Databricks job runs collect driver logs as JSON lines.
pub fn init_json_logger_with(level: Option<&str>) {
    tracing_subscriber::registry()
        .with(env_filter(&default_directive(level, false)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}
