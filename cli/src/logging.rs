use std::sync::Once;

/// Logger settings taken from the command line.
///
/// `filter` follows the `env_logger` filter syntax (e.g. "info",
/// "tasse=trace,codegen=debug").
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl LoggingConfig {
    pub fn new(filter: Option<String>, no_color: bool) -> Self {
        LoggingConfig {
            filter,
            write_style: if no_color {
                env_logger::WriteStyle::Never
            } else {
                env_logger::WriteStyle::Auto
            },
        }
    }
}

static INIT: Once = Once::new();

/// Install the global logger. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        builder.write_style(config.write_style);
        builder.format_timestamp(None);
        builder.init();

        log::debug!("logging initialized");
    });
}
