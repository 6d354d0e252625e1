use std::sync::OnceLock;

use pressbox_common::observability::{LogConfig, LogFormat, init_logging};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "pressbox-tests",
            log_dir: Some(std::env::temp_dir().join("pressbox-tests")),
            emit_stderr: true,
            format: if std::env::var("PRESSBOX_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug".to_string(),
        };

        init_logging(config).unwrap_or_default()
    });
}
