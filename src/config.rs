use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Consulta";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    format!("info,{}=debug", env!("CARGO_PKG_NAME"))
}

/// Get the application data directory
/// ~/Consulta/ on all platforms (user-visible, holds uploaded workbooks),
/// overridable with CONSULTA_DATA_DIR for tests and containers.
pub fn app_data_dir() -> PathBuf {
    match std::env::var("CONSULTA_DATA_DIR") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let home = dirs::home_dir().expect("Cannot determine home directory");
            home.join("Consulta")
        }
    }
}

/// Get the uploads directory (raw workbook files, keyed by file name)
pub fn uploads_dir() -> PathBuf {
    app_data_dir().join("uploads")
}

/// Runtime settings, resolved once at startup from environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Base URL of the Ollama instance used for answering.
    pub ollama_url: String,
    /// Model name passed to the chat endpoint.
    pub model: String,
    /// How many documents the relevance scorer returns per question.
    pub top_k: usize,
    /// Maximum number of question tasks running at once; further
    /// submissions queue as `pending`.
    pub max_concurrent_tasks: usize,
    /// Seconds a finished/failed task stays pollable before eviction.
    pub task_ttl_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8077".into(),
            ollama_url: "http://localhost:11434".into(),
            model: "llama3.1:8b".into(),
            top_k: 3,
            max_concurrent_tasks: 4,
            task_ttl_secs: 60 * 60,
        }
    }
}

impl Settings {
    /// Resolve settings from `CONSULTA_*` environment variables,
    /// falling back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_string("CONSULTA_BIND_ADDR", defaults.bind_addr),
            ollama_url: env_string("CONSULTA_OLLAMA_URL", defaults.ollama_url),
            model: env_string("CONSULTA_MODEL", defaults.model),
            top_k: env_parse("CONSULTA_TOP_K", defaults.top_k),
            max_concurrent_tasks: env_parse(
                "CONSULTA_MAX_TASKS",
                defaults.max_concurrent_tasks,
            ),
            task_ttl_secs: env_parse("CONSULTA_TASK_TTL_SECS", defaults.task_ttl_secs),
        }
    }
}

fn env_string(key: &str, default: String) -> String {
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => v,
        _ => default,
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uploads_dir_under_app_data() {
        let uploads = uploads_dir();
        let app = app_data_dir();
        assert!(uploads.starts_with(app));
        assert!(uploads.ends_with("uploads"));
    }

    #[test]
    fn app_name_is_consulta() {
        assert_eq!(APP_NAME, "Consulta");
    }

    #[test]
    fn default_settings_are_sane() {
        let s = Settings::default();
        assert!(s.top_k >= 1);
        assert!(s.max_concurrent_tasks >= 1);
        assert!(s.task_ttl_secs > 0);
    }

    #[test]
    fn env_parse_falls_back_on_garbage() {
        std::env::set_var("CONSULTA_TEST_PARSE", "not-a-number");
        let v: usize = env_parse("CONSULTA_TEST_PARSE", 7);
        assert_eq!(v, 7);
        std::env::remove_var("CONSULTA_TEST_PARSE");
    }
}
