//! Loader for `pressbox.yaml` with environment overlays.
//!
//! Sources are merged in order (files, inline YAML, then `PRESSBOX__`-prefixed
//! environment variables), `${VAR}` placeholders are expanded over the merged
//! tree, and the result is deserialised and validated.
//!
//! Nested keys use `__` in the environment, e.g.
//! `PRESSBOX__RUN__ACCOUNT_DELAY_SECS=2`.
use config::{Config, ConfigError, Environment, File, FileFormat};
use pressbox_common::observability::LogFormat;
use pressbox_common::{PressboxError, Result as PressboxResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct PressboxConfig {
    pub topic: TopicConfig,
    pub platform: PlatformConfig,
    #[serde(default)]
    pub format: FormatConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicConfig {
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// App-only token used for reads.
    pub bearer_token: String,
    /// OAuth 2.0 user-context token used to publish. Optional for dry runs;
    /// an empty or unresolved `${VAR}` value loads as `None`.
    #[serde(default)]
    pub user_token: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default = "default_true")]
    pub exclude_replies: bool,
    #[serde(default = "default_true")]
    pub exclude_retweets: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormatConfig {
    #[serde(default = "default_max_len")]
    pub max_len: usize,
    #[serde(default = "default_link_weight")]
    pub link_weight: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            max_len: default_max_len(),
            link_weight: default_link_weight(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: String,
    #[serde(default = "default_account_delay_secs")]
    pub account_delay_secs: u64,
    #[serde(default)]
    pub publish_on_first_run: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: default_checkpoint_path(),
            account_delay_secs: default_account_delay_secs(),
            publish_on_first_run: false,
        }
    }
}

impl RunConfig {
    /// Checkpoint location with a leading `~` expanded.
    pub fn checkpoint_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.checkpoint_path).into_owned())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default = "default_true")]
    pub stderr: bool,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_log_filter(),
            stderr: true,
            dir: None,
        }
    }
}

/// One monitored journalist.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub username: String,
    #[serde(default = "default_emoji")]
    pub emoji: String,
    #[serde(default)]
    pub hashtags: String,
    /// Handle credited in the repost; defaults to `username`.
    #[serde(default)]
    pub attribution: Option<String>,
}

impl AccountConfig {
    pub fn attribution(&self) -> &str {
        self.attribution
            .as_deref()
            .unwrap_or(&self.username)
            .trim_start_matches('@')
    }
}

fn default_base_url() -> String {
    "https://api.twitter.com".into()
}
fn default_max_results() -> u32 {
    10
}
fn default_true() -> bool {
    true
}
fn default_max_len() -> usize {
    280
}
fn default_link_weight() -> usize {
    23
}
fn default_checkpoint_path() -> String {
    "last_seen.json".into()
}
fn default_account_delay_secs() -> u64 {
    5
}
fn default_log_filter() -> String {
    "info".into()
}
fn default_emoji() -> String {
    "📰".into()
}

fn unresolved(value: &str) -> bool {
    value.contains("${")
}

impl PressboxConfig {
    /// Structural checks that serde cannot express.
    pub fn validate(&self) -> PressboxResult<()> {
        if self.accounts.is_empty() {
            return Err(PressboxError::Config("no accounts configured".into()));
        }
        if self.topic.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(PressboxError::Config(
                "topic.keywords must contain at least one non-empty keyword".into(),
            ));
        }
        if self.format.max_len == 0 {
            return Err(PressboxError::Config("format.max_len must be positive".into()));
        }

        let token = self.platform.bearer_token.trim();
        if token.is_empty() || unresolved(token) {
            return Err(PressboxError::Config(
                "platform.bearer_token is empty or references an unset variable".into(),
            ));
        }

        let mut seen = HashSet::new();
        for account in &self.accounts {
            let name = account.username.trim().trim_start_matches('@');
            if name.is_empty() {
                return Err(PressboxError::Config("account with empty username".into()));
            }
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(PressboxError::Config(format!(
                    "account '{name}' is configured twice"
                )));
            }
        }
        Ok(())
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => break,
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder over the `config` crate wiring.
pub struct PressboxConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for PressboxConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PressboxConfigLoader {
    /// Start with no files; sources added later take precedence, and the
    /// `PRESSBOX__` environment overlay is applied last in [`load`](Self::load).
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, for deployments configured purely
    /// through the environment.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use pressbox_config::PressboxConfigLoader;
    ///
    /// let cfg = PressboxConfigLoader::new()
    ///     .with_yaml_str(
    ///         r##"
    /// topic:
    ///   keywords: ["arsenal"]
    /// platform:
    ///   bearer_token: "example"
    /// accounts:
    ///   - username: "David_Ornstein"
    ///     emoji: "🚨"
    ///     hashtags: "#Arsenal"
    /// "##,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.accounts.len(), 1);
    /// assert_eq!(cfg.accounts[0].attribution(), "David_Ornstein");
    /// assert_eq!(cfg.format.max_len, 280);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders, deserialise and validate.
    pub fn load(self) -> Result<PressboxConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("PRESSBOX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let mut typed: PressboxConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        // An unset publishing token only matters once something is published.
        typed.platform.user_token = typed
            .platform
            .user_token
            .take()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && !unresolved(t));
        typed
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MINIMAL: &str = r#"
topic:
  keywords: ["arsenal", "gunners"]
platform:
  bearer_token: "abc"
accounts:
  - username: "David_Ornstein"
"#;

    fn minimal() -> PressboxConfig {
        PressboxConfigLoader::new()
            .with_yaml_str(MINIMAL)
            .load()
            .expect("minimal config loads")
    }

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("PB_FOO", Some("bar"), || {
            let mut v = json!("prefix-${PB_FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("PB_CLUB", Some("Arsenal")), ("PB_CITY", Some("London"))], || {
            let mut v = json!(["#$PB_CLUB", { "loc": "${PB_CLUB}-${PB_CITY}" }, 42, true, null]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["#Arsenal", { "loc": "Arsenal-London" }, 42, true, null])
            );
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("PB_BAZ", Some("qux")),
                ("PB_BAR", Some("mid-${PB_BAZ}")),
                ("PB_FOO", Some("start-${PB_BAR}-end")),
            ],
            || {
                let mut v = json!("X=${PB_FOO}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("PB_A", Some("${PB_B}")), ("PB_B", Some("${PB_A}"))], || {
            let mut v = json!("x=${PB_A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${PB_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${PB_DOES_NOT_EXIST}"));
    }

    #[test]
    fn defaults_fill_optional_sections() {
        let cfg = minimal();
        assert_eq!(cfg.format.link_weight, 23);
        assert_eq!(cfg.run.account_delay_secs, 5);
        assert_eq!(cfg.run.checkpoint_path, "last_seen.json");
        assert!(!cfg.run.publish_on_first_run);
        assert!(cfg.platform.exclude_replies && cfg.platform.exclude_retweets);
        assert_eq!(cfg.platform.max_results, 10);
        assert_eq!(cfg.logging.format, LogFormat::Text);
        assert_eq!(cfg.accounts[0].emoji, "📰");
        assert!(cfg.platform.user_token.is_none());
    }

    #[test]
    fn attribution_falls_back_to_username_without_at() {
        let mut account = minimal().accounts.remove(0);
        assert_eq!(account.attribution(), "David_Ornstein");
        account.attribution = Some("@ornstein".into());
        assert_eq!(account.attribution(), "ornstein");
    }

    #[test]
    fn validate_rejects_empty_keywords() {
        let mut cfg = minimal();
        cfg.topic.keywords = vec!["  ".into()];
        assert!(matches!(cfg.validate(), Err(PressboxError::Config(_))));
    }

    #[test]
    fn validate_rejects_duplicate_accounts() {
        let mut cfg = minimal();
        let mut dup = cfg.accounts[0].clone();
        dup.username = "@david_ornstein".into();
        cfg.accounts.push(dup);
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("configured twice"), "{err}");
    }

    #[test]
    fn validate_rejects_unresolved_tokens() {
        let mut cfg = minimal();
        cfg.platform.bearer_token = "${PB_NOT_SET}".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unresolved_user_token_loads_as_none() {
        temp_env::with_var_unset("PB_USER_TOKEN_NOT_SET", || {
            let cfg = PressboxConfigLoader::new()
                .with_yaml_str(MINIMAL)
                .with_yaml_str("platform:\n  user_token: \"${PB_USER_TOKEN_NOT_SET}\"\n")
                .load()
                .expect("unset user token is not a config error");
            assert!(cfg.platform.user_token.is_none());
        });
    }

    #[test]
    fn validate_rejects_missing_accounts() {
        let mut cfg = minimal();
        cfg.accounts.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn tilde_in_checkpoint_path_is_expanded() {
        temp_env::with_var("HOME", Some("/home/relay"), || {
            let run = RunConfig {
                checkpoint_path: "~/state/last_seen.json".into(),
                ..RunConfig::default()
            };
            assert_eq!(
                run.checkpoint_path(),
                PathBuf::from("/home/relay/state/last_seen.json")
            );
        });
    }
}
