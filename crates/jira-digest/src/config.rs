use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
use digest_core::render::DEFAULT_TITLE;
use digest_core::{parse_timezone, CronSchedule, MessageType, PipelineOptions, RetryPolicy};
use directories::{BaseDirs, ProjectDirs};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use jira_backend::fields::DEFAULT_OWNER_PATH;
use jira_backend::{scope_to_projects, AuthMethod, Credentials, FieldPaths};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

const APP_NAME: &str = "jira-digest";
const LOCAL_CONFIG_FILE: &str = "jira-digest.toml";
const MASK: &str = "********";

/// Flat variable names from existing deployments, mapped onto config keys
const LEGACY_ENV: &[(&str, &str)] = &[
    ("JIRA_BASE_URL", "jira.base_url"),
    ("JIRA_AUTH_METHOD", "jira.auth_method"),
    ("JIRA_EMAIL", "jira.email"),
    ("JIRA_API_TOKEN", "jira.api_token"),
    ("JIRA_USERNAME", "jira.username"),
    ("JIRA_PASSWORD", "jira.password"),
    ("JIRA_TOKEN", "jira.token"),
    ("JIRA_API_VERSION", "jira.api_version"),
    ("REPORT_JQL", "jira.jql"),
    ("REPORT_PROJECT_KEYS", "jira.project_keys"),
    ("MAX_RESULTS", "jira.max_results"),
    ("QA_FIELD_PATH", "jira.owner_field"),
    ("ENV_FIELD_PATH", "jira.environment_field"),
    ("LARK_WEBHOOK_URL", "lark.webhook_url"),
    ("REPORT_TOP_N", "report.top_n"),
    ("REPORT_TITLE", "report.title"),
    ("MESSAGE_TYPE", "report.message_type"),
    ("ENABLE_LINKS", "report.enable_links"),
    ("REPORT_CRON", "cron"),
    ("TIMEZONE", "timezone"),
    ("LOG_LEVEL", "log_level"),
    ("LOG_FORMAT", "log_format"),
    ("LOG_FILE", "log_file"),
    ("RUN_MODE", "run_mode"),
];

/// How the process is driven when no subcommand is given
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Stay up and run on every cron trigger
    #[default]
    #[serde(alias = "schedule", alias = "cron")]
    Loop,
    /// Run once and exit
    #[serde(alias = "oneshot", alias = "run")]
    Once,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Loop => write!(f, "loop"),
            RunMode::Once => write!(f, "once"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Main configuration structure, as merged from defaults, files and environment
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub run_mode: RunMode,
    /// Crontab expression (5 fields) or the 6/7-field form with seconds
    pub cron: String,
    /// IANA timezone used for triggers and the report date
    pub timezone: String,
    pub log_level: String,
    pub log_format: LogFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Wall-clock ceiling for one run, fetch and delivery together
    pub run_timeout_secs: u64,
    pub jira: JiraConfig,
    pub lark: LarkConfig,
    pub report: ReportConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JiraConfig {
    #[serde(deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub auth_method: AuthMethod,
    #[serde(deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Personal access token for bearer auth
    #[serde(deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// REST API version; defaults to 3 for token auth and 2 otherwise
    #[serde(deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(deserialize_with = "de::string")]
    pub jql: String,
    /// Restrict the filter to these projects (list or comma-separated string)
    #[serde(deserialize_with = "de::string_list")]
    pub project_keys: Vec<String>,
    pub max_results: usize,
    pub page_size: usize,
    pub request_timeout_secs: u64,
    /// Dotted path of the field tallied as the owner, e.g. "customfield_10020.displayName"
    #[serde(deserialize_with = "de::string")]
    pub owner_field: String,
    /// Dotted path of a field shown on every issue line
    #[serde(deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub environment_field: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LarkConfig {
    #[serde(deserialize_with = "de::opt_string", skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    #[serde(deserialize_with = "de::string")]
    pub title: String,
    /// Issues shown per project before truncation
    pub top_n: usize,
    pub message_type: MessageType,
    /// Link issue keys to the tracker (post messages)
    #[serde(deserialize_with = "de::flag")]
    pub enable_links: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per call, including the first
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            run_mode: RunMode::Loop,
            cron: "0 9 * * *".to_string(),
            timezone: "Asia/Shanghai".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            log_file: None,
            run_timeout_secs: 300,
            jira: JiraConfig::default(),
            lark: LarkConfig::default(),
            report: ReportConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            auth_method: AuthMethod::Token,
            email: None,
            api_token: None,
            username: None,
            password: None,
            token: None,
            api_version: None,
            jql: "updated >= -1d ORDER BY updated DESC".to_string(),
            project_keys: Vec::new(),
            max_results: 100,
            page_size: 50,
            request_timeout_secs: 20,
            owner_field: DEFAULT_OWNER_PATH.to_string(),
            environment_field: None,
        }
    }
}

impl Default for LarkConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            request_timeout_secs: 20,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            top_n: 10,
            message_type: MessageType::Post,
            enable_links: true,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            multiplier: policy.multiplier,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

/// Jira connection settings after validation
#[derive(Debug, Clone)]
pub struct JiraSettings {
    pub base_url: String,
    pub credentials: Credentials,
    pub api_version: String,
    pub page_size: usize,
    pub request_timeout: Duration,
    pub fields: FieldPaths,
}

/// Everything a scheduled or one-shot run needs, validated once at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub schedule: CronSchedule,
    pub timezone: Tz,
    pub jira: JiraSettings,
    pub webhook_url: String,
    pub lark_request_timeout: Duration,
    pub retry: RetryPolicy,
    pub pipeline: PipelineOptions,
}

impl Config {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(anyhow!("Config file not found: {}", path.display()));
            }
        }

        for path in config_paths(config_path) {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        let legacy_names: Vec<&str> = LEGACY_ENV.iter().map(|(name, _)| *name).collect();
        figment = figment
            .merge(Env::raw().only(&legacy_names).map(|key| {
                LEGACY_ENV
                    .iter()
                    .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
                    .map(|(_, path)| (*path).into())
                    .unwrap_or_else(|| key.into())
            }))
            // DIGEST_RETRY__MAX_ATTEMPTS -> retry.max_attempts
            .merge(Env::prefixed("DIGEST_").split("__"));

        figment
            .extract()
            .map_err(|e| anyhow!("Failed to load config: {}", e))
    }

    /// Validate everything and build the settings for a delivering run
    pub fn resolve(&self) -> Result<Settings> {
        let pipeline = self.pipeline_options()?;
        Ok(Settings {
            schedule: self.schedule()?,
            timezone: pipeline.timezone,
            jira: self.jira_settings()?,
            webhook_url: self.webhook_url()?,
            lark_request_timeout: Duration::from_secs(self.lark.request_timeout_secs.max(1)),
            retry: self.retry_policy()?,
            pipeline,
        })
    }

    pub fn timezone(&self) -> Result<Tz> {
        parse_timezone(&self.timezone)
            .map_err(|e| anyhow!("{}. Set timezone in the config file or the TIMEZONE env var", e))
    }

    pub fn schedule(&self) -> Result<CronSchedule> {
        self.cron
            .parse::<CronSchedule>()
            .map_err(|e| anyhow!("{}. Set cron in the config file or the REPORT_CRON env var", e))
    }

    /// Report settings; needs no credentials
    pub fn pipeline_options(&self) -> Result<PipelineOptions> {
        if self.jira.jql.trim().is_empty() {
            bail!("JQL filter is empty. Set jira.jql in the config file or the REPORT_JQL env var");
        }
        if self.jira.max_results == 0 {
            bail!("jira.max_results (MAX_RESULTS) must be at least 1");
        }
        if self.report.top_n == 0 {
            bail!("report.top_n (REPORT_TOP_N) must be at least 1");
        }

        Ok(PipelineOptions {
            jql: scope_to_projects(self.jira.jql.trim(), &self.jira.project_keys),
            max_results: self.jira.max_results,
            top_n: self.report.top_n,
            message_type: self.report.message_type,
            enable_links: self.report.enable_links,
            title: Some(self.report.title.trim())
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_TITLE)
                .to_string(),
            timezone: self.timezone()?,
            run_timeout: Duration::from_secs(self.run_timeout_secs.max(1)),
        })
    }

    pub fn jira_settings(&self) -> Result<JiraSettings> {
        let jira = &self.jira;
        let base_url = required(&jira.base_url, "Jira URL", "jira.base_url", "JIRA_BASE_URL")?;
        check_http_url(&base_url, "jira.base_url")?;

        if !(1..=100).contains(&jira.page_size) {
            bail!("jira.page_size must be between 1 and 100, got {}", jira.page_size);
        }
        let owner_field = jira.owner_field.trim();
        if owner_field.is_empty() {
            bail!("jira.owner_field (QA_FIELD_PATH) is empty. Use e.g. \"{}\"", DEFAULT_OWNER_PATH);
        }

        let credentials = match jira.auth_method {
            AuthMethod::Token => {
                ignored(
                    &[
                        (&jira.username, "jira.username"),
                        (&jira.password, "jira.password"),
                        (&jira.token, "jira.token"),
                    ],
                    jira.auth_method,
                );
                Credentials::Token {
                    email: required(&jira.email, "Jira email", "jira.email", "JIRA_EMAIL")?,
                    api_token: required(
                        &jira.api_token,
                        "Jira API token",
                        "jira.api_token",
                        "JIRA_API_TOKEN",
                    )?,
                }
            }
            AuthMethod::Basic => {
                ignored(
                    &[
                        (&jira.email, "jira.email"),
                        (&jira.api_token, "jira.api_token"),
                        (&jira.token, "jira.token"),
                    ],
                    jira.auth_method,
                );
                Credentials::Basic {
                    username: required(
                        &jira.username,
                        "Jira username",
                        "jira.username",
                        "JIRA_USERNAME",
                    )?,
                    password: required(
                        &jira.password,
                        "Jira password",
                        "jira.password",
                        "JIRA_PASSWORD",
                    )?,
                }
            }
            AuthMethod::Bearer => {
                ignored(
                    &[
                        (&jira.email, "jira.email"),
                        (&jira.api_token, "jira.api_token"),
                        (&jira.username, "jira.username"),
                        (&jira.password, "jira.password"),
                    ],
                    jira.auth_method,
                );
                Credentials::Bearer {
                    token: required(
                        &jira.token,
                        "Jira personal access token",
                        "jira.token",
                        "JIRA_TOKEN",
                    )?,
                }
            }
        };

        let api_version = jira
            .api_version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| jira.auth_method.default_api_version())
            .to_string();

        Ok(JiraSettings {
            base_url,
            credentials,
            api_version,
            page_size: jira.page_size,
            request_timeout: Duration::from_secs(jira.request_timeout_secs.max(1)),
            fields: FieldPaths {
                owner: owner_field.to_string(),
                environment: jira.environment_field.as_deref().map(|f| f.trim().to_string()),
            },
        })
    }

    pub fn webhook_url(&self) -> Result<String> {
        let url = required(
            &self.lark.webhook_url,
            "Lark webhook URL",
            "lark.webhook_url",
            "LARK_WEBHOOK_URL",
        )?;
        check_http_url(&url, "lark.webhook_url")?;
        Ok(url)
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        let retry = &self.retry;
        if retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if !retry.multiplier.is_finite() || retry.multiplier < 1.0 {
            bail!("retry.multiplier must be a number >= 1.0, got {}", retry.multiplier);
        }
        Ok(RetryPolicy {
            max_attempts: retry.max_attempts,
            base_delay: Duration::from_millis(retry.base_delay_ms),
            multiplier: retry.multiplier,
            max_delay: Duration::from_millis(retry.max_delay_ms.max(retry.base_delay_ms)),
        })
    }

    /// Copy with credentials and the webhook token hidden, for display
    pub fn masked(&self) -> Config {
        let mut config = self.clone();
        for secret in [
            &mut config.jira.api_token,
            &mut config.jira.password,
            &mut config.jira.token,
        ] {
            if secret.is_some() {
                *secret = Some(MASK.to_string());
            }
        }
        config.lark.webhook_url = config.lark.webhook_url.as_deref().map(mask_webhook);
        config
    }
}

fn required(value: &Option<String>, what: &str, key: &str, env: &str) -> Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            anyhow!(
                "{} not configured. Set {} in the config file or the {} env var",
                what,
                key,
                env
            )
        })
}

fn ignored(values: &[(&Option<String>, &str)], method: AuthMethod) {
    for (value, key) in values {
        if value.is_some() {
            warn!(option = *key, auth_method = %method, "Ignoring credential not used by this auth method");
        }
    }
}

fn check_http_url(url: &str, key: &str) -> Result<()> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(anyhow!("{} must be an http(s) URL, got '{}'", key, url))
    }
}

/// Keep the host and path, hide the hook token in the last segment
fn mask_webhook(url: &str) -> String {
    match url.rsplit_once('/') {
        Some((prefix, token)) if !token.is_empty() && prefix.contains("://") => {
            format!("{}/{}", prefix, MASK)
        }
        _ => MASK.to_string(),
    }
}

/// Config files consulted, lowest precedence first
pub fn config_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(path) = explicit {
        paths.push(path.to_path_buf());
        return paths;
    }

    if let Some(path) = get_project_config_path() {
        push_unique(&mut paths, path);
    }
    if let Some(path) = get_xdg_config_path() {
        push_unique(&mut paths, path);
    }
    if let Some(path) = get_local_config_path() {
        push_unique(&mut paths, path);
    }

    paths
}

fn push_unique(paths: &mut Vec<PathBuf>, path: PathBuf) {
    if !paths.contains(&path) {
        paths.push(path);
    }
}

fn get_project_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|d| d.config_dir().join("config.toml"))
}

fn get_xdg_config_path() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(dir).join(APP_NAME).join("config.toml"));
    }

    BaseDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(".config")
            .join(APP_NAME)
            .join("config.toml")
    })
}

fn get_local_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|dir| dir.join(LOCAL_CONFIG_FILE))
}

/// Render the merged configuration as TOML
pub fn to_toml(config: &Config) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize config")
}

/// Lenient deserializers for values that arrive through the environment,
/// where figment parses `123456` as a number and `1` as an integer.
mod de {
    use serde::de::{self, Deserializer, SeqAccess, Visitor};
    use std::fmt;

    struct Scalar;

    impl<'de> Visitor<'de> for Scalar {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_char<E: de::Error>(self, v: char) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(Scalar)
        }
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(d.deserialize_any(Scalar)?.filter(|v| !v.trim().is_empty()))
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(d.deserialize_any(Scalar)?.unwrap_or_default())
    }

    struct Flag;

    impl<'de> Visitor<'de> for Flag {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a boolean (true/false, 1/0, yes/no, on/off)")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<bool, E> {
            match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "y" | "on" => Ok(true),
                "0" | "false" | "no" | "n" | "off" | "" => Ok(false),
                other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
            }
        }
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        d.deserialize_any(Flag)
    }

    struct StringList;

    impl<'de> Visitor<'de> for StringList {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list of strings or a comma-separated string")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut items = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                let item = item.trim();
                if !item.is_empty() {
                    items.push(item.to_string());
                }
            }
            Ok(items)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }

    pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        d.deserialize_any(StringList)
    }
}
