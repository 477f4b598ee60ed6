use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use tracing::{debug, trace, warn};

use crate::util;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub target: TargetConfig,
    pub probe: ProbeConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct TargetConfig {
    /// Date being watched, echoed into alerts as-is
    pub date: String,
    /// Link included in availability alerts
    pub booking_url: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProbeConfig {
    pub url: String,
    /// JSON pointer to the slot count inside the response body
    #[serde(default = "default_slots_pointer")]
    pub slots_pointer: String,
    #[serde(default = "default_probe_method")]
    pub method: String,
    /// Request timeout in seconds
    #[serde(default = "default_probe_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MonitorConfig {
    /// Seconds between two probes
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// Consecutive probe failures after which the monitor stops
    #[serde(default = "default_max_errors")]
    pub max_errors: u32,
    /// Consecutive undetermined readings that raise a critical alert
    #[serde(default = "default_critical_error_threshold")]
    pub critical_error_threshold: u32,
    /// Seconds without a real reading that raise a critical alert
    #[serde(default = "default_critical_error_time_threshold")]
    pub critical_error_time_threshold: u64,
    /// Minimum seconds between two critical alerts
    #[serde(default = "default_critical_alert_cooldown")]
    pub critical_alert_cooldown: u64,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Upper bound in seconds for a single channel send
    #[serde(default = "default_send_timeout")]
    pub send_timeout: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            max_errors: default_max_errors(),
            critical_error_threshold: default_critical_error_threshold(),
            critical_error_time_threshold: default_critical_error_time_threshold(),
            critical_alert_cooldown: default_critical_alert_cooldown(),
            retention_days: default_retention_days(),
            send_timeout: default_send_timeout(),
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout)
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_stats_path")]
    pub path: PathBuf,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            path: default_stats_path(),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ChannelsConfig {
    pub telegram: Option<TelegramConfig>,
    pub email: Option<EmailConfig>,
    pub whatsapp: Option<TwilioConfig>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default)]
    pub chat_ids: Vec<String>,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct TwilioConfig {
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    pub from: String,
    pub to: String,
    /// Route through WhatsApp instead of plain SMS
    #[serde(default = "default_true")]
    pub whatsapp: bool,
    #[serde(default = "default_twilio_api")]
    pub api_base: String,
}

fn default_slots_pointer() -> String {
    String::from("/available_slots")
}

fn default_probe_method() -> String {
    String::from("http-json")
}

fn default_probe_timeout() -> u64 {
    20
}

fn default_interval() -> u64 {
    10
}

fn default_max_errors() -> u32 {
    5
}

fn default_critical_error_threshold() -> u32 {
    600
}

fn default_critical_error_time_threshold() -> u64 {
    600
}

fn default_critical_alert_cooldown() -> u64 {
    300
}

fn default_retention_days() -> u32 {
    7
}

fn default_send_timeout() -> u64 {
    15
}

fn default_stats_path() -> PathBuf {
    PathBuf::from("./bot_stats.json")
}

fn default_telegram_api() -> String {
    String::from("https://api.telegram.org")
}

fn default_smtp_host() -> String {
    String::from("smtp.gmail.com")
}

fn default_smtp_port() -> u16 {
    465
}

fn default_twilio_api() -> String {
    String::from("https://api.twilio.com")
}

fn default_true() -> bool {
    true
}

/// Credentials and recipients read from the environment.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub telegram_token: Option<String>,
    pub telegram_chat_ids: Option<Vec<String>>,
    pub smtp_credentials: Option<(String, String)>,
    pub email_recipient: Option<String>,
    pub twilio_credentials: Option<(String, String)>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            telegram_token: util::get_telegram_token(),
            telegram_chat_ids: util::get_telegram_chat_ids(),
            smtp_credentials: util::get_smtp_credentials(),
            email_recipient: util::get_email_recipient(),
            twilio_credentials: util::get_twilio_credentials(),
        }
    }
}

impl Config {
    /// Overrides credentials and recipients with values from the environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(EnvOverrides::from_env());
    }

    /// Existing channel sections take the overrides. Telegram and email
    /// sections are created when the environment alone completes them.
    pub fn apply_overrides(&mut self, env: EnvOverrides) {
        match &mut self.channels.telegram {
            Some(telegram) => {
                if let Some(token) = env.telegram_token {
                    telegram.bot_token = Some(token);
                }
                if let Some(chat_ids) = env.telegram_chat_ids {
                    telegram.chat_ids = chat_ids;
                }
            }
            None => match (env.telegram_token, env.telegram_chat_ids) {
                (Some(token), Some(chat_ids)) => {
                    debug!("telegram channel configured from the environment");
                    self.channels.telegram = Some(TelegramConfig {
                        bot_token: Some(token),
                        chat_ids,
                        api_base: default_telegram_api(),
                    });
                }
                (None, None) => {}
                _ => warn!(
                    "telegram needs both a bot token and chat ids in the environment, ignoring"
                ),
            },
        }

        match &mut self.channels.email {
            Some(email) => {
                if let Some((username, password)) = env.smtp_credentials {
                    email.username = Some(username);
                    email.password = Some(password);
                }
                if let Some(to) = env.email_recipient {
                    email.to = Some(to);
                }
            }
            None => match (env.smtp_credentials, env.email_recipient) {
                (Some((username, password)), Some(to)) => {
                    debug!("email channel configured from the environment");
                    self.channels.email = Some(EmailConfig {
                        smtp_host: default_smtp_host(),
                        smtp_port: default_smtp_port(),
                        from: username.clone(),
                        username: Some(username),
                        password: Some(password),
                        to: Some(to),
                    });
                }
                (None, None) => {}
                _ => warn!(
                    "email needs smtp credentials and a recipient in the environment, ignoring"
                ),
            },
        }

        if let Some((sid, token)) = env.twilio_credentials {
            match &mut self.channels.whatsapp {
                Some(twilio) => {
                    twilio.account_sid = Some(sid);
                    twilio.auth_token = Some(token);
                }
                None => warn!(
                    "twilio credentials set but no whatsapp section configured, ignoring"
                ),
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.probe.url.trim().is_empty() {
            bail!("probe.url must not be empty");
        }
        if self.monitor.interval == 0 {
            bail!("monitor.interval must be at least one second");
        }
        if self.monitor.max_errors == 0 {
            bail!("monitor.max_errors must be at least 1");
        }
        if self.monitor.retention_days == 0 {
            bail!("monitor.retention_days must be at least 1");
        }
        if self.monitor.send_timeout == 0 {
            bail!("monitor.send_timeout must be at least one second");
        }
        Ok(())
    }
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    let mut config = parse_config(&file_content)?;
    config.apply_env();
    config.validate()?;
    debug!("loaded config from {path}");
    trace!("config: {config:?}");
    Ok(config)
}
