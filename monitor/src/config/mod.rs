//! Configuration management

use anyhow::{Context, Result};
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub monitor: MonitorConfig,
    pub schedule: ScheduleConfig,
    pub telegram: Option<TelegramConfig>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,
    pub report_log_path: String,
    /// Heartbeat age on startup above which the downtime is recorded
    pub heartbeat_gap_threshold_s: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub hosts: Vec<String>,
    pub ping_interval_ms: u64,
    pub ping_timeout_ms: u64,
    pub high_ping_threshold_ms: f64,
    pub probe_method: ProbeMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    /// ICMP sockets, falling back to the ping command
    #[default]
    Auto,
    Icmp,
    Command,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub daily_report_times: Vec<String>,
    pub reset_time: String,
    pub weekly_report_time: String,
    pub weekly_report_day: Weekday,
    pub monthly_report_time: String,
    pub monthly_report_day: u32,
    pub poll_interval_s: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Log file path; empty disables file logging
    pub file: String,
}

/// Parsed wall-clock schedule used by the report scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub daily_report_times: Vec<NaiveTime>,
    pub reset_time: NaiveTime,
    pub weekly_report_time: NaiveTime,
    pub weekly_report_day: Weekday,
    pub monthly_report_time: NaiveTime,
    pub monthly_report_day: u32,
    pub poll_interval: Duration,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "internet_monitor.db".to_string(),
            report_log_path: "daily_stats.log".to_string(),
            heartbeat_gap_threshold_s: 180,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            hosts: stats::DEFAULT_HOSTS.iter().map(|h| h.to_string()).collect(),
            ping_interval_ms: 1000,
            ping_timeout_ms: 1000,
            high_ping_threshold_ms: stats::DEFAULT_HIGH_PING_THRESHOLD_MS,
            probe_method: ProbeMethod::Auto,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daily_report_times: vec!["07:00".to_string(), "18:00".to_string()],
            reset_time: "00:00".to_string(),
            weekly_report_time: "09:00".to_string(),
            weekly_report_day: Weekday::Mon,
            monthly_report_time: "09:00".to_string(),
            monthly_report_day: 1,
            poll_interval_s: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: "logs/netpulse.log".to_string(),
        }
    }
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

impl Config {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .with_context(|| "Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.monitor.hosts.is_empty() {
            anyhow::bail!("monitor.hosts must list at least one host");
        }
        if self.monitor.ping_interval_ms == 0 {
            anyhow::bail!("monitor.ping_interval_ms must be greater than zero");
        }
        if self.monitor.ping_timeout_ms == 0 {
            anyhow::bail!("monitor.ping_timeout_ms must be greater than zero");
        }
        if self.monitor.high_ping_threshold_ms <= 0.0 {
            anyhow::bail!("monitor.high_ping_threshold_ms must be positive");
        }
        // the heartbeat is only refreshed once per scheduler poll
        if self.general.heartbeat_gap_threshold_s <= self.schedule.poll_interval_s {
            anyhow::bail!(
                "general.heartbeat_gap_threshold_s ({}) must be greater than schedule.poll_interval_s ({})",
                self.general.heartbeat_gap_threshold_s,
                self.schedule.poll_interval_s
            );
        }
        if let Some(telegram) = &self.telegram {
            if telegram.bot_token.is_empty() || telegram.chat_id.is_empty() {
                anyhow::bail!("telegram.bot_token and telegram.chat_id must both be set");
            }
        }

        self.schedule().map(|_| ())
    }

    pub fn schedule(&self) -> Result<Schedule> {
        let s = &self.schedule;

        if !(1..=28).contains(&s.monthly_report_day) {
            anyhow::bail!(
                "schedule.monthly_report_day must be between 1 and 28, got {}",
                s.monthly_report_day
            );
        }
        if s.poll_interval_s == 0 {
            anyhow::bail!("schedule.poll_interval_s must be greater than zero");
        }

        let daily_report_times = s
            .daily_report_times
            .iter()
            .map(|t| parse_clock_time(t))
            .collect::<Result<Vec<_>>>()?;

        Ok(Schedule {
            daily_report_times,
            reset_time: parse_clock_time(&s.reset_time)?,
            weekly_report_time: parse_clock_time(&s.weekly_report_time)?,
            weekly_report_day: s.weekly_report_day,
            monthly_report_time: parse_clock_time(&s.monthly_report_time)?,
            monthly_report_day: s.monthly_report_day,
            poll_interval: Duration::from_secs(s.poll_interval_s),
        })
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.monitor.ping_interval_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.monitor.ping_timeout_ms)
    }

    pub fn heartbeat_gap_threshold(&self) -> Duration {
        Duration::from_secs(self.general.heartbeat_gap_threshold_s)
    }
}

/// Parse `HH:MM` (24h clock)
pub fn parse_clock_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .with_context(|| format!("Invalid time {:?}, expected HH:MM", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.monitor.hosts, vec!["1.1.1.1", "8.8.8.8"]);
        assert_eq!(config.ping_interval(), Duration::from_secs(1));
        assert_eq!(config.ping_timeout(), Duration::from_millis(1000));
        assert_eq!(config.monitor.high_ping_threshold_ms, 150.0);
        assert!(config.telegram.is_none());

        let schedule = config.schedule().unwrap();
        assert_eq!(
            schedule.daily_report_times,
            vec![
                NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            ]
        );
        assert_eq!(schedule.reset_time, NaiveTime::from_hms_opt(0, 0, 0).unwrap());
        assert_eq!(schedule.weekly_report_day, Weekday::Mon);
        assert_eq!(schedule.monthly_report_day, 1);
        assert_eq!(schedule.poll_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.general.database_path, "internet_monitor.db");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::parse(
            r#"
            [monitor]
            hosts = ["9.9.9.9", "1.0.0.1", "8.8.4.4"]
            high_ping_threshold_ms = 80.0
            probe_method = "command"

            [schedule]
            weekly_report_day = "Fri"

            [telegram]
            bot_token = "123:abc"
            chat_id = "42"
            "#,
        )
        .unwrap();

        assert_eq!(config.monitor.hosts.len(), 3);
        assert_eq!(config.monitor.high_ping_threshold_ms, 80.0);
        assert_eq!(config.monitor.probe_method, ProbeMethod::Command);
        assert_eq!(config.monitor.ping_timeout_ms, 1000);
        assert_eq!(config.schedule().unwrap().weekly_report_day, Weekday::Fri);

        let telegram = config.telegram.unwrap();
        assert_eq!(telegram.chat_id, "42");
        assert_eq!(telegram.api_url, "https://api.telegram.org");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netpulse.toml");
        std::fs::write(&path, "[general]\ndatabase_path = \"/tmp/x.db\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.general.database_path, "/tmp/x.db");
        assert_eq!(config.general.report_log_path, "daily_stats.log");
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(Config::parse("[schedule]\nreset_time = \"24:61\"\n").is_err());
        assert!(Config::parse("[schedule]\ndaily_report_times = [\"7am\"]\n").is_err());
        assert!(Config::parse("[schedule]\nmonthly_report_day = 31\n").is_err());
        assert!(Config::parse("[monitor]\nhosts = []\n").is_err());
        assert!(Config::parse("[monitor]\nping_timeout_ms = 0\n").is_err());
        assert!(Config::parse("[telegram]\nbot_token = \"\"\nchat_id = \"1\"\n").is_err());
        assert!(Config::parse("this is not toml").is_err());
        assert!(Config::parse("[schedule]\npoll_interval_s = 300\n").is_err());
        assert!(Config::parse("[general]\nheartbeat_gap_threshold_s = 60\n").is_err());
    }

    #[test]
    fn test_heartbeat_threshold_above_poll_interval() {
        let config = Config::parse(
            "[general]\nheartbeat_gap_threshold_s = 600\n[schedule]\npoll_interval_s = 300\n",
        )
        .unwrap();
        assert_eq!(config.heartbeat_gap_threshold(), Duration::from_secs(600));
    }

    #[test]
    fn test_parse_clock_time() {
        assert_eq!(
            parse_clock_time(" 18:30 ").unwrap(),
            NaiveTime::from_hms_opt(18, 30, 0).unwrap()
        );
        assert!(parse_clock_time("18").is_err());
    }
}
