use std::env;

use anyhow::{Context, anyhow};
use chrono::{FixedOffset, NaiveTime};

pub const DEFAULT_SMS_API_URL: &str = "https://api.brevo.com/v3/transactionalSMS/sms";

// Fan-out cap for a single run
const MAX_CONCURRENCY: usize = 32;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub reminder: ReminderConfig,
    pub sms: SmsConfig,
}

#[derive(Clone, Debug)]
pub struct ReminderConfig {
    /// Offset used to decide which calendar day is "tomorrow".
    pub utc_offset: FixedOffset,
    pub concurrency: usize,
    /// Local wall-clock time for the in-process daily run. `None` disables it.
    pub schedule_at: Option<NaiveTime>,
    /// SHA-256 hex of the bearer token the trigger endpoint requires.
    pub trigger_token_hash: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SmsConfig {
    pub api_url: String,
    pub api_key: String,
    pub sender: String,
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(5);

        let utc_offset = match env::var("REMINDER_UTC_OFFSET") {
            Ok(raw) => parse_utc_offset(&raw)?,
            Err(_) => FixedOffset::east_opt(0).ok_or_else(|| anyhow!("invalid zero offset"))?,
        };

        let concurrency = env::var("REMINDER_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_CONCURRENCY);

        let schedule_at = match env::var("REMINDER_SCHEDULE_AT") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_schedule_at(&raw)?),
            _ => None,
        };

        let trigger_token_hash = env::var("REMINDER_TRIGGER_TOKEN_HASH")
            .ok()
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty());

        let sms = SmsConfig {
            api_url: env::var("SMS_API_URL").unwrap_or_else(|_| DEFAULT_SMS_API_URL.to_string()),
            api_key: env::var("SMS_API_KEY").context("SMS_API_KEY is required")?,
            sender: env::var("SMS_SENDER").unwrap_or_else(|_| "Clinic".to_string()),
            timeout_secs: env::var("SMS_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(10),
        };

        Ok(Self {
            database_url,
            bind_addr,
            db_max_connections,
            reminder: ReminderConfig {
                utc_offset,
                concurrency,
                schedule_at,
                trigger_token_hash,
            },
            sms,
        })
    }
}

/// Parse `+HH:MM` / `-HH:MM` (or `Z`) into a fixed offset.
pub fn parse_utc_offset(raw: &str) -> anyhow::Result<FixedOffset> {
    let s = raw.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| anyhow!("invalid zero offset"));
    }

    let offset: FixedOffset = s
        .parse()
        .map_err(|e| anyhow!("REMINDER_UTC_OFFSET must look like +HH:MM, got {raw:?}: {e}"))?;

    // Real-world offsets stay within ±14:00
    if offset.local_minus_utc().abs() > 14 * 3600 {
        return Err(anyhow!("REMINDER_UTC_OFFSET out of range: {raw:?}"));
    }

    Ok(offset)
}

pub fn parse_schedule_at(raw: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .with_context(|| format!("REMINDER_SCHEDULE_AT must be HH:MM, got {raw:?}"))
}
