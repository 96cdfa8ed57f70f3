use std::env;

use crate::errors::{Result, ServiceError};
use crate::types::UserId;

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

impl RedisConfig {
    /// `None` when `REDIS_URL` is not set; the bot then keeps state in memory.
    pub fn from_env() -> Option<Self> {
        env::var("REDIS_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(|url| Self { url })
    }
}

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub sheet_id: String,
    pub sheet_name: String,
    pub access_token: Option<String>,
}

impl SheetsConfig {
    pub fn spreadsheet_url(&self) -> String {
        format!("https://docs.google.com/spreadsheets/d/{}/edit", self.sheet_id)
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub webhook_port: u16,
    pub metrics_port: u16,
}

/// Everything the bot needs, read once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub sheets: SheetsConfig,
    pub admin_ids: Vec<UserId>,
    pub timezone: String,
    pub webhook_secret: Option<String>,
    pub service: ServiceConfig,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| env::var(key).ok())
    }

    pub fn from_source<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("TELEGRAM_BOT_TOKEN")
            .or_else(|| get("TELOXIDE_TOKEN"))
            .ok_or_else(|| ServiceError::Configuration("TELEGRAM_BOT_TOKEN not set".to_string()))?;

        let sheet_id = get("GOOGLE_SHEET_ID")
            .ok_or_else(|| ServiceError::Configuration("GOOGLE_SHEET_ID not set".to_string()))?;

        Ok(Self {
            bot_token,
            sheets: SheetsConfig {
                sheet_id,
                sheet_name: get("GOOGLE_SHEET_NAME").unwrap_or_else(|| "Sheet1".to_string()),
                access_token: get("GOOGLE_SHEETS_ACCESS_TOKEN"),
            },
            admin_ids: parse_admin_ids(&get("ADMIN_IDS").unwrap_or_default())?,
            timezone: get("TIMEZONE").unwrap_or_else(|| "Europe/Moscow".to_string()),
            webhook_secret: get("TELEGRAM_WEBHOOK_SECRET"),
            service: ServiceConfig {
                webhook_port: parse_port(get("WEBHOOK_PORT"), "WEBHOOK_PORT", 8080)?,
                metrics_port: parse_port(get("METRICS_PORT"), "METRICS_PORT", 9091)?,
            },
        })
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

fn parse_port(value: Option<String>, name: &str, default: u16) -> Result<u16> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ServiceError::Configuration(format!("Invalid {}: {}", name, e))),
        None => Ok(default),
    }
}

fn parse_admin_ids(raw: &str) -> Result<Vec<UserId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map(UserId)
                .map_err(|e| ServiceError::Configuration(format!("Invalid ADMIN_IDS entry {:?}: {}", part, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let cfg = BotConfig::from_source(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("GOOGLE_SHEET_ID", "sheet-1"),
        ]))
        .unwrap();

        assert_eq!(cfg.sheets.sheet_name, "Sheet1");
        assert_eq!(cfg.timezone, "Europe/Moscow");
        assert_eq!(cfg.service.webhook_port, 8080);
        assert_eq!(cfg.service.metrics_port, 9091);
        assert!(cfg.sheets.access_token.is_none());
        assert!(cfg.admin_ids.is_empty());
    }

    #[test]
    fn test_teloxide_token_fallback() {
        let cfg = BotConfig::from_source(lookup(&[
            ("TELOXIDE_TOKEN", "999:xyz"),
            ("GOOGLE_SHEET_ID", "sheet-1"),
        ]))
        .unwrap();
        assert_eq!(cfg.bot_token, "999:xyz");
    }

    #[test]
    fn test_missing_token_is_configuration_error() {
        let err = BotConfig::from_source(lookup(&[("GOOGLE_SHEET_ID", "sheet-1")])).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_admin_ids_parsed() {
        let cfg = BotConfig::from_source(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("GOOGLE_SHEET_ID", "sheet-1"),
            ("ADMIN_IDS", " 42, 7 ,,"),
        ]))
        .unwrap();

        assert_eq!(cfg.admin_ids, vec![UserId(42), UserId(7)]);
        assert!(cfg.is_admin(UserId(7)));
        assert!(!cfg.is_admin(UserId(8)));
    }

    #[test]
    fn test_bad_admin_id_rejected() {
        let result = BotConfig::from_source(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("GOOGLE_SHEET_ID", "sheet-1"),
            ("ADMIN_IDS", "42,bob"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_spreadsheet_url() {
        let sheets = SheetsConfig {
            sheet_id: "abc".to_string(),
            sheet_name: "Trips".to_string(),
            access_token: None,
        };
        assert_eq!(sheets.spreadsheet_url(), "https://docs.google.com/spreadsheets/d/abc/edit");
    }
}
