use chrono::{DateTime, FixedOffset, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use shared::errors::{Result, ServiceError};

const FULL_FORMAT: &str = "%d.%m.%Y %H:%M";
const TIME_FORMAT: &str = "%H:%M";
const DATE_FORMAT: &str = "%d.%m.%Y";

/// Time parsing and formatting in the journal's configured zone.
#[derive(Debug, Clone, Copy)]
pub struct TimeUtils {
    tz: Tz,
}

impl TimeUtils {
    pub fn new(timezone: &str) -> Result<Self> {
        let tz: Tz = timezone
            .parse()
            .map_err(|e| ServiceError::Configuration(format!("Unknown TIMEZONE {:?}: {}", timezone, e)))?;
        Ok(Self { tz })
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.tz).fixed_offset()
    }

    /// Accepts `now` / `сейчас`, `HH:MM` (today) and `DD.MM.YYYY HH:MM`.
    pub fn parse_input(&self, input: &str) -> Option<DateTime<FixedOffset>> {
        self.parse_input_at(input, self.now())
    }

    pub fn parse_input_at(&self, input: &str, now: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        let input = input.trim().to_lowercase();

        if input == "now" || input == "сейчас" {
            return Some(now);
        }

        if let Ok(naive) = NaiveDateTime::parse_from_str(&input, FULL_FORMAT) {
            return self.localize(naive);
        }

        if let Ok(time) = NaiveTime::parse_from_str(&input, TIME_FORMAT) {
            let today = now.with_timezone(&self.tz).date_naive();
            return self.localize(today.and_time(time));
        }

        None
    }

    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.fixed_offset())
    }

    /// Returns `(date, time)` as written into the sheet.
    pub fn format_for_sheets(&self, dt: DateTime<FixedOffset>) -> (String, String) {
        let local = dt.with_timezone(&self.tz);
        (
            local.format(DATE_FORMAT).to_string(),
            local.format(TIME_FORMAT).to_string(),
        )
    }

    pub fn format_for_display(&self, dt: DateTime<FixedOffset>) -> String {
        dt.with_timezone(&self.tz).format(FULL_FORMAT).to_string()
    }

    pub fn format_duration(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> String {
        let total_minutes = (end - start).num_minutes().max(0);
        let hours = total_minutes / 60;
        let minutes = total_minutes % 60;

        if hours > 0 {
            format!("{}h {}m", hours, minutes)
        } else {
            format!("{}m", minutes)
        }
    }

    pub fn is_within_edit_window(created_at: DateTime<Utc>, limit_minutes: i64) -> bool {
        let elapsed = Utc::now().signed_duration_since(created_at);
        elapsed.num_seconds() <= limit_minutes * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Timelike};

    fn moscow() -> TimeUtils {
        TimeUtils::new("Europe/Moscow").unwrap()
    }

    fn fixed_now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-09-21T10:00:00+03:00").unwrap()
    }

    #[test]
    fn test_unknown_timezone() {
        let err = TimeUtils::new("Mars/Olympus").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_parse_now_keywords() {
        let utils = moscow();
        assert_eq!(utils.parse_input_at("now", fixed_now()), Some(fixed_now()));
        assert_eq!(utils.parse_input_at("  Сейчас ", fixed_now()), Some(fixed_now()));
    }

    #[test]
    fn test_parse_full_datetime() {
        let utils = moscow();
        let parsed = utils.parse_input_at("21.09.2024 14:30", fixed_now()).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-09-21T14:30:00+03:00");
    }

    #[test]
    fn test_parse_time_uses_today() {
        let utils = moscow();
        let parsed = utils.parse_input_at("9:05", fixed_now()).unwrap();
        assert_eq!(utils.format_for_display(parsed), "21.09.2024 09:05");
        assert_eq!(parsed.minute(), 5);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let utils = moscow();
        assert!(utils.parse_input_at("yesterday", fixed_now()).is_none());
        assert!(utils.parse_input_at("25:00", fixed_now()).is_none());
        assert!(utils.parse_input_at("31.02.2024 10:00", fixed_now()).is_none());
    }

    #[test]
    fn test_format_for_sheets_converts_zone() {
        let utils = moscow();
        let utc_noon = DateTime::parse_from_rfc3339("2024-09-21T12:00:00+00:00").unwrap();
        assert_eq!(
            utils.format_for_sheets(utc_noon),
            ("21.09.2024".to_string(), "15:00".to_string())
        );
    }

    #[test]
    fn test_format_duration() {
        let start = fixed_now();
        assert_eq!(TimeUtils::format_duration(start, start + Duration::minutes(45)), "45m");
        assert_eq!(TimeUtils::format_duration(start, start + Duration::minutes(65)), "1h 5m");
        assert_eq!(TimeUtils::format_duration(start, start - Duration::minutes(5)), "0m");
    }

    #[test]
    fn test_edit_window() {
        assert!(TimeUtils::is_within_edit_window(Utc::now() - Duration::minutes(5), 15));
        assert!(!TimeUtils::is_within_edit_window(Utc::now() - Duration::minutes(16), 15));
    }
}
