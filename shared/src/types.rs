use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, ServiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Engineer's full name as typed during registration ("Surname Name Patronymic").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FullName(String);

impl FullName {
    const MIN_LENGTH: usize = 3;
    const MAX_LENGTH: usize = 120;
    const MIN_WORDS: usize = 2;

    pub fn new(full_name: impl Into<String>) -> Result<Self> {
        let full_name = full_name.into();
        let normalized = full_name.split_whitespace().collect::<Vec<_>>().join(" ");
        Self::validate(&normalized)?;
        Ok(Self(normalized))
    }

    fn validate(full_name: &str) -> Result<()> {
        let length = full_name.chars().count();

        if length < Self::MIN_LENGTH {
            return Err(ServiceError::Validation(format!(
                "Full name must be at least {} characters",
                Self::MIN_LENGTH
            )));
        }

        if length > Self::MAX_LENGTH {
            return Err(ServiceError::Validation(format!(
                "Full name must be at most {} characters",
                Self::MAX_LENGTH
            )));
        }

        if full_name.split(' ').count() < Self::MIN_WORDS {
            return Err(ServiceError::Validation(
                "Full name must contain at least a surname and a name".to_string(),
            ));
        }

        if full_name.chars().any(|c| c.is_control()) {
            return Err(ServiceError::Validation(
                "Full name cannot contain control characters".to_string(),
            ));
        }

        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FullName {
    type Error = ServiceError;

    fn try_from(value: String) -> Result<Self> {
        FullName::new(value)
    }
}

impl From<FullName> for String {
    fn from(value: FullName) -> Self {
        value.0
    }
}

impl std::fmt::Display for FullName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub telegram_id: UserId,
    pub full_name: FullName,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(telegram_id: UserId, full_name: FullName) -> Self {
        Self {
            telegram_id,
            full_name,
            created_at: Utc::now(),
        }
    }
}

/// The optional trip columns a user may change after saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryField {
    Project,
    Address,
    Comment,
}

impl EntryField {
    pub fn label(&self) -> &'static str {
        match self {
            EntryField::Project => "🏗️ Project",
            EntryField::Address => "📍 Address",
            EntryField::Comment => "💬 Comment",
        }
    }
}

/// One journal row. Column order is fixed by [`TripEntry::HEADERS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripEntry {
    pub date: String,
    pub time_start: String,
    pub time_end: String,
    pub odometer_start: u64,
    pub odometer_end: u64,
    pub distance_km: u64,
    pub engineer: String,
    pub project: String,
    pub address: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub author_tg_id: UserId,
    pub row_uid: String,
}

impl TripEntry {
    pub const HEADERS: [&'static str; 13] = [
        "date",
        "time_start",
        "time_end",
        "odometer_start",
        "odometer_end",
        "distance_km",
        "engineer",
        "project",
        "address",
        "comment",
        "created_at",
        "author_tg_id",
        "row_uid",
    ];

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        date: String,
        time_start: String,
        time_end: String,
        odometer_start: u64,
        odometer_end: u64,
        engineer: &FullName,
        project: String,
        address: String,
        comment: String,
        author_tg_id: UserId,
    ) -> Result<Self> {
        if odometer_end < odometer_start {
            return Err(ServiceError::Validation(format!(
                "odometer_end {} is less than odometer_start {}",
                odometer_end, odometer_start
            )));
        }

        Ok(Self {
            date,
            time_start,
            time_end,
            odometer_start,
            odometer_end,
            distance_km: odometer_end - odometer_start,
            engineer: engineer.to_string(),
            project,
            address,
            comment,
            created_at: Utc::now(),
            author_tg_id,
            row_uid: Uuid::new_v4().to_string(),
        })
    }

    pub fn headers() -> Vec<String> {
        Self::HEADERS.iter().map(|h| h.to_string()).collect()
    }

    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.time_start.clone(),
            self.time_end.clone(),
            self.odometer_start.to_string(),
            self.odometer_end.to_string(),
            self.distance_km.to_string(),
            self.engineer.clone(),
            self.project.clone(),
            self.address.clone(),
            self.comment.clone(),
            self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.author_tg_id.to_string(),
            self.row_uid.clone(),
        ]
    }

    /// Parses a sheet row back into an entry. Rows that are short or carry
    /// unparsable numbers are skipped by returning `None`.
    pub fn from_row(row: &[String]) -> Option<Self> {
        if row.len() < Self::HEADERS.len() {
            return None;
        }

        let created_at = DateTime::parse_from_rfc3339(row[10].trim())
            .ok()?
            .with_timezone(&Utc);

        Some(Self {
            date: row[0].clone(),
            time_start: row[1].clone(),
            time_end: row[2].clone(),
            odometer_start: row[3].trim().parse().ok()?,
            odometer_end: row[4].trim().parse().ok()?,
            distance_km: row[5].trim().parse().ok()?,
            engineer: row[6].clone(),
            project: row[7].clone(),
            address: row[8].clone(),
            comment: row[9].clone(),
            created_at,
            author_tg_id: UserId(row[11].trim().parse().ok()?),
            row_uid: row[12].clone(),
        })
    }

    pub fn set_field(&mut self, field: EntryField, value: String) {
        match field {
            EntryField::Project => self.project = value,
            EntryField::Address => self.address = value,
            EntryField::Comment => self.comment = value,
        }
    }

    pub fn field(&self, field: EntryField) -> &str {
        match field {
            EntryField::Project => &self.project,
            EntryField::Address => &self.address,
            EntryField::Comment => &self.comment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engineer() -> FullName {
        FullName::new("Ivanov Ivan Ivanovich").unwrap()
    }

    fn sample_entry() -> TripEntry {
        TripEntry::new(
            "21.09.2024".to_string(),
            "14:30".to_string(),
            "16:05".to_string(),
            55_000,
            55_142,
            &engineer(),
            "Substation 7".to_string(),
            String::new(),
            "Routine inspection".to_string(),
            UserId(42),
        )
        .unwrap()
    }

    #[test]
    fn test_full_name_rejects_invalid() {
        assert!(FullName::new("").is_err(), "Empty");
        assert!(FullName::new("   \t ").is_err(), "Whitespace only");
        assert!(FullName::new("Ivan").is_err(), "Single word");
        assert!(FullName::new("A").is_err(), "Too short");
        assert!(FullName::new(format!("Ivanov {}", "a".repeat(120))).is_err(), "Too long");
    }

    #[test]
    fn test_full_name_normalizes_whitespace() {
        let name = FullName::new("  Ivanov   Ivan\tIvanovich ").unwrap();
        assert_eq!(name.as_str(), "Ivanov Ivan Ivanovich");
    }

    #[test]
    fn test_full_name_accepts_cyrillic() {
        assert!(FullName::new("Иванов Иван Иванович").is_ok());
        assert!(FullName::new("Li Na").is_ok());
    }

    #[test]
    fn test_full_name_deserialization_validates() {
        let ok: FullName = serde_json::from_str("\"Petrov Petr\"").unwrap();
        assert_eq!(ok.as_str(), "Petrov Petr");
        assert!(serde_json::from_str::<FullName>("\"Petrov\"").is_err());
    }

    #[test]
    fn test_trip_entry_distance() {
        let entry = sample_entry();
        assert_eq!(entry.distance_km, 142);
        assert_eq!(entry.engineer, "Ivanov Ivan Ivanovich");
        assert!(Uuid::parse_str(&entry.row_uid).is_ok());
    }

    #[test]
    fn test_trip_entry_rejects_backwards_odometer() {
        let result = TripEntry::new(
            "21.09.2024".to_string(),
            "14:30".to_string(),
            "16:05".to_string(),
            100,
            99,
            &engineer(),
            String::new(),
            String::new(),
            String::new(),
            UserId(1),
        );
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_trip_entry_row_layout() {
        let entry = sample_entry();
        let row = entry.to_row();

        assert_eq!(row.len(), TripEntry::HEADERS.len());
        assert_eq!(row[5], "142");
        assert_eq!(row[11], "42");
        assert!(row[10].ends_with('Z'));

        let parsed = TripEntry::from_row(&row).unwrap();
        assert_eq!(parsed.row_uid, entry.row_uid);
        assert_eq!(parsed.created_at.timestamp(), entry.created_at.timestamp());
    }

    #[test]
    fn test_trip_entry_from_short_row() {
        let row: Vec<String> = vec!["21.09.2024".to_string(); 5];
        assert!(TripEntry::from_row(&row).is_none());
    }

    #[test]
    fn test_set_field() {
        let mut entry = sample_entry();
        entry.set_field(EntryField::Address, "Lenina 1".to_string());
        assert_eq!(entry.field(EntryField::Address), "Lenina 1");
        assert_eq!(entry.field(EntryField::Project), "Substation 7");
    }
}
