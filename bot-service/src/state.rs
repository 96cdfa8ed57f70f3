use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use shared::{EntryField, TripEntry};

/// Times and odometer readings collected before the optional text fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripDraft {
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub odometer_start: u64,
    pub odometer_end: u64,
}

impl TripDraft {
    pub fn distance_km(&self) -> u64 {
        self.odometer_end.saturating_sub(self.odometer_start)
    }
}

/// What the bot is waiting for from a user. Stored as
/// `{"state": "<name>", "data": {...}}`; a missing value means `Idle`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    Idle,
    WaitingRegistration,
    WaitingStartTime,
    WaitingOdometerStart {
        start_time: DateTime<FixedOffset>,
    },
    WaitingEndTime {
        start_time: DateTime<FixedOffset>,
        odometer_start: u64,
    },
    WaitingOdometerEnd {
        start_time: DateTime<FixedOffset>,
        end_time: DateTime<FixedOffset>,
        odometer_start: u64,
    },
    WaitingProject {
        draft: TripDraft,
    },
    WaitingAddress {
        draft: TripDraft,
        project: String,
    },
    WaitingComment {
        draft: TripDraft,
        project: String,
        address: String,
    },
    WaitingConfirmation {
        draft: TripDraft,
        project: String,
        address: String,
        comment: String,
    },
    EditingEntry {
        row_number: usize,
        entry: TripEntry,
    },
    EditingField {
        row_number: usize,
        entry: TripEntry,
        field: EntryField,
    },
}

impl ConversationState {
    pub fn name(&self) -> &'static str {
        match self {
            ConversationState::Idle => "idle",
            ConversationState::WaitingRegistration => "waiting_registration",
            ConversationState::WaitingStartTime => "waiting_start_time",
            ConversationState::WaitingOdometerStart { .. } => "waiting_odometer_start",
            ConversationState::WaitingEndTime { .. } => "waiting_end_time",
            ConversationState::WaitingOdometerEnd { .. } => "waiting_odometer_end",
            ConversationState::WaitingProject { .. } => "waiting_project",
            ConversationState::WaitingAddress { .. } => "waiting_address",
            ConversationState::WaitingComment { .. } => "waiting_comment",
            ConversationState::WaitingConfirmation { .. } => "waiting_confirmation",
            ConversationState::EditingEntry { .. } => "editing_entry",
            ConversationState::EditingField { .. } => "editing_field",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ConversationState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn moscow(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 9, 21, h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_unit_state_serialization() {
        let raw = serde_json::to_string(&ConversationState::WaitingRegistration).unwrap();
        assert_eq!(raw, r#"{"state":"waiting_registration"}"#);

        let parsed: ConversationState = serde_json::from_str(r#"{"state":"idle"}"#).unwrap();
        assert!(parsed.is_idle());
    }

    #[test]
    fn test_state_with_data_serialization() {
        let state = ConversationState::WaitingEndTime {
            start_time: moscow(14, 30),
            odometer_start: 55_000,
        };

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["state"], "waiting_end_time");
        assert_eq!(value["data"]["odometer_start"], 55_000);

        let parsed: ConversationState = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn test_unknown_state_rejected() {
        assert!(serde_json::from_str::<ConversationState>(r#"{"state":"waiting_photo"}"#).is_err());
    }

    #[test]
    fn test_draft_distance() {
        let draft = TripDraft {
            start_time: moscow(9, 0),
            end_time: moscow(11, 15),
            odometer_start: 1_000,
            odometer_end: 1_087,
        };
        assert_eq!(draft.distance_km(), 87);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(ConversationState::default().name(), "idle");
        assert_eq!(ConversationState::WaitingStartTime.name(), "waiting_start_time");
    }
}
