use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::telegram::actions::ButtonAction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn new(text: impl Into<String>, action: ButtonAction) -> Self {
        Self {
            text: text.into(),
            action,
        }
    }
}

/// Rows of inline buttons, top to bottom.
pub type ButtonLayout = Vec<Vec<Button>>;

pub fn to_inline_markup(layout: &ButtonLayout) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(layout.iter().map(|row| {
        row.iter()
            .map(|button| InlineKeyboardButton::callback(button.text.clone(), button.action.as_str()))
            .collect::<Vec<_>>()
    }))
}

pub fn main_menu_keyboard(is_admin: bool) -> ButtonLayout {
    let mut layout = vec![
        vec![Button::new("🆕 New entry", ButtonAction::NewEntry)],
        vec![
            Button::new("📋 Recent entries", ButtonAction::LastEntries),
            Button::new("✏️ Edit last", ButtonAction::EditLast),
        ],
        vec![Button::new("ℹ️ Help", ButtonAction::Help)],
    ];

    if is_admin {
        layout.push(vec![Button::new("👑 Export (admin)", ButtonAction::Export)]);
    }

    layout
}

pub fn start_time_keyboard() -> ButtonLayout {
    vec![
        vec![
            Button::new("⏰ Now", ButtonAction::TimeNow),
            Button::new("✏️ Enter manually", ButtonAction::TimeManual),
        ],
        vec![cancel_button()],
    ]
}

pub fn end_time_keyboard() -> ButtonLayout {
    vec![
        vec![
            Button::new("⏰ Now", ButtonAction::EndTimeNow),
            Button::new("✏️ Enter manually", ButtonAction::EndTimeManual),
        ],
        vec![cancel_button()],
    ]
}

pub fn cancel_keyboard() -> ButtonLayout {
    vec![vec![cancel_button()]]
}

pub fn skip_keyboard(skip: ButtonAction) -> ButtonLayout {
    vec![
        vec![Button::new("⏭️ Skip", skip)],
        vec![cancel_button()],
    ]
}

pub fn confirmation_keyboard() -> ButtonLayout {
    vec![
        vec![Button::new("✅ Save", ButtonAction::ConfirmSave)],
        vec![
            Button::new("🔙 Back", ButtonAction::GoBack),
            cancel_button(),
        ],
    ]
}

pub fn recent_entries_keyboard() -> ButtonLayout {
    vec![
        vec![Button::new("🔄 Refresh", ButtonAction::LastEntries)],
        vec![main_menu_button()],
    ]
}

pub fn edit_field_keyboard() -> ButtonLayout {
    vec![
        vec![
            Button::new("🏗️ Project", ButtonAction::EditProject),
            Button::new("📍 Address", ButtonAction::EditAddress),
        ],
        vec![Button::new("💬 Comment", ButtonAction::EditComment)],
        vec![cancel_button()],
    ]
}

pub fn export_keyboard() -> ButtonLayout {
    vec![
        vec![Button::new("📋 Recent entries", ButtonAction::LastEntries)],
        vec![main_menu_button()],
    ]
}

pub fn main_menu_only_keyboard() -> ButtonLayout {
    vec![vec![main_menu_button()]]
}

fn cancel_button() -> Button {
    Button::new("❌ Cancel", ButtonAction::Cancel)
}

fn main_menu_button() -> Button {
    Button::new("🏠 Main menu", ButtonAction::MainMenu)
}
