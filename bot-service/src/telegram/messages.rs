use shared::{EntryField, TripEntry};
use teloxide::utils::html::escape;

use crate::state::TripDraft;
use crate::time_utils::TimeUtils;

pub const REGISTRATION_PROMPT: &str = "👋 Welcome!\n\n\
    You need to register before using the journal.\n\
    📝 Enter your full name (Surname Name Patronymic):";

pub const INVALID_FULL_NAME: &str =
    "❌ Please enter a valid full name (at least surname and name):";

pub const REGISTRATION_FAILED: &str =
    "❌ Could not save your registration. Please send your full name again in a moment:";

pub const REGISTER_FIRST: &str = "❌ Please register first. Send /start";

pub const MAIN_MENU: &str = "🚗 <b>Engineer trip journal</b>\n\nChoose an action:";

pub const UNRECOGNIZED_TEXT: &str = "🤔 I was not expecting a message right now. Use the menu below.";

pub const USE_BUTTONS: &str = "👇 Please use the buttons below.";

pub const CANCELLED: &str = "❌ Action cancelled.";

pub const START_TIME_PROMPT: &str = "🕐 <b>Trip start time</b>\n\n\
    Choose the start time:\n\
    • <b>Now</b> - current time\n\
    • <b>Enter manually</b> - DD.MM.YYYY HH:MM or HH:MM";

pub const MANUAL_TIME_PROMPT: &str = "🕐 <b>Enter the time</b>\n\n\
    Use one of the formats:\n\
    • <code>DD.MM.YYYY HH:MM</code> (e.g. 21.09.2024 14:30)\n\
    • <code>HH:MM</code> (e.g. 14:30) - today\n\
    • <code>now</code> - current time";

pub const INVALID_TIME: &str = "❌ Wrong time format!\n\n\
    Use one of:\n\
    • <code>DD.MM.YYYY HH:MM</code>\n\
    • <code>HH:MM</code>\n\
    • <code>now</code>";

pub const INVALID_ODOMETER: &str = "❌ Enter a valid odometer reading (a non-negative whole number of km):";

pub const ADDRESS_PROMPT: &str = "📍 Enter the destination address (optional):";

pub const COMMENT_PROMPT: &str = "💬 <b>Comment</b>\n\n\
    Enter a comment for the trip.\n\
    You can paste text from an email or add any details:";

pub const SAVE_FAILED: &str = "❌ <b>Could not save the entry!</b>\n\n\
    The journal is unavailable right now. Please try again in a few seconds.";

pub const SAVE_DUPLICATE: &str = "❌ <b>Entry not saved</b>\n\n\
    It looks like a duplicate of an entry you saved a moment ago.";

pub const SAVE_NOT_CONFIGURED: &str = "❌ <b>Could not save the entry!</b>\n\n\
    The journal spreadsheet is not configured. Please contact an administrator.";

pub const JOURNAL_UNAVAILABLE: &str = "❌ Could not read the journal. Please try again later.";

pub const NO_ENTRIES_TO_EDIT: &str = "❌ You have no entries to edit.";

pub const EDIT_WINDOW_EXPIRED: &str = "❌ <b>Editing time is over!</b>\n\n\
    Entries can only be edited within 15 minutes after creation.";

pub const EDIT_ROW_MISSING: &str = "❌ The entry was not found or you cannot edit it.";

pub const NO_PERMISSION: &str = "❌ You do not have permission to do this.";

pub const HELP: &str = "ℹ️ <b>Bot help</b>\n\n\
    <b>Commands:</b>\n\
    /start - Registration and main menu\n\
    /new - Create a new trip entry\n\
    /last - Show recent entries\n\
    /edit_last - Edit your last entry\n\
    /cancel - Cancel the current input\n\
    /help - Show this help\n\n\
    <b>Creating an entry:</b>\n\
    1. Start time (now/manual)\n\
    2. Odometer at start\n\
    3. End time\n\
    4. Odometer at end\n\
    5. Project (optional)\n\
    6. Address (optional)\n\
    7. Comment\n\
    8. Confirm and save\n\n\
    <b>Time formats:</b>\n\
    • <code>now</code> - current time\n\
    • <code>14:30</code> - today\n\
    • <code>21.09.2024 14:30</code> - full date\n\n\
    <b>Editing:</b>\n\
    Project, address and comment can be changed within 15 minutes after saving.";

pub fn format_greeting(full_name: &str) -> String {
    format!("👋 Welcome back, <b>{}</b>!", escape(full_name))
}

pub fn format_registered(full_name: &str, user_id: i64) -> String {
    format!(
        "✅ <b>Registration complete!</b>\n\n\
        👤 {}\n\
        🆔 Your ID: {}\n\n\
        You can now use the bot!",
        escape(full_name),
        user_id
    )
}

pub fn format_start_time_set(time_utils: &TimeUtils, draft_start: chrono::DateTime<chrono::FixedOffset>) -> String {
    format!(
        "✅ Start time: <b>{}</b>\n\n\
        🛣️ Enter the odometer reading at the <b>start</b> of the trip (km):",
        time_utils.format_for_display(draft_start)
    )
}

pub fn format_odometer_start_set(odometer_start: u64) -> String {
    format!(
        "✅ Start odometer: <b>{} km</b>\n\n\
        🕐 <b>Trip end time</b>\n\n\
        Choose the end time:",
        odometer_start
    )
}

pub fn format_end_before_start(
    time_utils: &TimeUtils,
    start: chrono::DateTime<chrono::FixedOffset>,
    end: chrono::DateTime<chrono::FixedOffset>,
) -> String {
    format!(
        "❌ The end time cannot be earlier than the start time!\n\n\
        Start: <b>{}</b>\n\
        End: <b>{}</b>\n\n\
        Please enter a valid end time:",
        time_utils.format_for_display(start),
        time_utils.format_for_display(end)
    )
}

pub fn format_end_time_set(
    time_utils: &TimeUtils,
    start: chrono::DateTime<chrono::FixedOffset>,
    end: chrono::DateTime<chrono::FixedOffset>,
) -> String {
    format!(
        "✅ End time: <b>{}</b>\n\
        ⏱️ Duration: <b>{}</b>\n\n\
        🛣️ Enter the odometer reading at the <b>end</b> of the trip (km):",
        time_utils.format_for_display(end),
        TimeUtils::format_duration(start, end)
    )
}

pub fn format_odometer_end_too_small(odometer_end: u64, odometer_start: u64) -> String {
    format!(
        "❌ The end odometer ({} km) cannot be less than the start odometer ({} km)!\n\n\
        Enter a valid value:",
        odometer_end, odometer_start
    )
}

pub fn format_odometer_end_set(odometer_end: u64, distance_km: u64) -> String {
    format!(
        "✅ End odometer: <b>{} km</b>\n\
        📏 Distance: <b>{} km</b>\n\n\
        🏗️ Enter the project name (optional):",
        odometer_end, distance_km
    )
}

pub fn format_confirmation(
    time_utils: &TimeUtils,
    engineer: &str,
    draft: &TripDraft,
    project: &str,
    address: &str,
    comment: &str,
) -> String {
    let mut text = format!(
        "📋 <b>Confirm the entry</b>\n\n\
        👤 <b>Engineer:</b> {}\n\
        🕐 <b>Start:</b> {}\n\
        🕑 <b>End:</b> {}\n\
        ⏱️ <b>Duration:</b> {}\n\
        🛣️ <b>Odometer start:</b> {} km\n\
        🛣️ <b>Odometer end:</b> {} km\n\
        📏 <b>Distance:</b> {} km\n",
        escape(engineer),
        time_utils.format_for_display(draft.start_time),
        time_utils.format_for_display(draft.end_time),
        TimeUtils::format_duration(draft.start_time, draft.end_time),
        draft.odometer_start,
        draft.odometer_end,
        draft.distance_km()
    );

    if !project.is_empty() {
        text.push_str(&format!("🏗️ <b>Project:</b> {}\n", escape(project)));
    }
    if !address.is_empty() {
        text.push_str(&format!("📍 <b>Address:</b> {}\n", escape(address)));
    }
    if !comment.is_empty() {
        text.push_str(&format!("💬 <b>Comment:</b> {}\n", escape(&truncate(comment, 100))));
    }

    text.push_str("\n<i>Is everything correct?</i>");
    text
}

pub fn format_saved(time_utils: &TimeUtils, draft: &TripDraft) -> String {
    format!(
        "✅ <b>Entry saved!</b>\n\n\
        📏 Distance: <b>{} km</b>\n\
        🕐 {} - {}\n\n\
        The entry was added to the journal.",
        draft.distance_km(),
        time_utils.format_for_display(draft.start_time),
        time_utils.format_for_display(draft.end_time)
    )
}

pub fn format_recent_entries(entries: &[TripEntry]) -> String {
    if entries.is_empty() {
        return "📋 <b>Recent entries</b>\n\nNo entries found.".to_string();
    }

    let mut text = format!("📋 <b>Last {} entries</b>\n\n", entries.len());

    for (i, entry) in entries.iter().enumerate() {
        text.push_str(&format!("<b>{}. {}</b>\n", i + 1, escape(&entry.engineer)));
        text.push_str(&format!(
            "📅 {} | ⏱️ {}-{}\n",
            escape(&entry.date),
            escape(&entry.time_start),
            escape(&entry.time_end)
        ));
        text.push_str(&format!("📏 {} km", entry.distance_km));

        if !entry.project.is_empty() {
            text.push_str(&format!(" | 🏗️ {}", escape(&truncate(&entry.project, 20))));
        }
        if !entry.address.is_empty() {
            text.push_str(&format!(" | 📍 {}", escape(&truncate(&entry.address, 20))));
        }

        text.push_str("\n\n");
    }

    text
}

pub fn format_edit_entry(entry: &TripEntry) -> String {
    let or_missing = |value: &str| {
        if value.is_empty() {
            "(not set)".to_string()
        } else {
            escape(value)
        }
    };

    format!(
        "✏️ <b>Edit entry</b>\n\n\
        👤 <b>Engineer:</b> {}\n\
        📅 <b>Date:</b> {}\n\
        🕐 <b>Time:</b> {} - {}\n\
        📏 <b>Distance:</b> {} km\n\
        🏗️ <b>Project:</b> {}\n\
        📍 <b>Address:</b> {}\n\
        💬 <b>Comment:</b> {}\n\n\
        What do you want to change?",
        escape(&entry.engineer),
        escape(&entry.date),
        escape(&entry.time_start),
        escape(&entry.time_end),
        entry.distance_km,
        or_missing(&entry.project),
        or_missing(&entry.address),
        escape(&truncate(&entry.comment, 50))
    )
}

pub fn format_edit_field_prompt(field: EntryField) -> String {
    format!(
        "✏️ <b>Editing: {}</b>\n\nEnter the new value:",
        field.label()
    )
}

pub fn format_edit_done(field: EntryField, value: &str) -> String {
    format!(
        "✅ <b>Entry updated!</b>\n\n{} changed to:\n<code>{}</code>",
        field.label(),
        escape(value)
    )
}

pub fn format_export(total_users: usize, total_entries: usize, sheet_url: &str) -> String {
    format!(
        "👑 <b>Administrator panel</b>\n\n\
        📊 <b>Statistics:</b>\n\
        👥 Registered users: {}\n\
        📝 Journal entries: {}\n\n\
        🔗 <a href='{}'>Open the spreadsheet</a>",
        total_users,
        total_entries,
        escape(sheet_url)
    )
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated: String = value.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}
