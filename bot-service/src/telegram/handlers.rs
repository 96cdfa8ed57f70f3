use chrono::{DateTime, FixedOffset};
use shared::errors::{Result, ServiceError};
use shared::{record_counter, ChatId, EntryField, FullName, TripEntry, User, UserId};
use tracing::{debug, error, info, warn};

use crate::dispatcher::BotContext;
use crate::state::{ConversationState, TripDraft};
use crate::telegram::actions::ButtonAction;
use crate::telegram::keyboards::{
    cancel_keyboard, confirmation_keyboard, edit_field_keyboard, end_time_keyboard, export_keyboard,
    main_menu_keyboard, main_menu_only_keyboard, recent_entries_keyboard, skip_keyboard,
    start_time_keyboard,
};
use crate::telegram::messages::*;
use crate::telegram::notifier::OutgoingMessage;
use crate::time_utils::TimeUtils;

const RECENT_ENTRIES_LIMIT: usize = 5;
const EDIT_WINDOW_MINUTES: i64 = 15;

pub async fn send_main_menu(ctx: &BotContext, chat_id: ChatId, user_id: UserId) {
    let message = OutgoingMessage::html(MAIN_MENU)
        .with_buttons(main_menu_keyboard(ctx.config.is_admin(user_id)));
    ctx.send(chat_id, message).await;
}

/// Loads the registered user or tells them to `/start` first.
async fn require_user(ctx: &BotContext, chat_id: ChatId, user_id: UserId) -> Option<User> {
    let user = ctx.load_user(user_id).await;
    if user.is_none() {
        ctx.send(chat_id, OutgoingMessage::plain(REGISTER_FIRST)).await;
    }
    user
}

pub async fn handle_start(ctx: &BotContext, chat_id: ChatId, user_id: UserId) -> Result<()> {
    match ctx.load_user(user_id).await {
        Some(user) => {
            info!(user_id = %user_id, "Registered user opened the main menu");
            ctx.send(
                chat_id,
                OutgoingMessage::html(format_greeting(user.full_name.as_str())),
            )
            .await;
            send_main_menu(ctx, chat_id, user_id).await;
        }
        None => {
            info!(user_id = %user_id, "Starting registration");
            ctx.set_state(user_id, &ConversationState::WaitingRegistration)
                .await;
            ctx.send(
                chat_id,
                OutgoingMessage::plain(REGISTRATION_PROMPT).with_buttons(cancel_keyboard()),
            )
            .await;
        }
    }

    Ok(())
}

pub async fn handle_registration_input(
    ctx: &BotContext,
    chat_id: ChatId,
    user_id: UserId,
    text: &str,
) -> Result<()> {
    let full_name = match FullName::new(text) {
        Ok(full_name) => full_name,
        Err(e) => {
            debug!(user_id = %user_id, error = %e, "Rejected full name");
            ctx.send(chat_id, OutgoingMessage::plain(INVALID_FULL_NAME)).await;
            return Ok(());
        }
    };

    let user = User::new(user_id, full_name);
    if let Err(e) = ctx.repo.save_user(&user).await {
        error!(user_id = %user_id, error = %e, "Failed to persist user");
        ctx.send(chat_id, OutgoingMessage::plain(REGISTRATION_FAILED)).await;
        return Ok(());
    }
    ctx.clear_state(user_id).await;

    info!(user_id = %user_id, "User registered");

    ctx.send(
        chat_id,
        OutgoingMessage::html(format_registered(user.full_name.as_str(), user_id.0)),
    )
    .await;
    send_main_menu(ctx, chat_id, user_id).await;

    Ok(())
}

pub async fn handle_new_entry(ctx: &BotContext, chat_id: ChatId, user_id: UserId) -> Result<()> {
    if require_user(ctx, chat_id, user_id).await.is_none() {
        return Ok(());
    }

    ctx.set_state(user_id, &ConversationState::WaitingStartTime).await;
    ctx.send(
        chat_id,
        OutgoingMessage::html(START_TIME_PROMPT).with_buttons(start_time_keyboard()),
    )
    .await;

    Ok(())
}

pub async fn handle_manual_time_prompt(ctx: &BotContext, chat_id: ChatId) -> Result<()> {
    ctx.send(
        chat_id,
        OutgoingMessage::html(MANUAL_TIME_PROMPT).with_buttons(cancel_keyboard()),
    )
    .await;
    Ok(())
}

pub async fn handle_start_time(
    ctx: &BotContext,
    chat_id: ChatId,
    user_id: UserId,
    start_time: Option<DateTime<FixedOffset>>,
) -> Result<()> {
    let Some(start_time) = start_time else {
        ctx.send(
            chat_id,
            OutgoingMessage::html(INVALID_TIME).with_buttons(start_time_keyboard()),
        )
        .await;
        return Ok(());
    };

    ctx.set_state(user_id, &ConversationState::WaitingOdometerStart { start_time })
        .await;
    ctx.send(
        chat_id,
        OutgoingMessage::html(format_start_time_set(&ctx.time, start_time))
            .with_buttons(cancel_keyboard()),
    )
    .await;

    Ok(())
}

fn parse_odometer(text: &str) -> Option<u64> {
    text.trim().parse().ok()
}

pub async fn handle_odometer_start_input(
    ctx: &BotContext,
    chat_id: ChatId,
    user_id: UserId,
    start_time: DateTime<FixedOffset>,
    text: &str,
) -> Result<()> {
    let Some(odometer_start) = parse_odometer(text) else {
        ctx.send(
            chat_id,
            OutgoingMessage::plain(INVALID_ODOMETER).with_buttons(cancel_keyboard()),
        )
        .await;
        return Ok(());
    };

    ctx.set_state(
        user_id,
        &ConversationState::WaitingEndTime {
            start_time,
            odometer_start,
        },
    )
    .await;
    ctx.send(
        chat_id,
        OutgoingMessage::html(format_odometer_start_set(odometer_start))
            .with_buttons(end_time_keyboard()),
    )
    .await;

    Ok(())
}

pub async fn handle_end_time(
    ctx: &BotContext,
    chat_id: ChatId,
    user_id: UserId,
    start_time: DateTime<FixedOffset>,
    odometer_start: u64,
    end_time: Option<DateTime<FixedOffset>>,
) -> Result<()> {
    let Some(end_time) = end_time else {
        ctx.send(
            chat_id,
            OutgoingMessage::html(INVALID_TIME).with_buttons(end_time_keyboard()),
        )
        .await;
        return Ok(());
    };

    if end_time < start_time {
        ctx.send(
            chat_id,
            OutgoingMessage::html(format_end_before_start(&ctx.time, start_time, end_time))
                .with_buttons(end_time_keyboard()),
        )
        .await;
        return Ok(());
    }

    ctx.set_state(
        user_id,
        &ConversationState::WaitingOdometerEnd {
            start_time,
            end_time,
            odometer_start,
        },
    )
    .await;
    ctx.send(
        chat_id,
        OutgoingMessage::html(format_end_time_set(&ctx.time, start_time, end_time))
            .with_buttons(cancel_keyboard()),
    )
    .await;

    Ok(())
}

pub async fn handle_odometer_end_input(
    ctx: &BotContext,
    chat_id: ChatId,
    user_id: UserId,
    start_time: DateTime<FixedOffset>,
    end_time: DateTime<FixedOffset>,
    odometer_start: u64,
    text: &str,
) -> Result<()> {
    let Some(odometer_end) = parse_odometer(text) else {
        ctx.send(
            chat_id,
            OutgoingMessage::plain(INVALID_ODOMETER).with_buttons(cancel_keyboard()),
        )
        .await;
        return Ok(());
    };

    if odometer_end < odometer_start {
        ctx.send(
            chat_id,
            OutgoingMessage::plain(format_odometer_end_too_small(odometer_end, odometer_start))
                .with_buttons(cancel_keyboard()),
        )
        .await;
        return Ok(());
    }

    let draft = TripDraft {
        start_time,
        end_time,
        odometer_start,
        odometer_end,
    };
    let distance_km = draft.distance_km();

    ctx.set_state(user_id, &ConversationState::WaitingProject { draft })
        .await;
    ctx.send(
        chat_id,
        OutgoingMessage::html(format_odometer_end_set(odometer_end, distance_km))
            .with_buttons(skip_keyboard(ButtonAction::SkipProject)),
    )
    .await;

    Ok(())
}

pub async fn handle_project(
    ctx: &BotContext,
    chat_id: ChatId,
    user_id: UserId,
    draft: TripDraft,
    project: String,
) -> Result<()> {
    ctx.set_state(user_id, &ConversationState::WaitingAddress { draft, project })
        .await;
    ctx.send(
        chat_id,
        OutgoingMessage::plain(ADDRESS_PROMPT).with_buttons(skip_keyboard(ButtonAction::SkipAddress)),
    )
    .await;
    Ok(())
}

pub async fn handle_address(
    ctx: &BotContext,
    chat_id: ChatId,
    user_id: UserId,
    draft: TripDraft,
    project: String,
    address: String,
) -> Result<()> {
    ctx.set_state(
        user_id,
        &ConversationState::WaitingComment {
            draft,
            project,
            address,
        },
    )
    .await;
    ctx.send(
        chat_id,
        OutgoingMessage::html(COMMENT_PROMPT).with_buttons(cancel_keyboard()),
    )
    .await;
    Ok(())
}

pub async fn handle_comment_input(
    ctx: &BotContext,
    chat_id: ChatId,
    user_id: UserId,
    draft: TripDraft,
    project: String,
    address: String,
    comment: String,
) -> Result<()> {
    let Some(user) = require_user(ctx, chat_id, user_id).await else {
        return Ok(());
    };

    let summary = format_confirmation(
        &ctx.time,
        user.full_name.as_str(),
        &draft,
        &project,
        &address,
        &comment,
    );

    ctx.set_state(
        user_id,
        &ConversationState::WaitingConfirmation {
            draft,
            project,
            address,
            comment,
        },
    )
    .await;
    ctx.send(
        chat_id,
        OutgoingMessage::html(summary).with_buttons(confirmation_keyboard()),
    )
    .await;

    Ok(())
}

pub async fn handle_go_back(
    ctx: &BotContext,
    chat_id: ChatId,
    user_id: UserId,
    draft: TripDraft,
    project: String,
    address: String,
) -> Result<()> {
    handle_address(ctx, chat_id, user_id, draft, project, address).await
}

pub async fn handle_confirm_save(
    ctx: &BotContext,
    chat_id: ChatId,
    user_id: UserId,
    draft: TripDraft,
    project: String,
    address: String,
    comment: String,
) -> Result<()> {
    let Some(user) = require_user(ctx, chat_id, user_id).await else {
        return Ok(());
    };

    let (date, time_start) = ctx.time.format_for_sheets(draft.start_time);
    let (_, time_end) = ctx.time.format_for_sheets(draft.end_time);

    let entry = match TripEntry::new(
        date,
        time_start,
        time_end,
        draft.odometer_start,
        draft.odometer_end,
        &user.full_name,
        project,
        address,
        comment,
        user_id,
    ) {
        Ok(entry) => entry,
        Err(e) => {
            error!(user_id = %user_id, error = %e, "Stored draft does not form a valid entry");
            ctx.send(
                chat_id,
                OutgoingMessage::html(SAVE_FAILED).with_buttons(confirmation_keyboard()),
            )
            .await;
            return Ok(());
        }
    };

    match ctx.journal.append(&entry).await {
        Ok(()) => {
            record_counter("bot_entries_saved_total", 1);
            ctx.clear_state(user_id).await;

            info!(user_id = %user_id, row_uid = %entry.row_uid, "Trip entry saved");

            let message = OutgoingMessage::html(format_saved(&ctx.time, &draft))
                .with_buttons(main_menu_keyboard(ctx.config.is_admin(user_id)));
            ctx.send(chat_id, message).await;
        }
        Err(ServiceError::Duplicate(reason)) => {
            warn!(user_id = %user_id, reason = %reason, "Trip entry rejected as duplicate");
            ctx.send(chat_id, OutgoingMessage::html(SAVE_DUPLICATE)).await;
        }
        Err(e) if e.is_configuration() => {
            error!(user_id = %user_id, error = %e, "Journal spreadsheet is not configured, entry not saved");
            ctx.send(
                chat_id,
                OutgoingMessage::html(SAVE_NOT_CONFIGURED).with_buttons(confirmation_keyboard()),
            )
            .await;
        }
        Err(e) => {
            error!(user_id = %user_id, error = %e, "Failed to append trip entry");
            ctx.send(
                chat_id,
                OutgoingMessage::html(SAVE_FAILED).with_buttons(confirmation_keyboard()),
            )
            .await;
        }
    }

    Ok(())
}

pub async fn handle_cancel(ctx: &BotContext, chat_id: ChatId, user_id: UserId) -> Result<()> {
    ctx.clear_state(user_id).await;
    ctx.send(chat_id, OutgoingMessage::plain(CANCELLED)).await;
    send_main_menu(ctx, chat_id, user_id).await;
    Ok(())
}

pub async fn handle_main_menu(ctx: &BotContext, chat_id: ChatId, user_id: UserId) -> Result<()> {
    ctx.clear_state(user_id).await;
    send_main_menu(ctx, chat_id, user_id).await;
    Ok(())
}

pub async fn handle_help(ctx: &BotContext, chat_id: ChatId) -> Result<()> {
    ctx.send(
        chat_id,
        OutgoingMessage::html(HELP).with_buttons(main_menu_only_keyboard()),
    )
    .await;
    Ok(())
}

pub async fn handle_last_entries(ctx: &BotContext, chat_id: ChatId) -> Result<()> {
    match ctx.journal.recent(RECENT_ENTRIES_LIMIT).await {
        Ok(entries) => {
            ctx.send(
                chat_id,
                OutgoingMessage::html(format_recent_entries(&entries))
                    .with_buttons(recent_entries_keyboard()),
            )
            .await;
        }
        Err(e) => {
            log_journal_failure(&e, "Failed to read recent entries");
            ctx.send(
                chat_id,
                OutgoingMessage::plain(JOURNAL_UNAVAILABLE).with_buttons(main_menu_only_keyboard()),
            )
            .await;
        }
    }
    Ok(())
}

pub async fn handle_edit_last(ctx: &BotContext, chat_id: ChatId, user_id: UserId) -> Result<()> {
    if require_user(ctx, chat_id, user_id).await.is_none() {
        return Ok(());
    }

    let last = match ctx.journal.last_for_author(user_id).await {
        Ok(last) => last,
        Err(e) => {
            log_journal_failure(&e, "Failed to look up last entry");
            ctx.send(chat_id, OutgoingMessage::plain(JOURNAL_UNAVAILABLE)).await;
            return Ok(());
        }
    };

    let Some((row_number, entry)) = last else {
        ctx.send(
            chat_id,
            OutgoingMessage::plain(NO_ENTRIES_TO_EDIT).with_buttons(main_menu_only_keyboard()),
        )
        .await;
        return Ok(());
    };

    if !TimeUtils::is_within_edit_window(entry.created_at, EDIT_WINDOW_MINUTES) {
        ctx.send(
            chat_id,
            OutgoingMessage::html(EDIT_WINDOW_EXPIRED).with_buttons(main_menu_only_keyboard()),
        )
        .await;
        return Ok(());
    }

    let text = format_edit_entry(&entry);
    ctx.set_state(user_id, &ConversationState::EditingEntry { row_number, entry })
        .await;
    ctx.send(
        chat_id,
        OutgoingMessage::html(text).with_buttons(edit_field_keyboard()),
    )
    .await;

    Ok(())
}

pub async fn handle_edit_field_choice(
    ctx: &BotContext,
    chat_id: ChatId,
    user_id: UserId,
    row_number: usize,
    entry: TripEntry,
    field: EntryField,
) -> Result<()> {
    ctx.set_state(
        user_id,
        &ConversationState::EditingField {
            row_number,
            entry,
            field,
        },
    )
    .await;
    ctx.send(
        chat_id,
        OutgoingMessage::html(format_edit_field_prompt(field)).with_buttons(cancel_keyboard()),
    )
    .await;
    Ok(())
}

pub async fn handle_edit_field_input(
    ctx: &BotContext,
    chat_id: ChatId,
    user_id: UserId,
    mut entry: TripEntry,
    field: EntryField,
    text: &str,
) -> Result<()> {
    // Rows may have shifted since the entry was picked.
    let row_number = match ctx.journal.find_by_uid(&entry.row_uid, user_id).await {
        Ok(Some(row_number)) => row_number,
        Ok(None) => {
            warn!(user_id = %user_id, row_uid = %entry.row_uid, "Entry to edit is gone");
            ctx.clear_state(user_id).await;
            ctx.send(
                chat_id,
                OutgoingMessage::plain(EDIT_ROW_MISSING).with_buttons(main_menu_only_keyboard()),
            )
            .await;
            return Ok(());
        }
        Err(e) => {
            log_journal_failure(&e, "Failed to locate entry for editing");
            ctx.send(chat_id, OutgoingMessage::plain(JOURNAL_UNAVAILABLE)).await;
            return Ok(());
        }
    };

    entry.set_field(field, text.trim().to_string());

    if let Err(e) = ctx.journal.update(row_number, &entry).await {
        log_journal_failure(&e, "Failed to update entry");
        ctx.send(chat_id, OutgoingMessage::plain(JOURNAL_UNAVAILABLE)).await;
        return Ok(());
    }

    info!(user_id = %user_id, row = row_number, field = field.label(), "Entry edited");

    ctx.clear_state(user_id).await;
    ctx.send(
        chat_id,
        OutgoingMessage::html(format_edit_done(field, entry.field(field)))
            .with_buttons(main_menu_keyboard(ctx.config.is_admin(user_id))),
    )
    .await;

    Ok(())
}

pub async fn handle_export(ctx: &BotContext, chat_id: ChatId, user_id: UserId) -> Result<()> {
    if !ctx.config.is_admin(user_id) {
        warn!(user_id = %user_id, "Non-admin requested export");
        ctx.send(chat_id, OutgoingMessage::plain(NO_PERMISSION)).await;
        return Ok(());
    }

    let total_users = ctx.repo.count_users().await.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to count users");
        0
    });

    let total_entries = match ctx.journal.count().await {
        Ok(count) => count,
        Err(e) => {
            log_journal_failure(&e, "Failed to count journal entries");
            0
        }
    };

    ctx.send(
        chat_id,
        OutgoingMessage::html(format_export(
            total_users,
            total_entries,
            &ctx.config.sheets.spreadsheet_url(),
        ))
        .with_buttons(export_keyboard()),
    )
    .await;

    Ok(())
}

pub async fn handle_unrecognized_text(
    ctx: &BotContext,
    chat_id: ChatId,
    user_id: UserId,
) -> Result<()> {
    info!(user_id = %user_id, "Unrecognized free text");

    if ctx.load_user(user_id).await.is_some() {
        ctx.send(chat_id, OutgoingMessage::plain(UNRECOGNIZED_TEXT)).await;
        send_main_menu(ctx, chat_id, user_id).await;
    } else {
        ctx.send(chat_id, OutgoingMessage::plain(REGISTER_FIRST)).await;
    }

    Ok(())
}

/// Text sent while the bot waits for a button press.
pub async fn handle_buttons_expected(
    ctx: &BotContext,
    chat_id: ChatId,
    state: &ConversationState,
) -> Result<()> {
    let buttons = match state {
        ConversationState::EditingEntry { .. } => edit_field_keyboard(),
        _ => confirmation_keyboard(),
    };
    ctx.send(
        chat_id,
        OutgoingMessage::plain(USE_BUTTONS).with_buttons(buttons),
    )
    .await;
    Ok(())
}

fn log_journal_failure(e: &ServiceError, context: &str) {
    if e.is_configuration() {
        error!(error = %e, "{}: journal spreadsheet is not configured", context);
    } else {
        error!(error = %e, "{}", context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_odometer() {
        assert_eq!(parse_odometer(" 55000 "), Some(55_000));
        assert_eq!(parse_odometer("0"), Some(0));
        assert_eq!(parse_odometer("-5"), None);
        assert_eq!(parse_odometer("12.5"), None);
        assert_eq!(parse_odometer("many"), None);
    }
}
