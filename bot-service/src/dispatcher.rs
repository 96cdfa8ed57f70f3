use shared::errors::Result;
use shared::{record_counter, record_timing, BotConfig, ChatId, EntryField, User, UserId};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::journal::TripJournal;
use crate::sheets::Spreadsheet;
use crate::state::ConversationState;
use crate::store::{StateRepository, StateStore};
use crate::telegram::actions::{ButtonAction, Command};
use crate::telegram::handlers;
use crate::telegram::notifier::{Notifier, OutgoingMessage};
use crate::telegram::update::{Inbound, WebhookUpdate};
use crate::time_utils::TimeUtils;

/// Collaborators shared by every handler for the lifetime of the process.
pub struct BotContext {
    pub repo: StateRepository,
    pub notifier: Arc<dyn Notifier>,
    pub journal: TripJournal,
    pub config: Arc<BotConfig>,
    pub time: TimeUtils,
    pub bot_username: String,
}

impl BotContext {
    /// Delivery failures are logged and dropped.
    pub async fn send(&self, chat_id: ChatId, message: OutgoingMessage) {
        if let Err(e) = self.notifier.send(chat_id, message).await {
            warn!(chat_id = %chat_id, error = %e, "Failed to deliver message");
            record_counter("bot_delivery_failures_total", 1);
        }
    }

    pub async fn load_state(&self, user_id: UserId) -> ConversationState {
        self.repo.get_state(user_id).await.unwrap_or_else(|e| {
            error!(user_id = %user_id, error = %e, "Failed to load state, treating as idle");
            ConversationState::Idle
        })
    }

    pub async fn load_user(&self, user_id: UserId) -> Option<User> {
        self.repo.get_user(user_id).await.unwrap_or_else(|e| {
            error!(user_id = %user_id, error = %e, "Failed to load user, treating as unregistered");
            None
        })
    }

    pub async fn set_state(&self, user_id: UserId, state: &ConversationState) {
        if let Err(e) = self.repo.set_state(user_id, state).await {
            error!(user_id = %user_id, state = state.name(), error = %e, "Failed to store state");
        }
    }

    pub async fn clear_state(&self, user_id: UserId) {
        if let Err(e) = self.repo.clear_state(user_id).await {
            error!(user_id = %user_id, error = %e, "Failed to clear state");
        }
    }
}

/// Routes one inbound update to its handler. Never fails outward.
pub struct Dispatcher {
    ctx: BotContext,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
        sheet: Arc<dyn Spreadsheet>,
        config: Arc<BotConfig>,
        bot_username: impl Into<String>,
    ) -> Result<Self> {
        let time = TimeUtils::new(&config.timezone)?;

        Ok(Self {
            ctx: BotContext {
                repo: StateRepository::new(store),
                notifier,
                journal: TripJournal::new(sheet),
                config,
                time,
                bot_username: bot_username.into(),
            },
        })
    }

    /// Parses a raw webhook body and handles it. Unusable bodies are logged and dropped.
    pub async fn handle_webhook_body(&self, body: &[u8]) {
        let update: WebhookUpdate = match serde_json::from_slice(body) {
            Ok(update) => update,
            Err(e) => {
                warn!(error = %e, "Malformed webhook body");
                record_counter("bot_updates_ignored_total", 1);
                return;
            }
        };

        match Inbound::try_from(update) {
            Ok(inbound) => self.handle(inbound).await,
            Err(e) => {
                debug!(error = %e, "Ignoring update");
                record_counter("bot_updates_ignored_total", 1);
            }
        }
    }

    pub async fn handle(&self, inbound: Inbound) {
        let started = Instant::now();
        record_counter("bot_updates_total", 1);

        let user_id = inbound.user_id();
        let chat_id = inbound.chat_id();

        let result = match inbound {
            Inbound::Message { text, .. } => self.handle_message(chat_id, user_id, &text).await,
            Inbound::ButtonPress { data, press_id, .. } => {
                self.handle_button(chat_id, user_id, &data, &press_id).await
            }
        };

        if let Err(e) = result {
            error!(user_id = %user_id, chat_id = %chat_id, kind = e.kind(), error = %e, "Update handler failed");
        }

        record_timing("bot_update_duration_seconds", started.elapsed().as_secs_f64());
    }

    async fn handle_message(&self, chat_id: ChatId, user_id: UserId, text: &str) -> Result<()> {
        let ctx = &self.ctx;

        if let Some(command) = Command::parse_text(text, &ctx.bot_username) {
            info!(user_id = %user_id, command = ?command, "Command received");
            return self.handle_command(chat_id, user_id, command).await;
        }

        let state = ctx.load_state(user_id).await;
        debug!(user_id = %user_id, state = state.name(), "Text input");

        match state {
            ConversationState::Idle => handlers::handle_unrecognized_text(ctx, chat_id, user_id).await,
            ConversationState::WaitingRegistration => {
                handlers::handle_registration_input(ctx, chat_id, user_id, text).await
            }
            ConversationState::WaitingStartTime => {
                let start_time = ctx.time.parse_input(text);
                handlers::handle_start_time(ctx, chat_id, user_id, start_time).await
            }
            ConversationState::WaitingOdometerStart { start_time } => {
                handlers::handle_odometer_start_input(ctx, chat_id, user_id, start_time, text).await
            }
            ConversationState::WaitingEndTime {
                start_time,
                odometer_start,
            } => {
                let end_time = ctx.time.parse_input(text);
                handlers::handle_end_time(ctx, chat_id, user_id, start_time, odometer_start, end_time)
                    .await
            }
            ConversationState::WaitingOdometerEnd {
                start_time,
                end_time,
                odometer_start,
            } => {
                handlers::handle_odometer_end_input(
                    ctx,
                    chat_id,
                    user_id,
                    start_time,
                    end_time,
                    odometer_start,
                    text,
                )
                .await
            }
            ConversationState::WaitingProject { draft } => {
                handlers::handle_project(ctx, chat_id, user_id, draft, text.trim().to_string()).await
            }
            ConversationState::WaitingAddress { draft, project } => {
                handlers::handle_address(ctx, chat_id, user_id, draft, project, text.trim().to_string())
                    .await
            }
            ConversationState::WaitingComment {
                draft,
                project,
                address,
            } => {
                handlers::handle_comment_input(
                    ctx,
                    chat_id,
                    user_id,
                    draft,
                    project,
                    address,
                    text.trim().to_string(),
                )
                .await
            }
            ConversationState::EditingField { entry, field, .. } => {
                handlers::handle_edit_field_input(ctx, chat_id, user_id, entry, field, text).await
            }
            state @ (ConversationState::WaitingConfirmation { .. }
            | ConversationState::EditingEntry { .. }) => {
                handlers::handle_buttons_expected(ctx, chat_id, &state).await
            }
        }
    }

    async fn handle_command(&self, chat_id: ChatId, user_id: UserId, command: Command) -> Result<()> {
        let ctx = &self.ctx;

        match command {
            Command::Start => handlers::handle_start(ctx, chat_id, user_id).await,
            Command::New => handlers::handle_new_entry(ctx, chat_id, user_id).await,
            Command::Last => handlers::handle_last_entries(ctx, chat_id).await,
            Command::EditLast => handlers::handle_edit_last(ctx, chat_id, user_id).await,
            Command::Help => handlers::handle_help(ctx, chat_id).await,
            Command::Export => handlers::handle_export(ctx, chat_id, user_id).await,
            Command::Cancel => handlers::handle_cancel(ctx, chat_id, user_id).await,
        }
    }

    async fn handle_button(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        data: &str,
        press_id: &str,
    ) -> Result<()> {
        let ctx = &self.ctx;

        if let Err(e) = ctx.notifier.acknowledge(press_id, None).await {
            warn!(user_id = %user_id, error = %e, "Failed to acknowledge button press");
            record_counter("bot_delivery_failures_total", 1);
        }

        let Ok(action) = data.parse::<ButtonAction>() else {
            debug!(user_id = %user_id, data = data, "Unknown button data");
            record_counter("bot_updates_ignored_total", 1);
            return Ok(());
        };

        debug!(user_id = %user_id, action = action.as_str(), "Button pressed");

        match action {
            ButtonAction::NewEntry => return handlers::handle_new_entry(ctx, chat_id, user_id).await,
            ButtonAction::Cancel => return handlers::handle_cancel(ctx, chat_id, user_id).await,
            ButtonAction::MainMenu => return handlers::handle_main_menu(ctx, chat_id, user_id).await,
            ButtonAction::LastEntries => return handlers::handle_last_entries(ctx, chat_id).await,
            ButtonAction::EditLast => return handlers::handle_edit_last(ctx, chat_id, user_id).await,
            ButtonAction::Help => return handlers::handle_help(ctx, chat_id).await,
            ButtonAction::Export => return handlers::handle_export(ctx, chat_id, user_id).await,
            _ => {}
        }

        let state = ctx.load_state(user_id).await;
        let state_name = state.name();

        match (action, state) {
            (ButtonAction::TimeNow, ConversationState::WaitingStartTime) => {
                handlers::handle_start_time(ctx, chat_id, user_id, Some(ctx.time.now())).await
            }
            (ButtonAction::TimeManual, ConversationState::WaitingStartTime) => {
                handlers::handle_manual_time_prompt(ctx, chat_id).await
            }
            (
                ButtonAction::EndTimeNow,
                ConversationState::WaitingEndTime {
                    start_time,
                    odometer_start,
                },
            ) => {
                let now = Some(ctx.time.now());
                handlers::handle_end_time(ctx, chat_id, user_id, start_time, odometer_start, now).await
            }
            (ButtonAction::EndTimeManual, ConversationState::WaitingEndTime { .. }) => {
                handlers::handle_manual_time_prompt(ctx, chat_id).await
            }
            (ButtonAction::SkipProject, ConversationState::WaitingProject { draft }) => {
                handlers::handle_project(ctx, chat_id, user_id, draft, String::new()).await
            }
            (ButtonAction::SkipAddress, ConversationState::WaitingAddress { draft, project }) => {
                handlers::handle_address(ctx, chat_id, user_id, draft, project, String::new()).await
            }
            (
                ButtonAction::ConfirmSave,
                ConversationState::WaitingConfirmation {
                    draft,
                    project,
                    address,
                    comment,
                },
            ) => {
                handlers::handle_confirm_save(ctx, chat_id, user_id, draft, project, address, comment)
                    .await
            }
            (
                ButtonAction::GoBack,
                ConversationState::WaitingConfirmation {
                    draft,
                    project,
                    address,
                    ..
                },
            ) => handlers::handle_go_back(ctx, chat_id, user_id, draft, project, address).await,
            (ButtonAction::EditProject, ConversationState::EditingEntry { row_number, entry }) => {
                handlers::handle_edit_field_choice(ctx, chat_id, user_id, row_number, entry, EntryField::Project)
                    .await
            }
            (ButtonAction::EditAddress, ConversationState::EditingEntry { row_number, entry }) => {
                handlers::handle_edit_field_choice(ctx, chat_id, user_id, row_number, entry, EntryField::Address)
                    .await
            }
            (ButtonAction::EditComment, ConversationState::EditingEntry { row_number, entry }) => {
                handlers::handle_edit_field_choice(ctx, chat_id, user_id, row_number, entry, EntryField::Comment)
                    .await
            }
            (action, _) => {
                debug!(
                    user_id = %user_id,
                    action = action.as_str(),
                    state = state_name,
                    "Button does not apply to current state"
                );
                record_counter("bot_updates_ignored_total", 1);
                Ok(())
            }
        }
    }
}
