use std::str::FromStr;
use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "Available commands:")]
pub enum Command {
    #[command(description = "Register and open the main menu")]
    Start,
    #[command(description = "Create a new trip entry")]
    New,
    #[command(description = "Show recent entries")]
    Last,
    #[command(description = "Edit your last entry")]
    EditLast,
    #[command(description = "Show this help")]
    Help,
    #[command(description = "Administrator statistics")]
    Export,
    #[command(description = "Cancel the current input")]
    Cancel,
}

impl Command {
    pub fn parse_text(text: &str, bot_username: &str) -> Option<Self> {
        if !text.starts_with('/') {
            return None;
        }
        <Command as BotCommands>::parse(text, bot_username).ok()
    }
}

/// Callback data carried by inline buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    NewEntry,
    TimeNow,
    TimeManual,
    EndTimeNow,
    EndTimeManual,
    SkipProject,
    SkipAddress,
    ConfirmSave,
    GoBack,
    Cancel,
    MainMenu,
    LastEntries,
    EditLast,
    Help,
    Export,
    EditProject,
    EditAddress,
    EditComment,
}

impl ButtonAction {
    const ALL: [ButtonAction; 18] = [
        ButtonAction::NewEntry,
        ButtonAction::TimeNow,
        ButtonAction::TimeManual,
        ButtonAction::EndTimeNow,
        ButtonAction::EndTimeManual,
        ButtonAction::SkipProject,
        ButtonAction::SkipAddress,
        ButtonAction::ConfirmSave,
        ButtonAction::GoBack,
        ButtonAction::Cancel,
        ButtonAction::MainMenu,
        ButtonAction::LastEntries,
        ButtonAction::EditLast,
        ButtonAction::Help,
        ButtonAction::Export,
        ButtonAction::EditProject,
        ButtonAction::EditAddress,
        ButtonAction::EditComment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonAction::NewEntry => "new_entry",
            ButtonAction::TimeNow => "time_now",
            ButtonAction::TimeManual => "time_manual",
            ButtonAction::EndTimeNow => "end_time_now",
            ButtonAction::EndTimeManual => "end_time_manual",
            ButtonAction::SkipProject => "skip_project",
            ButtonAction::SkipAddress => "skip_address",
            ButtonAction::ConfirmSave => "confirm_save",
            ButtonAction::GoBack => "go_back",
            ButtonAction::Cancel => "cancel",
            ButtonAction::MainMenu => "main_menu",
            ButtonAction::LastEntries => "last_entries",
            ButtonAction::EditLast => "edit_last",
            ButtonAction::Help => "help",
            ButtonAction::Export => "export",
            ButtonAction::EditProject => "edit_project",
            ButtonAction::EditAddress => "edit_address",
            ButtonAction::EditComment => "edit_comment",
        }
    }
}

impl FromStr for ButtonAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ButtonAction::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or(())
    }
}
