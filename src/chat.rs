use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{AppResult, models::UserId};

pub const CANCEL: &str = "Cancel";
pub const START: &str = "Start";

pub const LIKE: &str = "Like";
pub const SKIP: &str = "Skip";
pub const MENU: &str = "Menu";
pub const RESET_SEARCH: &str = "Reset search";

pub const COMMIT: &str = "Start searching";
pub const EDIT: &str = "Change my profile";

pub const CONTINUE_BROWSING: &str = "Continue browsing";
pub const MY_MATCHES: &str = "My matches";
pub const EDIT_PROFILE: &str = "Edit profile";
pub const DEACTIVATE: &str = "Deactivate account";
pub const ACTIVATE: &str = "Activate account";

/// What a user sent us.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Input {
    Text(String),
    /// Opaque attachment token issued by the transport.
    Image(String),
    /// A slash command, stored without the slash.
    Command(String),
}

impl Input {
    pub fn text(&self) -> Option<&str> {
        match self {
            Input::Text(text) => Some(text.trim()),
            _ => None,
        }
    }

    pub fn is_command(&self, name: &str) -> bool {
        matches!(self, Input::Command(command) if command.trim_start_matches('/').eq_ignore_ascii_case(name))
    }

    pub fn is_cancel(&self) -> bool {
        self.text() == Some(CANCEL) || self.is_command("cancel")
    }

    pub fn is_choice(&self, label: &str) -> bool {
        self.text() == Some(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub session: UserId,
    pub input: Input,
}

/// Quick-reply sets offered alongside a message. The transport decides how to draw them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceSet {
    None,
    /// Leave whatever quick replies the user already has.
    Keep,
    Start,
    Cancel,
    Gender,
    LookingFor,
    Confirm,
    Deciding,
    Exhausted,
    Menu { active: bool },
}

impl ChoiceSet {
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            ChoiceSet::None | ChoiceSet::Keep => &[],
            ChoiceSet::Start => &[START],
            ChoiceSet::Cancel => &[CANCEL],
            ChoiceSet::Gender => &["Male", "Female", CANCEL],
            ChoiceSet::LookingFor => &["Male", "Female", "Doesn't matter", CANCEL],
            ChoiceSet::Confirm => &[COMMIT, EDIT],
            ChoiceSet::Deciding => &[LIKE, SKIP, MENU],
            ChoiceSet::Exhausted => &[RESET_SEARCH, MENU],
            ChoiceSet::Menu { active: true } => &[CONTINUE_BROWSING, MY_MATCHES, EDIT_PROFILE, DEACTIVATE],
            ChoiceSet::Menu { active: false } => &[ACTIVATE, MY_MATCHES, EDIT_PROFILE],
        }
    }
}

/// Outbound half of the chat platform.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    async fn send_text(&self, session: UserId, text: &str, choices: ChoiceSet) -> AppResult<()>;

    async fn send_image(&self, session: UserId, image_ref: &str, choices: ChoiceSet) -> AppResult<()>;
}
