use crate::{
    AppResult,
    chat::{ChoiceSet, Input, LIKE, MENU, RESET_SEARCH, SKIP},
    engine::MatchEngine,
    models::{Profile, UserId},
};

/// Where a browsing session rests between messages. Fetching is not a resting
/// state: it runs to completion inside [`Browsing::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Browsing {
    /// One candidate on screen, waiting for like, skip or menu.
    Deciding(Profile),
    /// Nothing left this cycle.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseAction {
    Like(UserId),
    Skip(UserId),
    ResetSearch,
    Menu,
    Unrecognized,
}

impl Browsing {
    pub async fn fetch(engine: &MatchEngine, requester: UserId) -> AppResult<Browsing> {
        Ok(engine
            .find_candidates(requester, 1)
            .await?
            .into_iter()
            .next()
            .map_or(Browsing::Exhausted, Browsing::Deciding))
    }

    pub fn choices(&self) -> ChoiceSet {
        match self {
            Browsing::Deciding(_) => ChoiceSet::Deciding,
            Browsing::Exhausted => ChoiceSet::Exhausted,
        }
    }

    pub fn decide(&self, input: &Input) -> BrowseAction {
        if input.is_choice(MENU) || input.is_command("menu") {
            return BrowseAction::Menu;
        }
        match self {
            Browsing::Deciding(candidate) if input.is_choice(LIKE) => BrowseAction::Like(candidate.user_id),
            Browsing::Deciding(candidate) if input.is_choice(SKIP) => BrowseAction::Skip(candidate.user_id),
            Browsing::Exhausted if input.is_choice(RESET_SEARCH) => BrowseAction::ResetSearch,
            _ => BrowseAction::Unrecognized,
        }
    }
}
