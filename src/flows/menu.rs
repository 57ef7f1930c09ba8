use crate::chat::{ACTIVATE, CONTINUE_BROWSING, ChoiceSet, DEACTIVATE, EDIT_PROFILE, Input, MY_MATCHES};

pub const PROMPT: &str = "What would you like to do?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    ContinueBrowsing,
    Matches,
    EditProfile,
    Deactivate,
    Activate,
}

pub fn choices(active: bool) -> ChoiceSet {
    ChoiceSet::Menu { active }
}

/// Only entries offered for the current activation state are accepted.
pub fn parse(input: &Input, active: bool) -> Option<MenuChoice> {
    let choice = [
        (CONTINUE_BROWSING, MenuChoice::ContinueBrowsing),
        (MY_MATCHES, MenuChoice::Matches),
        (EDIT_PROFILE, MenuChoice::EditProfile),
        (DEACTIVATE, MenuChoice::Deactivate),
        (ACTIVATE, MenuChoice::Activate),
    ]
    .into_iter()
    .find(|(label, _)| input.is_choice(label))
    .map(|(_, choice)| choice)?;

    choices(active).labels().iter().any(|label| input.is_choice(label)).then_some(choice)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn say(text: &str) -> Input {
        Input::Text(text.to_owned())
    }

    #[test]
    fn active_menu() {
        assert_eq!(parse(&say(CONTINUE_BROWSING), true), Some(MenuChoice::ContinueBrowsing));
        assert_eq!(parse(&say(DEACTIVATE), true), Some(MenuChoice::Deactivate));
        assert_eq!(parse(&say(ACTIVATE), true), None);
        assert_eq!(parse(&say("dance"), true), None);
    }

    #[test]
    fn inactive_menu() {
        assert_eq!(parse(&say(ACTIVATE), false), Some(MenuChoice::Activate));
        assert_eq!(parse(&say(EDIT_PROFILE), false), Some(MenuChoice::EditProfile));
        assert_eq!(parse(&say(MY_MATCHES), false), Some(MenuChoice::Matches));
        assert_eq!(parse(&say(CONTINUE_BROWSING), false), None);
        assert_eq!(parse(&say(DEACTIVATE), false), None);
    }
}
