use thiserror::Error;
use time::OffsetDateTime;

use crate::{
    chat::{ChoiceSet, COMMIT, EDIT, Input},
    models::{Gender, LookingFor, MAX_AGE, MIN_AGE, Profile, UserId},
};

const MAX_NAME_LEN: usize = 64;
const MAX_DESCRIPTION_LEN: usize = 1000;
const MAX_LOOKING_AGE_MIN: u32 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Name,
    Age,
    City,
    Gender,
    LookingFor,
    LookingAgeMin,
    LookingAgeMax,
    Description,
    Photo,
    Confirm,
}

impl Step {
    pub fn prompt(&self) -> (&'static str, ChoiceSet) {
        match self {
            Step::Name => ("Hi! Let's find your soulmate! What's your name?", ChoiceSet::Cancel),
            Step::Age => ("How old are you?", ChoiceSet::Cancel),
            Step::City => ("What city are you in?", ChoiceSet::Cancel),
            Step::Gender => ("Please, specify your gender:", ChoiceSet::Gender),
            Step::LookingFor => ("What gender could your soulmate be?", ChoiceSet::LookingFor),
            Step::LookingAgeMin => ("What is the minimum age of your potential soulmate?", ChoiceSet::Cancel),
            Step::LookingAgeMax => ("Great! And what is the maximum age you're looking for?", ChoiceSet::Cancel),
            Step::Description => (
                "We're almost done! Write a few words about yourself and what you're looking for here.",
                ChoiceSet::Cancel,
            ),
            Step::Photo => ("Nice! Last step, could you send a photo of yourself?", ChoiceSet::Cancel),
            Step::Confirm => (
                "Now you can start searching, or change something by restarting registration.",
                ChoiceSet::Confirm,
            ),
        }
    }
}

/// Rejected input. The message is shown to the user before the step is asked again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please answer with a text message.")]
    NotText,
    #[error("This can't be empty.")]
    Empty,
    #[error("That's too long, please keep it under {0} characters.")]
    TooLong(usize),
    #[error("Please input only numbers.")]
    NotANumber,
    #[error("You must be at least 18 years old.")]
    TooYoung,
    #[error("Enter your real age.")]
    TooOld,
    #[error("Please select your gender using the buttons provided.")]
    UnknownGender,
    #[error("Please select your preferences using the buttons provided.")]
    UnknownPreference,
    #[error("Minimum age must be at least 18.")]
    MinTooLow,
    #[error("Please enter a realistic minimum age.")]
    MinTooHigh,
    #[error("Maximum age must be greater than your minimum of {0}.")]
    MaxNotAboveMin(u32),
    #[error("Please enter a realistic maximum age.")]
    MaxTooHigh,
    #[error("Please send a photo.")]
    NotAPhoto,
    #[error("Please use the buttons provided.")]
    UnknownChoice,
}

/// A profile under construction. Every field is validated before it is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub city: Option<String>,
    pub gender: Option<Gender>,
    pub looking_for: Option<LookingFor>,
    pub looking_age_min: Option<u32>,
    pub looking_age_max: Option<u32>,
    pub description: Option<String>,
    pub photo: Option<String>,
}

impl Draft {
    /// `None` until every step has been answered.
    fn finish(&self, user_id: UserId, created_at: OffsetDateTime) -> Option<Profile> {
        Some(Profile {
            user_id,
            name: self.name.clone()?,
            age: self.age?,
            city: self.city.clone()?,
            gender: self.gender?,
            looking_for: self.looking_for?,
            looking_age_min: self.looking_age_min?,
            looking_age_max: self.looking_age_max?,
            description: self.description.clone()?,
            photo: self.photo.clone()?,
            active: true,
            created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Moved to the next step; ask its question.
    Advanced,
    /// Input refused; the step did not change.
    Rejected(ValidationError),
    /// Every field is filled; show the draft and ask for confirmation.
    Review,
    /// The user confirmed. The flow stays at `Confirm` until the caller has stored it.
    Commit(Profile),
    /// Back to `Name` with an empty draft.
    Restarted,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    user_id: UserId,
    step: Step,
    draft: Draft,
}

impl Registration {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            step: Step::Name,
            draft: Draft::default(),
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn advance(&mut self, input: &Input) -> Transition {
        if input.is_cancel() {
            self.draft = Draft::default();
            return Transition::Cancelled;
        }

        match self.accept(input) {
            Ok(Some(transition)) => transition,
            Ok(None) => {
                self.step = self.next_step();
                if self.step == Step::Confirm {
                    Transition::Review
                } else {
                    Transition::Advanced
                }
            }
            Err(err) => Transition::Rejected(err),
        }
    }

    fn next_step(&self) -> Step {
        match self.step {
            Step::Name => Step::Age,
            Step::Age => Step::City,
            Step::City => Step::Gender,
            Step::Gender => Step::LookingFor,
            Step::LookingFor => Step::LookingAgeMin,
            Step::LookingAgeMin => Step::LookingAgeMax,
            Step::LookingAgeMax => Step::Description,
            Step::Description => Step::Photo,
            Step::Photo | Step::Confirm => Step::Confirm,
        }
    }

    /// Stores the answer for the current step. `Ok(None)` means move on.
    fn accept(&mut self, input: &Input) -> Result<Option<Transition>, ValidationError> {
        let draft = &mut self.draft;
        match self.step {
            Step::Name => draft.name = Some(free_text(input, MAX_NAME_LEN)?),
            Step::Age => {
                let age = number(input)?;
                if age < MIN_AGE {
                    return Err(ValidationError::TooYoung);
                }
                if age > MAX_AGE {
                    return Err(ValidationError::TooOld);
                }
                draft.age = Some(age);
            }
            Step::City => draft.city = Some(free_text(input, MAX_NAME_LEN)?),
            Step::Gender => {
                let gender = text(input)?.parse().map_err(|_| ValidationError::UnknownGender)?;
                draft.gender = Some(gender);
            }
            Step::LookingFor => {
                let looking_for = text(input)?.parse().map_err(|_| ValidationError::UnknownPreference)?;
                draft.looking_for = Some(looking_for);
            }
            Step::LookingAgeMin => {
                let min = number(input)?;
                if min < MIN_AGE {
                    return Err(ValidationError::MinTooLow);
                }
                if min > MAX_LOOKING_AGE_MIN {
                    return Err(ValidationError::MinTooHigh);
                }
                draft.looking_age_min = Some(min);
            }
            Step::LookingAgeMax => {
                let min = draft.looking_age_min.unwrap_or(MIN_AGE);
                let max = number(input)?;
                if max <= min {
                    return Err(ValidationError::MaxNotAboveMin(min));
                }
                if max > MAX_AGE {
                    return Err(ValidationError::MaxTooHigh);
                }
                draft.looking_age_max = Some(max);
            }
            Step::Description => draft.description = Some(free_text(input, MAX_DESCRIPTION_LEN)?),
            Step::Photo => match input {
                Input::Image(token) => draft.photo = Some(token.clone()),
                _ => return Err(ValidationError::NotAPhoto),
            },
            Step::Confirm => {
                if input.is_choice(COMMIT) {
                    return match draft.finish(self.user_id, OffsetDateTime::now_utc()) {
                        Some(profile) => Ok(Some(Transition::Commit(profile))),
                        None => {
                            // a partial draft never reaches the store
                            self.restart();
                            Ok(Some(Transition::Restarted))
                        }
                    };
                }
                if input.is_choice(EDIT) {
                    self.restart();
                    return Ok(Some(Transition::Restarted));
                }
                return Err(ValidationError::UnknownChoice);
            }
        }
        Ok(None)
    }

    fn restart(&mut self) {
        self.step = Step::Name;
        self.draft = Draft::default();
    }
}

fn text(input: &Input) -> Result<&str, ValidationError> {
    input.text().ok_or(ValidationError::NotText)
}

fn free_text(input: &Input, max_len: usize) -> Result<String, ValidationError> {
    let text = text(input)?;
    if text.is_empty() {
        return Err(ValidationError::Empty);
    }
    if text.chars().count() > max_len {
        return Err(ValidationError::TooLong(max_len));
    }
    Ok(text.to_owned())
}

fn number(input: &Input) -> Result<u32, ValidationError> {
    text(input)?.parse().map_err(|_| ValidationError::NotANumber)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn say(text: &str) -> Input {
        Input::Text(text.to_owned())
    }

    /// Walks a fresh registration up to (not including) `stop`.
    fn filled_until(stop: Step) -> Registration {
        let answers = [
            (Step::Name, say("Alice")),
            (Step::Age, say("25")),
            (Step::City, say("Paris")),
            (Step::Gender, say("Female")),
            (Step::LookingFor, say("Male")),
            (Step::LookingAgeMin, say("25")),
            (Step::LookingAgeMax, say("35")),
            (Step::Description, say("I like hiking")),
            (Step::Photo, Input::Image("file-1".into())),
        ];
        let mut registration = Registration::new(1);
        for (step, answer) in answers {
            if step == stop {
                break;
            }
            assert_eq!(registration.step(), step);
            let transition = registration.advance(&answer);
            assert!(matches!(transition, Transition::Advanced | Transition::Review), "{transition:?}");
        }
        registration
    }

    #[test]
    fn full_walk_commits_a_profile() {
        let mut registration = filled_until(Step::Confirm);
        assert_eq!(registration.step(), Step::Confirm);

        let Transition::Commit(profile) = registration.advance(&say(COMMIT)) else {
            panic!("expected a commit");
        };
        assert_eq!(profile.user_id, 1);
        assert_eq!(profile.name, "Alice");
        assert_eq!(profile.age, 25);
        assert_eq!(profile.gender, Gender::Female);
        assert_eq!(profile.looking_for, LookingFor::Male);
        assert_eq!((profile.looking_age_min, profile.looking_age_max), (25, 35));
        assert_eq!(profile.photo, "file-1");
        assert!(profile.active);
        assert_eq!(registration.step(), Step::Confirm);
    }

    #[test]
    fn age_must_be_adult_and_plausible() {
        let mut registration = filled_until(Step::Age);
        for (input, err) in [
            ("seventeen", ValidationError::NotANumber),
            ("17", ValidationError::TooYoung),
            ("121", ValidationError::TooOld),
            ("-3", ValidationError::NotANumber),
        ] {
            assert_eq!(registration.advance(&say(input)), Transition::Rejected(err));
            assert_eq!(registration.step(), Step::Age);
        }
        assert_eq!(registration.advance(&say("18")), Transition::Advanced);
        assert_eq!(registration.draft().age, Some(18));
    }

    #[test]
    fn max_age_must_exceed_min_age() {
        let mut registration = filled_until(Step::LookingAgeMax);
        assert_eq!(registration.draft().looking_age_min, Some(25));

        assert_eq!(
            registration.advance(&say("18")),
            Transition::Rejected(ValidationError::MaxNotAboveMin(25))
        );
        assert_eq!(
            registration.advance(&say("25")),
            Transition::Rejected(ValidationError::MaxNotAboveMin(25))
        );
        assert_eq!(registration.advance(&say("121")), Transition::Rejected(ValidationError::MaxTooHigh));
        assert_eq!(registration.step(), Step::LookingAgeMax);
        assert_eq!(registration.draft().looking_age_max, None);

        assert_eq!(registration.advance(&say("26")), Transition::Advanced);
    }

    #[test]
    fn min_age_bounds() {
        let mut registration = filled_until(Step::LookingAgeMin);
        assert_eq!(registration.advance(&say("17")), Transition::Rejected(ValidationError::MinTooLow));
        assert_eq!(registration.advance(&say("100")), Transition::Rejected(ValidationError::MinTooHigh));
        assert_eq!(registration.advance(&say("99")), Transition::Advanced);
    }

    #[test]
    fn genders_come_from_the_fixed_set() {
        let mut registration = filled_until(Step::Gender);
        assert_eq!(registration.advance(&say("Robot")), Transition::Rejected(ValidationError::UnknownGender));
        assert_eq!(
            registration.advance(&say("Doesn't matter")),
            Transition::Rejected(ValidationError::UnknownGender)
        );
        assert_eq!(registration.advance(&say("Male")), Transition::Advanced);

        assert_eq!(
            registration.advance(&say("Robot")),
            Transition::Rejected(ValidationError::UnknownPreference)
        );
        assert_eq!(registration.advance(&say("Doesn't matter")), Transition::Advanced);
        assert_eq!(registration.draft().looking_for, Some(LookingFor::NoPreference));
    }

    #[test]
    fn photo_step_needs_an_attachment() {
        let mut registration = filled_until(Step::Photo);
        assert_eq!(registration.advance(&say("here you go")), Transition::Rejected(ValidationError::NotAPhoto));
        assert_eq!(registration.step(), Step::Photo);
        assert_eq!(registration.advance(&Input::Image("f".into())), Transition::Review);
    }

    #[test]
    fn text_steps_refuse_attachments_and_blanks() {
        let mut registration = Registration::new(1);
        assert_eq!(registration.advance(&Input::Image("f".into())), Transition::Rejected(ValidationError::NotText));
        assert_eq!(registration.advance(&say("   ")), Transition::Rejected(ValidationError::Empty));
        assert_eq!(
            registration.advance(&say(&"x".repeat(65))),
            Transition::Rejected(ValidationError::TooLong(64))
        );
        assert_eq!(registration.step(), Step::Name);
    }

    #[test]
    fn cancel_discards_the_draft_from_any_step() {
        let mut registration = filled_until(Step::City);
        assert_eq!(registration.advance(&say("Cancel")), Transition::Cancelled);
        assert_eq!(registration.draft(), &Draft::default());

        let mut registration = filled_until(Step::Confirm);
        assert_eq!(registration.advance(&Input::Command("cancel".into())), Transition::Cancelled);
    }

    #[test]
    fn edit_at_confirm_restarts_from_scratch() {
        let mut registration = filled_until(Step::Confirm);
        assert_eq!(registration.advance(&say(EDIT)), Transition::Restarted);
        assert_eq!(registration.step(), Step::Name);
        assert_eq!(registration.draft(), &Draft::default());
    }

    #[test]
    fn confirm_wants_a_button() {
        let mut registration = filled_until(Step::Confirm);
        assert_eq!(registration.advance(&say("yes")), Transition::Rejected(ValidationError::UnknownChoice));
        assert_eq!(registration.step(), Step::Confirm);
    }
}
