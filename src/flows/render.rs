use std::fmt::Write;

use crate::models::Profile;

use super::registration::Draft;

pub fn profile_card(profile: &Profile) -> String {
    format!("{}, {}, {}\n\n{}", profile.name, profile.age, profile.city.trim(), profile.description)
}

pub fn draft_review(draft: &Draft) -> String {
    fn field<T: ToString>(value: &Option<T>) -> String {
        value.as_ref().map(T::to_string).unwrap_or_default()
    }

    let mut out = String::new();
    let _ = writeln!(out, "Name: {}", field(&draft.name));
    let _ = writeln!(out, "Age: {}", field(&draft.age));
    let _ = writeln!(out, "City: {}", field(&draft.city));
    let _ = writeln!(out, "Gender: {}", field(&draft.gender));
    let _ = writeln!(out, "Looking for: {}", field(&draft.looking_for));
    let _ = writeln!(
        out,
        "Age range: {} - {}",
        field(&draft.looking_age_min),
        field(&draft.looking_age_max)
    );
    let _ = write!(out, "About: {}", field(&draft.description));
    out
}

pub fn match_list(matches: &[Profile]) -> String {
    if matches.is_empty() {
        return "No matches yet. Keep browsing!".to_owned();
    }

    let mut out = String::from("Your matches:");
    for profile in matches {
        let _ = write!(out, "\n- {}, {}, {}", profile.name, profile.age, profile.city.trim());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::Gender, testing::profile};

    #[test]
    fn review_lists_every_field() {
        let draft = Draft {
            name: Some("Alice".into()),
            age: Some(25),
            city: Some("Paris".into()),
            gender: Some(Gender::Female),
            looking_for: Some(crate::models::LookingFor::NoPreference),
            looking_age_min: Some(20),
            looking_age_max: Some(30),
            description: Some("hi".into()),
            photo: Some("f".into()),
        };
        let text = draft_review(&draft);
        assert!(text.contains("Name: Alice"));
        assert!(text.contains("Looking for: Doesn't matter"));
        assert!(text.contains("Age range: 20 - 30"));
        assert!(text.ends_with("About: hi"));
    }

    #[test]
    fn match_list_names_everyone() {
        let text = match_list(&[profile(1).named("Bob").build(), profile(2).named("Eve").build()]);
        assert!(text.contains("Bob, 25, Paris"));
        assert!(text.contains("Eve"));
        assert_eq!(match_list(&[]), "No matches yet. Keep browsing!");
    }
}
