//! Builders and doubles shared by the unit tests.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::{
    AppError, AppResult,
    chat::{ChatChannel, ChoiceSet},
    engine::MatchEngine,
    models::{Gender, LookingFor, Profile, UserId},
    store::{InteractionLedger, ProfileStore},
};

pub(crate) fn engine(db_pool: SqlitePool, seed: u64) -> MatchEngine {
    MatchEngine::with_seed(
        ProfileStore::new(db_pool.clone()),
        InteractionLedger::new(db_pool),
        Some(seed),
    )
}

pub(crate) struct ProfileBuilder(Profile);

/// A 25 year old in Paris, open to anyone 18..=120.
pub(crate) fn profile(user_id: UserId) -> ProfileBuilder {
    ProfileBuilder(Profile {
        user_id,
        name: format!("user{user_id}"),
        age: 25,
        city: "Paris".to_owned(),
        gender: Gender::Female,
        looking_for: LookingFor::NoPreference,
        looking_age_min: 18,
        looking_age_max: 120,
        description: "hello".to_owned(),
        photo: format!("photo-{user_id}"),
        active: true,
        created_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
    })
}

impl ProfileBuilder {
    pub(crate) fn named(mut self, name: &str) -> Self {
        self.0.name = name.to_owned();
        self
    }

    pub(crate) fn age(mut self, age: u32) -> Self {
        self.0.age = age;
        self
    }

    pub(crate) fn city(mut self, city: &str) -> Self {
        self.0.city = city.to_owned();
        self
    }

    pub(crate) fn gender(mut self, gender: Gender) -> Self {
        self.0.gender = gender;
        self
    }

    pub(crate) fn looking_for(mut self, looking_for: LookingFor) -> Self {
        self.0.looking_for = looking_for;
        self
    }

    pub(crate) fn ages(mut self, min: u32, max: u32) -> Self {
        self.0.looking_age_min = min;
        self.0.looking_age_max = max;
        self
    }

    pub(crate) fn active(mut self, active: bool) -> Self {
        self.0.active = active;
        self
    }

    pub(crate) fn build(self) -> Profile {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Sent {
    Text { to: UserId, text: String, choices: ChoiceSet },
    Image { to: UserId, image: String, choices: ChoiceSet },
}

impl Sent {
    pub(crate) fn to(&self) -> UserId {
        match self {
            Sent::Text { to, .. } | Sent::Image { to, .. } => *to,
        }
    }

    pub(crate) fn choices(&self) -> ChoiceSet {
        match self {
            Sent::Text { choices, .. } | Sent::Image { choices, .. } => *choices,
        }
    }

    pub(crate) fn text(&self) -> Option<&str> {
        match self {
            Sent::Text { text, .. } => Some(text),
            Sent::Image { .. } => None,
        }
    }
}

/// Keeps every outbound message for later inspection.
#[derive(Default)]
pub(crate) struct RecordingChannel {
    sent: Mutex<Vec<Sent>>,
    failing: AtomicBool,
}

impl RecordingChannel {
    /// While set, every send fails and nothing is recorded.
    pub(crate) fn fail_sends(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record(&self, sent: Sent) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Channel(format!("user {} is not connected", sent.to())));
        }
        self.sent.lock().unwrap().push(sent);
        Ok(())
    }

    /// Everything sent since the last call.
    pub(crate) fn take(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

#[async_trait]
impl ChatChannel for RecordingChannel {
    async fn send_text(&self, session: UserId, text: &str, choices: ChoiceSet) -> AppResult<()> {
        self.record(Sent::Text { to: session, text: text.to_owned(), choices })
    }

    async fn send_image(&self, session: UserId, image_ref: &str, choices: ChoiceSet) -> AppResult<()> {
        self.record(Sent::Image { to: session, image: image_ref.to_owned(), choices })
    }
}
