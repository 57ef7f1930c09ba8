use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::{sync::Mutex as AsyncMutex, time::Instant};
use tracing::{error, info, warn};

use crate::{
    AppError, AppResult,
    chat::{ChatChannel, ChoiceSet, InboundEvent, Input, START},
    engine::MatchEngine,
    flows::{BrowseAction, Browsing, MenuChoice, Registration, Transition, menu, render},
    models::{Profile, UserId},
};

const SORRY: &str = "Sorry, something went wrong on our side. Please try again in a moment.";
const USE_BUTTONS: &str = "Please use the buttons provided.";

/// Where a session rests between two messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Registering(Registration),
    Browsing(Browsing),
    Menu { active: bool },
}

impl SessionState {
    fn choices(&self) -> ChoiceSet {
        match self {
            SessionState::Idle => ChoiceSet::Start,
            SessionState::Registering(registration) => registration.step().prompt().1,
            SessionState::Browsing(browsing) => browsing.choices(),
            SessionState::Menu { active } => menu::choices(*active),
        }
    }
}

/// One entry of the registry. `last_seen` is only touched under the registry lock,
/// so eviction never races a message that has already picked the entry up.
struct Session {
    last_seen: Mutex<Instant>,
    state: AsyncMutex<SessionState>,
}

type SessionHandle = Arc<Session>;

/// Maps each inbound message to the flow its session is in. Messages of one session
/// run one at a time, in arrival order; different sessions run in parallel.
#[derive(Clone)]
pub struct SessionRouter {
    engine: MatchEngine,
    channel: Arc<dyn ChatChannel>,
    sessions: Arc<Mutex<HashMap<UserId, SessionHandle>>>,
}

impl SessionRouter {
    pub fn new(engine: MatchEngine, channel: Arc<dyn ChatChannel>) -> Self {
        Self {
            engine,
            channel,
            sessions: Arc::default(),
        }
    }

    pub async fn dispatch(&self, InboundEvent { session: user_id, input }: InboundEvent) -> AppResult<()> {
        loop {
            let handle = self.session(user_id);
            let mut state = handle.state.lock().await;
            // ended or evicted while we waited; pick up the live entry instead
            if !self.is_current(user_id, &handle) {
                continue;
            }
            return self.process(user_id, &mut state, &input).await;
        }
    }

    async fn process(&self, user_id: UserId, state: &mut SessionState, input: &Input) -> AppResult<()> {
        match self.step(user_id, state, input).await {
            Ok(next) => {
                *state = next;
                Ok(())
            }
            Err(AppError::NotFound(missing)) if missing == user_id => {
                info!(user_id, "no profile yet, starting registration");
                *state = self.start_registration(user_id).await?;
                Ok(())
            }
            Err(err) if err.is_transient() => {
                warn!(user_id, error = %err, "transient failure, state kept");
                self.apologize(user_id, state.choices()).await;
                Ok(())
            }
            Err(err) => {
                error!(user_id, error = %err, "operation aborted");
                self.apologize(user_id, state.choices()).await;
                Err(err)
            }
        }
    }

    pub async fn state(&self, user_id: UserId) -> Option<SessionState> {
        let handle = self.lookup(user_id)?;
        let state = handle.state.lock().await;
        Some(state.clone())
    }

    /// Drops the session and whatever draft or candidate it held.
    pub fn end_session(&self, user_id: UserId) -> bool {
        let removed = self.sessions().remove(&user_id).is_some();
        if removed {
            info!(user_id, "session ended");
        }
        removed
    }

    /// Ends sessions that have been quiet for at least `max_idle`. Busy sessions are skipped.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, handle| {
            let quiet = handle.last_seen.lock().unwrap_or_else(PoisonError::into_inner).elapsed();
            quiet < max_idle || handle.state.try_lock().is_err()
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, "idle sessions evicted");
        }
        evicted
    }

    pub fn session_count(&self) -> usize {
        self.sessions().len()
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The live entry for `user_id`, created on first contact, marked as just seen.
    fn session(&self, user_id: UserId) -> SessionHandle {
        let mut sessions = self.sessions();
        let handle = sessions.entry(user_id).or_insert_with(|| {
            Arc::new(Session {
                last_seen: Mutex::new(Instant::now()),
                state: AsyncMutex::new(SessionState::Idle),
            })
        });
        *handle.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
        handle.clone()
    }

    fn is_current(&self, user_id: UserId, handle: &SessionHandle) -> bool {
        self.sessions()
            .get(&user_id)
            .is_some_and(|current| Arc::ptr_eq(current, handle))
    }

    fn lookup(&self, user_id: UserId) -> Option<SessionHandle> {
        self.sessions().get(&user_id).cloned()
    }

    async fn step(&self, user_id: UserId, state: &SessionState, input: &Input) -> AppResult<SessionState> {
        if input.is_command("start") || (*state == SessionState::Idle && input.is_choice(START)) {
            return self.enter(user_id).await;
        }
        if input.is_command("menu") {
            let reachable = match state {
                SessionState::Idle | SessionState::Menu { .. } => true,
                // editing an existing profile; newcomers have no menu to go to yet
                SessionState::Registering(_) => self.engine.profiles().exists(user_id).await?,
                SessionState::Browsing(_) => false,
            };
            if reachable {
                return self.open_menu(user_id).await;
            }
        }

        match state {
            SessionState::Idle => self.enter(user_id).await,
            SessionState::Registering(registration) => {
                self.register(user_id, registration.clone(), input).await
            }
            SessionState::Browsing(browsing) => self.browse(user_id, browsing, input).await,
            SessionState::Menu { .. } => self.menu(user_id, input).await,
        }
    }

    /// First contact, or `/start`. Newcomers are redirected into registration by the
    /// `NotFound` the menu raises.
    async fn enter(&self, user_id: UserId) -> AppResult<SessionState> {
        self.open_menu(user_id).await
    }

    async fn start_registration(&self, user_id: UserId) -> AppResult<SessionState> {
        let registration = Registration::new(user_id);
        self.prompt(user_id, &registration).await?;
        Ok(SessionState::Registering(registration))
    }

    async fn prompt(&self, user_id: UserId, registration: &Registration) -> AppResult<()> {
        let (question, choices) = registration.step().prompt();
        self.channel.send_text(user_id, question, choices).await
    }

    async fn register(
        &self,
        user_id: UserId,
        mut registration: Registration,
        input: &Input,
    ) -> AppResult<SessionState> {
        match registration.advance(input) {
            Transition::Advanced | Transition::Restarted => {
                self.prompt(user_id, &registration).await?;
            }
            Transition::Rejected(err) => {
                let (question, choices) = registration.step().prompt();
                self.channel.send_text(user_id, &format!("{err}\n{question}"), choices).await?;
            }
            Transition::Review => {
                let draft = registration.draft();
                if let Some(photo) = &draft.photo {
                    self.channel.send_image(user_id, photo, ChoiceSet::None).await?;
                }
                let (question, choices) = registration.step().prompt();
                let review = format!("{}\n\n{question}", render::draft_review(draft));
                self.channel.send_text(user_id, &review, choices).await?;
            }
            Transition::Commit(profile) => {
                self.engine.profiles().upsert(&profile).await?;
                info!(user_id, "profile committed");
                self.channel
                    .send_text(
                        user_id,
                        "Your profile is now active. Good luck finding your soulmate!",
                        ChoiceSet::None,
                    )
                    .await?;
                return self.show_next(user_id).await;
            }
            Transition::Cancelled => {
                self.channel
                    .send_text(
                        user_id,
                        "Registration cancelled. All information has been discarded.\n\
                         You can start a new registration with the Start button or /start command.",
                        ChoiceSet::Start,
                    )
                    .await?;
                return Ok(SessionState::Idle);
            }
        }
        Ok(SessionState::Registering(registration))
    }

    async fn show_next(&self, user_id: UserId) -> AppResult<SessionState> {
        let browsing = Browsing::fetch(&self.engine, user_id).await?;
        match &browsing {
            Browsing::Deciding(candidate) => self.show_profile(user_id, candidate, browsing.choices()).await?,
            Browsing::Exhausted => {
                self.channel
                    .send_text(
                        user_id,
                        "You've seen everyone who matches your preferences for now. \
                         Reset the search to see skipped profiles again.",
                        browsing.choices(),
                    )
                    .await?
            }
        }
        Ok(SessionState::Browsing(browsing))
    }

    async fn show_profile(&self, to: UserId, profile: &Profile, choices: ChoiceSet) -> AppResult<()> {
        self.channel.send_image(to, &profile.photo, ChoiceSet::None).await?;
        self.channel.send_text(to, &render::profile_card(profile), choices).await
    }

    async fn browse(&self, user_id: UserId, browsing: &Browsing, input: &Input) -> AppResult<SessionState> {
        match browsing.decide(input) {
            BrowseAction::Like(candidate) => {
                let outcome = self.engine.like(user_id, candidate).await?;
                if outcome.matched {
                    self.channel
                        .send_text(user_id, "It's a match! You both liked each other.", ChoiceSet::None)
                        .await?;
                    if let Some(counterpart) = &outcome.counterpart {
                        self.show_profile(user_id, counterpart, ChoiceSet::None).await?;
                    }
                    self.notify_match(user_id, candidate).await;
                }
                self.show_next(user_id).await
            }
            BrowseAction::Skip(candidate) => {
                self.engine.skip(user_id, candidate).await?;
                self.show_next(user_id).await
            }
            BrowseAction::ResetSearch => {
                self.engine.reset_search(user_id).await?;
                self.show_next(user_id).await
            }
            BrowseAction::Menu => self.open_menu(user_id).await,
            BrowseAction::Unrecognized => {
                self.channel.send_text(user_id, USE_BUTTONS, browsing.choices()).await?;
                Ok(SessionState::Browsing(browsing.clone()))
            }
        }
    }

    /// Tells the other side about a match. Their session is not touched.
    async fn notify_match(&self, liker: UserId, counterpart: UserId) {
        let result = async {
            let Some(profile) = self.engine.profiles().get(liker).await? else {
                return Ok(());
            };
            self.channel
                .send_text(counterpart, "You have a new match!", ChoiceSet::Keep)
                .await?;
            self.show_profile(counterpart, &profile, ChoiceSet::Keep).await
        }
        .await;

        if let Err(err) = result {
            warn!(liker, counterpart, error = %err, "match notification not delivered");
        }
    }

    async fn open_menu(&self, user_id: UserId) -> AppResult<SessionState> {
        let profile = self
            .engine
            .profiles()
            .get(user_id)
            .await?
            .ok_or(AppError::NotFound(user_id))?;
        self.channel
            .send_text(user_id, menu::PROMPT, menu::choices(profile.active))
            .await?;
        Ok(SessionState::Menu { active: profile.active })
    }

    /// Activation is read from the store, not from the session: a reply that failed to
    /// send after a toggle leaves the session's copy stale.
    async fn menu(&self, user_id: UserId, input: &Input) -> AppResult<SessionState> {
        let profiles = self.engine.profiles();
        let active = profiles.get(user_id).await?.ok_or(AppError::NotFound(user_id))?.active;

        let Some(choice) = menu::parse(input, active) else {
            self.channel
                .send_text(user_id, &format!("{USE_BUTTONS}\n{}", menu::PROMPT), menu::choices(active))
                .await?;
            return Ok(SessionState::Menu { active });
        };

        match choice {
            MenuChoice::ContinueBrowsing => self.show_next(user_id).await,
            MenuChoice::Matches => {
                let matches = self.engine.matches(user_id).await?;
                self.channel
                    .send_text(user_id, &render::match_list(&matches), menu::choices(active))
                    .await?;
                Ok(SessionState::Menu { active })
            }
            MenuChoice::EditProfile => {
                if !profiles.set_active(user_id, false).await? {
                    return Err(AppError::NotFound(user_id));
                }
                info!(user_id, "profile hidden for editing");
                self.start_registration(user_id).await
            }
            MenuChoice::Deactivate => {
                if !profiles.set_active(user_id, false).await? {
                    return Err(AppError::NotFound(user_id));
                }
                info!(user_id, "account deactivated");
                self.channel
                    .send_text(
                        user_id,
                        "Your profile is hidden now. Nobody will see it until you activate it again.",
                        menu::choices(false),
                    )
                    .await?;
                Ok(SessionState::Menu { active: false })
            }
            MenuChoice::Activate => {
                if !profiles.set_active(user_id, true).await? {
                    return Err(AppError::NotFound(user_id));
                }
                info!(user_id, "account activated");
                self.channel
                    .send_text(user_id, "Welcome back! Your profile is visible again.", menu::choices(true))
                    .await?;
                Ok(SessionState::Menu { active: true })
            }
        }
    }

    async fn apologize(&self, user_id: UserId, choices: ChoiceSet) {
        if let Err(err) = self.channel.send_text(user_id, SORRY, choices).await {
            warn!(user_id, error = %err, "could not deliver apology");
        }
    }
}
