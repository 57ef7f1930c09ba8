use std::sync::{Arc, Mutex};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use tracing::{debug, info};

use crate::{
    AppError, AppResult,
    models::{Profile, UserId},
    store::{InteractionLedger, ProfileStore},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub matched: bool,
    /// The other side of a fresh match, when their profile still exists.
    pub counterpart: Option<Profile>,
}

/// Candidate search and like/skip bookkeeping over the two stores. Holds no state of
/// its own besides the shuffle generator, so clones can serve sessions in parallel.
#[derive(Clone)]
pub struct MatchEngine {
    profiles: ProfileStore,
    ledger: InteractionLedger,
    rng: Arc<Mutex<StdRng>>,
}

impl MatchEngine {
    pub fn new(profiles: ProfileStore, ledger: InteractionLedger, rng: StdRng) -> Self {
        Self {
            profiles,
            ledger,
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    pub fn with_seed(profiles: ProfileStore, ledger: InteractionLedger, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::new(profiles, ledger, rng)
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    /// Up to `limit` profiles the requester has neither seen nor liked this cycle,
    /// in random order. Empty means the cycle is exhausted.
    pub async fn find_candidates(&self, requester: UserId, limit: usize) -> AppResult<Vec<Profile>> {
        let me = self
            .profiles
            .get(requester)
            .await?
            .ok_or(AppError::NotFound(requester))?;

        let mut candidates = self
            .profiles
            .search(
                requester,
                &me.city_key(),
                me.looking_for.gender().map(|gender| gender.as_str()),
                (me.looking_age_min, me.looking_age_max),
            )
            .await?;

        {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            candidates.shuffle(&mut *rng);
        }
        candidates.truncate(limit);

        debug!(user_id = requester, found = candidates.len(), "candidate search");
        Ok(candidates)
    }

    pub async fn like(&self, requester: UserId, candidate: UserId) -> AppResult<MatchOutcome> {
        self.ledger.record_viewed(requester, candidate).await?;
        let matched = self.ledger.record_like(requester, candidate).await?;

        let counterpart = if matched {
            info!(user_id = requester, candidate, "mutual like");
            self.profiles.get(candidate).await?
        } else {
            None
        };

        Ok(MatchOutcome { matched, counterpart })
    }

    pub async fn skip(&self, requester: UserId, candidate: UserId) -> AppResult<()> {
        self.ledger.record_viewed(requester, candidate).await
    }

    pub async fn reset_search(&self, requester: UserId) -> AppResult<()> {
        self.ledger.reset_viewed(requester).await
    }

    /// Matched counterparts that are still active. Edges to inactive users stay stored.
    pub async fn matches(&self, requester: UserId) -> AppResult<Vec<Profile>> {
        let mut profiles = Vec::new();
        for id in self.ledger.matches_for(requester).await? {
            if let Some(profile) = self.profiles.get(id).await?.filter(|p| p.active) {
                profiles.push(profile);
            }
        }
        Ok(profiles)
    }
}
