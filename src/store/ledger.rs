use std::collections::BTreeSet;

use sqlx::SqlitePool;
use tracing::{error, info};

use crate::{AppError, AppResult, db, models::UserId};

/// Likes, matches and viewed markers. Every insert is idempotent.
#[derive(Clone)]
pub struct InteractionLedger {
    db_pool: SqlitePool,
}

/// Matches are stored once per unordered pair, lesser id first.
fn pair(a: UserId, b: UserId) -> (UserId, UserId) {
    if a < b { (a, b) } else { (b, a) }
}

impl InteractionLedger {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    /// Records `from -> to` and reports whether `to -> from` exists too, in which
    /// case the match row is materialised in the same transaction.
    ///
    /// The like insert is the first statement, so the transaction holds the write
    /// lock before it reads the reciprocal edge. Two reciprocal calls racing each
    /// other are serialised by SQLite and the second one always sees the first.
    pub async fn record_like(&self, from: UserId, to: UserId) -> AppResult<bool> {
        let (lo, hi) = pair(from, to);
        let now = db::now();
        let mut tx = self.db_pool.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO likes (from_id,to_id,created_at) VALUES (?,?,?)")
            .bind(from)
            .bind(to)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let is_match = from != to
            && sqlx::query("SELECT 1 FROM likes WHERE from_id=? AND to_id=?")
                .bind(to)
                .bind(from)
                .fetch_optional(&mut *tx)
                .await?
                .is_some();

        if is_match {
            let inserted = sqlx::query("INSERT OR IGNORE INTO matches (user_lo,user_hi,created_at) VALUES (?,?,?)")
                .bind(lo)
                .bind(hi)
                .bind(now)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            if inserted > 0 {
                info!(user_lo = lo, user_hi = hi, "match created");
            }
        }

        let has_match_row = sqlx::query("SELECT 1 FROM matches WHERE user_lo=? AND user_hi=?")
            .bind(lo)
            .bind(hi)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();

        if has_match_row != is_match {
            error!(from, to, is_match, has_match_row, "match row disagrees with likes");
            tx.rollback().await?;
            return Err(AppError::Invariant(format!(
                "pair ({lo}, {hi}): reciprocal like {is_match}, match row {has_match_row}"
            )));
        }

        tx.commit().await?;
        Ok(is_match)
    }

    pub async fn record_viewed(&self, viewer: UserId, viewed: UserId) -> AppResult<()> {
        sqlx::query("INSERT OR IGNORE INTO viewed (viewer_id,viewed_id,created_at) VALUES (?,?,?)")
            .bind(viewer)
            .bind(viewed)
            .bind(db::now())
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }

    /// Starts a new search cycle for `viewer`. Likes and matches are untouched.
    pub async fn reset_viewed(&self, viewer: UserId) -> AppResult<()> {
        let cleared = sqlx::query("DELETE FROM viewed WHERE viewer_id=?")
            .bind(viewer)
            .execute(&self.db_pool)
            .await?
            .rows_affected();
        info!(user_id = viewer, cleared, "search cycle reset");
        Ok(())
    }

    pub async fn matches_for(&self, user_id: UserId) -> AppResult<BTreeSet<UserId>> {
        let rows: Vec<(UserId,)> = sqlx::query_as(
            "SELECT user_hi FROM matches WHERE user_lo=?
             UNION
             SELECT user_lo FROM matches WHERE user_hi=?",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
