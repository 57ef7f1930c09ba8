use sqlx::SqlitePool;

use crate::{AppResult, models::{Profile, UserId}};

/// Durable profile rows plus their active flag. No content validation happens here.
#[derive(Clone)]
pub struct ProfileStore {
    db_pool: SqlitePool,
}

impl ProfileStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    /// Replace-or-insert the whole row. `created_at` of an existing row is kept.
    pub async fn upsert(&self, profile: &Profile) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO profiles
                (user_id,name,age,city,city_key,gender,looking_for,looking_age_min,looking_age_max,description,photo,is_active,created_at)
             VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?)
             ON CONFLICT(user_id) DO UPDATE SET
                name=excluded.name,
                age=excluded.age,
                city=excluded.city,
                city_key=excluded.city_key,
                gender=excluded.gender,
                looking_for=excluded.looking_for,
                looking_age_min=excluded.looking_age_min,
                looking_age_max=excluded.looking_age_max,
                description=excluded.description,
                photo=excluded.photo,
                is_active=excluded.is_active",
        )
        .bind(profile.user_id)
        .bind(&profile.name)
        .bind(profile.age)
        .bind(&profile.city)
        .bind(profile.city_key())
        .bind(profile.gender.as_str())
        .bind(profile.looking_for.as_str())
        .bind(profile.looking_age_min)
        .bind(profile.looking_age_max)
        .bind(&profile.description)
        .bind(&profile.photo)
        .bind(profile.active)
        .bind(profile.created_at.unix_timestamp())
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, user_id: UserId) -> AppResult<Option<Profile>> {
        Ok(sqlx::query_as("SELECT * FROM profiles WHERE user_id=?")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?)
    }

    pub async fn exists(&self, user_id: UserId) -> AppResult<bool> {
        Ok(self.get(user_id).await?.is_some())
    }

    /// Returns false when there is no row for `user_id`.
    pub async fn set_active(&self, user_id: UserId, active: bool) -> AppResult<bool> {
        let result = sqlx::query("UPDATE profiles SET is_active=? WHERE user_id=?")
            .bind(active)
            .bind(user_id)
            .execute(&self.db_pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Active profiles in `city_key` whose age lies in `ages`, minus everything
    /// `viewer` has already seen or liked. Ordered by id; shuffling is the caller's job.
    pub(crate) async fn search(
        &self,
        viewer: UserId,
        city_key: &str,
        gender: Option<&str>,
        ages: (u32, u32),
    ) -> AppResult<Vec<Profile>> {
        Ok(sqlx::query_as(
            "SELECT * FROM profiles
             WHERE is_active=1
               AND user_id != ?
               AND city_key=?
               AND (? IS NULL OR gender=?)
               AND age BETWEEN ? AND ?
               AND user_id NOT IN (SELECT viewed_id FROM viewed WHERE viewer_id=?)
               AND user_id NOT IN (SELECT to_id FROM likes WHERE from_id=?)
             ORDER BY user_id",
        )
        .bind(viewer)
        .bind(city_key)
        .bind(gender)
        .bind(gender)
        .bind(ages.0)
        .bind(ages.1)
        .bind(viewer)
        .bind(viewer)
        .fetch_all(&self.db_pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::memory_pool, testing::profile};

    #[tokio::test]
    async fn upsert_then_get() {
        let store = ProfileStore::new(memory_pool().await);
        let alice = profile(1).named("Alice").build();

        assert!(!store.exists(1).await.unwrap());
        store.upsert(&alice).await.unwrap();

        assert_eq!(store.get(1).await.unwrap(), Some(alice));
        assert!(store.exists(1).await.unwrap());
        assert_eq!(store.get(2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn upsert_replaces_the_whole_row() {
        let store = ProfileStore::new(memory_pool().await);
        let first = profile(1).named("Alice").city("Paris").build();
        store.upsert(&first).await.unwrap();

        let mut second = profile(1).named("Alicia").city("Lyon").build();
        second.description = "new me".to_owned();
        second.created_at = first.created_at + time::Duration::days(3);
        store.upsert(&second).await.unwrap();

        let stored = store.get(1).await.unwrap().unwrap();
        assert_eq!(stored.name, "Alicia");
        assert_eq!(stored.city, "Lyon");
        assert_eq!(stored.description, "new me");
        assert_eq!(stored.created_at, first.created_at);
    }

    #[tokio::test]
    async fn set_active_reports_missing_rows() {
        let store = ProfileStore::new(memory_pool().await);
        store.upsert(&profile(1).build()).await.unwrap();

        assert!(store.set_active(1, false).await.unwrap());
        assert!(!store.get(1).await.unwrap().unwrap().active);
        assert!(store.set_active(1, true).await.unwrap());
        assert!(store.get(1).await.unwrap().unwrap().active);

        assert!(!store.set_active(42, false).await.unwrap());
    }
}
