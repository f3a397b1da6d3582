//! Repository for the `user_profiles` table.

use muse_core::types::UserId;
use sqlx::PgPool;

use crate::models::user_profile::{UpdateUserProfile, UserProfile};

/// Column list for `user_profiles` queries.
const COLUMNS: &str = "id, email, username, full_name, avatar_url, created_at, updated_at";

pub struct UserProfileRepo;

impl UserProfileRepo {
    /// Fetch the profile for `user_id`, creating an empty one on first use.
    pub async fn get_or_create(
        pool: &PgPool,
        user_id: UserId,
        email: Option<&str>,
    ) -> Result<UserProfile, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_profiles (id, email) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET id = user_profiles.id \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserProfile>(&query)
            .bind(user_id)
            .bind(email)
            .fetch_one(pool)
            .await
    }

    /// Apply a partial update, creating the row if it does not exist yet.
    pub async fn upsert(
        pool: &PgPool,
        user_id: UserId,
        input: &UpdateUserProfile,
    ) -> Result<UserProfile, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_profiles (id, username, full_name, avatar_url) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET \
                username = COALESCE(EXCLUDED.username, user_profiles.username), \
                full_name = COALESCE(EXCLUDED.full_name, user_profiles.full_name), \
                avatar_url = COALESCE(EXCLUDED.avatar_url, user_profiles.avatar_url), \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserProfile>(&query)
            .bind(user_id)
            .bind(&input.username)
            .bind(&input.full_name)
            .bind(&input.avatar_url)
            .fetch_one(pool)
            .await
    }
}
