use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record as maintained by the external registration flow. Read-only
/// here apart from favorite rows, which live on the article side.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub created_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, bio, image, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_username(db: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, bio, image, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await
    }

    /// Batch lookup for rendering a page of articles without per-row queries.
    pub async fn find_by_ids(db: &PgPool, ids: &[Uuid]) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, bio, image, created_at
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(db)
        .await
    }

    /// Union of the favorite sets of all named users. Unknown usernames
    /// simply contribute nothing.
    pub async fn favorites_of(db: &PgPool, usernames: &[String]) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT f.article_id
            FROM article_favorites f
            JOIN users u ON u.id = f.user_id
            WHERE u.username = ANY($1)
            "#,
        )
        .bind(usernames)
        .fetch_all(db)
        .await
    }
}

/// Per-request view of the acting user's favorite and follow sets, loaded
/// once before rendering.
#[derive(Debug, Default)]
pub struct ViewerContext {
    pub favorites: HashSet<Uuid>,
    pub following: HashSet<Uuid>,
}

impl ViewerContext {
    pub async fn load(db: &PgPool, user_id: Uuid) -> Result<Self, sqlx::Error> {
        let favorites = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT article_id
            FROM article_favorites
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(db);

        let following = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT followed_id
            FROM user_follows
            WHERE follower_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(db);

        let (favorites, following) = tokio::try_join!(favorites, following)?;
        Ok(Self {
            favorites: favorites.into_iter().collect(),
            following: following.into_iter().collect(),
        })
    }
}
