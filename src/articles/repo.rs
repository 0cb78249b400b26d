use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::query::{ArticleFilter, Page};

/// Stored article plus the store-computed favorites aggregate. The count
/// never depends on who is asking.
#[derive(Debug, Clone, FromRow)]
pub struct ArticleRow {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
    pub author_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
    pub favorites_count: i64,
}

#[derive(Debug)]
pub struct NewArticle {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
    pub author_id: Uuid,
}

/// Partial update; `None` leaves the column untouched. Slug and author
/// have no counterpart here on purpose.
#[derive(Debug, Default)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    pub tag_list: Option<Vec<String>>,
}

/// Page of matching articles, newest first, id as tie-break so equal
/// timestamps still order deterministically.
pub async fn find(
    db: &PgPool,
    filter: &ArticleFilter,
    page: Page,
) -> Result<Vec<ArticleRow>, sqlx::Error> {
    if filter.matches_nothing() {
        return Ok(Vec::new());
    }
    sqlx::query_as::<_, ArticleRow>(
        r#"
        SELECT a.id, a.slug, a.title, a.description, a.body, a.tag_list,
               a.author_id, a.created_at, a.updated_at,
               (SELECT count(*) FROM article_favorites f WHERE f.article_id = a.id) AS favorites_count
        FROM articles a
        WHERE ($1::text[] IS NULL OR a.tag_list && $1)
          AND ($2::uuid IS NULL OR a.author_id = $2)
          AND ($3::uuid[] IS NULL OR a.id = ANY($3))
        ORDER BY a.created_at DESC, a.id DESC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(filter.tags.clone())
    .bind(filter.author_id())
    .bind(filter.favorited_by.clone())
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(db)
    .await
}

/// Total size of the unpaginated matching set.
pub async fn count(db: &PgPool, filter: &ArticleFilter) -> Result<i64, sqlx::Error> {
    if filter.matches_nothing() {
        return Ok(0);
    }
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT count(*)
        FROM articles a
        WHERE ($1::text[] IS NULL OR a.tag_list && $1)
          AND ($2::uuid IS NULL OR a.author_id = $2)
          AND ($3::uuid[] IS NULL OR a.id = ANY($3))
        "#,
    )
    .bind(filter.tags.clone())
    .bind(filter.author_id())
    .bind(filter.favorited_by.clone())
    .fetch_one(db)
    .await
}

pub async fn find_by_slug(db: &PgPool, slug: &str) -> Result<Option<ArticleRow>, sqlx::Error> {
    sqlx::query_as::<_, ArticleRow>(
        r#"
        SELECT a.id, a.slug, a.title, a.description, a.body, a.tag_list,
               a.author_id, a.created_at, a.updated_at,
               (SELECT count(*) FROM article_favorites f WHERE f.article_id = a.id) AS favorites_count
        FROM articles a
        WHERE a.slug = $1
        "#,
    )
    .bind(slug)
    .fetch_optional(db)
    .await
}

/// Insert relying on the slug unique constraint; callers translate a
/// violation via [`is_slug_collision`] rather than pre-checking.
pub async fn insert(db: &PgPool, new: &NewArticle) -> Result<ArticleRow, sqlx::Error> {
    sqlx::query_as::<_, ArticleRow>(
        r#"
        INSERT INTO articles (id, slug, title, description, body, tag_list, author_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, slug, title, description, body, tag_list, author_id,
                  created_at, updated_at, 0::bigint AS favorites_count
        "#,
    )
    .bind(new.id)
    .bind(&new.slug)
    .bind(&new.title)
    .bind(&new.description)
    .bind(&new.body)
    .bind(&new.tag_list)
    .bind(new.author_id)
    .fetch_one(db)
    .await
}

/// True when the error is the slug unique-constraint violation.
pub fn is_slug_collision(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.constraint() == Some("articles_slug_key"),
        _ => false,
    }
}

/// Applies the provided fields and bumps `updated_at`. Slug stays as
/// assigned at creation.
pub async fn update_by_slug(
    db: &PgPool,
    slug: &str,
    changes: &ArticleChanges,
) -> Result<Option<ArticleRow>, sqlx::Error> {
    sqlx::query_as::<_, ArticleRow>(
        r#"
        UPDATE articles SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            body = COALESCE($4, body),
            tag_list = COALESCE($5, tag_list),
            updated_at = now()
        WHERE slug = $1
        RETURNING id, slug, title, description, body, tag_list, author_id, created_at, updated_at,
                  (SELECT count(*) FROM article_favorites f WHERE f.article_id = articles.id) AS favorites_count
        "#,
    )
    .bind(slug)
    .bind(changes.title.clone())
    .bind(changes.description.clone())
    .bind(changes.body.clone())
    .bind(changes.tag_list.clone())
    .fetch_optional(db)
    .await
}

/// False means no article had that slug; deleting a missing slug is never
/// reported as success. Favorite rows go away with the article via the FK
/// cascade.
pub async fn delete_by_slug(db: &PgPool, slug: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM articles WHERE slug = $1")
        .bind(slug)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Idempotent; favoriting twice is a no-op.
pub async fn favorite(db: &PgPool, article_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO article_favorites (article_id, user_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(article_id)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn unfavorite(db: &PgPool, article_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        DELETE FROM article_favorites
        WHERE article_id = $1 AND user_id = $2
        "#,
    )
    .bind(article_id)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(())
}
