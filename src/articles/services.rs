use std::collections::HashMap;

use rand::{distributions::Alphanumeric, Rng};
use slug::slugify;
use tracing::info;
use uuid::Uuid;

use super::dto::{CreateArticleFields, ListQuery, UpdateArticleFields};
use super::presenter::{self, ArticlePayload};
use super::query::{ArticleFilter, AuthorFilter, Page};
use super::repo::{self, ArticleChanges, ArticleRow, NewArticle};
use crate::auth::extractors::Viewer;
use crate::error::{ApiError, ValidationErrors};
use crate::state::AppState;
use crate::users::repo::{User, ViewerContext};

async fn viewer_context(
    state: &AppState,
    viewer: Viewer,
) -> Result<Option<ViewerContext>, sqlx::Error> {
    match viewer.user_id() {
        Some(id) => Ok(Some(ViewerContext::load(&state.db, id).await?)),
        None => Ok(None),
    }
}

async fn resolve_author(
    state: &AppState,
    username: Option<&str>,
) -> Result<AuthorFilter, sqlx::Error> {
    match username {
        None => Ok(AuthorFilter::Any),
        Some(name) => Ok(match User::find_by_username(&state.db, name).await? {
            Some(user) => AuthorFilter::Id(user.id),
            None => AuthorFilter::Unknown,
        }),
    }
}

async fn resolve_favorited(
    state: &AppState,
    usernames: &[String],
) -> Result<Option<Vec<Uuid>>, sqlx::Error> {
    if usernames.is_empty() {
        return Ok(None);
    }
    Ok(Some(User::favorites_of(&state.db, usernames).await?))
}

async fn load_author(state: &AppState, row: &ArticleRow) -> Result<User, ApiError> {
    User::find_by_id(&state.db, row.author_id)
        .await?
        .ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!(
                "article {} references missing author {}",
                row.id,
                row.author_id
            ))
        })
}

/// Listing: the filter lookups are independent of each other, so they are
/// dispatched concurrently and joined before the filter is built; the same
/// goes for the count and the page fetch.
pub async fn list(
    state: &AppState,
    viewer: Viewer,
    query: ListQuery,
) -> Result<(Vec<ArticlePayload>, i64), ApiError> {
    let page = Page::clamp(query.limit, query.offset);

    let (author, favorited_by, viewer_ctx) = tokio::try_join!(
        resolve_author(state, query.author.as_deref()),
        resolve_favorited(state, &query.favorited),
        viewer_context(state, viewer),
    )?;

    let filter = ArticleFilter::new(query.tags, author, favorited_by);

    let (articles_count, rows) = tokio::try_join!(
        repo::count(&state.db, &filter),
        repo::find(&state.db, &filter, page),
    )?;

    let author_ids: Vec<Uuid> = rows.iter().map(|row| row.author_id).collect();
    let authors: HashMap<Uuid, User> = User::find_by_ids(&state.db, &author_ids)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();

    let mut articles = Vec::with_capacity(rows.len());
    for row in &rows {
        let author = authors.get(&row.author_id).ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!(
                "article {} references missing author {}",
                row.id,
                row.author_id
            ))
        })?;
        articles.push(presenter::render(row, author, viewer_ctx.as_ref()));
    }

    Ok((articles, articles_count))
}

pub async fn get(state: &AppState, viewer: Viewer, slug: &str) -> Result<ArticlePayload, ApiError> {
    let (row, viewer_ctx) = tokio::try_join!(
        repo::find_by_slug(&state.db, slug),
        viewer_context(state, viewer),
    )?;
    let row = row.ok_or(ApiError::NotFound)?;
    let author = load_author(state, &row).await?;
    Ok(presenter::render(&row, &author, viewer_ctx.as_ref()))
}

fn validate_create(fields: &CreateArticleFields) -> Result<(), ApiError> {
    let mut errors = ValidationErrors::default();
    if fields.title.trim().is_empty() {
        errors.add("title", "can't be blank");
    }
    if fields.description.trim().is_empty() {
        errors.add("description", "can't be blank");
    }
    if fields.body.trim().is_empty() {
        errors.add("body", "can't be blank");
    }
    errors.into_result()
}

fn validate_update(fields: &UpdateArticleFields) -> Result<(), ApiError> {
    let mut errors = ValidationErrors::default();
    if fields.title.as_deref().is_some_and(|v| v.trim().is_empty()) {
        errors.add("title", "can't be blank");
    }
    if fields
        .description
        .as_deref()
        .is_some_and(|v| v.trim().is_empty())
    {
        errors.add("description", "can't be blank");
    }
    if fields.body.as_deref().is_some_and(|v| v.trim().is_empty()) {
        errors.add("body", "can't be blank");
    }
    errors.into_result()
}

/// Derives the URL-safe slug for a title. Deterministic; a title with no
/// sluggable characters falls back to a fixed stem and relies on the
/// collision suffix for uniqueness.
fn derive_slug(title: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        "article".to_string()
    } else {
        slug
    }
}

fn slug_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

/// Creation validates before touching the store, then leans on the slug
/// unique constraint: one retry with a random suffix, after which a second
/// collision surfaces as a conflict.
pub async fn create(
    state: &AppState,
    author_id: Uuid,
    fields: CreateArticleFields,
) -> Result<ArticlePayload, ApiError> {
    validate_create(&fields)?;

    let author = User::find_by_id(&state.db, author_id)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    let slug = derive_slug(&fields.title);
    let new = NewArticle {
        id: Uuid::new_v4(),
        slug: slug.clone(),
        title: fields.title,
        description: fields.description,
        body: fields.body,
        tag_list: fields.tag_list,
        author_id,
    };

    let row = match repo::insert(&state.db, &new).await {
        Ok(row) => row,
        Err(err) if repo::is_slug_collision(&err) => {
            let suffixed = NewArticle {
                slug: format!("{}-{}", slug, slug_suffix()),
                ..new
            };
            match repo::insert(&state.db, &suffixed).await {
                Ok(row) => row,
                Err(err) if repo::is_slug_collision(&err) => {
                    return Err(ApiError::Conflict(format!("slug {slug} already exists")))
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(err) => return Err(err.into()),
    };

    info!(article = %row.id, slug = %row.slug, "article created");
    Ok(presenter::render(&row, &author, None))
}

pub async fn update(
    state: &AppState,
    user_id: Uuid,
    slug: &str,
    fields: UpdateArticleFields,
) -> Result<ArticlePayload, ApiError> {
    validate_update(&fields)?;

    let existing = repo::find_by_slug(&state.db, slug)
        .await?
        .ok_or(ApiError::NotFound)?;
    if existing.author_id != user_id {
        return Err(ApiError::Forbidden);
    }

    let changes = ArticleChanges {
        title: fields.title,
        description: fields.description,
        body: fields.body,
        tag_list: fields.tag_list,
    };
    let row = repo::update_by_slug(&state.db, slug, &changes)
        .await?
        .ok_or(ApiError::NotFound)?;

    let author = load_author(state, &row).await?;
    let viewer_ctx = ViewerContext::load(&state.db, user_id).await?;
    Ok(presenter::render(&row, &author, Some(&viewer_ctx)))
}

pub async fn delete(state: &AppState, user_id: Uuid, slug: &str) -> Result<(), ApiError> {
    let existing = repo::find_by_slug(&state.db, slug)
        .await?
        .ok_or(ApiError::NotFound)?;
    if existing.author_id != user_id {
        return Err(ApiError::Forbidden);
    }

    if !repo::delete_by_slug(&state.db, slug).await? {
        return Err(ApiError::NotFound);
    }
    info!(article = %existing.id, slug, "article deleted");
    Ok(())
}

pub async fn favorite(
    state: &AppState,
    user_id: Uuid,
    slug: &str,
) -> Result<ArticlePayload, ApiError> {
    set_favorite(state, user_id, slug, true).await
}

pub async fn unfavorite(
    state: &AppState,
    user_id: Uuid,
    slug: &str,
) -> Result<ArticlePayload, ApiError> {
    set_favorite(state, user_id, slug, false).await
}

async fn set_favorite(
    state: &AppState,
    user_id: Uuid,
    slug: &str,
    favorited: bool,
) -> Result<ArticlePayload, ApiError> {
    let row = repo::find_by_slug(&state.db, slug)
        .await?
        .ok_or(ApiError::NotFound)?;

    if favorited {
        repo::favorite(&state.db, row.id, user_id).await?;
    } else {
        repo::unfavorite(&state.db, row.id, user_id).await?;
    }

    // Re-read for a fresh favorites aggregate.
    let row = repo::find_by_slug(&state.db, slug)
        .await?
        .ok_or(ApiError::NotFound)?;
    let author = load_author(state, &row).await?;
    let viewer_ctx = ViewerContext::load(&state.db, user_id).await?;
    Ok(presenter::render(&row, &author, Some(&viewer_ctx)))
}


#[cfg(test)]
mod validation_tests {
    use super::*;

    fn fields(title: &str, description: &str, body: &str) -> CreateArticleFields {
        CreateArticleFields {
            title: title.into(),
            description: description.into(),
            body: body.into(),
            tag_list: Vec::new(),
        }
    }

    fn validation_fields(err: ApiError) -> serde_json::Value {
        match err {
            ApiError::Validation(errors) => serde_json::to_value(&errors).unwrap(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_requires_all_three_fields() {
        let err = validate_create(&fields(" ", "", "ok")).unwrap_err();
        let value = validation_fields(err);
        assert!(value.get("title").is_some());
        assert!(value.get("description").is_some());
        assert!(value.get("body").is_none());
    }

    #[test]
    fn create_accepts_complete_fields() {
        assert!(validate_create(&fields("t", "d", "b")).is_ok());
    }

    #[test]
    fn update_accepts_all_absent_fields() {
        assert!(validate_update(&UpdateArticleFields::default()).is_ok());
    }

    #[test]
    fn update_rejects_provided_blank_fields() {
        let update = UpdateArticleFields {
            title: Some("  ".into()),
            body: Some("".into()),
            ..Default::default()
        };
        let value = validation_fields(validate_update(&update).unwrap_err());
        assert!(value.get("title").is_some());
        assert!(value.get("body").is_some());
        assert!(value.get("description").is_none());
    }
}
