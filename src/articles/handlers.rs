use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::instrument;

use super::dto::{
    ArticleListResponse, ArticleResponse, CreateArticleRequest, ListQuery, UpdateArticleRequest,
};
use super::services;
use crate::auth::extractors::{AuthUser, Viewer};
use crate::error::ApiResult;
use crate::state::AppState;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/articles", get(list_articles))
        .route("/articles/:slug", get(get_article))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/articles", post(create_article))
        .route(
            "/articles/:slug",
            axum::routing::put(update_article).delete(delete_article),
        )
        .route(
            "/articles/:slug/favorite",
            post(favorite_article).delete(unfavorite_article),
        )
}

#[instrument(skip(state))]
pub async fn list_articles(
    State(state): State<AppState>,
    viewer: Viewer,
    query: ListQuery,
) -> ApiResult<ArticleListResponse> {
    let (articles, articles_count) = services::list(&state, viewer, query).await?;
    Ok(Json(ArticleListResponse {
        articles,
        articles_count,
    }))
}

#[instrument(skip(state))]
pub async fn get_article(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
) -> ApiResult<ArticleResponse> {
    let article = services::get(&state, viewer, &slug).await?;
    Ok(Json(ArticleResponse { article }))
}

#[instrument(skip(state, body))]
pub async fn create_article(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateArticleRequest>,
) -> ApiResult<ArticleResponse> {
    let article = services::create(&state, user_id, body.article).await?;
    Ok(Json(ArticleResponse { article }))
}

#[instrument(skip(state, body))]
pub async fn update_article(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(slug): Path<String>,
    Json(body): Json<UpdateArticleRequest>,
) -> ApiResult<ArticleResponse> {
    let article = services::update(&state, user_id, &slug, body.article).await?;
    Ok(Json(ArticleResponse { article }))
}

#[instrument(skip(state))]
pub async fn delete_article(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<Value> {
    services::delete(&state, user_id, &slug).await?;
    Ok(Json(json!({})))
}

#[instrument(skip(state))]
pub async fn favorite_article(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<ArticleResponse> {
    let article = services::favorite(&state, user_id, &slug).await?;
    Ok(Json(ArticleResponse { article }))
}

#[instrument(skip(state))]
pub async fn unfavorite_article(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<ArticleResponse> {
    let article = services::unfavorite(&state, user_id, &slug).await?;
    Ok(Json(ArticleResponse { article }))
}
