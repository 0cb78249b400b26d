use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

use super::presenter::ArticlePayload;
use crate::error::{ApiError, ValidationErrors};

/// Filters and pagination accepted by the listing endpoint. `tag` and
/// `favorited` may be repeated and accumulate; `author` takes a single
/// username.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub tags: Vec<String>,
    pub author: Option<String>,
    pub favorited: Vec<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQuery {
    /// Parses a raw query string. Unknown keys are ignored; a non-numeric
    /// limit or offset is a validation failure rather than a silent default.
    pub fn parse(query: &str) -> Result<Self, ApiError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).map_err(|_| {
            ApiError::Validation(ValidationErrors::single("query", "malformed query string"))
        })?;

        let mut out = ListQuery::default();
        let mut errors = ValidationErrors::default();
        for (key, value) in pairs {
            match key.as_str() {
                "tag" => out.tags.push(value),
                "author" => out.author = Some(value),
                "favorited" => out.favorited.push(value),
                "limit" => match value.parse() {
                    Ok(v) => out.limit = Some(v),
                    Err(_) => errors.add("limit", "must be an integer"),
                },
                "offset" => match value.parse() {
                    Ok(v) => out.offset = Some(v),
                    Err(_) => errors.add("offset", "must be an integer"),
                },
                _ => {}
            }
        }
        errors.into_result()?;
        Ok(out)
    }
}

// axum's own `Query` collapses repeated keys, so the listing endpoint
// extracts from the raw query string instead.
#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ListQuery {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        ListQuery::parse(parts.uri.query().unwrap_or(""))
    }
}

/// Request body for article creation.
#[derive(Debug, Deserialize)]
pub struct CreateArticleRequest {
    pub article: CreateArticleFields,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArticleFields {
    pub title: String,
    pub description: String,
    pub body: String,
    #[serde(default)]
    pub tag_list: Vec<String>,
}

/// Request body for partial article updates.
#[derive(Debug, Deserialize)]
pub struct UpdateArticleRequest {
    pub article: UpdateArticleFields,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArticleFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    pub tag_list: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    pub article: ArticlePayload,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleListResponse {
    pub articles: Vec<ArticlePayload>,
    pub articles_count: i64,
}

#[cfg(test)]
mod list_query_tests {
    use super::*;

    #[test]
    fn empty_query_is_default() {
        assert_eq!(ListQuery::parse("").unwrap(), ListQuery::default());
    }

    #[test]
    fn repeated_tags_accumulate() {
        let query = ListQuery::parse("tag=git&tag=node").unwrap();
        assert_eq!(query.tags, vec!["git".to_string(), "node".to_string()]);
    }

    #[test]
    fn repeated_favorited_usernames_accumulate() {
        let query = ListQuery::parse("favorited=jake&favorited=anah").unwrap();
        assert_eq!(
            query.favorited,
            vec!["jake".to_string(), "anah".to_string()]
        );
    }

    #[test]
    fn parses_author_and_pagination() {
        let query = ListQuery::parse("author=jake&limit=10&offset=40").unwrap();
        assert_eq!(query.author.as_deref(), Some("jake"));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(40));
    }

    #[test]
    fn decodes_percent_encoded_values() {
        let query = ListQuery::parse("tag=rust%20lang").unwrap();
        assert_eq!(query.tags, vec!["rust lang".to_string()]);
    }

    #[test]
    fn rejects_non_numeric_pagination() {
        let err = ListQuery::parse("limit=lots").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = ListQuery::parse("offset=first").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn ignores_unknown_keys() {
        let query = ListQuery::parse("tag=git&utm_source=feed").unwrap();
        assert_eq!(query.tags, vec!["git".to_string()]);
    }
}
