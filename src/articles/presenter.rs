use serde::Serialize;
use time::OffsetDateTime;

use super::repo::ArticleRow;
use crate::users::repo::{User, ViewerContext};

/// Author block of a rendered article.
#[derive(Debug, Serialize)]
pub struct AuthorSummary {
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub following: bool,
}

/// Viewer-contextualized article representation returned over the API
/// boundary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePayload {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub favorited: bool,
    pub favorites_count: i64,
    pub author: AuthorSummary,
}

/// Renders a stored article for the given viewer.
///
/// `favorites_count` comes from the store aggregate and never depends on
/// the viewer; `favorited` and `following` do, and are always false for an
/// anonymous viewer. An article that was never edited reports its creation
/// time as `updatedAt`.
pub fn render(article: &ArticleRow, author: &User, viewer: Option<&ViewerContext>) -> ArticlePayload {
    ArticlePayload {
        slug: article.slug.clone(),
        title: article.title.clone(),
        description: article.description.clone(),
        body: article.body.clone(),
        tag_list: article.tag_list.clone(),
        created_at: article.created_at,
        updated_at: article.updated_at.unwrap_or(article.created_at),
        favorited: viewer.is_some_and(|v| v.favorites.contains(&article.id)),
        favorites_count: article.favorites_count,
        author: AuthorSummary {
            username: author.username.clone(),
            bio: author.bio.clone(),
            image: author.image.clone(),
            following: viewer.is_some_and(|v| v.following.contains(&author.id)),
        },
    }
}

#[cfg(test)]
mod presenter_tests {
    use super::*;
    use time::macros::datetime;
    use uuid::Uuid;

    fn article(favorites_count: i64) -> ArticleRow {
        ArticleRow {
            id: Uuid::new_v4(),
            slug: "how-to-train-your-dragon".into(),
            title: "How to train your dragon".into(),
            description: "Ever wondered how?".into(),
            body: "You have to believe".into(),
            tag_list: vec!["dragons".into(), "training".into()],
            author_id: Uuid::new_v4(),
            created_at: datetime!(2024-03-01 12:00 UTC),
            updated_at: None,
            favorites_count,
        }
    }

    fn author(article: &ArticleRow) -> User {
        User {
            id: article.author_id,
            username: "jake".into(),
            bio: Some("I work at statefarm".into()),
            image: None,
            created_at: datetime!(2024-01-01 0:00 UTC),
        }
    }

    #[test]
    fn anonymous_viewer_sees_favorited_and_following_false() {
        let row = article(3);
        let payload = render(&row, &author(&row), None);
        assert!(!payload.favorited);
        assert!(!payload.author.following);
        assert_eq!(payload.favorites_count, 3);
    }

    #[test]
    fn favorited_tracks_the_viewer_favorite_set() {
        let row = article(1);
        let user = author(&row);

        let mut fan = ViewerContext::default();
        fan.favorites.insert(row.id);
        assert!(render(&row, &user, Some(&fan)).favorited);

        let bystander = ViewerContext::default();
        assert!(!render(&row, &user, Some(&bystander)).favorited);
    }

    #[test]
    fn favorites_count_is_viewer_independent() {
        let row = article(7);
        let user = author(&row);

        let mut fan = ViewerContext::default();
        fan.favorites.insert(row.id);

        assert_eq!(render(&row, &user, None).favorites_count, 7);
        assert_eq!(render(&row, &user, Some(&fan)).favorites_count, 7);
    }

    #[test]
    fn following_comes_from_the_viewer_follow_set() {
        let row = article(0);
        let user = author(&row);

        let mut follower = ViewerContext::default();
        follower.following.insert(user.id);
        assert!(render(&row, &user, Some(&follower)).author.following);
    }

    #[test]
    fn updated_at_falls_back_to_created_at() {
        let mut row = article(0);
        let user = author(&row);
        assert_eq!(render(&row, &user, None).updated_at, row.created_at);

        let edited = datetime!(2024-03-02 9:30 UTC);
        row.updated_at = Some(edited);
        assert_eq!(render(&row, &user, None).updated_at, edited);
    }

    #[test]
    fn wire_format_uses_camel_case() {
        let row = article(2);
        let value = serde_json::to_value(render(&row, &author(&row), None)).unwrap();
        assert!(value.get("tagList").is_some());
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
        assert!(value.get("favoritesCount").is_some());
        assert_eq!(value["author"]["username"], "jake");
        assert_eq!(value["author"]["following"], false);
    }
}
