use uuid::Uuid;

pub const DEFAULT_LIMIT: i64 = 20;
/// Upper bound on page size; keeps a single request from scanning the
/// whole table.
pub const MAX_LIMIT: i64 = 100;

/// Pagination window with both values forced into sane bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn clamp(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(0, MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

/// Author dimension of a listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorFilter {
    /// No author restriction.
    Any,
    Id(Uuid),
    /// The requested username does not exist; the filter matches nothing.
    Unknown,
}

/// Store-level filter over articles. Dimensions combine with AND; the
/// multi-valued inputs within a dimension (tags, favoriting users) combine
/// with OR.
#[derive(Debug, Clone)]
pub struct ArticleFilter {
    pub tags: Option<Vec<String>>,
    pub author: AuthorFilter,
    /// Union of the favorite sets of the requested usernames; `None` means
    /// no restriction, an empty union matches nothing.
    pub favorited_by: Option<Vec<Uuid>>,
}

impl ArticleFilter {
    pub fn new(tags: Vec<String>, author: AuthorFilter, favorited_by: Option<Vec<Uuid>>) -> Self {
        Self {
            tags: if tags.is_empty() { None } else { Some(tags) },
            author,
            favorited_by,
        }
    }

    /// True when the filter provably matches no article, so the store can
    /// skip the query entirely.
    pub fn matches_nothing(&self) -> bool {
        matches!(self.author, AuthorFilter::Unknown)
            || matches!(&self.favorited_by, Some(ids) if ids.is_empty())
    }

    pub fn author_id(&self) -> Option<Uuid> {
        match self.author {
            AuthorFilter::Id(id) => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod query_tests {
    use super::*;

    #[test]
    fn page_defaults() {
        assert_eq!(
            Page::clamp(None, None),
            Page {
                limit: DEFAULT_LIMIT,
                offset: 0
            }
        );
    }

    #[test]
    fn page_clamps_negative_values() {
        assert_eq!(
            Page::clamp(Some(-5), Some(-3)),
            Page {
                limit: 0,
                offset: 0
            }
        );
    }

    #[test]
    fn page_caps_limit() {
        assert_eq!(Page::clamp(Some(1000), None).limit, MAX_LIMIT);
    }

    #[test]
    fn unknown_author_matches_nothing() {
        let filter = ArticleFilter::new(vec!["git".into()], AuthorFilter::Unknown, None);
        assert!(filter.matches_nothing());
    }

    #[test]
    fn empty_favorites_union_matches_nothing() {
        let filter = ArticleFilter::new(Vec::new(), AuthorFilter::Any, Some(Vec::new()));
        assert!(filter.matches_nothing());
    }

    #[test]
    fn unrestricted_filter_matches() {
        let filter = ArticleFilter::new(Vec::new(), AuthorFilter::Any, None);
        assert!(!filter.matches_nothing());
        assert_eq!(filter.tags, None);
        assert_eq!(filter.author_id(), None);
    }

    #[test]
    fn author_id_comes_from_resolved_user() {
        let id = Uuid::new_v4();
        let filter = ArticleFilter::new(Vec::new(), AuthorFilter::Id(id), None);
        assert_eq!(filter.author_id(), Some(id));
        assert!(!filter.matches_nothing());
    }
}
