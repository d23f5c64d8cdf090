//! Feed page request normalization: page bounds, the created-time filter and the
//! closed set of sortable columns.

use chrono::{DateTime, Utc};

use super::error::DomainError;

pub(crate) const DEFAULT_PAGE_SIZE: u32 = 20;
pub(crate) const MAX_PAGE_SIZE: u32 = 100;

/// Feed request as it arrives from a client, before any normalization.
#[derive(Debug, Clone, Default)]
pub(crate) struct FeedQuery {
    pub(crate) page: Option<i64>,
    pub(crate) page_size: Option<i64>,
    pub(crate) time_from: Option<String>,
    pub(crate) time_to: Option<String>,
    pub(crate) sort_field: Option<String>,
    pub(crate) sort_direction: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SortField {
    CreatedAt,
    Views,
    Likes,
    Stars,
    CommentNumber,
}

impl SortField {
    /// Case-insensitive lookup, accepting the synonyms clients commonly send.
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "created_at" | "createdat" | "time" => Some(Self::CreatedAt),
            "views" => Some(Self::Views),
            "likes" => Some(Self::Likes),
            "stars" => Some(Self::Stars),
            "comment_number" | "comments" | "replies" => Some(Self::CommentNumber),
            _ => None,
        }
    }

    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Views => "views",
            Self::Likes => "likes",
            Self::Stars => "stars",
            Self::CommentNumber => "comment_number",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Anything that is not an explicit ascending marker sorts descending.
    pub(crate) fn parse(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_lowercase()).as_deref() {
            Some("asc" | "ascend" | "ascending") => Self::Asc,
            _ => Self::Desc,
        }
    }

    pub(crate) fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FeedSort {
    pub(crate) field: SortField,
    pub(crate) direction: SortDirection,
}

impl Default for FeedSort {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

impl FeedSort {
    /// Unknown or missing fields fall back to the default sort instead of failing.
    pub(crate) fn resolve(field: Option<&str>, direction: Option<&str>) -> Self {
        match field.and_then(SortField::parse) {
            Some(field) => Self {
                field,
                direction: SortDirection::parse(direction),
            },
            None => Self::default(),
        }
    }
}

/// Created-time range shared by the count and the page fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FeedFilters {
    pub(crate) time_from: Option<DateTime<Utc>>,
    pub(crate) time_to: Option<DateTime<Utc>>,
}

impl FeedFilters {
    pub(crate) fn parse(
        time_from: Option<&str>,
        time_to: Option<&str>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            time_from: parse_timestamp("time_from", time_from)?,
            time_to: parse_timestamp("time_to", time_to)?,
        })
    }
}

#[cfg(test)]
impl FeedFilters {
    /// In-memory twin of the SQL predicate, used by repository fakes.
    pub(crate) fn matches(&self, created_at: DateTime<Utc>) -> bool {
        self.time_from.is_none_or(|from| created_at >= from)
            && self.time_to.is_none_or(|to| created_at <= to)
    }
}

fn parse_timestamp(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<DateTime<Utc>>, DomainError> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| Some(parsed.with_timezone(&Utc)))
        .map_err(|_| DomainError::InvalidFilter { field })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageParams {
    pub(crate) page: u32,
    pub(crate) page_size: u32,
}

impl PageParams {
    /// Non-positive values fall back to page 1 and the default page size; larger page sizes
    /// are clamped to [`MAX_PAGE_SIZE`].
    pub(crate) fn normalize(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = page
            .filter(|page| *page > 0)
            .and_then(|page| u32::try_from(page).ok())
            .unwrap_or(1);
        let page_size = page_size
            .filter(|size| *size > 0)
            .and_then(|size| u32::try_from(size).ok())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        Self { page, page_size }
    }

    pub(crate) fn limit(self) -> i64 {
        i64::from(self.page_size)
    }

    /// Saturates instead of overflowing; a saturated offset lands past the last row.
    pub(crate) fn offset(self) -> i64 {
        i64::from(self.page.saturating_sub(1))
            .checked_mul(i64::from(self.page_size))
            .unwrap_or(i64::MAX)
    }
}

/// A fully normalized feed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FeedPageRequest {
    pub(crate) page: PageParams,
    pub(crate) filters: FeedFilters,
    pub(crate) sort: FeedSort,
}

impl FeedQuery {
    pub(crate) fn normalize(self) -> Result<FeedPageRequest, DomainError> {
        let page = PageParams::normalize(self.page, self.page_size);
        let filters = FeedFilters::parse(self.time_from.as_deref(), self.time_to.as_deref())?;
        let sort = FeedSort::resolve(self.sort_field.as_deref(), self.sort_direction.as_deref());
        Ok(FeedPageRequest {
            page,
            filters,
            sort,
        })
    }
}

pub(crate) fn total_pages(total: i64, page_size: u32) -> i64 {
    if page_size == 0 || total <= 0 {
        return 0;
    }
    let page_size = i64::from(page_size);
    (total - 1) / page_size + 1
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{
        DEFAULT_PAGE_SIZE, FeedFilters, FeedQuery, FeedSort, MAX_PAGE_SIZE, PageParams,
        SortDirection, SortField, total_pages,
    };
    use crate::domain::error::DomainError;

    #[test]
    fn sort_synonyms_are_case_insensitive() {
        let sort = FeedSort::resolve(Some("Comments"), Some("ASCENDING"));
        assert_eq!(sort.field, SortField::CommentNumber);
        assert_eq!(sort.direction, SortDirection::Asc);

        assert_eq!(SortField::parse(" TIME "), Some(SortField::CreatedAt));
        assert_eq!(SortField::parse("replies"), Some(SortField::CommentNumber));
        assert_eq!(SortField::parse("Stars"), Some(SortField::Stars));
    }

    #[test]
    fn unknown_sort_field_falls_back_to_default() {
        let sort = FeedSort::resolve(Some("bogus"), Some("asc"));
        assert_eq!(sort, FeedSort::default());
        assert_eq!(sort.field, SortField::CreatedAt);
        assert_eq!(sort.direction, SortDirection::Desc);

        assert_eq!(FeedSort::resolve(None, None), FeedSort::default());
    }

    #[test]
    fn direction_defaults_to_descending() {
        assert_eq!(SortDirection::parse(None), SortDirection::Desc);
        assert_eq!(SortDirection::parse(Some("up")), SortDirection::Desc);
        assert_eq!(SortDirection::parse(Some("Ascend")), SortDirection::Asc);
        assert_eq!(SortDirection::parse(Some("asc")), SortDirection::Asc);
    }

    #[test]
    fn page_params_default_non_positive_values() {
        let params = PageParams::normalize(Some(0), Some(-5));
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(params.offset(), 0);

        let params = PageParams::normalize(Some(3), Some(2));
        assert_eq!(params.limit(), 2);
        assert_eq!(params.offset(), 4);
    }

    #[test]
    fn extreme_page_values_stay_bounded() {
        let request = FeedQuery {
            page: Some(i64::from(u32::MAX)),
            page_size: Some(i64::from(u32::MAX)),
            ..FeedQuery::default()
        }
        .normalize()
        .expect("extreme paging must normalize");

        assert_eq!(request.page.page_size, MAX_PAGE_SIZE);
        assert_eq!(request.page.limit(), i64::from(MAX_PAGE_SIZE));
        assert_eq!(
            request.page.offset(),
            i64::from(u32::MAX - 1) * i64::from(MAX_PAGE_SIZE)
        );

        let beyond_u32 = PageParams::normalize(Some(i64::MAX), Some(i64::MAX));
        assert_eq!(beyond_u32.page, 1);
        assert_eq!(beyond_u32.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn filters_parse_rfc3339_and_reject_garbage() {
        let filters = FeedFilters::parse(Some("2024-01-01T00:00:00Z"), Some("  "))
            .expect("filters must parse");
        assert_eq!(
            filters.time_from,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert!(filters.time_to.is_none());

        let err = FeedFilters::parse(None, Some("yesterday")).expect_err("must be rejected");
        assert!(matches!(err, DomainError::InvalidFilter { field: "time_to" }));
    }

    #[test]
    fn filters_match_inclusive_range() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let filters = FeedFilters {
            time_from: Some(from),
            time_to: Some(to),
        };

        assert!(filters.matches(from));
        assert!(filters.matches(to));
        assert!(!filters.matches(to + chrono::Duration::seconds(1)));
        assert!(FeedFilters::default().matches(from));
    }

    #[test]
    fn query_normalize_propagates_invalid_filter() {
        let query = FeedQuery {
            time_from: Some("not-a-date".to_string()),
            ..FeedQuery::default()
        };
        assert!(query.normalize().is_err());
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(40, 20), 2);
        assert_eq!(total_pages(41, 20), 3);
        assert_eq!(total_pages(5, 0), 0);
    }
}
