//! Page requests and page responses for list operations
//!
//! Sort keys are closed enums per entity, so an unknown `sort_by` is rejected
//! when parsed rather than silently ignored. Every key maps to a column alias
//! used by the queries in [`crate::core::store`] (`f.` firewalls,
//! `p.` policies, `r.` rules).

use crate::core::error::ValidationError;
use serde::Serialize;
use std::str::FromStr;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    #[strum(serialize = "asc")]
    Asc,
    #[strum(serialize = "desc")]
    Desc,
}

impl SortDirection {
    pub const fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A sortable column of some entity
pub trait SortKey: Copy + FromStr {
    /// Fully qualified column this key orders by
    fn column(self) -> &'static str;

    /// Column used for the default order and as tie-breaker
    fn id_column() -> &'static str;

    /// Comma-separated list of accepted names, for error messages
    fn expected() -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum FirewallSortKey {
    Id,
    Name,
    Environment,
    Scope,
    CreatedAt,
    UpdatedAt,
}

impl SortKey for FirewallSortKey {
    fn column(self) -> &'static str {
        match self {
            FirewallSortKey::Id => "f.id",
            FirewallSortKey::Name => "f.name",
            FirewallSortKey::Environment => "f.environment",
            FirewallSortKey::Scope => "f.scope",
            FirewallSortKey::CreatedAt => "f.created_at",
            FirewallSortKey::UpdatedAt => "f.updated_at",
        }
    }

    fn id_column() -> &'static str {
        "f.id"
    }

    fn expected() -> &'static str {
        "id, name, environment, scope, created_at, updated_at"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum PolicySortKey {
    Id,
    Name,
    Priority,
    Action,
    Status,
    FirewallId,
    CreatedAt,
    UpdatedAt,
}

impl SortKey for PolicySortKey {
    fn column(self) -> &'static str {
        match self {
            PolicySortKey::Id => "p.id",
            PolicySortKey::Name => "p.name",
            PolicySortKey::Priority => "p.priority",
            PolicySortKey::Action => "p.action",
            PolicySortKey::Status => "p.status",
            PolicySortKey::FirewallId => "p.firewall_id",
            PolicySortKey::CreatedAt => "p.created_at",
            PolicySortKey::UpdatedAt => "p.updated_at",
        }
    }

    fn id_column() -> &'static str {
        "p.id"
    }

    fn expected() -> &'static str {
        "id, name, priority, action, status, firewall_id, created_at, updated_at"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum RuleSortKey {
    Id,
    OrderIndex,
    SourceCidr,
    DestinationCidr,
    Protocol,
}

impl SortKey for RuleSortKey {
    fn column(self) -> &'static str {
        match self {
            RuleSortKey::Id => "r.id",
            RuleSortKey::OrderIndex => "r.order_index",
            RuleSortKey::SourceCidr => "r.source_cidr",
            RuleSortKey::DestinationCidr => "r.destination_cidr",
            RuleSortKey::Protocol => "r.protocol",
        }
    }

    fn id_column() -> &'static str {
        "r.id"
    }

    fn expected() -> &'static str {
        "id, order_index, source_cidr, destination_cidr, protocol"
    }
}

/// Pagination parameters for a list call
///
/// `page` and `size` are only set through [`PageRequest::new`], so every
/// request reaching the store has `page >= 1` and `1 <= size <= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest<K> {
    page: u32,
    size: u32,
    pub sort_by: Option<K>,
    pub sort_dir: SortDirection,
}

impl<K> Default for PageRequest<K> {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
            sort_by: None,
            sort_dir: SortDirection::Asc,
        }
    }
}

impl<K: SortKey> PageRequest<K> {
    /// Builds a request, enforcing `page >= 1` and `1 <= size <= 100`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidField` when either bound is violated.
    pub fn new(page: u32, size: u32) -> Result<Self, ValidationError> {
        if page < 1 {
            return Err(ValidationError::InvalidField {
                field: "page",
                message: "must be >= 1".to_string(),
            });
        }
        if !(1..=MAX_PAGE_SIZE).contains(&size) {
            return Err(ValidationError::InvalidField {
                field: "size",
                message: format!("must be between 1 and {MAX_PAGE_SIZE}"),
            });
        }
        Ok(Self {
            page,
            size,
            ..Self::default()
        })
    }

    /// 1-based page number
    pub const fn page(&self) -> u32 {
        self.page
    }

    pub const fn size(&self) -> u32 {
        self.size
    }

    pub fn sorted(mut self, key: K, dir: SortDirection) -> Self {
        self.sort_by = Some(key);
        self.sort_dir = dir;
        self
    }

    /// Parses textual `sort_by` / `sort_dir` values into the request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidChoice` for an unknown key or direction.
    pub fn with_sort_text(
        mut self,
        sort_by: Option<&str>,
        sort_dir: Option<&str>,
    ) -> Result<Self, ValidationError> {
        if let Some(raw) = sort_by {
            self.sort_by = Some(K::from_str(raw).map_err(|_| ValidationError::InvalidChoice {
                field: "sort_by",
                expected: K::expected(),
                received: raw.to_string(),
            })?);
        }
        if let Some(raw) = sort_dir {
            self.sort_dir = SortDirection::from_str(&raw.to_lowercase()).map_err(|_| {
                ValidationError::InvalidChoice {
                    field: "sort_dir",
                    expected: "asc, desc",
                    received: raw.to_string(),
                }
            })?;
        }
        Ok(self)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.size)
    }

    /// `ORDER BY` body; ties always fall back to ascending id
    pub fn order_by(&self) -> String {
        match self.sort_by {
            None => format!("{} {}", K::id_column(), SortDirection::Asc.as_sql()),
            Some(key) if key.column() == K::id_column() => {
                format!("{} {}", key.column(), self.sort_dir.as_sql())
            }
            Some(key) => format!(
                "{} {}, {} ASC",
                key.column(),
                self.sort_dir.as_sql(),
                K::id_column()
            ),
        }
    }
}

/// One page of results plus navigation metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub page: u32,
    pub size: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new<K>(request: &PageRequest<K>, total: u64, items: Vec<T>) -> Self {
        let total_pages = total.div_ceil(u64::from(request.size));
        Self {
            page: request.page,
            size: request.size,
            total,
            total_pages,
            has_next: u64::from(request.page) < total_pages,
            has_previous: request.page > 1,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request() {
        let request: PageRequest<RuleSortKey> = PageRequest::default();
        assert_eq!(request.page, 1);
        assert_eq!(request.size, DEFAULT_PAGE_SIZE);
        assert_eq!(request.offset(), 0);
        assert_eq!(request.order_by(), "r.id ASC");
    }

    #[test]
    fn test_bounds() {
        assert!(PageRequest::<RuleSortKey>::new(0, 10).is_err());
        assert!(PageRequest::<RuleSortKey>::new(1, 0).is_err());
        assert!(PageRequest::<RuleSortKey>::new(1, 101).is_err());
        assert!(PageRequest::<RuleSortKey>::new(3, 100).is_ok());
    }

    #[test]
    fn test_sorting_keeps_validated_bounds() {
        // The only ways to build a request all carry a usable page and size
        let requests = [
            PageRequest::<RuleSortKey>::default(),
            PageRequest::<RuleSortKey>::default().sorted(RuleSortKey::Protocol, SortDirection::Desc),
            PageRequest::<RuleSortKey>::new(1, MAX_PAGE_SIZE)
                .unwrap()
                .with_sort_text(Some("source_cidr"), Some("asc"))
                .unwrap(),
        ];
        for request in requests {
            assert!(request.page() >= 1);
            assert!((1..=MAX_PAGE_SIZE).contains(&request.size()));
            let page: Page<u8> = Page::new(&request, 0, vec![]);
            assert_eq!(page.total_pages, 0);
            assert_eq!(request.offset(), 0);
        }
    }

    #[test]
    fn test_offset() {
        let request = PageRequest::<RuleSortKey>::new(3, 10).unwrap();
        assert_eq!(request.offset(), 20);
    }

    #[test]
    fn test_sort_text_parsing() {
        let request = PageRequest::<RuleSortKey>::new(1, 10)
            .unwrap()
            .with_sort_text(Some("order_index"), Some("DESC"))
            .unwrap();
        assert_eq!(request.sort_by, Some(RuleSortKey::OrderIndex));
        assert_eq!(request.sort_dir, SortDirection::Desc);
        assert_eq!(request.order_by(), "r.order_index DESC, r.id ASC");
    }

    #[test]
    fn test_unknown_sort_key_rejected() {
        let err = PageRequest::<RuleSortKey>::default()
            .with_sort_text(Some("priority"), None)
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidChoice { field: "sort_by", .. }
        ));

        assert!(
            PageRequest::<PolicySortKey>::default()
                .with_sort_text(Some("priority"), Some("sideways"))
                .is_err()
        );
    }

    #[test]
    fn test_id_sort_has_no_tiebreak() {
        let request =
            PageRequest::<FirewallSortKey>::default().sorted(FirewallSortKey::Id, SortDirection::Desc);
        assert_eq!(request.order_by(), "f.id DESC");
    }

    #[test]
    fn test_page_metadata() {
        let request = PageRequest::<RuleSortKey>::new(1, 10).unwrap();
        let page = Page::new(&request, 15, vec![0; 10]);
        assert_eq!(page.total_pages, 2);
        assert!(page.has_next);
        assert!(!page.has_previous);

        let request = PageRequest::<RuleSortKey>::new(2, 10).unwrap();
        let page = Page::new(&request, 15, vec![0; 5]);
        assert!(!page.has_next);
        assert!(page.has_previous);
    }

    #[test]
    fn test_empty_page() {
        let page: Page<u8> = Page::new(&PageRequest::<RuleSortKey>::default(), 0, vec![]);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next);
    }
}
