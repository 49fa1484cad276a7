//! Catalog browsing criteria.

use serde::Deserialize;

/// Maximum number of products returned by the featured listing.
pub const FEATURED_LIMIT: usize = 8;

/// Optional catalog filters. All present filters must match.
///
/// - `category`, `brand`: exact match
/// - `search`: case-insensitive substring of the product name
///
/// Blank values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogFilter {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub search: Option<String>,
}

impl CatalogFilter {
    /// Drop blank criteria and trim the rest.
    pub fn normalized(self) -> Self {
        fn clean(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }

        Self {
            category: clean(self.category),
            brand: clean(self.brand),
            search: clean(self.search),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.brand.is_none() && self.search.is_none()
    }
}
