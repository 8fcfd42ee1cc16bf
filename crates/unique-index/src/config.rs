use serde::{Deserialize, Serialize};

/// How much a store trusts the order of the content it reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderCheck {
    /// Pages must hold strictly ascending keys, and the ranges of a tree's
    /// children, in name order, must be strictly ascending and disjoint.
    /// A tree checks its children when it first enumerates them, which
    /// decodes every page below it.
    Strict,
    /// Order is a precondition and is never checked. Lookups only decode
    /// the pages on their descent path. On unordered content, `scan` yields
    /// content order and `get` may miss keys that are present.
    Trusted,
}

/// Configuration shared by every store opened from one root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub order_check: OrderCheck,
    /// Memoize a failed decode or enumeration and return the same error on
    /// later access instead of reading the object again.
    pub cache_failures: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            order_check: OrderCheck::Strict,
            cache_failures: true,
        }
    }
}

impl IndexConfig {
    /// Validate ordering everywhere. Same as the default.
    pub fn strict() -> Self {
        Self::default()
    }

    /// Skip order validation so lookups stay lazy.
    pub fn trusted() -> Self {
        Self {
            order_check: OrderCheck::Trusted,
            ..Default::default()
        }
    }

    pub fn with_cache_failures(mut self, cache_failures: bool) -> Self {
        self.cache_failures = cache_failures;
        self
    }

    pub(crate) fn is_strict(&self) -> bool {
        self.order_check == OrderCheck::Strict
    }
}
