use std::fmt;

use serde::{Deserialize, Serialize};
use unique_codec::Key;

/// Inclusive bounds of every key reachable from a store node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    #[serde(rename = "gte")]
    pub low: Key,
    #[serde(rename = "lte")]
    pub high: Key,
}

impl KeyRange {
    /// Bounds are taken as given. A tree over unordered siblings read with
    /// [`OrderCheck::Trusted`](crate::OrderCheck) can end up with `low`
    /// above `high`, which contains no key.
    pub fn new(low: Key, high: Key) -> Self {
        Self { low, high }
    }

    /// The range holding exactly one key.
    pub fn point(key: Key) -> Self {
        Self {
            low: key.clone(),
            high: key,
        }
    }

    /// Smallest range covering `keys`, or `None` if there are none.
    pub fn covering<'a>(keys: impl IntoIterator<Item = &'a Key>) -> Option<Self> {
        keys.into_iter().fold(None, |acc, key| match acc {
            None => Some(Self::point(key.clone())),
            Some(Self { low, high }) => Some(Self {
                low: if *key < low { key.clone() } else { low },
                high: if *key > high { key.clone() } else { high },
            }),
        })
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.low <= *key && *key <= self.high
    }

    /// Every key in this range is less than `key`.
    pub fn is_below(&self, key: &Key) -> bool {
        self.high < *key
    }

    /// Every key in this range is greater than `key`.
    pub fn is_above(&self, key: &Key) -> bool {
        self.low > *key
    }

    /// This range ends strictly before `other` begins.
    pub fn precedes(&self, other: &KeyRange) -> bool {
        self.high < other.low
    }

    /// Smallest range covering both.
    pub fn union(&self, other: &KeyRange) -> Self {
        Self {
            low: self.low.clone().min(other.low.clone()),
            high: self.high.clone().max(other.high.clone()),
        }
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} ..= {}]", self.low, self.high)
    }
}
