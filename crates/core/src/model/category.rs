use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ids::CategoryId;
use crate::slug::hyphenate_whitespace;

/// Normalized category label.
///
/// Construction always normalizes, so two names that only differ in their
/// whitespace compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryName(String);

impl CategoryName {
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(hyphenate_whitespace(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A named grouping of quizzes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    id: CategoryId,
    name: CategoryName,
}

impl Category {
    #[must_use]
    pub fn new(id: CategoryId, name: CategoryName) -> Self {
        Self { id, name }
    }

    #[must_use]
    pub fn id(&self) -> CategoryId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &CategoryName {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_normalized_on_construction() {
        assert_eq!(CategoryName::new("elderberries").as_str(), "elderberries");
        assert_eq!(CategoryName::new("straw.berries").as_str(), "straw.berries");
        assert_eq!(CategoryName::new("black berries").as_str(), "black-berries");
        assert_eq!(
            CategoryName::new("squishy   berries").as_str(),
            "squishy-berries"
        );
    }

    #[test]
    fn normalizing_twice_is_stable() {
        let once = CategoryName::new("black   berries");
        let twice = CategoryName::new(once.as_str());
        assert_eq!(once, twice);
    }
}
