use serde::{Deserialize, Serialize};

/// Closed set of consent categories. Unknown category names in stored data
/// fail deserialization instead of being carried along silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryId {
    Necessary,
    Analytics,
    Marketing,
    Functional,
    SocialMedia,
}

impl CategoryId {
    pub const ALL: [CategoryId; 5] = [
        CategoryId::Necessary,
        CategoryId::Analytics,
        CategoryId::Marketing,
        CategoryId::Functional,
        CategoryId::SocialMedia,
    ];

    /// Every category a user can actually toggle (everything but necessary).
    pub fn optional() -> impl Iterator<Item = CategoryId> {
        Self::ALL.into_iter().filter(|c| !c.is_necessary())
    }

    pub fn is_necessary(self) -> bool {
        matches!(self, CategoryId::Necessary)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CategoryId::Necessary => "necessary",
            CategoryId::Analytics => "analytics",
            CategoryId::Marketing => "marketing",
            CategoryId::Functional => "functional",
            CategoryId::SocialMedia => "social_media",
        }
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_excludes_necessary() {
        let optional: Vec<CategoryId> = CategoryId::optional().collect();
        assert_eq!(optional.len(), CategoryId::ALL.len() - 1);
        assert!(!optional.contains(&CategoryId::Necessary));
    }

    #[test]
    fn test_serializes_as_snake_case() {
        let json = serde_json::to_string(&CategoryId::SocialMedia).unwrap();
        assert_eq!(json, r#""social_media""#);
    }

    #[test]
    fn test_unknown_category_rejected() {
        let result: Result<CategoryId, _> = serde_json::from_str(r#""advertising""#);
        assert!(result.is_err());
    }
}
