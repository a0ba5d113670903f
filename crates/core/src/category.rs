use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Reserved category assigned when no keyword matches. Always present,
/// never carries keywords.
pub const FALLBACK_CATEGORY: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    #[error("Category already exists: {0}")]
    DuplicateCategory(String),
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
    #[error("Category name must not be empty")]
    EmptyName,
    #[error("Keyword must not be empty")]
    EmptyKeyword,
    #[error("The Uncategorized category cannot hold keywords")]
    FallbackKeyword,
    #[error("The Uncategorized category cannot be removed")]
    FallbackRemoval,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub keywords: Vec<String>,
}

impl Category {
    fn new(name: &str) -> Self {
        Category {
            name: name.to_string(),
            keywords: Vec::new(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.name == FALLBACK_CATEGORY
    }
}

/// Lowercases and trims keyword text.
pub fn normalize_keyword(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Category name → keywords, kept in insertion order.
///
/// Iteration order decides which category wins when keywords of several
/// categories match the same text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categories {
    entries: Vec<Category>,
}

impl Default for Categories {
    fn default() -> Self {
        Categories {
            entries: vec![Category::new(FALLBACK_CATEGORY)],
        }
    }
}

impl Categories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.entries.iter().find(|c| c.name == name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Category> {
        self.entries.iter_mut().find(|c| c.name == name)
    }

    pub fn keywords(&self, name: &str) -> Option<&[String]> {
        self.get(name).map(|c| c.keywords.as_slice())
    }

    pub fn create(&mut self, name: &str) -> Result<(), CategoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CategoryError::EmptyName);
        }
        if self.contains(name) {
            return Err(CategoryError::DuplicateCategory(name.to_string()));
        }
        self.entries.push(Category::new(name));
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<Category, CategoryError> {
        if name == FALLBACK_CATEGORY {
            return Err(CategoryError::FallbackRemoval);
        }
        let idx = self
            .entries
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| CategoryError::UnknownCategory(name.to_string()))?;
        Ok(self.entries.remove(idx))
    }

    /// Adds a normalized keyword. Returns `false` when the category already
    /// had it.
    pub fn add_keyword(&mut self, category: &str, text: &str) -> Result<bool, CategoryError> {
        let entry = self
            .get_mut(category)
            .ok_or_else(|| CategoryError::UnknownCategory(category.to_string()))?;
        if entry.is_fallback() {
            return Err(CategoryError::FallbackKeyword);
        }
        let keyword = normalize_keyword(text);
        if keyword.is_empty() {
            return Err(CategoryError::EmptyKeyword);
        }
        if entry.keywords.contains(&keyword) {
            return Ok(false);
        }
        entry.keywords.push(keyword);
        Ok(true)
    }

    /// Rebuilds a mapping read from storage so it satisfies the invariants:
    /// fallback first and keyword-free, keywords normalized and unique.
    ///
    /// Returns the keywords that had to be dropped: those stored under the
    /// fallback or under a blank name, and those that are blank themselves.
    /// Duplicates merge silently.
    pub fn from_entries(entries: Vec<(String, Vec<String>)>) -> (Self, Vec<String>) {
        let mut categories = Categories::default();
        let mut discarded = Vec::new();
        for (name, keywords) in entries {
            let name = name.trim();
            if name == FALLBACK_CATEGORY || name.is_empty() {
                discarded.extend(keywords);
                continue;
            }
            // Names repeated after trimming merge into the first entry.
            if !categories.contains(name) && categories.create(name).is_err() {
                discarded.extend(keywords);
                continue;
            }
            for keyword in keywords {
                if categories.add_keyword(name, &keyword).is_err() {
                    discarded.push(keyword);
                }
            }
        }
        (categories, discarded)
    }
}

impl Serialize for Categories {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.name, &entry.keywords)?;
        }
        map.end()
    }
}

/// The stored mapping exactly as written, before invariants are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryEntries(pub Vec<(String, Vec<String>)>);

struct EntriesVisitor;

impl<'de> Visitor<'de> for EntriesVisitor {
    type Value = CategoryEntries;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of category name to keyword list")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<CategoryEntries, A::Error> {
        let mut entries = Vec::new();
        while let Some((name, keywords)) = access.next_entry::<String, Vec<String>>()? {
            entries.push((name, keywords));
        }
        Ok(CategoryEntries(entries))
    }
}

impl<'de> Deserialize<'de> for CategoryEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(EntriesVisitor)
    }
}

impl<'de> Deserialize<'de> for Categories {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let CategoryEntries(entries) = CategoryEntries::deserialize(deserializer)?;
        Ok(Categories::from_entries(entries).0)
    }
}
