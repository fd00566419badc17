//! Fixed editorial sections used to group articles.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "article_category", rename_all = "snake_case")]
pub enum Category {
    Politics,
    Economy,
    Labor,
    World,
    Culture,
    Climate,
    Opinion,
}

impl Category {
    pub fn all() -> &'static [Category] {
        &[
            Self::Politics,
            Self::Economy,
            Self::Labor,
            Self::World,
            Self::Culture,
            Self::Climate,
            Self::Opinion,
        ]
    }

    pub fn slug(self) -> &'static str {
        match self {
            Self::Politics => "politics",
            Self::Economy => "economy",
            Self::Labor => "labor",
            Self::World => "world",
            Self::Culture => "culture",
            Self::Climate => "climate",
            Self::Opinion => "opinion",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Politics => "Politics",
            Self::Economy => "Economy",
            Self::Labor => "Labor",
            Self::World => "World",
            Self::Culture => "Culture",
            Self::Climate => "Climate",
            Self::Opinion => "Opinion",
        }
    }

    /// Comma separated slugs, used when telling the model which sections exist.
    pub fn slug_list() -> String {
        Self::all()
            .iter()
            .map(|category| category.slug())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|category| {
                category.slug() == needle || category.display_name().eq_ignore_ascii_case(&needle)
            })
            .ok_or_else(|| {
                DomainError::validation("category", format!("unknown category `{}`", s.trim()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slug_and_display_name() {
        assert_eq!("labor".parse::<Category>().unwrap(), Category::Labor);
        assert_eq!(" Climate".parse::<Category>().unwrap(), Category::Climate);
        assert!("sports".parse::<Category>().is_err());
    }

    #[test]
    fn slug_list_covers_every_category() {
        let list = Category::slug_list();
        for category in Category::all() {
            assert!(list.contains(category.slug()));
        }
    }
}
