use serde::{Deserialize, Serialize};

pub type CategoryId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Icon identifier, resolved through [`CategoryIcon::from_id`]
    pub icon: Option<String>,
}

impl Category {
    pub fn new(name: impl Into<String>, icon: Option<&str>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            icon: icon.map(str::to_string),
        }
    }

    pub fn glyph(&self) -> &'static str {
        self.icon
            .as_deref()
            .and_then(CategoryIcon::from_id)
            .unwrap_or_default()
            .glyph()
    }
}

/// Known category icons. Identifiers are matched against a fixed table, so an
/// unknown name resolves to `None` instead of failing at lookup time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CategoryIcon {
    #[default]
    Book,
    Food,
    Travel,
    Animals,
    Home,
    Work,
    Nature,
    Sports,
    Music,
    Health,
}

const ICONS: &[(&str, CategoryIcon, &str)] = &[
    ("book", CategoryIcon::Book, "📖"),
    ("food", CategoryIcon::Food, "🍎"),
    ("travel", CategoryIcon::Travel, "✈"),
    ("animals", CategoryIcon::Animals, "🐾"),
    ("home", CategoryIcon::Home, "🏠"),
    ("work", CategoryIcon::Work, "💼"),
    ("nature", CategoryIcon::Nature, "🌿"),
    ("sports", CategoryIcon::Sports, "⚽"),
    ("music", CategoryIcon::Music, "♪"),
    ("health", CategoryIcon::Health, "✚"),
];

impl CategoryIcon {
    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim().to_lowercase();
        ICONS
            .iter()
            .find(|(name, _, _)| *name == id)
            .map(|(_, icon, _)| *icon)
    }

    pub fn glyph(self) -> &'static str {
        ICONS
            .iter()
            .find(|(_, icon, _)| *icon == self)
            .map(|(_, _, glyph)| *glyph)
            .unwrap_or("•")
    }

    pub fn all() -> impl Iterator<Item = CategoryIcon> {
        ICONS.iter().map(|(_, icon, _)| *icon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_icon_has_table_entry() {
        for icon in CategoryIcon::all() {
            assert_eq!(CategoryIcon::from_id(&icon.to_string()), Some(icon));
            assert_ne!(icon.glyph(), "•");
        }
    }

    #[test]
    fn test_unknown_icon_falls_back() {
        assert_eq!(CategoryIcon::from_id("spaceship"), None);
        let category = Category::new("Misc", Some("spaceship"));
        assert_eq!(category.glyph(), CategoryIcon::Book.glyph());
    }

    #[test]
    fn test_icon_lookup_ignores_case() {
        assert_eq!(CategoryIcon::from_id(" Food "), Some(CategoryIcon::Food));
    }
}
