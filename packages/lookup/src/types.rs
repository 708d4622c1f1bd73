use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Whether the input names one food item or may name several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// One item, one JSON object in the reply.
    Single,
    /// Free text possibly naming several items, one JSON array in the reply.
    Multi,
}

/// A validated food item as reported by the upstream service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    /// Carbohydrates in grams. Always finite and non-negative.
    pub carbs: f64,
    pub details: Option<String>,
}

/// Result of one lookup call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LookupResult {
    Multi {
        items: Vec<FoodItem>,
        citations: Vec<String>,
    },
    Single {
        #[serde(flatten)]
        item: FoodItem,
        citations: Vec<String>,
    },
}

impl LookupResult {
    pub fn mode(&self) -> Mode {
        match self {
            Self::Multi { .. } => Mode::Multi,
            Self::Single { .. } => Mode::Single,
        }
    }

    /// Items in the order the upstream returned them.
    pub fn items(&self) -> &[FoodItem] {
        match self {
            Self::Multi { items, .. } => items,
            Self::Single { item, .. } => std::slice::from_ref(item),
        }
    }

    pub fn citations(&self) -> &[String] {
        match self {
            Self::Multi { citations, .. } | Self::Single { citations, .. } => citations,
        }
    }

    /// Sum of carbs over all items.
    pub fn total_carbs(&self) -> f64 {
        self.items().iter().map(|item| item.carbs).sum()
    }
}
