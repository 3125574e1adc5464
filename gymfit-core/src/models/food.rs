use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::nutrition::NutritionTotals;

/// A selectable food from the shared catalog. Values are per unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodCatalogEntry {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub calories: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub protein: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub carbs: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fat: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving: Option<String>,
}

impl FoodCatalogEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            calories: 0.0,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
            serving: None,
        }
    }

    pub fn with_nutrition(mut self, calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        self.calories = calories;
        self.protein = protein;
        self.carbs = carbs;
        self.fat = fat;
        self
    }

    pub fn per_unit(&self) -> NutritionTotals {
        NutritionTotals::new(self.calories, self.protein, self.carbs, self.fat)
    }
}

impl fmt::Display for FoodCatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.id)?;
        if let Some(serving) = &self.serving {
            write!(f, " per {}", serving)?;
        }
        write!(f, " - {}", self.per_unit())
    }
}

/// A food placed into a meal. Nutrition values are totals for the entry
/// (already multiplied by `quantity`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FoodEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub calories: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub protein: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub carbs: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fat: f64,
    /// Missing or unreadable on some older entries.
    #[serde(
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<NaiveDate>,
    /// Wall-clock insertion time, `HH:mm`.
    #[serde(default)]
    pub time_added: String,
    /// Keys this client does not model. Written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FoodEntry {
    pub fn totals(&self) -> NutritionTotals {
        NutritionTotals::new(self.calories, self.protein, self.carbs, self.fat)
    }
}

impl fmt::Display for FoodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x{} ({:.0} kcal, P {:.1}g, C {:.1}g, F {:.1}g)",
            self.name, self.quantity, self.calories, self.protein, self.carbs, self.fat
        )
    }
}

fn default_quantity() -> u32 {
    1
}

/// Accepts numbers, numeric strings, null or a missing field. Anything that
/// does not yield a finite number reads as 0.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(number_from_value).unwrap_or(0.0))
}

/// Reads `YYYY-MM-DD`, or an RFC 3339 timestamp truncated to its date.
/// Anything else reads as no date.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_str).and_then(|s| {
        let s = s.trim();
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|d| d.date_naive()))
    }))
}

fn number_from_value(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}
