//! Food picking for a single meal.
//!
//! A [`FoodSelection`] is the pre-commit state of the food picker: catalog
//! foods plus the raw quantity text typed next to each. Nothing is scaled
//! until [`materialize`] turns the selection into [`FoodEntry`] values.

use chrono::{NaiveDate, NaiveDateTime};
use rand::distr::Alphanumeric;
use rand::Rng;
use std::collections::HashSet;

use crate::error::ValidationError;
use crate::models::{FoodCatalogEntry, FoodEntry};

const DEFAULT_QUANTITY: &str = "1";
const SALT_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFood {
    pub food: FoodCatalogEntry,
    /// Raw text as entered; see [`parse_quantity`].
    pub quantity: String,
}

/// Foods chosen in the picker, in the order they were picked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoodSelection {
    items: Vec<SelectedFood>,
}

impl FoodSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, food_id: &str) -> bool {
        self.items.iter().any(|s| s.food.id == food_id)
    }

    pub fn get(&self, food_id: &str) -> Option<&SelectedFood> {
        self.items.iter().find(|s| s.food.id == food_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectedFood> {
        self.items.iter()
    }
}

/// Adds `candidate` with quantity "1" if it is not selected, removes it if
/// it is. Keyed by catalog id.
pub fn toggle_selection(candidate: &FoodCatalogEntry, selection: &FoodSelection) -> FoodSelection {
    let mut next = selection.clone();
    if next.contains(&candidate.id) {
        next.items.retain(|s| s.food.id != candidate.id);
    } else {
        next.items.push(SelectedFood {
            food: candidate.clone(),
            quantity: DEFAULT_QUANTITY.to_string(),
        });
    }
    next
}

/// Records the raw quantity text for a selected food. Unknown ids leave the
/// selection as it was.
pub fn set_quantity(selection: &FoodSelection, food_id: &str, quantity: &str) -> FoodSelection {
    let mut next = selection.clone();
    if let Some(item) = next.items.iter_mut().find(|s| s.food.id == food_id) {
        item.quantity = quantity.to_string();
    }
    next
}

/// Reads the leading integer of `raw` the way a lenient form field does
/// (`" 3 cups"` is 3). Anything that is not a positive integer becomes 1.
pub fn parse_quantity(raw: &str) -> u32 {
    leading_integer(raw).filter(|q| *q > 0).unwrap_or(1)
}

/// Strict variant for command-line input: the whole string must be a
/// positive integer.
pub fn validate_quantity(raw: &str) -> Result<u32, ValidationError> {
    match raw.trim().parse::<u32>() {
        Ok(q) if q > 0 => Ok(q),
        _ => Err(ValidationError::InvalidQuantity(raw.to_string())),
    }
}

/// Guard the confirm action runs before [`materialize`].
pub fn require_selection(selection: &FoodSelection) -> Result<(), ValidationError> {
    if selection.is_empty() {
        Err(ValidationError::EmptySelection)
    } else {
        Ok(())
    }
}

/// Turns the selection into entries for `date`, scaling each food's per-unit
/// values by its quantity. This is the only place quantities are applied.
pub fn materialize(
    selection: &FoodSelection,
    date: NaiveDate,
    now: NaiveDateTime,
) -> Vec<FoodEntry> {
    let stamp = now.and_utc().timestamp_millis();
    let time_added = now.format("%H:%M").to_string();
    let mut used = HashSet::new();

    selection
        .iter()
        .map(|selected| {
            let quantity = parse_quantity(&selected.quantity);
            let totals = selected.food.per_unit().scaled(f64::from(quantity));

            let id = loop {
                let candidate = format!("{}-{}-{}", selected.food.id, stamp, salt());
                if used.insert(candidate.clone()) {
                    break candidate;
                }
            };

            FoodEntry {
                id,
                name: selected.food.name.clone(),
                quantity,
                calories: totals.calories,
                protein: totals.protein,
                carbs: totals.carbs,
                fat: totals.fat,
                date: Some(date),
                time_added: time_added.clone(),
                extra: Default::default(),
            }
        })
        .collect()
}

fn salt() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect()
}

fn leading_integer(raw: &str) -> Option<u32> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 || negative {
        return None;
    }
    digits[..end].parse().ok()
}
