use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::food::FoodEntry;

/// A time slot within a variant (e.g. Breakfast) holding its food list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub time_range: String,
    #[serde(default)]
    pub food_list: Vec<FoodEntry>,
    /// Always `food_list.len()`; refreshed by [`Meal::recount`].
    #[serde(default)]
    pub items_count: usize,
    /// Keys this client does not model. Written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Meal {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        time_range: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            time_range: time_range.into(),
            food_list: Vec::new(),
            items_count: 0,
            extra: Map::new(),
        }
    }

    pub fn with_foods(mut self, foods: Vec<FoodEntry>) -> Self {
        self.food_list = foods;
        self.recount();
        self
    }

    pub fn recount(&mut self) {
        self.items_count = self.food_list.len();
    }
}

impl fmt::Display for Meal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.title)?;
        if !self.time_range.is_empty() {
            write!(f, " ({})", self.time_range)?;
        }
        write!(f, " - {} item(s)", self.items_count)
    }
}

/// Slots every new variant starts with, in display order.
const DEFAULT_SLOTS: [(&str, &str, &str); 5] = [
    ("1", "Breakfast", "7:00 AM - 9:00 AM"),
    ("2", "Mid-Morning Snack", "10:30 AM - 11:30 AM"),
    ("3", "Lunch", "1:00 PM - 2:00 PM"),
    ("4", "Evening Snack", "4:30 PM - 5:30 PM"),
    ("5", "Dinner", "8:00 PM - 9:00 PM"),
];

/// Fresh, empty meals for the fixed slot catalog.
pub fn default_meal_slots() -> Vec<Meal> {
    DEFAULT_SLOTS
        .iter()
        .map(|(id, title, range)| Meal::new(*id, *title, *range))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_slots_are_empty() {
        let slots = default_meal_slots();
        assert_eq!(slots.len(), 5);
        assert_eq!(slots[0].title, "Breakfast");
        assert!(slots.iter().all(|m| m.food_list.is_empty() && m.items_count == 0));

        let ids: Vec<&str> = slots.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_meal_wire_names() {
        let meal = Meal::new("1", "Breakfast", "7-9");
        let value = serde_json::to_value(&meal).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "1",
                "title": "Breakfast",
                "timeRange": "7-9",
                "foodList": [],
                "itemsCount": 0
            })
        );
    }

    #[test]
    fn test_meal_keeps_unknown_keys() {
        let raw = json!({
            "id": "1",
            "title": "Breakfast",
            "timeRange": "7-9",
            "foodList": [{
                "id": "x",
                "name": "Oats",
                "quantity": 1,
                "calories": 100.0,
                "protein": 4.0,
                "carbs": 17.0,
                "fat": 2.0,
                "timeAdded": "08:00",
                "fiber": 4
            }],
            "itemsCount": 1,
            "mealTag": "pre-workout"
        });
        let meal: Meal = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(meal.extra.get("mealTag"), Some(&json!("pre-workout")));
        assert_eq!(meal.food_list[0].date, None);
        assert_eq!(serde_json::to_value(&meal).unwrap(), raw);
    }

    #[test]
    fn test_meal_display() {
        let meal = Meal::new("3", "Lunch", "1-2 PM");
        assert_eq!(format!("{}", meal), "[3] Lunch (1-2 PM) - 0 item(s)");
    }
}
