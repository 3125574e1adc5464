//! Nutrition totals over food lists, meals and whole variants.

use serde::Serialize;

use crate::editor::VariantIndex;
use crate::models::{DietPlan, FoodEntry, Meal, NutritionTotals};

/// The per-variant projection shown in variant pickers. Never persisted.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VariantSummary {
    pub title: String,
    pub meals: usize,
    pub items: usize,
    pub totals: NutritionTotals,
}

/// Sums the four nutrition fields over `food_list`.
pub fn aggregate(food_list: &[FoodEntry]) -> NutritionTotals {
    food_list.iter().map(|entry| finite(entry.totals())).sum()
}

/// Sums every meal's food list.
pub fn aggregate_variant(meals: &[Meal]) -> NutritionTotals {
    meals.iter().map(|meal| aggregate(&meal.food_list)).sum()
}

/// One summary per variant, in `index` order. Variants missing from the
/// index are appended by name.
pub fn variant_summaries(plan: &DietPlan, index: &VariantIndex) -> Vec<VariantSummary> {
    let mut titles = index.titles();
    for name in plan.variant_names() {
        if !titles.contains(&name) {
            titles.push(name);
        }
    }

    titles
        .into_iter()
        .filter_map(|title| {
            let meals = plan.variant(&title)?;
            Some(VariantSummary {
                meals: meals.len(),
                items: meals.iter().map(|m| m.food_list.len()).sum(),
                totals: aggregate_variant(meals),
                title,
            })
        })
        .collect()
}

fn finite(totals: NutritionTotals) -> NutritionTotals {
    let clean = |v: f64| if v.is_finite() { v } else { 0.0 };
    NutritionTotals::new(
        clean(totals.calories),
        clean(totals.protein),
        clean(totals.carbs),
        clean(totals.fat),
    )
}
