//! Pure mutations of the diet-plan document.
//!
//! Every operation borrows the current plan and returns the next one; the
//! input is never touched, so a failed save can fall back to it unchanged.
//! Variants are keyed by display name, which is also their persisted
//! identity. A rename therefore invalidates any name held elsewhere; resolve
//! through [`VariantIndex`] ids instead.

use serde::Serialize;

use crate::error::{EditorError, EditorResult, ValidationError};
use crate::models::{default_meal_slots, DietPlan, FoodEntry, Meal};

/// Adds a variant seeded with the default meal slots.
pub fn create_variant(plan: &DietPlan, proposed: &str) -> EditorResult<DietPlan> {
    let name = proposed.trim();
    if name.is_empty() {
        return Err(ValidationError::BlankField("variant name").into());
    }
    if let Some(existing) = plan.find_variant_ignore_case(name) {
        return Err(ValidationError::DuplicateVariant(existing.to_string()).into());
    }

    let mut next = plan.clone();
    next.insert_variant(name.to_string(), default_meal_slots());
    Ok(next)
}

/// Moves a variant's meals to a new name. Fails without side effects if
/// `old` is missing or `new` is taken by another variant.
pub fn rename_variant(plan: &DietPlan, old: &str, new: &str) -> EditorResult<DietPlan> {
    if !plan.contains_variant(old) {
        return Err(variant_not_found(plan, old));
    }
    let new = new.trim();
    if new.is_empty() {
        return Err(ValidationError::BlankField("variant name").into());
    }
    if old == new {
        return Ok(plan.clone());
    }
    if let Some(existing) = plan.find_variant_ignore_case(new) {
        // "Cut" -> "cut" renames the same variant and is allowed.
        if existing != old {
            return Err(ValidationError::DuplicateVariant(existing.to_string()).into());
        }
    }

    let mut next = plan.clone();
    if let Some(meals) = next.remove_variant(old) {
        next.insert_variant(new.to_string(), meals);
    }
    Ok(next)
}

pub fn delete_variant(plan: &DietPlan, name: &str) -> EditorResult<DietPlan> {
    let mut next = plan.clone();
    match next.remove_variant(name) {
        Some(_) => Ok(next),
        None => Err(variant_not_found(plan, name)),
    }
}

pub fn find_meal<'a>(plan: &'a DietPlan, variant: &str, meal_id: &str) -> EditorResult<&'a Meal> {
    let meals = plan
        .variant(variant)
        .ok_or_else(|| variant_not_found(plan, variant))?;
    meals
        .iter()
        .find(|m| m.id == meal_id)
        .ok_or_else(|| meal_not_found(meals, meal_id))
}

/// Appends `entries` to the meal's food list (never replaces it) and
/// refreshes its item count.
pub fn append_food_to_meal(
    plan: &DietPlan,
    variant: &str,
    meal_id: &str,
    entries: Vec<FoodEntry>,
) -> EditorResult<DietPlan> {
    let mut next = plan.clone();
    let meal = meal_mut(&mut next, plan, variant, meal_id)?;
    meal.food_list.extend(entries);
    meal.recount();
    Ok(next)
}

/// Drops one entry from a meal. Together with [`append_food_to_meal`] this is
/// how a saved entry gets edited.
pub fn remove_food_from_meal(
    plan: &DietPlan,
    variant: &str,
    meal_id: &str,
    entry_id: &str,
) -> EditorResult<DietPlan> {
    let mut next = plan.clone();
    let meal = meal_mut(&mut next, plan, variant, meal_id)?;
    let before = meal.food_list.len();
    meal.food_list.retain(|e| e.id != entry_id);
    if meal.food_list.len() == before {
        let known = meal.food_list.iter().map(|e| e.id.clone()).collect();
        return Err(EditorError::not_found("food entry", entry_id, known));
    }
    meal.recount();
    Ok(next)
}

/// Initial plan for a new template: each named variant gets the default slots.
pub fn new_template_plan<S: AsRef<str>>(variant_names: &[S]) -> EditorResult<DietPlan> {
    variant_names
        .iter()
        .try_fold(DietPlan::new(), |plan, name| create_variant(&plan, name.as_ref()))
}

fn meal_mut<'a>(
    next: &'a mut DietPlan,
    original: &DietPlan,
    variant: &str,
    meal_id: &str,
) -> EditorResult<&'a mut Meal> {
    let meals = next
        .variant_mut(variant)
        .ok_or_else(|| variant_not_found(original, variant))?;
    let known: Vec<String> = meals.iter().map(|m| m.id.clone()).collect();
    meals
        .iter_mut()
        .find(|m| m.id == meal_id)
        .ok_or_else(|| EditorError::not_found("meal", meal_id, known))
}

fn variant_not_found(plan: &DietPlan, name: &str) -> EditorError {
    EditorError::not_found("variant", name, plan.variant_names())
}

fn meal_not_found(meals: &[Meal], meal_id: &str) -> EditorError {
    let known = meals.iter().map(|m| m.id.clone()).collect();
    EditorError::not_found("meal", meal_id, known)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VariantRef {
    pub id: u32,
    pub title: String,
}

/// Stable display order for variants. Ids are client-local sequence numbers
/// and survive renames; they are not persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantIndex {
    entries: Vec<VariantRef>,
    next_id: u32,
}

impl VariantIndex {
    pub fn from_plan(plan: &DietPlan) -> Self {
        let mut index = Self::default();
        index.sync_with(plan);
        index
    }

    pub fn push(&mut self, title: impl Into<String>) -> u32 {
        self.next_id += 1;
        self.entries.push(VariantRef {
            id: self.next_id,
            title: title.into(),
        });
        self.next_id
    }

    /// Keeps known titles in place, drops ones the plan no longer has and
    /// appends new ones.
    pub fn sync_with(&mut self, plan: &DietPlan) {
        self.entries.retain(|e| plan.contains_variant(&e.title));
        for name in plan.variant_names() {
            if !self.entries.iter().any(|e| e.title == name) {
                self.push(name);
            }
        }
    }

    pub fn rename(&mut self, old: &str, new: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.title == old) {
            entry.title = new.to_string();
        }
    }

    pub fn title_of(&self, id: u32) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.title.as_str())
    }

    pub fn titles(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.title.clone()).collect()
    }

    pub fn entries(&self) -> &[VariantRef] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn plan() -> DietPlan {
        DietPlan::new().with_variant("variant1", vec![Meal::new("1", "Breakfast", "")])
    }

    fn food(id: &str) -> FoodEntry {
        FoodEntry {
            id: id.to_string(),
            name: "Eggs".to_string(),
            quantity: 1,
            calories: 150.0,
            protein: 12.0,
            carbs: 1.0,
            fat: 10.0,
            date: NaiveDate::from_ymd_opt(2024, 1, 1),
            time_added: "07:30".to_string(),
            extra: Default::default(),
        }
    }

    #[test]
    fn test_create_variant_rejects_case_insensitive_duplicate() {
        let plan = DietPlan::new().with_variant("Variant1", vec![]);
        let err = create_variant(&plan, "variant1").unwrap_err();
        assert!(matches!(
            err,
            EditorError::Validation(ValidationError::DuplicateVariant(ref n)) if n == "Variant1"
        ));
    }

    #[test]
    fn test_create_variant_seeds_empty_slots() {
        let next = create_variant(&plan(), "High Protein").unwrap();
        let meals = next.variant("High Protein").unwrap();
        assert_eq!(meals.len(), default_meal_slots().len());
        assert!(meals.iter().all(|m| m.items_count == 0 && m.food_list.is_empty()));
        // input untouched
        assert_eq!(plan().len(), 1);
    }

    #[test]
    fn test_create_variant_rejects_blank() {
        assert!(matches!(
            create_variant(&plan(), "   "),
            Err(EditorError::Validation(ValidationError::BlankField(_)))
        ));
    }

    #[test]
    fn test_rename_variant_moves_meals() {
        let next = rename_variant(&plan(), "variant1", "Cutting").unwrap();
        assert!(!next.contains_variant("variant1"));
        assert_eq!(next.variant("Cutting").unwrap()[0].title, "Breakfast");
    }

    #[test]
    fn test_rename_onto_existing_leaves_plan_unchanged() {
        let original = plan().with_variant("variant2", vec![Meal::new("9", "Dinner", "")]);
        let err = rename_variant(&original, "variant1", "variant2").unwrap_err();
        assert!(matches!(
            err,
            EditorError::Validation(ValidationError::DuplicateVariant(_))
        ));
        assert_eq!(original.variant("variant1").unwrap()[0].id, "1");
        assert_eq!(original.variant("variant2").unwrap()[0].id, "9");
    }

    #[test]
    fn test_rename_same_name_and_case_change() {
        let original = plan();
        assert_eq!(rename_variant(&original, "variant1", "variant1").unwrap(), original);

        let next = rename_variant(&original, "variant1", "Variant1").unwrap();
        assert!(next.contains_variant("Variant1"));
        assert_eq!(next.len(), 1);
    }

    #[test]
    fn test_rename_missing_variant() {
        let err = rename_variant(&plan(), "nope", "x").unwrap_err();
        match err {
            EditorError::NotFound { kind, key, known } => {
                assert_eq!(kind, "variant");
                assert_eq!(key, "nope");
                assert_eq!(known, vec!["variant1".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_delete_variant() {
        let next = delete_variant(&plan(), "variant1").unwrap();
        assert!(next.is_empty());
        assert!(matches!(
            delete_variant(&next, "variant1"),
            Err(EditorError::NotFound { .. })
        ));
    }

    #[test]
    fn test_find_meal_lists_known_ids() {
        let plan = plan();
        assert_eq!(find_meal(&plan, "variant1", "1").unwrap().title, "Breakfast");

        match find_meal(&plan, "variant1", "7").unwrap_err() {
            EditorError::NotFound { kind, known, .. } => {
                assert_eq!(kind, "meal");
                assert_eq!(known, vec!["1".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_append_keeps_counts_consistent() {
        let base = plan().with_variant(
            "variant2",
            vec![Meal::new("1", "Breakfast", "").with_foods(vec![food("x")])],
        );
        let next = append_food_to_meal(&base, "variant1", "1", vec![food("a"), food("b")]).unwrap();
        let next = append_food_to_meal(&next, "variant1", "1", vec![food("c")]).unwrap();

        let meal = find_meal(&next, "variant1", "1").unwrap();
        assert_eq!(meal.food_list.len(), 3);
        assert_eq!(meal.items_count, 3);

        let other = find_meal(&next, "variant2", "1").unwrap();
        assert_eq!(other.items_count, 1);
        assert_eq!(other.food_list.len(), 1);
    }

    #[test]
    fn test_append_unknown_meal() {
        let err = append_food_to_meal(&plan(), "variant1", "5", vec![food("a")]).unwrap_err();
        assert!(err.to_string().contains("known: [1]"));
    }

    #[test]
    fn test_remove_food_from_meal() {
        let with_food = append_food_to_meal(&plan(), "variant1", "1", vec![food("a"), food("b")]).unwrap();
        let next = remove_food_from_meal(&with_food, "variant1", "1", "a").unwrap();
        let meal = find_meal(&next, "variant1", "1").unwrap();
        assert_eq!(meal.items_count, 1);
        assert_eq!(meal.food_list[0].id, "b");

        let err = remove_food_from_meal(&next, "variant1", "1", "a").unwrap_err();
        assert!(err.to_string().contains("known: [b]"));
    }

    #[test]
    fn test_new_template_plan() {
        let plan = new_template_plan(&["Standard", "Vegetarian"]).unwrap();
        assert_eq!(plan.len(), 2);
        assert!(new_template_plan(&["A", "a"]).is_err());
        assert!(new_template_plan::<&str>(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_index_survives_rename() {
        let plan = plan().with_variant("variant2", vec![]);
        let mut index = VariantIndex::from_plan(&plan);
        let id = index.entries()[0].id;

        let renamed = rename_variant(&plan, "variant1", "zeta").unwrap();
        index.rename("variant1", "zeta");
        index.sync_with(&renamed);

        assert_eq!(index.title_of(id), Some("zeta"));
        assert_eq!(index.titles(), vec!["zeta".to_string(), "variant2".to_string()]);
    }

    #[test]
    fn test_index_sync_drops_and_appends() {
        let mut index = VariantIndex::from_plan(&plan());
        let next = create_variant(&delete_variant(&plan(), "variant1").unwrap(), "new").unwrap();
        index.sync_with(&next);
        assert_eq!(index.titles(), vec!["new".to_string()]);
        assert_eq!(index.entries()[0].id, 2);
    }
}
