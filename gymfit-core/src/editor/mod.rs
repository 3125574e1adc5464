//! Local, synchronous editing of the diet-plan document.

pub mod food_list;
pub mod variants;

pub use food_list::{
    materialize, parse_quantity, require_selection, set_quantity, toggle_selection,
    validate_quantity, FoodSelection, SelectedFood,
};
pub use variants::{
    append_food_to_meal, create_variant, delete_variant, find_meal, new_template_plan,
    remove_food_from_meal, rename_variant, VariantIndex, VariantRef,
};
