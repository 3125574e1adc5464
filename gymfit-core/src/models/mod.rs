mod food;
mod meal;
mod nutrition;
mod reward;
mod template;

pub use food::{FoodCatalogEntry, FoodEntry};
pub use meal::{default_meal_slots, Meal};
pub use nutrition::NutritionTotals;
pub use reward::{
    ImageUpload, PresignedUpload, Reward, RewardImage, DEFAULT_REWARD_IMAGE, MAX_GIFT_LEN,
};
pub use template::{DietPlan, DietTemplate};
