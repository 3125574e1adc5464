//! Gymfit Core Library
//!
//! Diet template editing, reward catalog management and the sync client that
//! talks to the gym backend.

pub mod context;
pub mod editor;
pub mod error;
pub mod models;
pub mod nutrition;
pub mod rewards;
pub mod sync;

pub use context::SessionContext;
pub use editor::{FoodSelection, VariantIndex};
pub use error::{EditorError, EditorResult, ValidationError, XpConflict};
pub use models::{
    DietPlan, DietTemplate, FoodCatalogEntry, FoodEntry, ImageUpload, Meal, NutritionTotals,
    PresignedUpload, Reward, RewardImage,
};
pub use nutrition::VariantSummary;
pub use rewards::{RewardCatalogEditor, RewardDraft, Resolution, ValidReward};
pub use sync::{
    HttpBackend, PersistOutcome, PlanEdit, SessionState, TemplateSession, TemplateSyncClient,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
