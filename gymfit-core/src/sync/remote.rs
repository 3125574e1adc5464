//! Collaborator contracts. The editors only talk to the backend through
//! these traits; [`super::HttpBackend`] is the production implementation.

#![allow(async_fn_in_trait)]

use serde::{Deserialize, Serialize};

use crate::context::SessionContext;
use crate::error::EditorResult;
use crate::models::{
    DietPlan, DietTemplate, FoodCatalogEntry, ImageUpload, PresignedUpload, Reward,
};

/// Result of a whole-plan replace. Either field may be absent when the store
/// does not echo the document or does not version it.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PlanWrite {
    #[serde(default)]
    pub plan: Option<DietPlan>,
    #[serde(default)]
    pub version: Option<String>,
}

pub trait TemplateStore {
    async fn get_template(
        &self,
        ctx: &SessionContext,
        template_id: &str,
    ) -> EditorResult<DietTemplate>;

    /// Replaces the entire plan document. There is no partial update.
    async fn replace_template_plan(
        &self,
        ctx: &SessionContext,
        template_id: &str,
        plan: &DietPlan,
        expected_version: Option<&str>,
    ) -> EditorResult<PlanWrite>;

    async fn create_template(
        &self,
        ctx: &SessionContext,
        name: &str,
        plan: &DietPlan,
    ) -> EditorResult<DietTemplate>;

    async fn rename_template(
        &self,
        ctx: &SessionContext,
        template_id: &str,
        name: &str,
    ) -> EditorResult<()>;

    async fn delete_template(&self, ctx: &SessionContext, template_id: &str) -> EditorResult<()>;
}

pub trait FoodCatalog {
    async fn search_food_catalog(&self, query: &str) -> EditorResult<Vec<FoodCatalogEntry>>;

    async fn list_common_foods(&self) -> EditorResult<Vec<FoodCatalogEntry>>;
}

/// How the store should treat the image on a reward write.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageSpec {
    Default,
    Upload {
        file_name: String,
        content_type: String,
    },
}

/// Textual reward fields sent on create and update.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RewardFields {
    pub xp: u32,
    pub gift: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSpec>,
}

/// A committed reward write. `upload` is present when the write reserved an
/// image slot that still has to be filled and confirmed.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RewardWrite {
    pub reward: Reward,
    #[serde(default)]
    pub upload: Option<PresignedUpload>,
}

pub trait RewardStore {
    async fn list_rewards(&self, ctx: &SessionContext) -> EditorResult<Vec<Reward>>;

    async fn create_reward(
        &self,
        ctx: &SessionContext,
        fields: &RewardFields,
    ) -> EditorResult<RewardWrite>;

    async fn update_reward(
        &self,
        ctx: &SessionContext,
        reward_id: &str,
        fields: &RewardFields,
    ) -> EditorResult<RewardWrite>;

    async fn delete_reward(&self, ctx: &SessionContext, reward_id: &str) -> EditorResult<()>;

    /// Sends the bytes straight to the presigned target.
    async fn upload_image(&self, target: &PresignedUpload, image: &ImageUpload)
        -> EditorResult<()>;

    /// Returns the image URL the reward now points at.
    async fn confirm_reward_image(
        &self,
        ctx: &SessionContext,
        reward_id: &str,
        final_url: &str,
    ) -> EditorResult<String>;
}
