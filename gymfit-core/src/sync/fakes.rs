//! In-memory store used by the unit tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::remote::{
    FoodCatalog, ImageSpec, PlanWrite, RewardFields, RewardStore, RewardWrite, TemplateStore,
};
use crate::context::SessionContext;
use crate::error::{EditorError, EditorResult};
use crate::models::{
    DietPlan, DietTemplate, FoodCatalogEntry, ImageUpload, PresignedUpload, Reward,
    DEFAULT_REWARD_IMAGE,
};

#[derive(Debug, Default)]
struct State {
    templates: BTreeMap<String, DietTemplate>,
    foods: Vec<FoodCatalogEntry>,
    rewards: Vec<Reward>,
    next_id: u32,
    writes: usize,
    uploads: Vec<(String, String)>,
    fail_next_write: Option<(u16, String)>,
    fail_gift: Option<String>,
    fail_uploads: bool,
    yield_on_write: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend(Arc<Mutex<State>>);

fn not_found(what: &str) -> EditorError {
    EditorError::Remote {
        status: 404,
        detail: format!("{what} not found"),
    }
}

impl MemoryBackend {
    pub fn with_template(template: DietTemplate) -> Self {
        let backend = Self::default();
        backend
            .state()
            .templates
            .insert(template.id.clone(), template);
        backend
    }

    pub fn with_foods(self, foods: Vec<FoodCatalogEntry>) -> Self {
        self.state().foods = foods;
        self
    }

    pub fn with_rewards(self, rewards: Vec<Reward>) -> Self {
        self.state().rewards = rewards;
        self
    }

    pub fn fail_next_write(&self, status: u16, detail: &str) {
        self.state().fail_next_write = Some((status, detail.to_string()));
    }

    /// Reward writes whose gift equals `gift` fail with a 500.
    pub fn fail_gift(&self, gift: &str) {
        self.state().fail_gift = Some(gift.to_string());
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.state().fail_uploads = fail;
    }

    pub fn yield_on_write(&self, yield_: bool) {
        self.state().yield_on_write = yield_;
    }

    pub fn stored_plan(&self, template_id: &str) -> Option<DietPlan> {
        self.state()
            .templates
            .get(template_id)
            .map(|t| t.plan.clone())
    }

    pub fn rewards(&self) -> Vec<Reward> {
        self.state().rewards.clone()
    }

    /// (reward key, file name) for every upload that reached storage.
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.state().uploads.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.0.lock().unwrap()
    }

    fn begin_write(&self) -> EditorResult<()> {
        let mut state = self.state();
        if let Some((status, detail)) = state.fail_next_write.take() {
            return Err(EditorError::Remote { status, detail });
        }
        state.writes += 1;
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state();
        state.next_id += 1;
        format!("{prefix}{}", state.next_id)
    }

    fn write_reward(&self, reward_id: String, fields: &RewardFields) -> EditorResult<RewardWrite> {
        self.begin_write()?;
        let mut state = self.state();
        if state.fail_gift.as_deref() == Some(fields.gift.as_str()) {
            return Err(EditorError::Remote {
                status: 500,
                detail: "reward write failed".to_string(),
            });
        }

        let previous = state
            .rewards
            .iter()
            .find(|r| r.id == reward_id)
            .and_then(|r| r.image_url.clone());
        let mut reward = Reward::new(reward_id.clone(), fields.xp, fields.gift.clone());
        let mut upload = None;
        reward.image_url = match &fields.image {
            None => previous,
            Some(ImageSpec::Default) => Some(DEFAULT_REWARD_IMAGE.to_string()),
            Some(ImageSpec::Upload { file_name, .. }) => {
                upload = Some(PresignedUpload {
                    url: "https://uploads.test".to_string(),
                    fields: BTreeMap::from([(
                        "key".to_string(),
                        format!("rewards/{reward_id}/{file_name}"),
                    )]),
                    file_field: "file".to_string(),
                    cdn_url: None,
                });
                previous
            }
        };

        match state.rewards.iter_mut().find(|r| r.id == reward_id) {
            Some(existing) => *existing = reward.clone(),
            None => state.rewards.push(reward.clone()),
        }
        Ok(RewardWrite { reward, upload })
    }
}

impl TemplateStore for MemoryBackend {
    async fn get_template(
        &self,
        _ctx: &SessionContext,
        template_id: &str,
    ) -> EditorResult<DietTemplate> {
        self.state()
            .templates
            .get(template_id)
            .cloned()
            .ok_or_else(|| not_found("template"))
    }

    async fn replace_template_plan(
        &self,
        _ctx: &SessionContext,
        template_id: &str,
        plan: &DietPlan,
        expected_version: Option<&str>,
    ) -> EditorResult<PlanWrite> {
        if self.state().yield_on_write {
            tokio::task::yield_now().await;
        }
        self.begin_write()?;

        let mut state = self.state();
        let template = state
            .templates
            .get_mut(template_id)
            .ok_or_else(|| not_found("template"))?;

        if let (Some(expected), Some(current)) = (expected_version, template.version.as_deref()) {
            if expected != current {
                return Err(EditorError::StaleVersion {
                    template_id: template_id.to_string(),
                });
            }
        }

        template.plan = plan.clone();
        let version = template.version.as_ref().map(|v| format!("{v}+"));
        template.version = version.clone();
        Ok(PlanWrite {
            plan: Some(template.plan.clone()),
            version,
        })
    }

    async fn create_template(
        &self,
        ctx: &SessionContext,
        name: &str,
        plan: &DietPlan,
    ) -> EditorResult<DietTemplate> {
        self.begin_write()?;
        let template =
            DietTemplate::new(self.next_id("T"), name, ctx.owner_id.clone()).with_plan(plan.clone());
        self.state()
            .templates
            .insert(template.id.clone(), template.clone());
        Ok(template)
    }

    async fn rename_template(
        &self,
        _ctx: &SessionContext,
        template_id: &str,
        name: &str,
    ) -> EditorResult<()> {
        self.begin_write()?;
        let mut state = self.state();
        let template = state
            .templates
            .get_mut(template_id)
            .ok_or_else(|| not_found("template"))?;
        template.name = name.to_string();
        Ok(())
    }

    async fn delete_template(&self, _ctx: &SessionContext, template_id: &str) -> EditorResult<()> {
        self.begin_write()?;
        self.state()
            .templates
            .remove(template_id)
            .map(|_| ())
            .ok_or_else(|| not_found("template"))
    }
}

impl FoodCatalog for MemoryBackend {
    async fn search_food_catalog(&self, query: &str) -> EditorResult<Vec<FoodCatalogEntry>> {
        let query = query.to_lowercase();
        Ok(self
            .state()
            .foods
            .iter()
            .filter(|f| f.name.to_lowercase().contains(&query))
            .cloned()
            .collect())
    }

    async fn list_common_foods(&self) -> EditorResult<Vec<FoodCatalogEntry>> {
        Ok(self.state().foods.clone())
    }
}

impl RewardStore for MemoryBackend {
    async fn list_rewards(&self, _ctx: &SessionContext) -> EditorResult<Vec<Reward>> {
        Ok(self.state().rewards.clone())
    }

    async fn create_reward(
        &self,
        _ctx: &SessionContext,
        fields: &RewardFields,
    ) -> EditorResult<RewardWrite> {
        let id = self.next_id("r");
        self.write_reward(id, fields)
    }

    async fn update_reward(
        &self,
        _ctx: &SessionContext,
        reward_id: &str,
        fields: &RewardFields,
    ) -> EditorResult<RewardWrite> {
        if !self.state().rewards.iter().any(|r| r.id == reward_id) {
            return Err(not_found("reward"));
        }
        self.write_reward(reward_id.to_string(), fields)
    }

    async fn delete_reward(&self, _ctx: &SessionContext, reward_id: &str) -> EditorResult<()> {
        self.begin_write()?;
        let mut state = self.state();
        let before = state.rewards.len();
        state.rewards.retain(|r| r.id != reward_id);
        if state.rewards.len() == before {
            return Err(not_found("reward"));
        }
        Ok(())
    }

    async fn upload_image(
        &self,
        target: &PresignedUpload,
        image: &ImageUpload,
    ) -> EditorResult<()> {
        let mut state = self.state();
        if state.fail_uploads {
            return Err(EditorError::Remote {
                status: 403,
                detail: "upload rejected".to_string(),
            });
        }
        let key = target.fields.get("key").cloned().unwrap_or_default();
        state.uploads.push((key, image.file_name.clone()));
        Ok(())
    }

    async fn confirm_reward_image(
        &self,
        _ctx: &SessionContext,
        reward_id: &str,
        final_url: &str,
    ) -> EditorResult<String> {
        let mut state = self.state();
        let reward = state
            .rewards
            .iter_mut()
            .find(|r| r.id == reward_id)
            .ok_or_else(|| not_found("reward"))?;
        reward.image_url = Some(final_url.to_string());
        Ok(final_url.to_string())
    }
}
