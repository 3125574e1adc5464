//! Edit sessions over a single diet template.
//!
//! A session walks `Idle -> Mutating -> Persisting -> Committed | RolledBack`.
//! Each save sends the whole plan document; the store has no patch
//! semantics. When the store issues a version token it is sent back on every
//! replace, so a concurrent edit surfaces as [`EditorError::StaleVersion`]
//! instead of being silently overwritten.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use super::remote::{FoodCatalog, PlanWrite, TemplateStore};
use crate::context::SessionContext;
use crate::editor::{self, VariantIndex};
use crate::error::{EditorError, EditorResult, ValidationError};
use crate::models::{DietPlan, DietTemplate, FoodCatalogEntry, FoodEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Mutating,
    Persisting,
    Committed,
    RolledBack,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Mutating => write!(f, "mutating"),
            SessionState::Persisting => write!(f, "persisting"),
            SessionState::Committed => write!(f, "committed"),
            SessionState::RolledBack => write!(f, "rolled back"),
        }
    }
}

/// One change to the plan document.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanEdit {
    CreateVariant(String),
    RenameVariant { from: String, to: String },
    DeleteVariant(String),
    AppendFood {
        variant: String,
        meal_id: String,
        entries: Vec<FoodEntry>,
    },
    RemoveFood {
        variant: String,
        meal_id: String,
        entry_id: String,
    },
}

impl PlanEdit {
    pub fn apply(&self, plan: &DietPlan) -> EditorResult<DietPlan> {
        match self {
            PlanEdit::CreateVariant(name) => editor::create_variant(plan, name),
            PlanEdit::RenameVariant { from, to } => editor::rename_variant(plan, from, to),
            PlanEdit::DeleteVariant(name) => editor::delete_variant(plan, name),
            PlanEdit::AppendFood {
                variant,
                meal_id,
                entries,
            } => editor::append_food_to_meal(plan, variant, meal_id, entries.clone()),
            PlanEdit::RemoveFood {
                variant,
                meal_id,
                entry_id,
            } => editor::remove_food_from_meal(plan, variant, meal_id, entry_id),
        }
    }
}

/// Outcome of a save. On `RolledBack` the session is back on the plan it had
/// before the edit was staged.
#[derive(Debug)]
pub enum PersistOutcome {
    Committed(DietPlan),
    RolledBack(EditorError),
}

impl PersistOutcome {
    pub fn into_result(self) -> EditorResult<DietPlan> {
        match self {
            PersistOutcome::Committed(plan) => Ok(plan),
            PersistOutcome::RolledBack(e) => Err(e),
        }
    }
}

/// Local state of one template being edited.
#[derive(Debug, Clone)]
pub struct TemplateSession {
    template: DietTemplate,
    index: VariantIndex,
    staged: Option<(PlanEdit, DietPlan)>,
    state: SessionState,
}

impl TemplateSession {
    pub fn new(template: DietTemplate) -> Self {
        let index = VariantIndex::from_plan(&template.plan);
        Self {
            template,
            index,
            staged: None,
            state: SessionState::Idle,
        }
    }

    pub fn template(&self) -> &DietTemplate {
        &self.template
    }

    /// Last known-good plan. Staged edits are not reflected until committed.
    pub fn plan(&self) -> &DietPlan {
        &self.template.plan
    }

    pub fn index(&self) -> &VariantIndex {
        &self.index
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn candidate(&self) -> Option<&DietPlan> {
        self.staged.as_ref().map(|(_, plan)| plan)
    }

    /// Computes the next plan without sending it. A failing edit leaves the
    /// session untouched; a second edit before saving replaces the first.
    pub fn stage(&mut self, edit: PlanEdit) -> EditorResult<&DietPlan> {
        let next = edit.apply(&self.template.plan)?;
        self.staged = Some((edit, next));
        self.state = SessionState::Mutating;
        Ok(self.candidate().unwrap_or(&self.template.plan))
    }

    pub fn discard(&mut self) {
        if self.staged.take().is_some() {
            self.state = SessionState::RolledBack;
        }
    }

    fn adopt(&mut self, edit: &PlanEdit, plan: DietPlan, version: Option<String>) {
        if let PlanEdit::RenameVariant { from, to } = edit {
            self.index.rename(from, to);
        }
        self.template.plan = plan;
        if version.is_some() {
            self.template.version = version;
        }
        self.index.sync_with(&self.template.plan);
        self.state = SessionState::Committed;
    }

    fn replace_template(&mut self, template: DietTemplate) {
        self.template = template;
        self.index.sync_with(&self.template.plan);
        self.staged = None;
        self.state = SessionState::Idle;
    }
}

/// Template ids with a save in flight on this client.
#[derive(Debug, Clone, Default)]
struct InFlight(Arc<Mutex<HashSet<String>>>);

impl InFlight {
    fn acquire(&self, template_id: &str) -> Option<FlightGuard> {
        let mut ids = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if ids.insert(template_id.to_string()) {
            Some(FlightGuard {
                ids: Arc::clone(&self.0),
                template_id: template_id.to_string(),
            })
        } else {
            None
        }
    }
}

struct FlightGuard {
    ids: Arc<Mutex<HashSet<String>>>,
    template_id: String,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        ids.remove(&self.template_id);
    }
}

/// Reads and writes diet templates through a [`TemplateStore`].
pub struct TemplateSyncClient<S> {
    store: S,
    ctx: SessionContext,
    in_flight: InFlight,
}

impl<S: TemplateStore> TemplateSyncClient<S> {
    pub fn new(store: S, ctx: SessionContext) -> Self {
        Self {
            store,
            ctx,
            in_flight: InFlight::default(),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn open(&self, template_id: &str) -> EditorResult<TemplateSession> {
        let template = self.store.get_template(&self.ctx, template_id).await?;
        tracing::debug!(template_id, variants = template.plan.len(), "opened template");
        Ok(TemplateSession::new(template))
    }

    /// Re-reads the canonical document, dropping anything staged.
    pub async fn refresh(&self, session: &mut TemplateSession) -> EditorResult<()> {
        let template = self
            .store
            .get_template(&self.ctx, &session.template.id)
            .await?;
        session.replace_template(template);
        Ok(())
    }

    /// Whole-document replace guarded so only one save per template id is in
    /// flight on this client. A concurrent save is rejected, not queued.
    pub async fn replace_plan(
        &self,
        template_id: &str,
        plan: &DietPlan,
        expected_version: Option<&str>,
    ) -> EditorResult<PlanWrite> {
        let _guard = self
            .in_flight
            .acquire(template_id)
            .ok_or_else(|| EditorError::Busy {
                template_id: template_id.to_string(),
            })?;
        self.store
            .replace_template_plan(&self.ctx, template_id, plan, expected_version)
            .await
    }

    /// Sends the staged plan. On success the session adopts the plan the
    /// store returned (or the staged one when it returned none); on failure
    /// the staged plan is dropped and the previous plan stays current.
    pub async fn persist(&self, session: &mut TemplateSession) -> PersistOutcome {
        let Some((edit, candidate)) = session.staged.take() else {
            return PersistOutcome::Committed(session.template.plan.clone());
        };

        session.state = SessionState::Persisting;
        let template_id = session.template.id.clone();
        let version = session.template.version.clone();

        match self
            .replace_plan(&template_id, &candidate, version.as_deref())
            .await
        {
            Ok(write) => {
                let plan = write.plan.unwrap_or(candidate);
                session.adopt(&edit, plan, write.version);
                tracing::info!(template_id = %template_id, "plan committed");
                PersistOutcome::Committed(session.template.plan.clone())
            }
            Err(e) => {
                session.state = SessionState::RolledBack;
                tracing::warn!(template_id = %template_id, error = %e, "plan rolled back");
                PersistOutcome::RolledBack(e)
            }
        }
    }

    /// Stages `edit` and saves it. Local errors are returned before any
    /// request is made.
    pub async fn edit(
        &self,
        session: &mut TemplateSession,
        edit: PlanEdit,
    ) -> EditorResult<DietPlan> {
        session.stage(edit)?;
        self.persist(session).await.into_result()
    }

    pub async fn create_template(
        &self,
        name: &str,
        variant_names: &[String],
    ) -> EditorResult<DietTemplate> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankField("template name").into());
        }
        let plan = editor::new_template_plan(variant_names)?;
        let template = self.store.create_template(&self.ctx, name, &plan).await?;
        tracing::info!(template_id = %template.id, "template created");
        Ok(template)
    }

    pub async fn rename_template(&self, template_id: &str, name: &str) -> EditorResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankField("template name").into());
        }
        self.store
            .rename_template(&self.ctx, template_id, name)
            .await
    }

    /// Not retried; a second attempt after a lost response may report the
    /// template as missing.
    pub async fn delete_template(&self, template_id: &str) -> EditorResult<()> {
        self.store.delete_template(&self.ctx, template_id).await?;
        tracing::info!(template_id, "template deleted");
        Ok(())
    }
}

impl<S: TemplateStore + FoodCatalog> TemplateSyncClient<S> {
    pub async fn search_foods(&self, query: &str) -> EditorResult<Vec<FoodCatalogEntry>> {
        let query = query.trim();
        if query.is_empty() {
            return self.store.list_common_foods().await;
        }
        self.store.search_food_catalog(query).await
    }

    pub async fn common_foods(&self) -> EditorResult<Vec<FoodCatalogEntry>> {
        self.store.list_common_foods().await
    }
}
