//! Reward catalog editing.
//!
//! Rewards are keyed by XP threshold and no two rewards of an owner may share
//! one. Collisions are never resolved here: the caller gets every colliding
//! pair back and has to decide per XP value with a [`Resolution`].

use std::collections::{BTreeSet, HashMap};

use crate::context::SessionContext;
use crate::error::{EditorError, EditorResult, ValidationError, XpConflict};
use crate::models::{ImageUpload, PresignedUpload, Reward, RewardImage, MAX_GIFT_LEN};
use crate::sync::{ImageSpec, RewardFields, RewardStore};

/// Unvalidated form input for one reward.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewardDraft {
    pub xp: String,
    pub gift: String,
    pub image: RewardImage,
}

impl RewardDraft {
    pub fn new(xp: impl Into<String>, gift: impl Into<String>) -> Self {
        Self {
            xp: xp.into(),
            gift: gift.into(),
            image: RewardImage::Unchanged,
        }
    }

    pub fn with_image(mut self, image: RewardImage) -> Self {
        self.image = image;
        self
    }

    fn is_blank(&self) -> bool {
        self.xp.trim().is_empty() || self.gift.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidReward {
    pub xp: u32,
    pub gift: String,
    pub image: RewardImage,
}

impl ValidReward {
    fn fields(&self) -> RewardFields {
        let image = match &self.image {
            RewardImage::Unchanged => None,
            RewardImage::Default => Some(ImageSpec::Default),
            RewardImage::Upload(upload) => Some(ImageSpec::Upload {
                file_name: upload.file_name.clone(),
                content_type: upload.content_type.clone(),
            }),
        };
        RewardFields {
            xp: self.xp,
            gift: self.gift.clone(),
            image,
        }
    }
}

/// Caller's decision for one XP collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Delete the existing reward, then write the candidate.
    Replace,
    /// Keep both.
    AddAnyway,
}

pub fn validate_draft(draft: &RewardDraft) -> Result<ValidReward, ValidationError> {
    let raw_xp = draft.xp.trim();
    if raw_xp.is_empty() {
        return Err(ValidationError::BlankField("xp"));
    }
    let gift = draft.gift.trim();
    if gift.is_empty() {
        return Err(ValidationError::BlankField("gift"));
    }

    let xp = raw_xp
        .parse::<u32>()
        .ok()
        .filter(|xp| *xp > 0)
        .ok_or_else(|| ValidationError::InvalidXp(raw_xp.to_string()))?;

    let len = gift.chars().count();
    if len > MAX_GIFT_LEN {
        return Err(ValidationError::GiftTooLong {
            len,
            max: MAX_GIFT_LEN,
        });
    }

    Ok(ValidReward {
        xp,
        gift: gift.to_string(),
        image: draft.image.clone(),
    })
}

/// Validates a batch of new rewards. Drafts with a blank xp or gift are
/// dropped; any other invalid draft fails the batch, as does an XP value
/// used by more than one draft.
pub fn validate_batch(drafts: &[RewardDraft]) -> Result<Vec<ValidReward>, ValidationError> {
    let valid = drafts
        .iter()
        .filter(|d| !d.is_blank())
        .map(validate_draft)
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for reward in &valid {
        if !seen.insert(reward.xp) {
            duplicates.insert(reward.xp);
        }
    }
    if !duplicates.is_empty() {
        return Err(ValidationError::DuplicateXpInBatch(
            duplicates.iter().map(u32::to_string).collect(),
        ));
    }

    Ok(valid)
}

/// Existing reward with the same XP, ignoring the one being edited.
pub fn detect_collision<'a>(
    existing: &'a [Reward],
    xp: u32,
    editing_id: Option<&str>,
) -> Option<&'a Reward> {
    existing
        .iter()
        .find(|r| r.xp == xp && Some(r.id.as_str()) != editing_id)
}

pub fn find_conflicts(existing: &[Reward], candidates: &[ValidReward]) -> Vec<XpConflict> {
    candidates
        .iter()
        .filter_map(|candidate| {
            detect_collision(existing, candidate.xp, None).map(|hit| XpConflict {
                xp: candidate.xp,
                candidate_gift: candidate.gift.clone(),
                existing: hit.clone(),
            })
        })
        .collect()
}

/// Where an uploaded object ends up: the CDN URL when the store gave one,
/// otherwise the upload target plus the object key.
fn final_image_url(target: &PresignedUpload) -> String {
    if let Some(cdn) = &target.cdn_url {
        return cdn.clone();
    }
    let base = target.url.trim_end_matches('/');
    match target.fields.get("key") {
        Some(key) => format!("{}/{}", base, key.trim_start_matches('/')),
        None => base.to_string(),
    }
}

pub struct RewardCatalogEditor<S> {
    store: S,
    ctx: SessionContext,
}

impl<S: RewardStore> RewardCatalogEditor<S> {
    pub fn new(store: S, ctx: SessionContext) -> Self {
        Self { store, ctx }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Current catalog ordered by XP.
    pub async fn list_rewards(&self) -> EditorResult<Vec<Reward>> {
        let mut rewards = self.store.list_rewards(&self.ctx).await?;
        rewards.sort_by(|a, b| a.xp.cmp(&b.xp).then_with(|| a.id.cmp(&b.id)));
        Ok(rewards)
    }

    /// Creates every valid draft. Fails before any write when a collision
    /// with the existing catalog has no entry in `decisions`; otherwise each
    /// draft gets its own result, so one failed create does not hide the
    /// others.
    pub async fn submit_batch(
        &self,
        drafts: &[RewardDraft],
        decisions: &HashMap<u32, Resolution>,
    ) -> EditorResult<Vec<EditorResult<Reward>>> {
        let valid = validate_batch(drafts)?;
        let existing = self.store.list_rewards(&self.ctx).await?;

        let conflicts = find_conflicts(&existing, &valid);
        let unresolved: Vec<XpConflict> = conflicts
            .iter()
            .filter(|c| !decisions.contains_key(&c.xp))
            .cloned()
            .collect();
        if !unresolved.is_empty() {
            return Err(EditorError::XpConflict(unresolved));
        }

        tracing::debug!(
            count = valid.len(),
            conflicts = conflicts.len(),
            "submitting reward batch"
        );

        let mut results = Vec::with_capacity(valid.len());
        for candidate in &valid {
            let replaced = conflicts
                .iter()
                .find(|c| c.xp == candidate.xp && decisions.get(&c.xp) == Some(&Resolution::Replace))
                .map(|c| c.existing.id.as_str());

            let result = match replaced {
                Some(old_id) => match self.store.delete_reward(&self.ctx, old_id).await {
                    Ok(()) => self.write(None, candidate).await,
                    Err(e) => Err(e),
                },
                None => self.write(None, candidate).await,
            };
            if let Err(e) = &result {
                tracing::warn!(xp = candidate.xp, error = %e, "reward create failed");
            }
            results.push(result);
        }
        Ok(results)
    }

    pub async fn create_reward(
        &self,
        draft: &RewardDraft,
        decision: Option<Resolution>,
    ) -> EditorResult<Reward> {
        let candidate = validate_draft(draft)?;
        let existing = self.store.list_rewards(&self.ctx).await?;
        self.resolve(&existing, &candidate, None, decision).await?;
        self.write(None, &candidate).await
    }

    /// Rewrites a reward's fields. [`RewardImage::Unchanged`] keeps its image.
    pub async fn update_reward(
        &self,
        reward_id: &str,
        draft: &RewardDraft,
        decision: Option<Resolution>,
    ) -> EditorResult<Reward> {
        let candidate = validate_draft(draft)?;
        let existing = self.store.list_rewards(&self.ctx).await?;
        if !existing.iter().any(|r| r.id == reward_id) {
            let known = existing.iter().map(|r| r.id.clone()).collect();
            return Err(EditorError::not_found("reward", reward_id, known));
        }
        self.resolve(&existing, &candidate, Some(reward_id), decision)
            .await?;
        self.write(Some(reward_id), &candidate).await
    }

    pub async fn delete_reward(&self, reward_id: &str) -> EditorResult<()> {
        self.store.delete_reward(&self.ctx, reward_id).await?;
        tracing::info!(reward_id, "reward deleted");
        Ok(())
    }

    /// Applies the caller's decision for a single-entry collision.
    async fn resolve(
        &self,
        existing: &[Reward],
        candidate: &ValidReward,
        editing_id: Option<&str>,
        decision: Option<Resolution>,
    ) -> EditorResult<()> {
        let Some(hit) = detect_collision(existing, candidate.xp, editing_id) else {
            return Ok(());
        };
        match decision {
            None => Err(EditorError::XpConflict(vec![XpConflict {
                xp: candidate.xp,
                candidate_gift: candidate.gift.clone(),
                existing: hit.clone(),
            }])),
            Some(Resolution::AddAnyway) => Ok(()),
            Some(Resolution::Replace) => {
                tracing::info!(reward_id = %hit.id, xp = hit.xp, "replacing colliding reward");
                self.store.delete_reward(&self.ctx, &hit.id).await
            }
        }
    }

    /// Commits the textual fields, then the image. Once the fields are
    /// committed every image failure is reported as [`EditorError::Upload`].
    async fn write(&self, reward_id: Option<&str>, candidate: &ValidReward) -> EditorResult<Reward> {
        let fields = candidate.fields();
        let written = match reward_id {
            Some(id) => self.store.update_reward(&self.ctx, id, &fields).await?,
            None => self.store.create_reward(&self.ctx, &fields).await?,
        };
        let mut reward = written.reward;
        tracing::info!(reward_id = %reward.id, xp = reward.xp, "reward saved");

        if let RewardImage::Upload(image) = &candidate.image {
            let Some(target) = written.upload else {
                return Err(EditorError::Upload {
                    reward_id: reward.id,
                    message: "no upload slot was reserved".to_string(),
                });
            };
            let url = self.finish_image(&reward.id, &target, image).await?;
            reward.image_url = Some(url);
        }
        Ok(reward)
    }

    async fn finish_image(
        &self,
        reward_id: &str,
        target: &PresignedUpload,
        image: &ImageUpload,
    ) -> EditorResult<String> {
        let upload_failed = |e: EditorError| EditorError::Upload {
            reward_id: reward_id.to_string(),
            message: e.to_string(),
        };

        self.store
            .upload_image(target, image)
            .await
            .map_err(upload_failed)?;
        let url = self
            .store
            .confirm_reward_image(&self.ctx, reward_id, &final_image_url(target))
            .await
            .map_err(upload_failed)?;
        tracing::debug!(reward_id, url = %url, "reward image confirmed");
        Ok(url)
    }
}
