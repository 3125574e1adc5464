use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier the backend resolves to its built-in reward artwork.
pub const DEFAULT_REWARD_IMAGE: &str = "default";

/// Longest gift text the catalog accepts.
pub const MAX_GIFT_LEN: usize = 300;

/// A redeemable catalog item keyed by its XP threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reward {
    pub id: String,
    #[serde(deserialize_with = "lenient_u32")]
    pub xp: u32,
    pub gift: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Reward {
    pub fn new(id: impl Into<String>, xp: u32, gift: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            xp,
            gift: gift.into(),
            image_url: None,
        }
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn has_default_image(&self) -> bool {
        self.image_url.as_deref() == Some(DEFAULT_REWARD_IMAGE)
    }
}

impl fmt::Display for Reward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>6} XP  {}", self.xp, self.gift)?;
        match self.image_url.as_deref() {
            Some(DEFAULT_REWARD_IMAGE) => write!(f, "  (default image)"),
            Some(url) => write!(f, "  <{}>", url),
            None => Ok(()),
        }
    }
}

/// Raw image bytes waiting for a presigned upload slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// What a create/update should do with the reward's image.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RewardImage {
    /// Leave whatever the reward has (no image for new rewards).
    #[default]
    Unchanged,
    /// Use the backend's built-in artwork.
    Default,
    Upload(ImageUpload),
}

/// Pre-authorized direct-to-storage upload target. `fields` must be sent
/// exactly as received.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PresignedUpload {
    pub url: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default = "default_file_field")]
    pub file_field: String,
    /// Where the object will be served from once the upload lands.
    #[serde(default)]
    pub cdn_url: Option<String>,
}

fn default_file_field() -> String {
    "file".to_string()
}

/// Accepts a whole number or a numeric string. Fractions, negatives and
/// non-numeric values are rejected rather than truncated.
fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let n = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
    .ok_or_else(|| serde::de::Error::custom(format!("xp is not a number: {}", value)))?;

    if n.fract() != 0.0 || n < 0.0 || n > f64::from(u32::MAX) {
        return Err(serde::de::Error::custom(format!(
            "xp is not a whole number in range: {}",
            value
        )));
    }
    Ok(n as u32)
}
