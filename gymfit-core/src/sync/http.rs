//! JSON-over-HTTP implementation of the store traits.
//!
//! Every endpoint answers with an envelope
//! `{ "status": <int>, "data": <T>?, "detail": <string>? }`. A non-2xx HTTP
//! status or envelope status is reported as [`EditorError::Remote`] carrying
//! the server's `detail` when it sent one.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use urlencoding::encode;

use super::remote::{
    FoodCatalog, PlanWrite, RewardFields, RewardStore, RewardWrite, TemplateStore,
};
use crate::context::SessionContext;
use crate::error::{EditorError, EditorResult};
use crate::models::{
    DietPlan, DietTemplate, FoodCatalogEntry, ImageUpload, PresignedUpload, Reward,
};

const CLIENT_ID_HEADER: &str = "X-Client-Id";
const GENERIC_DETAIL: &str = "Request failed";

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    status: Option<u16>,
    data: Option<Value>,
    detail: Option<String>,
}

#[derive(Serialize)]
struct ReplacePlanBody<'a> {
    plan: &'a DietPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_version: Option<&'a str>,
}

#[derive(Serialize)]
struct CreateTemplateBody<'a> {
    name: &'a str,
    plan: &'a DietPlan,
}

/// Backend client for the gym API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    server_url: String,
    api_key: Option<String>,
}

impl HttpBackend {
    pub fn new(
        server_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> EditorResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            server_url: server_url.into(),
            api_key,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn build_url(&self, path: &str) -> String {
        let base_url = if self.server_url.starts_with("http://")
            || self.server_url.starts_with("https://")
        {
            self.server_url.clone()
        } else {
            format!("http://{}", self.server_url)
        };

        format!("{}{}", base_url.trim_end_matches('/'), path)
    }

    fn owner_path(&self, ctx: &SessionContext, rest: &str) -> String {
        self.build_url(&format!("/owners/{}{}", encode(&ctx.owner_id), rest))
    }

    fn request(&self, method: Method, url: &str, ctx: Option<&SessionContext>) -> RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        if let Some(ctx) = ctx {
            builder = builder.header(CLIENT_ID_HEADER, &ctx.client_id);
        }
        builder
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> EditorResult<Option<T>> {
        let response = builder.send().await?;
        let http_status = response.status();
        let text = response.text().await?;
        tracing::debug!(status = %http_status, bytes = text.len(), "backend response");

        decode_envelope(http_status, &text)
    }

    async fn send_required<T: DeserializeOwned>(&self, builder: RequestBuilder) -> EditorResult<T> {
        self.send(builder)
            .await?
            .ok_or_else(|| EditorError::Decode("response carried no data".to_string()))
    }
}

fn decode_envelope<T: DeserializeOwned>(http_status: StatusCode, text: &str) -> EditorResult<Option<T>> {
    let envelope: Envelope = if text.trim().is_empty() {
        Envelope::default()
    } else {
        match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(_) if !http_status.is_success() => Envelope {
                detail: Some(text.trim().to_string()),
                ..Envelope::default()
            },
            Err(e) => return Err(EditorError::Decode(e.to_string())),
        }
    };

    let status = if http_status.is_success() {
        envelope.status.unwrap_or(http_status.as_u16())
    } else {
        http_status.as_u16()
    };
    if !(200..300).contains(&status) {
        return Err(EditorError::Remote {
            status,
            detail: envelope
                .detail
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| GENERIC_DETAIL.to_string()),
        });
    }

    match envelope.data {
        None | Some(Value::Null) => Ok(None),
        Some(data) => serde_json::from_value(data)
            .map(Some)
            .map_err(|e| EditorError::Decode(e.to_string())),
    }
}

/// 409 on a plan replace means the version token no longer matches.
fn plan_write_outcome(
    template_id: &str,
    result: EditorResult<Option<PlanWrite>>,
) -> EditorResult<PlanWrite> {
    match result {
        Ok(write) => Ok(write.unwrap_or_default()),
        Err(EditorError::Remote { status: 409, .. }) => Err(EditorError::StaleVersion {
            template_id: template_id.to_string(),
        }),
        Err(e) => Err(e),
    }
}

/// Multipart layout for a presigned upload: the issued fields verbatim, then
/// the file under `file_field`. `None` marks the file slot.
fn upload_layout(target: &PresignedUpload) -> Vec<(&str, Option<&str>)> {
    target
        .fields
        .iter()
        .map(|(name, value)| (name.as_str(), Some(value.as_str())))
        .chain(std::iter::once((target.file_field.as_str(), None)))
        .collect()
}

fn upload_form(target: &PresignedUpload, image: &ImageUpload) -> EditorResult<Form> {
    let mut form = Form::new();
    for (name, value) in upload_layout(target) {
        form = match value {
            Some(value) => form.text(name.to_string(), value.to_string()),
            None => {
                let part = Part::bytes(image.bytes.clone())
                    .file_name(image.file_name.clone())
                    .mime_str(&image.content_type)?;
                form.part(name.to_string(), part)
            }
        };
    }
    Ok(form)
}

impl TemplateStore for HttpBackend {
    async fn get_template(
        &self,
        ctx: &SessionContext,
        template_id: &str,
    ) -> EditorResult<DietTemplate> {
        let url = self.owner_path(ctx, &format!("/diet-templates/{}", encode(template_id)));
        self.send_required(self.request(Method::GET, &url, Some(ctx)))
            .await
    }

    async fn replace_template_plan(
        &self,
        ctx: &SessionContext,
        template_id: &str,
        plan: &DietPlan,
        expected_version: Option<&str>,
    ) -> EditorResult<PlanWrite> {
        let url = self.owner_path(
            ctx,
            &format!("/diet-templates/{}/plan", encode(template_id)),
        );
        let body = ReplacePlanBody {
            plan,
            expected_version,
        };
        let result = self
            .send::<PlanWrite>(self.request(Method::PUT, &url, Some(ctx)).json(&body))
            .await;
        plan_write_outcome(template_id, result)
    }

    async fn create_template(
        &self,
        ctx: &SessionContext,
        name: &str,
        plan: &DietPlan,
    ) -> EditorResult<DietTemplate> {
        let url = self.owner_path(ctx, "/diet-templates");
        let body = CreateTemplateBody { name, plan };
        self.send_required(self.request(Method::POST, &url, Some(ctx)).json(&body))
            .await
    }

    async fn rename_template(
        &self,
        ctx: &SessionContext,
        template_id: &str,
        name: &str,
    ) -> EditorResult<()> {
        let url = self.owner_path(ctx, &format!("/diet-templates/{}", encode(template_id)));
        self.send::<Value>(
            self.request(Method::PATCH, &url, Some(ctx))
                .json(&json!({ "name": name })),
        )
        .await?;
        Ok(())
    }

    async fn delete_template(&self, ctx: &SessionContext, template_id: &str) -> EditorResult<()> {
        let url = self.owner_path(ctx, &format!("/diet-templates/{}", encode(template_id)));
        self.send::<Value>(self.request(Method::DELETE, &url, Some(ctx)))
            .await?;
        Ok(())
    }
}

impl FoodCatalog for HttpBackend {
    async fn search_food_catalog(&self, query: &str) -> EditorResult<Vec<FoodCatalogEntry>> {
        let url = self.build_url("/foods/search");
        let foods = self
            .send(self.request(Method::GET, &url, None).query(&[("query", query)]))
            .await?;
        Ok(foods.unwrap_or_default())
    }

    async fn list_common_foods(&self) -> EditorResult<Vec<FoodCatalogEntry>> {
        let url = self.build_url("/foods/common");
        let foods = self.send(self.request(Method::GET, &url, None)).await?;
        Ok(foods.unwrap_or_default())
    }
}

impl RewardStore for HttpBackend {
    async fn list_rewards(&self, ctx: &SessionContext) -> EditorResult<Vec<Reward>> {
        let url = self.owner_path(ctx, "/rewards");
        let rewards = self.send(self.request(Method::GET, &url, Some(ctx))).await?;
        Ok(rewards.unwrap_or_default())
    }

    async fn create_reward(
        &self,
        ctx: &SessionContext,
        fields: &RewardFields,
    ) -> EditorResult<RewardWrite> {
        let url = self.owner_path(ctx, "/rewards");
        self.send_required(self.request(Method::POST, &url, Some(ctx)).json(fields))
            .await
    }

    async fn update_reward(
        &self,
        ctx: &SessionContext,
        reward_id: &str,
        fields: &RewardFields,
    ) -> EditorResult<RewardWrite> {
        let url = self.owner_path(ctx, &format!("/rewards/{}", encode(reward_id)));
        self.send_required(self.request(Method::PATCH, &url, Some(ctx)).json(fields))
            .await
    }

    async fn delete_reward(&self, ctx: &SessionContext, reward_id: &str) -> EditorResult<()> {
        let url = self.owner_path(ctx, &format!("/rewards/{}", encode(reward_id)));
        self.send::<Value>(self.request(Method::DELETE, &url, Some(ctx)))
            .await?;
        Ok(())
    }

    async fn upload_image(
        &self,
        target: &PresignedUpload,
        image: &ImageUpload,
    ) -> EditorResult<()> {
        let form = upload_form(target, image)?;

        // Storage targets are pre-authorized; no API key or client header.
        let response = self.client.post(&target.url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EditorError::Remote {
                status: status.as_u16(),
                detail: if detail.trim().is_empty() {
                    GENERIC_DETAIL.to_string()
                } else {
                    detail
                },
            });
        }
        Ok(())
    }

    async fn confirm_reward_image(
        &self,
        ctx: &SessionContext,
        reward_id: &str,
        final_url: &str,
    ) -> EditorResult<String> {
        let url = self.owner_path(ctx, &format!("/rewards/{}/image", encode(reward_id)));
        self.send_required(
            self.request(Method::POST, &url, Some(ctx))
                .json(&json!({ "image_url": final_url })),
        )
        .await
    }
}
