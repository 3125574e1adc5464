//! Talking to the gym backend.
//!
//! [`remote`] defines the collaborator traits, [`HttpBackend`] implements
//! them over HTTP, and [`TemplateSyncClient`] runs edit sessions on top.

mod http;
pub mod remote;
mod session;

#[cfg(test)]
pub(crate) mod fakes;

pub use http::HttpBackend;
pub use remote::{
    FoodCatalog, ImageSpec, PlanWrite, RewardFields, RewardStore, RewardWrite, TemplateStore,
};
pub use session::{PersistOutcome, PlanEdit, SessionState, TemplateSession, TemplateSyncClient};
