use uuid::Uuid;

/// Who is acting: the owning gym and this client install.
///
/// Passed explicitly to every store call instead of being looked up from
/// ambient storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub owner_id: String,
    pub client_id: String,
}

impl SessionContext {
    pub fn new(owner_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            client_id: client_id.into(),
        }
    }

    /// Context with a freshly generated client id.
    pub fn for_owner(owner_id: impl Into<String>) -> Self {
        Self::new(owner_id, Uuid::new_v4().to_string())
    }
}
