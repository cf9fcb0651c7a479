//! Correlation token
//!
//! The token embeds the content-record id into the upload ticket request so
//! asynchronous provider webhooks can be matched back to the originating
//! record. The provider treats it as an opaque passthrough string.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppError;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Passthrough {
    record_id: Uuid,
}

/// Opaque value embedded in an outbound ticket request and echoed back by
/// the provider on lifecycle webhooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationToken(Uuid);

impl CorrelationToken {
    pub fn new(record_id: Uuid) -> Self {
        Self(record_id)
    }

    pub fn record_id(&self) -> Uuid {
        self.0
    }

    /// Wire form sent as the provider passthrough.
    pub fn encode(&self) -> String {
        // serializing a single-uuid struct cannot fail
        serde_json::to_string(&Passthrough { record_id: self.0 }).expect("token encoding")
    }

    /// Recover the token from a webhook's echoed passthrough. Accepts the
    /// JSON envelope form and a bare uuid string (older clients sent the
    /// bare form).
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if let Ok(passthrough) = serde_json::from_str::<Passthrough>(raw) {
            return Ok(Self(passthrough.record_id));
        }
        let id = raw.trim().parse::<Uuid>().map_err(|_| {
            AppError::Correlation(format!("Unparsable correlation token: {}", raw))
        })?;
        Ok(Self(id))
    }
}

impl From<Uuid> for CorrelationToken {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}
