use action_locator::FindOptions;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use ui_tree::NodeHandle;
use uia_core_types::{NodeId, SessionId};

use crate::classify::Failure;
use crate::errors::{CommandError, CommandResult};

/// Decoded find/click request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindElementModel {
    #[serde(alias = "using")]
    pub strategy: String,
    #[serde(alias = "value")]
    pub selector: String,
    #[serde(default)]
    pub skip: Option<bool>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub context_id: Option<String>,
}

impl FindElementModel {
    pub fn from_payload(payload: &Value) -> CommandResult<Self> {
        if !payload.is_object() {
            return Err(CommandError::invalid_payload(format!(
                "expected a JSON object, got {payload}"
            )));
        }
        Ok(Self::deserialize(payload)?)
    }

    pub fn find_options(&self, default_timeout_ms: u64) -> FindOptions {
        FindOptions::new(Some(self.timeout.unwrap_or(default_timeout_ms)), self.skip)
    }

    /// Scope handle named by `contextId`; blank ids mean no scope.
    pub fn scope(&self) -> CommandResult<Option<NodeHandle>> {
        match self.context_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(token) => {
                let id: NodeId = token.parse()?;
                Ok(Some(NodeHandle::new(id)))
            }
        }
    }
}

/// Wire response for one command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub status: String,
    pub value: Value,
}

pub const STATUS_OK: &str = "ok";

impl CommandResponse {
    pub fn ok(session: Option<&SessionId>, value: Value) -> Self {
        Self {
            session_id: session.map(ToString::to_string),
            status: STATUS_OK.to_string(),
            value,
        }
    }

    pub fn failed(session: Option<&SessionId>, failure: &Failure) -> Self {
        let mut value = json!({
            "error": failure.category.code(),
            "message": failure.message,
        });
        if let Some(origin) = &failure.origin {
            value["origin"] = Value::String(origin.clone());
        }
        Self {
            session_id: session.map(ToString::to_string),
            status: failure.category.code().to_string(),
            value,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Error code of a failed response
    pub fn error_code(&self) -> Option<&str> {
        if self.is_ok() {
            return None;
        }
        self.value.get("error").and_then(Value::as_str)
    }
}
