//! Correlation context codec.
//!
//! The context is an open key/value bag copied forward through every step of
//! an issue workflow: it rides on executor work items, comes back on executor
//! output, and is embedded as Slack message metadata on announcements so that
//! later reactions and webhooks can find their way back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::state::{TransitionError, WorkflowState};

pub const KEY_WORKFLOW_STATE: &str = "workflow_state";
pub const KEY_REPO: &str = "repo";
pub const KEY_TITLE: &str = "title";
pub const KEY_USERNAME: &str = "username";
pub const KEY_ADD_TO_PROJECT: &str = "add_to_project";
pub const KEY_ASSIGNED: &str = "assigned";
pub const KEY_ISSUE_URL: &str = "issue_url";
pub const KEY_ISSUE_NUMBER: &str = "issue_number";
pub const KEY_VIEW_ID: &str = "view_id";

/// Keys the previous relay deployment wrote; its announcements stay
/// reachable until they age out of the lookup window.
pub const LEGACY_KEY_REPOSITORY: &str = "repository";
pub const LEGACY_KEY_ASSIGNED: &str = "assignedToCopilot";
pub const LEGACY_KEY_ADD_TO_PROJECT: &str = "addToProject";

/// Metadata discriminator used on issue announcement messages.
pub const ISSUE_CREATED_EVENT_TYPE: &str = "issue_created";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Failures reading or extending a correlation context.
pub enum ContextError {
    #[error("correlation context is malformed: {0}")]
    Malformed(String),
    #[error("correlation context is missing required field `{key}`")]
    MissingField { key: &'static str },
    #[error("correlation context field `{key}` has an unexpected type")]
    WrongType { key: &'static str },
    #[error("correlation context field `{key}` is already set to a different value")]
    KeyConflict { key: String },
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
/// Append-only key/value bag threaded through a workflow instance.
pub struct CorrelationContext {
    fields: BTreeMap<String, Value>,
}

impl CorrelationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh context for a new workflow instance.
    pub fn starting_at(state: WorkflowState) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(
            KEY_WORKFLOW_STATE.to_string(),
            Value::String(state.as_str().to_string()),
        );
        Self { fields }
    }

    pub fn encode(&self) -> Vec<u8> {
        Value::Object(self.fields.clone().into_iter().collect())
            .to_string()
            .into_bytes()
    }

    /// Decodes an encoded context; empty input and `null` decode to an empty
    /// context because absent metadata is not an error by itself.
    pub fn decode(bytes: &[u8]) -> Result<Self, ContextError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|error| ContextError::Malformed(error.to_string()))?;
        Self::from_value(Some(&value))
    }

    pub fn from_value(value: Option<&Value>) -> Result<Self, ContextError> {
        match value {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(map)) => Ok(Self {
                fields: map
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            }),
            Some(other) => Err(ContextError::Malformed(format!(
                "expected an object, found {}",
                json_kind(other)
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Adds a key. Re-adding an identical value is accepted; changing an
    /// existing value is not.
    pub fn append(&mut self, key: &str, value: impl Into<Value>) -> Result<(), ContextError> {
        if key == KEY_WORKFLOW_STATE {
            return Err(ContextError::KeyConflict {
                key: key.to_string(),
            });
        }
        let value = value.into();
        match self.fields.get(key) {
            Some(existing) if *existing != value => Err(ContextError::KeyConflict {
                key: key.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.fields.insert(key.to_string(), value);
                Ok(())
            }
        }
    }

    /// Builder-style [`CorrelationContext::append`].
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Result<Self, ContextError> {
        self.append(key, value)?;
        Ok(self)
    }

    /// Returns the recorded state. Contexts written before the state tag
    /// existed, or with an unknown label, report `None`.
    pub fn state(&self) -> Option<WorkflowState> {
        self.fields
            .get(KEY_WORKFLOW_STATE)
            .and_then(Value::as_str)
            .and_then(WorkflowState::parse)
    }

    /// Copies the context forward into `next`, rejecting illegal transitions.
    pub fn advance(&self, next: WorkflowState) -> Result<Self, ContextError> {
        if let Some(current) = self.state() {
            current.transition_to(next)?;
        }
        let mut advanced = self.clone();
        advanced.fields.insert(
            KEY_WORKFLOW_STATE.to_string(),
            Value::String(next.as_str().to_string()),
        );
        Ok(advanced)
    }

    pub fn require_str(&self, key: &'static str) -> Result<&str, ContextError> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Err(ContextError::MissingField { key }),
            Some(Value::String(value)) if value.trim().is_empty() => {
                Err(ContextError::MissingField { key })
            }
            Some(Value::String(value)) => Ok(value.as_str()),
            Some(_) => Err(ContextError::WrongType { key }),
        }
    }

    pub fn optional_str(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Reads a boolean flag; anything other than `true` counts as unset.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.fields.get(key), Some(Value::Bool(true)))
    }

    pub fn number(&self, key: &str) -> Option<u64> {
        self.fields.get(key).and_then(Value::as_u64)
    }

    pub fn repo(&self) -> Option<&str> {
        self.optional_str(KEY_REPO)
            .or_else(|| self.optional_str(LEGACY_KEY_REPOSITORY))
    }

    pub fn is_assigned(&self) -> bool {
        self.flag(KEY_ASSIGNED) || self.flag(LEGACY_KEY_ASSIGNED)
    }

    pub fn wants_project_item(&self) -> bool {
        self.flag(KEY_ADD_TO_PROJECT) || self.flag(LEGACY_KEY_ADD_TO_PROJECT)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Slack message metadata envelope wrapping a correlation context.
pub struct MessageMetadata {
    #[serde(default)]
    pub event_type: String,
    #[serde(default, deserialize_with = "deserialize_payload")]
    pub event_payload: CorrelationContext,
}

impl MessageMetadata {
    pub fn issue_created(context: CorrelationContext) -> Self {
        Self {
            event_type: ISSUE_CREATED_EVENT_TYPE.to_string(),
            event_payload: context,
        }
    }

    pub fn is_issue_created(&self) -> bool {
        self.event_type == ISSUE_CREATED_EVENT_TYPE
    }
}

fn deserialize_payload<'de, D>(deserializer: D) -> Result<CorrelationContext, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    CorrelationContext::from_value(value.as_ref()).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        ContextError, CorrelationContext, MessageMetadata, KEY_ASSIGNED, KEY_ISSUE_NUMBER,
        KEY_REPO, KEY_TITLE, KEY_WORKFLOW_STATE, LEGACY_KEY_ASSIGNED, LEGACY_KEY_REPOSITORY,
    };
    use crate::state::WorkflowState;

    fn sample_context() -> CorrelationContext {
        CorrelationContext::starting_at(WorkflowState::Requested)
            .with(KEY_REPO, "org/repo")
            .and_then(|context| context.with(KEY_TITLE, "Fix 'login' bug"))
            .and_then(|context| context.with(KEY_ASSIGNED, false))
            .and_then(|context| context.with(KEY_ISSUE_NUMBER, 42_u64))
            .and_then(|context| context.with("ratio", 0.25))
            .expect("sample context")
    }

    #[test]
    fn unit_decode_of_encode_preserves_strings_bools_and_numbers() {
        let context = sample_context();
        let decoded = CorrelationContext::decode(&context.encode()).expect("decode");
        assert_eq!(decoded, context);
        assert_eq!(decoded.number(KEY_ISSUE_NUMBER), Some(42));
        assert!(!decoded.flag(KEY_ASSIGNED));
    }

    #[test]
    fn functional_decode_keeps_unknown_keys_and_tolerates_missing_optional_ones() {
        let decoded =
            CorrelationContext::decode(br#"{"repo":"org/repo","future_key":{"nested":true}}"#)
                .expect("decode");
        assert_eq!(decoded.require_str(KEY_REPO), Ok("org/repo"));
        assert_eq!(decoded.get("future_key"), Some(&json!({"nested": true})));
        assert_eq!(decoded.optional_str(KEY_TITLE), None);
        assert!(!decoded.flag(KEY_ASSIGNED));
        assert_eq!(decoded.state(), None);
    }

    #[test]
    fn unit_decode_treats_empty_and_null_as_empty_context() {
        assert!(CorrelationContext::decode(b"").expect("empty").is_empty());
        assert!(CorrelationContext::decode(b"null").expect("null").is_empty());
    }

    #[test]
    fn regression_decode_rejects_non_object_payloads_without_panicking() {
        assert!(matches!(
            CorrelationContext::decode(b"[1,2]"),
            Err(ContextError::Malformed(_))
        ));
        assert!(matches!(
            CorrelationContext::decode(b"{not json"),
            Err(ContextError::Malformed(_))
        ));
    }

    #[test]
    fn unit_require_str_distinguishes_missing_blank_and_wrong_type() {
        let context = CorrelationContext::new()
            .with("blank", "   ")
            .and_then(|context| context.with("count", 3))
            .expect("context");
        assert_eq!(
            context.require_str("absent"),
            Err(ContextError::MissingField { key: "absent" })
        );
        assert_eq!(
            context.require_str("blank"),
            Err(ContextError::MissingField { key: "blank" })
        );
        assert_eq!(
            context.require_str("count"),
            Err(ContextError::WrongType { key: "count" })
        );
    }

    #[test]
    fn functional_append_is_idempotent_but_refuses_rewrites() {
        let mut context = sample_context();
        context.append(KEY_REPO, "org/repo").expect("same value");
        assert_eq!(
            context.append(KEY_REPO, "org/other"),
            Err(ContextError::KeyConflict {
                key: KEY_REPO.to_string()
            })
        );
        assert!(context.append(KEY_WORKFLOW_STATE, "closed").is_err());
    }

    #[test]
    fn functional_advance_moves_state_and_copies_every_other_key() {
        let context = sample_context();
        let advanced = context
            .advance(WorkflowState::Submitted)
            .expect("requested -> submitted");
        assert_eq!(advanced.state(), Some(WorkflowState::Submitted));
        assert_eq!(context.state(), Some(WorkflowState::Requested));
        assert_eq!(advanced.len(), context.len());
        assert!(matches!(
            advanced.advance(WorkflowState::Closed),
            Err(ContextError::Transition(_))
        ));
    }

    #[test]
    fn regression_advance_accepts_contexts_without_state_tag() {
        let legacy = CorrelationContext::new()
            .with(KEY_REPO, "org/repo")
            .expect("context");
        let advanced = legacy
            .advance(WorkflowState::AssignPending)
            .expect("legacy contexts may enter any state");
        assert_eq!(advanced.state(), Some(WorkflowState::AssignPending));
    }

    #[test]
    fn unit_message_metadata_decodes_slack_shape_and_null_payload() {
        let metadata: MessageMetadata = serde_json::from_value(json!({
            "event_type": "issue_created",
            "event_payload": {"issue_url": "https://github.com/org/repo/issues/1"}
        }))
        .expect("metadata");
        assert!(metadata.is_issue_created());
        assert_eq!(metadata.event_payload.len(), 1);

        let empty: MessageMetadata =
            serde_json::from_value(json!({"event_type": "other", "event_payload": null}))
                .expect("null payload");
        assert!(!empty.is_issue_created());
        assert!(empty.event_payload.is_empty());
    }

    #[test]
    fn regression_legacy_announcement_keys_are_read_as_aliases() {
        let legacy = CorrelationContext::from_value(Some(&json!({
            "username": "alice",
            "issue_url": "https://github.com/org/repo/issues/7",
            "repository": "org/repo",
            "assignedToCopilot": true
        })))
        .expect("legacy payload");
        assert_eq!(legacy.repo(), Some("org/repo"));
        assert!(legacy.is_assigned());

        let current = sample_context();
        assert_eq!(current.repo(), Some("org/repo"));
        assert!(!current.is_assigned());
        assert!(current.get(LEGACY_KEY_ASSIGNED).is_none());
        assert!(current.get(LEGACY_KEY_REPOSITORY).is_none());
    }
}
