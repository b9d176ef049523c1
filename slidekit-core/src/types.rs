//! Domain types shared by the compiler, the preview orchestrator and the CLI.
//!
//! Template-side types ([`Block`], [`VariableSpec`]) mirror the JSON shape of
//! `blocks.json` files. Request-side types ([`BoundValue`],
//! [`BoundVariables`]) carry user input. [`Instance`] is the serializable
//! snapshot of a live preview.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Name of a template directory under the templates root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(pub String);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TemplateId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TemplateId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifier of a live preview instance. Unique for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub String);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for InstanceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Template definitions
// ---------------------------------------------------------------------------

/// Input widget kind of a variable. Serialized with the editor's names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum VariableKind {
    /// Single-line text.
    #[default]
    Input,
    /// Multi-line text.
    #[serde(alias = "textarea")]
    TextArea,
    /// Ordered list of text lines.
    List,
    Select,
    Radio,
    /// Boolean toggle.
    Checkbox,
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariableKind::Input => "input",
            VariableKind::TextArea => "textArea",
            VariableKind::List => "list",
            VariableKind::Select => "select",
            VariableKind::Radio => "radio",
            VariableKind::Checkbox => "checkbox",
        };
        f.write_str(name)
    }
}

/// One choice of a select/radio variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

/// Typed, labeled definition of one piece of user-supplied content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Key into the bound-variables mapping; also the macro argument name.
    pub name: String,
    pub label: String,
    #[serde(rename = "_type", alias = "kind", default)]
    pub kind: VariableKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        rename = "defaultValue",
        alias = "default",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<BoundValue>,
    /// Choices for select/radio kinds.
    #[serde(
        default,
        alias = "selectList",
        alias = "radioList",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub options: Vec<SelectOption>,
}

impl VariableSpec {
    /// Value used when a request does not bind this variable.
    ///
    /// The declared default wins; otherwise the kind decides (empty text,
    /// empty list, `false`, or the first option of a select/radio).
    pub fn fallback_value(&self) -> BoundValue {
        if let Some(default) = &self.default {
            return default.clone();
        }
        match self.kind {
            VariableKind::Input | VariableKind::TextArea => BoundValue::Text(String::new()),
            VariableKind::List => BoundValue::List(Vec::new()),
            VariableKind::Checkbox => BoundValue::Flag(false),
            VariableKind::Select | VariableKind::Radio => BoundValue::Text(
                self.options
                    .first()
                    .map(|o| o.value.clone())
                    .unwrap_or_default(),
            ),
        }
    }
}

/// A named, orderable content unit of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    /// Macro invoked for this block.
    pub function: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub variables: Vec<VariableSpec>,
    #[serde(default)]
    pub order: i64,
}

impl Block {
    /// Names of this block's variables, in declaration order.
    pub fn argument_names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name.as_str())
    }
}

// ---------------------------------------------------------------------------
// Bound variables
// ---------------------------------------------------------------------------

/// A concrete value supplied for one variable.
///
/// Untagged: JSON `true`, `3`, `"text"` and `["a", "b"]` map directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoundValue {
    Flag(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<String>),
}

impl BoundValue {
    /// Text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            BoundValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for BoundValue {
    fn from(s: &str) -> Self {
        BoundValue::Text(s.to_owned())
    }
}

impl From<String> for BoundValue {
    fn from(s: String) -> Self {
        BoundValue::Text(s)
    }
}

impl From<bool> for BoundValue {
    fn from(b: bool) -> Self {
        BoundValue::Flag(b)
    }
}

impl From<Vec<String>> for BoundValue {
    fn from(items: Vec<String>) -> Self {
        BoundValue::List(items)
    }
}

/// Name → value mapping supplied with a compile or preview request.
///
/// Ordered by name so that compilation output is deterministic.
pub type BoundVariables = BTreeMap<String, BoundValue>;

// ---------------------------------------------------------------------------
// Preview instances
// ---------------------------------------------------------------------------

/// Lifecycle status of a preview instance.
///
/// `Starting → Running → {Stopped | Error}`; the last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    #[default]
    Starting,
    Running,
    Stopped,
    Error,
}

impl InstanceStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, InstanceStatus::Stopped | InstanceStatus::Error)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceStatus::Starting => write!(f, "starting"),
            InstanceStatus::Running => write!(f, "running"),
            InstanceStatus::Stopped => write!(f, "stopped"),
            InstanceStatus::Error => write!(f, "error"),
        }
    }
}

/// Snapshot of a live preview as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    pub port: u16,
    pub status: InstanceStatus,
    pub url: String,
    pub template_id: TemplateId,
    /// Backing source document the renderer reads.
    pub source_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
