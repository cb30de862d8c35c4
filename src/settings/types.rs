//! Setting value and definition types

use std::fmt;

use futures_util::future::BoxFuture;
use thiserror::Error;

/// Supported setting value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Number,
    Text,
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number => write!(f, "number"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// A setting value; also the raw input type for updates, so commands can
/// pass console text and plugins can pass numbers directly.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Number(f64),
    Text(String),
}

impl SettingValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            Self::Number(_) => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(t) => write!(f, "{t}"),
        }
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// What subscribers receive: the new value on update, `Removed` when the
/// setting is deleted.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingUpdate {
    Value(SettingValue),
    Removed,
}

pub type TransformFn = Box<dyn Fn(SettingValue) -> Result<SettingValue, String> + Send + Sync>;
pub type ValidateFn = Box<dyn Fn(&SettingValue) -> bool + Send + Sync>;

/// Subscriber callback; awaited in subscription order on every update.
pub type SettingListener = Box<dyn Fn(SettingUpdate) -> BoxFuture<'static, ()> + Send + Sync>;

/// Handle returned by subscribe, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingSubscription(pub(crate) u64);

/// Definition of a new setting.
///
/// `transform` runs before `validate`; without one, raw values are coerced
/// to the declared kind (text parsed as a number for `Number` settings,
/// with a parse failure reported as a validation failure). `choices` is an
/// allow-list checked after validation.
pub struct SettingDefinition {
    pub key: String,
    pub kind: SettingKind,
    pub description: String,
    pub transform: Option<TransformFn>,
    pub validate: Option<ValidateFn>,
    pub choices: Vec<SettingValue>,
    pub value: Option<SettingValue>,
}

impl SettingDefinition {
    pub fn number(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(key, SettingKind::Number, description)
    }

    pub fn text(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(key, SettingKind::Text, description)
    }

    fn new(key: impl Into<String>, kind: SettingKind, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            description: description.into(),
            transform: None,
            validate: None,
            choices: Vec::new(),
            value: None,
        }
    }

    pub fn with_transform(
        mut self,
        transform: impl Fn(SettingValue) -> Result<SettingValue, String> + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    pub fn with_validate(
        mut self,
        validate: impl Fn(&SettingValue) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.validate = Some(Box::new(validate));
        self
    }

    pub fn with_choices(mut self, choices: impl IntoIterator<Item = SettingValue>) -> Self {
        self.choices = choices.into_iter().collect();
        self
    }

    pub fn with_value(mut self, value: impl Into<SettingValue>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Clonable projection of a setting record for display purposes.
#[derive(Debug, Clone)]
pub struct SettingInfo {
    pub key: String,
    pub kind: SettingKind,
    pub description: String,
    pub choices: Vec<SettingValue>,
    pub value: Option<SettingValue>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("no setting {0}")]
    UnknownKey(String),

    #[error("setting {0} already defined")]
    AlreadyDefined(String),

    #[error("invalid setting definition: {0}")]
    InvalidDefinition(String),

    #[error("value {raw} failed validation for setting {key}")]
    Validation { key: String, raw: String },

    #[error("value {raw} not a valid choice for setting {key}")]
    InvalidChoice { key: String, raw: String },
}
