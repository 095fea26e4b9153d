use std::fmt;

use serde::Serialize;

/// A normalized environment variable value.
///
/// Serializes as a JSON-style boolean, `null`, or string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum EnvValue {
    /// `true`, `(true)`, `false` or `(false)` in any letter case.
    Bool(bool),
    /// `null` or `(null)` in any letter case.
    Null,
    /// Any other value, with surrounding quotes removed.
    Str(String),
}

impl EnvValue {
    /// Turn a raw environment string into a value.
    ///
    /// Sentinels are matched ASCII case-insensitively. `empty` and `(empty)` become an empty string.
    /// A value wrapped in a matching pair of single or double quotes yields the text between them,
    /// as long as that text spans a single line. The unquoted text is not normalized again,
    /// so `"'true'"` stays the string `true`.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "true" | "(true)" => Self::Bool(true),
            "false" | "(false)" => Self::Bool(false),
            "empty" | "(empty)" => Self::Str(String::new()),
            "null" | "(null)" => Self::Null,
            _ => Self::Str(unquote(raw).unwrap_or(raw).to_string()),
        }
    }

    /// The boolean, if this is [`EnvValue::Bool`].
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            Self::Null | Self::Str(_) => None,
        }
    }

    /// The string, if this is [`EnvValue::Str`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            Self::Bool(_) | Self::Null => None,
        }
    }

    /// Returns `true` for [`EnvValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The owned string, if this is [`EnvValue::Str`].
    #[must_use]
    pub fn into_string(self) -> Option<String> {
        match self {
            Self::Str(v) => Some(v),
            Self::Bool(_) | Self::Null => None,
        }
    }
}

fn unquote(raw: &str) -> Option<&str> {
    let quote = raw.chars().next().filter(|c| matches!(c, '"' | '\''))?;
    let inner = raw.strip_prefix(quote)?.strip_suffix(quote)?;
    (!inner.contains('\n')).then_some(inner)
}

impl fmt::Display for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Null => f.write_str("null"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

impl From<bool> for EnvValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for EnvValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for EnvValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for EnvValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl PartialEq<str> for EnvValue {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for EnvValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl PartialEq<bool> for EnvValue {
    fn eq(&self, other: &bool) -> bool {
        self.as_bool() == Some(*other)
    }
}
