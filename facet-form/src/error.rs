use core::fmt;
use std::collections::BTreeMap;

use facet_core::Shape;
use facet_reflect::ReflectError;

/// Which kind of primitive a raw value failed to convert into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Signed integers
    Integer,
    /// Unsigned integers
    UnsignedInteger,
    /// `f32` and `f64`
    Float,
    /// `bool`
    Boolean,
    /// `char`
    Character,
    /// Any other type parsed through its `FromStr` implementation
    Text,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Integer => "Integer",
            ValueKind::UnsignedInteger => "Unsigned Integer",
            ValueKind::Float => "Float",
            ValueKind::Boolean => "Boolean",
            ValueKind::Character => "Character",
            ValueKind::Text => "Text",
        })
    }
}

/// A problem with one position of the target.
///
/// Field errors never stop the decode: every one found is collected into
/// [`DecodeErrors`] under the path where it occurred.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum FieldError {
    /// The raw value did not convert into the target primitive.
    InvalidValue {
        /// The primitive family that was expected
        kind: ValueKind,
        /// The offending input
        value: String,
        /// The target type
        shape: &'static Shape,
        /// Where the value was found
        namespace: String,
    },

    /// A custom decode function rejected the value.
    Custom {
        /// The error the function returned, rendered
        message: String,
    },

    /// A collection index reached the configured maximum.
    BoundExceeded {
        /// The length the index would require
        len: usize,
        /// The configured maximum
        max: usize,
    },

    /// A fixed-size array index was out of range.
    IndexOutOfBounds {
        /// The offending index
        index: usize,
        /// The array length
        len: usize,
    },

    /// A bracketed token under a list or array was not a number.
    InvalidSliceIndex {
        /// The token between the brackets
        raw: String,
    },

    /// A bracketed token did not convert into the map key type.
    InvalidMapKey {
        /// The token between the brackets
        raw: String,
        /// The key type
        shape: &'static Shape,
    },

    /// The raw value named no unit variant of the target enum.
    UnknownVariant {
        /// The offending input
        value: String,
        /// The enum type
        shape: &'static Shape,
    },

    /// A value was present for a type the decoder cannot build from text.
    Unsupported {
        /// The target type
        shape: &'static Shape,
    },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::InvalidValue {
                kind,
                value,
                shape,
                namespace,
            } => write!(
                f,
                "Invalid {kind} Value '{value}' Type '{shape}' Namespace '{namespace}'"
            ),
            FieldError::Custom { message } => f.write_str(message),
            FieldError::BoundExceeded { len, max } => write!(
                f,
                "array size of '{len}' is larger than the maximum currently set on the decoder of '{max}'"
            ),
            FieldError::IndexOutOfBounds { index, len } => write!(
                f,
                "array index '{index}' is out of bounds, array length is '{len}'"
            ),
            FieldError::InvalidSliceIndex { raw } => write!(f, "invalid slice index '{raw}'"),
            FieldError::InvalidMapKey { raw, shape } => {
                write!(f, "invalid map key '{raw}' for key type '{shape}'")
            }
            FieldError::UnknownVariant { value, shape } => {
                write!(f, "'{value}' is not a unit variant of '{shape}'")
            }
            FieldError::Unsupported { shape } => {
                write!(f, "type '{shape}' cannot be decoded from form values")
            }
        }
    }
}

impl core::error::Error for FieldError {}

/// Every field error found during one decode, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct DecodeErrors {
    errors: BTreeMap<String, FieldError>,
}

impl DecodeErrors {
    pub(crate) fn insert(&mut self, namespace: &str, error: FieldError) {
        tracing::debug!(namespace, %error, "field error");
        self.errors.insert(namespace.to_owned(), error);
    }

    pub(crate) fn clear(&mut self) {
        self.errors.clear();
    }

    pub(crate) fn take(&mut self) -> DecodeErrors {
        DecodeErrors {
            errors: core::mem::take(&mut self.errors),
        }
    }

    /// The error recorded at `namespace`, if any.
    pub fn get(&self, namespace: &str) -> Option<&FieldError> {
        self.errors.get(namespace)
    }

    /// Iterates over `(path, error)` in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldError)> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of positions with an error.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether no errors were recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for DecodeErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (namespace, error) in &self.errors {
            if !first {
                f.write_str("\n")?;
            }
            first = false;
            let line = format!("Field Namespace:{namespace} ERROR:{error}");
            f.write_str(line.trim_end())?;
        }
        Ok(())
    }
}

impl core::error::Error for DecodeErrors {}

/// Why a decode failed.
#[derive(Debug)]
#[non_exhaustive]
pub enum DecodeError {
    /// The target is a reference or raw pointer, which cannot be decoded into.
    InvalidTarget {
        /// The rejected target type
        shape: &'static Shape,
    },

    /// One or more positions failed to decode.
    Fields(DecodeErrors),

    /// The decoded values could not be assembled into the target.
    Build {
        /// What the reflection layer reported
        message: String,
    },
}

impl DecodeError {
    /// The field errors, when this is a [`DecodeError::Fields`].
    pub fn field_errors(&self) -> Option<&DecodeErrors> {
        match self {
            DecodeError::Fields(errors) => Some(errors),
            _ => None,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidTarget { shape } => {
                write!(f, "cannot decode into `{shape}`: target must be an owned value")
            }
            DecodeError::Fields(errors) => write!(f, "{errors}"),
            DecodeError::Build { message } => write!(f, "could not build value: {message}"),
        }
    }
}

impl core::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            DecodeError::Fields(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ReflectError> for DecodeError {
    fn from(err: ReflectError) -> Self {
        DecodeError::Build {
            message: err.to_string(),
        }
    }
}

impl From<DecodeErrors> for DecodeError {
    fn from(errors: DecodeErrors) -> Self {
        DecodeError::Fields(errors)
    }
}
