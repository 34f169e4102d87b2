//! Compile-time schema metadata for request kinds.
//!
//! Request structs are declared through the `request_kinds!` macro, which
//! derives a [`RequestKind`] implementation listing every field in
//! declaration order together with its [`FieldShape`]. The shape of a field
//! is decided by its Rust type through [`FieldCodec`], so a field can only be
//! exposed as a flag when its type maps onto one primitive flag value.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

use crate::messages::Message;

/// Suffix every request kind name carries.
pub const REQUEST_SUFFIX: &str = "Request";

/// Primitive semantic type of a flag-eligible field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    /// A single UTF-8 string.
    String,
    /// A single unsigned integer.
    Integer,
    /// A boolean switch.
    Boolean,
    /// Zero or more strings.
    RepeatedString,
}

/// How a field participates in flag synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// The field maps onto a single flag.
    Flag {
        /// Semantic type of the flag value.
        field_type: FieldType,
        /// Whether the request is invalid without this field.
        required: bool,
    },
    /// The field holds a nested message and cannot be set from one flag.
    Nested,
}

impl FieldShape {
    /// Returns the flag type and required-ness for flag-eligible fields.
    #[must_use]
    pub const fn flag(self) -> Option<(FieldType, bool)> {
        match self {
            Self::Flag {
                field_type,
                required,
            } => Some((field_type, required)),
            Self::Nested => None,
        }
    }
}

/// Static description of one request field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field name as declared on the request struct.
    pub name: &'static str,
    /// Flag eligibility of the field.
    pub shape: FieldShape,
}

/// A dynamically typed field value used to move data between flags and
/// request structs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Value of a `string` field.
    String(String),
    /// Value of an `integer` field.
    Integer(u64),
    /// Value of a `boolean` field.
    Boolean(bool),
    /// Value of a `repeated-string` field.
    Strings(Vec<String>),
}

impl FieldValue {
    /// Returns the semantic type carried by the value.
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        match self {
            Self::String(_) => FieldType::String,
            Self::Integer(_) => FieldType::Integer,
            Self::Boolean(_) => FieldType::Boolean,
            Self::Strings(_) => FieldType::RepeatedString,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => formatter.write_str(value),
            Self::Integer(value) => write!(formatter, "{value}"),
            Self::Boolean(value) => write!(formatter, "{value}"),
            Self::Strings(values) => formatter.write_str(&values.join(",")),
        }
    }
}

/// Reasons a value could not be stored in a field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldErrorKind {
    /// The value's type differs from the field's type.
    #[error("expects a {expected} value but received a {actual} value")]
    TypeMismatch {
        /// Type declared by the field.
        expected: FieldType,
        /// Type carried by the supplied value.
        actual: FieldType,
    },
    /// The integer does not fit the field's width.
    #[error("value {value} exceeds the maximum of {max}")]
    OutOfRange {
        /// Supplied value.
        value: u64,
        /// Largest value the field can hold.
        max: u64,
    },
    /// The field holds a nested message.
    #[error("holds a nested message and cannot be set from a flag")]
    NotFlagEligible,
    /// No field with this name exists.
    #[error("does not exist")]
    UnknownField,
}

/// Error raised when populating a request field by name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field `{field}` {kind}")]
pub struct FieldError {
    /// Name of the field being populated.
    pub field: String,
    /// What went wrong.
    pub kind: FieldErrorKind,
}

impl FieldError {
    /// Builds an error for the named field.
    #[must_use]
    pub fn new(field: &str, kind: FieldErrorKind) -> Self {
        Self {
            field: field.to_owned(),
            kind,
        }
    }

    /// Builds an error for a field name the request kind does not declare.
    #[must_use]
    pub fn unknown(field: &str) -> Self {
        Self::new(field, FieldErrorKind::UnknownField)
    }
}

/// Conversion between a field's Rust type and [`FieldValue`].
///
/// The associated [`FieldShape`] is evaluated at compile time, which is what
/// makes a request kind's field table static.
pub trait FieldCodec: Sized {
    /// Flag eligibility of every field of this type.
    const SHAPE: FieldShape;

    /// Reads the field as a flag value, returning `None` when unset.
    fn encode(&self) -> Option<FieldValue>;

    /// Converts a flag value into the field's type.
    fn decode(value: FieldValue) -> Result<Self, FieldErrorKind>;

    /// Reports whether the field carries no value and can be omitted from
    /// serialised output.
    fn is_unset(&self) -> bool;
}

trait Scalar: Sized {
    const FIELD_TYPE: FieldType;

    fn to_value(&self) -> FieldValue;

    fn from_value(value: FieldValue) -> Result<Self, FieldErrorKind>;
}

fn mismatch(expected: FieldType, value: &FieldValue) -> FieldErrorKind {
    FieldErrorKind::TypeMismatch {
        expected,
        actual: value.field_type(),
    }
}

impl Scalar for String {
    const FIELD_TYPE: FieldType = FieldType::String;

    fn to_value(&self) -> FieldValue {
        FieldValue::String(self.clone())
    }

    fn from_value(value: FieldValue) -> Result<Self, FieldErrorKind> {
        match value {
            FieldValue::String(text) => Ok(text),
            other => Err(mismatch(Self::FIELD_TYPE, &other)),
        }
    }
}

impl Scalar for u32 {
    const FIELD_TYPE: FieldType = FieldType::Integer;

    fn to_value(&self) -> FieldValue {
        FieldValue::Integer(u64::from(*self))
    }

    fn from_value(value: FieldValue) -> Result<Self, FieldErrorKind> {
        match value {
            FieldValue::Integer(number) => {
                Self::try_from(number).map_err(|_| FieldErrorKind::OutOfRange {
                    value: number,
                    max: u64::from(Self::MAX),
                })
            }
            other => Err(mismatch(Self::FIELD_TYPE, &other)),
        }
    }
}

impl Scalar for u64 {
    const FIELD_TYPE: FieldType = FieldType::Integer;

    fn to_value(&self) -> FieldValue {
        FieldValue::Integer(*self)
    }

    fn from_value(value: FieldValue) -> Result<Self, FieldErrorKind> {
        match value {
            FieldValue::Integer(number) => Ok(number),
            other => Err(mismatch(Self::FIELD_TYPE, &other)),
        }
    }
}

impl Scalar for bool {
    const FIELD_TYPE: FieldType = FieldType::Boolean;

    fn to_value(&self) -> FieldValue {
        FieldValue::Boolean(*self)
    }

    fn from_value(value: FieldValue) -> Result<Self, FieldErrorKind> {
        match value {
            FieldValue::Boolean(flag) => Ok(flag),
            other => Err(mismatch(Self::FIELD_TYPE, &other)),
        }
    }
}

macro_rules! required_scalar_codec {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldCodec for $ty {
                const SHAPE: FieldShape = FieldShape::Flag {
                    field_type: <$ty as Scalar>::FIELD_TYPE,
                    required: true,
                };

                fn encode(&self) -> Option<FieldValue> {
                    Some(Scalar::to_value(self))
                }

                fn decode(value: FieldValue) -> Result<Self, FieldErrorKind> {
                    <$ty as Scalar>::from_value(value)
                }

                fn is_unset(&self) -> bool {
                    false
                }
            }
        )*
    };
}

macro_rules! optional_scalar_codec {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldCodec for Option<$ty> {
                const SHAPE: FieldShape = FieldShape::Flag {
                    field_type: <$ty as Scalar>::FIELD_TYPE,
                    required: false,
                };

                fn encode(&self) -> Option<FieldValue> {
                    self.as_ref().map(Scalar::to_value)
                }

                fn decode(value: FieldValue) -> Result<Self, FieldErrorKind> {
                    <$ty as Scalar>::from_value(value).map(Some)
                }

                fn is_unset(&self) -> bool {
                    self.is_none()
                }
            }
        )*
    };
}

required_scalar_codec!(String, u32, u64);
optional_scalar_codec!(String, u32, u64, bool);

impl FieldCodec for Vec<String> {
    const SHAPE: FieldShape = FieldShape::Flag {
        field_type: FieldType::RepeatedString,
        required: false,
    };

    fn encode(&self) -> Option<FieldValue> {
        if self.is_empty() {
            None
        } else {
            Some(FieldValue::Strings(self.clone()))
        }
    }

    fn decode(value: FieldValue) -> Result<Self, FieldErrorKind> {
        match value {
            FieldValue::Strings(values) => Ok(values),
            other => Err(mismatch(FieldType::RepeatedString, &other)),
        }
    }

    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

/// Schema metadata and by-name field access for one request kind.
///
/// Implementations are generated by `request_kinds!`; the field table lists
/// every declared field, flag-eligible or not, in declaration order.
pub trait RequestKind: Message + Default {
    /// Message awaited from the server after sending this request.
    type Response: Message;

    /// Type name of the request kind, for example `CreateRequest`.
    const KIND_NAME: &'static str;

    /// Every field of the kind in declaration order.
    const FIELDS: &'static [FieldInfo];

    /// Reads a field by name. Returns `None` for unset, nested, or unknown
    /// fields.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Stores a value into the named field.
    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError>;
}

/// Reports whether `name` ends in [`REQUEST_SUFFIX`] with a non-empty stem.
///
/// Usable in constant evaluation so request declarations are rejected at
/// compile time when the naming contract is broken.
#[must_use]
#[expect(
    clippy::indexing_slicing,
    reason = "constant evaluation cannot use slice iterators; indices are bounds-checked above"
)]
pub const fn has_request_suffix(name: &str) -> bool {
    let bytes = name.as_bytes();
    let suffix = REQUEST_SUFFIX.as_bytes();
    if bytes.len() <= suffix.len() {
        return false;
    }
    let offset = bytes.len() - suffix.len();
    let mut index = 0;
    while index < suffix.len() {
        if bytes[offset + index] != suffix[index] {
            return false;
        }
        index += 1;
    }
    true
}
