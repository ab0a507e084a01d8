//! Conversion of raw form strings into primitive values.

use std::borrow::Cow;

use facet_core::{Characteristic, ScalarType, Shape};
use facet_reflect::{Partial, ReflectError};

use crate::error::{FieldError, ValueKind};

/// A converted leaf value.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Scalar {
    /// `bool`
    Bool(bool),
    /// `char`
    Char(char),
    /// `String`
    String(String),
    /// `Cow<'static, str>`
    CowStr(Cow<'static, str>),
    /// `f32`
    F32(f32),
    /// `f64`
    F64(f64),
    /// `u8`
    U8(u8),
    /// `u16`
    U16(u16),
    /// `u32`
    U32(u32),
    /// `u64`
    U64(u64),
    /// `u128`
    U128(u128),
    /// `usize`
    Usize(usize),
    /// `i8`
    I8(i8),
    /// `i16`
    I16(i16),
    /// `i32`
    I32(i32),
    /// `i64`
    I64(i64),
    /// `i128`
    I128(i128),
    /// `isize`
    Isize(isize),
    /// A value kept as text: a type with its own string parser, a unit
    /// variant name, or the input handed to a custom decode function.
    Raw(String),
}

impl Scalar {
    /// Writes the value into the current frame.
    pub(crate) fn assign(
        self,
        wip: Partial<'static, false>,
    ) -> Result<Partial<'static, false>, ReflectError> {
        match self {
            Scalar::Bool(v) => wip.set(v),
            Scalar::Char(v) => wip.set(v),
            Scalar::String(v) => wip.set(v),
            Scalar::CowStr(v) => wip.set(v),
            Scalar::F32(v) => wip.set(v),
            Scalar::F64(v) => wip.set(v),
            Scalar::U8(v) => wip.set(v),
            Scalar::U16(v) => wip.set(v),
            Scalar::U32(v) => wip.set(v),
            Scalar::U64(v) => wip.set(v),
            Scalar::U128(v) => wip.set(v),
            Scalar::Usize(v) => wip.set(v),
            Scalar::I8(v) => wip.set(v),
            Scalar::I16(v) => wip.set(v),
            Scalar::I32(v) => wip.set(v),
            Scalar::I64(v) => wip.set(v),
            Scalar::I128(v) => wip.set(v),
            Scalar::Isize(v) => wip.set(v),
            Scalar::Raw(v) => wip.parse_from_str(&v),
        }
    }
}

/// Parses a boolean the way HTML forms send them.
///
/// Empty input is `false`, so an unchecked checkbox submitted with no value
/// still decodes.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" | "on" | "yes" | "ok" => Some(true),
        "" | "0" | "f" | "F" | "false" | "FALSE" | "False" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Whether `shape` converts from a single string.
pub(crate) fn is_scalar_like(shape: &'static Shape) -> bool {
    match shape.scalar_type() {
        Some(ScalarType::Str | ScalarType::Unit) => false,
        Some(_) => true,
        None => shape.is(Characteristic::FromStr),
    }
}

/// Converts `raw` into a value of `shape`.
///
/// `Ok(None)` means the position stays at its zero value: numbers and
/// characters given an empty string are left untouched.
pub(crate) fn convert(
    shape: &'static Shape,
    raw: &str,
    namespace: &str,
) -> Result<Option<Scalar>, FieldError> {
    let invalid = |kind: ValueKind| FieldError::InvalidValue {
        kind,
        value: raw.to_owned(),
        shape,
        namespace: namespace.to_owned(),
    };

    macro_rules! number {
        ($variant:ident, $ty:ty, $kind:expr) => {{
            if raw.is_empty() {
                return Ok(None);
            }
            raw.parse::<$ty>()
                .map(|v| Some(Scalar::$variant(v)))
                .map_err(|_| invalid($kind))
        }};
    }

    match shape.scalar_type() {
        Some(ScalarType::Bool) => parse_bool(raw)
            .map(|v| Some(Scalar::Bool(v)))
            .ok_or_else(|| invalid(ValueKind::Boolean)),
        Some(ScalarType::Char) => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (None, _) => Ok(None),
                (Some(c), None) => Ok(Some(Scalar::Char(c))),
                _ => Err(invalid(ValueKind::Character)),
            }
        }
        Some(ScalarType::String) => Ok(Some(Scalar::String(raw.to_owned()))),
        Some(ScalarType::CowStr) => Ok(Some(Scalar::CowStr(Cow::Owned(raw.to_owned())))),
        Some(ScalarType::F32) => number!(F32, f32, ValueKind::Float),
        Some(ScalarType::F64) => number!(F64, f64, ValueKind::Float),
        Some(ScalarType::U8) => number!(U8, u8, ValueKind::UnsignedInteger),
        Some(ScalarType::U16) => number!(U16, u16, ValueKind::UnsignedInteger),
        Some(ScalarType::U32) => number!(U32, u32, ValueKind::UnsignedInteger),
        Some(ScalarType::U64) => number!(U64, u64, ValueKind::UnsignedInteger),
        Some(ScalarType::U128) => number!(U128, u128, ValueKind::UnsignedInteger),
        Some(ScalarType::USize) => number!(Usize, usize, ValueKind::UnsignedInteger),
        Some(ScalarType::I8) => number!(I8, i8, ValueKind::Integer),
        Some(ScalarType::I16) => number!(I16, i16, ValueKind::Integer),
        Some(ScalarType::I32) => number!(I32, i32, ValueKind::Integer),
        Some(ScalarType::I64) => number!(I64, i64, ValueKind::Integer),
        Some(ScalarType::I128) => number!(I128, i128, ValueKind::Integer),
        Some(ScalarType::ISize) => number!(Isize, isize, ValueKind::Integer),
        Some(ScalarType::Str | ScalarType::Unit) => Err(FieldError::Unsupported { shape }),
        _ if shape.is(Characteristic::FromStr) => {
            if validate_with_parser(shape, raw) {
                Ok(Some(Scalar::Raw(raw.to_owned())))
            } else {
                Err(invalid(ValueKind::Text))
            }
        }
        _ => Err(FieldError::Unsupported { shape }),
    }
}

/// Runs the type's own string parser against a scratch allocation.
fn validate_with_parser(shape: &'static Shape, raw: &str) -> bool {
    // SAFETY: `shape` was reached by walking the shape tree of the decode
    // target, so it accurately describes its type.
    let wip = match unsafe { Partial::alloc_shape_owned(shape) } {
        Ok(wip) => wip,
        Err(_) => return false,
    };
    wip.parse_from_str(raw).is_ok()
}
