#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

extern crate self as facet_form;

mod cache;
mod context;
mod convert;
mod custom;
mod decoder;
mod error;
mod index;
mod namespace;
mod node;
mod traverse;
mod values;

pub use convert::{Scalar, parse_bool};
pub use decoder::{Collected, Decoder, Mode, TagNameFn};
pub use error::{DecodeError, DecodeErrors, FieldError, ValueKind};
pub use values::Values;

// Form extension attributes for use with #[facet(form::attr)] syntax.
//
// After importing `use facet_form as form;`, users can write:
//   #[facet(form::rename = "User.Name")]
facet::define_attr_grammar! {
    ns "form";
    crate_path ::facet_form;

    /// Form attribute types for field configuration.
    pub enum Attr {
        /// The external key a field is addressed by.
        ///
        /// Usage: `#[facet(form::rename = "Header")]`
        ///
        /// A value of `-` removes the field from decoding.
        Rename(&'static str),
    }
}

/// Decodes `values` into `T` with a default [`Decoder`].
pub fn from_values<T>(values: &Values) -> Result<T, DecodeError>
where
    T: facet_core::Facet<'static>,
{
    Decoder::new().decode(values, &())
}

/// Parses `application/x-www-form-urlencoded` input and decodes it into `T`.
///
/// ```
/// use facet::Facet;
///
/// #[derive(Facet, Debug, PartialEq)]
/// struct Search {
///     q: String,
///     page: u32,
///     tags: Vec<String>,
/// }
///
/// let search: Search = facet_form::from_str("q=rust&page=2&tags=a&tags=b").unwrap();
/// assert_eq!(
///     search,
///     Search {
///         q: "rust".into(),
///         page: 2,
///         tags: vec!["a".into(), "b".into()],
///     }
/// );
/// ```
pub fn from_str<T>(input: &str) -> Result<T, DecodeError>
where
    T: facet_core::Facet<'static>,
{
    from_values(&Values::parse(input))
}
