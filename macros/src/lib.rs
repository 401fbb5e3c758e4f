use proc_macro::TokenStream;
use syn_utils::into_macro_output;

#[macro_use]
mod syn_utils;

mod entity_impl;

/// Implements `Entity` and `ToValue` for a struct with named fields.
///
/// Each field becomes a settable model field and a data member of the snapshot.
///
/// # Attributes
///
/// | Attribute                     | Effect                                     |
/// |-------------------------------|--------------------------------------------|
/// | `#[entity(rename = "name")]`  | Uses `name` instead of the Rust field name |
/// | `#[entity(skip)]`             | Excludes the field from both impls         |
///
/// # Examples
///
/// ```ignore
/// #[derive(Entity)]
/// struct Form {
///     email: String,
///     #[entity(rename = "firstName")]
///     first_name: String,
///     #[entity(skip)]
///     cache: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    into_macro_output(entity_impl::derive_entity(input.into()))
}
