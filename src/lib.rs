//! Store models for state management: a field-change model, per-field validation state,
//! and a serializer that turns model graphs into plain JSON snapshots.
//!
//! ```
//! use sigmut_model::{to_json, Model, NameValue, Record, Rule, Rules};
//!
//! let rules = Rules::<Record>::new().field("email", [Rule::required()]);
//! let errors = rules.errors();
//! let mut model = Model::validable(Record::new().with("email", ""), errors, rules);
//!
//! assert!(!model.validate(None).unwrap());
//! model.change_field(NameValue::new("email", "a@b.com")).unwrap();
//! assert!(model.is_valid());
//!
//! assert_eq!(to_json(&model).unwrap(), serde_json::json!({ "email": "a@b.com" }));
//! ```

extern crate self as sigmut_model;

mod model;
mod serialize;
pub mod store;
mod validation;
mod value;

#[cfg(doctest)]
mod tests_readme;

pub use model::*;
pub use serialize::*;
pub use validation::*;
pub use value::*;

/// Derives [`Entity`] and [`ToValue`] for a struct with named fields.
///
/// Field attributes:
/// - `#[entity(rename = "name")]`: the field name used by the model and in snapshots.
/// - `#[entity(skip)]`: the field is neither settable nor serialized.
pub use sigmut_model_macros::Entity;
