// #![include_doc("../README.md", start)]
//! # sigmut-model
//!
//! Store models for state management:
//!
//! - `Model`: the single write path of an entity. Field changes come from input events or name/value pairs, and every committed write is reported to an observer.
//! - `Validation`: an observer that keeps a per-field error map and the aggregate `is_valid` flag.
//! - `serialize`: turns a model graph into plain JSON. Callables, symbols, validation state and type markers are dropped.
//! - `store`: notifications, pending counters and a request/submit flow that refuses invalid models.
//!
//! ## Example
//!
//! ```rust
//! use sigmut_model::{to_json, Entity, Model, Rule, Rules};
//!
//! #[derive(Entity)]
//! struct SignUp {
//!     email: String,
//!     age: u32,
//! }
//!
//! let rules = Rules::<SignUp>::new()
//!     .field("email", [Rule::required()])
//!     .field("age", [Rule::range(18.0, 120.0)]);
//! let errors = rules.errors();
//! let mut model = Model::validable(SignUp { email: String::new(), age: 20 }, errors, rules);
//!
//! assert!(!model.validate(None).unwrap());
//! model.change_field(("email", "a@b.com")).unwrap();
//! assert!(model.is_valid());
//!
//! assert_eq!(
//!     to_json(&model).unwrap(),
//!     serde_json::json!({ "email": "a@b.com", "age": 20 })
//! );
//! ```
// #![include_doc("../README.md", end)]
