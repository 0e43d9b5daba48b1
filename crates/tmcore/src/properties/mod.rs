//! # Property System
//!
//! Model elements carry arbitrary typed attributes defined by schemas instead
//! of a fixed set of fields.
//!
//! - **Schemas** ([`PropertySchema`]): named scopes owning property types.
//! - **Types** ([`PropertyType`]): the shape of an attribute. Variants are a
//!   closed set ([`PropertyTypeKind`]):
//!
//! | Kind | Value | Notes |
//! |------|-------|-------|
//! | `Bool` | `PropertyValue::Bool` | defaults to `false` |
//! | `SingleLineString` | `PropertyValue::Text` | defaults to `""` |
//! | `List` | `PropertyValue::Item` | legal values come from a list provider extension |
//!
//! - **Values** ([`Property`]): one type attached to one identity, holding
//!   the value. Writes are checked (read-only, variant), no-op writes are
//!   filtered, real changes notify observers and mark the model dirty.
//! - **Containers** ([`PropertySet`]): the properties of one identity.
//!
//! Cross references are identifiers. A property knows its type's id, a type
//! knows its schema's id; both are resolved through [`crate::model::ThreatModel`]
//! when needed.
//!
//! ## Usage
//!
//! ```ignore
//! let schema = model.add_schema("Exposure")?;
//! let public = schema.add_property_type("IsPublicFacing", PropertyTypeKind::Bool)?.id();
//!
//! let prop = model.add_property(entity_id, public)?;
//! prop.set_bool(true)?;            // notifies, marks dirty
//! prop.set_bool(true)?;            // silent
//! ```

mod schema;
mod set;
mod types;
mod value;

pub use schema::PropertySchema;
pub use set::PropertySet;
pub use types::{ListSource, PropertyType, PropertyTypeKind, TypeOrigin};
pub use value::{Property, PropertyChanged, PropertyValue};
