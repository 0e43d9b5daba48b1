//! # tmcore Architecture
//!
//! tmcore is the data model and rule core of a threat-modeling tool. It lets
//! the elements of a model carry schema-defined, typed properties, and decides
//! through boolean rule trees which elements qualify for automatic threat
//! generation. It is a library first; the `tmcore` binary is a thin client.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Generation (generation.rs)                                 │
//! │  - Scans the model with each threat type's rule tree        │
//! │  - Raises threat events on the matches                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Rules (rules/) and Search (search.rs)                      │
//! │  - Pure predicates over any Identity                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Model (model/) and Properties (properties/)                │
//! │  - Identities, schemas, property types and values           │
//! │  - Weak references by id, resolved through the model root   │
//! │  - Every tracked write marks the DirtyFlag (dirty.rs)       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage (store/)                                           │
//! │  - ModelStore trait                                         │
//! │  - FileStore (production), InMemoryStore (testing)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! List-backed property types get their values from extensions looked up in
//! an [`ExtensionRegistry`](extensions::ExtensionRegistry), which the host
//! populates at startup and passes to the operations that need it.
//!
//! ## No I/O in the Core
//!
//! Apart from `store/` and `logging.rs`, nothing here touches the filesystem,
//! stdout or the process. The library emits `tracing` events and leaves
//! installing a subscriber to the binary.
//!
//! ## Quick Tour
//!
//! ```
//! use tmcore::dirty::DirtyFlag;
//! use tmcore::model::{EntityType, Identity, ThreatModel};
//! use tmcore::properties::PropertyTypeKind;
//! use tmcore::rules::{RuleNode, SelectionRule};
//!
//! let mut model = ThreatModel::with_dirty_flag("Web App", DirtyFlag::new()).unwrap();
//! let public = model
//!     .add_schema("Exposure")
//!     .unwrap()
//!     .add_property_type("IsPublicFacing", PropertyTypeKind::Bool)
//!     .unwrap()
//!     .id();
//! let login = model.add_entity("Login Form", EntityType::Process).unwrap().id();
//!
//! let rule = RuleNode::or(vec![
//!     SelectionRule::bool_property(public, "IsPublicFacing", true).into(),
//!     SelectionRule::name_contains("Login").into(),
//! ]);
//! assert!(rule.evaluate(model.identity(login).unwrap()).unwrap());
//! assert_eq!(rule.render(), "(IsPublicFacing == true OR Name contains \"Login\")");
//! ```
//!
//! ## Module Overview
//!
//! - [`model`]: the model root, identities, id index
//! - [`properties`]: schemas, property types, property values
//! - [`rules`]: rule trees and their leaf predicates
//! - [`search`]: free-text search over identities
//! - [`generation`]: the automatic threat generation pass
//! - [`extensions`]: extension registry and the list provider contract
//! - [`store`]: JSON documents, file and in-memory stores
//! - [`dirty`]: the unsaved-changes flag
//! - [`config`], [`logging`], [`error`]

pub mod config;
pub mod dirty;
pub mod error;
pub mod extensions;
pub mod generation;
pub mod logging;
pub mod model;
pub mod properties;
pub mod rules;
pub mod search;
pub mod store;

pub use error::{Result, TmError};
