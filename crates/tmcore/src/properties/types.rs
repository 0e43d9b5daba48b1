//! Property type definitions.
//!
//! A [`PropertyType`] describes the shape of an attribute inside a schema. The
//! variant-specific part lives in [`PropertyTypeKind`], a closed enum: every
//! operation matches on it exhaustively, so adding a variant forces every
//! operation to decide what it does for it.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{PropertySchema, PropertyValue};
use crate::dirty::DirtyFlag;
use crate::error::{require_name, Result, TmError};
use crate::extensions::{ExtensionRegistry, ListItem, ListProvider};

fn default_visible() -> bool {
    true
}

/// Where a list-backed type gets its values from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSource {
    /// Identifier of the list provider extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_provider_id: Option<String>,

    /// Passed verbatim to the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Last list obtained from the provider. Best-effort cache, used when the
    /// provider is not loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_list: Option<Vec<ListItem>>,
}

impl ListSource {
    pub fn new(list_provider_id: impl Into<String>, context: Option<String>) -> Self {
        Self {
            list_provider_id: Some(list_provider_id.into()),
            context,
            cached_list: None,
        }
    }

    fn provider_id(&self) -> Option<&str> {
        self.list_provider_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }

    fn resolve(&mut self, registry: &ExtensionRegistry) -> Option<&[ListItem]> {
        let provider = self.provider_id().and_then(|id| registry.list_provider(id));

        match provider {
            Some(provider) => {
                let items = provider.available_items(self.context.as_deref());
                debug!(provider = provider.id(), count = items.len(), "resolved list values");
                self.cached_list = Some(items);
            }
            None => {
                warn!(
                    provider = self.provider_id().unwrap_or("<none>"),
                    cached = self.cached_list.as_ref().map_or(0, Vec::len),
                    "list provider unavailable, using cached snapshot"
                );
            }
        }

        self.cached_list.as_deref()
    }
}

/// The variant-specific part of a property type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PropertyTypeKind {
    Bool,
    SingleLineString,
    List(ListSource),
}

impl PropertyTypeKind {
    pub fn list(list_provider_id: impl Into<String>, context: Option<String>) -> Self {
        PropertyTypeKind::List(ListSource::new(list_provider_id, context))
    }

    /// Copy for a cloned type: list snapshots are not carried over.
    fn without_snapshot(&self) -> Self {
        match self {
            PropertyTypeKind::Bool => PropertyTypeKind::Bool,
            PropertyTypeKind::SingleLineString => PropertyTypeKind::SingleLineString,
            PropertyTypeKind::List(source) => PropertyTypeKind::List(ListSource {
                cached_list: None,
                ..source.clone()
            }),
        }
    }
}

/// Identifiers of the type a clone was made from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeOrigin {
    pub type_id: Uuid,
    pub schema_id: Uuid,
}

/// A typed attribute definition bound to a schema.
///
/// Two property types are the same logical type iff their identifiers match;
/// names may repeat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyType {
    id: Uuid,
    schema_id: Uuid,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    priority: i32,
    #[serde(default = "default_visible")]
    visible: bool,
    #[serde(flatten)]
    kind: PropertyTypeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cloned_from: Option<TypeOrigin>,
    #[serde(skip)]
    dirty: DirtyFlag,
}

impl PropertyType {
    pub(crate) fn new(
        name: &str,
        schema_id: Uuid,
        kind: PropertyTypeKind,
        dirty: DirtyFlag,
    ) -> Result<Self> {
        require_name("Property type", name)?;
        Ok(Self {
            id: Uuid::new_v4(),
            schema_id,
            name: name.to_string(),
            description: None,
            priority: 0,
            visible: true,
            kind,
            cloned_from: None,
            dirty,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn schema_id(&self) -> Uuid {
        self.schema_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn kind(&self) -> &PropertyTypeKind {
        &self.kind
    }

    pub fn cloned_from(&self) -> Option<TypeOrigin> {
        self.cloned_from
    }

    pub fn list_source(&self) -> Option<&ListSource> {
        match &self.kind {
            PropertyTypeKind::List(source) => Some(source),
            PropertyTypeKind::Bool | PropertyTypeKind::SingleLineString => None,
        }
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        require_name("Property type", name)?;
        self.dirty.assign(&mut self.name, name.to_string());
        Ok(())
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.dirty.assign(&mut self.description, description);
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.dirty.assign(&mut self.priority, priority);
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.dirty.assign(&mut self.visible, visible);
    }

    /// Binds a list-backed type to a provider.
    pub fn set_list_provider(&mut self, provider: &dyn ListProvider) -> Result<()> {
        let dirty = self.dirty.clone();
        let source = self.list_source_mut()?;
        dirty.assign(&mut source.list_provider_id, Some(provider.id().to_string()));
        Ok(())
    }

    pub fn set_context(&mut self, context: Option<String>) -> Result<()> {
        let dirty = self.dirty.clone();
        let source = self.list_source_mut()?;
        dirty.assign(&mut source.context, context);
        Ok(())
    }

    fn list_source_mut(&mut self) -> Result<&mut ListSource> {
        match &mut self.kind {
            PropertyTypeKind::List(source) => Ok(source),
            PropertyTypeKind::Bool | PropertyTypeKind::SingleLineString => {
                Err(TmError::UnsupportedOperation(format!(
                    "property type '{}' is not list-backed",
                    self.name
                )))
            }
        }
    }

    /// Value of a property of this type that was never set.
    pub fn default_value(&self) -> PropertyValue {
        match &self.kind {
            PropertyTypeKind::Bool => PropertyValue::Bool(false),
            PropertyTypeKind::SingleLineString => PropertyValue::Text(String::new()),
            PropertyTypeKind::List(_) => PropertyValue::Item(None),
        }
    }

    /// Legal values of a list-backed type.
    ///
    /// Asks the bound provider and caches the answer. When the provider is not
    /// registered, returns the cached snapshot from the last successful call,
    /// which may be absent. Never fails. Non-list types have no value list.
    pub fn resolve_values(&mut self, registry: &ExtensionRegistry) -> Option<&[ListItem]> {
        match &mut self.kind {
            PropertyTypeKind::List(source) => source.resolve(registry),
            PropertyTypeKind::Bool | PropertyTypeKind::SingleLineString => None,
        }
    }

    /// Copies this type into `dest` under a fresh identifier and returns the copy.
    ///
    /// Descriptive fields and the list provider binding are copied; the list
    /// snapshot is not. The source identifiers are kept in
    /// [`cloned_from`](Self::cloned_from).
    pub fn clone_into<'a>(&self, dest: &'a mut PropertySchema) -> &'a PropertyType {
        let copy = PropertyType {
            id: Uuid::new_v4(),
            schema_id: dest.id(),
            name: self.name.clone(),
            description: self.description.clone(),
            priority: self.priority,
            visible: self.visible,
            kind: self.kind.without_snapshot(),
            cloned_from: Some(TypeOrigin {
                type_id: self.id,
                schema_id: self.schema_id,
            }),
            dirty: dest.dirty_flag().clone(),
        };
        debug!(source = %self.id, clone = %copy.id, schema = %dest.id(), "cloned property type");
        dest.insert(copy)
    }

    pub(crate) fn bind(&mut self, dirty: &DirtyFlag) {
        self.dirty = dirty.clone();
    }

    pub(crate) fn drop_snapshot(&mut self) {
        if let PropertyTypeKind::List(source) = &mut self.kind {
            source.cached_list = None;
        }
    }
}

impl PartialEq for PropertyType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PropertyType {}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::fixtures::StaticListProvider;
    use std::sync::Arc;

    fn schema(flag: &DirtyFlag) -> PropertySchema {
        PropertySchema::new("STRIDE", flag.clone()).unwrap()
    }

    #[test]
    fn create_rejects_blank_name() {
        let flag = DirtyFlag::new();
        let mut schema = schema(&flag);
        assert!(matches!(
            schema.add_property_type("  ", PropertyTypeKind::Bool),
            Err(TmError::Validation(_))
        ));
    }

    #[test]
    fn create_binds_schema_and_defaults() {
        let flag = DirtyFlag::new();
        let mut schema = schema(&flag);
        let schema_id = schema.id();
        let pt = schema
            .add_property_type("IsPublicFacing", PropertyTypeKind::Bool)
            .unwrap();

        assert_eq!(pt.schema_id(), schema_id);
        assert!(pt.is_visible());
        assert_eq!(pt.priority(), 0);
        assert_eq!(pt.default_value(), PropertyValue::Bool(false));
        assert!(pt.cloned_from().is_none());
    }

    #[test]
    fn identity_is_by_id_not_name() {
        let flag = DirtyFlag::new();
        let mut schema = schema(&flag);
        let a = schema
            .add_property_type("Owner", PropertyTypeKind::SingleLineString)
            .unwrap()
            .clone();
        let b = schema
            .add_property_type("Owner", PropertyTypeKind::SingleLineString)
            .unwrap()
            .clone();

        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn clone_into_copies_fields_with_fresh_id() {
        let flag = DirtyFlag::new();
        let mut source = schema(&flag);
        let original = {
            let pt = source
                .add_property_type("Exposure", PropertyTypeKind::list("exposure", Some("web".into())))
                .unwrap();
            pt.set_description(Some("How exposed the element is".into()));
            pt.set_priority(7);
            pt.set_visible(false);
            pt.clone()
        };

        let mut dest = PropertySchema::new("Copy", flag.clone()).unwrap();
        let dest_id = dest.id();
        let clone = original.clone_into(&mut dest);

        assert_ne!(clone.id(), original.id());
        assert_eq!(clone.schema_id(), dest_id);
        assert_eq!(clone.name(), "Exposure");
        assert_eq!(clone.description(), Some("How exposed the element is"));
        assert_eq!(clone.priority(), 7);
        assert!(!clone.is_visible());
        assert_eq!(
            clone.cloned_from(),
            Some(TypeOrigin {
                type_id: original.id(),
                schema_id: source.id()
            })
        );
        let list = clone.list_source().unwrap();
        assert_eq!(list.list_provider_id.as_deref(), Some("exposure"));
        assert_eq!(list.context.as_deref(), Some("web"));

        let clone_id = clone.id();
        assert!(dest.property_type(clone_id).is_some());
    }

    #[test]
    fn clone_does_not_copy_snapshot() {
        let flag = DirtyFlag::new();
        let registry = ExtensionRegistry::new();
        registry.register_list_provider(Arc::new(StaticListProvider::new(
            "stride",
            &[("S", "Spoofing"), ("T", "Tampering")],
        )));

        let mut source = schema(&flag);
        let pt = source
            .add_property_type("Category", PropertyTypeKind::list("stride", None))
            .unwrap();
        assert_eq!(pt.resolve_values(&registry).map(|v| v.len()), Some(2));
        let pt = pt.clone();

        let mut dest = PropertySchema::new("Copy", flag.clone()).unwrap();
        let clone = pt.clone_into(&mut dest);
        assert!(clone.list_source().unwrap().cached_list.is_none());
    }

    #[test]
    fn resolve_values_caches_provider_result() {
        let flag = DirtyFlag::new();
        let registry = ExtensionRegistry::new();
        let provider = Arc::new(StaticListProvider::new(
            "stride",
            &[("S", "Spoofing"), ("T", "Tampering"), ("SX", "Spoofing (extended)")],
        ));
        registry.register_list_provider(provider.clone());

        let mut schema = schema(&flag);
        let pt = schema
            .add_property_type("Category", PropertyTypeKind::list("stride", Some("S".into())))
            .unwrap();

        let values = pt.resolve_values(&registry).unwrap().to_vec();
        assert_eq!(values.len(), 2);
        assert_eq!(provider.calls(), 1);
        assert_eq!(pt.list_source().unwrap().cached_list.as_ref(), Some(&values));
    }

    #[test]
    fn resolve_values_falls_back_to_snapshot() {
        let flag = DirtyFlag::new();
        let loaded = ExtensionRegistry::new();
        loaded.register_list_provider(Arc::new(StaticListProvider::new(
            "stride",
            &[("S", "Spoofing")],
        )));

        let mut schema = schema(&flag);
        let pt = schema
            .add_property_type("Category", PropertyTypeKind::list("stride", None))
            .unwrap();
        pt.resolve_values(&loaded);

        let empty = ExtensionRegistry::new();
        let values = pt.resolve_values(&empty).unwrap();
        assert_eq!(values, &[ListItem::new("S", "Spoofing")]);
    }

    #[test]
    fn resolve_values_without_provider_or_snapshot_is_none() {
        let flag = DirtyFlag::new();
        let mut schema = schema(&flag);
        let pt = schema
            .add_property_type("Category", PropertyTypeKind::list("missing", None))
            .unwrap();
        assert!(pt.resolve_values(&ExtensionRegistry::new()).is_none());
    }

    #[test]
    fn non_list_types_have_no_values() {
        let flag = DirtyFlag::new();
        let mut schema = schema(&flag);
        let pt = schema
            .add_property_type("IsPublicFacing", PropertyTypeKind::Bool)
            .unwrap();
        assert!(pt.resolve_values(&ExtensionRegistry::new()).is_none());
        assert!(matches!(
            pt.set_context(Some("x".into())),
            Err(TmError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn set_list_provider_binds_by_id() {
        let flag = DirtyFlag::new();
        let mut schema = schema(&flag);
        let pt = schema
            .add_property_type("Category", PropertyTypeKind::List(ListSource::default()))
            .unwrap();
        flag.reset();

        let provider = StaticListProvider::new("stride", &[]);
        pt.set_list_provider(&provider).unwrap();
        assert_eq!(
            pt.list_source().unwrap().list_provider_id.as_deref(),
            Some("stride")
        );
        assert!(flag.is_dirty());
    }

    #[test]
    fn setters_only_mark_dirty_on_change() {
        let flag = DirtyFlag::new();
        let mut schema = schema(&flag);
        let pt = schema
            .add_property_type("Owner", PropertyTypeKind::SingleLineString)
            .unwrap();
        flag.reset();

        pt.set_name("Owner").unwrap();
        pt.set_visible(true);
        assert!(!flag.is_dirty());

        pt.set_priority(3);
        assert!(flag.is_dirty());
    }

    #[test]
    fn serialized_record_fields() {
        let flag = DirtyFlag::new();
        let mut schema = schema(&flag);
        let pt = schema
            .add_property_type("Category", PropertyTypeKind::list("stride", Some("ctx".into())))
            .unwrap()
            .clone();

        let json = serde_json::to_value(&pt).unwrap();
        for key in ["id", "schemaId", "name", "priority", "visible", "listProviderId", "context"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["kind"], "list");

        let loaded: PropertyType = serde_json::from_value(json).unwrap();
        assert_eq!(loaded, pt);
        assert_eq!(loaded.kind(), pt.kind());
        assert_eq!(loaded.name(), "Category");
    }

    #[test]
    fn missing_visible_defaults_to_true() {
        let json = format!(
            r#"{{"id":"{}","schemaId":"{}","name":"Flag","kind":"bool"}}"#,
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let pt: PropertyType = serde_json::from_str(&json).unwrap();
        assert!(pt.is_visible());
        assert_eq!(pt.kind(), &PropertyTypeKind::Bool);
    }
}
