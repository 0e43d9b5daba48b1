//! Property schemas: named scopes owning property type definitions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PropertyType, PropertyTypeKind};
use crate::dirty::DirtyFlag;
use crate::error::{require_name, Result};
use crate::model::{Identity, IdentityKind, ThreatModel};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySchema {
    id: Uuid,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    /// Groups schemas contributed by the same extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    #[serde(default)]
    priority: i32,
    #[serde(default)]
    property_types: Vec<PropertyType>,
    #[serde(skip)]
    dirty: DirtyFlag,
}

impl PropertySchema {
    pub fn new(name: &str, dirty: DirtyFlag) -> Result<Self> {
        require_name("Schema", name)?;
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            namespace: None,
            priority: 0,
            property_types: Vec::new(),
            dirty,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        require_name("Schema", name)?;
        self.dirty.assign(&mut self.name, name.to_string());
        Ok(())
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.dirty.assign(&mut self.description, description);
    }

    pub fn set_namespace(&mut self, namespace: Option<String>) {
        self.dirty.assign(&mut self.namespace, namespace);
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.dirty.assign(&mut self.priority, priority);
    }

    /// Creates a property type in this schema.
    pub fn add_property_type(
        &mut self,
        name: &str,
        kind: PropertyTypeKind,
    ) -> Result<&mut PropertyType> {
        let pt = PropertyType::new(name, self.id, kind, self.dirty.clone())?;
        self.property_types.push(pt);
        self.dirty.mark();
        let last = self.property_types.len() - 1;
        Ok(&mut self.property_types[last])
    }

    pub(crate) fn insert(&mut self, pt: PropertyType) -> &PropertyType {
        self.property_types.push(pt);
        self.dirty.mark();
        let last = self.property_types.len() - 1;
        &self.property_types[last]
    }

    pub fn property_type(&self, id: Uuid) -> Option<&PropertyType> {
        self.property_types.iter().find(|t| t.id() == id)
    }

    pub fn property_type_mut(&mut self, id: Uuid) -> Option<&mut PropertyType> {
        self.property_types.iter_mut().find(|t| t.id() == id)
    }

    /// First property type with the given name. Names are not unique.
    pub fn property_type_by_name(&self, name: &str) -> Option<&PropertyType> {
        self.property_types.iter().find(|t| t.name() == name)
    }

    /// Property types in definition order.
    pub fn property_types(&self) -> &[PropertyType] {
        &self.property_types
    }

    /// Property types sorted by priority, ties kept in definition order.
    pub fn ordered_property_types(&self) -> Vec<&PropertyType> {
        let mut types: Vec<_> = self.property_types.iter().collect();
        types.sort_by_key(|t| t.priority());
        types
    }

    pub fn remove_property_type(&mut self, id: Uuid) -> bool {
        let before = self.property_types.len();
        self.property_types.retain(|t| t.id() != id);
        let removed = self.property_types.len() != before;
        if removed {
            self.dirty.mark();
        }
        removed
    }

    /// Copies this schema and all its property types into `model`.
    ///
    /// Returns the identifier of the new schema.
    pub fn clone_into(&self, model: &mut ThreatModel) -> Uuid {
        let mut copy = PropertySchema {
            id: Uuid::new_v4(),
            name: self.name.clone(),
            description: self.description.clone(),
            namespace: self.namespace.clone(),
            priority: self.priority,
            property_types: Vec::new(),
            dirty: model.dirty().clone(),
        };
        for pt in &self.property_types {
            pt.clone_into(&mut copy);
        }
        model.insert_schema(copy)
    }

    pub(crate) fn dirty_flag(&self) -> &DirtyFlag {
        &self.dirty
    }

    pub(crate) fn bind(&mut self, dirty: &DirtyFlag) {
        self.dirty = dirty.clone();
        for pt in &mut self.property_types {
            pt.bind(dirty);
        }
    }

    pub(crate) fn drop_snapshots(&mut self) {
        for pt in &mut self.property_types {
            pt.drop_snapshot();
        }
    }
}

impl Identity for PropertySchema {
    fn id(&self) -> Uuid {
        PropertySchema::id(self)
    }

    fn name(&self) -> &str {
        PropertySchema::name(self)
    }

    fn description(&self) -> Option<&str> {
        PropertySchema::description(self)
    }

    fn kind(&self) -> IdentityKind {
        IdentityKind::Schema
    }
}
