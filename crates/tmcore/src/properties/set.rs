//! The properties carried by one identity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Property, PropertyType};
use crate::dirty::DirtyFlag;

/// At most one property per property type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertySet {
    properties: Vec<Property>,
    #[serde(skip)]
    dirty: DirtyFlag,
}

impl PropertySet {
    pub fn new(dirty: DirtyFlag) -> Self {
        Self {
            properties: Vec::new(),
            dirty,
        }
    }

    /// Attaches a property of the given type, or returns the existing one.
    pub fn add(&mut self, property_type: &PropertyType) -> &mut Property {
        let position = match self.position(property_type.id()) {
            Some(position) => position,
            None => {
                self.properties
                    .push(Property::new(property_type, self.dirty.clone()));
                self.dirty.mark();
                self.properties.len() - 1
            }
        };
        &mut self.properties[position]
    }

    pub fn get(&self, property_type_id: Uuid) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.property_type_id() == property_type_id)
    }

    pub fn get_mut(&mut self, property_type_id: Uuid) -> Option<&mut Property> {
        self.properties
            .iter_mut()
            .find(|p| p.property_type_id() == property_type_id)
    }

    pub fn has(&self, property_type_id: Uuid) -> bool {
        self.position(property_type_id).is_some()
    }

    pub fn remove(&mut self, property_type_id: Uuid) -> bool {
        match self.position(property_type_id) {
            Some(position) => {
                self.properties.remove(position);
                self.dirty.mark();
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    fn position(&self, property_type_id: Uuid) -> Option<usize> {
        self.properties
            .iter()
            .position(|p| p.property_type_id() == property_type_id)
    }

    /// Rebinds every property to `dirty`, refreshing type names through `type_name`.
    pub(crate) fn bind<'a, F>(&mut self, dirty: &DirtyFlag, type_name: F)
    where
        F: Fn(Uuid) -> Option<&'a str>,
    {
        self.dirty = dirty.clone();
        for property in &mut self.properties {
            let name = type_name(property.property_type_id());
            property.bind(dirty, name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{PropertySchema, PropertyTypeKind};

    #[test]
    fn add_is_idempotent_per_type() {
        let flag = DirtyFlag::new();
        let mut schema = PropertySchema::new("Default", flag.clone()).unwrap();
        let pt = schema
            .add_property_type("Owner", PropertyTypeKind::SingleLineString)
            .unwrap()
            .clone();
        let mut set = PropertySet::new(flag.clone());
        flag.reset();

        let first = set.add(&pt).id();
        assert!(flag.is_dirty());
        flag.reset();

        let second = set.add(&pt).id();
        assert_eq!(first, second);
        assert_eq!(set.len(), 1);
        assert!(!flag.is_dirty());
    }

    #[test]
    fn remove_reports_presence() {
        let flag = DirtyFlag::new();
        let mut schema = PropertySchema::new("Default", flag.clone()).unwrap();
        let pt = schema
            .add_property_type("IsPublicFacing", PropertyTypeKind::Bool)
            .unwrap()
            .clone();
        let mut set = PropertySet::new(flag.clone());
        set.add(&pt);

        assert!(set.has(pt.id()));
        assert!(set.remove(pt.id()));
        assert!(!set.remove(pt.id()));
        assert!(set.is_empty());
    }

    #[test]
    fn serializes_as_plain_list() {
        let flag = DirtyFlag::new();
        let mut schema = PropertySchema::new("Default", flag.clone()).unwrap();
        let pt = schema
            .add_property_type("IsPublicFacing", PropertyTypeKind::Bool)
            .unwrap()
            .clone();
        let mut set = PropertySet::new(flag);
        set.add(&pt).set_bool(true).unwrap();

        let json = serde_json::to_value(&set).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["value"], true);

        let loaded: PropertySet = serde_json::from_value(json).unwrap();
        assert_eq!(loaded.get(pt.id()).and_then(|p| p.as_bool()), Some(true));
    }
}
