//! Property values and change notification.
//!
//! A [`Property`] attaches one property type to one identity. It stores the
//! type as an identifier only; the type itself is resolved through the model
//! whenever it is needed, because during loading a property can show up before
//! the schema that defines its type.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PropertyType;
use crate::dirty::DirtyFlag;
use crate::error::{Result, TmError};
use crate::extensions::ListItem;
use crate::model::ThreatModel;

/// Runtime representation of a property value.
///
/// The variant always matches the variant of the property's type:
/// `Bool` for boolean types, `Text` for single-line strings, `Item` for
/// list-backed types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Text(String),
    /// The selected list item, if any.
    Item(Option<ListItem>),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&ListItem> {
        match self {
            PropertyValue::Item(item) => item.as_ref(),
            _ => None,
        }
    }

    /// Text used for display and search.
    pub fn as_text(&self) -> String {
        match self {
            PropertyValue::Bool(v) => v.to_string(),
            PropertyValue::Text(s) => s.clone(),
            PropertyValue::Item(Some(item)) => item.label.clone(),
            PropertyValue::Item(None) => String::new(),
        }
    }

    pub fn same_variant(&self, other: &PropertyValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    pub(crate) fn variant_name(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "boolean",
            PropertyValue::Text(_) => "text",
            PropertyValue::Item(_) => "list item",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Raised after a property value actually changed.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChanged {
    pub property_id: Uuid,
    pub property_type_id: Uuid,
    pub old: PropertyValue,
    pub new: PropertyValue,
}

type Observer = Arc<dyn Fn(&PropertyChanged) + Send + Sync>;

/// Observers are attached to one instance. Cloning a property does not carry
/// them over.
#[derive(Default)]
struct Observers(Vec<Observer>);

impl Observers {
    fn notify(&self, event: &PropertyChanged) {
        for observer in &self.0 {
            observer(event);
        }
    }
}

impl Clone for Observers {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} observer(s)", self.0.len())
    }
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// An instance of a property type attached to an identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    id: Uuid,
    property_type_id: Uuid,
    #[serde(default, skip_serializing_if = "is_false")]
    read_only: bool,
    value: PropertyValue,
    /// Type name for error messages. Copied when the property is created or
    /// rebound, so `PropertyType::set_name` alone leaves it stale;
    /// `ThreatModel::rename_property_type` refreshes it.
    #[serde(skip)]
    type_name: Option<String>,
    #[serde(skip)]
    observers: Observers,
    #[serde(skip)]
    dirty: DirtyFlag,
}

impl Property {
    pub(crate) fn new(property_type: &PropertyType, dirty: DirtyFlag) -> Self {
        Self {
            id: Uuid::new_v4(),
            property_type_id: property_type.id(),
            read_only: false,
            value: property_type.default_value(),
            type_name: Some(property_type.name().to_string()),
            observers: Observers::default(),
            dirty,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn property_type_id(&self) -> Uuid {
        self.property_type_id
    }

    /// Resolves the property type through the model's schemas.
    pub fn property_type<'m>(&self, model: &'m ThreatModel) -> Option<&'m PropertyType> {
        model.property_type(self.property_type_id)
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_bool()
    }

    pub fn as_text(&self) -> String {
        self.value.as_text()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.dirty.assign(&mut self.read_only, read_only);
    }

    /// Registers an observer called after every actual value change.
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: Fn(&PropertyChanged) + Send + Sync + 'static,
    {
        self.observers.0.push(Arc::new(observer));
    }

    /// Sets the value.
    ///
    /// Fails on read-only properties and on values of the wrong variant.
    /// Writing the current value again is silent: no notification, no dirty
    /// flag. Returns whether the value changed.
    pub fn set_value(&mut self, value: PropertyValue) -> Result<bool> {
        if self.read_only {
            return Err(TmError::ReadOnlyProperty(
                self.type_name.clone().unwrap_or_else(|| "<unknown>".into()),
            ));
        }
        if !self.value.same_variant(&value) {
            return Err(TmError::Validation(format!(
                "property expects a {} value, got a {} value",
                self.value.variant_name(),
                value.variant_name()
            )));
        }

        let id = self.id;
        let property_type_id = self.property_type_id;
        let observers = &self.observers;
        Ok(self.dirty.assign_with(&mut self.value, value, |old, new| {
            observers.notify(&PropertyChanged {
                property_id: id,
                property_type_id,
                old: old.clone(),
                new: new.clone(),
            });
        }))
    }

    pub fn set_bool(&mut self, value: bool) -> Result<bool> {
        self.set_value(PropertyValue::Bool(value))
    }

    pub fn set_text(&mut self, value: impl Into<String>) -> Result<bool> {
        self.set_value(PropertyValue::Text(value.into()))
    }

    pub fn set_item(&mut self, item: Option<ListItem>) -> Result<bool> {
        self.set_value(PropertyValue::Item(item))
    }

    pub(crate) fn bind(&mut self, dirty: &DirtyFlag, type_name: Option<&str>) {
        self.dirty = dirty.clone();
        if let Some(name) = type_name {
            self.type_name = Some(name.to_string());
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
