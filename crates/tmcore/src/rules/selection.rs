//! Leaf predicates of a rule tree.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TmError};
use crate::model::{EntityType, Identity, IdentityKind};
use crate::properties::PropertyValue;

/// A domain predicate supplied at runtime.
///
/// Implementations must be pure: evaluating the same identity twice without
/// model changes in between gives the same answer.
pub trait Predicate: Send + Sync {
    /// Text shown when the rule tree is rendered.
    fn describe(&self) -> String;

    fn evaluate(&self, identity: &dyn Identity) -> Result<bool>;
}

/// A runtime predicate inside a [`SelectionRule`]. Compared by pointer.
#[derive(Clone)]
pub struct CustomRule(Arc<dyn Predicate>);

impl CustomRule {
    pub fn new(predicate: impl Predicate + 'static) -> Self {
        Self(Arc::new(predicate))
    }
}

impl From<Arc<dyn Predicate>> for CustomRule {
    fn from(predicate: Arc<dyn Predicate>) -> Self {
        Self(predicate)
    }
}

impl PartialEq for CustomRule {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomRule").field(&self.0.describe()).finish()
    }
}

/// Conditions usable as rule tree leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionRule {
    /// Boolean property must equal `value`.
    #[serde(rename_all = "camelCase")]
    BoolProperty {
        property_type_id: Uuid,
        name: String,
        value: bool,
    },
    /// Text property must equal `value` (ordinal).
    #[serde(rename_all = "camelCase")]
    TextProperty {
        property_type_id: Uuid,
        name: String,
        value: String,
    },
    /// List property must have the item `item_id` selected.
    #[serde(rename_all = "camelCase")]
    ListProperty {
        property_type_id: Uuid,
        name: String,
        item_id: String,
    },
    /// Name contains the text, ignoring case.
    NameContains(String),
    EntityTypeIs(EntityType),
    IdentityKindIs(IdentityKind),
    Always,
    Never,
    /// Runtime-only, never persisted.
    #[serde(skip)]
    Custom(CustomRule),
}

impl SelectionRule {
    pub fn bool_property(property_type_id: Uuid, name: &str, value: bool) -> Self {
        SelectionRule::BoolProperty {
            property_type_id,
            name: name.to_string(),
            value,
        }
    }

    pub fn text_property(property_type_id: Uuid, name: &str, value: &str) -> Self {
        SelectionRule::TextProperty {
            property_type_id,
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    pub fn list_property(property_type_id: Uuid, name: &str, item_id: &str) -> Self {
        SelectionRule::ListProperty {
            property_type_id,
            name: name.to_string(),
            item_id: item_id.to_string(),
        }
    }

    pub fn name_contains(text: &str) -> Self {
        SelectionRule::NameContains(text.to_string())
    }

    pub fn custom(predicate: impl Predicate + 'static) -> Self {
        SelectionRule::Custom(CustomRule::new(predicate))
    }

    /// Evaluates the condition against `identity`.
    ///
    /// Property conditions fail with [`TmError::InvalidPredicate`] on
    /// identities that cannot carry properties. A property the identity does
    /// not have counts as holding its type's default value.
    pub fn evaluate(&self, identity: &dyn Identity) -> Result<bool> {
        match self {
            SelectionRule::BoolProperty {
                property_type_id,
                value,
                ..
            } => {
                let stored = property_value(identity, *property_type_id)?
                    .and_then(PropertyValue::as_bool)
                    .unwrap_or(false);
                Ok(stored == *value)
            }

            SelectionRule::TextProperty {
                property_type_id,
                value,
                ..
            } => {
                let stored = property_value(identity, *property_type_id)?
                    .and_then(PropertyValue::as_str)
                    .unwrap_or("");
                Ok(stored == value)
            }

            SelectionRule::ListProperty {
                property_type_id,
                item_id,
                ..
            } => Ok(property_value(identity, *property_type_id)?
                .and_then(PropertyValue::as_item)
                .is_some_and(|item| item.id == *item_id)),

            SelectionRule::NameContains(text) => Ok(identity
                .name()
                .to_lowercase()
                .contains(&text.to_lowercase())),

            SelectionRule::EntityTypeIs(expected) => Ok(identity.entity_type() == Some(*expected)),

            SelectionRule::IdentityKindIs(expected) => Ok(identity.kind() == *expected),

            SelectionRule::Always => Ok(true),

            SelectionRule::Never => Ok(false),

            SelectionRule::Custom(rule) => rule.0.evaluate(identity),
        }
    }
}

fn property_value(identity: &dyn Identity, property_type_id: Uuid) -> Result<Option<&PropertyValue>> {
    let properties = identity.properties().ok_or_else(|| {
        TmError::InvalidPredicate(format!(
            "{} '{}' cannot carry properties",
            identity.kind(),
            identity.name()
        ))
    })?;
    Ok(properties.get(property_type_id).map(|p| p.value()))
}

impl fmt::Display for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionRule::BoolProperty { name, value, .. } => write!(f, "{} == {}", name, value),
            SelectionRule::TextProperty { name, value, .. } => write!(f, "{} == \"{}\"", name, value),
            SelectionRule::ListProperty { name, item_id, .. } => {
                write!(f, "{} == [{}]", name, item_id)
            }
            SelectionRule::NameContains(text) => write!(f, "Name contains \"{}\"", text),
            SelectionRule::EntityTypeIs(entity_type) => write!(f, "EntityType == {}", entity_type),
            SelectionRule::IdentityKindIs(kind) => write!(f, "Kind == {}", kind),
            SelectionRule::Always => f.write_str("TRUE"),
            SelectionRule::Never => f.write_str("FALSE"),
            SelectionRule::Custom(rule) => f.write_str(&rule.0.describe()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirty::DirtyFlag;
    use crate::extensions::ListItem;
    use crate::model::ThreatModel;
    use crate::properties::PropertyTypeKind;

    struct Fixture {
        model: ThreatModel,
        flag_type: Uuid,
        owner_type: Uuid,
        zone_type: Uuid,
        entity: Uuid,
    }

    fn fixture() -> Fixture {
        let mut model = ThreatModel::with_dirty_flag("M", DirtyFlag::new()).unwrap();
        let schema = model.add_schema("S").unwrap();
        let flag_type = schema
            .add_property_type("IsPublicFacing", PropertyTypeKind::Bool)
            .unwrap()
            .id();
        let owner_type = schema
            .add_property_type("Owner", PropertyTypeKind::SingleLineString)
            .unwrap()
            .id();
        let zone_type = schema
            .add_property_type("Zone", PropertyTypeKind::list("zones", None))
            .unwrap()
            .id();
        let entity = model
            .add_entity("Login Form", EntityType::Process)
            .unwrap()
            .id();
        Fixture {
            model,
            flag_type,
            owner_type,
            zone_type,
            entity,
        }
    }

    #[test]
    fn missing_property_counts_as_default() {
        let fx = fixture();
        let entity = fx.model.identity(fx.entity).unwrap();

        assert!(SelectionRule::bool_property(fx.flag_type, "IsPublicFacing", false)
            .evaluate(entity)
            .unwrap());
        assert!(!SelectionRule::bool_property(fx.flag_type, "IsPublicFacing", true)
            .evaluate(entity)
            .unwrap());
        assert!(SelectionRule::text_property(fx.owner_type, "Owner", "")
            .evaluate(entity)
            .unwrap());
        assert!(!SelectionRule::list_property(fx.zone_type, "Zone", "dmz")
            .evaluate(entity)
            .unwrap());
    }

    #[test]
    fn property_conditions_read_stored_values() {
        let mut fx = fixture();
        fx.model
            .add_property(fx.entity, fx.owner_type)
            .unwrap()
            .set_text("Platform")
            .unwrap();
        fx.model
            .add_property(fx.entity, fx.zone_type)
            .unwrap()
            .set_item(Some(ListItem::new("dmz", "DMZ")))
            .unwrap();
        let entity = fx.model.identity(fx.entity).unwrap();

        assert!(SelectionRule::text_property(fx.owner_type, "Owner", "Platform")
            .evaluate(entity)
            .unwrap());
        assert!(!SelectionRule::text_property(fx.owner_type, "Owner", "platform")
            .evaluate(entity)
            .unwrap());
        assert!(SelectionRule::list_property(fx.zone_type, "Zone", "dmz")
            .evaluate(entity)
            .unwrap());
    }

    #[test]
    fn property_condition_on_schema_is_invalid() {
        let fx = fixture();
        let schema_id = fx.model.schemas()[0].id();
        let schema = fx.model.identity(schema_id).unwrap();

        let err = SelectionRule::bool_property(fx.flag_type, "IsPublicFacing", true)
            .evaluate(schema)
            .unwrap_err();
        assert!(matches!(err, TmError::InvalidPredicate(_)));
        // Non-property conditions still work on schemas.
        assert!(SelectionRule::IdentityKindIs(IdentityKind::Schema)
            .evaluate(schema)
            .unwrap());
        assert!(!SelectionRule::EntityTypeIs(EntityType::Process)
            .evaluate(schema)
            .unwrap());
    }

    #[test]
    fn name_contains_ignores_case() {
        let fx = fixture();
        let entity = fx.model.identity(fx.entity).unwrap();
        assert!(SelectionRule::name_contains("login").evaluate(entity).unwrap());
        assert!(!SelectionRule::name_contains("logout").evaluate(entity).unwrap());
    }

    #[test]
    fn display_text() {
        let id = Uuid::nil();
        assert_eq!(
            SelectionRule::bool_property(id, "IsPublicFacing", true).to_string(),
            "IsPublicFacing == true"
        );
        assert_eq!(
            SelectionRule::name_contains("Login").to_string(),
            "Name contains \"Login\""
        );
        assert_eq!(
            SelectionRule::EntityTypeIs(EntityType::DataStore).to_string(),
            "EntityType == DataStore"
        );
    }

    #[test]
    fn serialized_shape() {
        let id = Uuid::nil();
        let json = serde_json::to_value(SelectionRule::bool_property(id, "Flag", true)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "boolProperty": {"propertyTypeId": id.to_string(), "name": "Flag", "value": true}
            })
        );
        let json = serde_json::to_value(SelectionRule::name_contains("db")).unwrap();
        assert_eq!(json, serde_json::json!({"nameContains": "db"}));
    }

    struct Named(&'static str);

    impl Predicate for Named {
        fn describe(&self) -> String {
            self.0.to_string()
        }

        fn evaluate(&self, identity: &dyn Identity) -> Result<bool> {
            Ok(identity.name() == self.0)
        }
    }

    #[test]
    fn custom_rules_compare_by_pointer_and_do_not_serialize() {
        let a = SelectionRule::custom(Named("x"));
        let b = SelectionRule::custom(Named("x"));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "x");
        assert!(serde_json::to_string(&a).is_err());
    }
}
