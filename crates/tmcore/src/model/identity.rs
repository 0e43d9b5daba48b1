//! Identities: the named, uniquely identified elements of a model.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ThreatModel;
use crate::dirty::DirtyFlag;
use crate::error::{require_name, Result};
use crate::properties::PropertySet;
use crate::rules::RuleNode;

/// Anything addressable and named in the model.
pub trait Identity {
    fn id(&self) -> Uuid;

    fn name(&self) -> &str;

    fn description(&self) -> Option<&str>;

    fn kind(&self) -> IdentityKind;

    /// The identity's properties, or `None` if it cannot carry any.
    fn properties(&self) -> Option<&PropertySet> {
        None
    }

    /// Set for entities only.
    fn entity_type(&self) -> Option<EntityType> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentityKind {
    Schema,
    Entity,
    DataFlow,
    ThreatType,
    ThreatEvent,
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IdentityKind::Schema => "Schema",
            IdentityKind::Entity => "Entity",
            IdentityKind::DataFlow => "DataFlow",
            IdentityKind::ThreatType => "ThreatType",
            IdentityKind::ThreatEvent => "ThreatEvent",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    ExternalInteractor,
    Process,
    DataStore,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityType::ExternalInteractor => "ExternalInteractor",
            EntityType::Process => "Process",
            EntityType::DataStore => "DataStore",
        };
        f.write_str(label)
    }
}

// Shared identity plumbing for the property-carrying types below.
macro_rules! impl_identity {
    ($ty:ident, $kind:expr) => {
        impl_identity!($ty, $kind, |_it| None);
    };
    ($ty:ident, $kind:expr, |$it:ident| $entity_type:expr) => {
        impl Identity for $ty {
            fn id(&self) -> Uuid {
                self.id
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn description(&self) -> Option<&str> {
                self.description.as_deref()
            }

            fn kind(&self) -> IdentityKind {
                $kind
            }

            fn properties(&self) -> Option<&PropertySet> {
                Some(&self.properties)
            }

            fn entity_type(&self) -> Option<EntityType> {
                let $it = self;
                $entity_type
            }
        }

        impl $ty {
            pub fn set_name(&mut self, name: &str) -> Result<()> {
                require_name(stringify!($ty), name)?;
                self.dirty.assign(&mut self.name, name.to_string());
                Ok(())
            }

            pub fn set_description(&mut self, description: Option<String>) {
                self.dirty.assign(&mut self.description, description);
            }

            pub fn properties_mut(&mut self) -> &mut PropertySet {
                &mut self.properties
            }
        }
    };
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    id: Uuid,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    entity_type: EntityType,
    #[serde(default)]
    properties: PropertySet,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) threat_events: Vec<ThreatEvent>,
    #[serde(skip)]
    dirty: DirtyFlag,
}

impl_identity!(Entity, IdentityKind::Entity, |it| Some(it.entity_type));

impl Entity {
    pub(crate) fn new(name: &str, entity_type: EntityType, dirty: DirtyFlag) -> Result<Self> {
        require_name("Entity", name)?;
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            entity_type,
            properties: PropertySet::new(dirty.clone()),
            threat_events: Vec::new(),
            dirty,
        })
    }

    pub fn threat_events(&self) -> &[ThreatEvent] {
        &self.threat_events
    }

    pub(crate) fn bind(&mut self, dirty: &DirtyFlag, names: &TypeNames) {
        self.dirty = dirty.clone();
        self.properties.bind(dirty, |id| names.get(id));
        for event in &mut self.threat_events {
            event.bind(dirty, names);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFlow {
    id: Uuid,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    source_id: Uuid,
    target_id: Uuid,
    #[serde(default)]
    properties: PropertySet,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) threat_events: Vec<ThreatEvent>,
    #[serde(skip)]
    dirty: DirtyFlag,
}

impl_identity!(DataFlow, IdentityKind::DataFlow);

impl DataFlow {
    pub(crate) fn new(
        name: &str,
        source_id: Uuid,
        target_id: Uuid,
        dirty: DirtyFlag,
    ) -> Result<Self> {
        require_name("Data flow", name)?;
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            source_id,
            target_id,
            properties: PropertySet::new(dirty.clone()),
            threat_events: Vec::new(),
            dirty,
        })
    }

    pub fn source_id(&self) -> Uuid {
        self.source_id
    }

    pub fn target_id(&self) -> Uuid {
        self.target_id
    }

    pub fn source<'m>(&self, model: &'m ThreatModel) -> Option<&'m Entity> {
        model.entity(self.source_id)
    }

    pub fn target<'m>(&self, model: &'m ThreatModel) -> Option<&'m Entity> {
        model.entity(self.target_id)
    }

    pub fn threat_events(&self) -> &[ThreatEvent] {
        &self.threat_events
    }

    pub(crate) fn touches(&self, entity_id: Uuid) -> bool {
        self.source_id == entity_id || self.target_id == entity_id
    }

    pub(crate) fn bind(&mut self, dirty: &DirtyFlag, names: &TypeNames) {
        self.dirty = dirty.clone();
        self.properties.bind(dirty, |id| names.get(id));
        for event in &mut self.threat_events {
            event.bind(dirty, names);
        }
    }
}

/// A kind of threat. Carries the rule deciding where it is generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatType {
    id: Uuid,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    properties: PropertySet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    generation_rule: Option<RuleNode>,
    #[serde(skip)]
    dirty: DirtyFlag,
}

impl_identity!(ThreatType, IdentityKind::ThreatType);

impl ThreatType {
    pub(crate) fn new(name: &str, dirty: DirtyFlag) -> Result<Self> {
        require_name("Threat type", name)?;
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            properties: PropertySet::new(dirty.clone()),
            generation_rule: None,
            dirty,
        })
    }

    pub fn generation_rule(&self) -> Option<&RuleNode> {
        self.generation_rule.as_ref()
    }

    pub fn set_generation_rule(&mut self, rule: Option<RuleNode>) {
        self.dirty.assign(&mut self.generation_rule, rule);
    }

    pub(crate) fn bind(&mut self, dirty: &DirtyFlag, names: &TypeNames) {
        self.dirty = dirty.clone();
        self.properties.bind(dirty, |id| names.get(id));
    }
}

/// A threat raised on an entity or data flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatEvent {
    id: Uuid,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    threat_type_id: Uuid,
    parent_id: Uuid,
    #[serde(default)]
    properties: PropertySet,
    #[serde(skip)]
    dirty: DirtyFlag,
}

impl_identity!(ThreatEvent, IdentityKind::ThreatEvent);

impl ThreatEvent {
    pub(crate) fn new(threat_type: &ThreatType, parent_id: Uuid, dirty: DirtyFlag) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: threat_type.name.clone(),
            description: threat_type.description.clone(),
            threat_type_id: threat_type.id,
            parent_id,
            properties: PropertySet::new(dirty.clone()),
            dirty,
        }
    }

    pub fn threat_type_id(&self) -> Uuid {
        self.threat_type_id
    }

    pub fn parent_id(&self) -> Uuid {
        self.parent_id
    }

    pub fn threat_type<'m>(&self, model: &'m ThreatModel) -> Option<&'m ThreatType> {
        model.threat_type(self.threat_type_id)
    }

    /// The entity or data flow this event was raised on.
    pub fn parent<'m>(&self, model: &'m ThreatModel) -> Option<&'m dyn Identity> {
        model.identity(self.parent_id)
    }

    pub(crate) fn bind(&mut self, dirty: &DirtyFlag, names: &TypeNames) {
        self.dirty = dirty.clone();
        self.properties.bind(dirty, |id| names.get(id));
    }
}

/// Property type names by id, used when rebinding loaded properties.
pub(crate) struct TypeNames(std::collections::HashMap<Uuid, String>);

impl TypeNames {
    pub(crate) fn collect(model: &ThreatModel) -> Self {
        Self(
            model
                .schemas()
                .iter()
                .flat_map(|s| s.property_types())
                .map(|t| (t.id(), t.name().to_string()))
                .collect(),
        )
    }

    fn get(&self, id: Uuid) -> Option<&str> {
        self.0.get(&id).map(String::as_str)
    }
}
