//! # Threat Model
//!
//! The model root owns every identity and is the only place cross references
//! are resolved.
//!
//! ## Weak References
//!
//! Objects never hold references to each other. A data flow stores the ids of
//! its endpoints, a threat event stores the id of its threat type, a property
//! stores the id of its property type. They are resolved on demand through
//! the accessors here:
//!
//! ```text
//! flow.source(&model)              -> model.entity(flow.source_id())
//! event.threat_type(&model)        -> model.threat_type(event.threat_type_id())
//! property.property_type(&model)   -> model.property_type(property.property_type_id())
//! ```
//!
//! This is what lets fragments of a model be serialized independently: a
//! dangling id resolves to `None` instead of a stale pointer.
//!
//! Top-level identities and threat events are located through an index keyed
//! by id. Property types are found by scanning the (few) schemas, since they
//! are added through the schema rather than through the model.
//!
//! ## Structure
//!
//! All structural edits (adding or removing identities, raising threat events)
//! go through [`ThreatModel`] so the index stays in step. Field edits go
//! through the `_mut` accessors. Both mark the model's [`DirtyFlag`].

mod identity;
mod index;

pub use identity::{DataFlow, Entity, EntityType, Identity, IdentityKind, ThreatEvent, ThreatType};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::dirty::DirtyFlag;
use crate::error::{require_name, Result, TmError};
use crate::properties::{Property, PropertySchema, PropertySet, PropertyType};
use crate::search;
use identity::TypeNames;
use index::{ModelIndex, Slot};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatModel {
    id: Uuid,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    schemas: Vec<PropertySchema>,
    #[serde(default)]
    entities: Vec<Entity>,
    #[serde(default)]
    data_flows: Vec<DataFlow>,
    #[serde(default)]
    threat_types: Vec<ThreatType>,
    #[serde(skip)]
    index: ModelIndex,
    #[serde(skip)]
    dirty: DirtyFlag,
}

impl ThreatModel {
    /// Creates an empty model bound to the process-wide dirty flag.
    pub fn new(name: &str) -> Result<Self> {
        Self::with_dirty_flag(name, DirtyFlag::global())
    }

    pub fn with_dirty_flag(name: &str, dirty: DirtyFlag) -> Result<Self> {
        require_name("Model", name)?;
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            schemas: Vec::new(),
            entities: Vec::new(),
            data_flows: Vec::new(),
            threat_types: Vec::new(),
            index: ModelIndex::default(),
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

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        require_name("Model", name)?;
        self.dirty.assign(&mut self.name, name.to_string());
        Ok(())
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.dirty.assign(&mut self.description, description);
    }

    pub fn dirty(&self) -> &DirtyFlag {
        &self.dirty
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }

    // --- Schemas & property types ---

    pub fn add_schema(&mut self, name: &str) -> Result<&mut PropertySchema> {
        let schema = PropertySchema::new(name, self.dirty.clone())?;
        let id = self.insert_schema(schema);
        self.schema_mut(id).ok_or(TmError::NotFound(id))
    }

    pub(crate) fn insert_schema(&mut self, schema: PropertySchema) -> Uuid {
        let id = schema.id();
        self.schemas.push(schema);
        self.index.insert(id, Slot::Schema(self.schemas.len() - 1));
        self.dirty.mark();
        id
    }

    pub fn schema(&self, id: Uuid) -> Option<&PropertySchema> {
        match self.index.get(&id)? {
            Slot::Schema(i) => self.schemas.get(i),
            _ => None,
        }
    }

    pub fn schema_mut(&mut self, id: Uuid) -> Option<&mut PropertySchema> {
        match self.index.get(&id)? {
            Slot::Schema(i) => self.schemas.get_mut(i),
            _ => None,
        }
    }

    /// First schema with the given name.
    pub fn schema_by_name(&self, name: &str) -> Option<&PropertySchema> {
        self.schemas.iter().find(|s| s.name() == name)
    }

    pub fn schemas(&self) -> &[PropertySchema] {
        &self.schemas
    }

    pub fn remove_schema(&mut self, id: Uuid) -> bool {
        let before = self.schemas.len();
        self.schemas.retain(|s| s.id() != id);
        self.after_removal(before != self.schemas.len())
    }

    pub fn property_type(&self, id: Uuid) -> Option<&PropertyType> {
        self.schemas.iter().find_map(|s| s.property_type(id))
    }

    pub fn property_type_mut(&mut self, id: Uuid) -> Option<&mut PropertyType> {
        self.schemas.iter_mut().find_map(|s| s.property_type_mut(id))
    }

    /// Renames a property type and the name its properties report in errors.
    pub fn rename_property_type(&mut self, id: Uuid, name: &str) -> Result<()> {
        self.property_type_mut(id)
            .ok_or(TmError::NotFound(id))?
            .set_name(name)?;
        let dirty = self.dirty.clone();
        self.rebind(dirty);
        Ok(())
    }

    // --- Entities & data flows ---

    pub fn add_entity(&mut self, name: &str, entity_type: EntityType) -> Result<&mut Entity> {
        let entity = Entity::new(name, entity_type, self.dirty.clone())?;
        self.index
            .insert(entity.id(), Slot::Entity(self.entities.len()));
        self.entities.push(entity);
        self.dirty.mark();
        let last = self.entities.len() - 1;
        Ok(&mut self.entities[last])
    }

    pub fn entity(&self, id: Uuid) -> Option<&Entity> {
        match self.index.get(&id)? {
            Slot::Entity(i) => self.entities.get(i),
            _ => None,
        }
    }

    pub fn entity_mut(&mut self, id: Uuid) -> Option<&mut Entity> {
        match self.index.get(&id)? {
            Slot::Entity(i) => self.entities.get_mut(i),
            _ => None,
        }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Removes an entity together with the data flows connected to it.
    pub fn remove_entity(&mut self, id: Uuid) -> bool {
        let before = self.entities.len();
        self.entities.retain(|e| e.id() != id);
        let removed = before != self.entities.len();
        if removed {
            self.data_flows.retain(|f| !f.touches(id));
        }
        self.after_removal(removed)
    }

    /// Adds a data flow between two existing entities.
    pub fn add_data_flow(
        &mut self,
        name: &str,
        source_id: Uuid,
        target_id: Uuid,
    ) -> Result<&mut DataFlow> {
        for endpoint in [source_id, target_id] {
            if self.entity(endpoint).is_none() {
                return Err(TmError::NotFound(endpoint));
            }
        }
        let flow = DataFlow::new(name, source_id, target_id, self.dirty.clone())?;
        self.index
            .insert(flow.id(), Slot::DataFlow(self.data_flows.len()));
        self.data_flows.push(flow);
        self.dirty.mark();
        let last = self.data_flows.len() - 1;
        Ok(&mut self.data_flows[last])
    }

    pub fn data_flow(&self, id: Uuid) -> Option<&DataFlow> {
        match self.index.get(&id)? {
            Slot::DataFlow(i) => self.data_flows.get(i),
            _ => None,
        }
    }

    pub fn data_flow_mut(&mut self, id: Uuid) -> Option<&mut DataFlow> {
        match self.index.get(&id)? {
            Slot::DataFlow(i) => self.data_flows.get_mut(i),
            _ => None,
        }
    }

    pub fn data_flows(&self) -> &[DataFlow] {
        &self.data_flows
    }

    pub fn remove_data_flow(&mut self, id: Uuid) -> bool {
        let before = self.data_flows.len();
        self.data_flows.retain(|f| f.id() != id);
        self.after_removal(before != self.data_flows.len())
    }

    // --- Threats ---

    pub fn add_threat_type(&mut self, name: &str) -> Result<&mut ThreatType> {
        let threat_type = ThreatType::new(name, self.dirty.clone())?;
        self.index
            .insert(threat_type.id(), Slot::ThreatType(self.threat_types.len()));
        self.threat_types.push(threat_type);
        self.dirty.mark();
        let last = self.threat_types.len() - 1;
        Ok(&mut self.threat_types[last])
    }

    pub fn threat_type(&self, id: Uuid) -> Option<&ThreatType> {
        match self.index.get(&id)? {
            Slot::ThreatType(i) => self.threat_types.get(i),
            _ => None,
        }
    }

    pub fn threat_type_mut(&mut self, id: Uuid) -> Option<&mut ThreatType> {
        match self.index.get(&id)? {
            Slot::ThreatType(i) => self.threat_types.get_mut(i),
            _ => None,
        }
    }

    pub fn threat_types(&self) -> &[ThreatType] {
        &self.threat_types
    }

    /// Raises a threat event of the given type on an entity or data flow.
    pub fn add_threat_event(&mut self, parent_id: Uuid, threat_type_id: Uuid) -> Result<Uuid> {
        let threat_type = self
            .threat_type(threat_type_id)
            .ok_or(TmError::NotFound(threat_type_id))?;
        let event = ThreatEvent::new(threat_type, parent_id, self.dirty.clone());
        let id = event.id();

        let slot = match self.index.get(&parent_id) {
            Some(Slot::Entity(i)) => {
                let events = &mut self.entities[i].threat_events;
                events.push(event);
                Slot::EntityThreat(i, events.len() - 1)
            }
            Some(Slot::DataFlow(i)) => {
                let events = &mut self.data_flows[i].threat_events;
                events.push(event);
                Slot::FlowThreat(i, events.len() - 1)
            }
            Some(_) => {
                return Err(TmError::Validation(
                    "threat events can only be raised on entities and data flows".into(),
                ))
            }
            None => return Err(TmError::NotFound(parent_id)),
        };

        self.index.insert(id, slot);
        self.dirty.mark();
        debug!(event = %id, parent = %parent_id, threat_type = %threat_type_id, "threat event added");
        Ok(id)
    }

    pub fn threat_event(&self, id: Uuid) -> Option<&ThreatEvent> {
        match self.index.get(&id)? {
            Slot::EntityThreat(i, j) => self.entities.get(i)?.threat_events.get(j),
            Slot::FlowThreat(i, j) => self.data_flows.get(i)?.threat_events.get(j),
            _ => None,
        }
    }

    pub fn threat_event_mut(&mut self, id: Uuid) -> Option<&mut ThreatEvent> {
        match self.index.get(&id)? {
            Slot::EntityThreat(i, j) => self.entities.get_mut(i)?.threat_events.get_mut(j),
            Slot::FlowThreat(i, j) => self.data_flows.get_mut(i)?.threat_events.get_mut(j),
            _ => None,
        }
    }

    pub fn remove_threat_event(&mut self, id: Uuid) -> bool {
        let removed = match self.index.get(&id) {
            Some(Slot::EntityThreat(i, j)) => {
                self.entities[i].threat_events.remove(j);
                true
            }
            Some(Slot::FlowThreat(i, j)) => {
                self.data_flows[i].threat_events.remove(j);
                true
            }
            _ => false,
        };
        self.after_removal(removed)
    }

    /// Threat events raised on entities and data flows.
    pub fn threat_events(&self) -> impl Iterator<Item = &ThreatEvent> {
        self.entities
            .iter()
            .flat_map(|e| e.threat_events.iter())
            .chain(self.data_flows.iter().flat_map(|f| f.threat_events.iter()))
    }

    /// Whether `parent_id` already has an event of the given threat type.
    pub fn has_threat_event(&self, parent_id: Uuid, threat_type_id: Uuid) -> bool {
        let events = match self.index.get(&parent_id) {
            Some(Slot::Entity(i)) => &self.entities[i].threat_events,
            Some(Slot::DataFlow(i)) => &self.data_flows[i].threat_events,
            _ => return false,
        };
        events.iter().any(|e| e.threat_type_id() == threat_type_id)
    }

    // --- Generic identity access ---

    pub fn identity(&self, id: Uuid) -> Option<&dyn Identity> {
        match self.index.get(&id)? {
            Slot::Schema(i) => self.schemas.get(i).map(|s| s as &dyn Identity),
            Slot::Entity(i) => self.entities.get(i).map(|e| e as &dyn Identity),
            Slot::DataFlow(i) => self.data_flows.get(i).map(|f| f as &dyn Identity),
            Slot::ThreatType(i) => self.threat_types.get(i).map(|t| t as &dyn Identity),
            Slot::EntityThreat(..) | Slot::FlowThreat(..) => {
                self.threat_event(id).map(|e| e as &dyn Identity)
            }
        }
    }

    /// Every identity in the model: schemas, entities, data flows, threat
    /// types, then threat events.
    pub fn identities(&self) -> Vec<&dyn Identity> {
        let mut all: Vec<&dyn Identity> = Vec::with_capacity(self.index.len());
        all.extend(self.schemas.iter().map(|s| s as &dyn Identity));
        all.extend(self.entities.iter().map(|e| e as &dyn Identity));
        all.extend(self.data_flows.iter().map(|f| f as &dyn Identity));
        all.extend(self.threat_types.iter().map(|t| t as &dyn Identity));
        all.extend(self.threat_events().map(|e| e as &dyn Identity));
        all
    }

    /// The properties of an identity, or `None` if it is unknown or cannot
    /// carry properties.
    pub fn properties_mut(&mut self, identity_id: Uuid) -> Option<&mut PropertySet> {
        match self.index.get(&identity_id)? {
            Slot::Schema(_) => None,
            Slot::Entity(i) => Some(self.entities.get_mut(i)?.properties_mut()),
            Slot::DataFlow(i) => Some(self.data_flows.get_mut(i)?.properties_mut()),
            Slot::ThreatType(i) => Some(self.threat_types.get_mut(i)?.properties_mut()),
            Slot::EntityThreat(..) | Slot::FlowThreat(..) => {
                Some(self.threat_event_mut(identity_id)?.properties_mut())
            }
        }
    }

    /// Attaches a property of the given type to an identity, or returns the
    /// existing one.
    pub fn add_property(
        &mut self,
        identity_id: Uuid,
        property_type_id: Uuid,
    ) -> Result<&mut Property> {
        let property_type = self
            .property_type(property_type_id)
            .cloned()
            .ok_or(TmError::NotFound(property_type_id))?;
        if self.index.get(&identity_id).is_none() {
            return Err(TmError::NotFound(identity_id));
        }
        let set = self.properties_mut(identity_id).ok_or_else(|| {
            TmError::Validation(format!("identity {} cannot carry properties", identity_id))
        })?;
        Ok(set.add(&property_type))
    }

    /// Identities whose name, description or property values contain `filter`.
    pub fn search(&self, filter: &str) -> Vec<&dyn Identity> {
        self.identities()
            .into_iter()
            .filter(|identity| search::matches(*identity, filter))
            .collect()
    }

    /// Checks every property value against the variant of its type.
    ///
    /// Properties whose type does not resolve are not checked.
    pub fn validate(&self) -> Result<()> {
        for identity in self.identities() {
            let Some(properties) = identity.properties() else {
                continue;
            };
            for property in properties.iter() {
                let Some(property_type) = self.property_type(property.property_type_id()) else {
                    continue;
                };
                let expected = property_type.default_value();
                if !property.value().same_variant(&expected) {
                    return Err(TmError::Validation(format!(
                        "property '{}' of '{}' holds a {} value, its type expects a {} value",
                        property_type.name(),
                        identity.name(),
                        property.value().variant_name(),
                        expected.variant_name()
                    )));
                }
            }
        }
        Ok(())
    }

    // --- Lifecycle ---

    /// Binds every object to `dirty` and rebuilds the index.
    ///
    /// Called after deserialization, where runtime state is not restored.
    pub fn rebind(&mut self, dirty: DirtyFlag) {
        let names = TypeNames::collect(self);
        for schema in &mut self.schemas {
            schema.bind(&dirty);
        }
        for entity in &mut self.entities {
            entity.bind(&dirty, &names);
        }
        for flow in &mut self.data_flows {
            flow.bind(&dirty, &names);
        }
        for threat_type in &mut self.threat_types {
            threat_type.bind(&dirty, &names);
        }
        self.dirty = dirty;
        self.reindex();
    }

    /// Drops every cached list snapshot.
    pub fn drop_list_snapshots(&mut self) {
        for schema in &mut self.schemas {
            schema.drop_snapshots();
        }
    }

    fn after_removal(&mut self, removed: bool) -> bool {
        if removed {
            self.reindex();
            self.dirty.mark();
        }
        removed
    }

    fn reindex(&mut self) {
        let mut index = ModelIndex::default();
        for (i, schema) in self.schemas.iter().enumerate() {
            index.insert(schema.id(), Slot::Schema(i));
        }
        for (i, entity) in self.entities.iter().enumerate() {
            index.insert(entity.id(), Slot::Entity(i));
            for (j, event) in entity.threat_events.iter().enumerate() {
                index.insert(event.id(), Slot::EntityThreat(i, j));
            }
        }
        for (i, flow) in self.data_flows.iter().enumerate() {
            index.insert(flow.id(), Slot::DataFlow(i));
            for (j, event) in flow.threat_events.iter().enumerate() {
                index.insert(event.id(), Slot::FlowThreat(i, j));
            }
        }
        for (i, threat_type) in self.threat_types.iter().enumerate() {
            index.insert(threat_type.id(), Slot::ThreatType(i));
        }
        self.index = index;
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use crate::properties::PropertyTypeKind;

    /// A small web-application model on its own dirty flag.
    pub struct ModelFixture {
        pub model: ThreatModel,
        pub schema_id: Uuid,
        pub public_facing: Uuid,
        pub owner: Uuid,
        pub browser: Uuid,
        pub login: Uuid,
        pub database: Uuid,
        pub request: Uuid,
    }

    impl Default for ModelFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ModelFixture {
        pub fn new() -> Self {
            let mut model = ThreatModel::with_dirty_flag("Web App", DirtyFlag::new()).unwrap();

            let schema = model.add_schema("Exposure").unwrap();
            let schema_id = schema.id();
            let public_facing = schema
                .add_property_type("IsPublicFacing", PropertyTypeKind::Bool)
                .unwrap()
                .id();
            let owner = schema
                .add_property_type("Owner", PropertyTypeKind::SingleLineString)
                .unwrap()
                .id();

            let browser = model
                .add_entity("Browser", EntityType::ExternalInteractor)
                .unwrap()
                .id();
            let login = model
                .add_entity("Login Form", EntityType::Process)
                .unwrap()
                .id();
            let database = model
                .add_entity("User Database", EntityType::DataStore)
                .unwrap()
                .id();
            let request = model
                .add_data_flow("Credentials", browser, login)
                .unwrap()
                .id();

            model.add_property(login, public_facing).unwrap();
            model.dirty().reset();

            Self {
                model,
                schema_id,
                public_facing,
                owner,
                browser,
                login,
                database,
                request,
            }
        }
    }
}
