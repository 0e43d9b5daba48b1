//! Free-text search over identities.

use crate::model::Identity;

/// Whether `identity` matches `filter`, ignoring case.
///
/// Checks the name, then the description, then every property value rendered
/// as text, stopping at the first hit. The filter is used as given,
/// surrounding whitespace included. A blank filter matches nothing.
pub fn matches(identity: &dyn Identity, filter: &str) -> bool {
    if filter.trim().is_empty() {
        return false;
    }
    let needle = filter.to_lowercase();
    let hit = |text: &str| text.to_lowercase().contains(&needle);

    if hit(identity.name()) {
        return true;
    }
    if identity.description().is_some_and(hit) {
        return true;
    }
    identity
        .properties()
        .is_some_and(|props| props.iter().any(|p| hit(&p.as_text())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirty::DirtyFlag;
    use crate::model::{EntityType, ThreatModel};
    use crate::properties::PropertyTypeKind;

    fn model() -> (ThreatModel, uuid::Uuid) {
        let mut model = ThreatModel::with_dirty_flag("Shop", DirtyFlag::new()).unwrap();
        let owner = model
            .add_schema("Ownership")
            .unwrap()
            .add_property_type("Owner", PropertyTypeKind::SingleLineString)
            .unwrap()
            .id();
        let db = model.add_entity("Orders DB", EntityType::DataStore).unwrap();
        db.set_description(Some("Holds customer ORDERS".into()));
        let db = db.id();
        model
            .add_property(db, owner)
            .unwrap()
            .set_text("Payments Team")
            .unwrap();
        (model, db)
    }

    #[test]
    fn matches_name_description_and_property_values() {
        let (model, db) = model();
        let db = model.identity(db).unwrap();
        assert!(matches(db, "orders db"));
        assert!(matches(db, "customer"));
        assert!(matches(db, "payments"));
        assert!(!matches(db, "inventory"));
    }

    #[test]
    fn blank_filter_matches_nothing() {
        let (model, db) = model();
        let db = model.identity(db).unwrap();
        assert!(!matches(db, ""));
        assert!(!matches(db, "   "));
    }

    #[test]
    fn surrounding_whitespace_is_part_of_the_filter() {
        let mut model = ThreatModel::with_dirty_flag("M", DirtyFlag::new()).unwrap();
        let login = model.add_entity("Login", EntityType::Process).unwrap().id();
        let form = model.add_entity("Login Form", EntityType::Process).unwrap().id();

        assert!(!matches(model.identity(login).unwrap(), "Login "));
        assert!(matches(model.identity(form).unwrap(), "login "));
    }

    #[test]
    fn bool_values_render_as_text() {
        let mut model = ThreatModel::with_dirty_flag("M", DirtyFlag::new()).unwrap();
        let flag = model
            .add_schema("S")
            .unwrap()
            .add_property_type("Internet", PropertyTypeKind::Bool)
            .unwrap()
            .id();
        let id = model.add_entity("Web", EntityType::Process).unwrap().id();
        model.add_property(id, flag).unwrap().set_bool(true).unwrap();

        assert!(matches(model.identity(id).unwrap(), "TRUE"));
    }

    #[test]
    fn model_search_spans_all_identities() {
        let (mut model, _) = model();
        model.add_threat_type("Order tampering").unwrap();
        let found: Vec<_> = model.search("order").iter().map(|i| i.name().to_string()).collect();
        assert_eq!(found, vec!["Orders DB", "Order tampering"]);
    }
}
