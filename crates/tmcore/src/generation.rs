//! # Threat Generation
//!
//! Raises threat events on the entities and data flows matched by each threat
//! type's generation rule.
//!
//! A pass has two phases:
//!
//! 1. **Scan**: a read-only pass evaluating every rule against every entity
//!    and data flow. [`Generator::preview`] stops here.
//! 2. **Apply**: [`Generator::run`] raises one event per match, named after
//!    the threat type. With `skip_existing`, an identity that already has an
//!    event of that threat type is left alone.
//!
//! A rule that cannot be evaluated against some identity (an
//! [`TmError::InvalidPredicate`]) is recorded in the report and the pass goes
//! on. Any other error aborts the pass before anything is written.

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GenerationConfig;
use crate::error::{Result, TmError};
use crate::model::{Identity, IdentityKind, ThreatModel};

/// An identity selected by a threat type's rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMatch {
    pub threat_type_id: Uuid,
    pub threat_type_name: String,
    pub identity_id: Uuid,
    pub identity_name: String,
    pub identity_kind: IdentityKind,
    /// The identity already has an event of this threat type.
    pub existing: bool,
}

/// A rule that could not be evaluated against an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationFailure {
    pub threat_type_id: Uuid,
    pub identity_id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub matches: Vec<GenerationMatch>,
    /// Ids of the threat events created.
    pub created: Vec<Uuid>,
    pub skipped: usize,
    pub failures: Vec<GenerationFailure>,
}

#[derive(Default)]
struct Scan {
    matches: Vec<GenerationMatch>,
    failures: Vec<GenerationFailure>,
}

#[derive(Debug, Clone)]
pub struct Generator {
    skip_existing: bool,
}

impl Generator {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            skip_existing: config.skip_existing,
        }
    }

    /// Matches of every generation rule, without touching the model.
    pub fn preview(&self, model: &ThreatModel) -> Result<Vec<GenerationMatch>> {
        Ok(self.scan(model)?.matches)
    }

    /// Scans the model and raises threat events on the matches.
    pub fn run(&self, model: &mut ThreatModel) -> Result<GenerationReport> {
        let Scan { matches, failures } = self.scan(model)?;
        let mut report = GenerationReport {
            failures,
            ..GenerationReport::default()
        };

        for m in &matches {
            if self.skip_existing && m.existing {
                report.skipped += 1;
                continue;
            }
            let event = model.add_threat_event(m.identity_id, m.threat_type_id)?;
            debug!(event = %event, identity = %m.identity_id, threat_type = %m.threat_type_name, "threat event generated");
            report.created.push(event);
        }
        report.matches = matches;

        info!(
            matches = report.matches.len(),
            created = report.created.len(),
            skipped = report.skipped,
            failures = report.failures.len(),
            "threat generation finished"
        );
        Ok(report)
    }

    fn scan(&self, model: &ThreatModel) -> Result<Scan> {
        let targets: Vec<&dyn Identity> = model
            .entities()
            .iter()
            .map(|e| e as &dyn Identity)
            .chain(model.data_flows().iter().map(|f| f as &dyn Identity))
            .collect();

        let mut scan = Scan::default();
        for threat_type in model.threat_types() {
            let Some(rule) = threat_type.generation_rule() else {
                continue;
            };
            for target in &targets {
                match rule.evaluate(*target) {
                    Ok(true) => scan.matches.push(GenerationMatch {
                        threat_type_id: threat_type.id(),
                        threat_type_name: threat_type.name().to_string(),
                        identity_id: target.id(),
                        identity_name: target.name().to_string(),
                        identity_kind: target.kind(),
                        existing: model.has_threat_event(target.id(), threat_type.id()),
                    }),
                    Ok(false) => {}
                    Err(TmError::InvalidPredicate(message)) => {
                        warn!(threat_type = %threat_type.name(), identity = %target.id(), %message, "generation rule skipped");
                        scan.failures.push(GenerationFailure {
                            threat_type_id: threat_type.id(),
                            identity_id: target.id(),
                            message,
                        });
                    }
                    Err(other) => return Err(other),
                }
            }
        }
        Ok(scan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::ModelFixture;
    use crate::model::EntityType;
    use crate::rules::{Predicate, RuleNode, SelectionRule};

    fn generator(skip_existing: bool) -> Generator {
        Generator::new(&GenerationConfig { skip_existing })
    }

    fn with_rule(fx: &mut ModelFixture, name: &str, rule: RuleNode) -> Uuid {
        let threat_type = fx.model.add_threat_type(name).unwrap();
        threat_type.set_generation_rule(Some(rule));
        threat_type.id()
    }

    #[test]
    fn preview_does_not_modify_the_model() {
        let mut fx = ModelFixture::new();
        with_rule(
            &mut fx,
            "Spoofing",
            SelectionRule::EntityTypeIs(EntityType::Process).into(),
        );
        fx.model.dirty().reset();

        let matches = generator(true).preview(&fx.model).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].identity_id, fx.login);
        assert_eq!(matches[0].identity_kind, IdentityKind::Entity);
        assert_eq!(fx.model.threat_events().count(), 0);
        assert!(!fx.model.is_dirty());
    }

    #[test]
    fn run_creates_events_on_entities_and_flows() {
        let mut fx = ModelFixture::new();
        let tampering = with_rule(
            &mut fx,
            "Tampering",
            RuleNode::or(vec![
                SelectionRule::IdentityKindIs(IdentityKind::DataFlow).into(),
                SelectionRule::EntityTypeIs(EntityType::DataStore).into(),
            ]),
        );

        let report = generator(true).run(&mut fx.model).unwrap();
        assert_eq!(report.created.len(), 2);
        assert!(fx.model.has_threat_event(fx.request, tampering));
        assert!(fx.model.has_threat_event(fx.database, tampering));
        let event = fx.model.threat_event(report.created[0]).unwrap();
        assert_eq!(event.name(), "Tampering");
        assert!(fx.model.is_dirty());
    }

    #[test]
    fn threat_types_without_rules_are_ignored() {
        let mut fx = ModelFixture::new();
        fx.model.add_threat_type("Manual").unwrap();
        let report = generator(true).run(&mut fx.model).unwrap();
        assert!(report.matches.is_empty());
        assert!(report.created.is_empty());
    }

    #[test]
    fn skip_existing_prevents_duplicates() {
        let mut fx = ModelFixture::new();
        with_rule(&mut fx, "Spoofing", SelectionRule::name_contains("login").into());

        assert_eq!(generator(true).run(&mut fx.model).unwrap().created.len(), 1);
        let second = generator(true).run(&mut fx.model).unwrap();
        assert!(second.created.is_empty());
        assert_eq!(second.skipped, 1);
        assert!(second.matches[0].existing);

        let forced = generator(false).run(&mut fx.model).unwrap();
        assert_eq!(forced.created.len(), 1);
        assert_eq!(fx.model.threat_events().count(), 2);
    }

    #[test]
    fn login_form_scenario_matches_by_name() {
        let mut fx = ModelFixture::new();
        let rule = RuleNode::or(vec![
            SelectionRule::bool_property(fx.public_facing, "IsPublicFacing", true).into(),
            SelectionRule::name_contains("Login").into(),
        ]);
        with_rule(&mut fx, "Spoofing", rule);

        let matches = generator(true).preview(&fx.model).unwrap();
        let names: Vec<_> = matches.iter().map(|m| m.identity_name.as_str()).collect();
        assert_eq!(names, vec!["Login Form"]);
    }

    struct Broken;

    impl Predicate for Broken {
        fn describe(&self) -> String {
            "broken".into()
        }

        fn evaluate(&self, identity: &dyn Identity) -> crate::error::Result<bool> {
            if identity.kind() == IdentityKind::DataFlow {
                Err(TmError::InvalidPredicate("flows unsupported".into()))
            } else {
                Ok(true)
            }
        }
    }

    #[test]
    fn invalid_predicates_are_recorded_not_fatal() {
        let mut fx = ModelFixture::new();
        with_rule(&mut fx, "Custom", SelectionRule::custom(Broken).into());

        let report = generator(true).run(&mut fx.model).unwrap();
        assert_eq!(report.created.len(), 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].identity_id, fx.request);
        assert_eq!(report.failures[0].message, "flows unsupported");
    }
}
