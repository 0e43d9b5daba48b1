//! Output formatting. Functions here build strings; printing happens in
//! `commands.rs`.

use serde_json::{json, Value};
use tmcore::generation::GenerationReport;
use tmcore::model::{Identity, ThreatModel};

pub fn rules_text(model: &ThreatModel) -> String {
    if model.threat_types().is_empty() {
        return "No threat types.\n".to_string();
    }
    let mut out = String::new();
    for threat_type in model.threat_types() {
        let rule = match threat_type.generation_rule() {
            Some(rule) => rule.render(),
            None => "(no rule)".to_string(),
        };
        out.push_str(&format!("{}: {}\n", threat_type.name(), rule));
    }
    out
}

pub fn rules_json(model: &ThreatModel) -> Value {
    let entries: Vec<Value> = model
        .threat_types()
        .iter()
        .map(|t| {
            json!({
                "id": t.id(),
                "threatType": t.name(),
                "rendered": t.generation_rule().map(|r| r.render()),
                "rule": t.generation_rule().and_then(|r| serde_json::to_value(r).ok()),
            })
        })
        .collect();
    Value::Array(entries)
}

pub fn search_text(hits: &[&dyn Identity]) -> String {
    if hits.is_empty() {
        return "No matches.\n".to_string();
    }
    hits.iter()
        .map(|i| format!("{} {} {}\n", i.kind(), i.name(), i.id()))
        .collect()
}

pub fn search_json(hits: &[&dyn Identity]) -> Value {
    hits.iter()
        .map(|i| json!({ "id": i.id(), "kind": i.kind(), "name": i.name() }))
        .collect()
}

pub fn report_text(report: &GenerationReport, written: bool) -> String {
    let mut out = String::new();
    for m in &report.matches {
        let marker = if m.existing { "=" } else { "+" };
        out.push_str(&format!(
            "{} {} -> {} {}\n",
            marker, m.threat_type_name, m.identity_kind, m.identity_name
        ));
    }
    out.push_str(&format!(
        "{} created, {} skipped, {} failed",
        report.created.len(),
        report.skipped,
        report.failures.len()
    ));
    if !written && !report.created.is_empty() {
        out.push_str(" (not saved, use --write)");
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmcore::dirty::DirtyFlag;
    use tmcore::generation::GenerationMatch;
    use tmcore::model::{EntityType, IdentityKind};
    use tmcore::rules::{RuleNode, SelectionRule};
    use uuid::Uuid;

    fn model() -> ThreatModel {
        let mut model = ThreatModel::with_dirty_flag("M", DirtyFlag::new()).unwrap();
        model
            .add_threat_type("Spoofing")
            .unwrap()
            .set_generation_rule(Some(RuleNode::or(vec![
                SelectionRule::name_contains("Login").into(),
                SelectionRule::EntityTypeIs(EntityType::Process).into(),
            ])));
        model.add_threat_type("Manual").unwrap();
        model
    }

    #[test]
    fn rules_text_lists_every_threat_type() {
        assert_eq!(
            rules_text(&model()),
            "Spoofing: (Name contains \"Login\" OR EntityType == Process)\nManual: (no rule)\n"
        );
    }

    #[test]
    fn rules_json_carries_tree_and_rendering() {
        let value = rules_json(&model());
        assert_eq!(value[0]["threatType"], "Spoofing");
        assert_eq!(value[0]["rule"]["type"], "or");
        assert!(value[1]["rule"].is_null());
    }

    #[test]
    fn empty_search() {
        assert_eq!(search_text(&[]), "No matches.\n");
    }

    #[test]
    fn report_summary() {
        let report = GenerationReport {
            matches: vec![GenerationMatch {
                threat_type_id: Uuid::nil(),
                threat_type_name: "Spoofing".into(),
                identity_id: Uuid::nil(),
                identity_name: "Login Form".into(),
                identity_kind: IdentityKind::Entity,
                existing: false,
            }],
            created: vec![Uuid::nil()],
            skipped: 0,
            failures: vec![],
        };
        assert_eq!(
            report_text(&report, false),
            "+ Spoofing -> Entity Login Form\n1 created, 0 skipped, 0 failed (not saved, use --write)\n"
        );
    }
}
