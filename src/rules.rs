// 🏷️ Procedure Classification - Rules as Data
// Turns one catheter/fistula event into a procedure category.
//
// Evaluation:
//   1. Eligibility gate: payer must be the public insurer (case-insensitive)
//      and the does-not-bill flag empty, otherwise `Outro`.
//   2. Ordered rule list, first match wins. Each rule is a conjunction of
//      lowercase substring predicates over (event, type, access).
//   3. Nothing matched → `Outro`.

use crate::entities::{contains_ignore_case, CatheterEvent};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// PROCEDURE CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProcedureCategory {
    Permcath,
    Fechamento,
    Retirada,
    Fistula,
    Protese,
    Intervencao,
    Outro,
}

impl ProcedureCategory {
    /// Label shown in the "Fístula" column and summary keys
    pub fn label(&self) -> &'static str {
        match self {
            ProcedureCategory::Permcath => "Permcath",
            ProcedureCategory::Fechamento => "Fechamento",
            ProcedureCategory::Retirada => "Retirada",
            ProcedureCategory::Fistula => "Fístula",
            ProcedureCategory::Protese => "Prótese",
            ProcedureCategory::Intervencao => "Intervenção",
            ProcedureCategory::Outro => "Outro",
        }
    }

    pub fn is_clinical(&self) -> bool {
        *self != ProcedureCategory::Outro
    }
}

impl fmt::Display for ProcedureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRule {
    /// Rule ID for tracking
    pub id: String,

    /// Substring required in the event description
    pub event_contains: String,

    /// Substring required in the catheter/fistula type, if any
    #[serde(default)]
    pub kind_contains: Option<String>,

    /// Substring required in the access description, if any
    #[serde(default)]
    pub access_contains: Option<String>,

    pub category: ProcedureCategory,
}

impl ClassificationRule {
    fn new(id: &str, event: &str, kind: Option<&str>, access: Option<&str>, category: ProcedureCategory) -> Self {
        ClassificationRule {
            id: id.to_string(),
            event_contains: event.to_string(),
            kind_contains: kind.map(str::to_string),
            access_contains: access.map(str::to_string),
            category,
        }
    }

    /// Every configured predicate must hold (case-insensitive substring)
    pub fn matches(&self, event: &CatheterEvent) -> bool {
        let holds = |text: &str, needle: &Option<String>| {
            needle.as_deref().map_or(true, |n| contains_ignore_case(text, n))
        };

        contains_ignore_case(&event.event, &self.event_contains)
            && holds(&event.kind, &self.kind_contains)
            && holds(&event.access, &self.access_contains)
    }
}

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub category: ProcedureCategory,
    /// Rule that fired; `None` when gated out or nothing matched
    pub rule_id: Option<String>,
}

impl Default for ClassificationResult {
    fn default() -> Self {
        ClassificationResult {
            category: ProcedureCategory::Outro,
            rule_id: None,
        }
    }
}

// ============================================================================
// RULE ENGINE
// ============================================================================

pub struct RuleEngine {
    rules: Vec<ClassificationRule>,
}

impl RuleEngine {
    /// Engine with an explicit rule order
    pub fn from_rules(rules: Vec<ClassificationRule>) -> Self {
        RuleEngine { rules }
    }

    /// The clinic's procedure rules, in evaluation order
    pub fn standard() -> Self {
        use ProcedureCategory::*;

        RuleEngine::from_rules(vec![
            ClassificationRule::new("permcath", "colocação", Some("longa perm. hd"), None, Permcath),
            ClassificationRule::new("fechamento", "fechamento", Some("autógena"), None, Fechamento),
            ClassificationRule::new(
                "retirada",
                "retirada",
                Some("longa perm. hd"),
                Some("cateter"),
                Retirada,
            ),
            ClassificationRule::new("fistula", "confecção", Some("autógena"), None, Fistula),
            ClassificationRule::new("protese", "confecção", Some("heteróloga"), None, Protese),
            ClassificationRule::new("intervencao", "intervenção", None, None, Intervencao),
        ])
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Category plus the id of the rule that produced it
    pub fn classify_with_rule(&self, event: &CatheterEvent) -> ClassificationResult {
        if !event.is_billable_public() {
            return ClassificationResult::default();
        }

        self.rules
            .iter()
            .find(|rule| rule.matches(event))
            .map(|rule| ClassificationResult {
                category: rule.category,
                rule_id: Some(rule.id.clone()),
            })
            .unwrap_or_default()
    }

    pub fn classify(&self, event: &CatheterEvent) -> ProcedureCategory {
        self.classify_with_rule(event).category
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::standard()
    }
}

/// Classify with the standard rule set
pub fn classify(event: &CatheterEvent) -> ProcedureCategory {
    RuleEngine::standard().classify(event)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event: &str, kind: &str, access: &str, payer: &str) -> CatheterEvent {
        CatheterEvent {
            date: None,
            access: access.to_string(),
            name: "Maria Silva".to_string(),
            event: event.to_string(),
            kind: kind.to_string(),
            location: String::new(),
            payer: payer.to_string(),
            does_not_bill: String::new(),
        }
    }

    #[test]
    fn test_permcath_requires_public_insurer() {
        let sus = event("colocação", "longa perm. hd", "", "SUS");
        assert_eq!(classify(&sus), ProcedureCategory::Permcath);

        let private = event("colocação", "longa perm. hd", "", "Particular");
        assert_eq!(classify(&private), ProcedureCategory::Outro);
    }

    #[test]
    fn test_does_not_bill_always_gates_out() {
        let mut e = event("Confecção", "Autógena - Radiocefálica", "Fístula", "sus");
        assert_eq!(classify(&e), ProcedureCategory::Fistula);

        e.does_not_bill = "Sim".to_string();
        assert_eq!(classify(&e), ProcedureCategory::Outro);
    }

    #[test]
    fn test_each_rule_fires() {
        let cases = [
            (event("Colocação", "Longa Perm. HD", "Cateter", "SUS"), ProcedureCategory::Permcath),
            (event("Fechamento", "Autógena", "Fístula", "SUS"), ProcedureCategory::Fechamento),
            (event("Retirada", "Longa Perm. HD", "Cateter", "SUS"), ProcedureCategory::Retirada),
            (event("Confecção", "Autógena", "Fístula", "SUS"), ProcedureCategory::Fistula),
            (event("Confecção", "Heteróloga", "Prótese", "SUS"), ProcedureCategory::Protese),
            (event("Intervenção", "", "Fístula", "SUS"), ProcedureCategory::Intervencao),
            (event("Colocação", "Duplo Lumen HD", "Cateter", "SUS"), ProcedureCategory::Outro),
        ];

        let engine = RuleEngine::standard();
        for (e, expected) in &cases {
            assert_eq!(engine.classify(e), *expected, "event {:?}", e.event);
        }
    }

    #[test]
    fn test_retirada_needs_catheter_access() {
        let e = event("Retirada", "Longa Perm. HD", "Fístula", "SUS");
        assert_eq!(classify(&e), ProcedureCategory::Outro);
    }

    #[test]
    fn test_first_match_wins() {
        // Matches both the closure rule and (by event text) the intervention rule
        let e = event("Fechamento / Intervenção", "Autógena", "", "SUS");
        let result = RuleEngine::standard().classify_with_rule(&e);
        assert_eq!(result.category, ProcedureCategory::Fechamento);
        assert_eq!(result.rule_id.as_deref(), Some("fechamento"));

        // Reversing the order changes the outcome
        let mut rules = RuleEngine::standard().rules().to_vec();
        rules.reverse();
        let reversed = RuleEngine::from_rules(rules);
        assert_eq!(reversed.classify(&e), ProcedureCategory::Intervencao);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let e = event("Confecção", "Heteróloga", "", "SUS");
        let engine = RuleEngine::standard();
        assert_eq!(engine.classify(&e), engine.classify(&e));
        assert_eq!(engine.rule_count(), 6);
    }

    #[test]
    fn test_rules_deserialize_from_json() {
        let json = r#"[{"id": "x", "event_contains": "intervenção", "category": "Intervencao"}]"#;
        let rules: Vec<ClassificationRule> = serde_json::from_str(json).unwrap();
        let engine = RuleEngine::from_rules(rules);
        assert_eq!(
            engine.classify(&event("Intervenção", "", "", "SUS")),
            ProcedureCategory::Intervencao
        );
    }

    #[test]
    fn test_labels_sort_like_report_column() {
        let mut labels = vec!["Retirada", "Fístula", "Fechamento", "Intervenção", "Permcath", "Prótese"];
        labels.sort();
        assert_eq!(labels[0], "Fechamento");
        assert_eq!(labels[1], "Fístula");
    }
}
