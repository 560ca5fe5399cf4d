use serde::Serialize;

/// Outcomes in order of first appearance in the source text.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DecisionGraph {
    pub outcomes: Vec<Outcome>,
}

/// All rules implying one normalized action label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub id: String,
    pub label: String,
    /// Confidence descending; ties keep source order.
    pub rules: Vec<Rule>,
}

/// A conjunction of conditions implying its outcome.
///
/// A rule without conditions is the outcome's base probability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub id: String,
    pub confidence: f64,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub id: String,
    pub label: String,
}

impl DecisionGraph {
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn rule_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.rules.len()).sum()
    }

    pub fn outcome(&self, label: &str) -> Option<&Outcome> {
        self.outcomes.iter().find(|o| o.label == label)
    }
}

impl Rule {
    pub fn is_base_probability(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn condition_labels(&self) -> Vec<&str> {
        self.conditions.iter().map(|c| c.label.as_str()).collect()
    }
}
