use serde::Serialize;

use super::model::{DecisionGraph, Outcome, Rule};

/// The rule an explanation was traced back to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Attribution<'g> {
    pub outcome: &'g Outcome,
    pub rule: &'g Rule,
}

/// Find the first rule, in graph order, that an explanation mentions.
///
/// An outcome qualifies when its label appears in the explanation
/// (case-insensitive); a rule under it matches when every one of its
/// condition labels appears as well. A base-probability rule matches as soon
/// as its outcome does. This is a substring heuristic: short labels that
/// occur incidentally in the text can produce a false match, and the first
/// hit wins even if a later rule fits better.
pub fn attribute<'g>(graph: &'g DecisionGraph, explanation: &str) -> Option<Attribution<'g>> {
    let haystack = explanation.to_lowercase();
    let mentions = |label: &str| haystack.contains(&label.to_lowercase());

    graph
        .outcomes
        .iter()
        .filter(|outcome| mentions(&outcome.label))
        .find_map(|outcome| {
            outcome
                .rules
                .iter()
                .find(|rule| rule.conditions.iter().all(|c| mentions(&c.label)))
                .map(|rule| Attribution { outcome, rule })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::parse;

    #[test]
    fn matches_rule_whose_conditions_all_appear() {
        let graph = parse("no_overweight ^ has_fever -> treat [0.72]\ncough -> treat [0.5]");
        let explanation = "TREAT because: has fever, no overweight";

        let hit = attribute(&graph, explanation).unwrap();
        assert_eq!(hit.outcome.label, "Treat");
        assert_eq!(hit.rule.id, "r0");
    }

    #[test]
    fn no_match_when_a_condition_is_missing() {
        let graph = parse("no_overweight ^ has_fever -> treat [0.72]");
        assert!(attribute(&graph, "treat: has fever").is_none());
    }

    #[test]
    fn no_match_without_outcome_label() {
        let graph = parse("fever -> treat [0.72]");
        assert!(attribute(&graph, "wait, fever detected").is_none());
    }

    #[test]
    fn first_satisfying_rule_wins() {
        let graph = parse("fever -> treat [0.9]\nfever ^ cough -> treat [0.6]");
        let hit = attribute(&graph, "treat (fever, cough)").unwrap();
        // Both rules fit; graph order decides.
        assert_eq!(hit.rule.id, "r0");
        assert_eq!(hit.rule.confidence, 0.9);
    }

    #[test]
    fn base_probability_rule_matches_on_outcome_alone() {
        let graph = parse("fever -> treat [0.9]\ntreat [0.3]");
        let hit = attribute(&graph, "Treat").unwrap();
        assert!(hit.rule.is_base_probability());
        assert_eq!(hit.rule.confidence, 0.3);
    }

    #[test]
    fn outcomes_checked_in_graph_order() {
        let graph = parse("x -> left [0.4]\nx -> right [0.9]");
        let hit = attribute(&graph, "left or right? x").unwrap();
        assert_eq!(hit.outcome.label, "Left");
    }

    #[test]
    fn falls_through_to_later_outcome() {
        let graph = parse("x ^ y -> left [0.4]\nz -> right [0.9]");
        let hit = attribute(&graph, "left right z").unwrap();
        assert_eq!(hit.outcome.label, "Right");
        assert_eq!(hit.rule.id, "r1");
    }

    #[test]
    fn empty_graph_or_text() {
        assert!(attribute(&parse(""), "anything").is_none());
        assert!(attribute(&parse("a -> go [0.5]"), "").is_none());
    }
}
