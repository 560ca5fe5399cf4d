//! Line-oriented parser for knowledge-base text.
//!
//! Two line shapes are recognised:
//!
//! ```text
//! no_overweight ^ has_fever -> treat [0.72]    rule line
//! treat [0.31]                                 base-probability line
//! ```
//!
//! Anything else is skipped so one bad line never hides the rest.

use std::collections::HashMap;

use tracing::debug;

use super::model::{Condition, DecisionGraph, Outcome, Rule};

const SEPARATOR: &str = "->";
const AND: char = '^';
const OPEN: char = '[';
const CLOSE: char = ']';

/// One recognised line before grouping.
#[derive(Debug, Clone, PartialEq)]
struct ParsedLine {
    outcome: String,
    confidence: f64,
    conditions: Vec<String>,
}

/// Build a [`DecisionGraph`] from raw tool output.
///
/// Pure and deterministic: the same text always yields the same labels,
/// confidences, ordering and identifiers.
pub fn parse(text: &str) -> DecisionGraph {
    let mut outcomes: Vec<Outcome> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut rule_no = 0usize;

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let Some(parsed) = parse_line(line) else {
            debug!(line = line_no + 1, "skipping unrecognised knowledge-base line");
            continue;
        };

        let rule_id = format!("r{rule_no}");
        rule_no += 1;
        let rule = Rule {
            conditions: parsed
                .conditions
                .into_iter()
                .enumerate()
                .map(|(k, label)| Condition {
                    id: format!("{rule_id}c{k}"),
                    label,
                })
                .collect(),
            id: rule_id,
            confidence: parsed.confidence,
        };

        let slot = *index.entry(parsed.outcome.clone()).or_insert_with(|| {
            outcomes.push(Outcome {
                id: format!("o{}", outcomes.len()),
                label: parsed.outcome,
                rules: Vec::new(),
            });
            outcomes.len() - 1
        });
        outcomes[slot].rules.push(rule);
    }

    for outcome in &mut outcomes {
        // `sort_by` is stable: equal confidences keep source order.
        outcome
            .rules
            .sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    }

    DecisionGraph { outcomes }
}

/// `no_overweight` → `No Overweight`.
pub fn format_label(raw: &str) -> String {
    raw.replace('_', " ")
        .trim()
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn parse_line(line: &str) -> Option<ParsedLine> {
    match line.split_once(SEPARATOR) {
        Some((conditions, action)) => {
            let (outcome, confidence) = parse_action(action, false)?;
            let conditions = conditions
                .split(AND)
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(format_label)
                .collect();
            Some(ParsedLine {
                outcome,
                confidence,
                conditions,
            })
        }
        None => {
            let (outcome, confidence) = parse_action(line, true)?;
            Some(ParsedLine {
                outcome,
                confidence,
                conditions: Vec::new(),
            })
        }
    }
}

/// `<label> [<confidence>]`. Without brackets the confidence is 0, which
/// only rule lines accept.
fn parse_action(clause: &str, require_confidence: bool) -> Option<(String, f64)> {
    let clause = clause.trim();
    let (label, confidence) = match clause.split_once(OPEN) {
        Some((label, rest)) => {
            let (value, trailing) = rest.split_once(CLOSE)?;
            if !trailing.trim().is_empty() {
                return None;
            }
            (label, parse_confidence(value)?)
        }
        None if require_confidence => return None,
        None => (clause, 0.0),
    };

    let label = label.trim();
    if label.is_empty() || label.contains([CLOSE, AND]) || label.contains(SEPARATOR) {
        return None;
    }
    Some((format_label(label), confidence))
}

fn parse_confidence(value: &str) -> Option<f64> {
    let confidence: f64 = value.trim().parse().ok()?;
    // `+ 0.0` folds `-0` into `0`, which `total_cmp` would otherwise rank lower.
    (confidence.is_finite() && (0.0..=1.0).contains(&confidence)).then_some(confidence + 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(rule: &Rule) -> Vec<&str> {
        rule.condition_labels()
    }

    #[test]
    fn formats_labels() {
        assert_eq!(format_label("no_overweight"), "No Overweight");
        assert_eq!(format_label("treat"), "Treat");
        assert_eq!(format_label("x_0"), "X 0");
        assert_eq!(format_label("already Fine"), "Already Fine");
        assert_eq!(format_label("hIGH_risk"), "HIGH Risk");
        assert_eq!(format_label("übel_sein"), "Übel Sein");
    }

    #[test]
    fn rule_line_with_conditions() {
        let graph = parse("no_overweight ^ has_fever -> treat [0.72]");

        assert_eq!(graph.outcomes.len(), 1);
        let outcome = &graph.outcomes[0];
        assert_eq!(outcome.label, "Treat");
        assert_eq!(outcome.rules.len(), 1);
        assert_eq!(outcome.rules[0].confidence, 0.72);
        assert_eq!(labels(&outcome.rules[0]), vec!["No Overweight", "Has Fever"]);
    }

    #[test]
    fn ties_keep_source_order() {
        let graph = parse("a ^ b -> go [0.9]\nc -> go [0.9]\nd -> go [0.5]\n");

        let go = graph.outcome("Go").unwrap();
        let conditions: Vec<Vec<&str>> = go.rules.iter().map(labels).collect();
        assert_eq!(conditions, vec![vec!["A", "B"], vec!["C"], vec!["D"]]);
    }

    #[test]
    fn negative_zero_ties_with_default_zero() {
        let graph = parse("a -> go [-0]\nb -> go\nc -> go [-0.0]");
        let go = graph.outcome("Go").unwrap();
        let ids: Vec<&str> = go.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r0", "r1", "r2"]);
        assert!(go.rules.iter().all(|r| r.confidence.is_sign_positive()));
    }

    #[test]
    fn rules_sorted_by_confidence_descending() {
        let graph = parse("a -> go [0.2]\nb -> go [0.8]\nc -> go [0.5]\nd -> go [0.8]");

        let go = graph.outcome("Go").unwrap();
        let confidences: Vec<f64> = go.rules.iter().map(|r| r.confidence).collect();
        assert_eq!(confidences, vec![0.8, 0.8, 0.5, 0.2]);
        assert_eq!(labels(&go.rules[0]), vec!["B"]);
        assert_eq!(labels(&go.rules[1]), vec!["D"]);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let graph = parse("garbage line\nok -> yes [0.4]");

        assert_eq!(graph.outcomes.len(), 1);
        assert_eq!(graph.outcomes[0].label, "Yes");
        assert_eq!(graph.outcomes[0].rules.len(), 1);
    }

    #[test]
    fn base_probability_line() {
        let graph = parse("treat [0.31]\nfever -> treat [0.9]");

        let treat = graph.outcome("Treat").unwrap();
        assert_eq!(treat.rules.len(), 2);
        assert_eq!(labels(&treat.rules[0]), vec!["Fever"]);
        assert!(treat.rules[1].is_base_probability());
        assert_eq!(treat.rules[1].confidence, 0.31);
    }

    #[test]
    fn missing_confidence_defaults_to_zero_on_rule_lines() {
        let graph = parse("x -> left");
        assert_eq!(graph.outcomes[0].label, "Left");
        assert_eq!(graph.outcomes[0].rules[0].confidence, 0.0);

        // A bare label is not a base-probability line.
        assert!(parse("left").is_empty());
    }

    #[test]
    fn outcomes_in_first_appearance_order() {
        let graph = parse("a -> right [0.1]\nb -> left [0.9]\nc -> right [0.5]\nup [0.2]");

        let order: Vec<&str> = graph.outcomes.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(order, vec!["Right", "Left", "Up"]);
        assert_eq!(graph.rule_count(), 4);
    }

    #[test]
    fn outcome_key_is_normalized_label() {
        let graph = parse("a -> go_left [0.5]\nb -> Go_Left [0.6]\nc -> go left [0.7]");
        assert_eq!(graph.outcomes.len(), 1);
        assert_eq!(graph.outcomes[0].label, "Go Left");
        assert_eq!(graph.outcomes[0].rules.len(), 3);
    }

    #[test]
    fn rejects_bad_action_clauses() {
        let text = [
            "a -> [0.5]",
            "a -> go [abc]",
            "a -> go [1.5]",
            "a -> go [-0.1]",
            "a -> go [NaN]",
            "a -> go [0.5",
            "a -> go [0.5] extra",
            "a -> b -> go [0.5]",
            "a ^ b [0.5]",
            "go 0.5]",
            "[0.4]",
        ]
        .join("\n");
        assert!(parse(&text).is_empty());
    }

    #[test]
    fn tolerates_whitespace_and_empty_fragments() {
        let graph = parse("\n\n   a_b  ^^  c   ->   go   [ 0.25 ]   \r\n\t\n-> go [0.1]");

        let go = graph.outcome("Go").unwrap();
        assert_eq!(go.rules.len(), 2);
        assert_eq!(labels(&go.rules[0]), vec!["A B", "C"]);
        assert_eq!(go.rules[0].confidence, 0.25);
        assert!(go.rules[1].is_base_probability());
    }

    #[test]
    fn identifiers_follow_parse_order() {
        let graph = parse("a -> go [0.1]\nb ^ c -> stop [0.3]\nd -> go [0.9]");

        let go = &graph.outcomes[0];
        let stop = &graph.outcomes[1];
        assert_eq!(go.id, "o0");
        assert_eq!(stop.id, "o1");
        // r2 sorts ahead of r0 but keeps the id of its source line.
        assert_eq!(go.rules[0].id, "r2");
        assert_eq!(go.rules[1].id, "r0");
        assert_eq!(stop.rules[0].id, "r1");
        let ids: Vec<&str> = stop.rules[0].conditions.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["r1c0", "r1c1"]);
    }

    #[test]
    fn parsing_is_deterministic() {
        let text = "x_0 ^ y_0 -> rechts [1.0]\nrechts [0.4]\nnoise\nhindernis -> links [0.6]\n";
        assert_eq!(parse(text), parse(text));
    }

    #[test]
    fn empty_text_yields_empty_graph() {
        assert!(parse("").is_empty());
        assert!(parse("   \n\t\n").is_empty());
        assert!(parse("Result file not found on server.").is_empty());
    }

    #[test]
    fn graph_serializes_for_rendering() {
        let graph = parse("fever -> treat [0.5]");
        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["outcomes"][0]["label"], "Treat");
        assert_eq!(json["outcomes"][0]["rules"][0]["conditions"][0]["id"], "r0c0");
    }
}
