//! Decision graphs parsed from the tool's knowledge-base output.
//!
//! The knowledge base is flat text, one fact or rule per line. [`parse`]
//! groups it into Outcome → Rule → Condition, and [`attribute`] maps an
//! inference explanation back onto the rule that fired.

mod attribution;
mod model;
mod parser;

pub use attribution::{Attribution, attribute};
pub use model::{Condition, DecisionGraph, Outcome, Rule};
pub use parser::{format_label, parse};
