//! # Rule Trees
//!
//! A rule tree decides whether an identity qualifies for an automated action,
//! typically the generation of a threat event.
//!
//! ```text
//! Or
//! ├── Leaf(IsPublicFacing == true)
//! └── Leaf(Name contains "Login")
//! ```
//!
//! renders as `(IsPublicFacing == true OR Name contains "Login")`.
//!
//! ## Evaluation
//!
//! Combinators evaluate every child; there is no short-circuiting. An empty
//! `And` is `true`, an empty `Or` is `false`. Leaves are pure, so evaluating
//! a tree twice with no model change in between gives the same result.
//!
//! Trees are assumed finite. Nothing checks for cycles.
//!
//! ## Rendering
//!
//! | children | renders as                 |
//! |----------|----------------------------|
//! | 0        | empty string               |
//! | 1        | the child, bare            |
//! | 2+       | `(a OP b OP ...)`          |
//!
//! Rendered text is for display only and is not parsed back.

mod selection;

pub use selection::{CustomRule, Predicate, SelectionRule};

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TmError};
use crate::model::Identity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuleNode {
    And {
        #[serde(default)]
        children: Vec<RuleNode>,
    },
    Or {
        #[serde(default)]
        children: Vec<RuleNode>,
    },
    Leaf {
        rule: SelectionRule,
    },
}

impl RuleNode {
    pub fn and(children: Vec<RuleNode>) -> Self {
        RuleNode::And { children }
    }

    pub fn or(children: Vec<RuleNode>) -> Self {
        RuleNode::Or { children }
    }

    pub fn leaf(rule: SelectionRule) -> Self {
        RuleNode::Leaf { rule }
    }

    /// Child nodes; empty for leaves.
    pub fn children(&self) -> &[RuleNode] {
        match self {
            RuleNode::And { children } | RuleNode::Or { children } => children,
            RuleNode::Leaf { .. } => &[],
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, RuleNode::Leaf { .. })
    }

    pub fn add_child(&mut self, child: RuleNode) -> Result<()> {
        self.children_mut()?.push(child);
        Ok(())
    }

    /// Removes the first child equal to `child`. Returns whether one was found.
    pub fn remove_child(&mut self, child: &RuleNode) -> Result<bool> {
        let children = self.children_mut()?;
        match children.iter().position(|c| c == child) {
            Some(pos) => {
                children.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn children_mut(&mut self) -> Result<&mut Vec<RuleNode>> {
        match self {
            RuleNode::And { children } | RuleNode::Or { children } => Ok(children),
            RuleNode::Leaf { rule } => Err(TmError::UnsupportedOperation(format!(
                "cannot edit children of leaf '{}'",
                rule
            ))),
        }
    }

    /// Evaluates the tree against `identity`.
    pub fn evaluate(&self, identity: &dyn Identity) -> Result<bool> {
        let result = self.eval(identity)?;
        debug!(identity = %identity.id(), rule = %self, result, "rule evaluated");
        Ok(result)
    }

    fn eval(&self, identity: &dyn Identity) -> Result<bool> {
        match self {
            RuleNode::And { children } => {
                let mut result = true;
                for child in children {
                    result &= child.eval(identity)?;
                }
                Ok(result)
            }
            RuleNode::Or { children } => {
                let mut result = false;
                for child in children {
                    result |= child.eval(identity)?;
                }
                Ok(result)
            }
            RuleNode::Leaf { rule } => rule.evaluate(identity),
        }
    }

    /// Display text of the tree.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RuleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (children, op) = match self {
            RuleNode::Leaf { rule } => return fmt::Display::fmt(rule, f),
            RuleNode::And { children } => (children, " AND "),
            RuleNode::Or { children } => (children, " OR "),
        };
        match children.as_slice() {
            [] => Ok(()),
            [only] => fmt::Display::fmt(only, f),
            _ => {
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(op)?;
                    }
                    fmt::Display::fmt(child, f)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<SelectionRule> for RuleNode {
    fn from(rule: SelectionRule) -> Self {
        RuleNode::leaf(rule)
    }
}
