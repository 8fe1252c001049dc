//! Whole-chart validation.
//!
//! Every structural rule is checked and all violations are reported together
//! through `Validation`, so a chart author sees every mistake in one pass.

use super::{StateIndex, StateNode};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// One broken structural rule.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChartViolation {
    #[error("State '{parent}' has more than one child named '{id}'")]
    DuplicateChild { parent: String, id: String },

    #[error("State '{state}' declares more than one transition for event '{event}'")]
    DuplicateTransition { state: String, event: String },

    #[error("State '{state}' has both an invoke and child states")]
    InvokeWithChildren { state: String },

    #[error("State '{state}' targets '{target}', which is not a child of it or of any ancestor")]
    UnresolvedTarget { state: String, target: String },

    #[error("State '{state}' names initial child '{initial}', which does not exist")]
    MissingInitial { state: String, initial: String },
}

/// Errors building a chart.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error(
        "Invalid state chart ({} violation(s)): {}",
        .0.len(),
        .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    Invalid(Vec<ChartViolation>),
}

impl ChartError {
    pub fn violations(&self) -> &[ChartViolation] {
        match self {
            Self::Invalid(violations) => violations,
        }
    }
}

pub(crate) type ChartValidation = Validation<(), NonEmptyVec<ChartViolation>>;

/// Succeed when `holds`, otherwise fail with the violation.
pub(crate) fn check(holds: bool, violation: impl FnOnce() -> ChartViolation) -> ChartValidation {
    if holds {
        Validation::success(())
    } else {
        Validation::fail(violation())
    }
}

/// Accumulate every check into a single result.
pub(crate) fn finish(checks: Vec<ChartValidation>) -> Result<(), ChartError> {
    match Validation::all_vec(checks) {
        Validation::Success(_) => Ok(()),
        Validation::Failure(errors) => Err(ChartError::Invalid(errors.iter().cloned().collect())),
    }
}

/// Rules that need the flattened tree: invoke/children exclusivity, initial
/// children and target scoping.
pub(crate) fn validate_structure<C, E>(nodes: &[StateNode<C, E>]) -> Vec<ChartValidation> {
    let mut checks = Vec::new();

    for node in nodes {
        let state = node.id.to_string();

        checks.push(check(
            node.invoke.is_none() || node.children.is_empty(),
            || ChartViolation::InvokeWithChildren {
                state: state.clone(),
            },
        ));

        if let Some(initial) = &node.initial {
            checks.push(check(node.children.contains_key(initial), || {
                ChartViolation::MissingInitial {
                    state: state.clone(),
                    initial: initial.to_string(),
                }
            }));
        }

        let mut targets: Vec<&str> = node.on.values().map(|t| t.target.as_str()).collect();
        if let Some(invoke) = &node.invoke {
            targets.push(invoke.on_done.target.as_str());
            targets.push(invoke.on_error.target.as_str());
        }

        for target in targets {
            checks.push(check(resolvable(nodes, node, target), || {
                ChartViolation::UnresolvedTarget {
                    state: state.clone(),
                    target: target.to_string(),
                }
            }));
        }
    }

    checks
}

/// A target resolves when the state itself or one of its ancestors has a
/// child with that id.
fn resolvable<C, E>(nodes: &[StateNode<C, E>], from: &StateNode<C, E>, target: &str) -> bool {
    let mut cursor = Some(from);
    while let Some(node) = cursor {
        if node.children.contains_key(target) {
            return true;
        }
        cursor = node.parent.map(|StateIndex(index)| &nodes[index]);
    }
    false
}
