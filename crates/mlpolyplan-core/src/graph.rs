//! In-memory rule graph built before any Makefile text is produced.
//!
//! Rules are stored in an arena in insertion order (which is also emission
//! order) and indexed by target so structural checks run on the graph itself.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::error::{PlanError, Result};
use crate::types::{LeafRange, RuleId, SegmentId};

/// What a rule runs to produce its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recipe {
    /// Decompress the pre-sorted inputs, sort once, recompress.
    Merge,
    /// Run the external generator, over `range` when the keyspace is split.
    Generate {
        order: u32,
        range: Option<LeafRange>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub target: SegmentId,
    pub inputs: Vec<SegmentId>,
    pub recipe: Recipe,
}

impl Rule {
    pub fn merge(target: SegmentId, inputs: Vec<SegmentId>) -> Self {
        Self {
            target,
            inputs,
            recipe: Recipe::Merge,
        }
    }

    pub fn generate(target: SegmentId, order: u32, range: Option<LeafRange>) -> Self {
        Self {
            target,
            inputs: Vec::new(),
            recipe: Recipe::Generate { order, range },
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.recipe, Recipe::Generate { .. })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RuleGraph {
    rules: Vec<Rule>,
    #[serde(skip)]
    by_target: HashMap<String, RuleId>,
}

impl RuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule; targets must be unique.
    pub fn add(&mut self, rule: Rule) -> Result<RuleId> {
        let id = self.rules.len();
        if self.by_target.contains_key(&rule.target.path) {
            return Err(PlanError::DuplicateTarget(rule.target.path));
        }
        self.by_target.insert(rule.target.path.clone(), id);
        self.rules.push(rule);
        Ok(id)
    }

    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id)
    }

    pub fn find(&self, target: &str) -> Option<&Rule> {
        self.by_target.get(target).map(|&id| &self.rules[id])
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Checks that every input is produced by some rule, that every rule feeds
    /// `root`, and that there are no cycles.
    pub fn validate(&self, root: &str) -> Result<()> {
        let mut edges: Vec<Vec<RuleId>> = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            let mut deps = Vec::with_capacity(rule.inputs.len());
            for input in &rule.inputs {
                let id = self
                    .by_target
                    .get(&input.path)
                    .copied()
                    .ok_or_else(|| PlanError::MissingInput {
                        target: rule.target.path.clone(),
                        input: input.path.clone(),
                    })?;
                deps.push(id);
            }
            edges.push(deps);
        }

        let root_id = *self
            .by_target
            .get(root)
            .ok_or_else(|| PlanError::Unreachable(root.to_string()))?;

        let mut state = vec![Visit::New; self.rules.len()];
        // Iterative DFS; (rule, next edge to explore).
        let mut stack = vec![(root_id, 0usize)];
        state[root_id] = Visit::Active;
        while let Some((id, next)) = stack.last_mut() {
            let id = *id;
            if let Some(&dep) = edges[id].get(*next) {
                *next += 1;
                match state[dep] {
                    Visit::New => {
                        state[dep] = Visit::Active;
                        stack.push((dep, 0));
                    }
                    Visit::Active => {
                        return Err(PlanError::Cycle(self.rules[dep].target.path.clone()));
                    }
                    Visit::Done => {}
                }
            } else {
                state[id] = Visit::Done;
                stack.pop();
            }
        }

        if let Some(orphan) = state.iter().position(|s| *s != Visit::Done) {
            return Err(PlanError::Unreachable(
                self.rules[orphan].target.path.clone(),
            ));
        }

        debug!(rules = self.rules.len(), "rule graph validated");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}
