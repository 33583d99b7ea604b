//! Assembles a validated [`BuildPlan`] and renders it as a Makefile.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::addressing::{root_target, SegmentAddresser, DEFAULT_FILES_DIR};
use crate::error::Result;
use crate::graph::{Recipe, Rule, RuleGraph};
use crate::leaf::build_leaf_rules;
use crate::merge_tree::{build_merge_levels, Level};
use crate::types::{RuleId, SplitParams};

/// Names and recipe details that do not affect the shape of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeStyle {
    /// Make variable holding the generator command.
    #[serde(default = "default_generator_var")]
    pub generator_var: String,

    /// Optional shared makefile, included with `-include`.
    #[serde(default = "default_include_file")]
    pub include_file: String,

    /// Directory holding the intermediate segment files.
    #[serde(default = "default_files_dir")]
    pub files_dir: String,

    /// Write each target to `$@.tmp` and rename it into place on success.
    #[serde(default)]
    pub atomic_writes: bool,
}

impl Default for RecipeStyle {
    fn default() -> Self {
        Self {
            generator_var: default_generator_var(),
            include_file: default_include_file(),
            files_dir: default_files_dir(),
            atomic_writes: false,
        }
    }
}

impl RecipeStyle {
    fn sink(&self, compressor: &str) -> String {
        if self.atomic_writes {
            format!("{} > $@.tmp && mv $@.tmp $@", compressor)
        } else {
            format!("{} > $@", compressor)
        }
    }

    /// Recipe lines for `rule`, without the leading tab.
    pub fn recipe_lines(&self, rule: &Rule) -> Vec<String> {
        match &rule.recipe {
            Recipe::Merge => vec![format!("gunzip -c $^ | sort | {}", self.sink("gzip"))],
            Recipe::Generate { order, range: None } => vec![format!(
                "$({}) {} | {}",
                self.generator_var,
                order,
                self.sink("gzip -c")
            )],
            Recipe::Generate {
                order,
                range: Some(range),
            } => vec![
                format!(
                    "$({}) -p -s0x{:x} -e0x{:x} {} \\",
                    self.generator_var, range.start, range.end, order
                ),
                format!("    | {}", self.sink("gzip")),
            ],
        }
    }
}

fn default_generator_var() -> String {
    "MLPOLYGEN".to_string()
}
fn default_include_file() -> String {
    "common.mk".to_string()
}
fn default_files_dir() -> String {
    DEFAULT_FILES_DIR.to_string()
}

/// The complete, validated rule graph for one order.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub params: SplitParams,
    pub root: String,
    pub levels: Vec<Level>,
    pub leaves: Vec<RuleId>,
    pub graph: RuleGraph,
}

impl BuildPlan {
    pub fn new(params: SplitParams) -> Result<Self> {
        Self::with_files_dir(params, DEFAULT_FILES_DIR)
    }

    pub fn with_files_dir(params: SplitParams, files_dir: &str) -> Result<Self> {
        let addresser = SegmentAddresser::new(params.order, params.segments_order, files_dir);
        let mut graph = RuleGraph::new();

        let (levels, leaf_ids) = build_merge_levels(&params, &addresser, &mut graph)?;
        let leaves = build_leaf_rules(params.order, &leaf_ids, &mut graph)?;

        let root = root_target(params.order);
        graph.validate(&root)?;

        info!(
            order = params.order,
            segments_order = params.segments_order,
            incr_per_level = params.incr_per_level,
            levels = levels.len(),
            leaves = leaves.len(),
            rules = graph.len(),
            "build plan ready"
        );

        Ok(Self {
            params,
            root,
            levels,
            leaves,
            graph,
        })
    }

    pub fn order(&self) -> u32 {
        self.params.order
    }

    pub fn clean_target(&self) -> String {
        format!("clean-mlpoly{}", self.params.order)
    }
}

/// A [`BuildPlan`] plus everything needed to print it.
#[derive(Debug, Clone)]
pub struct MakefileDocument<'a> {
    plan: &'a BuildPlan,
    style: &'a RecipeStyle,
    invocation: String,
}

impl<'a> MakefileDocument<'a> {
    /// `invocation` is echoed in the header so the file can be regenerated.
    pub fn new(plan: &'a BuildPlan, style: &'a RecipeStyle, invocation: impl Into<String>) -> Self {
        Self {
            plan,
            style,
            invocation: invocation.into(),
        }
    }

    pub fn write_to<W: io::Write>(&self, mut out: W) -> io::Result<()> {
        out.write_all(self.to_string().as_bytes())?;
        out.flush()
    }

    fn write_rule(&self, f: &mut fmt::Formatter<'_>, rule: &Rule) -> fmt::Result {
        if rule.inputs.is_empty() {
            writeln!(f, "{}:", rule.target)?;
        } else {
            write!(f, "{}:", rule.target)?;
            for input in &rule.inputs {
                write!(f, " {}", input)?;
            }
            writeln!(f)?;
        }
        for line in self.style.recipe_lines(rule) {
            writeln!(f, "\t{}", line)?;
        }
        Ok(())
    }

    fn write_rules(&self, f: &mut fmt::Formatter<'_>, ids: &[RuleId]) -> fmt::Result {
        for rule in ids.iter().filter_map(|&id| self.plan.graph.get(id)) {
            self.write_rule(f, rule)?;
        }
        Ok(())
    }
}

impl fmt::Display for MakefileDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan = self.plan;
        let order = plan.order();

        writeln!(f, "### this file generated by: {}", self.invocation)?;
        writeln!(f, "#")?;
        if plan.params.num_levels.is_some() {
            writeln!(
                f,
                "# {} levels, {} incrPerLevel\n",
                plan.levels.len(),
                plan.params.incr_per_level
            )?;
        }
        if self.style.atomic_writes {
            // A failing stage must fail the whole pipeline, or `mv` promotes a partial file.
            writeln!(f, "SHELL := /bin/bash")?;
            writeln!(f, ".SHELLFLAGS := -o pipefail -c")?;
            writeln!(f, ".DELETE_ON_ERROR:\n")?;
        }

        writeln!(f, "{}:", plan.root)?;
        writeln!(f, "-include {}", self.style.include_file)?;

        for level in &plan.levels {
            writeln!(
                f,
                "\n# {} sort rule(s) of {} files each",
                level.rules.len(),
                level.fan_in
            )?;
            self.write_rules(f, &level.rules)?;
        }

        writeln!(f, "\n# {} leaf rule(s)", plan.leaves.len())?;
        self.write_rules(f, &plan.leaves)?;

        let clean = plan.clean_target();
        writeln!(f, "{}:", clean)?;
        let leftovers = if self.style.atomic_writes { "*" } else { "" };
        writeln!(
            f,
            "\tfind {} -name mlpoly{}-*.txt.gz{} -print0 | xargs -0 rm",
            self.style.files_dir, order, leftovers
        )?;
        if self.style.atomic_writes {
            writeln!(f, "\trm -f {} {}.tmp", plan.root, plan.root)?;
        } else {
            writeln!(f, "\trm -f {}", plan.root)?;
        }
        writeln!(f, "clean-files:: {}", clean)
    }
}
