//! Contains the formatting logic for the [StContext] struct.

use super::StContext;
use crate::{
    constants::{
        BOTTOM_LEFT_BOX, COLORS, EMPTY_CIRCLE, FILLED_CIRCLE, HORIZONTAL_BOX, LEFT_FORK_BOX,
        VERTICAL_BOX,
    },
    errors::{StError, StResult},
    tree::StackGraph,
};
use nu_ansi_term::Color;
use std::fmt::{Display, Write};

impl<'a> StContext<'a> {
    /// Gathers an in-order list of [DisplayBranch]es, containing the log-line and branch name.
    ///
    /// This function is particularly useful when creating prompts with [inquire::Select].
    pub fn display_branches(&self) -> StResult<Vec<DisplayBranch>> {
        let graph = self.build_graph()?;
        let branches = graph.branches();

        let mut buf = String::new();
        self.write_tree(&graph, &mut buf)?;

        // Every branch renders to exactly one line.
        let log_lines = buf.lines().filter(|l| !l.is_empty()).collect::<Vec<_>>();
        if branches.len() != log_lines.len() {
            return Err(StError::RepositoryOperation(format!(
                "Mismatch between branches and log-lines: {} branches, {} log-lines",
                branches.len(),
                log_lines.len()
            )));
        }

        let display_branches = branches
            .into_iter()
            .zip(log_lines)
            .map(|(branch, log_line)| DisplayBranch {
                display_value: log_line.to_string(),
                branch_name: branch,
            })
            .collect();
        Ok(display_branches)
    }

    /// Prints the forest of tracked branches.
    pub fn print_tree(&self) -> StResult<()> {
        let graph = self.build_graph()?;
        let mut buf = String::new();
        self.write_tree(&graph, &mut buf)?;
        print!("{}", buf);
        Ok(())
    }

    /// Writes every trunk and the branches stacked on it to the given [Write]r.
    pub fn write_tree<W: Write>(&self, graph: &StackGraph, w: &mut W) -> StResult<()> {
        graph
            .trunks
            .iter()
            .try_for_each(|trunk| self.write_tree_recursive(graph, w, trunk, 0, "", "", true))
    }

    /// Writes the tree of branches to the given writer recursively.
    #[allow(clippy::too_many_arguments)]
    fn write_tree_recursive<W: Write>(
        &self,
        graph: &StackGraph,
        w: &mut W,
        branch: &str,
        depth: usize,
        prefix: &str,
        connection: &str,
        is_parent_last_child: bool,
    ) -> StResult<()> {
        let current = graph
            .get(branch)
            .ok_or_else(|| StError::BranchNotTracked(branch.to_string()))?;
        let drift = self.drift(graph, branch)?;

        // Form the log-line for the current branch.
        let checked_out_icon = if drift.current {
            FILLED_CIRCLE
        } else {
            EMPTY_CIRCLE
        };
        let rendered_branch = COLORS[depth % COLORS.len()]
            .paint(format!("{}{} {}", connection, checked_out_icon, branch));
        let branch_metadata = {
            let indicator = drift.indicator();
            let indicator = (!indicator.is_empty())
                .then(|| format!(" {}", Color::Red.bold().paint(indicator)))
                .unwrap_or_default();
            let pull_request = current
                .record
                .as_ref()
                .and_then(|r| r.review.as_ref())
                .map(|r| format!(" {}", Color::Cyan.italic().paint(format!("(#{})", r.number))))
                .unwrap_or_default();
            format!("{}{}", indicator, pull_request)
        };

        writeln!(w, "{}{}{}", prefix, rendered_branch, branch_metadata)
            .map_err(|e| StError::RepositoryOperation(e.to_string()))?;

        let mut children = current.children.iter().peekable();
        while let Some(child) = children.next() {
            // Form the connection between the previous log-line and the current log-line.
            let is_last_child = children.peek().is_none();
            let connection = format!(
                "{}{}",
                if is_last_child {
                    BOTTOM_LEFT_BOX
                } else {
                    LEFT_FORK_BOX
                },
                HORIZONTAL_BOX
            );

            let prefix = if depth > 0 && !is_parent_last_child {
                let color = COLORS[depth % COLORS.len()];
                format!("{}{} ", prefix, color.paint(VERTICAL_BOX.to_string()))
            } else if depth > 0 {
                format!("{}  ", prefix)
            } else {
                prefix.to_string()
            };

            self.write_tree_recursive(
                graph,
                w,
                child,
                depth + 1,
                prefix.as_str(),
                connection.as_str(),
                is_last_child,
            )?;
        }

        Ok(())
    }
}

/// A pair of a log-line and a branch name, which implements [Display].
#[derive(Debug)]
pub struct DisplayBranch {
    /// The log-line to display.
    pub(crate) display_value: String,
    /// The branch name corresponding to the log-line.
    pub(crate) branch_name: String,
}

impl Display for DisplayBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_value)
    }
}
