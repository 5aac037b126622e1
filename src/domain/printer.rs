//! Text rendering of a forest with branch connectors.

use std::io::{self, Write};

use generational_arena::Index;
use itertools::Itertools;

use crate::domain::forest::{Forest, Node};

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Depth-first, pre-order printer.
///
/// Uses an explicit work stack, so arbitrarily deep nesting chains do not
/// grow the call stack.
#[derive(Debug, Clone)]
pub struct TreePrinter {
    annotations: bool,
}

impl Default for TreePrinter {
    fn default() -> Self {
        Self { annotations: true }
    }
}

impl TreePrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print identities only.
    pub fn without_annotations() -> Self {
        Self { annotations: false }
    }

    pub fn write<W: Write>(&self, forest: &Forest, out: &mut W) -> io::Result<()> {
        let roots = forest.root_handles();
        if roots.is_empty() {
            return writeln!(out, "Empty tree");
        }

        // (node, prefix of its line, is last among its siblings)
        let mut stack: Vec<(Index, String, bool)> = roots
            .iter()
            .enumerate()
            .rev()
            .map(|(i, &h)| (h, String::new(), i == roots.len() - 1))
            .collect();

        while let Some((handle, prefix, is_last)) = stack.pop() {
            let node = forest.node_at(handle);
            let connector = if is_last { LAST_BRANCH } else { BRANCH };
            writeln!(out, "{}{}{}", prefix, connector, self.label(node))?;

            let child_prefix = format!("{}{}", prefix, if is_last { SPACE } else { PIPE });
            let count = node.children.len();
            for (i, &child) in node.children.iter().enumerate().rev() {
                stack.push((child, child_prefix.clone(), i == count - 1));
            }
        }
        Ok(())
    }

    pub fn render(&self, forest: &Forest) -> String {
        let mut buf = Vec::new();
        // writing into a Vec cannot fail
        let _ = self.write(forest, &mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn label(&self, node: &Node) -> String {
        if !self.annotations {
            return node.identity().to_string();
        }
        format!("{} ({})", node.identity(), describe(node))
    }
}

/// Annotations as `key: value, ...`, or `n/a` when there are none.
pub fn describe(node: &Node) -> String {
    if node.annotations().is_empty() {
        return "n/a".to_string();
    }
    node.annotations()
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .join(", ")
}
