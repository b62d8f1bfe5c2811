use serde::{Deserialize, Serialize};

use crate::ast::Node;

/// Layout of the rendered outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Prefix repeated once per nesting level
    pub indent: String,
    /// Placed between consecutive units
    pub separator: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            separator: "\n".to_string(),
        }
    }
}

/// Renders a validated node forest as outline text, one unit per line.
///
/// A unit is the node name, then ` key=value` for each attribute, then
/// `: content` when the node has content. Rendering is total: any forest
/// that passed validation produces output.
#[derive(Debug, Clone, Default)]
pub struct Transformer {
    options: RenderOptions,
}

impl Transformer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn transform(&self, forest: &[Node]) -> String {
        let mut units = Vec::new();
        for node in forest {
            self.render_node(node, 0, &mut units);
        }
        units.join(&self.options.separator)
    }

    /// Render every repeated copy of a node's subtree.
    fn render_node(&self, node: &Node, depth: usize, units: &mut Vec<String>) {
        for instance in 0..node.repeat.max(1) as usize {
            self.render_instance(node, depth, instance, units);
        }
    }

    /// Render one copy. `instance` is the zero-based copy number; copies are
    /// currently identical.
    fn render_instance(&self, node: &Node, depth: usize, instance: usize, units: &mut Vec<String>) {
        log::trace!("rendering {} #{instance} at depth {depth}", node.name());

        let mut unit = self.options.indent.repeat(depth);
        unit.push_str(node.name());
        if let Some(attributes) = &node.attributes {
            for (key, value) in attributes.iter() {
                unit.push(' ');
                unit.push_str(key);
                unit.push('=');
                unit.push_str(value);
            }
        }
        if let Some(content) = &node.content {
            unit.push_str(": ");
            unit.push_str(content);
        }
        units.push(unit);

        for child in &node.children {
            self.render_node(child, depth + 1, units);
        }
    }
}
