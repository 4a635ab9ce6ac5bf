// SPDX-License-Identifier: MIT OR Apache-2.0
//! Source buffers for the vertex and pixel stages.

use std::collections::HashSet;

/// Indentation unit of emitted code
const INDENT: &str = "    ";

/// Code buffer of one stage
///
/// Tracks which variables have already been computed so shared results are
/// emitted exactly once per generation pass.
#[derive(Debug, Clone, Default)]
pub struct StageBuffer {
    code: String,
    indent: usize,
    calculated: HashSet<String>,
}

impl StageBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer starting at the given indentation level
    pub fn with_indent(indent: usize) -> Self {
        Self {
            indent,
            ..Self::default()
        }
    }

    /// Append one indented line
    pub fn add_line(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.code.push_str(INDENT);
        }
        self.code.push_str(line);
        self.code.push('\n');
    }

    /// Append raw text without indentation
    pub fn add_block(&mut self, text: &str) {
        self.code.push_str(text);
        if !text.ends_with('\n') {
            self.code.push('\n');
        }
    }

    /// Append an empty line
    pub fn new_line(&mut self) {
        self.code.push('\n');
    }

    /// Open a `{` scope
    pub fn begin_scope(&mut self) {
        self.add_line("{");
        self.indent += 1;
    }

    /// Close a scope, with an optional suffix such as `;` or ` vd;`
    pub fn end_scope(&mut self, suffix: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.add_line(&format!("}}{suffix}"));
    }

    /// Check whether a variable was already computed
    pub fn is_calculated(&self, variable: &str) -> bool {
        self.calculated.contains(variable)
    }

    /// Mark a variable as computed
    pub fn set_calculated(&mut self, variable: impl Into<String>) {
        self.calculated.insert(variable.into());
    }

    /// Emitted code
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Take the emitted code
    pub fn into_code(self) -> String {
        self.code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_indent() {
        let mut buffer = StageBuffer::new();
        buffer.add_line("void main()");
        buffer.begin_scope();
        buffer.add_line("x = 1;");
        buffer.end_scope("");
        assert_eq!(buffer.code(), "void main()\n{\n    x = 1;\n}\n");
    }

    #[test]
    fn test_calculated_tracking() {
        let mut buffer = StageBuffer::new();
        assert!(!buffer.is_calculated("texcoord_0"));
        buffer.set_calculated("texcoord_0");
        assert!(buffer.is_calculated("texcoord_0"));
    }
}
