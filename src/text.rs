use crate::layout::{LayoutNode, TextAttributes, TextBlock, TextRun};

/// Buffers inline runs until a block-level sibling forces them out as a text node.
///
/// The buffer never holds empty runs, and adjacent runs with equal attributes are
/// merged, so a flushed block has the fewest runs that describe its styling.
#[derive(Debug, Default)]
pub struct TextAccumulator {
    runs: Vec<TextRun>,
}

impl TextAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn append(&mut self, text: &str, attributes: Option<&TextAttributes>) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.runs.last_mut() {
            if last.attributes.as_ref() == attributes {
                last.text.push_str(text);
                return;
            }
        }
        self.runs.push(TextRun {
            text: text.to_string(),
            attributes: attributes.cloned(),
        });
    }

    pub fn append_line_break(&mut self) {
        self.append("\n", None);
    }

    /// Remove exactly one trailing newline, if present.
    pub fn trim_trailing_newline(&mut self) -> bool {
        let Some(last) = self.runs.last_mut() else {
            return false;
        };
        if !last.text.ends_with('\n') {
            return false;
        }
        last.text.pop();
        if last.text.is_empty() {
            self.runs.pop();
        }
        true
    }

    /// Take the buffered runs as a text node, leaving the buffer empty.
    pub fn flush(&mut self) -> Option<LayoutNode> {
        if self.runs.is_empty() {
            return None;
        }
        let runs = std::mem::take(&mut self.runs);
        Some(LayoutNode::Text(TextBlock { runs }))
    }

    /// Flush into `nodes` when there is anything buffered.
    pub fn flush_into(&mut self, nodes: &mut Vec<LayoutNode>) {
        if let Some(node) = self.flush() {
            nodes.push(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Font, FontWeight, TextStyle};

    fn bold() -> TextAttributes {
        TextAttributes::from_style(&TextStyle {
            font: Font {
                weight: FontWeight::Bold,
                ..Font::default()
            },
            ..TextStyle::default()
        })
    }

    fn plain() -> TextAttributes {
        TextAttributes::from_style(&TextStyle::default())
    }

    #[test]
    fn flush_empty_is_idempotent() {
        let mut acc = TextAccumulator::new();
        assert!(acc.flush().is_none());
        assert!(acc.flush().is_none());

        let mut nodes = Vec::new();
        acc.flush_into(&mut nodes);
        acc.flush_into(&mut nodes);
        assert!(nodes.is_empty());
    }

    #[test]
    fn flush_clears_buffer() {
        let mut acc = TextAccumulator::new();
        acc.append("Hello", Some(&plain()));
        let node = acc.flush().unwrap();
        assert_eq!(node.as_text().unwrap().text(), "Hello");
        assert!(acc.is_empty());
        assert!(acc.flush().is_none());
    }

    #[test]
    fn merges_runs_with_equal_attributes() {
        let mut acc = TextAccumulator::new();
        acc.append("Hello ", Some(&plain()));
        acc.append("there ", Some(&plain()));
        acc.append("world", Some(&bold()));
        let node = acc.flush().unwrap();
        let block = node.as_text().unwrap();
        assert_eq!(block.runs.len(), 2);
        assert_eq!(block.runs[0].text, "Hello there ");
        assert_eq!(block.runs[1].attributes, Some(bold()));
    }

    #[test]
    fn line_break_is_unstyled() {
        let mut acc = TextAccumulator::new();
        acc.append("a", Some(&plain()));
        acc.append_line_break();
        acc.append("b", Some(&plain()));
        let block = acc.flush().unwrap();
        let block = block.as_text().unwrap();
        assert_eq!(block.text(), "a\nb");
        assert_eq!(block.runs[1].attributes, None);
    }

    #[test]
    fn trims_exactly_one_newline() {
        let mut acc = TextAccumulator::new();
        acc.append("code\n\n", Some(&plain()));
        assert!(acc.trim_trailing_newline());
        assert_eq!(acc.flush().unwrap().as_text().unwrap().text(), "code\n");
    }

    #[test]
    fn trimming_a_lone_break_drops_the_run() {
        let mut acc = TextAccumulator::new();
        acc.append("quote", Some(&plain()));
        acc.append_line_break();
        acc.trim_trailing_newline();
        let block = acc.flush().unwrap();
        assert_eq!(block.as_text().unwrap().runs.len(), 1);
    }

    #[test]
    fn ignores_empty_text() {
        let mut acc = TextAccumulator::new();
        acc.append("", Some(&plain()));
        assert!(acc.flush().is_none());
        assert!(!acc.trim_trailing_newline());
    }
}
