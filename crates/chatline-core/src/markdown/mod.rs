//! Restricted markdown for assistant output
//!
//! Supports:
//! - Headings: `#`, `##`, `###` at the start of a line
//! - Fenced code blocks: ```` ```lang ```` ... ```` ``` ````; an unclosed fence runs to the end
//! - Unordered lists: consecutive `- ` lines
//! - Paragraphs, with single newlines kept as soft breaks
//! - Inline `*em*`/`_em_`, `**strong**`/`__strong__`, `` `code` `` and `[label](url)`
//!
//! Output is a tree of display nodes. Source text is never interpreted as
//! HTML, and links survive only with an `http`/`https` URL.

pub mod blocks;
pub mod inline;

pub use blocks::parse_blocks;
pub use inline::parse_inlines;

/// Block-level display node
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    CodeBlock { language: Option<String>, code: String },
    List { items: Vec<Vec<Inline>> },
    Paragraph(Vec<Inline>),
}

/// Inline display node
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Code(String),
    Link { label: String, url: String },
    SoftBreak,
}

impl Inline {
    /// Text content with all formatting removed
    pub fn plain_text(&self) -> String {
        match self {
            Inline::Text(text) | Inline::Code(text) => text.clone(),
            Inline::Emphasis(children) | Inline::Strong(children) => plain_text(children),
            Inline::Link { label, .. } => label.clone(),
            Inline::SoftBreak => "\n".to_string(),
        }
    }
}

pub fn plain_text(inlines: &[Inline]) -> String {
    inlines.iter().map(Inline::plain_text).collect()
}

/// Parse assistant message text into display nodes
pub fn render_markdown(text: &str) -> Vec<Block> {
    parse_blocks(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_single_paragraph() {
        let input = "Just a sentence, with punctuation: 2 * 3 = 6.";
        assert_eq!(
            render_markdown(input),
            vec![Block::Paragraph(vec![Inline::Text(input.to_string())])]
        );
    }

    #[test]
    fn test_mixed_document() {
        let input = "# Title\n\nSome **bold** text.\n\n- one\n- two\n\n```rust\nfn main() {}\n```";
        let blocks = render_markdown(input);

        assert_eq!(blocks.len(), 4);
        assert_eq!(
            blocks[0],
            Block::Heading {
                level: 1,
                content: vec![Inline::Text("Title".to_string())]
            }
        );
        assert_eq!(
            blocks[1],
            Block::Paragraph(vec![
                Inline::Text("Some ".to_string()),
                Inline::Strong(vec![Inline::Text("bold".to_string())]),
                Inline::Text(" text.".to_string()),
            ])
        );
        assert!(matches!(&blocks[2], Block::List { items } if items.len() == 2));
        assert_eq!(
            blocks[3],
            Block::CodeBlock {
                language: Some("rust".to_string()),
                code: "fn main() {}".to_string()
            }
        );
    }

    #[test]
    fn test_raw_html_is_text() {
        let blocks = render_markdown("<script>alert(1)</script>");
        assert_eq!(
            blocks,
            vec![Block::Paragraph(vec![Inline::Text(
                "<script>alert(1)</script>".to_string()
            )])]
        );
    }

    #[test]
    fn test_plain_text_strips_formatting() {
        let inlines = parse_inlines("a **b** `c` [d](https://e.example)");
        assert_eq!(plain_text(&inlines), "a b c d");
    }
}
