use super::inline::parse_inlines;
use super::{Block, Inline};

const FENCE: &str = "```";
const MAX_HEADING_LEVEL: usize = 3;

/// Info string of a fence line, if `line` opens or closes a code block
fn fence_info(line: &str) -> Option<&str> {
    line.trim_start().strip_prefix(FENCE).map(str::trim)
}

/// Level and text of an ATX heading with one to three `#`
fn heading(line: &str) -> Option<(u8, &str)> {
    let level = line.len() - line.trim_start_matches('#').len();
    if level == 0 || level > MAX_HEADING_LEVEL {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let text = rest.trim();
    (!text.is_empty()).then_some((level as u8, text))
}

fn list_item(line: &str) -> Option<&str> {
    line.strip_prefix("- ")
}

/// Accumulates paragraph lines and list items until a boundary closes them
#[derive(Default)]
struct Pending<'a> {
    paragraph: Vec<&'a str>,
    items: Vec<Vec<Inline>>,
}

impl<'a> Pending<'a> {
    fn close_paragraph(&mut self, blocks: &mut Vec<Block>) {
        if !self.paragraph.is_empty() {
            let text = self.paragraph.join("\n");
            self.paragraph.clear();
            blocks.push(Block::Paragraph(parse_inlines(&text)));
        }
    }

    fn close_list(&mut self, blocks: &mut Vec<Block>) {
        if !self.items.is_empty() {
            blocks.push(Block::List {
                items: std::mem::take(&mut self.items),
            });
        }
    }

    fn close_all(&mut self, blocks: &mut Vec<Block>) {
        self.close_paragraph(blocks);
        self.close_list(blocks);
    }
}

/// Split `source` into block nodes, line by line
pub fn parse_blocks(source: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut pending = Pending::default();
    let mut lines = source.lines();

    while let Some(line) = lines.next() {
        if let Some(info) = fence_info(line) {
            pending.close_all(&mut blocks);

            // Everything up to the closing fence is verbatim; no closer means end of input
            let mut code = Vec::new();
            for inner in lines.by_ref() {
                if fence_info(inner).is_some() {
                    break;
                }
                code.push(inner);
            }

            blocks.push(Block::CodeBlock {
                language: (!info.is_empty()).then(|| info.to_string()),
                code: code.join("\n"),
            });
            continue;
        }

        if line.trim().is_empty() {
            pending.close_all(&mut blocks);
            continue;
        }

        if let Some((level, text)) = heading(line) {
            pending.close_all(&mut blocks);
            blocks.push(Block::Heading {
                level,
                content: parse_inlines(text),
            });
            continue;
        }

        if let Some(item) = list_item(line) {
            pending.close_paragraph(&mut blocks);
            pending.items.push(parse_inlines(item));
            continue;
        }

        pending.close_list(&mut blocks);
        pending.paragraph.push(line);
    }

    pending.close_all(&mut blocks);
    blocks
}
