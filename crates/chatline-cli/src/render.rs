//! ANSI projection of markdown nodes and transcript entries

use std::borrow::Cow;

use chatline_core::markdown::{Block, Inline, render_markdown};
use chatline_core::{Message, ResponseMetrics};

// ── ANSI escape helpers ─────────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const ITALIC: &str = "\x1b[3m";
const UNDERLINE: &str = "\x1b[4m";
const CYAN: &str = "\x1b[36m";
const RED: &str = "\x1b[31m";
const GRAY: &str = "\x1b[90m";

const CODE_INDENT: &str = "    ";

/// Drop terminal control characters from source-derived text
fn sanitize(text: &str) -> Cow<'_, str> {
    let unsafe_char = |c: char| c.is_control() && c != '\n' && c != '\t';
    if text.chars().any(unsafe_char) {
        Cow::Owned(text.chars().filter(|&c| !unsafe_char(c)).collect())
    } else {
        Cow::Borrowed(text)
    }
}

/// Close a styled span and restore the styles still open around it
fn close_style(styles: &[&str], out: &mut String) {
    out.push_str(RESET);
    for style in styles {
        out.push_str(style);
    }
}

fn render_styled(
    style: &'static str,
    children: &[Inline],
    styles: &mut Vec<&'static str>,
    out: &mut String,
) {
    out.push_str(style);
    styles.push(style);
    render_inlines(children, styles, out);
    styles.pop();
    close_style(styles, out);
}

fn render_inlines(inlines: &[Inline], styles: &mut Vec<&'static str>, out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(&sanitize(text)),
            Inline::Emphasis(children) => render_styled(ITALIC, children, styles, out),
            Inline::Strong(children) => render_styled(BOLD, children, styles, out),
            Inline::Code(code) => {
                out.push_str(CYAN);
                out.push_str(&sanitize(code));
                close_style(styles, out);
            }
            Inline::Link { label, url } => {
                out.push_str(UNDERLINE);
                out.push_str(&sanitize(label));
                close_style(styles, out);
                out.push_str(&format!(" {GRAY}<{}>", sanitize(url)));
                close_style(styles, out);
            }
            Inline::SoftBreak => out.push('\n'),
        }
    }
}

pub fn render_blocks(blocks: &[Block]) -> String {
    let mut out = String::new();

    for (index, block) in blocks.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        match block {
            Block::Heading { level, content } => {
                let mut styles = vec![BOLD];
                if *level == 1 {
                    styles.push(UNDERLINE);
                }
                for style in &styles {
                    out.push_str(style);
                }
                render_inlines(content, &mut styles, &mut out);
                out.push_str(RESET);
                out.push('\n');
            }
            Block::CodeBlock { language, code } => {
                if let Some(language) = language {
                    out.push_str(&format!("{CODE_INDENT}{GRAY}{}{RESET}\n", sanitize(language)));
                }
                for line in code.lines() {
                    out.push_str(&format!("{CODE_INDENT}{DIM}{}{RESET}\n", sanitize(line)));
                }
            }
            Block::List { items } => {
                for item in items {
                    out.push_str("  • ");
                    render_inlines(item, &mut Vec::new(), &mut out);
                    out.push('\n');
                }
            }
            Block::Paragraph(inlines) => {
                render_inlines(inlines, &mut Vec::new(), &mut out);
                out.push('\n');
            }
        }
    }

    out
}

fn render_metrics(metrics: &ResponseMetrics) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(input) = metrics.input_tokens {
        parts.push(format!("in {}", input));
    }
    if let Some(output) = metrics.output_tokens {
        parts.push(format!("out {}", output));
    }
    if let Some(seconds) = metrics.duration_seconds {
        parts.push(format!("{:.1}s", seconds));
    }
    (!parts.is_empty()).then(|| format!("{GRAY}[{}]{RESET}\n", parts.join(" · ")))
}

/// Assistant entry as printed to the terminal
pub fn render_assistant(message: &Message) -> String {
    if message.is_error {
        return format!("{RED}{}{RESET}\n", sanitize(&message.content));
    }

    let mut out = render_blocks(&render_markdown(&message.content));
    if let Some(metrics) = message.metrics.as_ref().and_then(render_metrics) {
        out.push_str(&metrics);
    }
    out
}
