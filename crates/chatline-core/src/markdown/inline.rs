use super::Inline;

const SAFE_SCHEMES: [&str; 2] = ["http://", "https://"];

/// Collects nodes, merging adjacent text runs
#[derive(Default)]
struct InlineBuilder {
    nodes: Vec<Inline>,
    text: String,
}

impl InlineBuilder {
    fn push_char(&mut self, c: char) {
        self.text.push(c);
    }

    fn push(&mut self, node: Inline) {
        match node {
            Inline::Text(text) => self.text.push_str(&text),
            other => {
                self.flush_text();
                self.nodes.push(other);
            }
        }
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.nodes.push(Inline::Text(std::mem::take(&mut self.text)));
        }
    }

    fn finish(mut self) -> Vec<Inline> {
        self.flush_text();
        self.nodes
    }
}

/// Parse inline formatting. Newlines become soft breaks.
pub fn parse_inlines(text: &str) -> Vec<Inline> {
    let chars: Vec<char> = text.chars().collect();
    parse_span(&chars)
}

fn parse_span(chars: &[char]) -> Vec<Inline> {
    let mut out = InlineBuilder::default();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' if chars.get(i + 1).is_some_and(char::is_ascii_punctuation) => {
                out.push_char(chars[i + 1]);
                i += 2;
            }
            '\n' => {
                out.push(Inline::SoftBreak);
                i += 1;
            }
            '`' => match find_char(chars, i + 1, '`') {
                // Code spans are opaque: no emphasis or links inside
                Some(end) if end > i + 1 => {
                    out.push(Inline::Code(chars[i + 1..end].iter().collect()));
                    i = end + 1;
                }
                _ => {
                    out.push_char(c);
                    i += 1;
                }
            },
            '*' | '_' => match parse_delimited(chars, i) {
                Some((node, next)) => {
                    out.push(node);
                    i = next;
                }
                None => {
                    out.push_char(c);
                    i += 1;
                }
            },
            '[' => match parse_link(chars, i) {
                Some((node, next)) => {
                    out.push(node);
                    i = next;
                }
                None => {
                    out.push_char(c);
                    i += 1;
                }
            },
            _ => {
                out.push_char(c);
                i += 1;
            }
        }
    }

    out.finish()
}

fn find_char(chars: &[char], from: usize, target: char) -> Option<usize> {
    chars
        .get(from..)?
        .iter()
        .position(|&c| c == target)
        .map(|offset| from + offset)
}

/// Emphasis or strong run opening at `start`, with the index just past it
fn parse_delimited(chars: &[char], start: usize) -> Option<(Inline, usize)> {
    let delim = chars[start];

    // snake_case identifiers are not emphasis
    if delim == '_' && start > 0 && chars[start - 1].is_alphanumeric() {
        return None;
    }

    let double = chars.get(start + 1) == Some(&delim);
    let width = if double { 2 } else { 1 };
    let content_start = start + width;
    if chars.get(content_start).is_none_or(|c| c.is_whitespace()) {
        return None;
    }

    let end = find_closer(chars, content_start, delim, double)?;
    let children = parse_span(&chars[content_start..end]);
    let node = if double {
        Inline::Strong(children)
    } else {
        Inline::Emphasis(children)
    };
    Some((node, end + width))
}

/// Index of the delimiter closing a run whose content starts at `from`.
///
/// Content is never empty, code spans are skipped whole, and a single
/// delimiter steps over doubled ones so `*a **b** c*` nests.
fn find_closer(chars: &[char], from: usize, delim: char, double: bool) -> Option<usize> {
    let mut j = from + 1;
    while j < chars.len() {
        let c = chars[j];
        if c == '`'
            && let Some(end) = find_char(chars, j + 1, '`')
        {
            j = end + 1;
            continue;
        }
        if c == '\\' {
            j += 2;
            continue;
        }
        if c == delim {
            let paired = chars.get(j + 1) == Some(&delim);
            let after_content = !chars[j - 1].is_whitespace();
            if double {
                if paired && after_content {
                    return Some(j);
                }
            } else if paired {
                j += 2;
                continue;
            } else if after_content
                && !(delim == '_' && chars.get(j + 1).is_some_and(|n| n.is_alphanumeric()))
            {
                return Some(j);
            }
        }
        j += 1;
    }
    None
}

/// `[label](url)` opening at `start`. Unsafe schemes come back as literal text.
fn parse_link(chars: &[char], start: usize) -> Option<(Inline, usize)> {
    let label_end = find_char(chars, start + 1, ']')?;
    if chars.get(label_end + 1) != Some(&'(') {
        return None;
    }
    let url_end = find_char(chars, label_end + 2, ')')?;
    let next = url_end + 1;

    let label: String = chars[start + 1..label_end].iter().collect();
    let url: String = chars[label_end + 2..url_end].iter().collect();
    let url = url.trim();

    if !label.is_empty() && is_safe_url(url) {
        Some((
            Inline::Link {
                label,
                url: url.to_string(),
            },
            next,
        ))
    } else {
        Some((Inline::Text(chars[start..next].iter().collect()), next))
    }
}

fn is_safe_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    SAFE_SCHEMES
        .iter()
        .any(|scheme| lower.starts_with(scheme) && lower.len() > scheme.len())
        && !url.chars().any(char::is_whitespace)
}
