//! Compound CSS selectors, just enough for the album page layout:
//! `tag`, `.class`, `[attr]`, `[attr="value"]`, and the descendant (` `)
//! and child (`>`) combinators.

use super::error::DomError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Step {
    pub tag: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrCondition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Part {
    pub step: Step,
    /// Relation to the part on the left.
    pub combinator: Option<Combinator>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub(crate) parts: Vec<Part>,
}

impl Selector {
    pub fn parse(selector: &str) -> Result<Self, DomError> {
        let unsupported = || DomError::UnsupportedSelector(selector.to_string());

        let mut parts = Vec::new();
        let mut pending: Option<Combinator> = None;

        for token in tokenize(selector).ok_or_else(unsupported)? {
            if token == ">" {
                if pending.is_some() || parts.is_empty() {
                    return Err(unsupported());
                }
                pending = Some(Combinator::Child);
                continue;
            }

            let step = parse_step(&token).ok_or_else(unsupported)?;
            let combinator = if parts.is_empty() {
                None
            } else {
                Some(pending.take().unwrap_or(Combinator::Descendant))
            };
            parts.push(Part { step, combinator });
        }

        if parts.is_empty() || pending.is_some() {
            return Err(unsupported());
        }
        Ok(Self { parts })
    }
}

/// Splits on whitespace and `>` outside of attribute brackets and quotes.
fn tokenize(selector: &str) -> Option<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut bracket = false;
    let mut quote: Option<char> = None;

    for ch in selector.trim().chars() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' if bracket => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                bracket = true;
                current.push(ch);
            }
            ']' => {
                bracket = false;
                current.push(ch);
            }
            '>' if !bracket => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(">".to_string());
            }
            c if c.is_whitespace() && !bracket => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if bracket || quote.is_some() {
        return None;
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Some(tokens)
}

fn parse_step(part: &str) -> Option<Step> {
    let bytes = part.as_bytes();
    let mut i = 0usize;
    let mut step = Step::default();

    while i < bytes.len() {
        match bytes[i] {
            b'.' => {
                let (class, next) = parse_ident(part, i + 1)?;
                step.classes.push(class);
                i = next;
            }
            b'[' => {
                let (cond, next) = parse_attr(part, i)?;
                step.attrs.push(cond);
                i = next;
            }
            _ => {
                if step.tag.is_some() || !step.classes.is_empty() || !step.attrs.is_empty() {
                    return None;
                }
                let (tag, next) = parse_ident(part, i)?;
                step.tag = Some(tag.to_ascii_lowercase());
                i = next;
            }
        }
    }

    if step.tag.is_none() && step.classes.is_empty() && step.attrs.is_empty() {
        return None;
    }
    Some(step)
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b':'
}

fn parse_ident(src: &str, start: usize) -> Option<(String, usize)> {
    let bytes = src.as_bytes();
    let mut end = start;
    while end < bytes.len() && is_ident_char(bytes[end]) {
        end += 1;
    }
    if end == start {
        return None;
    }
    Some((src.get(start..end)?.to_string(), end))
}

/// Byte offset of the `]` closing the bracket at `open`, skipping quoted values.
fn find_attr_close(src: &str, open: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, ch) in src.get(open + 1..)?.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, ']') => return Some(open + 1 + i),
            (None, _) => {}
        }
    }
    None
}

fn parse_attr(src: &str, open: usize) -> Option<(AttrCondition, usize)> {
    let close = find_attr_close(src, open)?;
    let inner = src.get(open + 1..close)?.trim();

    let cond = match inner.split_once('=') {
        None => {
            let (key, end) = parse_ident(inner, 0)?;
            if end != inner.len() {
                return None;
            }
            AttrCondition::Exists {
                key: key.to_ascii_lowercase(),
            }
        }
        Some((key, value)) => {
            let key = key.trim();
            let (parsed, end) = parse_ident(key, 0)?;
            if end != key.len() {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            AttrCondition::Eq {
                key: parsed.to_ascii_lowercase(),
                value: value.to_string(),
            }
        }
    };

    Some((cond, close + 1))
}
