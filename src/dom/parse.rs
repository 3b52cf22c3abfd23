//! Forgiving HTML tokenizer that builds a [`Document`].
//!
//! It does not implement the HTML5 tree construction rules. Mismatched end
//! tags close up to the nearest matching open element and stray ones are
//! dropped, which is enough for server-rendered album pages.

use super::{Document, NodeKind, error::DomError};

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

pub(crate) fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

pub(crate) fn is_raw_text_tag(tag: &str) -> bool {
    RAW_TEXT_TAGS.contains(&tag)
}

pub(crate) fn parse_html(html: &str) -> Result<Document, DomError> {
    let mut doc = Document::new();
    let mut stack = vec![doc.root()];
    let bytes = html.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        let parent = *stack
            .last()
            .ok_or_else(|| DomError::HtmlParse("invalid stack state".into()))?;

        if !starts_markup(bytes, i) {
            let start = i;
            i += 1;
            while i < bytes.len() && !starts_markup(bytes, i) {
                i += 1;
            }
            let text = &html[start..i];
            doc.push_node(Some(parent), NodeKind::Text(decode_entities(text)));
            continue;
        }

        if html[i..].starts_with("<!--") {
            let end = html[i + 4..]
                .find("-->")
                .map(|rel| i + 4 + rel + 3)
                .ok_or_else(|| DomError::HtmlParse("unclosed HTML comment".into()))?;
            doc.push_node(Some(parent), NodeKind::Raw(html[i..end].to_string()));
            i = end;
            continue;
        }

        if html[i..].starts_with("<!") || html[i..].starts_with("<?") {
            let end = html[i..]
                .find('>')
                .map(|rel| i + rel + 1)
                .ok_or_else(|| DomError::HtmlParse("unclosed declaration".into()))?;
            doc.push_node(Some(parent), NodeKind::Raw(html[i..end].to_string()));
            i = end;
            continue;
        }

        if html[i..].starts_with("</") {
            let end = html[i..]
                .find('>')
                .map(|rel| i + rel)
                .ok_or_else(|| DomError::HtmlParse("unclosed end tag".into()))?;
            let tag = html[i + 2..end].trim().to_ascii_lowercase();
            i = end + 1;

            if let Some(pos) = stack
                .iter()
                .rposition(|id| doc.tag_name(*id) == Some(tag.as_str()))
            {
                stack.truncate(pos.max(1));
            }
            continue;
        }

        let (tag, attrs, self_closing, next) = parse_start_tag(html, i)?;
        i = next;
        let node = doc.push_node(Some(parent), NodeKind::Element { tag: tag.clone(), attrs });

        if is_raw_text_tag(&tag) {
            let close = find_end_tag_ci(html, i, &tag)
                .ok_or_else(|| DomError::HtmlParse(format!("unclosed <{tag}>")))?;
            if close > i {
                doc.push_node(Some(node), NodeKind::Text(html[i..close].to_string()));
            }
            i = html[close..]
                .find('>')
                .map(|rel| close + rel + 1)
                .unwrap_or(html.len());
            continue;
        }

        if !self_closing && !is_void_tag(&tag) {
            stack.push(node);
        }
    }

    Ok(doc)
}

type StartTag = (String, Vec<(String, String)>, bool, usize);

fn parse_start_tag(html: &str, at: usize) -> Result<StartTag, DomError> {
    let bytes = html.as_bytes();
    let mut i = at + 1;

    let tag_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    if i == tag_start {
        return Err(DomError::HtmlParse(format!("empty tag name at byte {at}")));
    }
    let tag = html[tag_start..i].to_ascii_lowercase();

    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        match bytes.get(i) {
            None => return Err(DomError::HtmlParse(format!("unclosed <{tag}> tag"))),
            Some(b'>') => {
                i += 1;
                break;
            }
            Some(b'/') if bytes.get(i + 1) == Some(&b'>') => {
                self_closing = true;
                i += 2;
                break;
            }
            Some(b'/') => {
                i += 1;
                continue;
            }
            Some(_) => {}
        }

        let name_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/' | b'"' | b'\'')
        {
            i += 1;
        }
        if i == name_start {
            return Err(DomError::HtmlParse(format!(
                "invalid attribute in <{tag}> at byte {i}"
            )));
        }
        let name = html[name_start..i].to_ascii_lowercase();

        skip_ws(bytes, &mut i);
        let value = if bytes.get(i) == Some(&b'=') {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(html, &mut i)?
        } else {
            String::new()
        };

        if !attrs.iter().any(|(existing, _)| *existing == name) {
            attrs.push((name, value));
        }
    }

    Ok((tag, attrs, self_closing, i))
}

fn parse_attr_value(html: &str, i: &mut usize) -> Result<String, DomError> {
    let bytes = html.as_bytes();
    match bytes.get(*i) {
        Some(&quote) if quote == b'"' || quote == b'\'' => {
            let start = *i + 1;
            let end = html[start..]
                .find(quote as char)
                .map(|rel| start + rel)
                .ok_or_else(|| DomError::HtmlParse("unterminated attribute value".into()))?;
            *i = end + 1;
            Ok(decode_entities(&html[start..end]))
        }
        _ => {
            let start = *i;
            while *i < bytes.len() && !bytes[*i].is_ascii_whitespace() && bytes[*i] != b'>' {
                *i += 1;
            }
            Ok(decode_entities(&html[start..*i]))
        }
    }
}

fn starts_markup(bytes: &[u8], i: usize) -> bool {
    bytes[i] == b'<'
        && bytes
            .get(i + 1)
            .is_some_and(|b| b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?'))
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn find_end_tag_ci(html: &str, from: usize, tag: &str) -> Option<usize> {
    let needle = format!("</{tag}");
    let haystack = html.get(from..)?.to_ascii_lowercase();
    haystack.find(&needle).map(|rel| from + rel)
}

/// Decodes the named references the page actually uses plus numeric ones.
/// Unknown references are kept verbatim.
pub(crate) fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').filter(|semi| *semi <= 10).and_then(|semi| {
            let name = &rest[1..semi];
            let ch = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => name
                    .strip_prefix("#x")
                    .or_else(|| name.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| name.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi + 1))
        });

        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(decode_entities("&#65;&#x42;&lt;"), "AB<");
        assert_eq!(decode_entities("AT&T rocks"), "AT&T rocks");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");
    }

    #[test]
    fn test_parse_nested_elements_and_text() -> anyhow::Result<()> {
        let doc = parse_html(r#"<div class="a"><span data-testid="title">1. Intro</span></div>"#)?;

        let spans = doc.select(r#"div.a span[data-testid="title"]"#)?;
        assert_eq!(spans.len(), 1);
        assert_eq!(doc.text_content(spans[0]), "1. Intro");
        Ok(())
    }

    #[test]
    fn test_void_and_self_closing_tags_do_not_nest() -> anyhow::Result<()> {
        let doc = parse_html(
            r#"<head><meta property="music:song" content="x"><link rel="a"/><title>t</title></head>"#,
        )?;

        let head = doc.select("head")?;
        let children: Vec<_> = doc
            .children(head[0])
            .iter()
            .filter_map(|id| doc.tag_name(*id))
            .collect();
        assert_eq!(children, vec!["meta", "link", "title"]);
        Ok(())
    }

    #[test]
    fn test_script_body_is_kept_raw() -> anyhow::Result<()> {
        let doc = parse_html("<script>if (a < b && c) { x = '</div>'; }</script><p>after</p>")?;

        let script = doc.select("script")?;
        assert_eq!(
            doc.text_content(script[0]),
            "if (a < b && c) { x = '</div>'; }"
        );
        assert_eq!(doc.select("p")?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_lone_angle_bracket_is_text() -> anyhow::Result<()> {
        let doc = parse_html("<p>1 < 2</p>")?;

        let p = doc.select("p")?;
        assert_eq!(doc.text_content(p[0]), "1 < 2");
        Ok(())
    }

    #[test]
    fn test_unclosed_comment_is_an_error() {
        assert!(matches!(
            parse_html("<div><!-- never ends"),
            Err(DomError::HtmlParse(_))
        ));
    }

    #[test]
    fn test_stray_end_tag_is_ignored() -> anyhow::Result<()> {
        let doc = parse_html("<div></span><p>x</p></div>")?;

        let p = doc.select("div > p")?;
        assert_eq!(p.len(), 1);
        Ok(())
    }
}
