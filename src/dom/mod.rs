//! Arena-backed HTML document: parse a page, query it with selectors,
//! append nodes and write it back out.

use std::fmt::Write;

pub mod error;
mod parse;
pub mod selector;

use error::DomError;
use selector::{AttrCondition, Combinator, Part, Selector, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Document,
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    /// Comments and declarations, written back verbatim.
    Raw(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
        }
    }

    pub fn parse(html: &str) -> Result<Self, DomError> {
        parse::parse_html(html)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn push_node(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            kind,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    /// Creates a detached element; attach it with [`Document::append_child`].
    pub fn create_element(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect();
        self.push_node(
            None,
            NodeKind::Element {
                tag: tag.to_ascii_lowercase(),
                attrs,
            },
        )
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(None, NodeKind::Text(text.to_string()))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(old) = self.nodes[child.0].parent.take() {
            self.nodes[old.0].children.retain(|id| *id != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    fn attrs(&self, node: NodeId) -> &[(String, String)] {
        match &self.nodes[node.0].kind {
            NodeKind::Element { attrs, .. } => attrs,
            _ => &[],
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.attrs(node)
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attr(node, "class")
            .map(|classes| classes.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Raw(_) => {}
            NodeKind::Document | NodeKind::Element { .. } => {
                for child in &self.nodes[node.0].children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    pub fn next_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = &self.nodes[parent.0].children;
        let pos = siblings.iter().position(|id| *id == node)?;
        siblings[pos + 1..]
            .iter()
            .copied()
            .find(|id| self.tag_name(*id).is_some())
    }

    /// All elements matching `selector`, in document order.
    pub fn select(&self, selector: &str) -> Result<Vec<NodeId>, DomError> {
        self.select_from(self.root(), selector)
    }

    /// Descendants of `scope` matching `selector`, in document order. Like
    /// `querySelectorAll`, ancestors of `scope` may satisfy the leading parts.
    pub fn select_from(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let selector = Selector::parse(selector)?;
        let mut candidates = Vec::new();
        for child in self.children(scope) {
            self.collect_elements(*child, &mut candidates);
        }
        Ok(candidates
            .into_iter()
            .filter(|id| self.matches_parsed(*id, &selector))
            .collect())
    }

    pub fn select_first_from(
        &self,
        scope: NodeId,
        selector: &str,
    ) -> Result<Option<NodeId>, DomError> {
        Ok(self.select_from(scope, selector)?.into_iter().next())
    }

    pub fn matches(&self, node: NodeId, selector: &str) -> Result<bool, DomError> {
        let selector = Selector::parse(selector)?;
        Ok(self.matches_parsed(node, &selector))
    }

    fn collect_elements(&self, node: NodeId, out: &mut Vec<NodeId>) {
        if self.tag_name(node).is_some() {
            out.push(node);
        }
        for child in &self.nodes[node.0].children {
            self.collect_elements(*child, out);
        }
    }

    fn matches_parsed(&self, node: NodeId, selector: &Selector) -> bool {
        let parts: &[Part] = &selector.parts;
        let Some((last, rest)) = parts.split_last() else {
            return false;
        };
        if !self.matches_step(node, &last.step) {
            return false;
        }
        self.matches_ancestors(node, rest, last.combinator)
    }

    /// Matches the remaining parts right to left, backtracking over
    /// descendant combinators.
    fn matches_ancestors(
        &self,
        node: NodeId,
        parts: &[Part],
        combinator: Option<Combinator>,
    ) -> bool {
        let Some((last, rest)) = parts.split_last() else {
            return true;
        };
        match combinator.unwrap_or(Combinator::Descendant) {
            Combinator::Child => self.parent(node).is_some_and(|parent| {
                self.matches_step(parent, &last.step)
                    && self.matches_ancestors(parent, rest, last.combinator)
            }),
            Combinator::Descendant => {
                let mut cursor = self.parent(node);
                while let Some(ancestor) = cursor {
                    if self.matches_step(ancestor, &last.step)
                        && self.matches_ancestors(ancestor, rest, last.combinator)
                    {
                        return true;
                    }
                    cursor = self.parent(ancestor);
                }
                false
            }
        }
    }

    fn matches_step(&self, node: NodeId, step: &Step) -> bool {
        let Some(tag) = self.tag_name(node) else {
            return false;
        };
        if step.tag.as_deref().is_some_and(|wanted| wanted != tag) {
            return false;
        }
        if !step.classes.iter().all(|class| self.has_class(node, class)) {
            return false;
        }
        step.attrs.iter().all(|cond| match cond {
            AttrCondition::Exists { key } => self.attr(node, key).is_some(),
            AttrCondition::Eq { key, value } => self.attr(node, key) == Some(value.as_str()),
        })
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for child in self.children(self.root()) {
            self.write_node(*child, &mut out);
        }
        out
    }

    fn write_node(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].kind {
            NodeKind::Document => {}
            NodeKind::Raw(raw) => out.push_str(raw),
            NodeKind::Text(text) => {
                let raw_parent = self
                    .parent(node)
                    .and_then(|p| self.tag_name(p))
                    .is_some_and(parse::is_raw_text_tag);
                if raw_parent {
                    out.push_str(text);
                } else {
                    out.push_str(&escape(text, false));
                }
            }
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    let _ = write!(out, " {name}=\"{}\"", escape(value, true));
                }
                out.push('>');
                if parse::is_void_tag(tag) {
                    return;
                }
                for child in &self.nodes[node.0].children {
                    self.write_node(*child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

fn escape(s: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: &str = r#"<div role="rowgroup" class="ZOZXb">
<div role="row" class="JR0qJ"><span>a</span></div>
<div role="row" class="nqfmm">Disc 2</div>
<div role="row" class="JR0qJ other"><span>b</span></div>
</div>"#;

    #[test]
    fn test_select_with_classes_and_attributes() -> anyhow::Result<()> {
        let doc = Document::parse(ROWS)?;

        let container = doc.select(r#"div[role="rowgroup"].ZOZXb"#)?;
        assert_eq!(container.len(), 1);

        let rows = doc.select_from(container[0], r#"div[role="row"].JR0qJ"#)?;
        assert_eq!(rows.len(), 2);
        assert_eq!(doc.text_content(rows[1]), "b");
        Ok(())
    }

    #[test]
    fn test_next_element_sibling_skips_text() -> anyhow::Result<()> {
        let doc = Document::parse(ROWS)?;

        let rows = doc.select(r#"div[role="row"]"#)?;
        let next = doc.next_element_sibling(rows[0]);
        assert_eq!(next, Some(rows[1]));
        assert!(doc.matches(rows[1], r#"div[role="row"].nqfmm"#)?);
        assert_eq!(doc.next_element_sibling(rows[2]), None);
        Ok(())
    }

    #[test]
    fn test_select_attribute_value_with_bracket() -> anyhow::Result<()> {
        let doc = Document::parse(r#"<p data-x="a]b">hit</p><p data-x="a">miss</p>"#)?;

        let found = doc.select(r#"p[data-x="a]b"]"#)?;
        assert_eq!(found.len(), 1);
        assert_eq!(doc.text_content(found[0]), "hit");
        Ok(())
    }

    #[test]
    fn test_descendant_match_backtracks() -> anyhow::Result<()> {
        let doc = Document::parse(
            r#"<div class="a"><div class="b"><div class="a"><p>x</p></div></div></div>"#,
        )?;

        assert_eq!(doc.select("div.a > div.b p")?.len(), 1);
        assert_eq!(doc.select("div.b > p")?.len(), 0);
        Ok(())
    }

    #[test]
    fn test_select_from_allows_scope_ancestors_in_chain() -> anyhow::Result<()> {
        let doc = Document::parse(r#"<div class="outer"><div class="inner"><b>x</b></div></div>"#)?;

        let inner = doc.select("div.inner")?;
        assert_eq!(doc.select_from(inner[0], "div.outer b")?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_append_and_serialize() -> anyhow::Result<()> {
        let mut doc = Document::parse(
            "<!DOCTYPE html><html><body><div id=\"x\">Tom &amp; Jerry</div><br></body></html>",
        )?;

        let div = doc.select("div")?[0];
        let span = doc.create_element("span", &[("title", "say \"hi\"")]);
        let text = doc.create_text("1 < 2");
        doc.append_child(span, text);
        doc.append_child(div, span);

        assert_eq!(
            doc.to_html(),
            "<!DOCTYPE html><html><body><div id=\"x\">Tom &amp; Jerry\
             <span title=\"say &quot;hi&quot;\">1 &lt; 2</span></div><br></body></html>"
        );
        Ok(())
    }

    #[test]
    fn test_script_text_is_not_escaped_on_output() -> anyhow::Result<()> {
        let html = "<script>window.x = a && b < c;</script>";
        let doc = Document::parse(html)?;

        assert_eq!(doc.to_html(), html);
        Ok(())
    }
}
