//! Arena element tree for post-processing generated HTML.
//!
//! html5ever parses the fragment in a `<body>` context and fills the arena
//! through [`ArenaSink`]. Text and attribute values are stored decoded and
//! escaped again on output, the way a browser serializes `innerHTML`.

use std::borrow::Cow;
use std::cell::RefCell;

use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute as Html5Attribute, ParseOpts, QualName, local_name, ns, parse_fragment};

use crate::limits;
use crate::{Error, Result};

/// Elements that never have content or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text children are written without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe", "noembed", "noframes", "plaintext", "script", "style", "xmp",
];

/// Elements whose leading newline the parser drops.
const NEWLINE_ELEMENTS: &[&str] = &["listing", "pre", "textarea"];

/// Index of a node in a [`Dom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    const DOCUMENT: NodeId = NodeId(0);

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One attribute with its decoded value. Bare attributes have an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// An element: lowercase tag name plus attributes in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<Attribute>,
}

impl Element {
    /// Create an element with no attributes.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name == name)
    }

    /// Set an attribute, replacing any existing value.
    ///
    /// `value` is plain text; it is escaped when the tree is serialized.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => self.attrs.push(Attribute {
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Set an attribute only when the element does not carry it yet.
    pub fn set_attr_if_missing(&mut self, name: &str, value: impl Into<String>) {
        if !self.has_attr(name) {
            self.set_attr(name, value);
        }
    }

    /// `h1`..`h6` level, if this is a heading.
    pub fn heading_level(&self) -> Option<u8> {
        match self.name.as_bytes() {
            [b'h', d @ b'1'..=b'6'] => Some(d - b'0'),
            _ => None,
        }
    }

    #[inline]
    fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.name.as_str())
    }
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element(Element),
    /// Decoded text.
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Arena-allocated tree. Node 0 is the document root.
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    /// Empty tree holding only the document root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
        }
    }

    /// Build a tree from an HTML fragment.
    ///
    /// Fails with [`Error::NestingTooDeep`] when elements nest deeper than
    /// [`limits::MAX_TREE_DEPTH`].
    pub fn parse(html: &str) -> Result<Self> {
        let context = QualName::new(None, ns!(html), local_name!("body"));
        let mut dom = parse_fragment(
            ArenaSink::default(),
            ParseOpts::default(),
            context,
            Vec::new(),
            false,
        )
        .one(html);
        dom.hoist_fragment_root();
        dom.check_depth()?;
        Ok(dom)
    }

    #[inline]
    pub fn document(&self) -> NodeId {
        NodeId::DOCUMENT
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.index()].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.index()].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Number of nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Add a detached node.
    pub fn create(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    /// Append `child` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    /// Replace the child list of `parent`.
    pub fn set_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        for &child in &children {
            self.nodes[child.index()].parent = Some(parent);
        }
        self.nodes[parent.index()].children = children;
    }

    /// Element ids under `root` in document order, `root` excluded.
    pub fn elements(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if self.element(id).is_some() {
                out.push(id);
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Concatenated decoded text of all descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if let NodeData::Text(text) = &node.data {
                out.push_str(text);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Write the tree back out as HTML.
    pub fn serialize(&self) -> String {
        let mut out = String::with_capacity(self.nodes.len() * 16);
        for &child in self.children(self.document()) {
            self.write_node(child, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        // Explicit stack: depth is bounded at parse time, but created
        // wrappers may add levels.
        enum Step {
            Open(NodeId),
            Close(NodeId),
        }

        let mut steps = vec![Step::Open(id)];
        while let Some(step) = steps.pop() {
            match step {
                Step::Open(id) => {
                    let node = self.node(id);
                    match &node.data {
                        NodeData::Document => {}
                        NodeData::Text(text) => {
                            if self.in_raw_text(node) {
                                out.push_str(text);
                            } else {
                                html_escape::encode_text_to_string(text, out);
                            }
                        }
                        NodeData::Comment(text) => {
                            out.push_str("<!--");
                            out.push_str(text);
                            out.push_str("-->");
                        }
                        NodeData::Element(el) => {
                            write_start_tag(el, out);
                            if el.is_void() {
                                continue;
                            }
                            if NEWLINE_ELEMENTS.contains(&el.name.as_str())
                                && self.starts_with_newline(node)
                            {
                                out.push('\n');
                            }
                            steps.push(Step::Close(id));
                        }
                    }
                    steps.extend(node.children.iter().rev().map(|&c| Step::Open(c)));
                }
                Step::Close(id) => {
                    if let Some(el) = self.element(id) {
                        out.push_str("</");
                        out.push_str(&el.name);
                        out.push('>');
                    }
                }
            }
        }
    }

    fn in_raw_text(&self, node: &Node) -> bool {
        node.parent
            .and_then(|parent| self.element(parent))
            .is_some_and(|el| RAW_TEXT_ELEMENTS.contains(&el.name.as_str()))
    }

    fn starts_with_newline(&self, node: &Node) -> bool {
        node.children.first().is_some_and(|&first| {
            matches!(&self.node(first).data, NodeData::Text(text) if text.starts_with('\n'))
        })
    }

    /// Move the children of the parser's `<html>` root up to the document.
    fn hoist_fragment_root(&mut self) {
        let Some(&root) = self.children(self.document()).first() else {
            return;
        };
        let children = std::mem::take(&mut self.nodes[root.index()].children);
        self.set_children(self.document(), children);
    }

    fn check_depth(&self) -> Result<()> {
        let mut stack: Vec<(NodeId, usize)> = self
            .children(self.document())
            .iter()
            .map(|&c| (c, 1))
            .collect();
        while let Some((id, depth)) = stack.pop() {
            if self.element(id).is_none() {
                continue;
            }
            if depth > limits::MAX_TREE_DEPTH {
                return Err(Error::NestingTooDeep {
                    depth,
                    max: limits::MAX_TREE_DEPTH,
                });
            }
            stack.extend(self.children(id).iter().map(|&c| (c, depth + 1)));
        }
        Ok(())
    }

    fn append_text(&mut self, parent: NodeId, text: &str) {
        if let Some(&last) = self.children(parent).last() {
            if let NodeData::Text(existing) = &mut self.nodes[last.index()].data {
                existing.push_str(text);
                return;
            }
        }
        let id = self.create(NodeData::Text(text.to_string()));
        self.append(parent, id);
    }

    fn insert_before(&mut self, sibling: NodeId, node: NodeId) {
        let Some(parent) = self.nodes[sibling.index()].parent else {
            return;
        };
        let children = &mut self.nodes[parent.index()].children;
        let Some(pos) = children.iter().position(|&c| c == sibling) else {
            return;
        };
        children.insert(pos, node);
        self.nodes[node.index()].parent = Some(parent);
    }

    fn insert_text_before(&mut self, sibling: NodeId, text: &str) {
        let Some(parent) = self.nodes[sibling.index()].parent else {
            return;
        };
        let children = self.children(parent);
        let prev = children
            .iter()
            .position(|&c| c == sibling)
            .and_then(|pos| pos.checked_sub(1))
            .map(|pos| children[pos]);
        if let Some(prev) = prev {
            if let NodeData::Text(existing) = &mut self.nodes[prev.index()].data {
                existing.push_str(text);
                return;
            }
        }
        let id = self.create(NodeData::Text(text.to_string()));
        self.insert_before(sibling, id);
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id.index()].parent.take() else {
            return;
        };
        self.nodes[parent.index()].children.retain(|&c| c != id);
    }
}

fn write_start_tag(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for attr in &el.attrs {
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str("=\"");
        html_escape::encode_double_quoted_attribute_to_string(&attr.value, out);
        out.push('"');
    }
    out.push('>');
}

/// Attribute name as written, with its namespace prefix if any.
fn attr_name(name: &QualName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{}:{}", &**prefix, &*name.local),
        None => name.local.to_string(),
    }
}

/// Parser-side reference to an arena node.
///
/// Elements carry their qualified name so the tree builder can inspect it
/// without borrowing the arena.
#[derive(Debug, Clone)]
struct Handle {
    id: NodeId,
    name: QualName,
}

impl Handle {
    fn node(id: NodeId) -> Self {
        Self {
            id,
            name: QualName::new(None, ns!(), local_name!("")),
        }
    }
}

/// [`TreeSink`] that builds a [`Dom`].
///
/// html5ever drives the sink through `&self`, so the arena sits behind a
/// `RefCell`.
#[derive(Default)]
struct ArenaSink {
    dom: RefCell<Dom>,
}

impl TreeSink for ArenaSink {
    type Handle = Handle;
    type Output = Dom;
    type ElemName<'a>
        = &'a QualName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self.dom.into_inner()
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        log::trace!("html parse error: {msg}");
    }

    fn get_document(&self) -> Self::Handle {
        Handle::node(NodeId::DOCUMENT)
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        &target.name
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Html5Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let element = Element {
            name: name.local.to_string(),
            attrs: attrs
                .into_iter()
                .map(|a| Attribute {
                    name: attr_name(&a.name),
                    value: a.value.to_string(),
                })
                .collect(),
        };
        let id = self.dom.borrow_mut().create(NodeData::Element(element));
        Handle { id, name }
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        let id = self
            .dom
            .borrow_mut()
            .create(NodeData::Comment(text.to_string()));
        Handle::node(id)
    }

    fn create_pi(&self, _target: StrTendril, data: StrTendril) -> Self::Handle {
        self.create_comment(data)
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let mut dom = self.dom.borrow_mut();
        match child {
            NodeOrText::AppendNode(node) => dom.append(parent.id, node.id),
            NodeOrText::AppendText(text) => dom.append_text(parent.id, &text),
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let has_parent = self.dom.borrow().node(element.id).parent.is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        // Fragments have no doctype.
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        target.clone()
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x.id == y.id
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let mut dom = self.dom.borrow_mut();
        match new_node {
            NodeOrText::AppendNode(node) => dom.insert_before(sibling.id, node.id),
            NodeOrText::AppendText(text) => dom.insert_text_before(sibling.id, &text),
        }
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Html5Attribute>) {
        let mut dom = self.dom.borrow_mut();
        if let Some(el) = dom.element_mut(target.id) {
            for attr in attrs {
                el.set_attr_if_missing(&attr_name(&attr.name), attr.value.to_string());
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.dom.borrow_mut().detach(target.id);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let mut dom = self.dom.borrow_mut();
        let children = std::mem::take(&mut dom.nodes[node.id.index()].children);
        for child in children {
            dom.append(new_parent.id, child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(html: &str) -> String {
        Dom::parse(html).unwrap().serialize()
    }

    #[test]
    fn test_round_trip_generated_html() {
        let html = "<h1>Title</h1>\n<p>Some <em>text</em> &amp; <a href=\"/x\" title=\"T\">link</a></p>\n<hr>\n<ul>\n<li>a</li>\n</ul>\n";
        assert_eq!(round_trip(html), html);
    }

    #[test]
    fn test_void_and_self_closing() {
        assert_eq!(round_trip("<p>a<br>b<img src=\"x\"></p>"), "<p>a<br>b<img src=\"x\"></p>");
        assert_eq!(round_trip("<br/>"), "<br>");
    }

    #[test]
    fn test_attribute_forms() {
        let dom = Dom::parse("<input disabled value=plain data-x='say \"hi\"'>").unwrap();
        let input = dom.elements(dom.document())[0];
        let el = dom.element(input).unwrap();
        assert_eq!(el.attr("disabled"), Some(""));
        assert_eq!(el.attr("value"), Some("plain"));
        assert_eq!(el.attr("data-x"), Some("say \"hi\""));
        assert_eq!(
            dom.serialize(),
            "<input disabled=\"\" value=\"plain\" data-x=\"say &quot;hi&quot;\">"
        );
    }

    #[test]
    fn test_uppercase_names_lowercased() {
        assert_eq!(round_trip("<DIV CLASS=\"a\">x</DIV>"), "<div class=\"a\">x</div>");
    }

    #[test]
    fn test_comments_kept() {
        let html = "<!-- note <p> --><p>x</p>";
        assert_eq!(round_trip(html), html);
    }

    #[test]
    fn test_text_is_escaped() {
        assert_eq!(round_trip("<p>a < b & 1<2</p>"), "<p>a &lt; b &amp; 1&lt;2</p>");
        assert_eq!(round_trip("<p>&copy; &#65;</p>"), "<p>\u{a9} A</p>");
    }

    #[test]
    fn test_stray_end_tag_dropped() {
        assert_eq!(round_trip("<p>x</span></p>"), "<p>x</p>");
    }

    #[test]
    fn test_unclosed_element_closed() {
        assert_eq!(round_trip("<div><p>x</div>"), "<div><p>x</p></div>");
    }

    #[test]
    fn test_misnested_formatting_repaired() {
        assert_eq!(round_trip("<b>1<i>2</b>3</i>"), "<b>1<i>2</i></b><i>3</i>");
    }

    #[test]
    fn test_block_closes_paragraph() {
        assert_eq!(round_trip("<p>a<div>b</div>"), "<p>a</p><div>b</div>");
    }

    #[test]
    fn test_script_content_not_parsed() {
        let html = "<script>if (a < b && c > d) { x = '<p>'; }</script><p>y</p>";
        assert_eq!(round_trip(html), html);
        let dom = Dom::parse(html).unwrap();
        assert_eq!(dom.elements(dom.document()).len(), 2);
    }

    #[test]
    fn test_pre_leading_newline_kept() {
        let html = "<pre>\n\n  a</pre>";
        assert_eq!(round_trip(html), html);
    }

    #[test]
    fn test_text_content() {
        let dom = Dom::parse("<h2>A <code>b</code> &amp; c</h2>").unwrap();
        let h2 = dom.elements(dom.document())[0];
        assert_eq!(dom.text_content(h2), "A b & c");
    }

    #[test]
    fn test_heading_level() {
        assert_eq!(Element::new("H3").heading_level(), Some(3));
        assert_eq!(Element::new("hr").heading_level(), None);
        assert_eq!(Element::new("h7").heading_level(), None);
    }

    #[test]
    fn test_depth_limit() {
        let depth = limits::MAX_TREE_DEPTH + 1;
        let html = "<div>".repeat(depth);
        let err = Dom::parse(&html).unwrap_err();
        assert_eq!(
            err,
            Error::NestingTooDeep {
                depth,
                max: limits::MAX_TREE_DEPTH
            }
        );

        let ok = "<span>".repeat(limits::MAX_TREE_DEPTH);
        assert!(Dom::parse(&ok).is_ok());
    }

    #[test]
    fn test_set_attr() {
        let mut el = Element::new("a");
        el.set_attr("href", "/x");
        el.set_attr_if_missing("href", "/y");
        el.set_attr("rel", "a");
        el.set_attr("rel", "b");
        assert_eq!(el.attr("href"), Some("/x"));
        assert_eq!(el.attr("rel"), Some("b"));
        assert_eq!(el.attrs.len(), 2);
    }
}
