//! Retained SVG scene graph.
//!
//! A [`Surface`] is the single root `<svg>` a chart mounts into its container.
//! Nodes live in an arena and are addressed by [`NodeId`], so charts can keep
//! handles to slices, bars or points and tween their attributes after drawing.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::rc::Rc;

pub type SharedSurface = Rc<RefCell<Surface>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct Node {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub text: Option<String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl Node {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }
}

/// Format a coordinate for SVG output: at most two decimals, no trailing zeros.
pub fn num(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let s = format!("{:.2}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

pub fn translate(x: f64, y: f64) -> String {
    format!("translate({},{})", num(x), num(y))
}

#[derive(Debug, Clone)]
pub struct Surface {
    nodes: Vec<Node>,
    width: f64,
    height: f64,
}

impl Surface {
    pub fn new(width: f64, height: f64) -> Self {
        let mut attrs = BTreeMap::new();
        attrs.insert("xmlns".to_string(), "http://www.w3.org/2000/svg".to_string());
        attrs.insert("width".to_string(), num(width));
        attrs.insert("height".to_string(), num(height));
        attrs.insert(
            "viewBox".to_string(),
            format!("0 0 {} {}", num(width), num(height)),
        );
        attrs.insert("class".to_string(), "chart-surface".to_string());
        Self {
            nodes: vec![Node {
                tag: "svg".to_string(),
                attrs,
                text: None,
                children: Vec::new(),
                parent: None,
            }],
            width,
            height,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Append an empty `tag` element under `parent`.
    pub fn append(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            text: None,
            children: Vec::new(),
            parent: Some(parent),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Append an element with attributes in one call.
    pub fn element<K, V>(&mut self, parent: NodeId, tag: &str, attrs: impl IntoIterator<Item = (K, V)>) -> NodeId
    where
        K: Into<String>,
        V: Into<String>,
    {
        let id = self.append(parent, tag);
        let node = &mut self.nodes[id.0];
        for (k, v) in attrs {
            node.attrs.insert(k.into(), v.into());
        }
        id
    }

    /// Append a `<text>` element.
    pub fn text<K, V>(
        &mut self,
        parent: NodeId,
        content: impl Into<String>,
        attrs: impl IntoIterator<Item = (K, V)>,
    ) -> NodeId
    where
        K: Into<String>,
        V: Into<String>,
    {
        let id = self.element(parent, "text", attrs);
        self.nodes[id.0].text = Some(content.into());
        id
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        self.nodes[id.0].attrs.insert(name.to_string(), value.into());
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        self.nodes[id.0].attrs.remove(name);
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id.0].attr(name)
    }

    /// Attribute parsed as a number.
    pub fn attr_f64(&self, id: NodeId, name: &str) -> Option<f64> {
        self.attr(id, name).and_then(|v| v.trim().parse().ok())
    }

    pub fn set_text(&mut self, id: NodeId, content: impl Into<String>) {
        self.nodes[id.0].text = Some(content.into());
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Detach `id` (and its subtree) from its parent.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for c in children {
            self.nodes[c.0].parent = None;
        }
    }

    /// Whether `id` is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut cur = id;
        loop {
            if cur.0 == 0 {
                return true;
            }
            match self.nodes[cur.0].parent {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    /// Attached nodes in document order.
    pub fn descendants(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            for c in self.nodes[id.0].children.iter().rev() {
                stack.push(*c);
            }
        }
        out
    }

    pub fn find_by_class(&self, class: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| self.nodes[id.0].has_class(class))
            .collect()
    }

    pub fn find_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| self.nodes[id.0].tag == tag)
            .collect()
    }

    /// First attached node whose `id` attribute equals `dom_id`.
    pub fn find_by_id(&self, dom_id: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|id| self.nodes[id.0].attr("id") == Some(dom_id))
    }

    pub fn count_class(&self, class: &str) -> usize {
        self.find_by_class(class).len()
    }

    /// Serialize the attached tree as standalone SVG markup.
    pub fn to_svg(&self) -> String {
        let mut out = String::with_capacity(4096);
        self.write_node(&mut out, self.root());
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId) {
        let node = &self.nodes[id.0];
        let _ = write!(out, "<{}", node.tag);
        for (k, v) in &node.attrs {
            let _ = write!(out, " {}=\"{}\"", k, escape(v));
        }
        if node.children.is_empty() && node.text.is_none() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(t) = &node.text {
            out.push_str(&escape(t));
        }
        for c in &node.children {
            self.write_node(out, *c);
        }
        let _ = write!(out, "</{}>", node.tag);
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_trims_trailing_zeros() {
        assert_eq!(num(1.0), "1");
        assert_eq!(num(1.25), "1.25");
        assert_eq!(num(-0.001), "0");
        assert_eq!(num(f64::NAN), "0");
    }

    #[test]
    fn removed_nodes_are_not_serialized() {
        let mut s = Surface::new(10.0, 10.0);
        let root = s.root();
        let g = s.element(root, "g", [("class", "a")]);
        let r = s.element(g, "rect", [("class", "bar"), ("width", "3")]);
        s.text(g, "a < b", [("class", "label")]);
        assert_eq!(s.count_class("bar"), 1);
        assert!(s.to_svg().contains("a &lt; b"));
        s.remove(r);
        assert!(!s.is_attached(r));
        assert_eq!(s.count_class("bar"), 0);
        assert!(!s.to_svg().contains("rect"));
    }
}
