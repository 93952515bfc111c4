//! Minimal element tree the probe measures.

use crate::protocol::MetricsSnapshot;

/// Tag of the content root that depth is measured from.
pub const CONTENT_ROOT_TAG: &str = "body";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    /// Number of elements in this subtree, self included.
    pub fn count(&self) -> u64 {
        let mut n = 0u64;
        let mut stack = vec![self];
        while let Some(el) = stack.pop() {
            n += 1;
            stack.extend(el.children.iter());
        }
        n
    }

    /// Deepest level in this subtree when this element sits at `depth`.
    ///
    /// Walks with an explicit stack so pathological nesting cannot blow the
    /// call stack.
    pub fn max_depth_from(&self, depth: u64) -> u64 {
        let mut max = 0u64;
        let mut stack = vec![(self, depth)];
        while let Some((el, d)) = stack.pop() {
            max = max.max(d);
            stack.extend(el.children.iter().map(|c| (c, d + 1)));
        }
        max
    }
}

/// A document: an optional document element (`html`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub root: Option<Element>,
}

impl Document {
    pub fn empty() -> Self {
        Self { root: None }
    }

    pub fn new(root: Element) -> Self {
        Self { root: Some(root) }
    }

    /// `html > head + body`, the shape a fresh page starts with.
    pub fn with_body(body: Element) -> Self {
        Self::new(Element::new("html").with_child(Element::new("head")).with_child(body))
    }

    pub fn body(&self) -> Option<&Element> {
        self.root
            .as_ref()?
            .children
            .iter()
            .find(|c| c.tag.eq_ignore_ascii_case(CONTENT_ROOT_TAG))
    }

    pub fn body_mut(&mut self) -> Option<&mut Element> {
        self.root
            .as_mut()?
            .children
            .iter_mut()
            .find(|c| c.tag.eq_ignore_ascii_case(CONTENT_ROOT_TAG))
    }
}

/// Full, non-incremental recomputation of the document's metrics.
///
/// `node_count` covers every element; `max_depth` is measured from the
/// content root at depth 1. A missing root or body measures as zero.
pub fn compute_snapshot(doc: &Document) -> MetricsSnapshot {
    let node_count = doc.root.as_ref().map(Element::count).unwrap_or(0);
    let max_depth = doc.body().map(|b| b.max_depth_from(1)).unwrap_or(0);
    MetricsSnapshot {
        node_count,
        max_depth,
    }
}
