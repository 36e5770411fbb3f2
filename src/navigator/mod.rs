//! Tree Model Adapter
//!
//! Presents the irregular HTML segment tree as the XPath data model: seven
//! node kinds, ordered axes, and per-kind string values. The underlying tree
//! has no namespaces, models attributes separately from elements, represents
//! comments and processing instructions as tag-typed segments, and has no
//! text nodes at all - text is synthesized here on demand.
//!
//! The adapter is stateless: every operation is a pure function of the
//! document and the node handle, and nothing is ever copied out of or
//! written into the parsed tree. Unrecognized or dangling handles degrade to
//! empty results rather than erroring, so one odd node never aborts a
//! larger traversal.

use crate::html::{Document, SegmentId, TagType};

/// The XPath node kinds a handle can classify as.
///
/// `Namespace` never occurs (HTML has no namespaces) and is therefore not
/// represented; `None` covers markup the data model has no kind for, such as
/// DOCTYPE declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Document,
    Element,
    Attribute,
    Comment,
    ProcessingInstruction,
    Text,
    None,
}

/// A node handle as seen by the XPath engine.
///
/// Everything except `Text` maps 1:1 onto state owned by the parsed
/// document. The synthesized `Text` variant has no identity of its own: it
/// is rebuilt from the owner's current text runs every time the child axis
/// is enumerated, and two text nodes with the same owner and value are the
/// same node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum XNode {
    /// The whole parsed document
    Document,
    /// A tagged markup segment: element, comment, PI or other markup,
    /// separated by [`Kind`]
    Segment(SegmentId),
    /// An attribute, owned by exactly one element
    Attribute { owner: SegmentId, index: u32 },
    /// Aggregate text directly owned by an element; `owner` is `None` for
    /// raw strings injected from outside the tree
    Text {
        owner: Option<SegmentId>,
        value: String,
    },
}

impl XNode {
    /// Wrap a raw string as an already-classified text node.
    pub fn text(value: impl Into<String>) -> Self {
        XNode::Text {
            owner: None,
            value: value.into(),
        }
    }
}

/// The stateless adapter.
///
/// Construct one and pass it by reference wherever navigation is needed; it
/// holds no state, so a single value can serve any number of documents and
/// concurrent evaluations.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlNavigator;

impl HtmlNavigator {
    /// Classify a handle into exactly one kind.
    ///
    /// Comments and processing instructions are recognized by the backing
    /// segment's tag type, not by name. Dangling segment or attribute
    /// handles classify as `None`.
    pub fn classify(&self, doc: &Document, node: &XNode) -> Kind {
        match node {
            XNode::Document => Kind::Document,
            XNode::Segment(id) => match doc.tag_type(*id) {
                Some(TagType::Normal) => Kind::Element,
                Some(TagType::Comment) => Kind::Comment,
                Some(TagType::XmlProcessingInstruction) | Some(TagType::XmlDeclaration) => {
                    Kind::ProcessingInstruction
                }
                Some(TagType::Doctype) | Some(TagType::MarkupDeclaration) | None => Kind::None,
            },
            XNode::Attribute { owner, index } => {
                if doc.attributes(*owner).len() > *index as usize {
                    Kind::Attribute
                } else {
                    Kind::None
                }
            }
            XNode::Text { .. } => Kind::Text,
        }
    }

    /// Check if the node is the document
    pub fn is_document(&self, doc: &Document, node: &XNode) -> bool {
        self.classify(doc, node) == Kind::Document
    }

    /// Check if the node is an element
    pub fn is_element(&self, doc: &Document, node: &XNode) -> bool {
        self.classify(doc, node) == Kind::Element
    }

    /// Check if the node is an attribute
    pub fn is_attribute(&self, doc: &Document, node: &XNode) -> bool {
        self.classify(doc, node) == Kind::Attribute
    }

    /// Check if the node is a comment
    pub fn is_comment(&self, doc: &Document, node: &XNode) -> bool {
        self.classify(doc, node) == Kind::Comment
    }

    /// Check if the node is a processing instruction
    pub fn is_processing_instruction(&self, doc: &Document, node: &XNode) -> bool {
        self.classify(doc, node) == Kind::ProcessingInstruction
    }

    /// Check if the node is text (synthesized or injected)
    pub fn is_text(&self, doc: &Document, node: &XNode) -> bool {
        self.classify(doc, node) == Kind::Text
    }

    /// Name of an element (tag name, case as parsed) or attribute; empty for
    /// every other kind.
    pub fn name<'d>(&self, doc: &'d Document, node: &XNode) -> &'d str {
        match node {
            XNode::Segment(id) if doc.tag_type(*id) == Some(TagType::Normal) => doc.name(*id),
            XNode::Attribute { owner, index } => doc
                .attributes(*owner)
                .get(*index as usize)
                .map(|attr| &*attr.name)
                .unwrap_or(""),
            _ => "",
        }
    }

    /// Qualified name; identical to [`name`](Self::name) since HTML has no
    /// namespaces.
    pub fn qualified_name<'d>(&self, doc: &'d Document, node: &XNode) -> &'d str {
        self.name(doc, node)
    }

    /// Namespace URI of an element: always empty.
    pub fn element_namespace_uri(&self, _doc: &Document, _node: &XNode) -> &'static str {
        ""
    }

    /// Namespace URI of an attribute: always empty.
    pub fn attribute_namespace_uri(&self, _doc: &Document, _node: &XNode) -> &'static str {
        ""
    }

    /// Namespace prefix: always empty.
    pub fn namespace_prefix(&self, _doc: &Document, _node: &XNode) -> &'static str {
        ""
    }

    /// The node's string value per the XPath text-extraction rules.
    ///
    /// Elements yield all contained text with markup removed; comments and
    /// processing instructions yield the text between their delimiters;
    /// attributes their value; text nodes themselves. The document's string
    /// value is its root element's.
    pub fn string_value(&self, doc: &Document, node: &XNode) -> String {
        match node {
            XNode::Document => doc
                .root_element()
                .map(|id| doc.extract_text(id))
                .unwrap_or_default(),
            XNode::Segment(id) => match doc.tag_type(*id) {
                Some(TagType::Normal) => doc.extract_text(*id),
                Some(_) => crate::core::entities::decode(doc.content_str(*id)).into_owned(),
                None => String::new(),
            },
            XNode::Attribute { owner, index } => doc
                .attributes(*owner)
                .get(*index as usize)
                .map(|attr| attr.value.to_string())
                .unwrap_or_default(),
            XNode::Text { value, .. } => value.clone(),
        }
    }

    /// The document's single root element (the outermost `html` element, or
    /// the first top-level element of a fragment). `None` only for markup
    /// containing no elements at all.
    pub fn document_root(&self, doc: &Document) -> Option<XNode> {
        doc.root_element().map(XNode::Segment)
    }

    /// Parent lookup, O(1) via the segment's stored parent link.
    ///
    /// Only elements report a parent. Attribute, comment, processing
    /// instruction, text and document handles have no parent through this
    /// accessor - a deliberate capability gap mirrored from the child-axis
    /// design, not an "at the root" signal.
    pub fn parent(&self, doc: &Document, node: &XNode) -> Option<XNode> {
        match node {
            XNode::Segment(id) if doc.tag_type(*id) == Some(TagType::Normal) => doc
                .segment(*id)
                .and_then(|seg| seg.parent)
                .map(XNode::Segment),
            _ => None,
        }
    }

    /// The child axis of an element: every direct child segment in document
    /// order, then exactly one synthesized text node aggregating the
    /// element's direct text runs.
    ///
    /// The text node is always last, even when empty - it is never
    /// interleaved at its true document positions. Non-elements have no
    /// children.
    pub fn child_axis(&self, doc: &Document, node: &XNode) -> Vec<XNode> {
        match node {
            XNode::Segment(id) if doc.tag_type(*id) == Some(TagType::Normal) => {
                let mut children: Vec<XNode> =
                    doc.children(*id).map(XNode::Segment).collect();
                children.push(XNode::Text {
                    owner: Some(*id),
                    value: doc.direct_text(*id),
                });
                children
            }
            _ => Vec::new(),
        }
    }

    /// Named element lookup: every **descendant** element matching the tag
    /// name (ASCII case-insensitive), in document order - deliberately
    /// deeper than the child axis.
    pub fn named_child_axis(&self, doc: &Document, node: &XNode, name: &str) -> Vec<XNode> {
        match node {
            XNode::Segment(id) if doc.tag_type(*id) == Some(TagType::Normal) => doc
                .descendants(*id)
                .filter(|&cid| {
                    doc.tag_type(cid) == Some(TagType::Normal)
                        && doc.name(cid).eq_ignore_ascii_case(name)
                })
                .map(XNode::Segment)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The attribute axis of an element, in parse order.
    pub fn attribute_axis(&self, doc: &Document, node: &XNode) -> Vec<XNode> {
        match node {
            XNode::Segment(id) if doc.tag_type(*id) == Some(TagType::Normal) => {
                (0..doc.attributes(*id).len() as u32)
                    .map(|index| XNode::Attribute { owner: *id, index })
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    /// Attributes of an element filtered by exact name. Duplicate names are
    /// not assumed away: every match is returned.
    pub fn named_attribute_axis(&self, doc: &Document, node: &XNode, name: &str) -> Vec<XNode> {
        match node {
            XNode::Segment(id) if doc.tag_type(*id) == Some(TagType::Normal) => doc
                .attributes(*id)
                .iter()
                .enumerate()
                .filter(|(_, attr)| &*attr.name == name)
                .map(|(index, _)| XNode::Attribute {
                    owner: *id,
                    index: index as u32,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The namespace axis: always empty.
    pub fn namespace_axis(&self, _doc: &Document, _node: &XNode) -> Vec<XNode> {
        Vec::new()
    }

    /// Every descendant element whose `id` attribute equals the given value
    /// exactly (case-sensitive). Id uniqueness is an HTML convention, not a
    /// guarantee, so all matches are returned.
    pub fn elements_by_id(&self, doc: &Document, node: &XNode, id_value: &str) -> Vec<XNode> {
        match node {
            XNode::Segment(id) if doc.tag_type(*id) == Some(TagType::Normal) => doc
                .descendants(*id)
                .filter(|&cid| {
                    doc.tag_type(cid) == Some(TagType::Normal)
                        && doc.attribute(cid, "id") == Some(id_value)
                })
                .map(XNode::Segment)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Sort key placing nodes in document order: segments by arena id,
    /// attributes directly after their owner, synthesized text after its
    /// owner's entire subtree (deepest first when several end together).
    pub(crate) fn document_order_key(&self, doc: &Document, node: &XNode) -> (u32, u8, u32) {
        match node {
            XNode::Document => (0, 0, 0),
            XNode::Segment(id) => (*id, 1, 0),
            XNode::Attribute { owner, index } => (*owner, 2, *index),
            XNode::Text {
                owner: Some(id),
                value: _,
            } => {
                let depth = doc.segment(*id).map(|s| s.depth).unwrap_or(0);
                (doc.subtree_end(*id), 0, (u16::MAX - depth) as u32)
            }
            XNode::Text { owner: None, .. } => (u32::MAX, 3, 0),
        }
    }
}
