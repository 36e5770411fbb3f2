//! HTML Document - arena of tagged markup segments
//!
//! Storage model:
//! - Arena allocation for segments, ids assigned in document order
//! - Sibling/child links for traversal
//! - Text is never stored: each segment records its source and content spans,
//!   and text is extracted from the gaps between child segments on demand
//! - Attributes live in a shared arena, referenced by (start, count) ranges

use super::tokenizer::{Tag, Tokenizer};
use super::TagType;
use crate::core::entities;

/// Compact segment identifier (index into the arena)
pub type SegmentId = u32;

/// A tagged markup segment in the arena
#[derive(Debug, Clone)]
pub struct Segment {
    /// Markup classification of this segment
    pub tag_type: TagType,
    /// Tag name as parsed (elements), PI target, or empty
    pub name: Box<str>,
    /// Byte span of the whole segment, delimiters included
    pub span: (u32, u32),
    /// Byte span of the content between the delimiters
    pub content: (u32, u32),
    /// Enclosing element (None at top level)
    pub parent: Option<SegmentId>,
    /// First child segment
    pub first_child: Option<SegmentId>,
    /// Last child segment
    pub last_child: Option<SegmentId>,
    /// Previous sibling
    pub prev_sibling: Option<SegmentId>,
    /// Next sibling
    pub next_sibling: Option<SegmentId>,
    /// Start of attributes in the attribute arena
    pub attr_start: u32,
    /// Number of attributes
    pub attr_count: u16,
    /// Depth below the top level
    pub depth: u16,
}

impl Segment {
    /// Check if this segment is an ordinary element
    #[inline]
    pub fn is_normal(&self) -> bool {
        self.tag_type == TagType::Normal
    }

    /// Check if this segment has attributes
    #[inline]
    pub fn has_attributes(&self) -> bool {
        self.attr_count > 0
    }
}

/// Stored attribute; the value has character references resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeEntry {
    /// Attribute name as parsed
    pub name: Box<str>,
    /// Attribute value, decoded
    pub value: Box<str>,
}

/// A fully parsed HTML document
///
/// Owns the source text and the segment arena built over it. Immutable after
/// parsing; every accessor is a pure read, so a document can be shared across
/// threads freely.
pub struct Document {
    source: String,
    segments: Vec<Segment>,
    attributes: Vec<AttributeEntry>,
    first_top: Option<SegmentId>,
    last_top: Option<SegmentId>,
    root: Option<SegmentId>,
}

impl Document {
    /// Parse a markup buffer into a document (lenient, never fails)
    pub fn parse(markup: impl Into<String>) -> Self {
        let source = markup.into();
        let mut doc = Document {
            source,
            segments: Vec::with_capacity(64),
            attributes: Vec::with_capacity(32),
            first_top: None,
            last_top: None,
            root: None,
        };
        doc.build();
        doc
    }

    fn build(&mut self) {
        // The source is moved out during tokenization to satisfy the borrow
        // checker, then restored; it is not mutated.
        let source = std::mem::take(&mut self.source);
        let mut stack: Vec<SegmentId> = Vec::new();

        for tag in Tokenizer::new(&source) {
            match tag {
                Tag::Start {
                    name,
                    attrs,
                    begin,
                    end,
                    self_closing,
                } => {
                    // Optional end tags: <li> terminates an open <li>, etc.
                    while let Some(&top) = stack.last() {
                        if super::implies_end_of(&self.segments[top as usize].name, name) {
                            stack.pop();
                            self.close_segment(top, begin as u32, begin as u32);
                        } else {
                            break;
                        }
                    }

                    let attr_start = self.attributes.len() as u32;
                    for attr in &attrs {
                        self.attributes.push(AttributeEntry {
                            name: attr.name.into(),
                            value: entities::decode(attr.value).into_owned().into_boxed_str(),
                        });
                    }

                    let id = self.push_segment(Segment {
                        tag_type: TagType::Normal,
                        name: name.into(),
                        span: (begin as u32, end as u32),
                        content: (end as u32, end as u32),
                        parent: stack.last().copied(),
                        first_child: None,
                        last_child: None,
                        prev_sibling: None,
                        next_sibling: None,
                        attr_start,
                        attr_count: attrs.len().min(u16::MAX as usize) as u16,
                        depth: stack.len().min(u16::MAX as usize) as u16,
                    });

                    if !self_closing && !super::is_void_element(name) {
                        stack.push(id);
                    }
                }

                Tag::End { name, begin, end } => {
                    let matched = stack
                        .iter()
                        .rposition(|&id| self.segments[id as usize].name.eq_ignore_ascii_case(name));
                    if let Some(pos) = matched {
                        // Elements left open above the match close where the
                        // end tag begins
                        while stack.len() > pos + 1 {
                            if let Some(open) = stack.pop() {
                                self.close_segment(open, begin as u32, begin as u32);
                            }
                        }
                        if let Some(open) = stack.pop() {
                            self.close_segment(open, begin as u32, end as u32);
                        }
                    }
                    // Stray end tags are ignored
                }

                Tag::Comment {
                    begin,
                    end,
                    content,
                } => {
                    self.push_leaf(TagType::Comment, "", begin, end, content, &stack);
                }

                Tag::Pi {
                    target,
                    begin,
                    end,
                    content,
                    declaration,
                } => {
                    let tag_type = if declaration {
                        TagType::XmlDeclaration
                    } else {
                        TagType::XmlProcessingInstruction
                    };
                    self.push_leaf(tag_type, target, begin, end, content, &stack);
                }

                Tag::Doctype {
                    begin,
                    end,
                    content,
                } => {
                    self.push_leaf(TagType::Doctype, "", begin, end, content, &stack);
                }

                Tag::MarkupDecl { begin, end } => {
                    self.push_leaf(TagType::MarkupDeclaration, "", begin, end, (end, end), &stack);
                }
            }
        }

        // Whatever is still open closes at end of input
        let len = source.len() as u32;
        while let Some(open) = stack.pop() {
            self.close_segment(open, len, len);
        }

        self.source = source;
        self.root = self.find_root();
    }

    /// Close an open element: content ends where the end tag (or the input)
    /// begins, the span where the end tag ends.
    fn close_segment(&mut self, id: SegmentId, content_end: u32, span_end: u32) {
        let seg = &mut self.segments[id as usize];
        seg.content.1 = content_end.max(seg.content.0);
        seg.span.1 = span_end.max(seg.span.1);
    }

    fn push_leaf(
        &mut self,
        tag_type: TagType,
        name: &str,
        begin: usize,
        end: usize,
        content: (usize, usize),
        stack: &[SegmentId],
    ) {
        self.push_segment(Segment {
            tag_type,
            name: name.into(),
            span: (begin as u32, end as u32),
            content: (content.0 as u32, content.1 as u32),
            parent: stack.last().copied(),
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            attr_start: self.attributes.len() as u32,
            attr_count: 0,
            depth: stack.len().min(u16::MAX as usize) as u16,
        });
    }

    /// Add a segment to the arena and link it to its parent or the top level
    fn push_segment(&mut self, segment: Segment) -> SegmentId {
        let id = self.segments.len() as SegmentId;
        let parent = segment.parent;
        self.segments.push(segment);

        match parent {
            Some(parent_id) => {
                let last = self.segments[parent_id as usize].last_child;
                if let Some(last_id) = last {
                    self.segments[id as usize].prev_sibling = Some(last_id);
                    self.segments[last_id as usize].next_sibling = Some(id);
                } else {
                    self.segments[parent_id as usize].first_child = Some(id);
                }
                self.segments[parent_id as usize].last_child = Some(id);
            }
            None => {
                if let Some(last_id) = self.last_top {
                    self.segments[id as usize].prev_sibling = Some(last_id);
                    self.segments[last_id as usize].next_sibling = Some(id);
                } else {
                    self.first_top = Some(id);
                }
                self.last_top = Some(id);
            }
        }

        id
    }

    /// The root element: the first element named `html`, or the first
    /// top-level element when no `html` tag exists.
    fn find_root(&self) -> Option<SegmentId> {
        let html = self
            .segments
            .iter()
            .position(|s| s.is_normal() && s.name.eq_ignore_ascii_case("html"))
            .map(|i| i as SegmentId);
        html.or_else(|| {
            self.segments
                .iter()
                .position(|s| s.is_normal() && s.parent.is_none())
                .map(|i| i as SegmentId)
        })
    }

    /// Get the original source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get a segment by id
    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id as usize)
    }

    /// Get total number of segments
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Get a segment's tag type
    pub fn tag_type(&self, id: SegmentId) -> Option<TagType> {
        self.segment(id).map(|s| s.tag_type)
    }

    /// Get a segment's name ("" for unnamed segments or invalid ids)
    pub fn name(&self, id: SegmentId) -> &str {
        self.segment(id).map(|s| &*s.name).unwrap_or("")
    }

    /// Raw content between a segment's delimiters
    pub fn content_str(&self, id: SegmentId) -> &str {
        match self.segment(id) {
            Some(seg) => &self.source[seg.content.0 as usize..seg.content.1 as usize],
            None => "",
        }
    }

    /// Get the root element id
    pub fn root_element(&self) -> Option<SegmentId> {
        self.root
    }

    /// Get attributes for a segment
    pub fn attributes(&self, id: SegmentId) -> &[AttributeEntry] {
        match self.segment(id) {
            Some(seg) => {
                let start = seg.attr_start as usize;
                let end = start + seg.attr_count as usize;
                if end <= self.attributes.len() {
                    &self.attributes[start..end]
                } else {
                    &[]
                }
            }
            None => &[],
        }
    }

    /// Get an attribute value by exact name (first match)
    pub fn attribute(&self, id: SegmentId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|attr| &*attr.name == name)
            .map(|attr| &*attr.value)
    }

    /// Iterate over the child segments of a segment
    pub fn children(&self, id: SegmentId) -> ChildIter<'_> {
        let first = self.segment(id).and_then(|s| s.first_child);
        ChildIter { doc: self, next: first }
    }

    /// Iterate over all descendant segments, depth first in document order
    pub fn descendants(&self, id: SegmentId) -> DescendantIter<'_> {
        let mut stack = Vec::new();
        if let Some(seg) = self.segment(id) {
            let mut child = seg.last_child;
            while let Some(cid) = child {
                stack.push(cid);
                child = self.segment(cid).and_then(|s| s.prev_sibling);
            }
        }
        DescendantIter { doc: self, stack }
    }

    /// Exclusive upper bound of a segment's descendant id range.
    ///
    /// Ids are assigned in document order, so every descendant of `id` falls
    /// in `id+1..subtree_end(id)`.
    pub fn subtree_end(&self, id: SegmentId) -> SegmentId {
        let mut current = id;
        loop {
            match self.segment(current) {
                Some(seg) => {
                    if let Some(next) = seg.next_sibling {
                        return next;
                    }
                    match seg.parent {
                        Some(parent) => current = parent,
                        None => return self.segments.len() as SegmentId,
                    }
                }
                None => return self.segments.len() as SegmentId,
            }
        }
    }

    /// Text directly owned by an element: the character data between its
    /// child segments, character references resolved. Descendant elements
    /// contribute nothing.
    pub fn direct_text(&self, id: SegmentId) -> String {
        let seg = match self.segment(id) {
            Some(s) => s,
            None => return String::new(),
        };

        let mut out = String::new();
        let mut cursor = seg.content.0 as usize;
        let end = seg.content.1 as usize;

        let mut child = seg.first_child;
        while let Some(cid) = child {
            let c = &self.segments[cid as usize];
            let child_begin = c.span.0 as usize;
            let child_end = c.span.1 as usize;
            if child_begin > cursor {
                out.push_str(&entities::decode(&self.source[cursor..child_begin.min(end)]));
            }
            cursor = cursor.max(child_end);
            child = c.next_sibling;
        }
        if end > cursor {
            out.push_str(&entities::decode(&self.source[cursor..end]));
        }
        out
    }

    /// All text contained in an element with markup removed: direct text
    /// plus the extracted text of descendant elements, in document order.
    /// Comment and declaration contents are dropped, as are the contents of
    /// raw-text elements (script/style) below the starting element.
    pub fn extract_text(&self, id: SegmentId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: SegmentId, out: &mut String) {
        let seg = match self.segment(id) {
            Some(s) => s,
            None => return,
        };

        let mut cursor = seg.content.0 as usize;
        let end = seg.content.1 as usize;

        let mut child = seg.first_child;
        while let Some(cid) = child {
            let c = &self.segments[cid as usize];
            let child_begin = c.span.0 as usize;
            let child_end = c.span.1 as usize;
            if child_begin > cursor {
                out.push_str(&entities::decode(&self.source[cursor..child_begin.min(end)]));
            }
            if c.is_normal() && !super::is_raw_text_element(&c.name) {
                self.collect_text(cid, out);
            }
            cursor = cursor.max(child_end);
            child = c.next_sibling;
        }
        if end > cursor {
            out.push_str(&entities::decode(&self.source[cursor..end]));
        }
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("segments", &self.segments.len())
            .field("attributes", &self.attributes.len())
            .field("root", &self.root)
            .finish()
    }
}

/// Iterator over child segments
pub struct ChildIter<'d> {
    doc: &'d Document,
    next: Option<SegmentId>,
}

impl<'d> Iterator for ChildIter<'d> {
    type Item = SegmentId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.segment(current).and_then(|s| s.next_sibling);
        Some(current)
    }
}

/// Iterator over descendant segments (depth-first)
pub struct DescendantIter<'d> {
    doc: &'d Document,
    stack: Vec<SegmentId>,
}

impl<'d> Iterator for DescendantIter<'d> {
    type Item = SegmentId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;

        // Push children in reverse so the first child is processed first
        if let Some(seg) = self.doc.segment(current) {
            let mut child = seg.last_child;
            while let Some(cid) = child {
                self.stack.push(cid);
                child = self.doc.segment(cid).and_then(|s| s.prev_sibling);
            }
        }

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let doc = Document::parse("<html><body><p>x</p></body></html>");
        let root = doc.root_element().expect("root element");
        assert_eq!(doc.name(root), "html");

        let children: Vec<_> = doc.children(root).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(doc.name(children[0]), "body");

        let descendants: Vec<_> = doc.descendants(root).collect();
        assert_eq!(descendants.len(), 2); // body, p
    }

    #[test]
    fn test_root_prefers_html_tag() {
        let doc = Document::parse("<!DOCTYPE html><html lang=\"en\"></html>");
        let root = doc.root_element().expect("root element");
        assert_eq!(doc.name(root), "html");
        assert_eq!(doc.attribute(root, "lang"), Some("en"));
    }

    #[test]
    fn test_root_fallback_without_html() {
        let doc = Document::parse("<div><span>x</span></div>");
        let root = doc.root_element().expect("root element");
        assert_eq!(doc.name(root), "div");
    }

    #[test]
    fn test_void_elements_take_no_children() {
        let doc = Document::parse("<p><br><em>x</em></p>");
        let root = doc.root_element().expect("root element");
        let children: Vec<_> = doc.children(root).collect();
        assert_eq!(children.len(), 2);
        assert_eq!(doc.name(children[0]), "br");
        assert_eq!(doc.name(children[1]), "em");
        assert!(doc.segment(children[0]).expect("br").first_child.is_none());
    }

    #[test]
    fn test_implicit_close() {
        // <li> elements never see their end tags
        let doc = Document::parse("<ul><li>one<li>two</ul>");
        let root = doc.root_element().expect("root element");
        let items: Vec<_> = doc.children(root).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(doc.direct_text(items[0]), "one");
        assert_eq!(doc.direct_text(items[1]), "two");
    }

    #[test]
    fn test_unclosed_at_eof() {
        let doc = Document::parse("<div><p>dangling");
        let root = doc.root_element().expect("root element");
        let children: Vec<_> = doc.children(root).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(doc.direct_text(children[0]), "dangling");
    }

    #[test]
    fn test_stray_end_tag_ignored() {
        let doc = Document::parse("<div></p><span>x</span></div>");
        let root = doc.root_element().expect("root element");
        let children: Vec<_> = doc.children(root).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(doc.name(children[0]), "span");
    }

    #[test]
    fn test_attribute_values_decoded() {
        let doc = Document::parse(r#"<a title="Tom &amp; Jerry">x</a>"#);
        let root = doc.root_element().expect("root element");
        assert_eq!(doc.attribute(root, "title"), Some("Tom & Jerry"));
    }

    #[test]
    fn test_duplicate_attributes_kept() {
        let doc = Document::parse(r#"<p class="a" class="b">x</p>"#);
        let root = doc.root_element().expect("root element");
        assert_eq!(doc.attributes(root).len(), 2);
        // Direct lookup returns the first
        assert_eq!(doc.attribute(root, "class"), Some("a"));
    }

    #[test]
    fn test_direct_vs_extracted_text() {
        let doc = Document::parse("<p>Hi <b>there</b></p>");
        let root = doc.root_element().expect("root element");
        assert_eq!(doc.direct_text(root), "Hi ");
        assert_eq!(doc.extract_text(root), "Hi there");
    }

    #[test]
    fn test_text_skips_comments() {
        let doc = Document::parse("<p>a<!-- hidden -->b</p>");
        let root = doc.root_element().expect("root element");
        assert_eq!(doc.direct_text(root), "ab");
        assert_eq!(doc.extract_text(root), "ab");
    }

    #[test]
    fn test_extract_skips_script() {
        let doc = Document::parse("<div>x<script>var a = 1;</script>y</div>");
        let root = doc.root_element().expect("root element");
        assert_eq!(doc.extract_text(root), "xy");
    }

    #[test]
    fn test_character_references_in_text() {
        let doc = Document::parse("<p>fish &amp; chips &#33;</p>");
        let root = doc.root_element().expect("root element");
        assert_eq!(doc.direct_text(root), "fish & chips !");
    }

    #[test]
    fn test_subtree_end() {
        let doc = Document::parse("<html><a><b></b></a><c></c></html>");
        // ids: html=0, a=1, b=2, c=3
        assert_eq!(doc.subtree_end(1), 3); // a's subtree is {1, 2}
        assert_eq!(doc.subtree_end(2), 3);
        assert_eq!(doc.subtree_end(0), 4);
        assert_eq!(doc.subtree_end(3), 4);
    }

    #[test]
    fn test_comment_and_pi_segments() {
        let doc = Document::parse("<html><!-- note --><?php echo; ?></html>");
        let root = doc.root_element().expect("root element");
        let children: Vec<_> = doc.children(root).collect();
        assert_eq!(children.len(), 2);
        assert_eq!(doc.tag_type(children[0]), Some(TagType::Comment));
        assert_eq!(doc.content_str(children[0]), " note ");
        assert_eq!(
            doc.tag_type(children[1]),
            Some(TagType::XmlProcessingInstruction)
        );
        assert_eq!(doc.name(children[1]), "php");
    }

    #[test]
    fn test_case_insensitive_end_tags() {
        let doc = Document::parse("<DIV>x</div>");
        let root = doc.root_element().expect("root element");
        assert_eq!(doc.name(root), "DIV");
        assert_eq!(doc.direct_text(root), "x");
    }
}
