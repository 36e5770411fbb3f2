//! HTML Parsing - tag-soup tokenizer and arena document
//!
//! Models markup the way a lightweight HTML indexer does:
//! - The arena holds tagged segments only (elements, comments, processing
//!   instructions, declarations); text is never a tree node and stays in the
//!   source buffer, extracted on demand.
//! - Parsing is lenient: unclosed elements are closed by their parent or end
//!   of input, stray end tags are ignored, void elements never open a scope,
//!   and script/style contents are treated as raw text.

pub mod document;
pub mod tokenizer;

pub use document::{AttributeEntry, Document, Segment, SegmentId};

/// Markup classification assigned to every parsed tag segment.
///
/// Only `Normal` segments form the element hierarchy; the others are leaf
/// segments recorded where they occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagType {
    /// Ordinary start tag: `<div ...>`
    Normal,
    /// `<!-- ... -->`
    Comment,
    /// `<?xml ... ?>`
    XmlDeclaration,
    /// `<? ... ?>` other than the XML declaration
    XmlProcessingInstruction,
    /// `<!DOCTYPE ...>`
    Doctype,
    /// Any other `<! ... >` markup (CDATA and marked sections)
    MarkupDeclaration,
}

/// Element names that never take content or an end tag.
pub(crate) fn is_void_element(name: &str) -> bool {
    const VOID: &[&str] = &[
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ];
    VOID.iter().any(|v| name.eq_ignore_ascii_case(v))
}

/// Element names whose content is raw text (no nested tags).
pub(crate) fn is_raw_text_element(name: &str) -> bool {
    name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style")
}

/// Optional end tags: does an incoming start tag terminate the open element?
///
/// Covers the common cases (`<li>` runs, table cells, `<p>` before block
/// content); everything else waits for an explicit end tag or its parent.
pub(crate) fn implies_end_of(open: &str, incoming: &str) -> bool {
    let incoming_is = |names: &[&str]| names.iter().any(|n| incoming.eq_ignore_ascii_case(n));

    if open.eq_ignore_ascii_case("li") {
        return incoming_is(&["li"]);
    }
    if open.eq_ignore_ascii_case("dt") || open.eq_ignore_ascii_case("dd") {
        return incoming_is(&["dt", "dd"]);
    }
    if open.eq_ignore_ascii_case("td") || open.eq_ignore_ascii_case("th") {
        return incoming_is(&["td", "th", "tr"]);
    }
    if open.eq_ignore_ascii_case("tr") {
        return incoming_is(&["tr"]);
    }
    if open.eq_ignore_ascii_case("option") {
        return incoming_is(&["option", "optgroup"]);
    }
    if open.eq_ignore_ascii_case("p") {
        return incoming_is(&[
            "address",
            "article",
            "aside",
            "blockquote",
            "div",
            "dl",
            "fieldset",
            "footer",
            "form",
            "h1",
            "h2",
            "h3",
            "h4",
            "h5",
            "h6",
            "header",
            "hr",
            "main",
            "nav",
            "ol",
            "p",
            "pre",
            "section",
            "table",
            "ul",
        ]);
    }
    false
}
