//! XPath Axes
//!
//! All 13 XPath 1.0 axes, every one derived from the tree model adapter's
//! primitives (child, parent, attribute). Nodes the adapter gives no parent
//! to - attributes, comments, processing instructions, text - therefore
//! have empty ancestor, sibling and preceding/following axes.

use super::compiler::CompiledNodeTest;
use super::parser::Axis;
use crate::html::Document;
use crate::navigator::{HtmlNavigator, Kind, XNode};

/// Navigate along an axis from a context node
pub fn navigate(nav: &HtmlNavigator, doc: &Document, context: &XNode, axis: Axis) -> Vec<XNode> {
    match axis {
        Axis::Child => nav.child_axis(doc, context),
        Axis::Descendant => descendant_axis(nav, doc, context),
        Axis::DescendantOrSelf => descendant_or_self_axis(nav, doc, context),
        Axis::Parent => parent_axis(nav, doc, context),
        Axis::Ancestor => ancestor_axis(nav, doc, context),
        Axis::AncestorOrSelf => ancestor_or_self_axis(nav, doc, context),
        Axis::FollowingSibling => following_sibling_axis(nav, doc, context),
        Axis::PrecedingSibling => preceding_sibling_axis(nav, doc, context),
        Axis::Following => following_axis(nav, doc, context),
        Axis::Preceding => preceding_axis(nav, doc, context),
        Axis::Self_ => self_axis(context),
        Axis::Attribute => nav.attribute_axis(doc, context),
        Axis::Namespace => nav.namespace_axis(doc, context),
    }
}

/// descendant:: axis - children, grandchildren, etc., document order
fn descendant_axis(nav: &HtmlNavigator, doc: &Document, context: &XNode) -> Vec<XNode> {
    let mut result = Vec::new();
    collect_descendants(nav, doc, context, &mut result);
    result
}

fn collect_descendants(nav: &HtmlNavigator, doc: &Document, node: &XNode, result: &mut Vec<XNode>) {
    for child in nav.child_axis(doc, node) {
        result.push(child.clone());
        if matches!(child, XNode::Segment(_)) {
            collect_descendants(nav, doc, &child, result);
        }
    }
}

/// descendant-or-self:: axis - context node plus all descendants
fn descendant_or_self_axis(nav: &HtmlNavigator, doc: &Document, context: &XNode) -> Vec<XNode> {
    let mut result = vec![context.clone()];
    collect_descendants(nav, doc, context, &mut result);
    result
}

/// parent:: axis - parent node (at most one; elements only)
fn parent_axis(nav: &HtmlNavigator, doc: &Document, context: &XNode) -> Vec<XNode> {
    nav.parent(doc, context).into_iter().collect()
}

/// ancestor:: axis - parent, grandparent, etc.
fn ancestor_axis(nav: &HtmlNavigator, doc: &Document, context: &XNode) -> Vec<XNode> {
    let mut result = Vec::new();
    let mut current = context.clone();

    while let Some(parent) = nav.parent(doc, &current) {
        result.push(parent.clone());
        current = parent;
    }

    result
}

/// ancestor-or-self:: axis - context node plus all ancestors
fn ancestor_or_self_axis(nav: &HtmlNavigator, doc: &Document, context: &XNode) -> Vec<XNode> {
    let mut result = vec![context.clone()];
    result.extend(ancestor_axis(nav, doc, context));
    result
}

/// Siblings are read off the parent's child axis; only nodes with a
/// navigator parent have any.
fn siblings(nav: &HtmlNavigator, doc: &Document, context: &XNode) -> Option<(Vec<XNode>, usize)> {
    let parent = nav.parent(doc, context)?;
    let children = nav.child_axis(doc, &parent);
    let index = children.iter().position(|c| c == context)?;
    Some((children, index))
}

/// following-sibling:: axis
fn following_sibling_axis(nav: &HtmlNavigator, doc: &Document, context: &XNode) -> Vec<XNode> {
    match siblings(nav, doc, context) {
        Some((mut children, index)) => children.split_off(index + 1),
        None => Vec::new(),
    }
}

/// preceding-sibling:: axis (reverse document order)
fn preceding_sibling_axis(nav: &HtmlNavigator, doc: &Document, context: &XNode) -> Vec<XNode> {
    match siblings(nav, doc, context) {
        Some((children, index)) => children[..index].iter().rev().cloned().collect(),
        None => Vec::new(),
    }
}

/// following:: axis - nodes after the context in document order, minus
/// descendants
fn following_axis(nav: &HtmlNavigator, doc: &Document, context: &XNode) -> Vec<XNode> {
    let mut result = Vec::new();

    for sibling in following_sibling_axis(nav, doc, context) {
        result.push(sibling.clone());
        collect_descendants(nav, doc, &sibling, &mut result);
    }

    for ancestor in ancestor_axis(nav, doc, context) {
        for sibling in following_sibling_axis(nav, doc, &ancestor) {
            result.push(sibling.clone());
            collect_descendants(nav, doc, &sibling, &mut result);
        }
    }

    result
}

/// preceding:: axis - nodes before the context in document order, minus
/// ancestors (reverse document order)
fn preceding_axis(nav: &HtmlNavigator, doc: &Document, context: &XNode) -> Vec<XNode> {
    let root = match nav.document_root(doc) {
        Some(root) => root,
        None => return Vec::new(),
    };
    let ancestors = ancestor_or_self_axis(nav, doc, context);

    let mut result = Vec::new();
    let mut found = false;
    collect_preceding(nav, doc, &root, context, &ancestors, &mut result, &mut found);
    result.reverse();
    result
}

fn collect_preceding(
    nav: &HtmlNavigator,
    doc: &Document,
    node: &XNode,
    context: &XNode,
    ancestors: &[XNode],
    result: &mut Vec<XNode>,
    found: &mut bool,
) {
    if node == context {
        *found = true;
        return;
    }
    if *found {
        return;
    }
    if !ancestors.contains(node) {
        result.push(node.clone());
    }
    for child in nav.child_axis(doc, node) {
        collect_preceding(nav, doc, &child, context, ancestors, result, found);
        if *found {
            return;
        }
    }
}

/// self:: axis - just the context node
fn self_axis(context: &XNode) -> Vec<XNode> {
    vec![context.clone()]
}

/// Check if a node matches a node test
pub fn matches_node_test(
    nav: &HtmlNavigator,
    doc: &Document,
    node: &XNode,
    node_test: &CompiledNodeTest,
) -> bool {
    let kind = nav.classify(doc, node);

    match node_test {
        CompiledNodeTest::Any => kind == Kind::Element || kind == Kind::Attribute,
        CompiledNodeTest::Name(name) => match kind {
            Kind::Element => nav.name(doc, node).eq_ignore_ascii_case(name),
            Kind::Attribute => nav.name(doc, node) == name.as_str(),
            _ => false,
        },
        CompiledNodeTest::Node => kind != Kind::None,
        CompiledNodeTest::Text => kind == Kind::Text,
        CompiledNodeTest::Comment => kind == Kind::Comment,
        CompiledNodeTest::ProcessingInstruction(target) => {
            if kind != Kind::ProcessingInstruction {
                return false;
            }
            match (target, node) {
                (Some(expected), XNode::Segment(id)) => doc.name(*id) == expected.as_str(),
                _ => true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str =
        "<html><body><ul><li>1</li><li>2</li><li>3</li></ul><p>end</p></body></html>";

    fn setup() -> (Document, HtmlNavigator) {
        (Document::parse(PAGE), HtmlNavigator)
    }

    fn element(doc: &Document, nav: &HtmlNavigator, name: &str) -> XNode {
        let root = nav.document_root(doc).expect("root");
        nav.named_child_axis(doc, &root, name)
            .into_iter()
            .next()
            .unwrap_or_else(|| panic!("no <{}>", name))
    }

    #[test]
    fn test_child_axis() {
        let (doc, nav) = setup();
        let ul = element(&doc, &nav, "ul");
        let children = navigate(&nav, &doc, &ul, Axis::Child);
        // Three <li> plus the synthesized text node
        assert_eq!(children.len(), 4);
    }

    #[test]
    fn test_descendant_axis() {
        let (doc, nav) = setup();
        let body = element(&doc, &nav, "body");
        let descendants = navigate(&nav, &doc, &body, Axis::Descendant);
        let elements = descendants
            .iter()
            .filter(|n| nav.is_element(&doc, n))
            .count();
        assert_eq!(elements, 5); // ul, li x3, p
    }

    #[test]
    fn test_ancestor_axis() {
        let (doc, nav) = setup();
        let ul = element(&doc, &nav, "ul");
        let lis = nav.named_child_axis(&doc, &ul, "li");
        let ancestors = navigate(&nav, &doc, &lis[0], Axis::Ancestor);
        assert_eq!(ancestors.len(), 3); // ul, body, html
    }

    #[test]
    fn test_sibling_axes() {
        let (doc, nav) = setup();
        let ul = element(&doc, &nav, "ul");
        let lis = nav.named_child_axis(&doc, &ul, "li");

        let following = navigate(&nav, &doc, &lis[0], Axis::FollowingSibling);
        // li, li, plus the parent's trailing text node
        assert_eq!(following.len(), 3);
        assert_eq!(following[0], lis[1]);

        let preceding = navigate(&nav, &doc, &lis[2], Axis::PrecedingSibling);
        assert_eq!(preceding.len(), 2);
        assert_eq!(preceding[0], lis[1]); // nearest first
    }

    #[test]
    fn test_following_axis_crosses_parents() {
        let (doc, nav) = setup();
        let ul = element(&doc, &nav, "ul");
        let lis = nav.named_child_axis(&doc, &ul, "li");
        let following = navigate(&nav, &doc, &lis[2], Axis::Following);
        let p = element(&doc, &nav, "p");
        assert!(following.contains(&p));
    }

    #[test]
    fn test_preceding_axis_excludes_ancestors() {
        let (doc, nav) = setup();
        let p = element(&doc, &nav, "p");
        let preceding = navigate(&nav, &doc, &p, Axis::Preceding);
        let body = element(&doc, &nav, "body");
        let ul = element(&doc, &nav, "ul");
        assert!(!preceding.contains(&body));
        assert!(preceding.contains(&ul));
    }

    #[test]
    fn test_attribute_and_namespace_axes() {
        let (doc, nav) = setup();
        let p = element(&doc, &nav, "p");
        assert!(navigate(&nav, &doc, &p, Axis::Attribute).is_empty());
        assert!(navigate(&nav, &doc, &p, Axis::Namespace).is_empty());
    }

    #[test]
    fn test_sibling_axes_empty_without_parent() {
        let (doc, nav) = setup();
        let text = XNode::text("loose");
        assert!(navigate(&nav, &doc, &text, Axis::FollowingSibling).is_empty());
        assert!(navigate(&nav, &doc, &text, Axis::Ancestor).is_empty());
    }

    #[test]
    fn test_node_tests() {
        let (doc, nav) = setup();
        let ul = element(&doc, &nav, "ul");
        assert!(matches_node_test(
            &nav,
            &doc,
            &ul,
            &CompiledNodeTest::Name("UL".to_string())
        ));
        assert!(!matches_node_test(
            &nav,
            &doc,
            &ul,
            &CompiledNodeTest::Text
        ));
        assert!(matches_node_test(&nav, &doc, &ul, &CompiledNodeTest::Node));
        assert!(matches_node_test(
            &nav,
            &doc,
            &XNode::text("x"),
            &CompiledNodeTest::Text
        ));
    }
}
