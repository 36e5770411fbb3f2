//! XPath Evaluation Engine
//!
//! Stack machine over compiled ops. Every axis step and every node string
//! value is resolved through the tree model adapter; the evaluator itself
//! knows nothing about HTML.

use super::axes::{matches_node_test, navigate};
use super::compiler::{CompiledExpr, Op};
use super::functions;
use super::parser::{Axis, BinaryOp};
use super::value::XPathValue;
use crate::html::Document;
use crate::navigator::{HtmlNavigator, XNode};
use std::collections::HashSet;

/// Evaluation context: the document, the adapter, and the context node-set
/// with position/size bookkeeping.
pub struct EvalContext<'a> {
    pub doc: &'a Document,
    pub nav: &'a HtmlNavigator,
    /// The node-set pushed by a context step
    pub context_nodes: Vec<XNode>,
    /// The node position-sensitive functions refer to
    pub context_node: XNode,
    pub context_position: usize,
    pub context_size: usize,
}

impl<'a> EvalContext<'a> {
    /// Context over a node-set; the first node answers position-sensitive
    /// functions at the top level.
    pub fn new(doc: &'a Document, nav: &'a HtmlNavigator, nodes: Vec<XNode>) -> Self {
        let context_node = nodes.first().cloned().unwrap_or(XNode::Document);
        let size = nodes.len().max(1);
        EvalContext {
            doc,
            nav,
            context_nodes: nodes,
            context_node,
            context_position: 1,
            context_size: size,
        }
    }

    /// The string value of a value, resolving node-sets through the adapter
    /// (first node in document order).
    pub fn string_of(&self, value: &XPathValue) -> String {
        match value {
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map(|n| self.nav.string_value(self.doc, n))
                .unwrap_or_default(),
            other => other.to_string_value(),
        }
    }

    /// The numeric value of a value, resolving node-sets through the adapter.
    pub fn number_of(&self, value: &XPathValue) -> f64 {
        match value {
            XPathValue::NodeSet(_) => {
                self.string_of(value).trim().parse().unwrap_or(f64::NAN)
            }
            other => other.to_number(),
        }
    }
}

/// Evaluate a compiled expression
pub fn evaluate_compiled(expr: &CompiledExpr, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    let mut stack: Vec<XPathValue> = Vec::new();

    for op in &expr.ops {
        match op {
            Op::Root => {
                // Absolute paths start at the document root element
                let nodes: Vec<XNode> = ctx.nav.document_root(ctx.doc).into_iter().collect();
                stack.push(XPathValue::NodeSet(nodes));
            }

            Op::Context => {
                stack.push(XPathValue::NodeSet(ctx.context_nodes.clone()));
            }

            Op::Parent => {
                let current = stack.pop().unwrap_or_else(XPathValue::empty_nodeset);
                if let XPathValue::NodeSet(nodes) = current {
                    let mut seen = HashSet::with_capacity(nodes.len());
                    let mut parents = Vec::with_capacity(nodes.len());
                    for node in &nodes {
                        if let Some(parent) = ctx.nav.parent(ctx.doc, node) {
                            if seen.insert(parent.clone()) {
                                parents.push(parent);
                            }
                        }
                    }
                    sort_document_order(ctx, &mut parents);
                    stack.push(XPathValue::NodeSet(parents));
                } else {
                    stack.push(XPathValue::empty_nodeset());
                }
            }

            Op::Navigate(axis, node_test) => {
                let current = stack.pop().unwrap_or_else(XPathValue::empty_nodeset);
                if let XPathValue::NodeSet(nodes) = current {
                    // HashSet dedup keeps repeated deep searches O(n)
                    let mut seen: HashSet<XNode> = HashSet::with_capacity(nodes.len());
                    let mut result = Vec::with_capacity(nodes.len());
                    for node in &nodes {
                        let candidates = navigate_step(ctx, node, *axis, node_test);
                        for candidate in candidates {
                            if seen.insert(candidate.clone()) {
                                result.push(candidate);
                            }
                        }
                    }
                    sort_document_order(ctx, &mut result);
                    stack.push(XPathValue::NodeSet(result));
                } else {
                    stack.push(XPathValue::empty_nodeset());
                }
            }

            Op::Predicate(pred_expr) => {
                let current = stack.pop().unwrap_or_else(XPathValue::empty_nodeset);
                if let XPathValue::NodeSet(nodes) = current {
                    let size = nodes.len();
                    let mut filtered = Vec::new();

                    for (i, node) in nodes.iter().enumerate() {
                        let pred_ctx = EvalContext {
                            doc: ctx.doc,
                            nav: ctx.nav,
                            context_nodes: vec![node.clone()],
                            context_node: node.clone(),
                            context_position: i + 1,
                            context_size: size,
                        };

                        let pred_result = evaluate_compiled(pred_expr, &pred_ctx)?;

                        let include = match pred_result {
                            XPathValue::Number(n) => (i + 1) as f64 == n,
                            other => other.to_boolean(),
                        };

                        if include {
                            filtered.push(node.clone());
                        }
                    }

                    stack.push(XPathValue::NodeSet(filtered));
                } else {
                    stack.push(XPathValue::empty_nodeset());
                }
            }

            // Fast path: [@attr = 'value'] - direct attribute lookup
            Op::PredicateAttrEq(attr_name, value) => {
                let current = stack.pop().unwrap_or_else(XPathValue::empty_nodeset);
                if let XPathValue::NodeSet(nodes) = current {
                    let filtered = nodes
                        .into_iter()
                        .filter(|node| match node {
                            XNode::Segment(id) => {
                                ctx.doc.attribute(*id, attr_name) == Some(value.as_str())
                            }
                            _ => false,
                        })
                        .collect();
                    stack.push(XPathValue::NodeSet(filtered));
                } else {
                    stack.push(XPathValue::empty_nodeset());
                }
            }

            // Fast path: [n] - position predicate
            Op::PredicatePosition(pos) => {
                let current = stack.pop().unwrap_or_else(XPathValue::empty_nodeset);
                if let XPathValue::NodeSet(nodes) = current {
                    if *pos > 0 && *pos <= nodes.len() {
                        stack.push(XPathValue::NodeSet(vec![nodes[*pos - 1].clone()]));
                    } else {
                        stack.push(XPathValue::empty_nodeset());
                    }
                } else {
                    stack.push(XPathValue::empty_nodeset());
                }
            }

            Op::Union => {
                let right = stack.pop().unwrap_or_else(XPathValue::empty_nodeset);
                let left = stack.pop().unwrap_or_else(XPathValue::empty_nodeset);

                match (left, right) {
                    (XPathValue::NodeSet(l), XPathValue::NodeSet(r)) => {
                        let mut seen: HashSet<XNode> = l.iter().cloned().collect();
                        let mut result = l;
                        result.reserve(r.len());
                        for node in r {
                            if seen.insert(node.clone()) {
                                result.push(node);
                            }
                        }
                        sort_document_order(ctx, &mut result);
                        stack.push(XPathValue::NodeSet(result));
                    }
                    _ => {
                        return Err("Union requires two node-sets".to_string());
                    }
                }
            }

            Op::Number(n) => {
                stack.push(XPathValue::Number(*n));
            }

            Op::String(s) => {
                stack.push(XPathValue::String(s.clone()));
            }

            Op::Negate => {
                let val = stack.pop().unwrap_or(XPathValue::Number(0.0));
                stack.push(XPathValue::Number(-ctx.number_of(&val)));
            }

            Op::Binary(op) => {
                let right = stack.pop().unwrap_or(XPathValue::Number(0.0));
                let left = stack.pop().unwrap_or(XPathValue::Number(0.0));

                let result = match op {
                    BinaryOp::Or => XPathValue::Boolean(left.to_boolean() || right.to_boolean()),
                    BinaryOp::And => XPathValue::Boolean(left.to_boolean() && right.to_boolean()),
                    BinaryOp::Eq => compare_values(ctx, &left, &right, |a, b| a == b),
                    BinaryOp::NotEq => compare_values(ctx, &left, &right, |a, b| a != b),
                    BinaryOp::Lt => compare_numbers(ctx, &left, &right, |a, b| a < b),
                    BinaryOp::LtEq => compare_numbers(ctx, &left, &right, |a, b| a <= b),
                    BinaryOp::Gt => compare_numbers(ctx, &left, &right, |a, b| a > b),
                    BinaryOp::GtEq => compare_numbers(ctx, &left, &right, |a, b| a >= b),
                    BinaryOp::Add => {
                        XPathValue::Number(ctx.number_of(&left) + ctx.number_of(&right))
                    }
                    BinaryOp::Sub => {
                        XPathValue::Number(ctx.number_of(&left) - ctx.number_of(&right))
                    }
                    BinaryOp::Mul => {
                        XPathValue::Number(ctx.number_of(&left) * ctx.number_of(&right))
                    }
                    BinaryOp::Div => {
                        XPathValue::Number(ctx.number_of(&left) / ctx.number_of(&right))
                    }
                    BinaryOp::Mod => {
                        XPathValue::Number(ctx.number_of(&left) % ctx.number_of(&right))
                    }
                };

                stack.push(result);
            }

            Op::Call(name, arg_count) => {
                let mut args = Vec::with_capacity(*arg_count);
                for _ in 0..*arg_count {
                    args.push(stack.pop().unwrap_or_else(XPathValue::empty_nodeset));
                }
                args.reverse();

                let result = functions::call(name, args, ctx)?;
                stack.push(result);
            }
        }
    }

    Ok(stack.pop().unwrap_or_else(XPathValue::empty_nodeset))
}

/// One axis step from one node, taking the adapter's named fast paths where
/// the test names a specific element or attribute. The named child lookup is
/// deliberately deep (all descendants), matching the adapter's contract.
fn navigate_step(
    ctx: &EvalContext<'_>,
    node: &XNode,
    axis: Axis,
    node_test: &super::compiler::CompiledNodeTest,
) -> Vec<XNode> {
    use super::compiler::CompiledNodeTest;

    match (axis, node_test) {
        (Axis::Child, CompiledNodeTest::Name(name)) => {
            ctx.nav.named_child_axis(ctx.doc, node, name)
        }
        (Axis::Attribute, CompiledNodeTest::Name(name)) => {
            ctx.nav.named_attribute_axis(ctx.doc, node, name)
        }
        _ => navigate(ctx.nav, ctx.doc, node, axis)
            .into_iter()
            .filter(|candidate| matches_node_test(ctx.nav, ctx.doc, candidate, node_test))
            .collect(),
    }
}

fn sort_document_order(ctx: &EvalContext<'_>, nodes: &mut [XNode]) {
    nodes.sort_by_key(|n| ctx.nav.document_order_key(ctx.doc, n));
}

/// Compare two XPath values for equality per XPath 1.0: node-sets compare
/// through their members' string values.
fn compare_values<F>(
    ctx: &EvalContext<'_>,
    left: &XPathValue,
    right: &XPathValue,
    cmp: F,
) -> XPathValue
where
    F: Fn(&str, &str) -> bool,
{
    match (left, right) {
        (XPathValue::NodeSet(ln), XPathValue::NodeSet(rn)) => {
            // True if any pair of string values matches
            for l in ln {
                let ls = ctx.nav.string_value(ctx.doc, l);
                for r in rn {
                    let rs = ctx.nav.string_value(ctx.doc, r);
                    if cmp(&ls, &rs) {
                        return XPathValue::Boolean(true);
                    }
                }
            }
            XPathValue::Boolean(false)
        }
        (XPathValue::NodeSet(nodes), other) | (other, XPathValue::NodeSet(nodes)) => {
            let other_str = other.to_string_value();
            for n in nodes {
                let ns = ctx.nav.string_value(ctx.doc, n);
                if cmp(&ns, &other_str) {
                    return XPathValue::Boolean(true);
                }
            }
            XPathValue::Boolean(false)
        }
        (XPathValue::Boolean(_), _) | (_, XPathValue::Boolean(_)) => XPathValue::Boolean(cmp(
            &left.to_boolean().to_string(),
            &right.to_boolean().to_string(),
        )),
        (XPathValue::Number(_), _) | (_, XPathValue::Number(_)) => {
            let ln = left.to_number();
            let rn = right.to_number();
            XPathValue::Boolean(cmp(&ln.to_string(), &rn.to_string()))
        }
        (XPathValue::String(ls), XPathValue::String(rs)) => XPathValue::Boolean(cmp(ls, rs)),
    }
}

/// Compare two values as numbers
fn compare_numbers<F>(
    ctx: &EvalContext<'_>,
    left: &XPathValue,
    right: &XPathValue,
    cmp: F,
) -> XPathValue
where
    F: Fn(f64, f64) -> bool,
{
    XPathValue::Boolean(cmp(ctx.number_of(left), ctx.number_of(right)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xpath::compiler::compile;

    fn eval(doc: &Document, xpath: &str) -> XPathValue {
        let nav = HtmlNavigator;
        let compiled = compile(xpath).expect("compile");
        let nodes = nav.document_root(doc).into_iter().collect();
        let ctx = EvalContext::new(doc, &nav, nodes);
        evaluate_compiled(&compiled, &ctx).expect("evaluate")
    }

    #[test]
    fn test_descendant_search() {
        let doc = Document::parse("<html><body><p>a</p><p>b</p></body></html>");
        let result = eval(&doc, "//p");
        assert_eq!(result.as_nodeset().map(Vec::len), Some(2));
    }

    #[test]
    fn test_named_child_step_is_deep() {
        // <b> is not a direct child of body, but the named step still finds it
        let doc = Document::parse("<html><body><p><b>x</b></p></body></html>");
        let result = eval(&doc, "//body/b");
        assert_eq!(result.as_nodeset().map(Vec::len), Some(1));
    }

    #[test]
    fn test_position_predicate() {
        let doc = Document::parse("<html><ul><li>a</li><li>b</li><li>c</li></ul></html>");
        let result = eval(&doc, "//ul/li[2]");
        let nodes = result.as_nodeset().expect("node-set");
        assert_eq!(nodes.len(), 1);
        let nav = HtmlNavigator;
        assert_eq!(nav.string_value(&doc, &nodes[0]), "b");
    }

    #[test]
    fn test_attribute_predicate() {
        let doc = Document::parse(r#"<html><p id="x">1</p><p id="y">2</p></html>"#);
        let result = eval(&doc, "//p[@id='y']");
        let nodes = result.as_nodeset().expect("node-set");
        assert_eq!(nodes.len(), 1);
        let nav = HtmlNavigator;
        assert_eq!(nav.string_value(&doc, &nodes[0]), "2");
    }

    #[test]
    fn test_attribute_step_yields_attribute_nodes() {
        let doc = Document::parse(r#"<html><a href="x.html">link</a></html>"#);
        let result = eval(&doc, "//a/@href");
        let nodes = result.as_nodeset().expect("node-set");
        assert_eq!(nodes.len(), 1);
        let nav = HtmlNavigator;
        assert_eq!(nav.string_value(&doc, &nodes[0]), "x.html");
    }

    #[test]
    fn test_count_function() {
        let doc = Document::parse("<html><ul><li>a</li><li>b</li><li>c</li></ul></html>");
        let result = eval(&doc, "count(//li)");
        assert_eq!(result.to_number(), 3.0);
    }

    #[test]
    fn test_union_dedups_and_orders() {
        let doc = Document::parse("<html><a>1</a><b>2</b></html>");
        let result = eval(&doc, "//b | //a | //a");
        let nodes = result.as_nodeset().expect("node-set");
        assert_eq!(nodes.len(), 2);
        let nav = HtmlNavigator;
        assert_eq!(nav.name(&doc, &nodes[0]), "a");
        assert_eq!(nav.name(&doc, &nodes[1]), "b");
    }

    #[test]
    fn test_text_node_test() {
        let doc = Document::parse("<html><p>Hi <b>there</b></p></html>");
        let result = eval(&doc, "//p/text()");
        let nodes = result.as_nodeset().expect("node-set");
        assert_eq!(nodes.len(), 1);
        let nav = HtmlNavigator;
        // The synthesized text node carries the direct runs only
        assert_eq!(nav.string_value(&doc, &nodes[0]), "Hi ");
    }

    #[test]
    fn test_comment_node_test() {
        let doc = Document::parse("<html><body><!-- note --><p>x</p></body></html>");
        let result = eval(&doc, "//comment()");
        let nodes = result.as_nodeset().expect("node-set");
        assert_eq!(nodes.len(), 1);
        let nav = HtmlNavigator;
        assert_eq!(nav.string_value(&doc, &nodes[0]), " note ");
    }

    #[test]
    fn test_node_set_comparison_uses_string_values() {
        let doc = Document::parse("<html><p>yes</p><p>no</p></html>");
        let result = eval(&doc, "//p[. = 'yes']");
        assert_eq!(result.as_nodeset().map(Vec::len), Some(1));
    }

    #[test]
    fn test_parent_step() {
        let doc = Document::parse("<html><body><p>x</p></body></html>");
        let result = eval(&doc, "//p/..");
        let nodes = result.as_nodeset().expect("node-set");
        assert_eq!(nodes.len(), 1);
        let nav = HtmlNavigator;
        assert_eq!(nav.name(&doc, &nodes[0]), "body");
    }

    #[test]
    fn test_arithmetic() {
        let doc = Document::parse("<html/>");
        assert_eq!(eval(&doc, "1 + 2 * 3").to_number(), 7.0);
        assert_eq!(eval(&doc, "(1 + 2) * 3").to_number(), 9.0);
        assert_eq!(eval(&doc, "10 mod 3").to_number(), 1.0);
        assert_eq!(eval(&doc, "-2 + 5").to_number(), 3.0);
    }

    #[test]
    fn test_union_type_error() {
        let doc = Document::parse("<html/>");
        let nav = HtmlNavigator;
        let compiled = compile("1 | 2").expect("compile");
        let ctx = EvalContext::new(&doc, &nav, vec![]);
        assert!(evaluate_compiled(&compiled, &ctx).is_err());
    }
}
