//! XPath 1.0 Functions
//!
//! The core function library:
//!
//! Node Set Functions:
//! - position(), last(), count(), id(), local-name(), namespace-uri(), name()
//!
//! String Functions:
//! - string(), concat(), starts-with(), contains(), substring(),
//!   substring-before(), substring-after(), string-length(),
//!   normalize-space(), translate()
//!
//! Boolean Functions:
//! - boolean(), not(), true(), false(), lang()
//!
//! Number Functions:
//! - number(), sum(), floor(), ceiling(), round()

use super::eval::EvalContext;
use super::value::XPathValue;
use crate::navigator::XNode;
use std::collections::HashSet;

/// Evaluate a function call
pub fn call(
    name: &str,
    args: Vec<XPathValue>,
    ctx: &EvalContext<'_>,
) -> Result<XPathValue, String> {
    match name {
        // Node Set Functions
        "position" => Ok(XPathValue::Number(ctx.context_position as f64)),
        "last" => Ok(XPathValue::Number(ctx.context_size as f64)),
        "count" => fn_count(args),
        "id" => fn_id(args, ctx),
        "local-name" => fn_name(args, ctx),
        "namespace-uri" => fn_namespace_uri(args),
        "name" => fn_name(args, ctx),

        // String Functions
        "string" => fn_string(args, ctx),
        "concat" => fn_concat(args, ctx),
        "starts-with" => fn_starts_with(args, ctx),
        "contains" => fn_contains(args, ctx),
        "substring" => fn_substring(args, ctx),
        "substring-before" => fn_substring_before(args, ctx),
        "substring-after" => fn_substring_after(args, ctx),
        "string-length" => fn_string_length(args, ctx),
        "normalize-space" => fn_normalize_space(args, ctx),
        "translate" => fn_translate(args, ctx),

        // Boolean Functions
        "boolean" => fn_boolean(args),
        "not" => fn_not(args),
        "true" => Ok(XPathValue::Boolean(true)),
        "false" => Ok(XPathValue::Boolean(false)),
        "lang" => fn_lang(args, ctx),

        // Number Functions
        "number" => fn_number(args, ctx),
        "sum" => fn_sum(args, ctx),
        "floor" => fn_floor(args, ctx),
        "ceiling" => fn_ceiling(args, ctx),
        "round" => fn_round(args, ctx),

        _ => Err(format!("Unknown function: {}", name)),
    }
}

// Node Set Functions

fn fn_count(args: Vec<XPathValue>) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("count() requires exactly 1 argument".to_string());
    }
    match &args[0] {
        XPathValue::NodeSet(nodes) => Ok(XPathValue::Number(nodes.len() as f64)),
        _ => Err("count() argument must be a node-set".to_string()),
    }
}

/// id() resolves whitespace-separated tokens against the `id` attributes of
/// the document's elements. Duplicate ids all match.
fn fn_id(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("id() requires exactly 1 argument".to_string());
    }

    let mut tokens: Vec<String> = Vec::new();
    match &args[0] {
        XPathValue::NodeSet(nodes) => {
            for node in nodes {
                let value = ctx.nav.string_value(ctx.doc, node);
                tokens.extend(value.split_whitespace().map(str::to_string));
            }
        }
        other => {
            tokens.extend(other.to_string_value().split_whitespace().map(str::to_string));
        }
    }

    let root = match ctx.nav.document_root(ctx.doc) {
        Some(root) => root,
        None => return Ok(XPathValue::empty_nodeset()),
    };

    let mut seen: HashSet<XNode> = HashSet::new();
    let mut result: Vec<XNode> = Vec::new();
    for token in &tokens {
        for node in ctx.nav.elements_by_id(ctx.doc, &root, token) {
            if seen.insert(node.clone()) {
                result.push(node);
            }
        }
    }
    result.sort_by_key(|n| ctx.nav.document_order_key(ctx.doc, n));
    Ok(XPathValue::NodeSet(result))
}

/// name() and local-name() coincide: there are no prefixes to strip.
fn fn_name(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    let node = if args.is_empty() {
        ctx.context_node.clone()
    } else {
        match &args[0] {
            XPathValue::NodeSet(nodes) if !nodes.is_empty() => nodes[0].clone(),
            XPathValue::NodeSet(_) => return Ok(XPathValue::String(String::new())),
            _ => return Err("name() argument must be a node-set".to_string()),
        }
    };

    let name = ctx.nav.name(ctx.doc, &node);
    Ok(XPathValue::String(name.to_string()))
}

fn fn_namespace_uri(args: Vec<XPathValue>) -> Result<XPathValue, String> {
    match args.first() {
        None | Some(XPathValue::NodeSet(_)) => Ok(XPathValue::String(String::new())),
        _ => Err("namespace-uri() argument must be a node-set".to_string()),
    }
}

// String Functions

fn fn_string(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    let value = if args.is_empty() {
        ctx.nav.string_value(ctx.doc, &ctx.context_node)
    } else {
        ctx.string_of(&args[0])
    };
    Ok(XPathValue::String(value))
}

fn fn_concat(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    if args.len() < 2 {
        return Err("concat() requires at least 2 arguments".to_string());
    }
    let result: String = args.iter().map(|a| ctx.string_of(a)).collect();
    Ok(XPathValue::String(result))
}

fn fn_starts_with(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    if args.len() != 2 {
        return Err("starts-with() requires exactly 2 arguments".to_string());
    }
    let s = ctx.string_of(&args[0]);
    let prefix = ctx.string_of(&args[1]);
    Ok(XPathValue::Boolean(s.starts_with(&prefix)))
}

fn fn_contains(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    if args.len() != 2 {
        return Err("contains() requires exactly 2 arguments".to_string());
    }
    let s = ctx.string_of(&args[0]);
    let pattern = ctx.string_of(&args[1]);
    Ok(XPathValue::Boolean(s.contains(&pattern)))
}

fn fn_substring(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    if args.len() < 2 || args.len() > 3 {
        return Err("substring() requires 2 or 3 arguments".to_string());
    }

    let s = ctx.string_of(&args[0]);
    let chars: Vec<char> = s.chars().collect();

    let start = ctx.number_of(&args[1]);
    if start.is_nan() {
        return Ok(XPathValue::String(String::new()));
    }
    let start = round_half_up(start);

    let end = if args.len() == 3 {
        let length = ctx.number_of(&args[2]);
        if length.is_nan() {
            return Ok(XPathValue::String(String::new()));
        }
        start + round_half_up(length)
    } else {
        f64::INFINITY
    };

    // XPath positions are 1-based
    let result: String = chars
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            let pos = (*i + 1) as f64;
            pos >= start && pos < end
        })
        .map(|(_, c)| c)
        .collect();

    Ok(XPathValue::String(result))
}

fn fn_substring_before(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    if args.len() != 2 {
        return Err("substring-before() requires exactly 2 arguments".to_string());
    }
    let s = ctx.string_of(&args[0]);
    let pattern = ctx.string_of(&args[1]);
    let result = s.find(&pattern).map(|i| s[..i].to_string()).unwrap_or_default();
    Ok(XPathValue::String(result))
}

fn fn_substring_after(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    if args.len() != 2 {
        return Err("substring-after() requires exactly 2 arguments".to_string());
    }
    let s = ctx.string_of(&args[0]);
    let pattern = ctx.string_of(&args[1]);
    let result = s
        .find(&pattern)
        .map(|i| s[i + pattern.len()..].to_string())
        .unwrap_or_default();
    Ok(XPathValue::String(result))
}

fn fn_string_length(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    let s = if args.is_empty() {
        ctx.nav.string_value(ctx.doc, &ctx.context_node)
    } else {
        ctx.string_of(&args[0])
    };
    Ok(XPathValue::Number(s.chars().count() as f64))
}

fn fn_normalize_space(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    let s = if args.is_empty() {
        ctx.nav.string_value(ctx.doc, &ctx.context_node)
    } else {
        ctx.string_of(&args[0])
    };
    let normalized: Vec<&str> = s.split_whitespace().collect();
    Ok(XPathValue::String(normalized.join(" ")))
}

fn fn_translate(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    if args.len() != 3 {
        return Err("translate() requires exactly 3 arguments".to_string());
    }
    let s = ctx.string_of(&args[0]);
    let from: Vec<char> = ctx.string_of(&args[1]).chars().collect();
    let to: Vec<char> = ctx.string_of(&args[2]).chars().collect();

    let result: String = s
        .chars()
        .filter_map(|c| match from.iter().position(|&f| f == c) {
            Some(i) => to.get(i).copied(),
            None => Some(c),
        })
        .collect();

    Ok(XPathValue::String(result))
}

// Boolean Functions

fn fn_boolean(args: Vec<XPathValue>) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("boolean() requires exactly 1 argument".to_string());
    }
    Ok(XPathValue::Boolean(args[0].to_boolean()))
}

fn fn_not(args: Vec<XPathValue>) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("not() requires exactly 1 argument".to_string());
    }
    Ok(XPathValue::Boolean(!args[0].to_boolean()))
}

/// lang() walks the element parent chain looking for a `lang` (or `xml:lang`)
/// attribute; a match is exact or a hyphenated sub-tag, ASCII case ignored.
fn fn_lang(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("lang() requires exactly 1 argument".to_string());
    }
    let wanted = ctx.string_of(&args[0]);

    let mut current = match &ctx.context_node {
        node @ XNode::Segment(_) => Some(node.clone()),
        XNode::Text {
            owner: Some(id), ..
        } => Some(XNode::Segment(*id)),
        _ => None,
    };

    while let Some(node) = current {
        let lang = match &node {
            XNode::Segment(id) => ctx
                .doc
                .attribute(*id, "lang")
                .or_else(|| ctx.doc.attribute(*id, "xml:lang")),
            _ => None,
        };
        if let Some(lang) = lang {
            let matches = lang.eq_ignore_ascii_case(&wanted)
                || (lang.len() > wanted.len()
                    && lang.is_char_boundary(wanted.len())
                    && lang.as_bytes()[wanted.len()] == b'-'
                    && lang[..wanted.len()].eq_ignore_ascii_case(&wanted));
            return Ok(XPathValue::Boolean(matches));
        }
        current = ctx.nav.parent(ctx.doc, &node);
    }

    Ok(XPathValue::Boolean(false))
}

// Number Functions

fn fn_number(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    let n = if args.is_empty() {
        let s = ctx.nav.string_value(ctx.doc, &ctx.context_node);
        s.trim().parse().unwrap_or(f64::NAN)
    } else {
        ctx.number_of(&args[0])
    };
    Ok(XPathValue::Number(n))
}

fn fn_sum(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("sum() requires exactly 1 argument".to_string());
    }
    match &args[0] {
        XPathValue::NodeSet(nodes) => {
            let total: f64 = nodes
                .iter()
                .map(|n| {
                    ctx.nav
                        .string_value(ctx.doc, n)
                        .trim()
                        .parse()
                        .unwrap_or(f64::NAN)
                })
                .sum();
            Ok(XPathValue::Number(total))
        }
        _ => Err("sum() argument must be a node-set".to_string()),
    }
}

fn fn_floor(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("floor() requires exactly 1 argument".to_string());
    }
    Ok(XPathValue::Number(ctx.number_of(&args[0]).floor()))
}

fn fn_ceiling(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("ceiling() requires exactly 1 argument".to_string());
    }
    Ok(XPathValue::Number(ctx.number_of(&args[0]).ceil()))
}

fn fn_round(args: Vec<XPathValue>, ctx: &EvalContext<'_>) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("round() requires exactly 1 argument".to_string());
    }
    let n = ctx.number_of(&args[0]);
    let rounded = if n.is_nan() || n.is_infinite() {
        n
    } else {
        round_half_up(n)
    };
    Ok(XPathValue::Number(rounded))
}

/// XPath rounding: halves round toward positive infinity
fn round_half_up(n: f64) -> f64 {
    (n + 0.5).floor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::Document;
    use crate::navigator::HtmlNavigator;
    use crate::xpath::compiler::compile;
    use crate::xpath::eval::evaluate_compiled;

    fn eval(doc: &Document, xpath: &str) -> XPathValue {
        let nav = HtmlNavigator;
        let compiled = compile(xpath).expect("compile");
        let nodes = nav.document_root(doc).into_iter().collect();
        let ctx = EvalContext::new(doc, &nav, nodes);
        evaluate_compiled(&compiled, &ctx).expect("evaluate")
    }

    #[test]
    fn test_string_functions() {
        let doc = Document::parse("<html/>");
        assert_eq!(
            eval(&doc, "concat('a', 'b', 'c')").to_string_value(),
            "abc"
        );
        assert_eq!(eval(&doc, "starts-with('hello', 'he')").to_boolean(), true);
        assert_eq!(eval(&doc, "contains('hello', 'ell')").to_boolean(), true);
        assert_eq!(
            eval(&doc, "substring('12345', 2, 3)").to_string_value(),
            "234"
        );
        assert_eq!(
            eval(&doc, "substring('12345', 2)").to_string_value(),
            "2345"
        );
        assert_eq!(
            eval(&doc, "substring-before('1999/04/01', '/')").to_string_value(),
            "1999"
        );
        assert_eq!(
            eval(&doc, "substring-after('1999/04/01', '/')").to_string_value(),
            "04/01"
        );
        assert_eq!(eval(&doc, "string-length('hello')").to_number(), 5.0);
        assert_eq!(
            eval(&doc, "normalize-space('  a  b ')").to_string_value(),
            "a b"
        );
        assert_eq!(
            eval(&doc, "translate('bar', 'abc', 'ABC')").to_string_value(),
            "BAr"
        );
    }

    #[test]
    fn test_boolean_functions() {
        let doc = Document::parse("<html/>");
        assert_eq!(eval(&doc, "true()").to_boolean(), true);
        assert_eq!(eval(&doc, "false()").to_boolean(), false);
        assert_eq!(eval(&doc, "not(false())").to_boolean(), true);
        assert_eq!(eval(&doc, "boolean('x')").to_boolean(), true);
        assert_eq!(eval(&doc, "boolean('')").to_boolean(), false);
    }

    #[test]
    fn test_number_functions() {
        let doc = Document::parse("<html/>");
        assert_eq!(eval(&doc, "floor(1.7)").to_number(), 1.0);
        assert_eq!(eval(&doc, "ceiling(1.2)").to_number(), 2.0);
        assert_eq!(eval(&doc, "round(1.5)").to_number(), 2.0);
        assert_eq!(eval(&doc, "round(-1.5)").to_number(), -1.0);
        assert_eq!(eval(&doc, "number('12')").to_number(), 12.0);
        assert!(eval(&doc, "number('x')").to_number().is_nan());
    }

    #[test]
    fn test_sum() {
        let doc = Document::parse("<html><n>1</n><n>2</n><n>3</n></html>");
        assert_eq!(eval(&doc, "sum(//n)").to_number(), 6.0);
    }

    #[test]
    fn test_name_functions() {
        let doc = Document::parse("<html><p>x</p></html>");
        assert_eq!(eval(&doc, "name(//p)").to_string_value(), "p");
        assert_eq!(eval(&doc, "local-name(//p)").to_string_value(), "p");
        assert_eq!(eval(&doc, "namespace-uri(//p)").to_string_value(), "");
    }

    #[test]
    fn test_id_function() {
        let doc = Document::parse(
            r#"<html><p id="a">1</p><p id="b">2</p><p id="a">3</p></html>"#,
        );
        let result = eval(&doc, "id('a')");
        assert_eq!(result.as_nodeset().map(Vec::len), Some(2));
        let result = eval(&doc, "id('a b')");
        assert_eq!(result.as_nodeset().map(Vec::len), Some(3));
        let result = eval(&doc, "id('missing')");
        assert_eq!(result.as_nodeset().map(Vec::len), Some(0));
    }

    #[test]
    fn test_lang_function() {
        let doc = Document::parse(r#"<html lang="en-US"><body><p>x</p></body></html>"#);
        let nav = HtmlNavigator;
        let root = nav.document_root(&doc).expect("root");
        let p = nav.named_child_axis(&doc, &root, "p")[0].clone();
        let compiled = compile("lang('en')").expect("compile");
        let ctx = EvalContext::new(&doc, &nav, vec![p]);
        let result = evaluate_compiled(&compiled, &ctx).expect("evaluate");
        assert_eq!(result.to_boolean(), true);
    }

    #[test]
    fn test_string_of_context() {
        let doc = Document::parse("<html><p>Hi <b>there</b></p></html>");
        let nav = HtmlNavigator;
        let root = nav.document_root(&doc).expect("root");
        let p = nav.named_child_axis(&doc, &root, "p")[0].clone();
        let compiled = compile("string()").expect("compile");
        let ctx = EvalContext::new(&doc, &nav, vec![p]);
        let result = evaluate_compiled(&compiled, &ctx).expect("evaluate");
        assert_eq!(result.to_string_value(), "Hi there");
    }

    #[test]
    fn test_unknown_function_errors() {
        let doc = Document::parse("<html/>");
        let nav = HtmlNavigator;
        let compiled = compile("frobnicate(1)").expect("compile");
        let ctx = EvalContext::new(&doc, &nav, vec![]);
        assert!(evaluate_compiled(&compiled, &ctx).is_err());
    }
}
