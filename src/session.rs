//! Query Session
//!
//! Wraps an expression string together with the tree model adapter and turns
//! "whatever the caller passed in" into the context the evaluator sees. An
//! expression compiles once and can then run against whole documents, single
//! nodes, or a prior query's result sequence - which is what makes
//! expression chaining work.
//!
//! A [`XPathCache`] keeps compiled expressions behind an LRU so hot
//! expressions skip the parser.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::error::{CompileError, EvaluationError};
use crate::html::Document;
use crate::navigator::{HtmlNavigator, XNode};
use crate::xpath::{compiler, evaluate_compiled, CompiledExpr, EvalContext, XPathValue};

/// An evaluation context: the node-set an expression runs against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    pub nodes: Vec<XNode>,
}

impl Context {
    pub fn new(nodes: Vec<XNode>) -> Self {
        Context { nodes }
    }
}

/// What an expression is evaluated against.
///
/// The four-way dispatch in [`XPath::evaluate`]: a prebuilt context passes
/// through unchanged, a document becomes the singleton sequence of its root
/// element, a node sequence is used as-is, and any single node is wrapped as
/// a singleton.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Input {
    /// Evaluate against the whole document (its root element)
    #[default]
    Document,
    /// Evaluate against a single node
    Node(XNode),
    /// Evaluate against an ordered node sequence (e.g. a prior result)
    Nodes(Vec<XNode>),
    /// Evaluate against an already-built context
    Context(Context),
}

impl From<XNode> for Input {
    fn from(node: XNode) -> Self {
        Input::Node(node)
    }
}

impl From<Vec<XNode>> for Input {
    fn from(nodes: Vec<XNode>) -> Self {
        Input::Nodes(nodes)
    }
}

impl From<Context> for Input {
    fn from(context: Context) -> Self {
        Input::Context(context)
    }
}

/// A compiled XPath expression bound to the tree model adapter.
#[derive(Debug, Clone)]
pub struct XPath {
    expression: String,
    compiled: CompiledExpr,
    navigator: HtmlNavigator,
}

impl XPath {
    /// Compile an expression. Malformed syntax fails here, never during
    /// evaluation, and the error carries the original diagnostic.
    pub fn compile(expression: &str) -> Result<Self, CompileError> {
        Self::compile_with(expression, HtmlNavigator)
    }

    /// Compile with an explicitly supplied adapter.
    pub fn compile_with(
        expression: &str,
        navigator: HtmlNavigator,
    ) -> Result<Self, CompileError> {
        let compiled = compiler::compile(expression).map_err(|message| CompileError {
            expression: expression.to_string(),
            message,
        })?;
        Ok(XPath {
            expression: expression.to_string(),
            compiled,
            navigator,
        })
    }

    /// The expression text this session was compiled from.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Turn an input into the context the evaluator sees.
    fn build_context(&self, doc: &Document, input: Input) -> Context {
        match input {
            Input::Context(context) => context,
            Input::Document => Context::new(
                self.navigator.document_root(doc).into_iter().collect(),
            ),
            Input::Nodes(nodes) => Context::new(nodes),
            Input::Node(node) => Context::new(vec![node]),
        }
    }

    /// Evaluate against an input, yielding whatever the expression produces:
    /// a node sequence or a typed value.
    pub fn evaluate(
        &self,
        doc: &Document,
        input: impl Into<Input>,
    ) -> Result<XPathValue, EvaluationError> {
        let context = self.build_context(doc, input.into());
        let ctx = EvalContext::new(doc, &self.navigator, context.nodes);
        evaluate_compiled(&self.compiled, &ctx).map_err(EvaluationError::new)
    }

    /// Evaluate and return the matched node sequence. Expressions producing
    /// a non-node value are a type error here.
    pub fn select(
        &self,
        doc: &Document,
        input: impl Into<Input>,
    ) -> Result<Vec<XNode>, EvaluationError> {
        match self.evaluate(doc, input)? {
            XPathValue::NodeSet(nodes) => Ok(nodes),
            other => Err(EvaluationError::new(format!(
                "expression `{}` yielded a {}, not a node-set",
                self.expression,
                other.type_name()
            ))),
        }
    }

    /// Evaluate and coerce to a string: for node results, the string value
    /// of the first matched node.
    pub fn string_value_of(
        &self,
        doc: &Document,
        input: impl Into<Input>,
    ) -> Result<String, EvaluationError> {
        let value = self.evaluate(doc, input)?;
        Ok(match value {
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map(|n| self.navigator.string_value(doc, n))
                .unwrap_or_default(),
            other => other.to_string_value(),
        })
    }

    /// Evaluate and coerce to a number.
    pub fn number_value_of(
        &self,
        doc: &Document,
        input: impl Into<Input>,
    ) -> Result<f64, EvaluationError> {
        let value = self.evaluate(doc, input)?;
        Ok(match &value {
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map(|n| self.navigator.string_value(doc, n))
                .unwrap_or_default()
                .trim()
                .parse()
                .unwrap_or(f64::NAN),
            other => other.to_number(),
        })
    }

    /// Evaluate and coerce to a boolean.
    pub fn boolean_value_of(
        &self,
        doc: &Document,
        input: impl Into<Input>,
    ) -> Result<bool, EvaluationError> {
        Ok(self.evaluate(doc, input)?.to_boolean())
    }
}

const DEFAULT_CACHE_CAPACITY: usize = 64;

/// LRU cache of compiled expressions, keyed by expression text.
///
/// Shared safely across threads; compile failures are not cached.
pub struct XPathCache {
    inner: Mutex<LruCache<String, Arc<XPath>>>,
}

impl XPathCache {
    /// Create a cache holding up to `capacity` compiled expressions.
    pub fn new(capacity: NonZeroUsize) -> Self {
        XPathCache {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Get a compiled expression, compiling and caching on miss.
    pub fn get(&self, expression: &str) -> Result<Arc<XPath>, CompileError> {
        let mut cache = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(compiled) = cache.get(expression) {
            return Ok(Arc::clone(compiled));
        }
        let compiled = Arc::new(XPath::compile(expression)?);
        cache.put(expression.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Number of cached expressions.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for XPathCache {
    fn default() -> Self {
        // Safe: the constant is non-zero
        let capacity =
            NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self::new(capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigator::Kind;

    const PAGE: &str = r#"<html><body id="b"><p>Hi <b>there</b></p></body></html>"#;

    #[test]
    fn test_descendant_query_string_value() {
        let doc = Document::parse(PAGE);
        let xpath = XPath::compile("//p").expect("compile");
        let nodes = xpath.select(&doc, Input::Document).expect("select");
        assert_eq!(nodes.len(), 1);
        assert_eq!(
            HtmlNavigator.string_value(&doc, &nodes[0]),
            "Hi there"
        );
    }

    #[test]
    fn test_attribute_filter_finds_body() {
        let doc = Document::parse(PAGE);
        let xpath = XPath::compile("//*[@id='b']").expect("compile");
        let nodes = xpath.select(&doc, Input::Document).expect("select");
        assert_eq!(nodes.len(), 1);
        assert_eq!(HtmlNavigator.name(&doc, &nodes[0]), "body");
    }

    #[test]
    fn test_count_of_missing_attributes_is_zero() {
        let doc = Document::parse(PAGE);
        let xpath = XPath::compile("count(//p/@*)").expect("compile");
        let value = xpath.evaluate(&doc, Input::Document).expect("evaluate");
        assert_eq!(value.to_number(), 0.0);
    }

    #[test]
    fn test_malformed_expression_fails_at_compile() {
        let err = XPath::compile("///bad[").expect_err("must not compile");
        assert_eq!(err.expression, "///bad[");
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_chaining_through_node_sequence() {
        let doc = Document::parse(PAGE);
        let paragraphs = XPath::compile("//p")
            .expect("compile")
            .select(&doc, Input::Document)
            .expect("select");
        // Feed the previous result back in as the context
        let bold = XPath::compile("b")
            .expect("compile")
            .select(&doc, paragraphs)
            .expect("select");
        assert_eq!(bold.len(), 1);
        assert_eq!(HtmlNavigator.string_value(&doc, &bold[0]), "there");
    }

    #[test]
    fn test_single_node_input() {
        let doc = Document::parse(PAGE);
        let nav = HtmlNavigator;
        let root = nav.document_root(&doc).expect("root");
        let body = nav.named_child_axis(&doc, &root, "body")[0].clone();
        let nodes = XPath::compile("p")
            .expect("compile")
            .select(&doc, body)
            .expect("select");
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_prebuilt_context_passes_through() {
        let doc = Document::parse(PAGE);
        let nav = HtmlNavigator;
        let root = nav.document_root(&doc).expect("root");
        let context = Context::new(vec![root]);
        let nodes = XPath::compile(".")
            .expect("compile")
            .select(&doc, context)
            .expect("select");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nav.name(&doc, &nodes[0]), "html");
    }

    #[test]
    fn test_mixed_result_kinds() {
        let doc = Document::parse(PAGE);
        let xpath = XPath::compile("//p/node()").expect("compile");
        let nodes = xpath.select(&doc, Input::Document).expect("select");
        let nav = HtmlNavigator;
        let kinds: Vec<Kind> = nodes.iter().map(|n| nav.classify(&doc, n)).collect();
        assert!(kinds.contains(&Kind::Element));
        assert!(kinds.contains(&Kind::Text));
    }

    #[test]
    fn test_value_conveniences() {
        let doc = Document::parse(PAGE);
        let xpath = XPath::compile("//p").expect("compile");
        assert_eq!(
            xpath.string_value_of(&doc, Input::Document).expect("string"),
            "Hi there"
        );
        assert!(xpath
            .boolean_value_of(&doc, Input::Document)
            .expect("boolean"));

        let count = XPath::compile("count(//p)").expect("compile");
        assert_eq!(
            count.number_value_of(&doc, Input::Document).expect("number"),
            1.0
        );
    }

    #[test]
    fn test_select_rejects_non_node_result() {
        let doc = Document::parse(PAGE);
        let xpath = XPath::compile("1 + 1").expect("compile");
        assert!(xpath.select(&doc, Input::Document).is_err());
    }

    #[test]
    fn test_evaluation_error_surfaces() {
        let doc = Document::parse(PAGE);
        let xpath = XPath::compile("count('x')").expect("compile");
        let err = xpath
            .evaluate(&doc, Input::Document)
            .expect_err("type error");
        assert!(err.message.contains("node-set"));
    }

    #[test]
    fn test_cache_reuses_compiled_expressions() {
        let cache = XPathCache::default();
        let first = cache.get("//p").expect("compile");
        let second = cache.get("//p").expect("compile");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_evicts_least_recently_used() {
        let cache = XPathCache::new(NonZeroUsize::new(2).expect("nonzero"));
        let first = cache.get("//a").expect("compile");
        cache.get("//b").expect("compile");
        cache.get("//c").expect("compile"); // evicts //a
        assert_eq!(cache.len(), 2);
        let again = cache.get("//a").expect("compile");
        assert!(!Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn test_cache_does_not_store_failures() {
        let cache = XPathCache::default();
        assert!(cache.get("//[").is_err());
        assert!(cache.is_empty());
    }
}
