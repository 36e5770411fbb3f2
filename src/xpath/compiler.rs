//! XPath Expression Compiler
//!
//! Compiles parsed XPath expressions into a flat op sequence for the stack
//! evaluator. Two recognizable predicate shapes get dedicated ops:
//! `[@attr='value']` and `[n]`.

use super::parser::{Axis, BinaryOp, Expr, NodeTest, Step};

/// Compiled XPath expression
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
}

/// Compiled operation
#[derive(Debug, Clone)]
pub enum Op {
    /// Push the document root element onto the stack
    Root,
    /// Push the context node-set onto the stack
    Context,
    /// Replace a node-set with its parents
    Parent,
    /// Navigate along axis with node test
    Navigate(Axis, CompiledNodeTest),
    /// Apply predicate filter
    Predicate(Box<CompiledExpr>),
    /// Fast path: [@attr = 'value']
    PredicateAttrEq(String, String),
    /// Fast path: [n]
    PredicatePosition(usize),
    /// Union two node sets
    Union,
    /// Push literal number
    Number(f64),
    /// Push literal string
    String(String),
    /// Call function: name, arg count
    Call(String, usize),
    /// Binary operation
    Binary(BinaryOp),
    /// Negate
    Negate,
}

/// Compiled node test
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledNodeTest {
    Any,
    Name(String),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

impl CompiledExpr {
    /// Compile a parsed XPath expression
    pub fn compile(expr: &Expr) -> Self {
        let mut ops = Vec::new();
        Self::compile_expr(expr, &mut ops);
        CompiledExpr { ops }
    }

    fn compile_expr(expr: &Expr, ops: &mut Vec<Op>) {
        match expr {
            Expr::Root => {
                ops.push(Op::Root);
            }
            Expr::Context => {
                ops.push(Op::Context);
            }
            Expr::Parent => {
                ops.push(Op::Context);
                ops.push(Op::Parent);
            }
            Expr::Number(n) => {
                ops.push(Op::Number(*n));
            }
            Expr::String(s) => {
                ops.push(Op::String(s.clone()));
            }
            Expr::Negate(inner) => {
                Self::compile_expr(inner, ops);
                ops.push(Op::Negate);
            }
            Expr::Binary(left, op, right) => {
                Self::compile_expr(left, ops);
                Self::compile_expr(right, ops);
                ops.push(Op::Binary(*op));
            }
            Expr::Union(left, right) => {
                Self::compile_expr(left, ops);
                Self::compile_expr(right, ops);
                ops.push(Op::Union);
            }
            Expr::Path(base, step) => {
                Self::compile_expr(base, ops);
                Self::compile_step(step, ops);
            }
            Expr::Filter(base, pred) => {
                Self::compile_expr(base, ops);
                ops.push(Self::compile_predicate(pred));
            }
            Expr::Step(step) => {
                ops.push(Op::Context);
                Self::compile_step(step, ops);
            }
            Expr::Function(name, args) => {
                for arg in args {
                    Self::compile_expr(arg, ops);
                }
                ops.push(Op::Call(name.clone(), args.len()));
            }
        }
    }

    fn compile_step(step: &Step, ops: &mut Vec<Op>) {
        let node_test = match &step.node_test {
            NodeTest::Any => CompiledNodeTest::Any,
            NodeTest::Name(n) => CompiledNodeTest::Name(n.clone()),
            NodeTest::Node => CompiledNodeTest::Node,
            NodeTest::Text => CompiledNodeTest::Text,
            NodeTest::Comment => CompiledNodeTest::Comment,
            NodeTest::ProcessingInstruction(arg) => {
                CompiledNodeTest::ProcessingInstruction(arg.clone())
            }
        };

        ops.push(Op::Navigate(step.axis, node_test));

        for pred in &step.predicates {
            ops.push(Self::compile_predicate(pred));
        }
    }

    /// Compile a predicate, using a fast-path op where the shape allows
    fn compile_predicate(pred: &Expr) -> Op {
        // [n] - positional
        if let Expr::Number(n) = pred {
            if *n >= 1.0 && n.fract() == 0.0 && *n <= usize::MAX as f64 {
                return Op::PredicatePosition(*n as usize);
            }
        }

        // [@attr = 'value'] in either operand order
        if let Expr::Binary(left, BinaryOp::Eq, right) = pred {
            let as_attr_name = |e: &Expr| match e {
                Expr::Step(step) => match (&step.axis, &step.node_test, step.predicates.len()) {
                    (Axis::Attribute, NodeTest::Name(name), 0) => Some(name.clone()),
                    _ => None,
                },
                _ => None,
            };
            let as_literal = |e: &Expr| match e {
                Expr::String(s) => Some(s.clone()),
                _ => None,
            };
            if let (Some(name), Some(value)) = (as_attr_name(left), as_literal(right)) {
                return Op::PredicateAttrEq(name, value);
            }
            if let (Some(name), Some(value)) = (as_attr_name(right), as_literal(left)) {
                return Op::PredicateAttrEq(name, value);
            }
        }

        Op::Predicate(Box::new(CompiledExpr::compile(pred)))
    }
}

/// Compile an XPath expression string
pub fn compile(xpath: &str) -> Result<CompiledExpr, String> {
    let expr = super::parser::parse(xpath)?;
    Ok(CompiledExpr::compile(&expr))
}
