//! XPath 1.0 Engine
//!
//! Expression pipeline: lexer -> recursive-descent parser -> compiled op
//! sequence -> stack-machine evaluator. The evaluator never touches the
//! parsed tree directly: every axis step and string value goes through the
//! tree model adapter, which is the only component that knows how HTML
//! segments map onto the XPath data model.

pub mod axes;
pub mod compiler;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use compiler::CompiledExpr;
pub use eval::{evaluate_compiled, EvalContext};
pub use value::XPathValue;
