//! htmlpath - XPath 1.0 queries over tag-soup HTML
//!
//! Three layers:
//! - `html`: lenient tag tokenizer and arena document (segments only - text
//!   stays in the source buffer)
//! - `navigator`: the tree model adapter presenting the irregular HTML tree
//!   as the XPath data model (node kinds, axes, string values)
//! - `xpath` + `session`: expression engine and the query session that binds
//!   an expression to the adapter and builds evaluation contexts
//!
//! ```
//! use htmlpath::{Document, Input, XPath};
//!
//! let doc = Document::parse("<html><body id=\"b\"><p>Hi <b>there</b></p></body></html>");
//! let query = XPath::compile("//p").unwrap();
//! let nodes = query.select(&doc, Input::Document).unwrap();
//! assert_eq!(htmlpath::HtmlNavigator.string_value(&doc, &nodes[0]), "Hi there");
//! ```

mod core;
pub mod error;
pub mod html;
pub mod load;
pub mod navigator;
pub mod parallel;
pub mod session;
pub mod xpath;

pub use error::{CompileError, Error, EvaluationError};
pub use html::{Document, TagType};
pub use navigator::{HtmlNavigator, Kind, XNode};
pub use session::{Context, Input, XPath, XPathCache};
pub use xpath::XPathValue;

/// Parse a markup buffer into a document.
pub fn parse(markup: impl Into<String>) -> Document {
    Document::parse(markup)
}

/// Compile and evaluate an expression against a whole document in one call.
pub fn evaluate(doc: &Document, expression: &str) -> Result<XPathValue, Error> {
    let compiled = XPath::compile(expression)?;
    Ok(compiled.evaluate(doc, Input::Document)?)
}
