//! Parallel XPath Evaluation
//!
//! Fans multiple expressions out over one shared document with Rayon. The
//! document and adapter are read-only, so no locking is involved; each
//! expression compiles and evaluates independently.

use rayon::prelude::*;

use crate::error::Error;
use crate::html::Document;
use crate::session::{Input, XPath};
use crate::xpath::XPathValue;

/// Evaluate multiple XPath expressions against one document in parallel.
/// Results come back in the order the expressions were given.
pub fn evaluate_parallel(doc: &Document, xpaths: &[&str]) -> Vec<Result<XPathValue, Error>> {
    xpaths
        .par_iter()
        .map(|xpath| {
            let compiled = XPath::compile(xpath)?;
            Ok(compiled.evaluate(doc, Input::Document)?)
        })
        .collect()
}

/// Evaluate keyed expressions in parallel, collecting (key, value) pairs.
/// The first failure aborts the batch.
pub fn evaluate_named(
    doc: &Document,
    queries: &[(&str, &str)],
) -> Result<Vec<(String, XPathValue)>, Error> {
    queries
        .par_iter()
        .map(|(key, xpath)| {
            let compiled = XPath::compile(xpath)?;
            let value = compiled.evaluate(doc, Input::Document)?;
            Ok((key.to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_eval() {
        let doc = Document::parse("<html><a>1</a><b>2</b><c>3</c></html>");
        let xpaths = ["//a", "//b", "//c"];

        let results = evaluate_parallel(&doc, &xpaths);
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn test_parallel_reports_individual_failures() {
        let doc = Document::parse("<html><a>1</a></html>");
        let results = evaluate_parallel(&doc, &["//a", "///bad["]);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::Compile(_))));
    }

    #[test]
    fn test_named_queries() {
        let doc = Document::parse("<html><a>1</a><b>2</b></html>");
        let queries = [("first", "//a"), ("second", "//b")];

        let results = evaluate_named(&doc, &queries).expect("evaluate");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "first");
    }
}
