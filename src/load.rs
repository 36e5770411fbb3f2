//! Document Loading
//!
//! Thin wrappers that read markup and hand it to the parser. Parsing itself
//! never fails; only the read can.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use log::{debug, error};

use crate::html::Document;

/// Read and parse an HTML file.
pub fn from_file(path: impl AsRef<Path>) -> io::Result<Document> {
    let path = path.as_ref();
    let markup = fs::read_to_string(path).map_err(|e| {
        error!("failed to read {}: {}", path.display(), e);
        e
    })?;
    debug!("parsing {} ({} bytes)", path.display(), markup.len());
    Ok(Document::parse(markup))
}

/// Read and parse HTML from any reader.
pub fn from_reader(mut reader: impl Read) -> io::Result<Document> {
    let mut markup = String::new();
    reader.read_to_string(&mut markup)?;
    debug!("parsing stream ({} bytes)", markup.len());
    Ok(Document::parse(markup))
}
