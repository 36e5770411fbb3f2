//! HTML Tag Tokenizer
//!
//! Pull-style iterator over the tags of a markup buffer. Text between tags is
//! not tokenized - it stays in the source and is located later through the
//! span gaps between segments.

use crate::core::scanner::{is_name_char, Scanner};

/// A raw attribute as written in a start tag. The value is undecoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attr<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

/// A single tag found in the input. All positions are byte offsets into the
/// source; `begin..end` covers the tag including its delimiters.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag<'a> {
    /// `<name attr="v" ...>` or `<name ... />`
    Start {
        name: &'a str,
        attrs: Vec<Attr<'a>>,
        begin: usize,
        end: usize,
        self_closing: bool,
    },
    /// `</name>`
    End {
        name: &'a str,
        begin: usize,
        end: usize,
    },
    /// `<!-- ... -->`; `content` spans the bytes between the delimiters
    Comment {
        begin: usize,
        end: usize,
        content: (usize, usize),
    },
    /// `<?target ...?>`; `declaration` is set for `<?xml ...?>`
    Pi {
        target: &'a str,
        begin: usize,
        end: usize,
        content: (usize, usize),
        declaration: bool,
    },
    /// `<!DOCTYPE ...>`
    Doctype {
        begin: usize,
        end: usize,
        content: (usize, usize),
    },
    /// Any other `<! ... >` markup
    MarkupDecl { begin: usize, end: usize },
}

/// Iterator producing the tags of a markup buffer in source order.
pub struct Tokenizer<'a> {
    text: &'a str,
    scanner: Scanner<'a>,
    /// Set after a raw-text start tag (script/style): skip to its end tag.
    raw_until: Option<&'a str>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Tokenizer {
            text,
            scanner: Scanner::new(text.as_bytes()),
            raw_until: None,
        }
    }

    fn slice(&self, begin: usize, end: usize) -> &'a str {
        &self.text[begin..end]
    }

    /// Skip raw element content up to its end tag, leaving the scanner there.
    fn skip_raw_content(&mut self, name: &str) {
        let mut needle = Vec::with_capacity(name.len() + 2);
        needle.extend_from_slice(b"</");
        needle.extend_from_slice(name.as_bytes());

        let mut pos = self.scanner.position();
        loop {
            self.scanner.set_position(pos);
            match self.scanner.find_sequence_ignore_case(&needle) {
                Some(found) => {
                    // The end tag name must not continue: `</scriptx` is content
                    let after = found + needle.len();
                    let terminated = self
                        .text
                        .as_bytes()
                        .get(after)
                        .map_or(true, |&b| !is_name_char(b));
                    if terminated {
                        self.scanner.set_position(found);
                        return;
                    }
                    pos = found + 1;
                }
                None => {
                    self.scanner.set_position(self.text.len());
                    return;
                }
            }
        }
    }

    fn read_start_tag(&mut self, begin: usize) -> Tag<'a> {
        // Scanner sits just past '<'
        let name = match self.scanner.read_name() {
            Some(n) => std::str::from_utf8(n).unwrap_or(""),
            None => "",
        };

        let mut attrs = Vec::new();
        let mut self_closing = false;

        let end = loop {
            self.scanner.skip_whitespace();
            match self.scanner.peek() {
                None => break self.text.len(),
                Some(b'>') => {
                    self.scanner.advance(1);
                    break self.scanner.position();
                }
                Some(b'/') => {
                    if self.scanner.peek_at(1) == Some(b'>') {
                        self.scanner.advance(2);
                        self_closing = true;
                        break self.scanner.position();
                    }
                    self.scanner.advance(1);
                }
                Some(_) => {
                    if let Some(attr) = self.read_attribute() {
                        attrs.push(attr);
                    }
                }
            }
        };

        if crate::html::is_raw_text_element(name) && !self_closing {
            self.raw_until = Some(name);
        }

        Tag::Start {
            name,
            attrs,
            begin,
            end,
            self_closing,
        }
    }

    fn read_attribute(&mut self) -> Option<Attr<'a>> {
        let name_start = self.scanner.position();
        while let Some(b) = self.scanner.peek() {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' | b'=' | b'>' | b'/' => break,
                _ => self.scanner.advance(1),
            }
        }
        let name_end = self.scanner.position();
        if name_end == name_start {
            // Junk byte that is neither a delimiter nor a name; step over it
            self.scanner.advance(1);
            return None;
        }
        let name = self.slice(name_start, name_end);

        self.scanner.skip_whitespace();
        if self.scanner.peek() != Some(b'=') {
            // Boolean attribute: <input disabled>
            return Some(Attr { name, value: "" });
        }
        self.scanner.advance(1);
        self.scanner.skip_whitespace();

        let value = match self.scanner.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                self.scanner.advance(1);
                let start = self.scanner.position();
                while let Some(b) = self.scanner.peek() {
                    if b == quote {
                        break;
                    }
                    self.scanner.advance(1);
                }
                let end = self.scanner.position();
                self.scanner.advance(1); // closing quote (no-op at EOF)
                self.slice(start, end)
            }
            _ => {
                let start = self.scanner.position();
                while let Some(b) = self.scanner.peek() {
                    match b {
                        b' ' | b'\t' | b'\n' | b'\r' | b'>' => break,
                        _ => self.scanner.advance(1),
                    }
                }
                self.slice(start, self.scanner.position())
            }
        };

        Some(Attr { name, value })
    }

    fn read_end_tag(&mut self, begin: usize) -> Option<Tag<'a>> {
        // Scanner sits just past '</'
        let name = match self.scanner.read_name() {
            Some(n) => std::str::from_utf8(n).unwrap_or(""),
            None => "",
        };
        match self.scanner.find_tag_end() {
            Some(gt) => {
                self.scanner.set_position(gt + 1);
                if name.is_empty() {
                    // `</>` has nothing to close
                    None
                } else {
                    Some(Tag::End {
                        name,
                        begin,
                        end: gt + 1,
                    })
                }
            }
            None => {
                self.scanner.set_position(self.text.len());
                None
            }
        }
    }

    fn read_bang_tag(&mut self, begin: usize) -> Tag<'a> {
        // Scanner sits at '<'
        if self.scanner.starts_with(b"<!--") {
            self.scanner.advance(4);
            let content_start = self.scanner.position();
            return match self.scanner.find_sequence(b"-->") {
                Some(close) => {
                    self.scanner.set_position(close + 3);
                    Tag::Comment {
                        begin,
                        end: close + 3,
                        content: (content_start, close),
                    }
                }
                None => {
                    // Unterminated comment runs to end of input
                    let len = self.text.len();
                    self.scanner.set_position(len);
                    Tag::Comment {
                        begin,
                        end: len,
                        content: (content_start, len),
                    }
                }
            };
        }

        if self.scanner.starts_with_ignore_case(b"<!doctype") {
            self.scanner.advance(9);
            let content_start = self.scanner.position();
            let end = match self.scanner.find_tag_end_quoted() {
                Some(gt) => gt,
                None => self.text.len(),
            };
            self.scanner.set_position((end + 1).min(self.text.len()));
            return Tag::Doctype {
                begin,
                end: self.scanner.position(),
                content: (content_start, end),
            };
        }

        // CDATA and marked sections end with ']]>'; anything else at '>'
        self.scanner.advance(2);
        let end = if self.text[begin..].starts_with("<![") {
            match self.scanner.find_sequence(b"]]>") {
                Some(close) => close + 3,
                None => self.text.len(),
            }
        } else {
            match self.scanner.find_tag_end() {
                Some(gt) => gt + 1,
                None => self.text.len(),
            }
        };
        self.scanner.set_position(end);
        Tag::MarkupDecl { begin, end }
    }

    fn read_pi_tag(&mut self, begin: usize) -> Tag<'a> {
        // Scanner sits just past '<?'
        let target = match self.scanner.read_name() {
            Some(n) => std::str::from_utf8(n).unwrap_or(""),
            None => "",
        };
        self.scanner.skip_whitespace();
        let content_start = self.scanner.position();

        let (content_end, end) = match self.scanner.find_sequence(b"?>") {
            Some(close) => (close, close + 2),
            None => match self.scanner.find_tag_end() {
                Some(gt) => (gt, gt + 1),
                None => (self.text.len(), self.text.len()),
            },
        };
        self.scanner.set_position(end);

        Tag::Pi {
            target,
            begin,
            end,
            content: (content_start, content_end),
            declaration: target.eq_ignore_ascii_case("xml"),
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Tag<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(name) = self.raw_until.take() {
            self.skip_raw_content(name);
        }

        loop {
            let begin = self.scanner.find_tag_start()?;
            self.scanner.set_position(begin + 1);

            match self.scanner.peek() {
                Some(b'/') => {
                    self.scanner.advance(1);
                    match self.read_end_tag(begin) {
                        Some(tag) => return Some(tag),
                        None => continue,
                    }
                }
                Some(b'!') => {
                    self.scanner.set_position(begin);
                    return Some(self.read_bang_tag(begin));
                }
                Some(b'?') => {
                    self.scanner.advance(1);
                    return Some(self.read_pi_tag(begin));
                }
                Some(b) if crate::core::scanner::is_name_start_char(b) => {
                    return Some(self.read_start_tag(begin));
                }
                // `<3` and friends are text, not markup
                _ => continue,
            }
        }
    }
}
