//! Source spans for JSON-with-comments documents.
//!
//! Values are decoded by `serde_json`; this module only records where each
//! object member and array element sits in the original text, so an edit can
//! touch those bytes and leave comments and formatting elsewhere alone.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Object(Vec<Member>),
    Array(Vec<Node>),
    /// String, number, boolean, or null.
    Scalar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub span: Range<usize>,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Decoded key.
    pub key: String,
    /// Span of the quoted key, quotes included.
    pub key_span: Range<usize>,
    pub value: Node,
}

impl Node {
    pub fn members(&self) -> &[Member] {
        match &self.kind {
            NodeKind::Object(members) => members,
            _ => &[],
        }
    }

    pub fn elements(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Array(elements) => elements,
            _ => &[],
        }
    }

    /// Value of the last member named `key`, matching `serde_json`'s
    /// handling of duplicate keys.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.members()
            .iter()
            .rev()
            .find(|m| m.key == key)
            .map(|m| &m.value)
    }

    pub fn is_string(&self, text: &str) -> bool {
        matches!(self.kind, NodeKind::Scalar) && text[self.span.clone()].starts_with('"')
    }
}

/// Locates the top-level value of `text`, skipping a leading byte order
/// mark, comments, and trailing commas. Returns `None` on malformed input.
pub fn parse(text: &str) -> Option<Node> {
    let mut parser = SpanParser {
        text,
        bytes: text.as_bytes(),
        pos: if text.starts_with('\u{feff}') { '\u{feff}'.len_utf8() } else { 0 },
    };
    parser.value()
}

struct SpanParser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl SpanParser<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_trivia(&mut self) {
        while let Some(byte) = self.peek() {
            match byte {
                b' ' | b'\t' | b'\r' | b'\n' | b',' => self.pos += 1,
                b'/' if self.bytes.get(self.pos + 1) == Some(&b'/') => {
                    while self.peek().is_some_and(|b| b != b'\n') {
                        self.pos += 1;
                    }
                }
                b'/' if self.bytes.get(self.pos + 1) == Some(&b'*') => {
                    self.pos += 2;
                    while self.pos < self.bytes.len() && !self.bytes[self.pos..].starts_with(b"*/") {
                        self.pos += 1;
                    }
                    self.pos = (self.pos + 2).min(self.bytes.len());
                }
                _ => return,
            }
        }
    }

    fn value(&mut self) -> Option<Node> {
        self.skip_trivia();
        let start = self.pos;
        let kind = match self.peek()? {
            b'{' => {
                self.pos += 1;
                NodeKind::Object(self.members()?)
            }
            b'[' => {
                self.pos += 1;
                NodeKind::Array(self.elements()?)
            }
            b'"' => {
                self.string()?;
                NodeKind::Scalar
            }
            _ => {
                self.bare()?;
                NodeKind::Scalar
            }
        };
        Some(Node {
            span: start..self.pos,
            kind,
        })
    }

    // Separators are treated as trivia; structural validity is left to
    // serde_json, which has already accepted the document.
    fn members(&mut self) -> Option<Vec<Member>> {
        let mut members = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek()? {
                b'}' => {
                    self.pos += 1;
                    return Some(members);
                }
                b'"' => {
                    let key_start = self.pos;
                    self.string()?;
                    let key_span = key_start..self.pos;
                    let key = serde_json::from_str(&self.text[key_span.clone()]).ok()?;

                    self.skip_trivia();
                    if self.peek()? != b':' {
                        return None;
                    }
                    self.pos += 1;

                    let value = self.value()?;
                    members.push(Member {
                        key,
                        key_span,
                        value,
                    });
                }
                _ => return None,
            }
        }
    }

    fn elements(&mut self) -> Option<Vec<Node>> {
        let mut elements = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek()? == b']' {
                self.pos += 1;
                return Some(elements);
            }
            elements.push(self.value()?);
        }
    }

    fn string(&mut self) -> Option<()> {
        self.pos += 1;
        loop {
            match self.peek()? {
                b'\\' => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    return Some(());
                }
                _ => self.pos += 1,
            }
        }
    }

    fn bare(&mut self) -> Option<()> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'+' | b'.'))
        {
            self.pos += 1;
        }
        (self.pos > start).then_some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice<'a>(text: &'a str, span: &Range<usize>) -> &'a str {
        &text[span.clone()]
    }

    #[test]
    fn locates_nested_members_and_elements() {
        let text = r#"{
  // options
  "compilerOptions": {
    "paths": { "@x/a": ["libs/a/src/index.ts", "libs/a/src/*"], },
    /* "paths": {} */
    "strict": true,
  },
}"#;
        let root = parse(text).unwrap();
        let paths = root.get("compilerOptions").and_then(|n| n.get("paths")).unwrap();

        let member = &paths.members()[0];
        assert_eq!(member.key, "@x/a");
        assert_eq!(slice(text, &member.key_span), "\"@x/a\"");

        let elements: Vec<_> = member
            .value
            .elements()
            .iter()
            .map(|e| slice(text, &e.span))
            .collect();
        assert_eq!(elements, vec!["\"libs/a/src/index.ts\"", "\"libs/a/src/*\""]);

        let strict = root.get("compilerOptions").and_then(|n| n.get("strict")).unwrap();
        assert_eq!(slice(text, &strict.span), "true");
        assert!(!strict.is_string(text));
    }

    #[test]
    fn decodes_escaped_keys_and_skips_escaped_quotes() {
        let text = r#"{ "a\"b": "x\"}", "A": [1, -2.5e3, null] }"#;
        let root = parse(text).unwrap();
        assert_eq!(slice(text, &root.get("a\"b").unwrap().span), r#""x\"}""#);
        assert_eq!(root.get("A").unwrap().elements().len(), 3);
    }

    #[test]
    fn last_duplicate_key_wins() {
        let text = r#"{ "a": 1, "a": 2 }"#;
        let root = parse(text).unwrap();
        assert_eq!(slice(text, &root.get("a").unwrap().span), "2");
    }

    #[test]
    fn skips_byte_order_mark() {
        let text = "\u{feff}{ \"a\": \"b\" }";
        let root = parse(text).unwrap();
        assert_eq!(slice(text, &root.get("a").unwrap().span), "\"b\"");
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(parse("{ \"a\": ").is_none());
        assert!(parse("{ \"a\" 1 }").is_none());
        assert!(parse("[\"unterminated").is_none());
    }
}
