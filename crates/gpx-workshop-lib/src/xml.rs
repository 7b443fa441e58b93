//! Line-tracking XML tree parser
//!
//! Streams [`quick_xml`] events into an owned [`Node`] tree. Nesting is verified
//! against the tree builder's own stack so that every malformation is reported
//! with the 1-indexed source line of the offending token.

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::{BytesRef, BytesStart, Event};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors produced while parsing structured text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The input is empty or holds no element at all
    #[error("no element content")]
    EmptyContent,

    /// The input is not well-formed; `line` is where the offending token starts
    #[error("malformed content at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

impl ParseError {
    /// Source line of the failure (0 for [`ParseError::EmptyContent`])
    pub fn line(&self) -> usize {
        match self {
            Self::EmptyContent => 0,
            Self::Malformed { line, .. } => *line,
        }
    }
}

/// A parsed element with its attributes, character data and child elements
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Node {
    name: String,
    attributes: IndexMap<String, String>,
    children: Vec<Node>,
    text: String,
    line: usize,
}

impl Node {
    /// Create an element with no attributes, text or children
    pub fn new(name: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            line,
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Qualified name as written in the source (including any prefix)
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without its namespace prefix (`gpx:trk` -> `trk`)
    #[inline]
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Attribute value by exact qualified name
    #[inline]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Attributes in document order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    #[inline]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Own character data, entity references resolved, surrounding whitespace trimmed
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 1-indexed line of the start tag
    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    /// First direct child with the given local name
    pub fn child(&self, local_name: &str) -> Option<&Node> {
        self.children
            .iter()
            .find(|child| child.local_name() == local_name)
    }

    /// Direct children with the given local name, in document order
    pub fn children_named<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a Node> {
        self.children
            .iter()
            .filter(move |child| child.local_name() == local_name)
    }

    /// All descendants (excluding `self`) with the given local name, in document order
    pub fn descendants_named<'a>(&'a self, local_name: &str) -> Vec<&'a Node> {
        let mut found = Vec::new();
        let mut pending: Vec<&Node> = self.children.iter().rev().collect();
        while let Some(node) = pending.pop() {
            if node.local_name() == local_name {
                found.push(node);
            }
            pending.extend(node.children.iter().rev());
        }
        found
    }
}

fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Maps byte offsets to 1-indexed line numbers, counting `\n` incrementally
struct LineTracker<'a> {
    input: &'a [u8],
    offset: usize,
    line: usize,
}

impl<'a> LineTracker<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            offset: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, offset: usize) -> usize {
        let offset = offset.min(self.input.len());
        if offset < self.offset {
            self.offset = 0;
            self.line = 1;
        }
        self.line += self.input[self.offset..offset]
            .iter()
            .filter(|&&byte| byte == b'\n')
            .count();
        self.offset = offset;
        self.line
    }
}

fn malformed(line: usize, reason: impl Into<String>) -> ParseError {
    ParseError::Malformed {
        line,
        reason: reason.into(),
    }
}

/// Parse raw bytes into an element tree
///
/// Fails with [`ParseError::EmptyContent`] when no element is present and with
/// [`ParseError::Malformed`] on the first well-formedness violation. A valid
/// document whose root has no children still parses successfully.
pub fn parse(bytes: &[u8]) -> Result<Node, ParseError> {
    #[cfg(feature = "profiling")]
    profiling::scope!("xml::parse");

    let mut reader = Reader::from_reader(bytes);
    {
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
    }

    let mut lines = LineTracker::new(bytes);
    let mut open: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let token_start = reader.buffer_position() as usize;
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                let line = lines.line_at(reader.error_position() as usize);
                return Err(malformed(line, e.to_string()));
            }
        };

        match event {
            Event::Start(start) => {
                let line = lines.line_at(token_start);
                if open.is_empty() && root.is_some() {
                    return Err(malformed(line, "more than one root element"));
                }
                open.push(open_element(&start, line)?);
            }
            Event::Empty(start) => {
                let line = lines.line_at(token_start);
                if open.is_empty() && root.is_some() {
                    return Err(malformed(line, "more than one root element"));
                }
                let node = open_element(&start, line)?;
                attach(&mut open, &mut root, node);
            }
            Event::End(end) => {
                let line = lines.line_at(token_start);
                let found = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                match open.pop() {
                    Some(mut node) if node.name == found => {
                        node.text = node.text.trim().to_string();
                        attach(&mut open, &mut root, node);
                    }
                    Some(node) => {
                        return Err(malformed(
                            line,
                            format!("expected </{}>, found </{}>", node.name, found),
                        ));
                    }
                    None => {
                        return Err(malformed(line, format!("unmatched end tag </{found}>")));
                    }
                }
            }
            Event::Text(text) => {
                if open.is_empty() {
                    // Only whitespace may surround the root element
                    if let Some(index) = text.iter().position(|b| !b.is_ascii_whitespace()) {
                        let line = lines.line_at(token_start + index);
                        return Err(malformed(line, "character data outside the root element"));
                    }
                    continue;
                }
                if let Some(index) = text.windows(3).position(|w| w == b"]]>") {
                    let line = lines.line_at(token_start + index);
                    return Err(malformed(line, "']]>' in character data"));
                }
                let content = text
                    .xml_content()
                    .map_err(|e| malformed(lines.line_at(token_start), e.to_string()))?;
                push_text(&mut open, &content, || lines.line_at(token_start))?;
            }
            Event::CData(data) => {
                let content = data
                    .xml_content()
                    .map_err(|e| malformed(lines.line_at(token_start), e.to_string()))?;
                push_text(&mut open, &content, || lines.line_at(token_start))?;
            }
            Event::GeneralRef(reference) => {
                let line = lines.line_at(token_start);
                let resolved = resolve_reference(&reference).map_err(|e| malformed(line, e))?;
                push_text(&mut open, &resolved, || line)?;
            }
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    if let Some(unclosed) = open.last() {
        let line = lines.line_at(bytes.len());
        return Err(malformed(
            line,
            format!(
                "element <{}> opened at line {} is never closed",
                unclosed.name, unclosed.line
            ),
        ));
    }

    root.ok_or(ParseError::EmptyContent)
}

fn open_element(start: &BytesStart<'_>, line: usize) -> Result<Node, ParseError> {
    let qname = start.name();
    let name = std::str::from_utf8(qname.as_ref())
        .map_err(|_| malformed(line, "element name is not valid UTF-8"))?;
    if !is_xml_name(name) {
        return Err(malformed(line, format!("illegal element name {name:?}")));
    }

    let mut node = Node::new(name, line);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| malformed(line, e.to_string()))?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|_| malformed(line, "attribute name is not valid UTF-8"))?;
        if !is_xml_name(key) {
            return Err(malformed(line, format!("illegal attribute name {key:?}")));
        }
        if attribute.value.contains(&b'<') {
            return Err(malformed(line, format!("'<' in value of attribute {key}")));
        }
        let value = attribute
            .unescape_value()
            .map_err(|e| malformed(line, e.to_string()))?;
        node.attributes.insert(key.to_string(), value.into_owned());
    }
    Ok(node)
}

/// The `Name` production of XML 1.0 (fifth edition)
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_name_start_char) && chars.all(is_name_char)
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}'
            | '\u{300}'..='\u{36F}'
            | '\u{203F}'..='\u{2040}')
}

fn attach(open: &mut [Node], root: &mut Option<Node>, node: Node) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => *root = Some(node),
    }
}

/// Append character data to the innermost open element
///
/// Whitespace outside the root element is ignorable; anything else there is an error.
fn push_text(
    open: &mut [Node],
    content: &str,
    line: impl FnOnce() -> usize,
) -> Result<(), ParseError> {
    match open.last_mut() {
        Some(node) => {
            node.text.push_str(content);
            Ok(())
        }
        None if content.trim().is_empty() => Ok(()),
        None => Err(malformed(line(), "character data outside the root element")),
    }
}

fn resolve_reference(reference: &BytesRef<'_>) -> Result<String, String> {
    if reference.is_char_ref() {
        return match reference.resolve_char_ref() {
            Ok(Some(ch)) => Ok(ch.to_string()),
            Ok(None) => Err("invalid character reference".to_string()),
            Err(e) => Err(e.to_string()),
        };
    }

    let name = reference.decode().map_err(|e| e.to_string())?;
    quick_xml::escape::resolve_predefined_entity(&name)
        .map(str::to_string)
        .ok_or_else(|| format!("unknown entity &{name};"))
}
