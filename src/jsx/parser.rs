use regex::Regex;
use std::sync::OnceLock;

use super::text::decode_entities;
use super::{
    AttrValue, Dialect, JsxAttribute, JsxElement, JsxExpression, JsxFragment, JsxNode, JsxText,
    NodeId, SourceMode, Span, SyntaxNode, SyntaxTree,
};
use crate::error::{CanvasError, CanvasResult};

/// Keywords after which a `<` starts an expression rather than a comparison.
const EXPRESSION_KEYWORDS: &[&str] = &[
    "return", "yield", "await", "case", "default", "typeof", "void", "delete", "in", "of",
    "new", "else", "do", "instanceof", "throw", "export",
];

/// True when the snippet is a script with top-level bindings rather than a bare markup fragment.
pub fn is_component_definition(source: &str) -> bool {
    static DEFINITION_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = DEFINITION_REGEX.get_or_init(|| {
        Regex::new(
            r"^(?:export\s+(?:default\s+)?)?(?:const|let|var|function|interface|type|enum|import)\s+[A-Za-z_${]",
        )
        .unwrap()
    });
    re.is_match(skip_leading_trivia(source))
}

fn skip_leading_trivia(source: &str) -> &str {
    let mut rest = source.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("//") {
            rest = match after.find('\n') {
                Some(nl) => after[nl + 1..].trim_start(),
                None => "",
            };
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = match after.find("*/") {
                Some(end) => after[end + 2..].trim_start(),
                None => "",
            };
        } else {
            return rest;
        }
    }
}

/// Parse a snippet, detecting whether it is a script or a bare markup fragment.
pub fn parse(source: &str, dialect: Dialect) -> CanvasResult<SyntaxTree> {
    let mode = if is_component_definition(source) {
        SourceMode::Script
    } else {
        SourceMode::Markup
    };
    parse_with_mode(source, dialect, mode)
}

/// Parse a snippet in an explicit mode.
pub fn parse_with_mode(source: &str, dialect: Dialect, mode: SourceMode) -> CanvasResult<SyntaxTree> {
    let mut parser = Parser::new(source, dialect);
    let roots = match mode {
        SourceMode::Script => parser.scan_script(ScriptEnd::Eof, None)?,
        SourceMode::Markup => parser.parse_children(None, ChildrenEnd::Eof)?,
    };
    Ok(SyntaxTree::new(mode, dialect, parser.nodes, roots))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScriptEnd {
    Eof,
    CloseBrace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChildrenEnd {
    Eof,
    ClosingTag,
}

/// What the previous significant token was; decides how `<` and `/` read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prev {
    Operator,
    Value,
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    dialect: Dialect,
    nodes: Vec<SyntaxNode>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, dialect: Dialect) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            dialect,
            nodes: Vec::new(),
        }
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> CanvasError {
        CanvasError::compile_at(self.src, offset, message)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.src[self.pos..].starts_with(s)
    }

    fn advance_char(&mut self) {
        self.pos += match self.bytes[self.pos] {
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xff => 4,
            _ => 1,
        };
    }

    fn push(&mut self, kind: JsxNode, parent: Option<NodeId>, start: usize) -> NodeId {
        self.nodes.push(SyntaxNode {
            kind,
            parent,
            span: Span::new(start, start),
        });
        self.nodes.len() - 1
    }

    fn finish(&mut self, id: NodeId, end: usize) {
        self.nodes[id].span.end = end;
    }

    // ─── JavaScript scanning ────────────────────────────────────────────────

    /// Skips JavaScript until `end`, returning the JSX found at this level.
    /// With `ScriptEnd::CloseBrace` the cursor is left on the closing `}`.
    fn scan_script(&mut self, end: ScriptEnd, parent: Option<NodeId>) -> CanvasResult<Vec<NodeId>> {
        let start = self.pos;
        let mut found = Vec::new();
        let mut brace_depth = 0usize;
        let mut prev = Prev::Operator;

        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                b'/' if self.peek_at(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek_at(1) == Some(b'*') => self.skip_block_comment()?,
                b'"' | b'\'' => {
                    self.skip_string(b)?;
                    prev = Prev::Value;
                }
                b'`' => {
                    let embedded = self.skip_template(parent)?;
                    found.extend(embedded);
                    prev = Prev::Value;
                }
                b'/' => {
                    if prev == Prev::Operator {
                        self.skip_regex()?;
                        prev = Prev::Value;
                    } else {
                        self.pos += 1;
                        prev = Prev::Operator;
                    }
                }
                b'{' => {
                    brace_depth += 1;
                    self.pos += 1;
                    prev = Prev::Operator;
                }
                b'}' => {
                    if brace_depth == 0 {
                        return match end {
                            ScriptEnd::CloseBrace => Ok(found),
                            ScriptEnd::Eof => Err(self.error(self.pos, "unexpected '}'")),
                        };
                    }
                    brace_depth -= 1;
                    self.pos += 1;
                    prev = Prev::Value;
                }
                b'(' | b'[' => {
                    self.pos += 1;
                    prev = Prev::Operator;
                }
                b')' | b']' => {
                    self.pos += 1;
                    prev = Prev::Value;
                }
                b'<' => {
                    if prev == Prev::Operator && self.looks_like_jsx() {
                        if self.dialect == Dialect::Tsx && self.looks_like_type_parameters() {
                            self.skip_type_parameters()?;
                            prev = Prev::Operator;
                        } else {
                            found.push(self.parse_element(parent)?);
                            prev = Prev::Value;
                        }
                    } else {
                        self.pos += 1;
                        prev = Prev::Operator;
                    }
                }
                b'0'..=b'9' => {
                    while let Some(c) = self.peek() {
                        if c.is_ascii_alphanumeric() || c == b'.' || c == b'_' {
                            self.pos += 1;
                        } else {
                            break;
                        }
                    }
                    prev = Prev::Value;
                }
                c if is_ident_start(c) => {
                    let word_start = self.pos;
                    while self.peek().map(is_ident_part).unwrap_or(false) {
                        self.pos += 1;
                    }
                    let word = &self.src[word_start..self.pos];
                    prev = if EXPRESSION_KEYWORDS.contains(&word) {
                        Prev::Operator
                    } else {
                        Prev::Value
                    };
                }
                c if c.is_ascii() => {
                    self.pos += 1;
                    prev = Prev::Operator;
                }
                _ => {
                    self.advance_char();
                    prev = Prev::Value;
                }
            }
        }

        match end {
            ScriptEnd::Eof if brace_depth > 0 => Err(self.error(self.pos, "unbalanced '{' in script")),
            ScriptEnd::Eof => Ok(found),
            ScriptEnd::CloseBrace => Err(self.error(start, "unterminated expression, expected '}'")),
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) -> CanvasResult<()> {
        let start = self.pos;
        match self.src[self.pos + 2..].find("*/") {
            Some(end) => {
                self.pos += 2 + end + 2;
                Ok(())
            }
            None => Err(self.error(start, "unterminated comment")),
        }
    }

    fn skip_string(&mut self, quote: u8) -> CanvasResult<()> {
        let start = self.pos;
        self.pos += 1;
        while let Some(b) = self.peek() {
            match b {
                b'\\' => self.pos += 2,
                b'\n' => break,
                _ if b == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => self.pos += 1,
            }
        }
        Err(self.error(start, "unterminated string literal"))
    }

    fn skip_template(&mut self, parent: Option<NodeId>) -> CanvasResult<Vec<NodeId>> {
        let start = self.pos;
        let mut found = Vec::new();
        self.pos += 1;
        while let Some(b) = self.peek() {
            match b {
                b'\\' => self.pos += 2,
                b'`' => {
                    self.pos += 1;
                    return Ok(found);
                }
                b'$' if self.peek_at(1) == Some(b'{') => {
                    self.pos += 2;
                    found.extend(self.scan_script(ScriptEnd::CloseBrace, parent)?);
                    self.pos += 1;
                }
                _ => self.advance_char(),
            }
        }
        Err(self.error(start, "unterminated template literal"))
    }

    fn skip_regex(&mut self) -> CanvasResult<()> {
        let start = self.pos;
        self.pos += 1;
        let mut in_class = false;
        while let Some(b) = self.peek() {
            match b {
                b'\\' => self.pos += 2,
                b'[' => {
                    in_class = true;
                    self.pos += 1;
                }
                b']' => {
                    in_class = false;
                    self.pos += 1;
                }
                b'/' if !in_class => {
                    self.pos += 1;
                    while self.peek().map(|c| c.is_ascii_alphabetic()).unwrap_or(false) {
                        self.pos += 1;
                    }
                    return Ok(());
                }
                b'\n' => break,
                _ => self.advance_char(),
            }
        }
        Err(self.error(start, "unterminated regular expression"))
    }

    fn looks_like_jsx(&self) -> bool {
        match self.peek_at(1) {
            Some(b'>') => true,
            Some(c) => is_ident_start(c),
            None => false,
        }
    }

    /// `<T,>` or `<T extends U>` in expression position: generic arrow type parameters.
    fn looks_like_type_parameters(&self) -> bool {
        let rest = &self.src[self.pos + 1..];
        let name_len = rest.bytes().take_while(|&c| is_ident_part(c)).count();
        if name_len == 0 {
            return false;
        }
        let after = rest[name_len..].trim_start();
        after.starts_with(',') || after.starts_with("extends ")
    }

    fn skip_type_parameters(&mut self) -> CanvasResult<()> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'<' => depth += 1,
                b'>' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(self.error(start, "unterminated type parameter list"))
    }

    // ─── JSX ────────────────────────────────────────────────────────────────

    fn skip_tag_trivia(&mut self) -> CanvasResult<()> {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\n' | b'\r') => self.pos += 1,
                Some(b'/') if self.peek_at(1) == Some(b'/') => self.skip_line_comment(),
                Some(b'/') if self.peek_at(1) == Some(b'*') => self.skip_block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn parse_name(&mut self) -> CanvasResult<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if is_ident_start(c) => {}
            _ => return Err(self.error(start, "expected an element name")),
        }
        while let Some(c) = self.peek() {
            if is_ident_part(c) || c == b'-' || c == b'.' || c == b':' {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn parse_element(&mut self, parent: Option<NodeId>) -> CanvasResult<NodeId> {
        let start = self.pos;
        self.pos += 1;
        self.skip_tag_trivia()?;

        if self.peek() == Some(b'>') {
            self.pos += 1;
            let id = self.push(JsxNode::Fragment(JsxFragment { children: Vec::new() }), parent, start);
            let children = self.parse_children(Some(id), ChildrenEnd::ClosingTag)?;
            self.pos += 2;
            self.skip_tag_trivia()?;
            if self.peek() != Some(b'>') {
                return Err(self.error(self.pos, "expected '</>' to close the fragment"));
            }
            self.pos += 1;
            if let JsxNode::Fragment(fr) = &mut self.nodes[id].kind {
                fr.children = children;
            }
            self.finish(id, self.pos);
            return Ok(id);
        }

        let name = self.parse_name()?;
        let id = self.push(
            JsxNode::Element(JsxElement {
                name: name.clone(),
                attributes: Vec::new(),
                children: Vec::new(),
                self_closing: false,
                opening: Span::new(start, start),
            }),
            parent,
            start,
        );

        let mut attributes = Vec::new();
        let self_closing = loop {
            self.skip_tag_trivia()?;
            match self.peek() {
                Some(b'/') => {
                    if self.peek_at(1) != Some(b'>') {
                        return Err(self.error(self.pos, format!("expected '/>' in <{}>", name)));
                    }
                    self.pos += 2;
                    break true;
                }
                Some(b'>') => {
                    self.pos += 1;
                    break false;
                }
                Some(b'{') => attributes.push(self.parse_spread(id)?),
                Some(c) if is_ident_start(c) => attributes.push(self.parse_attribute(id)?),
                Some(c) => {
                    return Err(self.error(
                        self.pos,
                        format!("unexpected character '{}' in <{}> tag", c as char, name),
                    ))
                }
                None => return Err(self.error(start, format!("unterminated <{}> tag", name))),
            }
        };
        let opening = Span::new(start, self.pos);

        let children = if self_closing {
            Vec::new()
        } else {
            let children = self.parse_children(Some(id), ChildrenEnd::ClosingTag)?;
            let close_start = self.pos;
            self.pos += 2;
            self.skip_tag_trivia()?;
            let closing = self.parse_name()?;
            if closing != name {
                return Err(self.error(
                    close_start,
                    format!("expected closing tag </{}> but found </{}>", name, closing),
                ));
            }
            self.skip_tag_trivia()?;
            if self.peek() != Some(b'>') {
                return Err(self.error(self.pos, format!("expected '>' after </{}", name)));
            }
            self.pos += 1;
            children
        };

        if let JsxNode::Element(el) = &mut self.nodes[id].kind {
            el.attributes = attributes;
            el.children = children;
            el.self_closing = self_closing;
            el.opening = opening;
        }
        self.finish(id, self.pos);
        Ok(id)
    }

    fn parse_spread(&mut self, owner: NodeId) -> CanvasResult<JsxAttribute> {
        let start = self.pos;
        self.pos += 1;
        self.skip_tag_trivia()?;
        if !self.starts_with("...") {
            return Err(self.error(self.pos, "expected '...' in spread attribute"));
        }
        self.pos += 3;
        let code_start = self.pos;
        self.scan_script(ScriptEnd::CloseBrace, Some(owner))?;
        let code = self.src[code_start..self.pos].trim().to_string();
        self.pos += 1;
        Ok(JsxAttribute::Spread {
            code,
            span: Span::new(start, self.pos),
        })
    }

    fn parse_attribute(&mut self, owner: NodeId) -> CanvasResult<JsxAttribute> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_ident_part(c) || c == b'-' || c == b':' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let name = self.src[start..self.pos].to_string();
        let name_end = self.pos;
        self.skip_tag_trivia()?;

        if self.peek() != Some(b'=') {
            self.pos = name_end;
            return Ok(JsxAttribute::Named {
                name,
                value: None,
                span: Span::new(start, name_end),
            });
        }
        self.pos += 1;
        self.skip_tag_trivia()?;

        let value = match self.peek() {
            Some(q @ (b'"' | b'\'')) => {
                let value_start = self.pos + 1;
                match self.src[value_start..].find(q as char) {
                    Some(len) => {
                        self.pos = value_start + len + 1;
                        AttrValue::Str {
                            value: decode_entities(&self.src[value_start..value_start + len]),
                            quote: q as char,
                        }
                    }
                    None => {
                        return Err(self.error(start, format!("unterminated value for attribute '{}'", name)))
                    }
                }
            }
            Some(b'{') => {
                self.pos += 1;
                let code_start = self.pos;
                let embedded = self.scan_script(ScriptEnd::CloseBrace, Some(owner))?;
                let code = self.src[code_start..self.pos].to_string();
                self.pos += 1;
                AttrValue::Expression { code, embedded }
            }
            Some(b'<') => {
                let el_start = self.pos;
                let nested = self.parse_element(Some(owner))?;
                AttrValue::Expression {
                    code: self.src[el_start..self.pos].to_string(),
                    embedded: vec![nested],
                }
            }
            _ => {
                return Err(self.error(self.pos, format!("expected a value for attribute '{}'", name)))
            }
        };

        Ok(JsxAttribute::Named {
            name,
            value: Some(value),
            span: Span::new(start, self.pos),
        })
    }

    fn parse_children(&mut self, parent: Option<NodeId>, end: ChildrenEnd) -> CanvasResult<Vec<NodeId>> {
        let start = self.pos;
        let mut children = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return match end {
                        ChildrenEnd::Eof => Ok(children),
                        ChildrenEnd::ClosingTag => {
                            let label = parent
                                .and_then(|p| match &self.nodes[p].kind {
                                    JsxNode::Element(el) => Some(format!("<{}>", el.name)),
                                    _ => None,
                                })
                                .unwrap_or_else(|| "fragment".to_string());
                            Err(self.error(start, format!("unterminated {} element", label)))
                        }
                    }
                }
                Some(b'<') if self.peek_at(1) == Some(b'/') => {
                    return match end {
                        ChildrenEnd::ClosingTag => Ok(children),
                        ChildrenEnd::Eof => Err(self.error(self.pos, "unexpected closing tag")),
                    }
                }
                Some(b'<') => children.push(self.parse_element(parent)?),
                Some(b'{') => {
                    let expr_start = self.pos;
                    let id = self.push(
                        JsxNode::Expression(JsxExpression {
                            code: String::new(),
                            embedded: Vec::new(),
                        }),
                        parent,
                        expr_start,
                    );
                    self.pos += 1;
                    let code_start = self.pos;
                    let embedded = self.scan_script(ScriptEnd::CloseBrace, Some(id))?;
                    let code = self.src[code_start..self.pos].to_string();
                    self.pos += 1;
                    if let JsxNode::Expression(ex) = &mut self.nodes[id].kind {
                        ex.code = code;
                        ex.embedded = embedded;
                    }
                    self.finish(id, self.pos);
                    children.push(id);
                }
                Some(_) => {
                    let text_start = self.pos;
                    while let Some(c) = self.peek() {
                        if c == b'<' || c == b'{' {
                            break;
                        }
                        self.advance_char();
                    }
                    let id = self.push(
                        JsxNode::Text(JsxText {
                            raw: self.src[text_start..self.pos].to_string(),
                        }),
                        parent,
                        text_start,
                    );
                    self.finish(id, self.pos);
                    children.push(id);
                }
            }
        }
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$'
}

fn is_ident_part(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$'
}
