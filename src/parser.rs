//! Tolerant, line-oriented parser for the Ruby subset the analyzer needs.
//!
//! The parser works in two phases. A preprocessor assembles *logical lines*:
//! it strips comments, skips heredoc bodies and `=begin`/`=end` regions, and
//! joins physical lines while `()[]{}` delimiters are open or a line ends
//! mid-argument-list. A recursive statement parser then shapes logical lines
//! into [`Node`]s, tracking `do…end` / `class…end` / `if…end` nesting.
//!
//! Parsing never fails: a line that doesn't fit the recognized grammar
//! becomes [`NodeKind::Unknown`] carrying its raw text, and when such a line
//! opens a block the block body is still parsed and spliced after it so
//! route declarations inside unrecognized wrappers stay visible.

use crate::ast::{BlockNode, CallNode, Node, NodeKind, ParsedFile};
use crate::model::Diagnostic;
use log::debug;

/// Parse a single source file. Never fails; unparseable regions surface as
/// `Unknown` nodes, and a file with no recognizable constructs yields an
/// empty node list plus a warning diagnostic.
pub fn parse_source(path: &str, source: &str) -> (ParsedFile, Vec<Diagnostic>) {
    let lines = logical_lines(source);
    let mut parser = StmtParser {
        lines: &lines,
        pos: 0,
    };
    let nodes = parser.parse_stmts(Stop::Eof);

    let mut diagnostics = Vec::new();
    let recognized = nodes
        .iter()
        .any(|n| !matches!(n.kind, NodeKind::Unknown(_)));
    if !nodes.is_empty() && !recognized {
        diagnostics.push(
            Diagnostic::warn(format!(
                "no recognizable Ruby constructs in {}",
                path
            ))
            .at(path, 1),
        );
    }
    debug!("parsed {}: {} top-level nodes", path, nodes.len());

    (
        ParsedFile {
            path: path.to_string(),
            nodes,
        },
        diagnostics,
    )
}

// ---------------------------------------------------------------------------
// Phase 1: logical lines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct LogicalLine {
    /// 1-based number of the first physical line.
    line: usize,
    text: String,
}

/// Assemble logical lines: strip comments, skip heredocs and `=begin`
/// regions, join continuations while delimiters are open.
fn logical_lines(source: &str) -> Vec<LogicalLine> {
    let mut out = Vec::new();
    let mut pending: Option<(usize, String, i32)> = None;
    let mut heredoc_terminators: Vec<String> = Vec::new();
    let mut in_comment_block = false;

    for (idx, raw) in source.lines().enumerate() {
        let line_no = idx + 1;

        if let Some(term) = heredoc_terminators.first() {
            if raw.trim() == term || raw.trim() == format!("{};", term) {
                heredoc_terminators.remove(0);
            }
            continue;
        }

        if in_comment_block {
            if raw.trim_start().starts_with("=end") {
                in_comment_block = false;
            }
            continue;
        }
        if raw.starts_with("=begin") {
            in_comment_block = true;
            continue;
        }

        let (stripped, delta, heredocs) = scan_line(raw);
        heredoc_terminators.extend(heredocs);

        let (start, mut text, mut depth) = match pending.take() {
            Some((start, mut text, depth)) => {
                text.push(' ');
                text.push_str(stripped.trim());
                (start, text, depth)
            }
            None => (line_no, stripped.trim().to_string(), 0),
        };
        depth += delta;

        let continues = depth > 0 || text.ends_with(',') || text.ends_with('\\');
        if continues && !text.is_empty() {
            if text.ends_with('\\') {
                text.pop();
            }
            pending = Some((start, text, depth));
            continue;
        }

        push_statements(&mut out, start, &text);
    }

    if let Some((start, text, _)) = pending {
        push_statements(&mut out, start, &text);
    }

    out
}

/// Push a completed logical line, splitting on top-level `;` so one-liners
/// like `def index; end` keep block nesting balanced.
fn push_statements(out: &mut Vec<LogicalLine>, line: usize, text: &str) {
    let mut depth = 0i32;
    let mut in_string: Option<char> = None;
    let mut piece = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(quote) = in_string {
            piece.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    piece.push(escaped);
                }
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                in_string = Some(c);
                piece.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                piece.push(c);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                piece.push(c);
            }
            ';' if depth == 0 => {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    out.push(LogicalLine {
                        line,
                        text: trimmed.to_string(),
                    });
                }
                piece.clear();
            }
            _ => piece.push(c),
        }
    }

    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        out.push(LogicalLine {
            line,
            text: trimmed.to_string(),
        });
    }
}

/// Scan one physical line: drop the trailing comment, compute the net
/// `()[]{}` depth change, and detect heredoc openers. String and regex
/// contents are opaque to all three.
fn scan_line(raw: &str) -> (String, i32, Vec<String>) {
    let chars: Vec<char> = raw.chars().collect();
    let mut result = String::new();
    let mut depth = 0i32;
    let mut heredocs = Vec::new();
    let mut i = 0;
    let mut prev_significant: Option<char> = None;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '#' => break, // comment to end of line
            '\'' | '"' => {
                let quote = c;
                result.push(c);
                i += 1;
                while i < chars.len() {
                    let sc = chars[i];
                    result.push(sc);
                    if sc == '\\' && i + 1 < chars.len() {
                        i += 1;
                        result.push(chars[i]);
                    } else if sc == quote {
                        break;
                    }
                    i += 1;
                }
                prev_significant = Some(quote);
            }
            '/' if regex_position(prev_significant) => {
                // regex literal: consume to the closing slash
                result.push(c);
                i += 1;
                while i < chars.len() {
                    let sc = chars[i];
                    result.push(sc);
                    if sc == '\\' && i + 1 < chars.len() {
                        i += 1;
                        result.push(chars[i]);
                    } else if sc == '/' {
                        break;
                    }
                    i += 1;
                }
                prev_significant = Some('/');
            }
            '<' if i + 1 < chars.len() && chars[i + 1] == '<' => {
                if let Some((term, consumed)) = heredoc_opener(&chars[i..]) {
                    heredocs.push(term);
                    // leave a placeholder string so the statement still parses
                    result.push_str("''");
                    i += consumed;
                    prev_significant = Some('\'');
                    continue;
                }
                result.push(c);
                prev_significant = Some(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                result.push(c);
                prev_significant = Some(c);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                result.push(c);
                prev_significant = Some(c);
            }
            _ => {
                result.push(c);
                if !c.is_whitespace() {
                    prev_significant = Some(c);
                }
            }
        }
        i += 1;
    }

    (result, depth, heredocs)
}

/// Whether a `/` at this position starts a regex literal rather than
/// division. Division does not occur in the DSL subset, so the heuristic
/// only needs to avoid swallowing path strings.
fn regex_position(prev: Option<char>) -> bool {
    matches!(
        prev,
        None | Some('(' | '[' | '{' | ',' | ':' | '>' | '=' | '|' | '&' | '!')
    )
}

/// Recognize `<<~TERM` / `<<-TERM` / `<<TERM` (optionally quoted) starting
/// at `chars[0] == '<'`. Returns the terminator and characters consumed.
fn heredoc_opener(chars: &[char]) -> Option<(String, usize)> {
    let mut i = 2; // past <<
    if i < chars.len() && (chars[i] == '~' || chars[i] == '-') {
        i += 1;
    }
    let quote = if i < chars.len() && (chars[i] == '\'' || chars[i] == '"') {
        let q = chars[i];
        i += 1;
        Some(q)
    } else {
        None
    };
    let start = i;
    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
        i += 1;
    }
    if i == start {
        return None;
    }
    let first = chars[start];
    if quote.is_none() && !(first.is_ascii_uppercase() || first == '_') {
        // `<<ident` is a shift, not a heredoc, in everything we care about
        return None;
    }
    let term: String = chars[start..i].iter().collect();
    if let Some(q) = quote {
        if i < chars.len() && chars[i] == q {
            i += 1;
        }
    }
    Some((term, i))
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Symbol(String),
    Str(String),
    Int(i64),
    /// `name:` keyword-argument label.
    Label(String),
    /// `%i[...]` / `%I[...]` symbol array.
    SymArray(Vec<String>),
    /// `%w[...]` / `%W[...]` word array.
    StrArray(Vec<String>),
    /// Regex literal, kept as raw text.
    Regex(String),
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Dot,
    Rocket,
    Pipe,
    Eq,
    Lt,
    ColonColon,
    Do,
    Op(String),
}

impl Tok {
    /// Fixed spelling of punctuation and keyword tokens; empty for the
    /// variants that carry their own text.
    fn punct(&self) -> &'static str {
        match self {
            Tok::Comma => ",",
            Tok::LParen => "(",
            Tok::RParen => ")",
            Tok::LBracket => "[",
            Tok::RBracket => "]",
            Tok::LBrace => "{",
            Tok::RBrace => "}",
            Tok::Dot => ".",
            Tok::Rocket => "=>",
            Tok::Pipe => "|",
            Tok::Eq => "=",
            Tok::Lt => "<",
            Tok::ColonColon => "::",
            Tok::Do => "do",
            _ => "",
        }
    }

    /// Approximate source spelling, used to rebuild raw text for `Unknown`
    /// nodes and diagnostics.
    fn text(&self) -> String {
        match self {
            Tok::Ident(s) | Tok::Op(s) => s.clone(),
            Tok::Symbol(s) => format!(":{}", s),
            Tok::Str(s) => format!("'{}'", s),
            Tok::Int(n) => n.to_string(),
            Tok::Label(s) => format!("{}:", s),
            Tok::SymArray(words) => format!("%i[{}]", words.join(" ")),
            Tok::StrArray(words) => format!("%w[{}]", words.join(" ")),
            Tok::Regex(raw) => raw.clone(),
            other => other.punct().to_string(),
        }
    }
}

fn tokenize(text: &str) -> Vec<Tok> {
    let chars: Vec<char> = text.chars().collect();
    let mut toks = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // identifiers, keywords, labels
        if c.is_ascii_alphabetic() || c == '_' || c == '@' || c == '$' {
            let start = i;
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            if i < chars.len() && (chars[i] == '?' || chars[i] == '!') {
                // `!` followed by `=` is an operator, not part of the name
                if !(chars[i] == '!' && i + 1 < chars.len() && chars[i + 1] == '=') {
                    i += 1;
                }
            }
            let word: String = chars[start..i].iter().collect();
            if i < chars.len() && chars[i] == ':' && (i + 1 >= chars.len() || chars[i + 1] != ':')
            {
                i += 1;
                toks.push(Tok::Label(word));
            } else if word == "do" {
                toks.push(Tok::Do);
            } else {
                toks.push(Tok::Ident(word));
            }
            continue;
        }

        // numbers
        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '_') {
                i += 1;
            }
            let digits: String = chars[start..i].iter().filter(|c| **c != '_').collect();
            toks.push(Tok::Int(digits.parse().unwrap_or(0)));
            continue;
        }

        match c {
            '\'' | '"' => {
                let quote = c;
                let mut value = String::new();
                i += 1;
                while i < chars.len() && chars[i] != quote {
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        i += 1;
                    }
                    value.push(chars[i]);
                    i += 1;
                }
                i += 1; // closing quote
                toks.push(Tok::Str(value));
            }
            ':' => {
                if i + 1 < chars.len() && chars[i + 1] == ':' {
                    toks.push(Tok::ColonColon);
                    i += 2;
                } else if i + 1 < chars.len()
                    && (chars[i + 1].is_ascii_alphabetic() || chars[i + 1] == '_')
                {
                    let start = i + 1;
                    i += 1;
                    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_')
                    {
                        i += 1;
                    }
                    if i < chars.len() && (chars[i] == '?' || chars[i] == '!') {
                        i += 1;
                    }
                    toks.push(Tok::Symbol(chars[start..i].iter().collect()));
                } else if i + 1 < chars.len() && (chars[i + 1] == '\'' || chars[i + 1] == '"') {
                    // :"quoted symbol"
                    let quote = chars[i + 1];
                    let mut value = String::new();
                    i += 2;
                    while i < chars.len() && chars[i] != quote {
                        value.push(chars[i]);
                        i += 1;
                    }
                    i += 1;
                    toks.push(Tok::Symbol(value));
                } else {
                    toks.push(Tok::Op(":".into()));
                    i += 1;
                }
            }
            '%' => {
                if i + 2 < chars.len()
                    && matches!(chars[i + 1], 'i' | 'I' | 'w' | 'W')
                    && matches!(chars[i + 2], '[' | '(' | '{')
                {
                    let kind = chars[i + 1];
                    let close = match chars[i + 2] {
                        '[' => ']',
                        '(' => ')',
                        _ => '}',
                    };
                    let mut words = Vec::new();
                    let mut word = String::new();
                    i += 3;
                    while i < chars.len() && chars[i] != close {
                        if chars[i].is_whitespace() {
                            if !word.is_empty() {
                                words.push(std::mem::take(&mut word));
                            }
                        } else {
                            word.push(chars[i]);
                        }
                        i += 1;
                    }
                    if !word.is_empty() {
                        words.push(word);
                    }
                    i += 1; // closing delimiter
                    if kind == 'i' || kind == 'I' {
                        toks.push(Tok::SymArray(words));
                    } else {
                        toks.push(Tok::StrArray(words));
                    }
                } else {
                    toks.push(Tok::Op("%".into()));
                    i += 1;
                }
            }
            '/' => {
                let regex_ok = match toks.last() {
                    None
                    | Some(Tok::Comma)
                    | Some(Tok::LParen)
                    | Some(Tok::LBracket)
                    | Some(Tok::LBrace)
                    | Some(Tok::Rocket)
                    | Some(Tok::Label(_))
                    | Some(Tok::Eq)
                    | Some(Tok::Op(_)) => true,
                    _ => false,
                };
                if regex_ok {
                    let mut raw = String::from("/");
                    i += 1;
                    while i < chars.len() {
                        let sc = chars[i];
                        raw.push(sc);
                        i += 1;
                        if sc == '\\' && i < chars.len() {
                            raw.push(chars[i]);
                            i += 1;
                        } else if sc == '/' {
                            break;
                        }
                    }
                    toks.push(Tok::Regex(raw));
                } else {
                    toks.push(Tok::Op("/".into()));
                    i += 1;
                }
            }
            '=' => {
                if i + 1 < chars.len() && chars[i + 1] == '>' {
                    toks.push(Tok::Rocket);
                    i += 2;
                } else if i + 1 < chars.len() && (chars[i + 1] == '=' || chars[i + 1] == '~') {
                    toks.push(Tok::Op(chars[i..i + 2].iter().collect()));
                    i += 2;
                } else {
                    toks.push(Tok::Eq);
                    i += 1;
                }
            }
            ',' | '(' | ')' | '[' | ']' | '{' | '}' | '.' | '<' => {
                toks.push(match c {
                    ',' => Tok::Comma,
                    '(' => Tok::LParen,
                    ')' => Tok::RParen,
                    '[' => Tok::LBracket,
                    ']' => Tok::RBracket,
                    '{' => Tok::LBrace,
                    '}' => Tok::RBrace,
                    '.' => Tok::Dot,
                    _ => Tok::Lt,
                });
                i += 1;
            }
            '|' => {
                if i + 1 < chars.len() && chars[i + 1] == '|' {
                    toks.push(Tok::Op("||".into()));
                    i += 2;
                } else {
                    toks.push(Tok::Pipe);
                    i += 1;
                }
            }
            _ => {
                toks.push(Tok::Op(c.to_string()));
                i += 1;
            }
        }
    }

    toks
}

// ---------------------------------------------------------------------------
// Phase 2: statements
// ---------------------------------------------------------------------------

/// Where a statement list stops.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Stop {
    /// End of input (top level).
    Eof,
    /// A matching `end` line (consumed).
    End,
    /// Like `End`, but also stops (without consuming) at `elsif`/`else`.
    IfBranch,
}

struct StmtParser<'a> {
    lines: &'a [LogicalLine],
    pos: usize,
}

impl<'a> StmtParser<'a> {
    fn peek(&self) -> Option<&LogicalLine> {
        self.lines.get(self.pos)
    }

    fn parse_stmts(&mut self, stop: Stop) -> Vec<Node> {
        let mut nodes = Vec::new();
        while let Some(line) = self.peek() {
            let text = line.text.as_str();
            if text == "end" {
                if stop != Stop::Eof {
                    self.pos += 1;
                    return nodes;
                }
                // stray `end` at top level: tolerate and move on
                self.pos += 1;
                continue;
            }
            if stop == Stop::IfBranch
                && (first_word(text) == Some("elsif") || text == "else")
            {
                return nodes;
            }
            let stmt_nodes = self.parse_statement();
            nodes.extend(stmt_nodes);
        }
        nodes
    }

    /// Parse one statement. Returns possibly-multiple nodes: block bodies of
    /// unrecognized wrappers are spliced after the `Unknown` node so their
    /// contents stay visible to the evaluator.
    fn parse_statement(&mut self) -> Vec<Node> {
        let line = self.lines[self.pos].clone();
        self.pos += 1;
        let text = line.text.as_str();
        let line_no = line.line;

        match first_word(text) {
            Some("class") => return self.parse_class(text, line_no),
            Some("module") => return self.parse_module(text, line_no),
            Some("def") => return self.parse_def(text, line_no),
            Some("if") => {
                let cond = text["if".len()..].trim().to_string();
                return vec![self.parse_if(&cond, line_no)];
            }
            Some("unless") => {
                let cond = text["unless".len()..].trim().to_string();
                return vec![self.parse_if(&format!("!({})", cond), line_no)];
            }
            Some("case") | Some("while") | Some("until") | Some("begin") | Some("for") => {
                // opaque block construct: keep the header as Unknown but walk
                // the body so nested declarations are not lost
                let mut nodes = vec![Node::new(line_no, NodeKind::Unknown(text.to_string()))];
                nodes.extend(self.parse_stmts(Stop::End));
                return nodes;
            }
            _ => {}
        }

        let toks = tokenize(text);

        // trailing `if`/`unless` modifier
        if let Some(split_at) = modifier_position(&toks) {
            let (stmt_toks, rest) = toks.split_at(split_at);
            let cond_text = render_tokens(&rest[1..]);
            let negated = rest[0] == Tok::Ident("unless".to_string());
            let cond_source = if negated {
                format!("!({})", cond_text)
            } else {
                cond_text
            };
            let inner =
                self.parse_call_tokens(stmt_toks, line_no)
                    .unwrap_or_else(|| {
                        Node::new(line_no, NodeKind::Unknown(render_tokens(stmt_toks)))
                    });
            let cond = parse_cond(&cond_source, line_no);
            return vec![Node::new(
                line_no,
                NodeKind::IfExpr {
                    cond: Box::new(cond),
                    then_body: vec![inner],
                    else_body: Vec::new(),
                },
            )];
        }

        // simple assignment
        if toks.len() >= 3 {
            if let (Tok::Ident(target), Tok::Eq) = (&toks[0], &toks[1]) {
                let value = parse_expr_tokens(&toks[2..], line_no)
                    .unwrap_or_else(|| {
                        Node::new(line_no, NodeKind::Unknown(render_tokens(&toks[2..])))
                    });
                return vec![Node::new(
                    line_no,
                    NodeKind::Assign {
                        target: target.clone(),
                        value: Box::new(value),
                    },
                )];
            }
        }

        // method call (the common case)
        if let Some(node) = self.parse_call_tokens(&toks, line_no) {
            return vec![node];
        }

        // unparseable: keep the raw line; if it opened a block, walk the body
        let mut nodes = vec![Node::new(line_no, NodeKind::Unknown(text.to_string()))];
        if ends_with_block_opener(&toks) {
            nodes.extend(self.parse_stmts(Stop::End));
        }
        nodes
    }

    fn parse_class(&mut self, text: &str, line_no: usize) -> Vec<Node> {
        let header = text["class".len()..].trim();
        // `class << self` reopens the singleton; opaque to us
        if header.starts_with("<<") {
            let mut nodes = vec![Node::new(line_no, NodeKind::Unknown(text.to_string()))];
            nodes.extend(self.parse_stmts(Stop::End));
            return nodes;
        }
        let (name, parent) = match header.split_once('<') {
            Some((name, parent)) => (name.trim().to_string(), Some(parent.trim().to_string())),
            None => (header.trim().to_string(), None),
        };
        let body = self.parse_stmts(Stop::End);
        vec![Node::new(
            line_no,
            NodeKind::ClassDef { name, parent, body },
        )]
    }

    fn parse_module(&mut self, text: &str, line_no: usize) -> Vec<Node> {
        let name = text["module".len()..].trim().to_string();
        let body = self.parse_stmts(Stop::End);
        vec![Node::new(line_no, NodeKind::ModuleDef { name, body })]
    }

    fn parse_def(&mut self, text: &str, line_no: usize) -> Vec<Node> {
        let header = text["def".len()..].trim();
        let name: String = header
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '?' | '!' | '.'))
            .collect();
        // endless methods (`def x = expr`, `def x(...) = expr`) have no body
        // to consume; setter definitions (`def foo=(val)`) do
        let after = header[name.len()..].trim_start();
        let endless = if after.starts_with("=(") || after.starts_with("==") {
            false
        } else if after.starts_with('=') {
            true
        } else if after.starts_with('(') {
            match after.find(')') {
                Some(idx) => after[idx + 1..].trim_start().starts_with('='),
                None => false,
            }
        } else {
            false
        };
        if endless {
            return vec![Node::new(
                line_no,
                NodeKind::MethodDef {
                    name,
                    body: vec![Node::new(line_no, NodeKind::Unknown(after.to_string()))],
                },
            )];
        }
        let body = self.parse_stmts(Stop::End);
        vec![Node::new(line_no, NodeKind::MethodDef { name, body })]
    }

    fn parse_if(&mut self, cond_text: &str, line_no: usize) -> Node {
        let cond = parse_cond(cond_text, line_no);
        let then_body = self.parse_stmts(Stop::IfBranch);
        let mut else_body = Vec::new();

        if let Some(line) = self.peek() {
            if first_word(&line.text) == Some("elsif") {
                let nested_cond = line.text["elsif".len()..].trim().to_string();
                let nested_line = line.line;
                self.pos += 1;
                else_body.push(self.parse_if(&nested_cond, nested_line));
            } else if line.text == "else" {
                self.pos += 1;
                // the shared `end` is consumed by this branch parse
                else_body = self.parse_stmts(Stop::IfBranch);
            }
        }

        Node::new(
            line_no,
            NodeKind::IfExpr {
                cond: Box::new(cond),
                then_body,
                else_body,
            },
        )
    }

    /// Parse a statement-level method call from tokens, consuming a `do`
    /// block body from subsequent lines when present. Returns `None` when
    /// the tokens do not form a call.
    fn parse_call_tokens(&mut self, toks: &[Tok], line_no: usize) -> Option<Node> {
        let mut cur = Cursor { toks, pos: 0 };
        let mut call = parse_call_head(&mut cur, line_no)?;

        // trailing block: `do |params|` (body on following lines) or `{ ... }`
        match cur.peek() {
            Some(Tok::Do) => {
                cur.next();
                let params = parse_block_params(&mut cur);
                if cur.peek().is_some() {
                    return None; // junk after `do |...|`
                }
                let body = self.parse_stmts(Stop::End);
                call.block = Some(BlockNode { params, body });
            }
            Some(Tok::LBrace) => {
                cur.next();
                let params = parse_block_params(&mut cur);
                let body_toks = cur.take_until_closing_brace()?;
                let body = parse_inline_block(&body_toks, line_no);
                if cur.peek().is_some() {
                    return None;
                }
                call.block = Some(BlockNode { params, body });
            }
            Some(_) => return None, // trailing junk
            None => {}
        }

        Some(Node::new(line_no, NodeKind::Call(call)))
    }
}

/// First word of a line when it is a bare keyword position.
fn first_word(text: &str) -> Option<&str> {
    let end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    if end == 0 {
        return None;
    }
    let word = &text[..end];
    // keywords never take a `:` label or `.` receiver position
    match text[end..].chars().next() {
        Some(':') | Some('.') | Some('=') => None,
        _ => Some(word),
    }
}

/// Position of a statement-level `if`/`unless` modifier, if any.
fn modifier_position(toks: &[Tok]) -> Option<usize> {
    let mut depth = 0i32;
    for (i, tok) in toks.iter().enumerate() {
        match tok {
            Tok::LParen | Tok::LBracket | Tok::LBrace => depth += 1,
            Tok::RParen | Tok::RBracket | Tok::RBrace => depth -= 1,
            Tok::Ident(word) if depth == 0 && i > 0 && (word == "if" || word == "unless") => {
                return Some(i);
            }
            _ => {}
        }
    }
    None
}

fn ends_with_block_opener(toks: &[Tok]) -> bool {
    match toks.last() {
        Some(Tok::Do) => true,
        Some(Tok::Pipe) => {
            // `do |a, b|`
            toks.iter().any(|t| *t == Tok::Do)
        }
        _ => false,
    }
}

fn parse_cond(cond_text: &str, line_no: usize) -> Node {
    let toks = tokenize(cond_text);
    if let [Tok::Ident(word)] = toks.as_slice() {
        if word == "true" || word == "false" {
            return Node::new(line_no, NodeKind::Ident(word.clone()));
        }
    }
    parse_expr_tokens(&toks, line_no)
        .unwrap_or_else(|| Node::new(line_no, NodeKind::Unknown(cond_text.to_string())))
}

// ---------------------------------------------------------------------------
// Token-level expression parsing
// ---------------------------------------------------------------------------

struct Cursor<'a> {
    toks: &'a [Tok],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn peek2(&self) -> Option<&Tok> {
        self.toks.get(self.pos + 1)
    }

    fn next(&mut self) -> Option<&Tok> {
        let tok = self.toks.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume tokens up to and including the `}` matching an already-eaten
    /// `{`. Returns the inner tokens.
    fn take_until_closing_brace(&mut self) -> Option<Vec<Tok>> {
        let mut depth = 1i32;
        let mut inner = Vec::new();
        while let Some(tok) = self.next() {
            match tok {
                Tok::LBrace => depth += 1,
                Tok::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(inner);
                    }
                }
                _ => {}
            }
            inner.push(tok.clone());
        }
        None
    }
}

/// Parse a full expression from a token slice; `None` unless the entire
/// slice is consumed.
fn parse_expr_tokens(toks: &[Tok], line_no: usize) -> Option<Node> {
    let mut cur = Cursor { toks, pos: 0 };
    let node = parse_postfix(&mut cur, line_no)?;
    if cur.peek().is_some() {
        return None;
    }
    Some(node)
}

/// Parse the head of a statement-level call: either `method args...` command
/// style or a receiver chain ending in a method call.
fn parse_call_head(cur: &mut Cursor, line_no: usize) -> Option<CallNode> {
    // command style: `ident arg, arg` (no parens, no receiver)
    if let Some(Tok::Ident(name)) = cur.peek() {
        let starts_args = is_method_name(name) && cur.peek2().is_some_and(starts_argument);
        if starts_args {
            let method = name.clone();
            cur.next();
            let (args, kwargs) = parse_args(cur, line_no);
            return Some(CallNode {
                receiver: None,
                method,
                args,
                kwargs,
                block: None,
            });
        }
    }

    let expr = parse_postfix(cur, line_no)?;
    match expr.kind {
        NodeKind::Call(call) => {
            // paren-less arguments after a dot chain (`router.draw :admin`)
            if call.args.is_empty()
                && call.kwargs.is_empty()
                && cur.peek().is_some_and(starts_argument)
            {
                let (args, kwargs) = parse_args(cur, line_no);
                let mut call = call;
                call.args = args;
                call.kwargs = kwargs;
                return Some(call);
            }
            Some(call)
        }
        // a bare identifier at statement level is a zero-arg call
        // (`collection do ... end`, `private`)
        NodeKind::Ident(name) if is_method_name(&name) => Some(CallNode {
            receiver: None,
            method: name,
            args: Vec::new(),
            kwargs: Vec::new(),
            block: None,
        }),
        _ => None,
    }
}

/// A plain Ruby method name: lowercase or underscore start, no `::`.
fn is_method_name(name: &str) -> bool {
    !name.contains("::")
        && name
            .chars()
            .next()
            .map(|c| c.is_ascii_lowercase() || c == '_')
            .unwrap_or(false)
}

/// Tokens that can begin a paren-less argument list.
fn starts_argument(tok: &Tok) -> bool {
    matches!(
        tok,
        Tok::Symbol(_)
            | Tok::Str(_)
            | Tok::Int(_)
            | Tok::Label(_)
            | Tok::SymArray(_)
            | Tok::StrArray(_)
            | Tok::Regex(_)
            | Tok::LBracket
            | Tok::Ident(_)
    )
}

/// Parse primary expression plus any `.method` / `.method(args)` chain.
fn parse_postfix(cur: &mut Cursor, line_no: usize) -> Option<Node> {
    let mut node = parse_primary(cur, line_no)?;

    while cur.eat(&Tok::Dot) {
        let method = match cur.next() {
            Some(Tok::Ident(name)) => name.clone(),
            _ => return None,
        };
        let (args, kwargs) = if cur.eat(&Tok::LParen) {
            let (args, kwargs) = parse_args(cur, line_no);
            if !cur.eat(&Tok::RParen) {
                return None;
            }
            (args, kwargs)
        } else {
            (Vec::new(), Vec::new())
        };
        node = Node::new(
            line_no,
            NodeKind::Call(CallNode {
                receiver: Some(Box::new(node)),
                method,
                args,
                kwargs,
                block: None,
            }),
        );
    }

    Some(node)
}

fn parse_primary(cur: &mut Cursor, line_no: usize) -> Option<Node> {
    let tok = cur.peek()?.clone();
    match tok {
        Tok::Symbol(name) => {
            cur.next();
            Some(Node::new(line_no, NodeKind::Symbol(name)))
        }
        Tok::Str(value) => {
            cur.next();
            Some(Node::new(line_no, NodeKind::StringLit(value)))
        }
        Tok::Int(n) => {
            cur.next();
            Some(Node::new(line_no, NodeKind::IntLit(n)))
        }
        Tok::Regex(raw) => {
            cur.next();
            Some(Node::new(line_no, NodeKind::Unknown(raw)))
        }
        Tok::SymArray(words) => {
            cur.next();
            let items = words
                .into_iter()
                .map(|w| Node::new(line_no, NodeKind::Symbol(w)))
                .collect();
            Some(Node::new(line_no, NodeKind::ArrayLit(items)))
        }
        Tok::StrArray(words) => {
            cur.next();
            let items = words
                .into_iter()
                .map(|w| Node::new(line_no, NodeKind::StringLit(w)))
                .collect();
            Some(Node::new(line_no, NodeKind::ArrayLit(items)))
        }
        Tok::Ident(first) => {
            cur.next();
            let mut name = first;
            // constant path: A::B::C
            while cur.peek() == Some(&Tok::ColonColon) {
                match cur.peek2() {
                    Some(Tok::Ident(seg)) => {
                        name.push_str("::");
                        name.push_str(seg);
                        cur.next();
                        cur.next();
                    }
                    _ => break,
                }
            }
            if cur.eat(&Tok::LParen) {
                let (args, kwargs) = parse_args(cur, line_no);
                if !cur.eat(&Tok::RParen) {
                    return None;
                }
                return Some(Node::new(
                    line_no,
                    NodeKind::Call(CallNode {
                        receiver: None,
                        method: name,
                        args,
                        kwargs,
                        block: None,
                    }),
                ));
            }
            Some(Node::new(line_no, NodeKind::Ident(name)))
        }
        Tok::LBracket => {
            cur.next();
            let mut items = Vec::new();
            if !cur.eat(&Tok::RBracket) {
                loop {
                    let item = parse_arg_element(cur, line_no);
                    items.push(item);
                    if !cur.eat(&Tok::Comma) {
                        break;
                    }
                }
                if !cur.eat(&Tok::RBracket) {
                    return None;
                }
            }
            Some(Node::new(line_no, NodeKind::ArrayLit(items)))
        }
        Tok::LBrace => {
            cur.next();
            let pairs = parse_hash_body(cur, line_no)?;
            Some(Node::new(line_no, NodeKind::HashLit(pairs)))
        }
        Tok::LParen => {
            cur.next();
            let inner = parse_postfix(cur, line_no)?;
            if !cur.eat(&Tok::RParen) {
                return None;
            }
            Some(inner)
        }
        _ => None,
    }
}

/// Parse `key: value` / `key => value` pairs until the closing `}`.
fn parse_hash_body(cur: &mut Cursor, line_no: usize) -> Option<Vec<(Node, Node)>> {
    let mut pairs = Vec::new();
    if cur.eat(&Tok::RBrace) {
        return Some(pairs);
    }
    loop {
        let key = if let Some(Tok::Label(name)) = cur.peek() {
            let key = Node::new(line_no, NodeKind::Symbol(name.clone()));
            cur.next();
            key
        } else {
            let key = parse_arg_element(cur, line_no);
            if !cur.eat(&Tok::Rocket) {
                return None;
            }
            key
        };
        let value = parse_arg_element(cur, line_no);
        pairs.push((key, value));
        if !cur.eat(&Tok::Comma) {
            break;
        }
    }
    if !cur.eat(&Tok::RBrace) {
        return None;
    }
    Some(pairs)
}

/// Parse a comma-separated argument list. Stops before `do`, `)`, `]`, `}`
/// or end of tokens. A trailing hash literal folds into the keyword bag.
fn parse_args(cur: &mut Cursor, line_no: usize) -> (Vec<Node>, Vec<(String, Node)>) {
    let mut args = Vec::new();
    let mut kwargs: Vec<(String, Node)> = Vec::new();

    loop {
        match cur.peek() {
            None | Some(Tok::Do) | Some(Tok::RParen) | Some(Tok::RBracket)
            | Some(Tok::RBrace) | Some(Tok::LBrace) => break,
            _ => {}
        }

        if let Some(Tok::Label(name)) = cur.peek() {
            let key = name.clone();
            cur.next();
            let value = parse_arg_element(cur, line_no);
            kwargs.push((key, value));
        } else {
            let element = parse_arg_element(cur, line_no);
            if cur.eat(&Tok::Rocket) {
                let value = parse_arg_element(cur, line_no);
                kwargs.push((key_text(&element), value));
            } else {
                args.push(element);
            }
        }

        if !cur.eat(&Tok::Comma) {
            break;
        }
    }

    // `method :name, { only: [...] }`: explicit hash as final argument
    if kwargs.is_empty() {
        if let Some(last) = args.last() {
            if let NodeKind::HashLit(pairs) = &last.kind {
                kwargs = pairs
                    .iter()
                    .map(|(k, v)| (key_text(k), v.clone()))
                    .collect();
                args.pop();
            }
        }
    }

    (args, kwargs)
}

/// Parse one argument element, falling back to an `Unknown` node holding the
/// skipped tokens when the expression is not in the recognized subset.
fn parse_arg_element(cur: &mut Cursor, line_no: usize) -> Node {
    let start = cur.pos;
    if let Some(node) = parse_postfix(cur, line_no) {
        // the element must end at an argument boundary
        match cur.peek() {
            None
            | Some(Tok::Comma)
            | Some(Tok::Rocket)
            | Some(Tok::Do)
            | Some(Tok::RParen)
            | Some(Tok::RBracket)
            | Some(Tok::RBrace)
            | Some(Tok::LBrace) => return node,
            _ => {}
        }
    }
    // fallback: consume tokens to the next boundary at depth zero
    cur.pos = start;
    let mut depth = 0i32;
    let mut skipped = Vec::new();
    while let Some(tok) = cur.peek() {
        match tok {
            Tok::Comma | Tok::Rocket | Tok::Do if depth == 0 => break,
            Tok::RParen | Tok::RBracket | Tok::RBrace if depth == 0 => break,
            Tok::LParen | Tok::LBracket | Tok::LBrace => depth += 1,
            Tok::RParen | Tok::RBracket | Tok::RBrace => depth -= 1,
            _ => {}
        }
        skipped.push(tok.clone());
        cur.next();
    }
    Node::new(line_no, NodeKind::Unknown(render_tokens(&skipped)))
}

fn parse_block_params(cur: &mut Cursor) -> Vec<String> {
    let mut params = Vec::new();
    if cur.eat(&Tok::Pipe) {
        loop {
            match cur.next() {
                Some(Tok::Ident(name)) => params.push(name.clone()),
                Some(Tok::Pipe) | None => break,
                Some(Tok::Comma) => continue,
                Some(_) => continue,
            }
        }
    }
    params
}

/// Parse the body of an inline `{ ... }` block: `;`-separated statements.
fn parse_inline_block(toks: &[Tok], line_no: usize) -> Vec<Node> {
    let mut body = Vec::new();
    for segment in toks.split(|t| *t == Tok::Op(";".into())) {
        if segment.is_empty() {
            continue;
        }
        let mut cur = Cursor {
            toks: segment,
            pos: 0,
        };
        match parse_call_head(&mut cur, line_no) {
            Some(call) if cur.peek().is_none() => {
                body.push(Node::new(line_no, NodeKind::Call(call)));
            }
            _ => body.push(Node::new(
                line_no,
                NodeKind::Unknown(render_tokens(segment)),
            )),
        }
    }
    body
}

fn key_text(node: &Node) -> String {
    match &node.kind {
        NodeKind::Symbol(name) => name.clone(),
        NodeKind::StringLit(value) => value.clone(),
        NodeKind::Ident(name) => name.clone(),
        _ => node.to_source(),
    }
}

fn render_tokens(toks: &[Tok]) -> String {
    toks.iter().map(Tok::text).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<Node> {
        parse_source("config/routes.rb", source).0.nodes
    }

    fn first_call(nodes: &[Node]) -> &CallNode {
        nodes[0].as_call().expect("expected a call node")
    }

    #[test]
    fn test_command_call_with_symbol() {
        let nodes = parse("resources :users\n");
        let call = first_call(&nodes);
        assert_eq!(call.method, "resources");
        assert_eq!(call.args[0].as_name(), Some("users"));
    }

    #[test]
    fn test_keyword_arguments() {
        let nodes = parse("resources :users, only: [:index, :show], path: 'people'\n");
        let call = first_call(&nodes);
        let only = call.kwarg("only").expect("only kwarg");
        assert_eq!(only.as_name_list(), vec!["index", "show"]);
        assert_eq!(call.kwarg("path").unwrap().as_name(), Some("people"));
    }

    #[test]
    fn test_percent_symbol_array() {
        let nodes = parse("resources :users, only: %i[index show]\n");
        let call = first_call(&nodes);
        assert_eq!(
            call.kwarg("only").unwrap().as_name_list(),
            vec!["index", "show"]
        );
    }

    #[test]
    fn test_do_block_attaches() {
        let source = "namespace :api do\n  resources :users\nend\n";
        let nodes = parse(source);
        let call = first_call(&nodes);
        assert_eq!(call.method, "namespace");
        let block = call.block.as_ref().expect("block");
        assert_eq!(block.body.len(), 1);
        assert_eq!(block.body[0].as_call().unwrap().method, "resources");
    }

    #[test]
    fn test_nested_blocks() {
        let source = "\
namespace :api do
  namespace :v1 do
    resources :users
  end
end
";
        let nodes = parse(source);
        let outer = first_call(&nodes);
        let inner = outer.block.as_ref().unwrap().body[0].as_call().unwrap();
        assert_eq!(inner.method, "namespace");
        assert_eq!(inner.args[0].as_name(), Some("v1"));
        assert_eq!(inner.block.as_ref().unwrap().body.len(), 1);
    }

    #[test]
    fn test_receiver_chain_with_block() {
        let source = "Rails.application.routes.draw do\n  root 'home#index'\nend\n";
        let nodes = parse(source);
        let call = first_call(&nodes);
        assert_eq!(call.method, "draw");
        assert_eq!(
            call.receiver_source().as_deref(),
            Some("Rails.application.routes")
        );
        assert_eq!(call.block.as_ref().unwrap().body.len(), 1);
    }

    #[test]
    fn test_rocket_pair_as_kwarg() {
        let nodes = parse("mount Sidekiq::Web => '/sidekiq'\n");
        let call = first_call(&nodes);
        assert_eq!(call.method, "mount");
        let (key, value) = &call.kwargs[0];
        assert_eq!(key, "Sidekiq::Web");
        assert_eq!(value.as_name(), Some("/sidekiq"));
    }

    #[test]
    fn test_if_expression() {
        let source = "\
if Rails.env.development?
  get '/debug', to: 'debug#index'
end
";
        let nodes = parse(source);
        match &nodes[0].kind {
            NodeKind::IfExpr {
                cond, then_body, ..
            } => {
                assert!(!cond.is_literal_true());
                assert_eq!(then_body.len(), 1);
            }
            other => panic!("expected IfExpr, got {:?}", other),
        }
    }

    #[test]
    fn test_if_else_branches() {
        let source = "\
if true
  get '/a', to: 'a#show'
else
  get '/b', to: 'b#show'
end
get '/after', to: 'c#show'
";
        let nodes = parse(source);
        assert_eq!(nodes.len(), 2);
        match &nodes[0].kind {
            NodeKind::IfExpr {
                cond,
                then_body,
                else_body,
            } => {
                assert!(cond.is_literal_true());
                assert_eq!(then_body.len(), 1);
                assert_eq!(else_body.len(), 1);
            }
            other => panic!("expected IfExpr, got {:?}", other),
        }
    }

    #[test]
    fn test_trailing_if_modifier() {
        let nodes = parse("get '/debug', to: 'debug#index' if Rails.env.development?\n");
        match &nodes[0].kind {
            NodeKind::IfExpr {
                cond, then_body, ..
            } => {
                assert!(!cond.is_literal_true());
                assert_eq!(then_body[0].as_call().unwrap().method, "get");
            }
            other => panic!("expected IfExpr, got {:?}", other),
        }
    }

    #[test]
    fn test_class_definition() {
        let source = "\
class UsersController < ApplicationController
  before_action :authenticate_user!
end
";
        let nodes = parse(source);
        match &nodes[0].kind {
            NodeKind::ClassDef { name, parent, body } => {
                assert_eq!(name, "UsersController");
                assert_eq!(parent.as_deref(), Some("ApplicationController"));
                assert_eq!(body.len(), 1);
                assert_eq!(body[0].as_call().unwrap().method, "before_action");
            }
            other => panic!("expected ClassDef, got {:?}", other),
        }
    }

    #[test]
    fn test_module_nesting() {
        let source = "\
module Api
  module V1
    class UsersController < BaseController
    end
  end
end
";
        let nodes = parse(source);
        match &nodes[0].kind {
            NodeKind::ModuleDef { name, body } => {
                assert_eq!(name, "Api");
                match &body[0].kind {
                    NodeKind::ModuleDef { name, body } => {
                        assert_eq!(name, "V1");
                        assert!(matches!(body[0].kind, NodeKind::ClassDef { .. }));
                    }
                    other => panic!("expected inner module, got {:?}", other),
                }
            }
            other => panic!("expected ModuleDef, got {:?}", other),
        }
    }

    #[test]
    fn test_method_definition_with_body() {
        let source = "\
def post_params
  params.require(:post).permit(:title, :body)
end
";
        let nodes = parse(source);
        match &nodes[0].kind {
            NodeKind::MethodDef { name, body } => {
                assert_eq!(name, "post_params");
                let call = body[0].as_call().expect("permit call");
                assert_eq!(call.method, "permit");
                let require = call.receiver.as_ref().unwrap().as_call().unwrap();
                assert_eq!(require.method, "require");
                assert_eq!(require.args[0].as_name(), Some("post"));
            }
            other => panic!("expected MethodDef, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_line_tolerated() {
        let source = "@!$ not ruby at all ???\nresources :users\n";
        let nodes = parse(source);
        assert!(matches!(nodes[0].kind, NodeKind::Unknown(_)));
        assert_eq!(nodes[1].as_call().unwrap().method, "resources");
    }

    #[test]
    fn test_unknown_block_body_is_spliced() {
        let source = "\
devise_scope :user do
  get '/login', to: 'sessions#new'
end
";
        let nodes = parse(source);
        // devise_scope parses as a call; its block body holds the route
        let call = first_call(&nodes);
        assert_eq!(call.method, "devise_scope");
        assert_eq!(
            call.block.as_ref().unwrap().body[0].as_call().unwrap().method,
            "get"
        );
    }

    #[test]
    fn test_heredoc_is_skipped() {
        let source = "\
desc <<~TEXT
  this is documentation, not routes
  get '/fake', to: 'nope#nope'
TEXT
resources :users
";
        let nodes = parse(source);
        let calls: Vec<&str> = nodes
            .iter()
            .filter_map(|n| n.as_call().map(|c| c.method.as_str()))
            .collect();
        assert!(calls.contains(&"resources"));
        assert!(!calls.contains(&"get"));
    }

    #[test]
    fn test_comments_stripped() {
        let source = "resources :users # seven standard routes\n# get '/ghost'\n";
        let nodes = parse(source);
        assert_eq!(nodes.len(), 1);
        assert_eq!(first_call(&nodes).method, "resources");
    }

    #[test]
    fn test_multiline_call_joined() {
        let source = "\
resources :users,
          only: [:index,
                 :show]
";
        let nodes = parse(source);
        let call = first_call(&nodes);
        assert_eq!(
            call.kwarg("only").unwrap().as_name_list(),
            vec!["index", "show"]
        );
    }

    #[test]
    fn test_constraints_hash_with_regex() {
        let nodes = parse("get '/users/:id', to: 'users#show', constraints: { id: /\\d+/ }\n");
        let call = first_call(&nodes);
        assert_eq!(call.method, "get");
        assert!(call.kwarg("constraints").is_some());
    }

    #[test]
    fn test_assignment() {
        let nodes = parse("admin_constraint = AdminConstraint.new\n");
        match &nodes[0].kind {
            NodeKind::Assign { target, .. } => assert_eq!(target, "admin_constraint"),
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn test_each_loop_parses_as_call_with_block() {
        let source = "\
%w[one two].each do |name|
  get \"/pages/#{name}\", to: 'pages#show'
end
";
        let nodes = parse(source);
        let call = first_call(&nodes);
        assert_eq!(call.method, "each");
        assert!(call.receiver.is_some());
        assert_eq!(call.block.as_ref().unwrap().params, vec!["name"]);
    }

    #[test]
    fn test_empty_file() {
        let (file, diags) = parse_source("config/routes.rb", "");
        assert!(file.nodes.is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_garbage_only_file_warns() {
        let (file, diags) = parse_source("config/routes.rb", "?!?!\n<=>\n");
        assert!(file.nodes.iter().all(|n| matches!(n.kind, NodeKind::Unknown(_))));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_one_line_method_definition() {
        let source = "\
class PostsController < ApplicationController
  def index; end
  before_action :set_post
end
";
        let nodes = parse(source);
        match &nodes[0].kind {
            NodeKind::ClassDef { body, .. } => {
                assert_eq!(body.len(), 2);
                assert!(matches!(&body[0].kind, NodeKind::MethodDef { name, .. } if name == "index"));
                assert_eq!(body[1].as_call().unwrap().method, "before_action");
            }
            other => panic!("expected ClassDef, got {:?}", other),
        }
    }

    #[test]
    fn test_inline_brace_block() {
        let nodes = parse("concern(:commentable) { resources :comments }\n");
        let call = first_call(&nodes);
        assert_eq!(call.method, "concern");
        let block = call.block.as_ref().expect("inline block");
        assert_eq!(block.body[0].as_call().unwrap().method, "resources");
    }
}
