//! Parser for Doxygen search shards (`var searchData=[...];`).
//!
//! Shards are JavaScript, but only a literal subset is ever emitted:
//! `var` declarations whose right-hand sides are arrays, objects, strings,
//! numbers, booleans and `null`. The parser accepts exactly that subset
//! plus comments and trailing commas, and reports positions on failure.

use crate::index::types::{Location, SearchRecord};
use memchr::{memchr3, memchr_iter};
use thiserror::Error;

/// Errors produced while parsing shard or catalog files
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected end of input at line {line}, column {column}")]
    UnexpectedEof { line: usize, column: usize },

    #[error("unexpected character {found:?} at line {line}, column {column}")]
    UnexpectedChar {
        found: char,
        line: usize,
        column: usize,
    },

    #[error("unterminated string starting at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },

    #[error("invalid escape sequence at line {line}, column {column}")]
    InvalidEscape { line: usize, column: usize },

    #[error("expected {expected} at line {line}, column {column}")]
    Expected {
        expected: &'static str,
        line: usize,
        column: usize,
    },

    #[error("no `{0}` declaration found")]
    MissingDeclaration(&'static str),

    #[error("`{0}` is not {1}")]
    WrongType(&'static str, &'static str),

    #[error("malformed record #{index}: {reason}")]
    Malformed { index: usize, reason: String },
}

/// A JavaScript literal value
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    Str(String),
    Number(f64),
    Bool(bool),
    Null,
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// JavaScript truthiness, as Doxygen's search.js evaluates the link-target flag
    fn truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::Array(_) | Value::Object(_) => true,
        }
    }
}

/// Parse one search shard into records, in file order
pub fn parse_search_data(src: &str) -> Result<Vec<SearchRecord>, ParseError> {
    let value = parse_declarations(src)?
        .into_iter()
        .find(|(name, _)| name == "searchData")
        .map(|(_, value)| value)
        .ok_or(ParseError::MissingDeclaration("searchData"))?;

    let Value::Array(items) = value else {
        return Err(ParseError::WrongType("searchData", "an array"));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| record_from_value(index, item))
        .collect()
}

fn record_from_value(index: usize, value: Value) -> Result<SearchRecord, ParseError> {
    let malformed = |reason: String| ParseError::Malformed { index, reason };

    let Value::Array(mut parts) = value else {
        return Err(malformed(format!("expected array, found {}", value.type_name())));
    };
    if parts.len() != 2 {
        return Err(malformed(format!(
            "expected [key, entry], found {} elements",
            parts.len()
        )));
    }

    let entry = parts.pop().unwrap_or(Value::Null);
    let key = match parts.pop() {
        Some(Value::Str(key)) => key,
        Some(other) => return Err(malformed(format!("key is a {}", other.type_name()))),
        None => return Err(malformed("missing key".to_string())),
    };

    let Value::Array(entry) = entry else {
        return Err(malformed(format!("entry for '{}' is not an array", key)));
    };
    let mut entry = entry.into_iter();

    let name = match entry.next() {
        Some(Value::Str(name)) => name,
        Some(other) => {
            return Err(malformed(format!(
                "display name for '{}' is a {}",
                key,
                other.type_name()
            )));
        }
        None => return Err(malformed(format!("entry for '{}' is empty", key))),
    };

    let locations = entry
        .enumerate()
        .map(|(i, loc)| location_from_value(loc).map_err(|reason| {
            malformed(format!("location {} of '{}': {}", i, key, reason))
        }))
        .collect::<Result<Vec<_>, _>>()?;

    if locations.is_empty() {
        return Err(malformed(format!("'{}' has no locations", key)));
    }

    Ok(SearchRecord::new(&key, &name, locations))
}

fn location_from_value(value: Value) -> Result<Location, String> {
    let Value::Array(parts) = value else {
        return Err(format!("expected array, found {}", value.type_name()));
    };

    let mut parts = parts.into_iter();
    let url = match parts.next() {
        Some(Value::Str(url)) => url,
        Some(other) => return Err(format!("url is a {}", other.type_name())),
        None => return Err("missing url".to_string()),
    };
    let in_frame = parts.next().map(|flag| flag.truthy()).unwrap_or(false);
    let scope = match parts.next() {
        Some(Value::Str(scope)) => scope,
        Some(Value::Null) | None => String::new(),
        Some(other) => return Err(format!("scope is a {}", other.type_name())),
    };

    Ok(Location::from_url(&url, in_frame, &scope))
}

/// Parse every top-level `var name = value;` declaration in a file
pub(crate) fn parse_declarations(src: &str) -> Result<Vec<(String, Value)>, ParseError> {
    let mut parser = LiteralParser::new(src);
    parser.parse_declarations()
}

/// Recursive-descent parser over the JavaScript literal subset
struct LiteralParser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(src: &'a str) -> Self {
        // Tolerate a UTF-8 byte order mark
        let src = src.strip_prefix('\u{feff}').unwrap_or(src);
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn parse_declarations(&mut self) -> Result<Vec<(String, Value)>, ParseError> {
        let mut decls = Vec::new();

        loop {
            self.skip_trivia()?;
            if self.is_eof() {
                break;
            }
            if self.consume(b';') {
                continue;
            }

            let mut name = self.parse_identifier()?;
            if matches!(name.as_str(), "var" | "let" | "const") {
                self.skip_trivia()?;
                name = self.parse_identifier()?;
            }

            self.skip_trivia()?;
            self.expect(b'=', "'='")?;
            let value = self.parse_value()?;
            decls.push((name, value));

            self.skip_trivia()?;
            self.consume(b';');
        }

        Ok(decls)
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        self.skip_trivia()?;

        match self.peek() {
            None => Err(self.eof()),
            Some(b'[') => self.parse_array(),
            Some(b'{') => self.parse_object(),
            Some(q @ (b'\'' | b'"')) => self.parse_string(q).map(Value::Str),
            Some(b'-' | b'0'..=b'9' | b'.') => self.parse_number(),
            Some(b) if is_ident_start(b) => {
                let start = self.pos;
                let ident = self.parse_identifier()?;
                match ident.as_str() {
                    "null" | "undefined" => Ok(Value::Null),
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    _ => Err(self.expected_at("value", start)),
                }
            }
            Some(_) => Err(self.unexpected()),
        }
    }

    fn parse_array(&mut self) -> Result<Value, ParseError> {
        self.expect(b'[', "'['")?;
        let mut items = Vec::new();

        loop {
            self.skip_trivia()?;
            if self.consume(b']') {
                return Ok(Value::Array(items));
            }

            items.push(self.parse_value()?);

            self.skip_trivia()?;
            if self.consume(b',') {
                continue;
            }
            self.expect(b']', "',' or ']'")?;
            return Ok(Value::Array(items));
        }
    }

    fn parse_object(&mut self) -> Result<Value, ParseError> {
        self.expect(b'{', "'{'")?;
        let mut fields = Vec::new();

        loop {
            self.skip_trivia()?;
            if self.consume(b'}') {
                return Ok(Value::Object(fields));
            }

            let key = match self.peek() {
                Some(q @ (b'\'' | b'"')) => self.parse_string(q)?,
                Some(b'0'..=b'9') => {
                    let start = self.pos;
                    while matches!(self.peek(), Some(b'0'..=b'9')) {
                        self.pos += 1;
                    }
                    self.src[start..self.pos].to_string()
                }
                Some(b) if is_ident_start(b) => self.parse_identifier()?,
                Some(_) => return Err(self.expected_at("object key", self.pos)),
                None => return Err(self.eof()),
            };

            self.skip_trivia()?;
            self.expect(b':', "':'")?;
            let value = self.parse_value()?;
            fields.push((key, value));

            self.skip_trivia()?;
            if self.consume(b',') {
                continue;
            }
            self.expect(b'}', "',' or '}'")?;
            return Ok(Value::Object(fields));
        }
    }

    fn parse_string(&mut self, quote: u8) -> Result<String, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();

        loop {
            let rest = &self.bytes[self.pos..];
            let Some(offset) = memchr3(quote, b'\\', b'\n', rest) else {
                return Err(self.error_at(start, |line, column| {
                    ParseError::UnterminatedString { line, column }
                }));
            };

            out.push_str(&self.src[self.pos..self.pos + offset]);
            self.pos += offset;

            match self.bytes[self.pos] {
                b'\\' => self.parse_escape(&mut out)?,
                b'\n' => {
                    return Err(self.error_at(start, |line, column| {
                        ParseError::UnterminatedString { line, column }
                    }));
                }
                _ => {
                    self.pos += 1;
                    return Ok(out);
                }
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), ParseError> {
        let escape_start = self.pos;
        self.pos += 1;

        let Some(ch) = self.src[self.pos..].chars().next() else {
            return Err(self.eof());
        };
        self.pos += ch.len_utf8();

        match ch {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            // Line continuation
            '\n' => {}
            'x' => {
                let code = self.parse_hex_digits(2, escape_start)?;
                out.push(self.char_from(code, escape_start)?);
            }
            'u' => {
                let code = self.parse_hex_digits(4, escape_start)?;
                if (0xD800..0xDC00).contains(&code) && self.src[self.pos..].starts_with("\\u") {
                    self.pos += 2;
                    let low = self.parse_hex_digits(4, escape_start)?;
                    let combined = 0x10000 + ((code - 0xD800) << 10) + (low.wrapping_sub(0xDC00) & 0x3FF);
                    out.push(self.char_from(combined, escape_start)?);
                } else {
                    out.push(self.char_from(code, escape_start)?);
                }
            }
            other => out.push(other),
        }

        Ok(())
    }

    fn parse_hex_digits(&mut self, count: usize, escape_start: usize) -> Result<u32, ParseError> {
        let end = self.pos + count;
        let digits = self
            .src
            .get(self.pos..end)
            .filter(|d| d.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| self.invalid_escape(escape_start))?;
        let code = u32::from_str_radix(digits, 16).map_err(|_| self.invalid_escape(escape_start))?;
        self.pos = end;
        Ok(code)
    }

    fn char_from(&self, code: u32, escape_start: usize) -> Result<char, ParseError> {
        char::from_u32(code).ok_or_else(|| self.invalid_escape(escape_start))
    }

    fn parse_number(&mut self) -> Result<Value, ParseError> {
        let start = self.pos;
        self.consume(b'-');
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'x' | b'X')
                || (matches!(b, b'+' | b'-') && matches!(self.bytes[self.pos - 1], b'e' | b'E'))
                || (b.is_ascii_hexdigit() && self.src[start..self.pos].contains(['x', 'X']))
            {
                self.pos += 1;
            } else {
                break;
            }
        }

        let text = &self.src[start..self.pos];
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let parsed = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            Some(hex) => i64::from_str_radix(hex, 16).ok().map(|n| n as f64),
            None => digits.parse::<f64>().ok(),
        };

        match parsed {
            Some(n) if negative => Ok(Value::Number(-n)),
            Some(n) => Ok(Value::Number(n)),
            None => Err(self.expected_at("number", start)),
        }
    }

    fn parse_identifier(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(b) if is_ident_start(b) => {}
            Some(_) => return Err(self.expected_at("identifier", self.pos)),
            None => return Err(self.eof()),
        }

        let start = self.pos;
        while matches!(self.peek(), Some(b) if is_ident_continue(b)) {
            self.pos += 1;
        }
        Ok(self.src[start..self.pos].to_string())
    }

    /// Skip whitespace and comments
    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
                self.pos += 1;
            }

            let rest = &self.bytes[self.pos..];
            if rest.starts_with(b"//") {
                match memchr::memchr(b'\n', rest) {
                    Some(offset) => self.pos += offset + 1,
                    None => self.pos = self.bytes.len(),
                }
            } else if rest.starts_with(b"/*") {
                match memchr::memmem::find(&rest[2..], b"*/") {
                    Some(offset) => self.pos += offset + 4,
                    None => return Err(self.eof()),
                }
            } else {
                return Ok(());
            }
        }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    #[inline]
    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn consume(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, b: u8, expected: &'static str) -> Result<(), ParseError> {
        if self.consume(b) {
            Ok(())
        } else if self.is_eof() {
            Err(self.eof())
        } else {
            Err(self.expected_at(expected, self.pos))
        }
    }

    /// Convert a byte offset to a 1-based line and column
    fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.bytes.len());
        let before = &self.bytes[..offset];
        let line = memchr_iter(b'\n', before).count() + 1;
        let line_start = memchr::memrchr(b'\n', before).map(|i| i + 1).unwrap_or(0);
        let column = self.src[line_start..offset].chars().count() + 1;
        (line, column)
    }

    fn error_at(&self, offset: usize, make: impl FnOnce(usize, usize) -> ParseError) -> ParseError {
        let (line, column) = self.line_col(offset);
        make(line, column)
    }

    fn eof(&self) -> ParseError {
        self.error_at(self.bytes.len(), |line, column| ParseError::UnexpectedEof { line, column })
    }

    fn unexpected(&self) -> ParseError {
        let found = self.src[self.pos..].chars().next().unwrap_or('\0');
        self.error_at(self.pos, |line, column| ParseError::UnexpectedChar {
            found,
            line,
            column,
        })
    }

    fn expected_at(&self, expected: &'static str, offset: usize) -> ParseError {
        self.error_at(offset, |line, column| ParseError::Expected {
            expected,
            line,
            column,
        })
    }

    fn invalid_escape(&self, offset: usize) -> ParseError {
        self.error_at(offset, |line, column| ParseError::InvalidEscape { line, column })
    }
}

#[inline]
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

#[inline]
fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHARD: &str = r#"var searchData=
[
  ['gamestate',['GameState',['../class_game_state.html',1,'GameState'],['../class_game_state.html#a1c0c2f558e9c93b17d963d8ac04f853a',1,'GameState::GameState()']]],
  ['gamebuffer',['GameBuffer',['../struct_game_buffer.html',1,'']]],
  ['get_5fcurrent_5fdir',['Get_Current_Dir',['../class_engine.html#a7336cc5d876f9511ff372f2b18fdb534',1,'Engine']]]
];
"#;

    #[test]
    fn test_parse_shard_in_order() {
        let records = parse_search_data(SHARD).unwrap();
        let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["gamestate", "gamebuffer", "get_5fcurrent_5fdir"]);
    }

    #[test]
    fn test_parse_overloads_aggregate_locations() {
        let records = parse_search_data(SHARD).unwrap();
        let game_state = &records[0];
        assert_eq!(game_state.name, "GameState");
        assert_eq!(game_state.locations.len(), 2);
        assert_eq!(game_state.locations[0].anchor, None);
        assert_eq!(
            game_state.locations[1].anchor.as_deref(),
            Some("a1c0c2f558e9c93b17d963d8ac04f853a")
        );
        assert_eq!(game_state.locations[1].scope, "GameState::GameState()");
        assert!(game_state.locations[1].in_frame);
    }

    #[test]
    fn test_parse_empty_scope_and_decoded_key() {
        let records = parse_search_data(SHARD).unwrap();
        assert_eq!(records[1].locations[0].scope, "");
        assert_eq!(records[2].search_key, "get_current_dir");
    }

    #[test]
    fn test_parse_entities_in_scope() {
        let src = r#"var searchData=[['removecomponent',['removeComponent',['../class_world___module.html#a2f',1,'World_Module::removeComponent(const ecsHandle &amp;entityHandle)']]]];"#;
        let records = parse_search_data(src).unwrap();
        assert_eq!(
            records[0].locations[0].scope,
            "World_Module::removeComponent(const ecsHandle &entityHandle)"
        );
    }

    #[test]
    fn test_parse_escaped_quotes() {
        let src = r#"var searchData=[['operator_27',['operator\'',['../class_a.html#x',1,'A::operator\'()']]]];"#;
        let records = parse_search_data(src).unwrap();
        assert_eq!(records[0].name, "operator'");
        assert_eq!(records[0].locations[0].scope, "A::operator'()");
    }

    #[test]
    fn test_parse_trailing_commas_and_comments() {
        let src = "// generated\nvar searchData = [\n  /* a */ ['a',['A',['../a.html',1,'',],],],\n];";
        let records = parse_search_data(src).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "A");
    }

    #[test]
    fn test_parse_null_flag_and_missing_scope() {
        let src = "var searchData=[['a',['A',['../a.html',null]]]];";
        let records = parse_search_data(src).unwrap();
        assert!(!records[0].locations[0].in_frame);
        assert_eq!(records[0].locations[0].scope, "");
    }

    #[test]
    fn test_parse_empty_shard() {
        let records = parse_search_data("var searchData=[];").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_missing_declaration() {
        let err = parse_search_data("var other=[];").unwrap_err();
        assert_eq!(err, ParseError::MissingDeclaration("searchData"));
    }

    #[test]
    fn test_wrong_type() {
        let err = parse_search_data("var searchData={};").unwrap_err();
        assert_eq!(err, ParseError::WrongType("searchData", "an array"));
    }

    #[test]
    fn test_record_without_locations_is_malformed() {
        let err = parse_search_data("var searchData=[['a',['A']]];").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { index: 0, .. }));
    }

    #[test]
    fn test_malformed_reports_record_index() {
        let src = "var searchData=[['a',['A',['../a.html',1,'']]], ['b', 'B']];";
        let err = parse_search_data(src).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { index: 1, .. }));
    }

    #[test]
    fn test_unterminated_string_position() {
        let err = parse_search_data("var searchData=[\n  ['abc").unwrap_err();
        assert_eq!(err, ParseError::UnterminatedString { line: 2, column: 4 });
    }

    #[test]
    fn test_unexpected_eof() {
        let err = parse_search_data("var searchData=[['a',").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_expected_separator() {
        let err = parse_search_data("var searchData=[1 2];").unwrap_err();
        assert!(matches!(
            err,
            ParseError::Expected { expected: "',' or ']'", line: 1, column: 19 }
        ));
    }

    #[test]
    fn test_string_escapes() {
        let decls = parse_declarations(r#"var s = ["a\tb", "\x41é", 'it\'s', "😀"];"#).unwrap();
        assert_eq!(
            decls[0].1,
            Value::Array(vec![
                Value::Str("a\tb".to_string()),
                Value::Str("Aé".to_string()),
                Value::Str("it's".to_string()),
                Value::Str("😀".to_string()),
            ])
        );
    }

    #[test]
    fn test_invalid_escape() {
        let err = parse_declarations(r#"var s = "\xZZ";"#).unwrap_err();
        assert!(matches!(err, ParseError::InvalidEscape { line: 1, column: 10 }));
    }

    #[test]
    fn test_object_literal() {
        let decls = parse_declarations("var o = { 0: \"all\", 1: 'classes', name: -2.5 };").unwrap();
        assert_eq!(
            decls[0].1,
            Value::Object(vec![
                ("0".to_string(), Value::Str("all".to_string())),
                ("1".to_string(), Value::Str("classes".to_string())),
                ("name".to_string(), Value::Number(-2.5)),
            ])
        );
    }

    #[test]
    fn test_multiple_declarations() {
        let decls = parse_declarations("var a = 1;\nvar b = [true, false];").unwrap();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[1].0, "b");
    }
}
