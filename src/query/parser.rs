/// Parsed query representation
#[derive(Debug, Clone)]
pub struct Query {
    pub root: QueryNode,
    pub filters: QueryFilters,
    pub options: QueryOptions,
}

/// Query AST node
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    /// Case-insensitive substring of the search key
    Literal(String),
    /// Case-insensitive prefix of the search key (`^term`)
    Prefix(String),
    /// Quoted substring, may contain spaces or operator characters
    Phrase(String),
    /// Regex pattern matched against the search key
    Regex(String),
    /// Boolean AND (all must match)
    And(Vec<QueryNode>),
    /// Boolean OR (any can match)
    Or(Vec<QueryNode>),
    /// Boolean NOT (exclude matches)
    Not(Box<QueryNode>),
    /// Empty query
    Empty,
}

/// Query filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilters {
    /// Substring of any location's scope (scope:Engine)
    pub scope: Option<String>,
    /// Shard section (section:functions)
    pub section: Option<String>,
    /// Page kind of any location (kind:class)
    pub kind: Option<String>,
    /// Substring of any location's page (page:class_engine)
    pub page: Option<String>,
}

/// Query options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Maximum results (0 = unlimited)
    pub limit: usize,
}

/// Parse a query string into a Query structure
pub fn parse_query(input: &str) -> Query {
    let mut parser = QueryParser::new(input);
    parser.parse()
}

/// Field names recognised before a ':'
const FIELDS: &[&str] = &["scope", "in", "section", "kind", "page", "top"];

/// Query parser
struct QueryParser<'a> {
    input: &'a str,
    pos: usize,
    /// Open parenthesized groups
    groups: usize,
    filters: QueryFilters,
    options: QueryOptions,
}

impl<'a> QueryParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            groups: 0,
            filters: QueryFilters::default(),
            options: QueryOptions::default(),
        }
    }

    fn parse(&mut self) -> Query {
        let mut nodes = Vec::new();

        loop {
            let node = self.parse_or();
            if node != QueryNode::Empty {
                nodes.push(node);
            }

            self.skip_whitespace();
            if self.is_eof() {
                break;
            }
            // Unbalanced ')' at top level
            self.advance();
        }

        let root = match nodes.len() {
            0 => QueryNode::Empty,
            1 => nodes.remove(0),
            _ => QueryNode::And(nodes),
        };

        Query {
            root,
            filters: self.filters.clone(),
            options: self.options.clone(),
        }
    }

    fn parse_or(&mut self) -> QueryNode {
        let mut nodes = vec![self.parse_and()];

        self.skip_whitespace();
        while self.consume_char('|') {
            self.skip_whitespace();
            nodes.push(self.parse_and());
            self.skip_whitespace();
        }

        // Filters parse to Empty; an alternative that is only filters adds nothing
        nodes.retain(|n| *n != QueryNode::Empty);

        match nodes.len() {
            0 => QueryNode::Empty,
            1 => nodes.remove(0),
            _ => QueryNode::Or(nodes),
        }
    }

    fn parse_and(&mut self) -> QueryNode {
        let mut nodes = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_eof() || self.peek_char() == Some(')') || self.peek_char() == Some('|') {
                break;
            }

            let node = self.parse_unary();
            if node != QueryNode::Empty {
                nodes.push(node);
            }
        }

        match nodes.len() {
            0 => QueryNode::Empty,
            1 => nodes.remove(0),
            _ => QueryNode::And(nodes),
        }
    }

    fn parse_unary(&mut self) -> QueryNode {
        self.skip_whitespace();

        if self.consume_char('-') {
            return match self.parse_primary() {
                QueryNode::Empty => QueryNode::Empty,
                inner => QueryNode::Not(Box::new(inner)),
            };
        }

        if self.consume_char('^') {
            return match self.parse_primary() {
                QueryNode::Literal(text) | QueryNode::Phrase(text) => QueryNode::Prefix(text),
                other => other,
            };
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> QueryNode {
        self.skip_whitespace();

        // Parenthesized expression
        if self.consume_char('(') {
            let open = self.pos - 1;
            self.groups += 1;
            let node = self.parse_or();
            self.groups -= 1;
            let closed = self.consume_char(')');

            // `()` on its own is symbol text, not an empty group
            let inner = &self.input[open + 1..self.pos - usize::from(closed)];
            if closed && inner.trim().is_empty() {
                return QueryNode::Literal(self.input[open..self.pos].to_string());
            }
            return node;
        }

        // Quoted phrase
        if self.peek_char() == Some('"') {
            return self.parse_phrase();
        }

        // Regex
        if self.remaining().starts_with("re:/") {
            return self.parse_regex();
        }

        // Field filter or literal
        self.parse_term()
    }

    fn parse_phrase(&mut self) -> QueryNode {
        self.consume_char('"');
        let start = self.pos;

        while !self.is_eof() && self.peek_char() != Some('"') {
            self.advance();
        }

        let phrase = self.input[start..self.pos].to_string();
        self.consume_char('"');

        if phrase.is_empty() {
            QueryNode::Empty
        } else {
            QueryNode::Phrase(phrase)
        }
    }

    fn parse_regex(&mut self) -> QueryNode {
        // Skip "re:/"
        self.pos += 4;
        let start = self.pos;

        // Find closing unescaped /
        let mut escaped = false;
        while let Some(ch) = self.peek_char() {
            if ch == '/' && !escaped {
                break;
            }
            escaped = ch == '\\' && !escaped;
            self.advance();
        }

        let pattern = self.input[start..self.pos].replace("\\/", "/");
        self.consume_char('/');

        QueryNode::Regex(pattern)
    }

    fn parse_term(&mut self) -> QueryNode {
        let start = self.pos;
        // Operator characters inside a word belong to it (`operator()`,
        // `foo(int)`, `operator|`); `(` and `|` only act as operators on their own
        let mut depth = 0usize;

        while let Some(ch) = self.peek_char() {
            match ch {
                c if c.is_whitespace() => break,
                '|' if self.pos == start => break,
                '(' if self.pos == start => break,
                '(' => depth += 1,
                ')' if depth > 0 => depth -= 1,
                ')' if self.groups > 0 => break,
                _ => {}
            }
            self.advance();
        }

        let input = self.input;
        let word = &input[start..self.pos];
        if word.is_empty() {
            return QueryNode::Empty;
        }

        if let Some((field, value)) = word.split_once(':') {
            let field = field.to_lowercase();
            if FIELDS.contains(&field.as_str()) {
                return self.parse_field(&field, value);
            }
        }

        // Unknown field or plain word (e.g. `Engine::init`), treat as literal
        QueryNode::Literal(word.to_string())
    }

    fn parse_field(&mut self, field: &str, value: &str) -> QueryNode {
        if value.is_empty() {
            return QueryNode::Empty;
        }
        let value = value.to_string();

        match field {
            "scope" | "in" => self.filters.scope = Some(value),
            "section" => self.filters.section = Some(value.to_lowercase()),
            "kind" => self.filters.kind = Some(value.to_lowercase()),
            "page" => self.filters.page = Some(value),
            "top" => {
                if let Ok(n) = value.parse() {
                    self.options.limit = n;
                }
            }
            _ => return QueryNode::Literal(format!("{}:{}", field, value)),
        }

        QueryNode::Empty
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && self.peek_char().map(|c| c.is_whitespace()).unwrap_or(false) {
            self.advance();
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn consume_char(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.pos += ch.len_utf8();
        }
    }

    fn remaining(&self) -> &str {
        &self.input[self.pos..]
    }
}

impl QueryNode {
    /// Turn plain terms into key prefixes, the way Doxygen's own search box matches.
    /// Phrases and regexes are left alone.
    pub fn into_prefix(self) -> QueryNode {
        match self {
            QueryNode::Literal(text) => QueryNode::Prefix(text),
            QueryNode::And(nodes) => {
                QueryNode::And(nodes.into_iter().map(QueryNode::into_prefix).collect())
            }
            QueryNode::Or(nodes) => {
                QueryNode::Or(nodes.into_iter().map(QueryNode::into_prefix).collect())
            }
            QueryNode::Not(inner) => QueryNode::Not(Box::new(inner.into_prefix())),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_query() {
        let q = parse_query("engine");
        assert!(matches!(q.root, QueryNode::Literal(ref s) if s == "engine"));
    }

    #[test]
    fn test_identifier_with_underscores() {
        let q = parse_query("get_current_dir");
        assert_eq!(q.root, QueryNode::Literal("get_current_dir".to_string()));
    }

    #[test]
    fn test_phrase_query() {
        let q = parse_query("\"operator ()\"");
        assert!(matches!(q.root, QueryNode::Phrase(ref s) if s == "operator ()"));
    }

    #[test]
    fn test_prefix_query() {
        let q = parse_query("^game");
        assert_eq!(q.root, QueryNode::Prefix("game".to_string()));
    }

    #[test]
    fn test_and_query() {
        let q = parse_query("game state");
        assert!(matches!(q.root, QueryNode::And(ref nodes) if nodes.len() == 2));
    }

    #[test]
    fn test_or_query() {
        let q = parse_query("redo | undo");
        assert!(matches!(q.root, QueryNode::Or(ref nodes) if nodes.len() == 2));
    }

    #[test]
    fn test_not_query() {
        let q = parse_query("-gizmo");
        assert!(matches!(q.root, QueryNode::Not(_)));
    }

    #[test]
    fn test_grouping() {
        let q = parse_query("(redo | undo) -gizmo");
        match q.root {
            QueryNode::And(nodes) => {
                assert!(matches!(nodes[0], QueryNode::Or(_)));
                assert!(matches!(nodes[1], QueryNode::Not(_)));
            }
            other => panic!("Expected And node, got {:?}", other),
        }
    }

    #[test]
    fn test_regex() {
        let q = parse_query("re:/^get_.*dir$/");
        assert_eq!(q.root, QueryNode::Regex("^get_.*dir$".to_string()));
    }

    #[test]
    fn test_regex_escaped_slash() {
        let q = parse_query(r"re:/a\/b/");
        assert_eq!(q.root, QueryNode::Regex("a/b".to_string()));
    }

    #[test]
    fn test_scope_filter() {
        let q = parse_query("scope:Engine get");
        assert_eq!(q.filters.scope, Some("Engine".to_string()));
        assert_eq!(q.root, QueryNode::Literal("get".to_string()));
    }

    #[test]
    fn test_in_is_scope_alias() {
        let q = parse_query("in:Board_Component");
        assert_eq!(q.filters.scope, Some("Board_Component".to_string()));
    }

    #[test]
    fn test_section_and_kind_filters_lowercased() {
        let q = parse_query("section:Functions kind:Class render");
        assert_eq!(q.filters.section, Some("functions".to_string()));
        assert_eq!(q.filters.kind, Some("class".to_string()));
    }

    #[test]
    fn test_page_filter() {
        let q = parse_query("page:class_engine");
        assert_eq!(q.filters.page, Some("class_engine".to_string()));
        assert!(matches!(q.root, QueryNode::Empty));
    }

    #[test]
    fn test_top_limit() {
        let q = parse_query("top:5 render");
        assert_eq!(q.options.limit, 5);
    }

    #[test]
    fn test_top_limit_zero() {
        // top:0 means unlimited
        let q = parse_query("top:0 render");
        assert_eq!(q.options.limit, 0);
    }

    #[test]
    fn test_unknown_field_is_literal() {
        let q = parse_query("Engine::init");
        assert_eq!(q.root, QueryNode::Literal("Engine::init".to_string()));
    }

    #[test]
    fn test_operator_characters_are_literal() {
        let q = parse_query("~engine");
        assert_eq!(q.root, QueryNode::Literal("~engine".to_string()));
    }

    #[test]
    fn test_stray_paren_does_not_hang() {
        let q = parse_query(") redo");
        assert_eq!(q.root, QueryNode::Literal("redo".to_string()));
    }

    #[test]
    fn test_call_parens_stay_in_word() {
        assert_eq!(
            parse_query("operator()").root,
            QueryNode::Literal("operator()".to_string())
        );
        assert_eq!(
            parse_query("foo(int)").root,
            QueryNode::Literal("foo(int)".to_string())
        );
        assert_eq!(
            parse_query("operator)").root,
            QueryNode::Literal("operator)".to_string())
        );
        assert_eq!(
            parse_query("operator||").root,
            QueryNode::Literal("operator||".to_string())
        );
    }

    #[test]
    fn test_empty_group_is_literal() {
        assert_eq!(parse_query("()").root, QueryNode::Literal("()".to_string()));
        assert_eq!(
            parse_query("(operator() | redo)").root,
            QueryNode::Or(vec![
                QueryNode::Literal("operator()".to_string()),
                QueryNode::Literal("redo".to_string()),
            ])
        );
    }

    #[test]
    fn test_filter_only_group_is_not_literal() {
        let q = parse_query("(scope:Engine) get");
        assert_eq!(q.filters.scope, Some("Engine".to_string()));
        assert_eq!(q.root, QueryNode::Literal("get".to_string()));
    }

    #[test]
    fn test_into_prefix() {
        let q = parse_query("game -buffer \"a b\"");
        assert_eq!(
            q.root.into_prefix(),
            QueryNode::And(vec![
                QueryNode::Prefix("game".to_string()),
                QueryNode::Not(Box::new(QueryNode::Prefix("buffer".to_string()))),
                QueryNode::Phrase("a b".to_string()),
            ])
        );
    }
}
