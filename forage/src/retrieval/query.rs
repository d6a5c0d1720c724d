//! Boolean query engine.
//!
//! Parses textual boolean expressions like `crash AND (mobile OR "web app")`
//! into an expression tree, evaluates the tree against arbitrary text, and
//! can degrade an expression back into a flat keyword list for backends that
//! cannot express boolean search.
//!
//! Grammar (precedence low to high: OR, AND, NOT, primary):
//!
//! ```text
//! expr   := term (OR term)*
//! term   := factor (AND factor)*
//! factor := NOT factor | '(' expr ')' | KEYWORD
//! ```
//!
//! Operators match case-insensitively. Leaves match by case-insensitive
//! substring containment.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Upper bound on parser recursion. Checked before entering a new nesting
/// level so adversarial input errors out long before the call stack is at
/// risk.
pub const MAX_NESTING_DEPTH: usize = 20;

/// A parsed boolean expression. Built once per query string, immutable, and
/// freely shared for repeated evaluation against many documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BooleanNode {
    /// Keyword or quoted phrase.
    Leaf(String),
    Not(Box<BooleanNode>),
    And(Box<BooleanNode>, Box<BooleanNode>),
    Or(Box<BooleanNode>, Box<BooleanNode>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty query")]
    Empty,
    #[error("expected a keyword or '(' but the query ended")]
    UnexpectedEnd,
    #[error("expected a keyword or '(' but found '{0}'")]
    UnexpectedToken(String),
    #[error("unclosed '('")]
    UnclosedParen,
    #[error("unexpected trailing token '{0}'")]
    TrailingToken(String),
    #[error("query nesting deeper than {MAX_NESTING_DEPTH} levels")]
    TooDeep,
}

/// Split a query into tokens: parentheses, bare words, and quoted phrases.
///
/// A double-quoted run becomes a single token with the quotes stripped and
/// interior whitespace preserved. An unterminated quote closes at end of
/// input.
pub fn tokenize(query: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in query.chars() {
        match ch {
            '"' => {
                if in_quotes {
                    // Closing quote: emit even if the phrase is empty-ish.
                    tokens.push(std::mem::take(&mut current));
                    in_quotes = false;
                } else {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                    in_quotes = true;
                }
            }
            '(' | ')' if !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(ch.to_string());
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Parse a query string into a [`BooleanNode`] tree.
pub fn parse(query: &str) -> Result<BooleanNode, ParseError> {
    let tokens = tokenize(query);
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let node = parser.parse_expr(0)?;
    if let Some(extra) = parser.peek() {
        return Err(ParseError::TrailingToken(extra.to_string()));
    }
    Ok(node)
}

struct Parser<'a> {
    tokens: &'a [String],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn parse_expr(&mut self, depth: usize) -> Result<BooleanNode, ParseError> {
        let mut node = self.parse_term(depth)?;
        while self.peek().is_some_and(|t| t.eq_ignore_ascii_case("or")) {
            self.advance();
            let rhs = self.parse_term(depth)?;
            node = BooleanNode::Or(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_term(&mut self, depth: usize) -> Result<BooleanNode, ParseError> {
        let mut node = self.parse_factor(depth)?;
        while self.peek().is_some_and(|t| t.eq_ignore_ascii_case("and")) {
            self.advance();
            let rhs = self.parse_factor(depth)?;
            node = BooleanNode::And(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_factor(&mut self, depth: usize) -> Result<BooleanNode, ParseError> {
        let Some(token) = self.peek() else {
            return Err(ParseError::UnexpectedEnd);
        };

        if token.eq_ignore_ascii_case("not") {
            if depth >= MAX_NESTING_DEPTH {
                return Err(ParseError::TooDeep);
            }
            self.advance();
            let child = self.parse_factor(depth + 1)?;
            return Ok(BooleanNode::Not(Box::new(child)));
        }

        match token {
            "(" => {
                if depth >= MAX_NESTING_DEPTH {
                    return Err(ParseError::TooDeep);
                }
                self.advance();
                let inner = self.parse_expr(depth + 1)?;
                match self.peek() {
                    Some(")") => {
                        self.advance();
                        Ok(inner)
                    }
                    _ => Err(ParseError::UnclosedParen),
                }
            }
            ")" => Err(ParseError::UnexpectedToken(")".to_string())),
            keyword => {
                let leaf = BooleanNode::Leaf(keyword.to_string());
                self.advance();
                Ok(leaf)
            }
        }
    }
}

impl BooleanNode {
    /// Evaluate the expression against `text` using case-insensitive
    /// substring containment per leaf. AND/OR short-circuit.
    pub fn evaluate(&self, text: &str) -> bool {
        self.eval_lowered(&text.to_lowercase())
    }

    fn eval_lowered(&self, text: &str) -> bool {
        match self {
            BooleanNode::Leaf(keyword) => text.contains(&keyword.to_lowercase()),
            BooleanNode::Not(child) => !child.eval_lowered(text),
            BooleanNode::And(left, right) => left.eval_lowered(text) && right.eval_lowered(text),
            BooleanNode::Or(left, right) => left.eval_lowered(text) || right.eval_lowered(text),
        }
    }

    /// Collect every leaf value, left to right, depth first.
    pub fn extract_keywords(&self) -> Vec<String> {
        let mut keywords = Vec::new();
        self.collect_keywords(&mut keywords);
        keywords
    }

    fn collect_keywords(&self, out: &mut Vec<String>) {
        match self {
            BooleanNode::Leaf(keyword) => out.push(keyword.clone()),
            BooleanNode::Not(child) => child.collect_keywords(out),
            BooleanNode::And(left, right) | BooleanNode::Or(left, right) => {
                left.collect_keywords(out);
                right.collect_keywords(out);
            }
        }
    }
}

static BOOLEAN_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(AND|OR|NOT)\b").unwrap());

/// Degrade a query to a flat keyword string for backends without boolean
/// search.
///
/// Inputs without boolean markers pass through unchanged. Best-effort: if the
/// query looks boolean but does not parse, the original string is returned
/// rather than an error.
pub fn simplify_to_keywords(query: &str) -> String {
    let has_markers =
        BOOLEAN_MARKER.is_match(query) || query.contains('(') || query.contains(')');
    if !has_markers {
        return query.to_string();
    }

    match parse(query) {
        Ok(node) => node.extract_keywords().join(" "),
        Err(_) => query.to_string(),
    }
}

/// Parse a topic only if it actually uses boolean syntax.
///
/// Plain keyword topics and boolean-looking input that fails to parse both
/// yield `None`, so callers can fall back to treating the topic as free text.
pub fn parse_boolean_topic(query: &str) -> Option<BooleanNode> {
    let has_markers =
        BOOLEAN_MARKER.is_match(query) || query.contains('(') || query.contains(')');
    if !has_markers {
        return None;
    }
    parse(query).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(s: &str) -> BooleanNode {
        BooleanNode::Leaf(s.to_string())
    }

    #[test]
    fn tokenize_splits_on_parens_and_quotes() {
        assert_eq!(
            tokenize("(mobile OR \"web app\")"),
            vec!["(", "mobile", "OR", "web app", ")"]
        );
    }

    #[test]
    fn tokenize_closes_unterminated_quote_at_end() {
        assert_eq!(tokenize("\"left open"), vec!["left open"]);
    }

    #[test]
    fn tokenize_collapses_whitespace_outside_quotes() {
        assert_eq!(tokenize("  a   b  "), vec!["a", "b"]);
    }

    #[test]
    fn parse_or_binds_looser_than_and() {
        let node = parse("a OR b AND c").unwrap();
        assert_eq!(
            node,
            BooleanNode::Or(
                Box::new(leaf("a")),
                Box::new(BooleanNode::And(Box::new(leaf("b")), Box::new(leaf("c")))),
            )
        );
    }

    #[test]
    fn parse_not_binds_tighter_than_and() {
        let node = parse("NOT a AND b").unwrap();
        assert_eq!(
            node,
            BooleanNode::And(
                Box::new(BooleanNode::Not(Box::new(leaf("a")))),
                Box::new(leaf("b")),
            )
        );
    }

    #[test]
    fn parse_operators_match_case_insensitively() {
        assert_eq!(parse("a And b").unwrap(), parse("a AND b").unwrap());
        assert_eq!(parse("not a").unwrap(), parse("NOT a").unwrap());
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(parse("   "), Err(ParseError::Empty));
        assert_eq!(parse("a AND"), Err(ParseError::UnexpectedEnd));
        assert_eq!(parse("(a OR b"), Err(ParseError::UnclosedParen));
        assert_eq!(
            parse("a b"),
            Err(ParseError::TrailingToken("b".to_string()))
        );
        assert_eq!(
            parse("()"),
            Err(ParseError::UnexpectedToken(")".to_string()))
        );
    }

    #[test]
    fn parse_enforces_depth_limit() {
        let nested = |n: usize| format!("{}a{}", "(".repeat(n), ")".repeat(n));
        assert!(parse(&nested(20)).is_ok());
        assert_eq!(parse(&nested(21)), Err(ParseError::TooDeep));
    }

    #[test]
    fn evaluate_matches_boolean_semantics() {
        let node = parse("crash AND (mobile OR \"web app\")").unwrap();
        assert!(node.evaluate("Crash report from the mobile client"));
        assert!(node.evaluate("web app crash on login"));
        assert!(!node.evaluate("mobile battery drain"));
        assert!(!node.evaluate("desktop crash"));
    }

    #[test]
    fn evaluate_negation() {
        let node = parse("bug AND NOT duplicate").unwrap();
        assert!(node.evaluate("new bug in parser"));
        assert!(!node.evaluate("bug marked as duplicate"));
    }

    #[test]
    fn evaluate_is_case_insensitive() {
        let node = parse("TimeOut").unwrap();
        assert!(node.evaluate("request TIMEOUT after 30s"));
    }

    #[test]
    fn extract_keywords_in_document_order() {
        let node = parse("a AND (b OR NOT c)").unwrap();
        assert_eq!(node.extract_keywords(), vec!["a", "b", "c"]);
    }

    #[test]
    fn simplify_passes_plain_queries_through() {
        assert_eq!(simplify_to_keywords("mobile crash"), "mobile crash");
        // "android" contains "and" but not as a whole word
        assert_eq!(simplify_to_keywords("android crash"), "android crash");
    }

    #[test]
    fn simplify_flattens_boolean_queries() {
        assert_eq!(
            simplify_to_keywords("crash AND (mobile OR \"web app\")"),
            "crash mobile web app"
        );
    }

    #[test]
    fn simplify_falls_back_on_parse_failure() {
        assert_eq!(simplify_to_keywords("(a OR b"), "(a OR b");
    }

    #[test]
    fn parse_boolean_topic_ignores_plain_text() {
        assert!(parse_boolean_topic("mobile crash").is_none());
        assert!(parse_boolean_topic("(a OR b").is_none());
        assert!(parse_boolean_topic("a OR b").is_some());
    }
}
