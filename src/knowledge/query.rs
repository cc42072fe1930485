//! Compilation of GraphQL queries into statement filters.
//!
//! The runtime executes a GraphQL subset sufficient for statement-level
//! collaboration: one top-level field whose arguments are equality filters
//! over statement components, with variable substitution. For example:
//!
//! ```graphql
//! query {
//!   statements(subject: "project-alpha", predicate: "ex:reviewedBy") {
//!     subject predicate object
//!   }
//! }
//! ```
//!
//! ```graphql
//! subscription OnReview($p: String!) {
//!   statementChanged(predicate: $p) { changeId }
//! }
//! ```
//!
//! The same compiled [`StatementFilter`] drives both query execution and
//! subscription matching. Richer GraphQL engines can be plugged in behind
//! the `KnowledgeStore` trait without touching this module.

use serde_json::Value;

use crate::types::{KGObject, KGStatement};

/// An equality filter over statement components. `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementFilter {
    /// Match the subject id.
    pub subject: Option<String>,
    /// Match the predicate id.
    pub predicate: Option<String>,
    /// Match a resource object's id.
    pub object_id: Option<String>,
    /// Match a literal object's value.
    pub object_value: Option<Value>,
    /// Match the named graph.
    pub graph: Option<String>,
}

impl StatementFilter {
    /// Whether a statement satisfies every set component of this filter.
    pub fn matches(&self, statement: &KGStatement) -> bool {
        if let Some(ref subject) = self.subject {
            if statement.subject.id != *subject {
                return false;
            }
        }
        if let Some(ref predicate) = self.predicate {
            if statement.predicate.id != *predicate {
                return false;
            }
        }
        if let Some(ref object_id) = self.object_id {
            match &statement.object {
                KGObject::Resource { id, .. } if id == object_id => {}
                _ => return false,
            }
        }
        if let Some(ref expected) = self.object_value {
            match &statement.object {
                KGObject::Literal { value, .. } if values_equal(value, expected) => {}
                _ => return false,
            }
        }
        if let Some(ref graph) = self.graph {
            if statement.graph.as_deref() != Some(graph.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Numeric-tolerant JSON equality (`5` matches `5.0`).
fn values_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// A query compiled to its result field and statement filter.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// The top-level field name, used as the key of the result data.
    pub field: String,
    /// The filter the field's arguments compile to.
    pub filter: StatementFilter,
}

/// Compile a query or subscription document into a [`CompiledQuery`].
///
/// Accepts an optional operation keyword (`query` / `subscription`) with an
/// optional operation name and variable definitions, then a selection set
/// whose first field provides the filter arguments. Variables referenced as
/// `$name` are resolved from `variables`.
pub fn compile(
    query: &str,
    variables: Option<&serde_json::Map<String, Value>>,
) -> Result<CompiledQuery, String> {
    let tokens = tokenize(query)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        variables,
    };
    parser.parse_document()
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    Variable(String),
    Punct(char),
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            // Whitespace and commas are insignificant in GraphQL.
            c if c.is_whitespace() || c == ',' => {
                chars.next();
            }
            '#' => {
                // Comment to end of line.
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '{' | '}' | '(' | ')' | ':' | '!' | '[' | ']' | '=' => {
                tokens.push(Token::Punct(c));
                chars.next();
            }
            '$' => {
                chars.next();
                let name = read_ident(&mut chars);
                if name.is_empty() {
                    return Err("expected variable name after '$'".to_string());
                }
                tokens.push(Token::Variable(name));
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some('n') => value.push('\n'),
                            Some('t') => value.push('\t'),
                            Some(other) => value.push(other),
                            None => return Err("unterminated escape in string".to_string()),
                        },
                        other => value.push(other),
                    }
                }
                if !closed {
                    return Err("unterminated string literal".to_string());
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut literal = String::new();
                literal.push(c);
                chars.next();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || c == '+' || c == '-'
                    {
                        literal.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let num: f64 = literal
                    .parse()
                    .map_err(|_| format!("invalid number literal '{}'", literal))?;
                tokens.push(Token::Num(num));
            }
            c if c.is_alphabetic() || c == '_' => {
                let name = read_ident(&mut chars);
                tokens.push(Token::Ident(name));
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    Ok(tokens)
}

fn read_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut name = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_alphanumeric() || c == '_' {
            name.push(c);
            chars.next();
        } else {
            break;
        }
    }
    name
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    variables: Option<&'a serde_json::Map<String, Value>>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_punct(&mut self, c: char) -> Result<(), String> {
        match self.next() {
            Some(Token::Punct(found)) if found == c => Ok(()),
            other => Err(format!("expected '{}', found {:?}", c, other)),
        }
    }

    fn parse_document(&mut self) -> Result<CompiledQuery, String> {
        // Optional operation keyword + name + variable definitions.
        if let Some(Token::Ident(keyword)) = self.peek() {
            match keyword.as_str() {
                "query" | "subscription" => {
                    self.next();
                    // Optional operation name.
                    if matches!(self.peek(), Some(Token::Ident(_))) {
                        self.next();
                    }
                    // Optional variable definitions: ($p: String!) — skipped.
                    if matches!(self.peek(), Some(Token::Punct('('))) {
                        self.skip_balanced('(', ')')?;
                    }
                }
                "mutation" => {
                    return Err("mutations are expressed via knowledge/update".to_string())
                }
                _ => {}
            }
        }

        self.expect_punct('{')?;

        let field = match self.next() {
            Some(Token::Ident(name)) => name,
            other => return Err(format!("expected a field name, found {:?}", other)),
        };

        let mut filter = StatementFilter::default();
        if matches!(self.peek(), Some(Token::Punct('('))) {
            self.next();
            self.parse_arguments(&mut filter)?;
        }

        // The field's selection set (and everything after) only shapes the
        // response, never the filter; validate balance and stop.
        if matches!(self.peek(), Some(Token::Punct('{'))) {
            self.skip_balanced('{', '}')?;
        }

        Ok(CompiledQuery { field, filter })
    }

    fn parse_arguments(&mut self, filter: &mut StatementFilter) -> Result<(), String> {
        loop {
            match self.next() {
                Some(Token::Punct(')')) => return Ok(()),
                Some(Token::Ident(name)) => {
                    self.expect_punct(':')?;
                    let value = self.parse_value()?;
                    self.apply_argument(filter, &name, value)?;
                }
                other => return Err(format!("expected an argument name, found {:?}", other)),
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value, String> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Value::String(s)),
            Some(Token::Num(n)) => serde_json::Number::from_f64(n)
                .map(Value::Number)
                .ok_or_else(|| "non-finite number literal".to_string()),
            Some(Token::Ident(word)) => match word.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "null" => Ok(Value::Null),
                other => Err(format!("unsupported enum value '{}'", other)),
            },
            Some(Token::Variable(name)) => {
                let variables = self
                    .variables
                    .ok_or_else(|| format!("variable '${}' used but no variables given", name))?;
                variables
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| format!("variable '${}' is not defined", name))
            }
            other => Err(format!("expected an argument value, found {:?}", other)),
        }
    }

    fn apply_argument(
        &self,
        filter: &mut StatementFilter,
        name: &str,
        value: Value,
    ) -> Result<(), String> {
        let as_string = |value: Value, name: &str| -> Result<String, String> {
            match value {
                Value::String(s) => Ok(s),
                other => Err(format!("argument '{}' must be a string, got {}", name, other)),
            }
        };
        match name {
            "subject" | "subjectId" => filter.subject = Some(as_string(value, name)?),
            "predicate" | "predicateId" => filter.predicate = Some(as_string(value, name)?),
            "object" | "objectId" => filter.object_id = Some(as_string(value, name)?),
            "value" => {
                if !(value.is_string() || value.is_number() || value.is_boolean()) {
                    return Err("argument 'value' must be a scalar".to_string());
                }
                filter.object_value = Some(value);
            }
            "graph" => filter.graph = Some(as_string(value, name)?),
            other => return Err(format!("unsupported filter argument '{}'", other)),
        }
        Ok(())
    }

    fn skip_balanced(&mut self, open: char, close: char) -> Result<(), String> {
        self.expect_punct(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.next() {
                Some(Token::Punct(c)) if c == open => depth += 1,
                Some(Token::Punct(c)) if c == close => depth -= 1,
                Some(_) => {}
                None => return Err(format!("unbalanced '{}' in query", open)),
            }
        }
        Ok(())
    }
}
