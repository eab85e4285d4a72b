//! Parser and evaluator for the query statements understood by the in-memory repository.
//!
//! Supported grammar:
//!
//! ```text
//! statement := SELECT ( '*' | ident (',' ident)* ) FROM ident [ WHERE expr ]
//! expr      := term ( OR term )*
//! term      := factor ( AND factor )*
//! factor    := NOT factor | '(' expr ')' | IN_TREE '(' string ')' | IN_FOLDER '(' string ')'
//!            | ident op literal | ident [NOT] IN '(' literal (',' literal)* ')'
//!            | ident IS [NOT] NULL
//! literal   := string | integer | TRUE | FALSE | TIMESTAMP string
//! ```
//!
//! Keywords are case-insensitive. Strings are single-quoted; `\'` and `\\` escape a quote and
//! a backslash.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),

    #[error("Unterminated string literal starting at offset {0}")]
    UnterminatedString(usize),

    #[error("Expected {expected}, found {found}")]
    Unexpected { expected: &'static str, found: String },

    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("Unknown query target '{0}'")]
    UnknownTarget(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    LParen,
    RParen,
    Comma,
    Star,
    Op(CompareOp),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("'{}'", s),
            Token::Str(s) => format!("string '{}'", s),
            Token::Int(i) => i.to_string(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::Comma => "','".into(),
            Token::Star => "'*'".into(),
            Token::Op(op) => format!("{:?}", op),
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(keyword))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Op(CompareOp::Eq));
                i += 1;
            }
            '<' => match chars.get(i + 1) {
                Some('>') => {
                    tokens.push(Token::Op(CompareOp::Ne));
                    i += 2;
                }
                Some('=') => {
                    tokens.push(Token::Op(CompareOp::Le));
                    i += 2;
                }
                _ => {
                    tokens.push(Token::Op(CompareOp::Lt));
                    i += 1;
                }
            },
            '>' => match chars.get(i + 1) {
                Some('=') => {
                    tokens.push(Token::Op(CompareOp::Ge));
                    i += 2;
                }
                _ => {
                    tokens.push(Token::Op(CompareOp::Gt));
                    i += 1;
                }
            },
            '\'' => {
                let start = i;
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(ParseError::UnterminatedString(start)),
                        Some('\\') => {
                            match chars.get(i + 1) {
                                Some(escaped) => value.push(*escaped),
                                None => return Err(ParseError::UnterminatedString(start)),
                            }
                            i += 2;
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(other) => {
                            value.push(*other);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while chars.get(i).is_some_and(|n| n.is_ascii_digit()) {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text.parse().map_err(|_| ParseError::UnexpectedChar(c, start))?;
                tokens.push(Token::Int(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while chars.get(i).is_some_and(|n| n.is_alphanumeric() || *n == '_' || *n == ':' || *n == '.') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(ParseError::UnexpectedChar(other, i)),
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Str(String),
    Int(i64),
    Bool(bool),
    Time(DateTime<Utc>),
}

impl Value {
    fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Document,
    Folder,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare { property: String, op: CompareOp, value: Value },
    In { property: String, values: Vec<Value>, negated: bool },
    IsNull { property: String, negated: bool },
    InTree(String),
    InFolder(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub target: Target,
    pub filter: Option<Expr>,
}

/// What the evaluator needs to know about a candidate object.
pub trait Row {
    fn property(&self, name: &str) -> Value;
    fn in_folder(&self, folder_id: &str) -> bool;
    fn in_tree(&self, folder_id: &str) -> bool;
}

impl Statement {
    pub fn parse(input: &str) -> Result<Statement, ParseError> {
        let mut parser = Parser { tokens: tokenize(input)?, pos: 0 };
        parser.statement()
    }

    pub fn matches(&self, row: &dyn Row) -> bool {
        self.filter.as_ref().is_none_or(|expr| expr.evaluate(row))
    }
}

impl Expr {
    pub fn evaluate(&self, row: &dyn Row) -> bool {
        match self {
            Expr::Or(a, b) => a.evaluate(row) || b.evaluate(row),
            Expr::And(a, b) => a.evaluate(row) && b.evaluate(row),
            Expr::Not(e) => !e.evaluate(row),
            Expr::Compare { property, op, value } => {
                let Some(ordering) = row.property(property).compare(value) else {
                    return false;
                };
                match op {
                    CompareOp::Eq => ordering == Ordering::Equal,
                    CompareOp::Ne => ordering != Ordering::Equal,
                    CompareOp::Lt => ordering == Ordering::Less,
                    CompareOp::Le => ordering != Ordering::Greater,
                    CompareOp::Gt => ordering == Ordering::Greater,
                    CompareOp::Ge => ordering != Ordering::Less,
                }
            }
            Expr::In { property, values, negated } => {
                let actual = row.property(property);
                if actual == Value::Null {
                    return false;
                }
                values.iter().any(|v| actual.compare(v) == Some(Ordering::Equal)) != *negated
            }
            Expr::IsNull { property, negated } => (row.property(property) == Value::Null) != *negated,
            Expr::InTree(id) => row.in_tree(id),
            Expr::InFolder(id) => row.in_folder(id),
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn found(&self) -> String {
        self.peek().map(Token::describe).unwrap_or_else(|| "end of statement".into())
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_keyword(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &'static str) -> Result<(), ParseError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(ParseError::Unexpected { expected: keyword, found: self.found() })
        }
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<(), ParseError> {
        if self.peek() == Some(&token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(ParseError::Unexpected { expected, found: self.found() })
        }
    }

    fn ident(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(ParseError::Unexpected { expected: "identifier", found: self.found() }),
        }
    }

    fn string(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Str(s)) => {
                let s = s.clone();
                self.pos += 1;
                Ok(s)
            }
            _ => Err(ParseError::Unexpected { expected: "string literal", found: self.found() }),
        }
    }

    fn statement(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword("SELECT")?;
        if self.peek() == Some(&Token::Star) {
            self.pos += 1;
        } else {
            self.ident()?;
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                self.ident()?;
            }
        }
        self.expect_keyword("FROM")?;
        let target = match self.ident()?.as_str() {
            "cmis:document" => Target::Document,
            "cmis:folder" => Target::Folder,
            other => return Err(ParseError::UnknownTarget(other.to_string())),
        };
        let filter = if self.eat_keyword("WHERE") { Some(self.expr()?) } else { None };
        if self.peek().is_some() {
            return Err(ParseError::Unexpected { expected: "end of statement", found: self.found() });
        }
        Ok(Statement { target, filter })
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.term()?;
        while self.eat_keyword("OR") {
            left = Expr::Or(Box::new(left), Box::new(self.term()?));
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.factor()?;
        while self.eat_keyword("AND") {
            left = Expr::And(Box::new(left), Box::new(self.factor()?));
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        if self.eat_keyword("NOT") {
            return Ok(Expr::Not(Box::new(self.factor()?)));
        }
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.expr()?;
            self.expect(Token::RParen, "')'")?;
            return Ok(inner);
        }
        for (keyword, tree) in [("IN_TREE", true), ("IN_FOLDER", false)] {
            if self.eat_keyword(keyword) {
                self.expect(Token::LParen, "'('")?;
                let id = self.string()?;
                self.expect(Token::RParen, "')'")?;
                return Ok(if tree { Expr::InTree(id) } else { Expr::InFolder(id) });
            }
        }

        let property = self.ident()?;
        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            self.expect_keyword("NULL")?;
            return Ok(Expr::IsNull { property, negated });
        }
        let negated = self.eat_keyword("NOT");
        if self.eat_keyword("IN") {
            self.expect(Token::LParen, "'('")?;
            let mut values = vec![self.literal()?];
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                values.push(self.literal()?);
            }
            self.expect(Token::RParen, "')'")?;
            return Ok(Expr::In { property, values, negated });
        }
        if negated {
            return Err(ParseError::Unexpected { expected: "IN", found: self.found() });
        }
        match self.next() {
            Some(Token::Op(op)) => Ok(Expr::Compare { property, op, value: self.literal()? }),
            other => Err(ParseError::Unexpected {
                expected: "comparison operator",
                found: other.map(|t| t.describe()).unwrap_or_else(|| "end of statement".into()),
            }),
        }
    }

    fn literal(&mut self) -> Result<Value, ParseError> {
        if self.eat_keyword("TRUE") {
            return Ok(Value::Bool(true));
        }
        if self.eat_keyword("FALSE") {
            return Ok(Value::Bool(false));
        }
        if self.eat_keyword("TIMESTAMP") {
            let text = self.string()?;
            let parsed = DateTime::parse_from_rfc3339(&text)
                .map_err(|_| ParseError::InvalidTimestamp(text.clone()))?;
            return Ok(Value::Time(parsed.with_timezone(&Utc)));
        }
        match self.next() {
            Some(Token::Str(s)) => Ok(Value::Str(s)),
            Some(Token::Int(i)) => Ok(Value::Int(i)),
            other => Err(ParseError::Unexpected {
                expected: "literal",
                found: other.map(|t| t.describe()).unwrap_or_else(|| "end of statement".into()),
            }),
        }
    }
}
