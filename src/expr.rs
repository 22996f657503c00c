//! Filter condition language.
//!
//! Conditions are built either programmatically (column filters) or parsed
//! from strings such as:
//! - `v < 9`
//! - `name == 'Alice' AND score >= 90`
//! - `name CONTAINS 'li' OR name STARTSWITH 'B'`
//! - `(age >= 18) OR NOT (role IS NULL)`

use crate::column::ColumnValue;
use crate::error::{QueryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A condition evaluated against one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Compare column to a literal value
    Compare {
        column: String,
        op: CompareOp,
        value: LiteralValue,
    },
    IsNull { column: String },
    IsNotNull { column: String },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,         // ==
    Ne,         // !=
    Lt,         // <
    Le,         // <=
    Gt,         // >
    Ge,         // >=
    Contains,   // CONTAINS
    StartsWith, // STARTSWITH
    EndsWith,   // ENDSWITH
}

impl CompareOp {
    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Contains => "CONTAINS",
            CompareOp::StartsWith => "STARTSWITH",
            CompareOp::EndsWith => "ENDSWITH",
        }
    }
}

/// Literal values that can appear in conditions.
///
/// Deserializes from plain JSON scalars, so grid options can write
/// `"value": 9` or `"value": "abc"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Null,
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            LiteralValue::Int(n) => write!(f, "{}", n),
            LiteralValue::Float(x) => {
                // no exponent, and always a fraction so it lexes back as a float
                let text = x.to_string();
                if text.contains(['.', 'i', 'N']) {
                    f.write_str(&text)
                } else {
                    write!(f, "{}.0", text)
                }
            }
            LiteralValue::String(s) => {
                write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
            }
            LiteralValue::Null => f.write_str("NULL"),
        }
    }
}

impl Expr {
    pub fn compare(column: impl Into<String>, op: CompareOp, value: LiteralValue) -> Self {
        Expr::Compare {
            column: column.into(),
            op,
            value,
        }
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Expr) -> Self {
        Expr::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Evaluate against a row, reading column values through `get_column`.
    ///
    /// A column the lookup cannot resolve reads as null.
    pub fn eval<'a, F>(&self, get_column: &F) -> bool
    where
        F: Fn(&str) -> Option<&'a ColumnValue>,
    {
        match self {
            Expr::Compare { column, op, value } => match get_column(column) {
                None => false,
                Some(col_val) => compare_values(col_val, *op, value),
            },
            Expr::IsNull { column } => {
                matches!(get_column(column), Some(ColumnValue::Null) | None)
            }
            Expr::IsNotNull { column } => {
                !matches!(get_column(column), Some(ColumnValue::Null) | None)
            }
            Expr::And(left, right) => left.eval(get_column) && right.eval(get_column),
            Expr::Or(left, right) => left.eval(get_column) || right.eval(get_column),
            Expr::Not(inner) => !inner.eval(get_column),
        }
    }

    /// All column names referenced, sorted and deduplicated.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = Vec::new();
        self.collect_columns(&mut columns);
        columns.sort();
        columns.dedup();
        columns
    }

    fn collect_columns(&self, columns: &mut Vec<String>) {
        match self {
            Expr::Compare { column, .. } | Expr::IsNull { column } | Expr::IsNotNull { column } => {
                columns.push(column.clone())
            }
            Expr::And(left, right) | Expr::Or(left, right) => {
                left.collect_columns(columns);
                right.collect_columns(columns);
            }
            Expr::Not(inner) => inner.collect_columns(columns),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Compare { column, op, value } => {
                write!(f, "{} {} {}", column, op.symbol(), value)
            }
            Expr::IsNull { column } => write!(f, "{} IS NULL", column),
            Expr::IsNotNull { column } => write!(f, "{} IS NOT NULL", column),
            Expr::And(left, right) => write!(f, "({} AND {})", left, right),
            Expr::Or(left, right) => write!(f, "({} OR {})", left, right),
            Expr::Not(inner) => write!(f, "NOT ({})", inner),
        }
    }
}

/// Compare a column value to a literal value.
///
/// Any comparison involving NULL is false; use IS NULL / IS NOT NULL.
fn compare_values(col_val: &ColumnValue, op: CompareOp, lit_val: &LiteralValue) -> bool {
    match (col_val, lit_val) {
        (ColumnValue::Null, _) | (_, LiteralValue::Null) => false,

        (ColumnValue::String(a), LiteralValue::String(b)) => match op {
            CompareOp::Contains => a.contains(b.as_str()),
            CompareOp::StartsWith => a.starts_with(b.as_str()),
            CompareOp::EndsWith => a.ends_with(b.as_str()),
            _ => compare_ord(a.as_str(), b.as_str(), op),
        },

        (ColumnValue::Bool(a), LiteralValue::Bool(b)) => match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            _ => false,
        },

        (ColumnValue::Int32(_) | ColumnValue::Int64(_), LiteralValue::Int(b)) => {
            col_val.as_i64().map_or(false, |a| compare_ord(a, *b, op))
        }

        (_, LiteralValue::Int(_) | LiteralValue::Float(_)) => {
            let lit = match lit_val {
                LiteralValue::Int(n) => *n as f64,
                LiteralValue::Float(x) => *x,
                _ => return false,
            };
            col_val.as_f64().map_or(false, |a| compare_ord(a, lit, op))
        }

        _ => false,
    }
}

fn compare_ord<T: PartialOrd>(a: T, b: T, op: CompareOp) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
        CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
    Op(CompareOp),
    And,
    Or,
    Not,
    Is,
    LParen,
    RParen,
    Eof,
}

struct Lexer {
    input: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    /// Consume `next` if it follows, yielding `long`, else `short`.
    fn either(&mut self, next: char, long: Token, short: Token) -> Token {
        self.advance();
        if self.peek() == Some(next) {
            self.advance();
            long
        } else {
            short
        }
    }

    fn read_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek().filter(|c| pred(*c)) {
            out.push(c);
            self.advance();
        }
        out
    }

    fn read_number(&mut self, negative: bool) -> Result<Token> {
        let text = self.read_while(|c| c.is_ascii_digit() || c == '.');
        let text = if negative { format!("-{}", text) } else { text };

        if text.contains('.') {
            text.parse()
                .map(Token::Float)
                .map_err(|_| QueryError::Expression(format!("Invalid number '{}'", text)))
        } else {
            text.parse()
                .map(Token::Int)
                .map_err(|_| QueryError::Expression(format!("Invalid number '{}'", text)))
        }
    }

    fn read_string(&mut self, quote: char) -> Result<Token> {
        self.advance();
        let mut s = String::new();

        while let Some(c) = self.advance() {
            match c {
                _ if c == quote => return Ok(Token::String(s)),
                '\\' => match self.advance() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some(escaped) => s.push(escaped),
                    None => break,
                },
                _ => s.push(c),
            }
        }

        Err(QueryError::Expression("Unterminated string".to_string()))
    }

    fn next_token(&mut self) -> Result<Token> {
        while self.peek().map_or(false, char::is_whitespace) {
            self.advance();
        }

        let c = match self.peek() {
            None => return Ok(Token::Eof),
            Some(c) => c,
        };

        match c {
            '(' => {
                self.advance();
                Ok(Token::LParen)
            }
            ')' => {
                self.advance();
                Ok(Token::RParen)
            }
            // a single = also means ==
            '=' => Ok(self.either('=', Token::Op(CompareOp::Eq), Token::Op(CompareOp::Eq))),
            '!' => Ok(self.either('=', Token::Op(CompareOp::Ne), Token::Not)),
            '<' => Ok(self.either('=', Token::Op(CompareOp::Le), Token::Op(CompareOp::Lt))),
            '>' => Ok(self.either('=', Token::Op(CompareOp::Ge), Token::Op(CompareOp::Gt))),
            '\'' | '"' => self.read_string(c),
            '-' if self.peek_at(1).map_or(false, |d| d.is_ascii_digit() || d == '.') => {
                self.advance();
                self.read_number(true)
            }
            _ if c.is_ascii_digit() => self.read_number(false),
            _ if c.is_alphabetic() || c == '_' => {
                let ident = self.read_while(|c| c.is_alphanumeric() || c == '_');
                Ok(match ident.to_uppercase().as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "NOT" => Token::Not,
                    "IS" => Token::Is,
                    "NULL" => Token::Null,
                    "TRUE" => Token::Bool(true),
                    "FALSE" => Token::Bool(false),
                    "CONTAINS" => Token::Op(CompareOp::Contains),
                    "STARTSWITH" => Token::Op(CompareOp::StartsWith),
                    "ENDSWITH" => Token::Op(CompareOp::EndsWith),
                    _ => Token::Ident(ident),
                })
            }
            _ => Err(QueryError::Expression(format!("Unexpected character: {}", c))),
        }
    }
}

/// Most NOT, AND, OR and parenthesis operators one expression may use.
/// This also bounds the depth of the tree and of the parser's recursion.
const MAX_OPERATORS: usize = 256;

/// Recursive-descent parser; precedence is OR < AND < NOT < comparison.
struct Parser {
    lexer: Lexer,
    current: Token,
    operators: usize,
}

impl Parser {
    fn new(input: &str) -> Result<Self> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            operators: 0,
        })
    }

    fn count_operator(&mut self) -> Result<()> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(QueryError::Expression(format!(
                "Expression nested too deeply (more than {} operators)",
                MAX_OPERATORS
            )));
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<Token> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        if &self.current == expected {
            self.advance()?;
            Ok(())
        } else {
            Err(QueryError::Expression(format!(
                "Expected {:?}, got {:?}",
                expected, self.current
            )))
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.current == Token::Or {
            self.advance()?;
            self.count_operator()?;
            left = left.or(self.parse_and()?);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.current == Token::And {
            self.advance()?;
            self.count_operator()?;
            left = left.and(self.parse_not()?);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.current == Token::Not {
            self.advance()?;
            self.count_operator()?;
            Ok(self.parse_not()?.negate())
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        if self.current == Token::LParen {
            self.advance()?;
            self.count_operator()?;
            let expr = self.parse_or()?;
            self.expect(&Token::RParen)?;
            return Ok(expr);
        }

        let column = match self.advance()? {
            Token::Ident(name) => name,
            other => {
                return Err(QueryError::Expression(format!(
                    "Expected column name, got {:?}",
                    other
                )))
            }
        };

        if self.current == Token::Is {
            self.advance()?;
            let negated = if self.current == Token::Not {
                self.advance()?;
                true
            } else {
                false
            };
            self.expect(&Token::Null)?;
            return Ok(if negated {
                Expr::IsNotNull { column }
            } else {
                Expr::IsNull { column }
            });
        }

        let op = match self.advance()? {
            Token::Op(op) => op,
            other => {
                return Err(QueryError::Expression(format!(
                    "Expected comparison operator, got {:?}",
                    other
                )))
            }
        };

        let value = match self.advance()? {
            Token::Int(n) => LiteralValue::Int(n),
            Token::Float(x) => LiteralValue::Float(x),
            Token::String(s) => LiteralValue::String(s),
            Token::Bool(b) => LiteralValue::Bool(b),
            Token::Null => LiteralValue::Null,
            other => {
                return Err(QueryError::Expression(format!(
                    "Expected literal value, got {:?}",
                    other
                )))
            }
        };

        Ok(Expr::compare(column, op, value))
    }
}

/// Parse a condition string into an `Expr`.
///
/// Expressions using more than 256 NOT, AND, OR or parenthesis operators are
/// rejected with `QueryError::Expression`.
pub fn parse_expr(input: &str) -> Result<Expr> {
    let mut parser = Parser::new(input)?;
    let expr = parser.parse_or()?;

    if parser.current != Token::Eof {
        return Err(QueryError::Expression(format!(
            "Unexpected token after expression: {:?}",
            parser.current
        )));
    }

    Ok(expr)
}
