/// Condition expressions evaluated against player state.
///
/// Conditions are small boolean/arithmetic expressions authored in content,
/// for example `S >= 3 && flags.includes("HAS_KIT") || location == "Hill"`.
/// They are parsed into an [`Expr`] tree and evaluated against a
/// [`GameState`]; nothing outside the known symbol set is reachable.

use std::fmt;
use thiserror::Error;

use crate::schema::stat::Stat;
use crate::schema::state::GameState;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    #[error("parse error at {position}: {message}")]
    Parse { position: usize, message: String },
    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("division by zero")]
    DivisionByZero,
}

/// Evaluate a condition against a state.
///
/// Any parse or evaluation failure yields `false` and is logged as a
/// warning so broken content shows up in QA runs.
pub fn evaluate(condition: &str, state: &GameState) -> bool {
    match Expr::parse(condition).and_then(|expr| expr.test(state)) {
        Ok(result) => result,
        Err(e) => {
            log::warn!("condition `{}` failed: {}", condition, e);
            false
        }
    }
}

/// A runtime value produced while evaluating.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Str(String),
    Bool(bool),
}

impl Value {
    /// Loose truthiness: zero, NaN, the empty string and `false` are false.
    pub fn truthy(&self) -> bool {
        match self {
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Str(s) => !s.is_empty(),
            Self::Bool(b) => *b,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Bool(_) => "boolean",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Str(s) => write!(f, "{:?}", s),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// A name that can be read from the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Stat(Stat),
    Location,
    /// `flags.length`
    FlagCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Parsed condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Variable(Symbol),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Whether the flag named by the inner expression is set.
    Membership(Box<Expr>),
}

impl Expr {
    /// Parse a condition string.
    ///
    /// Grammar, loosest binding first:
    /// - `a || b`
    /// - `a && b`
    /// - `==`, `===`, `!=`, `!==`
    /// - `<`, `<=`, `>`, `>=`, `x in flags`
    /// - `+`, `-`
    /// - `*`, `/`, `%`
    /// - prefix `!`, `-`, `+`
    /// - literals, `S R M SC HR SA FM LA location`, `flags.includes(x)`,
    ///   `flags.length`, `( ... )`
    pub fn parse(input: &str) -> Result<Expr, ConditionError> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        match parser.peek() {
            Token::End => Ok(expr),
            other => Err(parser.error(format!("unexpected {}", other.describe()))),
        }
    }

    /// Evaluate to a value.
    pub fn eval(&self, state: &GameState) -> Result<Value, ConditionError> {
        match self {
            Self::Literal(v) => Ok(v.clone()),
            Self::Variable(symbol) => Ok(match symbol {
                Symbol::Stat(stat) => Value::Number(f64::from(state.value(*stat))),
                Symbol::Location => Value::Str(state.location.clone()),
                Symbol::FlagCount => Value::Number(state.flags.len() as f64),
            }),
            Self::Unary { op, operand } => {
                let v = operand.eval(state)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!v.truthy())),
                    UnaryOp::Neg => match v {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(ConditionError::TypeMismatch(format!(
                            "cannot negate a {}",
                            other.type_name()
                        ))),
                    },
                }
            }
            Self::Binary { op, lhs, rhs } => match op {
                BinaryOp::Or => {
                    if lhs.eval(state)?.truthy() {
                        return Ok(Value::Bool(true));
                    }
                    Ok(Value::Bool(rhs.eval(state)?.truthy()))
                }
                BinaryOp::And => {
                    if !lhs.eval(state)?.truthy() {
                        return Ok(Value::Bool(false));
                    }
                    Ok(Value::Bool(rhs.eval(state)?.truthy()))
                }
                _ => binary(*op, lhs.eval(state)?, rhs.eval(state)?),
            },
            Self::Membership(flag) => match flag.eval(state)? {
                Value::Str(name) => Ok(Value::Bool(state.has_flag(&name))),
                other => Err(ConditionError::TypeMismatch(format!(
                    "flag name must be a string, got {}",
                    other.type_name()
                ))),
            },
        }
    }

    /// Evaluate and reduce to a boolean by truthiness.
    pub fn test(&self, state: &GameState) -> Result<bool, ConditionError> {
        self.eval(state).map(|v| v.truthy())
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ConditionError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
        BinaryOp::Ne => Ok(Value::Bool(lhs != rhs)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (&lhs, &rhs) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => {
                    return Err(ConditionError::TypeMismatch(format!(
                        "cannot compare {} with {}",
                        lhs.type_name(),
                        rhs.type_name()
                    )))
                }
            };
            // NaN compares false on every side
            let Some(ordering) = ordering else {
                return Ok(Value::Bool(false));
            };
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinaryOp::Add => match (lhs, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
            (a, b) => Err(ConditionError::TypeMismatch(format!(
                "cannot add {} and {}",
                a.type_name(),
                b.type_name()
            ))),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            let (a, b) = match (&lhs, &rhs) {
                (Value::Number(a), Value::Number(b)) => (*a, *b),
                _ => {
                    return Err(ConditionError::TypeMismatch(format!(
                        "arithmetic on {} and {}",
                        lhs.type_name(),
                        rhs.type_name()
                    )))
                }
            };
            if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b == 0.0 {
                return Err(ConditionError::DivisionByZero);
            }
            Ok(Value::Number(match op {
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            }))
        }
        BinaryOp::Or => Ok(Value::Bool(lhs.truthy() || rhs.truthy())),
        BinaryOp::And => Ok(Value::Bool(lhs.truthy() && rhs.truthy())),
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Dot,
    End,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Number(n) => format!("number {}", n),
            Self::Str(s) => format!("string {:?}", s),
            Self::Ident(name) => format!("'{}'", name),
            Self::Op(op) => format!("'{}'", op),
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
            Self::Dot => "'.'".to_string(),
            Self::End => "end of input".to_string(),
        }
    }
}

// Longest first so `===` is not read as `==` followed by `=`.
const OPERATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "<", ">", "!", "+", "-", "*", "/", "%",
];

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, ConditionError> {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < len {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        if c.is_ascii_digit() {
            while i < len && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let n = text.parse::<f64>().map_err(|_| ConditionError::Parse {
                position: start,
                message: format!("invalid number '{}'", text),
            })?;
            tokens.push((start, Token::Number(n)));
        } else if c.is_ascii_alphabetic() || c == '_' {
            while i < len && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push((start, Token::Ident(chars[start..i].iter().collect())));
        } else if c == '"' || c == '\'' {
            let quote = c;
            let mut buf = String::new();
            i += 1;
            loop {
                if i >= len {
                    return Err(ConditionError::Parse {
                        position: start,
                        message: "unterminated string".to_string(),
                    });
                }
                match chars[i] {
                    ch if ch == quote => {
                        i += 1;
                        break;
                    }
                    '\\' if i + 1 < len => {
                        buf.push(chars[i + 1]);
                        i += 2;
                    }
                    ch => {
                        buf.push(ch);
                        i += 1;
                    }
                }
            }
            tokens.push((start, Token::Str(buf)));
        } else if c == '(' {
            tokens.push((start, Token::LParen));
            i += 1;
        } else if c == ')' {
            tokens.push((start, Token::RParen));
            i += 1;
        } else if c == '.' {
            tokens.push((start, Token::Dot));
            i += 1;
        } else {
            let op = OPERATORS.iter().find(|op| {
                let op_chars: Vec<char> = op.chars().collect();
                chars[i..].starts_with(&op_chars)
            });
            match op {
                Some(op) => {
                    tokens.push((start, Token::Op(op)));
                    i += op.len();
                }
                None => {
                    return Err(ConditionError::Parse {
                        position: start,
                        message: format!("unexpected character '{}'", c),
                    })
                }
            }
        }
    }

    tokens.push((len, Token::End));
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].1
    }

    fn position(&self) -> usize {
        self.tokens[self.pos].0
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].1.clone();
        if !matches!(token, Token::End) {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: String) -> ConditionError {
        ConditionError::Parse {
            position: self.position(),
            message,
        }
    }

    fn eat_op(&mut self, ops: &[&'static str]) -> Option<&'static str> {
        let found = match self.peek() {
            Token::Op(op) => ops.iter().copied().find(|o| o == op),
            _ => None,
        };
        if found.is_some() {
            self.pos += 1;
        }
        found
    }

    fn expect(&mut self, expected: Token) -> Result<(), ConditionError> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {}, found {}",
                expected.describe(),
                self.peek().describe()
            )))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_and()?;
        while self.eat_op(&["||"]).is_some() {
            let rhs = self.parse_and()?;
            lhs = binary_expr(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_equality()?;
        while self.eat_op(&["&&"]).is_some() {
            let rhs = self.parse_equality()?;
            lhs = binary_expr(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_comparison()?;
        while let Some(op) = self.eat_op(&["===", "!==", "==", "!="]) {
            let rhs = self.parse_comparison()?;
            let op = match op {
                "===" | "==" => BinaryOp::Eq,
                _ => BinaryOp::Ne,
            };
            lhs = binary_expr(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_additive()?;
        loop {
            if matches!(self.peek(), Token::Ident(name) if name == "in") {
                self.advance();
                match self.advance() {
                    Token::Ident(name) if name == "flags" => {}
                    other => {
                        return Err(self.error(format!(
                            "'in' must be followed by 'flags', found {}",
                            other.describe()
                        )))
                    }
                }
                lhs = Expr::Membership(Box::new(lhs));
                continue;
            }
            let Some(op) = self.eat_op(&["<=", ">=", "<", ">"]) else {
                break;
            };
            let rhs = self.parse_additive()?;
            let op = match op {
                "<=" => BinaryOp::Le,
                ">=" => BinaryOp::Ge,
                "<" => BinaryOp::Lt,
                _ => BinaryOp::Gt,
            };
            lhs = binary_expr(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_multiplicative()?;
        while let Some(op) = self.eat_op(&["+", "-"]) {
            let rhs = self.parse_multiplicative()?;
            let op = if op == "+" { BinaryOp::Add } else { BinaryOp::Sub };
            lhs = binary_expr(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = self.eat_op(&["*", "/", "%"]) {
            let rhs = self.parse_unary()?;
            let op = match op {
                "*" => BinaryOp::Mul,
                "/" => BinaryOp::Div,
                _ => BinaryOp::Rem,
            };
            lhs = binary_expr(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ConditionError> {
        if let Some(op) = self.eat_op(&["!", "-", "+"]) {
            let operand = self.parse_unary()?;
            return Ok(match op {
                "!" => Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                "-" => Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                },
                _ => operand,
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ConditionError> {
        let position = self.position();
        match self.advance() {
            Token::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::LParen => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => self.parse_identifier(name),
            other => Err(ConditionError::Parse {
                position,
                message: format!("expected a value, found {}", other.describe()),
            }),
        }
    }

    fn parse_identifier(&mut self, name: String) -> Result<Expr, ConditionError> {
        match name.as_str() {
            "true" => return Ok(Expr::Literal(Value::Bool(true))),
            "false" => return Ok(Expr::Literal(Value::Bool(false))),
            "location" => return Ok(Expr::Variable(Symbol::Location)),
            "flags" => return self.parse_flags_access(),
            _ => {}
        }
        Stat::from_key(&name)
            .map(|stat| Expr::Variable(Symbol::Stat(stat)))
            .ok_or(ConditionError::UnknownSymbol(name))
    }

    // `flags` is only usable through `.includes(x)` or `.length`.
    fn parse_flags_access(&mut self) -> Result<Expr, ConditionError> {
        self.expect(Token::Dot)?;
        match self.advance() {
            Token::Ident(method) if method == "includes" => {
                self.expect(Token::LParen)?;
                let arg = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(Expr::Membership(Box::new(arg)))
            }
            Token::Ident(prop) if prop == "length" => Ok(Expr::Variable(Symbol::FlagCount)),
            Token::Ident(other) => Err(ConditionError::UnknownSymbol(format!("flags.{}", other))),
            other => Err(self.error(format!(
                "expected a flags method, found {}",
                other.describe()
            ))),
        }
    }
}

fn binary_expr(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}
