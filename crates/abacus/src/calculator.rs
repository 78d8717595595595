use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::errors::{AgentError, AgentResult};
use crate::systems::System;
use crate::models::tool::{Tool, ToolCall};

/// The fixed failure text returned for anything the grammar rejects.
pub const INVALID_EXPRESSION: &str = "Invalid mathematical expression";

/// Nesting deeper than this is rejected rather than recursed into.
const MAX_DEPTH: usize = 64;

/// Evaluates pure arithmetic expressions with a closed numeric grammar.
///
/// The grammar covers decimal literals, `+ - * / %`, unary sign and
/// parentheses, and nothing else. There is no identifier, call or attribute
/// syntax, so any attempt to reference names or invoke logic fails closed
/// with the fixed failure string.
pub struct CalculatorSystem {
    tools: Vec<Tool>,
}

impl Default for CalculatorSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl CalculatorSystem {
    pub fn new() -> Self {
        let evaluate_tool = Tool::new(
            "evaluate",
            "Evaluate a pure mathematical expression like '5 + 3 * 2'. \
            Do NOT use this for word problems.",
            json!({
                "type": "object",
                "properties": {
                    "expression": {
                        "type": "string",
                        "description": "The arithmetic expression to evaluate."
                    }
                },
                "required": ["expression"]
            }),
        );

        Self {
            tools: vec![evaluate_tool],
        }
    }
}

#[async_trait]
impl System for CalculatorSystem {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluates pure arithmetic expressions"
    }

    fn instructions(&self) -> &str {
        "Use the evaluate tool only for pure mathematical expressions made of \
        numbers, + - * / % and parentheses. Never pass it natural language."
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<String> {
        match tool_call.name.as_str() {
            "evaluate" => {
                let expression = tool_call
                    .arguments
                    .get("expression")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        AgentError::InvalidParameters("expression parameter required".into())
                    })?;
                // Evaluation faults are a user-visible string, never an error
                Ok(evaluate(expression))
            }
            _ => Err(AgentError::ToolNotFound(tool_call.name)),
        }
    }
}

/// Evaluate an expression, collapsing every fault to the fixed failure text.
pub fn evaluate(expression: &str) -> String {
    match eval(expression) {
        Ok(value) => format_value(value),
        Err(_) => INVALID_EXPRESSION.to_string(),
    }
}

#[derive(Debug, Error, PartialEq)]
enum ExprError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("malformed number literal '{0}'")]
    BadNumber(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token")]
    UnexpectedToken,
    #[error("trailing input after expression")]
    TrailingInput,
    #[error("expression nested too deeply")]
    TooDeep,
    #[error("result is not a finite number")]
    NotFinite,
}

fn eval(expression: &str) -> Result<f64, ExprError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
    };
    let value = parser.expr(0)?;
    if parser.pos != tokens.len() {
        return Err(ExprError::TrailingInput);
    }
    if !value.is_finite() {
        return Err(ExprError::NotFinite);
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        literal.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ExprError::BadNumber(literal))?;
                tokens.push(Token::Number(value));
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '%' => {
                chars.next();
                tokens.push(Token::Percent);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            other => return Err(ExprError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self, depth: usize) -> Result<f64, ExprError> {
        if depth > MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        let mut value = self.term(depth)?;
        while let Some(token) = self.peek() {
            match token {
                Token::Plus => {
                    self.advance();
                    value += self.term(depth)?;
                }
                Token::Minus => {
                    self.advance();
                    value -= self.term(depth)?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // term := unary (('*' | '/' | '%') unary)*
    fn term(&mut self, depth: usize) -> Result<f64, ExprError> {
        let mut value = self.unary(depth)?;
        while let Some(token) = self.peek() {
            match token {
                Token::Star => {
                    self.advance();
                    value *= self.unary(depth)?;
                }
                Token::Slash => {
                    self.advance();
                    value /= self.unary(depth)?;
                }
                Token::Percent => {
                    self.advance();
                    value %= self.unary(depth)?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // unary := ('+' | '-') unary | primary
    fn unary(&mut self, depth: usize) -> Result<f64, ExprError> {
        if depth > MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        match self.peek() {
            Some(Token::Plus) => {
                self.advance();
                self.unary(depth + 1)
            }
            Some(Token::Minus) => {
                self.advance();
                Ok(-self.unary(depth + 1)?)
            }
            _ => self.primary(depth),
        }
    }

    // primary := number | '(' expr ')'
    fn primary(&mut self, depth: usize) -> Result<f64, ExprError> {
        match self.peek() {
            Some(Token::Number(value)) => {
                self.advance();
                Ok(value)
            }
            Some(Token::LParen) => {
                self.advance();
                let value = self.expr(depth + 1)?;
                match self.peek() {
                    Some(Token::RParen) => {
                        self.advance();
                        Ok(value)
                    }
                    Some(_) => Err(ExprError::UnexpectedToken),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some(_) => Err(ExprError::UnexpectedToken),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

// Integral results render without a decimal point, matching how the original
// assistant printed "4" for "2 + 2" but "0.5" for "1 / 2".
fn format_value(value: f64) -> String {
    if value == 0.0 {
        // normalizes -0
        "0".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}
