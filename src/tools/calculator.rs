//! Calculator 工具：安全的四则运算求值
//!
//! 递归下降解析，支持 + - * / ^、括号、一元负号与后缀 %（百分比，即除以 100）。
//! 输出固定为 `The result of <expr> is <value>`，计算处理器据此提取数值结果。

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::Tool;

pub const CALCULATOR: &str = "calculator";

/// Calculator 工具
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        CALCULATOR
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression (+ - * / ^, parentheses, 15% = 0.15). Args: {\"expression\": \"0.15 * 200 + 10\"}"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "expression": {"type": "string", "description": "Arithmetic expression to evaluate"}
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let expression = args
            .get("expression")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| "Missing required argument: expression".to_string())?;
        let value = evaluate(expression)?;
        Ok(format!("The result of {} is {}", expression, format_number(value)))
    }
}

/// 整数值不带小数部分，其余保留原样
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// 对表达式求值
pub fn evaluate(expression: &str) -> Result<f64, String> {
    let mut parser = Parser {
        chars: expression.chars().filter(|c| !c.is_whitespace()).collect(),
        pos: 0,
    };
    let value = parser.expr()?;
    if let Some(c) = parser.peek() {
        return Err(format!("Unexpected character '{}' at position {}", c, parser.pos));
    }
    if !value.is_finite() {
        return Err("Result is not a finite number".to_string());
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        loop {
            if self.eat('+') {
                value += self.term()?;
            } else if self.eat('-') {
                value -= self.term()?;
            } else {
                return Ok(value);
            }
        }
    }

    // term := power (('*' | '/') power)*
    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.power()?;
        loop {
            if self.eat('*') {
                value *= self.power()?;
            } else if self.eat('/') {
                let divisor = self.power()?;
                if divisor == 0.0 {
                    return Err("Division by zero".to_string());
                }
                value /= divisor;
            } else {
                return Ok(value);
            }
        }
    }

    // power := unary ('^' power)?   右结合
    fn power(&mut self) -> Result<f64, String> {
        let base = self.unary()?;
        if self.eat('^') {
            let exponent = self.power()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    // unary := '-' unary | '+' unary | postfix
    fn unary(&mut self) -> Result<f64, String> {
        if self.eat('-') {
            return Ok(-self.unary()?);
        }
        if self.eat('+') {
            return self.unary();
        }
        self.postfix()
    }

    // postfix := primary '%'*
    fn postfix(&mut self) -> Result<f64, String> {
        let mut value = self.primary()?;
        while self.eat('%') {
            value /= 100.0;
        }
        Ok(value)
    }

    fn primary(&mut self) -> Result<f64, String> {
        if self.eat('(') {
            let value = self.expr()?;
            if !self.eat(')') {
                return Err("Missing closing parenthesis".to_string());
            }
            return Ok(value);
        }
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' || c == ',' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if start == self.pos {
            return match self.peek() {
                Some(c) => Err(format!("Unexpected character '{}' at position {}", c, self.pos)),
                None => Err("Unexpected end of expression".to_string()),
            };
        }
        let literal: String = self.chars[start..self.pos].iter().filter(|c| **c != ',').collect();
        literal
            .parse::<f64>()
            .map_err(|_| format!("Invalid number: {literal}"))
    }
}
