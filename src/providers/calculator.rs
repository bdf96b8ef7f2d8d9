//! Arithmetic calculator: shunting-yard conversion to postfix, then a stack
//! evaluation. Every malformed input fails closed with `None`.

use std::sync::OnceLock;

use regex::Regex;

use super::Provider;
use crate::model::{ResultItem, ResultKind, SearchMode};

const MAX_DECIMALS: f64 = 1_000_000.0;

fn accepted_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9+\-*/().\s]+$").expect("valid calculator regex"))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Op(char),
    LParen,
    RParen,
}

/// Whether `query` is something the calculator should try.
pub fn should_handle(query: &str) -> bool {
    let q = query.trim();
    !q.is_empty() && q.chars().any(|c| c.is_ascii_digit()) && accepted_chars().is_match(q)
}

fn tokenize(expression: &str) -> Option<Vec<Token>> {
    let cleaned: Vec<char> = expression.chars().filter(|c| !c.is_whitespace()).collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < cleaned.len() {
        let c = cleaned[i];
        if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < cleaned.len() && (cleaned[i].is_ascii_digit() || cleaned[i] == '.') {
                i += 1;
            }
            let literal: String = cleaned[start..i].iter().collect();
            if literal.matches('.').count() > 1 {
                return None;
            }
            tokens.push(Token::Number(literal.parse().ok()?));
            continue;
        }

        tokens.push(match c {
            '+' | '-' | '*' | '/' => Token::Op(c),
            '(' => Token::LParen,
            ')' => Token::RParen,
            _ => return None,
        });
        i += 1;
    }

    Some(tokens)
}

fn precedence(op: char) -> u8 {
    match op {
        '+' | '-' => 1,
        '*' | '/' => 2,
        _ => 0,
    }
}

fn to_postfix(tokens: Vec<Token>) -> Option<Vec<Token>> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut operators: Vec<Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Number(_) => output.push(token),
            Token::LParen => operators.push(token),
            Token::RParen => {
                loop {
                    match operators.pop() {
                        Some(Token::LParen) => break,
                        Some(op) => output.push(op),
                        None => return None,
                    }
                }
            }
            Token::Op(op) => {
                while let Some(&Token::Op(top)) = operators.last() {
                    if precedence(top) < precedence(op) {
                        break;
                    }
                    output.push(Token::Op(top));
                    operators.pop();
                }
                operators.push(token);
            }
        }
    }

    while let Some(op) = operators.pop() {
        if op == Token::LParen {
            return None;
        }
        output.push(op);
    }

    Some(output)
}

fn evaluate_postfix(postfix: &[Token]) -> Option<f64> {
    let mut stack: Vec<f64> = Vec::new();

    for token in postfix {
        match *token {
            Token::Number(n) => stack.push(n),
            Token::Op(op) => {
                let right = stack.pop()?;
                let left = stack.pop()?;
                let value = match op {
                    '+' => left + right,
                    '-' => left - right,
                    '*' => left * right,
                    '/' if right == 0.0 => return None,
                    '/' => left / right,
                    _ => return None,
                };
                stack.push(value);
            }
            Token::LParen | Token::RParen => return None,
        }
    }

    match stack.as_slice() {
        [value] if value.is_finite() => Some(*value),
        _ => None,
    }
}

fn format_number(value: f64) -> String {
    let rounded = (value * MAX_DECIMALS).round() / MAX_DECIMALS;
    if rounded == 0.0 {
        // Avoid printing "-0"
        return "0".to_string();
    }
    format!("{}", rounded)
}

/// Evaluate an arithmetic expression, rounded to six decimals.
pub fn evaluate(expression: &str) -> Option<String> {
    if !should_handle(expression) {
        return None;
    }
    let tokens = tokenize(expression)?;
    let postfix = to_postfix(tokens)?;
    let value = evaluate_postfix(&postfix)?;
    Some(format_number(value))
}

#[derive(Debug, Default)]
pub struct CalculatorProvider;

impl CalculatorProvider {
    pub fn new() -> Self {
        CalculatorProvider
    }
}

impl Provider for CalculatorProvider {
    fn name(&self) -> &str {
        "calculator"
    }

    fn results(&mut self, query: &str, mode: SearchMode) -> anyhow::Result<Vec<ResultItem>> {
        if !matches!(mode, SearchMode::All | SearchMode::Calculator) {
            return Ok(Vec::new());
        }
        let expression = query.trim();
        let Some(value) = evaluate(expression) else {
            return Ok(Vec::new());
        };

        Ok(vec![ResultItem::new(
            ResultKind::Utility,
            value.clone(),
            format!("Calculator • {}", expression),
        )
        .with_id(format!("calc:{}", expression))
        .with_copy_text(value)
        .with_search_text(expression)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(evaluate("2+2").as_deref(), Some("4"));
        assert_eq!(evaluate("2 + 3 * 4").as_deref(), Some("14"));
        assert_eq!(evaluate("(2 + 3) * 4").as_deref(), Some("20"));
        assert_eq!(evaluate("10 - 4 - 3").as_deref(), Some("3"));
        assert_eq!(evaluate("8 / 4 / 2").as_deref(), Some("1"));
        assert_eq!(evaluate("7/2").as_deref(), Some("3.5"));
    }

    #[test]
    fn test_rounding_to_six_decimals() {
        assert_eq!(evaluate("1/3").as_deref(), Some("0.333333"));
        assert_eq!(evaluate("0.1+0.2").as_deref(), Some("0.3"));
        assert_eq!(evaluate("2/3").as_deref(), Some("0.666667"));
    }

    #[test]
    fn test_fails_closed() {
        assert_eq!(evaluate("10/0"), None);
        assert_eq!(evaluate("2++"), None);
        assert_eq!(evaluate("(1+2"), None);
        assert_eq!(evaluate("1+2)"), None);
        assert_eq!(evaluate(")("), None);
        assert_eq!(evaluate("1.2.3+1"), None);
        assert_eq!(evaluate("."), None);
        assert_eq!(evaluate("abc"), None);
        assert_eq!(evaluate("50%"), None);
        assert_eq!(evaluate(""), None);
        assert_eq!(evaluate("()"), None);
    }

    #[test]
    fn test_negative_results() {
        assert_eq!(evaluate("2-5").as_deref(), Some("-3"));
        assert_eq!(evaluate("0*3-0").as_deref(), Some("0"));
    }

    #[test]
    fn test_provider_rows() {
        let mut provider = CalculatorProvider::new();
        let rows = provider.results(" 6*7 ", SearchMode::Calculator).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].primary_text, "42");
        assert_eq!(rows[0].secondary_text, "Calculator • 6*7");
        assert_eq!(rows[0].id.as_deref(), Some("calc:6*7"));
        assert_eq!(rows[0].haystack(), "6*7");

        assert!(provider.results("6*7", SearchMode::Apps).unwrap().is_empty());
        assert!(provider.results("firefox", SearchMode::All).unwrap().is_empty());
    }
}
