//! Recursive-descent parser for learner input.
//!
//! Grammar (lowest to highest binding):
//!
//! ```text
//! sum     := product (('+' | '-') product)*
//! product := unary (('*' | '/') unary | <implicit> power)*
//! unary   := ('-' | '+') unary | power
//! power   := atom (('^' | '**') unary)?
//! atom    := number | constant | func '(' sum ')' | '(' sum ')'
//! ```
//!
//! `-2^2` is `-(2^2)`, powers associate to the right, and juxtaposition such as
//! `2pi` or `3(1/2)` multiplies. Numbers are plain decimals; exponent notation
//! like `1e-6` is an invalid number, while `2e` is still `2*e`.

use thiserror::Error;

use super::{Constant, Expr, Func};
use crate::rational::Rational;

const MAX_INPUT_CHARS: usize = 256;
const MAX_DEPTH: usize = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
  #[error("empty expression")]
  Empty,
  #[error("expression longer than {0} characters")]
  TooLong(usize),
  #[error("expression nested too deeply")]
  TooDeep,
  #[error("unexpected character '{ch}' at position {pos}")]
  UnexpectedChar { ch: char, pos: usize },
  #[error("invalid number '{0}'")]
  InvalidNumber(String),
  #[error("unknown identifier '{0}'")]
  UnknownIdentifier(String),
  #[error("unexpected {0}")]
  UnexpectedToken(String),
  #[error("unexpected end of input")]
  UnexpectedEnd,
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
  Num(Rational),
  Ident(String),
  Plus,
  Minus,
  Star,
  Slash,
  Caret,
  LParen,
  RParen,
}

fn describe(t: &Token) -> String {
  match t {
    Token::Num(r) => format!("number {r}"),
    Token::Ident(s) => format!("identifier '{s}'"),
    Token::Plus => "'+'".into(),
    Token::Minus => "'-'".into(),
    Token::Star => "'*'".into(),
    Token::Slash => "'/'".into(),
    Token::Caret => "'^'".into(),
    Token::LParen => "'('".into(),
    Token::RParen => "')'".into(),
  }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
  let chars: Vec<char> = input.chars().collect();
  let mut out = Vec::new();
  let mut i = 0;
  while i < chars.len() {
    let ch = chars[i];
    match ch {
      c if c.is_whitespace() => { i += 1; }
      '0'..='9' | '.' | ',' => {
        let start = i;
        while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == ',') {
          i += 1;
        }
        // exponent notation such as `1e-6` or `2e0` is not accepted
        if matches!(chars.get(i), Some('e' | 'E'))
          && matches!(chars.get(i + 1), Some(c) if c.is_ascii_digit() || matches!(c, '+' | '-' | '−'))
        {
          let mut end = i + 2;
          while end < chars.len() && chars[end].is_ascii_digit() {
            end += 1;
          }
          return Err(ParseError::InvalidNumber(chars[start..end].iter().collect()));
        }
        let text: String = chars[start..i].iter().collect();
        let value = Rational::from_decimal(&text).ok_or(ParseError::InvalidNumber(text))?;
        out.push(Token::Num(value));
      }
      c if c.is_alphabetic() => {
        let start = i;
        while i < chars.len() && chars[i].is_alphanumeric() {
          i += 1;
        }
        out.push(Token::Ident(chars[start..i].iter().collect::<String>().to_lowercase()));
      }
      '∞' => { out.push(Token::Ident("oo".into())); i += 1; }
      '+' => { out.push(Token::Plus); i += 1; }
      '-' | '−' => { out.push(Token::Minus); i += 1; }
      '*' | '·' | '×' => {
        if chars.get(i + 1) == Some(&'*') {
          out.push(Token::Caret);
          i += 2;
        } else {
          out.push(Token::Star);
          i += 1;
        }
      }
      '/' | ':' => { out.push(Token::Slash); i += 1; }
      '^' => { out.push(Token::Caret); i += 1; }
      '(' | '[' => { out.push(Token::LParen); i += 1; }
      ')' | ']' => { out.push(Token::RParen); i += 1; }
      _ => return Err(ParseError::UnexpectedChar { ch, pos: i }),
    }
  }
  Ok(out)
}

struct Parser {
  tokens: Vec<Token>,
  pos: usize,
  depth: usize,
}

impl Parser {
  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  fn next(&mut self) -> Option<Token> {
    let t = self.tokens.get(self.pos).cloned();
    if t.is_some() {
      self.pos += 1;
    }
    t
  }

  fn eat(&mut self, want: &Token) -> bool {
    if self.peek() == Some(want) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn expect(&mut self, want: &Token) -> Result<(), ParseError> {
    match self.next() {
      Some(ref t) if t == want => Ok(()),
      Some(t) => Err(ParseError::UnexpectedToken(describe(&t))),
      None => Err(ParseError::UnexpectedEnd),
    }
  }

  fn enter(&mut self) -> Result<(), ParseError> {
    self.depth += 1;
    if self.depth > MAX_DEPTH { Err(ParseError::TooDeep) } else { Ok(()) }
  }

  fn sum(&mut self) -> Result<Expr, ParseError> {
    let mut terms = vec![self.product()?];
    loop {
      if self.eat(&Token::Plus) {
        terms.push(self.product()?);
      } else if self.eat(&Token::Minus) {
        terms.push(Expr::neg(self.product()?));
      } else {
        break;
      }
    }
    Ok(if terms.len() == 1 { terms.remove(0) } else { Expr::Add(terms) })
  }

  fn product(&mut self) -> Result<Expr, ParseError> {
    let mut factors = vec![self.unary()?];
    loop {
      match self.peek() {
        Some(Token::Star) => {
          self.pos += 1;
          factors.push(self.unary()?);
        }
        Some(Token::Slash) => {
          self.pos += 1;
          factors.push(Expr::pow(self.unary()?, Expr::int(-1)));
        }
        // juxtaposition binds like '*' but never starts a signed factor
        Some(Token::Num(_)) | Some(Token::Ident(_)) | Some(Token::LParen) => {
          factors.push(self.power()?);
        }
        _ => break,
      }
    }
    Ok(if factors.len() == 1 { factors.remove(0) } else { Expr::Mul(factors) })
  }

  fn unary(&mut self) -> Result<Expr, ParseError> {
    if self.eat(&Token::Minus) {
      self.enter()?;
      let inner = self.unary()?;
      self.depth -= 1;
      return Ok(Expr::neg(inner));
    }
    if self.eat(&Token::Plus) {
      self.enter()?;
      let inner = self.unary();
      self.depth -= 1;
      return inner;
    }
    self.power()
  }

  fn power(&mut self) -> Result<Expr, ParseError> {
    let base = self.atom()?;
    if self.eat(&Token::Caret) {
      self.enter()?;
      let exp = self.unary()?;
      self.depth -= 1;
      return Ok(Expr::pow(base, exp));
    }
    Ok(base)
  }

  fn group(&mut self) -> Result<Expr, ParseError> {
    self.expect(&Token::LParen)?;
    self.enter()?;
    let inner = self.sum()?;
    self.depth -= 1;
    self.expect(&Token::RParen)?;
    Ok(inner)
  }

  fn atom(&mut self) -> Result<Expr, ParseError> {
    match self.peek().cloned() {
      Some(Token::Num(r)) => {
        self.pos += 1;
        Ok(Expr::Num(r))
      }
      Some(Token::LParen) => self.group(),
      Some(Token::Ident(name)) => {
        self.pos += 1;
        match name.as_str() {
          "oo" | "inf" | "infinity" => Ok(Expr::Infinity),
          "e" => Ok(Expr::Const(Constant::E)),
          "pi" | "π" => Ok(Expr::Const(Constant::Pi)),
          "sqrt" => Ok(Expr::pow(self.group()?, Expr::Num(half()))),
          "exp" => Ok(Expr::pow(Expr::Const(Constant::E), self.group()?)),
          "ln" | "log" => Ok(Expr::Func(Func::Ln, Box::new(self.group()?))),
          "abs" => Ok(Expr::Func(Func::Abs, Box::new(self.group()?))),
          _ => Err(ParseError::UnknownIdentifier(name)),
        }
      }
      Some(t) => Err(ParseError::UnexpectedToken(describe(&t))),
      None => Err(ParseError::UnexpectedEnd),
    }
  }
}

fn half() -> Rational {
  Rational::new(1, 2).unwrap_or(Rational::ONE)
}

/// Parse a learner- or compiler-produced expression.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
  let trimmed = input.trim();
  if trimmed.is_empty() {
    return Err(ParseError::Empty);
  }
  if trimmed.chars().count() > MAX_INPUT_CHARS {
    return Err(ParseError::TooLong(MAX_INPUT_CHARS));
  }
  let mut p = Parser { tokens: tokenize(trimmed)?, pos: 0, depth: 0 };
  let expr = p.sum()?;
  match p.next() {
    None => Ok(expr),
    Some(t) => Err(ParseError::UnexpectedToken(describe(&t))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::symbolic::simplify;

  fn value(s: &str) -> Rational {
    simplify(&parse(s).expect("parses")).as_num().expect("numeric")
  }

  #[test]
  fn precedence_and_associativity() {
    assert_eq!(value("1 + 2*3"), Rational::int(7));
    assert_eq!(value("-2^2"), Rational::int(-4));
    assert_eq!(value("2^3^2"), Rational::int(512));
    assert_eq!(value("2**3"), Rational::int(8));
    assert_eq!(value("(1-3)/4"), Rational::new(-1, 2).unwrap());
    assert_eq!(value("2^-1"), Rational::new(1, 2).unwrap());
    assert_eq!(value("6/2/3"), Rational::int(1));
  }

  #[test]
  fn implicit_multiplication() {
    assert_eq!(value("3(1/2)"), Rational::new(3, 2).unwrap());
    assert_eq!(parse("2pi").unwrap(), Expr::Mul(vec![Expr::int(2), Expr::Const(Constant::Pi)]));
  }

  #[test]
  fn vocabulary_is_fixed() {
    assert_eq!(parse("x + 1"), Err(ParseError::UnknownIdentifier("x".into())));
    assert_eq!(parse("PI").unwrap(), Expr::Const(Constant::Pi));
    assert_eq!(parse("Infinity").unwrap(), Expr::Infinity);
  }

  #[test]
  fn malformed_input_is_reported() {
    assert_eq!(parse("   "), Err(ParseError::Empty));
    assert_eq!(parse("1 +"), Err(ParseError::UnexpectedEnd));
    assert!(matches!(parse("(1 + 2"), Err(ParseError::UnexpectedEnd)));
    assert!(matches!(parse("1 ) 2"), Err(ParseError::UnexpectedToken(_))));
    assert!(matches!(parse("1 $ 2"), Err(ParseError::UnexpectedChar { ch: '$', .. })));
    assert!(matches!(parse("1.2.3"), Err(ParseError::InvalidNumber(_))));
    assert_eq!(parse("sqrt 4"), Err(ParseError::UnexpectedToken("number 4".into())));
  }

  #[test]
  fn exponent_notation_is_refused() {
    assert_eq!(parse("1e-6"), Err(ParseError::InvalidNumber("1e-6".into())));
    assert_eq!(parse("2e0"), Err(ParseError::InvalidNumber("2e0".into())));
    assert_eq!(parse("3E+2"), Err(ParseError::InvalidNumber("3E+2".into())));
    assert_eq!(parse("0.5e1 + 1"), Err(ParseError::InvalidNumber("0.5e1".into())));
    assert_eq!(parse("2e").unwrap(), Expr::Mul(vec![Expr::int(2), Expr::Const(Constant::E)]));
    assert!((simplify(&parse("2e - 1").unwrap()).eval() - (2.0 * std::f64::consts::E - 1.0)).abs() < 1e-12);
  }

  #[test]
  fn pathological_input_is_bounded() {
    let deep = format!("{}1{}", "(".repeat(100), ")".repeat(100));
    assert_eq!(parse(&deep), Err(ParseError::TooDeep));
    let long = "1+".repeat(200) + "1";
    assert_eq!(parse(&long), Err(ParseError::TooLong(MAX_INPUT_CHARS)));
  }
}
