//! Small symbolic layer used to grade free-form answers.
//!
//! Expressions are trees over exact rationals, the constants `e` and `pi`, and
//! the extended-real infinity. Subtraction and division are normalized away at
//! parse time (`a - b` is `a + (-1)*b`, `a / b` is `a * b^-1`), so sums and
//! products are the only n-ary nodes the simplifier has to reason about.
//!
//! ```text
//! parse("2/4") -> Mul[2, Pow(4, -1)] -> simplify -> 1/2
//! ```

mod parser;
mod simplify;

use std::fmt;

use crate::rational::Rational;

pub use parser::{parse, ParseError};
pub use simplify::simplify;

/// Absolute tolerance for answers that do not simplify to an exact match.
pub const TOLERANCE: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Constant {
  E,
  Pi,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Func {
  Ln,
  Abs,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
  Num(Rational),
  Const(Constant),
  /// Positive infinity; negative infinity is `Mul[-1, Infinity]`.
  Infinity,
  Add(Vec<Expr>),
  Mul(Vec<Expr>),
  Pow(Box<Expr>, Box<Expr>),
  Func(Func, Box<Expr>),
}

impl Expr {
  pub fn int(v: i128) -> Self {
    Expr::Num(Rational::int(v))
  }

  pub fn neg(e: Expr) -> Self {
    Expr::Mul(vec![Expr::Num(Rational::MINUS_ONE), e])
  }

  pub fn pow(base: Expr, exp: Expr) -> Self {
    Expr::Pow(Box::new(base), Box::new(exp))
  }

  pub fn is_zero(&self) -> bool {
    matches!(self, Expr::Num(r) if r.is_zero())
  }

  pub fn as_num(&self) -> Option<Rational> {
    match self {
      Expr::Num(r) => Some(*r),
      _ => None,
    }
  }

  pub fn contains_infinity(&self) -> bool {
    match self {
      Expr::Infinity => true,
      Expr::Num(_) | Expr::Const(_) => false,
      Expr::Add(xs) | Expr::Mul(xs) => xs.iter().any(Expr::contains_infinity),
      Expr::Pow(b, e) => b.contains_infinity() || e.contains_infinity(),
      Expr::Func(_, a) => a.contains_infinity(),
    }
  }

  /// True when some power divides by zero, e.g. `1/0` or `0^(-2)`. Such forms
  /// are kept verbatim by the simplifier and never equal anything.
  pub fn contains_undefined(&self) -> bool {
    match self {
      Expr::Num(_) | Expr::Const(_) | Expr::Infinity => false,
      Expr::Add(xs) | Expr::Mul(xs) => xs.iter().any(Expr::contains_undefined),
      Expr::Pow(b, e) => (b.is_zero() && !(e.eval() > 0.0)) || b.contains_undefined() || e.contains_undefined(),
      Expr::Func(_, a) => a.contains_undefined(),
    }
  }

  /// Floating-point value; `NaN` for undefined forms such as `oo - oo`.
  pub fn eval(&self) -> f64 {
    match self {
      Expr::Num(r) => r.to_f64(),
      Expr::Const(Constant::E) => std::f64::consts::E,
      Expr::Const(Constant::Pi) => std::f64::consts::PI,
      Expr::Infinity => f64::INFINITY,
      Expr::Add(xs) => xs.iter().map(Expr::eval).sum(),
      Expr::Mul(xs) => xs.iter().map(Expr::eval).product(),
      Expr::Pow(b, e) => b.eval().powf(e.eval()),
      Expr::Func(Func::Ln, a) => a.eval().ln(),
      Expr::Func(Func::Abs, a) => a.eval().abs(),
    }
  }

  fn precedence(&self) -> u8 {
    match self {
      Expr::Add(_) => 1,
      Expr::Mul(_) => 2,
      Expr::Num(r) if !r.is_integer() || r.is_negative() => 2,
      Expr::Pow(..) => 3,
      _ => 4,
    }
  }

  fn fmt_wrapped(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
    if self.precedence() < min {
      write!(f, "({self})")
    } else {
      write!(f, "{self}")
    }
  }
}

impl fmt::Display for Constant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Constant::E => "e",
      Constant::Pi => "pi",
    })
  }
}

impl fmt::Display for Func {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Func::Ln => "ln",
      Func::Abs => "abs",
    })
  }
}

impl fmt::Display for Expr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Expr::Num(r) => write!(f, "{r}"),
      Expr::Const(c) => write!(f, "{c}"),
      Expr::Infinity => f.write_str("oo"),
      Expr::Add(xs) => {
        for (i, x) in xs.iter().enumerate() {
          if i > 0 {
            f.write_str(" + ")?;
          }
          x.fmt_wrapped(f, 2)?;
        }
        Ok(())
      }
      Expr::Mul(xs) => {
        for (i, x) in xs.iter().enumerate() {
          if i > 0 {
            f.write_str("*")?;
          }
          // a leading coefficient may stay bare; later fractions need parens
          x.fmt_wrapped(f, if i == 0 { 2 } else { 3 })?;
        }
        Ok(())
      }
      Expr::Pow(b, e) => {
        b.fmt_wrapped(f, 4)?;
        f.write_str("^")?;
        e.fmt_wrapped(f, 4)
      }
      Expr::Func(func, a) => write!(f, "{func}({a})"),
    }
  }
}

/// True when `submitted` and `canonical` denote the same extended real.
///
/// Division by zero on either side is never equivalent. Infinite values must
/// agree in sign. Finite values are accepted when their simplified difference
/// is literally zero, or a real number no larger than [`TOLERANCE`] in
/// magnitude.
pub fn equivalent(submitted: &Expr, canonical: &Expr) -> bool {
  let lhs = simplify(submitted);
  let rhs = simplify(canonical);
  if lhs.contains_undefined() || rhs.contains_undefined() {
    return false;
  }
  if lhs == rhs {
    return true;
  }
  if lhs.contains_infinity() || rhs.contains_infinity() {
    let (a, b) = (lhs.eval(), rhs.eval());
    return a.is_infinite() && b.is_infinite() && a.signum() == b.signum();
  }
  let diff = simplify(&Expr::Add(vec![lhs, Expr::neg(rhs)]));
  if diff.is_zero() {
    return true;
  }
  let d = diff.eval();
  d.is_finite() && d.abs() <= TOLERANCE
}

/// Parse both sides and compare; malformed input is simply "not equivalent".
pub fn equivalent_text(submitted: &str, canonical: &str) -> Result<bool, ParseError> {
  let lhs = parse(submitted)?;
  let rhs = parse(canonical)?;
  Ok(equivalent(&lhs, &rhs))
}
