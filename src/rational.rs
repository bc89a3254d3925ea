//! Exact rational numbers on 128-bit integers.
//!
//! Every operation is checked: `None` means the result does not fit, and the
//! caller keeps the expression in unevaluated form instead of wrapping.

use std::cmp::Ordering;
use std::fmt;

/// Reduced with `den > 0`; neither part is ever `i128::MIN`, so negation and
/// `abs` cannot overflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rational {
  num: i128,
  den: i128,
}

fn gcd(a: i128, b: i128) -> i128 {
  let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
  while b != 0 {
    let t = a % b;
    a = b;
    b = t;
  }
  // only 2^127 itself does not fit, and callers never pass i128::MIN
  i128::try_from(a).unwrap_or(1)
}

impl Rational {
  pub const ZERO: Rational = Rational { num: 0, den: 1 };
  pub const ONE: Rational = Rational { num: 1, den: 1 };
  pub const MINUS_ONE: Rational = Rational { num: -1, den: 1 };

  /// Reduced fraction `num/den`; `None` for a zero denominator or when either
  /// part is `i128::MIN`.
  pub fn new(num: i128, den: i128) -> Option<Self> {
    if den == 0 || num == i128::MIN || den == i128::MIN {
      return None;
    }
    let g = gcd(num, den);
    let (mut n, mut d) = (num / g, den / g);
    if d < 0 {
      n = n.checked_neg()?;
      d = d.checked_neg()?;
    }
    Some(Self { num: n, den: d })
  }

  /// Integer literal; `v` is a small constant, never `i128::MIN`.
  pub fn int(v: i128) -> Self {
    debug_assert_ne!(v, i128::MIN);
    Self { num: v, den: 1 }
  }

  pub fn numer(&self) -> i128 { self.num }
  pub fn denom(&self) -> i128 { self.den }

  pub fn is_zero(&self) -> bool { self.num == 0 }
  pub fn is_one(&self) -> bool { self.num == 1 && self.den == 1 }
  pub fn is_integer(&self) -> bool { self.den == 1 }
  pub fn is_negative(&self) -> bool { self.num < 0 }

  pub fn abs(&self) -> Self {
    Self { num: self.num.abs(), den: self.den }
  }

  pub fn to_f64(&self) -> f64 {
    self.num as f64 / self.den as f64
  }

  pub fn checked_add(&self, o: &Self) -> Option<Self> {
    let g = gcd(self.den, o.den);
    let l = o.den / g;
    let r = self.den / g;
    let num = self.num.checked_mul(l)?.checked_add(o.num.checked_mul(r)?)?;
    Self::new(num, self.den.checked_mul(l)?)
  }

  pub fn checked_neg(&self) -> Option<Self> {
    Some(Self { num: self.num.checked_neg()?, den: self.den })
  }

  pub fn checked_sub(&self, o: &Self) -> Option<Self> {
    self.checked_add(&o.checked_neg()?)
  }

  pub fn checked_mul(&self, o: &Self) -> Option<Self> {
    // cross-reduce first to keep intermediates small
    let g1 = gcd(self.num, o.den).max(1);
    let g2 = gcd(o.num, self.den).max(1);
    let num = (self.num / g1).checked_mul(o.num / g2)?;
    let den = (self.den / g2).checked_mul(o.den / g1)?;
    Self::new(num, den)
  }

  pub fn recip(&self) -> Option<Self> {
    Self::new(self.den, self.num)
  }

  pub fn checked_div(&self, o: &Self) -> Option<Self> {
    self.checked_mul(&o.recip()?)
  }

  /// Integer power; negative exponents invert (and fail on zero).
  pub fn checked_pow(&self, exp: i32) -> Option<Self> {
    let base = if exp < 0 { self.recip()? } else { *self };
    let e = exp.unsigned_abs();
    Self::new(base.num.checked_pow(e)?, base.den.checked_pow(e)?)
  }

  /// Exact square root when both numerator and denominator are perfect squares.
  pub fn sqrt_exact(&self) -> Option<Self> {
    if self.num < 0 {
      return None;
    }
    let n = isqrt(self.num)?;
    let d = isqrt(self.den)?;
    Some(Self { num: n, den: d })
  }

  /// Parse a plain decimal literal such as `12`, `0.125` or `3,5`.
  /// Digits past the 30th decimal place are dropped.
  pub fn from_decimal(text: &str) -> Option<Self> {
    let (int_part, frac_part) = match text.find(|c| c == '.' || c == ',') {
      Some(i) => (&text[..i], &text[i + 1..]),
      None => (text, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
      return None;
    }
    if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
      return None;
    }
    let frac = &frac_part[..frac_part.len().min(30)];
    let mut num: i128 = 0;
    for ch in int_part.chars().chain(frac.chars()) {
      num = num.checked_mul(10)?.checked_add(ch as i128 - '0' as i128)?;
    }
    let den = 10i128.checked_pow(frac.len() as u32)?;
    Self::new(num, den)
  }
}

fn isqrt(v: i128) -> Option<i128> {
  if v < 0 {
    return None;
  }
  let mut r = (v as f64).sqrt() as i128;
  while r > 0 && r.checked_mul(r).map_or(true, |sq| sq > v) {
    r -= 1;
  }
  while (r + 1).checked_mul(r + 1).map_or(false, |sq| sq <= v) {
    r += 1;
  }
  if r * r == v { Some(r) } else { None }
}

impl PartialOrd for Rational {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Rational {
  fn cmp(&self, other: &Self) -> Ordering {
    match (self.num.checked_mul(other.den), other.num.checked_mul(self.den)) {
      (Some(a), Some(b)) => a.cmp(&b),
      _ => self.to_f64().total_cmp(&other.to_f64()),
    }
  }
}

impl fmt::Display for Rational {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.den == 1 {
      write!(f, "{}", self.num)
    } else {
      write!(f, "{}/{}", self.num, self.den)
    }
  }
}
