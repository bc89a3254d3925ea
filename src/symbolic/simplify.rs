use super::{Constant, Expr, Func};
use crate::rational::Rational;

/// Integer exponents above this stay symbolic instead of being expanded.
const MAX_EXACT_EXPONENT: i128 = 256;

/// Bottom-up simplification into a canonical form.
///
/// Numbers are folded exactly, sums collect like terms, products collect like
/// bases, and operands are ordered by their rendered text so that equal values
/// built in different orders compare equal structurally.
pub fn simplify(expr: &Expr) -> Expr {
  match expr {
    Expr::Num(_) | Expr::Const(_) | Expr::Infinity => expr.clone(),
    Expr::Add(xs) => simplify_add(xs.iter().map(simplify).collect()),
    Expr::Mul(xs) => simplify_mul(xs.iter().map(simplify).collect()),
    Expr::Pow(b, e) => simplify_pow(simplify(b), simplify(e)),
    Expr::Func(f, a) => simplify_func(*f, simplify(a)),
  }
}

fn sort_key(e: &Expr) -> String {
  e.to_string()
}

/// Split `c * rest` into its rational coefficient and the remaining factor.
fn split_coefficient(term: Expr) -> (Rational, Expr) {
  match term {
    Expr::Num(r) => (r, Expr::int(1)),
    Expr::Mul(mut fs) => match fs.first().and_then(Expr::as_num) {
      Some(c) => {
        fs.remove(0);
        let rest = if fs.len() == 1 { fs.remove(0) } else { Expr::Mul(fs) };
        (c, rest)
      }
      None => (Rational::ONE, Expr::Mul(fs)),
    },
    other => (Rational::ONE, other),
  }
}

fn with_coefficient(c: Rational, base: Expr) -> Expr {
  if c.is_one() {
    return base;
  }
  match base {
    Expr::Mul(mut fs) => {
      fs.insert(0, Expr::Num(c));
      Expr::Mul(fs)
    }
    other => Expr::Mul(vec![Expr::Num(c), other]),
  }
}

fn simplify_add(terms: Vec<Expr>) -> Expr {
  let mut flat = Vec::new();
  for t in terms {
    match t {
      Expr::Add(inner) => flat.extend(inner),
      other => flat.push(other),
    }
  }

  let mut constant = Rational::ZERO;
  let mut leftover_nums: Vec<Expr> = Vec::new();
  let mut collected: Vec<(Rational, Expr)> = Vec::new();
  let mut unbounded: Vec<Expr> = Vec::new();

  for t in flat {
    if let Expr::Num(r) = t {
      match constant.checked_add(&r) {
        Some(sum) => constant = sum,
        None => leftover_nums.push(Expr::Num(r)),
      }
      continue;
    }
    // oo - oo and 1/0 - 1/0 must stay visible as undefined forms
    if t.contains_infinity() || t.contains_undefined() {
      unbounded.push(t);
      continue;
    }
    let (c, base) = split_coefficient(t);
    match collected.iter_mut().find(|(_, b)| *b == base) {
      Some(slot) => match slot.0.checked_add(&c) {
        Some(sum) => slot.0 = sum,
        None => leftover_nums.push(with_coefficient(c, base)),
      },
      None => collected.push((c, base)),
    }
  }

  let mut out: Vec<Expr> = collected
    .into_iter()
    .filter(|(c, _)| !c.is_zero())
    .map(|(c, b)| with_coefficient(c, b))
    .chain(unbounded)
    .chain(leftover_nums)
    .collect();
  out.sort_by_key(sort_key);
  if !constant.is_zero() {
    out.insert(0, Expr::Num(constant));
  }

  match out.len() {
    0 => Expr::Num(Rational::ZERO),
    1 => out.remove(0),
    _ => Expr::Add(out),
  }
}

/// Split `b^e` into base and exponent; anything else has exponent 1.
fn split_power(f: Expr) -> (Expr, Expr) {
  match f {
    Expr::Pow(b, e) => (*b, *e),
    other => (other, Expr::int(1)),
  }
}

fn simplify_mul(factors: Vec<Expr>) -> Expr {
  let mut flat = Vec::new();
  for f in factors {
    match f {
      Expr::Mul(inner) => flat.extend(inner),
      other => flat.push(other),
    }
  }

  // 0*oo and 0/0 are not zero
  let absorbs_zero = !flat.iter().any(|f| f.contains_infinity() || f.contains_undefined());
  let mut coef = Rational::ONE;
  let mut leftover_nums: Vec<Expr> = Vec::new();
  let mut bases: Vec<(Expr, Expr)> = Vec::new();

  for f in flat {
    if let Expr::Num(r) = f {
      match coef.checked_mul(&r) {
        Some(p) => coef = p,
        None => leftover_nums.push(Expr::Num(r)),
      }
      continue;
    }
    let (b, e) = split_power(f);
    match bases.iter_mut().find(|(base, _)| *base == b) {
      Some(slot) => {
        let old = std::mem::replace(&mut slot.1, Expr::int(0));
        slot.1 = simplify_add(vec![old, e]);
      }
      None => bases.push((b, e)),
    }
  }

  if coef.is_zero() && absorbs_zero {
    return Expr::Num(Rational::ZERO);
  }

  let mut rest: Vec<Expr> = Vec::new();
  for (b, e) in bases {
    // merged exponents may fold back to a plain number, e.g. sqrt(2)*sqrt(2)
    let folded = match simplify_pow(b, e) {
      Expr::Mul(inner) => inner,
      other => vec![other],
    };
    for f in folded {
      match f {
        Expr::Num(r) => match coef.checked_mul(&r) {
          Some(p) => coef = p,
          None => leftover_nums.push(Expr::Num(r)),
        },
        other => rest.push(other),
      }
    }
  }
  rest.extend(leftover_nums);
  rest.sort_by_key(sort_key);

  if coef.is_zero() && absorbs_zero {
    return Expr::Num(Rational::ZERO);
  }
  if rest.is_empty() {
    return Expr::Num(coef);
  }
  if !coef.is_one() {
    rest.insert(0, Expr::Num(coef));
  }
  if rest.len() == 1 { rest.remove(0) } else { Expr::Mul(rest) }
}

fn simplify_pow(base: Expr, exp: Expr) -> Expr {
  if let Some(e) = exp.as_num() {
    if e.is_zero() && !base.contains_undefined() {
      return Expr::int(1);
    }
    if e.is_one() {
      return base;
    }
  }
  if let Some(b) = base.as_num() {
    if b.is_one() {
      return Expr::int(1);
    }
    if let Some(e) = exp.as_num() {
      if let Some(v) = rational_pow(b, e) {
        return Expr::Num(v);
      }
    }
  }
  match (base, exp) {
    // (x^a)^k = x^(a*k) is safe for integer k
    (Expr::Pow(inner, a), Expr::Num(k)) if k.is_integer() && !k.is_zero() => {
      let merged = simplify_mul(vec![*a, Expr::Num(k)]);
      simplify_pow(*inner, merged)
    }
    (Expr::Mul(fs), Expr::Num(k)) if k.is_integer() => {
      simplify_mul(fs.into_iter().map(|f| Expr::pow(f, Expr::Num(k))).collect())
    }
    (b, e) => Expr::pow(b, e),
  }
}

fn rational_pow(b: Rational, e: Rational) -> Option<Rational> {
  let (p, q) = (e.numer(), e.denom());
  if p.abs() > MAX_EXACT_EXPONENT {
    return None;
  }
  let root = match q {
    1 => b,
    2 => b.sqrt_exact()?,
    _ => return None,
  };
  root.checked_pow(p as i32)
}

fn simplify_func(f: Func, arg: Expr) -> Expr {
  match (f, &arg) {
    (Func::Ln, Expr::Num(r)) if r.is_one() => Expr::int(0),
    (Func::Ln, Expr::Const(Constant::E)) => Expr::int(1),
    (Func::Ln, Expr::Pow(b, e)) if **b == Expr::Const(Constant::E) => (**e).clone(),
    (Func::Abs, Expr::Num(r)) => Expr::Num(r.abs()),
    (Func::Abs, Expr::Const(_)) | (Func::Abs, Expr::Infinity) => arg,
    _ => Expr::Func(f, Box::new(arg)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::symbolic::parse;

  fn s(text: &str) -> Expr {
    simplify(&parse(text).expect("parses"))
  }

  #[test]
  fn numbers_fold_exactly() {
    assert_eq!(s("1/2 + 1/3"), Expr::Num(Rational::new(5, 6).unwrap()));
    assert_eq!(s("(2/5)^3"), Expr::Num(Rational::new(8, 125).unwrap()));
    assert_eq!(s("sqrt(9/4)"), Expr::Num(Rational::new(3, 2).unwrap()));
    assert_eq!(s("0*pi"), Expr::int(0));
  }

  #[test]
  fn like_terms_and_bases_combine() {
    assert_eq!(s("pi + pi + pi"), Expr::Mul(vec![Expr::int(3), Expr::Const(Constant::Pi)]));
    assert_eq!(s("pi*pi"), Expr::pow(Expr::Const(Constant::Pi), Expr::int(2)));
    assert_eq!(s("sqrt(2)*sqrt(2)"), Expr::int(2));
    assert_eq!(s("e - e"), Expr::int(0));
    assert_eq!(s("pi/pi"), Expr::int(1));
  }

  #[test]
  fn operand_order_does_not_matter() {
    assert_eq!(s("e + pi"), s("pi + e"));
    assert_eq!(s("2*e*pi"), s("pi*2*e"));
  }

  #[test]
  fn irrational_roots_stay_symbolic() {
    let r = s("sqrt(2)");
    assert!(matches!(r, Expr::Pow(..)));
    assert!((r.eval() - 2f64.sqrt()).abs() < 1e-12);
  }

  #[test]
  fn huge_powers_are_left_unexpanded() {
    let big = s("10^1000");
    assert!(matches!(big, Expr::Pow(..)));
    let overflow = s("10^100");
    assert!(matches!(overflow, Expr::Pow(..)));
  }

  #[test]
  fn infinite_terms_never_cancel() {
    assert!(matches!(s("oo - oo"), Expr::Add(_)));
    assert!(s("oo - oo").eval().is_nan());
    assert_eq!(s("2 + oo").eval(), f64::INFINITY);
  }

  #[test]
  fn division_by_zero_is_kept_undefined() {
    for text in ["0/0", "0*(1/0)", "1/0 - 1/0", "5/3 + 1/0 - 1/0", "(1/0)^0"] {
      let r = s(text);
      assert!(r.contains_undefined(), "{text} simplified to {r}");
      assert!(!r.is_zero(), "{text} collapsed to zero");
    }
    assert!(!s("0*pi").contains_undefined());
    assert!(!s("0^2").contains_undefined());
  }

  #[test]
  fn logarithm_rules() {
    assert_eq!(s("ln(1)"), Expr::int(0));
    assert_eq!(s("ln(e^3)"), Expr::int(3));
    assert_eq!(s("abs(-7/2)"), Expr::Num(Rational::new(7, 2).unwrap()));
  }
}
