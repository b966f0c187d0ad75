//! Exact canonical form used for symbolic equality.
//!
//! An expression is reduced to a sum of monomials with rational
//! coefficients, each monomial being a product of atoms raised to rational
//! exponents. Sums are flattened, like terms collected and products
//! distributed, so `x+1`, `1+x` and `(2x+2)/2` all reduce to the same value.
//! Anything with no exact reduction (approximate literals, ordered pairs)
//! is reported as unsupported and left to the numeric fallback.

use std::collections::BTreeMap;
use std::fmt;

use num_rational::Rational64;
use num_traits::{CheckedAdd, CheckedMul, One, Signed, Zero};

use crate::error::CanonicalError;
use crate::expr::{BinOp, Constant, Expr, Function, Number, UnaryOp};

/// Largest integer power of a multi-term sum that is expanded.
const MAX_EXPANDED_POWER: i64 = 8;

/// Largest integer whose factorial is folded exactly.
const MAX_EXACT_FACTORIAL: i64 = 20;

/// Largest factor pulled out from under a radical.
const MAX_ROOT_FACTOR: i64 = 1000;

/// Indivisible factor of a monomial.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Atom {
    Symbol(String),
    Constant(Constant),
    Call(Function, Vec<Canonical>),
    /// A base that could not be distributed, kept whole under its exponent
    /// (a sum under a root, or an inexact root of a number).
    Group(Canonical),
    /// A power with a non-constant exponent.
    Power(Canonical, Canonical),
}

/// Product of atoms with nonzero rational exponents.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Monomial(BTreeMap<Atom, Rational64>);

impl Monomial {
    fn one() -> Self {
        Monomial::default()
    }

    fn of(atom: Atom) -> Self {
        Monomial(BTreeMap::from([(atom, Rational64::one())]))
    }

    fn is_one(&self) -> bool {
        self.0.is_empty()
    }

    fn times(&self, other: &Monomial) -> Result<Monomial, CanonicalError> {
        let mut factors = self.0.clone();
        for (atom, exp) in &other.0 {
            let sum = match factors.get(atom) {
                Some(existing) => existing.checked_add(exp).ok_or(CanonicalError::Overflow)?,
                None => *exp,
            };
            if sum.is_zero() {
                factors.remove(atom);
            } else {
                factors.insert(atom.clone(), sum);
            }
        }
        Ok(Monomial(factors))
    }

    /// Whether an even root of this monomial could lose a sign, as in
    /// `sqrt(x^2) = |x|`.
    fn has_even_power(&self) -> bool {
        self.0
            .iter()
            .any(|(atom, exp)| !matches!(atom, Atom::Constant(_)) && *exp.numer() % 2 == 0)
    }

    fn scaled(&self, by: Rational64) -> Result<Monomial, CanonicalError> {
        let mut factors = BTreeMap::new();
        for (atom, exp) in &self.0 {
            let scaled = exp.checked_mul(&by).ok_or(CanonicalError::Overflow)?;
            if !scaled.is_zero() {
                factors.insert(atom.clone(), scaled);
            }
        }
        Ok(Monomial(factors))
    }
}

/// Canonical sum of monomials. Zero coefficients are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Canonical {
    terms: BTreeMap<Monomial, Rational64>,
}

impl Canonical {
    pub fn zero() -> Self {
        Canonical::default()
    }

    pub fn constant(value: Rational64) -> Self {
        Canonical::term(Monomial::one(), value)
    }

    fn term(monomial: Monomial, coeff: Rational64) -> Self {
        let mut terms = BTreeMap::new();
        if !coeff.is_zero() {
            terms.insert(monomial, coeff);
        }
        Canonical { terms }
    }

    fn atom(atom: Atom) -> Self {
        Canonical::term(Monomial::of(atom), Rational64::one())
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// Number of monomials in the sum.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The value, if this is a plain rational number.
    pub fn as_constant(&self) -> Option<Rational64> {
        match self.single_term() {
            None if self.is_zero() => Some(Rational64::zero()),
            Some((monomial, coeff)) if monomial.is_one() => Some(coeff),
            _ => None,
        }
    }

    fn single_term(&self) -> Option<(&Monomial, Rational64)> {
        if self.terms.len() != 1 {
            return None;
        }
        self.terms.iter().next().map(|(m, c)| (m, *c))
    }
}

/// Reduces expressions to [`Canonical`] form under a term cap.
#[derive(Debug, Clone, Copy)]
pub struct Canonicalizer {
    max_terms: usize,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Canonicalizer { max_terms: 256 }
    }
}

impl Canonicalizer {
    pub fn new(max_terms: usize) -> Self {
        Canonicalizer { max_terms }
    }

    pub fn canonicalize(&self, expr: &Expr) -> Result<Canonical, CanonicalError> {
        match expr {
            Expr::Number(Number::Exact(r)) => Ok(Canonical::constant(*r)),
            Expr::Number(Number::Approx(_)) => {
                Err(CanonicalError::Unsupported("approximate literal"))
            }
            Expr::Constant(c) => Ok(Canonical::atom(Atom::Constant(*c))),
            Expr::Symbol(name) => Ok(Canonical::atom(Atom::Symbol(name.clone()))),
            Expr::Unary(op, inner) => {
                let inner = self.canonicalize(inner)?;
                match op {
                    UnaryOp::Neg => self.scale(&inner, Rational64::from_integer(-1)),
                    UnaryOp::Percent => self.scale(&inner, Rational64::new(1, 100)),
                    UnaryOp::Factorial => factorial(&inner),
                }
            }
            Expr::Binary(lhs, op, rhs) => {
                let lhs = self.canonicalize(lhs)?;
                let rhs = self.canonicalize(rhs)?;
                match op {
                    BinOp::Add => self.add(&lhs, &rhs),
                    BinOp::Sub => {
                        let negated = self.scale(&rhs, Rational64::from_integer(-1))?;
                        self.add(&lhs, &negated)
                    }
                    BinOp::Mul => self.mul(&lhs, &rhs),
                    BinOp::Div => {
                        let reciprocal = self.recip(&rhs)?;
                        self.mul(&lhs, &reciprocal)
                    }
                    BinOp::Pow => self.pow(&lhs, &rhs),
                }
            }
            Expr::Call(func, args) => {
                let args = args
                    .iter()
                    .map(|a| self.canonicalize(a))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(*func, args)
            }
            Expr::Pair(_, _) => Err(CanonicalError::Unsupported("ordered pair")),
        }
    }

    fn call(&self, func: Function, mut args: Vec<Canonical>) -> Result<Canonical, CanonicalError> {
        let arity = if matches!(func, Function::Log | Function::Root) { 2 } else { 1 };
        if args.len() != arity {
            return Err(CanonicalError::Unsupported("wrong number of arguments"));
        }
        let arg = args.pop().unwrap_or_default();
        match func {
            Function::Sqrt => self.pow(&arg, &Canonical::constant(Rational64::new(1, 2))),
            Function::Root => {
                let index = args.pop().unwrap_or_default();
                match index.as_constant() {
                    Some(n) if !n.is_zero() => self.pow(&arg, &Canonical::constant(n.recip())),
                    Some(_) => Err(CanonicalError::Undefined("zeroth root")),
                    None => Err(CanonicalError::Unsupported("symbolic root index")),
                }
            }
            Function::Exp => self.pow(&Canonical::atom(Atom::Constant(Constant::E)), &arg),
            Function::Ln => ln(arg),
            Function::Log10 => {
                let base = ln(Canonical::constant(Rational64::from_integer(10)))?;
                let reciprocal = self.recip(&base)?;
                self.mul(&ln(arg)?, &reciprocal)
            }
            Function::Log => {
                let base = args.pop().unwrap_or_default();
                let reciprocal = self.recip(&ln(base)?)?;
                self.mul(&ln(arg)?, &reciprocal)
            }
            Function::Abs => match arg.as_constant() {
                Some(c) => Ok(Canonical::constant(c.abs())),
                None => Ok(Canonical::atom(Atom::Call(Function::Abs, vec![arg]))),
            },
            _ => Ok(Canonical::atom(Atom::Call(func, vec![arg]))),
        }
    }

    fn add(&self, a: &Canonical, b: &Canonical) -> Result<Canonical, CanonicalError> {
        let mut terms = a.terms.clone();
        for (monomial, coeff) in &b.terms {
            self.accumulate(&mut terms, monomial.clone(), *coeff)?;
        }
        Ok(Canonical { terms })
    }

    fn accumulate(
        &self,
        terms: &mut BTreeMap<Monomial, Rational64>,
        monomial: Monomial,
        coeff: Rational64,
    ) -> Result<(), CanonicalError> {
        let sum = match terms.get(&monomial) {
            Some(existing) => existing.checked_add(&coeff).ok_or(CanonicalError::Overflow)?,
            None => coeff,
        };
        if sum.is_zero() {
            terms.remove(&monomial);
        } else {
            terms.insert(monomial, sum);
            if terms.len() > self.max_terms {
                return Err(CanonicalError::TooLarge {
                    limit: self.max_terms,
                });
            }
        }
        Ok(())
    }

    fn scale(&self, a: &Canonical, by: Rational64) -> Result<Canonical, CanonicalError> {
        self.mul(a, &Canonical::constant(by))
    }

    fn mul(&self, a: &Canonical, b: &Canonical) -> Result<Canonical, CanonicalError> {
        let mut result = Canonical::zero();
        for (ma, ca) in &a.terms {
            for (mb, cb) in &b.terms {
                let coeff = ca.checked_mul(cb).ok_or(CanonicalError::Overflow)?;
                let product = self.settle(ma.times(mb)?, coeff)?;
                for (monomial, c) in product.terms {
                    self.accumulate(&mut result.terms, monomial, c)?;
                }
            }
        }
        Ok(result)
    }

    /// Expand grouped factors whose exponent became a small positive integer,
    /// e.g. `sqrt(2)*sqrt(2)` or `sqrt(x+1)^2`.
    fn settle(&self, monomial: Monomial, coeff: Rational64) -> Result<Canonical, CanonicalError> {
        let (ready, rest): (BTreeMap<_, _>, BTreeMap<_, _>) =
            monomial.0.into_iter().partition(|(atom, exp)| match atom {
                // radicals of numbers are kept with an exponent in (0, 1)
                Atom::Group(inner) if inner.as_constant().is_some() => {
                    !(*exp > Rational64::zero() && *exp < Rational64::one())
                }
                Atom::Group(inner) => {
                    exp.is_integer()
                        && (inner.len() == 1
                            || (exp.is_positive() && *exp.numer() <= MAX_EXPANDED_POWER))
                }
                _ => false,
            });

        let mut acc = Canonical::term(Monomial(rest), coeff);
        for (atom, exp) in ready {
            if let Atom::Group(inner) = atom {
                let expanded = self.pow(&inner, &Canonical::constant(exp))?;
                acc = self.mul(&acc, &expanded)?;
            }
        }
        Ok(acc)
    }

    fn recip(&self, a: &Canonical) -> Result<Canonical, CanonicalError> {
        if a.is_zero() {
            return Err(CanonicalError::Undefined("division by zero"));
        }
        self.pow(a, &Canonical::constant(Rational64::from_integer(-1)))
    }

    fn pow(&self, base: &Canonical, exponent: &Canonical) -> Result<Canonical, CanonicalError> {
        let Some(r) = exponent.as_constant() else {
            if base.as_constant() == Some(Rational64::one()) {
                return Ok(Canonical::constant(Rational64::one()));
            }
            return Ok(Canonical::atom(Atom::Power(base.clone(), exponent.clone())));
        };

        if r.is_zero() {
            return Ok(Canonical::constant(Rational64::one()));
        }
        if base.is_zero() {
            return if r.is_positive() {
                Ok(Canonical::zero())
            } else {
                Err(CanonicalError::Undefined("division by zero"))
            };
        }

        if let Some((monomial, coeff)) = base.single_term() {
            return self.pow_term(monomial, coeff, r);
        }

        if r.is_integer() && r.is_positive() && *r.numer() <= MAX_EXPANDED_POWER {
            let mut acc = base.clone();
            for _ in 1..*r.numer() {
                acc = self.mul(&acc, base)?;
            }
            return Ok(acc);
        }
        Ok(group_power(base.clone(), r, Rational64::one()))
    }

    /// `(coeff * monomial)^r` for a rational exponent.
    fn pow_term(
        &self,
        monomial: &Monomial,
        coeff: Rational64,
        r: Rational64,
    ) -> Result<Canonical, CanonicalError> {
        if *r.denom() % 2 == 0 {
            if coeff.is_negative() && monomial.is_one() {
                return Err(CanonicalError::Undefined("even root of a negative number"));
            }
            if coeff.is_negative() || monomial.has_even_power() {
                let base = Canonical::term(monomial.clone(), coeff);
                return Ok(group_power(base, r, Rational64::one()));
            }
        }

        let scalar = constant_power(coeff, r)?;
        let rest = self.settle(monomial.scaled(r)?, Rational64::one())?;
        self.mul(&scalar, &rest)
    }
}

fn group_power(base: Canonical, r: Rational64, coeff: Rational64) -> Canonical {
    Canonical::term(Monomial(BTreeMap::from([(Atom::Group(base), r)])), coeff)
}

fn ln(arg: Canonical) -> Result<Canonical, CanonicalError> {
    match arg.as_constant() {
        Some(c) if !c.is_positive() => {
            return Err(CanonicalError::Undefined("logarithm of a non-positive number"))
        }
        Some(c) if c.is_one() => return Ok(Canonical::zero()),
        _ => {}
    }
    if arg == Canonical::atom(Atom::Constant(Constant::E)) {
        return Ok(Canonical::constant(Rational64::one()));
    }
    Ok(Canonical::atom(Atom::Call(Function::Ln, vec![arg])))
}

fn factorial(arg: &Canonical) -> Result<Canonical, CanonicalError> {
    let n = arg
        .as_constant()
        .filter(|c| c.is_integer())
        .map(|c| *c.numer())
        .ok_or(CanonicalError::Unsupported("factorial of a non-integer"))?;
    if n < 0 {
        return Err(CanonicalError::Undefined("factorial of a negative number"));
    }
    if n > MAX_EXACT_FACTORIAL {
        return Err(CanonicalError::Overflow);
    }
    let value = (1..=n).product::<i64>();
    Ok(Canonical::constant(Rational64::from_integer(value)))
}

/// `c^r` for a rational `c`, as an exact rational times at most one radical
/// `Group(k)^(1/q)` with `k` an integer free of `q`-th powers.
///
/// The denominator is rationalized, so `(1/2)^(1/2)` and `sqrt(2)/2` agree.
fn constant_power(c: Rational64, r: Rational64) -> Result<Canonical, CanonicalError> {
    let (p, q) = (*r.numer(), *r.denom());
    let whole = checked_powi(c, p.div_euclid(q))?;
    let frac = p.rem_euclid(q);
    if frac == 0 {
        return Ok(Canonical::constant(whole));
    }

    let index = u32::try_from(q).map_err(|_| CanonicalError::Unsupported("root index too large"))?;
    // q is odd whenever the radicand is negative
    let radicand = checked_powi(c, frac)?;
    let sign: i64 = if radicand.is_negative() { -1 } else { 1 };
    let magnitude = radicand.abs();

    let (out_numer, in_numer) = extract_root(*magnitude.numer(), index);
    let (out_denom, in_denom) = extract_root(*magnitude.denom(), index);
    let lifted = in_denom
        .checked_pow(index - 1)
        .and_then(|d| d.checked_mul(in_numer))
        .ok_or(CanonicalError::Overflow)?;
    let (out_lifted, inside) = extract_root(lifted, index);

    let numer = out_numer
        .checked_mul(out_lifted)
        .and_then(|n| n.checked_mul(sign))
        .ok_or(CanonicalError::Overflow)?;
    let denom = out_denom
        .checked_mul(in_denom)
        .ok_or(CanonicalError::Overflow)?;
    let scalar = whole
        .checked_mul(&Rational64::new(numer, denom))
        .ok_or(CanonicalError::Overflow)?;

    if inside == 1 {
        return Ok(Canonical::constant(scalar));
    }
    let radical = Canonical::constant(Rational64::from_integer(inside));
    Ok(group_power(radical, Rational64::new(1, q), scalar))
}

fn checked_powi(base: Rational64, exp: i64) -> Result<Rational64, CanonicalError> {
    if exp < 0 {
        if base.is_zero() {
            return Err(CanonicalError::Undefined("division by zero"));
        }
        return checked_powi(base.recip(), exp.checked_neg().ok_or(CanonicalError::Overflow)?);
    }
    if exp == 0 {
        return Ok(Rational64::one());
    }
    if base.is_zero() || base.is_one() {
        return Ok(base);
    }
    if base == Rational64::from_integer(-1) {
        return Ok(if exp % 2 == 0 { Rational64::one() } else { base });
    }
    let mut acc = Rational64::one();
    for _ in 0..exp {
        acc = acc.checked_mul(&base).ok_or(CanonicalError::Overflow)?;
    }
    Ok(acc)
}

/// Split `n` into `(a, b)` with `n = a^q * b`, pulling out small factors.
fn extract_root(n: i64, q: u32) -> (i64, i64) {
    if let Some(root) = integer_root(n, q) {
        return (root, 1);
    }
    let mut rest = n;
    let mut outside = 1i64;
    for k in 2..=MAX_ROOT_FACTOR {
        let Some(power) = k.checked_pow(q) else { break };
        if power > rest {
            break;
        }
        while rest % power == 0 {
            rest /= power;
            outside *= k;
        }
    }
    (outside, rest)
}

/// Exact `q`-th root of a non-negative integer.
fn integer_root(n: i64, q: u32) -> Option<i64> {
    if q == 1 || n < 2 {
        return Some(n);
    }
    let estimate = (n as f64).powf(1.0 / f64::from(q)).round() as i64;
    (estimate.saturating_sub(1)..=estimate.saturating_add(1))
        .find(|candidate| *candidate >= 0 && candidate.checked_pow(q) == Some(n))
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Symbol(name) => write!(f, "{name}"),
            Atom::Constant(c) => write!(f, "{c}"),
            Atom::Call(func, args) => {
                write!(f, "{}(", func.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Atom::Group(inner) => write!(f, "({inner})"),
            Atom::Power(base, exp) => write!(f, "({base})^({exp})"),
        }
    }
}

impl fmt::Display for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (atom, exp)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "*")?;
            }
            write!(f, "{atom}")?;
            if exp.is_integer() && exp.is_positive() {
                if !exp.is_one() {
                    write!(f, "^{}", exp.numer())?;
                }
            } else {
                write!(f, "^({exp})")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Canonical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        for (i, (monomial, coeff)) in self.terms.iter().enumerate() {
            let magnitude = coeff.abs();
            match (i, coeff.is_negative()) {
                (0, true) => write!(f, "-")?,
                (0, false) => {}
                (_, true) => write!(f, " - ")?,
                (_, false) => write!(f, " + ")?,
            }
            if monomial.is_one() {
                write!(f, "{magnitude}")?;
            } else if magnitude.is_one() {
                write!(f, "{monomial}")?;
            } else {
                write!(f, "{magnitude}*{monomial}")?;
            }
        }
        Ok(())
    }
}
