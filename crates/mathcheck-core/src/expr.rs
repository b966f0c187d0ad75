//! Parsed expression tree.

use std::collections::BTreeSet;
use std::fmt;

use num_rational::Rational64;
use serde::{Deserialize, Serialize};

/// A numeric literal.
///
/// Literals are kept exact whenever they fit in an `i64` ratio so that exact
/// comparison is not defeated by rounding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Number {
    Exact(Rational64),
    Approx(f64),
}

impl Number {
    /// Parse a decimal literal such as `12`, `2.50` or `.5`.
    pub fn from_literal(literal: &str) -> Option<Number> {
        let (int_part, frac_part) = match literal.split_once('.') {
            Some((i, f)) => (i, f),
            None => (literal, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
            return None;
        }

        let digits = format!("{int_part}{frac_part}");
        let exact = digits.parse::<i64>().ok().and_then(|numer| {
            let scale = u32::try_from(frac_part.len()).ok()?;
            let denom = 10i64.checked_pow(scale)?;
            Some(Rational64::new(numer, denom))
        });
        match exact {
            Some(r) => Some(Number::Exact(r)),
            None => literal.parse::<f64>().ok().map(Number::Approx),
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Number::Exact(r) => *r.numer() as f64 / *r.denom() as f64,
            Number::Approx(f) => f,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Exact(r) if r.is_integer() => write!(f, "{}", r.numer()),
            Number::Exact(r) => write!(f, "{}/{}", r.numer(), r.denom()),
            Number::Approx(v) => write!(f, "{v}"),
        }
    }
}

/// Named irrational constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Constant {
    Pi,
    E,
}

impl Constant {
    pub fn value(self) -> f64 {
        match self {
            Constant::Pi => std::f64::consts::PI,
            Constant::E => std::f64::consts::E,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Pi => write!(f, "pi"),
            Constant::E => write!(f, "e"),
        }
    }
}

/// Functions the parser recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Sec,
    Csc,
    Cot,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Ln,
    /// Base-10 logarithm.
    Log10,
    /// Logarithm with an explicit base: `Call(Log, [base, x])`.
    Log,
    Exp,
    Sqrt,
    /// `n`-th root: `Call(Root, [n, x])`.
    Root,
    Abs,
}

impl Function {
    /// Look up a function by its notation name (with or without backslash).
    pub fn from_name(name: &str) -> Option<Function> {
        let f = match name {
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "sec" => Function::Sec,
            "csc" | "cosec" => Function::Csc,
            "cot" => Function::Cot,
            "arcsin" | "asin" => Function::Asin,
            "arccos" | "acos" => Function::Acos,
            "arctan" | "atan" => Function::Atan,
            "sinh" => Function::Sinh,
            "cosh" => Function::Cosh,
            "tanh" => Function::Tanh,
            "ln" => Function::Ln,
            "log" | "lg" => Function::Log10,
            "exp" => Function::Exp,
            "sqrt" => Function::Sqrt,
            "abs" => Function::Abs,
            _ => return None,
        };
        Some(f)
    }

    /// The inverse trigonometric function, for `\sin^{-1}` style input.
    pub fn inverse(self) -> Option<Function> {
        match self {
            Function::Sin => Some(Function::Asin),
            Function::Cos => Some(Function::Acos),
            Function::Tan => Some(Function::Atan),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Sec => "sec",
            Function::Csc => "csc",
            Function::Cot => "cot",
            Function::Asin => "arcsin",
            Function::Acos => "arccos",
            Function::Atan => "arctan",
            Function::Sinh => "sinh",
            Function::Cosh => "cosh",
            Function::Tanh => "tanh",
            Function::Ln => "ln",
            Function::Log10 => "log",
            Function::Log => "log",
            Function::Exp => "exp",
            Function::Sqrt => "sqrt",
            Function::Root => "root",
            Function::Abs => "abs",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Factorial,
    /// Postfix `%`, i.e. division by 100.
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinOp {
    fn precedence(self) -> u8 {
        match self {
            BinOp::Add | BinOp::Sub => 1,
            BinOp::Mul | BinOp::Div => 2,
            BinOp::Pow => 4,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => " + ",
            BinOp::Sub => " - ",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Pow => "^",
        }
    }
}

/// Parsed math expression. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(Number),
    Constant(Constant),
    Symbol(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(Box<Expr>, BinOp, Box<Expr>),
    Call(Function, Vec<Expr>),
    Pair(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn int(n: i64) -> Expr {
        Expr::Number(Number::Exact(Rational64::from_integer(n)))
    }

    pub fn binary(lhs: Expr, op: BinOp, rhs: Expr) -> Expr {
        Expr::Binary(Box::new(lhs), op, Box::new(rhs))
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
        Expr::Unary(op, Box::new(operand))
    }

    /// Names of all free symbols, sorted.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut symbols = BTreeSet::new();
        self.collect_symbols(&mut symbols);
        symbols
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Symbol(name) => {
                out.insert(name.clone());
            }
            Expr::Unary(_, inner) => inner.collect_symbols(out),
            Expr::Binary(lhs, _, rhs) | Expr::Pair(lhs, rhs) => {
                lhs.collect_symbols(out);
                rhs.collect_symbols(out);
            }
            Expr::Call(_, args) => args.iter().for_each(|a| a.collect_symbols(out)),
            Expr::Number(_) | Expr::Constant(_) => {}
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary(_, op, _) => op.precedence(),
            Expr::Unary(UnaryOp::Neg, _) => 3,
            Expr::Number(Number::Exact(r)) if !r.is_integer() => 2,
            Expr::Number(n) if n.to_f64() < 0.0 => 3,
            _ => 5,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Constant(c) => write!(f, "{c}"),
            Expr::Symbol(s) => write!(f, "{s}"),
            Expr::Unary(UnaryOp::Neg, inner) => {
                write!(f, "-")?;
                inner.fmt_operand(f, 3)
            }
            Expr::Unary(UnaryOp::Factorial, inner) => {
                inner.fmt_operand(f, 5)?;
                write!(f, "!")
            }
            Expr::Unary(UnaryOp::Percent, inner) => {
                inner.fmt_operand(f, 5)?;
                write!(f, "%")
            }
            Expr::Binary(lhs, op, rhs) => {
                let p = op.precedence();
                // left-assoc ops need a tighter right operand, `^` the reverse
                let (left_min, right_min) = match op {
                    BinOp::Pow => (p + 1, p),
                    _ => (p, p + 1),
                };
                lhs.fmt_operand(f, left_min)?;
                write!(f, "{}", op.symbol())?;
                rhs.fmt_operand(f, right_min)
            }
            Expr::Call(Function::Log, args) if args.len() == 2 => {
                write!(f, "log_({})({})", args[0], args[1])
            }
            Expr::Call(Function::Root, args) if args.len() == 2 => {
                write!(f, "root_({})({})", args[0], args[1])
            }
            Expr::Call(func, args) => {
                write!(f, "{}(", func.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expr::Pair(a, b) => write!(f, "({a}, {b})"),
        }
    }
}
