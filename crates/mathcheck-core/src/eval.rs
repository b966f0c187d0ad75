//! Numeric evaluation to `f64`, used by the tolerance fallback.

use std::collections::BTreeMap;

use crate::error::EvalError;
use crate::expr::{BinOp, Expr, Function, UnaryOp};

/// Largest argument whose factorial is finite in `f64`.
const MAX_FACTORIAL: f64 = 170.0;

/// Values bound to free symbols.
pub type Bindings = BTreeMap<String, f64>;

/// Evaluate `expr` with the given symbol bindings.
pub fn evaluate(expr: &Expr, bindings: &Bindings) -> Result<f64, EvalError> {
    let value = match expr {
        Expr::Number(n) => n.to_f64(),
        Expr::Constant(c) => c.value(),
        Expr::Symbol(name) => *bindings
            .get(name)
            .ok_or_else(|| EvalError::UnboundSymbol(name.clone()))?,
        Expr::Unary(op, inner) => {
            let x = evaluate(inner, bindings)?;
            match op {
                UnaryOp::Neg => -x,
                UnaryOp::Percent => x / 100.0,
                UnaryOp::Factorial => factorial(x)?,
            }
        }
        Expr::Binary(lhs, op, rhs) => {
            let a = evaluate(lhs, bindings)?;
            let b = evaluate(rhs, bindings)?;
            match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div if b == 0.0 => return Err(EvalError::DivisionByZero),
                BinOp::Div => a / b,
                BinOp::Pow => power(a, b)?,
            }
        }
        Expr::Call(func, args) => {
            let values = args
                .iter()
                .map(|a| evaluate(a, bindings))
                .collect::<Result<Vec<_>, _>>()?;
            call(*func, &values)?
        }
        Expr::Pair(_, _) => return Err(EvalError::NotScalar),
    };
    finite(value)
}

fn finite(value: f64) -> Result<f64, EvalError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::NonFinite)
    }
}

fn domain(func: Function, value: f64) -> EvalError {
    EvalError::Domain {
        function: func.name().to_string(),
        value,
    }
}

fn factorial(x: f64) -> Result<f64, EvalError> {
    if x < 0.0 || x.fract() != 0.0 || x > MAX_FACTORIAL {
        return Err(EvalError::Domain {
            function: "factorial".to_string(),
            value: x,
        });
    }
    Ok((2..=x as u32).map(f64::from).product())
}

fn power(base: f64, exp: f64) -> Result<f64, EvalError> {
    if base == 0.0 && exp < 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    if base < 0.0 && exp.fract() != 0.0 {
        // real odd roots of negatives, e.g. (-8)^(1/3)
        let inverse = 1.0 / exp;
        let rounded = inverse.round();
        if (inverse - rounded).abs() < 1e-9 && rounded % 2.0 != 0.0 {
            return Ok(-(-base).powf(exp));
        }
        return Err(EvalError::Domain {
            function: "pow".to_string(),
            value: base,
        });
    }
    Ok(base.powf(exp))
}

fn call(func: Function, args: &[f64]) -> Result<f64, EvalError> {
    let (first, x) = match args {
        [x] => (*x, *x),
        [first, x] => (*first, *x),
        _ => return Err(EvalError::NotScalar),
    };
    let value = match func {
        Function::Sin => x.sin(),
        Function::Cos => x.cos(),
        Function::Tan => x.tan(),
        Function::Sec => reciprocal(x.cos())?,
        Function::Csc => reciprocal(x.sin())?,
        Function::Cot => reciprocal(x.tan())?,
        Function::Asin | Function::Acos if x.abs() > 1.0 => return Err(domain(func, x)),
        Function::Asin => x.asin(),
        Function::Acos => x.acos(),
        Function::Atan => x.atan(),
        Function::Sinh => x.sinh(),
        Function::Cosh => x.cosh(),
        Function::Tanh => x.tanh(),
        Function::Ln | Function::Log10 if x <= 0.0 => return Err(domain(func, x)),
        Function::Ln => x.ln(),
        Function::Log10 => x.log10(),
        Function::Log => {
            if first <= 0.0 || first == 1.0 {
                return Err(domain(func, first));
            }
            if x <= 0.0 {
                return Err(domain(func, x));
            }
            x.ln() / first.ln()
        }
        Function::Exp => x.exp(),
        Function::Sqrt if x < 0.0 => return Err(domain(func, x)),
        Function::Sqrt => x.sqrt(),
        Function::Root => {
            if first == 0.0 {
                return Err(domain(func, first));
            }
            power(x, 1.0 / first)?
        }
        Function::Abs => x.abs(),
    };
    Ok(value)
}

fn reciprocal(x: f64) -> Result<f64, EvalError> {
    if x == 0.0 {
        Err(EvalError::DivisionByZero)
    } else {
        Ok(1.0 / x)
    }
}
