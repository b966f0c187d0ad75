//! Recursive-descent parser for normalized math notation.
//!
//! Precedence, loosest first: `+ -`, then `* / \cdot \times \div` and
//! implicit multiplication, then unary minus, then right-associative `^`,
//! then postfix `!`, `%`, `²`, `³`.

use std::ops::Range;

use crate::error::ParseError;
use num_rational::Rational64;

use crate::expr::{BinOp, Constant, Expr, Function, Number, UnaryOp};
use crate::lexer::{tokenize, Spanned, Token};
use crate::normalize::normalize;

const MUL_COMMANDS: &[&str] = &["cdot", "times", "ast"];
const DIV_COMMANDS: &[&str] = &["div"];
const FRAC_COMMANDS: &[&str] = &["frac", "dfrac", "tfrac", "cfrac"];

const GREEK: &[&str] = &[
    "alpha", "beta", "gamma", "delta", "epsilon", "varepsilon", "zeta", "eta", "theta", "vartheta",
    "iota", "kappa", "lambda", "mu", "nu", "xi", "rho", "sigma", "tau", "upsilon", "phi", "varphi",
    "chi", "psi", "omega", "Gamma", "Delta", "Theta", "Lambda", "Xi", "Sigma", "Phi", "Psi",
    "Omega",
];

/// Recursion budget for nested groups, signs, radicals and macro arguments.
pub const MAX_NESTING: usize = 128;

/// Longest token stream accepted for one expression.
pub const MAX_TOKENS: usize = 1000;

/// Names recognized at the start of a bare word, longest first.
const WORD_NAMES: &[&str] = &[
    "arcsin", "arccos", "arctan", "cosec", "sinh", "cosh", "tanh", "sqrt", "asin", "acos", "atan",
    "sin", "cos", "tan", "sec", "csc", "cot", "exp", "abs", "log", "ln", "lg", "pi",
];

/// Parse an already-normalized string.
pub fn parse(normalized: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(normalized)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    if tokens.len() > MAX_TOKENS {
        return Err(ParseError::TooLong { limit: MAX_TOKENS });
    }

    let mut parser = Parser {
        src: normalized,
        tokens,
        pos: 0,
        abs_depth: 0,
        depth: 0,
    };
    let expr = parser.parse_expr()?;

    if let Some(extra) = parser.tokens.get(parser.pos) {
        let fragment = normalized[extra.span.clone()].to_string();
        return Err(match extra.token {
            Token::RParen | Token::RBracket | Token::RBrace | Token::Pipe => {
                ParseError::Unbalanced { fragment }
            }
            _ => ParseError::Unexpected {
                fragment,
                offset: extra.span.start,
            },
        });
    }
    Ok(expr)
}

/// Normalize raw notation, then parse it.
pub fn parse_notation(raw: &str) -> Result<Expr, ParseError> {
    parse(&normalize(raw))
}

/// How two adjacent operands in a product are joined.
enum Joiner {
    Explicit(BinOp),
    Implicit,
}

struct Parser<'s> {
    src: &'s str,
    tokens: Vec<Spanned>,
    pos: usize,
    /// Open `|...|` groups; a `|` only starts an operand outside of one.
    abs_depth: usize,
    /// Current recursion depth through `parse_unary` and `parse_primary`.
    depth: usize,
}

impl<'s> Parser<'s> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let next = self.tokens.get(self.pos).cloned();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Replace the token just consumed with `token` and step back onto it.
    fn push_back(&mut self, token: Token, span: Range<usize>) {
        self.pos -= 1;
        self.tokens[self.pos] = Spanned { token, span };
    }

    fn end_error(&self) -> ParseError {
        let fragment = self
            .tokens
            .last()
            .map(|t| self.src[t.span.clone()].to_string())
            .unwrap_or_default();
        ParseError::UnexpectedEnd { fragment }
    }

    fn unexpected(&self, spanned: &Spanned) -> ParseError {
        ParseError::Unexpected {
            fragment: self.src[spanned.span.clone()].to_string(),
            offset: spanned.span.start,
        }
    }

    /// Run `f` one nesting level deeper, failing past [`MAX_NESTING`].
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            let fragment = self
                .tokens
                .get(self.pos)
                .map(|t| self.src[t.span.clone()].to_string())
                .unwrap_or_default();
            return Err(ParseError::TooDeep {
                fragment,
                limit: MAX_NESTING,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_term()?;
            lhs = Expr::binary(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        while let Some(joiner) = self.peek().and_then(|t| self.term_joiner(t)) {
            let op = match joiner {
                Joiner::Explicit(op) => {
                    self.pos += 1;
                    op
                }
                Joiner::Implicit => BinOp::Mul,
            };
            let rhs = self.parse_unary()?;
            lhs = Expr::binary(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn term_joiner(&self, token: &Token) -> Option<Joiner> {
        match token {
            Token::Star => Some(Joiner::Explicit(BinOp::Mul)),
            Token::Slash => Some(Joiner::Explicit(BinOp::Div)),
            Token::Command(c) if MUL_COMMANDS.contains(&c.as_str()) => {
                Some(Joiner::Explicit(BinOp::Mul))
            }
            Token::Command(c) if DIV_COMMANDS.contains(&c.as_str()) => {
                Some(Joiner::Explicit(BinOp::Div))
            }
            t if self.starts_operand(t) => Some(Joiner::Implicit),
            _ => None,
        }
    }

    fn starts_operand(&self, token: &Token) -> bool {
        match token {
            Token::Number(_)
            | Token::Word(_)
            | Token::Pi
            | Token::Radical
            | Token::LParen
            | Token::LBracket
            | Token::LBrace => true,
            Token::Pipe => self.abs_depth == 0,
            Token::Command(c) => {
                !MUL_COMMANDS.contains(&c.as_str()) && !DIV_COMMANDS.contains(&c.as_str())
            }
            _ => false,
        }
    }

    /// Operands that extend a bare function argument: `\sin 2x` is `sin(2x)`.
    fn extends_bare_argument(&self, token: &Token) -> bool {
        match token {
            Token::Number(_) | Token::Pi => true,
            Token::Word(w) => !split_word(w).0.is_function(),
            Token::Command(c) => c == "pi" || GREEK.contains(&c.as_str()),
            _ => false,
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::parse_signed)
    }

    fn parse_signed(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                let operand = self.parse_unary()?;
                Ok(Expr::unary(UnaryOp::Neg, operand))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_postfix()?;
        if self.eat(&Token::Caret) {
            let exponent = self.parse_exponent()?;
            return Ok(Expr::binary(base, BinOp::Pow, exponent));
        }
        Ok(base)
    }

    fn parse_exponent(&mut self) -> Result<Expr, ParseError> {
        match self.tokens.get(self.pos).cloned() {
            Some(Spanned {
                token: Token::LBrace,
                span,
            }) => {
                self.pos += 1;
                self.finish_group(span.start, Token::RBrace, false)
            }
            Some(_) => self.parse_unary(),
            None => Err(self.end_error()),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            expr = match self.peek() {
                Some(Token::Bang) => Expr::unary(UnaryOp::Factorial, expr),
                Some(Token::Percent) => Expr::unary(UnaryOp::Percent, expr),
                Some(Token::Squared) => Expr::binary(expr, BinOp::Pow, Expr::int(2)),
                Some(Token::Cubed) => Expr::binary(expr, BinOp::Pow, Expr::int(3)),
                _ => break,
            };
            self.pos += 1;
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::parse_atom)
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let Some(spanned) = self.advance() else {
            return Err(self.end_error());
        };
        let Spanned { token, span } = spanned.clone();
        match token {
            Token::Number(literal) => Number::from_literal(&literal)
                .map(Expr::Number)
                .ok_or_else(|| self.unexpected(&spanned)),
            Token::Word(word) => self.parse_word(word, span),
            Token::Command(name) => self.parse_command(name, &spanned),
            Token::Pi => Ok(Expr::Constant(Constant::Pi)),
            Token::Radical => {
                let radicand = self.parse_macro_argument(false)?;
                Ok(Expr::Call(Function::Sqrt, vec![radicand]))
            }
            Token::LParen => self.finish_group(span.start, Token::RParen, true),
            Token::LBracket => self.finish_group(span.start, Token::RBracket, true),
            Token::LBrace => self.finish_group(span.start, Token::RBrace, false),
            Token::Pipe => self.finish_abs(span.start),
            _ => Err(self.unexpected(&spanned)),
        }
    }

    /// Parse the inside of a bracket group whose opener is already consumed.
    ///
    /// Parentheses and square brackets holding exactly one top-level comma
    /// form an ordered pair.
    fn finish_group(
        &mut self,
        start: usize,
        close: Token,
        allow_pair: bool,
    ) -> Result<Expr, ParseError> {
        let outer_abs = std::mem::replace(&mut self.abs_depth, 0);
        let first = self.parse_expr()?;
        let inner = if allow_pair && self.eat(&Token::Comma) {
            let second = self.parse_expr()?;
            Expr::Pair(Box::new(first), Box::new(second))
        } else {
            first
        };
        self.abs_depth = outer_abs;

        match self.advance() {
            Some(t) if t.token == close => Ok(inner),
            Some(t) => match t.token {
                Token::RParen | Token::RBracket | Token::RBrace | Token::Pipe => {
                    Err(ParseError::Unbalanced {
                        fragment: self.src[start..t.span.end].to_string(),
                    })
                }
                _ => Err(self.unexpected(&t)),
            },
            None => Err(ParseError::Unbalanced {
                fragment: self.src[start..].to_string(),
            }),
        }
    }

    fn finish_abs(&mut self, start: usize) -> Result<Expr, ParseError> {
        self.abs_depth += 1;
        let inner = self.parse_expr()?;
        self.abs_depth -= 1;
        if self.eat(&Token::Pipe) {
            Ok(Expr::Call(Function::Abs, vec![inner]))
        } else {
            Err(ParseError::Unbalanced {
                fragment: self.src[start..].to_string(),
            })
        }
    }

    fn parse_word(&mut self, word: String, span: Range<usize>) -> Result<Expr, ParseError> {
        let (head, tail) = split_word(&word);
        if !tail.is_empty() {
            let split_at = span.start + (word.len() - tail.len());
            self.push_back(Token::Word(tail.to_string()), split_at..span.end);
        }
        match head {
            WordHead::Function(func) => self.parse_call(func),
            WordHead::Pi => Ok(Expr::Constant(Constant::Pi)),
            WordHead::Symbol("e") => Ok(Expr::Constant(Constant::E)),
            WordHead::Symbol(letter) => self.parse_symbol(letter.to_string()),
        }
    }

    fn parse_command(&mut self, name: String, spanned: &Spanned) -> Result<Expr, ParseError> {
        let name = name.as_str();
        if FRAC_COMMANDS.contains(&name) {
            let numerator = self.parse_macro_argument(true)?;
            let denominator = self.parse_macro_argument(true)?;
            return Ok(Expr::binary(numerator, BinOp::Div, denominator));
        }
        if GREEK.contains(&name) {
            return self.parse_symbol(name.to_string());
        }
        match name {
            "sqrt" => self.parse_sqrt(),
            "pi" => Ok(Expr::Constant(Constant::Pi)),
            "exponentialE" => Ok(Expr::Constant(Constant::E)),
            _ if MUL_COMMANDS.contains(&name) || DIV_COMMANDS.contains(&name) => {
                Err(self.unexpected(spanned))
            }
            _ => match Function::from_name(name) {
                Some(func) => self.parse_call(func),
                None => Err(ParseError::UnknownFunction {
                    name: name.to_string(),
                }),
            },
        }
    }

    fn parse_sqrt(&mut self) -> Result<Expr, ParseError> {
        if let Some(Spanned {
            token: Token::LBracket,
            span,
        }) = self.tokens.get(self.pos).cloned()
        {
            self.pos += 1;
            let index = self.finish_group(span.start, Token::RBracket, false)?;
            let radicand = self.parse_macro_argument(false)?;
            return Ok(Expr::Call(Function::Root, vec![index, radicand]));
        }
        let radicand = self.parse_macro_argument(false)?;
        Ok(Expr::Call(Function::Sqrt, vec![radicand]))
    }

    /// A LaTeX macro argument: a braced group, or a single token.
    ///
    /// With `split_digits`, a multi-digit number contributes only its first
    /// digit, so `\frac12` reads as one half.
    fn parse_macro_argument(&mut self, split_digits: bool) -> Result<Expr, ParseError> {
        let Some(next) = self.tokens.get(self.pos).cloned() else {
            return Err(self.end_error());
        };
        match &next.token {
            Token::LBrace => {
                self.pos += 1;
                self.finish_group(next.span.start, Token::RBrace, false)
            }
            Token::Number(literal)
                if split_digits
                    && literal.len() > 1
                    && literal.bytes().all(|b| b.is_ascii_digit()) =>
            {
                let digit = i64::from(literal.as_bytes()[0] - b'0');
                self.tokens[self.pos] = Spanned {
                    token: Token::Number(literal[1..].to_string()),
                    span: next.span.start + 1..next.span.end,
                };
                Ok(Expr::int(digit))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_call(&mut self, func: Function) -> Result<Expr, ParseError> {
        let mut func = func;

        let base = if func == Function::Log10 && self.eat(&Token::Underscore) {
            Some(self.parse_macro_argument(false)?)
        } else {
            None
        };

        let mut power = None;
        if self.eat(&Token::Caret) {
            let exponent = self.parse_exponent()?;
            match func.inverse() {
                Some(inverse) if is_minus_one(&exponent) => func = inverse,
                _ => power = Some(exponent),
            }
        }

        let argument = self.parse_function_argument()?;
        let call = match base {
            Some(base) => Expr::Call(Function::Log, vec![base, argument]),
            None => Expr::Call(func, vec![argument]),
        };
        Ok(match power {
            Some(exponent) => Expr::binary(call, BinOp::Pow, exponent),
            None => call,
        })
    }

    fn parse_function_argument(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            None => Err(self.end_error()),
            Some(Token::LParen | Token::LBracket | Token::LBrace | Token::Pipe) => {
                self.parse_primary()
            }
            Some(_) => {
                let mut argument = self.parse_unary()?;
                while self
                    .peek()
                    .is_some_and(|t| self.extends_bare_argument(t))
                {
                    let factor = self.parse_power()?;
                    argument = Expr::binary(argument, BinOp::Mul, factor);
                }
                Ok(argument)
            }
        }
    }

    fn parse_symbol(&mut self, name: String) -> Result<Expr, ParseError> {
        if !self.eat(&Token::Underscore) {
            return Ok(Expr::Symbol(name));
        }
        let Some(next) = self.advance() else {
            return Err(self.end_error());
        };
        let subscript = match &next.token {
            Token::Number(text) | Token::Word(text) => text.clone(),
            Token::LBrace => self.raw_braced_text(&next)?,
            _ => return Err(self.unexpected(&next)),
        };
        Ok(Expr::Symbol(format!("{name}_{subscript}")))
    }

    /// Source text up to the `}` matching an already-consumed `{`.
    fn raw_braced_text(&mut self, open: &Spanned) -> Result<String, ParseError> {
        let mut depth = 0usize;
        while let Some(t) = self.advance() {
            match t.token {
                Token::LBrace => depth += 1,
                Token::RBrace if depth == 0 => {
                    let text: String = self.src[open.span.end..t.span.start]
                        .chars()
                        .filter(|c| !c.is_whitespace())
                        .collect();
                    if text.is_empty() {
                        return Err(self.unexpected(&t));
                    }
                    return Ok(text);
                }
                Token::RBrace => depth -= 1,
                _ => {}
            }
        }
        Err(ParseError::Unbalanced {
            fragment: self.src[open.span.start..].to_string(),
        })
    }
}

/// Leading piece of a bare word.
enum WordHead<'w> {
    Function(Function),
    Pi,
    Symbol(&'w str),
}

impl WordHead<'_> {
    fn is_function(&self) -> bool {
        matches!(self, WordHead::Function(_))
    }
}

/// Split a run of letters into its leading name and the remainder.
///
/// Known function names and `pi` are matched as prefixes; anything else
/// yields one single-letter symbol, so `xy` reads as `x*y`.
fn split_word(word: &str) -> (WordHead<'_>, &str) {
    for name in WORD_NAMES {
        if let Some(rest) = word.strip_prefix(name) {
            let head = match Function::from_name(name) {
                Some(func) => WordHead::Function(func),
                None => WordHead::Pi,
            };
            return (head, rest);
        }
    }
    let split = word.chars().next().map(char::len_utf8).unwrap_or(0);
    (WordHead::Symbol(&word[..split]), &word[split..])
}

fn is_minus_one(expr: &Expr) -> bool {
    match expr {
        Expr::Unary(UnaryOp::Neg, inner) => matches!(
            inner.as_ref(),
            Expr::Number(Number::Exact(r)) if *r == Rational64::from_integer(1)
        ),
        _ => false,
    }
}
