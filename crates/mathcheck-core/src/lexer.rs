//! Tokenizer for normalized math notation.

use std::ops::Range;

use logos::Logos;

use crate::error::ParseError;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
#[logos(skip r"[$£€]")]
pub enum Token {
    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().to_owned())]
    #[regex(r"\.[0-9]+", |lex| lex.slice().to_owned())]
    Number(String),
    /// A run of ASCII letters; the parser splits it into names and symbols.
    #[regex(r"[a-zA-Z]+", |lex| lex.slice().to_owned())]
    Word(String),
    /// `\name`, stored without the backslash.
    #[regex(r"\\[a-zA-Z]+", |lex| lex.slice()[1..].to_owned())]
    Command(String),
    #[token("π")]
    Pi,
    #[token("√")]
    Radical,
    #[token("²")]
    Squared,
    #[token("³")]
    Cubed,
    #[token("+")]
    Plus,
    #[token("-")]
    #[token("−")]
    Minus,
    #[token("*")]
    #[token("×")]
    #[token("·")]
    #[token("⋅")]
    Star,
    #[token("/")]
    #[token("÷")]
    Slash,
    #[token("^")]
    Caret,
    #[token("_")]
    Underscore,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("|")]
    Pipe,
    #[token(",")]
    Comma,
    #[token("!")]
    Bang,
    #[token("%")]
    Percent,
}

/// A token together with its byte range in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Range<usize>,
}

/// Tokenize a normalized string.
pub fn tokenize(src: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut lexer = Token::lexer(src);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push(Spanned { token, span }),
            Err(()) => {
                return Err(ParseError::InvalidToken {
                    fragment: src[span.clone()].to_string(),
                    offset: span.start,
                })
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn numbers_words_and_commands() {
        assert_eq!(
            kinds(r"2.5x \pi"),
            vec![
                Token::Number("2.5".into()),
                Token::Word("x".into()),
                Token::Command("pi".into()),
            ]
        );
        assert_eq!(kinds(".5"), vec![Token::Number(".5".into())]);
    }

    #[test]
    fn unicode_operators() {
        assert_eq!(
            kinds("3×π−√2÷1"),
            vec![
                Token::Number("3".into()),
                Token::Star,
                Token::Pi,
                Token::Minus,
                Token::Radical,
                Token::Number("2".into()),
                Token::Slash,
                Token::Number("1".into()),
            ]
        );
    }

    #[test]
    fn currency_marks_are_skipped() {
        assert_eq!(kinds("$12"), vec![Token::Number("12".into())]);
        assert_eq!(kinds("£ 3"), vec![Token::Number("3".into())]);
    }

    #[test]
    fn spans_cover_source() {
        let tokens = tokenize("(x + 10)").unwrap();
        assert_eq!(tokens[3].span, 5..7);
    }

    #[test]
    fn unknown_character_reports_fragment() {
        let err = tokenize("2 @ 3").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidToken {
                fragment: "@".into(),
                offset: 2,
            }
        );
    }
}
