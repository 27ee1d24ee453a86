//! Tokenization of metric expressions using logos.
//!
//! Comments are not part of the grammar. Anything the lexer does not
//! recognize is reported as [`CompileError::Lex`] by [`tokenize`].

use crate::error::CompileError;
use logos::Logos;
use std::fmt;
use std::ops::Range;

/// Expression token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    /// Number literal (e.g., 3, 0.5, .25, 1e-3)
    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    /// Bare identifier; must be in the whitelist
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    /// `$name`: externally bound metric
    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice()[1..].to_string())]
    External(String),

    /// Quoted string, single or double quotes, no escapes
    #[regex(r#""[^"]*""#, |lex| trim_quotes(lex.slice()))]
    #[regex(r"'[^']*'", |lex| trim_quotes(lex.slice()))]
    Str(String),

    /// `#`: coerce the following literal into a metric
    #[token("#")]
    Hash,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    DoubleStar,
    #[token("/")]
    Slash,
    #[token("//")]
    DoubleSlash,
    #[token("%")]
    Percent,
    #[token("<<")]
    ShiftLeft,
    #[token(">>")]
    ShiftRight,
    #[token("@")]
    At,

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
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("=")]
    Eq,
    #[token(".")]
    Dot,
}

fn trim_quotes(s: &str) -> String {
    s[1..s.len() - 1].to_string()
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Ident(name) => write!(f, "{name}"),
            Token::External(name) => write!(f, "${name}"),
            Token::Str(s) => write!(f, "'{s}'"),
            Token::Hash => f.write_str("#"),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::DoubleStar => f.write_str("**"),
            Token::Slash => f.write_str("/"),
            Token::DoubleSlash => f.write_str("//"),
            Token::Percent => f.write_str("%"),
            Token::ShiftLeft => f.write_str("<<"),
            Token::ShiftRight => f.write_str(">>"),
            Token::At => f.write_str("@"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::LBracket => f.write_str("["),
            Token::RBracket => f.write_str("]"),
            Token::LBrace => f.write_str("{"),
            Token::RBrace => f.write_str("}"),
            Token::Comma => f.write_str(","),
            Token::Colon => f.write_str(":"),
            Token::Eq => f.write_str("="),
            Token::Dot => f.write_str("."),
        }
    }
}

/// Token with its byte range in the source.
pub type Spanned = (Token, Range<usize>);

/// Tokenize a whole expression, failing on the first unrecognized fragment.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, CompileError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                return Err(CompileError::Lex {
                    position: lexer.span().start,
                    fragment: lexer.slice().to_string(),
                });
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn test_operators_and_sigils() {
        assert_eq!(
            kinds("$a ** 2 // #5 << 1"),
            vec![
                Token::External("a".into()),
                Token::DoubleStar,
                Token::Number(2.0),
                Token::DoubleSlash,
                Token::Hash,
                Token::Number(5.0),
                Token::ShiftLeft,
                Token::Number(1.0),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("3 0.5 .25 1e-3"),
            vec![
                Token::Number(3.0),
                Token::Number(0.5),
                Token::Number(0.25),
                Token::Number(0.001),
            ]
        );
    }

    #[test]
    fn test_method_call_and_strings() {
        assert_eq!(
            kinds("$m.downsample(4, method='max')"),
            vec![
                Token::External("m".into()),
                Token::Dot,
                Token::Ident("downsample".into()),
                Token::LParen,
                Token::Number(4.0),
                Token::Comma,
                Token::Ident("method".into()),
                Token::Eq,
                Token::Str("max".into()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_unknown_character() {
        let error = tokenize("1 + ;").unwrap_err();
        assert_eq!(
            error,
            CompileError::Lex {
                position: 4,
                fragment: ";".into()
            }
        );
    }
}
