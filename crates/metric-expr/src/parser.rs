//! Recursive-descent parser with Pratt-style precedence climbing.
//!
//! Precedence, loosest first:
//!
//! | Level | Operators               | Associativity |
//! |-------|-------------------------|---------------|
//! | 10    | `<<` `>>`               | left          |
//! | 20    | `+` `-`                 | left          |
//! | 30    | `*` `/` `//` `%` `@`    | left          |
//! | -     | unary `-` `+`           | prefix        |
//! | 40    | `**`                    | right         |
//! | -     | `.method(...)`, calls   | postfix       |
//!
//! `**` binds tighter than a unary operator on its left (`-2 ** 2` is `-4`)
//! while its right operand may itself be unary (`2 ** -1`).

use crate::ast::{Arg, BinaryOp, Expr, UnaryOp};
use crate::error::CompileError;
use crate::lexer::{Spanned, Token};

/// Binding power of a unary operator's operand.
const UNARY_OPERAND_PREC: u8 = 40;

/// Deepest expression tree the parser will build. Operator and method
/// chains count one level per link.
pub const MAX_NESTING: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
}

/// Token stream with lookahead and byte-offset tracking.
pub struct TokenStream<'src> {
    tokens: &'src [Spanned],
    pos: usize,
    source_len: usize,
    depth: usize,
}

impl<'src> TokenStream<'src> {
    pub fn new(tokens: &'src [Spanned], source_len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            source_len,
            depth: 0,
        }
    }

    /// Open one nesting level.
    fn descend(&mut self) -> Result<(), CompileError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error("expression nested too deeply"));
        }
        Ok(())
    }

    pub fn peek(&self) -> Option<&Token> {
        self.peek_nth(0)
    }

    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(token, _)| token)
    }

    pub fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos).map(|(token, _)| token);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Check if the current token has the same kind as `expected`.
    pub fn check(&self, expected: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(expected))
    }

    /// Consume `expected` or fail.
    pub fn expect(&mut self, expected: Token) -> Result<(), CompileError> {
        if self.check(&expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{expected}'")))
        }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Byte offset of the current token, or the source length at the end.
    pub fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self.source_len)
    }

    pub fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::Parse {
            position: self.offset(),
            message: message.into(),
        }
    }

    fn unexpected(&self, wanted: &str) -> CompileError {
        match self.peek() {
            Some(token) => self.error(format!("expected {wanted}, found '{token}'")),
            None => self.error(format!("expected {wanted}, found end of input")),
        }
    }
}

/// Parse a complete token sequence into one expression.
pub fn parse(tokens: &[Spanned], source_len: usize) -> Result<Expr, CompileError> {
    let mut stream = TokenStream::new(tokens, source_len);
    if stream.at_end() {
        return Err(stream.error("empty expression"));
    }
    let expr = parse_pratt(&mut stream, 0)?;
    if !stream.at_end() {
        return Err(stream.unexpected("an operator or end of input"));
    }
    Ok(expr)
}

fn binary_op_info(token: &Token) -> Option<(u8, Assoc, BinaryOp)> {
    match token {
        Token::ShiftLeft => Some((10, Assoc::Left, BinaryOp::ShiftLeft)),
        Token::ShiftRight => Some((10, Assoc::Left, BinaryOp::ShiftRight)),
        Token::Plus => Some((20, Assoc::Left, BinaryOp::Add)),
        Token::Minus => Some((20, Assoc::Left, BinaryOp::Sub)),
        Token::Star => Some((30, Assoc::Left, BinaryOp::Mul)),
        Token::Slash => Some((30, Assoc::Left, BinaryOp::Div)),
        Token::DoubleSlash => Some((30, Assoc::Left, BinaryOp::FloorDiv)),
        Token::Percent => Some((30, Assoc::Left, BinaryOp::Mod)),
        Token::At => Some((30, Assoc::Left, BinaryOp::At)),
        Token::DoubleStar => Some((40, Assoc::Right, BinaryOp::Pow)),
        _ => None,
    }
}

fn parse_pratt(stream: &mut TokenStream, min_prec: u8) -> Result<Expr, CompileError> {
    let depth = stream.depth;
    stream.descend()?;
    let mut left = parse_prefix(stream)?;

    while let Some((prec, assoc, op)) = stream.peek().and_then(binary_op_info) {
        if prec < min_prec {
            break;
        }
        stream.advance();
        stream.descend()?;

        let next_prec = if assoc == Assoc::Left { prec + 1 } else { prec };
        let right = parse_pratt(stream, next_prec)?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    }

    stream.depth = depth;
    Ok(left)
}

fn parse_prefix(stream: &mut TokenStream) -> Result<Expr, CompileError> {
    let op = match stream.peek() {
        Some(Token::Minus) => UnaryOp::Neg,
        Some(Token::Plus) => UnaryOp::Pos,
        _ => return parse_postfix(stream),
    };
    stream.advance();
    let operand = parse_pratt(stream, UNARY_OPERAND_PREC)?;
    Ok(Expr::Unary {
        op,
        operand: Box::new(operand),
    })
}

/// Method calls and function calls.
fn parse_postfix(stream: &mut TokenStream) -> Result<Expr, CompileError> {
    let depth = stream.depth;
    let mut expr = parse_atom(stream)?;

    loop {
        match stream.peek() {
            Some(Token::Dot) => {
                stream.advance();
                stream.descend()?;
                let method = match stream.advance() {
                    Some(Token::Ident(name)) => name.clone(),
                    _ => return Err(stream.error("expected method name after '.'")),
                };
                if !stream.check(&Token::LParen) {
                    return Err(stream.unexpected(&format!("'(' after .{method}")));
                }
                let args = parse_call_args(stream)?;
                expr = Expr::Method {
                    receiver: Box::new(expr),
                    method,
                    args,
                };
            }
            Some(Token::LParen) => {
                let Expr::Name(function) = expr else {
                    return Err(stream.error("only named functions can be called"));
                };
                stream.descend()?;
                let args = parse_call_args(stream)?;
                expr = Expr::Call { function, args };
            }
            _ => break,
        }
    }

    stream.depth = depth;
    Ok(expr)
}

fn parse_atom(stream: &mut TokenStream) -> Result<Expr, CompileError> {
    let Some(token) = stream.peek().cloned() else {
        return Err(stream.error("unexpected end of input"));
    };
    match token {
        Token::Number(value) => {
            stream.advance();
            Ok(Expr::Number(value))
        }
        Token::Str(text) => {
            stream.advance();
            Ok(Expr::Str(text))
        }
        Token::Ident(name) => {
            stream.advance();
            Ok(Expr::Name(name))
        }
        Token::External(name) => {
            stream.advance();
            Ok(Expr::External(name))
        }
        Token::LParen => parse_group(stream),
        Token::LBracket => {
            stream.advance();
            let items = parse_sequence(stream, Token::RBracket)?;
            Ok(Expr::List(items))
        }
        Token::LBrace => parse_map(stream),
        Token::Hash => {
            stream.advance();
            let literal = match stream.peek() {
                Some(Token::Number(_) | Token::LBracket | Token::LBrace) => parse_atom(stream)?,
                _ => {
                    return Err(stream.unexpected("a number, list or map literal after '#'"));
                }
            };
            Ok(Expr::Lift(Box::new(literal)))
        }
        _ => Err(stream.unexpected("an expression")),
    }
}

/// `(expr)` or a tuple, which is treated as a list.
fn parse_group(stream: &mut TokenStream) -> Result<Expr, CompileError> {
    stream.expect(Token::LParen)?;
    if stream.check(&Token::RParen) {
        stream.advance();
        return Ok(Expr::List(Vec::new()));
    }
    let first = parse_pratt(stream, 0)?;
    if !stream.check(&Token::Comma) {
        stream.expect(Token::RParen)?;
        return Ok(first);
    }
    stream.advance();
    let mut items = vec![first];
    items.extend(parse_sequence(stream, Token::RParen)?);
    Ok(Expr::List(items))
}

/// Comma-separated expressions up to and including `close`.
fn parse_sequence(stream: &mut TokenStream, close: Token) -> Result<Vec<Expr>, CompileError> {
    let mut items = Vec::new();
    while !stream.check(&close) {
        items.push(parse_pratt(stream, 0)?);
        if !stream.check(&Token::Comma) {
            break;
        }
        stream.advance();
    }
    stream.expect(close)?;
    Ok(items)
}

fn parse_map(stream: &mut TokenStream) -> Result<Expr, CompileError> {
    stream.expect(Token::LBrace)?;
    let mut entries = Vec::new();
    while !stream.check(&Token::RBrace) {
        let key = parse_pratt(stream, 0)?;
        stream.expect(Token::Colon)?;
        let value = parse_pratt(stream, 0)?;
        entries.push((key, value));
        if !stream.check(&Token::Comma) {
            break;
        }
        stream.advance();
    }
    stream.expect(Token::RBrace)?;
    Ok(Expr::Map(entries))
}

/// `(positional..., name=value...)`
fn parse_call_args(stream: &mut TokenStream) -> Result<Vec<Arg>, CompileError> {
    stream.expect(Token::LParen)?;
    let mut args: Vec<Arg> = Vec::new();
    while !stream.check(&Token::RParen) {
        let name = match (stream.peek(), stream.peek_nth(1)) {
            (Some(Token::Ident(name)), Some(Token::Eq)) => Some(name.clone()),
            _ => None,
        };
        if name.is_some() {
            stream.advance();
            stream.advance();
        } else if args.iter().any(|arg| arg.name.is_some()) {
            return Err(stream.error("positional argument follows keyword argument"));
        }
        let value = parse_pratt(stream, 0)?;
        args.push(Arg { name, value });
        if !stream.check(&Token::Comma) {
            break;
        }
        stream.advance();
    }
    stream.expect(Token::RParen)?;
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_str(source: &str) -> Result<Expr, CompileError> {
        let tokens = tokenize(source)?;
        parse(&tokens, source.len())
    }

    fn num(value: f64) -> Box<Expr> {
        Box::new(Expr::Number(value))
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse_str("1 + 2 * 3").unwrap(),
            Expr::Binary {
                op: BinaryOp::Add,
                left: num(1.0),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: num(2.0),
                    right: num(3.0),
                }),
            }
        );
    }

    #[test]
    fn test_power_binds_tighter_than_unary() {
        assert_eq!(
            parse_str("-2 ** 2").unwrap(),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(Expr::Binary {
                    op: BinaryOp::Pow,
                    left: num(2.0),
                    right: num(2.0),
                }),
            }
        );
    }

    #[test]
    fn test_power_is_right_associative() {
        assert_eq!(
            parse_str("2 ** 3 ** 2").unwrap(),
            Expr::Binary {
                op: BinaryOp::Pow,
                left: num(2.0),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Pow,
                    left: num(3.0),
                    right: num(2.0),
                }),
            }
        );
        assert!(parse_str("2 ** -1").is_ok());
    }

    #[test]
    fn test_shift_is_loosest() {
        let Expr::Binary { op, .. } = parse_str("$a + 1 << 2").unwrap() else {
            panic!("expected binary expression");
        };
        assert_eq!(op, BinaryOp::ShiftLeft);
    }

    #[test]
    fn test_calls_and_methods() {
        let expr = parse_str("sin(24, amplitude=3).smooth(4)").unwrap();
        let Expr::Method {
            receiver, method, ..
        } = expr
        else {
            panic!("expected method call");
        };
        assert_eq!(method, "smooth");
        let Expr::Call { function, args } = *receiver else {
            panic!("expected function call");
        };
        assert_eq!(function, "sin");
        assert_eq!(args.len(), 2);
        assert_eq!(args[1].name.as_deref(), Some("amplitude"));
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            parse_str("#[1, 2]").unwrap(),
            Expr::Lift(Box::new(Expr::List(vec![
                Expr::Number(1.0),
                Expr::Number(2.0)
            ])))
        );
        assert_eq!(
            parse_str("{1: 2}").unwrap(),
            Expr::Map(vec![(Expr::Number(1.0), Expr::Number(2.0))])
        );
        assert_eq!(
            parse_str("(1, 2)").unwrap(),
            Expr::List(vec![Expr::Number(1.0), Expr::Number(2.0)])
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(parse_str(""), Err(CompileError::Parse { .. })));
        assert!(matches!(parse_str("1 +"), Err(CompileError::Parse { .. })));
        assert!(matches!(parse_str("(1"), Err(CompileError::Parse { .. })));
        assert!(matches!(parse_str("#$a"), Err(CompileError::Parse { .. })));
        assert!(matches!(parse_str("f(x=1, 2)"), Err(CompileError::Parse { .. })));
        assert!(matches!(parse_str("$a.acc"), Err(CompileError::Parse { .. })));
        assert!(matches!(parse_str("1 2"), Err(CompileError::Parse { position: 2, .. })));
    }

    fn too_deep(result: Result<Expr, CompileError>) -> bool {
        matches!(result, Err(CompileError::Parse { message, .. }) if message.contains("too deeply"))
    }

    #[test]
    fn test_nesting_limit() {
        let parens = format!("{}1{}", "(".repeat(50_000), ")".repeat(50_000));
        assert!(too_deep(parse_str(&parens)));
        assert!(too_deep(parse_str(&format!("{}1", "-".repeat(50_000)))));
        assert!(too_deep(parse_str(&format!("1{}", " + 1".repeat(50_000)))));
        assert!(too_deep(parse_str(&format!("$a{}", ".acc()".repeat(50_000)))));
        assert!(too_deep(parse_str(&format!("{}1{}", "[".repeat(50_000), "]".repeat(50_000)))));
    }

    #[test]
    fn test_nesting_within_limit() {
        let parens = format!("{}1{}", "(".repeat(40), ")".repeat(40));
        assert_eq!(parse_str(&parens).unwrap(), Expr::Number(1.0));
        assert!(parse_str(&format!("1{}", " + 1".repeat(50))).is_ok());
        assert!(parse_str(&format!("$a{}", ".acc()".repeat(50))).is_ok());
        // siblings do not accumulate depth
        let args = vec!["(1)"; 500].join(", ");
        assert!(parse_str(&format!("[{args}]")).is_ok());
    }
}
