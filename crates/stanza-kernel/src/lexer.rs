//! Lexer for stanza source text.
//!
//! Built on logos with a small post-pass:
//!
//! - A `-` is only an operator as part of `->`. Anywhere else it belongs to
//!   the surrounding word, so `foo-bar` and `-v` stay single words. logos
//!   has no lookahead, so dashes are lexed as their own word pieces and glued
//!   back onto touching words afterwards.
//! - Quoted strings close on the quote that opened them. There are no escapes
//!   and no nesting; an unterminated quote runs to end of input.
//! - Nothing here fails. Bytes logos cannot classify become words, and the
//!   parser decides what makes sense.

use std::fmt;
use std::ops::Range;

use logos::Logos;

use crate::ast::Operator;

/// Broad token classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Word,
    QuotedString,
    Operator,
    GroupPunct,
    BlockPunct,
}

/// A stanza token.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"\s+")]
pub enum Token {
    #[token("→", |_| Operator::Then)]
    #[token("->", |_| Operator::Then)]
    #[token("+", |_| Operator::And)]
    #[token("|", |_| Operator::Or)]
    #[token("?", |_| Operator::If)]
    #[token("@", |_| Operator::At)]
    #[token(">", |_| Operator::Pipe)]
    #[token("🔒", |_| Operator::Lock)]
    #[token("🛡️", |_| Operator::Shield)]
    #[token("🛡", |_| Operator::Shield)]
    #[token("⚠️", |_| Operator::Warn)]
    #[token("⚠", |_| Operator::Warn)]
    Op(Operator),

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    /// Text between matching quotes, quotes stripped.
    #[regex(r#""[^"]*"?"#, strip_quotes)]
    #[regex(r#"'[^']*'?"#, strip_quotes)]
    Quoted(String),

    /// Bare word. Dots are word characters (`namespace.action`).
    #[regex(r#"[^\s"'(){}+|?@>\-→🔒🛡⚠]+"#, |lex| lex.slice().to_string())]
    #[token("-", |lex| lex.slice().to_string())]
    Word(String),
}

fn strip_quotes(lex: &mut logos::Lexer<Token>) -> String {
    let slice = lex.slice();
    let quote = &slice[..1];
    let body = &slice[1..];
    body.strip_suffix(quote).unwrap_or(body).to_string()
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Op(_) => TokenKind::Operator,
            Token::LParen | Token::RParen => TokenKind::GroupPunct,
            Token::LBrace | Token::RBrace => TokenKind::BlockPunct,
            Token::Quoted(_) => TokenKind::QuotedString,
            Token::Word(_) => TokenKind::Word,
        }
    }

    /// The token's text. Operators report their canonical symbol, so `->`
    /// reads back as `→`.
    pub fn text(&self) -> &str {
        match self {
            Token::Op(op) => op.symbol(),
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Quoted(s) | Token::Word(s) => s,
        }
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, Token::Op(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Op(op) => write!(f, "OP({})", op.name()),
            Token::LParen => write!(f, "LPAREN"),
            Token::RParen => write!(f, "RPAREN"),
            Token::LBrace => write!(f, "LBRACE"),
            Token::RBrace => write!(f, "RBRACE"),
            Token::Quoted(s) => write!(f, "QUOTED({s})"),
            Token::Word(s) => write!(f, "WORD({s})"),
        }
    }
}

/// A token with its byte range in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub span: Range<usize>,
}

/// Tokenize stanza source into a flat token list.
pub fn tokenize(source: &str) -> Vec<Token> {
    tokenize_spanned(source)
        .into_iter()
        .map(|spanned| spanned.token)
        .collect()
}

/// Tokenize stanza source, keeping byte spans.
pub fn tokenize_spanned(source: &str) -> Vec<Spanned> {
    let mut tokens: Vec<Spanned> = Vec::new();

    for (result, span) in Token::lexer(source).spanned() {
        let token = match result {
            Ok(token) => token,
            Err(()) => {
                tracing::debug!(span = ?span, "unclassified input kept as word");
                Token::Word(source.get(span.clone()).unwrap_or_default().to_string())
            }
        };
        push_glued(&mut tokens, Spanned { token, span });
    }

    tokens
}

/// Append a token, merging it into the previous one when both are words
/// with no gap between them.
fn push_glued(tokens: &mut Vec<Spanned>, next: Spanned) {
    if let Some(last) = tokens.last_mut() {
        if last.span.end == next.span.start {
            if let (Token::Word(prev), Token::Word(piece)) = (&mut last.token, &next.token) {
                prev.push_str(piece);
                last.span.end = next.span.end;
                return;
            }
        }
    }
    tokens.push(next);
}
