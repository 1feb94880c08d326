//! Parser for stanza source code.
//!
//! Transforms a token stream from the lexer into a single [`Node`].
//! Uses chumsky parser combinators.
//!
//! The grammar is right-recursive rather than precedence-climbing:
//!
//! ```text
//! expression = primary [ binary_op expression ]
//! primary    = security_mark* atom
//! atom       = "@" word expression
//!            | "(" expression ")"
//!            | "{" expression* "}"
//!            | word word*
//! ```
//!
//! so `a -> b + c` groups as `a -> (b + c)`. Command arguments are the words
//! following the command word, up to the first operator or punctuation.
//!
//! Parsing never fails loudly. The longest well-formed leading expression is
//! kept; whatever follows it (a dangling operator, a stray `)`) is dropped and
//! reported through [`parse_with_diagnostics`].

use std::ops::Range;

use chumsky::{input::ValueInput, prelude::*};

use crate::ast::{BinaryOp, Node, Operator, SecurityMode};
use crate::lexer::{self, Token};

/// Span type used throughout the parser.
pub type Span = SimpleSpan;

/// Something the parser skipped over.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at {span:?}")]
pub struct ParseError {
    pub span: Range<usize>,
    pub message: String,
}

/// Parse a token list into an AST.
///
/// Returns `None` when there is nothing executable: empty input, or input
/// that does not start with a well-formed expression.
pub fn parse(tokens: &[Token]) -> Option<Node> {
    let spanned: Vec<(Token, Span)> = tokens
        .iter()
        .enumerate()
        .map(|(i, tok)| (tok.clone(), (i..i + 1).into()))
        .collect();
    let (node, leftover) = run(spanned, tokens.len());
    if leftover > 0 {
        tracing::debug!(ignored = leftover, "trailing tokens not parsed");
    }
    node
}

/// Tokenize and parse stanza source.
pub fn parse_source(source: &str) -> Option<Node> {
    parse_with_diagnostics(source).0
}

/// Tokenize and parse, also reporting which input was ignored.
pub fn parse_with_diagnostics(source: &str) -> (Option<Node>, Vec<ParseError>) {
    let tokens = lexer::tokenize_spanned(source);
    let spans: Vec<Range<usize>> = tokens.iter().map(|t| t.span.clone()).collect();
    let spanned: Vec<(Token, Span)> = tokens
        .into_iter()
        .map(|t| (t.token, (t.span.start..t.span.end).into()))
        .collect();
    let total = spanned.len();
    let first_token = spanned.first().map(|(tok, _)| tok.clone());

    let (node, leftover) = run(spanned, source.len());

    let mut errors = Vec::new();
    if leftover > 0 {
        let start = total - leftover;
        let span = spans[start].start..spans[total - 1].end;
        let message = if node.is_none() {
            match first_token {
                Some(tok) => format!("expected a command, group, block or annotation, found {tok}"),
                None => "expected an expression".to_string(),
            }
        } else {
            format!("ignored {leftover} trailing token(s)")
        };
        tracing::debug!(?span, "{}", message);
        errors.push(ParseError { span, message });
    }

    (node, errors)
}

/// Run the stanza parser over spanned tokens.
///
/// Returns the parsed node and how many tokens at the end were left unparsed.
fn run(tokens: Vec<(Token, Span)>, eoi: usize) -> (Option<Node>, usize) {
    let end_span: Span = (eoi..eoi).into();
    let result = stanza_parser().parse(tokens.as_slice().map(end_span, |(t, s)| (t, s)));

    match result.into_output() {
        Some((node, leftover)) => (node, leftover),
        // The top-level parser accepts any input; keep the contract anyway.
        None => (None, tokens.len()),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Parser Combinators - generic over input type
// ═══════════════════════════════════════════════════════════════════════════

/// Top-level parser: an optional expression, then whatever is left.
fn stanza_parser<'tokens, I>(
) -> impl Parser<'tokens, I, (Option<Node>, usize), extra::Err<Rich<'tokens, Token, Span>>>
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    expression_parser()
        .or_not()
        .then(any().repeated().collect::<Vec<_>>().map(|rest| rest.len()))
        .then_ignore(end())
}

/// Expression parser: a primary, optionally followed by a binary operator and
/// the rest of the input as the right operand.
fn expression_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Node, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    recursive(|expr| {
        let group = expr
            .clone()
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .map(Node::group)
            .labelled("group");

        let block = expr
            .clone()
            .repeated()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LBrace), just(Token::RBrace))
            .map(|statements| Node::Block { statements })
            .labelled("block");

        let scheduled = just(Token::Op(Operator::At))
            .ignore_then(word_parser())
            .then(expr.clone())
            .map(|(schedule, inner)| Node::scheduled(schedule, inner))
            .labelled("schedule");

        let atom = choice((scheduled, group, block, command_parser())).boxed();

        // Security marks prefix a single primary, not the whole chain.
        let primary = security_parser()
            .repeated()
            .foldr(atom, |mode, inner| Node::secured(mode, inner))
            .boxed();

        primary
            .then(binary_op_parser().then(expr).or_not())
            .map(|(left, rest)| match rest {
                Some((op, right)) => Node::operation(op, left, right),
                None => left,
            })
            .labelled("expression")
            .boxed()
    })
}

/// Command: `name arg arg ...`
fn command_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Node, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    word_parser()
        .then(word_parser().repeated().collect::<Vec<_>>())
        .map(|(name, args)| Node::command(&name, args))
        .labelled("command")
        .boxed()
}

/// Binary operators: `→ + | ? >`
fn binary_op_parser<'tokens, I>(
) -> impl Parser<'tokens, I, BinaryOp, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    select! {
        Token::Op(Operator::Then) => BinaryOp::Then,
        Token::Op(Operator::And) => BinaryOp::And,
        Token::Op(Operator::Or) => BinaryOp::Or,
        Token::Op(Operator::If) => BinaryOp::If,
        Token::Op(Operator::Pipe) => BinaryOp::Pipe,
    }
    .labelled("operator")
}

/// Security marks: `🔒 🛡️ ⚠️`
fn security_parser<'tokens, I>(
) -> impl Parser<'tokens, I, SecurityMode, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    select! {
        Token::Op(Operator::Lock) => SecurityMode::Lock,
        Token::Op(Operator::Shield) => SecurityMode::Shield,
        Token::Op(Operator::Warn) => SecurityMode::Warn,
    }
    .labelled("security mark")
}

/// A bare word or quoted string.
fn word_parser<'tokens, I>(
) -> impl Parser<'tokens, I, String, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    select! {
        Token::Word(w) => w,
        Token::Quoted(q) => q,
    }
    .labelled("word")
}
