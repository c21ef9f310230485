use chumsky::Stream;
use chumsky::error::SimpleReason;
use chumsky::prelude::*;
use std::ops::Range;
use std::rc::Rc;

use proto_ast::nodes::{
    BinaryOp, DeclKind, Expr, FunctionDecl, Literal, Node, Program, Statement, UnaryOp,
};
use proto_lexer::token::{Token, TokenKind};
use proto_span::Span;
use proto_utils::errors::Diagnostic;

type StmtParser<'a> = Recursive<'a, TokenKind, Node<Statement>, Simple<TokenKind>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserError {
    pub message: String,
    pub span: Span,
    /// The parser ran out of tokens; more input could still form a program.
    pub at_end_of_input: bool,
}

impl ParserError {
    pub fn to_diagnostic(&self, source_id: &str) -> Diagnostic {
        let diag = Diagnostic::error(source_id, self.span, self.message.clone());
        if self.at_end_of_input {
            diag.with_suggestion("Check for a missing closing brace, parenthesis or bracket")
                .with_help("The parser reached the end of the input while expecting more tokens.")
        } else if self.message.contains("assignment target") {
            diag.with_help("Only variables and object fields (`o.k`, `o[k]`) can be assigned.")
        } else {
            diag
        }
    }
}

impl From<Simple<TokenKind>> for ParserError {
    fn from(value: Simple<TokenKind>) -> Self {
        let span: Span = value.span().into();
        if let SimpleReason::Custom(message) = value.reason() {
            return Self {
                message: message.clone(),
                span,
                at_end_of_input: false,
            };
        }

        let mut expected: Vec<String> = value
            .expected()
            .filter_map(|token| token.as_ref().map(ToString::to_string))
            .collect();
        expected.sort();
        let expected = if expected.is_empty() {
            String::new()
        } else {
            format!(", expected one of {}", expected.join(", "))
        };

        match value.found() {
            Some(found) => Self {
                message: format!("unexpected token {found}{expected}"),
                span,
                at_end_of_input: false,
            },
            None => Self {
                message: format!("unexpected end of input{expected}"),
                span,
                at_end_of_input: true,
            },
        }
    }
}

/// Deepest bracket nesting the grammar accepts.
pub const MAX_NESTING: usize = 256;

const PARSE_RED_ZONE: usize = 4 * 1024 * 1024;
const PARSE_STACK: usize = 8 * 1024 * 1024;

pub fn parse(tokens: &[Token]) -> Result<Program, Vec<ParserError>> {
    check_nesting(tokens)?;
    let end = tokens.last().map_or(0, |token| token.span().end());
    let stream = Stream::from_iter(
        end..end + 1,
        tokens
            .iter()
            .map(|token| (token.kind().clone(), Range::from(token.span()))),
    );

    // Combinator recursion is deep per bracket level; give it room whatever
    // thread we were called on.
    stacker::maybe_grow(PARSE_RED_ZONE, PARSE_STACK, || {
        program_parser()
            .parse(stream)
            .map_err(|errors| errors.into_iter().map(ParserError::from).collect())
    })
}

fn check_nesting(tokens: &[Token]) -> Result<(), Vec<ParserError>> {
    let mut depth = 0_usize;
    for token in tokens {
        match token.kind() {
            TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(vec![ParserError {
                        message: format!("brackets nested deeper than {MAX_NESTING} levels"),
                        span: token.span(),
                        at_end_of_input: false,
                    }]);
                }
            }
            TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => {
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
    }
    Ok(())
}

fn program_parser() -> impl Parser<TokenKind, Program, Error = Simple<TokenKind>> {
    statement_parser()
        .repeated()
        .then_ignore(end())
        .map(Program::new)
}

fn identifier_parser() -> impl Parser<TokenKind, String, Error = Simple<TokenKind>> + Clone {
    select! { TokenKind::Identifier(name) => name }
}

/// Field names after `.` and in object literals may be reserved words.
fn identifier_or_keyword_parser()
-> impl Parser<TokenKind, String, Error = Simple<TokenKind>> + Clone {
    filter_map(|span, token: TokenKind| match token {
        TokenKind::Identifier(name) => Ok(name),
        keyword if keyword.is_keyword() => {
            Ok(keyword.fixed_text().unwrap_or_default().to_string())
        }
        other => Err(Simple::expected_input_found(span, Vec::<Option<TokenKind>>::new(), Some(other))),
    })
}

fn binding_parser() -> impl Parser<TokenKind, Node<String>, Error = Simple<TokenKind>> + Clone {
    identifier_parser().map_with_span(|name, span: Range<usize>| Node::new(name, span))
}

fn params_parser() -> impl Parser<TokenKind, Vec<Node<String>>, Error = Simple<TokenKind>> + Clone
{
    binding_parser()
        .separated_by(just(TokenKind::Comma))
        .allow_trailing()
        .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen))
}

fn parse_number(text: &str) -> f64 {
    text.replace('_', "").parse().unwrap_or(f64::NAN)
}

fn literal_expr_parser() -> impl Parser<TokenKind, Node<Expr>, Error = Simple<TokenKind>> + Clone {
    select! {
        TokenKind::Number(value) => Literal::Number(parse_number(&value)),
        TokenKind::StringLiteral(value) => Literal::String(value),
        TokenKind::True => Literal::Bool(true),
        TokenKind::False => Literal::Bool(false),
        TokenKind::Null => Literal::Null,
        TokenKind::Undefined => Literal::Undefined,
    }
    .map_with_span(|lit, span: Range<usize>| Node::new(Expr::Literal(lit), span))
}

fn property_key_parser() -> impl Parser<TokenKind, String, Error = Simple<TokenKind>> + Clone {
    select! {
        TokenKind::StringLiteral(value) => value,
        TokenKind::Number(value) => parse_number(&value).to_string(),
    }
    .or(identifier_or_keyword_parser())
}

#[derive(Debug, Clone)]
enum PostfixOp {
    Member { property: String, span: Span },
    Index { index: Node<Expr>, span: Span },
    Call { args: Vec<Node<Expr>>, span: Span },
}

fn apply_postfix(expr: Node<Expr>, suffix: PostfixOp) -> Node<Expr> {
    match suffix {
        PostfixOp::Member { property, span } => {
            let span = expr.span().merge(&span);
            Node::new(
                Expr::Member {
                    object: Box::new(expr),
                    property,
                },
                span,
            )
        }
        PostfixOp::Index { index, span } => {
            let span = expr.span().merge(&span);
            Node::new(
                Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                },
                span,
            )
        }
        PostfixOp::Call { args, span } => {
            let span = expr.span().merge(&span);
            Node::new(
                Expr::Call {
                    callee: Box::new(expr),
                    args,
                },
                span,
            )
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Prefix {
    Op(UnaryOp),
    Delete,
}

fn binary_level<'a, P, O>(
    operand: P,
    ops: O,
) -> BoxedParser<'a, TokenKind, Node<Expr>, Simple<TokenKind>>
where
    P: Parser<TokenKind, Node<Expr>, Error = Simple<TokenKind>> + Clone + 'a,
    O: Parser<TokenKind, BinaryOp, Error = Simple<TokenKind>> + 'a,
{
    operand
        .clone()
        .then(ops.then(operand).repeated())
        .foldl(|left, (op, right)| {
            let span = left.span().merge(right.span());
            Node::new(
                Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            )
        })
        .boxed()
}

fn expr_parser<'a>(
    stmt: StmtParser<'a>,
) -> impl Parser<TokenKind, Node<Expr>, Error = Simple<TokenKind>> + Clone + 'a {
    recursive(move |expr| {
        let args = expr
            .clone()
            .separated_by(just(TokenKind::Comma))
            .allow_trailing()
            .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen))
            .boxed();

        let function_expr = just(TokenKind::Function)
            .ignore_then(identifier_parser().or_not())
            .then(params_parser())
            .then(
                stmt.clone()
                    .repeated()
                    .delimited_by(just(TokenKind::LBrace), just(TokenKind::RBrace)),
            )
            .map_with_span(|((name, params), body), span: Range<usize>| {
                Node::new(
                    Expr::Function(Rc::new(FunctionDecl::new(name, params, body))),
                    span,
                )
            })
            .boxed();

        let object_literal = property_key_parser()
            .then_ignore(just(TokenKind::Colon))
            .then(expr.clone())
            .separated_by(just(TokenKind::Comma))
            .allow_trailing()
            .delimited_by(just(TokenKind::LBrace), just(TokenKind::RBrace))
            .map_with_span(|entries, span: Range<usize>| Node::new(Expr::Object(entries), span))
            .boxed();

        let atom = choice((
            literal_expr_parser(),
            just(TokenKind::This).map_with_span(|_, span: Range<usize>| Node::new(Expr::This, span)),
            identifier_parser()
                .map_with_span(|name, span: Range<usize>| Node::new(Expr::Identifier(name), span)),
            function_expr,
            object_literal,
            expr.clone()
                .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen)),
        ))
        .boxed();

        let member_suffix = just(TokenKind::Dot)
            .ignore_then(identifier_or_keyword_parser())
            .map_with_span(|property, span: Range<usize>| PostfixOp::Member {
                property,
                span: span.into(),
            })
            .boxed();

        let index_suffix = expr
            .clone()
            .delimited_by(just(TokenKind::LBracket), just(TokenKind::RBracket))
            .map_with_span(|index, span: Range<usize>| PostfixOp::Index {
                index,
                span: span.into(),
            })
            .boxed();

        let call_suffix = args
            .clone()
            .map_with_span(|args, span: Range<usize>| PostfixOp::Call {
                args,
                span: span.into(),
            })
            .boxed();

        // `new` takes a member chain without calls: `new ns.Ctor(a).field`
        let new_expr = just(TokenKind::New)
            .ignore_then(
                atom.clone()
                    .then(choice((member_suffix.clone(), index_suffix.clone())).repeated())
                    .foldl(apply_postfix),
            )
            .then(args.or_not())
            .map_with_span(|(callee, args), span: Range<usize>| {
                Node::new(
                    Expr::New {
                        callee: Box::new(callee),
                        args: args.unwrap_or_default(),
                    },
                    span,
                )
            })
            .boxed();

        let call = choice((new_expr, atom))
            .then(choice((member_suffix, index_suffix, call_suffix)).repeated())
            .foldl(apply_postfix)
            .boxed();

        let unary = recursive(|unary| {
            choice((
                just(TokenKind::Minus).to(Prefix::Op(UnaryOp::Neg)),
                just(TokenKind::Plus).to(Prefix::Op(UnaryOp::Plus)),
                just(TokenKind::Bang).to(Prefix::Op(UnaryOp::Not)),
                just(TokenKind::Typeof).to(Prefix::Op(UnaryOp::Typeof)),
                just(TokenKind::Delete).to(Prefix::Delete),
            ))
            .then(unary)
            .map_with_span(|(prefix, operand), span: Range<usize>| {
                let operand = Box::new(operand);
                let expr = match prefix {
                    Prefix::Op(op) => Expr::Unary { op, expr: operand },
                    Prefix::Delete => Expr::Delete(operand),
                };
                Node::new(expr, span)
            })
            .or(call)
        })
        .boxed();

        let product = binary_level(
            unary,
            choice((
                just(TokenKind::Star).to(BinaryOp::Mul),
                just(TokenKind::Slash).to(BinaryOp::Div),
                just(TokenKind::Percent).to(BinaryOp::Mod),
            )),
        );

        let sum = binary_level(
            product,
            choice((
                just(TokenKind::Plus).to(BinaryOp::Add),
                just(TokenKind::Minus).to(BinaryOp::Sub),
            )),
        );

        let relational = binary_level(
            sum,
            choice((
                just(TokenKind::LtEq).to(BinaryOp::LtEq),
                just(TokenKind::GtEq).to(BinaryOp::GtEq),
                just(TokenKind::Lt).to(BinaryOp::Lt),
                just(TokenKind::Gt).to(BinaryOp::Gt),
                just(TokenKind::Instanceof).to(BinaryOp::Instanceof),
                just(TokenKind::In).to(BinaryOp::In),
            )),
        );

        let equality = binary_level(
            relational,
            choice((
                just(TokenKind::EqEqEq).to(BinaryOp::StrictEq),
                just(TokenKind::NeqEq).to(BinaryOp::StrictNe),
                just(TokenKind::EqEq).to(BinaryOp::Eq),
                just(TokenKind::Neq).to(BinaryOp::Ne),
            )),
        );

        let logical_and = binary_level(equality, just(TokenKind::AmpAmp).to(BinaryOp::And));
        let logical_or = binary_level(logical_and, just(TokenKind::PipePipe).to(BinaryOp::Or));

        let assign_op = choice((
            just(TokenKind::Equals).to(None),
            just(TokenKind::PlusEq).to(Some(BinaryOp::Add)),
            just(TokenKind::MinusEq).to(Some(BinaryOp::Sub)),
            just(TokenKind::StarEq).to(Some(BinaryOp::Mul)),
            just(TokenKind::SlashEq).to(Some(BinaryOp::Div)),
        ));

        logical_or
            .then(assign_op.then(expr).or_not())
            .try_map(|(target, rhs), span: Range<usize>| match rhs {
                None => Ok(target),
                Some((op, value)) if target.inner().is_assignable() => Ok(Node::new(
                    Expr::Assign {
                        target: Box::new(target),
                        op,
                        value: Box::new(value),
                    },
                    span,
                )),
                Some(_) => Err(Simple::custom(
                    Range::from(*target.span()),
                    "invalid assignment target",
                )),
            })
    })
}

fn statement_parser<'a>() -> StmtParser<'a> {
    recursive(|stmt| {
        let expr = expr_parser(stmt.clone()).boxed();
        let semi = just(TokenKind::Semicolon).or_not().ignored().boxed();

        let block = stmt
            .clone()
            .repeated()
            .delimited_by(just(TokenKind::LBrace), just(TokenKind::RBrace))
            .boxed();

        let declare = choice((
            just(TokenKind::Var).to(DeclKind::Var),
            just(TokenKind::Let).to(DeclKind::Let),
            just(TokenKind::Const).to(DeclKind::Const),
        ))
        .then(binding_parser())
        .then(just(TokenKind::Equals).ignore_then(expr.clone()).or_not())
        .then_ignore(semi.clone())
        .try_map(|((kind, name), init), span: Range<usize>| {
            if kind == DeclKind::Const && init.is_none() {
                return Err(Simple::custom(
                    Range::from(*name.span()),
                    format!("missing initializer in const declaration of `{}`", name.inner()),
                ));
            }
            Ok(Node::new(Statement::Declare { kind, name, init }, span))
        })
        .boxed();

        let function_decl = just(TokenKind::Function)
            .ignore_then(identifier_parser())
            .then(params_parser())
            .then(block.clone())
            .map_with_span(|((name, params), body), span: Range<usize>| {
                Node::new(
                    Statement::Function(Rc::new(FunctionDecl::new(Some(name), params, body))),
                    span,
                )
            })
            .boxed();

        let return_stmt = just(TokenKind::Return)
            .ignore_then(expr.clone().or_not())
            .then_ignore(semi.clone())
            .map_with_span(|value, span: Range<usize>| Node::new(Statement::Return(value), span))
            .boxed();

        let condition = expr
            .clone()
            .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen))
            .boxed();

        let if_stmt = just(TokenKind::If)
            .ignore_then(condition.clone())
            .then(stmt.clone())
            .then(just(TokenKind::Else).ignore_then(stmt.clone()).or_not())
            .map_with_span(|((cond, then_branch), else_branch), span: Range<usize>| {
                Node::new(
                    Statement::If {
                        cond,
                        then_branch: Box::new(then_branch),
                        else_branch: else_branch.map(Box::new),
                    },
                    span,
                )
            })
            .boxed();

        let while_stmt = just(TokenKind::While)
            .ignore_then(condition)
            .then(stmt.clone())
            .map_with_span(|(cond, body), span: Range<usize>| {
                Node::new(
                    Statement::While {
                        cond,
                        body: Box::new(body),
                    },
                    span,
                )
            })
            .boxed();

        // Tried before blocks so a bare `{a: 1}` reads as an object literal.
        let expr_stmt = expr
            .then_ignore(semi)
            .map_with_span(|expr, span: Range<usize>| Node::new(Statement::Expr(expr), span))
            .boxed();

        let block_stmt = block
            .map_with_span(|body, span: Range<usize>| Node::new(Statement::Block(body), span))
            .boxed();

        let empty_stmt = just(TokenKind::Semicolon)
            .map_with_span(|_, span: Range<usize>| Node::new(Statement::Empty, span));

        choice((
            declare,
            function_decl,
            return_stmt,
            if_stmt,
            while_stmt,
            expr_stmt,
            block_stmt,
            empty_stmt,
        ))
    })
}
