use crate::compile::lex::{Lexer, Token};
use crate::types::ast;
use crate::types::span::Span;
use crate::{Error, Result, Value};

/// Builds an AST from the token stream.
///
/// Each nested construct (`if`, `for`, `with`, `block`) parses its body with
/// [`Parser::parse_scope`], which stops at the first tag that closes a scope
/// and hands it back to the caller to validate.
pub struct Parser<'source> {
    tokens: Lexer<'source>,
    /// A peeked token, `Some(None)` means the end of input was peeked.
    peeked: Option<Option<(Token, Span)>>,
    /// The parent template named by `{% extends %}`.
    extends: Option<ast::TemplateName>,
    /// Names of all blocks declared so far.
    block_names: Vec<Span>,
    /// The number of `block` tags enclosing the current position.
    open_blocks: usize,
    /// Whether anything other than whitespace or comments has been parsed.
    has_content: bool,
}

/// A tag that closes a scope, or the end of the template.
enum End {
    Eof,
    ElseIf(Span, bool, ast::Expr),
    Else(Span),
    EndIf(Span),
    EndFor(Span),
    EndWith(Span),
    EndBlock(Span, Option<ast::Ident>),
}

/// The contents of a `{% ... %}` tag.
enum Tag {
    If(bool, ast::Expr),
    ElseIf(bool, ast::Expr),
    Else,
    EndIf,
    For(ast::LoopVars, ast::Expr),
    EndFor,
    With(ast::Expr, ast::Ident),
    EndWith,
    Include(ast::TemplateName, Option<ast::Expr>),
    Extends(ast::TemplateName),
    Block(ast::Ident),
    EndBlock(Option<ast::Ident>),
}

/// A keyword in the template syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keyword {
    If,
    Not,
    Else,
    EndIf,
    For,
    In,
    EndFor,
    With,
    As,
    EndWith,
    Include,
    Extends,
    Block,
    EndBlock,
    True,
    False,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("if", Keyword::If),
    ("not", Keyword::Not),
    ("else", Keyword::Else),
    ("endif", Keyword::EndIf),
    ("for", Keyword::For),
    ("in", Keyword::In),
    ("endfor", Keyword::EndFor),
    ("with", Keyword::With),
    ("as", Keyword::As),
    ("endwith", Keyword::EndWith),
    ("include", Keyword::Include),
    ("extends", Keyword::Extends),
    ("block", Keyword::Block),
    ("endblock", Keyword::EndBlock),
    ("true", Keyword::True),
    ("false", Keyword::False),
];

impl<'source> Parser<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            tokens: Lexer::new(source),
            peeked: None,
            extends: None,
            block_names: Vec::new(),
            open_blocks: 0,
            has_content: false,
        }
    }

    /// Parses the whole template.
    pub fn parse_template(mut self) -> Result<ast::Template> {
        let (scope, end) = self.parse_scope()?;
        match end {
            End::Eof => Ok(ast::Template {
                extends: self.extends,
                scope,
            }),
            end => Err(self.err_unexpected_end(&end)),
        }
    }

    /// Parses statements until a closing tag or the end of the template.
    fn parse_scope(&mut self) -> Result<(ast::Scope, End)> {
        let mut scope = ast::Scope::new();
        loop {
            let Some((tk, begin)) = self.next()? else {
                return Ok((scope, End::Eof));
            };

            let stmt = match tk {
                Token::Raw => {
                    self.has_content |= !self.source()[begin].trim().is_empty();
                    ast::Stmt::Raw(begin)
                }

                Token::BeginComment => {
                    if self.is_next(Token::Raw)? {
                        self.expect(Token::Raw)?;
                    }
                    self.expect(Token::EndComment)?;
                    continue;
                }

                Token::BeginExpr if self.is_next_keyword(Keyword::Block)? => {
                    self.parse_super()?;
                    let span = begin.combine(self.expect(Token::EndExpr)?);
                    if self.open_blocks == 0 {
                        return Err(Error::syntax(
                            "`block.super` used outside of a block",
                            self.source(),
                            span,
                        ));
                    }
                    self.has_content = true;
                    ast::Stmt::Super
                }

                Token::BeginExpr => {
                    let expr = self.parse_expr()?;
                    let formatter = if self.is_next(Token::Pipe)? {
                        self.expect(Token::Pipe)?;
                        Some(self.parse_ident()?)
                    } else {
                        None
                    };
                    let span = begin.combine(self.expect(Token::EndExpr)?);
                    self.has_content = true;
                    ast::Stmt::Emit(ast::Emit {
                        expr,
                        formatter,
                        span,
                    })
                }

                Token::BeginBlock => {
                    let tag = self.parse_tag()?;
                    let span = begin.combine(self.expect(Token::EndBlock)?);
                    let first = !self.has_content;
                    self.has_content = true;

                    match tag {
                        Tag::If(not, cond) => self.parse_if(not, cond, span)?,
                        Tag::For(vars, iterable) => {
                            let body = self.parse_body("for", span, |end| {
                                matches!(end, End::EndFor(_))
                            })?;
                            ast::Stmt::For(ast::For {
                                vars,
                                iterable,
                                body,
                            })
                        }
                        Tag::With(expr, name) => {
                            let body = self.parse_body("with", span, |end| {
                                matches!(end, End::EndWith(_))
                            })?;
                            ast::Stmt::With(ast::With { expr, name, body })
                        }
                        Tag::Include(name, globals) => {
                            ast::Stmt::Include(ast::Include { name, globals })
                        }
                        Tag::Extends(name) => {
                            self.parse_extends(name, first, span)?;
                            continue;
                        }
                        Tag::Block(name) => ast::Stmt::Block(self.parse_named_block(name, span)?),

                        Tag::ElseIf(not, cond) => return Ok((scope, End::ElseIf(span, not, cond))),
                        Tag::Else => return Ok((scope, End::Else(span))),
                        Tag::EndIf => return Ok((scope, End::EndIf(span))),
                        Tag::EndFor => return Ok((scope, End::EndFor(span))),
                        Tag::EndWith => return Ok((scope, End::EndWith(span))),
                        Tag::EndBlock(name) => return Ok((scope, End::EndBlock(span, name))),
                    }
                }

                tk => {
                    return Err(self.err_unexpected_token("raw template or tag", tk, begin));
                }
            };
            scope.stmts.push(stmt);
        }
    }

    /// Parses the branches of an `if` statement whose opening tag spans
    /// `span`. Each `else if` becomes a nested `if` in the else branch.
    fn parse_if(&mut self, not: bool, cond: ast::Expr, span: Span) -> Result<ast::Stmt> {
        let (then, end) = self.parse_scope()?;
        let otherwise = match end {
            End::EndIf(_) => None,
            End::ElseIf(_, not, cond) => {
                let nested = self.parse_if(not, cond, span)?;
                Some(ast::Scope {
                    stmts: vec![nested],
                })
            }
            End::Else(_) => Some(self.parse_body("if", span, |end| matches!(end, End::EndIf(_)))?),
            End::Eof => return Err(self.err_unclosed("if", span)),
            end => return Err(self.err_unexpected_end(&end)),
        };
        Ok(ast::Stmt::If(ast::If {
            negate: not,
            cond,
            then,
            otherwise,
        }))
    }

    /// Parses a scope that must be closed by a tag accepted by `closes`.
    fn parse_body<F>(&mut self, kind: &str, span: Span, closes: F) -> Result<ast::Scope>
    where
        F: Fn(&End) -> bool,
    {
        let (scope, end) = self.parse_scope()?;
        match end {
            end if closes(&end) => Ok(scope),
            End::Eof => Err(self.err_unclosed(kind, span)),
            end => Err(self.err_unexpected_end(&end)),
        }
    }

    /// Records the parent template, which must be named once by the very first
    /// tag.
    fn parse_extends(&mut self, name: ast::TemplateName, first: bool, span: Span) -> Result<()> {
        if self.extends.is_some() {
            return Err(Error::syntax(
                "multiple `extends` tags",
                self.source(),
                span,
            ));
        }
        if !first {
            return Err(Error::syntax(
                "`extends` must be the first tag in the template",
                self.source(),
                span,
            ));
        }
        self.extends = Some(name);
        Ok(())
    }

    /// Parses the body of `{% block name %}` up to its `endblock`.
    fn parse_named_block(&mut self, name: ast::Ident, span: Span) -> Result<ast::Block> {
        let raw = &self.source()[name.span];
        if self
            .block_names
            .iter()
            .any(|prev| &self.source()[*prev] == raw)
        {
            return Err(Error::syntax(
                format!("block `{raw}` defined more than once"),
                self.source(),
                name.span,
            ));
        }
        self.block_names.push(name.span);

        self.open_blocks += 1;
        let result = self.parse_scope();
        self.open_blocks -= 1;
        let (body, end) = result?;

        match end {
            End::EndBlock(_, None) => {}
            End::EndBlock(_, Some(end_name)) => {
                let got = &self.source()[end_name.span];
                if got != raw {
                    return Err(Error::syntax(
                        format!("expected `endblock {raw}`, found `endblock {got}`"),
                        self.source(),
                        end_name.span,
                    ));
                }
            }
            End::Eof => return Err(self.err_unclosed("block", span)),
            end => return Err(self.err_unexpected_end(&end)),
        }
        Ok(ast::Block { name, body })
    }

    /// Parses the inside of a `{% ... %}` tag.
    ///
    ///   if not user.enabled
    ///
    ///   for key, value in map
    ///
    ///   include "nested" with user
    ///
    ///   endblock content
    ///
    fn parse_tag(&mut self) -> Result<Tag> {
        let (kw, span) = self.parse_keyword()?;
        let tag = match kw {
            Keyword::If => {
                let (not, cond) = self.parse_if_cond()?;
                Tag::If(not, cond)
            }
            Keyword::Else if self.is_next_keyword(Keyword::If)? => {
                self.expect_keyword(Keyword::If)?;
                let (not, cond) = self.parse_if_cond()?;
                Tag::ElseIf(not, cond)
            }
            Keyword::Else => Tag::Else,
            Keyword::EndIf => Tag::EndIf,
            Keyword::For => {
                let vars = self.parse_loop_vars()?;
                self.expect_keyword(Keyword::In)?;
                Tag::For(vars, self.parse_expr()?)
            }
            Keyword::EndFor => Tag::EndFor,
            Keyword::With => {
                let expr = self.parse_expr()?;
                self.expect_keyword(Keyword::As)?;
                Tag::With(expr, self.parse_ident()?)
            }
            Keyword::EndWith => Tag::EndWith,
            Keyword::Include => {
                let name = self.parse_template_name()?;
                let globals = if self.is_next_keyword(Keyword::With)? {
                    self.expect_keyword(Keyword::With)?;
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                Tag::Include(name, globals)
            }
            Keyword::Extends => Tag::Extends(self.parse_template_name()?),
            Keyword::Block => Tag::Block(self.parse_ident()?),
            Keyword::EndBlock => {
                let name = if self.is_next(Token::Ident)? {
                    Some(self.parse_ident()?)
                } else {
                    None
                };
                Tag::EndBlock(name)
            }
            kw => return Err(self.err_unexpected_keyword(kw.as_str(), span)),
        };
        Ok(tag)
    }

    /// Parses `block.super`.
    fn parse_super(&mut self) -> Result<()> {
        self.expect_keyword(Keyword::Block)?;
        self.expect(Token::Dot)?;
        let ident = self.parse_ident()?;
        if &self.source()[ident.span] != "super" {
            return Err(Error::syntax(
                "expected `super`",
                self.source(),
                ident.span,
            ));
        }
        Ok(())
    }

    /// Parses a condition with an optional leading `not`.
    fn parse_if_cond(&mut self) -> Result<(bool, ast::Expr)> {
        let not = self.is_next_keyword(Keyword::Not)?;
        if not {
            self.expect_keyword(Keyword::Not)?;
        }
        Ok((not, self.parse_expr()?))
    }

    /// Parses a variable path like `users.0.name` or a literal.
    fn parse_expr(&mut self) -> Result<ast::Expr> {
        let (tk, span) = self.parse()?;
        let expr = match tk {
            Token::Ident => ast::Expr::Var(self.parse_var(ast::Ident { span })?),
            Token::Keyword => ast::Expr::Literal(self.parse_bool(span)?),
            Token::String => ast::Expr::Literal(ast::Literal {
                value: Value::String(self.parse_string(span)?),
                span,
            }),
            Token::Number => ast::Expr::Literal(self.parse_number(span, span, false)?),
            Token::Plus | Token::Minus => {
                let digits = self.expect(Token::Number)?;
                let neg = tk == Token::Minus;
                ast::Expr::Literal(self.parse_number(span.combine(digits), digits, neg)?)
            }
            tk => return Err(self.err_unexpected_token("expression", tk, span)),
        };
        Ok(expr)
    }

    /// Parses the rest of a variable path after its first segment.
    fn parse_var(&mut self, first: ast::Ident) -> Result<ast::Var> {
        let mut path = vec![ast::Key::Map(first)];
        while self.is_next(Token::Dot)? {
            self.expect(Token::Dot)?;
            let key = match self.parse()? {
                (Token::Ident, span) => ast::Key::Map(ast::Ident { span }),
                (Token::Index, span) => {
                    let value = self.source()[span].parse().map_err(|_| {
                        Error::syntax(
                            format!("index out of range for {}-bit integer", usize::BITS),
                            self.source(),
                            span,
                        )
                    })?;
                    ast::Key::List(ast::Index { value, span })
                }
                (tk, span) => {
                    return Err(self.err_unexpected_token("identifier or index", tk, span));
                }
            };
            path.push(key);
        }
        Ok(ast::Var { path })
    }

    /// Parses `item` or `key, value`.
    fn parse_loop_vars(&mut self) -> Result<ast::LoopVars> {
        let key = self.parse_ident()?;
        if !self.is_next(Token::Comma)? {
            return Ok(ast::LoopVars::Item(key));
        }
        self.expect(Token::Comma)?;
        let value = self.parse_ident()?;
        Ok(ast::LoopVars::KeyValue(ast::KeyValue {
            key,
            value,
            span: key.span.combine(value.span),
        }))
    }

    fn parse_template_name(&mut self) -> Result<ast::TemplateName> {
        let span = self.expect(Token::String)?;
        let name = self.parse_string(span)?;
        Ok(ast::TemplateName { name, span })
    }

    fn parse_bool(&self, span: Span) -> Result<ast::Literal> {
        let value = match Keyword::parse(&self.source()[span]) {
            Some(Keyword::True) => Value::Bool(true),
            Some(Keyword::False) => Value::Bool(false),
            _ => return Err(self.err_unexpected_keyword(&self.source()[span], span)),
        };
        Ok(ast::Literal { value, span })
    }

    /// Parses an integer, falling back to a float.
    ///
    /// `span` covers the sign and `digits` only the number itself.
    fn parse_number(&self, span: Span, digits: Span, neg: bool) -> Result<ast::Literal> {
        let raw = &self.source()[digits];
        let int_err = match self.parse_integer(raw, span, digits, neg) {
            Ok(int) => {
                return Ok(ast::Literal {
                    value: Value::Integer(int),
                    span,
                })
            }
            Err(err) => err,
        };
        match raw.parse::<f64>() {
            Ok(float) => Ok(ast::Literal {
                value: Value::Float(if neg { -float } else { float }),
                span,
            }),
            // Only blame the float syntax if the literal could not have been
            // meant as an integer.
            Err(_) if raw.contains(['.', '-', '+']) => {
                Err(Error::syntax("invalid float literal", self.source(), span))
            }
            Err(_) => Err(int_err),
        }
    }

    fn parse_integer(&self, raw: &str, span: Span, digits: Span, neg: bool) -> Result<i64> {
        let (radix, prefix) = match raw.get(..2) {
            Some("0x") => (16, 2),
            Some("0o") => (8, 2),
            Some("0b") => (2, 2),
            _ => (10, 0),
        };
        let overflow = || {
            Error::syntax(
                format!("base {radix} literal out of range for 64-bit integer"),
                self.source(),
                span,
            )
        };

        let mut int: i64 = 0;
        for (j, c) in raw[prefix..].char_indices().filter(|&(_, c)| c != '_') {
            let Some(d) = c.to_digit(radix) else {
                let m = digits.m + prefix + j;
                return Err(Error::syntax(
                    format!("invalid digit for base {radix} literal"),
                    self.source(),
                    m..m + c.len_utf8(),
                ));
            };
            int = int.checked_mul(i64::from(radix)).ok_or_else(overflow)?;
            int = if neg {
                int.checked_sub(i64::from(d))
            } else {
                int.checked_add(i64::from(d))
            }
            .ok_or_else(overflow)?;
        }
        Ok(int)
    }

    /// Parses a string literal, resolving escapes.
    fn parse_string(&self, span: Span) -> Result<String> {
        let raw = &self.source()[span];
        let inner = &raw[1..raw.len() - 1];
        if !inner.contains('\\') {
            return Ok(inner.to_owned());
        }

        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.char_indices().map(|(i, c)| (span.m + 1 + i, c));
        while let Some((i, c)) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            let escaped = match chars.next() {
                Some((_, 'n')) => '\n',
                Some((_, 'r')) => '\r',
                Some((_, 't')) => '\t',
                Some((_, '\\')) => '\\',
                Some((_, '"')) => '"',
                Some((j, esc)) => {
                    return Err(Error::syntax(
                        "unknown escape character",
                        self.source(),
                        j..j + esc.len_utf8(),
                    ));
                }
                None => {
                    return Err(Error::syntax(
                        "unknown escape character",
                        self.source(),
                        i..i + 1,
                    ));
                }
            };
            out.push(escaped);
        }
        Ok(out)
    }

    fn expect_keyword(&mut self, exp: Keyword) -> Result<Span> {
        let (kw, span) = self.parse_keyword()?;
        if kw != exp {
            return Err(Error::syntax(
                format!(
                    "expected keyword `{}`, found keyword `{}`",
                    exp.as_str(),
                    kw.as_str()
                ),
                self.source(),
                span,
            ));
        }
        Ok(span)
    }

    fn parse_keyword(&mut self) -> Result<(Keyword, Span)> {
        let span = self.expect(Token::Keyword)?;
        match Keyword::parse(&self.source()[span]) {
            Some(kw) => Ok((kw, span)),
            None => Err(self.err_unexpected_token("keyword", Token::Ident, span)),
        }
    }

    fn parse_ident(&mut self) -> Result<ast::Ident> {
        let span = self.expect(Token::Ident)?;
        Ok(ast::Ident { span })
    }

    /// Returns the next token, the end of input is an error.
    fn parse(&mut self) -> Result<(Token, Span)> {
        self.next()?
            .ok_or_else(|| self.err_unexpected_eof("token"))
    }

    fn expect(&mut self, exp: Token) -> Result<Span> {
        match self.next()? {
            Some((tk, span)) if tk == exp => Ok(span),
            Some((tk, span)) => Err(self.err_unexpected_token(exp.human(), tk, span)),
            None => Err(self.err_unexpected_eof(exp.human())),
        }
    }

    fn is_next_keyword(&mut self, exp: Keyword) -> Result<bool> {
        Ok(match self.peek()? {
            Some((Token::Keyword, span)) => Keyword::parse(&self.source()[span]) == Some(exp),
            _ => false,
        })
    }

    fn is_next(&mut self, exp: Token) -> Result<bool> {
        Ok(matches!(self.peek()?, Some((tk, _)) if tk == exp))
    }

    fn peek(&mut self) -> Result<Option<(Token, Span)>> {
        match self.peeked {
            Some(peeked) => Ok(peeked),
            None => {
                let next = self.tokens.next()?;
                self.peeked = Some(next);
                Ok(next)
            }
        }
    }

    fn next(&mut self) -> Result<Option<(Token, Span)>> {
        match self.peeked.take() {
            Some(peeked) => Ok(peeked),
            None => self.tokens.next(),
        }
    }

    fn source(&self) -> &'source str {
        self.tokens.source
    }

    fn err_unclosed(&self, kind: &str, span: Span) -> Error {
        Error::syntax(format!("unclosed `{kind}` block"), self.source(), span)
    }

    fn err_unexpected_end(&self, end: &End) -> Error {
        let (tag, span) = match end {
            End::ElseIf(span, ..) => ("else if", *span),
            End::Else(span) => ("else", *span),
            End::EndIf(span) => ("endif", *span),
            End::EndFor(span) => ("endfor", *span),
            End::EndWith(span) => ("endwith", *span),
            End::EndBlock(span, _) => ("endblock", *span),
            End::Eof => return self.err_unexpected_eof("tag"),
        };
        Error::syntax(format!("unexpected `{tag}` block"), self.source(), span)
    }

    fn err_unexpected_eof(&self, exp: &str) -> Error {
        let n = self.source().len();
        Error::syntax(format!("expected {exp}, found EOF"), self.source(), n..n)
    }

    fn err_unexpected_token(&self, exp: &str, got: Token, span: Span) -> Error {
        Error::syntax(
            format!("expected {exp}, found {}", got.human()),
            self.source(),
            span,
        )
    }

    fn err_unexpected_keyword(&self, kw: &str, span: Span) -> Error {
        Error::syntax(format!("unexpected keyword `{kw}`"), self.source(), span)
    }
}

impl Keyword {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, kw)| *kw)
    }

    fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, kw)| *kw == self)
            .map_or("", |(name, _)| name)
    }
}
