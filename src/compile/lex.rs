use crate::compile::parse::Keyword;
use crate::compile::search::{self, Kind};
use crate::types::span::Span;
use crate::{Error, Result};

/// Splits template source into tokens for the parser.
///
/// Call [`.next()?`][Lexer::next] until it returns [`None`], whitespace inside
/// tags is skipped.
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Lexer<'source> {
    /// The template source.
    pub source: &'source str,
    /// Byte offset of the next unread character.
    pos: usize,
    mode: Mode,
    /// Set by a `-` on a closing delimiter, strips leading whitespace from the
    /// next raw token.
    trim_next: bool,
    /// A delimiter found while scanning raw text, emitted after the raw token.
    pending: Option<(Token, Span)>,
}

#[derive(Clone, Copy)]
#[cfg_attr(internal_debug, derive(Debug))]
enum Mode {
    /// Plain template text.
    Raw,
    /// Inside `{{ ... }}` or `{% ... %}`.
    Code {
        open: Span,
        close: Token,
        /// Whether the previous token was part of a path, digits after a dot
        /// are list indexes there.
        in_path: bool,
    },
    /// Inside `{# ... #}`.
    Comment { open: Span, close: Token },
}

/// A lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Raw,
    /// `{{`
    BeginExpr,
    /// `}}`
    EndExpr,
    /// `{%`
    BeginBlock,
    /// `%}`
    EndBlock,
    /// `{#`
    BeginComment,
    /// `#}`
    EndComment,
    /// `.`
    Dot,
    /// `|`
    Pipe,
    /// `,`
    Comma,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// Spaces and tabs.
    Whitespace,
    Keyword,
    Ident,
    /// Digits following a `.` in a path.
    Index,
    /// Integer or float literal, including `0x`, `0o` and `0b` prefixes.
    Number,
    /// Double quoted string literal, escapes are left in place.
    String,
}

type Lexed = Result<Option<(Token, Span)>>;

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            source,
            pos: 0,
            mode: Mode::Raw,
            trim_next: false,
            pending: None,
        }
    }

    /// Returns the next token that is not whitespace.
    pub fn next(&mut self) -> Lexed {
        while let Some((tk, span)) = self.lex()? {
            if tk != Token::Whitespace {
                return Ok(Some((tk, span)));
            }
        }
        Ok(None)
    }

    fn lex(&mut self) -> Lexed {
        if let Some(pending) = self.pending.take() {
            return Ok(Some(pending));
        }
        if self.pos >= self.source.len() {
            return match self.mode {
                Mode::Raw => Ok(None),
                Mode::Code { open, close, .. } | Mode::Comment { open, close } => {
                    Err(self.err_unclosed(open, close))
                }
            };
        }
        match self.mode {
            Mode::Raw => self.lex_raw(),
            Mode::Code {
                open,
                close,
                in_path,
            } => self.lex_code(open, close, in_path),
            Mode::Comment { open, close } => self.lex_comment_body(open, close),
        }
    }

    /// Scans raw text up to the next opening delimiter.
    fn lex_raw(&mut self) -> Lexed {
        let start = self.pos;
        let Some((kind, m, n)) = search::find_at(self.source, start) else {
            self.pos = self.source.len();
            return Ok(Some(self.raw(start, self.source.len(), false)));
        };

        let (tk, trim_before) = delimiter(kind);
        let open = Span::from(m..n);
        self.mode = match tk {
            Token::BeginExpr | Token::BeginBlock => Mode::Code {
                open,
                close: closing(tk),
                in_path: false,
            },
            Token::BeginComment => Mode::Comment {
                open,
                close: Token::EndComment,
            },
            _ => return Err(self.err_unexpected(tk, open)),
        };
        self.pos = n;

        if m == start {
            return Ok(Some((tk, open)));
        }
        self.pending = Some((tk, open));
        Ok(Some(self.raw(start, m, trim_before)))
    }

    /// Builds a raw token for `m..n`, applying any whitespace trimming.
    fn raw(&mut self, mut m: usize, mut n: usize, trim_end: bool) -> (Token, Span) {
        if trim_end {
            n = self.source[..n].trim_end().len();
        }
        if std::mem::take(&mut self.trim_next) {
            let text = &self.source[m..n];
            m += text.len() - text.trim_start().len();
        }
        (Token::Raw, Span::from(m..n))
    }

    /// Scans a single token between `{{`/`{%` and the closing delimiter.
    fn lex_code(&mut self, open: Span, close: Token, in_path: bool) -> Lexed {
        let i = self.pos;

        if let Some((kind, j)) = search::starts_with(self.source, i) {
            let (tk, trim_after) = delimiter(kind);
            if is_opening(tk) {
                return Err(self.err_unclosed(open, close));
            }
            if tk != close {
                return Err(self.err_unexpected(tk, i..j));
            }
            self.mode = Mode::Raw;
            self.trim_next = trim_after;
            self.pos = j;
            return Ok(Some((tk, Span::from(i..j))));
        }

        // There is at least one character left, checked by `lex`.
        let c = self.source[i..].chars().next().unwrap_or_default();
        let (tk, j) = match c {
            '.' => (Token::Dot, i + 1),
            '|' => (Token::Pipe, i + 1),
            ',' => (Token::Comma, i + 1),
            '+' => (Token::Plus, i + 1),
            '-' => (Token::Minus, i + 1),
            '"' => (Token::String, self.scan_string(i)?),
            c if c.is_ascii_digit() && in_path => (Token::Index, self.scan_while(i, is_index)),
            c if c.is_ascii_digit() => (Token::Number, self.scan_while(i, is_number)),
            c if is_whitespace(c) => (Token::Whitespace, self.scan_while(i, is_whitespace)),
            c if is_ident_start(c) => {
                let j = self.scan_while(i, is_ident);
                if Keyword::parse(&self.source[i..j]).is_some() {
                    (Token::Keyword, j)
                } else {
                    (Token::Ident, j)
                }
            }
            c => return Err(self.err_unexpected_character(i..i + c.len_utf8())),
        };

        let in_path = match tk {
            Token::Ident | Token::Keyword => true,
            Token::Dot | Token::Index => in_path,
            _ => false,
        };
        self.mode = Mode::Code {
            open,
            close,
            in_path,
        };
        self.pos = j;
        Ok(Some((tk, Span::from(i..j))))
    }

    /// Scans the body of a comment up to its closing delimiter.
    fn lex_comment_body(&mut self, open: Span, close: Token) -> Lexed {
        let start = self.pos;
        let Some((kind, m, n)) = search::find_at(self.source, start) else {
            self.pos = self.source.len();
            return Ok(Some((Token::Raw, Span::from(start..self.source.len()))));
        };

        let (tk, trim_after) = delimiter(kind);
        if is_opening(tk) {
            return Err(self.err_unclosed(open, close));
        }
        if tk != close {
            return Err(self.err_unexpected(tk, m..n));
        }
        self.mode = Mode::Raw;
        self.trim_next = trim_after;
        self.pos = n;

        let end = (tk, Span::from(m..n));
        if m == start {
            return Ok(Some(end));
        }
        self.pending = Some(end);
        Ok(Some((Token::Raw, Span::from(start..m))))
    }

    /// Returns the end of the string literal starting at the quote at `i`.
    fn scan_string(&self, i: usize) -> Result<usize> {
        let mut escaped = false;
        for (j, c) in self.source[i + 1..].char_indices().map(|(d, c)| (i + 1 + d, c)) {
            match c {
                '\r' | '\n' => return Err(self.err_undelimited_string(i..j)),
                '"' if !escaped => return Ok(j + 1),
                '\\' => escaped = !escaped,
                _ => escaped = false,
            }
        }
        Err(self.err_undelimited_string(i..self.source.len()))
    }

    /// Returns the end of the run of characters from `i` matching `pred`.
    fn scan_while(&self, i: usize, pred: fn(char) -> bool) -> usize {
        self.source[i..]
            .find(|c: char| !pred(c))
            .map_or(self.source.len(), |d| i + d)
    }

    fn err_unclosed(&self, open: Span, close: Token) -> Error {
        let open_tk = match close {
            Token::EndExpr => Token::BeginExpr,
            Token::EndBlock => Token::BeginBlock,
            _ => Token::BeginComment,
        };
        Error::syntax(format!("unclosed {}", open_tk.human()), self.source, open)
    }

    fn err_unexpected(&self, tk: Token, span: impl Into<Span>) -> Error {
        Error::syntax(format!("unexpected {}", tk.human()), self.source, span)
    }

    fn err_unexpected_character(&self, span: impl Into<Span>) -> Error {
        Error::syntax("unexpected character", self.source, span)
    }

    fn err_undelimited_string(&self, span: impl Into<Span>) -> Error {
        Error::syntax("undelimited string", self.source, span)
    }
}

impl Token {
    pub fn human(&self) -> &'static str {
        match self {
            Self::Raw => "raw template",
            Self::BeginExpr => "begin expression",
            Self::EndExpr => "end expression",
            Self::BeginBlock => "begin block",
            Self::EndBlock => "end block",
            Self::BeginComment => "begin comment",
            Self::EndComment => "end comment",
            Self::Dot => "member access operator",
            Self::Pipe => "pipe",
            Self::Comma => "comma",
            Self::Minus => "minus",
            Self::Plus => "plus",
            Self::Whitespace => "whitespace",
            Self::Keyword => "keyword",
            Self::Ident => "identifier",
            Self::Index => "index",
            Self::String => "string",
            Self::Number => "number",
        }
    }
}

/// Maps a delimiter to its token and whether it trims adjacent whitespace.
fn delimiter(kind: Kind) -> (Token, bool) {
    match kind {
        Kind::BeginExpr => (Token::BeginExpr, false),
        Kind::BeginExprTrim => (Token::BeginExpr, true),
        Kind::EndExpr => (Token::EndExpr, false),
        Kind::EndExprTrim => (Token::EndExpr, true),
        Kind::BeginBlock => (Token::BeginBlock, false),
        Kind::BeginBlockTrim => (Token::BeginBlock, true),
        Kind::EndBlock => (Token::EndBlock, false),
        Kind::EndBlockTrim => (Token::EndBlock, true),
        Kind::BeginComment => (Token::BeginComment, false),
        Kind::BeginCommentTrim => (Token::BeginComment, true),
        Kind::EndComment => (Token::EndComment, false),
        Kind::EndCommentTrim => (Token::EndComment, true),
    }
}

/// Returns the closing delimiter for `{{` or `{%`.
fn closing(open: Token) -> Token {
    match open {
        Token::BeginExpr => Token::EndExpr,
        _ => Token::EndBlock,
    }
}

fn is_opening(tk: Token) -> bool {
    matches!(tk, Token::BeginExpr | Token::BeginBlock | Token::BeginComment)
}

fn is_whitespace(c: char) -> bool {
    matches!(c, '\t' | ' ')
}

#[cfg(feature = "unicode")]
fn is_ident_start(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_start(c)
}

#[cfg(feature = "unicode")]
fn is_ident(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}

#[cfg(not(feature = "unicode"))]
fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

#[cfg(not(feature = "unicode"))]
fn is_ident(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

fn is_index(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_number(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_empty() {
        assert_eq!(lex("").unwrap(), []);
    }

    #[test]
    fn lex_raw_only() {
        assert_eq!(lex("<p>hi</p>").unwrap(), [(Token::Raw, "<p>hi</p>")]);
    }

    #[test]
    fn lex_trims_before_open() {
        let tokens = lex("hi \t\n{{- x }}").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::Raw, "hi"),
                (Token::BeginExpr, "{{-"),
                (Token::Ident, "x"),
                (Token::EndExpr, "}}"),
            ]
        );
    }

    #[test]
    fn lex_trims_after_close() {
        let tokens = lex("{{ x -}} \n there").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::BeginExpr, "{{"),
                (Token::Ident, "x"),
                (Token::EndExpr, "-}}"),
                (Token::Raw, "there"),
            ]
        );
    }

    #[test]
    fn lex_path_indexes() {
        let tokens = lex("{{ users.0.name }}").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::BeginExpr, "{{"),
                (Token::Ident, "users"),
                (Token::Dot, "."),
                (Token::Index, "0"),
                (Token::Dot, "."),
                (Token::Ident, "name"),
                (Token::EndExpr, "}}"),
            ]
        );
    }

    #[test]
    fn lex_literals_and_formatter() {
        let tokens = lex(r#"{{ "a\"b" 0.5 0x1f -1 | escape }}"#).unwrap();
        assert_eq!(
            tokens,
            [
                (Token::BeginExpr, "{{"),
                (Token::String, r#""a\"b""#),
                (Token::Number, "0.5"),
                (Token::Number, "0x1f"),
                (Token::Minus, "-"),
                (Token::Number, "1"),
                (Token::Pipe, "|"),
                (Token::Ident, "escape"),
                (Token::EndExpr, "}}"),
            ]
        );
    }

    #[test]
    fn lex_escaped_backslash_ends_string() {
        let tokens = lex(r#"{{ "a\\" }}"#).unwrap();
        assert_eq!(
            tokens,
            [
                (Token::BeginExpr, "{{"),
                (Token::String, r#""a\\""#),
                (Token::EndExpr, "}}"),
            ]
        );
    }

    #[test]
    fn lex_block_tags() {
        let tokens = lex("{% block content %}hi{%- endblock -%} x").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::BeginBlock, "{%"),
                (Token::Keyword, "block"),
                (Token::Ident, "content"),
                (Token::EndBlock, "%}"),
                (Token::Raw, "hi"),
                (Token::BeginBlock, "{%-"),
                (Token::Keyword, "endblock"),
                (Token::EndBlock, "-%}"),
                (Token::Raw, "x"),
            ]
        );
    }

    #[test]
    fn lex_block_super() {
        let tokens = lex("{{ block.super }}").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::BeginExpr, "{{"),
                (Token::Keyword, "block"),
                (Token::Dot, "."),
                (Token::Ident, "super"),
                (Token::EndExpr, "}}"),
            ]
        );
    }

    #[test]
    fn lex_comment_body_is_raw() {
        let tokens = lex("a {# b } - # { #}c").unwrap();
        assert_eq!(
            tokens,
            [
                (Token::Raw, "a "),
                (Token::BeginComment, "{#"),
                (Token::Raw, " b } - # { "),
                (Token::EndComment, "#}"),
                (Token::Raw, "c"),
            ]
        );
    }

    #[test]
    fn lex_err_unclosed() {
        let err = lex("lorem {{ ipsum {% dolor").unwrap_err();
        assert_eq!(err.to_string(), "unclosed begin expression between bytes 6 and 8");
    }

    #[test]
    fn lex_err_unclosed_comment_at_eof() {
        let err = lex("a {# b").unwrap_err();
        assert_eq!(err.to_string(), "unclosed begin comment between bytes 2 and 4");
    }

    #[test]
    fn lex_err_unexpected_close() {
        let err = lex("lorem }} ipsum").unwrap_err();
        assert_eq!(err.to_string(), "unexpected end expression between bytes 6 and 8");
    }

    #[test]
    fn lex_err_mismatched_close() {
        let err = lex("{{ x %}").unwrap_err();
        assert_eq!(err.to_string(), "unexpected end block between bytes 5 and 7");
    }

    #[test]
    fn lex_err_undelimited_string() {
        let err = lex("{{ \"abc }}").unwrap_err();
        assert_eq!(err.to_string(), "undelimited string between bytes 3 and 10");
    }

    fn lex(source: &str) -> Result<Vec<(Token, &str)>> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        while let Some((tk, span)) = lexer.next()? {
            tokens.push((tk, &source[span]));
        }
        assert!(lexer.next().unwrap().is_none());
        Ok(tokens)
    }
}
