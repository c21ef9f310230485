use crate::token::{Token, TokenKind};
use proto_span::Span;
use proto_utils::errors::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexerError {
    #[error("unterminated string literal (line {line}, column {column})")]
    UnterminatedString {
        line: usize,
        column: usize,
        span: Span,
    },
    #[error("unterminated block comment (line {line}, column {column})")]
    UnterminatedComment {
        line: usize,
        column: usize,
        span: Span,
    },
    #[error("unknown escape sequence `\\{ch}` (line {line}, column {column})")]
    UnknownEscape {
        ch: char,
        line: usize,
        column: usize,
        span: Span,
    },
    #[error("unexpected character `{ch}` (line {line}, column {column})")]
    UnexpectedCharacter {
        ch: char,
        line: usize,
        column: usize,
        span: Span,
    },
}

impl LexerError {
    pub const fn span(&self) -> Span {
        match self {
            Self::UnterminatedString { span, .. }
            | Self::UnterminatedComment { span, .. }
            | Self::UnknownEscape { span, .. }
            | Self::UnexpectedCharacter { span, .. } => *span,
        }
    }

    /// Whether more input could complete the source (used for REPL continuation).
    /// Strings end at the line break, so only block comments qualify.
    pub const fn is_incomplete_input(&self) -> bool {
        matches!(self, Self::UnterminatedComment { .. })
    }

    pub fn to_diagnostic(&self, source_id: &str) -> Diagnostic {
        let diag = Diagnostic::error(source_id, self.span(), self.to_string());
        match self {
            Self::UnterminatedString { .. } => diag
                .with_suggestion("Add the matching closing quote to terminate the string")
                .with_help("String literals may use single or double quotes but cannot span lines."),
            Self::UnterminatedComment { .. } => {
                diag.with_suggestion("Close the comment with `*/`")
            }
            Self::UnknownEscape { .. } => diag
                .with_help("Supported escapes are \\n, \\t, \\r, \\0, \\\\, \\' and \\\"."),
            Self::UnexpectedCharacter { ch, .. } => {
                let diag = match ch {
                    '`' => diag.with_suggestion("Template literals are not supported; use ' or \""),
                    '&' | '|' => diag.with_suggestion("Did you mean `&&` or `||`?"),
                    _ => diag,
                };
                diag.with_help("This character is not valid in proto script.")
            }
        }
    }
}

pub type LexResult<T> = Result<T, Vec<LexerError>>;

struct LexerState<'src> {
    source: &'src str,
    bytes: &'src [u8],
    tokens: Vec<Token>,
    errors: Vec<LexerError>,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'src> LexerState<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            tokens: Vec::new(),
            errors: Vec::new(),
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn current_char(&self) -> Option<u8> {
        self.bytes.get(self.offset).copied()
    }

    fn peek_char(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.offset + ahead).copied()
    }

    fn advance(&mut self, count: usize) {
        for _ in 0..count {
            match self.current_char() {
                Some(b'\n') => {
                    self.line += 1;
                    self.column = 1;
                }
                // UTF-8 continuation bytes do not start a new column
                Some(byte) if byte & 0xC0 == 0x80 => {}
                Some(_) => self.column += 1,
                None => return,
            }
            self.offset += 1;
        }
    }

    fn emit_token(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token::new(kind, Span::new(start, self.offset)));
    }

    fn is_at_end(&self) -> bool {
        self.offset >= self.bytes.len()
    }
}

pub fn tokenize(source: &str) -> LexResult<Vec<Token>> {
    let mut state = LexerState::new(source);
    state.tokens.reserve(source.len() / 4);

    while !state.is_at_end() {
        state.next_token();
    }

    if state.errors.is_empty() {
        Ok(state.tokens)
    } else {
        Err(state.errors)
    }
}

impl LexerState<'_> {
    fn next_token(&mut self) {
        let Some(ch) = self.current_char() else {
            return;
        };
        let start = self.offset;

        match ch {
            b' ' | b'\t' | b'\r' | b'\n' => self.advance(1),
            b'/' if self.peek_char(1) == Some(b'/') => self.skip_line_comment(),
            b'/' if self.peek_char(1) == Some(b'*') => self.skip_block_comment(),
            b'\'' | b'"' => self.lex_string(ch),
            b'0'..=b'9' => self.lex_number(),
            b'.' if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => self.lex_number(),
            c if is_ident_start(c) => self.lex_identifier(),
            _ => {
                if let Some((kind, len)) = self.match_operator() {
                    self.advance(len);
                    self.emit_token(kind, start);
                } else {
                    let ch = self
                        .source
                        .get(start..)
                        .and_then(|rest| rest.chars().next())
                        .unwrap_or('\u{FFFD}');
                    let (line, column) = (self.line, self.column);
                    self.advance(ch.len_utf8());
                    self.errors.push(LexerError::UnexpectedCharacter {
                        ch,
                        line,
                        column,
                        span: Span::new(start, self.offset),
                    });
                }
            }
        }
    }

    fn match_operator(&self) -> Option<(TokenKind, usize)> {
        let three = (self.current_char()?, self.peek_char(1), self.peek_char(2));
        let matched = match three {
            (b'=', Some(b'='), Some(b'=')) => (TokenKind::EqEqEq, 3),
            (b'!', Some(b'='), Some(b'=')) => (TokenKind::NeqEq, 3),
            (b'=', Some(b'='), _) => (TokenKind::EqEq, 2),
            (b'!', Some(b'='), _) => (TokenKind::Neq, 2),
            (b'<', Some(b'='), _) => (TokenKind::LtEq, 2),
            (b'>', Some(b'='), _) => (TokenKind::GtEq, 2),
            (b'&', Some(b'&'), _) => (TokenKind::AmpAmp, 2),
            (b'|', Some(b'|'), _) => (TokenKind::PipePipe, 2),
            (b'+', Some(b'='), _) => (TokenKind::PlusEq, 2),
            (b'-', Some(b'='), _) => (TokenKind::MinusEq, 2),
            (b'*', Some(b'='), _) => (TokenKind::StarEq, 2),
            (b'/', Some(b'='), _) => (TokenKind::SlashEq, 2),
            (b'(', _, _) => (TokenKind::LParen, 1),
            (b')', _, _) => (TokenKind::RParen, 1),
            (b'{', _, _) => (TokenKind::LBrace, 1),
            (b'}', _, _) => (TokenKind::RBrace, 1),
            (b'[', _, _) => (TokenKind::LBracket, 1),
            (b']', _, _) => (TokenKind::RBracket, 1),
            (b',', _, _) => (TokenKind::Comma, 1),
            (b'.', _, _) => (TokenKind::Dot, 1),
            (b':', _, _) => (TokenKind::Colon, 1),
            (b';', _, _) => (TokenKind::Semicolon, 1),
            (b'=', _, _) => (TokenKind::Equals, 1),
            (b'<', _, _) => (TokenKind::Lt, 1),
            (b'>', _, _) => (TokenKind::Gt, 1),
            (b'+', _, _) => (TokenKind::Plus, 1),
            (b'-', _, _) => (TokenKind::Minus, 1),
            (b'*', _, _) => (TokenKind::Star, 1),
            (b'/', _, _) => (TokenKind::Slash, 1),
            (b'%', _, _) => (TokenKind::Percent, 1),
            (b'!', _, _) => (TokenKind::Bang, 1),
            _ => return None,
        };
        Some(matched)
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch == b'\n' {
                break;
            }
            self.advance(1);
        }
    }

    fn skip_block_comment(&mut self) {
        let start = self.offset;
        let (line, column) = (self.line, self.column);
        self.advance(2);
        loop {
            match (self.current_char(), self.peek_char(1)) {
                (Some(b'*'), Some(b'/')) => {
                    self.advance(2);
                    return;
                }
                (Some(_), _) => self.advance(1),
                (None, _) => {
                    self.errors.push(LexerError::UnterminatedComment {
                        line,
                        column,
                        span: Span::new(start, self.offset),
                    });
                    return;
                }
            }
        }
    }

    fn lex_string(&mut self, quote: u8) {
        let start = self.offset;
        let (line, column) = (self.line, self.column);
        self.advance(1);

        let mut value = String::new();
        let mut segment_start = self.offset;
        loop {
            match self.current_char() {
                None | Some(b'\n') => {
                    self.errors.push(LexerError::UnterminatedString {
                        line,
                        column,
                        span: Span::new(start, self.offset),
                    });
                    return;
                }
                Some(ch) if ch == quote => {
                    value.push_str(self.source.get(segment_start..self.offset).unwrap_or_default());
                    self.advance(1);
                    self.emit_token(TokenKind::StringLiteral(value), start);
                    return;
                }
                Some(b'\\') => {
                    value.push_str(self.source.get(segment_start..self.offset).unwrap_or_default());
                    let escape_start = self.offset;
                    let (esc_line, esc_column) = (self.line, self.column);
                    self.advance(1);
                    let escaped = match self.current_char() {
                        Some(b'n') => Some('\n'),
                        Some(b't') => Some('\t'),
                        Some(b'r') => Some('\r'),
                        Some(b'0') => Some('\0'),
                        Some(b'\\') => Some('\\'),
                        Some(b'\'') => Some('\''),
                        Some(b'"') => Some('"'),
                        // let the unterminated-string arm report it
                        None | Some(b'\n') => {
                            segment_start = self.offset;
                            continue;
                        }
                        Some(_) => None,
                    };
                    let ch = self
                        .source
                        .get(self.offset..)
                        .and_then(|rest| rest.chars().next())
                        .unwrap_or('\u{FFFD}');
                    self.advance(ch.len_utf8());
                    match escaped {
                        Some(c) => value.push(c),
                        None => self.errors.push(LexerError::UnknownEscape {
                            ch,
                            line: esc_line,
                            column: esc_column,
                            span: Span::new(escape_start, self.offset),
                        }),
                    }
                    segment_start = self.offset;
                }
                Some(_) => self.advance(1),
            }
        }
    }

    fn lex_number(&mut self) {
        let start = self.offset;
        self.consume_digits();
        if self.current_char() == Some(b'.')
            && self.peek_char(1).is_none_or(|c| c.is_ascii_digit() || !is_ident_start(c))
        {
            self.advance(1);
            self.consume_digits();
        }
        if matches!(self.current_char(), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek_char(1), Some(b'+' | b'-')));
            if self.peek_char(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                self.advance(1 + sign);
                self.consume_digits();
            }
        }
        let text = self.source.get(start..self.offset).unwrap_or_default().to_string();
        self.emit_token(TokenKind::Number(text), start);
    }

    fn consume_digits(&mut self) {
        while self.current_char().is_some_and(|c| c.is_ascii_digit() || c == b'_') {
            self.advance(1);
        }
    }

    fn lex_identifier(&mut self) {
        let start = self.offset;
        while self.current_char().is_some_and(is_ident_continue) {
            self.advance(1);
        }
        let text = self.source.get(start..self.offset).unwrap_or_default();
        let kind = TokenKind::keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()));
        self.emit_token(kind, start);
    }
}

const fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_' || ch == b'$'
}

const fn is_ident_continue(ch: u8) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    #![expect(clippy::panic, reason = "Panicking on test failures is acceptable")]

    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        match tokenize(source) {
            Ok(tokens) => tokens.into_iter().map(|t| t.kind().clone()).collect(),
            Err(errors) => panic!("unexpected lexer errors: {errors:?}"),
        }
    }

    #[test]
    fn lexes_constructor_definition() {
        assert_eq!(
            kinds("function Rect(w) { this.w = w; }"),
            vec![
                TokenKind::Function,
                TokenKind::Identifier("Rect".into()),
                TokenKind::LParen,
                TokenKind::Identifier("w".into()),
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::This,
                TokenKind::Dot,
                TokenKind::Identifier("w".into()),
                TokenKind::Equals,
                TokenKind::Identifier("w".into()),
                TokenKind::Semicolon,
                TokenKind::RBrace,
            ]
        );
    }

    #[test]
    fn prefers_longest_operator() {
        assert_eq!(
            kinds("a === b !== c == d != e <= f"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::EqEqEq,
                TokenKind::Identifier("b".into()),
                TokenKind::NeqEq,
                TokenKind::Identifier("c".into()),
                TokenKind::EqEq,
                TokenKind::Identifier("d".into()),
                TokenKind::Neq,
                TokenKind::Identifier("e".into()),
                TokenKind::LtEq,
                TokenKind::Identifier("f".into()),
            ]
        );
    }

    #[test]
    fn proto_key_is_an_ordinary_identifier() {
        assert_eq!(
            kinds("o.__proto__"),
            vec![
                TokenKind::Identifier("o".into()),
                TokenKind::Dot,
                TokenKind::Identifier("__proto__".into()),
            ]
        );
    }

    #[test]
    fn decodes_string_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "a\tb""#),
            vec![
                TokenKind::StringLiteral("it's".into()),
                TokenKind::StringLiteral("a\tb".into()),
            ]
        );
    }

    #[test]
    fn number_forms() {
        assert_eq!(
            kinds("3 4.5 .5 1e3 2.5E-2"),
            vec![
                TokenKind::Number("3".into()),
                TokenKind::Number("4.5".into()),
                TokenKind::Number(".5".into()),
                TokenKind::Number("1e3".into()),
                TokenKind::Number("2.5E-2".into()),
            ]
        );
    }

    #[test]
    fn number_followed_by_member_access() {
        assert_eq!(
            kinds("1.toString"),
            vec![
                TokenKind::Number("1".into()),
                TokenKind::Dot,
                TokenKind::Identifier("toString".into()),
            ]
        );
    }

    #[test]
    fn skips_comments() {
        assert_eq!(
            kinds("a // line\n/* block\n */ b"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Identifier("b".into()),
            ]
        );
    }

    #[test]
    fn spans_cover_token_text() {
        let tokens = tokenize("var foo").unwrap_or_default();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].span(), Span::new(4, 7));
    }

    #[test]
    fn unterminated_string_is_an_error_not_a_continuation() {
        let Err(errors) = tokenize("'abc") else {
            panic!("expected lexer failure");
        };
        assert_eq!(errors.len(), 1);
        assert!(!errors[0].is_incomplete_input());
    }

    #[test]
    fn open_block_comment_is_incomplete() {
        let Err(errors) = tokenize("x /* still") else {
            panic!("expected lexer failure");
        };
        assert!(errors[0].is_incomplete_input());
    }

    #[test]
    fn reports_unexpected_character_with_position() {
        let Err(errors) = tokenize("a\n  @") else {
            panic!("expected lexer failure");
        };
        match &errors[0] {
            LexerError::UnexpectedCharacter {
                ch, line, column, ..
            } => {
                assert_eq!(*ch, '@');
                assert_eq!((*line, *column), (2, 3));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!errors[0].is_incomplete_input());
    }
}
