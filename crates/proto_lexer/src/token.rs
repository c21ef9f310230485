use proto_span::Span;
use std::fmt;

#[derive(Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Keywords
    Var,
    Let,
    Const,
    Function,
    Return,
    If,
    Else,
    While,
    New,
    This,
    Typeof,
    Delete,
    Instanceof,
    In,
    True,
    False,
    Null,
    Undefined,

    // Identifiers
    Identifier(String),

    // Literals
    Number(String),
    StringLiteral(String),

    // Structural
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,

    // Operators
    Equals,
    EqEq,
    EqEqEq,
    Neq,
    NeqEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    AmpAmp,
    PipePipe,

    // Assignment operators
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
}

impl TokenKind {
    pub fn keyword(ident: &str) -> Option<Self> {
        let kind = match ident {
            "var" => Self::Var,
            "let" => Self::Let,
            "const" => Self::Const,
            "function" => Self::Function,
            "return" => Self::Return,
            "if" => Self::If,
            "else" => Self::Else,
            "while" => Self::While,
            "new" => Self::New,
            "this" => Self::This,
            "typeof" => Self::Typeof,
            "delete" => Self::Delete,
            "instanceof" => Self::Instanceof,
            "in" => Self::In,
            "true" => Self::True,
            "false" => Self::False,
            "null" => Self::Null,
            "undefined" => Self::Undefined,
            _ => return None,
        };
        Some(kind)
    }

    /// Source spelling of keywords and punctuation; `None` for tokens that carry text.
    pub const fn fixed_text(&self) -> Option<&'static str> {
        let text = match self {
            Self::Var => "var",
            Self::Let => "let",
            Self::Const => "const",
            Self::Function => "function",
            Self::Return => "return",
            Self::If => "if",
            Self::Else => "else",
            Self::While => "while",
            Self::New => "new",
            Self::This => "this",
            Self::Typeof => "typeof",
            Self::Delete => "delete",
            Self::Instanceof => "instanceof",
            Self::In => "in",
            Self::True => "true",
            Self::False => "false",
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Comma => ",",
            Self::Dot => ".",
            Self::Colon => ":",
            Self::Semicolon => ";",
            Self::Equals => "=",
            Self::EqEq => "==",
            Self::EqEqEq => "===",
            Self::Neq => "!=",
            Self::NeqEq => "!==",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Bang => "!",
            Self::AmpAmp => "&&",
            Self::PipePipe => "||",
            Self::PlusEq => "+=",
            Self::MinusEq => "-=",
            Self::StarEq => "*=",
            Self::SlashEq => "/=",
            Self::Identifier(_) | Self::Number(_) | Self::StringLiteral(_) => return None,
        };
        Some(text)
    }

    pub const fn is_keyword(&self) -> bool {
        matches!(
            self,
            Self::Var
                | Self::Let
                | Self::Const
                | Self::Function
                | Self::Return
                | Self::If
                | Self::Else
                | Self::While
                | Self::New
                | Self::This
                | Self::Typeof
                | Self::Delete
                | Self::Instanceof
                | Self::In
                | Self::True
                | Self::False
                | Self::Null
                | Self::Undefined
        )
    }
}

impl fmt::Debug for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(name) => write!(f, "identifier `{name}`"),
            Self::Number(value) => write!(f, "number `{value}`"),
            Self::StringLiteral(value) => write!(f, "string {value:?}"),
            other => write!(f, "`{}`", other.fixed_text().unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    span: Span,
}

impl Token {
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub const fn kind(&self) -> &TokenKind {
        &self.kind
    }

    pub const fn span(&self) -> Span {
        self.span
    }
}
