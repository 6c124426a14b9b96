/// Reserved words. An identifier lexeme matching one of these is never an
/// `Identifier` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Dim,
    As,
    Integer,
    String,
    Float,
    Input,
    If,
    Then,
    Goto,
    Print,
    End,
    Let,
}

impl Keyword {
    pub const ALL: [Keyword; 12] = [
        Keyword::Dim,
        Keyword::As,
        Keyword::Integer,
        Keyword::String,
        Keyword::Float,
        Keyword::Input,
        Keyword::If,
        Keyword::Then,
        Keyword::Goto,
        Keyword::Print,
        Keyword::End,
        Keyword::Let,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Dim => "DIM",
            Keyword::As => "AS",
            Keyword::Integer => "INTEGER",
            Keyword::String => "STRING",
            Keyword::Float => "FLOAT",
            Keyword::Input => "INPUT",
            Keyword::If => "IF",
            Keyword::Then => "THEN",
            Keyword::Goto => "GOTO",
            Keyword::Print => "PRINT",
            Keyword::End => "END",
            Keyword::Let => "LET",
        }
    }

    pub fn lookup(word: &str) -> Option<Keyword> {
        Keyword::ALL.into_iter().find(|k| k.as_str() == word)
    }
}

/// Token classification produced by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Integer,
    Float,
    Identifier,
    Keyword(Keyword),
    String,
    /// One of `+ - * / = < >`.
    Operator,
    LParen,
    RParen,
    Semicolon,
    Colon,
    Whitespace,
    EndOfLine,
    Error,
}

/// A lexical token: its kind and the byte span it covers in the scanned line.
///
/// Tokens don't own text; use [`Token::text`] with the source they came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    /// Diagnostic for `Error` tokens.
    pub message: Option<&'static str>,
}

impl Token {
    pub fn new(kind: TokenKind, start: usize, end: usize) -> Self {
        Token {
            kind,
            start,
            end,
            message: None,
        }
    }

    pub fn error(start: usize, end: usize, message: &'static str) -> Self {
        Token {
            kind: TokenKind::Error,
            start,
            end,
            message: Some(message),
        }
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Integer => write!(f, "integer"),
            TokenKind::Float => write!(f, "float"),
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::Keyword(k) => write!(f, "{}", k.as_str()),
            TokenKind::String => write!(f, "string"),
            TokenKind::Operator => write!(f, "operator"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Whitespace => write!(f, "whitespace"),
            TokenKind::EndOfLine => write!(f, "end of line"),
            TokenKind::Error => write!(f, "error"),
        }
    }
}
