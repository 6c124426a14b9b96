use crate::frontend::token::{Keyword, Token, TokenKind};

/// Line scanner.
///
/// A `Lexer` walks one source line (normally ending in `\n`) and yields tokens
/// lazily. Every byte of the input belongs to exactly one token, so the spans
/// concatenate back to the original text. Problems are reported in-band as
/// `TokenKind::Error` tokens; the scanner itself never fails.
///
/// The scanner looks at most one byte past the current state. End of input
/// behaves like end of line for every state.
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer { source, pos: 0 }
    }

    fn at(&self, pos: usize) -> Option<u8> {
        self.source.as_bytes().get(pos).copied()
    }

    fn is_digit(&self, pos: usize) -> bool {
        matches!(self.at(pos), Some(b'0'..=b'9'))
    }

    /// Start state: dispatch on the first byte.
    fn any_token(&self, start: usize) -> Token {
        let Some(ch) = self.at(start) else {
            return Token::new(TokenKind::EndOfLine, start, start);
        };

        match ch {
            b'0'..=b'9' => self.number(start, start + 1),
            b'.' => self.decimal_point(start, start + 1),
            b'A'..=b'Z' | b'_' => self.identifier_or_keyword(start, start + 1),
            b'"' => self.string(start, start + 1),
            b'\n' => Token::new(TokenKind::EndOfLine, start, start + 1),
            b' ' | b'\t' | b'\r' => self.whitespace(start, start + 1),
            b'+' | b'-' | b'*' | b'/' | b'=' | b'<' | b'>' => {
                Token::new(TokenKind::Operator, start, start + 1)
            }
            b'(' => Token::new(TokenKind::LParen, start, start + 1),
            b')' => Token::new(TokenKind::RParen, start, start + 1),
            b';' => Token::new(TokenKind::Semicolon, start, start + 1),
            b':' => Token::new(TokenKind::Colon, start, start + 1),
            _ => {
                // keep spans on char boundaries for non-ASCII input
                let width = self.source[start..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
                Token::error(start, start + width, "illegal character")
            }
        }
    }

    fn number(&self, start: usize, mut pos: usize) -> Token {
        while self.is_digit(pos) {
            pos += 1;
        }
        match self.at(pos) {
            Some(b'.') => self.decimal_number(start, pos + 1),
            Some(b'E') => self.exponent(start, pos + 1),
            _ => Token::new(TokenKind::Integer, start, pos),
        }
    }

    fn decimal_point(&self, start: usize, pos: usize) -> Token {
        if self.is_digit(pos) {
            self.decimal_number(start, pos + 1)
        } else {
            Token::error(
                start,
                pos,
                "unexpected decimal point (not part of a number)",
            )
        }
    }

    fn decimal_number(&self, start: usize, mut pos: usize) -> Token {
        while self.is_digit(pos) {
            pos += 1;
        }
        if self.at(pos) == Some(b'E') {
            self.exponent(start, pos + 1)
        } else {
            Token::new(TokenKind::Float, start, pos)
        }
    }

    /// After `E`: optional sign, then at least one digit.
    fn exponent(&self, start: usize, mut pos: usize) -> Token {
        if matches!(self.at(pos), Some(b'+' | b'-')) {
            pos += 1;
        }
        if self.is_digit(pos) {
            self.exponent_digits(start, pos + 1)
        } else {
            Token::error(start, pos, "illegal number literal")
        }
    }

    fn exponent_digits(&self, start: usize, mut pos: usize) -> Token {
        while self.is_digit(pos) {
            pos += 1;
        }
        Token::new(TokenKind::Float, start, pos)
    }

    fn identifier_or_keyword(&self, start: usize, mut pos: usize) -> Token {
        while matches!(self.at(pos), Some(b'A'..=b'Z' | b'_' | b'0'..=b'9')) {
            pos += 1;
        }
        match Keyword::lookup(&self.source[start..pos]) {
            Some(keyword) => Token::new(TokenKind::Keyword(keyword), start, pos),
            None => Token::new(TokenKind::Identifier, start, pos),
        }
    }

    fn string(&self, start: usize, mut pos: usize) -> Token {
        loop {
            match self.at(pos) {
                None | Some(b'\n') => {
                    return Token::error(start, pos, "end of line in a string literal");
                }
                Some(b'"') => return self.string_quote(start, pos + 1),
                Some(b' '..=b'~' | b'\t') => pos += 1,
                Some(_) => {
                    let width = self.source[pos..].chars().next().map_or(1, char::len_utf8);
                    return Token::error(
                        start,
                        pos + width,
                        "illegal character in string literal",
                    );
                }
            }
        }
    }

    /// Just saw a `"` inside a string: either `""` (an escaped quote) or the end.
    fn string_quote(&self, start: usize, pos: usize) -> Token {
        if self.at(pos) == Some(b'"') {
            self.string(start, pos + 1)
        } else {
            Token::new(TokenKind::String, start, pos)
        }
    }

    fn whitespace(&self, start: usize, mut pos: usize) -> Token {
        while matches!(self.at(pos), Some(b' ' | b'\t' | b'\r')) {
            pos += 1;
        }
        Token::new(TokenKind::Whitespace, start, pos)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.pos >= self.source.len() {
            return None;
        }
        let token = self.any_token(self.pos);
        self.pos = token.end;
        Some(token)
    }
}

/// Scan a line, yielding every token including whitespace.
pub fn scan(source: &str) -> Lexer<'_> {
    Lexer::new(source)
}

/// Scan a line, dropping whitespace tokens (what the parser consumes).
pub fn significant(source: &str) -> impl Iterator<Item = Token> + '_ {
    scan(source).filter(|t| t.kind != TokenKind::Whitespace)
}

/// Decode a string literal lexeme: strip the quotes and collapse `""` to `"`.
pub fn unquote(lexeme: &str) -> String {
    let inner = lexeme
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(lexeme);
    inner.replace("\"\"", "\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        scan(source).map(|t| t.kind).collect()
    }

    fn first(source: &str, start: usize) -> Token {
        Lexer::new(source).any_token(start)
    }

    #[test]
    fn test_print_line() {
        assert_eq!(
            kinds("10 PRINT  \"Hello World\"\n"),
            vec![
                TokenKind::Integer,
                TokenKind::Whitespace,
                TokenKind::Keyword(Keyword::Print),
                TokenKind::Whitespace,
                TokenKind::String,
                TokenKind::EndOfLine,
            ]
        );
    }

    #[test]
    fn test_let_line() {
        assert_eq!(
            kinds("10 LET I=10\n"),
            vec![
                TokenKind::Integer,
                TokenKind::Whitespace,
                TokenKind::Keyword(Keyword::Let),
                TokenKind::Whitespace,
                TokenKind::Identifier,
                TokenKind::Operator,
                TokenKind::Integer,
                TokenKind::EndOfLine,
            ]
        );
    }

    #[test]
    fn test_spans_reconstruct_source() {
        let source = "20 IF A = \"x\"\"y\" THEN PRINT (1+2)*3; .5E-3 ?\n";
        let rebuilt: String = scan(source).map(|t| t.text(source)).collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn test_numbers() {
        let t = first("1\n", 0);
        assert_eq!((t.kind, t.end), (TokenKind::Integer, 1));

        let t = first("2.\n", 0);
        assert_eq!((t.kind, t.end), (TokenKind::Float, 2));

        let t = first(".3E-4\n", 0);
        assert_eq!((t.kind, t.end), (TokenKind::Float, 5));

        let t = first("abcd4E3\n", 4);
        assert_eq!((t.kind, t.end), (TokenKind::Float, 7));

        let t = first("0.1.2.3.4\n", 0);
        assert_eq!((t.kind, t.end), (TokenKind::Float, 3));
    }

    #[test]
    fn test_malformed_numbers() {
        let t = first(".b\n", 0);
        assert_eq!(t.kind, TokenKind::Error);
        assert_eq!(
            t.message,
            Some("unexpected decimal point (not part of a number)")
        );

        let t = first("4E-end", 0);
        assert_eq!(t.kind, TokenKind::Error);
        assert_eq!(t.message, Some("illegal number literal"));
    }

    #[test]
    fn test_strings() {
        let t = first("\"hello\"\n", 0);
        assert_eq!((t.kind, t.end), (TokenKind::String, 7));

        let t = first("\"text in \"\"quotes\"\".\"\n", 0);
        assert_eq!((t.kind, t.end), (TokenKind::String, 21));

        let t = first("\"\"\"\"\n", 0);
        assert_eq!((t.kind, t.end), (TokenKind::String, 4));

        let t = first("\"\"\"quote\"\"\"\n", 0);
        assert_eq!((t.kind, t.end), (TokenKind::String, 11));
    }

    #[test]
    fn test_unterminated_strings() {
        let t = first("\"he\nllo\"\n", 0);
        assert_eq!(t.kind, TokenKind::Error);
        assert_eq!(t.message, Some("end of line in a string literal"));

        assert_eq!(first("\"hello\"\"\n", 0).kind, TokenKind::Error);
        assert_eq!(first("\"no newline", 0).kind, TokenKind::Error);
    }

    #[test]
    fn test_strings_hold_printable_ascii_only() {
        let t = first("\"a\0b\"\n", 0);
        assert_eq!((t.kind, t.end), (TokenKind::Error, 3));
        assert_eq!(t.message, Some("illegal character in string literal"));

        assert_eq!(first("\"\x07\"\n", 0).kind, TokenKind::Error);
        assert_eq!(first("\"a\rb\"\n", 0).kind, TokenKind::Error);

        let t = first("\"café\"\n", 0);
        assert_eq!((t.kind, t.end), (TokenKind::Error, 6));

        let t = first("\"tab\there ~\"\n", 0);
        assert_eq!(t.kind, TokenKind::String);
    }

    #[test]
    fn test_identifiers_and_keywords() {
        assert_eq!(first("IF\n", 0).kind, TokenKind::Keyword(Keyword::If));
        assert_eq!(first("_IF\n", 0).kind, TokenKind::Identifier);

        let t = first("AB0_9C_\n", 0);
        assert_eq!((t.kind, t.end), (TokenKind::Identifier, 7));

        // keywords only match whole words
        assert_eq!(first("PRINTER\n", 0).kind, TokenKind::Identifier);
    }

    #[test]
    fn test_whitespace_collapses() {
        let t = first(" \t  X", 0);
        assert_eq!((t.kind, t.end), (TokenKind::Whitespace, 4));
    }

    #[test]
    fn test_illegal_characters() {
        let t = first("?", 0);
        assert_eq!(t.kind, TokenKind::Error);
        assert_eq!(t.message, Some("illegal character"));

        // lowercase is not part of the grammar
        assert_eq!(first("x\n", 0).kind, TokenKind::Error);

        let t = first("é\n", 0);
        assert_eq!((t.kind, t.end), (TokenKind::Error, 2));
    }

    #[test]
    fn test_significant_drops_whitespace() {
        let k: Vec<TokenKind> = significant("10 END\n").map(|t| t.kind).collect();
        assert_eq!(
            k,
            vec![
                TokenKind::Integer,
                TokenKind::Keyword(Keyword::End),
                TokenKind::EndOfLine
            ]
        );
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"hello\""), "hello");
        assert_eq!(unquote("\"say \"\"hi\"\"\""), "say \"hi\"");
        assert_eq!(unquote("\"\""), "");
    }
}
