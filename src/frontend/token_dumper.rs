use std::fmt::Write;

use crate::frontend::lexer::scan;
use crate::frontend::token::{Token, TokenKind};

pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, whitespace is skipped and lexemes are shown plainly
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const RED: &'static str = "\x1b[31m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const BLU: &'static str = "\x1b[34m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, source: &str) {
        print!("{}", self.render(source));
    }

    /// One line per token: `[row:col] KIND lexeme`, rows and columns 1-based.
    pub fn render(&self, source: &str) -> String {
        let mut out = String::new();
        let mut row = 1;
        let mut line_start = 0;
        for token in scan(source) {
            if token.kind == TokenKind::EndOfLine {
                self.print_one(&mut out, source, &token, row, token.start - line_start + 1);
                row += 1;
                line_start = token.end;
                continue;
            }
            if !self.show_debug_repr && token.kind == TokenKind::Whitespace {
                continue;
            }
            self.print_one(&mut out, source, &token, row, token.start - line_start + 1);
        }
        out
    }

    fn print_one(&self, out: &mut String, source: &str, token: &Token, row: usize, col: usize) {
        let kind = self.kind(token);
        let colr = if self.color { self.color(token) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };
        let text = token.text(source);

        let _ = if self.show_debug_repr {
            writeln!(
                out,
                "[{:02}:{:02}] {}{:<8} {:?} {}..{}{}",
                row, col, colr, kind, text, token.start, token.end, reset
            )
        } else {
            match token.kind {
                TokenKind::Error => writeln!(
                    out,
                    "[{:02}:{:02}] {}{:<8} {} ({}){}",
                    row,
                    col,
                    colr,
                    kind,
                    text,
                    token.message.unwrap_or("invalid token"),
                    reset
                ),
                TokenKind::EndOfLine => {
                    writeln!(out, "[{:02}:{:02}] {}{}{}", row, col, colr, kind, reset)
                }
                _ => writeln!(
                    out,
                    "[{:02}:{:02}] {}{:<8} {}{}",
                    row, col, colr, kind, text, reset
                ),
            }
        };
    }

    fn kind(&self, t: &Token) -> &'static str {
        use TokenKind::*;
        match t.kind {
            EndOfLine => "EOL",
            Whitespace => "WS",
            Error => "ERROR",

            // literals
            Integer => "INT",
            Float => "FLOAT",
            String => "STRING",

            Identifier => "IDENT",
            Keyword(_) => "KEYWORD",

            Operator => "OP",
            LParen | RParen | Semicolon | Colon => "PUNCT",
        }
    }

    fn color(&self, t: &Token) -> &'static str {
        use TokenKind::*;
        match t.kind {
            EndOfLine | Whitespace => Self::DIM,
            Error => Self::RED,
            String => Self::GRN,
            Integer | Float => Self::CYN,
            Identifier => Self::YEL,
            Keyword(_) => Self::BLU,
            Operator => Self::MAG,
            _ => Self::RESET,
        }
    }
}
