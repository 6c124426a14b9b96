use thiserror::Error;

/// Which class of front-end failure this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxKind {
    /// The scanner produced an `error` token.
    Lex,
    /// Grammar or symbol-table violation.
    Parse,
    /// Operand types not accepted by an operator.
    Type,
}

impl std::fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyntaxKind::Lex => write!(f, "lex error"),
            SyntaxKind::Parse => write!(f, "parse error"),
            SyntaxKind::Type => write!(f, "type error"),
        }
    }
}

/// A front-end error with source location.
///
/// `row` and `col` are 1-based physical positions in the source text. `line`
/// is the BASIC line number of the statement being parsed, when one had been
/// read already.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.render())]
pub struct ParserError {
    pub kind: SyntaxKind,
    pub message: String,
    pub line: Option<u32>,
    pub row: usize,
    pub col: usize,
}

impl ParserError {
    fn render(&self) -> String {
        match self.line {
            Some(line) => format!(
                "{}:{}: {} on line {}: {}",
                self.row, self.col, self.kind, line, self.message
            ),
            None => format!("{}:{}: {}: {}", self.row, self.col, self.kind, self.message),
        }
    }
}
