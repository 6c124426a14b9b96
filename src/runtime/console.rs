use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Program-level I/O, injected into the interpreters.
///
/// `read_line` returns the line without its terminator, or `None` at end of
/// input.
pub trait Console {
    fn read_line(&mut self) -> io::Result<Option<String>>;
    fn write_str(&mut self, text: &str) -> io::Result<()>;
}

/// The process's stdin/stdout.
#[derive(Debug, Default)]
pub struct StdConsole;

impl StdConsole {
    pub fn new() -> Self {
        StdConsole
    }
}

impl Console for StdConsole {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(strip_newline(&line).to_string()))
    }

    fn write_str(&mut self, text: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(text.as_bytes())?;
        // prompts have no newline
        out.flush()
    }
}

/// In-memory console: scripted input lines, captured output.
#[derive(Debug, Default, Clone)]
pub struct BufferConsole {
    input: VecDeque<String>,
    output: String,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits `input` into lines; each becomes one answer to INPUT.
    pub fn with_input(input: &str) -> Self {
        BufferConsole {
            input: input.lines().map(str::to_string).collect(),
            output: String::new(),
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn into_output(self) -> String {
        self.output
    }
}

impl Console for BufferConsole {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.input.pop_front())
    }

    fn write_str(&mut self, text: &str) -> io::Result<()> {
        self.output.push_str(text);
        Ok(())
    }
}

/// Drops one trailing `\n` or `\r\n`.
pub fn strip_newline(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// C `atoi`: leading whitespace, optional sign, then as many digits as
/// follow. Anything unparseable reads as 0; overflow wraps.
pub fn parse_int_input(text: &str) -> i32 {
    let mut chars = text.trim_start().chars().peekable();
    let negative = match chars.peek() {
        Some('-') => {
            chars.next();
            true
        }
        Some('+') => {
            chars.next();
            false
        }
        _ => false,
    };

    let mut value: i32 = 0;
    for c in chars {
        let Some(digit) = c.to_digit(10) else {
            break;
        };
        value = value.wrapping_mul(10).wrapping_add(digit as i32);
    }

    if negative { value.wrapping_neg() } else { value }
}
