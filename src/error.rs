use std::fmt;
use std::io;

use rustyline::error::ReadlineError;

use crate::executor::ExecError;
use crate::lexer::LexError;
use crate::parser::ParseError;

/// Top-level error for the read-eval loop. Stage errors are reported inline
/// and only end the current line; what reaches here ends the shell.
#[derive(Debug)]
pub enum ShellError {
    Lex(LexError),
    Parse(ParseError),
    Exec(ExecError),
    Io(io::Error),
    Readline(ReadlineError),
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellError::Lex(e) => write!(f, "lexing error: {}", e),
            ShellError::Parse(e) => write!(f, "parsing error: {}", e),
            ShellError::Exec(e) => write!(f, "execution error: {}", e),
            ShellError::Io(e) => write!(f, "IO error: {}", e),
            ShellError::Readline(e) => write!(f, "input error: {}", e),
        }
    }
}

impl std::error::Error for ShellError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShellError::Io(e) => Some(e),
            ShellError::Readline(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LexError> for ShellError {
    fn from(e: LexError) -> Self {
        ShellError::Lex(e)
    }
}

impl From<ParseError> for ShellError {
    fn from(e: ParseError) -> Self {
        ShellError::Parse(e)
    }
}

impl From<ExecError> for ShellError {
    fn from(e: ExecError) -> Self {
        ShellError::Exec(e)
    }
}

impl From<io::Error> for ShellError {
    fn from(e: io::Error) -> Self {
        ShellError::Io(e)
    }
}

impl From<ReadlineError> for ShellError {
    fn from(e: ReadlineError) -> Self {
        ShellError::Readline(e)
    }
}
