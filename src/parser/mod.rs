mod parser;

use std::fmt;

pub use parser::TaskParser;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    NoCommand,
    AlreadyRedirected,
    MissingFilename,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::NoCommand => write!(f, "no command"),
            ParseError::AlreadyRedirected => {
                write!(f, "broken redirection: already redirected")
            }
            ParseError::MissingFilename => write!(f, "broken redirection: no filename"),
        }
    }
}
