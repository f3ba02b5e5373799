/// One lexical unit of an input line.
///
/// Only `Word` carries text; an empty word (from `""`) is a `Word` holding an
/// empty string, never a missing token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    Background,     // &
    RedirectIn,     // <
    RedirectOut,    // >
    RedirectAppend, // >>
}

impl Token {
    pub fn word(text: &str) -> Self {
        Token::Word(text.to_string())
    }
}
