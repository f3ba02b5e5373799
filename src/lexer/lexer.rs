use std::fmt;

use crate::environment::Environment;
use super::token::Token;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum LexError {
    UnclosedQuote,
    BrokenEscape,
    UnknownOperator(String),
    BrokenVariable(String),
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnclosedQuote => write!(f, "unclosed quote"),
            LexError::BrokenEscape => write!(f, "broken escape"),
            LexError::UnknownOperator(text) => write!(f, "syntax error near '{}'", text),
            LexError::BrokenVariable(name) => {
                write!(f, "broken variable expansion near '{}'", name)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Word,
    Separator,
    Quote,
    EmptyQuote,
    Escape,
    Finished,
}

/// Character-level state machine turning one input line into tokens.
///
/// Words are accumulated into a buffer and cut at whitespace or operator
/// boundaries. `"…"` suppresses the operator and whitespace meaning of its
/// content, `\` makes the next character literal, and `[name]` expands a
/// shell variable. On any error the tokens built so far are dropped with the
/// machine; no partial token list escapes.
pub struct Lexer<'a> {
    env: &'a Environment,
    chars: Vec<char>,
    pos: usize,
    state: State,
    prev_state: State, // state to return to after an escape
    buf: String,
    tokens: Vec<Token>,
}

fn is_separator_char(c: char) -> bool {
    matches!(c, '<' | '>' | '&')
}

impl<'a> Lexer<'a> {
    pub fn tokenize(line: &str, env: &Environment) -> Result<Vec<Token>, LexError> {
        let mut lex = Lexer {
            env,
            chars: line.chars().collect(),
            pos: 0,
            state: State::Word,
            prev_state: State::Word,
            buf: String::new(),
            tokens: Vec::new(),
        };
        loop {
            // `None` stands for the end of the line
            let c = lex.chars.get(lex.pos).copied();
            match lex.state {
                State::Word => lex.step_word(c)?,
                State::Separator => lex.step_separator(c)?,
                State::Quote => lex.step_quote(c)?,
                State::EmptyQuote => lex.step_empty_quote(c)?,
                State::Escape => lex.step_escape(c)?,
                State::Finished => return Ok(lex.tokens),
            }
        }
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    /// Cut the buffered text into a Word token. Call sites decide whether an
    /// empty buffer still forms a token (it does after an empty quote).
    fn form_word(&mut self) {
        let word = std::mem::take(&mut self.buf);
        self.tokens.push(Token::Word(word));
    }

    fn form_separator(&mut self) -> Result<(), LexError> {
        let text = std::mem::take(&mut self.buf);
        let token = match text.as_str() {
            "&" => Token::Background,
            "<" => Token::RedirectIn,
            ">" => Token::RedirectOut,
            ">>" => Token::RedirectAppend,
            _ => return Err(LexError::UnknownOperator(text)),
        };
        self.tokens.push(token);
        Ok(())
    }

    fn step_word(&mut self, c: Option<char>) -> Result<(), LexError> {
        match c {
            None => {
                if !self.buf.is_empty() {
                    self.form_word();
                }
                self.state = State::Finished;
            }
            Some(' ') | Some('\t') => {
                if !self.buf.is_empty() {
                    self.form_word();
                }
                self.advance();
            }
            Some('"') => {
                self.state = State::Quote;
                self.advance();
            }
            Some('\\') => {
                self.prev_state = self.state;
                self.state = State::Escape;
                self.advance();
            }
            Some('[') => {
                self.advance();
                let value = self.scan_variable()?;
                self.splice_unquoted(&value);
            }
            Some(c) if is_separator_char(c) => {
                if !self.buf.is_empty() {
                    self.form_word();
                }
                self.state = State::Separator;
                self.buf.push(c);
                self.advance();
            }
            Some(c) => {
                self.buf.push(c);
                self.advance();
            }
        }
        Ok(())
    }

    fn step_separator(&mut self, c: Option<char>) -> Result<(), LexError> {
        match c {
            Some(c) if is_separator_char(c) => {
                self.buf.push(c);
                self.advance();
                Ok(())
            }
            // First non-separator character closes the operator and is
            // reprocessed by the word state.
            _ => {
                self.form_separator()?;
                self.state = State::Word;
                self.step_word(c)
            }
        }
    }

    fn step_quote(&mut self, c: Option<char>) -> Result<(), LexError> {
        match c {
            None => return Err(LexError::UnclosedQuote),
            Some('"') => {
                self.state = if self.buf.is_empty() {
                    State::EmptyQuote
                } else {
                    State::Word
                };
                self.advance();
            }
            Some('\\') => {
                self.prev_state = self.state;
                self.state = State::Escape;
                self.advance();
            }
            Some('[') => {
                self.advance();
                let value = self.scan_variable()?;
                // inside quotes the expansion is spliced in verbatim
                self.buf.push_str(&value);
            }
            Some(c) => {
                self.buf.push(c);
                self.advance();
            }
        }
        Ok(())
    }

    fn step_empty_quote(&mut self, c: Option<char>) -> Result<(), LexError> {
        match c {
            // A quote with nothing inside still forms a (zero-length) word
            // when the word ends here.
            None | Some(' ') | Some('\t') => {
                self.form_word();
                self.state = State::Word;
                self.step_word(c)
            }
            // `""x` continues the word: no token boundary is forced.
            Some(_) => {
                self.state = State::Word;
                self.step_word(c)
            }
        }
    }

    fn step_escape(&mut self, c: Option<char>) -> Result<(), LexError> {
        match c {
            None => Err(LexError::BrokenEscape),
            Some(c) => {
                self.buf.push(c);
                self.state = self.prev_state;
                self.advance();
                Ok(())
            }
        }
    }

    /// Consume `name]` after an opening `[` and return the variable's value.
    /// Unset variables expand to the empty string.
    fn scan_variable(&mut self) -> Result<String, LexError> {
        let mut name = String::new();
        loop {
            match self.chars.get(self.pos).copied() {
                None => return Err(LexError::BrokenVariable(name)),
                Some(']') => {
                    self.advance();
                    break;
                }
                Some(c) if c.is_ascii_alphanumeric() || c == '_' => {
                    name.push(c);
                    self.advance();
                }
                Some(c) => {
                    name.push(c);
                    return Err(LexError::BrokenVariable(name));
                }
            }
        }
        Ok(self.env.get(&name).unwrap_or("").to_string())
    }

    /// Word-split an unquoted expansion: the buffer is cut into a token at
    /// every internal whitespace boundary, just like ordinary input.
    fn splice_unquoted(&mut self, value: &str) {
        for c in value.chars() {
            if c == ' ' || c == '\t' {
                if !self.buf.is_empty() {
                    self.form_word();
                }
            } else {
                self.buf.push(c);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(line: &str) -> Result<Vec<Token>, LexError> {
        let env = Environment::new();
        Lexer::tokenize(line, &env)
    }

    fn words(items: &[&str]) -> Vec<Token> {
        items.iter().map(|w| Token::word(w)).collect()
    }

    #[test]
    fn splits_on_whitespace() {
        let tokens = lex("echo hello world").unwrap();
        assert_eq!(tokens, words(&["echo", "hello", "world"]));
    }

    #[test]
    fn collapses_repeated_whitespace() {
        let tokens = lex("  a \t b  ").unwrap();
        assert_eq!(tokens, words(&["a", "b"]));
    }

    #[test]
    fn blank_line_yields_no_tokens() {
        assert_eq!(lex("").unwrap(), vec![]);
        assert_eq!(lex("   \t ").unwrap(), vec![]);
    }

    #[test]
    fn quotes_keep_whitespace() {
        let tokens = lex("echo \"a b\"").unwrap();
        assert_eq!(tokens, words(&["echo", "a b"]));
    }

    #[test]
    fn quote_joins_adjacent_text() {
        let tokens = lex("\"ab\"cd").unwrap();
        assert_eq!(tokens, words(&["abcd"]));
    }

    #[test]
    fn operators_lose_meaning_inside_quotes() {
        let tokens = lex("echo \"a > b & c\"").unwrap();
        assert_eq!(tokens, words(&["echo", "a > b & c"]));
    }

    #[test]
    fn escape_makes_whitespace_literal() {
        let tokens = lex("a\\ b").unwrap();
        assert_eq!(tokens, words(&["a b"]));
    }

    #[test]
    fn escape_makes_quote_literal() {
        let tokens = lex("say \\\"hi\\\"").unwrap();
        assert_eq!(tokens, words(&["say", "\"hi\""]));
    }

    #[test]
    fn escape_inside_quote_returns_to_quote() {
        let tokens = lex("\"a\\\"b c\"").unwrap();
        assert_eq!(tokens, words(&["a\"b c"]));
    }

    #[test]
    fn empty_quotes_form_empty_word() {
        let tokens = lex("\"\"").unwrap();
        assert_eq!(tokens, vec![Token::word("")]);
    }

    #[test]
    fn empty_quotes_before_text_do_not_split() {
        let tokens = lex("\"\"x").unwrap();
        assert_eq!(tokens, words(&["x"]));
    }

    #[test]
    fn empty_quotes_before_whitespace_keep_empty_word() {
        let tokens = lex("\"\" x").unwrap();
        assert_eq!(tokens, vec![Token::word(""), Token::word("x")]);
    }

    #[test]
    fn recognizes_operators() {
        let tokens = lex("cmd < in > out").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::word("cmd"),
                Token::RedirectIn,
                Token::word("in"),
                Token::RedirectOut,
                Token::word("out"),
            ]
        );
    }

    #[test]
    fn append_operator_is_two_characters() {
        let tokens = lex("cmd >> log &").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::word("cmd"),
                Token::RedirectAppend,
                Token::word("log"),
                Token::Background,
            ]
        );
    }

    #[test]
    fn operators_need_no_surrounding_whitespace() {
        let tokens = lex("a>b").unwrap();
        assert_eq!(
            tokens,
            vec![Token::word("a"), Token::RedirectOut, Token::word("b")]
        );
    }

    #[test]
    fn unknown_operator_is_an_error() {
        assert_eq!(
            lex("cmd << in"),
            Err(LexError::UnknownOperator("<<".to_string()))
        );
        assert_eq!(
            lex("a && b"),
            Err(LexError::UnknownOperator("&&".to_string()))
        );
    }

    #[test]
    fn unclosed_quote_is_an_error() {
        assert_eq!(lex("echo \"abc"), Err(LexError::UnclosedQuote));
    }

    #[test]
    fn trailing_backslash_is_an_error() {
        assert_eq!(lex("echo abc\\"), Err(LexError::BrokenEscape));
    }

    #[test]
    fn expands_variables_in_words() {
        let mut env = Environment::new();
        env.set("GREETING", "hello");
        let tokens = Lexer::tokenize("echo [GREETING]!", &env).unwrap();
        assert_eq!(tokens, words(&["echo", "hello!"]));
    }

    #[test]
    fn unquoted_expansion_splits_on_whitespace() {
        let mut env = Environment::new();
        env.set("ARGS", "a b");
        let tokens = Lexer::tokenize("x[ARGS]y", &env).unwrap();
        assert_eq!(tokens, words(&["xa", "by"]));
    }

    #[test]
    fn quoted_expansion_is_spliced_verbatim() {
        let mut env = Environment::new();
        env.set("ARGS", "a b");
        let tokens = Lexer::tokenize("\"x[ARGS]y\"", &env).unwrap();
        assert_eq!(tokens, words(&["xa by"]));
    }

    #[test]
    fn unset_variable_expands_to_nothing() {
        let tokens = lex("a[TOYSH_DOES_NOT_EXIST]b").unwrap();
        assert_eq!(tokens, words(&["ab"]));
    }

    #[test]
    fn variable_name_must_be_alphanumeric() {
        assert!(matches!(
            lex("[FO-O]"),
            Err(LexError::BrokenVariable(_))
        ));
    }

    #[test]
    fn unterminated_variable_is_an_error() {
        assert!(matches!(lex("[FOO"), Err(LexError::BrokenVariable(_))));
    }

    #[test]
    fn escaped_bracket_is_literal() {
        let tokens = lex("\\[FOO]").unwrap();
        assert_eq!(tokens, words(&["[FOO]"]));
    }
}
