use std::mem;

use nix::fcntl::OFlag;

use crate::lexer::Token;
use crate::task::{Redirection, Task, TaskMode};
use super::ParseError;

/// Which standard stream a redirection operator binds, and how its target
/// file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RedirectSlot {
    Stdin,
    Stdout,
    StdoutAppend,
}

impl RedirectSlot {
    fn flags(self) -> OFlag {
        match self {
            RedirectSlot::Stdin => OFlag::O_RDONLY,
            RedirectSlot::Stdout => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            RedirectSlot::StdoutAppend => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Command,
    Redirection(RedirectSlot),
}

/// Token-level state machine producing the ordered task list for one line.
///
/// `&` terminates the pending task as background and opens a fresh one; a
/// final pending task with any words is foreground. Each redirection slot may
/// be bound at most once per task.
pub struct TaskParser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TaskParser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn next(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    pub fn parse(&mut self) -> Result<Vec<Task>, ParseError> {
        let mut tasks = Vec::new();
        let mut pending = Task::default();
        let mut state = State::Command;

        while let Some(token) = self.next() {
            match state {
                State::Command => match token {
                    Token::Word(text) => pending.argv.push(text.clone()),
                    Token::Background => {
                        if pending.argv.is_empty() {
                            return Err(ParseError::NoCommand);
                        }
                        pending.mode = TaskMode::Background;
                        tasks.push(mem::take(&mut pending));
                    }
                    Token::RedirectIn => state = State::Redirection(RedirectSlot::Stdin),
                    Token::RedirectOut => state = State::Redirection(RedirectSlot::Stdout),
                    Token::RedirectAppend => {
                        state = State::Redirection(RedirectSlot::StdoutAppend)
                    }
                },
                State::Redirection(slot) => match token {
                    Token::Word(path) => {
                        let target = match slot {
                            RedirectSlot::Stdin => &mut pending.redirect_in,
                            RedirectSlot::Stdout | RedirectSlot::StdoutAppend => {
                                &mut pending.redirect_out
                            }
                        };
                        if target.is_some() {
                            return Err(ParseError::AlreadyRedirected);
                        }
                        *target = Some(Redirection {
                            path: path.clone(),
                            flags: slot.flags(),
                        });
                        state = State::Command;
                    }
                    _ => return Err(ParseError::MissingFilename),
                },
            }
        }

        if let State::Redirection(_) = state {
            return Err(ParseError::MissingFilename);
        }
        if !pending.argv.is_empty() {
            tasks.push(pending);
        } else if pending.redirect_in.is_some() || pending.redirect_out.is_some() {
            // a redirection with no command to attach it to
            return Err(ParseError::NoCommand);
        }
        Ok(tasks)
    }
}
