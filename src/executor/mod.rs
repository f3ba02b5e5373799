mod builtins;
mod scheduler;

use std::fmt;

use nix::errno::Errno;

pub use builtins::{Builtin, BuiltinManager};
pub use scheduler::Scheduler;

pub type ExecStatus = Result<i32, ExecError>;

#[derive(Debug, PartialEq, Eq)]
pub enum ExecError {
    Fork(Errno),
    NoSuchBuiltin(String),
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::Fork(errno) => write!(f, "fork failed: {}", errno.desc()),
            ExecError::NoSuchBuiltin(name) => write!(f, "no such builtin: {}", name),
        }
    }
}

impl std::error::Error for ExecError {}
