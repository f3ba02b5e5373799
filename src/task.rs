use nix::fcntl::OFlag;

/// One parsed command: argv, up to two redirections, and a run mode.
///
/// Built by the parser, read by the scheduler. `argv` is never empty for a
/// task that reaches the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Task {
    pub argv: Vec<String>,
    pub redirect_in: Option<Redirection>,
    pub redirect_out: Option<Redirection>,
    pub mode: TaskMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskMode {
    #[default]
    Foreground,
    Background,
}

/// Binding of a standard stream to a file path and the flags to open it with.
/// Created files get mode 0666, subject to the umask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub path: String,
    pub flags: OFlag,
}

impl Task {
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }
}
