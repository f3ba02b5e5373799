use std::collections::HashMap;

use nix::errno::Errno;
use nix::sys::wait::waitpid;

use crate::environment::Environment;
use super::{ExecError, ExecStatus};

/// A command executed inside the shell's own process instead of via exec.
/// `run` receives the arguments after the command name and returns an exit
/// code; usage errors are reported to stderr and produce a nonzero code
/// without side effects.
pub trait Builtin {
    fn name(&self) -> &'static str;
    fn run(&self, args: &[String], env: &mut Environment) -> i32;
}

pub struct BuiltinManager {
    commands: HashMap<&'static str, Box<dyn Builtin>>,
}

impl BuiltinManager {
    pub fn new() -> Self {
        let mut mgr = BuiltinManager {
            commands: HashMap::new(),
        };
        mgr.register(Box::new(CdCommand));
        mgr.register(Box::new(ExitCommand));
        mgr.register(Box::new(WaitCommand));
        mgr.register(Box::new(HelpCommand));
        mgr
    }

    pub fn register(&mut self, cmd: Box<dyn Builtin>) {
        self.commands.insert(cmd.name(), cmd);
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn execute(&self, name: &str, args: &[String], env: &mut Environment) -> ExecStatus {
        match self.commands.get(name) {
            Some(cmd) => Ok(cmd.run(args, env)),
            None => Err(ExecError::NoSuchBuiltin(name.to_string())),
        }
    }
}

impl Default for BuiltinManager {
    fn default() -> Self {
        Self::new()
    }
}

/// `cd [dir]`: change the shell's working directory, defaulting to `HOME`.
pub struct CdCommand;

impl Builtin for CdCommand {
    fn name(&self) -> &'static str {
        "cd"
    }

    fn run(&self, args: &[String], env: &mut Environment) -> i32 {
        if args.len() > 1 {
            eprintln!("toysh: cd: too many arguments");
            return 1;
        }
        let target = match args.first() {
            Some(dir) => dir.clone(),
            None => match env.home() {
                Some(home) => home.to_string(),
                None => {
                    eprintln!("toysh: cd: HOME not set");
                    return 1;
                }
            },
        };
        match std::env::set_current_dir(&target) {
            Ok(()) => 0,
            Err(e) => {
                // the working directory is left unchanged
                eprintln!("toysh: cd: {}: {}", target, e);
                1
            }
        }
    }
}

/// `exit [code]`: terminate the shell immediately.
pub struct ExitCommand;

impl Builtin for ExitCommand {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn run(&self, args: &[String], _env: &mut Environment) -> i32 {
        if args.len() > 1 {
            eprintln!("toysh: exit: too many arguments");
            return 1;
        }
        let code = match args.first() {
            None => 0,
            Some(arg) => match arg.parse() {
                Ok(code) => code,
                Err(_) => {
                    eprintln!("toysh: exit: {}: numeric argument required", arg);
                    return 1;
                }
            },
        };
        std::process::exit(code);
    }
}

/// `wait`: block until every outstanding child has been collected.
pub struct WaitCommand;

impl Builtin for WaitCommand {
    fn name(&self) -> &'static str {
        "wait"
    }

    fn run(&self, _args: &[String], _env: &mut Environment) -> i32 {
        loop {
            match waitpid(None, None) {
                Ok(status) => log::debug!("wait: collected {:?}", status),
                Err(Errno::ECHILD) => return 0,
                Err(errno) => {
                    eprintln!("toysh: wait: {}", errno.desc());
                    return 1;
                }
            }
        }
    }
}

pub struct HelpCommand;

impl Builtin for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    fn run(&self, _args: &[String], _env: &mut Environment) -> i32 {
        println!("Available built-in commands:");
        println!("  cd [DIR]    : Change directory (DIR defaults to $HOME)");
        println!("  exit [CODE] : Exit shell with CODE (default 0)");
        println!("  wait        : Wait for all background tasks");
        println!("  help        : Show this help");
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_knows_the_required_builtins() {
        let mgr = BuiltinManager::new();
        assert!(mgr.is_builtin("cd"));
        assert!(mgr.is_builtin("exit"));
        assert!(mgr.is_builtin("wait"));
        assert!(!mgr.is_builtin("ls"));
    }

    #[test]
    fn unknown_builtin_is_an_error() {
        let mgr = BuiltinManager::new();
        let mut env = Environment::new();
        assert_eq!(
            mgr.execute("nope", &[], &mut env),
            Err(ExecError::NoSuchBuiltin("nope".to_string()))
        );
    }

    #[test]
    fn cd_rejects_extra_arguments() {
        let mut env = Environment::new();
        let code = CdCommand.run(&["a".to_string(), "b".to_string()], &mut env);
        assert_eq!(code, 1);
    }

    #[test]
    fn cd_reports_missing_directory() {
        let mut env = Environment::new();
        let code = CdCommand.run(&["/toysh-no-such-dir".to_string()], &mut env);
        assert_eq!(code, 1);
    }

    #[test]
    fn exit_rejects_extra_arguments() {
        let mut env = Environment::new();
        // must not terminate the test process
        let code = ExitCommand.run(&["1".to_string(), "2".to_string()], &mut env);
        assert_eq!(code, 1);
    }

    #[test]
    fn exit_rejects_non_numeric_code() {
        let mut env = Environment::new();
        let code = ExitCommand.run(&["abc".to_string()], &mut env);
        assert_eq!(code, 1);
    }
}
