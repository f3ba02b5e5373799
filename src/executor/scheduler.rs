use std::ffi::CString;
use std::io::Write;
use std::os::unix::io::RawFd;
use std::path::Path;

use nix::fcntl::open;
use nix::sys::stat::Mode;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{ForkResult, close, dup, dup2, execvp, fork};

use crate::environment::Environment;
use crate::task::{Redirection, Task, TaskMode};
use super::ExecError;
use super::builtins::BuiltinManager;

/// A standard descriptor saved before a redirection, so it can be put back
/// once the task has been dispatched.
struct SavedFd {
    fd: RawFd,
    saved: RawFd,
}

/// Maps parsed tasks onto processes: builtin dispatch, fork/exec, descriptor
/// redirection, and zombie reaping.
///
/// Tasks are dispatched strictly in list order. The shell blocks only on
/// foreground children; background children run on and are collected by the
/// non-blocking reap pass at the end of the line (or by `wait`).
pub struct Scheduler {
    builtins: BuiltinManager,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            builtins: BuiltinManager::new(),
        }
    }

    /// Dispatch one parsed line. Per-task failures are reported and the line
    /// goes on; only a fork failure abandons the remaining tasks.
    pub fn schedule(&mut self, tasks: &[Task], env: &mut Environment) {
        for task in tasks {
            if let Err(e) = self.dispatch(task, env) {
                eprintln!("toysh: {}", e);
                break;
            }
        }
        self.reap_finished();
    }

    fn dispatch(&mut self, task: &Task, env: &mut Environment) -> Result<(), ExecError> {
        log::debug!("dispatch {:?} ({:?})", task.argv, task.mode);
        let saved = apply_redirections(task);
        let result = self.run_task(task, env);
        // undo the redirections before the next task; children forked above
        // keep the descriptors they inherited
        restore_descriptors(saved);
        result
    }

    fn run_task(&mut self, task: &Task, env: &mut Environment) -> Result<(), ExecError> {
        let name = task.program();
        let is_builtin = self.builtins.is_builtin(name);

        // foreground builtins run in the shell itself, so cd can move it
        if is_builtin && task.mode == TaskMode::Foreground {
            if let Ok(code) = self.builtins.execute(name, task.args(), env) {
                log::debug!("builtin {} exited with {}", name, code);
            }
            return Ok(());
        }

        // forked children inherit whatever was buffered, so drain it first
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();

        match unsafe { fork() } {
            Err(errno) => Err(ExecError::Fork(errno)),
            Ok(ForkResult::Child) => {
                if is_builtin {
                    // a background builtin runs in its own process
                    let code = self.builtins.execute(name, task.args(), env).unwrap_or(1);
                    std::process::exit(code);
                }
                exec_external(&task.argv)
            }
            Ok(ForkResult::Parent { child }) => {
                match task.mode {
                    TaskMode::Foreground => {
                        if let Err(errno) = waitpid(child, None) {
                            eprintln!("toysh: wait: {}", errno.desc());
                        }
                    }
                    TaskMode::Background => {
                        log::debug!("background task {} started as {}", name, child);
                    }
                }
                Ok(())
            }
        }
    }

    /// Best-effort collection of finished background children. Never blocks;
    /// anything still running is picked up on a later pass or by `wait`.
    fn reap_finished(&mut self) {
        loop {
            match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => break,
                Ok(status) => log::debug!("reaped {:?}", status),
                Err(_) => break, // ECHILD: no children left
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace the process image with the task's argv. Only returns by
/// terminating the process; an exec failure must never fall back into the
/// parent's control flow.
fn exec_external(argv: &[String]) -> ! {
    let args: Result<Vec<CString>, _> = argv.iter().map(|a| CString::new(a.as_str())).collect();
    match args {
        Ok(args) => {
            if let Err(errno) = execvp(&args[0], &args) {
                eprintln!("toysh: {}: {}", argv[0], errno.desc());
            }
        }
        Err(_) => eprintln!("toysh: {}: invalid argument", argv[0]),
    }
    std::process::exit(127);
}

/// Open each redirection target and swap it into the standard descriptor,
/// saving the old descriptor for restore. An open failure is reported and
/// leaves that stream pointing wherever it already did.
fn apply_redirections(task: &Task) -> Vec<SavedFd> {
    let mut saved = Vec::new();
    if let Some(rd) = &task.redirect_in {
        if let Some(s) = redirect_descriptor(libc::STDIN_FILENO, rd) {
            saved.push(s);
        }
    }
    if let Some(rd) = &task.redirect_out {
        if let Some(s) = redirect_descriptor(libc::STDOUT_FILENO, rd) {
            saved.push(s);
        }
    }
    saved
}

fn redirect_descriptor(fd: RawFd, rd: &Redirection) -> Option<SavedFd> {
    let mode = Mode::from_bits_truncate(0o666);
    let file = match open(Path::new(&rd.path), rd.flags, mode) {
        Ok(file) => file,
        Err(errno) => {
            eprintln!("toysh: {}: {}", rd.path, errno.desc());
            return None;
        }
    };
    let saved = match dup(fd) {
        Ok(saved) => saved,
        Err(errno) => {
            eprintln!("toysh: {}: {}", rd.path, errno.desc());
            let _ = close(file);
            return None;
        }
    };
    if let Err(errno) = dup2(file, fd) {
        eprintln!("toysh: {}: {}", rd.path, errno.desc());
        let _ = close(saved);
        let _ = close(file);
        return None;
    }
    let _ = close(file);
    Some(SavedFd { fd, saved })
}

fn restore_descriptors(saved: Vec<SavedFd>) {
    for s in saved {
        let _ = dup2(s.saved, s.fd);
        let _ = close(s.saved);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use nix::errno::Errno;
    use nix::fcntl::OFlag;
    use nix::sys::stat::fstat;

    use super::*;
    use crate::executor::builtins::WaitCommand;
    use crate::executor::Builtin;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // Everything that forks or reaps lives in this one test, so that the
    // waitpid(-1) calls cannot cross test threads.
    #[test]
    fn schedules_processes_and_restores_descriptors() {
        let mut env = Environment::new();
        let mut scheduler = Scheduler::new();

        let stdout_before = fstat(libc::STDOUT_FILENO).unwrap();
        let out_path = std::env::temp_dir().join(format!("toysh-sched-{}", std::process::id()));

        // foreground external command with stdout redirected
        let task = Task {
            argv: argv(&["echo", "hi"]),
            redirect_out: Some(Redirection {
                path: out_path.to_str().unwrap().to_string(),
                flags: OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            }),
            ..Task::default()
        };
        scheduler.schedule(&[task], &mut env);
        assert_eq!(fs::read_to_string(&out_path).unwrap(), "hi\n");

        // the shell's own stdout is back where it was
        let stdout_after = fstat(libc::STDOUT_FILENO).unwrap();
        assert_eq!(stdout_before.st_dev, stdout_after.st_dev);
        assert_eq!(stdout_before.st_ino, stdout_after.st_ino);

        // a bad redirect target is task-local: the rest of the line runs
        let broken = Task {
            argv: argv(&["true"]),
            redirect_in: Some(Redirection {
                path: "/toysh-no-such-file".to_string(),
                flags: OFlag::O_RDONLY,
            }),
            ..Task::default()
        };
        let follow_up = Task {
            argv: argv(&["echo", "ok"]),
            redirect_out: Some(Redirection {
                path: out_path.to_str().unwrap().to_string(),
                flags: OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            }),
            ..Task::default()
        };
        scheduler.schedule(&[broken, follow_up], &mut env);
        assert_eq!(fs::read_to_string(&out_path).unwrap(), "ok\n");

        // background task: dispatch does not block, wait collects it
        let bg = Task {
            argv: argv(&["false"]),
            mode: TaskMode::Background,
            ..Task::default()
        };
        scheduler.schedule(&[bg], &mut env);
        assert_eq!(WaitCommand.run(&[], &mut env), 0);
        assert_eq!(
            waitpid(None, Some(WaitPidFlag::WNOHANG)),
            Err(Errno::ECHILD)
        );

        fs::remove_file(&out_path).unwrap();
    }

    #[test]
    fn cd_runs_in_the_shell_process() {
        let mut env = Environment::new();
        let mut scheduler = Scheduler::new();

        let original = std::env::current_dir().unwrap();
        let target = std::env::temp_dir().canonicalize().unwrap();
        let task = Task {
            argv: argv(&["cd", target.to_str().unwrap()]),
            ..Task::default()
        };
        scheduler.schedule(&[task], &mut env);

        let landed = std::env::current_dir().unwrap();
        std::env::set_current_dir(&original).unwrap();
        assert_eq!(landed, target);
    }
}
