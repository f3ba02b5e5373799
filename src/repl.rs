use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::config::Config;
use crate::environment::Environment;
use crate::error::ShellError;
use crate::executor::Scheduler;
use crate::lexer::Lexer;
use crate::parser::TaskParser;

/// The read-eval loop: one line in, tokenize, parse, schedule. Errors in any
/// stage discard the line and move on to the next prompt.
pub fn start(config: &Config) -> Result<(), ShellError> {
    let mut env = Environment::new();
    let mut scheduler = Scheduler::new();

    let editor_config = rustyline::Config::builder()
        .max_history_size(config.history_max)?
        .build();
    let mut editor = DefaultEditor::with_config(editor_config)?;
    let history = config.history_path();
    if editor.load_history(&history).is_err() {
        log::debug!("no history at {}", history.display());
    }

    loop {
        let line = match editor.readline(&config.prompt) {
            Ok(line) => line,
            // Ctrl-D or Ctrl-C: stop processing
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(e) => return Err(ShellError::Readline(e)),
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line.as_str());

        let tokens = match Lexer::tokenize(&line, &env) {
            Ok(tokens) => tokens,
            Err(e) => {
                eprintln!("toysh: {}", e);
                continue;
            }
        };
        let tasks = match TaskParser::new(&tokens).parse() {
            Ok(tasks) => tasks,
            Err(e) => {
                eprintln!("toysh: {}", e);
                continue;
            }
        };
        scheduler.schedule(&tasks, &mut env);
    }

    if let Err(e) = editor.save_history(&history) {
        log::warn!("failed to save history to {}: {}", history.display(), e);
    }
    Ok(())
}
