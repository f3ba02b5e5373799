use std::path::Path;
use std::process;

use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};

use toysh::config::{Config, ConfigLoader};
use toysh::repl;

fn main() {
    init_logger();
    let config = load_config();
    if let Err(e) = repl::start(&config) {
        eprintln!("toysh: {}", e);
        process::exit(1);
    }
}

fn init_logger() {
    let level = match std::env::var("TOYSH_LOG").ok().as_deref() {
        Some("debug") => LevelFilter::Debug,
        Some("info") => LevelFilter::Info,
        Some("off") => LevelFilter::Off,
        _ => LevelFilter::Warn,
    };
    let _ = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}

fn load_config() -> Config {
    let Some(home) = std::env::var_os("HOME") else {
        return ConfigLoader::default_config();
    };
    let path = Path::new(&home).join(".toyshrc");
    if !path.exists() {
        return ConfigLoader::default_config();
    }
    match ConfigLoader::load_from_file(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("toysh: {}: {}", path.display(), e);
            ConfigLoader::default_config()
        }
    }
}
