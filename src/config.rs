use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Settings read from `~/.toyshrc`, a `key=value` file with `#` comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub prompt: String,
    pub history_file: String,
    pub history_max: usize,
}

impl Config {
    /// History file location with a leading `~/` resolved against `HOME`.
    pub fn history_path(&self) -> PathBuf {
        if let Some(rest) = self.history_file.strip_prefix("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return Path::new(&home).join(rest);
            }
        }
        PathBuf::from(&self.history_file)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn default_config() -> Config {
        Config {
            prompt: "$ ".to_string(),
            history_file: "~/.toysh_history".to_string(),
            history_max: 500,
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path).map_err(ConfigError::Io)?;
        let mut src = String::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(ConfigError::Io)?;
            src.push_str(&line);
            src.push('\n');
        }
        Self::load_from_str(&src)
    }

    pub fn load_from_str(src: &str) -> Result<Config, ConfigError> {
        let mut prompt = None;
        let mut history_file = None;
        let mut history_max = None;

        for (lineno, line) in src.lines().enumerate() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Parse(format!(
                    "Line {}: No '=' found: {}",
                    lineno + 1,
                    line
                )));
            };
            match key.trim() {
                "prompt" => prompt = Some(value.to_string()),
                "history_file" => history_file = Some(value.trim().to_string()),
                "history_max" => match value.trim().parse::<usize>() {
                    Ok(n) => history_max = Some(n),
                    Err(_) => {
                        return Err(ConfigError::Parse(format!(
                            "Line {}: Invalid usize: {}",
                            lineno + 1,
                            line
                        )));
                    }
                },
                key => {
                    return Err(ConfigError::Parse(format!(
                        "Line {}: Unknown key: {}",
                        lineno + 1,
                        key
                    )));
                }
            }
        }

        let default = ConfigLoader::default_config();
        Ok(Config {
            prompt: prompt.unwrap_or(default.prompt),
            history_file: history_file.unwrap_or(default.history_file),
            history_max: history_max.unwrap_or(default.history_max),
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}
