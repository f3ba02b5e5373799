use std::collections::HashMap;

/// Shell variable table, seeded from the OS environment at startup.
///
/// `[name]` expansion and the `cd` builtin's `HOME` default read from here;
/// the shell never writes variables back to the process environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            vars: std::env::vars().collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|v| v.as_str())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    pub fn home(&self) -> Option<&str> {
        self.get("HOME")
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_includes_os_env() {
        let env = Environment::new();
        assert!(!env.vars.is_empty());
    }

    #[test]
    fn test_set_and_get() {
        let mut env = Environment::new();
        env.set("FOO", "bar");
        assert_eq!(env.get("FOO"), Some("bar"));
    }

    #[test]
    fn test_get_missing() {
        let env = Environment::new();
        assert_eq!(env.get("TOYSH_DOES_NOT_EXIST"), None);
    }
}
