use serde::{Deserialize, Serialize};

/// App Store environment a receipt is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Sandbox,
    Production,
}

impl Environment {
    /// Sandbox for debug builds, production for release builds.
    pub fn from_build() -> Self {
        if cfg!(debug_assertions) {
            Environment::Sandbox
        } else {
            Environment::Production
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Environment::Sandbox),
            "production" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}
