use std::fmt;

use serde::{Deserialize, Serialize};

/// Partition of declarations and cached modules.
///
/// Local (built-in) modules are searched before application-wide ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Local,
    Application,
}

impl Scope {
    /// Scopes in search order.
    pub const ALL: [Scope; 2] = [Scope::Local, Scope::Application];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Application => "application",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
