//! ReferenceExecution: a named pointer to a previously registered execution,
//! resolved lazily against a [`super::project::Project`] registry rather than
//! holding a direct reference — a dependency is addressed by name and looked
//! up at resolve time, not at parse time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Points at an execution by name, to be resolved against a project registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceExecution {
    pub name: String,
}

impl ReferenceExecution {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for ReferenceExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<&str> for ReferenceExecution {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ReferenceExecution {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_displays_as_its_name() {
        let reference = ReferenceExecution::new("build");
        assert_eq!(reference.to_string(), "build");
    }
}
