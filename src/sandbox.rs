use std::collections::HashSet;

use crate::interpreter::EvalError;

/// Member names refused unless the host configures otherwise.
pub const DEFAULT_DENYLIST: [&str; 6] = [
    "constructor",
    "__proto__",
    "__defineGetter__",
    "__defineSetter__",
    "__lookupGetter__",
    "__lookupSetter__",
];

/// Denylist consulted at every identifier and member resolution step.
///
/// Every read, write, create and callee lookup funnels through [`Sandbox::check`], so
/// a denied name is refused wherever it appears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    denied: HashSet<String>,
}

impl Default for Sandbox {
    fn default() -> Self {
        Sandbox::new(DEFAULT_DENYLIST)
    }
}

impl Sandbox {
    pub fn new<I, S>(denied: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Sandbox {
            denied: denied.into_iter().map(Into::into).collect(),
        }
    }

    /// A sandbox that refuses nothing
    pub fn permissive() -> Self {
        Sandbox {
            denied: HashSet::new(),
        }
    }

    pub fn deny(&mut self, name: impl Into<String>) -> &mut Self {
        self.denied.insert(name.into());
        self
    }

    /// Removes `name` from the denylist, returning whether it was present
    pub fn allow(&mut self, name: &str) -> bool {
        self.denied.remove(name)
    }

    pub fn is_denied(&self, name: &str) -> bool {
        self.denied.contains(name)
    }

    /// Denied names in sorted order
    pub fn denied(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.denied.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn check(&self, name: &str) -> Result<(), EvalError> {
        if self.is_denied(name) {
            tracing::warn!(member = name, "blocked access to denylisted member");
            return Err(EvalError::Security {
                member: name.to_string(),
            });
        }
        Ok(())
    }
}
