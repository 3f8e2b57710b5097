//! Concurrent cache of compiled expressions keyed by their exact source text.

use dashmap::DashMap;

use crate::compiled::CompiledExpression;

/// Shares compilations between every caller that parses the same source.
///
/// Lookups and inserts are lock-free from the caller's point of view. Two threads
/// missing on the same source may both compile it; the first insert wins and the
/// other compilation is dropped, so every caller ends up with the same handle.
#[derive(Default)]
pub struct ExpressionCache {
    entries: DashMap<String, CompiledExpression>,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: &str) -> Option<CompiledExpression> {
        self.entries.get(source).map(|entry| entry.value().clone())
    }

    /// Returns the cached compilation of `source`, running `compile` on a miss.
    ///
    /// `compile` runs without any lock held; failures are not cached.
    pub fn get_or_try_insert_with<E>(
        &self,
        source: &str,
        compile: impl FnOnce() -> Result<CompiledExpression, E>,
    ) -> Result<CompiledExpression, E> {
        // Fast path: already compiled
        if let Some(hit) = self.get(source) {
            tracing::trace!(source, "expression cache hit");
            return Ok(hit);
        }

        let compiled = compile()?;
        let entry = self.entries.entry(source.to_string()).or_insert(compiled);
        Ok(entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl std::fmt::Debug for ExpressionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionCache")
            .field("len", &self.len())
            .finish()
    }
}
