//! Candidate model identifiers.
//!
//! The resolver only knows its configured ordering. Model unavailability is a
//! property of the credential/model pairing, so nothing learned on one
//! credential carries over to the next.

use serde::{Deserialize, Serialize};

/// A model identifier with its priority (lower is tried first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCandidate {
    pub name: String,
    pub priority: u32,
}

impl ModelCandidate {
    pub fn new(name: impl Into<String>, priority: u32) -> Self {
        Self {
            name: name.into(),
            priority,
        }
    }
}

/// Immutable, ordered list of candidate models.
#[derive(Debug, Clone)]
pub struct ModelResolver {
    candidates: Vec<ModelCandidate>,
}

impl ModelResolver {
    /// Order candidates by priority; ties keep their configured order.
    pub fn new(mut candidates: Vec<ModelCandidate>) -> Self {
        candidates.sort_by_key(|c| c.priority);
        Self { candidates }
    }

    /// Candidates to try, in sequence, for one credential attempt.
    pub fn candidates(&self) -> &[ModelCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_by_priority() {
        let resolver = ModelResolver::new(vec![
            ModelCandidate::new("pro", 2),
            ModelCandidate::new("flash", 0),
            ModelCandidate::new("lite", 1),
        ]);
        let names: Vec<&str> = resolver.candidates().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["flash", "lite", "pro"]);
    }

    #[test]
    fn test_ties_keep_configured_order() {
        let resolver = ModelResolver::new(vec![
            ModelCandidate::new("b", 1),
            ModelCandidate::new("a", 1),
            ModelCandidate::new("first", 0),
        ]);
        let names: Vec<&str> = resolver.candidates().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["first", "b", "a"]);
        assert_eq!(resolver.len(), 3);
    }
}
