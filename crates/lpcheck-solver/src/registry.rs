use std::collections::HashMap;

use crate::state::StateError;

/// A registered variable: its dense index and display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variable<'a> {
    pub index: usize,
    pub name: &'a str,
}

/// Maps variable names to dense indices in first-use order.
///
/// Index 0 is the constant slot of every coefficient vector and is held by an
/// empty sentinel name; user variables start at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRegistry {
    names: Vec<String>,
    indices: HashMap<String, usize>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self {
            names: vec![String::new()],
            indices: HashMap::new(),
        }
    }

    /// Rebuild a registry from an ordered name list whose first entry is the
    /// empty sentinel.
    pub fn from_names(names: Vec<String>) -> Result<Self, StateError> {
        match names.first() {
            Some(sentinel) if sentinel.is_empty() => {}
            Some(sentinel) => return Err(StateError::InvalidSentinel(sentinel.clone())),
            None => return Err(StateError::InvalidSentinel(String::new())),
        }

        let mut indices = HashMap::with_capacity(names.len());
        for (index, name) in names.iter().enumerate().skip(1) {
            if name.is_empty() {
                return Err(StateError::EmptyVariableName(index));
            }
            if indices.insert(name.clone(), index).is_some() {
                return Err(StateError::DuplicateVariable(name.clone()));
            }
        }

        Ok(Self { names, indices })
    }

    pub fn register_or_lookup(&mut self, name: &str) -> usize {
        if let Some(&index) = self.indices.get(name) {
            return index;
        }
        let index = self.names.len();
        self.names.push(name.to_string());
        self.indices.insert(name.to_string(), index);
        index
    }

    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    /// Name of a user variable. The sentinel (index 0) has no name.
    pub fn name(&self, index: usize) -> Option<&str> {
        if index == 0 {
            return None;
        }
        self.names.get(index).map(String::as_str)
    }

    /// Number of slots including the sentinel, i.e. the longest valid
    /// coefficient vector.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_variables() == 0
    }

    pub fn num_variables(&self) -> usize {
        self.names.len() - 1
    }

    /// All names, sentinel first.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn variables(&self) -> impl Iterator<Item = Variable<'_>> {
        self.names
            .iter()
            .enumerate()
            .skip(1)
            .map(|(index, name)| Variable { index, name })
    }
}

impl Default for VariableRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_use_order() {
        let mut registry = VariableRegistry::new();
        assert_eq!(registry.register_or_lookup("y"), 1);
        assert_eq!(registry.register_or_lookup("x"), 2);
        assert_eq!(registry.register_or_lookup("y"), 1);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.num_variables(), 2);
        assert_eq!(registry.name(2), Some("x"));
        assert_eq!(registry.lookup("z"), None);
    }

    #[test]
    fn test_sentinel_is_never_a_variable() {
        let mut registry = VariableRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.name(0), None);
        registry.register_or_lookup("a");
        let names: Vec<_> = registry.variables().map(|v| v.name).collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn test_from_names() {
        let registry =
            VariableRegistry::from_names(vec![String::new(), "x".into(), "y".into()]).unwrap();
        assert_eq!(registry.lookup("y"), Some(2));
    }

    #[test]
    fn test_from_names_rejects_bad_lists() {
        assert!(matches!(
            VariableRegistry::from_names(vec!["x".into()]),
            Err(StateError::InvalidSentinel(_))
        ));
        assert!(matches!(
            VariableRegistry::from_names(vec![]),
            Err(StateError::InvalidSentinel(_))
        ));
        assert!(matches!(
            VariableRegistry::from_names(vec![String::new(), "x".into(), "x".into()]),
            Err(StateError::DuplicateVariable(name)) if name == "x"
        ));
        assert!(matches!(
            VariableRegistry::from_names(vec![String::new(), String::new()]),
            Err(StateError::EmptyVariableName(1))
        ));
    }
}
