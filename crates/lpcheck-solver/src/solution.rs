use std::fmt;

use indexmap::IndexMap;

use crate::rational::Rational;

/// Outcome of a feasibility check
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "status", content = "model", rename_all = "lowercase")
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LpResult {
    /// The constraints are satisfiable; the model is one witness
    Feasible(Model),
    /// No assignment satisfies every constraint
    Infeasible,
}

impl LpResult {
    pub fn is_feasible(&self) -> bool {
        matches!(self, LpResult::Feasible(_))
    }

    pub fn model(&self) -> Option<&Model> {
        match self {
            LpResult::Feasible(model) => Some(model),
            LpResult::Infeasible => None,
        }
    }

    pub fn into_model(self) -> Option<Model> {
        match self {
            LpResult::Feasible(model) => Some(model),
            LpResult::Infeasible => None,
        }
    }
}

/// Variable name to value, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    values: IndexMap<String, Rational>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Rational) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Rational> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rational)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, Rational)> for Model {
    fn from_iter<I: IntoIterator<Item = (String, Rational)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.values {
            writeln!(f, "{name} = {value}")?;
        }
        Ok(())
    }
}

// Rationals go out as "n" or "n/d" strings so JSON consumers never see a
// float or a bigint digit array.
#[cfg(feature = "serde")]
impl serde::Serialize for Model {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, &value.to_string())?;
        }
        map.end()
    }
}
