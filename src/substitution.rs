use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::term::Term;

#[derive(PartialEq, Eq, Clone, Debug, Serialize, Deserialize)]
pub struct Substitution(BTreeMap<char, Term>);

impl Substitution {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, variable: &char) -> Option<&Term> {
        self.0.get(variable)
    }

    /// Maps every variable to a constant named by its capital letter. This
    /// is how the universal variables of a conclusion are skolemized.
    /// Parsed function names are lowercase, so the constants never clash
    /// with them.
    pub fn skolemizing<I: IntoIterator<Item = char>>(variables: I) -> Self {
        variables
            .into_iter()
            .map(|v| (v, Term::constant(v.to_ascii_uppercase().to_string())))
            .collect()
    }

    pub fn compose(mut self, other: Self) -> Self {
        for term in self.0.values_mut() {
            *term = term.substitute(&other);
        }
        for (v, t) in other.0 {
            self.0.entry(v).or_insert(t);
        }
        self
    }
}

impl Default for Substitution {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<(char, Term)> for Substitution {
    fn from_iter<T: IntoIterator<Item = (char, Term)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<(char, Term)> for Substitution {
    fn extend<T: IntoIterator<Item = (char, Term)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.0.insert(k, v);
        }
    }
}
