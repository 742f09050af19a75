use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{error::Result, formula::Axiom, parse::parse_formula};

/// Named axioms over one binary operation written by juxtaposition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theory {
    pub name: String,
    pub operation: String,
    pub axioms: Vec<Axiom>,
}

const OPERATION: &str = "p";

fn axiom(name: &str, text: &str) -> Result<Axiom> {
    Ok(Axiom::new(name, parse_formula(text, OPERATION)?))
}

/// (5) `(xy)y ≤ xy`, with `a ≤ b` read as `ab = b`.
pub fn right_absorption() -> Result<Axiom> {
    axiom("(5) right absorption", "((xy)y)(xy) = xy")
}

/// (7) `(xy)(xz) = (xy)z`.
pub fn flattening() -> Result<Axiom> {
    axiom("(7) flattening", "(xy)(xz) = (xy)z")
}

/// (9) `(((xy)x)(xy))x ≤ ((xy)x)x`.
pub fn weak_closure_stability() -> Result<Axiom> {
    axiom(
        "(9) weak closure stability",
        "((((xy)x)(xy))x)(((xy)x)x) = ((xy)x)x",
    )
}

/// `x ≤ y` and `y ≤ x` imply `x = y`.
pub fn anti_symmetry() -> Result<Axiom> {
    axiom("anti-symmetry", "xy = y & yx = x -> x = y")
}

/// `y ≤ xy`. Not a consequence of the other axioms, the left projection
/// `xy = x` violates it.
pub fn k() -> Result<Axiom> {
    axiom("K", "y(xy) = xy")
}

/// The equational form of t-antisymmetry.
pub fn t_antisymmetry() -> Result<Axiom> {
    axiom("t-antisymmetry", "(xy)x = ((xy)x)y")
}

/// Cornish J, `(xy)x = (yx)y`.
pub fn cornish_j() -> Result<Axiom> {
    axiom("Cornish J", "(xy)x = (yx)y")
}

/// The two identities checked by the binary.
pub fn conclusions() -> Result<Vec<Axiom>> {
    Ok(vec![t_antisymmetry()?, cornish_j()?])
}

impl Theory {
    pub fn new(name: impl Into<String>, axioms: Vec<Axiom>) -> Self {
        Self {
            name: name.into(),
            operation: OPERATION.to_string(),
            axioms,
        }
    }

    /// Weak relative closure terms: (5), (7) and (9).
    pub fn weak_relative_closure() -> Result<Self> {
        Ok(Self::new(
            "weak relative closure",
            vec![right_absorption()?, flattening()?, weak_closure_stability()?],
        ))
    }

    /// Weak relative closure with the anti-symmetry quasi-identity.
    pub fn anti_symmetric_weak_relative_closure() -> Result<Self> {
        let mut theory = Self::weak_relative_closure()?;
        theory.name = "anti-symmetric weak relative closure".to_string();
        theory.axioms.push(anti_symmetry()?);
        Ok(theory)
    }

    /// The same theory with K added.
    pub fn with_k(mut self) -> Result<Self> {
        self.name = format!("{} with K", self.name);
        self.axioms.push(k()?);
        Ok(self)
    }

    /// Function symbols with their arities.
    pub fn functions(&self) -> BTreeSet<(String, usize)> {
        self.axioms
            .iter()
            .flat_map(|axiom| axiom.formula.functions())
            .collect()
    }
}
