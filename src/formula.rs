use std::{collections::BTreeSet, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::{substitution::Substitution, term::Term};

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub enum Formula {
    Equal(Term, Term),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Implies(Box<Formula>, Box<Formula>),
}

impl Formula {
    pub fn equal(left: Term, right: Term) -> Self {
        Self::Equal(left, right)
    }

    pub fn not_equal(left: Term, right: Term) -> Self {
        Self::Not(Self::Equal(left, right).into())
    }

    pub fn negate(self) -> Self {
        match self {
            Formula::Not(inner) => *inner,
            formula => Formula::Not(formula.into()),
        }
    }

    pub fn free_variables(&self) -> BTreeSet<char> {
        let mut variables = BTreeSet::new();
        self.for_each_term(&mut |term| term.collect_variables(&mut variables));
        variables
    }

    pub fn functions(&self) -> BTreeSet<(String, usize)> {
        let mut functions = BTreeSet::new();
        self.for_each_term(&mut |term| term.collect_functions(&mut functions));
        functions
    }

    pub(crate) fn for_each_term<'a, F: FnMut(&'a Term)>(&'a self, f: &mut F) {
        match self {
            Formula::Equal(left, right) => {
                f(left);
                f(right);
            }
            Formula::Not(inner) => inner.for_each_term(f),
            Formula::And(formulas) | Formula::Or(formulas) => {
                for formula in formulas {
                    formula.for_each_term(f);
                }
            }
            Formula::Implies(premise, conclusion) => {
                premise.for_each_term(f);
                conclusion.for_each_term(f);
            }
        }
    }

    pub fn substitute(&self, substitution: &Substitution) -> Self {
        match self {
            Formula::Equal(left, right) => Formula::Equal(
                left.substitute(substitution),
                right.substitute(substitution),
            ),
            Formula::Not(inner) => Formula::Not(inner.substitute(substitution).into()),
            Formula::And(formulas) => Formula::And(
                formulas
                    .iter()
                    .map(|formula| formula.substitute(substitution))
                    .collect(),
            ),
            Formula::Or(formulas) => Formula::Or(
                formulas
                    .iter()
                    .map(|formula| formula.substitute(substitution))
                    .collect(),
            ),
            Formula::Implies(premise, conclusion) => Formula::Implies(
                premise.substitute(substitution).into(),
                conclusion.substitute(substitution).into(),
            ),
        }
    }

    pub fn juxtaposed<'a>(&'a self, operation: &'a str) -> FormulaDisplay<'a> {
        FormulaDisplay {
            formula: self,
            operation: Some(operation),
        }
    }
}

impl Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        FormulaDisplay {
            formula: self,
            operation: None,
        }
        .fmt(f)
    }
}

pub struct FormulaDisplay<'a> {
    formula: &'a Formula,
    operation: Option<&'a str>,
}

impl<'a> FormulaDisplay<'a> {
    fn term(&self, f: &mut std::fmt::Formatter<'_>, term: &Term) -> std::fmt::Result {
        match self.operation {
            Some(operation) => write!(f, "{}", term.juxtaposed(operation)),
            None => write!(f, "{term}"),
        }
    }

    fn nested(&self, f: &mut std::fmt::Formatter<'_>, formula: &'a Formula) -> std::fmt::Result {
        let inner = FormulaDisplay {
            formula,
            operation: self.operation,
        };
        match formula {
            Formula::Equal(..) | Formula::Not(_) => write!(f, "{inner}"),
            _ => write!(f, "({inner})"),
        }
    }

    fn joined(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        formulas: &'a [Formula],
        separator: &str,
        empty: &str,
    ) -> std::fmt::Result {
        if formulas.is_empty() {
            return write!(f, "{empty}");
        }
        for (i, formula) in formulas.iter().enumerate() {
            if i > 0 {
                write!(f, " {separator} ")?;
            }
            self.nested(f, formula)?;
        }
        Ok(())
    }
}

impl<'a> Display for FormulaDisplay<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.formula {
            Formula::Equal(left, right) => {
                self.term(f, left)?;
                write!(f, " = ")?;
                self.term(f, right)
            }
            Formula::Not(inner) => match inner.as_ref() {
                Formula::Equal(left, right) => {
                    self.term(f, left)?;
                    write!(f, " != ")?;
                    self.term(f, right)
                }
                inner => {
                    write!(f, "!")?;
                    self.nested(f, inner)
                }
            },
            Formula::And(formulas) => self.joined(f, formulas, "&", "true"),
            Formula::Or(formulas) => self.joined(f, formulas, "|", "false"),
            Formula::Implies(premise, conclusion) => {
                self.nested(f, premise)?;
                write!(f, " -> ")?;
                self.nested(f, conclusion)
            }
        }
    }
}

/// The universal closure of a formula over its free variables.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Axiom {
    pub name: String,
    pub formula: Formula,
}

impl Axiom {
    pub fn new(name: impl Into<String>, formula: Formula) -> Self {
        Self {
            name: name.into(),
            formula,
        }
    }

    pub fn variables(&self) -> BTreeSet<char> {
        self.formula.free_variables()
    }

    /// The ground negation `¬φ[x := X, ...]` whose satisfiability refutes
    /// `∀x... φ`.
    pub fn skolemized_negation(&self) -> Axiom {
        let substitution = Substitution::skolemizing(self.variables());
        Axiom {
            name: format!("not {}", self.name),
            formula: self.formula.substitute(&substitution).negate(),
        }
    }

    pub fn juxtaposed<'a>(&'a self, operation: &'a str) -> AxiomDisplay<'a> {
        AxiomDisplay {
            axiom: self,
            operation,
        }
    }
}

pub struct AxiomDisplay<'a> {
    axiom: &'a Axiom,
    operation: &'a str,
}

impl<'a> Display for AxiomDisplay<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.axiom.name,
            self.axiom.formula.juxtaposed(self.operation)
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn x() -> Term {
        Term::Variable('x')
    }

    fn y() -> Term {
        Term::Variable('y')
    }

    fn xy() -> Term {
        Term::binary("p", x(), y())
    }

    fn yx() -> Term {
        Term::binary("p", y(), x())
    }

    fn anti_symmetry() -> Formula {
        Formula::Implies(
            Formula::And(vec![Formula::equal(xy(), y()), Formula::equal(yx(), x())]).into(),
            Formula::equal(x(), y()).into(),
        )
    }

    #[test]
    fn display_in_juxtaposition() {
        assert_eq!(
            anti_symmetry().juxtaposed("p").to_string(),
            "(xy = y & yx = x) -> x = y"
        );
        assert_eq!(
            Formula::not_equal(x(), y()).to_string(),
            "x != y"
        );
    }

    #[test]
    fn skolemized_negation_is_ground() {
        let axiom = Axiom::new("anti-symmetry", anti_symmetry());
        let negation = axiom.skolemized_negation();
        assert!(negation.variables().is_empty());
        assert_eq!(negation.name, "not anti-symmetry");
        assert_eq!(axiom.variables().into_iter().collect::<Vec<_>>(), vec!['x', 'y']);
    }
}
