use std::{collections::BTreeMap, fmt::Display};

use genawaiter::rc::Gen;
use serde::{Deserialize, Serialize};

use crate::{
    formula::{Axiom, Formula},
    term::Term,
};

/// The interpretation of one function symbol. `values` is indexed by the
/// arguments read as a number in base `domain_size`, first argument most
/// significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionTable {
    pub arity: usize,
    pub values: Vec<usize>,
}

/// A finite structure over the domain `0..domain_size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub domain_size: usize,
    pub constants: BTreeMap<String, usize>,
    pub functions: BTreeMap<String, FunctionTable>,
}

fn table_index(domain_size: usize, arguments: &[usize]) -> usize {
    arguments
        .iter()
        .fold(0, |index, argument| index * domain_size + argument)
}

impl Model {
    pub fn apply(&self, name: &str, arguments: &[usize]) -> Option<usize> {
        if arguments.is_empty() {
            return self.constants.get(name).copied();
        }
        let table = self.functions.get(name)?;
        if table.arity != arguments.len() || arguments.iter().any(|&a| a >= self.domain_size) {
            return None;
        }
        table
            .values
            .get(table_index(self.domain_size, arguments))
            .copied()
    }

    /// The value of `term`, or `None` if it uses a symbol or variable the
    /// model or `assignment` does not interpret.
    pub fn evaluate(&self, term: &Term, assignment: &BTreeMap<char, usize>) -> Option<usize> {
        match term {
            Term::Variable(v) => assignment.get(v).copied(),
            Term::Apply(name, arguments) => {
                let arguments = arguments
                    .iter()
                    .map(|argument| self.evaluate(argument, assignment))
                    .collect::<Option<Vec<_>>>()?;
                self.apply(name, &arguments)
            }
        }
    }

    pub fn holds(&self, formula: &Formula, assignment: &BTreeMap<char, usize>) -> Option<bool> {
        Some(match formula {
            Formula::Equal(left, right) => {
                self.evaluate(left, assignment)? == self.evaluate(right, assignment)?
            }
            Formula::Not(inner) => !self.holds(inner, assignment)?,
            Formula::And(formulas) => {
                for formula in formulas {
                    if !self.holds(formula, assignment)? {
                        return Some(false);
                    }
                }
                true
            }
            Formula::Or(formulas) => {
                for formula in formulas {
                    if self.holds(formula, assignment)? {
                        return Some(true);
                    }
                }
                false
            }
            Formula::Implies(premise, conclusion) => {
                !self.holds(premise, assignment)? || self.holds(conclusion, assignment)?
            }
        })
    }

    /// Whether the axiom holds for every assignment of its variables.
    pub fn satisfies(&self, axiom: &Axiom) -> Option<bool> {
        let variables: Vec<char> = axiom.variables().into_iter().collect();
        for values in assignments(variables.len(), self.domain_size) {
            let assignment = variables.iter().copied().zip(values).collect();
            if !self.holds(&axiom.formula, &assignment)? {
                return Some(false);
            }
        }
        Some(true)
    }
}

/// All tuples in `0..size` of the given length, in lexicographic order.
pub(crate) fn assignments(length: usize, size: usize) -> impl Iterator<Item = Vec<usize>> {
    Gen::new(move |co| async move {
        if size == 0 && length > 0 {
            return;
        }
        let mut values = vec![0; length];
        loop {
            co.yield_(values.clone()).await;
            let Some(position) = values.iter().rposition(|&v| v + 1 < size) else {
                return;
            };
            values[position] += 1;
            for value in &mut values[position + 1..] {
                *value = 0;
            }
        }
    })
    .into_iter()
}

impl Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "domain: 0..{}", self.domain_size)?;
        for (name, value) in &self.constants {
            writeln!(f, "{name} = {value}")?;
        }
        let width = self.domain_size.saturating_sub(1).to_string().len();
        for (name, table) in &self.functions {
            if table.arity == 2 {
                write!(f, "{name:>width$} |")?;
                for column in 0..self.domain_size {
                    write!(f, " {column:>width$}")?;
                }
                writeln!(f)?;
                writeln!(f, "{}", "-".repeat((width + 1) * (self.domain_size + 1) + 1))?;
                for row in 0..self.domain_size {
                    write!(f, "{row:>width$} |")?;
                    for column in 0..self.domain_size {
                        let value = table.values[table_index(self.domain_size, &[row, column])];
                        write!(f, " {value:>width$}")?;
                    }
                    writeln!(f)?;
                }
            } else {
                for arguments in assignments(table.arity, self.domain_size) {
                    let value = table.values[table_index(self.domain_size, &arguments)];
                    let arguments: Vec<String> = arguments.iter().map(usize::to_string).collect();
                    writeln!(f, "{name}({}) = {value}", arguments.join(", "))?;
                }
            }
        }
        Ok(())
    }
}
