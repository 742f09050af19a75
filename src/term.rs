use std::{
    collections::BTreeSet,
    fmt::Display,
};

use serde::{Deserialize, Serialize};

use crate::substitution::Substitution;

#[derive(PartialEq, Eq, Hash, Debug, Clone, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    Variable(char),
    Apply(String, Vec<Term>),
}

impl Term {
    pub fn constant(name: impl Into<String>) -> Self {
        Self::Apply(name.into(), vec![])
    }

    pub fn binary(operation: &str, left: Term, right: Term) -> Self {
        Self::Apply(operation.to_string(), vec![left, right])
    }

    /// Applies `operation` left-associatively, so `[x, y, z]` becomes `(xy)z`.
    /// Returns `None` for an empty list.
    pub fn left_fold<I: IntoIterator<Item = Term>>(operation: &str, terms: I) -> Option<Self> {
        let mut terms = terms.into_iter();
        let first = terms.next()?;
        Some(terms.fold(first, |left, right| Self::binary(operation, left, right)))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    pub fn substitute(&self, substitution: &Substitution) -> Self {
        match self {
            Term::Variable(v) => substitution
                .get(v)
                .cloned()
                .unwrap_or(Term::Variable(*v)),
            Term::Apply(name, arguments) => Term::Apply(
                name.clone(),
                arguments
                    .iter()
                    .map(|argument| argument.substitute(substitution))
                    .collect(),
            ),
        }
    }

    pub fn free_variables(&self) -> BTreeSet<char> {
        let mut variables = BTreeSet::new();
        self.collect_variables(&mut variables);
        variables
    }

    pub(crate) fn collect_variables(&self, variables: &mut BTreeSet<char>) {
        match self {
            Term::Variable(v) => {
                variables.insert(*v);
            }
            Term::Apply(_, arguments) => {
                for argument in arguments {
                    argument.collect_variables(variables);
                }
            }
        }
    }

    /// Function symbols with the arity they are used at. A symbol used at two
    /// arities appears once per arity.
    pub fn functions(&self) -> BTreeSet<(String, usize)> {
        let mut functions = BTreeSet::new();
        self.collect_functions(&mut functions);
        functions
    }

    pub(crate) fn collect_functions(&self, functions: &mut BTreeSet<(String, usize)>) {
        if let Term::Apply(name, arguments) = self {
            functions.insert((name.clone(), arguments.len()));
            for argument in arguments {
                argument.collect_functions(functions);
            }
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Term::Variable(_) => 1,
            Term::Apply(_, arguments) => 1 + arguments.iter().map(Term::size).sum::<usize>(),
        }
    }

    /// Displays applications of `operation` by juxtaposition, the way the
    /// algebra literature writes them.
    pub fn juxtaposed<'a>(&'a self, operation: &'a str) -> JuxtaposedDisplay<'a> {
        JuxtaposedDisplay {
            term: self,
            operation,
        }
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Variable(v) => write!(f, "{v}"),
            Term::Apply(name, arguments) if arguments.is_empty() => write!(f, "{name}"),
            Term::Apply(name, arguments) => {
                write!(f, "{name}(")?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{argument}")?;
                }
                write!(f, ")")
            }
        }
    }
}

pub struct JuxtaposedDisplay<'a> {
    term: &'a Term,
    operation: &'a str,
}

impl<'a> JuxtaposedDisplay<'a> {
    fn is_product(&self, term: &Term) -> bool {
        matches!(term, Term::Apply(name, arguments) if name == self.operation && arguments.len() == 2)
    }

    fn factor(&self, f: &mut std::fmt::Formatter<'_>, term: &'a Term) -> std::fmt::Result {
        let inner = JuxtaposedDisplay {
            term,
            operation: self.operation,
        };
        if self.is_product(term) {
            write!(f, "({inner})")
        } else {
            write!(f, "{inner}")
        }
    }
}

impl<'a> Display for JuxtaposedDisplay<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.term {
            Term::Apply(name, arguments) if name == self.operation && arguments.len() == 2 => {
                self.factor(f, &arguments[0])?;
                self.factor(f, &arguments[1])
            }
            Term::Apply(name, arguments) if !arguments.is_empty() => {
                write!(f, "{name}(")?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", argument.juxtaposed(self.operation))?;
                }
                write!(f, ")")
            }
            term => write!(f, "{term}"),
        }
    }
}
