use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    iter,
};

use easy_smt::{Context, ContextBuilder, Response, SExpr};
use snafu::ResultExt;
use tracing::{debug, info};

use crate::{
    config::CheckConfig,
    error::{
        ArityMismatchSnafu, ConflictingDeclarationSnafu, PopWithoutPushSnafu, Result,
        SolverProcessSnafu, UndeclaredFunctionSnafu,
    },
    formula::{Axiom, Formula},
    log::measure,
    model::{assignments, FunctionTable, Model},
    term::Term,
    timeout::Deadline,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatResult {
    /// The assertions have no model.
    Unsat,
    /// The assertions have a model, see [`Solver::model`].
    Sat,
    /// The solver gave up.
    Unknown(String),
}

/// The uninterpreted sort every function symbol ranges over.
const SORT: &str = "U";

/// Scoped declarations and assertions over one uninterpreted sort, decided
/// by an SMT solver process.
///
/// Declarations, assertions and scopes are sent to the solver as they are
/// made. An inconclusive [`Solver::check`] falls back to looking for small
/// models, each size in a fresh process whose domain is closed over that
/// many constants.
pub struct Solver {
    config: CheckConfig,
    context: Context,
    declarations: Vec<(String, usize)>,
    assertions: Vec<Axiom>,
    scopes: Vec<(usize, usize)>,
    model: Option<Model>,
}

fn start(config: &CheckConfig) -> Result<Context> {
    let mut context = ContextBuilder::new()
        .solver(config.solver.clone(), config.solver_args.clone())
        .build()
        .context(SolverProcessSnafu)?;
    let timeout = context.atom(config.timeout_ms.to_string());
    context
        .set_option(":timeout", timeout)
        .context(SolverProcessSnafu)?;
    context.declare_sort(SORT, 0).context(SolverProcessSnafu)?;
    Ok(context)
}

fn declare(context: &mut Context, name: &str, arity: usize) -> Result<SExpr> {
    let sort = context.atom(SORT);
    context
        .declare_fun(name, vec![sort; arity], sort)
        .context(SolverProcessSnafu)
}

/// Bound variables get a prefix so that a variable never shadows a function
/// of the same letter.
fn bound(variable: char) -> String {
    format!("?{variable}")
}

fn encode_term(context: &Context, term: &Term) -> SExpr {
    match term {
        Term::Variable(v) => context.atom(bound(*v)),
        Term::Apply(name, arguments) if arguments.is_empty() => context.atom(name),
        Term::Apply(name, arguments) => context.list(
            iter::once(context.atom(name))
                .chain(arguments.iter().map(|argument| encode_term(context, argument)))
                .collect(),
        ),
    }
}

fn join(context: &Context, connective: &str, empty: &str, mut operands: Vec<SExpr>) -> SExpr {
    match operands.len() {
        0 => context.atom(empty),
        1 => operands.remove(0),
        _ => context.list(iter::once(context.atom(connective)).chain(operands).collect()),
    }
}

fn encode_formula(context: &Context, formula: &Formula) -> SExpr {
    let all = |formulas: &[Formula]| {
        formulas
            .iter()
            .map(|formula| encode_formula(context, formula))
            .collect::<Vec<_>>()
    };
    match formula {
        Formula::Equal(left, right) => {
            context.eq(encode_term(context, left), encode_term(context, right))
        }
        Formula::Not(inner) => context.not(encode_formula(context, inner)),
        Formula::And(formulas) => join(context, "and", "true", all(formulas)),
        Formula::Or(formulas) => join(context, "or", "false", all(formulas)),
        Formula::Implies(premise, conclusion) => context.list(vec![
            context.atom("=>"),
            encode_formula(context, premise),
            encode_formula(context, conclusion),
        ]),
    }
}

/// Instantiation patterns for the universal closure of `formula`.
///
/// Each side of an equation that mentions every variable is a pattern of
/// its own, so the equation is used in both directions. Otherwise the
/// applications on all equation sides form one multi-pattern.
fn triggers<'a>(formula: &'a Formula, variables: &BTreeSet<char>) -> Vec<Vec<&'a Term>> {
    let covers = |terms: &[&Term]| {
        let mut seen = BTreeSet::new();
        for term in terms {
            term.collect_variables(&mut seen);
        }
        seen == *variables
    };
    if let Formula::Equal(left, right) = formula {
        let sides: Vec<Vec<&Term>> = [left, right]
            .into_iter()
            .filter(|side| !side.is_variable() && covers(&[*side]))
            .map(|side| vec![side])
            .collect();
        if !sides.is_empty() {
            return sides;
        }
    }
    let mut sides: Vec<&Term> = vec![];
    formula.for_each_term(&mut |term| {
        if !term.is_variable() && !term.free_variables().is_empty() && !sides.contains(&term) {
            sides.push(term);
        }
    });
    if !sides.is_empty() && covers(&sides) {
        vec![sides]
    } else {
        vec![]
    }
}

fn encode_axiom(context: &Context, axiom: &Axiom, with_triggers: bool) -> SExpr {
    let variables = axiom.variables();
    let mut body = encode_formula(context, &axiom.formula);
    if variables.is_empty() {
        return body;
    }
    let patterns = if with_triggers {
        triggers(&axiom.formula, &variables)
    } else {
        vec![]
    };
    if !patterns.is_empty() {
        let mut annotated = vec![context.atom("!"), body];
        for pattern in patterns {
            annotated.push(context.atom(":pattern"));
            annotated.push(
                context.list(
                    pattern
                        .into_iter()
                        .map(|term| encode_term(context, term))
                        .collect(),
                ),
            );
        }
        body = context.list(annotated);
    }
    context.forall(
        variables
            .into_iter()
            .map(|v| (bound(v), context.atom(SORT))),
        body,
    )
}

/// Domain elements as the solver reported them, each with a ground term
/// that denotes it.
#[derive(Default)]
struct Elements {
    indices: HashMap<String, usize>,
    representatives: Vec<SExpr>,
}

impl Elements {
    fn intern(&mut self, context: &Context, term: SExpr, value: SExpr) -> usize {
        let next = self.representatives.len();
        *self
            .indices
            .entry(context.display(value).to_string())
            .or_insert_with(|| {
                self.representatives.push(term);
                next
            })
    }
}

/// Reads back the part of the solver's model generated by the declared
/// constants and `seeds`. Gives `None` for an empty or too large domain.
fn read_model(
    context: &mut Context,
    declarations: &[(String, usize)],
    seeds: &[SExpr],
    max_size: usize,
) -> Result<Option<Model>> {
    let constants: Vec<&str> = declarations
        .iter()
        .filter(|(_, arity)| *arity == 0)
        .map(|(name, _)| name.as_str())
        .collect();
    let functions: Vec<(&str, usize)> = declarations
        .iter()
        .filter(|(_, arity)| *arity > 0)
        .map(|(name, arity)| (name.as_str(), *arity))
        .collect();

    let mut queries: Vec<SExpr> = constants.iter().map(|name| context.atom(*name)).collect();
    queries.extend_from_slice(seeds);
    if queries.is_empty() {
        return Ok(None);
    }
    let mut elements = Elements::default();
    let mut named = BTreeMap::new();
    let answers = context.get_value(queries).context(SolverProcessSnafu)?;
    for (i, (term, value)) in answers.into_iter().enumerate() {
        let element = elements.intern(context, term, value);
        if let Some(name) = constants.get(i) {
            named.insert(name.to_string(), element);
        }
    }

    let mut values: BTreeMap<(&str, Vec<usize>), usize> = BTreeMap::new();
    loop {
        let size = elements.representatives.len();
        if size > max_size {
            debug!(size, max_size, "model too large to read");
            return Ok(None);
        }
        let pending: Vec<(&str, Vec<usize>)> = functions
            .iter()
            .flat_map(|&(name, arity)| assignments(arity, size).map(move |tuple| (name, tuple)))
            .filter(|key| !values.contains_key(key))
            .collect();
        if pending.is_empty() {
            break;
        }
        let queries = pending
            .iter()
            .map(|(name, tuple)| {
                context.list(
                    iter::once(context.atom(*name))
                        .chain(tuple.iter().map(|&element| elements.representatives[element]))
                        .collect(),
                )
            })
            .collect();
        let answers = context.get_value(queries).context(SolverProcessSnafu)?;
        for (key, (term, value)) in pending.into_iter().zip(answers) {
            values.insert(key, elements.intern(context, term, value));
        }
    }

    let domain_size = elements.representatives.len();
    let mut tables = BTreeMap::new();
    for &(name, arity) in &functions {
        let Some(table) = assignments(arity, domain_size)
            .map(|tuple| values.get(&(name, tuple)).copied())
            .collect::<Option<Vec<_>>>()
        else {
            return Ok(None);
        };
        tables.insert(
            name.to_string(),
            FunctionTable {
                arity,
                values: table,
            },
        );
    }
    Ok(Some(Model {
        domain_size,
        constants: named,
        functions: tables,
    }))
}

impl Solver {
    /// Starts the configured solver process.
    pub fn new(config: CheckConfig) -> Result<Self> {
        let context = start(&config)?;
        Ok(Self {
            config,
            context,
            declarations: vec![],
            assertions: vec![],
            scopes: vec![],
            model: None,
        })
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    fn arity_of(&self, name: &str) -> Option<usize> {
        self.declarations
            .iter()
            .find(|(declared, _)| declared == name)
            .map(|&(_, arity)| arity)
    }

    /// Declares `name` as a function `U^arity -> U`. Declaring it again with
    /// the same arity does nothing.
    pub fn declare_function(&mut self, name: &str, arity: usize) -> Result<()> {
        match self.arity_of(name) {
            Some(declared) if declared == arity => Ok(()),
            Some(declared) => ConflictingDeclarationSnafu {
                name,
                arity: declared,
            }
            .fail(),
            None => {
                declare(&mut self.context, name, arity)?;
                self.declarations.push((name.to_string(), arity));
                Ok(())
            }
        }
    }

    /// Declares every function symbol that occurs in `axiom`.
    pub fn declare_signature_of(&mut self, axiom: &Axiom) -> Result<()> {
        for (name, arity) in axiom.formula.functions() {
            self.declare_function(&name, arity)?;
        }
        Ok(())
    }

    pub fn assert(&mut self, axiom: Axiom) -> Result<()> {
        for (name, actual) in axiom.formula.functions() {
            match self.arity_of(&name) {
                None => return UndeclaredFunctionSnafu { name }.fail(),
                Some(expected) if expected != actual => {
                    return ArityMismatchSnafu {
                        name,
                        expected,
                        actual,
                    }
                    .fail()
                }
                Some(_) => {}
            }
        }
        let expression = encode_axiom(&self.context, &axiom, true);
        self.context
            .assert(expression)
            .context(SolverProcessSnafu)?;
        self.assertions.push(axiom);
        Ok(())
    }

    pub fn assertions(&self) -> &[Axiom] {
        &self.assertions
    }

    pub fn push(&mut self) -> Result<()> {
        self.context.push().context(SolverProcessSnafu)?;
        self.scopes
            .push((self.declarations.len(), self.assertions.len()));
        Ok(())
    }

    /// Drops the declarations and assertions made since the matching
    /// [`Solver::push`].
    pub fn pop(&mut self) -> Result<()> {
        let Some((declarations, assertions)) = self.scopes.pop() else {
            return PopWithoutPushSnafu.fail();
        };
        self.context.pop().context(SolverProcessSnafu)?;
        self.declarations.truncate(declarations);
        self.assertions.truncate(assertions);
        self.model = None;
        Ok(())
    }

    /// Decides whether the current assertions have a model.
    pub fn check(&mut self) -> Result<SatResult> {
        self.model = None;
        debug!(
            declarations = self.declarations.len(),
            assertions = self.assertions.len(),
            "checking"
        );
        let deadline = Deadline::after(self.config.timeout());
        let response = measure!(self.context.check()).context(SolverProcessSnafu)?;
        let reason = match response {
            Response::Unsat => return Ok(SatResult::Unsat),
            Response::Sat => {
                self.model = read_model(
                    &mut self.context,
                    &self.declarations,
                    &[],
                    self.config.max_model_size,
                )?;
                return Ok(SatResult::Sat);
            }
            Response::Unknown if deadline.expired() => "timeout".to_string(),
            Response::Unknown => "incomplete quantifier instantiation".to_string(),
        };
        debug!(%reason, "no answer without a domain bound");

        let max_domain_size = self.config.max_domain_size;
        for size in 1..=max_domain_size {
            match measure!(self.check_bounded(size))? {
                Response::Sat => {
                    info!(size, "found model");
                    return Ok(SatResult::Sat);
                }
                Response::Unsat => debug!(size, "no model"),
                Response::Unknown => {
                    return Ok(SatResult::Unknown(format!(
                        "{reason}, no answer for models with {size} elements"
                    )))
                }
            }
        }
        Ok(SatResult::Unknown(if max_domain_size == 0 {
            reason
        } else {
            format!("{reason}, no model with at most {max_domain_size} elements")
        }))
    }

    /// Looks for a model with at most `size` elements. Patterns would keep
    /// the solver from enumerating a finite domain, so the assertions are
    /// sent without them.
    fn check_bounded(&mut self, size: usize) -> Result<Response> {
        let mut context = start(&self.config)?;
        for (name, arity) in &self.declarations {
            declare(&mut context, name, *arity)?;
        }
        let elements = (0..size)
            .map(|i| declare(&mut context, &format!("element!{i}"), 0))
            .collect::<Result<Vec<_>>>()?;
        let element = context.atom("?element");
        let cases = elements
            .iter()
            .map(|&constant| context.eq(element, constant))
            .collect();
        let closed = context.forall(
            [("?element", context.atom(SORT))],
            join(&context, "or", "false", cases),
        );
        context.assert(closed).context(SolverProcessSnafu)?;
        for axiom in &self.assertions {
            let expression = encode_axiom(&context, axiom, false);
            context.assert(expression).context(SolverProcessSnafu)?;
        }

        let response = context.check().context(SolverProcessSnafu)?;
        if let Response::Sat = response {
            self.model = read_model(
                &mut context,
                &self.declarations,
                &elements,
                self.config.max_model_size,
            )?;
        }
        Ok(response)
    }

    /// The model of the last [`Solver::check`] that returned
    /// [`SatResult::Sat`], restricted to the elements the constants
    /// generate. `None` when nothing names an element.
    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;

    fn axiom(text: &str) -> Axiom {
        Axiom::new(text, text.parse::<Formula>().unwrap())
    }

    fn solver() -> Solver {
        Solver::new(CheckConfig::default()).unwrap()
    }

    #[test]
    fn equations_trigger_on_both_sides() {
        let formula = axiom("(xy)(xz) = (xy)z").formula;
        let variables = formula.free_variables();
        let patterns = triggers(&formula, &variables);
        assert_eq!(patterns.len(), 2);
        assert!(patterns.iter().all(|pattern| pattern.len() == 1));
    }

    #[test]
    fn implications_trigger_on_all_applications() {
        let formula = axiom("xy = y & yx = x -> x = y").formula;
        let variables = formula.free_variables();
        assert_eq!(
            triggers(&formula, &variables),
            vec![vec![
                &Term::binary("p", Term::Variable('x'), Term::Variable('y')),
                &Term::binary("p", Term::Variable('y'), Term::Variable('x')),
            ]]
        );
    }

    #[test]
    fn uncovered_variables_leave_the_choice_to_the_solver() {
        let formula = axiom("xx = y").formula;
        let variables = formula.free_variables();
        assert!(triggers(&formula, &variables).is_empty());
    }

    #[test]
    #[cfg_attr(not(feature = "z3"), ignore = "needs a z3 executable")]
    fn assert_requires_declarations() {
        let mut solver = solver();
        assert!(matches!(
            solver.assert(axiom("xy = yx")),
            Err(Error::UndeclaredFunction { .. })
        ));
        solver.declare_function("p", 2).unwrap();
        solver.assert(axiom("xy = yx")).unwrap();
        assert_eq!(solver.assertions().len(), 1);
    }

    #[test]
    #[cfg_attr(not(feature = "z3"), ignore = "needs a z3 executable")]
    fn redeclaring_with_another_arity_conflicts() {
        let mut solver = solver();
        solver.declare_function("p", 2).unwrap();
        solver.declare_function("p", 2).unwrap();
        assert!(matches!(
            solver.declare_function("p", 0),
            Err(Error::ConflictingDeclaration { arity: 2, .. })
        ));
        solver.declare_function("X", 0).unwrap();
        let applied = Formula::equal(
            Term::Apply("X".to_string(), vec![Term::Variable('x')]),
            Term::Variable('x'),
        );
        assert!(matches!(
            solver.assert(Axiom::new("applied", applied)),
            Err(Error::ArityMismatch {
                expected: 0,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    #[cfg_attr(not(feature = "z3"), ignore = "needs a z3 executable")]
    fn pop_restores_scope() {
        let mut solver = solver();
        solver.declare_function("p", 2).unwrap();
        solver.assert(axiom("xx = x")).unwrap();

        solver.push().unwrap();
        let goal = axiom("x = y").skolemized_negation();
        solver.declare_signature_of(&goal).unwrap();
        solver.assert(goal.clone()).unwrap();
        assert_eq!(solver.check().unwrap(), SatResult::Sat);
        assert!(solver.model().is_some());
        solver.pop().unwrap();

        assert_eq!(solver.assertions().len(), 1);
        assert!(solver.model().is_none());
        assert!(solver.assert(goal).is_err());
    }

    #[test]
    #[cfg_attr(not(feature = "z3"), ignore = "needs a z3 executable")]
    fn pop_without_push_is_an_error() {
        let mut solver = solver();
        assert!(matches!(solver.pop(), Err(Error::PopWithoutPush)));
    }

    #[test]
    #[cfg_attr(not(feature = "z3"), ignore = "needs a z3 executable")]
    fn commutativity_entails_commuted_product() {
        let mut solver = solver();
        solver.declare_function("p", 2).unwrap();
        solver.assert(axiom("xy = yx")).unwrap();
        let goal = axiom("x(yz) = x(zy)").skolemized_negation();
        solver.declare_signature_of(&goal).unwrap();
        solver.assert(goal).unwrap();
        assert_eq!(solver.check().unwrap(), SatResult::Unsat);
    }

    #[test]
    #[cfg_attr(not(feature = "z3"), ignore = "needs a z3 executable")]
    fn no_assertions_is_satisfiable() {
        let mut solver = solver();
        assert_eq!(solver.check().unwrap(), SatResult::Sat);
        assert!(solver.model().is_none());
    }

    #[test]
    #[cfg_attr(not(feature = "z3"), ignore = "needs a z3 executable")]
    fn distinct_constants_without_functions() {
        let mut solver = solver();
        let goal = axiom("x = y").skolemized_negation();
        solver.declare_signature_of(&goal).unwrap();
        solver.assert(goal.clone()).unwrap();
        assert_eq!(solver.check().unwrap(), SatResult::Sat);

        let model = solver.model().unwrap();
        assert!(model.functions.is_empty());
        assert_ne!(model.constants["X"], model.constants["Y"]);
        assert_eq!(model.satisfies(&goal), Some(true));
    }

    #[test]
    #[cfg_attr(not(feature = "z3"), ignore = "needs a z3 executable")]
    fn equal_constants_cannot_be_distinct() {
        let mut solver = solver();
        let equal = Formula::equal(Term::constant("X"), Term::constant("Y"));
        let equal = Axiom::new("equal", equal);
        solver.declare_signature_of(&equal).unwrap();
        solver.assert(equal).unwrap();
        solver.assert(axiom("x = y").skolemized_negation()).unwrap();
        assert_eq!(solver.check().unwrap(), SatResult::Unsat);
    }

    #[test]
    #[cfg_attr(not(feature = "z3"), ignore = "needs a z3 executable")]
    fn models_satisfy_every_assertion() {
        let mut solver = solver();
        solver.declare_function("p", 2).unwrap();
        solver.assert(axiom("xx = x")).unwrap();
        solver.assert(axiom("(xy)z = x(yz)")).unwrap();
        let goal = axiom("xy = yx").skolemized_negation();
        solver.declare_signature_of(&goal).unwrap();
        solver.assert(goal).unwrap();
        assert_eq!(solver.check().unwrap(), SatResult::Sat);

        let model = solver.model().unwrap();
        assert_eq!(model.functions["p"].values.len(), model.domain_size.pow(2));
        for assertion in solver.assertions() {
            assert_eq!(model.satisfies(assertion), Some(true), "{}", assertion.name);
        }
    }

    #[test]
    fn missing_executable_is_a_process_error() {
        let config = CheckConfig {
            solver: "no-such-smt-solver".to_string(),
            ..CheckConfig::default()
        };
        assert!(matches!(
            Solver::new(config),
            Err(Error::SolverProcess { .. })
        ));
    }
}
