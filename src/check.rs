use std::{
    fmt::Display,
    io::Write,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use tracing::info;

use crate::{
    config::CheckConfig,
    error::{ReportSnafu, Result},
    formula::Axiom,
    model::Model,
    solver::{SatResult, Solver},
    theory::Theory,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// The theory entails the conclusion.
    Holds,
    /// A model of the theory violates the conclusion.
    DoesNotHold { countermodel: Option<Model> },
    Unknown { reason: String },
}

impl Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Holds => write!(f, "holds"),
            Verdict::DoesNotHold { .. } => write!(f, "doesn't hold"),
            Verdict::Unknown { .. } => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub conclusion: Axiom,
    pub verdict: Verdict,
    pub elapsed: Duration,
}

const RULE: usize = 70;

/// Decides one conclusion in a fresh scope on top of `solver`'s assertions.
///
/// The conclusion's variables become constants named by their capital
/// letters, so a countermodel names the elements that violate it.
pub fn check_one(solver: &mut Solver, conclusion: &Axiom) -> Result<Verdict> {
    solver.push()?;
    let negation = conclusion.skolemized_negation();
    solver.declare_signature_of(&negation)?;
    solver.assert(negation)?;
    let result = solver.check()?;
    let verdict = match result {
        SatResult::Unsat => Verdict::Holds,
        SatResult::Sat => Verdict::DoesNotHold {
            countermodel: solver.model().cloned(),
        },
        SatResult::Unknown(reason) => Verdict::Unknown { reason },
    };
    solver.pop()?;
    info!(conclusion = %conclusion.name, %verdict, "checked");
    Ok(verdict)
}

/// Checks whether `theory` entails each of `conclusions`, writing a report
/// to `out`.
pub fn check<W: Write>(
    theory: &Theory,
    conclusions: &[Axiom],
    config: &CheckConfig,
    out: &mut W,
) -> Result<Vec<CheckResult>> {
    let mut solver = Solver::new(config.clone())?;
    for axiom in &theory.axioms {
        solver.declare_signature_of(axiom)?;
        solver.assert(axiom.clone())?;
    }

    writeln!(out, "{}", "-".repeat(RULE)).context(ReportSnafu)?;
    writeln!(out, "Starting checks in {}...", theory.name).context(ReportSnafu)?;
    writeln!(out, "Number of assumptions: {}", theory.axioms.len()).context(ReportSnafu)?;
    for axiom in &theory.axioms {
        writeln!(out, "  {}", axiom.juxtaposed(&theory.operation)).context(ReportSnafu)?;
    }
    writeln!(
        out,
        "Timeout per check: {} seconds",
        config.timeout().as_secs_f64()
    )
    .context(ReportSnafu)?;
    writeln!(out, "{}", "-".repeat(RULE)).context(ReportSnafu)?;

    let mut results = Vec::with_capacity(conclusions.len());
    for (i, conclusion) in conclusions.iter().enumerate() {
        writeln!(
            out,
            "\n[Check {}/{}] Checking conclusion:",
            i + 1,
            conclusions.len()
        )
        .context(ReportSnafu)?;
        writeln!(out, "  {}", conclusion.juxtaposed(&theory.operation)).context(ReportSnafu)?;

        let start = Instant::now();
        let verdict = check_one(&mut solver, conclusion)?;
        let elapsed = start.elapsed();
        let duration = format!("({:.3}s)", elapsed.as_secs_f64());

        match &verdict {
            Verdict::Holds => {
                writeln!(out, "  Result: HOLDS (assumptions entail conclusion) {duration}")
                    .context(ReportSnafu)?
            }
            Verdict::DoesNotHold { countermodel } => {
                writeln!(out, "  Result: DOESN'T HOLD (found countermodel) {duration}")
                    .context(ReportSnafu)?;
                if let Some(model) = countermodel {
                    writeln!(out, "  Countermodel:").context(ReportSnafu)?;
                    for line in model.to_string().lines() {
                        writeln!(out, "    {line}").context(ReportSnafu)?;
                    }
                }
            }
            Verdict::Unknown { reason } => {
                writeln!(out, "  Result: UNKNOWN ({reason}) {duration}").context(ReportSnafu)?
            }
        }
        writeln!(out, "{}", "-".repeat(25)).context(ReportSnafu)?;

        results.push(CheckResult {
            conclusion: conclusion.clone(),
            verdict,
            elapsed,
        });
    }

    writeln!(out, "{}", "-".repeat(RULE)).context(ReportSnafu)?;
    writeln!(out, "Checks complete.").context(ReportSnafu)?;
    writeln!(out, "{}", "-".repeat(RULE)).context(ReportSnafu)?;
    Ok(results)
}

/// Writes one line per conclusion with its verdict.
pub fn summarize<W: Write>(theory: &Theory, results: &[CheckResult], out: &mut W) -> Result<()> {
    writeln!(out, "\nSUMMARY OF CHECKS:").context(ReportSnafu)?;
    writeln!(
        out,
        "  Assumptions used: {} ({} axioms)",
        theory.name,
        theory.axioms.len()
    )
    .context(ReportSnafu)?;
    for (i, result) in results.iter().enumerate() {
        writeln!(
            out,
            "  Conclusion {}: {}",
            i + 1,
            result.conclusion.juxtaposed(&theory.operation)
        )
        .context(ReportSnafu)?;
        writeln!(out, "    Result: {}", result.verdict).context(ReportSnafu)?;
    }
    Ok(())
}
