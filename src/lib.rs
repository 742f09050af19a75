pub mod check;
pub mod config;
pub mod error;
pub mod formula;
pub mod log;
pub mod model;
pub mod parse;
pub mod solver;
pub mod substitution;
pub mod term;
pub mod theory;
mod timeout;

pub use check::{check, check_one, summarize, CheckResult, Verdict};
pub use config::CheckConfig;
pub use error::{Error, Result};
pub use formula::{Axiom, Formula};
pub use model::Model;
pub use solver::{SatResult, Solver};
pub use term::Term;
pub use theory::Theory;
