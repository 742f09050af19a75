use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the SMT solver is started and how long a single check may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Executable that reads SMT-LIB on stdin.
    pub solver: String,
    pub solver_args: Vec<String>,
    /// Budget per `check-sat`, in milliseconds.
    pub timeout_ms: u64,
    /// Largest domain tried by the bounded model search after an
    /// inconclusive check. Zero disables it.
    pub max_domain_size: usize,
    /// Models with more elements are not read back from the solver.
    pub max_model_size: usize,
}

impl CheckConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            solver: "z3".to_string(),
            solver_args: vec!["-smt2".to_string(), "-in".to_string()],
            timeout_ms: 5_000,
            max_domain_size: 4,
            max_model_size: 64,
        }
    }
}
