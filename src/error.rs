use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// A character the tokenizer does not know.
    #[snafu(display("invalid character {character:?} at position {position} in {input:?}"))]
    InvalidCharacter {
        character: char,
        position: usize,
        input: String,
    },

    #[snafu(display("unexpected {found} in {input:?}"))]
    UnexpectedToken { found: String, input: String },

    #[snafu(display("unexpected end of input in {input:?}"))]
    UnexpectedEnd { input: String },

    #[snafu(display("function {name} is not declared"))]
    UndeclaredFunction { name: String },

    #[snafu(display("function {name} expects {expected} arguments, got {actual}"))]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Redeclaration of a symbol with a different arity.
    #[snafu(display("function {name} is already declared with arity {arity}"))]
    ConflictingDeclaration { name: String, arity: usize },

    #[snafu(display("pop without matching push"))]
    PopWithoutPush,

    /// The SMT solver could not be started or answered with an error.
    #[snafu(display("solver process failed"))]
    SolverProcess { source: std::io::Error },

    #[snafu(display("could not write report"))]
    Report { source: std::io::Error },
}
