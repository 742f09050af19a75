use std::{fmt::Display, iter::Peekable, str::FromStr};

use crate::{
    error::{Error, InvalidCharacterSnafu, Result, UnexpectedEndSnafu, UnexpectedTokenSnafu},
    formula::Formula,
    term::Term,
};

/// The binary operation written by juxtaposition when none is given.
pub const DEFAULT_OPERATION: &str = "p";

impl FromStr for Term {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_term(s, DEFAULT_OPERATION)
    }
}

impl FromStr for Formula {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_formula(s, DEFAULT_OPERATION)
    }
}

pub fn parse_term(input: &str, operation: &str) -> Result<Term> {
    let mut parser = new_parser(tokens(input)?, input, operation);
    let term = parser.term()?;
    parser.end()?;
    Ok(term)
}

/// Parses formulas like `xy = y & yx = x -> x = y`. Lowercase letters are
/// variables and juxtaposition applies `operation`, associating to the left.
pub fn parse_formula(input: &str, operation: &str) -> Result<Formula> {
    let mut parser = new_parser(tokens(input)?, input, operation);
    let formula = parser.formula()?;
    parser.end()?;
    Ok(formula)
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum FormulaToken {
    Variable { name: char },
    Whitespace,
    LeftParenthesis,
    RightParenthesis,
    Equals,
    NotEquals,
    Not,
    And,
    Or,
    Implies,
}

impl Display for FormulaToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormulaToken::Variable { name } => write!(f, "variable {name}"),
            FormulaToken::Whitespace => write!(f, "whitespace"),
            FormulaToken::LeftParenthesis => write!(f, "'('"),
            FormulaToken::RightParenthesis => write!(f, "')'"),
            FormulaToken::Equals => write!(f, "'='"),
            FormulaToken::NotEquals => write!(f, "'!='"),
            FormulaToken::Not => write!(f, "'!'"),
            FormulaToken::And => write!(f, "'&'"),
            FormulaToken::Or => write!(f, "'|'"),
            FormulaToken::Implies => write!(f, "'->'"),
        }
    }
}

fn tokens(input: &str) -> Result<Vec<FormulaToken>> {
    let mut tokens = Vec::with_capacity(input.len());
    let mut characters = input.chars().enumerate().peekable();
    while let Some((position, c)) = characters.next() {
        tokens.push(match c {
            'a'..='z' => FormulaToken::Variable { name: c },
            '(' => FormulaToken::LeftParenthesis,
            ')' => FormulaToken::RightParenthesis,
            '=' => FormulaToken::Equals,
            '&' => FormulaToken::And,
            '|' => FormulaToken::Or,
            '!' if characters.next_if(|(_, next)| *next == '=').is_some() => {
                FormulaToken::NotEquals
            }
            '!' => FormulaToken::Not,
            '-' if characters.next_if(|(_, next)| *next == '>').is_some() => {
                FormulaToken::Implies
            }
            c if c.is_whitespace() => FormulaToken::Whitespace,
            c => {
                return InvalidCharacterSnafu {
                    character: c,
                    position,
                    input,
                }
                .fail()
            }
        });
    }
    Ok(tokens)
}

struct FormulaParser<'a, I>
where
    I: Iterator<Item = FormulaToken>,
{
    tokens: Peekable<I>,
    input: &'a str,
    operation: &'a str,
}

fn new_parser<'a>(
    tokens: Vec<FormulaToken>,
    input: &'a str,
    operation: &'a str,
) -> FormulaParser<'a, impl Iterator<Item = FormulaToken>> {
    FormulaParser {
        tokens: tokens
            .into_iter()
            .filter(|t| t != &FormulaToken::Whitespace)
            .peekable(),
        input,
        operation,
    }
}

impl<'a, I> FormulaParser<'a, I>
where
    I: Iterator<Item = FormulaToken>,
{
    fn unexpected<T>(&self, token: Option<FormulaToken>) -> Result<T> {
        match token {
            Some(token) => UnexpectedTokenSnafu {
                found: token.to_string(),
                input: self.input,
            }
            .fail(),
            None => UnexpectedEndSnafu { input: self.input }.fail(),
        }
    }

    fn end(&mut self) -> Result<()> {
        match self.tokens.next() {
            None => Ok(()),
            token => self.unexpected(token),
        }
    }

    fn formula(&mut self) -> Result<Formula> {
        let premise = self.disjunction()?;
        if self.tokens.next_if_eq(&FormulaToken::Implies).is_some() {
            let conclusion = self.formula()?;
            Ok(Formula::Implies(premise.into(), conclusion.into()))
        } else {
            Ok(premise)
        }
    }

    fn disjunction(&mut self) -> Result<Formula> {
        let mut disjuncts = vec![self.conjunction()?];
        while self.tokens.next_if_eq(&FormulaToken::Or).is_some() {
            disjuncts.push(self.conjunction()?);
        }
        Ok(flatten(disjuncts, Formula::Or))
    }

    fn conjunction(&mut self) -> Result<Formula> {
        let mut conjuncts = vec![self.literal()?];
        while self.tokens.next_if_eq(&FormulaToken::And).is_some() {
            conjuncts.push(self.literal()?);
        }
        Ok(flatten(conjuncts, Formula::And))
    }

    fn literal(&mut self) -> Result<Formula> {
        if self.tokens.next_if_eq(&FormulaToken::Not).is_some() {
            return Ok(self.literal()?.negate());
        }
        self.equation()
    }

    fn equation(&mut self) -> Result<Formula> {
        let left = self.term()?;
        match self.tokens.next() {
            Some(FormulaToken::Equals) => Ok(Formula::equal(left, self.term()?)),
            Some(FormulaToken::NotEquals) => Ok(Formula::not_equal(left, self.term()?)),
            token => self.unexpected(token),
        }
    }

    fn term(&mut self) -> Result<Term> {
        let mut term = self.factor()?;
        while let Some(FormulaToken::Variable { .. } | FormulaToken::LeftParenthesis) =
            self.tokens.peek()
        {
            let right = self.factor()?;
            term = Term::binary(self.operation, term, right);
        }
        Ok(term)
    }

    fn factor(&mut self) -> Result<Term> {
        match self.tokens.next() {
            Some(FormulaToken::Variable { name }) => Ok(Term::Variable(name)),
            Some(FormulaToken::LeftParenthesis) => {
                let term = self.term()?;
                match self.tokens.next() {
                    Some(FormulaToken::RightParenthesis) => Ok(term),
                    token => self.unexpected(token),
                }
            }
            token => self.unexpected(token),
        }
    }
}

fn flatten(mut formulas: Vec<Formula>, combine: fn(Vec<Formula>) -> Formula) -> Formula {
    if formulas.len() == 1 {
        formulas.remove(0)
    } else {
        combine(formulas)
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

    fn p(left: Term, right: Term) -> Term {
        Term::binary("p", left, right)
    }

    #[test]
    fn juxtaposition_associates_to_the_left() {
        assert_eq!("xyx".parse::<Term>().unwrap(), p(p(x(), y()), x()));
        assert_eq!("x(yx)".parse::<Term>().unwrap(), p(x(), p(y(), x())));
    }

    #[test]
    fn parse_test_with_whitespace_and_parenthesis() {
        assert_eq!(
            "((xy) y) (xy)".parse::<Term>().unwrap(),
            p(p(p(x(), y()), y()), p(x(), y()))
        );
    }

    #[test]
    fn parse_with_custom_operation() {
        assert_eq!(
            parse_term("xy", "m").unwrap(),
            Term::binary("m", x(), y())
        );
    }

    #[test]
    fn parse_quasi_identity() {
        let formula: Formula = "xy = y & yx = x -> x = y".parse().unwrap();
        assert_eq!(
            formula,
            Formula::Implies(
                Formula::And(vec![
                    Formula::equal(p(x(), y()), y()),
                    Formula::equal(p(y(), x()), x())
                ])
                .into(),
                Formula::equal(x(), y()).into()
            )
        );
    }

    #[test]
    fn implication_is_right_associative() {
        let formula: Formula = "x = y -> y = x -> xx = yy".parse().unwrap();
        let Formula::Implies(_, conclusion) = formula else {
            panic!("expected an implication");
        };
        assert!(matches!(*conclusion, Formula::Implies(..)));
    }

    #[test]
    fn parse_negations() {
        assert_eq!(
            "xx != x".parse::<Formula>().unwrap(),
            Formula::not_equal(p(x(), x()), x())
        );
        assert_eq!(
            "!x = y | xy = x".parse::<Formula>().unwrap(),
            Formula::Or(vec![
                Formula::not_equal(x(), y()),
                Formula::equal(p(x(), y()), x())
            ])
        );
    }

    #[test]
    fn invalid_character_is_reported() {
        let error = "x + y = x".parse::<Formula>().unwrap_err();
        assert!(matches!(
            error,
            Error::InvalidCharacter {
                character: '+',
                position: 2,
                ..
            }
        ));
    }

    #[test]
    fn unbalanced_parenthesis_is_reported() {
        assert!(matches!(
            "(xy = y".parse::<Formula>(),
            Err(Error::UnexpectedToken { .. })
        ));
        assert!(matches!(
            "xy = ".parse::<Formula>(),
            Err(Error::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            "xy".parse::<Formula>(),
            Err(Error::UnexpectedEnd { .. })
        ));
    }
}
