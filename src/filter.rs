//! Compact filter query language: whitespace-separated `field<op>value`
//! tokens, combined with logical AND.
//!
//! | field  | `:`                         | `>` / `<`  |
//! |--------|-----------------------------|------------|
//! | `pid`  | exact integer               | rejected   |
//! | `ppid` | exact integer               | rejected   |
//! | `state`| exact state code (`Z`, `R`) | rejected   |
//! | `cmd`  | case-insensitive substring  | rejected   |
//! | `cpu`  | within 0.01                 | compare    |
//! | `mem`  | within 0.01                 | compare    |
//! | `age`  | within 0.01 (hours)         | compare    |

use std::fmt;

use thiserror::Error;

use crate::system::process::ProcessSample;
use crate::system::snapshot::Snapshot;

/// Tolerance applied to `:` on numeric fields.
pub const NUMERIC_TOLERANCE: f64 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Pid,
    Ppid,
    State,
    Cmd,
    Cpu,
    Mem,
    Age,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "pid" => Field::Pid,
            "ppid" => Field::Ppid,
            "state" => Field::State,
            "cmd" => Field::Cmd,
            "cpu" => Field::Cpu,
            "mem" => Field::Mem,
            "age" => Field::Age,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::Pid => "pid",
            Field::Ppid => "ppid",
            Field::State => "state",
            Field::Cmd => "cmd",
            Field::Cpu => "cpu",
            Field::Mem => "mem",
            Field::Age => "age",
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, Field::Cpu | Field::Mem | Field::Age)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Equals,
    GreaterThan,
    LessThan,
}

impl Operator {
    fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            ':' => Some(Operator::Equals),
            '>' => Some(Operator::GreaterThan),
            '<' => Some(Operator::LessThan),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Operator::Equals => ':',
            Operator::GreaterThan => '>',
            Operator::LessThan => '<',
        }
    }
}

/// Predicate value, typed once at parse time.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Integer(u32),
    Char(char),
    /// Lower-cased for case-insensitive matching.
    Text(String),
    Float(f64),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(v) => write!(f, "{v}"),
            Literal::Char(c) => write!(f, "{c}"),
            Literal::Text(s) => write!(f, "{s}"),
            Literal::Float(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilterPredicate {
    pub field: Field,
    pub operator: Operator,
    pub literal: Literal,
}

impl fmt::Display for FilterPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.field.name(),
            self.operator.symbol(),
            self.literal
        )
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("unknown filter field `{0}`")]
    UnknownField(String),
    #[error("malformed filter token `{0}` (expected field:value, field>value or field<value)")]
    MalformedToken(String),
    #[error("filter field `{field}` does not support operator `{operator}`")]
    IncompatibleOperator { field: &'static str, operator: char },
    #[error("invalid value `{value}` for filter field `{field}`")]
    InvalidLiteral { field: &'static str, value: String },
}

/// Parses a query. Empty or whitespace-only text yields no predicates,
/// which matches every process.
pub fn parse(text: &str) -> Result<Vec<FilterPredicate>, FilterError> {
    text.split_whitespace().map(parse_token).collect()
}

fn parse_token(token: &str) -> Result<FilterPredicate, FilterError> {
    let Some(split) = token.find([':', '>', '<']) else {
        return Err(FilterError::MalformedToken(token.to_string()));
    };
    let (name, rest) = token.split_at(split);
    if name.is_empty() {
        return Err(FilterError::MalformedToken(token.to_string()));
    }
    let field = Field::from_name(name).ok_or_else(|| FilterError::UnknownField(name.to_string()))?;

    let mut chars = rest.chars();
    let operator = chars
        .next()
        .and_then(Operator::from_symbol)
        .ok_or_else(|| FilterError::MalformedToken(token.to_string()))?;
    let value = chars.as_str();
    if value.is_empty() {
        return Err(FilterError::MalformedToken(token.to_string()));
    }

    if operator != Operator::Equals && !field.is_numeric() {
        return Err(FilterError::IncompatibleOperator {
            field: field.name(),
            operator: operator.symbol(),
        });
    }

    let invalid = || FilterError::InvalidLiteral {
        field: field.name(),
        value: value.to_string(),
    };
    let literal = match field {
        Field::Pid | Field::Ppid => Literal::Integer(value.parse().map_err(|_| invalid())?),
        Field::State => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(code), None) => Literal::Char(code),
                _ => return Err(invalid()),
            }
        }
        Field::Cmd => Literal::Text(value.to_lowercase()),
        Field::Cpu | Field::Mem | Field::Age => {
            let number: f64 = value.parse().map_err(|_| invalid())?;
            if !number.is_finite() {
                return Err(invalid());
            }
            Literal::Float(number)
        }
    };

    Ok(FilterPredicate {
        field,
        operator,
        literal,
    })
}

impl FilterPredicate {
    pub fn matches(&self, process: &ProcessSample) -> bool {
        match (&self.literal, self.field) {
            (Literal::Integer(pid), Field::Pid) => process.pid == *pid,
            (Literal::Integer(ppid), Field::Ppid) => process.ppid == *ppid,
            (Literal::Char(code), Field::State) => process.state.code() == *code,
            (Literal::Text(needle), Field::Cmd) => process.command.to_lowercase().contains(needle),
            (Literal::Float(value), Field::Cpu) => {
                compare(process.derived.cpu_usage_percent, self.operator, *value)
            }
            (Literal::Float(value), Field::Mem) => {
                compare(process.derived.memory_usage_percent, self.operator, *value)
            }
            (Literal::Float(value), Field::Age) => {
                compare(process.derived.age_hours, self.operator, *value)
            }
            // Unreachable through `parse`; a hand-built mismatch never matches.
            _ => false,
        }
    }
}

fn compare(actual: f64, operator: Operator, expected: f64) -> bool {
    match operator {
        Operator::Equals => (actual - expected).abs() < NUMERIC_TOLERANCE,
        Operator::GreaterThan => actual > expected,
        Operator::LessThan => actual < expected,
    }
}

pub fn matches_all(process: &ProcessSample, predicates: &[FilterPredicate]) -> bool {
    predicates.iter().all(|p| p.matches(process))
}

/// Processes of `snapshot` satisfying every predicate, in snapshot order.
pub fn evaluate<'a>(snapshot: &'a Snapshot, predicates: &[FilterPredicate]) -> Vec<&'a ProcessSample> {
    snapshot
        .processes()
        .iter()
        .filter(|p| matches_all(p, predicates))
        .collect()
}

/// Canonical text of a parsed query, as shown in the header.
pub fn describe(predicates: &[FilterPredicate]) -> String {
    predicates
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::process::ProcessState;
    use crate::system::snapshot::tests::{facts, sample};

    fn process(pid: u32, command: &str, cpu: f64) -> ProcessSample {
        let mut p = sample(pid, 1);
        p.command = command.to_string();
        p.derived.cpu_usage_percent = cpu;
        p
    }

    #[test]
    fn empty_query_matches_everything() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("   \t ").unwrap().is_empty());
        let snapshot = Snapshot::build(vec![sample(1, 0), sample(2, 1)], facts(1024));
        assert_eq!(evaluate(&snapshot, &[]).len(), 2);
    }

    #[test]
    fn parses_each_field_into_typed_literal() {
        let predicates = parse("pid:12 ppid:1 state:Z cmd:SSHd cpu>5 mem<2.5 age:1").unwrap();
        let literals: Vec<&Literal> = predicates.iter().map(|p| &p.literal).collect();
        assert_eq!(
            literals,
            vec![
                &Literal::Integer(12),
                &Literal::Integer(1),
                &Literal::Char('Z'),
                &Literal::Text("sshd".into()),
                &Literal::Float(5.0),
                &Literal::Float(2.5),
                &Literal::Float(1.0),
            ]
        );
        assert_eq!(predicates[4].operator, Operator::GreaterThan);
        assert_eq!(predicates[5].operator, Operator::LessThan);
    }

    #[test]
    fn unknown_field_is_named() {
        let err = parse("bogus:1").unwrap_err();
        assert_eq!(err, FilterError::UnknownField("bogus".into()));
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn comparison_on_non_numeric_field_is_rejected() {
        assert_eq!(
            parse("pid>5").unwrap_err(),
            FilterError::IncompatibleOperator {
                field: "pid",
                operator: '>'
            }
        );
        assert!(matches!(
            parse("cmd<x"),
            Err(FilterError::IncompatibleOperator { field: "cmd", .. })
        ));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        for text in ["pid", "pid:", ":5", "cpu>", "cmd:ok junk"] {
            assert!(
                matches!(parse(text), Err(FilterError::MalformedToken(_))),
                "{text} should be malformed"
            );
        }
    }

    #[test]
    fn invalid_literals_are_rejected() {
        for text in ["pid:abc", "ppid:-1", "state:ZZ", "cpu:fast", "mem>inf", "age<NaN"] {
            assert!(
                matches!(parse(text), Err(FilterError::InvalidLiteral { .. })),
                "{text} should have an invalid literal"
            );
        }
    }

    #[test]
    fn cmd_value_may_contain_operator_characters() {
        let predicates = parse("cmd:a:b>c").unwrap();
        assert_eq!(predicates[0].literal, Literal::Text("a:b>c".into()));
    }

    #[test]
    fn cmd_matches_case_insensitive_substring() {
        let snapshot = Snapshot::build(
            vec![
                process(1, "systemd", 0.0),
                process(2, "sshd", 0.0),
                process(3, "SSH-agent", 0.0),
                process(4, "bash", 0.0),
            ],
            facts(1024),
        );
        let pids: Vec<u32> = evaluate(&snapshot, &parse("cmd:ssh").unwrap())
            .iter()
            .map(|p| p.pid)
            .collect();
        assert_eq!(pids, vec![2, 3]);
    }

    #[test]
    fn numeric_fields_compare_and_use_tolerance() {
        let p = process(1, "x", 10.004);
        assert!(parse("cpu:10").unwrap()[0].matches(&p));
        assert!(!parse("cpu:10.02").unwrap()[0].matches(&p));
        assert!(parse("cpu>10").unwrap()[0].matches(&p));
        assert!(!parse("cpu<10").unwrap()[0].matches(&p));
    }

    #[test]
    fn state_matches_exact_code() {
        let mut zombie = sample(9, 1);
        zombie.state = ProcessState::Zombie;
        assert!(parse("state:Z").unwrap()[0].matches(&zombie));
        assert!(!parse("state:z").unwrap()[0].matches(&zombie));
    }

    #[test]
    fn predicates_are_conjunctive() {
        let snapshot = Snapshot::build(
            vec![process(1, "nginx", 50.0), process(2, "nginx", 1.0), process(3, "redis", 80.0)],
            facts(1024),
        );
        let pids: Vec<u32> = evaluate(&snapshot, &parse("cmd:nginx cpu>10").unwrap())
            .iter()
            .map(|p| p.pid)
            .collect();
        assert_eq!(pids, vec![1]);
    }

    #[test]
    fn describe_renders_canonical_form() {
        let predicates = parse("cmd:SSH  cpu>5 state:Z").unwrap();
        assert_eq!(describe(&predicates), "cmd:ssh cpu>5 state:Z");
    }
}
