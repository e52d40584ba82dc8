//! `rpqstat validate`: answer counts against a reference result.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use rpq_log::{LineSchema, QueryId, QueryMeasurement, read_log};

use crate::cli::ValidateArgs;
use crate::config::InputConfig;
use crate::verbose::{dprintln, vprintln};

/// Outcome of checking one result file against the expected answers.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AnswerCheck {
    /// Queries with an expected count that were compared.
    pub checked: usize,
    /// `(query, expected, actual)` for differing counts.
    pub mismatches: Vec<(QueryId, u64, u64)>,
    /// Expected queries missing from the result or lacking a count.
    pub missing: Vec<QueryId>,
}

impl AnswerCheck {
    /// Compare answer counts by query id. The last line for an id wins.
    pub fn run(expected: &[QueryMeasurement], actual: &[QueryMeasurement]) -> Self {
        let counts = |ms: &[QueryMeasurement]| -> BTreeMap<QueryId, Option<u64>> {
            ms.iter().map(|m| (m.query_id, m.answer_count)).collect()
        };
        let actual = counts(actual);

        let mut check = Self::default();
        for (id, want) in counts(expected) {
            let Some(want) = want else { continue };
            match actual.get(&id).copied().flatten() {
                Some(got) => {
                    check.checked += 1;
                    if got != want {
                        check.mismatches.push((id, want, got));
                    }
                }
                None => check.missing.push(id),
            }
        }
        check
    }
}

/// Fail if any answer count differs from the expected file.
pub fn cmd_validate(args: &ValidateArgs) -> Result<()> {
    let schema = args
        .schema
        .to_input(&[])
        .schema(LineSchema::space_delimited());
    let expected_schema = InputConfig {
        format: args.expected_format,
        ..InputConfig::default()
    }
    .schema(schema);

    let actual = read_log(&args.result, &schema)?;
    let expected = read_log(&args.expected, &expected_schema)?;
    let check = AnswerCheck::run(&expected.measurements, &actual.measurements);

    dprintln!(
        "Checked {} queries of {}",
        check.checked,
        args.result.display()
    );
    for id in &check.missing {
        vprintln!("  missing: query {id}");
    }
    if !check.missing.is_empty() {
        dprintln!("  {} expected queries missing", check.missing.len());
    }
    for (id, want, got) in &check.mismatches {
        println!("  warning: query {id}: expected {want} answers, got {got}");
    }

    if !check.mismatches.is_empty() {
        bail!("{} answer count mismatches", check.mismatches.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(query_id: QueryId, answers: Option<u64>) -> QueryMeasurement {
        QueryMeasurement {
            query_id,
            elapsed_seconds: 1.0,
            answer_count: answers,
            load_seconds: None,
            reported_error: None,
        }
    }

    #[test]
    fn finds_mismatches_and_missing_queries() {
        let expected = [m(1, Some(5)), m(2, Some(3)), m(3, Some(0)), m(4, None)];
        let actual = [m(1, Some(5)), m(2, Some(4)), m(4, Some(9))];
        let check = AnswerCheck::run(&expected, &actual);
        assert_eq!(check.checked, 2);
        assert_eq!(check.mismatches, vec![(2, 3, 4)]);
        assert_eq!(check.missing, vec![3]);
    }

    #[test]
    fn later_line_replaces_earlier() {
        let expected = [m(1, Some(1)), m(1, Some(2))];
        let actual = [m(1, Some(2))];
        assert!(AnswerCheck::run(&expected, &actual).mismatches.is_empty());
    }
}
