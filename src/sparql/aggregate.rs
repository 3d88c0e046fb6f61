//! Aggregate evaluation for GROUP BY
//!
//! An aggregate folds the rows of one group into a single term. A failing
//! aggregate leaves its output variable unbound; only a timeout inside the
//! aggregated expression fails the query.

use std::cmp::Ordering;

use fnv::FnvHashMap;
use indexmap::IndexSet;

use super::algebra::{Aggregate, AggregateFunction};
use super::expression::{ArithOp, ExistsEvaluator, Numeric};
use super::solution::Solution;
use crate::error::{RdfError, RdfResult};
use crate::term::Term;

/// Fold the rows of a group with `aggregate`. `Ok(None)` means the aggregate
/// failed or has no value for an empty group.
pub fn evaluate_aggregate(
    aggregate: &Aggregate,
    rows: &[&Solution],
    exists: &dyn ExistsEvaluator,
) -> RdfResult<Option<Term>> {
    let expression = match &aggregate.expression {
        Some(e) => e,
        None => return Ok(Some(count_rows(rows, aggregate.distinct))),
    };

    // Per-row errors are dropped; COUNT and SAMPLE only see the successes
    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        match expression.evaluate(row, exists) {
            Ok(value) => values.push(value),
            Err(e) if e.is_timeout() => return Err(e),
            Err(_) => {}
        }
    }
    let failed = values.len() < rows.len();
    if aggregate.distinct {
        let unique: IndexSet<Term> = values.into_iter().collect();
        values = unique.into_iter().collect();
    }

    Ok(match &aggregate.function {
        AggregateFunction::Count => Some(Term::integer(values.len() as i64)),
        AggregateFunction::Sample => values.into_iter().next(),
        AggregateFunction::Min => values.into_iter().min(),
        AggregateFunction::Max => values.into_iter().max(),
        AggregateFunction::Sum if !failed => sum(&values).ok().map(|n| n.to_term()),
        AggregateFunction::Avg if !failed => average(&values).ok().map(|n| n.to_term()),
        AggregateFunction::Median if !failed => median(&values).ok().flatten().map(|n| n.to_term()),
        AggregateFunction::GroupConcat { separator } if !failed => group_concat(&values, separator),
        AggregateFunction::Mode => mode(values),
        AggregateFunction::NumericMin => numeric_extreme(values, Ordering::Less),
        AggregateFunction::NumericMax => numeric_extreme(values, Ordering::Greater),
        _ => None,
    })
}

fn count_rows(rows: &[&Solution], distinct: bool) -> Term {
    let count = if distinct {
        rows.iter().collect::<IndexSet<_>>().len()
    } else {
        rows.len()
    };
    Term::integer(count as i64)
}

fn numerics(values: &[Term]) -> RdfResult<Vec<Numeric>> {
    values.iter().map(Numeric::from_term).collect()
}

fn sum(values: &[Term]) -> RdfResult<Numeric> {
    numerics(values)?
        .into_iter()
        .try_fold(Numeric::Integer(0), |acc, n| Numeric::apply(ArithOp::Add, acc, n))
}

fn average(values: &[Term]) -> RdfResult<Numeric> {
    if values.is_empty() {
        return Ok(Numeric::Integer(0));
    }
    let total = sum(values)?;
    Numeric::apply(ArithOp::Div, total, Numeric::Integer(values.len() as i64))
}

fn median(values: &[Term]) -> RdfResult<Option<Numeric>> {
    let mut nums = numerics(values)?;
    if nums.is_empty() {
        return Ok(None);
    }
    if nums.iter().any(|n| n.as_f64().is_nan()) {
        return Err(RdfError::type_error("MEDIAN over NaN"));
    }
    nums.sort_by(|a, b| a.compare(b).unwrap_or(Ordering::Equal));
    let mid = nums.len() / 2;
    if nums.len() % 2 == 1 {
        return Ok(Some(nums[mid]));
    }
    let both = Numeric::apply(ArithOp::Add, nums[mid - 1], nums[mid])?;
    Numeric::apply(ArithOp::Div, both, Numeric::Integer(2)).map(Some)
}

/// Most frequent value; ties go to the smallest term
fn mode(values: Vec<Term>) -> Option<Term> {
    let mut counts: FnvHashMap<Term, usize> = FnvHashMap::default();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| b.cmp(a)))
        .map(|(term, _)| term)
}

/// The numeric value that compares `wanted` to all others; non-numeric
/// values and NaN are skipped
fn numeric_extreme(values: Vec<Term>, wanted: Ordering) -> Option<Term> {
    let mut best: Option<(Numeric, Term)> = None;
    for value in values {
        let n = match Numeric::from_term(&value) {
            Ok(n) if !n.as_f64().is_nan() => n,
            _ => continue,
        };
        match &best {
            Some((current, _)) if n.compare(current) != Some(wanted) => {}
            _ => best = Some((n, value)),
        }
    }
    best.map(|(_, term)| term)
}

fn group_concat(values: &[Term], separator: &str) -> Option<Term> {
    let mut parts = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Term::Literal(lit) => parts.push(lit.value().to_string()),
            Term::Uri(uri) => parts.push(uri.as_str().to_string()),
            _ => return None,
        }
    }
    Some(Term::literal(parts.join(separator)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::namespaces::xsd;
    use crate::sparql::algebra::Algebra;
    use crate::sparql::expression::Expression;
    use crate::term::Variable;

    struct NoPatterns;

    impl ExistsEvaluator for NoPatterns {
        fn exists(&self, _pattern: &Algebra, _row: &Solution) -> RdfResult<bool> {
            Ok(false)
        }
    }

    fn rows(values: &[Term]) -> Vec<Solution> {
        values
            .iter()
            .map(|t| [(Variable::new("x"), t.clone())].into_iter().collect())
            .collect()
    }

    fn agg(function: AggregateFunction, values: &[Term]) -> Option<Term> {
        let owned = rows(values);
        let refs: Vec<&Solution> = owned.iter().collect();
        evaluate_aggregate(&Aggregate::new(function, Expression::var("x")), &refs, &NoPatterns).unwrap()
    }

    #[test]
    fn test_count() {
        let owned = rows(&[Term::integer(1), Term::integer(1), Term::integer(2)]);
        let mut refs: Vec<&Solution> = owned.iter().collect();
        let empty = Solution::new();
        refs.push(&empty);

        assert_eq!(evaluate_aggregate(&Aggregate::count_all(), &refs, &NoPatterns), Ok(Some(Term::integer(4))));
        let count_x = Aggregate::new(AggregateFunction::Count, Expression::var("x"));
        assert_eq!(evaluate_aggregate(&count_x, &refs, &NoPatterns), Ok(Some(Term::integer(3))));
        assert_eq!(
            evaluate_aggregate(&count_x.distinct(), &refs, &NoPatterns),
            Ok(Some(Term::integer(2)))
        );
    }

    #[test]
    fn test_sum_and_avg() {
        let values = [Term::integer(1), Term::integer(2), Term::integer(3)];
        assert_eq!(agg(AggregateFunction::Sum, &values), Some(Term::integer(6)));
        assert_eq!(
            agg(AggregateFunction::Avg, &values),
            Some(Term::typed_literal("2.0", xsd::DECIMAL))
        );
        assert_eq!(agg(AggregateFunction::Sum, &[]), Some(Term::integer(0)));
    }

    #[test]
    fn test_sum_over_non_numeric_is_unbound() {
        let values = [Term::integer(1), Term::literal("two")];
        assert_eq!(agg(AggregateFunction::Sum, &values), None);
    }

    #[test]
    fn test_min_max_use_term_order() {
        let values = [Term::integer(10), Term::integer(9), Term::uri("http://ex.org/a")];
        assert_eq!(agg(AggregateFunction::Min, &values), Some(Term::uri("http://ex.org/a")));
        assert_eq!(agg(AggregateFunction::Max, &values), Some(Term::integer(10)));
        assert_eq!(agg(AggregateFunction::Max, &[]), None);
    }

    #[test]
    fn test_group_concat() {
        let values = [Term::literal("a"), Term::literal("b")];
        let sep = AggregateFunction::GroupConcat { separator: ", ".to_string() };
        assert_eq!(agg(sep, &values), Some(Term::literal("a, b")));
    }

    #[test]
    fn test_median_and_mode() {
        let odd = [Term::integer(5), Term::integer(1), Term::integer(3)];
        assert_eq!(agg(AggregateFunction::Median, &odd), Some(Term::integer(3)));

        let even = [Term::integer(1), Term::integer(4)];
        assert_eq!(
            agg(AggregateFunction::Median, &even),
            Some(Term::typed_literal("2.5", xsd::DECIMAL))
        );

        let modal = [Term::integer(2), Term::integer(7), Term::integer(7), Term::integer(2), Term::integer(1)];
        assert_eq!(agg(AggregateFunction::Mode, &modal), Some(Term::integer(2)));
    }

    #[test]
    fn test_numeric_min_max_skip_non_numeric() {
        let values = [
            Term::literal("zzz"),
            Term::integer(10),
            Term::typed_literal("2.5", xsd::DECIMAL),
            Term::uri("http://ex.org/a"),
            Term::typed_literal("NaN", xsd::DOUBLE),
            Term::integer(-3),
        ];
        assert_eq!(agg(AggregateFunction::NumericMin, &values), Some(Term::integer(-3)));
        assert_eq!(agg(AggregateFunction::NumericMax, &values), Some(Term::integer(10)));
        assert_eq!(agg(AggregateFunction::NumericMax, &[Term::literal("a")]), None);
        assert_eq!(agg(AggregateFunction::NumericMin, &[]), None);
    }

    struct Expired;

    impl ExistsEvaluator for Expired {
        fn exists(&self, _pattern: &Algebra, _row: &Solution) -> RdfResult<bool> {
            Err(RdfError::timeout(10, 5))
        }
    }

    #[test]
    fn test_timeout_in_aggregated_expression_fails() {
        let owned = rows(&[Term::integer(1)]);
        let refs: Vec<&Solution> = owned.iter().collect();
        let aggregate = Aggregate::new(AggregateFunction::Count, Expression::exists(Algebra::Empty));
        let err = evaluate_aggregate(&aggregate, &refs, &Expired).unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(evaluate_aggregate(&aggregate, &refs, &NoPatterns), Ok(Some(Term::integer(1))));
    }
}
