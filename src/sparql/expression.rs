//! SPARQL expressions
//!
//! Expressions evaluate against one solution to a term or an error.
//! Errors are ordinary values of SPARQL's three-valued logic: `||` and `&&`
//! can recover from them, and the operator that owns the expression decides
//! what an error means (a failing FILTER drops the row, a failing BIND
//! leaves the variable unbound).

use std::cmp::Ordering;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::RegexBuilder;
use sha2::Digest;

use super::algebra::Algebra;
use super::solution::Solution;
use crate::core::namespaces::xsd;
use crate::error::{ErrorCode, RdfError, RdfResult};
use crate::term::order::{parse_temporal, split_timezone};
use crate::term::{Literal, Term, Variable};

/// Evaluates EXISTS patterns on behalf of an expression, and holds the
/// per-evaluation state some functions need
pub trait ExistsEvaluator {
    /// Whether `pattern`, with the variables of `row` substituted, has at
    /// least one solution
    fn exists(&self, pattern: &Algebra, row: &Solution) -> RdfResult<bool>;

    /// A compiled REGEX/REPLACE pattern. Implementations may cache.
    fn regex(&self, pattern: &str, flags: &str) -> RdfResult<regex::Regex> {
        compile_regex(pattern, flags)
    }

    /// The blank node `BNODE(label)` yields for `row`: the same node for
    /// the same label within one row, distinct across rows
    fn labelled_blank(&self, _label: &str, _row: &Solution) -> Term {
        Term::fresh_blank()
    }
}

/// Unreserved characters of RFC 3986 stay as they are
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Built-in functions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Function {
    IsIri,
    IsBlank,
    IsLiteral,
    IsNumeric,
    Str,
    Lang,
    Datatype,
    LangMatches,
    Regex,
    Contains,
    StrStarts,
    StrEnds,
    StrLen,
    UCase,
    LCase,
    Concat,
    Substr,
    Abs,
    Ceil,
    Floor,
    Round,
    Iri,
    StrDt,
    StrLang,
    Replace,
    StrBefore,
    StrAfter,
    EncodeForUri,
    Year,
    Month,
    Day,
    Hours,
    Minutes,
    Seconds,
    Timezone,
    Tz,
    BNode,
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

/// A SPARQL expression tree
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Variable(Variable),
    Constant(Term),
    Or(Box<Expression>, Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
    Equal(Box<Expression>, Box<Expression>),
    NotEqual(Box<Expression>, Box<Expression>),
    Less(Box<Expression>, Box<Expression>),
    LessOrEqual(Box<Expression>, Box<Expression>),
    Greater(Box<Expression>, Box<Expression>),
    GreaterOrEqual(Box<Expression>, Box<Expression>),
    Add(Box<Expression>, Box<Expression>),
    Subtract(Box<Expression>, Box<Expression>),
    Multiply(Box<Expression>, Box<Expression>),
    Divide(Box<Expression>, Box<Expression>),
    UnaryMinus(Box<Expression>),
    Bound(Variable),
    If(Box<Expression>, Box<Expression>, Box<Expression>),
    Coalesce(Vec<Expression>),
    In(Box<Expression>, Vec<Expression>),
    NotIn(Box<Expression>, Vec<Expression>),
    SameTerm(Box<Expression>, Box<Expression>),
    Call(Function, Vec<Expression>),
    Exists(Box<Algebra>),
    NotExists(Box<Algebra>),
}

macro_rules! binary_constructors {
    ($($name:ident => $variant:ident),* $(,)?) => {
        $(
            pub fn $name(left: Expression, right: Expression) -> Self {
                Expression::$variant(Box::new(left), Box::new(right))
            }
        )*
    };
}

impl Expression {
    pub fn var(name: &str) -> Self {
        Expression::Variable(Variable::new(name))
    }

    pub fn constant(term: Term) -> Self {
        Expression::Constant(term)
    }

    pub fn integer(value: i64) -> Self {
        Expression::Constant(Term::integer(value))
    }

    binary_constructors! {
        or => Or,
        and => And,
        eq => Equal,
        ne => NotEqual,
        lt => Less,
        le => LessOrEqual,
        gt => Greater,
        ge => GreaterOrEqual,
        add => Add,
        sub => Subtract,
        mul => Multiply,
        div => Divide,
        same_term => SameTerm,
    }

    pub fn not(inner: Expression) -> Self {
        Expression::Not(Box::new(inner))
    }

    pub fn bound(name: &str) -> Self {
        Expression::Bound(Variable::new(name))
    }

    pub fn call(function: Function, args: Vec<Expression>) -> Self {
        Expression::Call(function, args)
    }

    pub fn exists(pattern: Algebra) -> Self {
        Expression::Exists(Box::new(pattern))
    }

    pub fn not_exists(pattern: Algebra) -> Self {
        Expression::NotExists(Box::new(pattern))
    }

    /// Evaluate against one solution
    pub fn evaluate(&self, row: &Solution, exists: &dyn ExistsEvaluator) -> RdfResult<Term> {
        match self {
            Expression::Variable(v) => row
                .get(v)
                .cloned()
                .ok_or_else(|| RdfError::unbound(v.name())),
            Expression::Constant(t) => Ok(t.clone()),

            Expression::Or(a, b) => {
                let left = a.effective_boolean(row, exists);
                if let Ok(true) = left {
                    return Ok(Term::boolean(true));
                }
                match (left, b.effective_boolean(row, exists)) {
                    (_, Ok(true)) => Ok(Term::boolean(true)),
                    (Ok(false), Ok(false)) => Ok(Term::boolean(false)),
                    (Err(e), _) | (_, Err(e)) => Err(e),
                    _ => Ok(Term::boolean(false)),
                }
            }
            Expression::And(a, b) => {
                let left = a.effective_boolean(row, exists);
                if let Ok(false) = left {
                    return Ok(Term::boolean(false));
                }
                match (left, b.effective_boolean(row, exists)) {
                    (_, Ok(false)) => Ok(Term::boolean(false)),
                    (Ok(true), Ok(true)) => Ok(Term::boolean(true)),
                    (Err(e), _) | (_, Err(e)) => Err(e),
                    _ => Ok(Term::boolean(false)),
                }
            }
            Expression::Not(a) => Ok(Term::boolean(!a.effective_boolean(row, exists)?)),

            Expression::Equal(a, b) => {
                Ok(Term::boolean(values_equal(&a.evaluate(row, exists)?, &b.evaluate(row, exists)?)?))
            }
            Expression::NotEqual(a, b) => {
                Ok(Term::boolean(!values_equal(&a.evaluate(row, exists)?, &b.evaluate(row, exists)?)?))
            }
            Expression::Less(a, b) => self.relational(a, b, row, exists, |o| o == Ordering::Less),
            Expression::LessOrEqual(a, b) => {
                self.relational(a, b, row, exists, |o| o != Ordering::Greater)
            }
            Expression::Greater(a, b) => {
                self.relational(a, b, row, exists, |o| o == Ordering::Greater)
            }
            Expression::GreaterOrEqual(a, b) => {
                self.relational(a, b, row, exists, |o| o != Ordering::Less)
            }

            Expression::Add(a, b) => arithmetic(ArithOp::Add, &a.evaluate(row, exists)?, &b.evaluate(row, exists)?),
            Expression::Subtract(a, b) => arithmetic(ArithOp::Sub, &a.evaluate(row, exists)?, &b.evaluate(row, exists)?),
            Expression::Multiply(a, b) => arithmetic(ArithOp::Mul, &a.evaluate(row, exists)?, &b.evaluate(row, exists)?),
            Expression::Divide(a, b) => arithmetic(ArithOp::Div, &a.evaluate(row, exists)?, &b.evaluate(row, exists)?),
            Expression::UnaryMinus(a) => {
                let value = Numeric::from_term(&a.evaluate(row, exists)?)?;
                Ok(value.negate().to_term())
            }

            Expression::Bound(v) => Ok(Term::boolean(row.contains(v))),
            Expression::If(cond, then, otherwise) => {
                if cond.effective_boolean(row, exists)? {
                    then.evaluate(row, exists)
                } else {
                    otherwise.evaluate(row, exists)
                }
            }
            Expression::Coalesce(items) => {
                for item in items {
                    match item.evaluate(row, exists) {
                        Ok(t) => return Ok(t),
                        Err(e) if e.is_timeout() => return Err(e),
                        Err(_) => {}
                    }
                }
                Err(RdfError::type_error("COALESCE: no argument evaluated without error"))
            }
            Expression::In(needle, list) => {
                Ok(Term::boolean(in_list(needle, list, row, exists)?))
            }
            Expression::NotIn(needle, list) => {
                Ok(Term::boolean(!in_list(needle, list, row, exists)?))
            }
            Expression::SameTerm(a, b) => {
                Ok(Term::boolean(a.evaluate(row, exists)? == b.evaluate(row, exists)?))
            }
            Expression::Call(function, args) => {
                let values = args
                    .iter()
                    .map(|a| a.evaluate(row, exists))
                    .collect::<RdfResult<Vec<Term>>>()?;
                call_function(*function, &values, row, exists)
            }
            Expression::Exists(pattern) => Ok(Term::boolean(exists.exists(pattern, row)?)),
            Expression::NotExists(pattern) => Ok(Term::boolean(!exists.exists(pattern, row)?)),
        }
    }

    /// Evaluate and reduce to an effective boolean value
    pub fn effective_boolean(&self, row: &Solution, exists: &dyn ExistsEvaluator) -> RdfResult<bool> {
        effective_boolean_value(&self.evaluate(row, exists)?)
    }

    fn relational(
        &self,
        a: &Expression,
        b: &Expression,
        row: &Solution,
        exists: &dyn ExistsEvaluator,
        accept: impl Fn(Ordering) -> bool,
    ) -> RdfResult<Term> {
        let ordering = compare_values(&a.evaluate(row, exists)?, &b.evaluate(row, exists)?)?;
        Ok(Term::boolean(ordering.map_or(false, accept)))
    }

    /// Replace bound variables by constants
    pub fn substitute(&self, row: &Solution) -> Expression {
        let sub = |e: &Expression| Box::new(e.substitute(row));
        let sub_all = |es: &[Expression]| es.iter().map(|e| e.substitute(row)).collect();
        match self {
            Expression::Variable(v) => match row.get(v) {
                Some(t) => Expression::Constant(t.clone()),
                None => self.clone(),
            },
            Expression::Constant(_) => self.clone(),
            Expression::Or(a, b) => Expression::Or(sub(a), sub(b)),
            Expression::And(a, b) => Expression::And(sub(a), sub(b)),
            Expression::Not(a) => Expression::Not(sub(a)),
            Expression::Equal(a, b) => Expression::Equal(sub(a), sub(b)),
            Expression::NotEqual(a, b) => Expression::NotEqual(sub(a), sub(b)),
            Expression::Less(a, b) => Expression::Less(sub(a), sub(b)),
            Expression::LessOrEqual(a, b) => Expression::LessOrEqual(sub(a), sub(b)),
            Expression::Greater(a, b) => Expression::Greater(sub(a), sub(b)),
            Expression::GreaterOrEqual(a, b) => Expression::GreaterOrEqual(sub(a), sub(b)),
            Expression::Add(a, b) => Expression::Add(sub(a), sub(b)),
            Expression::Subtract(a, b) => Expression::Subtract(sub(a), sub(b)),
            Expression::Multiply(a, b) => Expression::Multiply(sub(a), sub(b)),
            Expression::Divide(a, b) => Expression::Divide(sub(a), sub(b)),
            Expression::UnaryMinus(a) => Expression::UnaryMinus(sub(a)),
            Expression::Bound(v) => {
                if row.contains(v) {
                    Expression::Constant(Term::boolean(true))
                } else {
                    self.clone()
                }
            }
            Expression::If(c, a, b) => Expression::If(sub(c), sub(a), sub(b)),
            Expression::Coalesce(items) => Expression::Coalesce(sub_all(items)),
            Expression::In(a, list) => Expression::In(sub(a), sub_all(list)),
            Expression::NotIn(a, list) => Expression::NotIn(sub(a), sub_all(list)),
            Expression::SameTerm(a, b) => Expression::SameTerm(sub(a), sub(b)),
            Expression::Call(f, args) => Expression::Call(*f, sub_all(args)),
            Expression::Exists(p) => Expression::Exists(Box::new(p.substitute(row))),
            Expression::NotExists(p) => Expression::NotExists(Box::new(p.substitute(row))),
        }
    }
}

fn in_list(
    needle: &Expression,
    list: &[Expression],
    row: &Solution,
    exists: &dyn ExistsEvaluator,
) -> RdfResult<bool> {
    let value = needle.evaluate(row, exists)?;
    let mut error = None;
    for item in list {
        match item.evaluate(row, exists).and_then(|t| values_equal(&value, &t)) {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(e) => error = Some(e),
        }
    }
    match error {
        Some(e) => Err(e),
        None => Ok(false),
    }
}

// ============================================================================
// Effective boolean value and comparisons
// ============================================================================

/// SPARQL effective boolean value of a term
pub fn effective_boolean_value(term: &Term) -> RdfResult<bool> {
    let lit = term
        .as_literal()
        .ok_or_else(|| RdfError::type_error(format!("No boolean value for {}", term)))?;
    if lit.datatype_uri() == Some(xsd::BOOLEAN) {
        return Ok(lit.as_boolean().unwrap_or(false));
    }
    if lit.is_numeric() {
        return Ok(lit.as_double().map_or(false, |v| v != 0.0 && !v.is_nan()));
    }
    if lit.is_string() {
        return Ok(!lit.value().is_empty());
    }
    Err(RdfError::type_error(format!("No boolean value for {}", term)))
}

/// Comparable value of a literal
enum Value<'a> {
    Numeric(Numeric),
    String(&'a str),
    LangString(&'a str, &'a str),
    Boolean(bool),
    Temporal(chrono::NaiveDateTime),
    Unknown,
}

fn value_of(lit: &Literal) -> Value<'_> {
    if lit.is_string() {
        return Value::String(lit.value());
    }
    if let Some(lang) = lit.language() {
        return Value::LangString(lit.value(), lang);
    }
    if let Ok(n) = Numeric::from_literal(lit) {
        return Value::Numeric(n);
    }
    if let Some(b) = lit.as_boolean() {
        return Value::Boolean(b);
    }
    if let Some(dt) = lit.datatype_uri() {
        if let Some(t) = parse_temporal(dt, lit.value()) {
            return Value::Temporal(t);
        }
    }
    Value::Unknown
}

/// `=` on RDF terms: value equality for known literal types, term equality
/// otherwise. Unknown literal types with different lexical forms cannot be
/// decided and raise a type error.
pub fn values_equal(a: &Term, b: &Term) -> RdfResult<bool> {
    let (la, lb) = match (a.as_literal(), b.as_literal()) {
        (Some(la), Some(lb)) => (la, lb),
        _ => return Ok(a == b),
    };
    match (value_of(la), value_of(lb)) {
        (Value::Numeric(x), Value::Numeric(y)) => Ok(x.compare(&y) == Some(Ordering::Equal)),
        (Value::String(x), Value::String(y)) => Ok(x == y),
        (Value::LangString(x, l1), Value::LangString(y, l2)) => Ok(x == y && l1 == l2),
        (Value::Boolean(x), Value::Boolean(y)) => Ok(x == y),
        (Value::Temporal(x), Value::Temporal(y)) => Ok(x == y),
        (Value::Unknown, _) | (_, Value::Unknown) => {
            if a == b {
                Ok(true)
            } else {
                Err(RdfError::type_error(format!("Cannot compare {} and {}", a, b)))
            }
        }
        _ => Ok(false),
    }
}

/// Ordering for `<`, `<=`, `>`, `>=`. `Ok(None)` when the values are of a
/// comparable type but unordered (NaN).
pub fn compare_values(a: &Term, b: &Term) -> RdfResult<Option<Ordering>> {
    if let (Some(la), Some(lb)) = (a.as_literal(), b.as_literal()) {
        match (value_of(la), value_of(lb)) {
            (Value::Numeric(x), Value::Numeric(y)) => return Ok(x.compare(&y)),
            (Value::String(x), Value::String(y)) => return Ok(Some(x.cmp(y))),
            (Value::LangString(x, l1), Value::LangString(y, l2)) if l1 == l2 => {
                return Ok(Some(x.cmp(y)))
            }
            (Value::Boolean(x), Value::Boolean(y)) => return Ok(Some(x.cmp(&y))),
            (Value::Temporal(x), Value::Temporal(y)) => return Ok(Some(x.cmp(&y))),
            _ => {}
        }
    }
    Err(RdfError::type_error(format!("Cannot order {} and {}", a, b)))
}

// ============================================================================
// Numerics
// ============================================================================

/// A numeric value with its XSD type, ordered by promotion rank
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Numeric {
    Integer(i64),
    Decimal(f64),
    Float(f64),
    Double(f64),
}

#[derive(Clone, Copy)]
pub(crate) enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl Numeric {
    pub(crate) fn from_literal(lit: &Literal) -> RdfResult<Numeric> {
        let dt = lit.datatype_uri().unwrap_or_default();
        let invalid = || RdfError::type_error(format!("Not a number: {}", lit));
        if xsd::is_integer_type(dt) {
            return lit.as_integer().map(Numeric::Integer).ok_or_else(invalid);
        }
        let value = lit.as_double().ok_or_else(invalid)?;
        match dt {
            xsd::DECIMAL => Ok(Numeric::Decimal(value)),
            xsd::FLOAT => Ok(Numeric::Float(value)),
            xsd::DOUBLE => Ok(Numeric::Double(value)),
            _ => Err(invalid()),
        }
    }

    pub(crate) fn from_term(term: &Term) -> RdfResult<Numeric> {
        match term.as_literal() {
            Some(lit) => Numeric::from_literal(lit),
            None => Err(RdfError::type_error(format!("Not a number: {}", term))),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Numeric::Integer(_) => 0,
            Numeric::Decimal(_) => 1,
            Numeric::Float(_) => 2,
            Numeric::Double(_) => 3,
        }
    }

    pub(crate) fn as_f64(&self) -> f64 {
        match *self {
            Numeric::Integer(i) => i as f64,
            Numeric::Decimal(v) | Numeric::Float(v) | Numeric::Double(v) => v,
        }
    }

    fn with_rank(rank: u8, value: f64) -> Numeric {
        match rank {
            0 | 1 => Numeric::Decimal(value),
            2 => Numeric::Float(value),
            _ => Numeric::Double(value),
        }
    }

    pub(crate) fn compare(&self, other: &Numeric) -> Option<Ordering> {
        match (self, other) {
            (Numeric::Integer(a), Numeric::Integer(b)) => Some(a.cmp(b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }

    fn negate(&self) -> Numeric {
        match *self {
            Numeric::Integer(i) => i
                .checked_neg()
                .map(Numeric::Integer)
                .unwrap_or(Numeric::Decimal(-(i as f64))),
            Numeric::Decimal(v) => Numeric::Decimal(-v),
            Numeric::Float(v) => Numeric::Float(-v),
            Numeric::Double(v) => Numeric::Double(-v),
        }
    }

    pub(crate) fn apply(op: ArithOp, a: Numeric, b: Numeric) -> RdfResult<Numeric> {
        if let (Numeric::Integer(x), Numeric::Integer(y)) = (a, b) {
            let exact = match op {
                ArithOp::Add => x.checked_add(y),
                ArithOp::Sub => x.checked_sub(y),
                ArithOp::Mul => x.checked_mul(y),
                ArithOp::Div => None,
            };
            if let Some(v) = exact {
                return Ok(Numeric::Integer(v));
            }
        }
        let rank = a.rank().max(b.rank());
        let (x, y) = (a.as_f64(), b.as_f64());
        if matches!(op, ArithOp::Div) && y == 0.0 && rank <= 1 {
            return Err(RdfError::new(ErrorCode::DivisionByZero, "Division by zero"));
        }
        let v = match op {
            ArithOp::Add => x + y,
            ArithOp::Sub => x - y,
            ArithOp::Mul => x * y,
            ArithOp::Div => x / y,
        };
        Ok(Numeric::with_rank(rank, v))
    }

    pub(crate) fn to_term(&self) -> Term {
        match *self {
            Numeric::Integer(i) => Term::integer(i),
            Numeric::Decimal(v) => Term::typed_literal(format_decimal(v), xsd::DECIMAL),
            Numeric::Float(v) => Term::typed_literal(format_double(v), xsd::FLOAT),
            Numeric::Double(v) => Term::typed_literal(format_double(v), xsd::DOUBLE),
        }
    }

    /// Apply a rounding function, keeping the type
    fn map_float(&self, f: impl Fn(f64) -> f64) -> Numeric {
        match *self {
            Numeric::Integer(i) => Numeric::Integer(i),
            Numeric::Decimal(v) => Numeric::Decimal(f(v)),
            Numeric::Float(v) => Numeric::Float(f(v)),
            Numeric::Double(v) => Numeric::Double(f(v)),
        }
    }
}

fn format_decimal(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

fn format_double(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "INF".to_string() } else { "-INF".to_string() }
    } else {
        format!("{:E}", v)
    }
}

fn arithmetic(op: ArithOp, a: &Term, b: &Term) -> RdfResult<Term> {
    let result = Numeric::apply(op, Numeric::from_term(a)?, Numeric::from_term(b)?)?;
    Ok(result.to_term())
}

// ============================================================================
// Built-in functions
// ============================================================================

fn arity(function: Function, args: &[Term], min: usize, max: usize) -> RdfResult<()> {
    if args.len() < min || args.len() > max {
        return Err(RdfError::invalid_argument(
            &format!("{:?}", function),
            format!("expected {}..={} arguments, got {}", min, max, args.len()),
        ));
    }
    Ok(())
}

/// Argument that must be a string literal (simple, xsd:string or language-tagged)
fn string_literal(term: &Term) -> RdfResult<&Literal> {
    match term.as_literal() {
        Some(lit) if lit.is_string() || lit.language().is_some() => Ok(lit),
        _ => Err(RdfError::type_error(format!("Not a string literal: {}", term))),
    }
}

/// Argument compatibility of the two-argument string functions
fn compatible_strings<'a>(a: &'a Term, b: &'a Term) -> RdfResult<(&'a Literal, &'a Literal)> {
    let (x, y) = (string_literal(a)?, string_literal(b)?);
    match (x.language(), y.language()) {
        (_, None) => Ok((x, y)),
        (Some(l1), Some(l2)) if l1 == l2 => Ok((x, y)),
        _ => Err(RdfError::type_error(format!("Incompatible string arguments {} and {}", a, b))),
    }
}

/// A string result carrying over the language tag or xsd:string type of `like`
fn string_like(like: &Literal, value: String) -> Term {
    match (like.language(), like.datatype_uri()) {
        (Some(lang), _) => Term::lang_literal(value, lang),
        (None, Some(dt)) => Term::typed_literal(value, dt),
        _ => Term::literal(value),
    }
}

/// Argument of the hash functions: a simple literal or xsd:string
fn plain_string(term: &Term) -> RdfResult<&str> {
    match term.as_literal() {
        Some(lit) if lit.is_string() => Ok(lit.value()),
        _ => Err(RdfError::type_error(format!("Not a simple string: {}", term))),
    }
}

/// Build a regex with the XPath flags `i`, `s`, `m` and `x`
pub(crate) fn compile_regex(pattern: &str, flags: &str) -> RdfResult<regex::Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            's' => builder.dot_matches_new_line(true),
            'm' => builder.multi_line(true),
            'x' => builder.ignore_whitespace(true),
            other => {
                return Err(RdfError::invalid_argument("REGEX", format!("unknown flag '{}'", other)))
            }
        };
    }
    Ok(builder.build()?)
}

fn regex_argument(pattern: &Term, flags: Option<&Term>, exists: &dyn ExistsEvaluator) -> RdfResult<regex::Regex> {
    let flags = match flags {
        Some(f) => string_literal(f)?.value(),
        None => "",
    };
    exists.regex(string_literal(pattern)?.value(), flags)
}

/// Components of an xsd:dateTime, xsd:date or xsd:time literal
struct Temporal<'a> {
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
    offset: Option<i64>,
    tz: &'a str,
}

fn temporal(term: &Term) -> RdfResult<Temporal<'_>> {
    let invalid = || RdfError::type_error(format!("Not a date or time: {}", term));
    let lit = term.as_literal().ok_or_else(invalid)?;
    let value = lit.value().trim();
    let (head, offset) = split_timezone(value);
    let tz = &value[head.len()..];
    let (date, time) = match lit.datatype_uri() {
        Some(xsd::DATE_TIME) => {
            let dt = NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S%.f").map_err(|_| invalid())?;
            (Some(dt.date()), Some(dt.time()))
        }
        Some(xsd::DATE) => (Some(NaiveDate::parse_from_str(head, "%Y-%m-%d").map_err(|_| invalid())?), None),
        Some(xsd::TIME) => (None, Some(NaiveTime::parse_from_str(head, "%H:%M:%S%.f").map_err(|_| invalid())?)),
        _ => return Err(invalid()),
    };
    Ok(Temporal { date, time, offset, tz })
}

impl Temporal<'_> {
    fn date(&self) -> RdfResult<NaiveDate> {
        self.date.ok_or_else(|| RdfError::type_error("No date component"))
    }

    fn time(&self) -> RdfResult<NaiveTime> {
        self.time.ok_or_else(|| RdfError::type_error("No time component"))
    }
}

/// An offset in seconds as an xsd:dayTimeDuration lexical form
fn day_time_duration(offset: i64) -> String {
    if offset == 0 {
        return "PT0S".to_string();
    }
    let sign = if offset < 0 { "-" } else { "" };
    let (hours, minutes) = (offset.abs() / 3600, offset.abs() % 3600 / 60);
    let mut out = format!("{}PT", sign);
    if hours > 0 {
        out.push_str(&format!("{}H", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}M", minutes));
    }
    out
}

fn lang_matches(tag: &str, range: &str) -> bool {
    if range == "*" {
        return !tag.is_empty();
    }
    let tag = tag.to_ascii_lowercase();
    let range = range.to_ascii_lowercase();
    tag == range || (tag.starts_with(&range) && tag[range.len()..].starts_with('-'))
}

fn call_function(function: Function, args: &[Term], row: &Solution, exists: &dyn ExistsEvaluator) -> RdfResult<Term> {
    use Function::*;
    match function {
        IsIri | IsBlank | IsLiteral | IsNumeric | Str | Lang | Datatype | StrLen | UCase
        | LCase | Abs | Ceil | Floor | Round | Iri | EncodeForUri | Year | Month | Day | Hours
        | Minutes | Seconds | Timezone | Tz | Md5 | Sha1 | Sha256 | Sha384 | Sha512 => {
            arity(function, args, 1, 1)?
        }
        LangMatches | Contains | StrStarts | StrEnds | StrDt | StrLang | StrBefore | StrAfter => {
            arity(function, args, 2, 2)?
        }
        Regex | Substr => arity(function, args, 2, 3)?,
        Replace => arity(function, args, 3, 4)?,
        BNode => arity(function, args, 0, 1)?,
        Concat => {}
    }

    match function {
        IsIri => Ok(Term::boolean(args[0].is_uri())),
        IsBlank => Ok(Term::boolean(args[0].is_blank())),
        IsLiteral => Ok(Term::boolean(args[0].is_literal())),
        IsNumeric => Ok(Term::boolean(Numeric::from_term(&args[0]).is_ok())),
        Str => match &args[0] {
            Term::Uri(u) => Ok(Term::literal(u.as_str())),
            Term::Literal(l) => Ok(Term::literal(l.value())),
            other => Err(RdfError::type_error(format!("STR of {}", other))),
        },
        Lang => match args[0].as_literal() {
            Some(l) => Ok(Term::literal(l.language().unwrap_or(""))),
            None => Err(RdfError::type_error(format!("LANG of {}", args[0]))),
        },
        Datatype => match args[0].as_literal() {
            Some(l) => Ok(Term::uri(l.effective_datatype())),
            None => Err(RdfError::type_error(format!("DATATYPE of {}", args[0]))),
        },
        LangMatches => {
            let tag = string_literal(&args[0])?;
            let range = string_literal(&args[1])?;
            Ok(Term::boolean(lang_matches(tag.value(), range.value())))
        }
        Regex => {
            let text = string_literal(&args[0])?;
            let re = regex_argument(&args[1], args.get(2), exists)?;
            Ok(Term::boolean(re.is_match(text.value())))
        }
        Replace => {
            let text = string_literal(&args[0])?;
            let replacement = string_literal(&args[2])?;
            let re = regex_argument(&args[1], args.get(3), exists)?;
            if re.is_match("") {
                return Err(RdfError::invalid_argument("REPLACE", "pattern matches the empty string"));
            }
            let replaced = re.replace_all(text.value(), replacement.value());
            Ok(string_like(text, replaced.into_owned()))
        }
        StrBefore => {
            let (a, b) = compatible_strings(&args[0], &args[1])?;
            match a.value().find(b.value()) {
                Some(i) => Ok(string_like(a, a.value()[..i].to_string())),
                None => Ok(Term::literal("")),
            }
        }
        StrAfter => {
            let (a, b) = compatible_strings(&args[0], &args[1])?;
            match a.value().find(b.value()) {
                Some(i) => Ok(string_like(a, a.value()[i + b.value().len()..].to_string())),
                None => Ok(Term::literal("")),
            }
        }
        EncodeForUri => {
            let s = string_literal(&args[0])?;
            Ok(Term::literal(utf8_percent_encode(s.value(), URI_COMPONENT).to_string()))
        }
        Contains => {
            let (a, b) = compatible_strings(&args[0], &args[1])?;
            Ok(Term::boolean(a.value().contains(b.value())))
        }
        StrStarts => {
            let (a, b) = compatible_strings(&args[0], &args[1])?;
            Ok(Term::boolean(a.value().starts_with(b.value())))
        }
        StrEnds => {
            let (a, b) = compatible_strings(&args[0], &args[1])?;
            Ok(Term::boolean(a.value().ends_with(b.value())))
        }
        StrLen => {
            let s = string_literal(&args[0])?;
            Ok(Term::integer(s.value().chars().count() as i64))
        }
        UCase => {
            let s = string_literal(&args[0])?;
            Ok(string_like(s, s.value().to_uppercase()))
        }
        LCase => {
            let s = string_literal(&args[0])?;
            Ok(string_like(s, s.value().to_lowercase()))
        }
        Concat => {
            let parts = args.iter().map(string_literal).collect::<RdfResult<Vec<&Literal>>>()?;
            let joined: String = parts.iter().map(|l| l.value()).collect();
            let first = match parts.first() {
                Some(first) => *first,
                None => return Ok(Term::literal("")),
            };
            let same_kind = parts
                .iter()
                .all(|l| l.language() == first.language() && l.datatype_uri() == first.datatype_uri());
            if same_kind {
                Ok(string_like(first, joined))
            } else {
                Ok(Term::literal(joined))
            }
        }
        Substr => {
            let s = string_literal(&args[0])?;
            let start = Numeric::from_term(&args[1])?.as_f64().round();
            let length = match args.get(2) {
                Some(l) => Some(Numeric::from_term(l)?.as_f64().round()),
                None => None,
            };
            // 1-based positions; characters before position 1 are cut by the window
            let end = length.map(|l| start + l);
            let out: String = s
                .value()
                .chars()
                .enumerate()
                .filter(|(i, _)| {
                    let pos = (*i + 1) as f64;
                    pos >= start && end.map_or(true, |e| pos < e)
                })
                .map(|(_, c)| c)
                .collect();
            Ok(string_like(s, out))
        }
        Abs => Ok(match Numeric::from_term(&args[0])? {
            Numeric::Integer(i) => i
                .checked_abs()
                .map(Numeric::Integer)
                .unwrap_or(Numeric::Decimal((i as f64).abs())),
            other => other.map_float(f64::abs),
        }
        .to_term()),
        Ceil => Ok(Numeric::from_term(&args[0])?.map_float(f64::ceil).to_term()),
        Floor => Ok(Numeric::from_term(&args[0])?.map_float(f64::floor).to_term()),
        Round => Ok(Numeric::from_term(&args[0])?
            .map_float(|v| (v + 0.5).floor())
            .to_term()),
        Iri => match &args[0] {
            Term::Uri(_) => Ok(args[0].clone()),
            Term::Literal(l) if l.is_string() => Term::try_uri(l.value()),
            other => Err(RdfError::type_error(format!("IRI of {}", other))),
        },
        StrDt => {
            let lexical = match args[0].as_literal() {
                Some(l) if l.is_plain() => l,
                _ => return Err(RdfError::type_error("STRDT expects a simple literal")),
            };
            let datatype = args[1]
                .as_uri()
                .ok_or_else(|| RdfError::type_error("STRDT expects a datatype IRI"))?;
            Ok(Term::typed_literal(lexical.value(), datatype.as_str()))
        }
        StrLang => {
            let lexical = match args[0].as_literal() {
                Some(l) if l.is_plain() => l,
                _ => return Err(RdfError::type_error("STRLANG expects a simple literal")),
            };
            let lang = string_literal(&args[1])?;
            Term::try_literal(lexical.value(), Some(lang.value()), None)
        }
        Year => Ok(Term::integer(temporal(&args[0])?.date()?.year() as i64)),
        Month => Ok(Term::integer(temporal(&args[0])?.date()?.month() as i64)),
        Day => Ok(Term::integer(temporal(&args[0])?.date()?.day() as i64)),
        Hours => Ok(Term::integer(temporal(&args[0])?.time()?.hour() as i64)),
        Minutes => Ok(Term::integer(temporal(&args[0])?.time()?.minute() as i64)),
        Seconds => {
            let time = temporal(&args[0])?.time()?;
            let seconds = time.second() as f64 + time.nanosecond() as f64 / 1e9;
            Ok(Numeric::Decimal(seconds).to_term())
        }
        Timezone => match temporal(&args[0])?.offset {
            Some(offset) => Ok(Term::typed_literal(day_time_duration(offset), xsd::DAY_TIME_DURATION)),
            None => Err(RdfError::type_error(format!("No timezone in {}", args[0]))),
        },
        Tz => Ok(Term::literal(temporal(&args[0])?.tz)),
        BNode => match args.first() {
            None => Ok(Term::fresh_blank()),
            Some(label) => Ok(exists.labelled_blank(plain_string(label)?, row)),
        },
        Md5 => Ok(Term::literal(hex::encode(md5::Md5::digest(plain_string(&args[0])?.as_bytes())))),
        Sha1 => Ok(Term::literal(hex::encode(sha1::Sha1::digest(plain_string(&args[0])?.as_bytes())))),
        Sha256 => Ok(Term::literal(hex::encode(sha2::Sha256::digest(plain_string(&args[0])?.as_bytes())))),
        Sha384 => Ok(Term::literal(hex::encode(sha2::Sha384::digest(plain_string(&args[0])?.as_bytes())))),
        Sha512 => Ok(Term::literal(hex::encode(sha2::Sha512::digest(plain_string(&args[0])?.as_bytes())))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoPatterns;

    impl ExistsEvaluator for NoPatterns {
        fn exists(&self, _pattern: &Algebra, _row: &Solution) -> RdfResult<bool> {
            Ok(false)
        }
    }

    fn eval(expr: &Expression) -> RdfResult<Term> {
        expr.evaluate(&Solution::new(), &NoPatterns)
    }

    fn int(v: i64) -> Expression {
        Expression::integer(v)
    }

    fn lit(s: &str) -> Expression {
        Expression::constant(Term::literal(s))
    }

    fn error() -> Expression {
        Expression::var("unbound")
    }

    fn t() -> Expression {
        Expression::constant(Term::boolean(true))
    }

    fn f() -> Expression {
        Expression::constant(Term::boolean(false))
    }

    #[test]
    fn test_three_valued_logic() {
        assert_eq!(eval(&Expression::or(error(), t())), Ok(Term::boolean(true)));
        assert_eq!(eval(&Expression::or(t(), error())), Ok(Term::boolean(true)));
        assert!(eval(&Expression::or(error(), f())).is_err());
        assert_eq!(eval(&Expression::and(error(), f())), Ok(Term::boolean(false)));
        assert!(eval(&Expression::and(t(), error())).is_err());
        assert!(eval(&Expression::not(error())).is_err());
    }

    #[test]
    fn test_numeric_comparison_and_promotion() {
        assert_eq!(eval(&Expression::gt(int(10), int(9))), Ok(Term::boolean(true)));
        let half = Expression::constant(Term::typed_literal("0.5", xsd::DECIMAL));
        assert_eq!(eval(&Expression::lt(half.clone(), int(1))), Ok(Term::boolean(true)));
        assert_eq!(eval(&Expression::add(int(2), int(3))), Ok(Term::integer(5)));
        assert_eq!(
            eval(&Expression::div(int(1), int(2))),
            Ok(Term::typed_literal("0.5", xsd::DECIMAL))
        );
        assert_eq!(
            eval(&Expression::div(int(1), int(0))).unwrap_err().code,
            ErrorCode::DivisionByZero
        );
        assert_eq!(
            eval(&Expression::eq(int(1), Expression::constant(Term::typed_literal("1.0", xsd::DECIMAL)))),
            Ok(Term::boolean(true))
        );
    }

    #[test]
    fn test_incomparable_types_error() {
        assert!(eval(&Expression::lt(int(1), lit("a"))).is_err());
        assert_eq!(eval(&Expression::eq(int(1), lit("1"))), Ok(Term::boolean(false)));
        let odd = |v: &str| Expression::constant(Term::typed_literal(v, "http://ex.org/dt"));
        assert!(eval(&Expression::eq(odd("a"), odd("b"))).is_err());
        assert_eq!(eval(&Expression::eq(odd("a"), odd("a"))), Ok(Term::boolean(true)));
    }

    #[test]
    fn test_effective_boolean_value() {
        assert_eq!(effective_boolean_value(&Term::literal("")), Ok(false));
        assert_eq!(effective_boolean_value(&Term::literal("x")), Ok(true));
        assert_eq!(effective_boolean_value(&Term::integer(0)), Ok(false));
        assert!(effective_boolean_value(&Term::uri("http://ex.org/")).is_err());
    }

    #[test]
    fn test_in_and_coalesce() {
        let e = Expression::In(Box::new(int(2)), vec![int(1), int(2)]);
        assert_eq!(eval(&e), Ok(Term::boolean(true)));
        let e = Expression::NotIn(Box::new(int(3)), vec![int(1), int(2)]);
        assert_eq!(eval(&e), Ok(Term::boolean(true)));
        let e = Expression::In(Box::new(int(3)), vec![error(), int(2)]);
        assert!(eval(&e).is_err());
        let e = Expression::Coalesce(vec![error(), int(7)]);
        assert_eq!(eval(&e), Ok(Term::integer(7)));
    }

    #[test]
    fn test_string_functions() {
        let call = |f, args| eval(&Expression::call(f, args));
        assert_eq!(call(Function::StrLen, vec![lit("héllo")]), Ok(Term::integer(5)));
        assert_eq!(
            call(Function::UCase, vec![Expression::constant(Term::lang_literal("abc", "en"))]),
            Ok(Term::lang_literal("ABC", "en"))
        );
        assert_eq!(call(Function::Contains, vec![lit("foobar"), lit("oba")]), Ok(Term::boolean(true)));
        assert_eq!(call(Function::StrStarts, vec![lit("foobar"), lit("foo")]), Ok(Term::boolean(true)));
        assert_eq!(
            call(Function::Substr, vec![lit("foobar"), int(4)]),
            Ok(Term::literal("bar"))
        );
        assert_eq!(
            call(Function::Substr, vec![lit("foobar"), int(2), int(3)]),
            Ok(Term::literal("oob"))
        );
        assert_eq!(
            call(Function::Concat, vec![lit("a"), lit("b")]),
            Ok(Term::literal("ab"))
        );
        assert_eq!(
            call(Function::Regex, vec![lit("Alice"), lit("^ali"), lit("i")]),
            Ok(Term::boolean(true))
        );
        assert!(call(Function::Regex, vec![lit("x"), lit("(")]).is_err());
    }

    #[test]
    fn test_term_functions() {
        let call = |f, args| eval(&Expression::call(f, args));
        let iri = Expression::constant(Term::uri("http://ex.org/a"));
        assert_eq!(call(Function::Str, vec![iri.clone()]), Ok(Term::literal("http://ex.org/a")));
        assert_eq!(call(Function::IsIri, vec![iri]), Ok(Term::boolean(true)));
        assert_eq!(call(Function::Datatype, vec![int(1)]), Ok(Term::uri(xsd::INTEGER)));
        assert_eq!(
            call(Function::LangMatches, vec![lit("en-GB"), lit("en")]),
            Ok(Term::boolean(true))
        );
        assert_eq!(
            call(Function::StrDt, vec![lit("5"), Expression::constant(Term::uri(xsd::INTEGER))]),
            Ok(Term::integer(5))
        );
        assert!(call(Function::Iri, vec![lit("not absolute")]).is_err());
    }

    #[test]
    fn test_rounding() {
        let call = |f, args| eval(&Expression::call(f, args));
        let d = |v: &str| Expression::constant(Term::typed_literal(v, xsd::DECIMAL));
        assert_eq!(call(Function::Round, vec![d("2.5")]), Ok(Term::typed_literal("3.0", xsd::DECIMAL)));
        assert_eq!(call(Function::Floor, vec![d("-1.5")]), Ok(Term::typed_literal("-2.0", xsd::DECIMAL)));
        assert_eq!(call(Function::Abs, vec![int(-4)]), Ok(Term::integer(4)));
    }

    #[test]
    fn test_replace_and_substring_search() {
        let call = |f, args| eval(&Expression::call(f, args));
        let en = |s: &str| Expression::constant(Term::lang_literal(s, "en"));
        assert_eq!(call(Function::Replace, vec![lit("abab"), lit("B"), lit("Z"), lit("i")]), Ok(Term::literal("aZaZ")));
        assert_eq!(
            call(Function::Replace, vec![en("abc"), lit("(b)"), lit("[$1]")]),
            Ok(Term::lang_literal("a[b]c", "en"))
        );
        assert!(call(Function::Replace, vec![lit("abc"), lit("x*"), lit("y")]).is_err());

        assert_eq!(call(Function::StrBefore, vec![lit("abc"), lit("b")]), Ok(Term::literal("a")));
        assert_eq!(call(Function::StrBefore, vec![en("abc"), lit("b")]), Ok(Term::lang_literal("a", "en")));
        assert_eq!(call(Function::StrBefore, vec![en("abc"), lit("z")]), Ok(Term::literal("")));
        assert_eq!(call(Function::StrAfter, vec![lit("abc"), lit("b")]), Ok(Term::literal("c")));
        assert_eq!(call(Function::StrAfter, vec![lit("abc"), lit("")]), Ok(Term::literal("abc")));
        assert!(call(Function::StrAfter, vec![lit("abc"), en("b")]).is_err());
    }

    #[test]
    fn test_encode_for_uri() {
        let call = |f, args| eval(&Expression::call(f, args));
        assert_eq!(call(Function::EncodeForUri, vec![lit("Los Angeles")]), Ok(Term::literal("Los%20Angeles")));
        assert_eq!(call(Function::EncodeForUri, vec![lit("a-b_c.d~é")]), Ok(Term::literal("a-b_c.d~%C3%A9")));
        assert!(call(Function::EncodeForUri, vec![int(1)]).is_err());
    }

    #[test]
    fn test_date_time_accessors() {
        let call = |f, args| eval(&Expression::call(f, args));
        let dt = |v: &str| Expression::constant(Term::typed_literal(v, xsd::DATE_TIME));
        let value = dt("2011-01-10T14:45:13.5-05:00");
        assert_eq!(call(Function::Year, vec![value.clone()]), Ok(Term::integer(2011)));
        assert_eq!(call(Function::Month, vec![value.clone()]), Ok(Term::integer(1)));
        assert_eq!(call(Function::Day, vec![value.clone()]), Ok(Term::integer(10)));
        assert_eq!(call(Function::Hours, vec![value.clone()]), Ok(Term::integer(14)));
        assert_eq!(call(Function::Minutes, vec![value.clone()]), Ok(Term::integer(45)));
        assert_eq!(call(Function::Seconds, vec![value.clone()]), Ok(Term::typed_literal("13.5", xsd::DECIMAL)));
        assert_eq!(
            call(Function::Timezone, vec![value.clone()]),
            Ok(Term::typed_literal("-PT5H", xsd::DAY_TIME_DURATION))
        );
        assert_eq!(call(Function::Tz, vec![value]), Ok(Term::literal("-05:00")));

        let utc = dt("2011-01-10T14:45:13Z");
        assert_eq!(call(Function::Timezone, vec![utc.clone()]), Ok(Term::typed_literal("PT0S", xsd::DAY_TIME_DURATION)));
        assert_eq!(call(Function::Tz, vec![utc]), Ok(Term::literal("Z")));
        assert_eq!(
            call(Function::Timezone, vec![dt("2011-01-10T14:45:13+05:30")]),
            Ok(Term::typed_literal("PT5H30M", xsd::DAY_TIME_DURATION))
        );

        let local = dt("2011-01-10T14:45:13");
        assert!(call(Function::Timezone, vec![local.clone()]).is_err());
        assert_eq!(call(Function::Tz, vec![local]), Ok(Term::literal("")));

        let date = Expression::constant(Term::typed_literal("2020-02-29", xsd::DATE));
        assert_eq!(call(Function::Year, vec![date.clone()]), Ok(Term::integer(2020)));
        assert!(call(Function::Hours, vec![date]).is_err());
        assert!(call(Function::Year, vec![lit("2020-02-29")]).is_err());
    }

    #[test]
    fn test_hash_functions() {
        let call = |f, args| eval(&Expression::call(f, args));
        let hash = |f| match call(f, vec![lit("abc")]) {
            Ok(Term::Literal(l)) => l.value().to_string(),
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(hash(Function::Md5), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(hash(Function::Sha1), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(hash(Function::Sha256), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
        assert!(hash(Function::Sha384).starts_with("cb00753f"));
        assert_eq!(hash(Function::Sha384).len(), 96);
        assert!(hash(Function::Sha512).starts_with("ddaf35a1"));
        assert_eq!(hash(Function::Sha512).len(), 128);

        let tagged = Expression::constant(Term::lang_literal("abc", "en"));
        assert!(call(Function::Md5, vec![tagged]).is_err());
    }

    #[test]
    fn test_bnode() {
        let call = |f, args| eval(&Expression::call(f, args));
        assert!(call(Function::BNode, vec![]).map(|t| t.is_blank()).unwrap_or(false));
        assert!(call(Function::BNode, vec![lit("x")]).map(|t| t.is_blank()).unwrap_or(false));
        assert!(call(Function::BNode, vec![int(1)]).is_err());
        assert!(call(Function::BNode, vec![lit("a"), lit("b")]).is_err());
    }

    struct Expired;

    impl ExistsEvaluator for Expired {
        fn exists(&self, _pattern: &Algebra, _row: &Solution) -> RdfResult<bool> {
            Err(RdfError::timeout(10, 5))
        }
    }

    #[test]
    fn test_coalesce_passes_timeout_through() {
        let e = Expression::Coalesce(vec![error(), Expression::exists(Algebra::Empty), int(7)]);
        let err = e.evaluate(&Solution::new(), &Expired).unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(e.evaluate(&Solution::new(), &NoPatterns), Ok(Term::boolean(false)));
    }

    #[test]
    fn test_bound_and_substitute() {
        let mut row = Solution::new();
        row.insert(Variable::new("x"), Term::integer(1));
        let e = Expression::and(Expression::bound("x"), Expression::eq(Expression::var("x"), int(1)));
        assert_eq!(e.evaluate(&row, &NoPatterns), Ok(Term::boolean(true)));

        let substituted = e.substitute(&row);
        assert_eq!(eval(&substituted), Ok(Term::boolean(true)));
    }
}
