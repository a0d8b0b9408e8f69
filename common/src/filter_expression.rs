//! Filter condition model and the search engine's textual filter grammar.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("invalid field name: {0:?}")]
    InvalidFieldName(String),
    #[error("operator {operator} cannot be applied to the value given for field {field:?}")]
    TypeMismatch {
        field: String,
        operator: FilterOperator,
    },
    #[error("cannot parse filter expression: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ":")]
    Match,
    #[serde(rename = ":=")]
    Exact,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "range")]
    Range,
}

impl FilterOperator {
    /// The engine grammar has no bare `=`; it is a model-level alias of `:=`.
    pub fn canonical(self) -> FilterOperator {
        match self {
            FilterOperator::Eq => FilterOperator::Exact,
            other => other,
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            FilterOperator::Eq => "=",
            FilterOperator::NotEq => "!=",
            FilterOperator::Gt => ">",
            FilterOperator::Gte => ">=",
            FilterOperator::Lt => "<",
            FilterOperator::Lte => "<=",
            FilterOperator::Match => ":",
            FilterOperator::Exact => ":=",
            FilterOperator::In => "in",
            FilterOperator::Range => "range",
        };
        write!(f, "{}", token)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl LogicalOperator {
    pub fn token(self) -> &'static str {
        match self {
            LogicalOperator::And => "&&",
            LogicalOperator::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Number(f64),
    String(String),
    NumberPair([f64; 2]),
    List(Vec<String>),
}

impl FilterValue {
    fn render_scalar(&self) -> Option<String> {
        match self {
            FilterValue::Bool(b) => Some(b.to_string()),
            FilterValue::Number(n) => Some(render_number(*n)),
            FilterValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Grammar-level equivalence. The serialized text cannot distinguish
    /// `String("42")` from `Number(42.0)` or `String("true")` from
    /// `Bool(true)`, so scalars compare by their rendered form.
    pub fn equivalent(&self, other: &FilterValue) -> bool {
        match (self.render_scalar(), other.render_scalar()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }
}

fn render_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// One clause of an engine filter expression.
///
/// `logical_operator` is the connective *preceding* this clause when it is
/// joined with the clauses before it; the first clause of a sequence has none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub id: Uuid,
    pub field: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
    pub logical_operator: Option<LogicalOperator>,
}

impl FilterCondition {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        FilterCondition {
            id: Uuid::new_v4(),
            field: field.into(),
            operator,
            value,
            logical_operator: None,
        }
    }

    pub fn with_connective(mut self, connective: LogicalOperator) -> Self {
        self.logical_operator = Some(connective);
        self
    }

    /// Equality up to what the grammar can express: operators compare
    /// canonically and scalar values by rendered form, so a condition
    /// survives a serialize/parse cycle as an equivalent of itself.
    pub fn equivalent(&self, other: &FilterCondition) -> bool {
        self.field == other.field
            && self.operator.canonical() == other.operator.canonical()
            && self.value.equivalent(&other.value)
            && self.logical_operator == other.logical_operator
    }
}

fn is_valid_field_name(field: &str) -> bool {
    let mut chars = field.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Serializes one condition to the engine grammar, e.g. `price:>=10` or
/// `category:[books,games]`.
pub fn serialize(condition: &FilterCondition) -> Result<String, FilterError> {
    if !is_valid_field_name(&condition.field) {
        return Err(FilterError::InvalidFieldName(condition.field.clone()));
    }
    let mismatch = || FilterError::TypeMismatch {
        field: condition.field.clone(),
        operator: condition.operator,
    };
    let field = &condition.field;
    let rendered = match condition.operator.canonical() {
        FilterOperator::Match => {
            let v = condition.value.render_scalar().ok_or_else(mismatch)?;
            format!("{field}:{v}")
        }
        FilterOperator::Exact => {
            let v = condition.value.render_scalar().ok_or_else(mismatch)?;
            format!("{field}:={v}")
        }
        FilterOperator::NotEq => {
            let v = condition.value.render_scalar().ok_or_else(mismatch)?;
            format!("{field}:!={v}")
        }
        op @ (FilterOperator::Gt | FilterOperator::Gte | FilterOperator::Lt | FilterOperator::Lte) => {
            let n = match &condition.value {
                FilterValue::Number(n) => render_number(*n),
                _ => return Err(mismatch()),
            };
            format!("{field}:{op}{n}")
        }
        FilterOperator::In => {
            let values = match &condition.value {
                FilterValue::List(values) => values.join(","),
                _ => return Err(mismatch()),
            };
            format!("{field}:[{values}]")
        }
        FilterOperator::Range => {
            let [lo, hi] = match &condition.value {
                FilterValue::NumberPair(pair) => pair,
                _ => return Err(mismatch()),
            };
            format!("{field}:[{}..{}]", render_number(*lo), render_number(*hi))
        }
        FilterOperator::Eq => unreachable!("canonicalized above"),
    };
    Ok(rendered)
}

/// Joins a sequence of conditions using each condition's own preceding
/// connective. An empty sequence yields an empty string ("no filter").
pub fn serialize_all(conditions: &[FilterCondition]) -> Result<String, FilterError> {
    let mut out = String::new();
    for (i, condition) in conditions.iter().enumerate() {
        if i > 0 {
            let connective = condition.logical_operator.unwrap_or(LogicalOperator::And);
            out.push_str(" ");
            out.push_str(connective.token());
            out.push_str(" ");
        }
        out.push_str(&serialize(condition)?);
    }
    Ok(out)
}

/// Inverse of [`serialize_all`], up to canonicalization: `=` comes back as
/// `:=`, and scalars come back in their inferred type (`status:=42` yields
/// a `Number`, whatever the original value variant was) — use
/// [`FilterCondition::equivalent`] to compare across a round trip. Splits
/// on `&&` / `||` outside brackets only.
pub fn parse(text: &str) -> Result<Vec<FilterCondition>, FilterError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(vec![]);
    }
    let mut conditions = Vec::new();
    for (connective, clause) in split_top_level(text) {
        let clause = clause.trim();
        if clause.is_empty() {
            return Err(FilterError::Parse(format!("empty clause in {:?}", text)));
        }
        let mut condition = parse_clause(clause)?;
        condition.logical_operator = connective;
        conditions.push(condition);
    }
    if let Some(first) = conditions.first_mut() {
        first.logical_operator = None;
    }
    Ok(conditions)
}

/// Splits at `&&` / `||` that sit outside `[...]`, keeping the connective
/// that preceded each produced clause (the first clause has none).
fn split_top_level(text: &str) -> Vec<(Option<LogicalOperator>, String)> {
    let bytes = text.as_bytes();
    let mut clauses = Vec::new();
    let mut depth: usize = 0;
    let mut start = 0;
    let mut connective = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'[' => depth += 1,
            b']' => depth = depth.saturating_sub(1),
            b'&' | b'|' if depth == 0 && i + 1 < bytes.len() && bytes[i + 1] == bytes[i] => {
                clauses.push((connective, text[start..i].to_string()));
                connective = Some(if bytes[i] == b'&' {
                    LogicalOperator::And
                } else {
                    LogicalOperator::Or
                });
                i += 2;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    clauses.push((connective, text[start..].to_string()));
    clauses
}

fn parse_clause(clause: &str) -> Result<FilterCondition, FilterError> {
    let colon = clause
        .find(':')
        .ok_or_else(|| FilterError::Parse(format!("missing ':' in clause {:?}", clause)))?;
    let field = clause[..colon].trim().to_string();
    if !is_valid_field_name(&field) {
        return Err(FilterError::InvalidFieldName(field));
    }
    let rest = clause[colon + 1..].trim();
    let (operator, value) = if let Some(v) = rest.strip_prefix('=') {
        (FilterOperator::Exact, parse_scalar(v.trim()))
    } else if let Some(v) = rest.strip_prefix("!=") {
        (FilterOperator::NotEq, parse_scalar(v.trim()))
    } else if let Some(v) = rest.strip_prefix(">=") {
        (FilterOperator::Gte, parse_numeric(v.trim(), &field, FilterOperator::Gte)?)
    } else if let Some(v) = rest.strip_prefix('>') {
        (FilterOperator::Gt, parse_numeric(v.trim(), &field, FilterOperator::Gt)?)
    } else if let Some(v) = rest.strip_prefix("<=") {
        (FilterOperator::Lte, parse_numeric(v.trim(), &field, FilterOperator::Lte)?)
    } else if let Some(v) = rest.strip_prefix('<') {
        (FilterOperator::Lt, parse_numeric(v.trim(), &field, FilterOperator::Lt)?)
    } else if rest.starts_with('[') {
        parse_bracketed(rest, &field)?
    } else {
        (FilterOperator::Match, parse_scalar(rest))
    };
    Ok(FilterCondition::new(field, operator, value))
}

fn parse_bracketed(rest: &str, field: &str) -> Result<(FilterOperator, FilterValue), FilterError> {
    let inner = rest
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .ok_or_else(|| FilterError::Parse(format!("unterminated bracket in clause for field {:?}", field)))?;
    if let Some((lo, hi)) = inner.split_once("..") {
        let lo = lo.trim().parse::<f64>();
        let hi = hi.trim().parse::<f64>();
        match (lo, hi) {
            (Ok(lo), Ok(hi)) => return Ok((FilterOperator::Range, FilterValue::NumberPair([lo, hi]))),
            _ => {
                return Err(FilterError::TypeMismatch {
                    field: field.to_string(),
                    operator: FilterOperator::Range,
                });
            }
        }
    }
    let values = if inner.trim().is_empty() {
        vec![]
    } else {
        inner.split(',').map(|v| v.trim().to_string()).collect()
    };
    Ok((FilterOperator::In, FilterValue::List(values)))
}

fn parse_scalar(text: &str) -> FilterValue {
    if text == "true" {
        return FilterValue::Bool(true);
    }
    if text == "false" {
        return FilterValue::Bool(false);
    }
    if let Ok(n) = text.parse::<f64>() {
        return FilterValue::Number(n);
    }
    FilterValue::String(text.to_string())
}

fn parse_numeric(text: &str, field: &str, operator: FilterOperator) -> Result<FilterValue, FilterError> {
    text.parse::<f64>()
        .map(FilterValue::Number)
        .map_err(|_| FilterError::TypeMismatch {
            field: field.to_string(),
            operator,
        })
}

/// Appends the facet selections for one collection to a base condition list.
///
/// Values selected within one field go into a single `In` clause (OR
/// semantics); distinct fields are AND-connected. BTree ordering makes the
/// output independent of the order selections were made in.
pub fn combine_with_facet_selections(
    base: &[FilterCondition],
    selections: &BTreeMap<String, BTreeSet<String>>,
) -> Vec<FilterCondition> {
    let mut combined = base.to_vec();
    for (field, values) in selections {
        if values.is_empty() {
            continue;
        }
        combined.push(
            FilterCondition::new(
                field.clone(),
                FilterOperator::In,
                FilterValue::List(values.iter().cloned().collect()),
            )
            .with_connective(LogicalOperator::And),
        );
    }
    if let Some(first) = combined.first_mut() {
        first.logical_operator = None;
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(field: &str, op: FilterOperator, value: FilterValue) -> FilterCondition {
        FilterCondition::new(field, op, value)
    }

    #[test]
    fn serializes_every_operator_form() {
        let cases = vec![
            (cond("status", FilterOperator::Match, FilterValue::String("open".into())), "status:open"),
            (cond("status", FilterOperator::Exact, FilterValue::String("open".into())), "status:=open"),
            (cond("status", FilterOperator::Eq, FilterValue::String("open".into())), "status:=open"),
            (cond("status", FilterOperator::NotEq, FilterValue::String("open".into())), "status:!=open"),
            (cond("price", FilterOperator::Gt, FilterValue::Number(10.0)), "price:>10"),
            (cond("price", FilterOperator::Gte, FilterValue::Number(10.5)), "price:>=10.5"),
            (cond("price", FilterOperator::Lt, FilterValue::Number(99.0)), "price:<99"),
            (cond("price", FilterOperator::Lte, FilterValue::Number(99.0)), "price:<=99"),
            (
                cond(
                    "category",
                    FilterOperator::In,
                    FilterValue::List(vec!["books".into(), "games".into()]),
                ),
                "category:[books,games]",
            ),
            (
                cond("price", FilterOperator::Range, FilterValue::NumberPair([10.0, 99.0])),
                "price:[10..99]",
            ),
            (cond("in_stock", FilterOperator::Exact, FilterValue::Bool(true)), "in_stock:=true"),
        ];
        for (condition, expected) in cases {
            assert_eq!(serialize(&condition).unwrap(), expected);
        }
    }

    #[test]
    fn rejects_invalid_field_names() {
        for bad in ["", "9lives", "with space", "dash-ed", "dotted.path"] {
            let c = cond(bad, FilterOperator::Exact, FilterValue::String("x".into()));
            assert_eq!(serialize(&c), Err(FilterError::InvalidFieldName(bad.to_string())));
        }
    }

    #[test]
    fn rejects_type_mismatches() {
        let ordering_on_string = cond("price", FilterOperator::Gt, FilterValue::String("ten".into()));
        assert!(matches!(serialize(&ordering_on_string), Err(FilterError::TypeMismatch { .. })));

        let in_on_scalar = cond("category", FilterOperator::In, FilterValue::String("books".into()));
        assert!(matches!(serialize(&in_on_scalar), Err(FilterError::TypeMismatch { .. })));

        let range_on_scalar = cond("price", FilterOperator::Range, FilterValue::Number(10.0));
        assert!(matches!(serialize(&range_on_scalar), Err(FilterError::TypeMismatch { .. })));
    }

    #[test]
    fn joins_with_each_conditions_own_connective() {
        let conditions = vec![
            cond("status", FilterOperator::Exact, FilterValue::String("open".into())),
            cond("price", FilterOperator::Gt, FilterValue::Number(10.0))
                .with_connective(LogicalOperator::Or),
            cond("in_stock", FilterOperator::Exact, FilterValue::Bool(true))
                .with_connective(LogicalOperator::And),
        ];
        assert_eq!(
            serialize_all(&conditions).unwrap(),
            "status:=open || price:>10 && in_stock:=true"
        );
        assert_eq!(serialize_all(&[]).unwrap(), "");
    }

    #[test]
    fn parse_inverts_serialize_all() {
        let conditions = vec![
            cond("status", FilterOperator::Eq, FilterValue::String("open".into())),
            cond("price", FilterOperator::Gte, FilterValue::Number(10.5))
                .with_connective(LogicalOperator::And),
            cond(
                "category",
                FilterOperator::In,
                FilterValue::List(vec!["books".into(), "games".into()]),
            )
            .with_connective(LogicalOperator::Or),
            cond("year", FilterOperator::Range, FilterValue::NumberPair([1990.0, 2020.0]))
                .with_connective(LogicalOperator::And),
            cond("title", FilterOperator::Match, FilterValue::String("dune".into()))
                .with_connective(LogicalOperator::And),
        ];
        let text = serialize_all(&conditions).unwrap();
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed.len(), conditions.len());
        for (parsed, original) in parsed.iter().zip(&conditions) {
            assert!(parsed.equivalent(original), "{parsed:?} vs {original:?}");
            assert_eq!(parsed.value, original.value);
        }
        assert_eq!(parsed[0].logical_operator, None);
    }

    #[test]
    fn round_trip_of_numeric_and_boolean_looking_strings_is_equivalent() {
        // the grammar has no quoting, so `status:=42` cannot say whether the
        // value was typed as a string or a number; round trips land on the
        // inferred type but stay equivalent
        let conditions = vec![
            cond("status", FilterOperator::Exact, FilterValue::String("42".into())),
            cond("archived", FilterOperator::Match, FilterValue::String("true".into()))
                .with_connective(LogicalOperator::And),
            cond("in_stock", FilterOperator::Exact, FilterValue::Bool(true))
                .with_connective(LogicalOperator::And),
            cond("price", FilterOperator::NotEq, FilterValue::Number(10.0))
                .with_connective(LogicalOperator::Or),
        ];
        let text = serialize_all(&conditions).unwrap();
        assert_eq!(text, "status:=42 && archived:true && in_stock:=true || price:!=10");

        let parsed = parse(&text).unwrap();
        assert_eq!(parsed[0].value, FilterValue::Number(42.0));
        assert_eq!(parsed[1].value, FilterValue::Bool(true));
        for (parsed, original) in parsed.iter().zip(&conditions) {
            assert!(parsed.equivalent(original), "{parsed:?} vs {original:?}");
        }
        // a second cycle is a fixed point: the inferred types re-serialize
        // to the same text
        assert_eq!(serialize_all(&parsed).unwrap(), text);
    }

    #[test]
    fn equivalence_compares_scalars_by_rendered_form_only() {
        assert!(FilterValue::String("42".into()).equivalent(&FilterValue::Number(42.0)));
        assert!(FilterValue::String("true".into()).equivalent(&FilterValue::Bool(true)));
        assert!(!FilterValue::String("42".into()).equivalent(&FilterValue::Number(43.0)));
        assert!(
            !FilterValue::List(vec!["a".into()]).equivalent(&FilterValue::String("a".into()))
        );

        let eq = cond("status", FilterOperator::Eq, FilterValue::String("42".into()));
        let exact = cond("status", FilterOperator::Exact, FilterValue::Number(42.0));
        assert!(eq.equivalent(&exact));
    }

    #[test]
    fn parse_does_not_split_inside_brackets() {
        // a list value containing ".." must not be confused with a range
        let parsed = parse("tags:[a,b] && price:[1..2]").unwrap();
        assert_eq!(parsed[0].operator, FilterOperator::In);
        assert_eq!(parsed[0].value, FilterValue::List(vec!["a".into(), "b".into()]));
        assert_eq!(parsed[1].operator, FilterOperator::Range);
        assert_eq!(parsed[1].value, FilterValue::NumberPair([1.0, 2.0]));
    }

    #[test]
    fn parse_empty_is_no_filter() {
        assert_eq!(parse("").unwrap(), vec![]);
        assert_eq!(parse("   ").unwrap(), vec![]);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(parse("no_operator_here"), Err(FilterError::Parse(_))));
        assert!(matches!(parse("price:[1..x]"), Err(FilterError::TypeMismatch { .. })));
        assert!(matches!(parse("bad name:=x"), Err(FilterError::InvalidFieldName(_))));
    }

    #[test]
    fn facet_combination_is_order_independent_per_field() {
        let base = vec![cond("status", FilterOperator::Exact, FilterValue::String("open".into()))];

        let mut first = BTreeMap::new();
        first.insert(
            "category".to_string(),
            BTreeSet::from(["a".to_string(), "b".to_string(), "c".to_string()]),
        );
        let mut second = BTreeMap::new();
        second.insert(
            "category".to_string(),
            BTreeSet::from(["c".to_string(), "a".to_string(), "b".to_string()]),
        );

        let a = serialize_all(&combine_with_facet_selections(&base, &first)).unwrap();
        let b = serialize_all(&combine_with_facet_selections(&base, &second)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "status:=open && category:[a,b,c]");
    }

    #[test]
    fn facet_combination_ands_distinct_fields() {
        let mut selections = BTreeMap::new();
        selections.insert("format".to_string(), BTreeSet::from(["pdf".to_string()]));
        selections.insert(
            "category".to_string(),
            BTreeSet::from(["books".to_string(), "games".to_string()]),
        );
        selections.insert("unused".to_string(), BTreeSet::new());

        let combined = combine_with_facet_selections(&[], &selections);
        assert_eq!(combined.len(), 2);
        assert_eq!(combined[0].logical_operator, None);
        assert_eq!(
            serialize_all(&combined).unwrap(),
            "category:[books,games] && format:[pdf]"
        );
    }
}
