//! Resolution of parameter lists against the data context.
//!
//! A parameter is either a literal JSON value or a reference string in the
//! style of template literal interpolation: `${name}` or `${name.path.to.prop}`.
//! Numeric path segments index into arrays. Anything that cannot be resolved
//! becomes `null`.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::types::DataContext;

lazy_static! {
    // Either a plain identifier or a dotted path, anywhere in the string
    static ref REFERENCE_REGEX: Regex = Regex::new(
        r"\$\{(?:([A-Za-z0-9_]+)|([A-Za-z0-9_.]+))\}"
    ).unwrap();
}

/// A parsed `${...}` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterReference<'a> {
    /// `${identifier}`
    Key(&'a str),

    /// `${identifier.path...}`, split at the dots
    Path(Vec<&'a str>),
}

/// Parse a parameter value as a data context reference
///
/// Returns `None` for literals, including every non-string value.
pub fn parse_reference(param: &Value) -> Option<ParameterReference<'_>> {
    let text = param.as_str()?;
    let captures = REFERENCE_REGEX.captures(text)?;

    if let Some(key) = captures.get(1) {
        Some(ParameterReference::Key(key.as_str()))
    } else {
        captures
            .get(2)
            .map(|path| ParameterReference::Path(path.as_str().split('.').collect()))
    }
}

/// Resolve a single parameter
pub fn resolve_parameter(param: &Value, context: &DataContext) -> Value {
    match parse_reference(param) {
        None => param.clone(),
        Some(ParameterReference::Key(key)) => context.get(key).unwrap_or(Value::Null),
        Some(ParameterReference::Path(steps)) => {
            let Some((first, rest)) = steps.split_first() else {
                return Value::Null;
            };
            let Some(root) = context.get(first) else {
                return Value::Null;
            };
            navigate(&root, rest).cloned().unwrap_or(Value::Null)
        }
    }
}

/// Resolve a list of parameters, keeping order and length
pub fn resolve_parameters(parameters: &[Value], context: &DataContext) -> Vec<Value> {
    parameters
        .iter()
        .map(|param| resolve_parameter(param, context))
        .collect()
}

fn navigate<'v>(root: &'v Value, steps: &[&str]) -> Option<&'v Value> {
    steps.iter().try_fold(root, |current, step| match current {
        Value::Object(map) => map.get(*step),
        Value::Array(items) => step.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
