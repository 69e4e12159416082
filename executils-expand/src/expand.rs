use crate::grammar::{ExpandParser, Rule};
use executils_core::{Environment, ExecutilsError, Result};
use pest::Parser;

/// Expand `$NAME` and `${NAME}` references in `input` using `env`.
///
/// Unset variables expand to the empty string.
pub fn expand_env(input: &str, env: &Environment) -> Result<String> {
    expand_with(input, |name| env.lookup(name).map(|value| value.into_owned()))
}

/// Expand references in `input`, resolving each name through `lookup`.
pub fn expand_with<F>(input: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    // Nothing to substitute, skip the parser.
    if !input.contains('$') {
        return Ok(input.to_string());
    }

    let mut pairs = ExpandParser::parse(Rule::input, input)
        .map_err(|e| ExecutilsError::ExpansionError(format!("Failed to expand {:?}: {}", input, e)))?;

    let root = pairs.next().ok_or_else(|| {
        ExecutilsError::ExpansionError(format!("Nothing parsed from {:?}", input))
    })?;

    let mut out = String::with_capacity(input.len());
    for pair in root.into_inner() {
        match pair.as_rule() {
            Rule::literal | Rule::lone_dollar => out.push_str(pair.as_str()),
            Rule::braced | Rule::special | Rule::named => {
                let name = pair
                    .into_inner()
                    .next()
                    .map(|inner| inner.as_str())
                    .unwrap_or_default();
                if let Some(value) = lookup(name) {
                    out.push_str(&value);
                }
            }
            // Empty or unclosed braces expand to nothing.
            _ => {}
        }
    }

    Ok(out)
}

/// Expand every string in `items` in place.
pub fn expand_all(items: &mut [String], env: &Environment) -> Result<()> {
    for item in items.iter_mut() {
        *item = expand_env(item, env)?;
    }
    Ok(())
}
