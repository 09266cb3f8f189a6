//! Turning command lines into kvconf lines.

use std::collections::VecDeque;
use std::sync::Arc;

use kvconf::{Block, Conf, Configurable, Engine, KeyPath};
use tracing::debug;

use crate::{CliError, tokens};

/// One `(key, value)` pair per token of `line`.
///
/// Bare tokens go to the positional members of `T` in order. Fails if a bare
/// token is left over, or if any required member is never named.
pub fn conf_pairs<T: Configurable>(
    engine: &Engine,
    line: &str,
) -> Result<Vec<(String, String)>, CliError> {
    let description = engine.descriptors().describe::<T>();
    let mut required = description
        .members()
        .iter()
        .filter(|member| member.is_required())
        .collect::<Vec<_>>();
    let mut positional = description.positional().into_iter().collect::<VecDeque<_>>();

    let mut pairs = Vec::new();
    for token in tokens(line) {
        let value = token.value.trim().to_string();
        let key = match token.key {
            Some(key) => key.trim().to_string(),
            None if value.is_empty() => continue,
            None => match positional.pop_front() {
                Some(member) => member.name().to_string(),
                None => return Err(CliError::PositionalExhausted { value }),
            },
        };
        if !value.is_empty() {
            if let Some(part) = KeyPath::parse(&key).as_ref().and_then(KeyPath::first) {
                required.retain(|member| !member.matches(part.normalized()));
            }
        }
        pairs.push((key, value));
    }

    if !required.is_empty() {
        let names = required.iter().map(|member| member.name().to_string()).collect();
        return Err(CliError::RequiredNotFound { names });
    }
    debug!("command line became {} pairs", pairs.len());
    Ok(pairs)
}

/// One `key=value` line per token of `line`, as [`conf_pairs`] splits them.
pub fn conf_lines<T: Configurable>(engine: &Engine, line: &str) -> Result<Vec<String>, CliError> {
    let pairs = conf_pairs::<T>(engine, line)?;
    Ok(pairs
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect())
}

/// Configure `target` from a command line.
///
/// Values are bound as the tokens hold them; they are not split again.
pub fn configure<T: Configurable>(engine: &Arc<Engine>, target: T, line: &str) -> Result<T, CliError> {
    let block = Block::from_pairs(conf_pairs::<T>(engine, line)?);
    let conf = Conf::new(engine.clone(), block);
    Ok(conf.configure(target, "")?)
}
