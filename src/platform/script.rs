//! Numeric variable extraction from the obfuscated player script

use crate::error::ExtractError;
use regex::Regex;
use tracing::debug;

/// Lookup-table declaration built from `URLSearchParams`, directly followed by a function
const URL_SEARCH_PARAMS_PATTERN: &str = r"(const \w{1,2}=new URLSearchParams.+?;)function";

/// `const` statement with at least seven short string/call initialisers
const CONST_TABLE_PATTERN: &str =
    r"const (?:\w{1,2}=(?:'.{0,50}?'|\w{1,2}\(.{0,20}?\)).{0,20}?,){7}.+?;";

/// Ordered integers recovered from the player script.
///
/// Index 0 is the loop count; the rest are `(increment, start)` slots
/// consumed two at a time by the secret deriver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSequence(Vec<i64>);

impl VariableSequence {
    pub fn new(values: Vec<i64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        self.0.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<i64>> for VariableSequence {
    fn from(values: Vec<i64>) -> Self {
        Self(values)
    }
}

/// Declaration shapes the extractor knows how to locate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptPattern {
    /// `const x=new URLSearchParams(...),a=1,b=2,...;function`
    #[default]
    UrlSearchParams,
    /// `const a='..',b=c(..),...;` as served by the sibling player
    ConstTable,
}

impl ScriptPattern {
    fn regex(&self) -> Result<Regex, ExtractError> {
        let pattern = match self {
            ScriptPattern::UrlSearchParams => URL_SEARCH_PARAMS_PATTERN,
            ScriptPattern::ConstTable => CONST_TABLE_PATTERN,
        };
        Ok(Regex::new(pattern)?)
    }

    /// Find the last statement in `text` matching this pattern
    pub fn find_last<'a>(&self, text: &'a str) -> Result<Option<&'a str>, ExtractError> {
        let regex = self.regex()?;
        let found = regex
            .captures_iter(text)
            .last()
            .and_then(|caps| caps.get(1).or_else(|| caps.get(0)))
            .map(|m| m.as_str());
        Ok(found)
    }
}

/// Pulls the numeric literals out of the player script
#[derive(Debug, Clone, Default)]
pub struct ScriptExtractor {
    pattern: ScriptPattern,
}

impl ScriptExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pattern(pattern: ScriptPattern) -> Self {
        Self { pattern }
    }

    /// Return the integers declared by the last matching statement, in order.
    ///
    /// An empty sequence means no statement matched.
    pub fn extract(&self, script: &str) -> Result<VariableSequence, ExtractError> {
        let statement = match self.pattern.find_last(script)? {
            Some(statement) => statement,
            None => {
                debug!("No {:?} declaration found in player script", self.pattern);
                return Ok(VariableSequence::default());
            }
        };

        let values = parse_statement(statement);
        debug!("Recovered {} variables from player script", values.len());
        Ok(VariableSequence(values))
    }
}

/// Split the statement on `=`, keep the first comma-delimited token of every
/// right-hand side, and retain the ones that coerce to a finite number.
fn parse_statement(statement: &str) -> Vec<i64> {
    let body = statement.strip_suffix(';').unwrap_or(statement);

    body.split('=')
        .skip(1)
        .filter_map(|rhs| rhs.split(',').next())
        .filter_map(coerce_number)
        .map(|n| n.trunc() as i64)
        .collect()
}

/// Numeric coercion with the same rules the script's host applies to strings
fn coerce_number(token: &str) -> Option<f64> {
    let token = token.trim();
    if token.is_empty() {
        return Some(0.0);
    }

    let radix = match token.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };

    let value = match radix {
        Some(radix) => u64::from_str_radix(&token[2..], radix).ok()? as f64,
        None => {
            // Rust accepts spellings like "inf" and "nan" that would never coerce to finite numbers
            if !token
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
            {
                return None;
            }
            token.parse::<f64>().ok()?
        }
    };

    value.is_finite().then_some(value)
}
