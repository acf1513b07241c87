//! Distinguished names for account, container and policy locations.

use dsee_core::error::Error as CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Reasons a string is not a usable distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistinguishedNameError {
    /// Nothing but whitespace.
    #[error("distinguished name cannot be empty")]
    Empty,
    /// A `,` or `+` separated nothing, e.g. `uid=jdoe,,dc=com`.
    #[error("empty component at offset {0}")]
    EmptyComponent(usize),
    /// A component has no `=`.
    #[error("component `{0}` is not of the form attribute=value")]
    MissingEquals(String),
    /// A component has an `=` but no attribute name before it.
    #[error("component `{0}` has no attribute name")]
    MissingAttribute(String),
    /// A component has an attribute name but nothing after the `=`.
    #[error("attribute `{0}` has no value")]
    MissingValue(String),
    /// A backslash at the end of the input, or followed by an invalid hex pair.
    #[error("invalid escape sequence at offset {0}")]
    InvalidEscape(usize),
}

impl From<DistinguishedNameError> for CoreError {
    fn from(err: DistinguishedNameError) -> Self {
        CoreError::InvalidDistinguishedName(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeValue {
    attribute: String,
    value: String,
}

/// A parsed distinguished name, most specific component first.
///
/// Whitespace around separators is dropped and values are re-escaped, so two spellings of the
/// same name compare equal. Serialized as its string form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DistinguishedName {
    canonical: String,
    // Each inner vec is one RDN; more than one pair means a multi-valued RDN.
    rdns: Vec<Vec<AttributeValue>>,
}

impl DistinguishedName {
    /// Parses an RFC 4514 string such as `uid=jdoe,ou=people,dc=example,dc=com`.
    ///
    /// Both `\,` and `\2C` style escapes are accepted in values.
    ///
    /// # Errors
    ///
    /// Returns [`DistinguishedNameError`] describing the first malformed component.
    pub fn parse(input: impl AsRef<str>) -> std::result::Result<Self, DistinguishedNameError> {
        let input = input.as_ref().trim();
        if input.is_empty() {
            return Err(DistinguishedNameError::Empty);
        }
        Ok(Self::from_rdns(Parser::new(input).rdns()?))
    }

    /// A one-component name such as `cn=config`.
    #[must_use]
    pub fn root(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::from_rdns(vec![vec![AttributeValue {
            attribute: attribute.into(),
            value: value.into(),
        }]])
    }

    /// The name of the entry `attribute=value` directly below this one.
    #[must_use]
    pub fn child(&self, attribute: &str, value: &str) -> Self {
        let mut rdns = Vec::with_capacity(self.rdns.len() + 1);
        rdns.push(vec![AttributeValue {
            attribute: attribute.to_string(),
            value: value.to_string(),
        }]);
        rdns.extend(self.rdns.iter().cloned());
        Self::from_rdns(rdns)
    }

    /// Unescaped value of the first component named `attribute` (case-insensitive).
    #[must_use]
    pub fn value_of(&self, attribute: &str) -> Option<&str> {
        self.rdns
            .iter()
            .flatten()
            .find(|pair| pair.attribute.eq_ignore_ascii_case(attribute))
            .map(|pair| pair.value.as_str())
    }

    /// Canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    fn from_rdns(rdns: Vec<Vec<AttributeValue>>) -> Self {
        let canonical = rdns
            .iter()
            .map(|rdn| {
                rdn.iter()
                    .map(|pair| format!("{}={}", pair.attribute, escape_value(&pair.value)))
                    .collect::<Vec<_>>()
                    .join("+")
            })
            .collect::<Vec<_>>()
            .join(",");
        Self { canonical, rdns }
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl FromStr for DistinguishedName {
    type Err = DistinguishedNameError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DistinguishedName {
    type Error = DistinguishedNameError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DistinguishedName> for String {
    fn from(dn: DistinguishedName) -> Self {
        dn.canonical
    }
}

/// Single pass over the input; `pos` is a byte offset.
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    const fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rdns(mut self) -> std::result::Result<Vec<Vec<AttributeValue>>, DistinguishedNameError> {
        let mut rdns = Vec::new();
        let mut current = Vec::new();
        loop {
            let (pair, separator) = self.attribute_value()?;
            current.push(pair);
            match separator {
                Some('+') => {}
                Some(_) => rdns.push(std::mem::take(&mut current)),
                None => {
                    rdns.push(current);
                    return Ok(rdns);
                }
            }
        }
    }

    /// Reads `attribute=value` and the separator that ended it.
    fn attribute_value(
        &mut self,
    ) -> std::result::Result<(AttributeValue, Option<char>), DistinguishedNameError> {
        let input = self.input;
        let start = self.pos;
        let rest = &input[start..];

        let Some(eq) = rest.find(['=', ',', '+']).filter(|&i| rest[i..].starts_with('=')) else {
            let end = rest.find([',', '+']).unwrap_or(rest.len());
            let component = rest[..end].trim();
            return Err(if component.is_empty() {
                DistinguishedNameError::EmptyComponent(start)
            } else {
                DistinguishedNameError::MissingEquals(component.to_string())
            });
        };

        let attribute = rest[..eq].trim();
        if attribute.is_empty() {
            return Err(DistinguishedNameError::MissingAttribute(
                rest[..=eq].trim().to_string(),
            ));
        }
        self.pos = start + eq + 1;

        let (value, separator) = self.value()?;
        if value.is_empty() {
            return Err(DistinguishedNameError::MissingValue(attribute.to_string()));
        }

        Ok((
            AttributeValue {
                attribute: attribute.to_string(),
                value,
            },
            separator,
        ))
    }

    /// Reads an escaped value up to an unescaped `,`/`+` or the end of input.
    fn value(&mut self) -> std::result::Result<(String, Option<char>), DistinguishedNameError> {
        let input = self.input;
        let remaining = &input[self.pos..];
        let start = self.pos + (remaining.len() - remaining.trim_start_matches(' ').len());
        let mut bytes = Vec::new();
        // Length of `bytes` after the last escaped byte; trailing spaces before it are kept.
        let mut protected = 0;
        let mut iter = input[start..].char_indices();

        while let Some((offset, ch)) = iter.next() {
            let at = start + offset;
            match ch {
                ',' | '+' => {
                    self.pos = at + 1;
                    return Ok((finish_value(bytes, protected, at)?, Some(ch)));
                }
                '\\' => {
                    let (_, next) = iter
                        .next()
                        .ok_or(DistinguishedNameError::InvalidEscape(at))?;
                    if next.is_ascii_hexdigit() {
                        let (_, low) = iter
                            .next()
                            .filter(|(_, low)| low.is_ascii_hexdigit())
                            .ok_or(DistinguishedNameError::InvalidEscape(at))?;
                        let byte = u8::from_str_radix(&format!("{next}{low}"), 16)
                            .map_err(|_| DistinguishedNameError::InvalidEscape(at))?;
                        bytes.push(byte);
                    } else {
                        let mut buf = [0u8; 4];
                        bytes.extend_from_slice(next.encode_utf8(&mut buf).as_bytes());
                    }
                    protected = bytes.len();
                }
                _ => {
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                }
            }
        }

        let end = input.len();
        self.pos = end;
        Ok((finish_value(bytes, protected, end)?, None))
    }
}

fn finish_value(
    mut bytes: Vec<u8>,
    protected: usize,
    at: usize,
) -> std::result::Result<String, DistinguishedNameError> {
    while bytes.len() > protected && bytes.last() == Some(&b' ') {
        bytes.pop();
    }
    String::from_utf8(bytes).map_err(|_| DistinguishedNameError::InvalidEscape(at))
}

fn escape_value(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut escaped = String::with_capacity(value.len());
    for (index, ch) in value.chars().enumerate() {
        let special = matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (index == 0 && matches!(ch, ' ' | '#'))
            || (index == last && ch == ' ');
        if special {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
