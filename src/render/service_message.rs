//! TeamCity-style service messages
//!
//! Wire format: `##<prefix>[<name> key='value' ...]`, or the single-value
//! form `##<prefix>[<name> 'value']`. Values are escaped with `|` as the
//! escape character; the consuming CI server rejects anything else.

use std::fmt;

/// Prefix understood by TeamCity build agents
pub const TEAMCITY_PREFIX: &str = "teamcity";

/// A single service message, rendered with `Display`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceMessage {
    prefix: String,
    name: String,
    body: Body,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Body {
    Single(String),
    Attributes(Vec<(String, String)>),
}

impl ServiceMessage {
    /// Start a message with named attributes under the TeamCity prefix
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            prefix: TEAMCITY_PREFIX.to_string(),
            name: name.to_string(),
            body: Body::Attributes(Vec::new()),
        }
    }

    /// A message carrying one unnamed value, e.g. `##teamcity[progressMessage 'x']`
    #[must_use]
    pub fn single(name: &str, value: &str) -> Self {
        Self {
            prefix: TEAMCITY_PREFIX.to_string(),
            name: name.to_string(),
            body: Body::Single(value.to_string()),
        }
    }

    /// Replace the `teamcity` prefix
    #[must_use]
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Append an attribute. Attributes render in insertion order.
    ///
    /// Adding an attribute to a single-value message turns it into an
    /// attribute message and drops the single value.
    #[must_use]
    pub fn attr(mut self, key: &str, value: &str) -> Self {
        match &mut self.body {
            Body::Attributes(attrs) => attrs.push((key.to_string(), value.to_string())),
            Body::Single(_) => {
                self.body = Body::Attributes(vec![(key.to_string(), value.to_string())]);
            }
        }
        self
    }
}

impl fmt::Display for ServiceMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "##{}[{}", self.prefix, self.name)?;
        match &self.body {
            Body::Single(value) => write!(f, " '{}'", escape(value))?,
            Body::Attributes(attrs) => {
                for (key, value) in attrs {
                    write!(f, " {key}='{}'", escape(value))?;
                }
            }
        }
        f.write_str("]")
    }
}

/// Escape a value for use inside a service message
#[must_use]
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '|' => escaped.push_str("||"),
            '\'' => escaped.push_str("|'"),
            '\n' => escaped.push_str("|n"),
            '\r' => escaped.push_str("|r"),
            '[' => escaped.push_str("|["),
            ']' => escaped.push_str("|]"),
            '\u{0085}' => escaped.push_str("|x"),
            '\u{2028}' => escaped.push_str("|l"),
            '\u{2029}' => escaped.push_str("|p"),
            other => escaped.push(other),
        }
    }
    escaped
}
