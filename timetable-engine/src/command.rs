//! Tokenizer for the timetable command mini-language.
//!
//! Timetable cells may carry commands of the form
//! `name[=value[+value...]][/qualifier[=value[+value...]]...]`, for example
//! `forms=1Z20/setstop` or `stable/out_path=yard.pat/in_time=06:30/triggers=2A10`.
//! Matching is case-insensitive: the whole token is lower-cased and trimmed
//! before splitting, so consumers can compare names and values directly.

use std::fmt;

/// Error returned when a command token has no name.
///
/// The enclosing stop or train entry is malformed; callers are expected to
/// log a warning and skip the token rather than abort.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("empty command token")]
pub struct EmptyCommand;

/// A `/`-separated qualifier attached to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandQualifier {
    /// Qualifier name, lower-cased and trimmed.
    pub name: String,
    /// Qualifier values (`+`-separated), possibly empty.
    pub values: Vec<String>,
}

impl CommandQualifier {
    /// Returns the first value, if any.
    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

/// A parsed command token.
///
/// # Examples
///
/// ```
/// use timetable_engine::command::CommandToken;
///
/// let cmd = CommandToken::parse("Forms=1Z20+2A10/SetStop").unwrap();
/// assert_eq!(cmd.name, "forms");
/// assert_eq!(cmd.values, vec!["1z20", "2a10"]);
/// assert!(cmd.has_qualifier("setstop"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandToken {
    /// Command name, lower-cased and trimmed.
    pub name: String,
    /// Ordered command values (`+`-separated).
    pub values: Vec<String>,
    /// Ordered qualifiers, in source order.
    pub qualifiers: Vec<CommandQualifier>,
}

impl CommandToken {
    /// Parse a command token. Any leading `$` has already been stripped by
    /// the caller for stop and note commands; dispose commands keep theirs
    /// (`$forms`, `$stable`, ...).
    pub fn parse(raw: &str) -> Result<Self, EmptyCommand> {
        let work = raw.trim().to_lowercase();

        let mut parts = work.split('/');
        let head = parts.next().unwrap_or_default();

        let (name, values) = split_assignment(head);
        if name.is_empty() {
            return Err(EmptyCommand);
        }

        let qualifiers = parts
            .filter(|fragment| !fragment.trim().is_empty())
            .map(|fragment| {
                let (name, values) = split_assignment(fragment);
                CommandQualifier { name, values }
            })
            .collect();

        Ok(Self {
            name,
            values,
            qualifiers,
        })
    }

    /// Returns the first command value, if any.
    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// Looks up a qualifier by name.
    pub fn qualifier(&self, name: &str) -> Option<&CommandQualifier> {
        self.qualifiers.iter().find(|q| q.name == name)
    }

    /// Returns true if a qualifier with the given name is present.
    pub fn has_qualifier(&self, name: &str) -> bool {
        self.qualifier(name).is_some()
    }

    /// A bare command with no values or qualifiers, used for synthetic
    /// commands such as the forced-hold marker.
    pub fn bare(name: &str) -> Self {
        Self {
            name: name.to_lowercase(),
            values: Vec::new(),
            qualifiers: Vec::new(),
        }
    }
}

/// Split `name[=v1+v2+...]` into a name and value list.
fn split_assignment(fragment: &str) -> (String, Vec<String>) {
    match fragment.split_once('=') {
        Some((name, rest)) if !rest.is_empty() => {
            let values = rest.split('+').map(|v| v.trim().to_string()).collect();
            (name.trim().to_string(), values)
        }
        Some((name, _)) => (name.trim().to_string(), Vec::new()),
        None => (fragment.trim().to_string(), Vec::new()),
    }
}

impl fmt::Display for CommandToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.values.is_empty() {
            write!(f, "={}", self.values.join("+"))?;
        }
        for qual in &self.qualifiers {
            write!(f, "/{}", qual.name)?;
            if !qual.values.is_empty() {
                write!(f, "={}", qual.values.join("+"))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name() {
        let cmd = CommandToken::parse("forcehold").unwrap();
        assert_eq!(cmd.name, "forcehold");
        assert!(cmd.values.is_empty());
        assert!(cmd.qualifiers.is_empty());
    }

    #[test]
    fn name_with_values() {
        let cmd = CommandToken::parse("forms=1Z20+2A10").unwrap();
        assert_eq!(cmd.name, "forms");
        assert_eq!(cmd.values, vec!["1z20", "2a10"]);
    }

    #[test]
    fn qualifiers_with_and_without_values() {
        let cmd = CommandToken::parse("forms=1Z20/runround=yard.pat/setstop").unwrap();
        assert_eq!(cmd.name, "forms");
        assert_eq!(cmd.values, vec!["1z20"]);
        assert_eq!(cmd.qualifiers.len(), 2);
        assert_eq!(cmd.qualifiers[0].name, "runround");
        assert_eq!(cmd.qualifiers[0].value(), Some("yard.pat"));
        assert_eq!(cmd.qualifiers[1].name, "setstop");
        assert!(cmd.qualifiers[1].values.is_empty());
    }

    #[test]
    fn qualifier_values_split_on_plus() {
        let cmd = CommandToken::parse("wait=x/trains=a+b").unwrap();
        assert_eq!(cmd.qualifiers[0].values, vec!["a", "b"]);
    }

    #[test]
    fn lower_cased_and_trimmed() {
        let cmd = CommandToken::parse("  Stable / Out_Path = Yard.PAT ").unwrap();
        assert_eq!(cmd.name, "stable");
        assert_eq!(cmd.qualifiers[0].name, "out_path");
        assert_eq!(cmd.qualifiers[0].value(), Some("yard.pat"));
    }

    #[test]
    fn empty_token_rejected() {
        assert_eq!(CommandToken::parse(""), Err(EmptyCommand));
        assert_eq!(CommandToken::parse("   "), Err(EmptyCommand));
        assert_eq!(CommandToken::parse("=value"), Err(EmptyCommand));
    }

    #[test]
    fn empty_qualifier_fragments_skipped() {
        let cmd = CommandToken::parse("forms=x//setstop").unwrap();
        assert_eq!(cmd.qualifiers.len(), 1);
        assert_eq!(cmd.qualifiers[0].name, "setstop");
    }

    #[test]
    fn dispose_keyword_keeps_dollar() {
        let cmd = CommandToken::parse("$forms=1Z20").unwrap();
        assert_eq!(cmd.name, "$forms");
    }

    #[test]
    fn display_reconstructs_structure() {
        let cmd = CommandToken::parse("forms=1z20+2a10/runround=yard.pat/setstop").unwrap();
        assert_eq!(cmd.to_string(), "forms=1z20+2a10/runround=yard.pat/setstop");
    }
}
