//! Component path tokens and their textual form.
//!
//! A path is a `/`-separated list of tokens, one per level from a registered
//! root down to the addressed node. A token is either a name, optionally
//! suffixed with `[k]` to pick the k-th sibling sharing that name, or a
//! decimal position among all siblings.

use std::fmt;
use std::str::FromStr;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use thiserror::Error;

/// Separator between path tokens.
pub const PATH_DELIMITER: char = '/';

const NAME_ENCODE_SET: &AsciiSet = &CONTROLS.add(b'/').add(b'%').add(b'[').add(b']');

/// Errors raised while parsing or resolving a component path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The path string contained no tokens.
    #[error("component path is empty")]
    Empty,
    /// A token could not be parsed.
    #[error("invalid path token '{token}': {reason}")]
    InvalidToken {
        /// Offending token text.
        token: String,
        /// Why the token was rejected.
        reason: String,
    },
    /// No live node matches the path.
    #[error("no component at '{path}' (unmatched segment '{segment}')")]
    NotFound {
        /// Full path that was being resolved.
        path: String,
        /// First token that matched nothing.
        segment: String,
    },
}

impl PathError {
    pub(crate) fn invalid_token(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidToken {
            token: token.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(path: &ComponentPath, segment: &PathToken) -> Self {
        Self::NotFound {
            path: path.to_string(),
            segment: segment.to_string(),
        }
    }
}

/// One level of a component path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathToken {
    /// A named node.
    Named {
        /// Declared node name, unencoded.
        name: String,
        /// Index among earlier siblings sharing the same name.
        occurrence: usize,
    },
    /// An unnamed node, identified by its position among all siblings.
    Position(usize),
}

impl PathToken {
    /// Token for the first sibling called `name`.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            name: name.into(),
            occurrence: 0,
        }
    }
}

impl fmt::Display for PathToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { name, occurrence } => {
                write_name(f, name)?;
                if *occurrence > 0 {
                    write!(f, "[{occurrence}]")?;
                }
                Ok(())
            }
            Self::Position(position) => write!(f, "{position}"),
        }
    }
}

fn write_name(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    let mut chars = name.chars();
    if !name.is_empty()
        && name.bytes().all(|byte| byte.is_ascii_digit())
        && let Some(first) = chars.next()
    {
        // An all-digit name would read back as a position.
        write!(f, "%{:02X}", u32::from(first))?;
        return f.write_str(chars.as_str());
    }
    write!(f, "{}", utf8_percent_encode(name, NAME_ENCODE_SET))
}

impl FromStr for PathToken {
    type Err = PathError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        if token.is_empty() {
            return Err(PathError::invalid_token(token, "empty segment"));
        }
        if token.bytes().all(|byte| byte.is_ascii_digit()) {
            return token
                .parse()
                .map(Self::Position)
                .map_err(|error| PathError::invalid_token(token, error.to_string()));
        }
        let (encoded, occurrence) = split_occurrence(token)?;
        let name = percent_decode_str(encoded)
            .decode_utf8()
            .map_err(|error| PathError::invalid_token(token, error.to_string()))?;
        if name.is_empty() {
            return Err(PathError::invalid_token(token, "empty name"));
        }
        Ok(Self::Named {
            name: name.into_owned(),
            occurrence,
        })
    }
}

fn split_occurrence(token: &str) -> Result<(&str, usize), PathError> {
    let Some(body) = token.strip_suffix(']') else {
        return Ok((token, 0));
    };
    let Some((name, index)) = body.rsplit_once('[') else {
        return Err(PathError::invalid_token(token, "unbalanced ']'"));
    };
    if index.is_empty() || !index.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(PathError::invalid_token(token, "occurrence must be a number"));
    }
    let occurrence = index
        .parse()
        .map_err(|error: std::num::ParseIntError| PathError::invalid_token(token, error.to_string()))?;
    Ok((name, occurrence))
}

/// Root-to-node chain of tokens addressing one component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentPath {
    tokens: Vec<PathToken>,
}

impl ComponentPath {
    /// Builds a path from its tokens, returning `None` when there are none.
    #[must_use]
    pub fn from_tokens(tokens: Vec<PathToken>) -> Option<Self> {
        if tokens.is_empty() {
            None
        } else {
            Some(Self { tokens })
        }
    }

    /// Tokens from the root downwards.
    #[must_use]
    pub fn tokens(&self) -> &[PathToken] {
        &self.tokens
    }

    /// Path of a child of this component.
    #[must_use]
    pub fn join(&self, token: PathToken) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(token);
        Self { tokens }
    }
}

impl fmt::Display for ComponentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens = self.tokens.iter();
        if let Some(first) = tokens.next() {
            write!(f, "{first}")?;
        }
        for token in tokens {
            write!(f, "{PATH_DELIMITER}{token}")?;
        }
        Ok(())
    }
}

impl FromStr for ComponentPath {
    type Err = PathError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        let tokens = path
            .split(PATH_DELIMITER)
            .map(str::parse)
            .collect::<Result<Vec<PathToken>, _>>()?;
        Ok(Self { tokens })
    }
}
