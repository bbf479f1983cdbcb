//! Repository and pull request URL parsing

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A GitHub repository as `owner/name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl Repository {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        let name = name.into();
        if !is_valid_segment(&owner) || !is_valid_segment(&name) {
            return Err(Error::InvalidRepository(format!("{owner}/{name}")));
        }
        Ok(Self { owner, name })
    }

    /// Parse a repository reference
    ///
    /// Supports formats:
    /// - owner/repo
    /// - https://github.com/owner/repo
    /// - git@github.com:owner/repo.git
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let invalid = || {
            Error::InvalidRepository(format!("{input}. Expected owner/repo or a GitHub URL"))
        };

        if input.starts_with("https://") || input.starts_with("http://") {
            let url = url::Url::parse(input).map_err(|_| invalid())?;
            let mut segments = url.path_segments().ok_or_else(invalid)?;
            let owner = segments.next().ok_or_else(invalid)?;
            let name = segments.next().ok_or_else(invalid)?;
            return Self::new(owner, name.trim_end_matches(".git"));
        }

        if let Some(rest) = input.strip_prefix("git@") {
            let (_, path) = rest.split_once(':').ok_or_else(invalid)?;
            let (owner, name) = path.split_once('/').ok_or_else(invalid)?;
            return Self::new(owner, name.trim_end_matches(".git"));
        }

        match input.split_once('/') {
            Some((owner, name)) if !name.contains('/') => {
                Self::new(owner, name.trim_end_matches(".git"))
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for Repository {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Split a pull request URL such as
/// `https://github.com/owner/repo/pull/123/files` into repository and number
pub fn parse_pr_url(input: &str) -> Result<(Repository, i64)> {
    let invalid = || Error::Parse(format!("Invalid pull request URL: {input}"));

    let url = url::Url::parse(input.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "https" | "http") {
        return Err(invalid());
    }

    let segments: Vec<&str> = url
        .path_segments()
        .ok_or_else(invalid)?
        .filter(|s| !s.is_empty())
        .collect();

    match segments.as_slice() {
        [owner, name, "pull", number, ..] => {
            let number: i64 = number.parse().map_err(|_| invalid())?;
            if number <= 0 {
                return Err(invalid());
            }
            Ok((Repository::new(*owner, *name)?, number))
        }
        _ => Err(invalid()),
    }
}
