//! Core data types for issue-core.
//!
//! Issues carry two identities: a stable `uuid` fixed at creation and a
//! human-facing [`IssueId`] that conflict resolution may renumber.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::IssueError;

/// Default prefix for human-facing issue identifiers.
pub const DEFAULT_PREFIX: &str = "ISSUE";

/// Issue lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Open,
    #[serde(alias = "in progress")]
    InProgress,
    Closed,
}

impl Status {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = IssueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "in_progress" | "in progress" | "inprogress" | "active" => Ok(Self::InProgress),
            "closed" | "close" => Ok(Self::Closed),
            other => Err(IssueError::InvalidStatus {
                status: other.to_string(),
            }),
        }
    }
}

/// A person participating in an issue.
///
/// Equality and hashing consider only the email address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    pub email: String,
}

impl Actor {
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl PartialEq for Actor {
    fn eq(&self, other: &Self) -> bool {
        self.email == other.email
    }
}

impl Eq for Actor {}

impl Hash for Actor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.email.hash(state);
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "<{}>", self.email)
        } else {
            write!(f, "{} <{}>", self.name, self.email)
        }
    }
}

impl FromStr for Actor {
    type Err = IssueError;

    /// Parse `Name <email>` or a bare `email`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, email) = match s.split_once('<') {
            Some((name, rest)) => {
                let email = rest
                    .strip_suffix('>')
                    .ok_or_else(|| IssueError::validation("actor", "unterminated '<email>'"))?;
                (name.trim(), email.trim())
            }
            None => ("", s),
        };

        if email.is_empty() || !email.contains('@') {
            return Err(IssueError::validation(
                "actor",
                format!("'{s}' does not contain an email address"),
            ));
        }
        Ok(Self::new(name, email))
    }
}

/// Human-facing sequential identifier, `<PREFIX>-<N>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IssueId {
    prefix: String,
    number: u64,
}

impl IssueId {
    #[must_use]
    pub fn new(prefix: impl Into<String>, number: u64) -> Self {
        Self {
            prefix: prefix.into(),
            number,
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub const fn number(&self) -> u64 {
        self.number
    }

    /// The identifier immediately following this one.
    ///
    /// # Errors
    ///
    /// Returns `InvalidId` if the number is already the largest allowed.
    pub fn next(&self) -> Result<Self, IssueError> {
        let number = self.number.checked_add(1).ok_or_else(|| IssueError::InvalidId {
            id: self.to_string(),
            prefix: self.prefix.clone(),
        })?;
        Ok(Self::new(self.prefix.clone(), number))
    }

    /// Parse an identifier, requiring the given prefix.
    ///
    /// # Errors
    ///
    /// Returns `InvalidId` if the prefix differs or the suffix is not a number.
    pub fn parse_with_prefix(s: &str, prefix: &str) -> Result<Self, IssueError> {
        let invalid = || IssueError::InvalidId {
            id: s.to_string(),
            prefix: prefix.to_string(),
        };
        let id: Self = s.parse().map_err(|_| invalid())?;
        if id.prefix == prefix {
            Ok(id)
        } else {
            Err(invalid())
        }
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.number)
    }
}

impl FromStr for IssueId {
    type Err = IssueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || IssueError::InvalidId {
            id: s.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
        };
        let (prefix, number) = s.trim().rsplit_once('-').ok_or_else(invalid)?;
        if prefix.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let number = number.parse().map_err(|_| invalid())?;
        Ok(Self::new(prefix, number))
    }
}

impl TryFrom<String> for IssueId {
    type Error = IssueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IssueId> for String {
    fn from(id: IssueId) -> Self {
        id.to_string()
    }
}

/// A tracked issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub uuid: Uuid,
    pub date: DateTime<Utc>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub assignee: Option<Actor>,
    #[serde(default)]
    pub reporter: Option<Actor>,
    #[serde(default)]
    pub subscribers: Vec<Actor>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl Issue {
    /// Create a new open issue with a fresh uuid and the current timestamp.
    #[must_use]
    pub fn new(id: IssueId, summary: impl Into<String>) -> Self {
        Self {
            id,
            uuid: Uuid::new_v4(),
            date: Utc::now(),
            summary: summary.into(),
            description: None,
            status: Status::Open,
            assignee: None,
            reporter: None,
            subscribers: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Add a subscriber unless one with the same email is already present.
    ///
    /// Returns `true` if the subscriber was added.
    pub fn subscribe(&mut self, actor: Actor) -> bool {
        if self.subscribers.contains(&actor) {
            return false;
        }
        self.subscribers.push(actor);
        true
    }

    /// Remove a subscriber by email. Returns `true` if one was removed.
    pub fn unsubscribe(&mut self, actor: &Actor) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s != actor);
        before != self.subscribers.len()
    }

    /// Compare subscribers as sets keyed on email.
    #[must_use]
    pub fn same_subscribers(&self, other: &Self) -> bool {
        self.subscribers.len() == other.subscribers.len()
            && self
                .subscribers
                .iter()
                .all(|s| other.subscribers.contains(s))
    }
}

/// A comment on an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub author: Actor,
    pub date: DateTime<Utc>,
    pub uuid: Uuid,
}

impl Comment {
    #[must_use]
    pub fn new(text: impl Into<String>, author: Actor) -> Self {
        Self {
            text: text.into(),
            author,
            date: Utc::now(),
            uuid: Uuid::new_v4(),
        }
    }

    /// Truncated hex form of the uuid used for the comment's file name.
    #[must_use]
    pub fn short_uuid(&self, len: usize) -> String {
        let simple = self.uuid.simple().to_string();
        simple[..len.clamp(1, simple.len())].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_equality_keyed_on_email() {
        let a = Actor::new("Liam", "liam@test.com");
        let b = Actor::new("Someone Else", "liam@test.com");
        let c = Actor::new("Liam", "other@test.com");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_actor_parse() {
        let actor: Actor = "Bob Smith <bob@test.com>".parse().unwrap();
        assert_eq!(actor.name, "Bob Smith");
        assert_eq!(actor.email, "bob@test.com");

        let bare: Actor = "bob@test.com".parse().unwrap();
        assert_eq!(bare.name, "");
        assert_eq!(bare.email, "bob@test.com");

        assert!("Bob".parse::<Actor>().is_err());
        assert!("Bob <bob@test.com".parse::<Actor>().is_err());
    }

    #[test]
    fn test_issue_id_parse_and_next() {
        let id: IssueId = "ISSUE-10".parse().unwrap();
        assert_eq!(id.prefix(), "ISSUE");
        assert_eq!(id.number(), 10);
        assert_eq!(id.next().unwrap().to_string(), "ISSUE-11");
        assert!(IssueId::new("ISSUE", u64::MAX).next().is_err());

        let dashed: IssueId = "MY-PROJ-3".parse().unwrap();
        assert_eq!(dashed.prefix(), "MY-PROJ");

        assert!("ISSUE".parse::<IssueId>().is_err());
        assert!("ISSUE-x1".parse::<IssueId>().is_err());
        assert!("-4".parse::<IssueId>().is_err());
    }

    #[test]
    fn test_issue_id_orders_numerically() {
        let mut ids: Vec<IssueId> = ["ISSUE-10", "ISSUE-2", "ISSUE-1"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        ids.sort();
        let rendered: Vec<String> = ids.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["ISSUE-1", "ISSUE-2", "ISSUE-10"]);
    }

    #[test]
    fn test_parse_with_prefix_rejects_foreign_prefix() {
        assert!(IssueId::parse_with_prefix("BUG-1", "ISSUE").is_err());
        assert!(IssueId::parse_with_prefix("ISSUE-1", "ISSUE").is_ok());
    }

    #[test]
    fn test_status_parse_shorthands() {
        assert_eq!("active".parse::<Status>().unwrap(), Status::InProgress);
        assert_eq!("in progress".parse::<Status>().unwrap(), Status::InProgress);
        assert_eq!("Closed".parse::<Status>().unwrap(), Status::Closed);
        assert!("done".parse::<Status>().is_err());
    }

    #[test]
    fn test_status_accepts_legacy_spelling() {
        let status: Status = serde_json::from_str("\"in progress\"").unwrap();
        assert_eq!(status, Status::InProgress);
    }

    #[test]
    fn test_new_issues_do_not_share_containers() {
        let mut a = Issue::new(IssueId::new("ISSUE", 1), "a");
        let b = Issue::new(IssueId::new("ISSUE", 2), "b");
        a.subscribe(Actor::new("x", "x@test.com"));
        assert!(b.subscribers.is_empty());
        assert_ne!(a.uuid, b.uuid);
    }

    #[test]
    fn test_subscribe_is_set_like() {
        let mut issue = Issue::new(IssueId::new("ISSUE", 1), "a");
        assert!(issue.subscribe(Actor::new("x", "x@test.com")));
        assert!(!issue.subscribe(Actor::new("X", "x@test.com")));
        assert_eq!(issue.subscribers.len(), 1);
        assert!(issue.unsubscribe(&Actor::new("", "x@test.com")));
        assert!(issue.subscribers.is_empty());
    }

    #[test]
    fn test_same_subscribers_ignores_order() {
        let mut a = Issue::new(IssueId::new("ISSUE", 1), "a");
        let mut b = a.clone();
        a.subscribe(Actor::new("x", "x@test.com"));
        a.subscribe(Actor::new("y", "y@test.com"));
        b.subscribe(Actor::new("y", "y@test.com"));
        b.subscribe(Actor::new("x", "x@test.com"));
        assert!(a.same_subscribers(&b));
    }

    #[test]
    fn test_comment_short_uuid() {
        let comment = Comment::new("hi", Actor::new("a", "a@test.com"));
        assert_eq!(comment.short_uuid(8).len(), 8);
        assert!(comment.uuid.simple().to_string().starts_with(&comment.short_uuid(8)));
    }
}
