//! Minimal change filter: whitespace separated `key:value` terms that must
//! all match, each optionally negated with a leading `-`.
//!
//! | Term               | Matches                                          |
//! |--------------------|--------------------------------------------------|
//! | `project:NAME`     | exact project name                               |
//! | `branch:NAME`      | branch, with or without `refs/heads/`            |
//! | `branch:^REGEX`    | full branch ref against a regular expression     |
//! | `status:STATUS`    | `open`, `merged`, `abandoned` or `closed`        |
//! | `owner:ID\|self`   | owner by account id, `self` is the query user    |
//! | `reviewer:ID\|self`| account in the REVIEWER or CC state              |
//! | `topic:NAME`       | exact topic                                      |
//! | `is:wip`           | work in progress                                 |
//! | `is:private`       | private change                                   |
//! | `is:open`          | status `new`                                     |

use regex::Regex;
use reviewmail_core::backend::{ChangePredicate, FilterParseError, FilterParser, QueryUser};
use reviewmail_core::change::{ChangeSnapshot, ChangeStatus};
use reviewmail_core::types::{AccountId, ProjectName};

#[derive(Debug, Clone)]
enum Term {
    Project(ProjectName),
    Branch(String),
    BranchPattern(Regex),
    Status(Vec<ChangeStatus>),
    Owner(AccountId),
    Reviewer(AccountId),
    Topic(String),
    WorkInProgress,
    Private,
}

impl Term {
    fn matches(&self, change: &ChangeSnapshot) -> bool {
        match self {
            Term::Project(name) => &change.project == name,
            Term::Branch(name) => change.branch == *name || change.short_branch() == name,
            Term::BranchPattern(re) => re.is_match(&change.branch),
            Term::Status(statuses) => statuses.contains(&change.status),
            Term::Owner(id) => change.owner == *id,
            Term::Reviewer(id) => change.reviewers.contains(id) || change.ccs.contains(id),
            Term::Topic(topic) => change.topic.as_deref() == Some(topic.as_str()),
            Term::WorkInProgress => change.work_in_progress,
            Term::Private => change.private,
        }
    }
}

/// Compiled conjunction of terms.
#[derive(Debug, Clone)]
struct TermPredicate {
    terms: Vec<(bool, Term)>,
}

impl ChangePredicate for TermPredicate {
    fn matches(&self, change: &ChangeSnapshot) -> bool {
        self.terms
            .iter()
            .all(|(negated, term)| term.matches(change) != *negated)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TermFilterParser;

impl TermFilterParser {
    fn parse_term(
        query: &str,
        token: &str,
        user: Option<&QueryUser>,
    ) -> Result<Term, FilterParseError> {
        let error = |reason: String| FilterParseError {
            query: query.to_string(),
            reason,
        };

        let (key, value) = token
            .split_once(':')
            .filter(|(_, value)| !value.is_empty())
            .ok_or_else(|| error(format!("expected key:value, got '{token}'")))?;

        let account = |value: &str| -> Result<AccountId, FilterParseError> {
            if value == "self" {
                return match user {
                    Some(QueryUser::Account(id)) => Ok(*id),
                    _ => Err(error("'self' requires an account user".to_string())),
                };
            }
            value
                .parse::<i64>()
                .map(AccountId)
                .map_err(|_| error(format!("'{value}' is not an account id")))
        };

        match key {
            "project" => Ok(Term::Project(ProjectName::new(value))),
            "branch" if value.starts_with('^') => Regex::new(value)
                .map(Term::BranchPattern)
                .map_err(|e| error(e.to_string())),
            "branch" => Ok(Term::Branch(value.to_string())),
            "status" => match value {
                "open" | "new" => Ok(Term::Status(vec![ChangeStatus::New])),
                "merged" => Ok(Term::Status(vec![ChangeStatus::Merged])),
                "abandoned" => Ok(Term::Status(vec![ChangeStatus::Abandoned])),
                "closed" => Ok(Term::Status(vec![
                    ChangeStatus::Merged,
                    ChangeStatus::Abandoned,
                ])),
                other => Err(error(format!("unknown status '{other}'"))),
            },
            "owner" => account(value).map(Term::Owner),
            "reviewer" => account(value).map(Term::Reviewer),
            "topic" => Ok(Term::Topic(value.to_string())),
            "is" => match value {
                "wip" => Ok(Term::WorkInProgress),
                "private" => Ok(Term::Private),
                "open" => Ok(Term::Status(vec![ChangeStatus::New])),
                other => Err(error(format!("unknown operator 'is:{other}'"))),
            },
            other => Err(error(format!("unknown operator '{other}'"))),
        }
    }
}

impl FilterParser for TermFilterParser {
    fn parse(
        &self,
        query: &str,
        user: Option<&QueryUser>,
    ) -> Result<Box<dyn ChangePredicate>, FilterParseError> {
        let terms = query
            .split_whitespace()
            .map(|token| match token.strip_prefix('-') {
                Some(rest) => Self::parse_term(query, rest, user).map(|t| (true, t)),
                None => Self::parse_term(query, token, user).map(|t| (false, t)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Box::new(TermPredicate { terms }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
