//! Soft-fail results for query operations.
//!
//! Listing and searching treat "no access" and "no data" the same from the
//! caller's side: both produce an empty list. [`QueryOutcome`] keeps the
//! reason around so that logs and tests can still tell them apart.

use serde::Serialize;

/// Why a query degraded to an empty result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradeReason {
    /// No caller identity was supplied.
    Unauthenticated,
    /// The caller is not an accepted member of the requested space.
    NoAccess,
    /// A backend failure was swallowed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome<T> {
    Items(Vec<T>),
    Degraded(DegradeReason),
}

impl<T> QueryOutcome<T> {
    pub fn failed(err: impl std::fmt::Display) -> Self {
        QueryOutcome::Degraded(DegradeReason::Failed(err.to_string()))
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, QueryOutcome::Degraded(_))
    }

    pub fn reason(&self) -> Option<&DegradeReason> {
        match self {
            QueryOutcome::Items(_) => None,
            QueryOutcome::Degraded(reason) => Some(reason),
        }
    }

    /// The caller-facing value: the items, or `[]` when degraded.
    pub fn into_items(self) -> Vec<T> {
        match self {
            QueryOutcome::Items(items) => items,
            QueryOutcome::Degraded(_) => Vec::new(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(Vec<T>) -> Vec<U>) -> QueryOutcome<U> {
        match self {
            QueryOutcome::Items(items) => QueryOutcome::Items(f(items)),
            QueryOutcome::Degraded(reason) => QueryOutcome::Degraded(reason),
        }
    }
}

impl<T: Serialize> Serialize for QueryOutcome<T> {
    /// Serializes as the caller sees it: a plain array.
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            QueryOutcome::Items(items) => items.serialize(serializer),
            QueryOutcome::Degraded(_) => Vec::<T>::new().serialize(serializer),
        }
    }
}
