//! Access control for scope-qualified operations.
//!
//! A personal-scope record is reachable only by its owner. A shared-scope
//! record is reachable by every user holding an `accepted` membership in the
//! space; pending invitations never grant access. Decisions are made against
//! the store on every call and are never cached, so a membership change is
//! visible to the very next request.

use crate::error::{Result, ServiceError};
use crate::models::Scope;
use crate::outcome::DegradeReason;
use crate::store::{Store, Visibility};

/// Authorize a mutation against `scope`.
///
/// `owner_id` is the owning identity of an existing record (delete-style
/// operations) or `None` when the caller is about to become the owner
/// (ingest). Returns the authenticated caller id on success.
pub async fn authorize<'c, S: Store + ?Sized>(
    store: &S,
    caller: Option<&'c str>,
    scope: &Scope,
    owner_id: Option<&str>,
) -> Result<&'c str> {
    let caller = caller.ok_or(ServiceError::AuthenticationRequired)?;

    match scope {
        Scope::Personal => match owner_id {
            Some(owner) if owner != caller => Err(ServiceError::AccessDenied),
            _ => Ok(caller),
        },
        Scope::Shared(space_id) => {
            if is_accepted_member(store, space_id, caller).await? {
                Ok(caller)
            } else {
                Err(ServiceError::AccessDenied)
            }
        }
    }
}

/// Resolve the record set a query may see.
///
/// Never fails hard: missing identity, missing membership, and backend
/// errors all come back as a [`DegradeReason`].
pub async fn resolve_visibility<'a, S: Store + ?Sized>(
    store: &S,
    caller: Option<&'a str>,
    scope: &'a Scope,
) -> std::result::Result<Visibility<'a>, DegradeReason> {
    let caller = caller.ok_or(DegradeReason::Unauthenticated)?;

    match scope {
        Scope::Personal => Ok(Visibility::Personal { principal: caller }),
        Scope::Shared(space_id) => match is_accepted_member(store, space_id, caller).await {
            Ok(true) => Ok(Visibility::Shared { space_id }),
            Ok(false) => Err(DegradeReason::NoAccess),
            Err(e) => Err(DegradeReason::Failed(e.to_string())),
        },
    }
}

/// True iff a membership for (space, user) exists with status `accepted`.
pub async fn is_accepted_member<S: Store + ?Sized>(
    store: &S,
    space_id: &str,
    user_id: &str,
) -> anyhow::Result<bool> {
    Ok(store
        .get_membership(space_id, user_id)
        .await?
        .is_some_and(|m| m.is_accepted()))
}
