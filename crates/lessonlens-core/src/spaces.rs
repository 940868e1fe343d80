//! Shared spaces and their memberships.
//!
//! A space is created by one user, who becomes its owner and first accepted
//! member. Accepted members invite others; an invitation is a `pending`
//! membership until the invitee accepts it. Only accepted memberships grant
//! access to the space's records (see [`crate::access`]).

use serde::Serialize;

use crate::access;
use crate::audit;
use crate::error::{Result, ServiceError};
use crate::models::{new_id, now_millis, AuditAction, Membership, MembershipStatus, Scope, Space};
use crate::outcome::{DegradeReason, QueryOutcome};
use crate::store::Store;

const MAX_NAME_CHARS: usize = 120;

/// Result of an invitation: either a fresh pending membership or the
/// membership the user already had.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub membership: Membership,
    pub created: bool,
}

/// Create a space owned by the caller and return its id.
pub async fn create_space<S: Store + ?Sized>(
    store: &S,
    caller: Option<&str>,
    name: &str,
) -> Result<String> {
    let caller = caller.ok_or(ServiceError::AuthenticationRequired)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::invalid("space name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ServiceError::invalid(format!(
            "space name must be at most {} characters",
            MAX_NAME_CHARS
        )));
    }

    let now = now_millis();
    let space = Space {
        id: new_id(),
        name: name.to_string(),
        owner_id: caller.to_string(),
        created_at: now,
    };
    let owner = Membership {
        space_id: space.id.clone(),
        user_id: caller.to_string(),
        status: MembershipStatus::Accepted,
        invited_by: caller.to_string(),
        created_at: now,
    };
    let scope = Scope::shared(space.id.as_str());
    let entry = audit::entry(caller, AuditAction::SpaceCreate, &space.id, &scope, name);
    store.create_space(&space, &owner, &entry).await?;
    tracing::info!(space_id = %space.id, owner = caller, "created space");
    Ok(space.id)
}

/// Invite `user_id` into a space as a pending member.
///
/// An existing membership (pending or accepted) is returned unchanged.
pub async fn invite_member<S: Store + ?Sized>(
    store: &S,
    caller: Option<&str>,
    space_id: &str,
    user_id: &str,
) -> Result<Invitation> {
    let caller = caller.ok_or(ServiceError::AuthenticationRequired)?;
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(ServiceError::invalid("userId must not be empty"));
    }
    require_space(store, space_id).await?;

    let scope = Scope::shared(space_id);
    access::authorize(store, Some(caller), &scope, None)
        .await
        .inspect_err(|e| tracing::info!(space_id, caller, error = %e, "invite rejected"))?;

    if let Some(existing) = store.get_membership(space_id, user_id).await? {
        return Ok(Invitation {
            membership: existing,
            created: false,
        });
    }

    let membership = Membership {
        space_id: space_id.to_string(),
        user_id: user_id.to_string(),
        status: MembershipStatus::Pending,
        invited_by: caller.to_string(),
        created_at: now_millis(),
    };
    let entry = audit::entry(caller, AuditAction::SpaceInvite, user_id, &scope, "");
    store.upsert_membership(&membership, &entry).await?;
    tracing::info!(space_id, invitee = user_id, inviter = caller, "invited member");

    Ok(Invitation {
        membership,
        created: true,
    })
}

/// Accept the caller's own invitation. Accepting twice is a no-op.
pub async fn accept_invitation<S: Store + ?Sized>(
    store: &S,
    caller: Option<&str>,
    space_id: &str,
) -> Result<Membership> {
    let caller = caller.ok_or(ServiceError::AuthenticationRequired)?;
    let mut membership = store
        .get_membership(space_id, caller)
        .await?
        .ok_or_else(|| ServiceError::not_found("invitation", space_id))?;

    if membership.is_accepted() {
        return Ok(membership);
    }

    membership.status = MembershipStatus::Accepted;
    let entry = audit::entry(
        caller,
        AuditAction::SpaceAccept,
        caller,
        &Scope::shared(space_id),
        "",
    );
    store.upsert_membership(&membership, &entry).await?;
    tracing::info!(space_id, member = caller, "accepted invitation");
    Ok(membership)
}

/// Remove `user_id` from a space.
///
/// Members may remove themselves (leaving, or declining an invitation); the
/// space owner may remove anyone but themselves.
pub async fn remove_member<S: Store + ?Sized>(
    store: &S,
    caller: Option<&str>,
    space_id: &str,
    user_id: &str,
) -> Result<()> {
    let caller = caller.ok_or(ServiceError::AuthenticationRequired)?;
    let space = require_space(store, space_id).await?;

    if user_id == space.owner_id {
        return Err(ServiceError::invalid("the space owner cannot be removed"));
    }
    if caller != user_id && caller != space.owner_id {
        tracing::info!(space_id, caller, member = user_id, "member removal rejected");
        return Err(ServiceError::AccessDenied);
    }
    let entry = audit::entry(
        caller,
        AuditAction::SpaceRemoveMember,
        user_id,
        &Scope::shared(space_id),
        "",
    );
    if !store.delete_membership(space_id, user_id, &entry).await? {
        return Err(ServiceError::not_found("membership", user_id));
    }
    tracing::info!(space_id, member = user_id, removed_by = caller, "removed member");
    Ok(())
}

/// Spaces in which the caller is an accepted member.
pub async fn list_spaces<S: Store + ?Sized>(store: &S, caller: Option<&str>) -> QueryOutcome<Space> {
    let Some(caller) = caller else {
        return QueryOutcome::Degraded(DegradeReason::Unauthenticated);
    };
    match store.list_spaces_for_member(caller).await {
        Ok(spaces) => QueryOutcome::Items(spaces),
        Err(e) => {
            tracing::warn!(error = %e, "failed to list spaces");
            QueryOutcome::failed(e)
        }
    }
}

/// Memberships of a space, visible to its accepted members.
pub async fn list_members<S: Store + ?Sized>(
    store: &S,
    caller: Option<&str>,
    space_id: &str,
) -> QueryOutcome<Membership> {
    let scope = Scope::shared(space_id);
    if let Err(reason) = access::resolve_visibility(store, caller, &scope).await {
        return QueryOutcome::Degraded(reason);
    }
    match store.list_memberships(space_id).await {
        Ok(members) => QueryOutcome::Items(members),
        Err(e) => {
            tracing::warn!(error = %e, space_id, "failed to list members");
            QueryOutcome::failed(e)
        }
    }
}

async fn require_space<S: Store + ?Sized>(store: &S, space_id: &str) -> Result<Space> {
    store
        .get_space(space_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("space", space_id))
}
