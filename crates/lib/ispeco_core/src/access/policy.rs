//! Camera access policy.
//!
//! A pure decision over already-loaded entities: the camera, the principal,
//! and the grant (if any) the camera's owner gave that principal.
//!
//! Owners may do everything. Grantees may read camera metadata with any
//! grant and stream when the grant's camera scope covers the camera's
//! environment. Only owners may read secrets, mutate or delete.

use uuid::Uuid;

use crate::models::access::DelegatedAccess;
use crate::models::camera::Camera;

/// Something a principal may try to do with a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ReadMetadata,
    ReadSecret,
    Mutate,
    Delete,
    Stream,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::ReadMetadata,
        Operation::ReadSecret,
        Operation::Mutate,
        Operation::Delete,
        Operation::Stream,
    ];
}

/// Why an operation was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No grant from the camera's owner to the principal.
    NoAccess,
    /// A grant exists but its camera scope does not cover this camera.
    ScopeMismatch,
    /// The operation is reserved for the camera's owner.
    OwnerOnly,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::NoAccess => "no_access",
            DenyReason::ScopeMismatch => "scope_mismatch",
            DenyReason::OwnerOnly => "owner_only",
        }
    }
}

/// Outcome of [`authorize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Decide whether `principal` may perform `operation` on `camera`.
///
/// `grant` is the grant between the camera's owner and the principal. A
/// grant that does not relate exactly those two users is ignored.
pub fn authorize(
    principal: Uuid,
    camera: &Camera,
    grant: Option<&DelegatedAccess>,
    operation: Operation,
) -> Decision {
    if principal == camera.owner_id {
        return Decision::Allow;
    }

    let Some(grant) = grant.filter(|g| g.owner_id == camera.owner_id && g.grantee_id == principal)
    else {
        return Decision::Deny(DenyReason::NoAccess);
    };

    match operation {
        Operation::ReadMetadata => Decision::Allow,
        Operation::Stream => {
            if grant.camera_access.covers(camera.environment) {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::ScopeMismatch)
            }
        }
        // Grantees never see decrypted secrets, even with a matching scope.
        Operation::ReadSecret | Operation::Mutate | Operation::Delete => {
            Decision::Deny(DenyReason::OwnerOnly)
        }
    }
}
