//! Access policy - roles, request identity, and the owner-or-admin rule.
//!
//! Every read, update or delete of a user-owned record (categories, purchases, price
//! history entries, category links) goes through [`can_access`]. The predicate itself never
//! fails; [`ensure_access`] and [`ensure_admin`] turn a refusal into
//! [`Error::Unauthorized`] for callers that want `?` propagation.

use crate::errors::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// Full access to every user's records
    Admin,
    /// Regular account
    #[default]
    Standard,
    /// Limited account
    Guest,
}

impl Role {
    /// The role name as stored and transmitted.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Standard => "Standard",
            Self::Guest => "Guest",
        }
    }

    /// Whether `value` names a known role (case-sensitive).
    #[must_use]
    pub fn is_valid(value: &str) -> bool {
        value.parse::<Self>().is_ok()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Admin" => Ok(Self::Admin),
            "Standard" => Ok(Self::Standard),
            "Guest" => Ok(Self::Guest),
            other => Err(Error::validation(format!(
                "invalid role '{other}': must be Admin, Standard or Guest"
            ))),
        }
    }
}

/// Identity of the user making a request, supplied by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    /// Authenticated user id
    pub user_id: i64,
    /// Role of that user
    pub role: Role,
}

impl RequestContext {
    /// Builds a context for `user_id` with `role`.
    #[must_use]
    pub const fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Builds a context from a role name as found in a token claim.
    ///
    /// Unknown role names are rejected rather than downgraded.
    pub fn from_claims(user_id: i64, role: &str) -> Result<Self> {
        Ok(Self {
            user_id,
            role: role.parse()?,
        })
    }

    /// Whether this context carries the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// True iff the requester owns the record or is an admin.
#[must_use]
pub fn can_access(owner_id: i64, requesting_user_id: i64, requesting_role: Role) -> bool {
    requesting_user_id == owner_id || requesting_role == Role::Admin
}

/// Fails with [`Error::Unauthorized`] unless `ctx` may touch a record owned by `owner_id`.
pub fn ensure_access(ctx: &RequestContext, owner_id: i64, action: &str) -> Result<()> {
    if can_access(owner_id, ctx.user_id, ctx.role) {
        Ok(())
    } else {
        Err(Error::unauthorized(format!(
            "{action}: records of other users are not accessible"
        )))
    }
}

/// Fails with [`Error::Unauthorized`] unless `ctx` is an admin.
pub fn ensure_admin(ctx: &RequestContext, action: &str) -> Result<()> {
    if ctx.is_admin() {
        Ok(())
    } else {
        Err(Error::unauthorized(format!(
            "{action}: only administrators may do this"
        )))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_role_round_trip_and_default() {
        for role in [Role::Admin, Role::Standard, Role::Guest] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!(Role::default(), Role::Standard);
        assert!(Role::is_valid("Guest"));
        assert!(!Role::is_valid("admin"));
        assert!(!Role::is_valid(""));
    }

    #[test]
    fn test_can_access() {
        assert!(can_access(1, 1, Role::Standard));
        assert!(can_access(1, 1, Role::Guest));
        assert!(can_access(1, 2, Role::Admin));
        assert!(!can_access(1, 2, Role::Standard));
        assert!(!can_access(1, 2, Role::Guest));
    }

    #[test]
    fn test_ensure_access_maps_to_authorization_error() {
        let owner = RequestContext::new(7, Role::Standard);
        let stranger = RequestContext::new(8, Role::Standard);
        let admin = RequestContext::new(9, Role::Admin);

        assert!(ensure_access(&owner, 7, "get purchase").is_ok());
        assert!(ensure_access(&admin, 7, "get purchase").is_ok());
        let err = ensure_access(&stranger, 7, "get purchase").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_ensure_admin() {
        assert!(ensure_admin(&RequestContext::new(1, Role::Admin), "list").is_ok());
        let err = ensure_admin(&RequestContext::new(1, Role::Standard), "list").unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));
    }

    #[test]
    fn test_context_from_claims() {
        let ctx = RequestContext::from_claims(3, "Admin").unwrap();
        assert!(ctx.is_admin());
        assert!(RequestContext::from_claims(3, "root").is_err());
    }
}
