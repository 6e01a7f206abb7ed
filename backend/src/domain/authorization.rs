//! Declarative access requirements evaluated before an operation runs.
//!
//! Every check fails closed: an anonymous caller, or one lacking the
//! required role, user type or permission, receives
//! [`Error::permission_denied`].

use super::{Error, Principal, UserType};

/// Access requirement attached to an endpoint.
///
/// # Examples
/// ```
/// use stockdesk::domain::{Requirement, UserType};
///
/// let admin_only = Requirement::AnyUserType(vec![UserType::SuperAdmin]);
/// assert!(admin_only.evaluate(None).is_err());
/// assert!(Requirement::Anonymous.evaluate(None).is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Requirement {
    /// No requirement.
    #[default]
    Anonymous,
    /// Any authenticated caller.
    Authenticated,
    /// Caller's user type is one of the listed types.
    AnyUserType(Vec<UserType>),
    /// Caller holds at least one of the listed roles.
    AnyRole(Vec<String>),
    /// Caller holds the named permission.
    Permission(String),
    /// Caller holds the permission or has one of the listed user types.
    PermissionOrUserType {
        /// Permission that grants access on its own.
        permission: String,
        /// User types that grant access regardless of permissions.
        user_types: Vec<UserType>,
    },
}

impl Requirement {
    /// Shorthand for [`Requirement::AnyUserType`] with the operator type.
    pub fn super_admin() -> Self {
        Self::AnyUserType(vec![UserType::SuperAdmin])
    }

    /// Shorthand for [`Requirement::AnyRole`].
    pub fn any_role<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AnyRole(roles.into_iter().map(Into::into).collect())
    }

    /// Whether anonymous callers pass.
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Check `principal` against the requirement.
    pub fn evaluate(&self, principal: Option<&Principal>) -> Result<(), Error> {
        if self.is_public() {
            return Ok(());
        }
        let Some(principal) = principal else {
            return Err(Error::permission_denied());
        };
        let allowed = match self {
            Self::Anonymous | Self::Authenticated => true,
            Self::AnyUserType(types) => types.contains(&principal.user_type),
            Self::AnyRole(roles) => roles.iter().any(|role| principal.has_role(role)),
            Self::Permission(permission) => principal.has_permission(permission),
            Self::PermissionOrUserType {
                permission,
                user_types,
            } => principal.has_permission(permission) || user_types.contains(&principal.user_type),
        };
        if allowed {
            Ok(())
        } else {
            Err(Error::permission_denied())
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::{EmailAddress, ErrorCode, PERMISSION_DENIED, UserId};
    use rstest::{fixture, rstest};

    #[fixture]
    fn analyst() -> Principal {
        Principal {
            user_id: UserId::new(3),
            email: EmailAddress::new("analyst@example.com").expect("email"),
            user_type: UserType::RegularUser,
            roles: vec!["analyst".to_owned()],
            permissions: vec!["stock.view_stock".to_owned()],
        }
    }

    #[rstest]
    #[case(Requirement::Anonymous, true)]
    #[case(Requirement::Authenticated, true)]
    #[case(Requirement::super_admin(), false)]
    #[case(Requirement::AnyUserType(vec![UserType::SuperAdmin, UserType::RegularUser]), true)]
    #[case(Requirement::any_role(["admin", "analyst"]), true)]
    #[case(Requirement::any_role(["admin"]), false)]
    #[case(Requirement::Permission("stock.view_stock".to_owned()), true)]
    #[case(Requirement::Permission("stock.delete_stock".to_owned()), false)]
    #[case(
        Requirement::PermissionOrUserType {
            permission: "stock.delete_stock".to_owned(),
            user_types: vec![UserType::RegularUser],
        },
        true
    )]
    #[case(
        Requirement::PermissionOrUserType {
            permission: "stock.delete_stock".to_owned(),
            user_types: vec![UserType::SuperAdmin],
        },
        false
    )]
    fn evaluates_against_principal(
        analyst: Principal,
        #[case] requirement: Requirement,
        #[case] allowed: bool,
    ) {
        assert_eq!(requirement.evaluate(Some(&analyst)).is_ok(), allowed);
    }

    #[rstest]
    #[case(Requirement::Authenticated)]
    #[case(Requirement::super_admin())]
    #[case(Requirement::any_role(["analyst"]))]
    #[case(Requirement::Permission("stock.view_stock".to_owned()))]
    fn anonymous_callers_are_denied(#[case] requirement: Requirement) {
        let error = requirement.evaluate(None).expect_err("must deny");
        assert_eq!(error.code(), ErrorCode::Forbidden);
        assert_eq!(error.message(), PERMISSION_DENIED);
    }

    #[rstest]
    fn empty_role_list_denies_everyone(analyst: Principal) {
        assert!(Requirement::AnyRole(Vec::new()).evaluate(Some(&analyst)).is_err());
    }
}
