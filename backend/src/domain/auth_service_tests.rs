//! Tests for login, registration and token resolution.

use std::sync::Arc;

use rstest::{fixture, rstest};

use super::*;
use crate::domain::PasswordHash;
use crate::domain::ports::{
    AccessClaims, MockPasswordHasher, MockTokenIssuer, MockUserRepository, TokenError,
};
use crate::domain::service_fixtures::{MapStore, fixture_clock, lookup, principal, user};

struct Harness {
    users: MockUserRepository,
    hasher: MockPasswordHasher,
    tokens: MockTokenIssuer,
}

impl Harness {
    fn build(self) -> AuthService {
        let users = UserService::new(
            Arc::new(self.users),
            Arc::new(self.hasher),
            lookup(&Arc::new(MapStore::default())),
            fixture_clock(),
        );
        AuthService::new(users, Arc::new(self.tokens))
    }
}

#[fixture]
fn harness() -> Harness {
    Harness {
        users: MockUserRepository::new(),
        hasher: MockPasswordHasher::new(),
        tokens: MockTokenIssuer::new(),
    }
}

fn credentials(password: &str) -> LoginCredentials {
    LoginCredentials::new(EmailAddress::new("ada@example.com").expect("email"), password)
}

fn claims(sub: u64, ver: u32) -> AccessClaims {
    AccessClaims {
        sub,
        email: "ada@example.com".to_owned(),
        ver,
        iat: 0,
        exp: i64::MAX,
    }
}

fn assert_login_failed(error: &Error) {
    assert_eq!(error.code(), ErrorCode::ValidationFailed);
    assert_eq!(
        error.to_field_errors().get("email"),
        Some(&[LOGIN_FAILED.to_owned()][..])
    );
}

#[rstest]
#[tokio::test]
async fn login_issues_token_and_records_last_login(mut harness: Harness) {
    harness
        .users
        .expect_find_by_email()
        .returning(|email| Ok(Some(user(4, email.as_ref(), UserType::RegularUser))));
    harness.hasher.expect_verify().returning(|_, _| Ok(true));
    harness
        .users
        .expect_update()
        .withf(|stored| stored.last_login.is_some())
        .times(1)
        .returning(|_| Ok(()));
    harness
        .tokens
        .expect_issue()
        .times(1)
        .returning(|issued_for, _| Ok(format!("token-for-{}", issued_for.id)));
    let service = harness.build();

    let outcome = service.login(credentials("secret")).await.expect("login");

    assert_eq!(outcome.access_token, "token-for-4");
    assert_eq!(outcome.email.as_ref(), "ada@example.com");
    assert_eq!(outcome.full_name, "Test User4");
}

#[rstest]
#[tokio::test]
async fn login_with_unknown_email_is_a_field_error(mut harness: Harness) {
    harness.users.expect_find_by_email().returning(|_| Ok(None));
    harness.tokens.expect_issue().never();
    let service = harness.build();

    let error = service
        .login(credentials("secret"))
        .await
        .expect_err("unknown email");

    assert_login_failed(&error);
}

#[rstest]
#[tokio::test]
async fn login_with_wrong_password_is_a_field_error(mut harness: Harness) {
    harness
        .users
        .expect_find_by_email()
        .returning(|email| Ok(Some(user(4, email.as_ref(), UserType::RegularUser))));
    harness.hasher.expect_verify().returning(|_, _| Ok(false));
    harness.users.expect_update().never();
    let service = harness.build();

    let error = service
        .login(credentials("wrong"))
        .await
        .expect_err("wrong password");

    assert_login_failed(&error);
}

#[rstest]
#[tokio::test]
async fn login_rejects_inactive_accounts(mut harness: Harness) {
    harness.users.expect_find_by_email().returning(|email| {
        let mut inactive = user(4, email.as_ref(), UserType::RegularUser);
        inactive.is_active = false;
        Ok(Some(inactive))
    });
    harness.hasher.expect_verify().never();
    let service = harness.build();

    let error = service
        .login(credentials("secret"))
        .await
        .expect_err("inactive");

    assert_login_failed(&error);
}

#[rstest]
#[tokio::test]
async fn register_enforces_password_policy(mut harness: Harness) {
    harness.users.expect_insert().never();
    let service = harness.build();

    let error = service
        .register(Registration {
            first_name: PersonName::new("Ada").expect("name"),
            last_name: PersonName::new("Lovelace").expect("name"),
            email: EmailAddress::new("ada@example.com").expect("email"),
            phone: None,
            password: "weak".to_owned(),
        })
        .await
        .expect_err("weak password");

    assert_eq!(error.code(), ErrorCode::ValidationFailed);
    assert!(error.to_field_errors().get("password").is_some());
}

#[rstest]
#[tokio::test]
async fn register_creates_regular_user_and_logs_in(mut harness: Harness) {
    harness.users.expect_find_by_email().returning(|_| Ok(None));
    harness
        .hasher
        .expect_hash()
        .returning(|_| Ok(PasswordHash::new("argon")));
    harness
        .users
        .expect_insert()
        .withf(|new_user| new_user.user_type == UserType::RegularUser)
        .returning(|new_user| Ok(new_user.into_user(UserId::new(12))));
    harness
        .tokens
        .expect_issue()
        .returning(|_, _| Ok("fresh".to_owned()));
    let service = harness.build();

    let outcome = service
        .register(Registration {
            first_name: PersonName::new("Ada").expect("name"),
            last_name: PersonName::new("Lovelace").expect("name"),
            email: EmailAddress::new("ada@example.com").expect("email"),
            phone: None,
            password: "Str0ng!pass".to_owned(),
        })
        .await
        .expect("registered");

    assert_eq!(outcome.access_token, "fresh");
    assert_eq!(outcome.full_name, "Ada Lovelace");
}

#[rstest]
#[tokio::test]
async fn logout_bumps_token_version(mut harness: Harness) {
    harness
        .users
        .expect_find_by_id()
        .returning(|id| Ok(Some(user(id.get(), "ada@example.com", UserType::RegularUser))));
    harness
        .users
        .expect_update()
        .withf(|stored| stored.token_version == 1)
        .times(1)
        .returning(|_| Ok(()));
    let service = harness.build();
    let caller = principal(&user(4, "ada@example.com", UserType::RegularUser));

    service.logout(&caller).await.expect("logged out");
}

#[rstest]
#[tokio::test]
async fn refresh_issues_a_new_token_without_revoking(mut harness: Harness) {
    harness
        .users
        .expect_find_by_id()
        .returning(|id| Ok(Some(user(id.get(), "ada@example.com", UserType::RegularUser))));
    harness.users.expect_update().never();
    harness
        .tokens
        .expect_issue()
        .withf(|issued_for, _| issued_for.token_version == 0)
        .times(1)
        .returning(|issued_for, _| Ok(format!("renewed-{}", issued_for.id)));
    let service = harness.build();
    let caller = principal(&user(4, "ada@example.com", UserType::RegularUser));

    let outcome = service.refresh(&caller).await.expect("refreshed");

    assert_eq!(outcome.access_token, "renewed-4");
}

#[rstest]
#[tokio::test]
async fn refresh_refuses_deactivated_accounts(mut harness: Harness) {
    harness.users.expect_find_by_id().returning(|id| {
        let mut inactive = user(id.get(), "ada@example.com", UserType::RegularUser);
        inactive.is_active = false;
        Ok(Some(inactive))
    });
    harness.tokens.expect_issue().never();
    let service = harness.build();
    let caller = principal(&user(4, "ada@example.com", UserType::RegularUser));

    let error = service.refresh(&caller).await.expect_err("inactive");

    assert_eq!(error.code(), ErrorCode::Unauthorized);
}

#[rstest]
#[tokio::test]
async fn resolve_principal_accepts_current_token(mut harness: Harness) {
    harness.tokens.expect_verify().returning(|_| Ok(claims(4, 0)));
    harness
        .users
        .expect_find_by_id()
        .returning(|id| Ok(Some(user(id.get(), "ada@example.com", UserType::RegularUser))));
    let service = harness.build();

    let resolved = service.resolve_principal("token").await.expect("principal");

    assert_eq!(resolved.user_id, UserId::new(4));
}

#[rstest]
#[tokio::test]
async fn resolve_principal_rejects_revoked_token(mut harness: Harness) {
    harness.tokens.expect_verify().returning(|_| Ok(claims(4, 0)));
    harness.users.expect_find_by_id().returning(|id| {
        let mut revoked = user(id.get(), "ada@example.com", UserType::RegularUser);
        revoked.token_version = 3;
        Ok(Some(revoked))
    });
    let service = harness.build();

    let error = service
        .resolve_principal("token")
        .await
        .expect_err("revoked");

    assert_eq!(error.code(), ErrorCode::Unauthorized);
}

#[rstest]
#[tokio::test]
async fn resolve_principal_rejects_bad_signature(mut harness: Harness) {
    harness
        .tokens
        .expect_verify()
        .returning(|_| Err(TokenError::invalid("bad signature")));
    harness.users.expect_find_by_id().never();
    let service = harness.build();

    let error = service
        .resolve_principal("forged")
        .await
        .expect_err("forged");

    assert_eq!(error.code(), ErrorCode::Unauthorized);
    assert_eq!(error.message(), "Invalid token");
}
