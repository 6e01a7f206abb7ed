//! Tests for user values and list filtering.

use super::*;
use chrono::TimeZone;
use rstest::{fixture, rstest};

#[fixture]
fn ada() -> User {
    let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single().expect("valid time");
    NewUser {
        first_name: PersonName::new("Ada").expect("name"),
        last_name: PersonName::new("Lovelace").expect("name"),
        email: EmailAddress::new("ada@example.com").expect("email"),
        phone: None,
        user_type: UserType::RegularUser,
        password_hash: PasswordHash::new("$argon2id$stub"),
        created_by: None,
        created_at: at,
    }
    .into_user(UserId::new(1))
}

#[rstest]
#[case("ada@example.com", Some("ada@example.com"))]
#[case("  ADA@Example.com ", Some("ada@example.com"))]
#[case("ada@example", None)]
#[case("ada example@x.io", None)]
#[case("", None)]
fn email_addresses_are_normalised(#[case] raw: &str, #[case] expected: Option<&str>) {
    let parsed = EmailAddress::new(raw).ok().map(String::from);
    assert_eq!(parsed.as_deref(), expected);
}

#[rstest]
#[case("   ", UserValidationError::BlankName)]
#[case(&"x".repeat(NAME_MAX + 1), UserValidationError::NameTooLong { max: NAME_MAX })]
fn names_reject_bad_input(#[case] raw: &str, #[case] expected: UserValidationError) {
    assert_eq!(PersonName::new(raw), Err(expected));
}

#[rstest]
fn user_types_use_display_labels() {
    assert_eq!(
        serde_json::to_value(UserType::SuperAdmin).expect("serialise"),
        serde_json::json!("Super Admin")
    );
    assert_eq!(
        serde_json::to_value(UserType::RegularUser).expect("serialise"),
        serde_json::json!("Regular User")
    );
}

#[rstest]
fn password_hash_debug_is_redacted(ada: User) {
    assert!(!format!("{ada:?}").contains("argon2id"));
}

#[rstest]
fn new_users_start_active_and_unverified(ada: User) {
    assert!(ada.can_log_in());
    assert!(!ada.email_verified);
    assert_eq!(ada.full_name(), "Ada Lovelace");
    assert_eq!(ada.token_version, 0);
}

#[rstest]
#[case(None, None, true)]
#[case(Some("LOVE"), None, true)]
#[case(Some("example.com"), None, true)]
#[case(Some("grace"), None, false)]
#[case(None, Some(1), false)]
fn list_filter_matches(
    ada: User,
    #[case] keyword: Option<&str>,
    #[case] exclude: Option<u64>,
    #[case] expected: bool,
) {
    let filter = UserListFilter {
        keyword: keyword.map(str::to_owned),
        exclude: exclude.map(UserId::new),
    };
    assert_eq!(filter.matches(&ada), expected);
}

#[rstest]
fn list_filter_skips_deleted_users(mut ada: User) {
    ada.deleted_at = Some(ada.created_at);
    assert!(!UserListFilter::default().matches(&ada));
}
