use taskdeck_core::db::open_db_in_memory;
use taskdeck_core::{
    authenticate_owner, AuthError, CoreError, CredentialService, EmailCredentials, RepoError,
    SqliteUserRepository, UserRepository,
};

#[test]
fn create_user_normalizes_email_and_round_trips() {
    let conn = open_db_in_memory().unwrap();
    let users = SqliteUserRepository::try_new(&conn).unwrap();

    let user = users.create_user("  Alice@Example.COM ", "hash-1").unwrap();
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.credential_hash, "hash-1");
    assert!(user.created_at > 0);

    assert_eq!(users.get_user(user.id).unwrap(), Some(user.clone()));
    assert_eq!(
        users.find_by_email("ALICE@example.com").unwrap(),
        Some(user)
    );
}

#[test]
fn duplicate_and_malformed_registrations_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let users = SqliteUserRepository::try_new(&conn).unwrap();
    users.create_user("alice@example.com", "hash").unwrap();

    assert!(matches!(
        users.create_user("ALICE@example.com", "other"),
        Err(RepoError::DuplicateEmail(email)) if email == "alice@example.com"
    ));
    assert!(matches!(
        users.create_user("not-an-email", "hash"),
        Err(RepoError::InvalidEmail(_))
    ));
    assert!(matches!(
        users.create_user("bob@example.com", "  "),
        Err(RepoError::InvalidCredentialHash)
    ));
}

#[test]
fn lookups_for_unknown_users_find_nothing() {
    let conn = open_db_in_memory().unwrap();
    let users = SqliteUserRepository::try_new(&conn).unwrap();

    assert_eq!(users.get_user(uuid::Uuid::new_v4()).unwrap(), None);
    assert_eq!(users.find_by_email("ghost@example.com").unwrap(), None);
    assert_eq!(users.find_by_email("garbage").unwrap(), None);
}

#[test]
fn user_serialization_omits_credential_hash() {
    let conn = open_db_in_memory().unwrap();
    let users = SqliteUserRepository::try_new(&conn).unwrap();
    let user = users.create_user("alice@example.com", "secret-hash").unwrap();

    let json = serde_json::to_string(&user).unwrap();
    assert!(json.contains("alice@example.com"));
    assert!(!json.contains("secret-hash"));
}

#[test]
fn email_credentials_resolve_registered_users_only() {
    let conn = open_db_in_memory().unwrap();
    let credentials = EmailCredentials::new(SqliteUserRepository::try_new(&conn).unwrap());
    let user = credentials.register("alice@example.com", "hash").unwrap();

    assert_eq!(credentials.authenticate(" Alice@example.com").unwrap(), user.id);
    assert!(matches!(
        credentials.authenticate("mallory@example.com"),
        Err(AuthError::Unauthenticated)
    ));

    let err = authenticate_owner(&credentials, "mallory@example.com").unwrap_err();
    assert!(matches!(err, CoreError::Unauthenticated));
    assert_eq!(err.code(), "unauthenticated");
}

#[test]
fn registering_twice_is_a_validation_error() {
    let conn = open_db_in_memory().unwrap();
    let credentials = EmailCredentials::new(SqliteUserRepository::try_new(&conn).unwrap());
    credentials.register("alice@example.com", "hash").unwrap();

    let err = credentials
        .register("alice@example.com", "hash")
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}
