use std::sync::Arc;
use valeapp_auth::{
    AuthConfig, AuthError, Authenticator, LoginOutcome, PasswordHasher, ADMIN_BAD_CREDENTIALS,
    ADMIN_NOT_FOUND, EMPLOYEE_BAD_FIRST_LOGIN, EMPLOYEE_BAD_PASSWORD, EMPLOYEE_NOT_FOUND,
    NEW_PASSWORD_INVALID,
};
use valeapp_model::{AdminLogin, EmployeeId, NewAdminUser, NewEmployee, PromaxCode, Role};
use valeapp_store::{SqliteStore, VoucherStore};

fn fast_config() -> AuthConfig {
    AuthConfig {
        password_iterations: 10,
        ..AuthConfig::default()
    }
}

async fn seeded(stored_password: &str) -> (Arc<dyn VoucherStore>, Authenticator) {
    let store: Arc<dyn VoucherStore> = Arc::new(SqliteStore::open_in_memory().expect("store"));
    let id = EmployeeId::parse("12345678900").expect("cpf");
    store
        .insert_employee(&NewEmployee {
            id: id.clone(),
            name: "Ana Souza".to_string(),
            department: Some("Entrega".to_string()),
            promax: PromaxCode::parse("P100").expect("promax"),
        })
        .await
        .expect("employee");
    if !stored_password.is_empty() {
        store
            .set_employee_password(&id, stored_password)
            .await
            .expect("password");
    }
    store
        .insert_admin(&NewAdminUser {
            login: AdminLogin::parse("gestor").expect("login"),
            password: "admin123".to_string(),
            name: "Gestor".to_string(),
            is_active: true,
        })
        .await
        .expect("admin");
    let auth = Authenticator::new(Arc::clone(&store), fast_config());
    (store, auth)
}

fn message(err: AuthError) -> String {
    err.to_string()
}

#[tokio::test]
async fn first_access_routes_to_password_setup_never_a_session() {
    let (_store, auth) = seeded("").await;
    let outcome = auth
        .employee_login("12345678900", " 123 ")
        .await
        .expect("first login");
    let LoginOutcome::PasswordSetupRequired { ticket, employee } = outcome else {
        panic!("expected password setup");
    };
    assert_eq!(employee.name, "Ana Souza");
    assert_eq!(auth.active_sessions(), 0);
    assert!(auth.session(&ticket).is_err(), "setup ticket must not be a session");

    let err = auth
        .complete_password_setup(&ticket, "12345", "12345")
        .await
        .expect_err("short password");
    assert_eq!(message(err), NEW_PASSWORD_INVALID);
    let err = auth
        .complete_password_setup(&ticket, "123456", "123457")
        .await
        .expect_err("mismatch");
    assert_eq!(message(err), NEW_PASSWORD_INVALID);

    let issued = auth
        .complete_password_setup(&ticket, "123456", "123456")
        .await
        .expect("setup");
    assert_eq!(issued.session.value.role, Role::Employee);
    assert_eq!(
        auth.session(&issued.token).expect("session").value.promax,
        Some(PromaxCode::parse("P100").expect("promax"))
    );
    assert!(auth
        .complete_password_setup(&ticket, "123456", "123456")
        .await
        .is_err());

    let again = auth
        .employee_login("12345678900", "123456")
        .await
        .expect("normal login");
    assert!(matches!(again, LoginOutcome::Authenticated(_)));
}

#[tokio::test]
async fn first_access_with_wrong_digits_gets_first_access_hint() {
    let (_store, auth) = seeded("").await;
    let err = auth
        .employee_login("12345678900", "124")
        .await
        .expect_err("wrong digits");
    assert_eq!(message(err), EMPLOYEE_BAD_FIRST_LOGIN);
}

#[tokio::test]
async fn legacy_plaintext_password_logs_in_and_is_rehashed() {
    let (store, auth) = seeded("654321").await;
    let err = auth
        .employee_login("12345678900", "654320")
        .await
        .expect_err("wrong password");
    assert_eq!(message(err), EMPLOYEE_BAD_PASSWORD);

    let outcome = auth
        .employee_login("12345678900", "654321")
        .await
        .expect("login");
    let LoginOutcome::Authenticated(issued) = outcome else {
        panic!("expected a session");
    };
    assert_eq!(issued.session.value.id, "12345678900");

    let id = EmployeeId::parse("12345678900").expect("cpf");
    let stored = store
        .find_employee(&id)
        .await
        .expect("find")
        .expect("employee")
        .password;
    assert!(stored.starts_with("pbkdf2-sha256$"), "stored: {stored}");
    assert!(PasswordHasher::new(10).verify(&stored, "654321").is_match());
}

#[tokio::test]
async fn unknown_employee_is_reported_as_not_found() {
    let (_store, auth) = seeded("654321").await;
    let err = auth
        .employee_login("000", "000")
        .await
        .expect_err("unknown");
    assert!(matches!(err, AuthError::NotFound(_)));
    assert_eq!(message(err), EMPLOYEE_NOT_FOUND);
}

#[tokio::test]
async fn admin_login_and_logout() {
    let (_store, auth) = seeded("").await;
    let err = auth.admin_login("ninguem", "x").await.expect_err("unknown");
    assert_eq!(message(err), ADMIN_NOT_FOUND);
    let err = auth
        .admin_login("gestor", "admin124")
        .await
        .expect_err("bad password");
    assert_eq!(message(err), ADMIN_BAD_CREDENTIALS);

    let issued = auth.admin_login(" gestor ", "admin123 ").await.expect("login");
    assert!(issued.session.value.is_admin());
    assert!(auth.session(&issued.token).is_ok());
    assert!(auth.logout(&issued.token));
    assert!(auth.session(&issued.token).is_err());
}
