use chrono::{TimeZone, Utc};
use std::sync::Arc;
use tempfile::tempdir;
use valeapp_model::{
    AdminLogin, DeviceKind, DeviceSnapshot, EmployeeId, Justification, JustificationKind,
    NewAdminUser, NewEmployee, NewVoucher, PromaxCode, VoucherKey, VoucherStatus,
};
use valeapp_store::{open_store, SqliteStore, StoreConfig, StoreErrorCode, VoucherStore};

fn voucher(key: &str, owner: &str, value: f64) -> NewVoucher {
    let mut v = NewVoucher::minimal(VoucherKey::parse(key).expect("key"), "2025-09-18");
    v.item = format!("Item {key}");
    v.value = value;
    v.quantity_difference = 2;
    v.owner = Some(PromaxCode::parse(owner).expect("promax"));
    v.measure = Some("CX".to_string());
    v
}

fn justification(kind: JustificationKind, measure: Option<&str>) -> Justification {
    Justification {
        kind,
        observation: Some("produto trocado".to_string()),
        measure: measure.map(str::to_string),
        justified_at: Utc.with_ymd_and_hms(2025, 9, 19, 10, 30, 0).single().expect("ts"),
        device: DeviceSnapshot {
            ip: Some("200.1.2.3".to_string()),
            user_agent: Some("Mozilla/5.0 (Linux; Android 14) Mobile".to_string()),
            location: "Localização não disponível".to_string(),
            device_type: DeviceKind::Mobile,
            screen_resolution: Some("412x915".to_string()),
            timezone: Some("America/Sao_Paulo".to_string()),
        },
    }
}

fn open_temp() -> (tempfile::TempDir, Arc<dyn VoucherStore>) {
    let dir = tempdir().expect("tempdir");
    let store = open_store(&StoreConfig::Sqlite {
        path: dir.path().join("nested").join("valeapp.sqlite"),
    })
    .expect("open store");
    (dir, store)
}

#[tokio::test]
async fn employees_round_trip_and_reject_duplicates() {
    let (_dir, store) = open_temp();
    let ana = NewEmployee {
        id: EmployeeId::parse("12345678900").expect("cpf"),
        name: "Ana".to_string(),
        department: Some("Logística".to_string()),
        promax: PromaxCode::parse("P1").expect("promax"),
    };
    let created = store.insert_employee(&ana).await.expect("insert");
    assert!(created.is_first_login());
    assert_eq!(store.count_employees().await.expect("count"), 1);

    let err = store.insert_employee(&ana).await.expect_err("duplicate cpf");
    assert_eq!(err.code, StoreErrorCode::Conflict);

    store
        .set_employee_password(&ana.id, "pbkdf2-sha256$1$AA$AA")
        .await
        .expect("set password");
    let found = store.find_employee(&ana.id).await.expect("find").expect("present");
    assert!(!found.is_first_login());

    let missing = EmployeeId::parse("999").expect("cpf");
    assert!(store.find_employee(&missing).await.expect("find").is_none());
    let err = store
        .set_employee_password(&missing, "x")
        .await
        .expect_err("unknown employee");
    assert_eq!(err.code, StoreErrorCode::NotFound);
}

#[tokio::test]
async fn inactive_admins_are_not_found() {
    let store = SqliteStore::open_in_memory().expect("store");
    let login = AdminLogin::parse("gestor").expect("login");
    store
        .insert_admin(&NewAdminUser {
            login: login.clone(),
            password: "secret".to_string(),
            name: "Gestor".to_string(),
            is_active: false,
        })
        .await
        .expect("insert");
    assert!(store.find_active_admin(&login).await.expect("find").is_none());
    assert_eq!(store.list_admins().await.expect("list").len(), 1);
}

#[tokio::test]
async fn voucher_batch_is_all_or_nothing() {
    let store = SqliteStore::open_in_memory().expect("store");
    let batch = vec![voucher("1_10", "P1", 5.0), voucher("1_10", "P2", 7.0)];
    let err = store.insert_vouchers(&batch).await.expect_err("duplicate key");
    assert_eq!(err.code, StoreErrorCode::Conflict);
    assert!(err.message.contains("1_10"), "unexpected error: {}", err.message);
    assert!(store.list_vouchers(None).await.expect("list").is_empty());

    let inserted = store
        .insert_vouchers(&[voucher("1_10", "P1", 5.0), voucher("2_10", "P2", 7.0)])
        .await
        .expect("insert");
    assert_eq!(inserted, 2);
    let owner = PromaxCode::parse("P1").expect("promax");
    let mine = store.list_vouchers(Some(&owner)).await.expect("list");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].key().as_str(), "1_10");
    assert_eq!(mine[0].status, VoucherStatus::NoAction);
}

#[tokio::test]
async fn justify_is_a_conditional_write() {
    let store = SqliteStore::open_in_memory().expect("store");
    store
        .insert_vouchers(&[voucher("1_10", "P1", 5.0)])
        .await
        .expect("insert");
    let key = VoucherKey::parse("1_10").expect("key");

    let updated = store
        .justify_voucher(&key, &justification(JustificationKind::Exchange, None))
        .await
        .expect("justify");
    assert_eq!(updated.status, VoucherStatus::Justified);
    assert_eq!(updated.record.measure.as_deref(), Some("CX"));
    let j = updated.justification.expect("justification");
    assert_eq!(j.kind, JustificationKind::Exchange);
    assert_eq!(j.device.device_type, DeviceKind::Mobile);

    let err = store
        .justify_voucher(&key, &justification(JustificationKind::Other, Some("UN")))
        .await
        .expect_err("second justify");
    assert_eq!(err.code, StoreErrorCode::Conflict);
    let current = store.find_voucher(&key).await.expect("find").expect("present");
    assert_eq!(
        current.justification.map(|j| j.kind),
        Some(JustificationKind::Exchange)
    );

    let unknown = VoucherKey::parse("9_99").expect("key");
    let err = store
        .justify_voucher(&unknown, &justification(JustificationKind::Other, None))
        .await
        .expect_err("unknown voucher");
    assert_eq!(err.code, StoreErrorCode::NotFound);
}

#[tokio::test]
async fn archive_conflicts_then_upserts_and_purge_counts_rows() {
    let store = SqliteStore::open_in_memory().expect("store");
    store
        .insert_vouchers(&[voucher("1_10", "P1", 5.0), voucher("2_10", "P1", 3.0)])
        .await
        .expect("insert");
    let key = VoucherKey::parse("1_10").expect("key");
    let justified = store
        .justify_voucher(&key, &justification(JustificationKind::Loan, Some("UN")))
        .await
        .expect("justify");
    let at = Utc.with_ymd_and_hms(2025, 9, 20, 8, 0, 0).single().expect("ts");
    let archived = justified.to_archived("Gestor", at);

    store.insert_archived(&archived).await.expect("first archive");
    let err = store
        .insert_archived_batch(std::slice::from_ref(&archived))
        .await
        .expect_err("duplicate archive row");
    assert_eq!(err.code, StoreErrorCode::Conflict);
    let written = store
        .upsert_archived_batch(std::slice::from_ref(&archived))
        .await
        .expect("upsert");
    assert_eq!(written, 1);

    let rows = store.list_archived().await.expect("archive");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].archived_by, "Gestor");
    assert_eq!(rows[0].archived_at, at);
    assert_eq!(rows[0].record.measure.as_deref(), Some("UN"));

    assert_eq!(store.list_justified_vouchers().await.expect("justified").len(), 1);
    assert_eq!(store.delete_all_vouchers().await.expect("delete"), 2);
    assert!(store.list_vouchers(None).await.expect("list").is_empty());
    assert_eq!(store.list_archived().await.expect("archive").len(), 1);
}

#[tokio::test]
async fn ping_reports_backend() {
    let store = SqliteStore::open_in_memory().expect("store");
    store.ping().await.expect("ping");
    assert_eq!(store.backend_tag(), "sqlite");
}
