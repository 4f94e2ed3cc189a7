use async_trait::async_trait;
use chrono::NaiveDate;
use rust_xlsxwriter::Workbook;
use std::sync::Arc;
use valeapp_auth::PasswordHasher;
use valeapp_geo::{Address, GeoLookup, GeoLookupError, IpLocation, PositionFix};
use valeapp_ingest::{IngestStage, NormalizeOptions};
use valeapp_lifecycle::{
    ExportDataset, JustifySubmission, LifecycleError, VoucherLifecycle,
};
use valeapp_model::{
    EmployeeId, JustificationForm, JustificationKind, NewEmployee, NewVoucher, PromaxCode,
    SessionUser, VoucherKey, VoucherStatus,
};
use valeapp_store::{SqliteStore, VoucherStore};

struct OfflineGeo;

#[async_trait]
impl GeoLookup for OfflineGeo {
    async fn public_ip(&self) -> Result<String, GeoLookupError> {
        Err(GeoLookupError("offline".to_string()))
    }

    async fn ip_location(&self, _ip: &str) -> Result<IpLocation, GeoLookupError> {
        Err(GeoLookupError("offline".to_string()))
    }

    async fn reverse_geocode(&self, _lat: f64, _lon: f64) -> Result<Address, GeoLookupError> {
        Ok(Address {
            city: Some("Recife".to_string()),
            state_province: Some("Pernambuco".to_string()),
            country: None,
        })
    }
}

fn voucher(key: &str, owner: &str, value: f64) -> NewVoucher {
    let mut v = NewVoucher::minimal(VoucherKey::parse(key).expect("key"), "2025-09-17");
    v.item = "Cerveja 600ml".to_string();
    v.owner = Some(PromaxCode::parse(owner).expect("promax"));
    v.quantity_difference = -2;
    v.value = value;
    v
}

async fn seeded() -> (Arc<dyn VoucherStore>, VoucherLifecycle) {
    let store: Arc<dyn VoucherStore> = Arc::new(SqliteStore::open_in_memory().expect("store"));
    store
        .insert_employee(&NewEmployee {
            id: EmployeeId::parse("12345678900").expect("cpf"),
            name: "Ana Souza".to_string(),
            department: Some("Entrega".to_string()),
            promax: PromaxCode::parse("P100").expect("promax"),
        })
        .await
        .expect("employee");
    store
        .insert_vouchers(&[
            voucher("10_500", "P100", 12.5),
            voucher("11_500", "P100", 7.5),
            voucher("12_500", "P200", 30.0),
        ])
        .await
        .expect("vouchers");
    let lifecycle = VoucherLifecycle::new(
        Arc::clone(&store),
        Arc::new(OfflineGeo),
        PasswordHasher::new(10),
    );
    (store, lifecycle)
}

async fn ana(store: &Arc<dyn VoucherStore>) -> SessionUser {
    let employee = store
        .find_employee(&EmployeeId::parse("12345678900").expect("cpf"))
        .await
        .expect("lookup")
        .expect("employee");
    SessionUser::for_employee(&employee)
}

fn submission(kind: JustificationKind, observation: &str) -> JustifySubmission {
    JustifySubmission {
        form: JustificationForm {
            kind: Some(kind),
            observation: observation.to_string(),
            measure: Some("CX".to_string()),
        },
        position: Some(PositionFix {
            latitude: -8.05,
            longitude: -34.9,
            accuracy: Some(12.0),
        }),
        ..JustifySubmission::default()
    }
}

fn key(s: &str) -> VoucherKey {
    VoucherKey::parse(s).expect("key")
}

#[tokio::test]
async fn troca_without_observation_is_rejected_before_any_write() {
    let (store, lifecycle) = seeded().await;
    let user = ana(&store).await;
    let err = lifecycle
        .justify(&user, &key("10_500"), submission(JustificationKind::Exchange, "  "))
        .await
        .expect_err("observation required");
    assert!(matches!(err, LifecycleError::Validation(_)), "unexpected error: {err}");
    assert!(err.to_string().contains("OBSERVAÇÕES"), "unexpected error: {err}");
    let untouched = store.find_voucher(&key("10_500")).await.expect("find").expect("row");
    assert_eq!(untouched.status, VoucherStatus::NoAction);
}

#[tokio::test]
async fn owner_justifies_once_and_the_copy_is_archived() {
    let (store, lifecycle) = seeded().await;
    let user = ana(&store).await;
    let outcome = lifecycle
        .justify(
            &user,
            &key("10_500"),
            submission(JustificationKind::Exchange, "cliente trocou por lata"),
        )
        .await
        .expect("justify");
    assert!(outcome.archived);
    assert_eq!(outcome.voucher.status, VoucherStatus::Justified);
    let justification = outcome.voucher.justification.expect("justification");
    assert_eq!(justification.kind, JustificationKind::Exchange);
    assert_eq!(justification.measure.as_deref(), Some("CX"));
    assert!(
        justification.device.location.contains("Recife"),
        "unexpected location: {}",
        justification.device.location
    );
    assert_eq!(store.list_archived().await.expect("archive").len(), 1);

    let err = lifecycle
        .justify(
            &user,
            &key("10_500"),
            submission(JustificationKind::Other, "de novo"),
        )
        .await
        .expect_err("already justified");
    assert!(matches!(err, LifecycleError::Conflict(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn only_the_owning_employee_may_justify() {
    let (store, lifecycle) = seeded().await;
    let user = ana(&store).await;
    let err = lifecycle
        .justify(&user, &key("12_500"), submission(JustificationKind::Other, "x"))
        .await
        .expect_err("not the owner");
    assert!(matches!(err, LifecycleError::Forbidden(_)), "unexpected error: {err}");

    let admin = SessionUser {
        id: "gestor".to_string(),
        name: "Gestor".to_string(),
        department: None,
        promax: None,
        role: valeapp_model::Role::Admin,
    };
    let err = lifecycle
        .justify(&admin, &key("10_500"), submission(JustificationKind::Other, "x"))
        .await
        .expect_err("admin");
    assert!(matches!(err, LifecycleError::Forbidden(_)), "unexpected error: {err}");

    let err = lifecycle
        .justify(&user, &key("99_999"), submission(JustificationKind::Other, "x"))
        .await
        .expect_err("missing");
    assert!(matches!(err, LifecycleError::NotFound(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn employees_see_only_their_vouchers_and_stats_follow() {
    let (store, lifecycle) = seeded().await;
    let user = ana(&store).await;
    let mine = lifecycle.vouchers_for(&user).await.expect("list");
    assert_eq!(mine.len(), 2);
    let stats = VoucherLifecycle::stats(&mine);
    assert_eq!(stats.pending_count, 2);
    assert!((stats.total_value - 20.0).abs() < f64::EPSILON);

    let admin = lifecycle.admin_stats().await.expect("stats");
    assert_eq!(admin.vouchers.total, 3);
    assert_eq!(admin.total_employees, 1);
}

#[tokio::test]
async fn cleanup_archives_justified_rows_then_empties_the_table() {
    let (store, lifecycle) = seeded().await;
    let user = ana(&store).await;
    lifecycle
        .justify(&user, &key("10_500"), submission(JustificationKind::Other, "ok"))
        .await
        .expect("justify");

    // The justified row already has an archive copy, so the first insert conflicts.
    let summary = lifecycle
        .cleanup_archive_and_purge("Gestor")
        .await
        .expect("cleanup");
    assert_eq!(summary.archived, 1);
    assert_eq!(summary.deleted, 3);
    assert!(store.list_vouchers(None).await.expect("list").is_empty());
    let archive = store.list_archived().await.expect("archive");
    assert_eq!(archive.len(), 1);
    assert_eq!(archive[0].archived_by, "Gestor");

    let again = lifecycle
        .cleanup_archive_and_purge("Gestor")
        .await
        .expect("empty cleanup");
    assert_eq!(again.archived, 0);
    assert_eq!(again.deleted, 0);
}

fn workbook(rows: &[(&str, &str, &str)]) -> Vec<u8> {
    let mut wb = Workbook::new();
    let sheet = wb.add_worksheet();
    for (col, header) in ["Coditem_mapa", "Promax_unico", "Item", "Data"].iter().enumerate() {
        sheet.write_string(0, col as u16, *header).expect("header");
    }
    for (i, (key, owner, item)) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, *key).expect("key");
        sheet.write_string(r, 1, *owner).expect("owner");
        sheet.write_string(r, 2, *item).expect("item");
        sheet.write_string(r, 3, "17/09/2025").expect("date");
    }
    wb.save_to_buffer().expect("xlsx")
}

#[tokio::test]
async fn import_is_all_or_nothing() {
    let (store, lifecycle) = seeded().await;
    let opts = NormalizeOptions {
        fallback_date: NaiveDate::from_ymd_opt(2025, 1, 1).expect("date"),
    };
    let summary = lifecycle
        .import_batch(
            &workbook(&[("20_600", "P100", "Refrigerante"), ("21_600", "P200", "Água")]),
            &opts,
        )
        .await
        .expect("import");
    assert_eq!(summary.inserted, 2);
    assert!(summary
        .events
        .iter()
        .any(|e| e.stage == IngestStage::Insert && e.name == "ingest.insert.complete"));
    assert_eq!(store.list_vouchers(None).await.expect("list").len(), 5);

    // 10_500 already exists: the duplicate aborts the whole batch.
    let err = lifecycle
        .import_batch(
            &workbook(&[("30_700", "P100", "Suco"), ("10_500", "P100", "Cerveja")]),
            &opts,
        )
        .await
        .expect_err("duplicate key");
    assert!(err.to_string().contains("Erro ao salvar dados"), "unexpected error: {err}");
    assert_eq!(store.list_vouchers(None).await.expect("list").len(), 5);

    let err = lifecycle
        .import_batch(b"not a workbook", &opts)
        .await
        .expect_err("garbage");
    assert!(matches!(err, LifecycleError::Ingest(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn people_are_validated_and_duplicates_conflict() {
    let (_store, lifecycle) = seeded().await;
    let err = lifecycle
        .add_employee("12345678900", "Outra Pessoa", None, "P900")
        .await
        .expect_err("duplicate cpf");
    assert!(matches!(err, LifecycleError::Conflict(_)), "unexpected error: {err}");
    let err = lifecycle
        .add_employee("98765432100", "  ", None, "P900")
        .await
        .expect_err("blank name");
    assert!(matches!(err, LifecycleError::Validation(_)), "unexpected error: {err}");

    lifecycle
        .add_employee("98765432100", "Bruno Lima", Some(" "), "P900")
        .await
        .expect("employee");
    let found = lifecycle.list_employees(Some("bruno")).await.expect("search");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].department, None);
    assert!(found[0].is_first_login());

    let admin = lifecycle
        .add_admin("gestor", "Gestor", "segredo")
        .await
        .expect("admin");
    assert!(admin.password.starts_with("pbkdf2-sha256$"));
    assert!(admin.is_active);
    let err = lifecycle
        .add_admin("gestor", "Outro", "x")
        .await
        .expect_err("duplicate login");
    assert!(matches!(err, LifecycleError::Conflict(_)), "unexpected error: {err}");
    assert_eq!(lifecycle.list_admins().await.expect("admins").len(), 1);
}

#[tokio::test]
async fn exports_are_named_by_dataset_and_date() {
    let (_store, lifecycle) = seeded().await;
    let date = NaiveDate::from_ymd_opt(2025, 9, 17).expect("date");
    let file = lifecycle
        .export_on(ExportDataset::Vouchers, date)
        .await
        .expect("export");
    assert_eq!(file.file_name, "vales_2025-09-17.xlsx");
    assert_eq!(file.rows, 3);
    assert!(file.bytes.starts_with(b"PK"), "xlsx is a zip archive");

    let file = lifecycle
        .export_on(ExportDataset::parse("Employees").expect("dataset"), date)
        .await
        .expect("export");
    assert_eq!(file.file_name, "funcionarios_2025-09-17.xlsx");
    assert!(ExportDataset::parse("passwords").is_err());
}
