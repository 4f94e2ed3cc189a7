// SPDX-License-Identifier: Apache-2.0

use crate::backend::{StoreError, StoreErrorCode, VoucherStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use valeapp_model::{
    AdminLogin, AdminUser, ArchivedVoucher, DeviceKind, DeviceSnapshot, Employee, EmployeeId,
    Justification, JustificationKind, NewAdminUser, NewEmployee, NewVoucher, PromaxCode, Voucher,
    VoucherKey, VoucherStatus,
};

pub const SQLITE_SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS employees (
  cpf TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  department TEXT,
  promax_unico TEXT NOT NULL UNIQUE,
  senha TEXT NOT NULL DEFAULT '',
  created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS admin_users (
  id TEXT PRIMARY KEY,
  login TEXT NOT NULL UNIQUE,
  password TEXT NOT NULL,
  name TEXT NOT NULL,
  is_active INTEGER NOT NULL DEFAULT 1,
  created_at TEXT NOT NULL,
  updated_at TEXT
);
CREATE TABLE IF NOT EXISTS vouchers (
  id TEXT PRIMARY KEY,
  coditem_mapa TEXT NOT NULL UNIQUE,
  data TEXT NOT NULL,
  mapa TEXT,
  cod_cli TEXT,
  cliente TEXT,
  vale TEXT,
  emissao TEXT,
  item_ti TEXT,
  coditem TEXT,
  item TEXT NOT NULL,
  un TEXT,
  qtde_saida INTEGER NOT NULL DEFAULT 0,
  avulsa TEXT,
  qtde_retorno INTEGER NOT NULL DEFAULT 0,
  avulsa2 TEXT,
  qtde_diferenca INTEGER NOT NULL DEFAULT 0,
  avulsa3 TEXT,
  valor REAL NOT NULL DEFAULT 0,
  conferente TEXT,
  promax_unico TEXT,
  medida TEXT,
  acao_transportadora TEXT NOT NULL,
  justification_type TEXT,
  observations TEXT,
  justified_at TEXT,
  justified_by_ip TEXT,
  justified_by_device TEXT,
  justified_by_location TEXT,
  device_type TEXT,
  screen_resolution TEXT,
  timezone TEXT,
  created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS vouchers_owner_idx ON vouchers (promax_unico);
CREATE TABLE IF NOT EXISTS vales_justificados (
  id TEXT PRIMARY KEY,
  coditem_mapa TEXT NOT NULL UNIQUE,
  data TEXT NOT NULL,
  mapa TEXT,
  cod_cli TEXT,
  cliente TEXT,
  vale TEXT,
  emissao TEXT,
  item_ti TEXT,
  coditem TEXT,
  item TEXT NOT NULL,
  un TEXT,
  qtde_saida INTEGER NOT NULL DEFAULT 0,
  avulsa TEXT,
  qtde_retorno INTEGER NOT NULL DEFAULT 0,
  avulsa2 TEXT,
  qtde_diferenca INTEGER NOT NULL DEFAULT 0,
  avulsa3 TEXT,
  valor REAL NOT NULL DEFAULT 0,
  conferente TEXT,
  promax_unico TEXT,
  medida TEXT,
  acao_transportadora TEXT NOT NULL,
  justification_type TEXT,
  observations TEXT,
  justified_at TEXT,
  justified_by_ip TEXT,
  justified_by_device TEXT,
  justified_by_location TEXT,
  device_type TEXT,
  screen_resolution TEXT,
  timezone TEXT,
  created_at TEXT NOT NULL,
  original_voucher_id TEXT NOT NULL,
  justified_by_user TEXT NOT NULL,
  moved_to_permanent_at TEXT NOT NULL
);
";

/// Columns shared by `vouchers` and `vales_justificados`, in bind order.
const VOUCHER_DATA_COLUMNS: [&str; 32] = [
    "coditem_mapa",
    "data",
    "mapa",
    "cod_cli",
    "cliente",
    "vale",
    "emissao",
    "item_ti",
    "coditem",
    "item",
    "un",
    "qtde_saida",
    "avulsa",
    "qtde_retorno",
    "avulsa2",
    "qtde_diferenca",
    "avulsa3",
    "valor",
    "conferente",
    "promax_unico",
    "medida",
    "acao_transportadora",
    "justification_type",
    "observations",
    "justified_at",
    "justified_by_ip",
    "justified_by_device",
    "justified_by_location",
    "device_type",
    "screen_resolution",
    "timezone",
    "created_at",
];

const ARCHIVE_EXTRA_COLUMNS: [&str; 3] = [
    "original_voucher_id",
    "justified_by_user",
    "moved_to_permanent_at",
];

fn sql_err(e: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(err, _) = &e {
        if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        {
            return StoreError::new(StoreErrorCode::Conflict, e.to_string());
        }
        if err.code == rusqlite::ErrorCode::ConstraintViolation {
            return StoreError::new(StoreErrorCode::Validation, e.to_string());
        }
        if err.code == rusqlite::ErrorCode::CannotOpen {
            return StoreError::new(StoreErrorCode::Io, e.to_string());
        }
    }
    StoreError::new(StoreErrorCode::Internal, e.to_string())
}

fn corrupt(what: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::new(
        StoreErrorCode::Internal,
        format!("corrupt {what} row: {detail}"),
    )
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt("timestamp", e))
}

fn insert_sql(table: &str, columns: &[&str]) -> String {
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        columns.join(", ")
    )
}

fn voucher_values(
    record: &NewVoucher,
    status: VoucherStatus,
    justification: Option<&Justification>,
    created_at: DateTime<Utc>,
) -> Vec<Value> {
    let j = justification;
    let measure = j
        .and_then(|j| j.measure.clone())
        .or_else(|| record.measure.clone());
    vec![
        record.key.as_str().to_string().into(),
        record.date.clone().into(),
        record.map_id.clone().into(),
        record.client_code.clone().into(),
        record.client_name.clone().into(),
        record.voucher_number.clone().into(),
        record.issued_at.clone().into(),
        record.item_ti.clone().into(),
        record.item_code.clone().into(),
        record.item.clone().into(),
        record.unit.clone().into(),
        record.quantity_out.into(),
        record.loose_out.clone().into(),
        record.quantity_returned.into(),
        record.loose_returned.clone().into(),
        record.quantity_difference.into(),
        record.loose_difference.clone().into(),
        record.value.into(),
        record.reviewer.clone().into(),
        record.owner.as_ref().map(|p| p.as_str().to_string()).into(),
        measure.into(),
        status.as_str().to_string().into(),
        j.map(|j| j.kind.label().to_string()).into(),
        j.and_then(|j| j.observation.clone()).into(),
        j.map(|j| j.justified_at.to_rfc3339()).into(),
        j.and_then(|j| j.device.ip.clone()).into(),
        j.and_then(|j| j.device.user_agent.clone()).into(),
        j.map(|j| j.device.location.clone()).into(),
        j.map(|j| j.device.device_type.as_str().to_string()).into(),
        j.and_then(|j| j.device.screen_resolution.clone()).into(),
        j.and_then(|j| j.device.timezone.clone()).into(),
        created_at.to_rfc3339().into(),
    ]
}

struct VoucherColumns {
    id: String,
    record: NewVoucher,
    status: VoucherStatus,
    justification: Option<Justification>,
    created_at: DateTime<Utc>,
}

fn read_voucher_columns(row: &Row<'_>) -> Result<VoucherColumns, StoreError> {
    let text = |name: &str| row.get::<_, Option<String>>(name).map_err(sql_err);
    let key_raw: String = row.get("coditem_mapa").map_err(sql_err)?;
    let key = VoucherKey::parse(&key_raw).map_err(|e| corrupt("voucher", e))?;
    let mut record = NewVoucher::minimal(key, row.get::<_, String>("data").map_err(sql_err)?);
    record.map_id = text("mapa")?;
    record.client_code = text("cod_cli")?;
    record.client_name = text("cliente")?;
    record.voucher_number = text("vale")?;
    record.issued_at = text("emissao")?;
    record.item_ti = text("item_ti")?;
    record.item_code = text("coditem")?;
    record.item = row.get("item").map_err(sql_err)?;
    record.unit = text("un")?;
    record.quantity_out = row.get("qtde_saida").map_err(sql_err)?;
    record.loose_out = text("avulsa")?;
    record.quantity_returned = row.get("qtde_retorno").map_err(sql_err)?;
    record.loose_returned = text("avulsa2")?;
    record.quantity_difference = row.get("qtde_diferenca").map_err(sql_err)?;
    record.loose_difference = text("avulsa3")?;
    record.value = row.get("valor").map_err(sql_err)?;
    record.reviewer = text("conferente")?;
    record.owner = text("promax_unico")?
        .as_deref()
        .map(PromaxCode::parse)
        .transpose()
        .map_err(|e| corrupt("voucher", e))?;
    record.measure = text("medida")?;

    let status_raw: String = row.get("acao_transportadora").map_err(sql_err)?;
    let status = VoucherStatus::parse(&status_raw).map_err(|e| corrupt("voucher", e))?;
    let created_at = parse_ts(&row.get::<_, String>("created_at").map_err(sql_err)?)?;

    let justification = match text("justification_type")? {
        Some(kind) if status == VoucherStatus::Justified => {
            let kind = JustificationKind::parse(&kind).map_err(|e| corrupt("voucher", e))?;
            let justified_at = match text("justified_at")? {
                Some(raw) => parse_ts(&raw)?,
                None => created_at,
            };
            Some(Justification {
                kind,
                observation: text("observations")?,
                measure: record.measure.clone(),
                justified_at,
                device: DeviceSnapshot {
                    ip: text("justified_by_ip")?,
                    user_agent: text("justified_by_device")?,
                    location: text("justified_by_location")?.unwrap_or_default(),
                    device_type: text("device_type")?
                        .as_deref()
                        .map(DeviceKind::parse_lenient)
                        .unwrap_or_default(),
                    screen_resolution: text("screen_resolution")?,
                    timezone: text("timezone")?,
                },
            })
        }
        _ => None,
    };

    Ok(VoucherColumns {
        id: row.get("id").map_err(sql_err)?,
        record,
        status,
        justification,
        created_at,
    })
}

fn read_voucher(row: &Row<'_>) -> Result<Voucher, StoreError> {
    let cols = read_voucher_columns(row)?;
    Ok(Voucher {
        id: cols.id,
        record: cols.record,
        status: cols.status,
        justification: cols.justification,
        created_at: cols.created_at,
    })
}

fn read_archived(row: &Row<'_>) -> Result<ArchivedVoucher, StoreError> {
    let cols = read_voucher_columns(row)?;
    let archived_at = parse_ts(
        &row.get::<_, String>("moved_to_permanent_at")
            .map_err(sql_err)?,
    )?;
    Ok(ArchivedVoucher {
        original_voucher_id: row.get("original_voucher_id").map_err(sql_err)?,
        record: cols.record,
        status: cols.status,
        justification: cols.justification,
        archived_by: row.get("justified_by_user").map_err(sql_err)?,
        archived_at,
    })
}

fn read_employee(row: &Row<'_>) -> Result<Employee, StoreError> {
    let id: String = row.get("cpf").map_err(sql_err)?;
    let promax: String = row.get("promax_unico").map_err(sql_err)?;
    Ok(Employee {
        id: EmployeeId::parse(&id).map_err(|e| corrupt("employee", e))?,
        name: row.get("name").map_err(sql_err)?,
        department: row.get("department").map_err(sql_err)?,
        promax: PromaxCode::parse(&promax).map_err(|e| corrupt("employee", e))?,
        password: row.get("senha").map_err(sql_err)?,
        created_at: parse_ts(&row.get::<_, String>("created_at").map_err(sql_err)?)?,
    })
}

fn read_admin(row: &Row<'_>) -> Result<AdminUser, StoreError> {
    let login: String = row.get("login").map_err(sql_err)?;
    let updated_at: Option<String> = row.get("updated_at").map_err(sql_err)?;
    Ok(AdminUser {
        id: row.get("id").map_err(sql_err)?,
        login: AdminLogin::parse(&login).map_err(|e| corrupt("admin", e))?,
        password: row.get("password").map_err(sql_err)?,
        name: row.get("name").map_err(sql_err)?,
        is_active: row.get("is_active").map_err(sql_err)?,
        created_at: parse_ts(&row.get::<_, String>("created_at").map_err(sql_err)?)?,
        updated_at: updated_at.as_deref().map(parse_ts).transpose()?,
    })
}

fn query_all<T>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
    read: fn(&Row<'_>) -> Result<T, StoreError>,
) -> Result<Vec<T>, StoreError> {
    let mut stmt = conn.prepare(sql).map_err(sql_err)?;
    let mut rows = stmt.query(params).map_err(sql_err)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(sql_err)? {
        out.push(read(row)?);
    }
    Ok(out)
}

fn query_one<T>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
    read: fn(&Row<'_>) -> Result<T, StoreError>,
) -> Result<Option<T>, StoreError> {
    Ok(query_all(conn, sql, params, read)?.into_iter().next())
}

fn archive_values(archived: &ArchivedVoucher) -> Vec<Value> {
    // The archive keeps the moment the row was archived as its creation time.
    let mut values = voucher_values(
        &archived.record,
        archived.status,
        archived.justification.as_ref(),
        archived.archived_at,
    );
    values.push(archived.original_voucher_id.clone().into());
    values.push(archived.archived_by.clone().into());
    values.push(archived.archived_at.to_rfc3339().into());
    values
}

fn archive_columns() -> Vec<&'static str> {
    let mut columns = vec!["id"];
    columns.extend(VOUCHER_DATA_COLUMNS);
    columns.extend(ARCHIVE_EXTRA_COLUMNS);
    columns
}

fn write_archive_batch(
    conn: &mut Connection,
    archived: &[ArchivedVoucher],
    upsert: bool,
) -> Result<usize, StoreError> {
    let columns = archive_columns();
    let mut sql = insert_sql("vales_justificados", &columns);
    if upsert {
        let updates = columns
            .iter()
            .filter(|c| **c != "id" && **c != "coditem_mapa")
            .map(|c| format!("{c} = excluded.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(" ON CONFLICT (coditem_mapa) DO UPDATE SET {updates}"));
    }
    let tx = conn.transaction().map_err(sql_err)?;
    {
        let mut stmt = tx.prepare(&sql).map_err(sql_err)?;
        for item in archived {
            let mut values: Vec<Value> = vec![uuid::Uuid::new_v4().to_string().into()];
            values.extend(archive_values(item));
            stmt.execute(params_from_iter(values)).map_err(sql_err)?;
        }
    }
    tx.commit().map_err(sql_err)?;
    Ok(archived.len())
}

const VOUCHER_ORDER: &str = "ORDER BY created_at DESC, rowid DESC";

/// Embedded single-file backend. Blocking SQLite work runs on the tokio
/// blocking pool behind one connection.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::new(
                    StoreErrorCode::Io,
                    format!("cannot create {}: {e}", parent.display()),
                )
            })?;
        }
        let conn = Connection::open(path).map_err(sql_err)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(sql_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA foreign_keys=ON;
            PRAGMA busy_timeout=5000;
            ",
        )
        .map_err(sql_err)?;
        conn.execute_batch(SCHEMA).map_err(sql_err)?;
        conn.execute_batch(&format!("PRAGMA user_version={SQLITE_SCHEMA_VERSION};"))
            .map_err(sql_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| {
                StoreError::new(StoreErrorCode::Internal, "sqlite connection poisoned")
            })?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::new(StoreErrorCode::Internal, format!("sqlite task failed: {e}")))?
    }
}

#[async_trait]
impl VoucherStore for SqliteStore {
    fn backend_tag(&self) -> &'static str {
        "sqlite"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))
                .map(|_| ())
                .map_err(sql_err)
        })
        .await
    }

    async fn find_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, StoreError> {
        let id = id.as_str().to_string();
        self.with_conn(move |conn| {
            query_one(
                conn,
                "SELECT * FROM employees WHERE cpf = ?1",
                &[&id],
                read_employee,
            )
        })
        .await
    }

    async fn list_employees(&self) -> Result<Vec<Employee>, StoreError> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT * FROM employees ORDER BY name, cpf",
                &[],
                read_employee,
            )
        })
        .await
    }

    async fn count_employees(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM employees", [], |r| r.get(0))
                .map_err(sql_err)?;
            usize::try_from(count).map_err(|e| corrupt("count", e))
        })
        .await
    }

    async fn insert_employee(&self, employee: &NewEmployee) -> Result<Employee, StoreError> {
        let employee = employee.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO employees (cpf, name, department, promax_unico, senha, created_at)
                 VALUES (?1, ?2, ?3, ?4, '', ?5)",
                params![
                    employee.id.as_str(),
                    employee.name,
                    employee.department,
                    employee.promax.as_str(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(sql_err)?;
            query_one(
                conn,
                "SELECT * FROM employees WHERE cpf = ?1",
                &[&employee.id.as_str()],
                read_employee,
            )?
            .ok_or_else(|| StoreError::new(StoreErrorCode::Internal, "inserted employee vanished"))
        })
        .await
    }

    async fn set_employee_password(
        &self,
        id: &EmployeeId,
        stored_password: &str,
    ) -> Result<(), StoreError> {
        let id = id.as_str().to_string();
        let stored = stored_password.to_string();
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE employees SET senha = ?1 WHERE cpf = ?2",
                    params![stored, id],
                )
                .map_err(sql_err)?;
            if changed == 0 {
                return Err(StoreError::new(
                    StoreErrorCode::NotFound,
                    format!("no employee with id {id}"),
                ));
            }
            Ok(())
        })
        .await
    }

    async fn find_active_admin(
        &self,
        login: &AdminLogin,
    ) -> Result<Option<AdminUser>, StoreError> {
        let login = login.as_str().to_string();
        self.with_conn(move |conn| {
            query_one(
                conn,
                "SELECT * FROM admin_users WHERE login = ?1 AND is_active = 1",
                &[&login],
                read_admin,
            )
        })
        .await
    }

    async fn list_admins(&self) -> Result<Vec<AdminUser>, StoreError> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT * FROM admin_users ORDER BY name, login",
                &[],
                read_admin,
            )
        })
        .await
    }

    async fn insert_admin(&self, admin: &NewAdminUser) -> Result<AdminUser, StoreError> {
        let admin = admin.clone();
        self.with_conn(move |conn| {
            let id = uuid::Uuid::new_v4().to_string();
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO admin_users (id, login, password, name, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    id,
                    admin.login.as_str(),
                    admin.password,
                    admin.name,
                    admin.is_active,
                    now,
                ],
            )
            .map_err(sql_err)?;
            query_one(
                conn,
                "SELECT * FROM admin_users WHERE id = ?1",
                &[&id],
                read_admin,
            )?
            .ok_or_else(|| StoreError::new(StoreErrorCode::Internal, "inserted admin vanished"))
        })
        .await
    }

    async fn set_admin_password(
        &self,
        login: &AdminLogin,
        stored_password: &str,
    ) -> Result<(), StoreError> {
        let login = login.as_str().to_string();
        let stored = stored_password.to_string();
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE admin_users SET password = ?1, updated_at = ?2 WHERE login = ?3",
                    params![stored, Utc::now().to_rfc3339(), login],
                )
                .map_err(sql_err)?;
            if changed == 0 {
                return Err(StoreError::new(
                    StoreErrorCode::NotFound,
                    format!("no admin with login {login}"),
                ));
            }
            Ok(())
        })
        .await
    }

    async fn list_vouchers(&self, owner: Option<&PromaxCode>) -> Result<Vec<Voucher>, StoreError> {
        let owner = owner.map(|p| p.as_str().to_string());
        self.with_conn(move |conn| match owner {
            Some(owner) => query_all(
                conn,
                &format!("SELECT * FROM vouchers WHERE promax_unico = ?1 {VOUCHER_ORDER}"),
                &[&owner],
                read_voucher,
            ),
            None => query_all(
                conn,
                &format!("SELECT * FROM vouchers {VOUCHER_ORDER}"),
                &[],
                read_voucher,
            ),
        })
        .await
    }

    async fn find_voucher(&self, key: &VoucherKey) -> Result<Option<Voucher>, StoreError> {
        let key = key.as_str().to_string();
        self.with_conn(move |conn| {
            query_one(
                conn,
                "SELECT * FROM vouchers WHERE coditem_mapa = ?1",
                &[&key],
                read_voucher,
            )
        })
        .await
    }

    async fn insert_vouchers(&self, vouchers: &[NewVoucher]) -> Result<usize, StoreError> {
        let vouchers = vouchers.to_vec();
        self.with_conn(move |conn| {
            let mut columns = vec!["id"];
            columns.extend(VOUCHER_DATA_COLUMNS);
            let sql = insert_sql("vouchers", &columns);
            let created_at = Utc::now();
            let tx = conn.transaction().map_err(sql_err)?;
            {
                let mut stmt = tx.prepare(&sql).map_err(sql_err)?;
                for record in &vouchers {
                    let mut values: Vec<Value> = vec![uuid::Uuid::new_v4().to_string().into()];
                    values.extend(voucher_values(
                        record,
                        VoucherStatus::NoAction,
                        None,
                        created_at,
                    ));
                    stmt.execute(params_from_iter(values)).map_err(|e| {
                        let err = sql_err(e);
                        StoreError::new(err.code, format!("{} ({})", err.message, record.key))
                    })?;
                }
            }
            tx.commit().map_err(sql_err)?;
            Ok(vouchers.len())
        })
        .await
    }

    async fn justify_voucher(
        &self,
        key: &VoucherKey,
        justification: &Justification,
    ) -> Result<Voucher, StoreError> {
        let key = key.as_str().to_string();
        let j = justification.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(sql_err)?;
            let changed = tx
                .execute(
                    "UPDATE vouchers SET
                       acao_transportadora = ?1,
                       justification_type = ?2,
                       observations = ?3,
                       medida = COALESCE(?4, medida),
                       justified_at = ?5,
                       justified_by_ip = ?6,
                       justified_by_device = ?7,
                       justified_by_location = ?8,
                       device_type = ?9,
                       screen_resolution = ?10,
                       timezone = ?11
                     WHERE coditem_mapa = ?12 AND acao_transportadora = ?13",
                    params![
                        VoucherStatus::Justified.as_str(),
                        j.kind.label(),
                        j.observation,
                        j.measure,
                        j.justified_at.to_rfc3339(),
                        j.device.ip,
                        j.device.user_agent,
                        j.device.location,
                        j.device.device_type.as_str(),
                        j.device.screen_resolution,
                        j.device.timezone,
                        key,
                        VoucherStatus::NoAction.as_str(),
                    ],
                )
                .map_err(sql_err)?;
            let current = query_one(
                &tx,
                "SELECT * FROM vouchers WHERE coditem_mapa = ?1",
                &[&key],
                read_voucher,
            )?;
            let Some(voucher) = current else {
                return Err(StoreError::new(
                    StoreErrorCode::NotFound,
                    format!("no voucher with key {key}"),
                ));
            };
            if changed == 0 {
                return Err(StoreError::new(
                    StoreErrorCode::Conflict,
                    format!("voucher {key} is already {}", voucher.status),
                ));
            }
            tx.commit().map_err(sql_err)?;
            Ok(voucher)
        })
        .await
    }

    async fn list_justified_vouchers(&self) -> Result<Vec<Voucher>, StoreError> {
        self.with_conn(|conn| {
            query_all(
                conn,
                &format!("SELECT * FROM vouchers WHERE acao_transportadora = ?1 {VOUCHER_ORDER}"),
                &[&VoucherStatus::Justified.as_str()],
                read_voucher,
            )
        })
        .await
    }

    async fn delete_all_vouchers(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| conn.execute("DELETE FROM vouchers", []).map_err(sql_err))
            .await
    }

    async fn insert_archived(&self, archived: &ArchivedVoucher) -> Result<(), StoreError> {
        let archived = archived.clone();
        self.with_conn(move |conn| {
            write_archive_batch(conn, std::slice::from_ref(&archived), false).map(|_| ())
        })
        .await
    }

    async fn insert_archived_batch(
        &self,
        archived: &[ArchivedVoucher],
    ) -> Result<usize, StoreError> {
        let archived = archived.to_vec();
        self.with_conn(move |conn| write_archive_batch(conn, &archived, false))
            .await
    }

    async fn upsert_archived_batch(
        &self,
        archived: &[ArchivedVoucher],
    ) -> Result<usize, StoreError> {
        let archived = archived.to_vec();
        self.with_conn(move |conn| write_archive_batch(conn, &archived, true))
            .await
    }

    async fn list_archived(&self) -> Result<Vec<ArchivedVoucher>, StoreError> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT * FROM vales_justificados ORDER BY moved_to_permanent_at DESC, rowid DESC",
                &[],
                read_archived,
            )
        })
        .await
    }
}
