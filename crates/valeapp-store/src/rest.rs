use crate::backend::{StoreError, StoreErrorCode, VoucherStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use valeapp_model::{
    AdminLogin, AdminUser, ArchivedVoucher, DeviceKind, DeviceSnapshot, Employee, EmployeeId,
    Justification, JustificationKind, NewAdminUser, NewEmployee, NewVoucher, PromaxCode, Voucher,
    VoucherKey, VoucherStatus,
};

const EMPLOYEES: &str = "employees";
const ADMINS: &str = "admin_users";
const VOUCHERS: &str = "vouchers";
const ARCHIVE: &str = "vales_justificados";
const KEY_COLUMN: &str = "Coditem_mapa";
/// Matches every row whose id is set; PostgREST refuses unfiltered deletes.
const NIL_UUID: &str = "00000000-0000-0000-0000-000000000000";

const PG_UNIQUE_VIOLATION: &str = "23505";
const PGRST_NO_ROWS: &str = "PGRST116";

#[derive(Debug, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

pub(crate) fn map_rest_error(status: StatusCode, body: &str) -> StoreError {
    let parsed = serde_json::from_str::<PostgrestError>(body).ok();
    let code = parsed.as_ref().and_then(|p| p.code.as_deref());
    let message = parsed
        .as_ref()
        .and_then(|p| {
            let msg = p.message.clone()?;
            Some(match &p.details {
                Some(details) => format!("{msg} ({details})"),
                None => msg,
            })
        })
        .unwrap_or_else(|| body.trim().to_string());
    let message = format!("status={} {message}", status.as_u16());
    let store_code = match code {
        Some(PG_UNIQUE_VIOLATION) => StoreErrorCode::Conflict,
        Some(PGRST_NO_ROWS) => StoreErrorCode::NotFound,
        _ => match status {
            StatusCode::CONFLICT => StoreErrorCode::Conflict,
            StatusCode::NOT_FOUND => StoreErrorCode::NotFound,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreErrorCode::Config,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                StoreErrorCode::Validation
            }
            s if s.is_server_error() => StoreErrorCode::Network,
            _ => StoreErrorCode::Internal,
        },
    };
    StoreError::new(store_code, message)
}

fn corrupt(what: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::new(
        StoreErrorCode::Internal,
        format!("unexpected {what} row from store: {detail}"),
    )
}

fn parse_ts(raw: Option<&str>, what: &str) -> Result<DateTime<Utc>, StoreError> {
    let raw = raw.ok_or_else(|| corrupt(what, "missing timestamp"))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt(what, e))
}

/// Hosted `vouchers` row; column names are the ones the spreadsheet import
/// has always used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct VoucherRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "Coditem_mapa")]
    pub key: String,
    #[serde(rename = "Data")]
    pub date: String,
    #[serde(rename = "Mapa", default)]
    pub map_id: Option<String>,
    #[serde(rename = "cod_cli", default)]
    pub client_code: Option<String>,
    #[serde(rename = "Cliente", default)]
    pub client_name: Option<String>,
    #[serde(rename = "Vale", default)]
    pub voucher_number: Option<String>,
    #[serde(rename = "Emissão", default)]
    pub issued_at: Option<String>,
    #[serde(rename = "Item_TI", default)]
    pub item_ti: Option<String>,
    #[serde(rename = "coditem", default)]
    pub item_code: Option<String>,
    #[serde(rename = "Item", default)]
    pub item: Option<String>,
    #[serde(rename = "UN", default)]
    pub unit: Option<String>,
    #[serde(rename = "Qtde_Saída", default)]
    pub quantity_out: Option<i64>,
    #[serde(rename = "Avulsa", default)]
    pub loose_out: Option<String>,
    #[serde(rename = "Qtde_Retorno", default)]
    pub quantity_returned: Option<i64>,
    #[serde(rename = "Avulsa2", default)]
    pub loose_returned: Option<String>,
    #[serde(rename = "Qtde_Diferença", default)]
    pub quantity_difference: Option<i64>,
    #[serde(rename = "Avulsa3", default)]
    pub loose_difference: Option<String>,
    #[serde(rename = "Valor", default)]
    pub value: Option<f64>,
    #[serde(rename = "Conferente", default)]
    pub reviewer: Option<String>,
    #[serde(rename = "Promax_unico", default)]
    pub owner: Option<String>,
    #[serde(rename = "Medida", default)]
    pub measure: Option<String>,
    #[serde(default)]
    pub acao_transportadora: Option<String>,
    #[serde(default)]
    pub justification_type: Option<String>,
    #[serde(default)]
    pub observations: Option<String>,
    #[serde(default)]
    pub justified_at: Option<String>,
    #[serde(default)]
    pub justified_by_ip: Option<String>,
    #[serde(default)]
    pub justified_by_device: Option<String>,
    #[serde(default)]
    pub justified_by_location: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub screen_resolution: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl VoucherRow {
    pub(crate) fn from_record(
        record: &NewVoucher,
        status: VoucherStatus,
        justification: Option<&Justification>,
    ) -> Self {
        let mut row = Self {
            id: None,
            key: record.key.as_str().to_string(),
            date: record.date.clone(),
            map_id: record.map_id.clone(),
            client_code: record.client_code.clone(),
            client_name: record.client_name.clone(),
            voucher_number: record.voucher_number.clone(),
            issued_at: record.issued_at.clone(),
            item_ti: record.item_ti.clone(),
            item_code: record.item_code.clone(),
            item: Some(record.item.clone()),
            unit: record.unit.clone(),
            quantity_out: Some(record.quantity_out),
            loose_out: record.loose_out.clone(),
            quantity_returned: Some(record.quantity_returned),
            loose_returned: record.loose_returned.clone(),
            quantity_difference: Some(record.quantity_difference),
            loose_difference: record.loose_difference.clone(),
            value: Some(record.value),
            reviewer: record.reviewer.clone(),
            owner: record.owner.as_ref().map(|p| p.as_str().to_string()),
            measure: record.measure.clone(),
            acao_transportadora: Some(status.as_str().to_string()),
            ..Self::default()
        };
        if let Some(j) = justification {
            row.apply_justification(j);
        }
        row
    }

    fn apply_justification(&mut self, j: &Justification) {
        let patch = JustifyPatch::from_justification(j);
        self.acao_transportadora = Some(patch.acao_transportadora.to_string());
        self.justification_type = Some(patch.justification_type.to_string());
        self.observations = patch.observations;
        if patch.measure.is_some() {
            self.measure = patch.measure;
        }
        self.justified_at = Some(patch.justified_at);
        self.justified_by_ip = patch.justified_by_ip;
        self.justified_by_device = patch.justified_by_device;
        self.justified_by_location = Some(patch.justified_by_location);
        self.device_type = Some(patch.device_type.to_string());
        self.screen_resolution = patch.screen_resolution;
        self.timezone = patch.timezone;
    }

    fn decode(
        self,
    ) -> Result<
        (
            NewVoucher,
            VoucherStatus,
            Option<Justification>,
            Option<String>,
            Option<String>,
        ),
        StoreError,
    > {
        let key = VoucherKey::parse(&self.key).map_err(|e| corrupt("voucher", e))?;
        let mut record = NewVoucher::minimal(key, self.date);
        record.map_id = self.map_id;
        record.client_code = self.client_code;
        record.client_name = self.client_name;
        record.voucher_number = self.voucher_number;
        record.issued_at = self.issued_at;
        record.item_ti = self.item_ti;
        record.item_code = self.item_code;
        record.item = self.item.unwrap_or_default();
        record.unit = self.unit;
        record.quantity_out = self.quantity_out.unwrap_or(0);
        record.loose_out = self.loose_out;
        record.quantity_returned = self.quantity_returned.unwrap_or(0);
        record.loose_returned = self.loose_returned;
        record.quantity_difference = self.quantity_difference.unwrap_or(0);
        record.loose_difference = self.loose_difference;
        record.value = self.value.unwrap_or(0.0);
        record.reviewer = self.reviewer;
        record.owner = self
            .owner
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(PromaxCode::parse)
            .transpose()
            .map_err(|e| corrupt("voucher", e))?;
        record.measure = self.measure;

        let status = match self.acao_transportadora.as_deref() {
            Some(raw) => VoucherStatus::parse(raw).map_err(|e| corrupt("voucher", e))?,
            None => VoucherStatus::NoAction,
        };
        let justification = match (status, self.justification_type.as_deref()) {
            (VoucherStatus::Justified, Some(kind)) => Some(Justification {
                kind: JustificationKind::parse(kind).map_err(|e| corrupt("voucher", e))?,
                observation: self.observations,
                measure: record.measure.clone(),
                justified_at: parse_ts(
                    self.justified_at.as_deref().or(self.created_at.as_deref()),
                    "voucher",
                )?,
                device: DeviceSnapshot {
                    ip: self.justified_by_ip,
                    user_agent: self.justified_by_device,
                    location: self.justified_by_location.unwrap_or_default(),
                    device_type: self
                        .device_type
                        .as_deref()
                        .map(DeviceKind::parse_lenient)
                        .unwrap_or_default(),
                    screen_resolution: self.screen_resolution,
                    timezone: self.timezone,
                },
            }),
            _ => None,
        };
        Ok((record, status, justification, self.id, self.created_at))
    }

    pub(crate) fn into_voucher(self) -> Result<Voucher, StoreError> {
        let (record, status, justification, id, created_at) = self.decode()?;
        Ok(Voucher {
            id: id.ok_or_else(|| corrupt("voucher", "missing id"))?,
            record,
            status,
            justification,
            created_at: parse_ts(created_at.as_deref(), "voucher")?,
        })
    }
}

/// Hosted `vales_justificados` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ArchiveRow {
    #[serde(flatten)]
    pub voucher: VoucherRow,
    pub original_voucher_id: String,
    pub justified_by_user: String,
    pub moved_to_permanent_at: String,
}

impl ArchiveRow {
    pub(crate) fn from_archived(archived: &ArchivedVoucher) -> Self {
        Self {
            voucher: VoucherRow::from_record(
                &archived.record,
                archived.status,
                archived.justification.as_ref(),
            ),
            original_voucher_id: archived.original_voucher_id.clone(),
            justified_by_user: archived.archived_by.clone(),
            moved_to_permanent_at: archived.archived_at.to_rfc3339(),
        }
    }

    pub(crate) fn into_archived(self) -> Result<ArchivedVoucher, StoreError> {
        let archived_at = parse_ts(Some(&self.moved_to_permanent_at), "archive")?;
        let (record, status, justification, _, _) = self.voucher.decode()?;
        Ok(ArchivedVoucher {
            original_voucher_id: self.original_voucher_id,
            record,
            status,
            justification,
            archived_by: self.justified_by_user,
            archived_at,
        })
    }
}

/// Body of the conditional justify update. `Medida` is omitted when the form
/// left it blank so the imported value survives.
#[derive(Debug, Serialize)]
struct JustifyPatch {
    acao_transportadora: &'static str,
    justification_type: &'static str,
    observations: Option<String>,
    #[serde(rename = "Medida", skip_serializing_if = "Option::is_none")]
    measure: Option<String>,
    justified_at: String,
    justified_by_ip: Option<String>,
    justified_by_device: Option<String>,
    justified_by_location: String,
    device_type: &'static str,
    screen_resolution: Option<String>,
    timezone: Option<String>,
}

impl JustifyPatch {
    fn from_justification(j: &Justification) -> Self {
        Self {
            acao_transportadora: VoucherStatus::Justified.as_str(),
            justification_type: j.kind.label(),
            observations: j.observation.clone(),
            measure: j.measure.clone(),
            justified_at: j.justified_at.to_rfc3339(),
            justified_by_ip: j.device.ip.clone(),
            justified_by_device: j.device.user_agent.clone(),
            justified_by_location: j.device.location.clone(),
            device_type: j.device.device_type.as_str(),
            screen_resolution: j.device.screen_resolution.clone(),
            timezone: j.device.timezone.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EmployeeRow {
    pub cpf: String,
    pub name: String,
    #[serde(default)]
    pub department: Option<String>,
    pub promax_unico: String,
    #[serde(rename = "Senha", default)]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl EmployeeRow {
    pub(crate) fn into_employee(self) -> Result<Employee, StoreError> {
        Ok(Employee {
            id: EmployeeId::parse(&self.cpf).map_err(|e| corrupt("employee", e))?,
            name: self.name,
            department: self.department,
            promax: PromaxCode::parse(&self.promax_unico).map_err(|e| corrupt("employee", e))?,
            password: self.password.unwrap_or_default(),
            created_at: parse_ts(self.created_at.as_deref(), "employee")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AdminRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub login: String,
    pub password: String,
    pub name: String,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl AdminRow {
    pub(crate) fn into_admin(self) -> Result<AdminUser, StoreError> {
        Ok(AdminUser {
            id: self.id.ok_or_else(|| corrupt("admin", "missing id"))?,
            login: AdminLogin::parse(&self.login).map_err(|e| corrupt("admin", e))?,
            password: self.password,
            name: self.name,
            is_active: self.is_active,
            created_at: parse_ts(self.created_at.as_deref(), "admin")?,
            updated_at: self
                .updated_at
                .as_deref()
                .map(|raw| parse_ts(Some(raw), "admin"))
                .transpose()?,
        })
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

/// Hosted PostgREST backend. One request per call and no retries; a failed
/// call surfaces as a [`StoreError`] to the caller.
pub struct RestStore {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let parsed = reqwest::Url::parse(base_url).map_err(|e| {
            StoreError::new(StoreErrorCode::Config, format!("invalid store url: {e}"))
        })?;
        if parsed.host_str().is_none() {
            return Err(StoreError::new(
                StoreErrorCode::Config,
                "store url missing host",
            ));
        }
        if api_key.trim().is_empty() {
            return Err(StoreError::new(
                StoreErrorCode::Config,
                "store api key must not be empty",
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| StoreError::new(StoreErrorCode::Config, format!("http client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            client,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn auth_headers(&self) -> Result<HeaderMap, StoreError> {
        let invalid =
            |e: reqwest::header::InvalidHeaderValue| {
                StoreError::new(StoreErrorCode::Config, format!("invalid api key header: {e}"))
            };
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&self.api_key).map_err(invalid)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(invalid)?,
        );
        Ok(headers)
    }

    #[instrument(name = "rest_store_request", skip(self, query, body), fields(backend = "rest"))]
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        table: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
        prefer: Option<&str>,
    ) -> Result<Vec<T>, StoreError> {
        let mut req = self
            .client
            .request(method, self.table_url(table))
            .headers(self.auth_headers()?)
            .query(query);
        if let Some(prefer) = prefer {
            req = req.header("Prefer", prefer);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.map_err(|e| {
            StoreError::new(StoreErrorCode::Network, format!("request to {table} failed: {e}"))
        })?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| {
            StoreError::new(StoreErrorCode::Network, format!("read body failed: {e}"))
        })?;
        debug!(table, status = status.as_u16(), bytes = text.len(), "rest store response");
        if !status.is_success() {
            return Err(map_rest_error(status, &text));
        }
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|e| corrupt(table, e))
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        self.request(Method::GET, table, query, None, None).await
    }

    async fn insert<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        table: &str,
        rows: &[B],
        upsert_on: Option<&str>,
    ) -> Result<Vec<T>, StoreError> {
        let body = serde_json::to_value(rows)
            .map_err(|e| StoreError::new(StoreErrorCode::Internal, format!("encode rows: {e}")))?;
        match upsert_on {
            Some(column) => {
                self.request(
                    Method::POST,
                    table,
                    &[("on_conflict", column.to_string())],
                    Some(body),
                    Some("resolution=merge-duplicates,return=representation"),
                )
                .await
            }
            None => {
                self.request(
                    Method::POST,
                    table,
                    &[],
                    Some(body),
                    Some("return=representation"),
                )
                .await
            }
        }
    }
}

#[async_trait]
impl VoucherStore for RestStore {
    fn backend_tag(&self) -> &'static str {
        "rest"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.select::<serde_json::Value>(
            ADMINS,
            &[("select", "id".to_string()), ("limit", "1".to_string())],
        )
        .await
        .map(|_| ())
    }

    async fn find_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, StoreError> {
        let rows: Vec<EmployeeRow> = self
            .select(EMPLOYEES, &[("select", "*".to_string()), ("cpf", eq(id.as_str()))])
            .await?;
        rows.into_iter().next().map(EmployeeRow::into_employee).transpose()
    }

    async fn list_employees(&self) -> Result<Vec<Employee>, StoreError> {
        let rows: Vec<EmployeeRow> = self
            .select(
                EMPLOYEES,
                &[("select", "*".to_string()), ("order", "name.asc,cpf.asc".to_string())],
            )
            .await?;
        rows.into_iter().map(EmployeeRow::into_employee).collect()
    }

    async fn count_employees(&self) -> Result<usize, StoreError> {
        let rows: Vec<serde_json::Value> = self
            .select(EMPLOYEES, &[("select", "cpf".to_string())])
            .await?;
        Ok(rows.len())
    }

    async fn insert_employee(&self, employee: &NewEmployee) -> Result<Employee, StoreError> {
        let row = EmployeeRow {
            cpf: employee.id.as_str().to_string(),
            name: employee.name.clone(),
            department: employee.department.clone(),
            promax_unico: employee.promax.as_str().to_string(),
            password: Some(String::new()),
            created_at: None,
        };
        let rows: Vec<EmployeeRow> = self.insert(EMPLOYEES, &[row], None).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| corrupt("employee", "insert returned no row"))?
            .into_employee()
    }

    async fn set_employee_password(
        &self,
        id: &EmployeeId,
        stored_password: &str,
    ) -> Result<(), StoreError> {
        let rows: Vec<serde_json::Value> = self
            .request(
                Method::PATCH,
                EMPLOYEES,
                &[("cpf", eq(id.as_str())), ("select", "cpf".to_string())],
                Some(serde_json::json!({ "Senha": stored_password })),
                Some("return=representation"),
            )
            .await?;
        if rows.is_empty() {
            return Err(StoreError::new(
                StoreErrorCode::NotFound,
                format!("no employee with id {id}"),
            ));
        }
        Ok(())
    }

    async fn find_active_admin(
        &self,
        login: &AdminLogin,
    ) -> Result<Option<AdminUser>, StoreError> {
        let rows: Vec<AdminRow> = self
            .select(
                ADMINS,
                &[
                    ("select", "*".to_string()),
                    ("login", eq(login.as_str())),
                    ("is_active", "eq.true".to_string()),
                ],
            )
            .await?;
        rows.into_iter().next().map(AdminRow::into_admin).transpose()
    }

    async fn list_admins(&self) -> Result<Vec<AdminUser>, StoreError> {
        let rows: Vec<AdminRow> = self
            .select(
                ADMINS,
                &[("select", "*".to_string()), ("order", "name.asc,login.asc".to_string())],
            )
            .await?;
        rows.into_iter().map(AdminRow::into_admin).collect()
    }

    async fn insert_admin(&self, admin: &NewAdminUser) -> Result<AdminUser, StoreError> {
        let row = AdminRow {
            id: None,
            login: admin.login.as_str().to_string(),
            password: admin.password.clone(),
            name: admin.name.clone(),
            is_active: admin.is_active,
            created_at: None,
            updated_at: None,
        };
        let rows: Vec<AdminRow> = self.insert(ADMINS, &[row], None).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| corrupt("admin", "insert returned no row"))?
            .into_admin()
    }

    async fn set_admin_password(
        &self,
        login: &AdminLogin,
        stored_password: &str,
    ) -> Result<(), StoreError> {
        let rows: Vec<serde_json::Value> = self
            .request(
                Method::PATCH,
                ADMINS,
                &[("login", eq(login.as_str())), ("select", "id".to_string())],
                Some(serde_json::json!({
                    "password": stored_password,
                    "updated_at": Utc::now().to_rfc3339(),
                })),
                Some("return=representation"),
            )
            .await?;
        if rows.is_empty() {
            return Err(StoreError::new(
                StoreErrorCode::NotFound,
                format!("no admin with login {login}"),
            ));
        }
        Ok(())
    }

    async fn list_vouchers(&self, owner: Option<&PromaxCode>) -> Result<Vec<Voucher>, StoreError> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc,id.desc".to_string()),
        ];
        if let Some(owner) = owner {
            query.push(("Promax_unico", eq(owner.as_str())));
        }
        let rows: Vec<VoucherRow> = self.select(VOUCHERS, &query).await?;
        rows.into_iter().map(VoucherRow::into_voucher).collect()
    }

    async fn find_voucher(&self, key: &VoucherKey) -> Result<Option<Voucher>, StoreError> {
        let rows: Vec<VoucherRow> = self
            .select(VOUCHERS, &[("select", "*".to_string()), (KEY_COLUMN, eq(key.as_str()))])
            .await?;
        rows.into_iter().next().map(VoucherRow::into_voucher).transpose()
    }

    async fn insert_vouchers(&self, vouchers: &[NewVoucher]) -> Result<usize, StoreError> {
        if vouchers.is_empty() {
            return Ok(0);
        }
        let rows: Vec<VoucherRow> = vouchers
            .iter()
            .map(|v| VoucherRow::from_record(v, VoucherStatus::NoAction, None))
            .collect();
        // PostgREST runs a bulk insert as one statement, so it lands whole or not at all.
        let inserted: Vec<serde_json::Value> = self
            .request(
                Method::POST,
                VOUCHERS,
                &[("select", "id".to_string())],
                Some(serde_json::to_value(&rows).map_err(|e| {
                    StoreError::new(StoreErrorCode::Internal, format!("encode rows: {e}"))
                })?),
                Some("return=representation"),
            )
            .await?;
        Ok(inserted.len())
    }

    async fn justify_voucher(
        &self,
        key: &VoucherKey,
        justification: &Justification,
    ) -> Result<Voucher, StoreError> {
        let patch = serde_json::to_value(JustifyPatch::from_justification(justification))
            .map_err(|e| StoreError::new(StoreErrorCode::Internal, format!("encode patch: {e}")))?;
        let rows: Vec<VoucherRow> = self
            .request(
                Method::PATCH,
                VOUCHERS,
                &[
                    (KEY_COLUMN, eq(key.as_str())),
                    ("acao_transportadora", eq(VoucherStatus::NoAction.as_str())),
                    ("select", "*".to_string()),
                ],
                Some(patch),
                Some("return=representation"),
            )
            .await?;
        if let Some(row) = rows.into_iter().next() {
            return row.into_voucher();
        }
        match self.find_voucher(key).await? {
            Some(current) => Err(StoreError::new(
                StoreErrorCode::Conflict,
                format!("voucher {key} is already {}", current.status),
            )),
            None => Err(StoreError::new(
                StoreErrorCode::NotFound,
                format!("no voucher with key {key}"),
            )),
        }
    }

    async fn list_justified_vouchers(&self) -> Result<Vec<Voucher>, StoreError> {
        let rows: Vec<VoucherRow> = self
            .select(
                VOUCHERS,
                &[
                    ("select", "*".to_string()),
                    ("acao_transportadora", eq(VoucherStatus::Justified.as_str())),
                    ("order", "created_at.desc,id.desc".to_string()),
                ],
            )
            .await?;
        rows.into_iter().map(VoucherRow::into_voucher).collect()
    }

    async fn delete_all_vouchers(&self) -> Result<usize, StoreError> {
        let rows: Vec<serde_json::Value> = self
            .request(
                Method::DELETE,
                VOUCHERS,
                &[("id", format!("neq.{NIL_UUID}")), ("select", "id".to_string())],
                None,
                Some("return=representation"),
            )
            .await?;
        Ok(rows.len())
    }

    async fn insert_archived(&self, archived: &ArchivedVoucher) -> Result<(), StoreError> {
        self.insert_archived_batch(std::slice::from_ref(archived))
            .await
            .map(|_| ())
    }

    async fn insert_archived_batch(
        &self,
        archived: &[ArchivedVoucher],
    ) -> Result<usize, StoreError> {
        if archived.is_empty() {
            return Ok(0);
        }
        let rows: Vec<ArchiveRow> = archived.iter().map(ArchiveRow::from_archived).collect();
        let inserted: Vec<serde_json::Value> = self.insert(ARCHIVE, &rows, None).await?;
        Ok(inserted.len())
    }

    async fn upsert_archived_batch(
        &self,
        archived: &[ArchivedVoucher],
    ) -> Result<usize, StoreError> {
        if archived.is_empty() {
            return Ok(0);
        }
        let rows: Vec<ArchiveRow> = archived.iter().map(ArchiveRow::from_archived).collect();
        let written: Vec<serde_json::Value> =
            self.insert(ARCHIVE, &rows, Some(KEY_COLUMN)).await?;
        Ok(written.len())
    }

    async fn list_archived(&self) -> Result<Vec<ArchivedVoucher>, StoreError> {
        let rows: Vec<ArchiveRow> = self
            .select(
                ARCHIVE,
                &[
                    ("select", "*".to_string()),
                    ("order", "moved_to_permanent_at.desc".to_string()),
                ],
            )
            .await?;
        rows.into_iter().map(ArchiveRow::into_archived).collect()
    }
}
