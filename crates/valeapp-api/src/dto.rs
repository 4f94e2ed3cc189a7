use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use valeapp_auth::{IssuedSession, LoginOutcome, Session};
use valeapp_ingest::IngestEvent;
use valeapp_lifecycle::{ImportSummary, JustifyOutcome};
use valeapp_model::{JustificationKind, SessionUser, Voucher, VoucherStats};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminLoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmployeeLoginRequest {
    pub cpf: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PasswordSetupRequest {
    pub ticket: String,
    pub password: String,
    pub confirmation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDto {
    pub user: SessionUser,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<Session> for SessionDto {
    fn from(session: Session) -> Self {
        Self {
            user: session.value,
            issued_at: session.issued_at,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginResponseDto {
    Authenticated {
        token: String,
        session: SessionDto,
    },
    PasswordSetupRequired {
        ticket: String,
        user: SessionUser,
    },
}

impl From<IssuedSession> for LoginResponseDto {
    fn from(issued: IssuedSession) -> Self {
        Self::Authenticated {
            token: issued.token,
            session: issued.session.into(),
        }
    }
}

impl From<LoginOutcome> for LoginResponseDto {
    fn from(outcome: LoginOutcome) -> Self {
        match outcome {
            LoginOutcome::Authenticated(issued) => issued.into(),
            LoginOutcome::PasswordSetupRequired { ticket, employee } => {
                Self::PasswordSetupRequired {
                    ticket,
                    user: employee,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherListDto {
    pub vouchers: Vec<Voucher>,
    /// Computed over the caller's full list, before filtering.
    pub stats: VoucherStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JustifyResponseDto {
    pub voucher: Voucher,
    pub archived: bool,
}

impl From<JustifyOutcome> for JustifyResponseDto {
    fn from(outcome: JustifyOutcome) -> Self {
        Self {
            voucher: outcome.voucher,
            archived: outcome.archived,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JustificationKindDto {
    pub label: String,
    pub requires_observation: bool,
    pub hint: Option<String>,
}

impl From<JustificationKind> for JustificationKindDto {
    fn from(kind: JustificationKind) -> Self {
        Self {
            label: kind.label().to_string(),
            requires_observation: kind.requires_observation(),
            hint: kind.hint().map(str::to_string),
        }
    }
}

#[must_use]
pub fn justification_kinds() -> Vec<JustificationKindDto> {
    JustificationKind::ALL.into_iter().map(Into::into).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CleanupRequest {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResponseDto {
    pub inserted: usize,
    pub events: Vec<IngestEvent>,
}

impl From<ImportSummary> for ImportResponseDto {
    fn from(summary: ImportSummary) -> Self {
        Self {
            inserted: summary.inserted,
            events: summary.events,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewEmployeeRequest {
    pub cpf: String,
    pub name: String,
    #[serde(default)]
    pub department: Option<String>,
    pub promax_unico: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewAdminRequest {
    pub login: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyDto {
    pub status: String,
    pub backend: String,
}
