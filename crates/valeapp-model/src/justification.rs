use crate::ids::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const OBSERVATION_MAX_CHARS: usize = 100;

/// Closed set of reasons an employee may give for a voucher discrepancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JustificationKind {
    #[serde(rename = "Faltou no carregamento")]
    MissingAtLoading,
    #[serde(rename = "Esqueci no cliente")]
    LeftAtClient,
    #[serde(rename = "Simples remessa")]
    SimpleShipment,
    #[serde(rename = "Produto não gera vale")]
    NoVoucherProduct,
    #[serde(rename = "Não sai neste mapa")]
    NotInThisMap,
    #[serde(rename = "Troca por avaria ou qualidade")]
    DamageOrQualityExchange,
    #[serde(rename = "Troca")]
    Exchange,
    #[serde(rename = "Inversão")]
    Inversion,
    #[serde(rename = "Comodato/Empréstimo")]
    Loan,
    #[serde(rename = "Apoio")]
    Support,
    #[serde(rename = "Outros")]
    Other,
}

impl JustificationKind {
    pub const ALL: [Self; 11] = [
        Self::MissingAtLoading,
        Self::LeftAtClient,
        Self::SimpleShipment,
        Self::NoVoucherProduct,
        Self::NotInThisMap,
        Self::DamageOrQualityExchange,
        Self::Exchange,
        Self::Inversion,
        Self::Loan,
        Self::Support,
        Self::Other,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MissingAtLoading => "Faltou no carregamento",
            Self::LeftAtClient => "Esqueci no cliente",
            Self::SimpleShipment => "Simples remessa",
            Self::NoVoucherProduct => "Produto não gera vale",
            Self::NotInThisMap => "Não sai neste mapa",
            Self::DamageOrQualityExchange => "Troca por avaria ou qualidade",
            Self::Exchange => "Troca",
            Self::Inversion => "Inversão",
            Self::Loan => "Comodato/Empréstimo",
            Self::Support => "Apoio",
            Self::Other => "Outros",
        }
    }

    #[must_use]
    pub const fn requires_observation(self) -> bool {
        self.hint().is_some()
    }

    /// What the observation must describe, for the kinds that require one.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::Exchange => Some("Descreva no campo OBSERVAÇÕES o produto que foi trocado"),
            Self::Inversion => Some("Descreva no campo OBSERVAÇÕES o produto que foi invertido"),
            Self::Loan => Some("Descreva no campo OBSERVAÇÕES o código do PDV que foi feito"),
            Self::Support => Some("Descreva no campo OBSERVAÇÕES o nome da equipe de apoio"),
            _ => None,
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.label() == s)
            .ok_or_else(|| ValidationError(format!("unknown justification type `{s}`")))
    }
}

impl Display for JustificationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Device class derived from the user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Tablet,
    Mobile,
    #[default]
    Desktop,
}

impl DeviceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tablet => "tablet",
            Self::Mobile => "mobile",
            Self::Desktop => "desktop",
        }
    }

    #[must_use]
    pub fn parse_lenient(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "tablet" => Self::Tablet,
            "mobile" => Self::Mobile,
            _ => Self::Desktop,
        }
    }
}

/// Where and on what the justification was submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DeviceSnapshot {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub location: String,
    pub device_type: DeviceKind,
    pub screen_resolution: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Justification {
    pub kind: JustificationKind,
    pub observation: Option<String>,
    pub measure: Option<String>,
    pub justified_at: DateTime<Utc>,
    pub device: DeviceSnapshot,
}

/// Employee-submitted form, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct JustificationForm {
    #[serde(default)]
    pub kind: Option<JustificationKind>,
    #[serde(default)]
    pub observation: String,
    #[serde(default)]
    pub measure: Option<String>,
}

impl JustificationForm {
    /// Returns the first problem with the form, in the order the fields
    /// appear to the employee.
    pub fn validate(&self) -> Result<JustificationKind, ValidationError> {
        let Some(kind) = self.kind else {
            return Err(ValidationError(
                "Por favor, selecione um tipo de justificativa.".to_string(),
            ));
        };
        let observation = self.observation.trim();
        if kind.requires_observation() && observation.is_empty() {
            let hint = kind.hint().unwrap_or_default();
            return Err(ValidationError(format!(
                "O campo OBSERVAÇÕES é obrigatório para \"{kind}\". {hint}."
            )));
        }
        if observation.chars().count() > OBSERVATION_MAX_CHARS {
            return Err(ValidationError(format!(
                "O campo OBSERVAÇÕES aceita no máximo {OBSERVATION_MAX_CHARS} caracteres."
            )));
        }
        Ok(kind)
    }

    #[must_use]
    pub fn observation(&self) -> Option<String> {
        let trimmed = self.observation.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    #[must_use]
    pub fn measure(&self) -> Option<String> {
        self.measure
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(ToString::to_string)
    }
}
