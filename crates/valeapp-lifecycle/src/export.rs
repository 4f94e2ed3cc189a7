use crate::{LifecycleError, VoucherLifecycle};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use valeapp_ingest::{export_file_name, export_records};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportDataset {
    Vouchers,
    Archive,
    Employees,
    Admins,
}

impl ExportDataset {
    pub const ALL: [Self; 4] = [Self::Vouchers, Self::Archive, Self::Employees, Self::Admins];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vouchers => "vouchers",
            Self::Archive => "archive",
            Self::Employees => "employees",
            Self::Admins => "admins",
        }
    }

    /// Stem of the downloaded file name.
    #[must_use]
    pub const fn file_stem(self) -> &'static str {
        match self {
            Self::Vouchers => "vales",
            Self::Archive => "vales_justificados",
            Self::Employees => "funcionarios",
            Self::Admins => "administradores",
        }
    }

    pub fn parse(input: &str) -> Result<Self, LifecycleError> {
        let s = input.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| {
                LifecycleError::Validation(format!(
                    "unknown export dataset `{s}` (expected vouchers, archive, employees or admins)"
                ))
            })
    }
}

impl Display for ExportDataset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub rows: usize,
    pub bytes: Vec<u8>,
}

impl VoucherLifecycle {
    pub async fn export(&self, dataset: ExportDataset) -> Result<ExportFile, LifecycleError> {
        self.export_on(dataset, Utc::now().date_naive()).await
    }

    /// Password columns never reach the workbook: the model skips them when
    /// serializing.
    pub async fn export_on(
        &self,
        dataset: ExportDataset,
        date: NaiveDate,
    ) -> Result<ExportFile, LifecycleError> {
        let load = LifecycleError::store("Erro ao exportar dados");
        let (rows, bytes) = match dataset {
            ExportDataset::Vouchers => {
                let v = self.store.list_vouchers(None).await.map_err(load)?;
                (v.len(), export_records(&v)?)
            }
            ExportDataset::Archive => {
                let v = self.store.list_archived().await.map_err(load)?;
                (v.len(), export_records(&v)?)
            }
            ExportDataset::Employees => {
                let v = self.store.list_employees().await.map_err(load)?;
                (v.len(), export_records(&v)?)
            }
            ExportDataset::Admins => {
                let v = self.store.list_admins().await.map_err(load)?;
                (v.len(), export_records(&v)?)
            }
        };
        Ok(ExportFile {
            file_name: export_file_name(dataset.file_stem(), date),
            rows,
            bytes,
        })
    }
}
