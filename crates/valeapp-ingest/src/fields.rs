// SPDX-License-Identifier: Apache-2.0

//! Header spellings accepted for each logical voucher column. Order matters:
//! the first listed header present with a non-blank value wins.

use crate::row::{CellValue, SheetRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldCandidates {
    pub field: &'static str,
    pub headers: &'static [&'static str],
}

impl FieldCandidates {
    #[must_use]
    pub fn resolve<'r>(&self, row: &'r SheetRow) -> Option<&'r CellValue> {
        resolve_field(row, self.headers)
    }
}

/// First candidate header present in `row` with a non-blank value.
#[must_use]
pub fn resolve_field<'r>(row: &'r SheetRow, candidates: &[&str]) -> Option<&'r CellValue> {
    candidates
        .iter()
        .filter_map(|name| row.get(name))
        .find(|value| !value.is_blank())
}

pub const KEY: FieldCandidates = FieldCandidates {
    field: "coditem_mapa",
    headers: &[
        "coditem_mapa",
        "Coditem_mapa",
        "coditemMapa",
        "CodItemMapa",
        "coditemmapa",
        "CODITEM_MAPA",
        "Coditem_Mapa",
        "CodItem_Mapa",
        "Código Item Mapa",
        "codigo_item_mapa",
    ],
};

pub const ITEM_CODE: FieldCandidates = FieldCandidates {
    field: "coditem",
    headers: &[
        "coditem",
        "Coditem",
        "CodItem",
        "CODITEM",
        "Código Item",
        "codigo_item",
    ],
};

pub const MAP_ID: FieldCandidates = FieldCandidates {
    field: "mapa",
    headers: &["Mapa", "mapa", "MAPA", "Número Mapa", "numero_mapa"],
};

pub const PROMAX: FieldCandidates = FieldCandidates {
    field: "promax_unico",
    headers: &[
        "Promax_unico",
        "promax_unico",
        "PROMAX_UNICO",
        "Promax Único",
        "promax_único",
    ],
};

pub const ITEM: FieldCandidates = FieldCandidates {
    field: "item",
    headers: &[
        "Item",
        "item",
        "ITEM",
        "Descrição",
        "descricao",
        "Produto",
        "produto",
    ],
};

pub const DATE: FieldCandidates = FieldCandidates {
    field: "data",
    headers: &["Data", "data", "DATA", "Date", "date"],
};

pub const QUANTITY_DIFFERENCE: FieldCandidates = FieldCandidates {
    field: "qtde_diferenca",
    headers: &[
        "Qtde Diferença",
        "Qtde_Diferença",
        "qtde_diferenca",
        "QTDE_DIFERENCA",
        "QTD_DIFERENCA",
        "Qtd Diferença",
        "Quantidade Diferença",
        "qtde diferenca",
        "QTDE DIFERENCA",
    ],
};

pub const VALUE: FieldCandidates = FieldCandidates {
    field: "valor",
    headers: &["Valor", "valor", "VALOR", "Preço", "preco"],
};

pub const CLIENT_CODE: FieldCandidates = FieldCandidates {
    field: "cod_cli",
    headers: &["cod_cli", "Cod_Cli", "Código Cliente", "codigo_cliente"],
};

pub const CLIENT_NAME: FieldCandidates = FieldCandidates {
    field: "cliente",
    headers: &["Cliente", "cliente", "CLIENTE", "Nome Cliente", "nome_cliente"],
};

pub const VOUCHER_NUMBER: FieldCandidates = FieldCandidates {
    field: "vale",
    headers: &["Vale", "vale", "VALE", "Número Vale", "numero_vale"],
};

pub const ISSUED_AT: FieldCandidates = FieldCandidates {
    field: "emissao",
    headers: &["Emissão", "emissao", "EMISSAO", "Data Emissão", "data_emissao"],
};

pub const ITEM_TI: FieldCandidates = FieldCandidates {
    field: "item_ti",
    headers: &["Item_TI", "item_ti", "ITEM_TI"],
};

pub const UNIT: FieldCandidates = FieldCandidates {
    field: "un",
    headers: &["UN", "un", "Unidade", "unidade", "Medida", "medida"],
};

pub const QUANTITY_OUT: FieldCandidates = FieldCandidates {
    field: "qtde_saida",
    headers: &[
        "Qtde_Saída",
        "qtde_saida",
        "Quantidade Saída",
        "quantidade_saida",
    ],
};

pub const LOOSE_OUT: FieldCandidates = FieldCandidates {
    field: "avulsa",
    headers: &["Avulsa", "avulsa", "AVULSA"],
};

pub const QUANTITY_RETURNED: FieldCandidates = FieldCandidates {
    field: "qtde_retorno",
    headers: &[
        "Qtde_Retorno",
        "qtde_retorno",
        "Quantidade Retorno",
        "quantidade_retorno",
    ],
};

pub const LOOSE_RETURNED: FieldCandidates = FieldCandidates {
    field: "avulsa2",
    headers: &["Avulsa2", "avulsa2", "AVULSA2"],
};

pub const LOOSE_DIFFERENCE: FieldCandidates = FieldCandidates {
    field: "avulsa3",
    headers: &["Avulsa3", "avulsa3", "AVULSA3"],
};

pub const REVIEWER: FieldCandidates = FieldCandidates {
    field: "conferente",
    headers: &["Conferente", "conferente", "CONFERENTE"],
};

pub const MEASURE: FieldCandidates = FieldCandidates {
    field: "medida",
    headers: &["Medida", "medida", "MEDIDA", "UN", "un"],
};

pub const FIELDS: &[FieldCandidates] = &[
    KEY,
    ITEM_CODE,
    MAP_ID,
    PROMAX,
    ITEM,
    DATE,
    QUANTITY_DIFFERENCE,
    VALUE,
    CLIENT_CODE,
    CLIENT_NAME,
    VOUCHER_NUMBER,
    ISSUED_AT,
    ITEM_TI,
    UNIT,
    QUANTITY_OUT,
    LOOSE_OUT,
    QUANTITY_RETURNED,
    LOOSE_RETURNED,
    LOOSE_DIFFERENCE,
    REVIEWER,
    MEASURE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_uses_first_present_candidate_with_a_value() {
        let row = SheetRow::from_pairs(1, [("Coditem_mapa", CellValue::text("X"))]);
        assert_eq!(
            resolve_field(&row, &["coditem_mapa", "Coditem_mapa"]),
            Some(&CellValue::text("X"))
        );
        assert_eq!(
            resolve_field(&row, &["Coditem_mapa", "coditem_mapa"]),
            Some(&CellValue::text("X"))
        );
    }

    #[test]
    fn blank_cells_fall_through_to_later_candidates() {
        let row = SheetRow::from_pairs(
            1,
            [
                ("Mapa", CellValue::text(" ")),
                ("MAPA", CellValue::Int(9001)),
            ],
        );
        assert_eq!(MAP_ID.resolve(&row), Some(&CellValue::Int(9001)));
        assert_eq!(VALUE.resolve(&row), None);
    }

    #[test]
    fn every_field_has_distinct_name_and_candidates() {
        let mut names: Vec<_> = FIELDS.iter().map(|f| f.field).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FIELDS.len());
        assert!(FIELDS.iter().all(|f| !f.headers.is_empty()));
    }
}
