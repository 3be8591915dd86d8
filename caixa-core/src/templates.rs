//! Bank template registry
//!
//! Templates are plain data: one entry per supported bank plus a single
//! generic entry used for banks that are not listed.

use crate::domain::{BankTemplate, ColumnMapping, DecimalMark, KindColumn, TextEncoding};

/// Id of the generic fallback template
pub const GENERIC_TEMPLATE_ID: &str = "generico";

const BR_DATE: &[&str] = &["%d/%m/%Y", "%d/%m/%y"];

const NUBANK_CONTA: BankTemplate = BankTemplate {
    id: "nubank",
    name: "Nubank - Conta",
    icon: "nubank",
    delimiter: ',',
    encoding: TextEncoding::Utf8,
    decimal_mark: DecimalMark::Dot,
    skip_lines: 0,
    date_formats: BR_DATE,
    columns: Some(ColumnMapping {
        date: "Data",
        description: "Descrição",
        amount: "Valor",
        external_id: Some("Identificador"),
        kind: None,
    }),
    invert_sign: false,
};

const NUBANK_CARTAO: BankTemplate = BankTemplate {
    id: "nubank-cartao",
    name: "Nubank - Cartão de crédito",
    icon: "nubank",
    delimiter: ',',
    encoding: TextEncoding::Utf8,
    decimal_mark: DecimalMark::Dot,
    skip_lines: 0,
    date_formats: &["%Y-%m-%d"],
    columns: Some(ColumnMapping {
        date: "date",
        description: "title",
        amount: "amount",
        external_id: None,
        kind: None,
    }),
    invert_sign: true,
};

const ITAU: BankTemplate = BankTemplate {
    id: "itau",
    name: "Itaú",
    icon: "itau",
    delimiter: ';',
    encoding: TextEncoding::Latin1,
    decimal_mark: DecimalMark::Comma,
    skip_lines: 0,
    date_formats: BR_DATE,
    columns: Some(ColumnMapping {
        date: "data",
        description: "lançamento",
        amount: "valor",
        external_id: None,
        kind: None,
    }),
    invert_sign: false,
};

const BRADESCO: BankTemplate = BankTemplate {
    id: "bradesco",
    name: "Bradesco",
    icon: "bradesco",
    delimiter: ';',
    encoding: TextEncoding::Latin1,
    decimal_mark: DecimalMark::Comma,
    skip_lines: 1,
    date_formats: BR_DATE,
    columns: Some(ColumnMapping {
        date: "Data",
        description: "Histórico",
        amount: "Valor",
        external_id: Some("Docto."),
        kind: None,
    }),
    invert_sign: false,
};

const BANCO_DO_BRASIL: BankTemplate = BankTemplate {
    id: "bb",
    name: "Banco do Brasil",
    icon: "banco-do-brasil",
    delimiter: ',',
    encoding: TextEncoding::Latin1,
    decimal_mark: DecimalMark::Dot,
    skip_lines: 0,
    date_formats: BR_DATE,
    columns: Some(ColumnMapping {
        date: "Data",
        description: "Histórico",
        amount: "Valor",
        external_id: Some("Número do documento"),
        kind: None,
    }),
    invert_sign: false,
};

const SANTANDER: BankTemplate = BankTemplate {
    id: "santander",
    name: "Santander",
    icon: "santander",
    delimiter: ';',
    encoding: TextEncoding::Latin1,
    decimal_mark: DecimalMark::Comma,
    skip_lines: 2,
    date_formats: BR_DATE,
    columns: Some(ColumnMapping {
        date: "Data",
        description: "Histórico",
        amount: "Valor (R$)",
        external_id: Some("Documento"),
        kind: None,
    }),
    invert_sign: false,
};

const CAIXA: BankTemplate = BankTemplate {
    id: "caixa",
    name: "Caixa Econômica Federal",
    icon: "caixa",
    delimiter: ';',
    encoding: TextEncoding::Latin1,
    decimal_mark: DecimalMark::Comma,
    skip_lines: 0,
    date_formats: &["%Y%m%d", "%d/%m/%Y"],
    columns: Some(ColumnMapping {
        date: "Data_Mov",
        description: "Historico",
        amount: "Valor",
        external_id: Some("Nr_Doc"),
        kind: Some(KindColumn {
            column: "Deb_Cred",
            credit_markers: &["C"],
        }),
    }),
    invert_sign: false,
};

const INTER: BankTemplate = BankTemplate {
    id: "inter",
    name: "Banco Inter",
    icon: "inter",
    delimiter: ';',
    encoding: TextEncoding::Utf8,
    decimal_mark: DecimalMark::Comma,
    skip_lines: 4,
    date_formats: BR_DATE,
    columns: Some(ColumnMapping {
        date: "Data Lançamento",
        description: "Descrição",
        amount: "Valor",
        external_id: None,
        kind: None,
    }),
    invert_sign: false,
};

const C6: BankTemplate = BankTemplate {
    id: "c6",
    name: "C6 Bank",
    icon: "c6",
    delimiter: ';',
    encoding: TextEncoding::Utf8,
    decimal_mark: DecimalMark::Comma,
    skip_lines: 0,
    date_formats: BR_DATE,
    columns: Some(ColumnMapping {
        date: "Data",
        description: "Descrição",
        amount: "Valor",
        external_id: Some("ID"),
        kind: Some(KindColumn {
            column: "Tipo",
            credit_markers: &["entrada", "crédito", "credito"],
        }),
    }),
    invert_sign: false,
};

const GENERIC: BankTemplate = BankTemplate {
    id: GENERIC_TEMPLATE_ID,
    name: "Outro banco (genérico)",
    icon: "bank",
    delimiter: ',',
    encoding: TextEncoding::Utf8,
    decimal_mark: DecimalMark::Dot,
    skip_lines: 0,
    date_formats: &["%d/%m/%Y", "%Y-%m-%d", "%d/%m/%y", "%d-%m-%Y"],
    columns: None,
    invert_sign: false,
};

static TEMPLATES: &[BankTemplate] = &[
    NUBANK_CONTA,
    NUBANK_CARTAO,
    ITAU,
    BRADESCO,
    BANCO_DO_BRASIL,
    SANTANDER,
    CAIXA,
    INTER,
    C6,
    GENERIC,
];

/// All templates, the generic one last
pub fn all_templates() -> &'static [BankTemplate] {
    TEMPLATES
}

/// Bank-specific templates only
pub fn bank_templates() -> impl Iterator<Item = &'static BankTemplate> {
    TEMPLATES.iter().filter(|t| !t.is_generic())
}

/// Look up a template by id
pub fn get_template(id: &str) -> Option<&'static BankTemplate> {
    TEMPLATES.iter().find(|t| t.id == id)
}

/// The fallback template for banks without a dedicated entry
pub fn generic_template() -> &'static BankTemplate {
    get_template(GENERIC_TEMPLATE_ID).unwrap_or(&GENERIC)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_template_ids_are_unique() {
        let ids: HashSet<_> = all_templates().iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), all_templates().len());
    }

    #[test]
    fn test_exactly_one_generic_template() {
        let generic: Vec<_> = all_templates().iter().filter(|t| t.is_generic()).collect();
        assert_eq!(generic.len(), 1);
        assert_eq!(generic_template().id, GENERIC_TEMPLATE_ID);
        assert!(bank_templates().all(|t| t.id != GENERIC_TEMPLATE_ID));
    }

    #[test]
    fn test_get_template() {
        let itau = get_template("itau").unwrap();
        assert_eq!(itau.delimiter, ';');
        assert_eq!(itau.decimal_mark, DecimalMark::Comma);
        assert!(get_template("banco-imaginario").is_none());
    }

    #[test]
    fn test_every_bank_template_has_a_validation_profile() {
        for template in bank_templates() {
            assert!(
                template.required_columns().len() >= 3,
                "{} must require date, description and amount",
                template.id
            );
            assert!(!template.date_formats.is_empty());
        }
    }
}
