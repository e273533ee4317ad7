//! Workbook constants, default style presets and the built-in message catalog.

use std::collections::BTreeMap;

use crate::spec::SpecCellFormat;

/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Title of the sheet holding field metadata and choice lists.
pub const C_SHEET_NAME_REFERENCE: &str = "reference";

/// One-based row holding organization name/title.
pub const N_ROW_ORGANIZATION: usize = 1;
/// One-based row holding translated field labels.
pub const N_ROW_LABELS: usize = 2;
/// One-based row holding datastore ids (hidden).
pub const N_ROW_DATASTORE_IDS: usize = 3;
/// First one-based data-entry row.
pub const N_ROW_DATA_FIRST: usize = 4;
/// Last one-based row covered by validations.
pub const N_ROW_DATA_LAST: usize = 1004;

/// Column width used when a field does not set `excel_column_width`.
pub const N_WIDTH_COLUMN_DEFAULT: f64 = 15.0;

/// Fill used to flag a header whose column holds invalid pasted values.
pub const C_COLOR_INVALID_FILL: &str = "EE1111";
/// Field-name row fill in data dictionaries.
pub const C_COLOR_DICTIONARY_NAME_FILL: &str = "FFF056";
/// Field-detail row fill in data dictionaries.
pub const C_COLOR_DICTIONARY_DETAIL_FILL: &str = "DFE2DB";

/// Message ids translated on reference sheets.
pub const C_MSGID_FIELD_NAME: &str = "Field Name";
/// See [`C_MSGID_FIELD_NAME`].
pub const C_MSGID_ID: &str = "ID";
/// See [`C_MSGID_FIELD_NAME`].
pub const C_MSGID_DESCRIPTION: &str = "Description";
/// See [`C_MSGID_FIELD_NAME`].
pub const C_MSGID_OBLIGATION: &str = "Obligation";
/// See [`C_MSGID_FIELD_NAME`].
pub const C_MSGID_FORMAT: &str = "Format";
/// See [`C_MSGID_FIELD_NAME`].
pub const C_MSGID_VALUES: &str = "Values";

/// Style of the field-name row in data dictionaries.
pub fn derive_dictionary_name_format() -> SpecCellFormat {
    derive_dictionary_detail_format().with_(SpecCellFormat {
        fg_color: Some(C_COLOR_DICTIONARY_NAME_FILL.to_string()),
        bold: Some(true),
        ..Default::default()
    })
}

/// Style of the field-detail rows in data dictionaries.
pub fn derive_dictionary_detail_format() -> SpecCellFormat {
    SpecCellFormat {
        pattern: Some("solid".to_string()),
        fg_color: Some(C_COLOR_DICTIONARY_DETAIL_FILL.to_string()),
        ..Default::default()
    }
}

/// Conditional format applied to a header with invalid values below it.
pub fn derive_invalid_header_format() -> SpecCellFormat {
    SpecCellFormat {
        bg_color: Some(C_COLOR_INVALID_FILL.to_string()),
        ..Default::default()
    }
}

/// Built-in `lang -> msgid -> msgstr` catalog for reference-sheet labels.
pub fn derive_default_catalog() -> BTreeMap<String, BTreeMap<String, String>> {
    let l_fr = [
        (C_MSGID_FIELD_NAME, "Nom du champ"),
        (C_MSGID_ID, "ID"),
        (C_MSGID_DESCRIPTION, "Description"),
        (C_MSGID_OBLIGATION, "Obligation"),
        (C_MSGID_FORMAT, "Format"),
        (C_MSGID_VALUES, "Valeurs"),
    ];

    let mut dict_catalog = BTreeMap::new();
    dict_catalog.insert(
        "fr".to_string(),
        l_fr.iter()
            .map(|(msgid, msgstr)| (msgid.to_string(), msgstr.to_string()))
            .collect(),
    );
    dict_catalog
}
