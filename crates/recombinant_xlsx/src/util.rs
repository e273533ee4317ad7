//! Stateless helpers: sheet naming, cell references, validation formulas and
//! reference-row planning.

use crate::conf::{
    C_MSGID_DESCRIPTION, C_MSGID_FIELD_NAME, C_MSGID_FORMAT, C_MSGID_ID, C_MSGID_OBLIGATION,
    C_MSGID_VALUES, C_SHEET_NAME_REFERENCE, N_LEN_EXCEL_SHEET_NAME_MAX, N_ROW_DATA_FIRST,
    N_ROW_DATA_LAST, TUP_EXCEL_ILLEGAL,
};
use crate::i18n::Translator;
use crate::schema::SpecField;
use crate::spec::{RecombinantError, RecombinantResult, SpecCellFormat, SpecRefRow};

////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellReferences

/// Zero-based column index to letters (`0 -> A`, `26 -> AA`).
pub fn derive_column_letter(col_idx: usize) -> String {
    let mut l_chars = Vec::new();
    let mut n_rest = col_idx + 1;
    while n_rest > 0 {
        let n_digit = (n_rest - 1) % 26;
        l_chars.push(char::from(b'A' + n_digit as u8));
        n_rest = (n_rest - 1) / 26;
    }
    l_chars.iter().rev().collect()
}

/// Data-entry range of a column, e.g. `C4:C1004`.
pub fn derive_validation_range(col_letter: &str) -> String {
    format!("{col_letter}{N_ROW_DATA_FIRST}:{col_letter}{N_ROW_DATA_LAST}")
}

/// Reference-sheet choice key range for one-based rows `ref_first..=ref_last`.
pub fn derive_choice_range(ref_first: usize, ref_last: usize) -> String {
    format!("{C_SHEET_NAME_REFERENCE}!$B${ref_first}:$B${ref_last}")
}

/// Formula that is non-zero when `validation_range` holds a non-blank value
/// missing from `choice_range`.
pub fn derive_invalid_choice_formula(validation_range: &str, choice_range: &str) -> String {
    format!(
        "COUNTIF({validation_range},\"<>\"&\"\")-SUMPRODUCT(COUNTIF({validation_range},{choice_range}))"
    )
}

/// Error message shown when a typed value is not a valid key.
pub fn derive_invalid_choice_message(ref_first: usize, ref_last: usize) -> String {
    format!(
        "Please enter one of the valid keys shown on sheet \"{C_SHEET_NAME_REFERENCE}\" rows {ref_first}-{ref_last}"
    )
}

/// Zero-based row index to writer row number.
pub fn cast_row_num(value: usize) -> RecombinantResult<u32> {
    u32::try_from(value).map_err(|_| RecombinantError::IndexOverflow { axis: "row", value })
}

/// Zero-based column index to writer column number.
pub fn cast_col_num(value: usize) -> RecombinantResult<u16> {
    u16::try_from(value).map_err(|_| RecombinantError::IndexOverflow {
        axis: "column",
        value,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReferenceRows

/// Append the metadata block of `field`: a blank separator, the field name
/// row in `fmt_name`, then id/description/obligation/format rows in
/// `fmt_detail`. Optional rows appear only when the field defines them.
pub fn append_field_ref_rows(
    refs: &mut Vec<SpecRefRow>,
    field: &SpecField,
    translator: &Translator,
    fmt_name: &SpecCellFormat,
    fmt_detail: &SpecCellFormat,
) {
    refs.push(SpecRefRow::blank());
    refs.push(SpecRefRow::styled(
        fmt_name,
        vec![
            translator.gettext(C_MSGID_FIELD_NAME),
            translator.language_text(&field.label),
        ],
    ));
    refs.push(SpecRefRow::styled(
        fmt_detail,
        vec![translator.gettext(C_MSGID_ID), field.datastore_id.clone()],
    ));

    let l_optional = [
        (C_MSGID_DESCRIPTION, &field.description),
        (C_MSGID_OBLIGATION, &field.obligation),
        (C_MSGID_FORMAT, &field.format_type),
    ];
    for (msgid, value) in l_optional {
        if let Some(text) = value {
            refs.push(SpecRefRow::styled(
                fmt_detail,
                vec![translator.gettext(msgid), translator.language_text(text)],
            ));
        }
    }
}

/// Append one unstyled row per choice; only the first carries the
/// translated `Values` label.
pub fn append_field_choices_rows(
    refs: &mut Vec<SpecRefRow>,
    choices: &[(String, String)],
    translator: &Translator,
) {
    let mut c_label = translator.gettext(C_MSGID_VALUES);
    for (key, text) in choices {
        refs.push(SpecRefRow::plain(vec![
            std::mem::take(&mut c_label),
            key.clone(),
            text.clone(),
        ]));
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::schema::LanguageText;
    use crate::spec::SpecRecombinantConfig;

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("contracts", "_"), "contracts");
        assert_eq!(sanitize_sheet_name("a/b:c", "_"), "a_b_c");
        assert_eq!(sanitize_sheet_name("  ", "_"), "Sheet");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40), "_").len(), 31);
    }

    #[test]
    fn test_derive_column_letter() {
        assert_eq!(derive_column_letter(0), "A");
        assert_eq!(derive_column_letter(25), "Z");
        assert_eq!(derive_column_letter(26), "AA");
        assert_eq!(derive_column_letter(701), "ZZ");
        assert_eq!(derive_column_letter(702), "AAA");
    }

    #[test]
    fn test_validation_formulas() {
        let c_range = derive_validation_range("C");
        let c_choices = derive_choice_range(9, 11);

        assert_eq!(c_range, "C4:C1004");
        assert_eq!(c_choices, "reference!$B$9:$B$11");
        assert_eq!(
            derive_invalid_choice_formula(&c_range, &c_choices),
            "COUNTIF(C4:C1004,\"<>\"&\"\")-SUMPRODUCT(COUNTIF(C4:C1004,reference!$B$9:$B$11))"
        );
        assert_eq!(
            derive_invalid_choice_message(9, 11),
            "Please enter one of the valid keys shown on sheet \"reference\" rows 9-11"
        );
    }

    #[test]
    fn test_cast_overflow() {
        assert_eq!(cast_col_num(3).unwrap(), 3);
        assert!(matches!(
            cast_col_num(70_000),
            Err(RecombinantError::IndexOverflow { axis: "column", .. })
        ));
    }

    #[test]
    fn test_append_field_ref_rows_optional_rows() {
        let translator = Translator::new("fr", &SpecRecombinantConfig::default());
        let fmt_name = SpecCellFormat {
            bold: Some(true),
            ..Default::default()
        };
        let fmt_detail = SpecCellFormat::default();
        let field = SpecField {
            datastore_id: "year".to_string(),
            label: LanguageText::by_lang([("en", "Year"), ("fr", "Année")]),
            datastore_type: "year".to_string(),
            excel_column_width: None,
            import_template_include: true,
            description: None,
            obligation: Some(LanguageText::from("Mandatory")),
            format_type: None,
            choices: None,
        };

        let mut refs = Vec::new();
        append_field_ref_rows(&mut refs, &field, &translator, &fmt_name, &fmt_detail);

        assert_eq!(
            refs,
            vec![
                SpecRefRow::blank(),
                SpecRefRow::styled(
                    &fmt_name,
                    vec!["Nom du champ".to_string(), "Année".to_string()]
                ),
                SpecRefRow::styled(&fmt_detail, vec!["ID".to_string(), "year".to_string()]),
                SpecRefRow::styled(
                    &fmt_detail,
                    vec!["Obligation".to_string(), "Mandatory".to_string()]
                ),
            ]
        );
    }

    #[test]
    fn test_append_field_choices_rows_labels_first_only() {
        let translator = Translator::new("en", &SpecRecombinantConfig::default());
        let mut refs = vec![SpecRefRow::blank()];
        append_field_choices_rows(
            &mut refs,
            &[
                ("1".to_string(), "One".to_string()),
                ("2".to_string(), "Two".to_string()),
            ],
            &translator,
        );

        assert_eq!(refs.len(), 3);
        assert_eq!(refs[1].cells, vec!["Values", "1", "One"]);
        assert_eq!(refs[2].cells, vec!["", "2", "Two"]);
        assert!(refs[2].fmt.is_none());
    }
}
