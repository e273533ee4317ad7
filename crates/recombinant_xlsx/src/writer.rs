//! Workbook builder: data-entry sheets with validations and reference sheets.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use rust_xlsxwriter::{
    Color, ConditionalFormatFormula, DataValidation, Format, FormatPattern, Formula, Workbook,
    Worksheet, XlsxError,
};
use tracing::{debug, warn};

use crate::conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_ROW_DATA_FIRST, N_ROW_DATA_LAST, N_ROW_DATASTORE_IDS,
    N_ROW_LABELS, N_ROW_ORGANIZATION, N_WIDTH_COLUMN_DEFAULT, derive_invalid_header_format,
};
use crate::datatypes::derive_field_type;
use crate::i18n::{Translator, derive_choice_fields};
use crate::schema::{SpecChromo, SpecOrganization};
use crate::spec::{RecombinantResult, SpecCellFormat, SpecRefRow, SpecXlsxReport};
use crate::util::{
    append_field_choices_rows, append_field_ref_rows, cast_col_num, cast_row_num,
    derive_choice_range, derive_column_letter, derive_invalid_choice_formula,
    derive_invalid_choice_message, derive_validation_range, sanitize_sheet_name,
};

/// Sheet titles claimed in one workbook.
///
/// Titles are compared case-insensitively, like Excel does. Reserved titles
/// are skipped by [`Self::derive_sheet_name`] and only handed out by
/// [`Self::claim_reserved`].
#[derive(Debug, Clone, Default)]
pub struct SheetNameRegistry {
    set_keys_used: BTreeSet<String>,
    set_keys_reserved: BTreeSet<String>,
    warnings: Vec<String>,
}

impl SheetNameRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `name` back for a later [`Self::claim_reserved`].
    pub fn reserve(&mut self, name: &str) {
        self.set_keys_reserved.insert(derive_sheet_key(name));
    }

    /// Take a reserved `name` verbatim; names never reserved go through
    /// [`Self::derive_sheet_name`].
    pub fn claim_reserved(&mut self, name: &str) -> String {
        let c_key = derive_sheet_key(name);
        if self.set_keys_reserved.remove(&c_key) {
            self.set_keys_used.insert(c_key);
            return name.to_string();
        }
        self.derive_sheet_name(name)
    }

    /// Sanitized title for `name`, suffixed `__N` when already used or
    /// reserved.
    pub fn derive_sheet_name(&mut self, name: &str) -> String {
        let c_name = sanitize_sheet_name(name, "_");
        if c_name != name {
            self.warnings
                .push(format!("Sheet name {name:?} written as {c_name:?}."));
        }
        self.derive_unique_sheet_name(&c_name)
    }

    /// Drain the warnings collected since the last call.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    fn is_taken(&self, key: &str) -> bool {
        self.set_keys_used.contains(key) || self.set_keys_reserved.contains(key)
    }

    fn derive_unique_sheet_name(&mut self, name: &str) -> String {
        let c_key = derive_sheet_key(name);
        if !self.is_taken(&c_key) {
            self.set_keys_used.insert(c_key);
            return name.to_string();
        }

        let mut n_idx = 2usize;
        loop {
            let c_suffix = format!("__{n_idx}");
            let n_len_base = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_suffix.len()).max(1);
            let candidate: String = name.chars().take(n_len_base).chain(c_suffix.chars()).collect();
            let c_key_candidate = derive_sheet_key(&candidate);
            if !self.is_taken(&c_key_candidate) {
                self.set_keys_used.insert(c_key_candidate);
                self.warnings
                    .push(format!("Duplicate sheet name {name:?} written as {candidate:?}."));
                return candidate;
            }
            n_idx += 1;
        }
    }
}

fn derive_sheet_key(name: &str) -> String {
    name.to_lowercase()
}

/// Stateful workbook under construction.
///
/// Sheets are appended in call order; the workbook stays in memory until
/// [`Self::save_to_buffer`] or [`Self::save`].
pub struct RecombinantWorkbook {
    workbook: Workbook,
    sheet_name_registry: SheetNameRegistry,
    report: SpecXlsxReport,
}

impl Default for RecombinantWorkbook {
    fn default() -> Self {
        Self::new()
    }
}

impl RecombinantWorkbook {
    /// Create an empty workbook.
    pub fn new() -> Self {
        Self {
            workbook: Workbook::new(),
            sheet_name_registry: SheetNameRegistry::new(),
            report: SpecXlsxReport::default(),
        }
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> &[String] {
        &self.report.sheet_names
    }

    /// Snapshot of the build report.
    pub fn report(&self) -> SpecXlsxReport {
        self.report.clone()
    }

    /// Keep `name` free for [`Self::write_reserved_reference_sheet`].
    pub fn reserve_sheet_name(&mut self, name: &str) {
        self.sheet_name_registry.reserve(name);
    }

    /// Serialize the workbook to XLSX bytes.
    pub fn save_to_buffer(&mut self) -> RecombinantResult<Vec<u8>> {
        Ok(self.workbook.save_to_buffer()?)
    }

    /// Write the workbook to `path`.
    pub fn save(&mut self, path: &Path) -> RecombinantResult<()> {
        self.workbook.save(path)?;
        Ok(())
    }

    /// Add one data-entry sheet for `chromo`.
    ///
    /// Field metadata and choice rows are appended to `refs`; list
    /// validations point at the rows they will occupy on the `reference`
    /// sheet, so `refs` must be written with
    /// [`Self::write_reserved_reference_sheet`] without reordering. Returns the sheet name used.
    pub fn write_template_sheet(
        &mut self,
        chromo: &SpecChromo,
        org: &SpecOrganization,
        translator: &Translator,
        refs: &mut Vec<SpecRefRow>,
    ) -> RecombinantResult<String> {
        let c_sheet_name = self.derive_sheet_name(&chromo.resource_name);

        let fmt_org_spec = chromo.excel_organization_style.to_cell_format();
        let fmt_header_spec = chromo.excel_header_style.to_cell_format();
        let fmt_org = derive_rust_xlsx_format(&fmt_org_spec);
        let fmt_header = derive_rust_xlsx_format(&fmt_header_spec);
        let fmt_invalid = derive_rust_xlsx_format(&derive_invalid_header_format());

        let dict_choice_fields = derive_choice_fields(chromo, translator);

        let mut n_validations = 0usize;
        let mut n_conditional_formats = 0usize;

        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(&c_sheet_name)?;

        let n_row_org = cast_row_num(N_ROW_ORGANIZATION - 1)?;
        worksheet.write_string_with_format(n_row_org, 0, &org.name, &fmt_org)?;
        worksheet.write_string_with_format(n_row_org, 1, &org.title, &fmt_org)?;
        worksheet.set_row_format(n_row_org, &fmt_org)?;

        let n_row_labels = cast_row_num(N_ROW_LABELS - 1)?;
        let n_row_ids = cast_row_num(N_ROW_DATASTORE_IDS - 1)?;
        let n_row_data_first = cast_row_num(N_ROW_DATA_FIRST - 1)?;
        let n_row_data_last = cast_row_num(N_ROW_DATA_LAST - 1)?;

        let mut l_cols_boolean = Vec::new();
        let dict_fmt_by_num_format = derive_number_formats(chromo)?;

        for (n_idx_col, field) in chromo.template_fields().enumerate() {
            let field_type = derive_field_type(field)?;
            let n_col = cast_col_num(n_idx_col)?;
            let c_col_letter = derive_column_letter(n_idx_col);

            worksheet.write_string_with_format(
                n_row_labels,
                n_col,
                translator.language_text(&field.label),
                &fmt_header,
            )?;
            worksheet.write_string_with_format(n_row_ids, n_col, &field.datastore_id, &fmt_header)?;

            worksheet.set_column_width(
                n_col,
                field.excel_column_width.unwrap_or(N_WIDTH_COLUMN_DEFAULT),
            )?;
            if let Some(fmt_num) = dict_fmt_by_num_format.get(field_type.xl_format) {
                worksheet.set_column_format(n_col, fmt_num)?;
            }
            let c_validation_range = derive_validation_range(&c_col_letter);

            append_field_ref_rows(refs, field, translator, &fmt_org_spec, &fmt_header_spec);

            if field.datastore_type == "boolean" {
                l_cols_boolean.push(n_col);
            }

            let Some(l_choices) = dict_choice_fields.get(&field.datastore_id) else {
                continue;
            };

            let n_ref_first = refs.len() + 1;
            append_field_choices_rows(refs, l_choices, translator);
            let n_ref_last = refs.len();

            if field.datastore_type == "_text" {
                debug!(
                    sheet = %c_sheet_name,
                    field = %field.datastore_id,
                    "multi-value choice field left without list validation"
                );
                continue;
            }
            if n_ref_last < n_ref_first {
                continue;
            }

            let c_choice_range = derive_choice_range(n_ref_first, n_ref_last);
            let validation_choice = DataValidation::new()
                .allow_list_formula(Formula::new(&c_choice_range))
                .ignore_blank(true)
                .set_error_title("Invalid choice")?
                .set_error_message(&derive_invalid_choice_message(n_ref_first, n_ref_last))?;
            worksheet.add_data_validation(
                n_row_data_first,
                n_col,
                n_row_data_last,
                n_col,
                &validation_choice,
            )?;
            n_validations += 1;

            let cf_invalid = ConditionalFormatFormula::new()
                .set_rule(derive_invalid_choice_formula(&c_validation_range, &c_choice_range).as_str())
                .set_format(&fmt_invalid)
                .set_stop_if_true(true);
            worksheet.add_conditional_format(n_row_labels, n_col, n_row_labels, n_col, &cf_invalid)?;
            n_conditional_formats += 1;

            debug!(
                sheet = %c_sheet_name,
                field = %field.datastore_id,
                range = %c_choice_range,
                "choice validation added"
            );
        }

        if !l_cols_boolean.is_empty() {
            let validation_boolean = DataValidation::new()
                .allow_list_strings(&["FALSE", "TRUE"])?
                .ignore_blank(true);
            for n_col in l_cols_boolean {
                worksheet.add_data_validation(
                    n_row_data_first,
                    n_col,
                    n_row_data_last,
                    n_col,
                    &validation_boolean,
                )?;
                n_validations += 1;
            }
        }

        worksheet.set_row_format(n_row_labels, &fmt_header)?;
        worksheet.set_row_format(n_row_ids, &fmt_header)?;
        worksheet.set_row_hidden(n_row_ids)?;
        worksheet.set_freeze_panes(n_row_data_first, 0)?;

        self.report.cnt_validations += n_validations;
        self.report.cnt_conditional_formats += n_conditional_formats;
        self.report.sheet_names.push(c_sheet_name.clone());
        Ok(c_sheet_name)
    }

    /// Add a sheet listing `refs` from row 1, one row each.
    ///
    /// Styled rows get the style on the row and on every written cell.
    pub fn write_reference_sheet(
        &mut self,
        sheet_name: &str,
        refs: &[SpecRefRow],
    ) -> RecombinantResult<String> {
        let c_sheet_name = self.derive_sheet_name(sheet_name);
        self.write_ref_rows_sheet(c_sheet_name, refs)
    }

    /// Like [`Self::write_reference_sheet`], titled with a name held by
    /// [`Self::reserve_sheet_name`].
    pub fn write_reserved_reference_sheet(
        &mut self,
        sheet_name: &str,
        refs: &[SpecRefRow],
    ) -> RecombinantResult<String> {
        let c_sheet_name = self.sheet_name_registry.claim_reserved(sheet_name);
        self.flush_name_warnings();
        self.write_ref_rows_sheet(c_sheet_name, refs)
    }

    fn write_ref_rows_sheet(
        &mut self,
        c_sheet_name: String,
        refs: &[SpecRefRow],
    ) -> RecombinantResult<String> {
        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(&c_sheet_name)?;

        let mut dict_fmt_cache: Vec<(SpecCellFormat, Format)> = Vec::new();
        for (n_idx_row, ref_row) in refs.iter().enumerate() {
            let n_row = cast_row_num(n_idx_row)?;
            let fmt_spec_row = ref_row.fmt.as_ref().filter(|fmt_spec| !fmt_spec.is_empty());
            let fmt = fmt_spec_row.map(|fmt_spec| {
                if let Some((_, fmt)) = dict_fmt_cache.iter().find(|(spec, _)| spec == fmt_spec) {
                    return fmt.clone();
                }
                let fmt = derive_rust_xlsx_format(fmt_spec);
                dict_fmt_cache.push((fmt_spec.clone(), fmt.clone()));
                fmt
            });
            write_reference_row(worksheet, n_row, &ref_row.cells, fmt.as_ref())?;
        }

        self.report.cnt_ref_rows += refs.len();
        self.report.sheet_names.push(c_sheet_name.clone());
        Ok(c_sheet_name)
    }

    fn derive_sheet_name(&mut self, name: &str) -> String {
        let c_sheet_name = self.sheet_name_registry.derive_sheet_name(name);
        self.flush_name_warnings();
        c_sheet_name
    }

    fn flush_name_warnings(&mut self) {
        for c_warning in self.sheet_name_registry.take_warnings() {
            warn!("{c_warning}");
            self.report.warn(c_warning);
        }
    }
}

/// Column formats keyed by number format code, one per distinct code used
/// by the template fields of `chromo`.
fn derive_number_formats(chromo: &SpecChromo) -> RecombinantResult<BTreeMap<&'static str, Format>> {
    let mut dict_fmt = BTreeMap::new();
    for field in chromo.template_fields() {
        let field_type = derive_field_type(field)?;
        dict_fmt.entry(field_type.xl_format).or_insert_with(|| {
            derive_rust_xlsx_format(&SpecCellFormat {
                num_format: Some(field_type.xl_format.to_string()),
                ..Default::default()
            })
        });
    }
    Ok(dict_fmt)
}

fn write_reference_row(
    worksheet: &mut Worksheet,
    row_num: u32,
    cells: &[String],
    fmt: Option<&Format>,
) -> Result<(), XlsxError> {
    if let Some(fmt) = fmt {
        worksheet.set_row_format(row_num, fmt)?;
    }

    for (n_idx_col, cell_value) in cells.iter().enumerate() {
        let Ok(n_col) = u16::try_from(n_idx_col) else {
            break;
        };
        match (cell_value.is_empty(), fmt) {
            (true, Some(fmt)) => {
                worksheet.write_blank(row_num, n_col, fmt)?;
            }
            (true, None) => {}
            (false, Some(fmt)) => {
                worksheet.write_string_with_format(row_num, n_col, cell_value, fmt)?;
            }
            (false, None) => {
                worksheet.write_string(row_num, n_col, cell_value)?;
            }
        }
    }
    Ok(())
}

/// Convert a [`SpecCellFormat`] into a writer format.
pub fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }
    if let Some(color) = spec.font_color.as_deref().and_then(derive_color) {
        format = format.set_font_color(color);
    }

    let pattern = spec.pattern.as_deref().map(derive_format_pattern);
    match pattern {
        Some(FormatPattern::Solid) => {
            format = format.set_pattern(FormatPattern::Solid);
            if let Some(color) = spec
                .fg_color
                .as_deref()
                .or(spec.bg_color.as_deref())
                .and_then(derive_color)
            {
                format = format.set_background_color(color);
            }
        }
        Some(FormatPattern::None) => {}
        Some(pattern) => {
            format = format.set_pattern(pattern);
            if let Some(color) = spec.fg_color.as_deref().and_then(derive_color) {
                format = format.set_foreground_color(color);
            }
            if let Some(color) = spec.bg_color.as_deref().and_then(derive_color) {
                format = format.set_background_color(color);
            }
        }
        None => {
            if let Some(color) = spec.bg_color.as_deref().and_then(derive_color) {
                format = format.set_background_color(color);
            }
        }
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }

    format
}

fn derive_color(rgb: &str) -> Option<Color> {
    u32::from_str_radix(rgb, 16).ok().map(Color::RGB)
}

fn derive_format_pattern(pattern: &str) -> FormatPattern {
    match pattern.trim() {
        "solid" => FormatPattern::Solid,
        "mediumGray" => FormatPattern::MediumGray,
        "darkGray" => FormatPattern::DarkGray,
        "lightGray" => FormatPattern::LightGray,
        "darkHorizontal" => FormatPattern::DarkHorizontal,
        "darkVertical" => FormatPattern::DarkVertical,
        "darkDown" => FormatPattern::DarkDown,
        "darkUp" => FormatPattern::DarkUp,
        "darkGrid" => FormatPattern::DarkGrid,
        "darkTrellis" => FormatPattern::DarkTrellis,
        "lightHorizontal" => FormatPattern::LightHorizontal,
        "lightVertical" => FormatPattern::LightVertical,
        "lightDown" => FormatPattern::LightDown,
        "lightUp" => FormatPattern::LightUp,
        "lightGrid" => FormatPattern::LightGrid,
        "lightTrellis" => FormatPattern::LightTrellis,
        "gray125" => FormatPattern::Gray125,
        "gray0625" => FormatPattern::Gray0625,
        _ => FormatPattern::None,
    }
}
