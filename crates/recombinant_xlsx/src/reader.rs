//! Reader for filled-in data-entry templates.

use std::collections::BTreeMap;
use std::io::Cursor;

use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde_json::{Number, Value};
use tracing::debug;

use crate::conf::{C_SHEET_NAME_REFERENCE, N_ROW_DATA_FIRST, N_ROW_DATASTORE_IDS, N_ROW_ORGANIZATION};
use crate::datatypes::derive_field_type;
use crate::schema::{SpecChromo, SpecGeno, SpecOrganization};
use crate::spec::{RecombinantError, RecombinantResult};
use crate::template::derive_template_sheet_names;

////////////////////////////////////////////////////////////////////////////////
// #region UploadModels

/// Normalized cell value read from an uploaded sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/blank value.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
    /// Date or date-time value.
    DateTime(NaiveDateTime),
}

impl EnumCellValue {
    /// True for missing values and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            EnumCellValue::None => true,
            EnumCellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// One data-entry sheet of an uploaded workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecSheetUpload {
    /// Sheet title (expected to be the resource name).
    pub sheet_name: String,
    /// Organization name from the first cell.
    pub org_name: String,
    /// Datastore ids from the hidden id row.
    pub datastore_ids: Vec<String>,
    /// Data rows with blank rows removed.
    pub rows: Vec<Vec<EnumCellValue>>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Reading

/// Read every data-entry sheet before the `reference` sheet.
pub fn read_excel(bytes: &[u8]) -> RecombinantResult<Vec<SpecSheetUpload>> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;

    let mut l_uploads = Vec::new();
    for c_sheet_name in workbook.sheet_names() {
        if c_sheet_name.to_lowercase() == C_SHEET_NAME_REFERENCE {
            break;
        }
        let range = workbook.worksheet_range(&c_sheet_name)?;

        let (n_row_end, n_col_end) = range.end().unwrap_or((0, 0));
        let derive_cell = |n_row: u32, n_col: u32| -> EnumCellValue {
            range
                .get_value((n_row, n_col))
                .map(convert_data_to_cell_value)
                .unwrap_or(EnumCellValue::None)
        };

        let org_name = derive_cell((N_ROW_ORGANIZATION - 1) as u32, 0);
        let n_row_ids = (N_ROW_DATASTORE_IDS - 1) as u32;
        let mut datastore_ids: Vec<String> = (0..=n_col_end)
            .map(|n_col| derive_cell_text(&derive_cell(n_row_ids, n_col)))
            .collect();
        while datastore_ids.last().is_some_and(|c_id| c_id.is_empty()) {
            datastore_ids.pop();
        }

        let n_width = datastore_ids.len() as u32;
        let mut rows = Vec::new();
        for n_row in ((N_ROW_DATA_FIRST - 1) as u32)..=n_row_end {
            let l_values: Vec<EnumCellValue> =
                (0..n_width).map(|n_col| derive_cell(n_row, n_col)).collect();
            if l_values.iter().all(EnumCellValue::is_blank) {
                continue;
            }
            rows.push(l_values);
        }

        debug!(sheet = %c_sheet_name, rows = rows.len(), "upload sheet read");
        l_uploads.push(SpecSheetUpload {
            sheet_name: c_sheet_name,
            org_name: derive_cell_text(&org_name),
            datastore_ids,
            rows,
        });
    }

    Ok(l_uploads)
}

/// Resource of `geno` whose template sheet is `upload`.
///
/// Sheets are matched on the titles [`excel_template`] assigns, so
/// sanitized and `__N`-suffixed titles resolve to their resource.
///
/// [`excel_template`]: crate::template::excel_template
pub fn find_upload_chromo<'a>(
    upload: &SpecSheetUpload,
    geno: &'a SpecGeno,
) -> RecombinantResult<&'a SpecChromo> {
    let c_key = upload.sheet_name.to_lowercase();
    derive_template_sheet_names(geno)
        .iter()
        .zip(&geno.resources)
        .find(|(c_sheet_name, _)| c_sheet_name.to_lowercase() == c_key)
        .map(|(_, chromo)| chromo)
        .ok_or_else(|| {
            RecombinantError::InvalidUpload(format!(
                "sheet {:?} matches no resource of {:?}",
                upload.sheet_name, geno.dataset_type
            ))
        })
}

/// Check that `upload` was produced from a template of `geno` for `org`
/// and return the matching resource.
pub fn validate_upload<'a>(
    upload: &SpecSheetUpload,
    geno: &'a SpecGeno,
    org: &SpecOrganization,
) -> RecombinantResult<&'a SpecChromo> {
    let chromo = find_upload_chromo(upload, geno)?;
    if upload.org_name != org.name {
        return Err(RecombinantError::InvalidUpload(format!(
            "organization {:?} does not match {:?}",
            upload.org_name, org.name
        )));
    }

    let l_ids_expected: Vec<&str> = chromo
        .template_fields()
        .map(|field| field.datastore_id.as_str())
        .collect();
    if upload.datastore_ids != l_ids_expected {
        return Err(RecombinantError::InvalidUpload(format!(
            "columns {:?} do not match expected {:?}",
            upload.datastore_ids, l_ids_expected
        )));
    }
    Ok(chromo)
}

/// Convert the rows of `upload` into records keyed by datastore id, typed by
/// the field definitions of `chromo`.
pub fn get_records(
    upload: &SpecSheetUpload,
    chromo: &SpecChromo,
) -> RecombinantResult<Vec<BTreeMap<String, Value>>> {
    let mut l_types = Vec::with_capacity(upload.datastore_ids.len());
    for c_id in &upload.datastore_ids {
        let field = chromo
            .fields
            .iter()
            .find(|field| &field.datastore_id == c_id)
            .ok_or_else(|| {
                RecombinantError::InvalidUpload(format!(
                    "column {c_id:?} is not a field of {:?}",
                    chromo.resource_name
                ))
            })?;
        l_types.push(derive_field_type(field)?.datastore_type);
    }

    Ok(upload
        .rows
        .iter()
        .map(|row| {
            upload
                .datastore_ids
                .iter()
                .zip(&l_types)
                .zip(row)
                .map(|((c_id, c_type), value)| (c_id.clone(), convert_cell_value(value, c_type)))
                .collect()
        })
        .collect())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Conversion

/// Convert a cell into the JSON value stored for a `datastore_type` column.
///
/// Values that cannot be converted are kept as text so the datastore can
/// report them.
pub fn convert_cell_value(value: &EnumCellValue, datastore_type: &str) -> Value {
    if value.is_blank() {
        return Value::Null;
    }

    match (datastore_type, value) {
        ("int" | "year" | "month", EnumCellValue::Number(n)) if n.fract() == 0.0 => {
            Value::from(*n as i64)
        }
        ("int" | "year" | "month", EnumCellValue::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(s.clone())),
        ("numeric" | "money", EnumCellValue::String(s)) => s
            .trim()
            .trim_start_matches('$')
            .replace(',', "")
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(s.clone())),
        ("boolean", EnumCellValue::Boolean(b)) => Value::Bool(*b),
        ("boolean", EnumCellValue::Number(n)) if *n == 0.0 || *n == 1.0 => Value::Bool(*n == 1.0),
        ("boolean", EnumCellValue::String(s)) => match s.trim().to_ascii_uppercase().as_str() {
            "TRUE" => Value::Bool(true),
            "FALSE" => Value::Bool(false),
            _ => Value::String(s.clone()),
        },
        ("_text", EnumCellValue::String(s)) => Value::Array(
            s.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| Value::String(part.to_string()))
                .collect(),
        ),
        ("_text", other) => Value::Array(vec![Value::String(derive_cell_text(other))]),
        ("date", EnumCellValue::DateTime(dt)) => Value::String(dt.format("%Y-%m-%d").to_string()),
        (_, EnumCellValue::DateTime(dt)) => {
            Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string())
        }
        (_, EnumCellValue::Number(n)) => {
            if matches!(datastore_type, "numeric" | "money" | "int" | "year" | "month") {
                Number::from_f64(*n).map_or(Value::Null, Value::Number)
            } else {
                Value::String(derive_cell_text(value))
            }
        }
        (_, EnumCellValue::Boolean(b)) => Value::String(if *b { "TRUE" } else { "FALSE" }.to_string()),
        (_, EnumCellValue::String(s)) => Value::String(s.clone()),
        (_, EnumCellValue::None) => Value::Null,
    }
}

fn convert_data_to_cell_value(data: &Data) -> EnumCellValue {
    match data {
        Data::Empty => EnumCellValue::None,
        Data::String(s) => EnumCellValue::String(s.clone()),
        Data::Int(n) => EnumCellValue::Number(*n as f64),
        Data::Float(n) => EnumCellValue::Number(*n),
        Data::Bool(b) => EnumCellValue::Boolean(*b),
        Data::DateTime(dt) => derive_datetime_from_serial(dt.as_f64())
            .map(EnumCellValue::DateTime)
            .unwrap_or(EnumCellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => EnumCellValue::String(s.clone()),
        Data::Error(_) => EnumCellValue::None,
    }
}

/// Excel 1900-system serial number to date-time.
fn derive_datetime_from_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let dt_epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let n_millis = (serial * 86_400_000.0).round() as i64;
    dt_epoch.checked_add_signed(TimeDelta::try_milliseconds(n_millis)?)
}

fn derive_cell_text(value: &EnumCellValue) -> String {
    match value {
        EnumCellValue::None => String::new(),
        EnumCellValue::String(s) => s.trim().to_string(),
        EnumCellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
            format!("{}", *n as i64)
        }
        EnumCellValue::Number(n) => n.to_string(),
        EnumCellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        EnumCellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
