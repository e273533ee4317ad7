//! Shared specification models: cell formats, host styles, reference rows,
//! configuration, reports and errors.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Resolved cell format, independent of the writer backend.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<f64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,
    /// Font color as `RRGGBB`.
    pub font_color: Option<String>,

    /// Fill pattern name (openpyxl `patternType` vocabulary).
    pub pattern: Option<String>,
    /// Pattern foreground color as `RRGGBB`. For solid fills this is the
    /// visible cell color.
    pub fg_color: Option<String>,
    /// Pattern background color as `RRGGBB`.
    pub bg_color: Option<String>,

    /// Number format code.
    pub num_format: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
            pattern: other.pattern.clone().or_else(|| self.pattern.clone()),
            fg_color: other.fg_color.clone().or_else(|| self.fg_color.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
        }
    }

    /// True when no property is set.
    pub fn is_empty(&self) -> bool {
        *self == SpecCellFormat::default()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region HostStyleSpecification

/// Style block as written in host schema files, e.g.
/// `{"PatternFill": {"patternType": "solid", "fgColor": "FF336B87"}, "Font": {"bold": true}}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpecExcelStyle {
    /// Cell fill.
    #[serde(rename = "PatternFill", default, skip_serializing_if = "Option::is_none")]
    pub pattern_fill: Option<SpecPatternFill>,
    /// Cell font.
    #[serde(rename = "Font", default, skip_serializing_if = "Option::is_none")]
    pub font: Option<SpecFont>,
}

/// Fill part of [`SpecExcelStyle`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpecPatternFill {
    /// Pattern name (`solid`, `gray125`, `lightGrid`, ...).
    #[serde(rename = "patternType", alias = "fill_type", default)]
    pub pattern_type: Option<String>,
    /// Foreground color, `AARRGGBB` or `RRGGBB`.
    #[serde(rename = "fgColor", alias = "start_color", default)]
    pub fg_color: Option<String>,
    /// Background color, `AARRGGBB` or `RRGGBB`.
    #[serde(rename = "bgColor", alias = "end_color", default)]
    pub bg_color: Option<String>,
}

/// Font part of [`SpecExcelStyle`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpecFont {
    /// Bold style.
    #[serde(default)]
    pub bold: Option<bool>,
    /// Italic style.
    #[serde(default)]
    pub italic: Option<bool>,
    /// Font color, `AARRGGBB` or `RRGGBB`.
    #[serde(default)]
    pub color: Option<String>,
    /// Font size in points.
    #[serde(alias = "sz", default)]
    pub size: Option<f64>,
    /// Font family name.
    #[serde(default)]
    pub name: Option<String>,
}

impl SpecExcelStyle {
    /// Resolve host style block into a [`SpecCellFormat`].
    ///
    /// Colors are normalized to `RRGGBB`; the alpha byte of `AARRGGBB` input
    /// is dropped.
    pub fn to_cell_format(&self) -> SpecCellFormat {
        let mut fmt = SpecCellFormat::default();

        if let Some(fill) = &self.pattern_fill {
            fmt.pattern = fill.pattern_type.clone();
            fmt.fg_color = fill.fg_color.as_deref().and_then(normalize_argb_color);
            fmt.bg_color = fill.bg_color.as_deref().and_then(normalize_argb_color);
        }
        if let Some(font) = &self.font {
            fmt.bold = font.bold;
            fmt.italic = font.italic;
            fmt.font_color = font.color.as_deref().and_then(normalize_argb_color);
            fmt.font_size = font.size;
            fmt.font_name = font.name.clone();
        }

        fmt
    }
}

/// Normalize `AARRGGBB`, `RRGGBB` or `#RRGGBB` into upper-case `RRGGBB`.
///
/// Returns `None` for anything that is not 6 or 8 hex digits.
pub fn normalize_argb_color(color: &str) -> Option<String> {
    let c_color = color.trim().trim_start_matches('#');
    if !c_color.chars().all(|chr| chr.is_ascii_hexdigit()) {
        return None;
    }
    match c_color.len() {
        6 => Some(c_color.to_ascii_uppercase()),
        8 => Some(c_color[2..].to_ascii_uppercase()),
        _ => None,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReferenceRows

/// One row queued for a reference sheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecRefRow {
    /// Row and cell style; `None` leaves the row unstyled.
    pub fmt: Option<SpecCellFormat>,
    /// Cell texts from column A. Empty text leaves the cell blank.
    pub cells: Vec<String>,
}

impl SpecRefRow {
    /// Empty separator row.
    pub fn blank() -> Self {
        Self::default()
    }

    /// Row with a style.
    pub fn styled(fmt: &SpecCellFormat, cells: Vec<String>) -> Self {
        Self {
            fmt: Some(fmt.clone()),
            cells,
        }
    }

    /// Row without a style.
    pub fn plain(cells: Vec<String>) -> Self {
        Self { fmt: None, cells }
    }
}

/// Datastore type with its spreadsheet number format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecFieldType {
    /// Datastore type name (`int`, `text`, `_text`, ...).
    pub datastore_type: &'static str,
    /// Excel number format applied to the data-entry column.
    pub xl_format: &'static str,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Configuration

/// Host configuration: offered locales and message catalog overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecRecombinantConfig {
    /// Locales rendered by the data dictionary, one sheet each.
    pub locales_offered: Vec<String>,
    /// Fallback locale for multi-language text.
    pub locale_default: String,
    /// Extra translations: `lang -> msgid -> msgstr`.
    pub translations: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for SpecRecombinantConfig {
    fn default() -> Self {
        Self {
            locales_offered: vec!["en".to_string(), "fr".to_string()],
            locale_default: "en".to_string(),
            translations: BTreeMap::new(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Summary of one built workbook.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// Sheet names in workbook order.
    pub sheet_names: Vec<String>,
    /// Number of data validations added.
    pub cnt_validations: usize,
    /// Number of conditional formats added.
    pub cnt_conditional_formats: usize,
    /// Number of reference rows written.
    pub cnt_ref_rows: usize,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} sheets={} validations={} conditional_formats={} ref_rows={} warnings={}",
            self.sheet_names.len(),
            self.cnt_validations,
            self.cnt_conditional_formats,
            self.cnt_ref_rows,
            self.warnings.len()
        )
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Result alias used across the crate.
pub type RecombinantResult<T> = Result<T, RecombinantError>;

/// Errors raised while loading schemas, building or reading workbooks.
#[derive(Debug, Error)]
pub enum RecombinantError {
    /// Workbook writer failure.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Workbook reader failure.
    #[error("xlsx read error: {0}")]
    Read(#[from] calamine::XlsxError),

    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Schema file extension is neither JSON nor YAML.
    #[error("Unsupported schema file: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Field refers to a datastore type without a spreadsheet mapping.
    #[error("Unknown datastore_type {datastore_type:?} for field {datastore_id:?}")]
    UnknownDatastoreType {
        /// Field id.
        datastore_id: String,
        /// Offending type name.
        datastore_type: String,
    },

    /// Dataset type definition without resources.
    #[error("Dataset type {0:?} defines no resources")]
    NoResources(String),

    /// Resource name not present in the dataset type definition.
    #[error("Resource not found: {0:?}")]
    ResourceNotFound(String),

    /// Row or column index does not fit the worksheet limits.
    #[error("{axis} index overflow: {value}")]
    IndexOverflow {
        /// `row` or `column`.
        axis: &'static str,
        /// Offending zero-based index.
        value: usize,
    },

    /// Uploaded workbook does not match the expected template.
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_argb_color_drops_alpha() {
        assert_eq!(normalize_argb_color("FFEE1111"), Some("EE1111".to_string()));
        assert_eq!(normalize_argb_color("#dfe2db"), Some("DFE2DB".to_string()));
        assert_eq!(normalize_argb_color("red"), None);
        assert_eq!(normalize_argb_color("FFF"), None);
    }

    #[test]
    fn test_excel_style_to_cell_format() {
        let style: SpecExcelStyle = serde_json::from_str(
            r#"{"PatternFill": {"patternType": "solid", "fgColor": "FFFFF056"}, "Font": {"bold": true}}"#,
        )
        .unwrap();

        let fmt = style.to_cell_format();
        assert_eq!(fmt.pattern.as_deref(), Some("solid"));
        assert_eq!(fmt.fg_color.as_deref(), Some("FFF056"));
        assert_eq!(fmt.bold, Some(true));
        assert_eq!(fmt.font_color, None);
    }

    #[test]
    fn test_excel_style_accepts_openpyxl_aliases() {
        let style: SpecExcelStyle = serde_json::from_str(
            r#"{"PatternFill": {"fill_type": "solid", "start_color": "FF336B87"}, "Font": {"color": "FFFFFF", "sz": 12}}"#,
        )
        .unwrap();

        let fmt = style.to_cell_format();
        assert_eq!(fmt.fg_color.as_deref(), Some("336B87"));
        assert_eq!(fmt.font_color.as_deref(), Some("FFFFFF"));
        assert_eq!(fmt.font_size, Some(12.0));
    }

    #[test]
    fn test_cell_format_merge_prefers_right_side() {
        let base = SpecCellFormat {
            bold: Some(true),
            fg_color: Some("DFE2DB".to_string()),
            ..Default::default()
        };
        let merged = base.with_(SpecCellFormat {
            fg_color: Some("FFF056".to_string()),
            ..Default::default()
        });

        assert_eq!(merged.bold, Some(true));
        assert_eq!(merged.fg_color.as_deref(), Some("FFF056"));
        assert!(!merged.is_empty());
        assert!(SpecCellFormat::default().is_empty());
    }

    #[test]
    fn test_report_format() {
        let mut report = SpecXlsxReport {
            sheet_names: vec!["ati".to_string(), "reference".to_string()],
            cnt_validations: 3,
            cnt_conditional_formats: 1,
            cnt_ref_rows: 12,
            warnings: vec![],
        };
        report.warn("renamed");

        assert_eq!(
            report.format("[XLSX]"),
            "[XLSX] sheets=2 validations=3 conditional_formats=1 ref_rows=12 warnings=1"
        );
    }
}
