//! `recombinant_xlsx` v1:
//! XLSX data-entry templates and data dictionaries built from dataset type
//! definitions.
//!
//! Modules:
//! - `conf`      : constants, style presets, built-in catalog
//! - `spec`      : formats/styles/config/report/errors
//! - `schema`    : geno/chromo/field/organization models and loaders
//! - `datatypes` : datastore type -> number format table
//! - `i18n`      : active-language translation
//! - `util`      : pure helper functions
//! - `writer`    : workbook builder
//! - `template`  : template and data dictionary entry points
//! - `reader`    : filled-template reader
pub mod conf;
pub mod datatypes;
pub mod i18n;
pub mod reader;
pub mod schema;
pub mod spec;
pub mod template;
pub mod util;
pub mod writer;

pub use conf::{C_SHEET_NAME_REFERENCE, N_ROW_DATA_FIRST, N_ROW_DATA_LAST};
pub use datatypes::{derive_field_type, find_field_type};
pub use i18n::{Translator, derive_choice_fields, language_text};
pub use reader::{
    EnumCellValue, SpecSheetUpload, find_upload_chromo, get_records, read_excel, validate_upload,
};
pub use schema::{
    LanguageText, SpecChromo, SpecField, SpecGeno, SpecOrganization, load_config, load_geno,
    load_organization,
};
pub use spec::{
    RecombinantError, RecombinantResult, SpecCellFormat, SpecExcelStyle, SpecFieldType,
    SpecRecombinantConfig, SpecRefRow, SpecXlsxReport,
};
pub use template::{derive_template_sheet_names, excel_data_dictionary, excel_template};
pub use writer::{RecombinantWorkbook, SheetNameRegistry};
