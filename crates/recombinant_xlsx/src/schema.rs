//! Dataset type definitions ("geno"), resource definitions ("chromo"),
//! organizations and their file loaders.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::spec::{RecombinantError, RecombinantResult, SpecExcelStyle, SpecRecombinantConfig};

////////////////////////////////////////////////////////////////////////////////
// #region LanguageText

/// Text that is either language-neutral or given per language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LanguageText {
    /// Same text in every language.
    Plain(String),
    /// `lang -> text`.
    ByLang(BTreeMap<String, String>),
}

impl From<&str> for LanguageText {
    fn from(value: &str) -> Self {
        LanguageText::Plain(value.to_string())
    }
}

impl LanguageText {
    /// Build a per-language text from `(lang, text)` pairs.
    pub fn by_lang<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        LanguageText::ByLang(
            pairs
                .into_iter()
                .map(|(lang, text)| (lang.to_string(), text.to_string()))
                .collect(),
        )
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SchemaModels

/// Dataset type definition: an ordered list of resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecGeno {
    /// Dataset type name.
    pub dataset_type: String,
    /// Resource definitions, one data-entry sheet each.
    #[serde(default)]
    pub resources: Vec<SpecChromo>,
}

/// Resource (table) definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecChromo {
    /// Resource name, used as sheet title.
    pub resource_name: String,
    /// Human title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<LanguageText>,
    /// Ordered fields.
    #[serde(default)]
    pub fields: Vec<SpecField>,
    /// Style of the organization row and field-name reference rows.
    #[serde(default)]
    pub excel_organization_style: SpecExcelStyle,
    /// Style of the label/id header rows and field-detail reference rows.
    #[serde(default)]
    pub excel_header_style: SpecExcelStyle,
}

/// One field of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecField {
    /// Column id in the datastore.
    pub datastore_id: String,
    /// Column label.
    pub label: LanguageText,
    /// Datastore type name.
    pub datastore_type: String,
    /// Data-entry column width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excel_column_width: Option<f64>,
    /// Whether the field appears on the data-entry template.
    #[serde(default = "default_true")]
    pub import_template_include: bool,
    /// Field description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LanguageText>,
    /// Obligation text (mandatory/optional...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obligation: Option<LanguageText>,
    /// Expected format text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_type: Option<LanguageText>,
    /// Enumerated choices: `key -> text`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<BTreeMap<String, LanguageText>>,
}

fn default_true() -> bool {
    true
}

/// Organization owning the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecOrganization {
    /// Machine name.
    pub name: String,
    /// Display title.
    pub title: String,
}

impl SpecGeno {
    /// Look up a resource by name.
    pub fn get_chromo(&self, resource_name: &str) -> RecombinantResult<&SpecChromo> {
        self.resources
            .iter()
            .find(|chromo| chromo.resource_name == resource_name)
            .ok_or_else(|| RecombinantError::ResourceNotFound(resource_name.to_string()))
    }
}

impl SpecChromo {
    /// Fields shown on the data-entry template, in order.
    pub fn template_fields(&self) -> impl Iterator<Item = &SpecField> {
        self.fields.iter().filter(|field| field.import_template_include)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Loaders

/// Load any schema model from a `.json`, `.yaml` or `.yml` file.
pub fn load_from_file<T: DeserializeOwned>(path: &Path) -> RecombinantResult<T> {
    let c_ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let c_text = fs::read_to_string(path)?;

    match c_ext.as_str() {
        "json" => Ok(serde_json::from_str(&c_text)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(&c_text)?),
        _ => Err(RecombinantError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Load a dataset type definition file.
pub fn load_geno(path: &Path) -> RecombinantResult<SpecGeno> {
    load_from_file(path)
}

/// Load an organization file.
pub fn load_organization(path: &Path) -> RecombinantResult<SpecOrganization> {
    load_from_file(path)
}

/// Load a configuration file.
pub fn load_config(path: &Path) -> RecombinantResult<SpecRecombinantConfig> {
    load_from_file(path)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
