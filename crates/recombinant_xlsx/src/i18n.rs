//! Active-language translation of reference-sheet labels and schema text.

use std::collections::BTreeMap;

use crate::conf::derive_default_catalog;
use crate::schema::{LanguageText, SpecChromo};
use crate::spec::SpecRecombinantConfig;

/// Resolve `value` for `lang`.
///
/// Lookup order: exact language, primary subtag (`fr` for `fr_CA`),
/// `locale_default`, then the first entry by language key.
pub fn language_text(value: &LanguageText, lang: &str, locale_default: &str) -> String {
    let dict_text = match value {
        LanguageText::Plain(text) => return text.clone(),
        LanguageText::ByLang(dict_text) => dict_text,
    };

    let c_lang_primary = lang.split(['_', '-']).next().unwrap_or(lang);
    [lang, c_lang_primary, locale_default]
        .iter()
        .find_map(|key| dict_text.get(*key))
        .or_else(|| dict_text.values().next())
        .cloned()
        .unwrap_or_default()
}

/// Message catalog bound to one active language.
#[derive(Debug, Clone, PartialEq)]
pub struct Translator {
    lang: String,
    locale_default: String,
    catalog: BTreeMap<String, BTreeMap<String, String>>,
}

impl Translator {
    /// Build a translator for `lang` from the built-in catalog overlaid with
    /// `config.translations`.
    pub fn new(lang: &str, config: &SpecRecombinantConfig) -> Self {
        let mut catalog = derive_default_catalog();
        for (c_lang, dict_msgs) in &config.translations {
            catalog
                .entry(c_lang.clone())
                .or_default()
                .extend(dict_msgs.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        Self {
            lang: lang.to_string(),
            locale_default: config.locale_default.clone(),
            catalog,
        }
    }

    /// Active language.
    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Same catalog, another active language.
    pub fn with_lang(&self, lang: &str) -> Self {
        Self {
            lang: lang.to_string(),
            ..self.clone()
        }
    }

    /// Translate `msgid`; untranslated ids are returned unchanged.
    pub fn gettext(&self, msgid: &str) -> String {
        let c_lang_primary = self.lang.split(['_', '-']).next().unwrap_or(&self.lang);
        [self.lang.as_str(), c_lang_primary]
            .iter()
            .find_map(|lang| self.catalog.get(*lang).and_then(|dict| dict.get(msgid)))
            .cloned()
            .unwrap_or_else(|| msgid.to_string())
    }

    /// Resolve multi-language schema text in the active language.
    pub fn language_text(&self, value: &LanguageText) -> String {
        language_text(value, &self.lang, &self.locale_default)
    }
}

/// Choice lists of `chromo` in the active language: `datastore_id -> [(key, text)]`,
/// pairs sorted by key.
pub fn derive_choice_fields(
    chromo: &SpecChromo,
    translator: &Translator,
) -> BTreeMap<String, Vec<(String, String)>> {
    chromo
        .fields
        .iter()
        .filter_map(|field| {
            let dict_choices = field.choices.as_ref()?;
            let l_pairs = dict_choices
                .iter()
                .map(|(key, text)| (key.clone(), translator.language_text(text)))
                .collect();
            Some((field.datastore_id.clone(), l_pairs))
        })
        .collect()
}
