//! Workbook entry points: data-entry templates and data dictionaries.

use tracing::info;

use crate::conf::{
    C_SHEET_NAME_REFERENCE, derive_dictionary_detail_format, derive_dictionary_name_format,
};
use crate::i18n::{Translator, derive_choice_fields};
use crate::schema::{SpecChromo, SpecGeno, SpecOrganization};
use crate::spec::{RecombinantError, RecombinantResult, SpecRefRow};
use crate::util::{append_field_choices_rows, append_field_ref_rows};
use crate::writer::{RecombinantWorkbook, SheetNameRegistry};

/// Build the data-entry workbook of `geno` for `org`.
///
/// One sheet per resource, in definition order, followed by a `reference`
/// sheet documenting every included field and its choices. Labels use the
/// language of `translator`.
pub fn excel_template(
    geno: &SpecGeno,
    org: &SpecOrganization,
    translator: &Translator,
) -> RecombinantResult<RecombinantWorkbook> {
    if geno.resources.is_empty() {
        return Err(RecombinantError::NoResources(geno.dataset_type.clone()));
    }

    let mut workbook = RecombinantWorkbook::new();
    workbook.reserve_sheet_name(C_SHEET_NAME_REFERENCE);

    let mut refs = Vec::new();
    for chromo in &geno.resources {
        workbook.write_template_sheet(chromo, org, translator, &mut refs)?;
    }

    workbook.write_reserved_reference_sheet(C_SHEET_NAME_REFERENCE, &refs)?;

    info!(
        dataset_type = %geno.dataset_type,
        organization = %org.name,
        lang = %translator.lang(),
        "{}",
        workbook.report().format("[TEMPLATE]")
    );
    Ok(workbook)
}

/// Sheet titles [`excel_template`] gives the resources of `geno`, in order.
pub fn derive_template_sheet_names(geno: &SpecGeno) -> Vec<String> {
    let mut registry = SheetNameRegistry::new();
    registry.reserve(C_SHEET_NAME_REFERENCE);
    geno.resources
        .iter()
        .map(|chromo| registry.derive_sheet_name(&chromo.resource_name))
        .collect()
}

/// Build the field reference of `chromo`, one sheet per locale in `locales`
/// titled with the upper-cased locale.
pub fn excel_data_dictionary(
    chromo: &SpecChromo,
    locales: &[String],
    translator: &Translator,
) -> RecombinantResult<RecombinantWorkbook> {
    let fmt_name = derive_dictionary_name_format();
    let fmt_detail = derive_dictionary_detail_format();

    let mut workbook = RecombinantWorkbook::new();
    for c_lang in locales {
        let translator_lang = translator.with_lang(c_lang);
        let dict_choice_fields = derive_choice_fields(chromo, &translator_lang);

        let mut refs: Vec<SpecRefRow> = Vec::new();
        for field in &chromo.fields {
            append_field_ref_rows(&mut refs, field, &translator_lang, &fmt_name, &fmt_detail);
            if let Some(l_choices) = dict_choice_fields.get(&field.datastore_id) {
                append_field_choices_rows(&mut refs, l_choices, &translator_lang);
            }
        }

        workbook.write_reference_sheet(&c_lang.to_uppercase(), &refs)?;
    }

    info!(
        resource_name = %chromo.resource_name,
        "{}",
        workbook.report().format("[DICTIONARY]")
    );
    Ok(workbook)
}
