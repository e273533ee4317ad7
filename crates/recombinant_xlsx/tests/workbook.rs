use std::io::{Cursor, Read};

use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use pretty_assertions::assert_eq;
use recombinant_xlsx::{
    RecombinantError, SpecGeno, SpecOrganization, SpecRecombinantConfig, Translator,
    derive_template_sheet_names, excel_data_dictionary, excel_template, get_records, read_excel,
    validate_upload,
};
use rust_xlsxwriter::Workbook;
use serde_json::json;

fn make_geno() -> SpecGeno {
    serde_json::from_value(json!({
        "dataset_type": "ati",
        "resources": [
            {
                "resource_name": "ati",
                "excel_organization_style": {
                    "PatternFill": {"patternType": "solid", "fgColor": "FF336B87"},
                    "Font": {"bold": true, "color": "FFFFFFFF"}
                },
                "excel_header_style": {
                    "PatternFill": {"patternType": "solid", "fgColor": "FFDFE2DB"}
                },
                "fields": [
                    {
                        "datastore_id": "ref_number",
                        "label": {"en": "Reference Number", "fr": "Numéro de référence"},
                        "datastore_type": "text",
                        "excel_column_width": 20,
                        "obligation": {"en": "Mandatory", "fr": "Obligatoire"}
                    },
                    {
                        "datastore_id": "year",
                        "label": {"en": "Year", "fr": "Année"},
                        "datastore_type": "year"
                    },
                    {
                        "datastore_id": "disposition",
                        "label": {"en": "Disposition", "fr": "Disposition"},
                        "datastore_type": "text",
                        "choices": {
                            "DP": {"en": "Disclosed in part", "fr": "Communication partielle"},
                            "DA": {"en": "All disclosed", "fr": "Communication totale"}
                        }
                    },
                    {
                        "datastore_id": "internal_note",
                        "label": "Internal note",
                        "datastore_type": "text",
                        "import_template_include": false
                    },
                    {
                        "datastore_id": "published",
                        "label": {"en": "Published", "fr": "Publié"},
                        "datastore_type": "boolean"
                    },
                    {
                        "datastore_id": "keywords",
                        "label": {"en": "Keywords", "fr": "Mots-clés"},
                        "datastore_type": "_text",
                        "choices": {"a": "Alpha", "b": "Beta"}
                    }
                ]
            },
            {
                "resource_name": "ati-nil",
                "fields": [
                    {"datastore_id": "month", "label": "Month", "datastore_type": "month"}
                ]
            }
        ]
    }))
    .unwrap()
}

fn make_org() -> SpecOrganization {
    SpecOrganization {
        name: "tbs-sct".to_string(),
        title: "Treasury Board".to_string(),
    }
}

fn read_zip_entry(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut c_xml = String::new();
    file.read_to_string(&mut c_xml).unwrap();
    c_xml
}

fn read_sheet_xml(bytes: &[u8], n_sheet: usize) -> String {
    read_zip_entry(bytes, &format!("xl/worksheets/sheet{n_sheet}.xml"))
}

/// Opening tag starting with `prefix`, up to its closing `>`.
fn find_tag<'a>(xml: &'a str, prefix: &str) -> &'a str {
    let n_start = xml
        .find(prefix)
        .unwrap_or_else(|| panic!("{prefix} not found"));
    let n_end = n_start + xml[n_start..].find('>').unwrap();
    &xml[n_start..=n_end]
}

fn tag_attr(tag: &str, name: &str) -> Option<String> {
    let c_key = format!(" {name}=\"");
    let n_start = tag.find(&c_key)? + c_key.len();
    let n_len = tag[n_start..].find('"')?;
    Some(tag[n_start..n_start + n_len].to_string())
}

fn cell_text(range: &calamine::Range<Data>, row: u32, col: u32) -> String {
    match range.get_value((row, col)) {
        Some(Data::String(s)) => s.clone(),
        Some(Data::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[test]
fn test_template_sheets_headers_and_reference() {
    let translator = Translator::new("en", &SpecRecombinantConfig::default());
    let mut workbook = excel_template(&make_geno(), &make_org(), &translator).unwrap();

    let report = workbook.report();
    assert_eq!(report.sheet_names, vec!["ati", "ati-nil", "reference"]);
    assert_eq!(report.cnt_validations, 2);
    assert_eq!(report.cnt_conditional_formats, 1);
    assert_eq!(report.cnt_ref_rows, 23);
    assert!(report.warnings.is_empty());

    let bytes = workbook.save_to_buffer().unwrap();
    let mut xlsx: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
    assert_eq!(xlsx.sheet_names(), vec!["ati", "ati-nil", "reference"]);

    let sheet = xlsx.worksheet_range("ati").unwrap();
    assert_eq!(cell_text(&sheet, 0, 0), "tbs-sct");
    assert_eq!(cell_text(&sheet, 0, 1), "Treasury Board");
    assert_eq!(
        (0..5).map(|col| cell_text(&sheet, 1, col)).collect::<Vec<_>>(),
        vec!["Reference Number", "Year", "Disposition", "Published", "Keywords"]
    );
    assert_eq!(
        (0..5).map(|col| cell_text(&sheet, 2, col)).collect::<Vec<_>>(),
        vec!["ref_number", "year", "disposition", "published", "keywords"]
    );

    let reference = xlsx.worksheet_range("reference").unwrap();
    assert_eq!(cell_text(&reference, 0, 0), "");
    assert_eq!(cell_text(&reference, 1, 0), "Field Name");
    assert_eq!(cell_text(&reference, 1, 1), "Reference Number");
    assert_eq!(cell_text(&reference, 2, 1), "ref_number");
    assert_eq!(cell_text(&reference, 3, 0), "Obligation");
    assert_eq!(cell_text(&reference, 3, 1), "Mandatory");
    assert_eq!(
        (0..3).map(|col| cell_text(&reference, 10, col)).collect::<Vec<_>>(),
        vec!["Values", "DA", "All disclosed"]
    );
    assert_eq!(
        (0..3).map(|col| cell_text(&reference, 11, col)).collect::<Vec<_>>(),
        vec!["", "DP", "Disclosed in part"]
    );
    assert_eq!(cell_text(&reference, 18, 1), "a");
    assert_eq!(cell_text(&reference, 22, 1), "month");
}

#[test]
fn test_template_validations_and_layout_xml() {
    let translator = Translator::new("en", &SpecRecombinantConfig::default());
    let mut workbook = excel_template(&make_geno(), &make_org(), &translator).unwrap();
    let bytes = workbook.save_to_buffer().unwrap();
    let c_xml = read_sheet_xml(&bytes, 1);

    assert!(c_xml.contains(r#"sqref="C4:C1004""#));
    assert!(c_xml.contains("reference!$B$11:$B$12"));
    assert!(c_xml.contains(r#"errorTitle="Invalid choice""#));
    assert!(c_xml.contains(r#"sqref="D4:D1004""#));
    assert!(c_xml.contains("FALSE,TRUE"));
    assert!(!c_xml.contains(r#"sqref="E4:E1004""#));

    assert!(c_xml.contains(r#"<conditionalFormatting sqref="C2">"#));
    assert!(c_xml.contains("SUMPRODUCT(COUNTIF(C4:C1004,reference!$B$11:$B$12))"));
    assert!(c_xml.contains(r#"stopIfTrue="1""#));

    assert!(c_xml.contains(r#"hidden="1""#));
    assert!(c_xml.contains(r#"topLeftCell="A4""#));
}

#[test]
fn test_template_french_labels() {
    let translator = Translator::new("fr", &SpecRecombinantConfig::default());
    let mut workbook = excel_template(&make_geno(), &make_org(), &translator).unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let mut xlsx: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
    let sheet = xlsx.worksheet_range("ati").unwrap();
    assert_eq!(cell_text(&sheet, 1, 1), "Année");

    let reference = xlsx.worksheet_range("reference").unwrap();
    assert_eq!(cell_text(&reference, 1, 0), "Nom du champ");
    assert_eq!(cell_text(&reference, 10, 0), "Valeurs");
    assert_eq!(cell_text(&reference, 10, 2), "Communication totale");
}

#[test]
fn test_template_without_resources_fails() {
    let geno = SpecGeno {
        dataset_type: "empty".to_string(),
        resources: vec![],
    };
    let translator = Translator::new("en", &SpecRecombinantConfig::default());

    let err = excel_template(&geno, &make_org(), &translator).err().unwrap();
    assert!(matches!(err, RecombinantError::NoResources(name) if name == "empty"));
}

#[test]
fn test_template_unknown_type_fails() {
    let mut geno = make_geno();
    geno.resources[0].fields[1].datastore_type = "geometry".to_string();
    let translator = Translator::new("en", &SpecRecombinantConfig::default());

    let err = excel_template(&geno, &make_org(), &translator).err().unwrap();
    assert!(matches!(
        err,
        RecombinantError::UnknownDatastoreType { datastore_type, .. } if datastore_type == "geometry"
    ));
}

#[test]
fn test_data_dictionary_one_sheet_per_locale() {
    let geno = make_geno();
    let chromo = geno.get_chromo("ati").unwrap();
    let config = SpecRecombinantConfig::default();
    let translator = Translator::new("en", &config);

    let mut workbook =
        excel_data_dictionary(chromo, &config.locales_offered, &translator).unwrap();
    assert_eq!(workbook.sheet_names(), ["EN", "FR"]);

    let bytes = workbook.save_to_buffer().unwrap();
    let mut xlsx: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();

    let sheet_en = xlsx.worksheet_range("EN").unwrap();
    assert_eq!(cell_text(&sheet_en, 1, 0), "Field Name");
    assert_eq!(cell_text(&sheet_en, 1, 1), "Reference Number");
    // fields excluded from the template are still documented
    let l_ids: Vec<String> = (0..40).map(|row| cell_text(&sheet_en, row, 1)).collect();
    assert!(l_ids.contains(&"internal_note".to_string()));

    let sheet_fr = xlsx.worksheet_range("FR").unwrap();
    assert_eq!(cell_text(&sheet_fr, 1, 0), "Nom du champ");
    assert_eq!(cell_text(&sheet_fr, 1, 1), "Numéro de référence");
}

#[test]
fn test_read_blank_template_matches_schema() {
    let geno = make_geno();
    let translator = Translator::new("en", &SpecRecombinantConfig::default());
    let mut workbook = excel_template(&geno, &make_org(), &translator).unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let l_uploads = read_excel(&bytes).unwrap();
    assert_eq!(l_uploads.len(), 2);
    assert_eq!(l_uploads[0].org_name, "tbs-sct");
    assert!(l_uploads[0].rows.is_empty());

    let chromo = validate_upload(&l_uploads[0], &geno, &make_org()).unwrap();
    assert_eq!(chromo.resource_name, "ati");
    let chromo = validate_upload(&l_uploads[1], &geno, &make_org()).unwrap();
    assert_eq!(chromo.resource_name, "ati-nil");

    let other_org = SpecOrganization {
        name: "other".to_string(),
        title: "Other".to_string(),
    };
    assert!(matches!(
        validate_upload(&l_uploads[0], &geno, &other_org),
        Err(RecombinantError::InvalidUpload(_))
    ));

    let mut geno_changed = geno.clone();
    geno_changed.resources[0].fields.remove(0);
    assert!(matches!(
        validate_upload(&l_uploads[0], &geno_changed, &make_org()),
        Err(RecombinantError::InvalidUpload(_))
    ));

    let mut geno_renamed = geno.clone();
    geno_renamed.resources[1].resource_name = "ati-other".to_string();
    assert!(matches!(
        validate_upload(&l_uploads[1], &geno_renamed, &make_org()),
        Err(RecombinantError::InvalidUpload(_))
    ));
}

#[test]
fn test_template_names_clashing_with_reference_sheet() {
    let geno: SpecGeno = serde_json::from_value(json!({
        "dataset_type": "clash",
        "resources": [
            {
                "resource_name": "Reference",
                "fields": [
                    {
                        "datastore_id": "status",
                        "label": "Status",
                        "datastore_type": "text",
                        "choices": {"A": "Active", "I": "Inactive"}
                    }
                ]
            },
            {
                "resource_name": "reference",
                "fields": [{"datastore_id": "note", "label": "Note", "datastore_type": "text"}]
            },
            {
                "resource_name": "ati",
                "fields": [{"datastore_id": "year", "label": "Year", "datastore_type": "year"}]
            },
            {
                "resource_name": "ATI",
                "fields": [{"datastore_id": "month", "label": "Month", "datastore_type": "month"}]
            }
        ]
    }))
    .unwrap();
    let translator = Translator::new("en", &SpecRecombinantConfig::default());

    let mut workbook = excel_template(&geno, &make_org(), &translator).unwrap();
    let l_names_expected = vec!["Reference__2", "reference__3", "ati", "ATI__2", "reference"];
    assert_eq!(workbook.sheet_names(), l_names_expected.as_slice());
    assert_eq!(workbook.report().warnings.len(), 3);
    assert_eq!(derive_template_sheet_names(&geno), l_names_expected[..4].to_vec());

    let bytes = workbook.save_to_buffer().unwrap();
    let mut xlsx: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes.clone())).unwrap();
    assert_eq!(xlsx.sheet_names(), l_names_expected);

    let c_xml = read_sheet_xml(&bytes, 1);
    assert!(c_xml.contains("reference!$B$4:$B$5"));

    let l_uploads = read_excel(&bytes).unwrap();
    let l_resources: Vec<String> = l_uploads
        .iter()
        .map(|upload| {
            validate_upload(upload, &geno, &make_org())
                .unwrap()
                .resource_name
                .clone()
        })
        .collect();
    assert_eq!(l_resources, vec!["Reference", "reference", "ati", "ATI"]);
}

#[test]
fn test_template_row_and_cell_styles() {
    let translator = Translator::new("en", &SpecRecombinantConfig::default());
    let mut workbook = excel_template(&make_geno(), &make_org(), &translator).unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let c_styles = read_zip_entry(&bytes, "xl/styles.xml");
    assert!(c_styles.contains(r#"rgb="FF336B87""#));
    assert!(c_styles.contains(r#"rgb="FFDFE2DB""#));
    assert!(c_styles.contains("<b/>"));
    let c_dxfs = &c_styles[c_styles.find("<dxfs").unwrap()..c_styles.find("</dxfs>").unwrap()];
    assert!(c_dxfs.starts_with(r#"<dxfs count="1">"#));
    assert!(c_dxfs.contains("FFEE1111"));

    let c_xml = read_sheet_xml(&bytes, 1);
    let c_row_org = find_tag(&c_xml, r#"<row r="1" "#);
    let c_row_labels = find_tag(&c_xml, r#"<row r="2" "#);
    let c_row_ids = find_tag(&c_xml, r#"<row r="3" "#);
    for c_row in [c_row_org, c_row_labels, c_row_ids] {
        assert!(c_row.contains(r#"customFormat="1""#));
    }
    assert!(c_row_ids.contains(r#"hidden="1""#));

    let c_style_org = tag_attr(c_row_org, "s").unwrap();
    let c_style_header = tag_attr(c_row_labels, "s").unwrap();
    assert_ne!(c_style_org, c_style_header);
    assert_eq!(tag_attr(c_row_ids, "s").unwrap(), c_style_header);

    for c_cell in ["A1", "B1"] {
        let c_tag = find_tag(&c_xml, &format!(r#"<c r="{c_cell}" "#));
        assert_eq!(tag_attr(c_tag, "s").unwrap(), c_style_org);
    }
    for c_cell in ["A2", "E2", "A3", "E3"] {
        let c_tag = find_tag(&c_xml, &format!(r#"<c r="{c_cell}" "#));
        assert_eq!(tag_attr(c_tag, "s").unwrap(), c_style_header);
    }

    // reference sheet: field name rows use the organization style, detail
    // rows the header style, choice rows none
    let c_xml_ref = read_sheet_xml(&bytes, 3);
    let c_row_name = find_tag(&c_xml_ref, r#"<row r="2" "#);
    let c_row_detail = find_tag(&c_xml_ref, r#"<row r="3" "#);
    let c_style_name = tag_attr(c_row_name, "s").unwrap();
    let c_style_detail = tag_attr(c_row_detail, "s").unwrap();
    assert_ne!(c_style_name, c_style_detail);
    for (c_cell, c_style) in [
        ("A2", &c_style_name),
        ("B2", &c_style_name),
        ("A3", &c_style_detail),
        ("B3", &c_style_detail),
    ] {
        let c_tag = find_tag(&c_xml_ref, &format!(r#"<c r="{c_cell}" "#));
        assert_eq!(&tag_attr(c_tag, "s").unwrap(), c_style);
    }
    let c_row_choice = find_tag(&c_xml_ref, r#"<row r="11" "#);
    assert!(!c_row_choice.contains("customFormat"));
    assert!(tag_attr(find_tag(&c_xml_ref, r#"<c r="B11" "#), "s").is_none());
}

#[test]
fn test_data_dictionary_styles() {
    let geno = make_geno();
    let chromo = geno.get_chromo("ati").unwrap();
    let config = SpecRecombinantConfig::default();
    let translator = Translator::new("en", &config);

    let mut workbook =
        excel_data_dictionary(chromo, &config.locales_offered, &translator).unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let c_styles = read_zip_entry(&bytes, "xl/styles.xml");
    assert!(c_styles.contains(r#"rgb="FFFFF056""#));
    assert!(c_styles.contains(r#"rgb="FFDFE2DB""#));
    assert!(c_styles.contains("<b/>"));

    let c_xml = read_sheet_xml(&bytes, 1);
    let c_row_name = find_tag(&c_xml, r#"<row r="2" "#);
    let c_row_detail = find_tag(&c_xml, r#"<row r="3" "#);
    assert!(c_row_name.contains(r#"customFormat="1""#));
    assert!(c_row_detail.contains(r#"customFormat="1""#));

    let c_style_name = tag_attr(c_row_name, "s").unwrap();
    let c_style_detail = tag_attr(c_row_detail, "s").unwrap();
    assert_ne!(c_style_name, c_style_detail);
    assert_eq!(
        tag_attr(find_tag(&c_xml, r#"<c r="B2" "#), "s").unwrap(),
        c_style_name
    );
    assert_eq!(
        tag_attr(find_tag(&c_xml, r#"<c r="B3" "#), "s").unwrap(),
        c_style_detail
    );
}

#[test]
fn test_read_filled_sheet_records() {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("ati").unwrap();
    sheet.write_string(0, 0, "tbs-sct").unwrap();
    for (col, c_id) in ["ref_number", "year", "disposition", "published", "keywords"]
        .iter()
        .enumerate()
    {
        sheet.write_string(2, col as u16, *c_id).unwrap();
    }
    sheet.write_string(3, 0, "A-2019-001").unwrap();
    sheet.write_number(3, 1, 2019).unwrap();
    sheet.write_string(3, 2, "DA").unwrap();
    sheet.write_boolean(3, 3, true).unwrap();
    sheet.write_string(3, 4, "a,b").unwrap();
    sheet.write_string(4, 0, "   ").unwrap();
    sheet.write_string(5, 0, "A-2019-002").unwrap();
    sheet.write_string(5, 3, "FALSE").unwrap();
    workbook.add_worksheet().set_name("reference").unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let l_uploads = read_excel(&bytes).unwrap();
    assert_eq!(l_uploads.len(), 1);
    assert_eq!(l_uploads[0].rows.len(), 2);

    let geno = make_geno();
    let l_records = get_records(&l_uploads[0], &geno.resources[0]).unwrap();
    assert_eq!(l_records.len(), 2);
    assert_eq!(l_records[0]["ref_number"], json!("A-2019-001"));
    assert_eq!(l_records[0]["year"], json!(2019));
    assert_eq!(l_records[0]["disposition"], json!("DA"));
    assert_eq!(l_records[0]["published"], json!(true));
    assert_eq!(l_records[0]["keywords"], json!(["a", "b"]));
    assert_eq!(l_records[1]["year"], serde_json::Value::Null);
    assert_eq!(l_records[1]["published"], json!(false));
}

#[test]
fn test_save_to_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ati.xlsx");
    let translator = Translator::new("en", &SpecRecombinantConfig::default());

    let mut workbook = excel_template(&make_geno(), &make_org(), &translator).unwrap();
    workbook.save(&path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(read_excel(&bytes).unwrap().len(), 2);
}
