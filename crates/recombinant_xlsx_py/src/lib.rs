use pyo3::exceptions::{PyOSError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyBytes, PyDict, PyFloat, PyList, PyString};
use recombinant_xlsx::{
    EnumCellValue, RecombinantError, RecombinantResult, SpecChromo, SpecGeno, SpecOrganization,
    SpecRecombinantConfig, SpecSheetUpload, Translator, excel_data_dictionary, excel_template,
    read_excel,
};

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "recombinant.xlsx.v1";
const C_BRIDGE_TRANSPORT: &str = "rust_native";

fn map_recombinant_error(exception: RecombinantError) -> PyErr {
    match exception {
        RecombinantError::Io(err) => PyOSError::new_err(err.to_string()),
        RecombinantError::Xlsx(_)
        | RecombinantError::Read(_)
        | RecombinantError::IndexOverflow { .. } => PyRuntimeError::new_err(exception.to_string()),
        RecombinantError::Json(_)
        | RecombinantError::Yaml(_)
        | RecombinantError::UnsupportedFormat(_)
        | RecombinantError::UnknownDatastoreType { .. }
        | RecombinantError::NoResources(_)
        | RecombinantError::ResourceNotFound(_)
        | RecombinantError::InvalidUpload(_) => PyValueError::new_err(exception.to_string()),
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(value: &str, what: &str) -> PyResult<T> {
    serde_json::from_str(value)
        .map_err(|err| PyValueError::new_err(format!("Invalid {what} JSON: {err}")))
}

fn parse_config(config_json: Option<&str>) -> PyResult<SpecRecombinantConfig> {
    match config_json {
        Some(value) => parse_json(value, "config"),
        None => Ok(SpecRecombinantConfig::default()),
    }
}

fn convert_cell_to_py<'py>(py: Python<'py>, value: &EnumCellValue) -> Bound<'py, PyAny> {
    match value {
        EnumCellValue::None => py.None().into_bound(py),
        EnumCellValue::String(s) => PyString::new(py, s).into_any(),
        EnumCellValue::Number(n) => PyFloat::new(py, *n).into_any(),
        EnumCellValue::Boolean(b) => PyBool::new(py, *b).to_owned().into_any(),
        EnumCellValue::DateTime(dt) => {
            PyString::new(py, &dt.format("%Y-%m-%dT%H:%M:%S").to_string()).into_any()
        }
    }
}

fn convert_upload_to_py<'py>(
    py: Python<'py>,
    upload: &SpecSheetUpload,
) -> PyResult<Bound<'py, PyDict>> {
    let dict_upload = PyDict::new(py);
    dict_upload.set_item("sheet_name", &upload.sheet_name)?;
    dict_upload.set_item("org_name", &upload.org_name)?;
    dict_upload.set_item("datastore_ids", &upload.datastore_ids)?;

    let l_rows = PyList::empty(py);
    for row in &upload.rows {
        let l_values = PyList::empty(py);
        for value in row {
            l_values.append(convert_cell_to_py(py, value))?;
        }
        l_rows.append(l_values)?;
    }
    dict_upload.set_item("rows", l_rows)?;
    Ok(dict_upload)
}

#[pyfunction(name = "excel_template")]
#[pyo3(signature = (geno_json, org_json, lang = None, config_json = None))]
fn excel_template_py<'py>(
    py: Python<'py>,
    geno_json: &str,
    org_json: &str,
    lang: Option<&str>,
    config_json: Option<&str>,
) -> PyResult<Bound<'py, PyBytes>> {
    let geno: SpecGeno = parse_json(geno_json, "geno")?;
    let org: SpecOrganization = parse_json(org_json, "organization")?;
    let config = parse_config(config_json)?;
    let translator = Translator::new(lang.unwrap_or(&config.locale_default), &config);

    let bytes = py.allow_threads(|| -> RecombinantResult<Vec<u8>> {
        excel_template(&geno, &org, &translator)?.save_to_buffer()
    });
    let bytes = bytes.map_err(map_recombinant_error)?;
    Ok(PyBytes::new(py, &bytes))
}

#[pyfunction(name = "excel_data_dictionary")]
#[pyo3(signature = (chromo_json, config_json = None))]
fn excel_data_dictionary_py<'py>(
    py: Python<'py>,
    chromo_json: &str,
    config_json: Option<&str>,
) -> PyResult<Bound<'py, PyBytes>> {
    let chromo: SpecChromo = parse_json(chromo_json, "resource")?;
    let config = parse_config(config_json)?;
    let translator = Translator::new(&config.locale_default, &config);

    let bytes = py.allow_threads(|| -> RecombinantResult<Vec<u8>> {
        excel_data_dictionary(&chromo, &config.locales_offered, &translator)?.save_to_buffer()
    });
    let bytes = bytes.map_err(map_recombinant_error)?;
    Ok(PyBytes::new(py, &bytes))
}

#[pyfunction(name = "read_excel")]
fn read_excel_py<'py>(py: Python<'py>, data: &[u8]) -> PyResult<Bound<'py, PyList>> {
    let l_uploads = py.allow_threads(|| read_excel(data));
    let l_uploads = l_uploads.map_err(map_recombinant_error)?;

    let l_py_uploads = PyList::empty(py);
    for upload in &l_uploads {
        l_py_uploads.append(convert_upload_to_py(py, upload)?)?;
    }
    Ok(l_py_uploads)
}

#[pymodule]
fn _recombinant_xlsx_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_function(wrap_pyfunction!(excel_template_py, module)?)?;
    module.add_function(wrap_pyfunction!(excel_data_dictionary_py, module)?)?;
    module.add_function(wrap_pyfunction!(read_excel_py, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
