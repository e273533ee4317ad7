//! recombinant-xlsx: build data-entry templates and data dictionaries, read
//! filled templates back.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use recombinant_xlsx::{
    EnumCellValue, SpecGeno, SpecRecombinantConfig, SpecSheetUpload, Translator,
    excel_data_dictionary, excel_template, find_upload_chromo, get_records, load_config,
    load_geno, load_organization, read_excel, validate_upload,
};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "recombinant-xlsx")]
#[command(author, version, about = "Data-entry XLSX templates for recombinant datasets")]
struct Cli {
    /// Configuration file (JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Offered locales, overriding the configuration (e.g. `en,fr`)
    #[arg(long, global = true, value_delimiter = ',')]
    locales: Option<Vec<String>>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the data-entry template of a dataset type for one organization
    Template {
        /// Dataset type definition (JSON or YAML)
        #[arg(long)]
        geno: PathBuf,

        /// Organization (JSON or YAML)
        #[arg(long)]
        org: PathBuf,

        /// Template language (default: configured default locale)
        #[arg(long)]
        lang: Option<String>,

        /// Output XLSX file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Build the multi-language data dictionary of one resource
    Dictionary {
        /// Dataset type definition (JSON or YAML)
        #[arg(long)]
        geno: PathBuf,

        /// Resource name
        #[arg(long)]
        resource: String,

        /// Output XLSX file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Read a filled template and print its rows as JSON
    Read {
        /// Filled XLSX file
        input: PathBuf,

        /// Dataset type definition; rows are typed and keyed by field id
        #[arg(long)]
        geno: Option<PathBuf>,

        /// Organization expected on every sheet (requires --geno)
        #[arg(long, requires = "geno")]
        org: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = derive_config(cli.config.as_deref(), cli.locales)?;

    match cli.command {
        Commands::Template {
            geno,
            org,
            lang,
            output,
        } => run_template(&geno, &org, lang.as_deref(), &output, &config),
        Commands::Dictionary {
            geno,
            resource,
            output,
        } => run_dictionary(&geno, &resource, &output, &config),
        Commands::Read { input, geno, org } => {
            let value = run_read(&input, geno.as_deref(), org.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let c_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(c_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn derive_config(
    path: Option<&Path>,
    locales: Option<Vec<String>>,
) -> Result<SpecRecombinantConfig> {
    let mut config = match path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => SpecRecombinantConfig::default(),
    };
    if let Some(l_locales) = locales {
        config.locales_offered = l_locales;
    }
    Ok(config)
}

fn derive_geno(path: &Path) -> Result<SpecGeno> {
    load_geno(path).with_context(|| format!("Failed to load dataset type '{}'", path.display()))
}

fn run_template(
    geno_path: &Path,
    org_path: &Path,
    lang: Option<&str>,
    output: &Path,
    config: &SpecRecombinantConfig,
) -> Result<()> {
    let geno = derive_geno(geno_path)?;
    let org = load_organization(org_path)
        .with_context(|| format!("Failed to load organization '{}'", org_path.display()))?;
    let translator = Translator::new(lang.unwrap_or(&config.locale_default), config);

    let mut workbook = excel_template(&geno, &org, &translator)
        .with_context(|| format!("Failed to build template for '{}'", geno.dataset_type))?;
    workbook
        .save(output)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;

    info!(output = %output.display(), "template written");
    Ok(())
}

fn run_dictionary(
    geno_path: &Path,
    resource: &str,
    output: &Path,
    config: &SpecRecombinantConfig,
) -> Result<()> {
    let geno = derive_geno(geno_path)?;
    let chromo = geno.get_chromo(resource)?;
    if config.locales_offered.is_empty() {
        bail!("No locales offered; pass --locales or set locales_offered");
    }
    let translator = Translator::new(&config.locale_default, config);

    let mut workbook = excel_data_dictionary(chromo, &config.locales_offered, &translator)
        .with_context(|| format!("Failed to build data dictionary for '{resource}'"))?;
    workbook
        .save(output)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;

    info!(output = %output.display(), "data dictionary written");
    Ok(())
}

fn run_read(input: &Path, geno_path: Option<&Path>, org_path: Option<&Path>) -> Result<Value> {
    let bytes =
        std::fs::read(input).with_context(|| format!("Failed to read '{}'", input.display()))?;
    let l_uploads = read_excel(&bytes)
        .with_context(|| format!("Failed to parse '{}'", input.display()))?;

    let Some(geno_path) = geno_path else {
        return Ok(Value::Array(l_uploads.iter().map(convert_upload_to_json).collect()));
    };

    let geno = derive_geno(geno_path)?;
    let org = match org_path {
        Some(path) => Some(
            load_organization(path)
                .with_context(|| format!("Failed to load organization '{}'", path.display()))?,
        ),
        None => None,
    };

    let mut dict_records = serde_json::Map::new();
    for upload in &l_uploads {
        let chromo = match &org {
            Some(org) => validate_upload(upload, &geno, org)?,
            None => find_upload_chromo(upload, &geno)?,
        };
        let l_records: Vec<BTreeMap<String, Value>> = get_records(upload, chromo)?;
        dict_records.insert(upload.sheet_name.clone(), serde_json::to_value(l_records)?);
    }
    Ok(Value::Object(dict_records))
}

fn convert_upload_to_json(upload: &SpecSheetUpload) -> Value {
    let l_rows: Vec<Value> = upload
        .rows
        .iter()
        .map(|row| Value::Array(row.iter().map(convert_cell_to_json).collect()))
        .collect();

    serde_json::json!({
        "sheet_name": upload.sheet_name,
        "org_name": upload.org_name,
        "datastore_ids": upload.datastore_ids,
        "rows": l_rows,
    })
}

fn convert_cell_to_json(value: &EnumCellValue) -> Value {
    match value {
        EnumCellValue::None => Value::Null,
        EnumCellValue::String(s) => Value::String(s.clone()),
        EnumCellValue::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
        EnumCellValue::Boolean(b) => Value::Bool(*b),
        EnumCellValue::DateTime(dt) => Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
    }
}
