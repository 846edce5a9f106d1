//! assetlsp - evaluate dynamic values and conditions against asset files
//!
//! Usage:
//!   assetlsp --schema schema.json --root Assets eval Assets/Rifle/Rifle.dat "=MUL(@Health 2)"
//!   assetlsp check Assets/Rifle/Rifle.dat '{"Variable":"Health","Operation":"gt","Comparand":50}'
//!   assetlsp format '[{"And":"Uniform_Scale","Value":2},{"Value":1}]' --type Float32
//!   assetlsp show Assets/Rifle/Rifle.dat

mod config;
mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use assetlsp_values::json::{condition_from_json, value_from_json, value_to_json};
use assetlsp_values::{DynamicValue, Evaluated, PropertyType, SchemaProperty, SourceFile};
use assetlsp_workspace::{AssetDocument, Project, SchemaDatabase};
use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;

use crate::config::{Overrides, Settings};

#[derive(Parser, Debug)]
#[command(name = "assetlsp", version, about = "Evaluate dynamic values in asset files")]
struct Cli {
    /// Schema JSON (or set ASSETLSP_SCHEMA)
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Directory indexed for cross references (or set ASSETLSP_ROOT)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Log level, e.g. debug
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a value in the context of an asset file.
    Eval {
        file: PathBuf,
        /// Value text, e.g. `=ADD(@Health 1)` or `@($cr$::SupplyAsset::Amount)`
        value: String,
        /// Expected value type, a scalar kind or a schema enum
        #[arg(long = "type")]
        type_name: Option<String>,
        /// Evaluate as the value of this property of the file
        #[arg(long)]
        property: Option<String>,
    },
    /// Evaluate a JSON condition in the context of an asset file.
    Check { file: PathBuf, condition: String },
    /// Parse a value (text or JSON) and print both written forms.
    Format {
        value: String,
        #[arg(long = "type")]
        type_name: Option<String>,
    },
    /// Print the effective value of every property of an asset file.
    Show { file: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(&Overrides {
        schema: cli.schema.clone(),
        root: cli.root.clone(),
        log_level: cli.log_level.clone(),
        log_json: cli.log_json,
    })?;
    logging::init_logging(&settings.logging).context("Failed to initialize logging")?;

    match cli.command {
        Command::Eval {
            file,
            value,
            type_name,
            property,
        } => {
            let project = load_project(&settings)?;
            eval(&project, &file, &value, type_name.as_deref(), property.as_deref())
        }
        Command::Check { file, condition } => {
            let project = load_project(&settings)?;
            check(&project, &file, &condition)
        }
        Command::Format { value, type_name } => {
            let schema = match &settings.schema {
                Some(path) => Some(SchemaDatabase::load(path).context("Failed to load schema")?),
                None => None,
            };
            format_value(schema.as_ref(), &value, type_name.as_deref())
        }
        Command::Show { file } => {
            let project = load_project(&settings)?;
            show(&project, &file)
        }
    }
}

fn load_project(settings: &Settings) -> Result<Project> {
    let schema = settings.schema()?;
    let project = Project::load(
        schema,
        settings.root.as_deref(),
        settings.workspace.cache_capacity,
    )
    .with_context(|| format!("Failed to load project from {}", schema.display()))?
    .with_max_cross_reference_depth(settings.evaluation.max_cross_reference_depth);

    tracing::info!(
        schema = %schema.display(),
        types = project.schema().len(),
        files = project.discovery().len(),
        "Project loaded"
    );
    Ok(project)
}

fn open(project: &Project, file: &Path) -> Result<Arc<AssetDocument>> {
    project
        .open(file)
        .with_context(|| format!("Failed to read {}", file.display()))
}

fn resolve_type(schema: Option<&SchemaDatabase>, name: &str) -> Result<PropertyType> {
    match schema {
        Some(schema) => Ok(schema.property_type(name)?),
        None => assetlsp_values::ValueKind::from_name(name)
            .map(PropertyType::from)
            .with_context(|| format!("Unknown type '{}'; enums need a schema", name)),
    }
}

/// Text values are parsed as value text, anything else as JSON.
fn parse_value(text: &str, expected: Option<&PropertyType>) -> Result<DynamicValue> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        let json: JsonValue = serde_json::from_str(text).context("Invalid JSON value")?;
        return Ok(value_from_json(&json, expected)?);
    }
    DynamicValue::parse(text, expected).with_context(|| format!("Invalid value '{}'", text))
}

fn eval(
    project: &Project,
    file: &Path,
    text: &str,
    type_name: Option<&str>,
    property: Option<&str>,
) -> Result<()> {
    let document = open(project, file)?;
    let file: &dyn SourceFile = &*document;

    let (ctx, property_type) = match property {
        Some(key) => {
            let ty = project.property(file, key)?.property_type().clone();
            (project.property_context(file, key)?, Some(ty))
        }
        None => (project.context(file), None),
    };
    let expected = match type_name {
        Some(name) => Some(resolve_type(Some(project.schema()), name)?),
        None => property_type,
    };

    let value = parse_value(text, expected.as_ref())?;
    let result = match &expected {
        Some(ty) => value.try_evaluate_value(&ctx, ty)?,
        None => value.try_evaluate_boxed(&ctx),
    };
    println!("{}", describe(result));
    Ok(())
}

fn check(project: &Project, file: &Path, text: &str) -> Result<()> {
    let json: JsonValue = serde_json::from_str(text).context("Invalid JSON condition")?;
    let condition = condition_from_json(&json)?;
    let document = open(project, file)?;
    let ctx = project.context(&*document);
    let met = condition.evaluate(&ctx);
    tracing::debug!(%condition, met, "Evaluated condition");
    println!("{}", met);
    Ok(())
}

fn format_value(schema: Option<&SchemaDatabase>, text: &str, type_name: Option<&str>) -> Result<()> {
    let expected = type_name.map(|name| resolve_type(schema, name)).transpose()?;
    let value = parse_value(text, expected.as_ref())?;
    println!("{}", value);
    println!("{}", serde_json::to_string_pretty(&value_to_json(&value)?)?);
    Ok(())
}

fn show(project: &Project, file: &Path) -> Result<()> {
    let document = open(project, file)?;
    let Some(type_name) = document.type_name() else {
        bail!("{} declares no Type", file.display());
    };
    let ty = project
        .schema()
        .get(type_name)
        .with_context(|| format!("Unknown type '{}'", type_name))?;

    println!("{} ({})", document.asset_name().unwrap_or_default(), type_name);
    for property in ty.properties().iter().chain(ty.localization()) {
        let value = project.property_value(&*document, property.key())?;
        println!("  {} = {}", property.key(), describe(value));
    }
    Ok(())
}

fn describe(result: Option<Evaluated>) -> String {
    match result {
        Some(Evaluated::Value(scalar)) => scalar.to_string(),
        Some(Evaluated::Null) => "null".to_string(),
        None => "<unresolved>".to_string(),
    }
}
