//! Subcommand implementations.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use autoform_runtime::config::UiConfig;
use autoform_runtime::{render_text, TabularCollectionEngine};
use autoform_schema::{FieldPath, FlatTable, GridSchema, NormalizedField, SchemaIndex};
use serde_json::Value;

use crate::style;

pub struct GridArgs {
    pub schema: PathBuf,
    pub field: Option<String>,
    pub data: Option<PathBuf>,
    pub transpose: bool,
    pub order: Vec<String>,
}

fn load_schema(path: &Path) -> anyhow::Result<Arc<SchemaIndex>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read schema {}", path.display()))?;
    let index = SchemaIndex::parse(&text)
        .with_context(|| format!("invalid schema {}", path.display()))?;
    tracing::debug!(path = %path.display(), title = ?index.title(), "schema loaded");
    Ok(Arc::new(index))
}

fn load_json(path: &Path) -> anyhow::Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

pub fn run_fields(schema: &Path) -> anyhow::Result<()> {
    let index = load_schema(schema)?;
    let record = match index.root_record() {
        Some(record) => Arc::clone(record),
        None => Arc::clone(GridSchema::from_root(Arc::clone(&index))?.record()),
    };
    print!("{}", field_table(record.fields()));
    Ok(())
}

fn field_table(fields: &[NormalizedField]) -> String {
    let header = ["name", "title", "kind", "section", "width", "order"];
    let rows: Vec<[String; 6]> = fields
        .iter()
        .map(|field| {
            [
                field.name.to_string(),
                field.title.to_string(),
                field.kind.label(),
                field.section.as_deref().unwrap_or("-").to_string(),
                field
                    .width
                    .map_or_else(|| "-".to_string(), |width| width.to_string()),
                field.order_index.to_string(),
            ]
        })
        .collect();
    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let line = |cells: &[String]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        padded.join("  ").trim_end().to_string()
    };
    let header: Vec<String> = header.iter().map(ToString::to_string).collect();
    let mut out = style::header(&line(&header));
    out.push('\n');
    for row in &rows {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}

pub fn run_defaults(schema: &Path) -> anyhow::Result<()> {
    let index = load_schema(schema)?;
    println!("{}", serde_json::to_string_pretty(&index.default_value())?);
    Ok(())
}

pub fn run_validate(schema: &Path, value: &Path) -> anyhow::Result<()> {
    let index = load_schema(schema)?;
    let value = load_json(value)?;
    match index.conform(&value) {
        Ok(conformed) => {
            eprintln!("{}", style::valid("value is valid"));
            println!("{}", serde_json::to_string_pretty(&conformed)?);
            Ok(())
        }
        Err(err) => bail!("invalid value at {}: {}", err.path, err.message),
    }
}

pub fn run_grid(config: &UiConfig, args: &GridArgs) -> anyhow::Result<()> {
    let index = load_schema(&args.schema)?;
    let grid = match &args.field {
        Some(field) => GridSchema::at(Arc::clone(&index), &FieldPath::from_dotted(field))?,
        None => GridSchema::from_root(Arc::clone(&index))?,
    };
    let mut engine = TabularCollectionEngine::with_options(grid, &config.grid);
    if let Some(path) = &args.data {
        load_data(&mut engine, load_json(path)?)
            .with_context(|| format!("failed to load {}", path.display()))?;
    }
    if args.transpose {
        engine.set_transposed(true);
    }
    if !args.order.is_empty() {
        let names: Vec<&str> = args.order.iter().map(String::as_str).collect();
        engine.set_visible_columns(Some(&names))?;
    }
    print!("{}", render_text(&engine.view()));
    Ok(())
}

fn load_data(engine: &mut TabularCollectionEngine, data: Value) -> anyhow::Result<()> {
    if data.is_array() {
        let grid = engine.schema();
        let conformed = grid.schema().conform_field(grid.field(), &data, grid.path())?;
        let records = match conformed {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(record) => Some(record),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        engine.load(records);
        return Ok(());
    }
    let table: FlatTable = serde_json::from_value(data)
        .context("expected a list of records or a table with columns and rows")?;
    engine.load_table(&table)?;
    Ok(())
}
