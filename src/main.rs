//! tablectl - Entry Point

use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tablectl::cli::{parse_filter, parse_flag, parse_id, parse_range, parse_sort};
use tablectl::config::{self, ResolvedConfig};
use tablectl::logging;
use tablectl::model::{AppError, DynRecord, RecordKey, ValidationError};
use tablectl::source::{load_records, JsonLinesExporter, MemorySource};
use tablectl::state::{
    Capabilities, Effect, ExportReceipt, FilterValue, SortSpec, TableController,
};
use tablectl::view::{dyn_columns, render_table};
use tracing::{info, warn};

/// tablectl - search, sort, filter and page through a JSON Lines record file
#[derive(Parser, Debug)]
#[command(name = "tablectl")]
#[command(version)]
#[command(about = "Search, sort, filter, page and bulk-act on a JSON Lines record file")]
pub struct Args {
    /// Path to JSON Lines record file (one object with an `id` per line)
    pub file: PathBuf,

    /// Case-insensitive substring search over the searchable fields
    #[arg(short, long)]
    pub search: Option<String>,

    /// Sort column, optionally with direction: FIELD[:asc|:desc]
    #[arg(long, value_parser = parse_sort)]
    pub sort: Option<SortSpec>,

    /// Equality or membership filter: KEY=VALUE[,VALUE..] (repeatable)
    #[arg(long, value_parser = parse_filter)]
    pub filter: Vec<(String, FilterValue)>,

    /// Inclusive range filter: KEY=FROM..TO, either side optional (repeatable)
    #[arg(long, value_parser = parse_range)]
    pub range: Vec<(String, FilterValue)>,

    /// Boolean filter: KEY=true|false (repeatable)
    #[arg(long, value_parser = parse_flag)]
    pub flag: Vec<(String, FilterValue)>,

    /// Page to show (1-based; clamped to the last page)
    #[arg(short, long, default_value = "1")]
    pub page: usize,

    /// Rows per page
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Fields the search matches against (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub searchable: Vec<String>,

    /// Columns to print (comma-separated; default: id then every field)
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Select records by id
    #[arg(long, num_args = 1.., value_parser = parse_id)]
    pub select: Vec<RecordKey>,

    /// Toggle selection of every row on the shown page
    #[arg(long)]
    pub select_page: bool,

    /// Delete the selected records
    #[arg(long)]
    pub delete: bool,

    /// Export the selected records with this justification
    #[arg(long, value_name = "JUSTIFICATION")]
    pub export: Option<String>,

    /// Write the export to this file instead of stdout
    #[arg(long, requires = "export")]
    pub output: Option<PathBuf>,

    /// Deny bulk actions
    #[arg(long)]
    pub read_only: bool,

    /// Page through an in-memory backend instead of filtering locally
    #[arg(long)]
    pub remote: bool,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Load configuration with full precedence chain:
/// Defaults → Config File → Env Vars → CLI Args
fn resolve_config(args: &Args) -> Result<ResolvedConfig, AppError> {
    let config_file = config::load_config_with_precedence(args.config.clone())?;
    let merged = config::merge_config(config_file);
    let with_env = config::apply_env_overrides(merged);
    let searchable_override = (!args.searchable.is_empty()).then(|| args.searchable.clone());
    Ok(config::apply_cli_overrides(
        with_env,
        args.page_size,
        searchable_override,
    ))
}

/// Apply the query flags. Returns the latest effect; earlier fetches are
/// already stale.
fn apply_query(
    controller: &mut TableController<DynRecord>,
    args: &Args,
) -> Result<Effect, AppError> {
    let mut effects = Vec::new();
    if let Some(term) = &args.search {
        effects.push(controller.set_search(term.as_str()));
    }
    if let Some(spec) = &args.sort {
        effects.push(controller.set_sort(spec.field.as_str(), spec.direction));
    }
    for (key, value) in args.filter.iter().chain(&args.range).chain(&args.flag) {
        effects.push(controller.set_filter(key.as_str(), value.clone()));
    }
    effects.push(controller.set_page(args.page)?);
    Ok(effects
        .into_iter()
        .rfind(|effect| !effect.is_none())
        .unwrap_or(Effect::None))
}

fn apply_selection(controller: &mut TableController<DynRecord>, args: &Args) {
    for id in &args.select {
        if controller.is_selected(id) {
            continue;
        }
        if !controller.toggle(id.clone()) {
            warn!(%id, "cannot select id");
            eprintln!("warning: no selectable record with id {id}");
        }
    }
    if args.select_page {
        controller.toggle_page();
    }
}

fn export_selection(
    controller: &mut TableController<DynRecord>,
    justification: &str,
    caps: &Capabilities,
    output: Option<&Path>,
) -> Result<ExportReceipt, AppError> {
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    let mut exporter = JsonLinesExporter::new(writer);
    Ok(controller.export_selected(&mut exporter, justification, caps)?)
}

fn run(args: Args) -> Result<(), AppError> {
    if args.page_size == Some(0) {
        return Err(ValidationError::PageSizeZero.into());
    }
    let config = resolve_config(&args)?;

    if let Err(err) = logging::init(&config.log_file_path) {
        let _ = logging::init_stderr();
        warn!(error = %err, "file logging unavailable, logging to stderr");
    }

    info!(
        config = ?config,
        "Configuration loaded and resolved"
    );

    let records = load_records(&args.file)?;
    let columns = if args.columns.is_empty() {
        dyn_columns(&records)
    } else {
        args.columns.clone()
    };

    let mut backend = MemorySource::new(records.clone(), config.searchable_fields.clone());
    let options = config.table_options();
    let mut controller = if args.remote {
        TableController::remote(options)
    } else {
        TableController::local(records, options)
    };

    let effect = apply_query(&mut controller, &args)?;
    let effect = if controller.is_remote() && effect.is_none() {
        controller.refresh()
    } else {
        effect
    };
    controller.run_effect(effect, &mut backend)?;

    apply_selection(&mut controller, &args);
    let caps = if args.read_only {
        Capabilities::read_only()
    } else {
        Capabilities::all()
    };

    if let Some(justification) = &args.export {
        let receipt =
            export_selection(&mut controller, justification, &caps, args.output.as_deref())?;
        eprintln!("exported {} record(s)", receipt.exported);
    }

    if args.delete {
        let (report, effect) = controller.delete_selected(&mut backend, &caps)?;
        controller.run_effect(effect, &mut backend)?;
        eprintln!("deleted {} record(s)", report.removed.len());
        if report.is_partial() {
            let failed: Vec<String> = report.failed.iter().map(ToString::to_string).collect();
            eprintln!("failed to delete: {}", failed.join(", "));
        }
    }

    let rows = controller.rows();
    let table = render_table(&rows, &columns, &controller.page_info(), |id| {
        controller.is_selected(id)
    });
    let mut out = io::stdout().lock();
    writeln!(out, "{}", table)?;
    out.flush()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    run(args)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tablectl::model::FieldValue;
    use tablectl::state::SortDirection;

    #[test]
    fn test_help_does_not_error() {
        // Help returns Err with DisplayHelp, which is success
        let result = Args::try_parse_from(["tablectl", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_does_not_error() {
        let result = Args::try_parse_from(["tablectl", "--version"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_file_is_required() {
        let result = Args::try_parse_from(["tablectl"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["tablectl", "records.jsonl"]);
        assert_eq!(args.file, PathBuf::from("records.jsonl"));
        assert_eq!(args.search, None);
        assert_eq!(args.sort, None);
        assert!(args.filter.is_empty());
        assert_eq!(args.page, 1);
        assert_eq!(args.page_size, None);
        assert!(args.select.is_empty());
        assert!(!args.delete);
        assert_eq!(args.export, None);
        assert!(!args.remote);
        assert_eq!(args.config, None);
    }

    #[test]
    fn test_sort_and_filters_parse() {
        let args = Args::parse_from([
            "tablectl",
            "records.jsonl",
            "--sort",
            "price:desc",
            "--filter",
            "status=active,pending",
            "--flag",
            "archived=false",
            "--range",
            "price=10..20",
        ]);

        let sort = args.sort.expect("sort parsed");
        assert_eq!(sort.field, "price");
        assert_eq!(sort.direction, SortDirection::Descending);
        assert_eq!(
            args.filter,
            vec![(
                "status".to_string(),
                FilterValue::OneOf(vec![
                    FieldValue::text("active"),
                    FieldValue::text("pending")
                ])
            )]
        );
        assert_eq!(
            args.flag,
            vec![("archived".to_string(), FilterValue::Flag(false))]
        );
        assert_eq!(args.range.len(), 1);
    }

    #[test]
    fn test_invalid_sort_direction_is_rejected() {
        let result = Args::try_parse_from(["tablectl", "r.jsonl", "--sort", "name:up"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_select_takes_many_ids() {
        let args = Args::parse_from(["tablectl", "r.jsonl", "--select", "3", "7", "sku-1"]);
        assert_eq!(
            args.select,
            vec![
                RecordKey::Int(3),
                RecordKey::Int(7),
                RecordKey::Str("sku-1".to_string())
            ]
        );
    }

    #[test]
    fn test_output_requires_export() {
        let result = Args::try_parse_from(["tablectl", "r.jsonl", "--output", "out.jsonl"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_searchable_is_comma_separated() {
        let args = Args::parse_from(["tablectl", "r.jsonl", "--searchable", "name,email"]);
        assert_eq!(args.searchable, vec!["name", "email"]);
    }

    #[test]
    fn test_apply_query_returns_latest_fetch_in_remote_mode() {
        let args = Args::parse_from([
            "tablectl",
            "r.jsonl",
            "--search",
            "acme",
            "--sort",
            "name",
            "--page",
            "2",
        ]);
        let mut controller = TableController::<DynRecord>::remote(Default::default());

        let effect = apply_query(&mut controller, &args).unwrap();

        let Effect::Fetch(request) = effect else {
            panic!("expected a fetch");
        };
        assert_eq!(request.token.get(), 3);
        assert_eq!(request.query.search_term(), "acme");
        assert_eq!(request.query.page_index(), 2);
    }

    #[test]
    fn test_apply_query_rejects_page_zero() {
        let args = Args::parse_from(["tablectl", "r.jsonl", "--page", "0"]);
        let mut controller = TableController::<DynRecord>::local(Vec::new(), Default::default());

        let err = apply_query(&mut controller, &args).unwrap_err();

        assert!(matches!(
            err,
            AppError::Validation(ValidationError::PageIndexOutOfRange(0))
        ));
    }
}
