use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use lmswiki_core::catalog::{ItemCatalog, allows_ambiguous_lookup, load_catalog};
use lmswiki_core::compare::compare_records;
use lmswiki_core::config::LmsConfig;
use lmswiki_core::coverage::coverage_report;
use lmswiki_core::output::{DryRunSink, FsPageWriter, PageSink, list_generated_pages};
use lmswiki_core::overrides::{load_item_names, load_override_table};
use lmswiki_core::pipeline::{BatchEvent, BatchReport, ErrorPolicy, prepare_variant, run_batch};
use lmswiki_core::render::{load_template, render_fields};
use lmswiki_core::runtime::{
    InitOptions, PathOverrides, ResolutionContext, ResolvedPaths, ensure_catalog_available,
    init_layout, inspect_runtime, normalize_for_display, resolve_paths,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    name = "lmswiki",
    version,
    about = "Generate Last Man Standing item pages for the OSRS wiki"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    project_root: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH", help = "Item catalog JSON dump")]
    catalog: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    output_dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved runtime diagnostics")]
    diagnostics: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    project_root: Option<PathBuf>,
    config: Option<PathBuf>,
    catalog: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            project_root: cli.project_root.clone(),
            config: cli.config.clone(),
            catalog: cli.catalog.clone(),
            output_dir: cli.output_dir.clone(),
            diagnostics: cli.diagnostics,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Create the project layout and a default config")]
    Init(InitArgs),
    #[command(about = "Render and write every LMS page in the override table")]
    Generate(GenerateArgs),
    #[command(about = "Report which LMS items still lack a wiki page")]
    Coverage,
    #[command(about = "Print the derived and enriched fields for one item")]
    Show(ShowArgs),
    #[command(about = "Print the fields that differ between two catalog items")]
    Compare(CompareArgs),
    #[command(about = "Show resolved paths and runtime warnings")]
    Status,
}

#[derive(Debug, Args)]
struct InitArgs {
    #[arg(long, help = "Write templates/ with the default page template")]
    templates: bool,
    #[arg(long, help = "Overwrite existing config/template files")]
    force: bool,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[arg(long, value_name = "NAME", help = "Only generate the named item (repeatable)")]
    only: Vec<String>,
    #[arg(long, help = "Render pages without writing files")]
    dry_run: bool,
    #[arg(long, help = "Skip items with bad data instead of aborting")]
    keep_going: bool,
}

#[derive(Debug, Args)]
struct ShowArgs {
    name: String,
}

#[derive(Debug, Args)]
struct CompareArgs {
    left: u32,
    right: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let runtime = RuntimeOptions::from_cli(&cli);

    match cli.command {
        Some(Commands::Init(args)) => run_init(&runtime, args),
        Some(Commands::Generate(args)) => run_generate(&runtime, args),
        Some(Commands::Coverage) => run_coverage(&runtime),
        Some(Commands::Show(ShowArgs { name })) => run_show(&runtime, &name),
        Some(Commands::Compare(CompareArgs { left, right })) => {
            run_compare(&runtime, left, right)
        }
        Some(Commands::Status) => run_status(&runtime),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn run_init(runtime: &RuntimeOptions, args: InitArgs) -> Result<()> {
    let (paths, _) = resolve_runtime_paths(runtime)?;
    let report = init_layout(
        &paths,
        &InitOptions {
            include_templates: args.templates,
            force: args.force,
        },
    )?;

    println!("Initialized lmswiki project layout");
    println!("project_root: {}", normalize_for_display(&paths.project_root));
    println!("output_dir: {}", normalize_for_display(&paths.output_dir));
    println!("templates: {}", normalize_for_display(&paths.templates_dir));
    println!("config_path: {}", normalize_for_display(&paths.config_path));
    println!("catalog_path: {}", normalize_for_display(&paths.catalog_path));
    println!("created_dirs: {}", report.created_dirs.len());
    println!("wrote_config: {}", report.wrote_config);
    println!("wrote_template: {}", report.wrote_template);
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn run_generate(runtime: &RuntimeOptions, args: GenerateArgs) -> Result<()> {
    let (paths, config) = resolve_runtime_paths(runtime)?;
    ensure_catalog_available(&paths)?;
    let policy = if args.keep_going {
        ErrorPolicy::Skip
    } else {
        config.error_policy()?
    };

    let table = load_override_table(paths.overrides_path.as_deref())?;
    let table = if args.only.is_empty() {
        table
    } else {
        let (selected, unknown) = table.select(&args.only);
        if !unknown.is_empty() {
            bail!("not in the override table: {}", unknown.join(", "));
        }
        selected
    };
    let template = load_template(&paths.templates_dir, config.template_name())?;
    let catalog = load_catalog(&paths.catalog_path)?;

    println!("generate");
    println!("catalog_items: {}", catalog.len());
    println!("override_entries: {}", table.len());
    println!("template: {}", template.name());
    println!("output_dir: {}", normalize_for_display(&paths.output_dir));
    println!("on_error: {}", policy.as_str());
    println!("dry_run: {}", args.dry_run);

    let mut sink: Box<dyn PageSink> = if args.dry_run {
        Box::new(DryRunSink::new(&paths.output_dir))
    } else {
        Box::new(FsPageWriter::new(&paths.output_dir))
    };
    let report = run_batch(
        &catalog,
        &table,
        &template,
        sink.as_mut(),
        policy,
        print_batch_event,
    )?;

    print_batch_summary(&report);
    print_diagnostics(runtime, &paths);
    if !report.failures.is_empty() {
        bail!("{} item(s) skipped due to errors", report.failures.len());
    }
    Ok(())
}

fn print_batch_event(event: BatchEvent<'_>) {
    match event {
        BatchEvent::Generated(page) => {
            let state = match (page.write.written, page.write.changed) {
                (false, _) => "rendered",
                (true, true) => "written",
                (true, false) => "unchanged",
            };
            println!(
                "page: {} -> {} ({state}{})",
                page.name,
                normalize_for_display(&page.write.path),
                if page.clamped {
                    ", release date clamped"
                } else {
                    ""
                }
            );
        }
        BatchEvent::Skipped(failure) => {
            println!("skipped: {} ({})", failure.name, failure.message);
        }
    }
}

fn print_batch_summary(report: &BatchReport) {
    let changed = report
        .generated
        .iter()
        .filter(|page| page.write.changed)
        .count();
    println!("generated.count: {}", report.generated.len());
    println!("generated.changed: {changed}");
    println!(
        "generated.clamped_dates: {}",
        report.generated.iter().filter(|page| page.clamped).count()
    );
    println!("skipped.count: {}", report.failures.len());
}

fn run_coverage(runtime: &RuntimeOptions) -> Result<()> {
    let (paths, _) = resolve_runtime_paths(runtime)?;
    ensure_catalog_available(&paths)?;
    let catalog = load_catalog(&paths.catalog_path)?;
    let table = load_override_table(paths.overrides_path.as_deref())?;
    let names = load_item_names(paths.item_names_path.as_deref())?;
    let generated = list_generated_pages(&paths.output_dir)?;
    let report = coverage_report(&catalog, &names, &table, generated);

    println!("coverage");
    println!("listed_items: {}", names.len());
    println!("existing_pages.count: {}", report.existing_pages.len());
    println!("missing.count: {}", report.missing.len());
    println!(
        "missing.with_override: {}",
        report.missing_with_override.len()
    );
    for name in &report.missing_without_override {
        println!("missing.no_override: {name}");
    }
    for name in &report.unlisted_overrides {
        println!("override.unlisted: {name}");
    }
    if report.generated.is_empty() {
        println!("generated: <none>");
    } else {
        println!("generated.count: {}", report.generated.len());
    }
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn run_show(runtime: &RuntimeOptions, name: &str) -> Result<()> {
    let (paths, _) = resolve_runtime_paths(runtime)?;
    ensure_catalog_available(&paths)?;
    let table = load_override_table(paths.overrides_path.as_deref())?;
    let catalog = load_catalog(&paths.catalog_path)?;

    let Some(partial) = table.get(name) else {
        let base = catalog.lookup_by_name(name, allows_ambiguous_lookup(name))?;
        println!("{}", serde_json::to_string_pretty(base)?);
        println!("note: `{name}` has no override entry; showing the catalog record");
        return Ok(());
    };
    let prepared = prepare_variant(&catalog, name, partial)?;
    let fields = render_fields(&prepared.record, &prepared.fields)?;
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}

fn run_compare(runtime: &RuntimeOptions, left: u32, right: u32) -> Result<()> {
    let (paths, _) = resolve_runtime_paths(runtime)?;
    ensure_catalog_available(&paths)?;
    let catalog = load_catalog(&paths.catalog_path)?;
    let left_record = catalog.lookup_by_id(left)?;
    let right_record = catalog.lookup_by_id(right)?;

    println!(
        "compare {left} ({}) {right} ({})",
        left_record.wiki_name, right_record.wiki_name
    );
    let differences = compare_records(left_record, right_record)?;
    if differences.is_empty() {
        println!("differences: <none>");
    }
    for difference in differences {
        println!(
            "{}: {} -> {}",
            difference.field, difference.left, difference.right
        );
    }
    Ok(())
}

fn run_status(runtime: &RuntimeOptions) -> Result<()> {
    let (paths, config) = resolve_runtime_paths(runtime)?;
    let status = inspect_runtime(&paths)?;

    println!("runtime status");
    println!("project_root: {}", normalize_for_display(&paths.project_root));
    println!(
        "project_root_exists: {}",
        format_flag(status.project_root_exists)
    );
    println!("state_dir_exists: {}", format_flag(status.state_dir_exists));
    println!("catalog_exists: {}", format_flag(status.catalog_exists));
    println!(
        "catalog_size_bytes: {}",
        status
            .catalog_size_bytes
            .map(|size| size.to_string())
            .unwrap_or_else(|| "n/a".to_string())
    );
    println!("templates_exists: {}", format_flag(status.templates_exists));
    println!("output_dir_exists: {}", format_flag(status.output_dir_exists));
    println!("config_exists: {}", format_flag(status.config_exists));
    println!("template: {}", config.template_name());
    println!("on_error: {}", config.error_policy()?.as_str());
    if !status.warnings.is_empty() {
        println!("warnings:");
        for warning in &status.warnings {
            println!("  - {warning}");
        }
    }
    print_diagnostics(runtime, &paths);
    Ok(())
}

fn resolve_runtime_paths(runtime: &RuntimeOptions) -> Result<(ResolvedPaths, LmsConfig)> {
    dotenvy::dotenv().ok();

    let context = ResolutionContext::from_process()?;
    let overrides = PathOverrides {
        project_root: runtime.project_root.clone(),
        config: runtime.config.clone(),
        catalog: runtime.catalog.clone(),
        output_dir: runtime.output_dir.clone(),
    };

    let (initial, _) = resolve_paths(&context, &overrides)?;
    let project_env = initial.project_root.join(".env");
    if project_env.exists() {
        let _ = dotenvy::from_path_override(&project_env);
    }

    let (paths, config) = resolve_paths(&context, &overrides)?;
    tracing::debug!(
        project_root = %normalize_for_display(&paths.project_root),
        root_source = paths.root_source.as_str(),
        catalog_source = paths.catalog_source.as_str(),
        "resolved runtime paths"
    );
    Ok((paths, config))
}

fn print_diagnostics(runtime: &RuntimeOptions, paths: &ResolvedPaths) {
    if runtime.diagnostics {
        println!("\n[diagnostics]\n{}", paths.diagnostics());
    }
}

fn format_flag(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
