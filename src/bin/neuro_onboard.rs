use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use neuro_onboard::backend::{QueueFields, SchedulerFields};
use neuro_onboard::catalog::{CatalogClient, CatalogHttpClient};
use neuro_onboard::config::ManifestLoader;
use neuro_onboard::domain::AssetReference;
use neuro_onboard::error::OnboardError;
use neuro_onboard::import::{ImportReconciler, ImportReport, ProgressSink};
use neuro_onboard::output::{JsonOutput, OutputMode, ResolveResult, TextProgress};
use neuro_onboard::registry::{
    App, AppDraft, AppRegistry, RESTART_NOTICE, find_app, save_app, validate_app,
};
use neuro_onboard::resolver::resolve_asset_url;
use neuro_onboard::store::Store;

#[derive(Parser)]
#[command(name = "neuro-onboard")]
#[command(about = "Import DANDI archive assets into projects and configure compute apps")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Import catalog assets into a project")]
    Import(ImportArgs),
    #[command(about = "Show which download URL an asset resolves to")]
    Resolve(ResolveArgs),
    #[command(about = "List files imported into a project")]
    Files(FilesArgs),
    #[command(about = "Manage apps of a compute resource")]
    Apps(AppsArgs),
}

#[derive(Args)]
struct ImportArgs {
    /// Assets as `[staging:]<dataset-id>/<version>/<asset-id>/<asset-path>`
    assets: Vec<String>,

    #[arg(long)]
    manifest: Option<String>,

    #[arg(long)]
    project: Option<String>,
}

#[derive(Args)]
struct ResolveArgs {
    asset: String,
}

#[derive(Args)]
struct FilesArgs {
    #[arg(long)]
    project: String,
}

#[derive(Args)]
struct AppsArgs {
    #[arg(long, global = true)]
    resource: Option<String>,

    #[command(subcommand)]
    command: AppsCommand,
}

#[derive(Subcommand)]
enum AppsCommand {
    #[command(about = "List apps")]
    List,
    #[command(about = "Register a new app")]
    Add(AppFieldArgs),
    #[command(about = "Change an existing app; the name cannot change")]
    Edit(AppFieldArgs),
    #[command(about = "Check app fields without saving")]
    Validate(ValidateArgs),
}

#[derive(Args, Clone, Default)]
struct AppFieldArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    spec_uri: Option<String>,

    #[arg(long)]
    job_queue: Option<String>,

    #[arg(long)]
    job_definition: Option<String>,

    #[arg(long)]
    cpus_per_task: Option<String>,

    #[arg(long)]
    partition: Option<String>,

    #[arg(long)]
    time: Option<String>,

    #[arg(long)]
    other_opts: Option<String>,
}

impl AppFieldArgs {
    fn has_backend_fields(&self) -> bool {
        [
            &self.job_queue,
            &self.job_definition,
            &self.cpus_per_task,
            &self.partition,
            &self.time,
            &self.other_opts,
        ]
        .iter()
        .any(|field| field.is_some())
    }

    fn queue_fields(&self) -> QueueFields {
        QueueFields {
            job_queue: self.job_queue.clone().unwrap_or_default(),
            job_definition: self.job_definition.clone().unwrap_or_default(),
        }
    }

    fn scheduler_fields(&self) -> SchedulerFields {
        SchedulerFields {
            cpus_per_task: self.cpus_per_task.clone().unwrap_or_default(),
            partition: self.partition.clone().unwrap_or_default(),
            time: self.time.clone().unwrap_or_default(),
            other_opts: self.other_opts.clone().unwrap_or_default(),
        }
    }

    fn new_draft(&self) -> AppDraft {
        AppDraft {
            name: self.name.clone(),
            spec_uri: self.spec_uri.clone().unwrap_or_default(),
            queue: self.queue_fields(),
            scheduler: self.scheduler_fields(),
            editing: false,
        }
    }

    fn edit_draft(&self, existing: &App) -> AppDraft {
        let mut draft = AppDraft::edit(existing);
        if let Some(spec_uri) = &self.spec_uri {
            draft.spec_uri = spec_uri.clone();
        }
        if self.has_backend_fields() {
            draft.queue = self.queue_fields();
            draft.scheduler = self.scheduler_fields();
        }
        draft
    }
}

#[derive(Args)]
struct ValidateArgs {
    #[command(flatten)]
    fields: AppFieldArgs,

    #[arg(long)]
    editing: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<OnboardError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &OnboardError) -> u8 {
    match error {
        OnboardError::MissingManifest | OnboardError::AppNotFound(_) => 2,
        OnboardError::CatalogHttp(_) | OnboardError::CatalogStatus { .. } => 3,
        OnboardError::InvalidApp(_)
        | OnboardError::DuplicateApp(_)
        | OnboardError::ConflictingBackends(_) => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let store = Store::new()?;

    match cli.command {
        Commands::Import(args) => run_import(args, store, output_mode),
        Commands::Resolve(args) => run_resolve(args),
        Commands::Files(args) => {
            let files = store.list_files(&args.project)?;
            JsonOutput::print_files(&files).into_diagnostic()
        }
        Commands::Apps(args) => run_apps(args, store),
    }
}

fn run_import(args: ImportArgs, store: Store, output_mode: OutputMode) -> miette::Result<()> {
    let (project_id, assets) = if args.assets.is_empty() {
        let manifest = ManifestLoader::resolve(args.manifest.as_deref())?;
        let project_id = args.project.unwrap_or(manifest.project_id);
        (project_id, manifest.assets)
    } else {
        let project_id = args
            .project
            .ok_or_else(|| miette::Report::msg("--project is required when assets are listed"))?;
        let assets = args
            .assets
            .iter()
            .map(|value| value.parse::<AssetReference>())
            .collect::<Result<Vec<_>, _>>()?;
        (project_id, assets)
    };

    let catalog = CatalogHttpClient::new()?;
    let reconciler = ImportReconciler::new(catalog, &store);
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Interactive => &TextProgress,
        OutputMode::NonInteractive => &JsonOutput,
    };

    let report = reconciler.import_assets(&project_id, &assets, sink)?;
    if matches!(output_mode, OutputMode::Interactive) {
        print_import_summary(&report, assets.len());
    }
    JsonOutput::print_import(&report).into_diagnostic()
}

fn run_resolve(args: ResolveArgs) -> miette::Result<()> {
    let reference: AssetReference = args.asset.parse()?;
    let catalog = CatalogHttpClient::new()?;
    let record = catalog.fetch_asset(&reference)?;
    let resolved = resolve_asset_url(&record, reference.environment, &catalog.hosts());
    JsonOutput::print_resolve(&ResolveResult {
        asset_id: reference.asset_id,
        candidates: record.content_urls,
        resolved,
    })
    .into_diagnostic()
}

fn run_apps(args: AppsArgs, store: Store) -> miette::Result<()> {
    let resource = args
        .resource
        .ok_or_else(|| miette::Report::msg("--resource is required"))?;

    match args.command {
        AppsCommand::List => {
            let apps = store.list_apps(&resource)?;
            JsonOutput::print_apps(&apps).into_diagnostic()
        }
        AppsCommand::Add(fields) => {
            let write = save_app(&store, &resource, &fields.new_draft())?;
            JsonOutput::print_registry_write(&write).into_diagnostic()
        }
        AppsCommand::Edit(fields) => {
            let current = store.list_apps(&resource)?;
            let existing = find_app(&current.apps, &fields.name)?;
            let write = save_app(&store, &resource, &fields.edit_draft(existing))?;
            JsonOutput::print_registry_write(&write).into_diagnostic()
        }
        AppsCommand::Validate(args) => {
            let current = store.list_apps(&resource)?;
            let draft = if args.editing {
                args.fields
                    .edit_draft(find_app(&current.apps, &args.fields.name)?)
            } else {
                args.fields.new_draft()
            };
            let validation = validate_app(&draft, &current.apps);
            if validation.valid {
                eprintln!("note: {RESTART_NOTICE}");
            }
            JsonOutput::print_validation(&validation).into_diagnostic()
        }
    }
}

fn print_import_summary(report: &ImportReport, requested: usize) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    eprintln!(
        "{green}imported {} of {requested} assets{reset}",
        report.imported.len()
    );
    for file in &report.imported {
        eprintln!("{green}  + {}{reset}", file.file_name);
    }
    for skipped in &report.skipped {
        eprintln!(
            "{yellow}  - skipped #{} {}: {}{reset}",
            skipped.index, skipped.asset_id, skipped.reason
        );
    }
    if let Some(index) = report.halted_at {
        eprintln!("{red}  ! stopped at #{index}: asset has no download url{reset}");
    }
}
