//! `rig`: the command-line driver for the Builder Orchestrator (§11.3).

use clap::{Parser, Subcommand};
use rig_builder::{Builder, LoggingScriptRunner};
use rig_component::{ComponentRegistry, InMemorySceneHost};
use rig_config::{ArchetypeResolver, LogConfig};
use rig_core::Error;
use rig_data::DataModuleRegistry;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "rig", version, about = "Rig-assembly pipeline build tool")]
struct Cli {
    /// `tracing` `EnvFilter` directive, e.g. "info" or "rig_builder=debug".
    #[arg(long = "log-level", global = true, env = "RIG_LOG_LEVEL")]
    log_level: Option<String>,

    /// One of "pretty", "json", "compact".
    #[arg(long = "log-format", global = true, env = "RIG_LOG_FORMAT")]
    log_format: Option<String>,

    /// Currently advisory: logging is always written to stderr (§10.1); recorded for parity with
    /// the CLI surface described for the original tool.
    #[arg(long = "log-file", global = true, env = "RIG_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Archetype search directories, checked in order.
    #[arg(
        long = "archetype-path",
        global = true,
        env = "RIG_ARCHETYPE_PATH",
        value_delimiter = ':'
    )]
    archetype_path: Vec<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// `loadConfig` then `run()`, optionally followed by `publish()`.
    Run {
        rig_file: PathBuf,
        #[arg(long)]
        publish: bool,
    },
    /// `buildSingleComponent`, or `editSingleComponent` with `--edit`.
    BuildComponent {
        rig_file: PathBuf,
        name: String,
        component_type: String,
        #[arg(long)]
        edit: bool,
    },
    /// Run the full pipeline then save.
    Publish {
        rig_file: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long = "asset-name")]
        asset_name: Option<String>,
        #[arg(long = "file-type")]
        file_type: Option<String>,
        #[arg(long = "no-versioning")]
        no_versioning: bool,
    },
    /// `createRigEnvironment`.
    NewRig {
        source_env: PathBuf,
        target_env: PathBuf,
        rig_name: String,
    },
    /// `newRigEnvironmentFromArchetype`.
    NewFromArchetype {
        new_env: PathBuf,
        archetype: String,
        #[arg(long = "rig-name")]
        rig_name: Option<String>,
    },
    /// List archetypes registered on the search path.
    ListArchetypes,
}

/// Exit codes mapped from the pipeline stage that aborted the run (§6.4). `6` ("deform data") is
/// never actually returned: every load stage in this rewrite logs and skips per-file failures
/// rather than aborting (§4.4 "Failure policy"), so it is reserved here only to keep the taxonomy
/// complete.
const EXIT_CONFIG: u8 = 1;
const EXIT_PRE_SCRIPT: u8 = 2;
const EXIT_BUILD: u8 = 3;
const EXIT_CONNECT: u8 = 4;
const EXIT_FINALIZE: u8 = 5;
const EXIT_POST_SCRIPT: u8 = 7;
const EXIT_PUBLISH: u8 = 8;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_config = LogConfig::from_overrides(
        cli.log_level.as_deref(),
        cli.log_format.as_deref(),
        cli.log_file.clone(),
        None,
    );
    if let Err(e) = log_config.init() {
        tracing::warn!(error = %e, "failed to initialize logging");
    }

    match execute(&cli) {
        Ok(()) => ExitCode::from(0),
        Err((code, err)) => {
            tracing::error!(error = %err, "command failed");
            ExitCode::from(code)
        }
    }
}

fn execute(cli: &Cli) -> Result<(), (u8, Error)> {
    let resolver = ArchetypeResolver::new(cli.archetype_path.clone());

    match &cli.command {
        Command::Run { rig_file, publish } => run_pipeline(rig_file, *publish, &resolver),
        Command::BuildComponent {
            rig_file,
            name,
            component_type,
            edit,
        } => build_component(rig_file, name, component_type, *edit, &resolver),
        Command::Publish {
            rig_file,
            output,
            asset_name,
            file_type,
            no_versioning,
        } => publish(
            rig_file,
            output.as_deref(),
            asset_name.as_deref(),
            file_type.as_deref(),
            !no_versioning,
            &resolver,
        ),
        Command::NewRig {
            source_env,
            target_env,
            rig_name,
        } => rig_builder::create_rig_environment(source_env, target_env, rig_name)
            .map(|path| tracing::info!(path = %path.display(), "rig environment created"))
            .map_err(|e| (EXIT_CONFIG, e)),
        Command::NewFromArchetype {
            new_env,
            archetype,
            rig_name,
        } => rig_builder::new_rig_environment_from_archetype(
            new_env,
            archetype,
            rig_name.as_deref(),
            &resolver,
        )
        .map(|path| tracing::info!(path = %path.display(), "rig environment created"))
        .map_err(|e| (EXIT_CONFIG, e)),
        Command::ListArchetypes => resolver
            .list_available()
            .map(|names| names.iter().for_each(|n| tracing::info!(archetype = %n, "available")))
            .map_err(|e| (EXIT_CONFIG, e)),
    }
}

fn load_builder<'a>(
    rig_file: &std::path::Path,
    data_registry: &'a DataModuleRegistry,
    component_registry: &'a ComponentRegistry,
    resolver: ArchetypeResolver,
    script_runner: &'a LoggingScriptRunner,
) -> Result<Builder<'a>, (u8, Error)> {
    let mut builder = Builder::new(data_registry, component_registry, resolver, script_runner);
    builder
        .load_config(rig_file)
        .map_err(|e| (EXIT_CONFIG, e))?;
    Ok(builder)
}

fn run_pipeline(
    rig_file: &std::path::Path,
    do_publish: bool,
    resolver: &ArchetypeResolver,
) -> Result<(), (u8, Error)> {
    let data_registry = DataModuleRegistry::with_standard_kinds();
    let component_registry = ComponentRegistry::new();
    let script_runner = LoggingScriptRunner;
    let mut builder = load_builder(
        rig_file,
        &data_registry,
        &component_registry,
        resolver.clone(),
        &script_runner,
    )?;
    let host = InMemorySceneHost::new();

    builder.pre_script(&host).map_err(|e| (EXIT_PRE_SCRIPT, e))?;
    builder.import_model(&host).map_err(|e| (EXIT_CONFIG, e))?;
    builder.load_joints(&host);
    builder
        .load_components()
        .map_err(|e| (EXIT_CONFIG, e))?;
    builder.initialize(&host).map_err(|e| (EXIT_CONFIG, e))?;
    builder.load_component_settings();
    builder.guide(&host).map_err(|e| (EXIT_BUILD, e))?;
    builder.load_guide_data(&host);
    builder.build(&host).map_err(|e| (EXIT_BUILD, e))?;
    builder.connect(&host).map_err(|e| (EXIT_CONNECT, e))?;
    builder.finalize(&host).map_err(|e| (EXIT_FINALIZE, e))?;
    builder.load_pose_readers(&host);
    builder
        .post_script(&host)
        .map_err(|e| (EXIT_POST_SCRIPT, e))?;
    builder.load_control_shapes(&host);
    builder.load_deform_data(&host);

    if do_publish {
        builder.pub_script(&host).map_err(|e| (EXIT_POST_SCRIPT, e))?;
        builder
            .save(&host, None, None, None, true)
            .map(|_| ())
            .map_err(|e| (EXIT_PUBLISH, e))?;
    }
    Ok(())
}

fn build_component(
    rig_file: &std::path::Path,
    name: &str,
    component_type: &str,
    edit: bool,
    resolver: &ArchetypeResolver,
) -> Result<(), (u8, Error)> {
    let data_registry = DataModuleRegistry::with_standard_kinds();
    let component_registry = ComponentRegistry::new();
    let script_runner = LoggingScriptRunner;
    let mut builder = load_builder(
        rig_file,
        &data_registry,
        &component_registry,
        resolver.clone(),
        &script_runner,
    )?;
    builder
        .load_components()
        .map_err(|e| (EXIT_CONFIG, e))?;
    let host = InMemorySceneHost::new();

    if edit {
        builder
            .edit_single_component(name, component_type, &host)
            .map_err(|e| (EXIT_BUILD, e))
    } else {
        builder
            .build_single_component(name, component_type, &host)
            .map_err(|e| (EXIT_BUILD, e))
    }
}

fn publish(
    rig_file: &std::path::Path,
    output: Option<&std::path::Path>,
    asset_name: Option<&str>,
    file_type: Option<&str>,
    versioning: bool,
    resolver: &ArchetypeResolver,
) -> Result<(), (u8, Error)> {
    let data_registry = DataModuleRegistry::with_standard_kinds();
    let component_registry = ComponentRegistry::new();
    let script_runner = LoggingScriptRunner;
    let mut builder = load_builder(
        rig_file,
        &data_registry,
        &component_registry,
        resolver.clone(),
        &script_runner,
    )?;
    let host = InMemorySceneHost::new();

    let path = builder
        .publish(&host, output, asset_name, file_type, versioning)
        .map_err(|e| (EXIT_PUBLISH, e))?;
    tracing::info!(path = %path.display(), "published");
    Ok(())
}
