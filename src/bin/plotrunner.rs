//! Command-line driver: run plot files and inspect declarative sources.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use plotrunner::{ClassRegistry, Registries, RunOptions, logging, split_list};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "plotrunner",
    version,
    about = "Build plots from declarative plotter and dataset sources"
)]
struct Cli {
    /// Log filter directive (e.g. `info`, `plotrunner=debug`).
    #[arg(long, global = true, env = "PLOTRUNNER_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute the plot groups of a run file.
    Run(RunArgs),

    /// Load plotter and/or dataset sources and print what they define.
    Inspect {
        #[arg(long)]
        plotters: Option<PathBuf>,

        #[arg(long)]
        datasets: Option<PathBuf>,
    },

    /// List loadable modules and the classes they provide.
    Classes,
}

#[derive(Args)]
struct RunArgs {
    /// Top-level run file (PlotterYaml, DatasetYaml, PlotGroups).
    config: PathBuf,

    /// Plot groups to run, comma separated. Defaults to all of them.
    #[arg(long)]
    include: Option<String>,

    /// Plot groups to skip, comma separated.
    #[arg(long)]
    exclude: Option<String>,

    /// Compute artifacts without writing them.
    #[arg(long)]
    no_save: bool,

    /// Keep artifacts in memory after writing them.
    #[arg(long)]
    no_purge: bool,

    /// Write every plot group to this directory instead of its own outdir.
    #[arg(long, env = "PLOTRUNNER_OUTDIR")]
    outdir: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref());
    if let Err(err) = run(cli.command) {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Run(args) => run_plots(args),
        Command::Inspect { plotters, datasets } => inspect(plotters, datasets),
        Command::Classes => list_classes(),
    }
}

fn run_plots(args: RunArgs) -> Result<()> {
    let options = RunOptions {
        include: args.include.as_deref().map(split_list),
        exclude: args.exclude.as_deref().map(split_list).unwrap_or_default(),
        save: !args.no_save,
        purge: !args.no_purge,
        outdir: args.outdir,
        ..RunOptions::default()
    };
    let mut registries = Registries::lock_global();
    let artifacts = plotrunner::run(&mut registries, &args.config, &options)
        .with_context(|| format!("running {}", args.config.display()))?;
    for key in artifacts.keys() {
        println!("{key}");
    }
    Ok(())
}

fn inspect(plotters: Option<PathBuf>, datasets: Option<PathBuf>) -> Result<()> {
    let mut registries = Registries::lock_global();
    if let Some(path) = plotters {
        registries
            .plotters
            .load(&path)
            .with_context(|| format!("loading plotters from {}", path.display()))?;
        print!("{}", registries.plotters.dump());
    }
    if let Some(path) = datasets {
        registries
            .datasets
            .load(&path)
            .with_context(|| format!("loading datasets from {}", path.display()))?;
        print!("{}", registries.datasets.dump());
    }
    Ok(())
}

fn list_classes() -> Result<()> {
    let mut registries = Registries::lock_global();
    print_classes(registries.plotters.classes_mut())?;
    print_classes(registries.datasets.classes_mut())?;
    Ok(())
}

fn print_classes<C: ?Sized>(classes: &mut ClassRegistry<C>) -> Result<()> {
    let modules: Vec<String> = classes.modules().map(str::to_string).collect();
    for module in &modules {
        classes.load_module(module)?;
    }
    println!("{} modules:", classes.capability());
    for module in &modules {
        println!("  {module}");
    }
    println!("{} classes:", classes.capability());
    for name in classes.names() {
        println!("  {name}");
    }
    Ok(())
}
