//! brca-meth - DNA methylation analysis of breast cancer tumors
//!
//! Command-line interface for acquiring a TCGA-BRCA cohort and running the
//! classification, clustering and survival analysis on it.

use brca_methylation::acquire::{acquire_cohort, Cohort, GdcClient};
use brca_methylation::benchmark::{generate_synthetic, SyntheticConfig};
use brca_methylation::data::ProbeAnnotation;
use brca_methylation::error::Result;
use brca_methylation::pipeline::{Analysis, AnalysisConfig, AnalysisReport};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// DNA methylation analysis of TCGA-BRCA
#[derive(Parser)]
#[command(name = "brca-meth")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the cohort from the GDC and run the analysis
    Gdc {
        /// Output directory for data, plots and report
        #[arg(short, long)]
        output: PathBuf,

        /// Analysis configuration YAML
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Probe-to-gene annotation TSV (probe_id, gene_symbol)
        #[arg(short, long)]
        annotation: Option<PathBuf>,

        /// Directory for downloaded GDC files
        #[arg(long)]
        cache: Option<PathBuf>,
    },

    /// Run the analysis on a cohort saved as TSV files
    Local {
        /// Beta matrix TSV (probes x samples, probe ids in the first column)
        #[arg(short, long)]
        betas: PathBuf,

        /// Sample sheet TSV
        #[arg(short, long)]
        samples: PathBuf,

        /// Clinical TSV
        #[arg(long)]
        clinical: PathBuf,

        /// Output directory for plots and report
        #[arg(short, long)]
        output: PathBuf,

        /// Probe-to-gene annotation TSV (probe_id, gene_symbol)
        #[arg(short, long)]
        annotation: Option<PathBuf>,

        /// Analysis configuration YAML
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Generate a synthetic cohort and analyze it
    Synthetic {
        /// Output directory for data, plots and report
        #[arg(short, long)]
        output: PathBuf,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Write the default configuration to a YAML file
    InitConfig {
        /// Path of the file to create
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Gdc {
            output,
            config,
            annotation,
            cache,
        } => cmd_gdc(&output, config.as_deref(), annotation.as_deref(), cache.as_deref()),

        Commands::Local {
            betas,
            samples,
            clinical,
            output,
            annotation,
            config,
        } => cmd_local(
            &betas,
            &samples,
            &clinical,
            &output,
            annotation.as_deref(),
            config.as_deref(),
        ),

        Commands::Synthetic { output, seed } => cmd_synthetic(&output, seed),

        Commands::InitConfig { path } => cmd_init_config(&path),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>, output: &Path) -> Result<AnalysisConfig> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            AnalysisConfig::from_file(path)?
        }
        None => AnalysisConfig::default(),
    };
    Ok(config.with_output_dir(output))
}

fn load_annotation(path: Option<&Path>) -> Result<ProbeAnnotation> {
    match path {
        Some(path) => ProbeAnnotation::from_tsv(path),
        None => {
            info!("No annotation given; genes are reported by probe id");
            Ok(ProbeAnnotation::new())
        }
    }
}

fn run_and_print(config: AnalysisConfig, cohort: &Cohort, annotation: &ProbeAnnotation) -> Result<()> {
    let report: AnalysisReport = Analysis::new(config).run(cohort, annotation)?;
    println!("{}", report);
    Ok(())
}

fn cmd_gdc(
    output: &Path,
    config_path: Option<&Path>,
    annotation_path: Option<&Path>,
    cache: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path, output)?;
    let annotation = load_annotation(annotation_path)?;

    let mut client = GdcClient::new()?;
    if let Some(cache) = cache {
        client = client.with_cache_dir(cache);
    }
    info!("Querying {} (cache: {:?})", config.cohort.project, client.cache_dir());
    let cohort = acquire_cohort(&client, &config.cohort)?;

    let data_dir = output.join("data");
    std::fs::create_dir_all(&data_dir)?;
    cohort.write_tsv(&data_dir)?;
    info!("Saved cohort to {:?}", data_dir);

    run_and_print(config, &cohort, &annotation)
}

fn cmd_local(
    betas: &Path,
    samples: &Path,
    clinical: &Path,
    output: &Path,
    annotation_path: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path, output)?;
    let annotation = load_annotation(annotation_path)?;

    info!("Loading cohort...");
    let cohort = Cohort::from_tsv(betas, samples, clinical)?;
    info!(
        "Loaded {} samples x {} probes from {} patients",
        cohort.betas.n_samples(),
        cohort.betas.n_probes(),
        cohort.n_patients()
    );

    run_and_print(config, &cohort, &annotation)
}

fn cmd_synthetic(output: &Path, seed: u64) -> Result<()> {
    let data = generate_synthetic(&SyntheticConfig::default().with_seed(seed))?;
    let data_dir = output.join("data");
    std::fs::create_dir_all(&data_dir)?;
    data.write_to_dir(&data_dir)?;
    info!(
        "Generated {} samples x {} probes with {} planted probes",
        data.cohort.betas.n_samples(),
        data.cohort.betas.n_probes(),
        data.ground_truth.planted_probes.len()
    );

    let config = AnalysisConfig::default()
        .with_name("synthetic")
        .with_seed(seed)
        .with_output_dir(output);
    run_and_print(config, &data.cohort, &data.annotation)
}

fn cmd_init_config(path: &Path) -> Result<()> {
    AnalysisConfig::default().to_file(path)?;
    info!("Wrote default configuration to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_betas_help_matches_file_layout() {
        let cli = Cli::command();
        let local = cli.find_subcommand("local").unwrap();
        let betas = local
            .get_arguments()
            .find(|arg| arg.get_id() == "betas")
            .unwrap();
        let help = betas.get_help().unwrap().to_string();
        assert!(help.contains("probes x samples"), "{}", help);
    }
}
