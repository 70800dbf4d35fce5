use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::PathBuf,
    time::Instant,
};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use confmatch::{
    config::{ConfigMatching, InputList},
    matching::{checkpoint, reshape, CrossFileReconciler},
    reduce::{EnergyReport, TimeReport},
    record::LevelOfTheory,
    report,
    rmsd::SymmetricRmsd,
    store::CalculationFile,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Match the conformers of every listed file to those of the first one and
    /// compare their relative energies
    #[command(name = "match")]
    Match(MatchArgs),
    /// Write the conformers of one molecule to a new SD file, for a closer look
    /// at conformers with large energy errors
    Extract(ExtractArgs),
}

#[derive(Args, Debug)]
struct MatchArgs {
    /// Text file with one `THEORY, PATH` line per calculation file; the first
    /// file is the reference
    #[arg(long, short)]
    input: PathBuf,
    /// JSON file with matching settings (threshold, RMSD options, compared tags)
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Where the matching results are written, or read with --read-checkpoint
    #[arg(long, default_value = "match.json")]
    checkpoint: PathBuf,
    /// Skip matching and reduce the results of an earlier run
    #[arg(long)]
    read_checkpoint: bool,
    /// Write a relene_{molecule}.dat report for every molecule
    #[arg(long)]
    verbose: bool,
    /// Also summarize optimization runtimes
    #[arg(long)]
    times: bool,
    /// Directory for the reports
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
    /// Print the summaries as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// SD file holding the molecule
    #[arg(long, short)]
    file: PathBuf,
    /// Level of theory of the results to keep, as METHOD/BASIS
    #[arg(long, short)]
    theory: String,
    /// Title of the molecule
    #[arg(long, short)]
    molecule: String,
    /// Only write the conformer with this original index, counting from 0
    #[arg(long)]
    conformer: Option<usize>,
    /// Output SD file
    #[arg(long, short)]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Match(args) => run_match(args),
        Command::Extract(args) => run_extract(args),
    }
}

fn run_extract(args: ExtractArgs) -> anyhow::Result<()> {
    let theory: LevelOfTheory = args.theory.parse()?;
    let file = CalculationFile::load(&args.file, theory)
        .with_context(|| format!("loading {}", args.file.display()))?;

    let mut output = File::create(&args.output)
        .map(BufWriter::new)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let written = file
        .export(&mut output, &args.molecule, args.conformer)
        .with_context(|| format!("writing {}", args.output.display()))?;
    output.flush()?;

    println!(
        "wrote {written} conformers of {} to {}",
        args.molecule,
        args.output.display()
    );
    Ok(())
}

fn run_match(args: MatchArgs) -> anyhow::Result<()> {
    let inputs = InputList::load(&args.input)
        .with_context(|| format!("reading input list {}", args.input.display()))?;
    let theories = inputs.theories();

    let config = match &args.config {
        Some(path) => ConfigMatching::load(path)
            .with_context(|| format!("reading matching settings {}", path.display()))?,
        None => ConfigMatching::default(),
    };

    let raw = if args.read_checkpoint {
        log::info!("skipping matching, reusing {}", args.checkpoint.display());
        checkpoint::load(&args.checkpoint).context("reading matching checkpoint")?
    } else {
        let files = inputs.load_files().context("loading calculation files")?;

        let start = Instant::now();
        let raw = CrossFileReconciler::from(&config)
            .reconcile_all(&files, &SymmetricRmsd::from(&config))
            .context("matching conformers")?;
        println!(
            "matched {} molecules across {} files in {:0.2?}",
            raw.n_molecules(),
            raw.n_files(),
            start.elapsed()
        );

        checkpoint::save(&args.checkpoint, &raw).context("writing matching checkpoint")?;
        raw
    };

    if raw.n_files() != theories.len() {
        bail!(
            "{} lists {} files but the matching results cover {}",
            args.input.display(),
            theories.len(),
            raw.n_files()
        );
    }

    let (energies, times) = reshape(&raw);
    let energy_report = confmatch::reduce_energies(&energies);
    let time_report = args
        .times
        .then(|| confmatch::reduce_times(&times, &energy_report.zero_indices()));

    if args.json {
        let summary = serde_json::json!({
            "theories": theories,
            "energies": energy_report,
            "times": time_report,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_energies(&energy_report, &theories);
        if let Some(time_report) = &time_report {
            print_times(time_report, &theories);
        }
    }

    if args.verbose {
        fs::create_dir_all(&args.output_dir)
            .with_context(|| format!("creating {}", args.output_dir.display()))?;

        for molecule in &energy_report.molecules {
            report::write_relative_energies(&args.output_dir, molecule, &theories)
                .with_context(|| format!("writing report for {}", molecule.title))?;
        }
        for molecule in time_report.iter().flat_map(|report| &report.molecules) {
            report::append_times(&args.output_dir, molecule)
                .with_context(|| format!("writing runtimes for {}", molecule.title))?;
        }
    }

    Ok(())
}

fn print_energies(report: &EnergyReport, theories: &[String]) {
    println!("RMS errors (kcal/mol) of relative energies with respect to {}", theories[0]);
    for (i, theory) in theories.iter().enumerate() {
        println!("  [{}] {theory}", i + 1);
    }

    for molecule in &report.molecules {
        let zero = molecule
            .zero_index
            .map_or_else(|| "-".to_owned(), |zero| zero.to_string());
        let errors = molecule
            .rms_errors
            .iter()
            .zip(&molecule.missing)
            .map(|(rms, missing)| format!("{rms:>9.4} ({missing:>2} missing)"))
            .collect::<Vec<_>>()
            .join("  ");
        println!("{:<24} zero {zero:>3}  {errors}", molecule.title);
    }
}

fn print_times(report: &TimeReport, theories: &[String]) {
    println!("mean runtime ratio with respect to {}", theories[0]);
    for molecule in &report.molecules {
        let ratios = molecule
            .files
            .iter()
            .map(|file| format!("{:>8.3} ± {:<8.3}", file.mean_ratio, file.std_ratio))
            .collect::<Vec<_>>()
            .join("  ");
        println!("{:<24} {ratios}", molecule.title);
    }
}
