use anyhow::Context;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use pk_explorer::models::SurrogateModel;
use pk_explorer::nca::MolarMasses;
use pk_explorer::output;
use pk_explorer::profiles::{load_profiles, save_profiles, ProfileAction};
use pk_explorer::simulation::{CohortSummary, Substance};
use pk_explorer::{Config, Control, PresetAxis, Session};

#[derive(Parser)]
#[command(name = "pk_explorer")]
#[command(about = "Explore covariate effects on glimepiride pharmacokinetics")]
struct Cli {
    /// Configuration file path (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for CSV, JSON and markdown results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Load a saved or example profile before applying other flags
    #[arg(short, long)]
    profile: Option<String>,

    /// JSON file holding user profiles
    #[arg(long)]
    profiles_file: Option<PathBuf>,

    /// Glimepiride dose [mg]
    #[arg(long)]
    dose: Option<f64>,

    /// Bodyweight [kg]
    #[arg(long)]
    weight: Option<f64>,

    /// Creatinine clearance [mL/min]
    #[arg(long)]
    crcl: Option<f64>,

    /// Cirrhosis degree [0-0.95]
    #[arg(long)]
    cirrhosis: Option<f64>,

    /// CYP2C9 allele 1 activity [%]
    #[arg(long)]
    allele1: Option<f64>,

    /// CYP2C9 allele 2 activity [%]
    #[arg(long)]
    allele2: Option<f64>,

    /// Renal function category, e.g. "Mild impairment"
    #[arg(long)]
    renal: Option<String>,

    /// Cirrhosis category, e.g. "Moderate cirrhosis (CTP B)"
    #[arg(long)]
    cirrhosis_stage: Option<String>,

    /// CYP2C9 allele 1, e.g. "*2"
    #[arg(long)]
    allele1_preset: Option<String>,

    /// CYP2C9 allele 2, e.g. "*3"
    #[arg(long)]
    allele2_preset: Option<String>,

    /// Save the resulting controls as a user profile
    #[arg(long)]
    save_profile: Option<String>,

    /// Delete a user profile
    #[arg(long)]
    delete_profile: Option<String>,

    /// List example and user profiles
    #[arg(long)]
    list_profiles: bool,

    /// Number of virtual patients to simulate around the controls
    #[arg(long)]
    cohort: Option<usize>,

    /// Random seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let config = match &cli.config {
        Some(path) => {
            let config = Config::from_file(path)
                .with_context(|| format!("loading configuration from {:?}", path))?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };

    let mut session = Session::new(&config, SurrogateModel::new());

    if let Some(path) = &cli.profiles_file {
        let stored = load_profiles(path)
            .with_context(|| format!("reading profiles from {:?}", path))?;
        session.registry_mut().restore(stored)?;
    }

    if let Some(name) = &cli.profile {
        session
            .dispatch(&ProfileAction::Load(name.clone()))
            .with_context(|| format!("loading profile '{}'", name))?;
    }

    apply_controls(&cli, &mut session)?;

    if let Some(name) = &cli.delete_profile {
        session.dispatch(&ProfileAction::Delete(name.clone()))?;
    }

    if let Some(name) = &cli.save_profile {
        session.save_profile(name)?;
    }

    if let Some(path) = &cli.profiles_file {
        if cli.save_profile.is_some() || cli.delete_profile.is_some() {
            save_profiles(session.registry().list(), path)
                .with_context(|| format!("writing profiles to {:?}", path))?;
        }
    }

    if cli.list_profiles {
        for (source, name, controls) in session.registry().table() {
            println!("{:?}\t{}\t{:?}", source, name, controls);
        }
    }

    let result = session.require_result()?;
    let categories = session.categories();
    println!(
        "Renal: {} | Cirrhosis: {} | CYP2C9: {}/{}",
        categories.renal, categories.cirrhosis, categories.allele1, categories.allele2
    );
    println!("{}", output::format_pk_table(&result.summaries));

    let molar_masses = MolarMasses::glimepiride();
    if let Some(dir) = &cli.output {
        std::fs::create_dir_all(dir)?;
        output::save_results(result, &categories, &molar_masses, dir)?;
        info!("Results saved to {:?}", dir);
    }

    if let Some(n) = cli.cohort {
        let patients = session.simulate_cohort(n, cli.seed)?;
        for substance in Substance::ALL {
            let summary = CohortSummary::from_patients(&patients, substance);
            println!("{}", output::format_cohort_summary(&summary));
        }
        if let Some(dir) = &cli.output {
            output::save_cohort(&patients, dir.join("cohort.csv"))?;
        }
    }

    Ok(())
}

fn apply_controls(cli: &Cli, session: &mut Session<SurrogateModel>) -> anyhow::Result<()> {
    let presets = [
        (PresetAxis::Renal, Control::CrclMlmin, &cli.renal),
        (PresetAxis::Cirrhosis, Control::CirrhosisDegree, &cli.cirrhosis_stage),
        (PresetAxis::Allele, Control::Allele1ActivityPct, &cli.allele1_preset),
        (PresetAxis::Allele, Control::Allele2ActivityPct, &cli.allele2_preset),
    ];
    for (axis, control, name) in presets {
        if let Some(name) = name {
            session.apply_preset(axis, control, name)?;
        }
    }

    let values = [
        (Control::DoseMg, cli.dose),
        (Control::WeightKg, cli.weight),
        (Control::CrclMlmin, cli.crcl),
        (Control::CirrhosisDegree, cli.cirrhosis),
        (Control::Allele1ActivityPct, cli.allele1),
        (Control::Allele2ActivityPct, cli.allele2),
    ];
    for (control, value) in values {
        if let Some(value) = value {
            session.set_control(control, value)?;
        }
    }

    if session.result().is_none() {
        session.recompute()?;
    }
    Ok(())
}
