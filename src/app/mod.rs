//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - installs the tracing subscriber
//! - parses CLI arguments
//! - opens the store
//! - dispatches commands and prints reports
//! - writes optional exports

use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{
    AddArgs, Cli, CoeffsArgs, Command, DeleteArgs, GroupArg, ImportArgs, PredictArgs,
    RecommendArgs, SamplesArgs,
};
use crate::domain::{DesignParams, NewSample, SearchRanges, SmokeYields, Target};
use crate::error::{Error, Result};
use crate::fit::{RecommendInput, fit_group};
use crate::io::export::{
    RecommendationRun, write_prediction_csv, write_recommendation_json,
    write_recommendations_csv,
};
use crate::io::import::read_samples_csv;
use crate::report;
use crate::store::Store;

pub mod pipeline;

/// Entry point for the `auxfit` binary.
pub fn run() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut store = Store::open(&cli.db)?;

    match cli.command {
        Command::Import(args) => handle_import(&mut store, args),
        Command::Add(args) => handle_add(&mut store, args),
        Command::Groups => handle_groups(&store),
        Command::Samples(args) => handle_samples(&store, args),
        Command::Delete(args) => handle_delete(&mut store, args),
        Command::Fit(args) => handle_fit(&mut store, args),
        Command::Coeffs(args) => handle_coeffs(&store, args),
        Command::Predict(args) => handle_predict(&store, args),
        Command::Recommend(args) => handle_recommend(&store, args),
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("auxfit=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_import(store: &mut Store, args: ImportArgs) -> Result<()> {
    let samples = read_samples_csv(&args.csv, &args.group)?;
    let created = store.create_samples(&samples)?;
    info!(group = %args.group, imported = created.len(), "import complete");
    println!(
        "Imported {} sample(s) into group '{}'.",
        created.len(),
        args.group
    );
    Ok(())
}

fn handle_add(store: &mut Store, args: AddArgs) -> Result<()> {
    let sample = NewSample {
        group: args.group.clone(),
        code: args.code,
        params: DesignParams {
            filter_ventilation: args.ventilation,
            filter_pressure_drop: args.pressure_drop,
            permeability: args.permeability,
            basis_weight: args.basis_weight,
            citrate: args.citrate,
        },
        yields: SmokeYields {
            tar: args.tar,
            nicotine: args.nicotine,
            co: args.co,
        },
    };
    let created = store.create_sample(&sample)?;
    println!(
        "Added sample {} ('{}') to group '{}'.",
        created.id, created.code, created.group
    );
    Ok(())
}

fn handle_groups(store: &Store) -> Result<()> {
    let groups = store.groups()?;
    if groups.is_empty() {
        println!("No sample groups.");
        return Ok(());
    }
    for group in groups {
        println!("{group}");
    }
    Ok(())
}

fn handle_samples(store: &Store, args: SamplesArgs) -> Result<()> {
    let samples = match &args.code {
        Some(fragment) => store.find_by_code(&args.group, fragment)?,
        None => store.samples_in_group(&args.group)?,
    };
    print!("{}", report::format_samples(&args.group, &samples));
    Ok(())
}

fn handle_delete(store: &mut Store, args: DeleteArgs) -> Result<()> {
    match (args.id, args.group) {
        (Some(id), None) => {
            store.delete_sample(id)?;
            println!("Deleted sample {id}.");
            Ok(())
        }
        (None, Some(group)) => {
            let removed = store.delete_group(&group)?;
            println!("Deleted group '{group}' ({removed} sample(s)).");
            Ok(())
        }
        _ => Err(Error::Validation(
            "delete requires exactly one of --id or --group".into(),
        )),
    }
}

fn handle_fit(store: &mut Store, args: GroupArg) -> Result<()> {
    let outcome = fit_group(store, &args.group)?;
    print!("{}", report::format_fit_summary(&outcome));
    Ok(())
}

fn handle_coeffs(store: &Store, args: CoeffsArgs) -> Result<()> {
    let batch = pipeline::load_batch(store, &args.group, args.batch)?;
    print!("{}", report::format_coefficients(&batch));
    Ok(())
}

fn handle_predict(store: &Store, args: PredictArgs) -> Result<()> {
    let candidate = DesignParams {
        filter_ventilation: args.ventilation,
        filter_pressure_drop: args.pressure_drop,
        permeability: args.permeability,
        basis_weight: args.basis_weight,
        citrate: args.citrate,
    };
    let out = pipeline::run_predict(store, &args.group, &args.baseline, args.batch, candidate)?;
    print!(
        "{}",
        report::format_prediction(&out.baseline, out.candidate, out.predicted)
    );

    if let Some(path) = &args.export {
        write_prediction_csv(path, &out.baseline, out.candidate, out.predicted)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn handle_recommend(store: &Store, args: RecommendArgs) -> Result<()> {
    let target = Target {
        yields: SmokeYields {
            tar: args.tar,
            nicotine: args.nicotine,
            co: args.co,
        },
        weights: SmokeYields {
            tar: args.weight_tar,
            nicotine: args.weight_nicotine,
            co: args.weight_co,
        },
    };
    let ranges = SearchRanges {
        filter_ventilation: args.ventilation,
        filter_pressure_drop: args.pressure_drop,
        permeability: args.permeability,
        basis_weight: args.basis_weight,
        citrate: args.citrate,
    };

    let out = pipeline::run_recommend(
        store,
        &args.group,
        &args.baseline,
        args.batch,
        target,
        |baseline, target| {
            let mut input = RecommendInput::new(baseline, target, ranges);
            input.top_n = args.top;
            input.max_candidates = args.max_candidates;
            input
        },
    )?;

    println!(
        "=== auxfit - recommendations (group '{}', batch {}) ===",
        out.group, out.batch
    );
    print!("{}", report::format_recommendations(&out.recommendations));

    if let Some(path) = &args.export {
        write_recommendations_csv(path, &out.recommendations)?;
        println!("Wrote {}", path.display());
    }
    if let Some(path) = &args.export_json {
        let run = RecommendationRun {
            tool: "auxfit".into(),
            generated_at: Utc::now(),
            group: out.group.clone(),
            batch: out.batch,
            baseline: out.input.baseline,
            target: out.input.target,
            ranges: out.input.ranges,
            recommendations: out.recommendations.clone(),
        };
        write_recommendation_json(path, &run)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}
