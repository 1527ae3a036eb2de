//! Borg MOEA CLI - Run an optimization from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::Path;
use std::time::Instant;

use borg_moea::{
    compute::{BorgError, BorgMoea, Problem, evolution::build_problem},
    schema::RunConfig,
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <run.json>", args[0]);
        eprintln!();
        eprintln!("Run the Borg MOEA on a built-in problem from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  run.json   Path to run configuration file");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        if let Err(e) = print_example_config() {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    if let Err(e) = run(Path::new(&args[1])) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(config_path: &Path) -> Result<(), BorgError> {
    let config_str = fs::read_to_string(config_path)?;
    let config: RunConfig = serde_json::from_str(&config_str)?;

    let problem = build_problem(&config.problem)?;
    println!("Borg MOEA");
    println!("=========");
    println!(
        "Problem: {} ({} variables, {} objectives)",
        problem.name(),
        problem.search_space().dimensions(),
        problem.num_objectives()
    );
    println!("Operators: {}", config.borg.operators.len());
    println!("Steps: {}", config.max_steps);
    println!();

    let mut borg = BorgMoea::new(problem, config.borg.clone())?;
    let trace_interval = config.trace_interval.max(1);

    println!("Running optimization...");
    let start = Instant::now();

    for i in 0..config.max_steps {
        borg.step()?;
        if (i + 1) % trace_interval == 0 {
            let elapsed = start.elapsed().as_secs_f32();
            log::info!("{} ({:.1} steps/s)", borg.trace_state(), (i + 1) as f32 / elapsed);
        }
    }

    let elapsed = start.elapsed();
    let archive = borg.archive();
    let stats = borg.stats();

    println!();
    println!("Final state:");
    println!("  {}", borg.trace_state());
    println!("  Frontier size: {}", archive.len());
    println!("  Archive candidates: {}", archive.num_candidates());
    println!(
        "  Offspring: {} (replaced dominated {}, replaced random {}, rejected {})",
        stats.offspring, stats.replaced_dominated, stats.replaced_random, stats.rejected
    );
    if let Some(best) = borg.best() {
        println!("  Best objective sum: {:.6} at {:?}", best.fitness.aggregate(), best.fitness.values);
    }
    for objective in 0..archive.scheme().num_objectives() {
        let (lo, hi) = archive
            .frontier()
            .iter()
            .map(|m| m.fitness.values[objective])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        println!("  Objective {} range: [{:.6}, {:.6}]", objective, lo, hi);
    }
    println!(
        "Time: {:.2}s ({:.1} steps/s)",
        elapsed.as_secs_f32(),
        config.max_steps as f32 / elapsed.as_secs_f32()
    );

    if let Some(output) = &config.output {
        archive.save_json(output)?;
        println!("Frontier written to {}", output.display());
    }
    Ok(())
}

fn print_example_config() -> Result<(), BorgError> {
    let config = RunConfig {
        borg: borg_moea::schema::BorgConfig {
            random_seed: Some(42),
            ..Default::default()
        },
        output: Some("frontier.json".into()),
        ..Default::default()
    };

    println!("Example configuration (run.json):");
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
