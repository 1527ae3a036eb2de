//! Quick Borg MOEA performance test

use borg_moea::{
    BorgConfig, BorgMoea,
    compute::evolution::{Dtlz2, Schaffer1, Zdt1},
};
use std::time::Instant;

fn main() {
    println!("=== Borg Performance Test ===\n");

    let steps = 20_000;

    // Test different problem sizes
    for dimensions in [10, 30, 100] {
        println!("ZDT1, {} variables", dimensions);

        let config = BorgConfig {
            random_seed: Some(42),
            ..Default::default()
        };
        let mut borg = BorgMoea::new(Zdt1::new(dimensions).unwrap(), config).unwrap();

        let start = Instant::now();
        for _ in 0..steps {
            borg.step().unwrap();
        }
        let elapsed = start.elapsed();

        let evals = borg.evaluator().num_evals();
        println!("  Steps:          {}", borg.num_steps());
        println!("  Evaluations:    {}", evals);
        println!("  Restarts:       {}", borg.num_restarts());
        println!("  Frontier size:  {}", borg.archive().len());
        println!("  Elapsed:        {:.2}s", elapsed.as_secs_f64());
        println!("  Evals/sec:      {:.1}", evals as f64 / elapsed.as_secs_f64());
        println!("  Weights:        {:.3?}", borg.operator_weights());
        println!();
    }

    println!("=== Parallel evaluation (DTLZ2, 3 objectives) ===\n");

    for parallel in [false, true] {
        let config = BorgConfig {
            epsilon: vec![0.05],
            parallel_evaluation: parallel,
            random_seed: Some(42),
            ..Default::default()
        };
        let mut borg = BorgMoea::new(Dtlz2::new(12, 3).unwrap(), config).unwrap();

        let start = Instant::now();
        for _ in 0..steps {
            borg.step().unwrap();
        }
        let elapsed = start.elapsed();

        println!(
            "  parallel={:<5} frontier={:<4} {:.2}s",
            parallel,
            borg.archive().len(),
            elapsed.as_secs_f64()
        );
    }

    println!("\n=== Schaffer N.1 frontier ===\n");

    let config = BorgConfig {
        min_population_size: 20,
        random_seed: Some(7),
        ..Default::default()
    };
    let mut borg = BorgMoea::new(Schaffer1::new(10.0).unwrap(), config).unwrap();
    for _ in 0..5_000 {
        borg.step().unwrap();
    }
    let mut frontier: Vec<_> = borg.archive().frontier().iter().collect();
    frontier.sort_by(|a, b| a.params[0].total_cmp(&b.params[0]));
    for member in frontier.iter().step_by((frontier.len() / 10).max(1)) {
        println!(
            "  x = {:>7.4}  f = ({:.4}, {:.4})",
            member.params[0], member.fitness.values[0], member.fitness.values[1]
        );
    }
}
