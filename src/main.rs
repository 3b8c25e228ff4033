use std::env;

use log::info;
use risk_replay::{RunConfig, run};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => {
            info!("reading run configuration from {path}");
            RunConfig::load(path)?
        }
        None => {
            info!("no run configuration given, using the defaults");
            RunConfig::default()
        }
    };

    let report = run(&config)?;

    for round in &report.rounds {
        let Some(last) = round.fit.last() else {
            continue;
        };

        println!(
            "round {}: train loss {:.6}, validation loss {:?}, {} examples",
            round.iteration, last.train_loss, last.val_loss, round.train_len
        );
    }

    let partitions = [("train", &report.train), ("validation", &report.validation)];
    for (name, score) in partitions {
        let Some(score) = score else {
            continue;
        };

        println!(
            "{name} final cross entropy: {:.6}, mse: {:.6}, r2: {:?}",
            score.cross_entropy, score.mse, score.r2
        );

        if let Some(c) = &score.classification {
            println!(
                "{name} mcfadden r2: {:.4}, tjur r2: {:?}, acc: {:.4}, precision: {:.4}, recall: {:.4}",
                c.mcfadden_r2, c.tjur_r2, c.accuracy, c.precision, c.recall
            );
        }
    }

    Ok(())
}
