use std::path::PathBuf;

use _model::load_elements;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use conflation::{
    analyzer,
    grouping::{combine_by_similar_values, group_by_values, similar_values, Values},
    utils::progress_bar,
    CorrelationKind,
};
use indicatif::ParallelProgressIterator;
use itertools::Itertools;
use rayon::prelude::*;

#[derive(Debug, Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Run the analyzers of a config file and write their reports
    Correlate {
        config: PathBuf,
        /// Only run the analyzer with this name
        #[arg(long)]
        only: Option<String>,
        /// Also dump matched pairs as JSON next to each report
        #[arg(long)]
        json: bool,
    },
    /// Count elements by the values of some tags
    Group {
        elements: PathBuf,
        #[arg(required = true)]
        keys: Vec<String>,
        /// Leave out elements missing any of the keys
        #[arg(long)]
        require_all: bool,
        /// Combine values differing only in case or spacing
        #[arg(long)]
        similar: bool,
    },
}

fn display(values: &Values) -> String {
    values
        .iter()
        .map(|x| x.as_deref().unwrap_or("-"))
        .join(" / ")
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Correlate { config, only, json } => {
            let mut analyzers = analyzer::load(&config)?;
            if let Some(name) = &only {
                analyzers.retain(|x| &x.name == name);
                if analyzers.is_empty() {
                    bail!("No analyzer named {name:?} in {}", config.display());
                }
            }

            let pb = progress_bar(analyzers.len() as u64);
            let summaries = analyzers
                .par_iter()
                .progress_with(pb.clone())
                .map(|x| {
                    pb.set_message(x.name.clone());
                    x.run(json)
                })
                .collect::<Result<Vec<_>>>()?;
            pb.finish_and_clear();

            for x in summaries {
                let count = |kind: CorrelationKind| x.counts[&kind];
                println!("# {}", x.name);
                println!(
                    "- {} items ({} invalid), {} osm",
                    x.items, x.invalid, x.elements
                );
                println!(
                    "- {} matched, {} far, {} unmatched",
                    count(CorrelationKind::Matched),
                    count(CorrelationKind::MatchedFar),
                    count(CorrelationKind::UnmatchedItem)
                );
                println!(
                    "- {} osm unmatched, {} lone, {} ignored",
                    count(CorrelationKind::UnmatchedOsm),
                    count(CorrelationKind::MatchedLoneOsm),
                    count(CorrelationKind::IgnoredOsm)
                );
                if x.violations > 0 {
                    println!("- {} tagging problems", x.violations);
                }
                println!();
            }
        }
        Command::Group {
            elements,
            keys,
            require_all,
            similar,
        } => {
            let elements = load_elements(&elements)?;
            let keys: Vec<_> = keys.iter().map(|x| x.as_str()).collect();
            let groups = group_by_values(&elements, &keys, require_all);

            if similar {
                let mut combined = combine_by_similar_values(groups, similar_values);
                combined.sort_by(|a, b| b.len().cmp(&a.len()));
                for x in combined {
                    println!("{} {}", x.len(), display(x.values()));
                    if x.variants.len() > 1 {
                        for (values, count) in &x.variants {
                            println!("  - {count} {}", display(values));
                        }
                    }
                }
            } else {
                let mut groups = groups;
                groups.sort_by(|a, b| b.elements.len().cmp(&a.elements.len()));
                for x in groups {
                    println!("{} {}", x.elements.len(), display(&x.values));
                }
            }
        }
    }

    Ok(())
}
