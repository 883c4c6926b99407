//! Succession diagram analysis for BN models.
//!
//! Takes an input path to a BN model (format may be specified, bnet format is
//! default), expands its succession diagram using the selected strategy, and
//! optionally computes the attractors of every node and stores a snapshot of
//! the result.
//!

use biodivine_succession_diagram::SuccessionDiagram;
use biodivine_succession_diagram::spaces::space_to_binary_string;

use clap::Parser;
use clap::builder::PossibleValuesParser;
use log::LevelFilter;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use std::io::Write;
use std::path::Path;

/// Structure to collect CLI arguments.
#[derive(Parser)]
#[clap(
    author = "Samuel Pastva",
    version,
    about = "Succession diagram analysis of asynchronous Boolean network models."
)]
struct Arguments {
    /// Path to a file with a BN model in one of the supported formats.
    model_path: String,

    /// Format of the BN model.
    #[clap(short, long, default_value = "bnet", value_parser = PossibleValuesParser::new(["aeon", "sbml", "bnet"]))]
    model_format: String,

    /// The expansion strategy used to build the succession diagram.
    #[clap(short, long, default_value = "block", value_parser = PossibleValuesParser::new(["bfs", "dfs", "minimal", "seeds", "scc", "block"]))]
    expansion: String,

    /// Compute attractor seeds for every node of the expanded diagram.
    #[clap(short, long)]
    attractors: bool,

    /// Path of a zip archive to store the resulting diagram snapshot in.
    #[clap(short, long)]
    snapshot: Option<String>,

    /// Soft limit on the succession diagram size.
    #[clap(long)]
    size_limit: Option<usize>,

    /// Print progress messages describing the computation.
    #[clap(short, long)]
    debug: bool,
}

/// Wrapper function to run the succession diagram analysis with CLI arguments.
fn main() {
    let args = Arguments::parse();

    let log_level = if args.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if !Path::new(args.model_path.as_str()).is_file() {
        println!("{} is not valid file", args.model_path);
        return;
    }
    let model_string = match std::fs::read_to_string(args.model_path.as_str()) {
        Ok(model_string) => model_string,
        Err(e) => {
            println!("Cannot read model file: {e}");
            return;
        }
    };

    if let Err(e) = analyse_model(&model_string, &args) {
        println!("{e}");
    }
}

fn analyse_model(model_string: &str, args: &Arguments) -> Result<(), String> {
    let mut sd = SuccessionDiagram::from_rules(model_string, args.model_format.as_str())?;

    let complete = match args.expansion.as_str() {
        "bfs" => sd.expand_bfs(None, None, args.size_limit)?,
        "dfs" => sd.expand_dfs(None, None, args.size_limit)?,
        "minimal" => sd.expand_minimal_spaces(None, args.size_limit, false)?,
        "seeds" => sd.expand_attractor_seeds(args.size_limit)?,
        "scc" => sd.expand_scc(true)?,
        "block" => sd.expand_block(true, args.size_limit, true)?,
        // this cant really happen, just here to be exhaustive
        _ => return Err(format!("Wrong expansion option \"{}\".", args.expansion)),
    };
    if !complete {
        println!("Expansion stopped early: the size limit was reached.");
    }

    if args.attractors {
        for node_id in sd.node_ids() {
            sd.node_attractor_seeds(node_id, true, false)?;
        }
        print_attractors(&sd);
    }

    println!("{}", sd.summary());

    if let Some(snapshot_path) = &args.snapshot {
        sd.save_snapshot(snapshot_path)?;
        println!("Snapshot stored in {snapshot_path}.");
    }
    Ok(())
}

/// Print every attractor seed state, one per line, with positive variables in
/// green and negative ones in red.
fn print_attractors(sd: &SuccessionDiagram) {
    let mut var_ordering: Vec<String> = sd
        .network()
        .variables()
        .map(|v| sd.network().get_variable_name(v).clone())
        .collect();
    var_ordering.sort();

    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    for node_id in sd.node_ids() {
        let Some(seeds) = sd.node_data(node_id).attractor_seeds() else {
            continue;
        };
        for seed in seeds {
            let seed_str = space_to_binary_string(seed, &var_ordering);
            for (var, bit) in var_ordering.iter().zip(seed_str.chars()) {
                let color = if bit == '1' { Color::Green } else { Color::Red };
                stdout
                    .set_color(ColorSpec::new().set_fg(Some(color)))
                    .unwrap();
                let prefix = if bit == '1' { "" } else { "~" };
                write!(&mut stdout, "{prefix}{var} & ").unwrap();
            }
            stdout
                .set_color(ColorSpec::new().set_fg(Some(Color::White)))
                .unwrap();
            writeln!(&mut stdout).unwrap();
        }
    }
}
