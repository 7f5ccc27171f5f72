extern crate clap;
extern crate hyperforest;

use clap::{App, Arg, ArgMatches, SubCommand};
use hyperforest::best_path::{best_path, Derivation, NBest};
use hyperforest::composition::{compose, ComposeOptions};
use hyperforest::determinization::{determinize, DeterminizeOptions};
use hyperforest::inside_outside::{inside, outside};
use hyperforest::pruning::{prune_beam, prune_to_nbest, PruneOptions};
use hyperforest::{HgError, Hypergraph, Result, Viterbi, Vocabulary};
use std::fs::File;
use std::io::{stdin, Read};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn input_arg() -> Arg<'static, 'static> {
    Arg::with_name("hypergraph")
        .index(1)
        .required(false)
        .help("Hypergraph file. Reads from stdin if not provided.")
}

fn get_sub_commands() -> Vec<App<'static, 'static>> {
    vec![
        SubCommand::with_name("best")
            .about("Prints the best derivation of the final state.")
            .arg(input_arg()),
        SubCommand::with_name("nbest")
            .about("Prints the k best derivations of the final state, best first.")
            .arg(
                Arg::with_name("k")
                    .short("k")
                    .takes_value(true)
                    .default_value("1")
                    .help("Number of derivations."),
            )
            .arg(input_arg()),
        SubCommand::with_name("prune")
            .about("Removes states and arcs that lie on no good derivation.")
            .arg(
                Arg::with_name("beam")
                    .short("b")
                    .long("beam")
                    .takes_value(true)
                    .help("Keeps everything within this cost of the best derivation."),
            )
            .arg(
                Arg::with_name("nbest")
                    .short("n")
                    .long("nbest")
                    .takes_value(true)
                    .conflicts_with("beam")
                    .help("Keeps everything on derivations no worse than the n-th best cost."),
            )
            .arg(
                Arg::with_name("keep-ids")
                    .long("keep-ids")
                    .takes_value(false)
                    .help("Does not renumber the remaining states."),
            )
            .arg(input_arg()),
        SubCommand::with_name("compose")
            .about("Composes two finite-state hypergraphs.")
            .arg(
                Arg::with_name("nbest")
                    .short("n")
                    .long("nbest")
                    .takes_value(true)
                    .help("Keeps only the n cheapest product states on the frontier."),
            )
            .arg(
                Arg::with_name("max-expansions")
                    .long("max-expansions")
                    .takes_value(true)
                    .help("Fails after expanding this many product states."),
            )
            .arg(Arg::with_name("left").index(1).required(true).help("Left operand."))
            .arg(Arg::with_name("right").index(2).required(true).help("Right operand.")),
        SubCommand::with_name("determinize")
            .about("Determinizes a finite-state acceptor.")
            .arg(
                Arg::with_name("max-states")
                    .long("max-states")
                    .takes_value(true)
                    .help("Fails after creating this many states."),
            )
            .arg(input_arg()),
        SubCommand::with_name("inside")
            .about("Prints the inside and outside cost of every state.")
            .arg(input_arg()),
    ]
}

fn read_text(path: Option<&str>) -> Result<String> {
    let mut text = String::new();
    match path {
        Some(path) => File::open(path)?.read_to_string(&mut text)?,
        None => stdin().read_to_string(&mut text)?,
    };
    Ok(text)
}

fn read_hypergraph(path: Option<&str>, vocabulary: &Arc<Vocabulary>) -> Result<Hypergraph<Viterbi>> {
    Hypergraph::parse(&read_text(path)?, Arc::clone(vocabulary))
}

fn number<T: std::str::FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<T>> {
    match matches.value_of(name) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| HgError::Config(format!("--{} expects a number, got {:?}", name, value))),
    }
}

fn print_derivation(hg: &Hypergraph<Viterbi>, derivation: &Derivation<Viterbi>) {
    let vocabulary = hg.vocabulary();
    let words: Vec<String> = derivation
        .yield_labels(hg)
        .into_iter()
        .filter_map(|label| vocabulary.str(label.input))
        .collect();
    let arcs: Vec<String> = derivation.arcs().iter().map(|a| a.to_string()).collect();
    println!("{}\t{}\t[{}]", derivation.weight, words.join(" "), arcs.join(" "));
}

fn handle_sub_matches(name: &str, matches: &ArgMatches) -> Result<()> {
    let vocabulary = Arc::new(Vocabulary::new());
    match name {
        "best" => {
            let mut hg = read_hypergraph(matches.value_of("hypergraph"), &vocabulary)?;
            hg.force_in_arcs();
            hg.force_some_out_arcs();
            match best_path(&hg)? {
                Some(derivation) => print_derivation(&hg, &derivation),
                None => println!("no derivation"),
            }
        }
        "nbest" => {
            let k: usize = number(matches, "k")?.unwrap_or(1);
            let mut hg = read_hypergraph(matches.value_of("hypergraph"), &vocabulary)?;
            hg.force_in_arcs();
            hg.force_some_out_arcs();
            for derivation in NBest::new(&hg)?.take(k) {
                print_derivation(&hg, &derivation?);
            }
        }
        "prune" => {
            let mut hg = read_hypergraph(matches.value_of("hypergraph"), &vocabulary)?;
            let mut options = PruneOptions::default();
            options.set_pack_states(!matches.is_present("keep-ids"));
            if let Some(k) = number(matches, "nbest")? {
                prune_to_nbest(&mut hg, k, &options)?;
            } else {
                let beam: f64 = number(matches, "beam")?.unwrap_or(0.0);
                prune_beam(&mut hg, beam, &options)?;
            }
            print!("{}", hg);
        }
        "compose" => {
            let mut left = read_hypergraph(matches.value_of("left"), &vocabulary)?;
            let mut right = read_hypergraph(matches.value_of("right"), &vocabulary)?;
            left.force_some_out_arcs();
            right.force_some_out_arcs();
            let mut options = ComposeOptions::default();
            options.set_prune_to_nbest(number(matches, "nbest")?);
            options.set_max_expansions(number(matches, "max-expansions")?);
            print!("{}", compose(&left, &right, &options)?);
        }
        "determinize" => {
            let mut hg = read_hypergraph(matches.value_of("hypergraph"), &vocabulary)?;
            hg.force_some_out_arcs();
            let mut options = DeterminizeOptions::default();
            options.set_max_states(number(matches, "max-states")?);
            print!("{}", determinize(&hg, &options)?);
        }
        "inside" => {
            let mut hg = read_hypergraph(matches.value_of("hypergraph"), &vocabulary)?;
            hg.force_in_arcs();
            hg.force_some_out_arcs();
            let ins = inside(&hg)?;
            let outs = outside(&hg, &ins)?;
            for state in hg.states() {
                println!("{}\t{}\t{}", state, ins.value(state), outs.value(state));
            }
            println!("total\t{}", ins.total(&hg));
        }
        _ => (),
    }
    Ok(())
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let matches = App::new("hyperforest")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Weighted hypergraphs: composition, determinization, pruning and k-best extraction over the tropical semiring.")
        .subcommands(get_sub_commands())
        .get_matches();

    if let (name, Some(sub_matches)) = matches.subcommand() {
        if let Err(e) = handle_sub_matches(name, sub_matches) {
            eprintln!("hyperforest {}: {}", name, e);
            process::exit(1);
        }
    } else {
        eprintln!("{}", matches.usage());
        process::exit(2);
    }
}
