use anyhow::{anyhow, Result};
use clap::{arg, Command};
use hc_utils::{jsonify, load_hyperparameters, u8s_from_str};
use log::info;
use serde::Serialize;
use serde_json::{Map, Value};
use std::{cell::RefCell, io::Write, path::PathBuf};

fn cli() -> Command {
    Command::new("hc-runtime")
        .about("Computes, evaluates and generates Hash Code solutions")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("compute_solution")
                .about("Solves a scenario and writes the submission file")
                .arg(
                    arg!(<CHALLENGE> "cache_allocation (c001) or ride_dispatch (c002)")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!([SCENARIO] "Scenario name, defaults to the built-in choice")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--input [INPUT] "Read this file instead of the scenario input")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--output [OUTPUT] "Write here instead of the scenario output")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--hyperparameters [HYPERPARAMETERS] "Json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                ),
        )
        .subcommand(
            Command::new("evaluate_solution")
                .about("Validates a submission file and prints its score")
                .arg(
                    arg!(<CHALLENGE> "cache_allocation (c001) or ride_dispatch (c002)")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!([SCENARIO] "Scenario name, defaults to the built-in choice")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--input [INPUT] "Read this file instead of the scenario input")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--solution [SOLUTION] "Read this file instead of the scenario output")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("generate_instance")
                .about("Writes a synthetic scenario in the input format")
                .arg(
                    arg!(<CHALLENGE> "cache_allocation (c001) or ride_dispatch (c002)")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(<TRACK> "Instance parameters, e.g. videos=100,endpoints=10,requests=500,caches=5,capacity=100")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--seed [SEED] "Any string, hashed into the random seed")
                        .default_value("0")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--output [OUTPUT] "Write here instead of stdout")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(Some(env_logger::fmt::TimestampPrecision::Millis))
        .init();
}

fn main() {
    init_logging();
    let matches = cli().get_matches();

    if let Err(e) = match matches.subcommand() {
        Some(("compute_solution", sub_m)) => compute_solution(
            sub_m.get_one::<String>("CHALLENGE").unwrap().clone(),
            sub_m.get_one::<String>("SCENARIO").cloned(),
            sub_m.get_one::<PathBuf>("input").cloned(),
            sub_m.get_one::<PathBuf>("output").cloned(),
            sub_m.get_one::<String>("hyperparameters").cloned(),
        ),
        Some(("evaluate_solution", sub_m)) => evaluate_solution(
            sub_m.get_one::<String>("CHALLENGE").unwrap().clone(),
            sub_m.get_one::<String>("SCENARIO").cloned(),
            sub_m.get_one::<PathBuf>("input").cloned(),
            sub_m.get_one::<PathBuf>("solution").cloned(),
        ),
        Some(("generate_instance", sub_m)) => generate_instance(
            sub_m.get_one::<String>("CHALLENGE").unwrap().clone(),
            sub_m.get_one::<String>("TRACK").unwrap().clone(),
            sub_m.get_one::<String>("seed").unwrap().clone(),
            sub_m.get_one::<PathBuf>("output").cloned(),
        ),
        _ => Err(anyhow!("Invalid subcommand")),
    } {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Runs `$body` with `$c` bound to the challenge module named by `$id`.
macro_rules! dispatch_challenge {
    ($id:expr, $c:ident => $body:block) => {{
        match challenge_id(&$id)? {
            "c001" => {
                use hc_challenges::c001 as $c;
                $body
            }
            "c002" => {
                use hc_challenges::c002 as $c;
                $body
            }
            other => Err(anyhow!("Unsupported challenge {}", other)),
        }
    }};
}

fn challenge_id(name: &str) -> Result<&'static str> {
    match name {
        "c001" | "cache_allocation" => Ok("c001"),
        "c002" | "ride_dispatch" => Ok("c002"),
        _ => Err(anyhow!(
            "Unknown challenge '{}', expected cache_allocation (c001) or ride_dispatch (c002)",
            name
        )),
    }
}

#[derive(Serialize)]
struct Report {
    challenge: String,
    scenario: String,
    input: String,
    solution: String,
    score: u64,
}

pub fn compute_solution(
    challenge: String,
    scenario: Option<String>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    hyperparameters: Option<String>,
) -> Result<()> {
    let hyperparameters: Option<Map<String, Value>> = match hyperparameters {
        Some(h) => Some(load_hyperparameters(&h)?),
        None => None,
    };

    dispatch_challenge!(challenge, c => {
        let scenario = match &scenario {
            Some(s) => s.parse::<c::Scenario>()?,
            None => c::DEFAULT_SCENARIO,
        };
        let input = input.unwrap_or_else(|| scenario.input_path());
        let output = output.unwrap_or_else(|| scenario.output_path());

        let instance = c::Challenge::from_file(&input)?;
        info!("Loaded scenario {} from {:?}", scenario, input);

        let solution = RefCell::new(c::Solution::new());
        let save_solution_fn = |s: &c::Solution| -> Result<()> {
            *solution.borrow_mut() = s.clone();
            Ok(())
        };
        c::baselines::solve_challenge(&instance, &save_solution_fn, &hyperparameters)?;
        let solution = solution.into_inner();

        let score = instance.evaluate_solution(&solution)?;
        solution.write_file(&output)?;
        println!("solution written to: {:?}", output);
        println!(
            "{}",
            jsonify(&Report {
                challenge: challenge.clone(),
                scenario: scenario.to_string(),
                input: input.display().to_string(),
                solution: output.display().to_string(),
                score,
            })
        );
        Ok(())
    })
}

pub fn evaluate_solution(
    challenge: String,
    scenario: Option<String>,
    input: Option<PathBuf>,
    solution: Option<PathBuf>,
) -> Result<()> {
    dispatch_challenge!(challenge, c => {
        let scenario = match &scenario {
            Some(s) => s.parse::<c::Scenario>()?,
            None => c::DEFAULT_SCENARIO,
        };
        let input = input.unwrap_or_else(|| scenario.input_path());
        let solution_path = solution.unwrap_or_else(|| scenario.output_path());

        let instance = c::Challenge::from_file(&input)?;
        let solution = c::Solution::from_file(&solution_path, &instance)?;
        let score = instance
            .evaluate_solution(&solution)
            .map_err(|e| anyhow!("Invalid solution: {}", e))?;
        println!(
            "{}",
            jsonify(&Report {
                challenge: challenge.clone(),
                scenario: scenario.to_string(),
                input: input.display().to_string(),
                solution: solution_path.display().to_string(),
                score,
            })
        );
        Ok(())
    })
}

pub fn generate_instance(
    challenge: String,
    track: String,
    seed: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let seed = u8s_from_str(&seed);

    dispatch_challenge!(challenge, c => {
        let track = track.parse::<c::Track>()?;
        let instance = c::Challenge::generate_instance(&seed, &track)?;
        match &output {
            Some(path) => {
                instance.write_file(path)?;
                println!("instance written to: {:?}", path);
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                instance.write(&mut stdout)?;
                stdout.flush()?;
            }
        }
        Ok(())
    })
}
