use anyhow::{anyhow, Result};
use env_logger::Env;
use clap::{Arg, Command, ArgAction, ArgMatches, crate_version};
use std::path::PathBuf;
use std::io::{BufReader, BufRead, BufWriter};
use std::fs::File;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

use tlsinspect::config::Config;
use tlsinspect::output::print_human_readable;
use tlsinspect::scan::{scan_runner, ScanOptions};
use tlsinspect::utils::{Target, parse_single_target};

fn output_args() -> Vec<clap::Arg> {
    vec![
        Arg::new("output")
            .short('o')
            .value_name("FILE")
            .long("output")
            .help("JSON file to write results to")
            .action(ArgAction::Set),
        Arg::new("json")
            .short('j')
            .long("json")
            .help("Print results as JSON to stdout instead of text")
            .action(ArgAction::SetTrue),
    ]
}

fn target_args() -> Vec<clap::Arg> {
    vec![
        Arg::new("target")
            .short('t')
            .long("target")
            .value_name("HOST[:PORT]")
            .help("HOST[:PORT], port defaults to 443")
            .conflicts_with("target-list")
            .action(ArgAction::Set),
        Arg::new("target-list")
            .short('T')
            .value_name("FILE")
            .long("target-list")
            .help("File listing HOST[:PORT] entries")
            .conflicts_with("target")
            .action(ArgAction::Set)
            .value_parser(clap::value_parser!(PathBuf)),
    ]
}

fn scan_args() -> Vec<clap::Arg> {
    vec![
        Arg::new("timeout")
            .long("timeout")
            .value_name("SECONDS")
            .help("Per-target budget covering DNS, connect and handshake")
            .default_value("10")
            .value_parser(clap::value_parser!(u64).range(1..)),
        Arg::new("threads")
            .long("threads")
            .value_name("N")
            .help("Number of concurrent scan workers")
            .default_value("20")
            .value_parser(clap::value_parser!(usize)),
    ]
}

fn get_targets(matches: &ArgMatches, default_port: Option<u16>) -> Result<Vec<Target>> {
    match matches.get_one::<String>("target") {
        Some(t) => {
            Ok(vec![parse_single_target(t, default_port)?])
        },
        None => {
            let f = matches.get_one::<PathBuf>("target-list")
                .ok_or_else(|| anyhow!("specify -t or -T"))?;
            let file = File::open(f)?;
            let reader = BufReader::new(file);
            let mut targets: Vec<Target> = Vec::new();

            for (line_no, line) in reader.lines().enumerate() {
                let line = line?;
                let line = line.trim();

                /* ignore blank lines and comment lines starting with # */
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                match parse_single_target(line, default_port) {
                    Ok(t) => {
                        targets.push(t)
                    },
                    Err(e) => {
                        return Err(anyhow!("Parsing HOST:PORT at line {} failed. {e}", line_no + 1));
                    }
                }
            }
            Ok(targets)
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let matches = Command::new("tlsinspect")
        .version(crate_version!())
        .propagate_version(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .about("TLS endpoint inspector with post-quantum cryptography detection")
        .flatten_help(true)

        .subcommand(
            Command::new("scan")
                .about("Inspect TLS endpoints")
                .next_help_heading("Target")
                .args(target_args())
                .next_help_heading("Scan")
                .args(scan_args())
                .next_help_heading("Output")
                .args(output_args())
                .disable_help_flag(true)
                .disable_version_flag(true)
        )
        .get_matches();

    match matches.subcommand() {
        Some(("scan", sub_matches)) => {
            let config = Config::with_timeout(Duration::from_secs(
                *sub_matches.get_one::<u64>("timeout").unwrap(),
            ));
            let targets = get_targets(sub_matches, Some(config.tls_config.default_port))?;
            let options = ScanOptions {
                num_threads: *sub_matches.get_one::<usize>("threads").unwrap(),
                targets,
            };

            let rt = Runtime::new()?;
            let scan = rt.block_on(scan_runner(Arc::new(config), options));

            if sub_matches.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&scan)?);
            } else {
                for result in &scan.results {
                    print_human_readable(result);
                }
            }

            if let Some(output_file) = sub_matches.get_one::<String>("output") {
                let f = File::create(output_file)?;
                let mut writer = BufWriter::new(f);
                serde_json::to_writer(&mut writer, &scan)?;
            }

            let failed = scan.results.iter().any(|r| !r.is_success());
            if failed {
                std::process::exit(1);
            }
        }
        _ => unreachable!("somehow reached this")
    }

    Ok(())
}
