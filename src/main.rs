use std::env;
use std::process::ExitCode;

use a2squery::{FragmentFormat, QueryOptions, SourceQueryError};

const USAGE: &str = "usage: a2squery <host:port> [info|players|rules] [--source]";

async fn run(host: &str, kind: &str, options: &QueryOptions) -> Result<(), SourceQueryError> {
    match kind {
        "players" => {
            let players = a2squery::players_async(host, options).await?;
            println!("{:#?}", players);
        }
        "rules" => {
            let rules = a2squery::rules_async(host, options).await?;
            println!("{:#?}", rules);
        }
        _ => {
            let info = a2squery::info_async(host, options).await?;
            println!("{:#?}", info);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(host) = args.first() else {
        eprintln!("{}", USAGE);
        return ExitCode::FAILURE;
    };
    let kind = args.get(1).map(String::as_str).unwrap_or("info");

    let mut options = QueryOptions::default();
    if args.iter().any(|arg| arg == "--source") {
        options = options.with_fragment_format(FragmentFormat::Source);
    }

    match run(host, kind, &options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
