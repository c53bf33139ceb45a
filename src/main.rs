use clap::Parser;

use biobench::Opts;
use biobench::cli::SubCommandExtend;
use biobench::config::SubCommand;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();

    match &opts.subcmd {
        SubCommand::Run(config) => config.run(&opts).await,
        SubCommand::Aggregate(config) => config.run(&opts).await,
        SubCommand::Biocode(config) => config.run(&opts).await,
    }
}
