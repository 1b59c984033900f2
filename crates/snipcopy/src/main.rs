use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = snipcopy::cli::Cli::parse();
    snipcopy::init(cli.verbose);

    cli.run()
}
