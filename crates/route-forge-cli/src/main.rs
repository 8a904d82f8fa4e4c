mod cli;
mod commands;
mod config;
#[allow(unused_assignments)]
mod diagnostic;
mod error;
mod logging;
mod output;
mod progress;

use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    let output = output::OutputContext::from_global(&cli.global);
    logging::init(&cli.global, output.use_color);

    let result = match cli.command {
        cli::Commands::Routes(args) => commands::routes::run(args, &cli.global, &output),
        cli::Commands::Check(args) => commands::check::run(args, &cli.global, &output).await,
        cli::Commands::Serve(args) => commands::serve::run(args, &cli.global, &output).await,
        cli::Commands::Completions(args) => {
            commands::completions::run(args);
            Ok(())
        }
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            output.print_error(&e);
            std::process::exit(e.exit_code() as i32);
        }
    }
}
