use clap::{Parser, Subcommand};

pub mod commands;

#[derive(Parser)]
#[command(name = "glint", version, about = "glint scripting runtime CLI", long_about = None)]
pub struct Cli {
    /// Verbosité (répéter pour plus de bruit).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Exécuter `main` depuis un fichier source.
    Run(commands::run::Args),
    /// Compiler un fichier source en bundle, éventuellement signé.
    Compile(commands::compile::Args),
    /// Exécuter un bundle compilé, en vérifiant sa signature si demandé.
    RunBundle(commands::run_bundle::Args),
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(cmd = ?std::mem::discriminant(&cli.cmd), "dispatching command");

    match cli.cmd {
        Cmd::Run(a) => commands::run::exec(a),
        Cmd::Compile(a) => commands::compile::exec(a),
        Cmd::RunBundle(a) => commands::run_bundle::exec(a),
    }
}
