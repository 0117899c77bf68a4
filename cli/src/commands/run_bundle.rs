use clap::Args as ClapArgs;
use color_eyre::eyre::{Context, Result};
use glint_runtime::Runtime;

#[derive(ClapArgs)]
pub struct Args {
    /// Chemin d'un bundle produit par `glint compile`.
    pub path: std::path::PathBuf,

    /// Clé symétrique encodée en hexadécimal (longueur paire). La
    /// vérification n'a lieu que si elle est fournie ; sans clé, la
    /// signature du bundle est ignorée.
    #[arg(long)]
    pub key: Option<String>,

    /// Fonction d'entrée à appeler.
    #[arg(long, default_value = "main")]
    pub entry: String,
}

pub fn exec(args: Args) -> Result<()> {
    let bytes = std::fs::read(&args.path).wrap_err_with(|| format!("reading {}", args.path.display()))?;

    let key = args.key.as_deref().map(hex::decode).transpose().wrap_err("--key must be an even-length hex string")?;

    let rt = Runtime::new(super::run::default_natives());
    let value = rt
        .run_bundle(&bytes, key.as_deref(), &args.entry)
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;

    println!("{value}");
    Ok(())
}
