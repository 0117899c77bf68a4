use clap::Args as ClapArgs;
use color_eyre::eyre::{Context, Result};

#[derive(ClapArgs)]
pub struct Args {
    /// Chemin d'un fichier source `.glint`.
    pub path: std::path::PathBuf,

    /// Chemin du bundle de sortie.
    #[arg(short, long)]
    pub out: std::path::PathBuf,

    /// Clé symétrique encodée en hexadécimal (longueur paire) ; si fournie,
    /// le bundle est signé en HMAC-SHA256.
    #[arg(long)]
    pub sign_key: Option<String>,
}

pub fn exec(args: Args) -> Result<()> {
    let source = std::fs::read_to_string(&args.path)
        .wrap_err_with(|| format!("reading {}", args.path.display()))?;

    let program = glint_compiler::compile(&source).map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;

    let key = args
        .sign_key
        .as_deref()
        .map(hex::decode)
        .transpose()
        .wrap_err("--sign-key must be an even-length hex string")?;

    let bytes = glint_runtime::encode_bundle(&program, key.as_deref());
    std::fs::write(&args.out, bytes).wrap_err_with(|| format!("writing {}", args.out.display()))?;

    Ok(())
}
