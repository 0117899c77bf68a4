use clap::Args as ClapArgs;
use color_eyre::eyre::{Context, Result};
use glint_runtime::{NativeCallable, Runtime};
use glint_vm::NativeRegistry;

#[derive(ClapArgs)]
pub struct Args {
    /// Chemin d'un fichier source `.glint`.
    pub path: std::path::PathBuf,

    /// Fonction d'entrée à appeler.
    #[arg(long, default_value = "main")]
    pub entry: String,
}

pub fn exec(args: Args) -> Result<()> {
    let source = std::fs::read_to_string(&args.path)
        .wrap_err_with(|| format!("reading {}", args.path.display()))?;

    let rt = Runtime::new(default_natives());
    let value = rt
        .run_source(&source, &args.entry)
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;

    println!("{value}");
    Ok(())
}

/// Natives disponibles pour les commandes `run`/`run-bundle`. La surface
/// d'embarquement proprement dite relève de la bibliothèque ; la CLI n'a
/// besoin que de quoi exécuter des scripts qui affichent des choses.
pub fn default_natives() -> NativeRegistry {
    let mut natives = NativeRegistry::new();
    natives.register(NativeCallable::new("log", 1, |args| {
        println!("{}", args[0].as_string());
        Ok(glint_bytecode::Value::Null)
    }));
    natives
}
