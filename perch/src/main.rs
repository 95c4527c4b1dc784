use std::process::ExitCode;

use canopy::error::{Chainable, Error, Result};
use tracing_subscriber::EnvFilter;

use crate::render::Manifest;

mod render;

mod flags {
    use std::path::PathBuf;

    xflags::xflags! {
        /// Resolves a content tree and reports on it.
        cmd perch {
            /// The content root.
            required input: PathBuf
            /// Write a JSON manifest of every resolved node to this file.
            optional -m, --manifest manifest: PathBuf
            /// Print an outline of the tree.
            optional --outline
            /// Log at debug level.
            optional -v, --verbose
        }
    }
}

fn run(flags: &flags::Perch) -> Result<()> {
    let tree = canopy::time!("total", canopy::discover(&flags.input)?);
    if flags.outline {
        print!("{}", tree.outline());
    }

    if let Some(path) = &flags.manifest {
        let manifest = Manifest::build(&tree)?;
        let json = serde_json::to_string_pretty(&manifest).map_err(Error::from_std)?;
        std::fs::write(path, json)
            .chain_with(|| canopy::error!("failed to write manifest", "path" => path.display()))?;

        tracing::info!(path = %path.display(), nodes = manifest.nodes.len(), "wrote manifest");
    }

    println!(
        "{} nodes, {} tags, {} resources",
        tree.len(),
        tree.tag_cloud().len(),
        tree.resource_names().len(),
    );

    Ok(())
}

pub fn main() -> ExitCode {
    let flags = flags::Perch::from_env_or_exit();
    let filter = match flags.verbose {
        true => EnvFilter::new("debug"),
        false => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&flags) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
