//! `beacon-server spec`: export the OpenAPI document.

use std::{
    fs,
    io::{self, Write},
    path::Path,
};

use crate::openapi::DocFormat;

/// Where the rendered document goes.
#[derive(Debug, PartialEq, Eq)]
enum Target<'a> {
    Stdout(DocFormat),
    File(&'a Path, DocFormat),
}

impl<'a> Target<'a> {
    fn parse(output: Option<&'a str>) -> Self {
        match output {
            None | Some("yaml") => Self::Stdout(DocFormat::Yaml),
            Some("json") => Self::Stdout(DocFormat::Json),
            Some(path) => {
                let path = Path::new(path);
                Self::File(path, DocFormat::for_path(path))
            }
        }
    }
}

/// Writes the document to stdout (`json`, `yaml` or nothing) or to the given file path.
///
/// # Errors
/// Returns an error if rendering fails or the output cannot be written.
pub fn generate_spec(output: Option<&str>) -> anyhow::Result<()> {
    match Target::parse(output) {
        Target::Stdout(format) => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(format.render()?.as_bytes())?;
            stdout.flush()?;
        }
        Target::File(path, format) => {
            fs::write(path, format.render()?)?;
            println!("wrote OpenAPI document to {}", path.display());
        }
    }
    Ok(())
}
