//! Validate command

use crate::app::{OutputFormat, ValidateArgs};
use anyhow::Result;
use wikismith_core::{parse_model_response, WikiForest, WikismithError};

pub fn run(args: ValidateArgs, format: OutputFormat) -> Result<()> {
    let response = std::fs::read_to_string(&args.file).map_err(WikismithError::from)?;
    let structure = parse_model_response(&response)?;
    let forest = WikiForest::build(&structure).map_err(WikismithError::from)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&structure)?);
        }
        OutputFormat::Cli => {
            println!("{} ({})", structure.title, structure.id);
            if !structure.description.is_empty() {
                println!("{}", structure.description);
            }
            println!(
                "{} pages, {} root(s)",
                structure.pages.len(),
                forest.roots().len()
            );
            println!();
            print!("{}", forest.outline(&structure));
        }
    }
    Ok(())
}
