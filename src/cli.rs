use anyhow::{anyhow, Result};
use clap::ArgMatches;

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub input_file: String,
    pub output_file: Option<String>,
    pub output_format: OutputFormat,
    pub equations_only: bool,
    pub verbose_level: u8,
}

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Json,
    Csv,
}

impl CliArgs {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let input_file = matches
            .get_one::<String>("input")
            .ok_or_else(|| anyhow!("Input file is required"))?
            .clone();

        let output_file = matches.get_one::<String>("output").cloned();
        let equations_only = matches.get_flag("equations");
        let verbose_level = matches.get_count("verbose");

        let output_format = match matches.get_one::<String>("format").unwrap().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => return Err(anyhow!("Invalid output format")),
        };

        Ok(CliArgs {
            input_file,
            output_file,
            output_format,
            equations_only,
            verbose_level,
        })
    }
}
