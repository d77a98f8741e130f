use clap::{App, Arg};
use std::path::PathBuf;
use vellum::build::build_site;
use vellum::config::Config;

fn main() -> anyhow::Result<()> {
    let matches = App::new("vellum")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds a static blog from markdown posts")
        .arg(
            Arg::with_name("project")
                .help("Path to the project directory (defaults to the current directory)")
                .index(1),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .required(true)
                .help("Directory to write the generated site into"),
        )
        .arg(
            Arg::with_name("threads")
                .long("threads")
                .takes_value(true)
                .help("Number of worker threads for post parsing (defaults to the CPU count)"),
        )
        .get_matches();

    let project_directory = PathBuf::from(matches.value_of("project").unwrap_or("."));
    let output_directory = PathBuf::from(matches.value_of("output").unwrap());
    let threads = matches
        .value_of("threads")
        .map(str::parse::<usize>)
        .transpose()?;

    let config = Config::from_directory(&project_directory, &output_directory, threads)?;
    build_site(&config)?;
    Ok(())
}
