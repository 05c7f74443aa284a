use clap::{Command, Arg, crate_version};

use crate::report;

pub fn build_argparse() -> Command<'static> {
    Command::new("Database Report Bot")
        .about("Generate database reports and publish them to Persian Wikipedia")
        .version(crate_version!())
        .args(&[
            Arg::new("login")
                .long("login")
                .required(true)
                .takes_value(true)
                .help("Path to the JSON file with username and password"),
            Arg::new("report")
                .long("report")
                .required(true)
                .takes_value(true)
                .possible_values([report::REPORT_BROKEN_REDIRECTS, report::REPORT_MISSING_ARTICLES])
                .help("The report to generate and publish")
        ])
}
