extern crate mediawiki;
extern crate clap;
extern crate tokio;
extern crate tracing;
extern crate tracing_subscriber;
extern crate serde_json;

use std::fs;
use mediawiki::api::Api;
use tracing::{info_span, debug, info, error, Level, Instrument};
use tracing_subscriber::fmt::format::FmtSpan;

mod anchor;
mod api;
mod arg;
mod db;
mod format;
mod output;
mod report;
mod types;

const API_ENDPOINT: &str = "https://fa.wikipedia.org/w/api.php";

/// The main function parses command line arguments and reads the login file.
/// The selected report routine then runs to completion; any failure aborts
/// the process with a non-zero exit status.
#[tokio::main]
async fn main() {
    // set up subscriber
    #[cfg(debug_assertions)]
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).with_span_events(FmtSpan::CLOSE).init();
    #[cfg(not(debug_assertions))]
    tracing_subscriber::fmt().with_max_level(Level::INFO).with_span_events(FmtSpan::NONE).init();

    let args = info_span!(target: "bootstrap", "cli arg").in_scope(|| {
        debug!(target: "bootstrap", "parsing command line arguments");
        arg::build_argparse().get_matches()
    });

    let login = info_span!(target: "bootstrap", "local config").in_scope(|| {
        info!(target: "bootstrap", "reading login file");
        let login = fs::read_to_string(args.value_of("login").unwrap()).expect("cannot open login file");
        debug!(target: "bootstrap", "parsing login file");
        let login: types::LoginCredential = serde_json::from_str(&login).expect("cannot parse login file");
        info!(target: "bootstrap", "read login file success");
        login
    });

    // initialize mediawiki api instance
    let mut api = async {
        info!(target: "bootstrap", "creating API object");
        debug!(target: "bootstrap", "accessing MediaWiki Action API endpoint \"{}\"", API_ENDPOINT);
        let mut api: Api = Api::new(API_ENDPOINT).await.expect("cannot access target MediaWiki instance");
        debug!(target: "bootstrap", "setting up API object maxlag");
        api.set_maxlag(Some(5));
        debug!(target: "bootstrap", "setting up API max retry attempts");
        api.set_max_retry_attempts(3);
        debug!(target: "bootstrap", "setting up API user agent");
        api.set_user_agent(format!("Database Report Bot / via User:{}", &login.username));
        info!(target: "bootstrap", "creating API object success");
        api
    }.instrument(info_span!(target: "bootstrap", "api init")).await;

    async {
        info!(target: "bootstrap", "logging in as user \"{}\"", &login.username);
        api.login(&login.username, &login.password).await.expect("cannot log in");
        info!(target: "bootstrap", "logging in as user \"{}\" success", &login.username);
    }.instrument(info_span!(target: "bootstrap", "log in")).await;

    let report = args.value_of("report").unwrap();
    let result = match report {
        report::REPORT_BROKEN_REDIRECTS => {
            report::redirects::run(&mut api)
                .instrument(info_span!(target: "report", "broken section redirects"))
                .await
        }
        report::REPORT_MISSING_ARTICLES => {
            report::missing::run(&mut api)
                .instrument(info_span!(target: "report", "missing articles"))
                .await
        }
        // clap rejects anything outside the possible values
        _ => unreachable!(),
    };

    match result {
        Ok(()) => info!(target: "report", report = report, "report run complete"),
        Err(e) => {
            error!(target: "report", report = report, error = %e, "report run failed");
            std::process::exit(1);
        }
    }
}
