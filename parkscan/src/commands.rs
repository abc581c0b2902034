use clap::builder::BoolishValueParser;
use clap::{arg, value_parser};

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("parkscan")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("parkscan")
        .about("Sort a list of domains into live sites and parked placeholder pages")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-f --"file" <PATH>)
                .required(false)
                .help("Newline-delimited file of domains or URLs to check (wins over --url)"),
        )
        .arg(
            arg!(-u --"url" <URL>)
                .required(false)
                .help("A single domain or URL to check"),
        )
        .arg(
            arg!(-t --"threads" <NUM_WORKERS>)
                .required(false)
                .help("The number of async worker 'threads' used for large inputs.")
                .value_parser(value_parser!(i64))
                .allow_negative_numbers(true)
                .default_value("10"),
        )
        .arg(
            arg!(-k --"insecure")
                .required(false)
                .help("Skip TLS certificate verification")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(-v --"verbose")
                .required(false)
                .help("Also print parked, failed and blocked targets")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(-a --"accept-new-domain" <BOOL>)
                .required(false)
                .help("Follow redirects that leave the original domain")
                .value_parser(BoolishValueParser::new())
                .default_value("true"),
        )
        .arg(
            arg!(--"timeout" <SECONDS>)
                .required(false)
                .help("Per-request timeout in seconds")
                .value_parser(value_parser!(u64))
                .default_value("25"),
        )
        .arg(
            arg!(--"max-redirects" <HOPS>)
                .required(false)
                .help("Give up on a target after this many redirects")
                .value_parser(value_parser!(usize))
                .default_value("20"),
        )
        .arg(
            arg!(--"worker-policy" <POLICY>)
                .required(false)
                .help("literal: max(targets, threads) workers, bounded: min(targets, threads)")
                .value_parser(["literal", "bounded"])
                .default_value("literal"),
        )
        .arg(
            arg!(--"format" <FORMAT>)
                .required(false)
                .help("Output format: text, json")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
}
