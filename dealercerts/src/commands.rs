use clap::arg;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("dealercerts")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("dealercerts")
        .about(
            "Visits every unvisited dealership host, records new hosts found in TLS \
            certificates and classifies the dealers by manufacturer.",
        )
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner, spinner and informational logs").required(false))
        .arg(
            arg!(-d --"data-dir" <PATH>)
                .required(false)
                .help("Directory holding dealerurls.txt, hosts.json and classified-dealers.json")
                .default_value("."),
        )
        .arg(
            arg!(--"fetch-workers" <NUM_WORKERS>)
                .required(false)
                .help("Number of hosts fetched at the same time")
                .value_parser(clap::value_parser!(usize))
                .default_value("3"),
        )
        .arg(
            arg!(--"extract-workers" <NUM_WORKERS>)
                .required(false)
                .help("Number of landing pages parsed at the same time")
                .value_parser(clap::value_parser!(usize))
                .default_value("10"),
        )
        .arg(
            arg!(--"timeout" <SECONDS>)
                .required(false)
                .help("Request timeout in seconds")
                .value_parser(clap::value_parser!(u64))
                .default_value("10"),
        )
        .arg(
            arg!(-f --"format" <FORMAT>)
                .required(false)
                .help("Summary format: text, json")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
}
