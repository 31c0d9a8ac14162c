pub mod logging;
pub mod provider;

use crate::api::AuthMode;
use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        PossibleValuesParser, TypedValueParser,
    },
    Arg, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_AUTH_MODE: &str = "auth-mode";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("authgate")
        .about("Authentication gateway for a hosted identity provider")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("3000")
                .env("PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_AUTH_MODE)
                .long(ARG_AUTH_MODE)
                .help("How /protected-endpoint treats callers without a valid session")
                .long_help(
                    "How /protected-endpoint treats callers without a valid session.\n\n`lax` attaches a signed-out context and lets the request through, `strict` answers 401.",
                )
                .default_value("lax")
                .env("AUTHGATE_AUTH_MODE")
                .value_parser(
                    PossibleValuesParser::new(["lax", "strict"])
                        .try_map(|mode| mode.parse::<AuthMode>()),
                ),
        );

    let command = provider::with_args(command);
    logging::with_args(command)
}
