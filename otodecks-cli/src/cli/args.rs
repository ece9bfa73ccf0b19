//! CLI argument definitions for `otodecks-cli`.

use clap::{value_parser, Arg, ArgAction, Command};

fn deck_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("deck-a")
                .long("deck-a")
                .short('a')
                .value_name("FILE")
                .help("Audio file for deck A"),
        )
        .arg(
            Arg::new("deck-b")
                .long("deck-b")
                .short('b')
                .value_name("FILE")
                .help("Audio file for deck B"),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .value_name("JSON")
                .help("Session settings file with per-deck gain, speed, tone and EQ"),
        )
        .arg(
            Arg::new("block-size")
                .long("block-size")
                .value_name("FRAMES")
                .value_parser(value_parser!(usize))
                .help("Frames rendered per mixer block"),
        )
        .arg(
            Arg::new("sample-rate")
                .long("sample-rate")
                .value_name("HZ")
                .value_parser(value_parser!(u32))
                .help("Output sample rate"),
        )
}

/// Build the CLI argument parser and command definitions.
pub fn build_cli() -> Command {
    Command::new("otodecks")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Two-deck DJ mixer")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("probe")
                .about("Print the length of audio files without decoding them")
                .arg(
                    Arg::new("FILES")
                        .help("Audio files to probe")
                        .required(true)
                        .num_args(1..),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print results as JSON"),
                ),
        )
        .subcommand(
            deck_args(Command::new("render").about("Mix both decks offline into a WAV file"))
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_name("WAV")
                        .required(true)
                        .help("Destination WAV file"),
                )
                .arg(
                    Arg::new("seconds")
                        .long("seconds")
                        .value_name("SECONDS")
                        .value_parser(value_parser!(f64))
                        .help("Length to render, defaults to the longest deck"),
                ),
        )
        .subcommand(deck_args(
            Command::new("play").about("Play both decks through the default output device"),
        ))
        .subcommand(
            Command::new("peaks")
                .about("Print min/max waveform peaks as JSON")
                .arg(
                    Arg::new("FILE")
                        .help("Audio file to analyse")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("windows-per-second")
                        .long("windows-per-second")
                        .value_name("COUNT")
                        .value_parser(value_parser!(u32))
                        .default_value("100")
                        .help("Peak windows per second of audio"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_requires_output() {
        let result = build_cli().try_get_matches_from(["otodecks", "render", "--deck-a", "a.wav"]);
        assert!(result.is_err());
    }

    #[test]
    fn render_parses_numeric_flags() {
        let matches = build_cli()
            .try_get_matches_from([
                "otodecks",
                "render",
                "-a",
                "a.wav",
                "-o",
                "out.wav",
                "--seconds",
                "2.5",
                "--sample-rate",
                "48000",
            ])
            .expect("valid args");
        let (name, sub) = matches.subcommand().expect("subcommand");
        assert_eq!(name, "render");
        assert_eq!(sub.get_one::<f64>("seconds"), Some(&2.5));
        assert_eq!(sub.get_one::<u32>("sample-rate"), Some(&48_000));
        assert_eq!(sub.get_one::<usize>("block-size"), None);
    }
}
