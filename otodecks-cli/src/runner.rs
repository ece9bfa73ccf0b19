use std::{
    error::Error,
    io::{self, Write},
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use clap::ArgMatches;
use crossterm::{
    cursor, execute,
    terminal::{self, Clear, ClearType},
};
use log::{error, info, warn};
use otodecks_lib::constants::{CHANNELS, DEFAULT_BLOCK_SIZE, DEFAULT_SAMPLE_RATE};
use otodecks_lib::diagnostics::reporter::{DeckReport, Reporter};
use otodecks_lib::peaks;
use otodecks_lib::playback::{DeckSettings, SessionSettings};
use otodecks_lib::tools::format_duration;
use otodecks_lib::{deck_pair, AudioSource, Deck, Mixer, MixerSource, TransportControl};
use serde::Serialize;

use crate::{controls, logging};

pub type CliResult<T> = Result<T, Box<dyn Error>>;

const REPORT_INTERVAL: Duration = Duration::from_millis(50);

pub fn run(args: &ArgMatches, log_buffer: logging::LogBuffer) -> CliResult<i32> {
    match args.subcommand() {
        Some(("probe", sub)) => probe(sub),
        Some(("render", sub)) => render(sub),
        Some(("play", sub)) => play(sub, log_buffer),
        Some(("peaks", sub)) => print_peaks(sub),
        _ => {
            error!("no command given");
            Ok(-1)
        }
    }
}

#[derive(Serialize)]
struct ProbeRow {
    path: String,
    seconds: f64,
    length: String,
}

fn probe(args: &ArgMatches) -> CliResult<i32> {
    let mut rows = Vec::new();
    let mut failed = false;
    for file in args.get_many::<String>("FILES").into_iter().flatten() {
        match AudioSource::probe(file) {
            Ok(info) => {
                let seconds = info.length_seconds();
                rows.push(ProbeRow {
                    path: file.clone(),
                    seconds,
                    length: format_duration(seconds),
                });
            }
            Err(err) => {
                error!("{}: {}", file, err);
                failed = true;
            }
        }
    }

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in &rows {
            println!("{}\t{:.3}\t{}", row.path, row.seconds, row.length);
        }
    }

    Ok(if failed { -1 } else { 0 })
}

/// Both decks loaded and configured, with a prepared mixer.
struct Session {
    deck_a: Deck,
    deck_b: Deck,
    mixer: Mixer,
    block_size: usize,
    sample_rate: u32,
}

impl Session {
    fn from_args(args: &ArgMatches) -> CliResult<Self> {
        let mut settings = match args.get_one::<String>("settings") {
            Some(path) => SessionSettings::from_file(path)?,
            None => SessionSettings::default(),
        };
        if let Some(file) = args.get_one::<String>("deck-a") {
            settings.deck_a.file = Some(PathBuf::from(file));
        }
        if let Some(file) = args.get_one::<String>("deck-b") {
            settings.deck_b.file = Some(PathBuf::from(file));
        }
        if settings.deck_a.file.is_none() && settings.deck_b.file.is_none() {
            return Err("nothing to play: pass --deck-a, --deck-b or a settings file".into());
        }

        let block_size = args
            .get_one::<usize>("block-size")
            .copied()
            .or(settings.block_size)
            .unwrap_or(DEFAULT_BLOCK_SIZE);
        let sample_rate = args
            .get_one::<u32>("sample-rate")
            .copied()
            .or(settings.sample_rate)
            .unwrap_or(DEFAULT_SAMPLE_RATE);

        let (mut deck_a, chain_a) = deck_pair("A");
        let (mut deck_b, chain_b) = deck_pair("B");
        configure(&mut deck_a, &settings.deck_a)?;
        configure(&mut deck_b, &settings.deck_b)?;

        let mut mixer = Mixer::new(chain_a, chain_b);
        mixer.prepare_to_play(block_size, sample_rate);

        Ok(Self {
            deck_a,
            deck_b,
            mixer,
            block_size,
            sample_rate,
        })
    }

    /// Time until the longest deck reaches its end at its current speed.
    fn natural_length(&self) -> f64 {
        [&self.deck_a, &self.deck_b]
            .into_iter()
            .filter(|deck| deck.source_info().is_some())
            .map(|deck| {
                let params = deck.parameters();
                (deck.length_in_seconds() - params.position_seconds).max(0.0) / params.speed
            })
            .fold(0.0, f64::max)
    }
}

fn configure(deck: &mut Deck, settings: &DeckSettings) -> CliResult<()> {
    settings.apply(deck)?;
    if settings.file.is_some() && settings.autoplay {
        deck.start();
    }
    Ok(())
}

fn render(args: &ArgMatches) -> CliResult<i32> {
    let output = args
        .get_one::<String>("output")
        .ok_or("missing --output")?;
    let mut session = Session::from_args(args)?;

    let seconds = match args.get_one::<f64>("seconds").copied() {
        Some(seconds) if seconds.is_finite() && seconds > 0.0 => seconds,
        Some(seconds) => return Err(format!("invalid --seconds value {}", seconds).into()),
        None => session.natural_length(),
    };
    let looping = session.deck_a.is_looping() || session.deck_b.is_looping();
    if looping && args.get_one::<f64>("seconds").is_none() {
        warn!("a deck is looping; rendering one pass of the longest deck");
    }

    let spec = hound::WavSpec {
        channels: CHANNELS as u16,
        sample_rate: session.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(output, spec)?;

    let total_frames = (seconds * session.sample_rate as f64).round() as usize;
    let mut block = vec![0.0_f32; session.block_size * CHANNELS];
    let mut remaining = total_frames;
    while remaining > 0 {
        let frames = remaining.min(session.block_size);
        let out = &mut block[..frames * CHANNELS];
        session.mixer.next_block(out);
        for sample in out.iter() {
            writer.write_sample(*sample)?;
        }
        remaining -= frames;
    }
    writer.finalize()?;
    session.mixer.release_resources();

    info!(
        "rendered {} frames @ {} Hz to {}",
        total_frames, session.sample_rate, output
    );
    println!("{}\t{}", output, format_duration(seconds));
    Ok(0)
}

type ReportSlot = Arc<Mutex<Option<DeckReport>>>;

fn watch(deck: &Deck, slot: &ReportSlot) -> Reporter {
    let slot = slot.clone();
    let reporter = Reporter::new(deck.monitor(), REPORT_INTERVAL, move |report| {
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(report);
    });
    reporter.start();
    reporter
}

fn latest(slot: &ReportSlot) -> Option<DeckReport> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

fn play(args: &ArgMatches, log_buffer: logging::LogBuffer) -> CliResult<i32> {
    let Session {
        deck_a,
        deck_b,
        mixer,
        ..
    } = Session::from_args(args)?;

    let slots: [ReportSlot; 2] = Default::default();
    let reporters = [watch(&deck_a, &slots[0]), watch(&deck_b, &slots[1])];

    let stream = rodio::OutputStreamBuilder::open_default_stream()?;
    let sink = rodio::Sink::connect_new(stream.mixer());
    sink.append(MixerSource::new(mixer));
    sink.play();
    info!("playing; 1/2 start or stop a deck, l/k toggle loop, q quits");

    let _raw_mode = RawModeGuard::enable().ok();
    let mut stdout = io::stdout();
    loop {
        let mut line = format!(
            "{}   {}",
            controls::status_text(deck_a.name(), latest(&slots[0]).as_ref()),
            controls::status_text(deck_b.name(), latest(&slots[1]).as_ref())
        );
        if let Some(log_line) = logging::last_line(&log_buffer) {
            line.push_str("   ");
            line.push_str(&log_line);
        }
        let _ = execute!(stdout, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine));
        print!("{}", line);
        let _ = stdout.flush();

        if !controls::handle_key_event(&deck_a, &deck_b) {
            break;
        }
    }

    sink.stop();
    for reporter in &reporters {
        reporter.stop();
    }
    println!();
    Ok(0)
}

fn print_peaks(args: &ArgMatches) -> CliResult<i32> {
    let file = args.get_one::<String>("FILE").ok_or("missing FILE")?;
    let windows_per_second = args
        .get_one::<u32>("windows-per-second")
        .copied()
        .unwrap_or(peaks::DEFAULT_WINDOWS_PER_SECOND);
    let data = peaks::extract_peaks_from_file(file, windows_per_second)?;
    println!("{}", serde_json::to_string(&data)?);
    Ok(0)
}

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
