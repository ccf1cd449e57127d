//! Command line front end.
//!
//! ```text
//! tttr-fcs info sample.ptu
//! tttr-fcs correlate sample.ptu --ch1 0 --ch2 1,2 --method wahl --out curve.npz
//! tttr-fcs trace sample.ptu --resolution 1e-3 --out trace.npy
//! ```
//!
//! `RUST_LOG` sets the log level (default: info).
use std::env;
use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use ndarray::Array1;
use ndarray_npy::{write_npy, NpzWriter};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tttr_fcs::headers::File;
use tttr_fcs::tttr_tools::selection::CountRateParams;
use tttr_fcs::{ContainerType, CorrelationMethod, Correlator, CorrelatorSettings, EventStream};

fn input_args<'a, 'b>() -> Vec<Arg<'a, 'b>> {
    vec![
        Arg::with_name("FILE").help("TTTR file to read").required(true).index(1),
        Arg::with_name("container")
            .long("container")
            .takes_value(true)
            .possible_values(&["ptu", "spc130", "spc600-256", "spc600-4096"])
            .default_value("ptu")
            .help("Container format of FILE"),
    ]
}

fn open_stream(matches: &ArgMatches) -> Result<EventStream> {
    let path = matches.value_of("FILE").ok_or_else(|| anyhow!("FILE is required"))?;
    let container: ContainerType = matches.value_of("container").unwrap_or("ptu").parse()?;
    let start = Instant::now();
    let stream = EventStream::from_file(path, container).with_context(|| format!("Failed to read {}", path))?;
    info!("Decoded {} events from {} in {:?}", stream.len(), path, start.elapsed());
    Ok(stream)
}

fn parse_value<T: std::str::FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<T>> {
    match matches.value_of(name) {
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("Invalid value {:?} for --{}", s, name)),
        None => Ok(None),
    }
}

/// Comma separated list of routing channels.
fn parse_channels(matches: &ArgMatches, name: &str) -> Result<Option<Vec<i16>>> {
    match matches.value_of(name) {
        Some(s) => s
            .split(',')
            .map(|c| {
                c.trim()
                    .parse()
                    .map_err(|_| anyhow!("Invalid channel {:?} for --{}", c, name))
            })
            .collect::<Result<Vec<i16>>>()
            .map(Some),
        None => Ok(None),
    }
}

fn info_command(matches: &ArgMatches) -> Result<()> {
    let path = matches.value_of("FILE").ok_or_else(|| anyhow!("FILE is required"))?;
    let container: ContainerType = matches.value_of("container").unwrap_or("ptu").parse()?;
    let file = File::open(path, container).with_context(|| format!("Failed to open {}", path))?;
    if let File::PTU(ptu) = &file {
        println!("{}", ptu);
    }

    let stream = EventStream::from_tttr_file(file.as_tttr_file()).with_context(|| format!("Failed to read {}", path))?;
    let calibration = stream.calibration();
    println!("Record format: {}", calibration.record_format);
    println!("Macro time resolution: {:e} s", calibration.macro_time_resolution);
    println!("Micro time resolution: {:e} s", calibration.micro_time_resolution);
    println!("Micro time channels: {}", calibration.number_of_micro_time_channels);
    println!("Records: {}", stream.n_records_read());
    println!("Events: {}", stream.len());
    println!("Channels: {:?}", stream.used_channels());
    println!("Acquisition time: {:.6} s", stream.acquisition_time());
    println!("Mean count rate: {:.1} Hz", stream.mean_count_rate());
    Ok(())
}

fn correlate_command(matches: &ArgMatches) -> Result<()> {
    let stream = open_stream(matches)?;

    let stream = match parse_value::<u64>(matches, "burst-window")? {
        Some(window) => {
            let max_photons = parse_value(matches, "burst-photons")?.unwrap_or(usize::MAX);
            let params = CountRateParams { window, max_photons, invert: false };
            stream.select(&stream.select_by_count_rate(&params))?
        }
        None => stream,
    };

    let ch1 = parse_channels(matches, "ch1")?.unwrap_or_else(|| vec![0]);
    let first = stream.select(&stream.select_by_channel(&ch1))?;
    let second = match parse_channels(matches, "ch2")? {
        Some(ch2) => Some(stream.select(&stream.select_by_channel(&ch2))?),
        None => None,
    };

    let defaults = CorrelatorSettings::default();
    let settings = CorrelatorSettings {
        n_bins: parse_value(matches, "n-bins")?.unwrap_or(defaults.n_bins),
        n_casc: parse_value(matches, "n-casc")?.unwrap_or(defaults.n_casc),
        method: CorrelationMethod::Wahl,
        make_fine: matches.is_present("fine"),
    };
    let mut correlator = Correlator::new(settings);
    let method = correlator.set_correlation_method(matches.value_of("method").unwrap_or("wahl"));
    correlator.set_tttr(&first, second.as_ref(), settings.make_fine);

    let start = Instant::now();
    let curve = correlator.get_curve();
    info!("Computed {} correlation with {} lags in {:?}", method, curve.len(), start.elapsed());

    let x = Array1::from(curve.x_axis_seconds());
    let corr = Array1::from(curve.correlation().to_vec());
    let corr_normalized = Array1::from(curve.corr_normalized().to_vec());

    match matches.value_of("out") {
        Some(out) => {
            let mut npz = NpzWriter::new(fs::File::create(out)?);
            npz.add_array("x", &x)?;
            npz.add_array("corr", &corr)?;
            npz.add_array("corr_normalized", &corr_normalized)?;
            npz.finish()?;
            info!("Curve written to {}", out);
        }
        None => {
            for ((t, c), g) in x.iter().zip(corr.iter()).zip(corr_normalized.iter()) {
                println!("{:e}\t{}\t{}", t, c, g);
            }
        }
    }
    Ok(())
}

fn trace_command(matches: &ArgMatches) -> Result<()> {
    let stream = open_stream(matches)?;
    let resolution: f64 = parse_value(matches, "resolution")?.unwrap_or(1e-3);
    let channel = parse_value::<i16>(matches, "channel")?;
    let trace = Array1::from(stream.intensity_trace(resolution, channel));

    match matches.value_of("out") {
        Some(out) => {
            write_npy(Path::new(out), &trace)?;
            info!("Trace of {} bins written to {}", trace.len(), out);
        }
        None => {
            for counts in trace.iter() {
                println!("{}", counts);
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = App::new("tttr-fcs")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(SubCommand::with_name("info").about("Print the header and a summary of the stream").args(&input_args()))
        .subcommand(
            SubCommand::with_name("correlate")
                .about("Compute a correlation curve")
                .args(&input_args())
                .arg(Arg::with_name("ch1").long("ch1").takes_value(true).help("Routing channels of the first stream, comma separated [default: 0]"))
                .arg(
                    Arg::with_name("ch2")
                        .long("ch2")
                        .takes_value(true)
                        .help("Routing channels of the second stream, autocorrelation of ch1 if omitted"),
                )
                .arg(
                    Arg::with_name("method")
                        .long("method")
                        .takes_value(true)
                        .default_value("wahl")
                        .help("wahl, felekyan or laurence"),
                )
                .arg(Arg::with_name("n-bins").long("n-bins").takes_value(true).help("Lag bins per cascade [default: 17]"))
                .arg(Arg::with_name("n-casc").long("n-casc").takes_value(true).help("Number of cascades [default: 25]"))
                .arg(Arg::with_name("fine").long("fine").help("Fold micro times into the time axis"))
                .arg(
                    Arg::with_name("burst-window")
                        .long("burst-window")
                        .takes_value(true)
                        .help("Drop bursts: window length in macro time units"),
                )
                .arg(
                    Arg::with_name("burst-photons")
                        .long("burst-photons")
                        .takes_value(true)
                        .requires("burst-window")
                        .help("Drop bursts: photons per window at which a window is rejected"),
                )
                .arg(Arg::with_name("out").long("out").short("o").takes_value(true).help("Write x, corr and corr_normalized to this npz file")),
        )
        .subcommand(
            SubCommand::with_name("trace")
                .about("Compute the intensity trace")
                .args(&input_args())
                .arg(
                    Arg::with_name("resolution")
                        .long("resolution")
                        .takes_value(true)
                        .help("Bin width in seconds [default: 1e-3]"),
                )
                .arg(Arg::with_name("channel").long("channel").takes_value(true).help("Only count this routing channel"))
                .arg(Arg::with_name("out").long("out").short("o").takes_value(true).help("Write the trace to this npy file")),
        )
        .get_matches();

    match matches.subcommand() {
        ("info", Some(m)) => info_command(m),
        ("correlate", Some(m)) => correlate_command(m),
        ("trace", Some(m)) => trace_command(m),
        _ => Err(anyhow!("Unknown subcommand")),
    }
}
