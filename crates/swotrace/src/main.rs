mod exit;
mod logging;
mod run;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use swotrace_pipeline::{HwEvent, HwEventMask, PipelineConfig};
use swotrace_transport::ExhaustionPolicy;
use tracing::debug;

use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::run::Input;

/// Hardware event kinds selectable with `--events`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum EventKind {
    Timestamp,
    Exception,
    PcSample,
    Dwt,
    ReadWrite,
    AccessWatch,
    OffsetWatch,
}

impl From<EventKind> for HwEvent {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Timestamp => HwEvent::Timestamp,
            EventKind::Exception => HwEvent::Exception,
            EventKind::PcSample => HwEvent::PcSample,
            EventKind::Dwt => HwEvent::Dwt,
            EventKind::ReadWrite => HwEvent::ReadWrite,
            EventKind::AccessWatch => HwEvent::AccessWatch,
            EventKind::OffsetWatch => HwEvent::OffsetWatch,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "swotrace",
    version,
    about = "Decode SWO trace (TPIU/ITM) into line-oriented text"
)]
struct Cli {
    /// Trace server to connect to.
    #[arg(
        short = 's',
        long,
        value_name = "HOST[:PORT]",
        env = "SWOTRACE_SERVER",
        default_value = "localhost:3443"
    )]
    server: String,

    /// Read trace from a file instead of a server.
    #[arg(short = 'f', long, value_name = "PATH", env = "SWOTRACE_FILE")]
    file: Option<PathBuf>,

    /// Stop at end of file instead of waiting for more data.
    #[arg(short = 'e', long)]
    eof: bool,

    /// Input is wrapped in TPIU frames.
    #[arg(short = 't', long)]
    tpiu: bool,

    /// TPIU channel carrying ITM data.
    #[arg(short = 'i', long, value_name = "CHANNEL", default_value_t = 1)]
    itm_channel: u8,

    /// Discard ITM data until a sync packet is seen.
    #[arg(short = 'n', long)]
    require_sync: bool,

    /// Print only the raw text written to stimulus channel 10.
    #[arg(short = 'l', long)]
    log_only: bool,

    /// Hardware events to print (comma-separated). Default: all.
    #[arg(long, value_name = "EVENTS", value_delimiter = ',')]
    events: Option<Vec<EventKind>>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: LogLevel,
}

impl Cli {
    fn input(&self) -> Input {
        match &self.file {
            Some(path) => Input::File {
                path: path.clone(),
                policy: if self.eof {
                    ExhaustionPolicy::Terminate
                } else {
                    ExhaustionPolicy::Poll
                },
            },
            None => Input::Server(self.server.clone()),
        }
    }

    fn pipeline_config(&self) -> PipelineConfig {
        let output_mask = match &self.events {
            Some(kinds) => kinds.iter().map(|kind| HwEvent::from(*kind)).collect(),
            None => HwEventMask::all(),
        };
        PipelineConfig {
            use_tpiu: self.tpiu,
            itm_channel: self.itm_channel,
            force_sync: self.require_sync,
            output_mask,
            log_only: self.log_only,
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // Help and version go to stdout and exit cleanly.
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            let _ = err.print();
            std::process::exit(exit::USAGE);
        }
    };
    init_logging(cli.log_format, cli.log_level);
    debug!(
        version = env!("CARGO_PKG_VERSION"),
        target = option_env!("SWOTRACE_BUILD_TARGET").unwrap_or("unknown"),
        "swotrace starting"
    );

    match run::run(&cli.input(), cli.pipeline_config()) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
