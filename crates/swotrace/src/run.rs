use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::thread;

use swotrace_pipeline::{InnerDecoder, OuterDecoder, Pipeline, PipelineConfig, PipelineError};
use swotrace_transport::{
    parse_server, Chunk, ExhaustionPolicy, FileSource, TcpSource, TraceSource, TransportError,
    POLL_INTERVAL,
};
use tracing::{debug, info};

use crate::exit::{
    config_error, pipeline_error, transport_error, CliError, CliResult, CONNECTION_LOST, FAILURE,
    SUCCESS,
};

/// Where trace bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    File {
        path: PathBuf,
        policy: ExhaustionPolicy,
    },
    /// `host[:port]` of a trace server.
    Server(String),
}

#[derive(Debug)]
enum DriveError {
    Source(TransportError),
    Pipeline(PipelineError),
}

/// Decode `input` to stdout until it ends.
pub fn run(input: &Input, config: PipelineConfig) -> CliResult<i32> {
    let out = BufWriter::new(io::stdout().lock());
    let mut pipeline = Pipeline::new(config, out).map_err(config_error)?;

    let result = match input {
        Input::File { path, policy } => {
            let mut source = FileSource::open(path, *policy)
                .map_err(|err| transport_error("cannot open input", err))?;
            match drive(&mut source, &mut pipeline) {
                Ok(()) => Ok(SUCCESS),
                Err(DriveError::Source(err)) => {
                    Err(CliError::new(FAILURE, format!("file read failed: {err}")))
                }
                Err(DriveError::Pipeline(err)) => Err(pipeline_error("write failed", err)),
            }
        }
        Input::Server(spec) => {
            let (host, port) =
                parse_server(spec).map_err(|err| transport_error("invalid server", err))?;
            let mut source = TcpSource::connect(&host, port)
                .map_err(|err| transport_error("cannot connect", err))?;
            debug!(source = %source.describe(), "pumping");
            match drive(&mut source, &mut pipeline) {
                Ok(()) => Err(CliError::new(
                    CONNECTION_LOST,
                    "connection closed by trace server",
                )),
                Err(DriveError::Source(err)) => Err(CliError::new(CONNECTION_LOST, err.to_string())),
                Err(DriveError::Pipeline(err)) => Err(pipeline_error("write failed", err)),
            }
        }
    };

    log_summary(&pipeline);
    result
}

/// Pump chunks from `source` into `pipeline` until the source ends.
///
/// Empty reads are retried after [`POLL_INTERVAL`].
fn drive<S, W, O, I>(source: &mut S, pipeline: &mut Pipeline<W, O, I>) -> Result<(), DriveError>
where
    S: TraceSource + ?Sized,
    W: Write,
    O: OuterDecoder,
    I: InnerDecoder,
{
    loop {
        match source.next_chunk().map_err(DriveError::Source)? {
            Chunk::Data(bytes) => pipeline.process(bytes).map_err(DriveError::Pipeline)?,
            Chunk::Empty => thread::sleep(POLL_INTERVAL),
            Chunk::End => {
                debug!("trace source exhausted");
                return pipeline.flush().map_err(DriveError::Pipeline);
            }
        }
    }
}

fn log_summary<W: Write>(pipeline: &Pipeline<W>) {
    let stats = pipeline.stats();
    info!(
        bytes = stats.bytes,
        itm_bytes = stats.itm_bytes,
        messages = stats.messages,
        dropped_messages = stats.dropped_messages,
        overflows = stats.overflows,
        decode_errors = stats.decode_errors,
        "trace summary"
    );

    if pipeline.config().use_tpiu {
        let tpiu = pipeline.outer().stats();
        info!(
            frames = stats.frames,
            dropped_frames = stats.dropped_frames,
            unknown_channel_bytes = stats.unknown_channel_bytes,
            syncs = tpiu.syncs,
            lost_syncs = tpiu.lost_syncs,
            malformed = tpiu.malformed,
            "TPIU summary"
        );
    }

    let itm = pipeline.inner().stats();
    debug!(
        packets = itm.packets,
        syncs = itm.syncs,
        lost_syncs = itm.lost_syncs,
        errors = itm.errors,
        "ITM decoder"
    );
}
