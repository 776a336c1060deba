use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser as ArgParser, ValueEnum};
use rtsp_parser::{CallbackResult, Callbacks, Errno, Handle, HeadersAction, Kind, Parser};
use tracing_subscriber::EnvFilter;

const MAX_CHUNK_SIZE: u64 = 1 << 24;

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Request,
    Response,
    Both,
}

impl From<KindArg> for Kind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Request => Kind::Request,
            KindArg::Response => Kind::Response,
            KindArg::Both => Kind::Both,
        }
    }
}

#[derive(ArgParser)]
#[command(
    name = "rtsp-parse",
    about = "Parse a captured RTSP stream and print its events"
)]
struct Args {
    /// Capture to read; stdin when omitted
    file: Option<PathBuf>,

    /// Start-line grammar to accept
    #[arg(long, short, value_enum, default_value = "both")]
    kind: KindArg,

    /// Bytes handed to the parser per call
    #[arg(
        long,
        default_value_t = 4096,
        value_parser = clap::value_parser!(u64).range(1..=MAX_CHUNK_SIZE)
    )]
    chunk_size: u64,

    /// Accept malformed header names and values
    #[arg(long)]
    lenient: bool,
}

/// Prints each event as it is reported.
#[derive(Default)]
struct Printer {
    messages: usize,
    body_bytes: u64,
}

impl Callbacks for Printer {
    fn on_message_begin(&mut self, _: &mut Handle) -> CallbackResult {
        self.body_bytes = 0;
        tracing::info!(message = self.messages + 1, "message begin");
        Ok(())
    }

    fn on_url(&mut self, _: &mut Handle, at: &[u8]) -> CallbackResult {
        tracing::info!(url = %String::from_utf8_lossy(at), "url");
        Ok(())
    }

    fn on_status(&mut self, _: &mut Handle, at: &[u8]) -> CallbackResult {
        tracing::info!(status = %String::from_utf8_lossy(at), "status");
        Ok(())
    }

    fn on_header_field(&mut self, _: &mut Handle, at: &[u8]) -> CallbackResult {
        tracing::info!(field = %String::from_utf8_lossy(at), "header field");
        Ok(())
    }

    fn on_header_value(&mut self, _: &mut Handle, at: &[u8]) -> CallbackResult {
        tracing::info!(value = %String::from_utf8_lossy(at), "header value");
        Ok(())
    }

    fn on_headers_complete(&mut self, parser: &mut Handle) -> Result<HeadersAction, Errno> {
        match parser.method() {
            Some(method) => tracing::info!(
                %method,
                version = %format_args!("{}.{}", parser.rtsp_major(), parser.rtsp_minor()),
                "headers complete"
            ),
            None => tracing::info!(
                status = parser.status_code(),
                version = %format_args!("{}.{}", parser.rtsp_major(), parser.rtsp_minor()),
                "headers complete"
            ),
        }
        Ok(HeadersAction::Proceed)
    }

    fn on_body(&mut self, _: &mut Handle, at: &[u8]) -> CallbackResult {
        self.body_bytes += at.len() as u64;
        tracing::debug!(len = at.len(), "body");
        Ok(())
    }

    fn on_message_complete(&mut self, parser: &mut Handle) -> CallbackResult {
        self.messages += 1;
        tracing::info!(
            body = self.body_bytes,
            keep_alive = parser.should_keep_alive(),
            "message complete"
        );
        Ok(())
    }

    fn on_chunk_header(&mut self, parser: &mut Handle) -> CallbackResult {
        tracing::debug!(size = parser.content_length(), "chunk header");
        Ok(())
    }

    fn on_chunk_complete(&mut self, _: &mut Handle) -> CallbackResult {
        tracing::debug!("chunk complete");
        Ok(())
    }
}

fn open(path: Option<&PathBuf>) -> io::Result<Box<dyn Read>> {
    Ok(match path {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(io::stdin().lock()),
    })
}

/// Feed `input` through `parser`, returning the stream offset of the first
/// error.
fn parse<C: Callbacks>(
    parser: &mut Parser<C>,
    input: &mut dyn Read,
    chunk_size: usize,
) -> io::Result<Result<(), u64>> {
    let mut buf = vec![0; chunk_size];
    let mut offset = 0u64;

    loop {
        let n = input.read(&mut buf)?;
        if n == 0 {
            break;
        }

        let mut fragment = &buf[..n];
        loop {
            match parser.execute(fragment) {
                Ok(()) => break,
                Err(Errno::PausedUpgrade) => {
                    // Nothing speaks the upgraded protocol here; keep reading RTSP.
                    let pos = parser.error_pos();
                    tracing::warn!(
                        offset = offset + pos as u64,
                        "upgrade requested, continuing as RTSP"
                    );
                    parser.resume_after_upgrade();
                    offset += pos as u64;
                    fragment = &fragment[pos..];
                }
                Err(_) => return Ok(Err(offset + parser.error_pos() as u64)),
            }
        }
        offset += fragment.len() as u64;
    }

    match parser.finish() {
        Ok(()) => Ok(Ok(())),
        Err(_) => Ok(Err(offset)),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut input = match open(args.file.as_ref()) {
        Ok(input) => input,
        Err(e) => {
            tracing::error!("failed to open input: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut parser = Parser::new(args.kind.into(), Printer::default());
    parser.set_lenient(args.lenient);

    let chunk_size = usize::try_from(args.chunk_size).unwrap_or(4096);
    match parse(&mut parser, &mut *input, chunk_size) {
        Ok(Ok(())) => {
            tracing::info!(messages = parser.callbacks().messages, "done");
            ExitCode::SUCCESS
        }
        Ok(Err(offset)) => {
            tracing::error!(
                errno = parser.errno().name(),
                reason = parser.error_reason(),
                offset,
                "parse failed"
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("failed to read input: {e}");
            ExitCode::FAILURE
        }
    }
}
