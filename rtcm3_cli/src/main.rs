use std::{
    fs::File,
    io::{self, BufWriter, ErrorKind, Read, Write},
    num::NonZeroUsize,
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::ValueEnum;
use rtcm3::{Decoder, DecoderOptions, MsmDecoder, Parser, ScaleFlags};
use tracing::info;

mod logging;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Subset {
    Msm123,
    Msm4567,
}

/// Decode RTCM3 MSM messages from a file or stdin, one JSON object per line
#[derive(Debug, clap::Parser)]
#[command(name = "rtcm3-decode", author, version, about)]
struct Cli {
    /// Input file, `-` for stdin
    #[arg(default_value = "-")]
    input: PathBuf,

    /// Bytes handed to the synchronizer per read
    #[arg(long, default_value = "1024")]
    chunk_size: NonZeroUsize,

    /// Print raw integer fields instead of scaled observables
    #[arg(long)]
    bare: bool,

    /// Report carrier phase even with unresolved half-cycle ambiguity
    #[arg(long)]
    half_cycle: bool,

    /// MSM sub-decoders to register
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [Subset::Msm123, Subset::Msm4567]
    )]
    subsets: Vec<Subset>,

    /// Log filter, e.g. `warn` or `rtcm3=debug`. Overrides RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn options(&self) -> DecoderOptions {
        let mut flags = ScaleFlags::empty();
        if self.half_cycle {
            flags |= ScaleFlags::REPORT_UNRESOLVED_HALF_CYCLE;
        }
        DecoderOptions {
            bare: self.bare,
            flags,
        }
    }

    fn decoder(&self) -> Result<Decoder> {
        let mut subsets = self.subsets.clone();
        subsets.sort_unstable();
        subsets.dedup();

        let options = self.options();
        let mut decoder = Decoder::new();
        for subset in subsets {
            match subset {
                Subset::Msm123 => decoder.register(MsmDecoder::msm123(options))?,
                Subset::Msm4567 => decoder.register(MsmDecoder::msm4567(options))?,
            }
        }
        Ok(decoder)
    }

    fn open_input(&self) -> Result<Box<dyn Read>> {
        if self.input.as_os_str() == "-" {
            return Ok(Box::new(io::stdin().lock()));
        }
        let file = File::open(&self.input)
            .with_context(|| format!("cannot open {}", self.input.display()))?;
        Ok(Box::new(file))
    }
}

fn main() -> Result<()> {
    let cli = <Cli as clap::Parser>::parse();
    logging::initialize(cli.log_level.as_deref())?;

    let mut decoder = cli.decoder()?;
    let mut input = cli.open_input()?;
    let mut out = BufWriter::new(io::stdout().lock());
    let mut parser = Parser::new();
    let mut buf = vec![0u8; cli.chunk_size.get()];
    let mut frames = 0usize;

    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err).context("reading input"),
        };
        for frame in parser.catch_message(&buf[..n]) {
            frames += 1;
            if let Some(decoded) = decoder.decode(&frame) {
                serde_json::to_writer(&mut out, &decoded)?;
                writeln!(out)?;
            }
        }
    }
    out.flush()?;

    info!(
        frames,
        parse_errors = parser.parse_errors(),
        pending_bytes = parser.buffer_len(),
        decode_attempts = decoder.dec_attempts(),
        decode_errors = decoder.dec_errors(),
        "input exhausted"
    );
    Ok(())
}
