use std::{
    fs,
    io::{stdout, Write},
    path::Path,
};

use anyhow::Context;
use tracing::info;
use zinflate::zlib::{self, InflateOptions};

pub fn metadata(file: &Path) -> anyhow::Result<()> {
    let bytes = fs::read(file).context(format!("reading from {}", file.display()))?;
    let stream: zlib::Stream = bytes.as_slice().try_into().context("decoding read bytes")?;
    print!("{stream}");
    Ok(())
}

pub fn inflate(
    file: &Path,
    raw: bool,
    options: &InflateOptions,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let bytes = fs::read(file).context(format!("reading from {}", file.display()))?;
    let decoded = if raw {
        zlib::inflate_raw_to_vec(&bytes, options)?
    } else {
        let stream: zlib::Stream = bytes.as_slice().try_into().context("decoding read bytes")?;
        stream.inflate(options)?
    };
    info!(
        compressed = decoded.serialization_len(),
        inflated = decoded.bytes().len(),
        "inflated {}",
        file.display()
    );
    if decoded.serialization_len() < bytes.len() {
        info!(
            trailing = bytes.len() - decoded.serialization_len(),
            "ignoring bytes after the end of the stream"
        );
    }

    match output {
        Some(path) => fs::write(path, decoded.bytes())
            .context(format!("writing to {}", path.display())),
        None => {
            stdout().write_all(decoded.bytes())?;
            stdout().flush().context("flushing stdout")
        }
    }
}
