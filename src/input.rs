use anyhow::{Context, Result};
use bstr::ByteSlice;
use camino::Utf8PathBuf;
use ripline::{
    line_buffer::{LineBuffer, LineBufferReader},
    lines::LineIter,
};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};

use crate::record::Record;

/// A source that can be either a file or stdin.
#[derive(Default, Clone, Debug)]
pub enum FileOrStdin {
    /// Input from a file.
    File(Utf8PathBuf),
    /// Input from stdin.
    #[default]
    Stdin,
}

impl fmt::Display for FileOrStdin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOrStdin::File(path) => write!(f, "{}", path),
            FileOrStdin::Stdin => write!(f, "<stdin>"),
        }
    }
}

impl FileOrStdin {
    /// Create a new FileOrStdin from a path.
    ///
    /// If the path is "-", stdin is used.
    pub fn from_path(path: Utf8PathBuf) -> Self {
        if path.as_str() == "-" {
            FileOrStdin::Stdin
        } else {
            FileOrStdin::File(path)
        }
    }

    /// Open the input source as a reader.
    pub fn reader(&self) -> Result<Box<dyn Read>> {
        match self {
            FileOrStdin::File(path) => {
                let file =
                    File::open(path).with_context(|| format!("failed to open file: {}", path))?;
                Ok(Box::new(file))
            }
            FileOrStdin::Stdin => Ok(Box::new(io::stdin().lock())),
        }
    }
}

/// Parse one JSON-lines record. Blank lines yield `None`.
pub fn parse_record(line: &[u8]) -> serde_json::Result<Option<Record>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(line).map(Some)
}

/// Read JSON-lines records from `source`, handing them to `f` in batches of
/// at most `batch_size`. The last batch may be short.
pub fn for_each_batch<F>(
    source: &FileOrStdin,
    line_buffer: &mut LineBuffer,
    batch_size: usize,
    mut f: F,
) -> Result<()>
where
    F: FnMut(Vec<Record>) -> Result<()>,
{
    let batch_size = batch_size.max(1);
    let reader = source.reader()?;
    let mut lb_reader = LineBufferReader::new(reader, line_buffer);
    let mut batch = Vec::with_capacity(batch_size);
    let mut lineno = 0usize;

    while lb_reader
        .fill()
        .with_context(|| format!("failed to read {}", source))?
    {
        for line in LineIter::new(b'\n', lb_reader.buffer()) {
            lineno += 1;
            let record = parse_record(line)
                .with_context(|| format!("{}:{}: invalid record", source, lineno))?;
            if let Some(record) = record {
                batch.push(record);
            }
            if batch.len() == batch_size {
                f(std::mem::replace(&mut batch, Vec::with_capacity(batch_size)))?;
            }
        }
        lb_reader.consume_all();
    }

    if !batch.is_empty() {
        f(batch)?;
    }
    Ok(())
}
