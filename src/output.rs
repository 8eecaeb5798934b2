use std::{
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tempfile::NamedTempFile;

/// An output that only appears at its destination once fully written.
pub struct OutputFile {
    tmp: NamedTempFile,
    dest: PathBuf,
}

impl OutputFile {
    pub fn create<P: AsRef<Path>>(dest: P) -> Result<Self> {
        let dest = dest.as_ref().to_path_buf();
        let dir = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let tmp = NamedTempFile::new_in(&dir)
            .with_context(|| anyhow!("Could not create file: {:?}", dest))?;
        Ok(Self { tmp, dest })
    }

    pub fn writer(&mut self) -> &mut NamedTempFile {
        &mut self.tmp
    }

    pub fn commit(self) -> Result<()> {
        let dest = self.dest;
        self.tmp
            .persist(&dest)
            .map_err(|e| e.error)
            .with_context(|| anyhow!("Could not write file: {:?}", dest))?;
        Ok(())
    }
}

pub fn write_table<P, T>(dest: P, rows: &[T], delimiter: u8, has_headers: bool) -> Result<()>
where
    P: AsRef<Path>,
    T: Serialize,
{
    let mut out = OutputFile::create(&dest)?;
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(has_headers)
            .from_writer(BufWriter::new(out.writer()));
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    out.commit()
}

pub fn write_lines<P, T>(dest: P, lines: &[T]) -> Result<()>
where
    P: AsRef<Path>,
    T: std::fmt::Display,
{
    let mut out = OutputFile::create(&dest)?;
    {
        let mut writer = BufWriter::new(out.writer());
        for line in lines {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
    }
    out.commit()
}

/// Zero-byte output, the "no data" marker read back by later steps.
pub fn write_empty<P: AsRef<Path>>(dest: P) -> Result<()> {
    OutputFile::create(dest)?.commit()
}
