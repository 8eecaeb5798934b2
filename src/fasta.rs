use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::Context;
use flate2::read::GzDecoder;
use seq_io::fasta::{Reader, Record};

use crate::output::OutputFile;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Checks the magic bytes rather than trusting the extension.
pub fn is_gzipped<P: AsRef<Path>>(path: P) -> anyhow::Result<bool> {
    let path = path.as_ref();
    let mut file = File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
    let mut magic = [0u8; 2];
    let mut read = 0;
    while read < magic.len() {
        let n = file.read(&mut magic[read..])?;
        if n == 0 {
            break;
        }
        read += n;
    }
    Ok(read == magic.len() && magic == GZIP_MAGIC)
}

pub fn open_maybe_gz<P: AsRef<Path>>(path: P) -> anyhow::Result<Box<dyn std::io::BufRead>> {
    let path = path.as_ref();
    let gzipped = is_gzipped(path)?;
    let file = File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
    let buf_reader: Box<dyn std::io::BufRead> = if gzipped {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(buf_reader)
}

/// Writes the decompressed contents of `src` to `dest`.
pub fn decompress_to<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dest: Q) -> anyhow::Result<u64> {
    let src = src.as_ref();
    let mut reader = open_maybe_gz(src)?;
    let mut out = OutputFile::create(&dest)?;
    let n = {
        let mut writer = BufWriter::new(out.writer());
        let n = std::io::copy(&mut reader, &mut writer)
            .with_context(|| format!("Failed to decompress: {}", src.display()))?;
        writer.flush()?;
        n
    };
    out.commit()?;
    Ok(n)
}

/// Prefixes every contig with the bin number: `>{bin}_{i}\t{original header}`.
/// Sequence lines are copied unchanged. Returns the number of contigs.
pub fn add_bin_num<P, Q>(f_in: P, bin_num: &str, f_out: Q) -> anyhow::Result<usize>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let f_in = f_in.as_ref();
    let mut reader = Reader::new(open_maybe_gz(f_in)?);
    let mut out = OutputFile::create(&f_out)?;
    let mut n_contigs = 0;
    {
        let mut writer = BufWriter::new(out.writer());
        while let Some(record) = reader.next() {
            let record = record.with_context(|| format!("Malformed FASTA: {}", f_in.display()))?;

            write!(writer, ">{}_{}\t", bin_num, n_contigs)?;
            writer.write_all(record.head())?;
            writer.write_all(b"\n")?;
            for line in record.seq_lines() {
                writer.write_all(line)?;
                writer.write_all(b"\n")?;
            }
            n_contigs += 1;
        }
        writer.flush()?;
    }
    out.commit()?;
    Ok(n_contigs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::fs;

    const FASTA: &str = ">k141_7 flag=1 multi=3.0\nACGT\nAC\n>k141_9\nGGGG\n";

    #[test]
    fn contigs_are_renumbered() {
        let dir = tempfile::tempdir().unwrap();
        let f_in = dir.path().join("3.fa");
        let f_out = dir.path().join("3.renamed.fa");
        fs::write(&f_in, FASTA).unwrap();

        let n = add_bin_num(&f_in, "3", &f_out).unwrap();
        assert_eq!(n, 2);
        assert_eq!(
            fs::read_to_string(&f_out).unwrap(),
            ">3_0\tk141_7 flag=1 multi=3.0\nACGT\nAC\n>3_1\tk141_9\nGGGG\n"
        );
    }

    #[test]
    fn gzip_is_detected_by_content() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.fa.gz");
        let packed = dir.path().join("packed.fa");
        fs::write(&plain, FASTA).unwrap();

        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(FASTA.as_bytes()).unwrap();
        fs::write(&packed, enc.finish().unwrap()).unwrap();

        assert!(!is_gzipped(&plain).unwrap());
        assert!(is_gzipped(&packed).unwrap());

        let out = dir.path().join("out.fa");
        decompress_to(&packed, &out).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), FASTA);
    }
}
