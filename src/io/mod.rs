//! Plaintext/gzip FASTQ I/O (§4.1, §6). Grounded on the teacher's
//! `ReadFileZip`/`WriteFileZipStdout` enums (`define_whichever!` over a
//! regular file, a gzip stream, and stdout), rewritten here against a
//! from-scratch FASTQ tokenizer instead of `zoe::FastQReader`.

pub mod reader;
pub mod writer;

pub use reader::{FastqReader, PairedReader};
pub use writer::create_writer;

use crate::utils::whichever::define_whichever;
use flate2::{read::MultiGzDecoder, write::GzEncoder, Compression};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read as _, Stdout, Write as _, stdout},
    path::Path,
};

define_whichever! {
    #[doc = "The readable backing a FASTQ input stream: a plain file or a gzip-decoded one."]
    pub(crate) enum InputStream {
        #[doc = "A regular, uncompressed file."]
        Plain(BufReader<File>),
        #[doc = "A gzip-decompressed file, decoded inline (no extra thread)."]
        Gzipped(BufReader<MultiGzDecoder<File>>),
    }

    impl Read for InputStream {}
}

define_whichever! {
    #[doc = "The writable backing a FASTQ output stream: a plain file, a gzip stream, or stdout."]
    pub(crate) enum OutputStream {
        #[doc = "A regular, uncompressed file."]
        Plain(BufWriter<File>),
        #[doc = "A gzip-compressed file."]
        Gzipped(GzEncoder<BufWriter<File>>),
        #[doc = "Uncompressed data written to stdout."]
        Stdout(BufWriter<Stdout>),
    }

    impl Write for OutputStream {}
}

/// Detects gzip input both by the `.gz` extension and, defensively, by the
/// gzip magic bytes `1f 8b` (§4.1).
fn looks_gzipped(path: &Path, file: &mut File) -> std::io::Result<bool> {
    if path.extension().is_some_and(|ext| ext == "gz") {
        return Ok(true);
    }
    let mut magic = [0u8; 2];
    let n = file.read(&mut magic)?;
    std::io::Seek::seek(file, std::io::SeekFrom::Start(0))?;
    Ok(n == 2 && magic == [0x1f, 0x8b])
}

pub(crate) fn open_input_stream(path: &Path) -> std::io::Result<InputStream> {
    let mut file = File::open(path)?;
    if looks_gzipped(path, &mut file)? {
        Ok(InputStream::Gzipped(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(InputStream::Plain(BufReader::new(file)))
    }
}

/// Creates an output stream for `path`, compressing when the extension is
/// `.gz`, or writing to stdout when `path` is `None`.
pub(crate) fn open_output_stream(path: Option<&Path>, compress_level: u32) -> std::io::Result<OutputStream> {
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            if path.extension().is_some_and(|ext| ext == "gz") {
                Ok(OutputStream::Gzipped(GzEncoder::new(writer, Compression::new(compress_level))))
            } else {
                Ok(OutputStream::Plain(writer))
            }
        }
        None => Ok(OutputStream::Stdout(BufWriter::new(stdout()))),
    }
}
