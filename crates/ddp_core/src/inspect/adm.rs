//! ADM broadcast wave detection.
//!
//! Walks the RIFF chunk list looking for the `axml` and `chna` chunks that
//! make a wave file ADM. RF64/BW64 files carry their real sizes in `ds64`.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use super::InspectError;

const SIZE_IN_DS64: u32 = u32::MAX;

/// Bytes of `ds64` and `fmt ` that are read; the rest is skipped.
const DS64_HEAD: usize = 16;
const FMT_HEAD: usize = 8;

/// Facts read from an ADM wave header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmScan {
    pub sample_rate: u32,
    pub channels: u16,
    /// Whether the file uses 64-bit sizes (RF64/BW64).
    pub large: bool,
}

pub fn scan_adm(path: &Path) -> Result<AdmScan, InspectError> {
    let file = File::open(path).map_err(|source| InspectError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let not_adm = |reason: &str| InspectError::NotAdm {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let chunks = read_chunks(&mut BufReader::new(file)).map_err(|e| match e.kind() {
        io::ErrorKind::InvalidData => not_adm(&e.to_string()),
        _ => InspectError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let (channels, sample_rate) = chunks.format.ok_or_else(|| not_adm("no fmt chunk"))?;
    if !chunks.axml {
        return Err(not_adm("no axml chunk"));
    }
    if !chunks.chna {
        return Err(not_adm("no chna chunk"));
    }

    Ok(AdmScan {
        sample_rate,
        channels,
        large: chunks.large,
    })
}

#[derive(Default)]
struct ChunkSummary {
    format: Option<(u16, u32)>,
    axml: bool,
    chna: bool,
    large: bool,
}

fn invalid(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_string())
}

fn read_chunks<R: Read + Seek>(reader: &mut R) -> io::Result<ChunkSummary> {
    let mut header = [0u8; 12];
    reader
        .read_exact(&mut header)
        .map_err(|_| invalid("file too short"))?;

    let mut summary = ChunkSummary::default();
    match &header[0..4] {
        b"RIFF" => {}
        b"RF64" | b"BW64" => summary.large = true,
        _ => return Err(invalid("not a RIFF file")),
    }
    if &header[8..12] != b"WAVE" {
        return Err(invalid("not a WAVE file"));
    }

    let mut data_size_64: Option<u64> = None;
    loop {
        let mut chunk = [0u8; 8];
        match reader.read_exact(&mut chunk) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }
        let id = [chunk[0], chunk[1], chunk[2], chunk[3]];
        let size32 = u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
        let mut size = u64::from(size32);

        match &id {
            b"ds64" => {
                let body = read_head(reader, size, DS64_HEAD)?;
                if body.len() == DS64_HEAD {
                    let mut data = [0u8; 8];
                    data.copy_from_slice(&body[8..16]);
                    data_size_64 = Some(u64::from_le_bytes(data));
                }
                continue;
            }
            b"fmt " => {
                let body = read_head(reader, size, FMT_HEAD)?;
                if body.len() < FMT_HEAD {
                    return Err(invalid("truncated fmt chunk"));
                }
                let channels = u16::from_le_bytes([body[2], body[3]]);
                let rate = u32::from_le_bytes([body[4], body[5], body[6], body[7]]);
                summary.format = Some((channels, rate));
                continue;
            }
            b"axml" => summary.axml = true,
            b"chna" => summary.chna = true,
            b"data" if summary.large && size32 == SIZE_IN_DS64 => {
                size = data_size_64.ok_or_else(|| invalid("data size missing from ds64"))?;
            }
            _ => {}
        }

        skip(reader, size + (size & 1))?;
    }

    Ok(summary)
}

/// Read at most `keep` bytes of a chunk body of `size` bytes, then move past
/// the rest of the body and its pad byte. Sizes come from the file and are
/// never used to size a buffer.
fn read_head<R: Read + Seek>(reader: &mut R, size: u64, keep: usize) -> io::Result<Vec<u8>> {
    let len = usize::try_from(size).map_or(keep, |size| size.min(keep));
    let mut head = vec![0u8; len];
    reader.read_exact(&mut head).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => invalid("truncated chunk"),
        _ => e,
    })?;
    skip(reader, size - len as u64 + (size & 1))?;
    Ok(head)
}

fn skip<R: Seek>(reader: &mut R, bytes: u64) -> io::Result<()> {
    let offset = i64::try_from(bytes).map_err(|_| invalid("chunk too large"))?;
    reader.seek(SeekFrom::Current(offset))?;
    Ok(())
}
