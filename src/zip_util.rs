use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, SeekFrom};
use std::path::Path;

use zip::read::ZipArchive;

use crate::error::{Error, Result};
use crate::txt_data::DataFile;

/// Name of the data member inside the FAA CIFP distribution.
pub const CIFP_MEMBER: &str = "FAACIFP18";

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Pull the CIFP text out of the distribution archive.
pub fn cifp_from_zip<R: Read + Seek>(reader: R) -> Result<DataFile> {
    let mut archive = ZipArchive::new(reader)?;
    let index = (0..archive.len())
        .find(|&i| {
            archive
                .by_index(i)
                .map(|f| f.name().rsplit('/').next() == Some(CIFP_MEMBER))
                .unwrap_or(false)
        })
        .ok_or_else(|| Error::NotFound {
            ident: CIFP_MEMBER.to_owned(),
        })?;

    let mut member = archive.by_index(index)?;
    DataFile::from_reader(&mut member)
}

/// Open `path` as either a CIFP zip or a plain CIFP text file.
pub fn open_cifp<P: AsRef<Path>>(path: P) -> Result<DataFile> {
    let mut file = BufReader::new(File::open(path)?);
    let mut magic = [0u8; 4];
    let is_zip = match file.read_exact(&mut magic) {
        Ok(()) => &magic[..] == ZIP_MAGIC,
        Err(_) => false,
    };
    file.seek(SeekFrom::Start(0))?;

    if is_zip {
        cifp_from_zip(file)
    } else {
        DataFile::from_reader(&mut file)
    }
}
