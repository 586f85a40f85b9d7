//! Composes the random-access reader with a ZIP reader: if the decrypted
//! plaintext has a valid central directory, its members can be opened
//! individually without decrypting the rest; otherwise the container is
//! treated as a single logical member.

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::config::FILE_EXTENSION;
use crate::error::{NescientError, Result};
use crate::reader::RandomAccessReader;

/// Name and size of one archive member.
pub struct MemberInfo {
    pub name: String,
    pub size: u64,
}

/// The one-member fallback used when the plaintext isn't ZIP-shaped.
pub struct SingleFileArchive {
    name: String,
    reader: RandomAccessReader,
}

/// An opened, authenticated container viewed as an archive of members.
pub enum Archive {
    Zip(Box<zip::ZipArchive<RandomAccessReader>>),
    Single(SingleFileArchive),
}

impl Archive {
    /// Opens `path` under `password` and probes the plaintext for a ZIP
    /// central directory, falling back to [`SingleFileArchive`] when it
    /// isn't one.
    pub fn open(path: &Path, password: &[u8]) -> Result<Self> {
        let probe = RandomAccessReader::open(path, password)?;
        match zip::ZipArchive::new(probe) {
            Ok(zip) => Ok(Self::Zip(Box::new(zip))),
            Err(zip::result::ZipError::Io(e)) => Err(NescientError::Io(e)),
            Err(_) => {
                let reader = RandomAccessReader::open(path, password)?;
                let name = path.to_string_lossy();
                let name = name.strip_suffix(FILE_EXTENSION).unwrap_or(&name).to_owned();
                Ok(Self::Single(SingleFileArchive { name, reader }))
            }
        }
    }

    /// Lists every member this archive exposes.
    pub fn members(&mut self) -> Vec<MemberInfo> {
        match self {
            Self::Zip(zip) => (0..zip.len())
                .filter_map(|i| zip.by_index(i).ok().map(|f| MemberInfo { name: f.name().to_owned(), size: f.size() }))
                .collect(),
            Self::Single(single) => vec![MemberInfo { name: single.name.clone(), size: single.reader.len() }],
        }
    }

    /// Opens `name` for reading. The `Single` variant has exactly one
    /// member and ignores the requested name beyond reporting it doesn't
    /// match, the same way a ZIP archive would for an unknown name.
    pub fn open_member(&mut self, name: &str) -> Result<Box<dyn Read + '_>> {
        match self {
            Self::Zip(zip) => {
                let file = zip.by_name(name).map_err(|e| NescientError::format(e.to_string()))?;
                Ok(Box::new(file))
            }
            Self::Single(single) => {
                if single.name != name {
                    return Err(NescientError::format(format!("no member named {name}")));
                }
                single.reader.seek(SeekFrom::Start(0))?;
                Ok(Box::new(&mut single.reader))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::config::Triple;
    use crate::container;

    fn write_container(plaintext: &[u8], password: &[u8]) -> std::path::PathBuf {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.keep().join("archive_test.nesc");
        let container = container::pack(plaintext, password, Triple::DEFAULT).unwrap();
        std::fs::write(&path, container).unwrap();
        path
    }

    #[test]
    fn non_zip_plaintext_falls_back_to_single_file_member() {
        let path = write_container(b"plain text, not a zip at all", b"pw");
        let mut archive = Archive::open(&path, b"pw").unwrap();
        let members = archive.members();
        assert_eq!(members.len(), 1);
        assert!(members[0].name.ends_with("archive_test"));
        assert_eq!(members[0].size, 28);

        let member_name = members[0].name.clone();
        let mut out = Vec::new();
        archive.open_member(&member_name).unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out, b"plain text, not a zip at all");
    }

    #[test]
    fn valid_zip_plaintext_exposes_its_members() {
        let mut zip_bytes = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut zip_bytes));
            writer.start_file("hello.txt", zip::write::FileOptions::default()).unwrap();
            writer.write_all(b"hello from inside a zip").unwrap();
            writer.finish().unwrap();
        }

        let path = write_container(&zip_bytes, b"pw");
        let mut archive = Archive::open(&path, b"pw").unwrap();
        let members = archive.members();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, "hello.txt");

        let mut out = Vec::new();
        archive.open_member("hello.txt").unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello from inside a zip");
    }

    #[test]
    fn wrong_password_fails_before_any_zip_probing() {
        let path = write_container(b"data", b"correct horse");
        assert!(matches!(Archive::open(&path, b"wrong"), Err(NescientError::Auth)));
    }
}
