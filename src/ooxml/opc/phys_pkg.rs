//! Physical (ZIP) side of an OPC package.
//!
//! Presentations are read fully into memory: composition touches most parts
//! anyway and every edit is replace-on-write.

use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::{CONTENT_TYPES_URI, PackURI};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Every member of a ZIP archive keyed by part name (leading slash).
pub struct PhysPkgReader {
    members: BTreeMap<String, Vec<u8>>,
}

impl PhysPkgReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(OpcError::PackageNotFound(path.display().to_string()));
        }
        Self::from_reader(std::fs::File::open(path)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(data))
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut members = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = format!("/{}", file.name().trim_start_matches('/'));
            let mut blob = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut blob)?;
            members.insert(name, blob);
        }
        Ok(Self { members })
    }

    /// The `[Content_Types].xml` member.
    pub fn content_types_xml(&self) -> Result<&[u8]> {
        self.members
            .get(CONTENT_TYPES_URI)
            .map(Vec::as_slice)
            .ok_or_else(|| OpcError::PartNotFound(CONTENT_TYPES_URI.to_string()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Hand over every member, the manifest included.
    pub fn into_members(self) -> BTreeMap<String, Vec<u8>> {
        self.members
    }
}

/// Writes parts into an in-memory ZIP archive with Deflate compression.
pub struct PhysPkgWriter {
    archive: ZipWriter<Cursor<Vec<u8>>>,
}

impl PhysPkgWriter {
    pub fn new() -> Self {
        Self {
            archive: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    pub fn write(&mut self, pack_uri: &PackURI, blob: &[u8]) -> Result<()> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.archive.start_file(pack_uri.membername(), options)?;
        self.archive.write_all(blob)?;
        Ok(())
    }

    /// Finish the archive and return its bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        Ok(self.archive.finish()?.into_inner())
    }
}

impl Default for PhysPkgWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_written_members_read_back() {
        let mut writer = PhysPkgWriter::new();
        let types = PackURI::new(CONTENT_TYPES_URI).unwrap();
        let pres = PackURI::new("/ppt/presentation.xml").unwrap();
        writer.write(&types, b"<Types/>").unwrap();
        writer.write(&pres, b"<p:presentation/>").unwrap();
        let data = writer.finish().unwrap();

        let reader = PhysPkgReader::from_bytes(&data).unwrap();
        assert_eq!(reader.len(), 2);
        assert_eq!(reader.content_types_xml().unwrap(), b"<Types/>");
        let members = reader.into_members();
        assert_eq!(members["/ppt/presentation.xml"], b"<p:presentation/>");
    }

    #[test]
    fn test_missing_file_is_package_not_found() {
        let err = PhysPkgReader::open("/definitely/not/here.pptx").err().unwrap();
        assert!(matches!(err, OpcError::PackageNotFound(_)));
    }

    #[test]
    fn test_garbage_is_zip_error() {
        assert!(matches!(
            PhysPkgReader::from_bytes(b"not a zip"),
            Err(OpcError::ZipError(_))
        ));
    }
}
