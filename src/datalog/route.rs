//! # Route Document
//!
//! Streams a KML `LineString` to disk one coordinate at a time while keeping
//! the file a complete, closed document whenever no write is in progress.
//!
//! The closing marker is always the last thing in the file. Appending a
//! coordinate removes the marker (only if the file really ends with it),
//! then writes the new coordinate and the marker back in a single write.
//! A crash between appends therefore leaves a valid document behind.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::journey::fix::Position;

/// Everything up to and including the open coordinate list.
pub const KML_HEADER: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
    "<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n",
    "<Document>\n",
    "<name>GPS Journey</name>\n",
    "<Placemark>\n",
    "<LineString>\n",
    "<coordinates>\n",
);

/// Closes the coordinate list and every enclosing element.
pub const KML_CLOSING: &str =
    "</coordinates>\n</LineString>\n</Placemark>\n</Document>\n</kml>\n";

/// An open, always-closed KML route file.
#[derive(Debug)]
pub struct RouteDocument {
    pub(super) file: File,
    path: PathBuf,
}

impl RouteDocument {
    /// Create a new route file holding an empty, closed document.
    ///
    /// Fails with [`io::ErrorKind::AlreadyExists`] rather than replacing an
    /// existing file.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;

        let mut initial = String::with_capacity(KML_HEADER.len() + KML_CLOSING.len());
        initial.push_str(KML_HEADER);
        initial.push_str(KML_CLOSING);
        file.write_all(initial.as_bytes())?;
        file.sync_data()?;

        Ok(Self { file, path })
    }

    /// Append one `longitude,latitude,altitude` line.
    pub fn append(&mut self, position: Position, altitude: f64) -> io::Result<()> {
        self.strip_closing()?;

        let line = format!("{},{},{}\n", position.longitude, position.latitude, altitude);
        let mut chunk = String::with_capacity(line.len() + KML_CLOSING.len());
        chunk.push_str(&line);
        chunk.push_str(KML_CLOSING);

        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(chunk.as_bytes())?;
        self.file.sync_data()
    }

    /// Make sure the document ends with exactly one closing marker.
    ///
    /// Safe to call repeatedly, and after an append that failed part-way.
    pub fn finish(&mut self) -> io::Result<()> {
        if !self.ends_with_closing()? {
            self.file.seek(SeekFrom::End(0))?;
            self.file.write_all(KML_CLOSING.as_bytes())?;
        }
        self.file.sync_all()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file length in bytes.
    pub fn byte_len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Cut the file back to `len` bytes, undoing later appends.
    pub fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.file.set_len(len)?;
        self.file.sync_data()
    }

    fn strip_closing(&mut self) -> io::Result<()> {
        if self.ends_with_closing()? {
            let len = self.file.metadata()?.len();
            self.file.set_len(len - KML_CLOSING.len() as u64)?;
        }
        Ok(())
    }

    fn ends_with_closing(&mut self) -> io::Result<bool> {
        let len = self.file.metadata()?.len();
        let tail_len = KML_CLOSING.len() as u64;
        if len < tail_len {
            return Ok(false);
        }

        let mut tail = vec![0u8; KML_CLOSING.len()];
        self.file.seek(SeekFrom::Start(len - tail_len))?;
        self.file.read_exact(&mut tail)?;
        Ok(tail == KML_CLOSING.as_bytes())
    }
}
