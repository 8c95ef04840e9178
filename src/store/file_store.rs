//! Single-file key-value store
//!
//! File format:
//! ```text
//! [HEADER: 64 bytes]
//!   - magic: 8 bytes ("KMT_STOR")
//!   - version: 4 bytes (u32 LE)
//!   - flags: 4 bytes
//!   - entry_count: 8 bytes (u64 LE)
//!   - index_offset: 8 bytes (u64 LE)
//!   - index_len: 8 bytes (u64 LE)
//!   - reserved: 24 bytes
//!
//! [RECORDS: variable]
//!   - encoded values, appended in write order
//!
//! [INDEX: variable]
//!   - bincode list of (key, offset, size), sorted by key
//! ```
//!
//! Overwritten and deleted values stay in the file as dead bytes until
//! [`FileStore::compact`] rewrites it.

use super::record::Record;
use super::KeyValueStore;
use crate::{Error, Result, MAGIC, VERSION};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const HEADER_SIZE: u64 = 64;

/// Default compression threshold for values
pub const DEFAULT_COMPRESS_THRESHOLD: usize = 256;

/// Index entry for a value
#[derive(Clone, Debug)]
struct IndexEntry {
    offset: u64,
    size: u32,
}

/// In-memory index for fast lookups
struct Index {
    entries: HashMap<Vec<u8>, IndexEntry>,
    /// Bytes in the record area no longer referenced by any key
    dead_bytes: u64,
}

impl Index {
    fn new() -> Self {
        Index {
            entries: HashMap::new(),
            dead_bytes: 0,
        }
    }

    fn live_bytes(&self) -> u64 {
        self.entries.values().map(|e| e.size as u64).sum()
    }
}

/// A key-value store backed by a single file
pub struct FileStore {
    /// Path to the store file
    path: PathBuf,
    /// The file handle
    file: RwLock<File>,
    /// In-memory index
    index: RwLock<Index>,
    /// Current append position
    write_offset: RwLock<u64>,
    /// Values at least this long are zstd-compressed
    compress_threshold: Option<usize>,
}

impl FileStore {
    /// Create a new store file, truncating any existing one
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        write_header(&mut file, 0, 0, 0)?;
        file.sync_all()?;

        info!(path = %path.display(), "created store");

        Ok(FileStore {
            path,
            file: RwLock::new(file),
            index: RwLock::new(Index::new()),
            write_offset: RwLock::new(HEADER_SIZE),
            compress_threshold: Some(DEFAULT_COMPRESS_THRESHOLD),
        })
    }

    /// Open an existing store file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;

        // Read and validate header
        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        if &header[0..8] != MAGIC {
            return Err(Error::InvalidFile("Invalid magic bytes".into()));
        }

        let version = read_u32(&header, 8);
        if version != VERSION {
            return Err(Error::VersionMismatch {
                expected: VERSION,
                found: version,
            });
        }

        let entry_count = read_u64(&header, 16);
        let index_offset = read_u64(&header, 24);
        let index_len = read_u64(&header, 32);
        let file_len = file.metadata()?.len();

        if index_offset > 0 {
            if index_offset < HEADER_SIZE {
                return Err(Error::InvalidFile(format!(
                    "index offset {} inside header",
                    index_offset
                )));
            }
            if index_offset.checked_add(index_len).map_or(true, |end| end > file_len) {
                return Err(Error::InvalidFile(format!(
                    "index at {}+{} past end of file ({} bytes)",
                    index_offset, index_len, file_len
                )));
            }
        }

        // Records end where the index begins
        let write_offset = if index_offset > 0 { index_offset } else { file_len };

        // Load index if it exists
        let mut index = Index::new();
        if index_offset > 0 && index_len > 0 {
            file.seek(SeekFrom::Start(index_offset))?;
            let mut buf = vec![0u8; index_len as usize];
            file.read_exact(&mut buf)?;

            let entries: Vec<(Vec<u8>, u64, u32)> = bincode::deserialize(&buf)?;
            if entries.len() as u64 != entry_count {
                return Err(Error::InvalidFile(format!(
                    "header counts {} entries, index holds {}",
                    entry_count,
                    entries.len()
                )));
            }
            for (key, offset, size) in entries {
                if offset < HEADER_SIZE || offset + size as u64 > write_offset {
                    return Err(Error::InvalidFile(format!(
                        "record at {}+{} outside record area",
                        offset, size
                    )));
                }
                index.entries.insert(key, IndexEntry { offset, size });
            }
        }

        index.dead_bytes = (write_offset - HEADER_SIZE).saturating_sub(index.live_bytes());

        info!(
            path = %path.display(),
            entries = index.entries.len(),
            "opened store"
        );

        Ok(FileStore {
            path,
            file: RwLock::new(file),
            index: RwLock::new(index),
            write_offset: RwLock::new(write_offset),
            compress_threshold: Some(DEFAULT_COMPRESS_THRESHOLD),
        })
    }

    /// Open or create a store file
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Set the compression threshold (`None` disables compression)
    pub fn with_compression(mut self, threshold: Option<usize>) -> Self {
        self.compress_threshold = threshold;
        self
    }

    /// Number of bytes held by overwritten or deleted values
    pub fn dead_bytes(&self) -> u64 {
        self.index.read().dead_bytes
    }

    /// Flush changes and write index to disk
    pub fn sync(&self) -> Result<()> {
        let index = self.index.read();
        let write_offset = *self.write_offset.read();
        let mut file = self.file.write();

        write_index(&mut file, &index, write_offset)?;
        file.sync_all()?;

        debug!(entries = index.entries.len(), "synced store");
        Ok(())
    }

    /// Rewrite the file with only live values, returning the bytes reclaimed
    pub fn compact(&self) -> Result<u64> {
        let reclaimed = {
            let mut index = self.index.write();
            let mut write_offset = self.write_offset.write();
            let mut file = self.file.write();

            let mut live = Vec::with_capacity(index.entries.len());
            for (key, entry) in index.entries.iter() {
                file.seek(SeekFrom::Start(entry.offset))?;
                let mut data = vec![0u8; entry.size as usize];
                file.read_exact(&mut data)?;
                live.push((key.clone(), data));
            }
            live.sort_by(|a, b| a.0.cmp(&b.0));

            let mut offset = HEADER_SIZE;
            file.seek(SeekFrom::Start(offset))?;
            for (key, data) in live {
                file.write_all(&data)?;
                let size = data.len() as u32;
                index.entries.insert(key, IndexEntry { offset, size });
                offset += size as u64;
            }
            file.set_len(offset)?;

            *write_offset = offset;
            std::mem::take(&mut index.dead_bytes)
        };

        self.sync()?;
        debug!(reclaimed, "compacted store");
        Ok(reclaimed)
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for FileStore {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let encoded = Record::new(value.to_vec(), self.compress_threshold).encode()?;
        let size = u32::try_from(encoded.len())
            .map_err(|_| Error::Store(format!("value of {} bytes too large", value.len())))?;

        // Lock order matches compact and clear: index, write offset, file
        let mut index = self.index.write();
        let mut write_offset = self.write_offset.write();
        let offset = *write_offset;

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&encoded)?;
        *write_offset = offset + size as u64;

        if let Some(old) = index.entries.insert(key.to_vec(), IndexEntry { offset, size }) {
            index.dead_bytes += old.size as u64;
        }
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        // Held until the read finishes so compact cannot move the record
        let index = self.index.read();
        let Some(entry) = index.entries.get(key) else {
            return Ok(None);
        };

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(entry.offset))?;

        let mut data = vec![0u8; entry.size as usize];
        file.read_exact(&mut data)?;

        Ok(Some(Record::decode(&data)?.data))
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.index.read().entries.contains_key(key))
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        let mut index = self.index.write();
        match index.entries.remove(key) {
            Some(old) => {
                index.dead_bytes += old.size as u64;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn clear(&self) -> Result<()> {
        let mut index = self.index.write();
        let mut write_offset = self.write_offset.write();
        let mut file = self.file.write();

        index.entries.clear();
        index.dead_bytes = 0;
        *write_offset = HEADER_SIZE;

        file.set_len(HEADER_SIZE)?;
        write_index(&mut file, &index, HEADER_SIZE)?;
        file.sync_all()?;

        debug!(path = %self.path.display(), "cleared store");
        Ok(())
    }

    fn keys(&self) -> Result<Vec<Vec<u8>>> {
        let mut keys: Vec<_> = self.index.read().entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn len(&self) -> Result<usize> {
        Ok(self.index.read().entries.len())
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        // Best-effort sync on drop
        let _ = self.sync();
    }
}

fn write_header(file: &mut File, entry_count: u64, index_offset: u64, index_len: u64) -> Result<()> {
    let mut header = [0u8; HEADER_SIZE as usize];
    header[0..8].copy_from_slice(MAGIC);
    header[8..12].copy_from_slice(&VERSION.to_le_bytes());
    // flags: 0
    header[16..24].copy_from_slice(&entry_count.to_le_bytes());
    header[24..32].copy_from_slice(&index_offset.to_le_bytes());
    header[32..40].copy_from_slice(&index_len.to_le_bytes());

    file.seek(SeekFrom::Start(0))?;
    file.write_all(&header)?;
    Ok(())
}

/// Write the index at `write_offset` and point the header at it
fn write_index(file: &mut File, index: &Index, write_offset: u64) -> Result<()> {
    // Sort by key for determinism
    let mut entries: Vec<(&Vec<u8>, u64, u32)> = index
        .entries
        .iter()
        .map(|(k, e)| (k, e.offset, e.size))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let encoded = bincode::serialize(&entries)?;

    file.seek(SeekFrom::Start(write_offset))?;
    file.write_all(&encoded)?;
    file.set_len(write_offset + encoded.len() as u64)?;

    write_header(
        file,
        entries.len() as u64,
        write_offset,
        encoded.len() as u64,
    )
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(bytes)
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.kmt");
        (dir, path)
    }

    #[test]
    fn test_create_and_open() {
        let (_dir, path) = setup();

        // Create
        {
            let store = FileStore::create(&path).unwrap();
            assert_eq!(store.len().unwrap(), 0);
        }

        // Reopen
        {
            let store = FileStore::open(&path).unwrap();
            assert_eq!(store.len().unwrap(), 0);
        }
    }

    #[test]
    fn test_set_get_has_delete() {
        let (_dir, path) = setup();
        let store = FileStore::create(&path).unwrap();

        store.set(&[1, 2, 3, 4], &[5, 6, 7, 8]).unwrap();
        assert!(store.has(&[1, 2, 3, 4]).unwrap());
        assert_eq!(store.get(&[1, 2, 3, 4]).unwrap(), Some(vec![5, 6, 7, 8]));

        assert!(store.delete(&[1, 2, 3, 4]).unwrap());
        assert!(!store.delete(&[1, 2, 3, 4]).unwrap());
        assert_eq!(store.get(&[1, 2, 3, 4]).unwrap(), None);
    }

    #[test]
    fn test_persistence() {
        let (_dir, path) = setup();

        {
            let store = FileStore::create(&path).unwrap();
            store.set(b"small", b"value").unwrap();
            store.set(b"large", &vec![42u8; 4096]).unwrap();
            store.set(b"empty", b"").unwrap();
            store.sync().unwrap();
        }

        {
            let store = FileStore::open(&path).unwrap();
            assert_eq!(store.len().unwrap(), 3);
            assert_eq!(store.get(b"small").unwrap(), Some(b"value".to_vec()));
            assert_eq!(store.get(b"large").unwrap(), Some(vec![42u8; 4096]));
            assert_eq!(store.get(b"empty").unwrap(), Some(Vec::new()));
        }
    }

    #[test]
    fn test_writes_after_sync_survive_reopen() {
        let (_dir, path) = setup();

        {
            let store = FileStore::create(&path).unwrap();
            store.set(b"a", b"1").unwrap();
            store.sync().unwrap();
            // Appends over the old index region
            store.set(b"b", b"2").unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_overwrite_and_compact() {
        let (_dir, path) = setup();
        let store = FileStore::create(&path).unwrap().with_compression(None);

        store.set(b"k", &[1u8; 100]).unwrap();
        store.set(b"k", &[2u8; 100]).unwrap();
        store.set(b"gone", &[3u8; 10]).unwrap();
        store.delete(b"gone").unwrap();

        assert_eq!(store.dead_bytes(), 101 + 11);

        let reclaimed = store.compact().unwrap();
        assert_eq!(reclaimed, 112);
        assert_eq!(store.dead_bytes(), 0);
        assert_eq!(store.get(b"k").unwrap(), Some(vec![2u8; 100]));
        drop(store);

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.dead_bytes(), 0);
        assert_eq!(store.get(b"k").unwrap(), Some(vec![2u8; 100]));
    }

    #[test]
    fn test_clear_persists() {
        let (_dir, path) = setup();

        {
            let store = FileStore::create(&path).unwrap();
            store.set(b"a", b"1").unwrap();
            store.set(b"b", b"2").unwrap();
            store.clear().unwrap();
            assert!(!store.has(b"a").unwrap());
            assert!(store.is_empty().unwrap());
        }

        let store = FileStore::open(&path).unwrap();
        assert!(store.is_empty().unwrap());
    }

    fn patch_header(path: &Path, at: usize, value: u64) {
        let mut bytes = std::fs::read(path).unwrap();
        bytes[at..at + 8].copy_from_slice(&value.to_le_bytes());
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_rejects_index_offset_inside_header() {
        let (_dir, path) = setup();
        FileStore::create(&path).unwrap();
        patch_header(&path, 24, 10);
        patch_header(&path, 32, 0);

        let err = FileStore::open(&path).err().unwrap();
        assert!(matches!(err, Error::InvalidFile(_)));
        assert!(err.is_store_failure());
    }

    #[test]
    fn test_rejects_index_past_end_of_file() {
        let (_dir, path) = setup();
        {
            let store = FileStore::create(&path).unwrap();
            store.set(b"a", b"1").unwrap();
        }
        patch_header(&path, 32, u64::MAX / 2);

        assert!(matches!(FileStore::open(&path), Err(Error::InvalidFile(_))));
    }

    #[test]
    fn test_concurrent_sets_and_compactions() {
        let (_dir, path) = setup();
        let store = std::sync::Arc::new(FileStore::create(&path).unwrap().with_compression(None));

        let writers: Vec<_> = (0..4u8)
            .map(|t| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50u8 {
                        store.set(&[t, i], &[t; 40]).unwrap();
                        store.set(&[t, i], &[i; 40]).unwrap();
                    }
                })
            })
            .collect();
        let compactor = {
            let store = std::sync::Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..20 {
                    store.compact().unwrap();
                }
            })
        };

        for w in writers {
            w.join().unwrap();
        }
        compactor.join().unwrap();

        assert_eq!(store.len().unwrap(), 200);
        for t in 0..4u8 {
            for i in 0..50u8 {
                assert_eq!(store.get(&[t, i]).unwrap(), Some(vec![i; 40]));
            }
        }
    }

    #[test]
    fn test_rejects_foreign_file() {
        let (_dir, path) = setup();
        std::fs::write(&path, [0u8; 64]).unwrap();

        assert!(matches!(FileStore::open(&path), Err(Error::InvalidFile(_))));
    }
}
