//! # Identity Storage
//!
//! Persists the 5-byte bind identity in the last page of flash.
//!
//! The page is emulated with its flash semantics intact: erase sets every
//! byte to `0xFF`, programming goes in little-endian half-words and can only
//! clear bits. An erased page therefore reads back as an unbound identity.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, RxError};
use crate::protocol::frame::{NetworkIdentity, IDENTITY_LEN};

/// Size of one flash page
pub const FLASH_PAGE_SIZE: usize = 1024;

/// Value of an erased flash byte
const ERASED: u8 = 0xFF;

/// Non-volatile store for the bind identity
#[cfg_attr(test, mockall::automock)]
pub trait IdentityStore {
    /// Erase the page and program `data` from its start
    fn save(&mut self, data: &[u8]) -> Result<()>;

    /// Fill `data` from the start of the page
    fn load(&mut self, data: &mut [u8]) -> Result<()>;
}

/// Read the persisted identity
pub fn load_identity<S: IdentityStore + ?Sized>(store: &mut S) -> Result<NetworkIdentity> {
    let mut bytes = [0u8; IDENTITY_LEN];
    store.load(&mut bytes)?;
    Ok(NetworkIdentity::from_bytes(bytes))
}

/// Persist a freshly bound identity
pub fn save_identity<S: IdentityStore + ?Sized>(store: &mut S, identity: &NetworkIdentity) -> Result<()> {
    store.save(identity.as_bytes())
}

/// One emulated flash page
#[derive(Clone)]
pub struct FlashPage {
    bytes: Box<[u8; FLASH_PAGE_SIZE]>,
}

impl std::fmt::Debug for FlashPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashPage")
            .field("head", &&self.bytes[..8])
            .finish_non_exhaustive()
    }
}

impl FlashPage {
    /// A freshly erased page
    pub fn erased() -> Self {
        Self { bytes: Box::new([ERASED; FLASH_PAGE_SIZE]) }
    }

    /// Restore a page image; short images are padded as erased
    pub fn from_image(image: &[u8]) -> Self {
        let mut page = Self::erased();
        let len = image.len().min(FLASH_PAGE_SIZE);
        page.bytes[..len].copy_from_slice(&image[..len]);
        page
    }

    pub fn image(&self) -> &[u8] {
        &self.bytes[..]
    }

    pub fn erase(&mut self) {
        self.bytes.fill(ERASED);
    }

    /// Program `data` in half-words; an odd tail is padded with `0x00`
    pub fn program(&mut self, data: &[u8]) -> Result<()> {
        check_len(data.len())?;
        for (i, pair) in data.chunks(2).enumerate() {
            let half_word = match *pair {
                [lo, hi] => u16::from_le_bytes([lo, hi]),
                [lo] => lo as u16,
                _ => unreachable!("chunks(2) yields one or two bytes"),
            };
            let [lo, hi] = half_word.to_le_bytes();
            // Programming can only pull bits low
            self.bytes[2 * i] &= lo;
            self.bytes[2 * i + 1] &= hi;
        }
        Ok(())
    }

    pub fn read(&self, data: &mut [u8]) -> Result<()> {
        check_len(data.len())?;
        let len = data.len();
        data.copy_from_slice(&self.bytes[..len]);
        Ok(())
    }
}

fn check_len(len: usize) -> Result<()> {
    if len > FLASH_PAGE_SIZE {
        return Err(RxError::StorageLength { len, capacity: FLASH_PAGE_SIZE });
    }
    Ok(())
}

/// Identity store kept in RAM
#[derive(Debug, Clone)]
pub struct MemoryPageStore {
    page: FlashPage,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self { page: FlashPage::erased() }
    }

    pub fn page(&self) -> &FlashPage {
        &self.page
    }
}

impl Default for MemoryPageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityStore for MemoryPageStore {
    fn save(&mut self, data: &[u8]) -> Result<()> {
        check_len(data.len())?;
        self.page.erase();
        self.page.program(data)
    }

    fn load(&mut self, data: &mut [u8]) -> Result<()> {
        self.page.read(data)
    }
}

/// Identity store backed by a page image file
#[derive(Debug)]
pub struct FilePageStore {
    path: PathBuf,
    page: FlashPage,
}

impl FilePageStore {
    /// Open the page image at `path`; a missing file reads as erased flash
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let page = match fs::read(&path) {
            Ok(image) => {
                debug!("Loaded identity page from {}", path.display());
                FlashPage::from_image(&image)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No identity page at {}, starting erased", path.display());
                FlashPage::erased()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, page })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStore for FilePageStore {
    fn save(&mut self, data: &[u8]) -> Result<()> {
        check_len(data.len())?;
        self.page.erase();
        self.page.program(data)?;

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, self.page.image())?;
        fs::rename(&tmp, &self.path)?;
        debug!("Programmed {} bytes to {}", data.len(), self.path.display());
        Ok(())
    }

    fn load(&mut self, data: &mut [u8]) -> Result<()> {
        self.page.read(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryPageStore::new();
        for value in [[0xAA, 0x11, 0x22, 0x33, 0x44], [0u8; 5], [0xFF; 5], [1, 2, 3, 4, 5]] {
            store.save(&value).unwrap();
            let mut back = [0u8; 5];
            store.load(&mut back).unwrap();
            assert_eq!(back, value);
        }
    }

    #[test]
    fn test_erased_page_loads_unbound_identity() {
        let mut store = MemoryPageStore::new();
        let identity = load_identity(&mut store).unwrap();
        assert!(!identity.is_bound());
    }

    #[test]
    fn test_odd_length_pads_with_zero() {
        let mut store = MemoryPageStore::new();
        store.save(&[0xAA, 0x11, 0x22]).unwrap();
        assert_eq!(&store.page().image()[..5], &[0xAA, 0x11, 0x22, 0x00, 0xFF]);
    }

    #[test]
    fn test_program_without_erase_only_clears_bits() {
        let mut page = FlashPage::erased();
        page.program(&[0xF0, 0x0F]).unwrap();
        page.program(&[0x3C, 0xFF]).unwrap();
        assert_eq!(&page.image()[..2], &[0x30, 0x0F]);
    }

    #[test]
    fn test_oversized_save_is_rejected() {
        let mut store = MemoryPageStore::new();
        let data = vec![0u8; FLASH_PAGE_SIZE + 1];
        let err = store.save(&data).unwrap_err();
        assert!(matches!(
            err,
            RxError::StorageLength { len, capacity } if len == FLASH_PAGE_SIZE + 1 && capacity == FLASH_PAGE_SIZE
        ));
    }

    #[test]
    fn test_oversized_load_is_rejected() {
        let mut store = MemoryPageStore::new();
        let mut data = vec![0u8; FLASH_PAGE_SIZE + 2];
        assert!(store.load(&mut data).is_err());
    }

    #[test]
    fn test_file_store_persists_across_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("txid.bin");

        let mut store = FilePageStore::open(&path).unwrap();
        assert!(!load_identity(&mut store).unwrap().is_bound());

        let identity = NetworkIdentity::bound([0x11, 0x22, 0x33, 0x44]);
        save_identity(&mut store, &identity).unwrap();
        drop(store);

        let mut reopened = FilePageStore::open(&path).unwrap();
        assert_eq!(load_identity(&mut reopened).unwrap(), identity);
        assert_eq!(fs::metadata(&path).unwrap().len(), FLASH_PAGE_SIZE as u64);
    }

    #[test]
    fn test_file_store_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("txid.bin");

        let mut store = FilePageStore::open(&path).unwrap();
        save_identity(&mut store, &NetworkIdentity::bound([1, 2, 3, 4])).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_file_store_short_image_reads_erased_tail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.bin");
        fs::write(&path, [0xAA, 0x01]).unwrap();

        let mut store = FilePageStore::open(&path).unwrap();
        let mut back = [0u8; 5];
        store.load(&mut back).unwrap();
        assert_eq!(back, [0xAA, 0x01, 0xFF, 0xFF, 0xFF]);
    }
}
