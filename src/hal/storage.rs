//! Persistent modem contexts and crash log.
//!
//! The modem library saves its LoRaWAN session, keys and FUOTA state as opaque
//! byte blobs keyed by context type and offset. Two backends exist:
//!
//! - [`DelegateStorage`] hands every call to an application supplied
//!   [`ContextDelegate`] without buffering or validation.
//! - [`SettingsStorage`] maps calls onto named paths of a key/value
//!   [`SettingsBackend`] (see [`MemorySettings`] and
//!   [`FileSettings`](super::settings_host::FileSettings)).
//!
//! The crash log rides on the same primitives, on identifiers the modem
//! library never uses for its own contexts.

use log::{debug, error, trace};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::{Mutex, OnceLock};

/// Settings subtree owned by the modem HAL.
pub const SETTINGS_ROOT: &str = "smtc_modem_hal";

/// Settings path of the crash log.
pub const CRASHLOG_PATH: &str = "smtc_modem_hal/crashlog";

/// Settings path of the crash log availability flag.
pub const CRASHLOG_STATUS_PATH: &str = "smtc_modem_hal/crashlog_status";

/// Context types the modem library persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ContextType {
    Modem = 0,
    KeyModem = 1,
    LorawanStack = 2,
    Fuota = 3,
    SecureElement = 4,
    StoreAndForward = 5,
}

impl ContextType {
    /// Number of context types, one past the highest identifier.
    pub const COUNT: u8 = 6;

    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Modem),
            1 => Some(Self::KeyModem),
            2 => Some(Self::LorawanStack),
            3 => Some(Self::Fuota),
            4 => Some(Self::SecureElement),
            5 => Some(Self::StoreAndForward),
            _ => None,
        }
    }
}

/// Identifier handed to a persistence backend.
///
/// Wider than [`ContextType`] because the crash log is stored under two
/// reserved identifiers past the last context type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u8);

impl ContextId {
    pub const CRASHLOG: ContextId = ContextId(ContextType::COUNT);
    pub const CRASHLOG_STATUS: ContextId = ContextId(ContextType::COUNT + 1);
}

impl From<ContextType> for ContextId {
    fn from(ctx: ContextType) -> Self {
        ContextId(ctx as u8)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error from a [`SettingsBackend`].
#[derive(Debug)]
pub enum SettingsError {
    /// Underlying storage failed.
    Io(io::Error),
    /// A value exists but could not be read back.
    Read { key: String, reason: String },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "settings I/O error: {}", e),
            Self::Read { key, reason } => write!(f, "unable to load {}: {}", key, reason),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Read { .. } => None,
        }
    }
}

impl From<io::Error> for SettingsError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Error from a [`ModemPersistence`] implementation.
#[derive(Debug)]
pub enum StorageError {
    /// A settings load was issued while another one was waiting for its
    /// read-back.
    LoadInFlight { path: String },
    /// The settings backend failed.
    Settings(SettingsError),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadInFlight { path } => {
                write!(f, "load of {} issued while another load is in flight", path)
            }
            Self::Settings(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::LoadInFlight { .. } => None,
            Self::Settings(e) => Some(e),
        }
    }
}

impl From<SettingsError> for StorageError {
    fn from(e: SettingsError) -> Self {
        Self::Settings(e)
    }
}

/// Persistence as seen by the modem HAL.
///
/// Restores return the number of bytes written into the buffer; a missing
/// entry leaves the buffer untouched and returns 0.
pub trait ModemPersistence: Send + Sync {
    fn context_store(&self, ctx: ContextId, offset: u32, data: &[u8]) -> Result<(), StorageError>;

    fn context_restore(
        &self,
        ctx: ContextId,
        offset: u32,
        buffer: &mut [u8],
    ) -> Result<usize, StorageError>;

    fn crashlog_store(&self, log: &[u8]) -> Result<(), StorageError>;

    fn crashlog_restore(&self, buffer: &mut [u8]) -> Result<usize, StorageError>;

    fn crashlog_set_status(&self, available: bool) -> Result<(), StorageError>;

    /// A crash log that was never flagged reads as unavailable.
    fn crashlog_get_status(&self) -> Result<bool, StorageError>;
}

// ---------------------------------------------------------------------------
// Delegate mode
// ---------------------------------------------------------------------------

/// Application owned context storage.
pub trait ContextDelegate: Send {
    fn store(&mut self, ctx: ContextId, offset: u32, data: &[u8]);

    fn restore(&mut self, ctx: ContextId, offset: u32, buffer: &mut [u8]);
}

/// Forwards every call to a [`ContextDelegate`].
pub struct DelegateStorage<D: ContextDelegate> {
    delegate: Mutex<D>,
}

impl<D: ContextDelegate> DelegateStorage<D> {
    pub fn new(delegate: D) -> Self {
        Self {
            delegate: Mutex::new(delegate),
        }
    }

    fn delegate(&self) -> std::sync::MutexGuard<'_, D> {
        self.delegate.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl<D: ContextDelegate> ModemPersistence for DelegateStorage<D> {
    fn context_store(&self, ctx: ContextId, offset: u32, data: &[u8]) -> Result<(), StorageError> {
        self.delegate().store(ctx, offset, data);
        Ok(())
    }

    fn context_restore(
        &self,
        ctx: ContextId,
        offset: u32,
        buffer: &mut [u8],
    ) -> Result<usize, StorageError> {
        self.delegate().restore(ctx, offset, buffer);
        Ok(buffer.len())
    }

    fn crashlog_store(&self, log: &[u8]) -> Result<(), StorageError> {
        self.delegate().store(ContextId::CRASHLOG, 0, log);
        Ok(())
    }

    fn crashlog_restore(&self, buffer: &mut [u8]) -> Result<usize, StorageError> {
        self.delegate().restore(ContextId::CRASHLOG, 0, buffer);
        Ok(buffer.len())
    }

    fn crashlog_set_status(&self, available: bool) -> Result<(), StorageError> {
        self.delegate()
            .store(ContextId::CRASHLOG_STATUS, 0, &[available as u8]);
        Ok(())
    }

    fn crashlog_get_status(&self) -> Result<bool, StorageError> {
        let mut flag = [0u8; 1];
        self.delegate()
            .restore(ContextId::CRASHLOG_STATUS, 0, &mut flag);
        Ok(flag[0] != 0)
    }
}

// ---------------------------------------------------------------------------
// Settings mode
// ---------------------------------------------------------------------------

/// Read access to one stored value during a subtree load.
pub trait ValueReader {
    /// Stored length in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy up to `buffer.len()` bytes of the value, returning the count.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, SettingsError>;
}

/// Called once per key found under a loaded subtree, with the key relative
/// to the subtree (empty for the subtree key itself).
pub type LoadVisitor<'a> =
    dyn FnMut(&str, &mut dyn ValueReader) -> Result<(), SettingsError> + 'a;

/// Key/value settings store with subtree loads.
pub trait SettingsBackend: Send + Sync {
    /// Prepare the store. Called once, before the first save or load.
    fn init(&self) -> Result<(), SettingsError> {
        Ok(())
    }

    fn save_one(&self, key: &str, value: &[u8]) -> Result<(), SettingsError>;

    /// Hand every value stored at `subtree` or below it to `visit`.
    fn load_subtree(&self, subtree: &str, visit: &mut LoadVisitor<'_>) -> Result<(), SettingsError>;
}

/// True when `key` is `subtree` itself or lies below it.
pub(crate) fn relative_key<'k>(key: &'k str, subtree: &str) -> Option<&'k str> {
    let rest = key.strip_prefix(subtree)?;
    if rest.is_empty() {
        Some("")
    } else {
        rest.strip_prefix('/')
    }
}

/// [`ValueReader`] over an in-memory value.
pub struct SliceReader<'a> {
    value: &'a [u8],
}

impl<'a> SliceReader<'a> {
    pub fn new(value: &'a [u8]) -> Self {
        Self { value }
    }
}

impl ValueReader for SliceReader<'_> {
    fn len(&self) -> usize {
        self.value.len()
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, SettingsError> {
        let n = buffer.len().min(self.value.len());
        buffer[..n].copy_from_slice(&self.value[..n]);
        Ok(n)
    }
}

/// In-process settings store.
#[derive(Default)]
pub struct MemorySettings {
    values: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.values.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl SettingsBackend for MemorySettings {
    fn save_one(&self, key: &str, value: &[u8]) -> Result<(), SettingsError> {
        self.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn load_subtree(&self, subtree: &str, visit: &mut LoadVisitor<'_>) -> Result<(), SettingsError> {
        // Snapshot first: the visitor may call back into this store.
        let matches: Vec<(String, Vec<u8>)> = self
            .lock()
            .iter()
            .filter(|(key, _)| relative_key(key, subtree).is_some())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        for (key, value) in matches {
            let name = relative_key(&key, subtree).unwrap_or_default();
            visit(name, &mut SliceReader::new(&value))?;
        }
        Ok(())
    }
}

/// Pending-load slot.
///
/// A load parks its request here until the backend's read-back arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSlot {
    Idle,
    Loading { path: String, capacity: usize },
}

/// Modem persistence on top of a [`SettingsBackend`].
pub struct SettingsStorage<B: SettingsBackend> {
    backend: B,
    initialized: OnceLock<()>,
    slot: Mutex<LoadSlot>,
}

impl<B: SettingsBackend> SettingsStorage<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            initialized: OnceLock::new(),
            slot: Mutex::new(LoadSlot::Idle),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Current state of the pending-load slot.
    pub fn load_slot(&self) -> LoadSlot {
        self.lock_slot().clone()
    }

    fn ensure_init(&self) {
        self.initialized.get_or_init(|| {
            if let Err(e) = self.backend.init() {
                error!("Settings init failed: {}", e);
            }
        });
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, LoadSlot> {
        self.slot.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn store(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        self.ensure_init();
        trace!("Saving {} bytes to {}", data.len(), path);
        self.backend.save_one(path, data)?;
        Ok(())
    }

    /// Load the value at `path` into `buffer`.
    ///
    /// Returns the number of bytes copied; 0 when nothing is stored.
    fn load(&self, path: &str, buffer: &mut [u8]) -> Result<usize, StorageError> {
        self.ensure_init();

        {
            let mut slot = self.lock_slot();
            if let LoadSlot::Loading { path: pending, .. } = &*slot {
                debug!("Load of {} rejected, {} still pending", path, pending);
                return Err(StorageError::LoadInFlight {
                    path: path.to_string(),
                });
            }
            *slot = LoadSlot::Loading {
                path: path.to_string(),
                capacity: buffer.len(),
            };
        }
        let _idle = SlotRelease(&self.slot);

        let mut copied = 0;
        self.backend.load_subtree(path, &mut |name, reader| {
            if !name.is_empty() {
                // Only the exact key is wanted, not its children.
                return Ok(());
            }
            copied = reader.read(&mut buffer[..]).map_err(|e| {
                error!("Unable to load {}: {}", path, e);
                e
            })?;
            Ok(())
        })?;

        Ok(copied)
    }
}

/// Returns the slot to `Idle` however the load ends.
struct SlotRelease<'a>(&'a Mutex<LoadSlot>);

impl Drop for SlotRelease<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(|p| p.into_inner()) = LoadSlot::Idle;
    }
}

/// Settings path of a modem context blob.
pub fn context_path(ctx: ContextId, offset: u32) -> String {
    format!("{}/context/{}/{}", SETTINGS_ROOT, ctx, offset)
}

impl<B: SettingsBackend> ModemPersistence for SettingsStorage<B> {
    fn context_store(&self, ctx: ContextId, offset: u32, data: &[u8]) -> Result<(), StorageError> {
        self.store(&context_path(ctx, offset), data)
    }

    fn context_restore(
        &self,
        ctx: ContextId,
        offset: u32,
        buffer: &mut [u8],
    ) -> Result<usize, StorageError> {
        self.load(&context_path(ctx, offset), buffer)
    }

    fn crashlog_store(&self, log: &[u8]) -> Result<(), StorageError> {
        self.store(CRASHLOG_PATH, log)
    }

    fn crashlog_restore(&self, buffer: &mut [u8]) -> Result<usize, StorageError> {
        self.load(CRASHLOG_PATH, buffer)
    }

    fn crashlog_set_status(&self, available: bool) -> Result<(), StorageError> {
        self.store(CRASHLOG_STATUS_PATH, &[available as u8])
    }

    fn crashlog_get_status(&self) -> Result<bool, StorageError> {
        let mut flag = [0u8; 1];
        let n = self.load(CRASHLOG_STATUS_PATH, &mut flag)?;
        Ok(n == 1 && flag[0] != 0)
    }
}
