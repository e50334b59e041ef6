// ABOUTME: File-based response cache keyed by a SHA-256 of each logical request
// ABOUTME: Entries carry their own expiry and are written atomically via temp file and rename

use crate::constants::cache as defaults;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cannot determine home directory for the cache")]
    NoHomeDir,

    #[error("Cache I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),
}

type CacheResult<T> = std::result::Result<T, CacheError>;

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// One logical request whose response may be cached
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    CurrentUser {
        subdomain: String,
    },
    UserList {
        subdomain: String,
        page: u32,
        per_page: u32,
    },
    User {
        subdomain: String,
        id: i64,
    },
    UserSearch {
        subdomain: String,
        query: String,
    },
    TicketList {
        subdomain: String,
        page: u32,
        per_page: u32,
        status: Option<String>,
    },
    Ticket {
        subdomain: String,
        id: i64,
    },
    TicketComments {
        subdomain: String,
        id: i64,
    },
    TicketSearch {
        subdomain: String,
        query: String,
    },
    OrganizationList {
        subdomain: String,
        page: u32,
        per_page: u32,
    },
    Organization {
        subdomain: String,
        id: i64,
    },
    OrganizationSearch {
        subdomain: String,
        name: String,
    },
    OrganizationUsers {
        subdomain: String,
        id: i64,
        page: u32,
        per_page: u32,
    },
    OrganizationTickets {
        subdomain: String,
        id: i64,
        page: u32,
        per_page: u32,
    },
    GroupList {
        subdomain: String,
        page: u32,
        per_page: u32,
    },
    Group {
        subdomain: String,
        id: i64,
    },
    GroupUsers {
        subdomain: String,
        id: i64,
        page: u32,
        per_page: u32,
    },
    GroupMemberships {
        subdomain: String,
        id: i64,
        page: u32,
        per_page: u32,
    },
}

/// Length-prefix free text so embedded delimiters cannot shift fields
fn text(value: &str) -> String {
    format!("{}#{}", value.len(), value)
}

impl CacheKey {
    /// Canonical string embedding every parameter of the request
    pub fn logical(&self) -> String {
        match self {
            Self::CurrentUser { subdomain } => format!("{}:users:me", text(subdomain)),
            Self::UserList {
                subdomain,
                page,
                per_page,
            } => format!("{}:users:list:{}:{}", text(subdomain), page, per_page),
            Self::User { subdomain, id } => format!("{}:users:get:{}", text(subdomain), id),
            Self::UserSearch { subdomain, query } => {
                format!("{}:users:search:{}", text(subdomain), text(query))
            }
            Self::TicketList {
                subdomain,
                page,
                per_page,
                status,
            } => format!(
                "{}:tickets:list:{}:{}:{}",
                text(subdomain),
                page,
                per_page,
                status.as_deref().map(text).unwrap_or_else(|| "-".to_string())
            ),
            Self::Ticket { subdomain, id } => format!("{}:tickets:get:{}", text(subdomain), id),
            Self::TicketComments { subdomain, id } => {
                format!("{}:tickets:comments:{}", text(subdomain), id)
            }
            Self::TicketSearch { subdomain, query } => {
                format!("{}:tickets:search:{}", text(subdomain), text(query))
            }
            Self::OrganizationList {
                subdomain,
                page,
                per_page,
            } => format!("{}:orgs:list:{}:{}", text(subdomain), page, per_page),
            Self::Organization { subdomain, id } => {
                format!("{}:orgs:get:{}", text(subdomain), id)
            }
            Self::OrganizationSearch { subdomain, name } => {
                format!("{}:orgs:search:{}", text(subdomain), text(name))
            }
            Self::OrganizationUsers {
                subdomain,
                id,
                page,
                per_page,
            } => format!(
                "{}:orgs:users:{}:{}:{}",
                text(subdomain),
                id,
                page,
                per_page
            ),
            Self::OrganizationTickets {
                subdomain,
                id,
                page,
                per_page,
            } => format!(
                "{}:orgs:tickets:{}:{}:{}",
                text(subdomain),
                id,
                page,
                per_page
            ),
            Self::GroupList {
                subdomain,
                page,
                per_page,
            } => format!("{}:groups:list:{}:{}", text(subdomain), page, per_page),
            Self::Group { subdomain, id } => format!("{}:groups:get:{}", text(subdomain), id),
            Self::GroupUsers {
                subdomain,
                id,
                page,
                per_page,
            } => format!(
                "{}:groups:users:{}:{}:{}",
                text(subdomain),
                id,
                page,
                per_page
            ),
            Self::GroupMemberships {
                subdomain,
                id,
                page,
                per_page,
            } => format!(
                "{}:groups:memberships:{}:{}:{}",
                text(subdomain),
                id,
                page,
                per_page
            ),
        }
    }

    /// Lowercase hex SHA-256 of the logical key plus `.json`
    pub fn file_name(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.logical().as_bytes());
        format!("{:x}.json", hasher.finalize())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    data: serde_json::Value,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Entry {
    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Outcome of removing expired entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub removed: usize,
    pub kept: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub dir: PathBuf,
    pub entries: usize,
    pub expired: usize,
    pub total_bytes: u64,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
    ttl: Duration,
}

impl Cache {
    /// Open the cache at `$ZD_CACHE_DIR` or `~/.zd/cache`, creating it if needed
    pub fn new(ttl: Duration) -> CacheResult<Self> {
        Self::with_dir(default_cache_dir()?, ttl)
    }

    pub fn with_dir(dir: impl Into<PathBuf>, ttl: Duration) -> CacheResult<Self> {
        let dir = dir.into();
        create_private_dir(&dir)?;
        Ok(Self { dir, ttl })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Fetch a live entry; expired or malformed entries are removed and miss
    pub fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let path = self.entry_path(key);
        let bytes = fs::read(&path).ok()?;

        let entry = match serde_json::from_slice::<Entry>(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Discarding unreadable cache entry {}: {}", key.logical(), e);
                let _ = fs::remove_file(&path);
                return None;
            }
        };

        if !entry.is_valid(Utc::now()) {
            debug!("Cache entry expired: {}", key.logical());
            let _ = fs::remove_file(&path);
            return None;
        }

        serde_json::to_vec(&entry.data).ok()
    }

    /// Store a raw JSON response body, replacing any previous entry
    pub fn set(&self, key: &CacheKey, data: &[u8]) -> CacheResult<()> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        let entry = Entry {
            data: serde_json::from_slice(data)?,
            created_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        let encoded = serde_json::to_vec(&entry)?;

        let path = self.entry_path(key);
        let temp_path = path.with_extension("tmp");
        write_private_file(&temp_path, &encoded)?;
        fs::rename(&temp_path, &path).map_err(io_err(&path))?;

        debug!("Cached {} -> {:?}", key.logical(), path);
        Ok(())
    }

    pub fn delete(&self, key: &CacheKey) -> CacheResult<()> {
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&path)(e)),
        }
    }

    /// Remove every entry file
    pub fn clear(&self) -> CacheResult<()> {
        for path in self.entry_files()? {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_err(&path)(e)),
            }
        }
        Ok(())
    }

    pub fn prune_expired(&self) -> CacheResult<PruneReport> {
        let now = Utc::now();
        let mut report = PruneReport::default();

        for path in self.entry_files()? {
            if path.extension().is_some_and(|ext| ext == "json") && entry_is_live(&path, now) {
                report.kept += 1;
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => report.removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_err(&path)(e)),
            }
        }

        Ok(report)
    }

    pub fn stats(&self) -> CacheResult<CacheStats> {
        let now = Utc::now();
        let mut stats = CacheStats {
            dir: self.dir.clone(),
            entries: 0,
            expired: 0,
            total_bytes: 0,
            ttl: self.ttl,
        };

        for path in self.entry_files()? {
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            if let Ok(metadata) = fs::metadata(&path) {
                stats.total_bytes += metadata.len();
            }
            stats.entries += 1;
            if !entry_is_live(&path, now) {
                stats.expired += 1;
            }
        }

        Ok(stats)
    }

    /// Entry and leftover temp files in the cache directory
    fn entry_files(&self) -> CacheResult<Vec<PathBuf>> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(&self.dir)(e)),
        };

        let mut files = Vec::new();
        for entry in read_dir {
            let path = entry.map_err(io_err(&self.dir))?.path();
            let is_cache_file = path
                .extension()
                .is_some_and(|ext| ext == "json" || ext == "tmp");
            if path.is_file() && is_cache_file {
                files.push(path);
            }
        }
        Ok(files)
    }
}

fn entry_is_live(path: &Path, now: DateTime<Utc>) -> bool {
    fs::read(path)
        .ok()
        .and_then(|bytes| serde_json::from_slice::<Entry>(&bytes).ok())
        .is_some_and(|entry| entry.is_valid(now))
}

fn default_cache_dir() -> CacheResult<PathBuf> {
    if let Ok(custom_dir) = std::env::var(defaults::CACHE_DIR_ENV) {
        if !custom_dir.is_empty() {
            return Ok(PathBuf::from(custom_dir));
        }
    }

    let home = dirs::home_dir().ok_or(CacheError::NoHomeDir)?;
    Ok(home.join(defaults::STATE_DIR).join(defaults::CACHE_SUBDIR))
}

fn create_private_dir(dir: &Path) -> CacheResult<()> {
    fs::create_dir_all(dir).map_err(io_err(dir))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700)).map_err(io_err(dir))?;
    }
    Ok(())
}

fn write_private_file(path: &Path, contents: &[u8]) -> CacheResult<()> {
    fs::write(path, contents).map_err(io_err(path))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(io_err(path))?;
    }
    Ok(())
}
