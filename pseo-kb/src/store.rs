//! File-backed knowledge base store

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::deep_merge;

/// Document format version
pub const KB_VERSION: &str = "1.0";

/// Provenance recorded on profiles written by agents
pub const AGENT_RESEARCH_SOURCE: &str = "agent_research";

/// Knowledge base errors
#[derive(Debug, Error)]
pub enum KbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid knowledge base document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Profile for '{0}' must be a JSON object")]
    InvalidProfile(String),

    #[error("No profile for '{0}'")]
    NotFound(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbMetadata {
    pub version: String,
    pub last_updated: DateTime<Utc>,
    pub total_competitors: usize,
    #[serde(default)]
    pub notes: String,
}

/// The persisted document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbDocument {
    #[serde(default)]
    pub competitors: BTreeMap<String, Value>,
    pub metadata: KbMetadata,
}

impl Default for KbDocument {
    fn default() -> Self {
        Self {
            competitors: BTreeMap::new(),
            metadata: KbMetadata {
                version: KB_VERSION.to_string(),
                last_updated: Utc::now(),
                total_competitors: 0,
                notes: "Agent-managed competitor knowledge base. Auto-populated during page generation."
                    .to_string(),
            },
        }
    }
}

impl KbDocument {
    /// Exact key first, then a case-insensitive match
    fn resolve_key(&self, competitor: &str) -> Option<String> {
        if self.competitors.contains_key(competitor) {
            return Some(competitor.to_string());
        }
        let wanted = competitor.trim().to_lowercase();
        self.competitors
            .keys()
            .find(|k| k.to_lowercase() == wanted)
            .cloned()
    }

    fn touch(&mut self) {
        self.metadata.last_updated = Utc::now();
        self.metadata.total_competitors = self.competitors.len();
    }
}

/// Summary of the store contents
#[derive(Debug, Clone, Serialize)]
pub struct KbStats {
    pub total_competitors: usize,
    pub last_updated: DateTime<Utc>,
    pub competitors: Vec<String>,
}

/// Per-file write locks, shared by every store opened on the same file
static FILE_LOCKS: LazyLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    LazyLock::new(Default::default);

fn shared_file_lock(path: &Path) -> Result<Arc<Mutex<()>>, KbError> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => fs::canonicalize(parent)?,
        None => std::env::current_dir()?,
    };
    let key = match path.file_name() {
        Some(name) => dir.join(name),
        None => dir,
    };
    Ok(FILE_LOCKS.lock().entry(key).or_default().clone())
}

/// Competitor knowledge base.
///
/// With a backing file the document is re-read before every operation and
/// written back atomically (temp file + rename). Every store opened on the
/// same file in this process takes the same lock around that
/// read-merge-write, so no update is lost between them. Writers in other
/// processes are not coordinated: run one generator process per KB file.
pub struct KnowledgeBase {
    path: Option<PathBuf>,
    file_lock: Option<Arc<Mutex<()>>>,
    document: Mutex<KbDocument>,
}

impl KnowledgeBase {
    /// Open (or create) a knowledge base file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KbError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file_lock = shared_file_lock(&path)?;

        let document = {
            let _held = file_lock.lock();
            if path.exists() {
                read_document(&path)?
            } else {
                let mut document = KbDocument::default();
                document.touch();
                write_document(&path, &document)?;
                info!("Created knowledge base at {}", path.display());
                document
            }
        };

        Ok(Self {
            path: Some(path),
            file_lock: Some(file_lock),
            document: Mutex::new(document),
        })
    }

    /// A knowledge base that lives only for the process
    pub fn in_memory() -> Self {
        Self {
            path: None,
            file_lock: None,
            document: Mutex::new(KbDocument::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `op` against the freshest copy of the document
    fn with_document<T>(
        &self,
        op: impl FnOnce(&mut KbDocument) -> Result<(T, bool), KbError>,
    ) -> Result<T, KbError> {
        let _file = self.file_lock.as_ref().map(|lock| lock.lock());
        let mut guard = self.document.lock();

        if let Some(path) = &self.path {
            if path.exists() {
                *guard = read_document(path)?;
            }
        }

        let (result, dirty) = op(&mut *guard)?;

        if dirty {
            guard.touch();
            if let Some(path) = &self.path {
                write_document(path, &guard)?;
                debug!("Knowledge base written to {}", path.display());
            }
        }

        Ok(result)
    }

    pub fn get_profile(&self, competitor: &str) -> Result<Option<Value>, KbError> {
        self.with_document(|doc| {
            let profile = doc
                .resolve_key(competitor)
                .and_then(|key| doc.competitors.get(&key).cloned());
            Ok((profile, false))
        })
    }

    pub fn profile_exists(&self, competitor: &str) -> Result<bool, KbError> {
        self.with_document(|doc| Ok((doc.resolve_key(competitor).is_some(), false)))
    }

    /// Insert a profile, deep-merging into any existing one.
    ///
    /// `kb_metadata.added_at` is kept from the first write; `last_updated`
    /// and `source` are refreshed. Returns the stored profile.
    pub fn save_profile(&self, competitor: &str, profile: Value) -> Result<Value, KbError> {
        if !profile.is_object() {
            return Err(KbError::InvalidProfile(competitor.to_string()));
        }

        self.with_document(|doc| {
            let key = doc
                .resolve_key(competitor)
                .unwrap_or_else(|| competitor.to_string());
            let now = Utc::now().to_rfc3339();

            let mut stored = doc.competitors.remove(&key).unwrap_or_else(|| json!({}));
            let added_at = stored
                .pointer("/kb_metadata/added_at")
                .cloned()
                .unwrap_or_else(|| Value::String(now.clone()));

            deep_merge(&mut stored, profile);
            deep_merge(
                &mut stored,
                json!({
                    "kb_metadata": {
                        "added_at": added_at,
                        "last_updated": now,
                        "source": AGENT_RESEARCH_SOURCE,
                    }
                }),
            );

            doc.competitors.insert(key.clone(), stored.clone());
            info!("Saved {} profile to knowledge base", key);
            Ok((stored, true))
        })
    }

    /// Merge new findings into an existing profile
    pub fn update_profile(&self, competitor: &str, new_data: Value) -> Result<Value, KbError> {
        if !self.profile_exists(competitor)? {
            return Err(KbError::NotFound(competitor.to_string()));
        }
        self.save_profile(competitor, new_data)
    }

    pub fn list_competitors(&self) -> Result<Vec<String>, KbError> {
        self.with_document(|doc| Ok((doc.competitors.keys().cloned().collect(), false)))
    }

    pub fn stats(&self) -> Result<KbStats, KbError> {
        self.with_document(|doc| {
            Ok((
                KbStats {
                    total_competitors: doc.competitors.len(),
                    last_updated: doc.metadata.last_updated,
                    competitors: doc.competitors.keys().cloned().collect(),
                },
                false,
            ))
        })
    }
}

fn read_document(path: &Path) -> Result<KbDocument, KbError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write to a sibling temp file, then rename over the target
fn write_document(path: &Path, document: &KbDocument) -> Result<(), KbError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "kb.json".to_string());
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    fs::write(&tmp, serde_json::to_string_pretty(document)?)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
