//! Ledger mutation journal.
//!
//! JSON Lines, one event per line, optionally hash-chained. Every store
//! mutation is bracketed by an `<OP>_INTENT` event and an `<OP>_COMMIT` event
//! sharing one `op_id`; an intent without its commit marks an operation that
//! may have left the collections partially written.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const TOPIC_LEDGER: &str = "LEDGER";

const INTENT_SUFFIX: &str = "_INTENT";
const COMMIT_SUFFIX: &str = "_COMMIT";

/// Append-only journal writer.
pub struct AuditWriter {
    path: PathBuf,
    hash_chain: bool,
    last_hash: Option<String>,
    /// Events appended so far, including those found on resume. Feeds
    /// `event_id` derivation.
    seq: u64,
}

impl AuditWriter {
    /// Creates the writer and ensures parent dirs exist. Starts a fresh chain.
    pub fn new(path: impl AsRef<Path>, hash_chain: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create_dir_all {:?}", parent))?;
        }

        Ok(Self {
            path,
            hash_chain,
            last_hash: None,
            seq: 0,
        })
    }

    /// Open an existing journal and continue its chain: the last event's
    /// `hash_self` becomes the next `hash_prev`, and the sequence resumes at
    /// the number of events already written.
    pub fn resume(path: impl AsRef<Path>, hash_chain: bool) -> Result<Self> {
        let mut w = Self::new(path, hash_chain)?;
        if !w.path.exists() {
            return Ok(w);
        }
        let events = read_events(&w.path)?;
        w.seq = events.len() as u64;
        w.last_hash = events.last().and_then(|e| e.hash_self.clone());
        Ok(w)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_hash(&self) -> Option<String> {
        self.last_hash.clone()
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Record that `op` is about to mutate the store. Returns the `op_id`
    /// the matching [`commit`](Self::commit) must carry.
    pub fn intent(&mut self, op: &str, payload: Value) -> Result<Uuid> {
        let op_id = Uuid::new_v4();
        self.append(op_id, TOPIC_LEDGER, &format!("{op}{INTENT_SUFFIX}"), payload)?;
        Ok(op_id)
    }

    pub fn commit(&mut self, op_id: Uuid, op: &str, payload: Value) -> Result<AuditEvent> {
        self.append(op_id, TOPIC_LEDGER, &format!("{op}{COMMIT_SUFFIX}"), payload)
    }

    /// Append one event.
    pub fn append(
        &mut self,
        op_id: Uuid,
        topic: &str,
        event_type: &str,
        payload: Value,
    ) -> Result<AuditEvent> {
        let ts_utc = Utc::now();
        let event_id = derive_event_id(self.last_hash.as_deref(), &payload, self.seq)?;
        self.seq += 1;

        let mut ev = AuditEvent {
            event_id,
            op_id,
            ts_utc,
            topic: topic.to_string(),
            event_type: event_type.to_string(),
            payload,
            hash_prev: None,
            hash_self: None,
        };

        if self.hash_chain {
            ev.hash_prev = self.last_hash.clone();
            let self_hash = compute_event_hash(&ev)?;
            ev.hash_self = Some(self_hash.clone());
            self.last_hash = Some(self_hash);
        }

        let line = canonical_json_line(&ev)?;
        append_line(&self.path, &line)?;

        Ok(ev)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub op_id: Uuid,
    pub ts_utc: DateTime<Utc>,
    pub topic: String,
    pub event_type: String,
    pub payload: Value,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

impl AuditEvent {
    pub fn is_intent(&self) -> bool {
        self.event_type.ends_with(INTENT_SUFFIX)
    }

    pub fn is_commit(&self) -> bool {
        self.event_type.ends_with(COMMIT_SUFFIX)
    }
}

/// `event_id` is a UUID v5 over chain position, previous hash and the
/// canonical payload, so replaying the same journal yields the same ids.
fn derive_event_id(last_hash: Option<&str>, payload: &Value, seq: u64) -> Result<Uuid> {
    let canonical = serde_json::to_string(&sort_keys(payload)).context("payload stringify failed")?;
    let name = format!("{}|{}|{}", seq, last_hash.unwrap_or("-"), canonical);
    Ok(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open journal {:?}", path))?;
    f.write_all(line.as_bytes())
        .context("write journal line failed")?;
    f.write_all(b"\n").context("write newline failed")?;
    f.sync_data().context("sync journal failed")?;
    Ok(())
}

fn canonical_json_line<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize journal event failed")?;
    serde_json::to_string(&sort_keys(&raw)).context("json stringify failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// Hash of the canonical event with `hash_self` cleared.
pub fn compute_event_hash(ev: &AuditEvent) -> Result<String> {
    let mut clone = ev.clone();
    clone.hash_self = None;

    let canonical = canonical_json_line(&clone)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

pub fn read_events(path: impl AsRef<Path>) -> Result<Vec<AuditEvent>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("read journal {:?}", path.as_ref()))?;
    parse_events(&content)
}

pub fn parse_events(content: &str) -> Result<Vec<AuditEvent>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| {
            serde_json::from_str(l.trim()).with_context(|| format!("parse journal event at line {}", i + 1))
        })
        .collect()
}

/// Intents whose `op_id` never got a commit, in journal order.
pub fn find_uncommitted_intents(path: impl AsRef<Path>) -> Result<Vec<AuditEvent>> {
    Ok(uncommitted(read_events(path)?))
}

pub fn uncommitted(events: Vec<AuditEvent>) -> Vec<AuditEvent> {
    let committed: HashSet<Uuid> = events
        .iter()
        .filter(|e| e.is_commit())
        .map(|e| e.op_id)
        .collect();
    events
        .into_iter()
        .filter(|e| e.is_intent() && !committed.contains(&e.op_id))
        .collect()
}

/// Verify the hash chain of a journal file.
pub fn verify_hash_chain(path: impl AsRef<Path>) -> Result<VerifyResult> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("read journal {:?}", path.as_ref()))?;
    verify_hash_chain_str(&content)
}

/// Same as [`verify_hash_chain`] over in-memory JSONL.
pub fn verify_hash_chain_str(content: &str) -> Result<VerifyResult> {
    let mut prev_hash: Option<String> = None;
    let mut line_count = 0usize;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let ev: AuditEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("parse journal event at line {}", i + 1))?;

        line_count += 1;

        if ev.hash_prev != prev_hash {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    prev_hash, ev.hash_prev
                ),
            });
        }

        if let Some(ref claimed_hash) = ev.hash_self {
            let recomputed = compute_event_hash(&ev)?;
            if *claimed_hash != recomputed {
                return Ok(VerifyResult::Broken {
                    line: i + 1,
                    reason: format!(
                        "hash_self mismatch: claimed {}, recomputed {}",
                        claimed_hash, recomputed
                    ),
                });
            }
        }

        prev_hash = ev.hash_self.clone();
    }

    Ok(VerifyResult::Valid { lines: line_count })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { lines: usize },
    Broken { line: usize, reason: String },
}
