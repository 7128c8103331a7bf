//! Permission ledger store with checkpoints
//!
//! The ledger owns two maps: permission records keyed by
//! (target, who, permission id) and the freeze set keyed by
//! (target, permission id). Every write made while a checkpoint is open is
//! journaled so the enclosing transaction can be rolled back exactly.
//!
//! The ledger performs no authorization; that is the permission manager's job.

use quorum_core::{Address, PermissionId, ALLOW_FLAG};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// (target, who, permission id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionKey {
    /// Contract the permission applies to
    pub target: Address,
    /// Grantee
    pub who: Address,
    /// Permission identifier
    pub permission_id: PermissionId,
}

impl PermissionKey {
    /// Build a key
    pub fn new(target: Address, who: Address, permission_id: PermissionId) -> Self {
        Self {
            target,
            who,
            permission_id,
        }
    }
}

/// Stored value of a granted key; an absent record means unset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionRecord {
    /// Granted unconditionally
    Allow,
    /// Granted behind the condition contract at this address
    Condition(Address),
}

impl PermissionRecord {
    /// Address form used in events and errors (allow sentinel or condition)
    pub fn as_address(&self) -> Address {
        match self {
            PermissionRecord::Allow => ALLOW_FLAG,
            PermissionRecord::Condition(condition) => *condition,
        }
    }
}

/// Opaque position in the ledger journal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

#[derive(Debug, Clone)]
enum UndoEntry {
    Record {
        key: PermissionKey,
        previous: Option<PermissionRecord>,
    },
    Freeze {
        target: Address,
        permission_id: PermissionId,
    },
}

/// Owned store of permission and freeze records
#[derive(Debug, Clone, Default)]
pub struct PermissionLedger {
    records: BTreeMap<PermissionKey, PermissionRecord>,
    frozen: BTreeSet<(Address, PermissionId)>,
    journal: Vec<UndoEntry>,
    open: usize,
}

impl PermissionLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Record stored for `key`
    pub fn get(&self, key: &PermissionKey) -> Option<PermissionRecord> {
        self.records.get(key).copied()
    }

    /// Whether (target, permission id) is frozen
    pub fn is_frozen(&self, target: Address, permission_id: PermissionId) -> bool {
        self.frozen.contains(&(target, permission_id))
    }

    /// Store `record` under `key`, returning the previous record
    pub fn set(&mut self, key: PermissionKey, record: PermissionRecord) -> Option<PermissionRecord> {
        let previous = self.records.insert(key, record);
        self.journal_record(key, previous);
        previous
    }

    /// Clear `key`, returning the previous record
    pub fn clear(&mut self, key: &PermissionKey) -> Option<PermissionRecord> {
        let previous = self.records.remove(key);
        if previous.is_some() {
            self.journal_record(*key, previous);
        }
        previous
    }

    /// Freeze (target, permission id); returns false if it already was
    pub fn freeze(&mut self, target: Address, permission_id: PermissionId) -> bool {
        let inserted = self.frozen.insert((target, permission_id));
        if inserted && self.open > 0 {
            self.journal.push(UndoEntry::Freeze {
                target,
                permission_id,
            });
        }
        inserted
    }

    /// Every stored record, ordered by key
    pub fn records(&self) -> impl Iterator<Item = (&PermissionKey, &PermissionRecord)> {
        self.records.iter()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record is stored
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Open a checkpoint; writes are journaled until it is committed or rolled back
    pub fn checkpoint(&mut self) -> Checkpoint {
        self.open += 1;
        Checkpoint(self.journal.len())
    }

    /// Keep every write made since `checkpoint`
    pub fn commit(&mut self, checkpoint: Checkpoint) {
        debug_assert!(checkpoint.0 <= self.journal.len());
        self.close();
    }

    /// Undo every write made since `checkpoint`, newest first
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.0 {
            match self.journal.pop() {
                Some(UndoEntry::Record { key, previous }) => match previous {
                    Some(record) => {
                        self.records.insert(key, record);
                    }
                    None => {
                        self.records.remove(&key);
                    }
                },
                Some(UndoEntry::Freeze {
                    target,
                    permission_id,
                }) => {
                    self.frozen.remove(&(target, permission_id));
                }
                None => break,
            }
        }
        self.close();
    }

    fn close(&mut self) {
        self.open = self.open.saturating_sub(1);
        if self.open == 0 {
            self.journal.clear();
        }
    }

    fn journal_record(&mut self, key: PermissionKey, previous: Option<PermissionRecord>) {
        if self.open > 0 {
            self.journal.push(UndoEntry::Record { key, previous });
        }
    }
}
