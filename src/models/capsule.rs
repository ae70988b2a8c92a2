// src/models/capsule.rs
//! Time capsule data model.
//!
//! A capsule holds content that stays sealed until its unlock instant. The
//! lock state is never stored; it is derived from a wall-clock comparison.
//! Private capsules are only visible to their creator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CapsuleKind {
    Message,
    Memory,
    Prediction,
    Nft,
    Legacy,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    #[serde(rename = "type")]
    pub reaction_type: String,
    pub count: u64,
}

/// Caller-supplied fields for a new capsule.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewCapsule {
    pub title: String,
    pub content: String,
    pub unlock_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: CapsuleKind,
    #[serde(default)]
    pub visibility: Visibility,
    pub created_by: String,
    /// The capsule is purged once this instant has passed
    #[serde(default)]
    pub auto_delete_at: Option<DateTime<Utc>>,
}

/// Partial update of a capsule; absent fields are left unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CapsuleUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub unlock_at: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub kind: Option<CapsuleKind>,
    pub visibility: Option<Visibility>,
    pub auto_delete_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeCapsule {
    pub id: String,
    pub title: String,
    pub(crate) content: String,
    pub unlock_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: CapsuleKind,
    pub visibility: Visibility,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub auto_delete_at: Option<DateTime<Utc>>,
    /// Set once a reader has opened the unlocked capsule
    #[serde(default)]
    pub is_viewed: bool,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

impl TimeCapsule {
    pub fn is_unlocked_at(&self, now: DateTime<Utc>) -> bool {
        self.unlock_at <= now
    }

    /// Public capsules are visible to everyone, private ones only to a
    /// viewer whose identifier matches `created_by` (ASCII case-insensitive,
    /// so hex addresses match regardless of checksum casing).
    pub fn is_visible_to(&self, viewer: Option<&str>) -> bool {
        match self.visibility {
            Visibility::Public => true,
            Visibility::Private => {
                viewer.map_or(false, |v| v.trim().eq_ignore_ascii_case(&self.created_by))
            }
        }
    }

    /// Whether the auto-delete instant has passed.
    pub fn is_due_for_deletion(&self, now: DateTime<Utc>) -> bool {
        self.auto_delete_at.map_or(false, |at| at < now)
    }

    /// Returns the content only once the capsule has unlocked.
    pub fn reveal(&self, now: DateTime<Utc>) -> Option<&str> {
        self.is_unlocked_at(now).then_some(self.content.as_str())
    }

    /// A serializable view of the capsule as seen at `now`.
    pub fn view_at(&self, now: DateTime<Utc>) -> CapsuleView {
        CapsuleView {
            id: self.id.clone(),
            title: self.title.clone(),
            content: self.reveal(now).map(str::to_string),
            unlock_at: self.unlock_at,
            kind: self.kind,
            visibility: self.visibility,
            created_by: self.created_by.clone(),
            created_at: self.created_at,
            auto_delete_at: self.auto_delete_at,
            is_locked: !self.is_unlocked_at(now),
            is_viewed: self.is_viewed,
            comments: self.comments.clone(),
            reactions: self.reactions.clone(),
        }
    }
}

/// Capsule as exposed to readers: `content` is `None` while locked.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CapsuleView {
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    pub unlock_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: CapsuleKind,
    pub visibility: Visibility,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub auto_delete_at: Option<DateTime<Utc>>,
    pub is_locked: bool,
    pub is_viewed: bool,
    pub comments: Vec<Comment>,
    pub reactions: Vec<Reaction>,
}
