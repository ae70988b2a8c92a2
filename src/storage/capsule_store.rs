// src/storage/capsule_store.rs
//! In-memory storage for time capsules.
//!
//! Lock state is computed on read from the caller-supplied `now`, so the
//! store never has to be told when a capsule unlocks. Operations that target
//! a single capsule take the caller's `viewer` identity; a private capsule
//! that the viewer may not see is reported as `NotFound`.

use crate::error::{Error, Result};
use crate::models::capsule::{
    CapsuleKind, CapsuleUpdate, Comment, NewCapsule, Reaction, TimeCapsule,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
pub struct CapsuleStore {
    capsules: HashMap<String, TimeCapsule>,
}

impl CapsuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seals a new capsule and returns it.
    ///
    /// # Arguments
    /// * `capsule` - Caller-supplied fields
    /// * `now` - Creation instant recorded on the capsule
    ///
    /// # Errors
    /// Validation error if the title or creator is empty, or if the
    /// auto-delete instant does not fall after the unlock instant.
    pub fn create(&mut self, capsule: NewCapsule, now: DateTime<Utc>) -> Result<TimeCapsule> {
        if capsule.title.trim().is_empty() {
            return Err(Error::validation("title", "must not be empty"));
        }
        if capsule.created_by.trim().is_empty() {
            return Err(Error::validation("createdBy", "must not be empty"));
        }
        check_auto_delete(capsule.unlock_at, capsule.auto_delete_at)?;

        let sealed = TimeCapsule {
            id: Uuid::new_v4().to_string(),
            title: capsule.title,
            content: capsule.content,
            unlock_at: capsule.unlock_at,
            kind: capsule.kind,
            visibility: capsule.visibility,
            created_by: capsule.created_by,
            created_at: now,
            auto_delete_at: capsule.auto_delete_at,
            is_viewed: false,
            comments: Vec::new(),
            reactions: Vec::new(),
        };
        self.capsules.insert(sealed.id.clone(), sealed.clone());
        Ok(sealed)
    }

    /// Looks up a capsule regardless of visibility.
    pub fn get(&self, id: &str) -> Option<&TimeCapsule> {
        self.capsules.get(id)
    }

    /// Looks up a capsule as seen by `viewer`.
    ///
    /// # Returns
    /// The capsule, or `NotFound` if it does not exist or is private to
    /// someone else.
    pub fn get_visible(&self, id: &str, viewer: Option<&str>) -> Result<&TimeCapsule> {
        self.capsules
            .get(id)
            .filter(|c| c.is_visible_to(viewer))
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Capsules of one kind, in unlock order.
    pub fn by_kind(&self, kind: CapsuleKind) -> Vec<&TimeCapsule> {
        self.sorted(|c| c.kind == kind)
    }

    /// Every capsule, in unlock order.
    pub fn all(&self) -> Vec<&TimeCapsule> {
        self.sorted(|_| true)
    }

    /// Capsules whose unlock instant is at or before `now`.
    pub fn unlocked(&self, now: DateTime<Utc>) -> Vec<&TimeCapsule> {
        self.sorted(|c| c.is_unlocked_at(now))
    }

    /// Capsules still sealed at `now`.
    pub fn locked(&self, now: DateTime<Utc>) -> Vec<&TimeCapsule> {
        self.sorted(|c| !c.is_unlocked_at(now))
    }

    /// Applies the fields present in `changes`.
    ///
    /// # Arguments
    /// * `id` - Capsule to change
    /// * `changes` - Fields to overwrite
    /// * `viewer` - Caller identity, checked against visibility
    ///
    /// # Returns
    /// The capsule after the update.
    ///
    /// # Errors
    /// - `NotFound` if the capsule is missing or hidden from `viewer`
    /// - `Validation` for a blank title or an auto-delete instant that does
    ///   not fall after the unlock instant; nothing is changed in that case
    pub fn update(
        &mut self,
        id: &str,
        changes: CapsuleUpdate,
        viewer: Option<&str>,
    ) -> Result<TimeCapsule> {
        let capsule = self.get_visible_mut(id, viewer)?;
        if let Some(title) = &changes.title {
            if title.trim().is_empty() {
                return Err(Error::validation("title", "must not be empty"));
            }
        }
        let unlock_at = changes.unlock_at.unwrap_or(capsule.unlock_at);
        check_auto_delete(unlock_at, changes.auto_delete_at.or(capsule.auto_delete_at))?;

        if let Some(title) = changes.title {
            capsule.title = title;
        }
        if let Some(content) = changes.content {
            capsule.content = content;
        }
        if let Some(kind) = changes.kind {
            capsule.kind = kind;
        }
        if let Some(visibility) = changes.visibility {
            capsule.visibility = visibility;
        }
        if changes.auto_delete_at.is_some() {
            capsule.auto_delete_at = changes.auto_delete_at;
        }
        capsule.unlock_at = unlock_at;
        Ok(capsule.clone())
    }

    /// Opens an unlocked capsule and marks it as viewed.
    ///
    /// # Errors
    /// - `NotFound` if the capsule is missing or hidden from `viewer`
    /// - `CapsuleLocked` if `now` is before the unlock instant
    pub fn mark_viewed(
        &mut self,
        id: &str,
        viewer: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TimeCapsule> {
        let capsule = self.get_visible_mut(id, viewer)?;
        if !capsule.is_unlocked_at(now) {
            return Err(Error::CapsuleLocked {
                id: id.to_string(),
                unlock_at: capsule.unlock_at,
            });
        }
        capsule.is_viewed = true;
        Ok(capsule.clone())
    }

    /// Removes a capsule.
    ///
    /// # Returns
    /// `false` if nothing visible to `viewer` was stored under `id`.
    pub fn delete(&mut self, id: &str, viewer: Option<&str>) -> bool {
        if self.get_visible(id, viewer).is_err() {
            return false;
        }
        self.capsules.remove(id).is_some()
    }

    /// Drops every capsule whose auto-delete instant has passed.
    ///
    /// # Returns
    /// Number of capsules removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.capsules.len();
        self.capsules.retain(|_, c| !c.is_due_for_deletion(now));
        let purged = before - self.capsules.len();
        if purged > 0 {
            log::info!("purged {} capsules past their auto-delete date", purged);
        }
        purged
    }

    /// Appends a comment by `created_by`, who must be able to see the capsule.
    ///
    /// # Errors
    /// Validation error for empty content, `NotFound` for a missing or
    /// hidden capsule.
    pub fn add_comment(
        &mut self,
        capsule_id: &str,
        content: &str,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Result<Comment> {
        if content.trim().is_empty() {
            return Err(Error::validation("content", "must not be empty"));
        }
        let capsule = self.get_visible_mut(capsule_id, Some(created_by))?;
        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            created_by: created_by.to_string(),
            created_at: now,
        };
        capsule.comments.push(comment.clone());
        Ok(comment)
    }

    /// Adds one reaction of `reaction_type`, returning the new count.
    pub fn add_reaction(
        &mut self,
        capsule_id: &str,
        reaction_type: &str,
        viewer: Option<&str>,
    ) -> Result<u64> {
        if reaction_type.trim().is_empty() {
            return Err(Error::validation("type", "must not be empty"));
        }
        let capsule = self.get_visible_mut(capsule_id, viewer)?;
        match capsule
            .reactions
            .iter_mut()
            .find(|r| r.reaction_type == reaction_type)
        {
            Some(reaction) => {
                reaction.count += 1;
                Ok(reaction.count)
            }
            None => {
                capsule.reactions.push(Reaction {
                    reaction_type: reaction_type.to_string(),
                    count: 1,
                });
                Ok(1)
            }
        }
    }

    pub fn count(&self) -> usize {
        self.capsules.len()
    }

    fn get_visible_mut(&mut self, id: &str, viewer: Option<&str>) -> Result<&mut TimeCapsule> {
        self.capsules
            .get_mut(id)
            .filter(|c| c.is_visible_to(viewer))
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    // unlock order, then creation order
    fn sorted(&self, keep: impl Fn(&TimeCapsule) -> bool) -> Vec<&TimeCapsule> {
        let mut selected: Vec<&TimeCapsule> = self.capsules.values().filter(|c| keep(c)).collect();
        selected.sort_by(|a, b| {
            a.unlock_at
                .cmp(&b.unlock_at)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        selected
    }
}

fn check_auto_delete(unlock_at: DateTime<Utc>, auto_delete_at: Option<DateTime<Utc>>) -> Result<()> {
    match auto_delete_at {
        Some(at) if at <= unlock_at => Err(Error::validation(
            "autoDeleteAt",
            "must be after the unlock date",
        )),
        _ => Ok(()),
    }
}
