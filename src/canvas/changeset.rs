//! Batch edits produced by the automation assistant.
//!
//! Input is JSON5 (the assistant tends to emit comments and trailing
//! commas): either an array of entries or `{ "changes": [...] }`. Each entry
//! names its `action`; entries that do not match their action's shape are
//! dropped up front. New elements may carry a caller-chosen `tempId` that
//! other entries in the same batch use as a reference. Every temp id gets a
//! real id before anything is applied, so references resolve regardless of
//! entry order.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::{Context, bail};
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::CanvasConfig;
use crate::geometry::AnchorPosition;
use crate::issues::StatusCategory;
use crate::log::debug;
use crate::model::{CardSource, Document, Endpoint, EndpointKind};

use super::error::CanvasError;
use super::{RectLookup, SceneIndex};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EndpointRef {
    #[serde(rename = "type")]
    pub kind: EndpointKind,
    pub id: String,
    #[serde(default)]
    pub anchor: Option<AnchorPosition>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Change {
    AddGroup {
        temp_id: Option<String>,
        #[serde(default)]
        name: String,
        parent_id: Option<String>,
        x: Option<f32>,
        y: Option<f32>,
        width: Option<f32>,
        height: Option<f32>,
    },
    UpdateGroup {
        id: String,
        name: Option<String>,
        x: Option<f32>,
        y: Option<f32>,
        width: Option<f32>,
        height: Option<f32>,
        /// Absent: keep. `null`: move to the canvas root.
        #[serde(default, deserialize_with = "double_option")]
        parent_id: Option<Option<String>>,
    },
    DeleteGroup {
        id: String,
    },
    AddCard {
        temp_id: Option<String>,
        issue_key: Option<String>,
        ticket_id: Option<String>,
        group_id: Option<String>,
        x: Option<f32>,
        y: Option<f32>,
    },
    AssignCard {
        card_id: String,
        /// Absent: keep. `null`: detach onto the canvas.
        #[serde(default, deserialize_with = "double_option")]
        group_id: Option<Option<String>>,
        x: Option<f32>,
        y: Option<f32>,
    },
    DeleteCard {
        id: String,
    },
    AddRelation {
        temp_id: Option<String>,
        from: EndpointRef,
        to: EndpointRef,
    },
    DeleteRelation {
        id: String,
    },
    AddVirtualTicket {
        temp_id: Option<String>,
        summary: String,
        status: Option<StatusCategory>,
    },
    UpdateVirtualTicket {
        id: String,
        summary: Option<String>,
        status: Option<StatusCategory>,
    },
    DeleteVirtualTicket {
        id: String,
    },
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Minted {
    Group,
    Card,
    Relation,
    Ticket,
}

impl Change {
    pub fn action(&self) -> &'static str {
        match self {
            Change::AddGroup { .. } => "addGroup",
            Change::UpdateGroup { .. } => "updateGroup",
            Change::DeleteGroup { .. } => "deleteGroup",
            Change::AddCard { .. } => "addCard",
            Change::AssignCard { .. } => "assignCard",
            Change::DeleteCard { .. } => "deleteCard",
            Change::AddRelation { .. } => "addRelation",
            Change::DeleteRelation { .. } => "deleteRelation",
            Change::AddVirtualTicket { .. } => "addVirtualTicket",
            Change::UpdateVirtualTicket { .. } => "updateVirtualTicket",
            Change::DeleteVirtualTicket { .. } => "deleteVirtualTicket",
        }
    }

    fn temp_id(&self) -> Option<(&str, Minted)> {
        match self {
            Change::AddGroup { temp_id, .. } => Some((temp_id.as_deref()?, Minted::Group)),
            Change::AddCard { temp_id, .. } => Some((temp_id.as_deref()?, Minted::Card)),
            Change::AddRelation { temp_id, .. } => Some((temp_id.as_deref()?, Minted::Relation)),
            Change::AddVirtualTicket { temp_id, .. } => {
                Some((temp_id.as_deref()?, Minted::Ticket))
            }
            _ => None,
        }
    }

    /// Application order: tickets, groups, cards, updates, relations,
    /// deletions.
    fn phase(&self) -> u8 {
        match self {
            Change::AddVirtualTicket { .. } => 0,
            Change::AddGroup { .. } => 1,
            Change::AddCard { .. } => 2,
            Change::UpdateGroup { .. }
            | Change::AssignCard { .. }
            | Change::UpdateVirtualTicket { .. } => 3,
            Change::AddRelation { .. } => 4,
            Change::DeleteRelation { .. }
            | Change::DeleteCard { .. }
            | Change::DeleteGroup { .. }
            | Change::DeleteVirtualTicket { .. } => 5,
        }
    }

    /// Checks serde cannot express.
    fn validate(&self) -> Result<(), String> {
        if let Change::AddCard {
            issue_key,
            ticket_id,
            ..
        } = self
            && issue_key.is_some() == ticket_id.is_some()
        {
            return Err("addCard needs exactly one of issueKey or ticketId".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedChange {
    /// Position of the entry in the submitted batch.
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub changes: Vec<(usize, Change)>,
    /// Entries dropped while parsing.
    pub malformed: Vec<SkippedChange>,
}

pub fn parse_change_set(text: &str) -> anyhow::Result<ChangeSet> {
    let value = json5::from_str::<serde_json::Value>(text).context("change set is not valid JSON5")?;
    let entries = match value {
        serde_json::Value::Array(entries) => entries,
        serde_json::Value::Object(mut map) => match map.remove("changes") {
            Some(serde_json::Value::Array(entries)) => entries,
            _ => bail!("change set object must have a `changes` array"),
        },
        _ => bail!("change set must be an array of changes"),
    };

    let mut set = ChangeSet::default();
    for (index, entry) in entries.into_iter().enumerate() {
        let action = entry
            .get("action")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        let parsed = serde_json::from_value::<Change>(entry)
            .map_err(|err| err.to_string())
            .and_then(|change| change.validate().map(|()| change));
        match parsed {
            Ok(change) => set.changes.push((index, change)),
            Err(reason) => {
                debug!(index, reason = %reason, "dropping malformed change");
                set.malformed.push(SkippedChange {
                    index,
                    action,
                    reason,
                });
            }
        }
    }
    Ok(set)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub applied: usize,
    pub skipped: Vec<SkippedChange>,
    /// Temp id to real id, for entries that were applied.
    pub id_map: BTreeMap<String, String>,
}

/// Apply a batch to one key result's canvas (tickets live on the document).
/// Entries that fail are skipped one by one; the rest still apply.
pub fn apply_change_set(
    document: &mut Document,
    key_result_id: &str,
    set: &ChangeSet,
    config: &CanvasConfig,
) -> MergeReport {
    let mut report = MergeReport {
        skipped: set.malformed.clone(),
        ..MergeReport::default()
    };

    let mut temp_ids: HashMap<String, String> = HashMap::new();
    let mut duplicates: HashSet<usize> = HashSet::new();
    for (index, change) in &set.changes {
        let Some((temp, kind)) = change.temp_id() else {
            continue;
        };
        if temp_ids.contains_key(temp) {
            duplicates.insert(*index);
            continue;
        }
        let real = match kind {
            Minted::Ticket => document.mint_ticket_id(),
            Minted::Group => document.canvas_mut(key_result_id).mint_id("group"),
            Minted::Card => document.canvas_mut(key_result_id).mint_id("card"),
            Minted::Relation => document.canvas_mut(key_result_id).mint_id("rel"),
        };
        temp_ids.insert(temp.to_string(), real);
    }

    let mut ordered: Vec<&(usize, Change)> = set
        .changes
        .iter()
        .filter(|(index, change)| {
            if duplicates.contains(index) {
                report.skipped.push(SkippedChange {
                    index: *index,
                    action: Some(change.action().to_string()),
                    reason: "duplicate tempId".to_string(),
                });
                false
            } else {
                true
            }
        })
        .collect();
    ordered.sort_by_key(|(index, change)| (change.phase(), *index));

    let mut merge = Merge {
        document,
        key_result_id,
        config,
        temp_ids: &temp_ids,
    };

    let mut pending_groups: Vec<&(usize, Change)> = Vec::new();
    for entry in ordered {
        let (index, change) = entry;
        if let Change::AddGroup { .. } = change {
            pending_groups.push(entry);
            continue;
        }
        // All group adds precede later phases.
        if !pending_groups.is_empty() {
            merge.apply_group_adds(std::mem::take(&mut pending_groups), &mut report);
        }
        merge.record(*index, change, &mut report);
    }
    if !pending_groups.is_empty() {
        merge.apply_group_adds(pending_groups, &mut report);
    }

    report.skipped.sort_by_key(|skipped| skipped.index);
    report
}

struct Merge<'a> {
    document: &'a mut Document,
    key_result_id: &'a str,
    config: &'a CanvasConfig,
    temp_ids: &'a HashMap<String, String>,
}

impl Merge<'_> {
    fn resolve(&self, id: &str) -> String {
        self.temp_ids
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// Real id for a new element: the pre-minted one for its temp id, or a
    /// fresh one.
    fn new_id(&mut self, temp_id: Option<&str>, prefix: &str) -> String {
        if let Some(real) = temp_id.and_then(|temp| self.temp_ids.get(temp)) {
            return real.clone();
        }
        if prefix == "vt" {
            self.document.mint_ticket_id()
        } else {
            self.document.canvas_mut(self.key_result_id).mint_id(prefix)
        }
    }

    fn record(&mut self, index: usize, change: &Change, report: &mut MergeReport) {
        match self.apply(change) {
            Ok(()) => {
                report.applied += 1;
                if let Some((temp, _)) = change.temp_id()
                    && let Some(real) = self.temp_ids.get(temp)
                {
                    report.id_map.insert(temp.to_string(), real.clone());
                }
            }
            Err(err) => {
                debug!(index, action = change.action(), reason = %err, "skipping change");
                report.skipped.push(SkippedChange {
                    index,
                    action: Some(change.action().to_string()),
                    reason: err.to_string(),
                });
            }
        }
    }

    /// Group adds whose parent is itself added later in the batch wait until
    /// that parent exists.
    fn apply_group_adds(&mut self, mut pending: Vec<&(usize, Change)>, report: &mut MergeReport) {
        loop {
            let before = pending.len();
            let mut waiting = Vec::new();
            for entry in pending {
                let (index, change) = entry;
                if let Change::AddGroup {
                    parent_id: Some(parent),
                    ..
                } = change
                {
                    let parent = self.resolve(parent);
                    let parent_known = self
                        .document
                        .canvas(self.key_result_id)
                        .is_some_and(|canvas| canvas.group(&parent).is_some());
                    let parent_queued = self.temp_ids.values().any(|real| real == &parent);
                    if !parent_known && parent_queued {
                        waiting.push(entry);
                        continue;
                    }
                }
                self.record(*index, change, report);
            }
            if waiting.is_empty() {
                return;
            }
            if waiting.len() == before {
                // Parents that never appear: report every remaining entry.
                for (index, change) in waiting {
                    self.record(*index, change, report);
                }
                return;
            }
            pending = waiting;
        }
    }

    fn apply(&mut self, change: &Change) -> Result<(), CanvasError> {
        let config = self.config;
        match change {
            Change::AddVirtualTicket {
                temp_id,
                summary,
                status,
            } => {
                let id = self.new_id(temp_id.as_deref(), "vt");
                self.document
                    .add_virtual_ticket_with_id(id, summary, status.unwrap_or_default());
                Ok(())
            }
            Change::UpdateVirtualTicket { id, summary, status } => {
                let id = self.resolve(id);
                self.document
                    .update_virtual_ticket(&id, summary.as_deref(), *status)
            }
            Change::DeleteVirtualTicket { id } => {
                let id = self.resolve(id);
                self.document.delete_virtual_ticket(&id).map(|_| ())
            }
            Change::AddGroup {
                temp_id,
                name,
                parent_id,
                x,
                y,
                width,
                height,
            } => {
                let parent = parent_id.as_deref().map(|parent| self.resolve(parent));
                let id = self.new_id(temp_id.as_deref(), "group");
                let canvas = self.document.canvas_mut(self.key_result_id);
                canvas.add_group_with_id(
                    id.clone(),
                    name,
                    parent.as_deref(),
                    x.zip(*y),
                    config,
                )?;
                if width.is_some() || height.is_some() {
                    canvas.resize_group(
                        &id,
                        width.unwrap_or(config.groups.default_width),
                        height.unwrap_or(config.groups.default_height),
                        &config.groups,
                    )?;
                }
                Ok(())
            }
            Change::UpdateGroup {
                id,
                name,
                x,
                y,
                width,
                height,
                parent_id,
            } => {
                let id = self.resolve(id);
                let parent = parent_id
                    .as_ref()
                    .map(|parent| parent.as_deref().map(|parent| self.resolve(parent)));
                let canvas = self.document.canvas_mut(self.key_result_id);
                let current = canvas
                    .group(&id)
                    .map(|group| (group.x, group.y, group.width, group.height))
                    .ok_or_else(|| CanvasError::UnknownGroup(id.clone()))?;
                if let Some(parent) = parent {
                    canvas.reparent_group(&id, parent.as_deref(), &config.groups)?;
                }
                if let Some(name) = name {
                    canvas.rename_group(&id, name)?;
                }
                if x.is_some() || y.is_some() {
                    canvas.move_group(&id, x.unwrap_or(current.0), y.unwrap_or(current.1))?;
                }
                if width.is_some() || height.is_some() {
                    canvas.resize_group(
                        &id,
                        width.unwrap_or(current.2),
                        height.unwrap_or(current.3),
                        &config.groups,
                    )?;
                }
                Ok(())
            }
            Change::DeleteGroup { id } => {
                let id = self.resolve(id);
                self.document
                    .canvas_mut(self.key_result_id)
                    .delete_group(&id, &config.groups)
                    .map(|_| ())
            }
            Change::AddCard {
                temp_id,
                issue_key,
                ticket_id,
                group_id,
                x,
                y,
            } => {
                let source = match issue_key {
                    Some(key) => CardSource::Issue { key: key.clone() },
                    None => {
                        let ticket = self.resolve(ticket_id.as_deref().unwrap_or_default());
                        if self.document.virtual_ticket(&ticket).is_none() {
                            return Err(CanvasError::UnknownVirtualTicket(ticket));
                        }
                        CardSource::Virtual { ticket_id: ticket }
                    }
                };
                let group = group_id.as_deref().map(|group| self.resolve(group));
                let id = self.new_id(temp_id.as_deref(), "card");
                self.document.canvas_mut(self.key_result_id).add_card_with_id(
                    id,
                    source,
                    group.as_deref(),
                    x.zip(*y),
                    config,
                )
            }
            Change::AssignCard {
                card_id,
                group_id,
                x,
                y,
            } => {
                let card_id = self.resolve(card_id);
                let group = group_id
                    .as_ref()
                    .map(|group| group.as_deref().map(|group| self.resolve(group)));
                let canvas = self.document.canvas_mut(self.key_result_id);
                let current = canvas
                    .card(&card_id)
                    .map(|card| (card.x, card.y))
                    .ok_or_else(|| CanvasError::UnknownCard(card_id.clone()))?;
                match group {
                    Some(group) => canvas.assign_card_to_group(
                        &card_id,
                        group.as_deref(),
                        x.zip(*y),
                        &config.groups,
                    ),
                    None if x.is_some() || y.is_some() => {
                        canvas.move_card(&card_id, x.unwrap_or(current.0), y.unwrap_or(current.1))
                    }
                    None => Ok(()),
                }
            }
            Change::DeleteCard { id } => {
                let id = self.resolve(id);
                self.document
                    .canvas_mut(self.key_result_id)
                    .delete_card(&id)
                    .map(|_| ())
            }
            Change::AddRelation { temp_id, from, to } => {
                let from_id = self.resolve(&from.id);
                let to_id = self.resolve(&to.id);
                let anchors = match (from.anchor, to.anchor) {
                    (Some(a), Some(b)) => (a, b),
                    (from_anchor, to_anchor) => {
                        let canvas = self.document.canvas_mut(self.key_result_id);
                        let index = SceneIndex::build(canvas, config);
                        let lookup = |kind: EndpointKind, id: &str| {
                            index
                                .rect(kind, id)
                                .ok_or_else(|| CanvasError::UnknownEndpoint {
                                    kind,
                                    id: id.to_string(),
                                })
                        };
                        let from_rect = lookup(from.kind, &from_id)?;
                        let to_rect = lookup(to.kind, &to_id)?;
                        let (a, b) = crate::geometry::suggest_anchor_pair(&from_rect, &to_rect);
                        (from_anchor.unwrap_or(a), to_anchor.unwrap_or(b))
                    }
                };
                let id = self.new_id(temp_id.as_deref(), "rel");
                self.document
                    .canvas_mut(self.key_result_id)
                    .add_relation_with_id(
                        id,
                        Endpoint::new(from.kind, from_id, anchors.0),
                        Endpoint::new(to.kind, to_id, anchors.1),
                    )
            }
            Change::DeleteRelation { id } => {
                let id = self.resolve(id);
                self.document
                    .canvas_mut(self.key_result_id)
                    .delete_relation(&id)
                    .map(|_| ())
            }
        }
    }
}
