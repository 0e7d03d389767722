use std::collections::HashMap;

use futures::future::join_all;
use mongodb::bson::{Bson, Document};
use serde_json::{Map, Value};

use crate::{
    error::{self, AddCode},
    form::FormPayload,
};

use super::{MediaKind, MediaSlot, MediaStore, StoredAsset, UploadedFile};

#[derive(Debug, PartialEq)]
pub enum SlotChange<'a> {
    Replace(&'a [UploadedFile]),
    Clear,
    Keep,
}

/// Decides what happens to one slot. New files win over an explicit empty value,
/// anything else leaves the stored value alone.
pub fn plan_slot<'a>(
    slot: &MediaSlot,
    files: &'a HashMap<String, Vec<UploadedFile>>,
    fields: &Map<String, Value>,
) -> SlotChange<'a> {
    if let Some(files) = files.get(slot.form_field).filter(|files| !files.is_empty()) {
        return SlotChange::Replace(files);
    }

    let cleared = [slot.field, slot.form_field]
        .iter()
        .filter_map(|name| fields.get(*name))
        .any(is_clear_signal);

    if cleared {
        SlotChange::Clear
    } else {
        SlotChange::Keep
    }
}

fn is_clear_signal(value: &Value) -> bool {
    match value {
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.iter().all(is_clear_signal),
        _ => false,
    }
}

/// URLs currently held by the given slots of a stored document.
pub fn stored_media(slots: &[MediaSlot], document: &Document) -> Vec<(String, MediaKind)> {
    slots
        .iter()
        .flat_map(|slot| {
            let urls: Vec<String> = match document.get(slot.field) {
                Some(Bson::String(url)) => vec![url.clone()],
                Some(Bson::Array(urls)) => urls
                    .iter()
                    .filter_map(|url| url.as_str().map(str::to_string))
                    .collect(),
                _ => vec![],
            };
            urls.into_iter()
                .filter(|url| !url.trim().is_empty())
                .map(move |url| (url, slot.kind))
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct MediaPlan {
    /// Slot values to merge into the stored document.
    pub changes: Document,
    pub uploaded: Vec<(StoredAsset, MediaKind)>,
    /// Previously stored URLs that are no longer referenced once `changes` is applied.
    pub obsolete: Vec<(String, MediaKind)>,
}

pub struct Reconciler<'a> {
    media: &'a dyn MediaStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(media: &'a dyn MediaStore) -> Self {
        Self { media }
    }

    pub fn has_changes(slots: &[MediaSlot], form: &FormPayload) -> bool {
        slots
            .iter()
            .any(|slot| plan_slot(slot, &form.files, &form.fields) != SlotChange::Keep)
    }

    /// Performs the uploads for every slot with new files. Nothing is deleted here,
    /// the caller purges `obsolete` once the new values are persisted.
    pub async fn reconcile(
        &self,
        slots: &[MediaSlot],
        existing: Option<&Document>,
        form: &FormPayload,
    ) -> error::Result<MediaPlan> {
        let mut plan = MediaPlan::default();

        for slot in slots {
            let value = match plan_slot(slot, &form.files, &form.fields) {
                SlotChange::Keep => continue,
                SlotChange::Clear => {
                    if slot.list {
                        Bson::Array(vec![])
                    } else {
                        Bson::String(String::new())
                    }
                }
                SlotChange::Replace(files) => {
                    let mut urls = Vec::with_capacity(files.len());
                    for file in files {
                        match self.media.upload(file, slot.kind).await {
                            Ok(asset) => {
                                urls.push(Bson::String(asset.url.clone()));
                                plan.uploaded.push((asset, slot.kind));
                            }
                            Err(err) => {
                                log::error!("Upload of {} failed: {:#}", slot.form_field, err);
                                self.discard(plan.uploaded).await;
                                return Err(anyhow::anyhow!(
                                    "Failed to upload {}: {}",
                                    slot.form_field,
                                    err
                                )
                                .code(500));
                            }
                        }
                    }
                    if slot.list {
                        Bson::Array(urls)
                    } else {
                        urls.into_iter()
                            .next()
                            .unwrap_or_else(|| Bson::String(String::new()))
                    }
                }
            };

            if let Some(existing) = existing {
                plan.obsolete
                    .extend(stored_media(std::slice::from_ref(slot), existing));
            }
            plan.changes.insert(slot.field, value);
        }

        Ok(plan)
    }

    /// Removes assets uploaded by a request that did not complete.
    pub async fn discard(&self, uploaded: Vec<(StoredAsset, MediaKind)>) {
        let targets = uploaded
            .into_iter()
            .map(|(asset, kind)| (asset.public_id, kind))
            .collect();
        self.settle(targets).await;
    }

    /// Deletes the assets behind the given URLs. Failures are logged and ignored.
    pub async fn purge(&self, urls: Vec<(String, MediaKind)>) {
        let targets = urls
            .into_iter()
            .filter_map(|(url, kind)| self.media.public_id(&url).map(|id| (id, kind)))
            .collect();
        self.settle(targets).await;
    }

    async fn settle(&self, targets: Vec<(String, MediaKind)>) {
        let results = join_all(targets.iter().map(|(public_id, kind)| async move {
            (public_id, self.media.destroy(public_id, *kind).await)
        }))
        .await;

        for (public_id, result) in results {
            match result {
                Ok(true) => log::info!("Deleted media asset {}", public_id),
                Ok(false) => log::warn!("Media host did not delete {}", public_id),
                Err(err) => log::warn!("Failed to delete media asset {}: {:#}", public_id, err),
            }
        }
    }
}
