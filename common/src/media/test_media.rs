use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;

use super::{MediaKind, MediaStore, StoredAsset, UploadedFile};

/// Records every call instead of talking to a media host.
#[derive(Default)]
pub struct TestMediaStore {
    counter: AtomicUsize,
    fail_uploads: AtomicBool,
    failing_destroys: Mutex<HashSet<String>>,
    pub uploads: Mutex<Vec<StoredAsset>>,
    pub destroyed: Mutex<Vec<String>>,
}

impl TestMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_destroy(&self, public_id: &str) {
        self.failing_destroys
            .lock()
            .unwrap()
            .insert(public_id.to_string());
    }

    pub fn uploaded_urls(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|x| x.url.clone())
            .collect()
    }

    pub fn destroyed_ids(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStore for TestMediaStore {
    async fn upload(&self, file: &UploadedFile, kind: MediaKind) -> anyhow::Result<StoredAsset> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            anyhow::bail!("Upload of {} refused", file.file_name);
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let extension = file
            .file_name
            .rsplit_once('.')
            .map(|(_, extension)| extension)
            .unwrap_or("bin");
        let public_id = format!("showroom/test-{}", n);
        let asset = StoredAsset {
            url: format!(
                "https://res.cloudinary.com/test/{}/upload/v1/{}.{}",
                kind, public_id, extension
            ),
            public_id,
        };
        self.uploads.lock().unwrap().push(asset.clone());
        Ok(asset)
    }

    async fn destroy(&self, public_id: &str, _kind: MediaKind) -> anyhow::Result<bool> {
        self.destroyed.lock().unwrap().push(public_id.to_string());
        if self.failing_destroys.lock().unwrap().contains(public_id) {
            anyhow::bail!("Destroy of {} refused", public_id);
        }
        Ok(true)
    }
}
