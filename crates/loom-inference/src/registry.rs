use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::info;

use crate::backend::{AudioModelHandle, ImageModelHandle, ModelLoader, TextModelHandle, VideoModelHandle};
use crate::catalog::{ImageModel, TextModel};
use crate::error::Result;

/// Per-key lazily initialised values. The first caller for a key runs the
/// loader while concurrent callers for the same key wait on it; other keys
/// are not blocked. A failed load leaves the slot empty.
pub struct ModelCache<K, V> {
    cells: DashMap<K, Arc<OnceCell<V>>>,
}

impl<K, V> ModelCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self { cells: DashMap::new() }
    }

    pub async fn get_or_load<F, Fut>(&self, key: K, load: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        // Clone the cell out so no map shard lock is held across the await.
        let cell = self.cells.entry(key).or_default().clone();
        let value = cell.get_or_try_init(load).await?;
        Ok(value.clone())
    }

    pub fn is_loaded(&self, key: &K) -> bool {
        self.cells.get(key).is_some_and(|cell| cell.initialized())
    }

    pub fn loaded_count(&self) -> usize {
        self.cells.iter().filter(|entry| entry.value().initialized()).count()
    }
}

impl<K, V> Default for ModelCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide cache of loaded model handles.
pub struct ModelRegistry {
    loader: Arc<dyn ModelLoader>,
    text: ModelCache<TextModel, Arc<dyn TextModelHandle>>,
    audio: ModelCache<(), Arc<dyn AudioModelHandle>>,
    image: ModelCache<ImageModel, Arc<dyn ImageModelHandle>>,
    video: ModelCache<(), Arc<dyn VideoModelHandle>>,
}

impl ModelRegistry {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            text: ModelCache::new(),
            audio: ModelCache::new(),
            image: ModelCache::new(),
            video: ModelCache::new(),
        }
    }

    pub async fn text(&self, model: TextModel) -> Result<Arc<dyn TextModelHandle>> {
        self.text
            .get_or_load(model, || async {
                info!("Loading text model {}", model);
                self.loader.load_text(model).await
            })
            .await
    }

    pub async fn audio(&self) -> Result<Arc<dyn AudioModelHandle>> {
        self.audio
            .get_or_load((), || async {
                info!("Loading audio model");
                self.loader.load_audio().await
            })
            .await
    }

    pub async fn image(&self, model: ImageModel) -> Result<Arc<dyn ImageModelHandle>> {
        self.image
            .get_or_load(model, || async {
                info!("Loading image model {}", model);
                self.loader.load_image(model).await
            })
            .await
    }

    pub async fn video(&self) -> Result<Arc<dyn VideoModelHandle>> {
        self.video
            .get_or_load((), || async {
                info!("Loading video model");
                self.loader.load_video().await
            })
            .await
    }

    /// Number of model handles currently resident.
    pub fn loaded_count(&self) -> usize {
        self.text.loaded_count()
            + self.audio.loaded_count()
            + self.image.loaded_count()
            + self.video.loaded_count()
    }
}
