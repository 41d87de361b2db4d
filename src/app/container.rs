use std::sync::Arc;

use crate::adapters::{FfmpegThumbnailExtractor, FfprobeInspector, UserSetting};
use crate::app::batch_interactor::BatchInteractor;
use crate::ports::{BatchPresenter, MediaInspector, ThumbnailExtractor};
use crate::utils::path::CacheDirs;

pub trait AppContainer: Send + Sync {
    fn batch_interactor(&self) -> Arc<BatchInteractor>;
    fn media_inspector(&self) -> Arc<dyn MediaInspector>;
    fn thumbnail_extractor(&self) -> Arc<dyn ThumbnailExtractor>;
    fn cache_dirs(&self) -> &CacheDirs;
}

pub struct DefaultAppContainer {
    batch_interactor: Arc<BatchInteractor>,
    media_inspector: Arc<dyn MediaInspector>,
    thumbnail_extractor: Arc<dyn ThumbnailExtractor>,
    cache_dirs: CacheDirs,
}

impl DefaultAppContainer {
    /// Wire the external-tool adapters from `settings`
    pub fn new(settings: &UserSetting, presenter: Arc<dyn BatchPresenter>) -> Self {
        let cache_dirs = CacheDirs::new(&settings.cache_dir);
        let media_inspector: Arc<dyn MediaInspector> =
            Arc::new(FfprobeInspector::new(&settings.probe_path));
        let thumbnail_extractor: Arc<dyn ThumbnailExtractor> = Arc::new(
            FfmpegThumbnailExtractor::new(&settings.encoder_path, cache_dirs.clone()),
        );

        let batch_interactor = Arc::new(BatchInteractor::new(
            &settings.encoder_path,
            settings.max_parallel,
            cache_dirs.clone(),
            Arc::clone(&media_inspector),
            presenter,
        ));

        Self {
            batch_interactor,
            media_inspector,
            thumbnail_extractor,
            cache_dirs,
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn batch_interactor(&self) -> Arc<BatchInteractor> {
        Arc::clone(&self.batch_interactor)
    }

    fn media_inspector(&self) -> Arc<dyn MediaInspector> {
        Arc::clone(&self.media_inspector)
    }

    fn thumbnail_extractor(&self) -> Arc<dyn ThumbnailExtractor> {
        Arc::clone(&self.thumbnail_extractor)
    }

    fn cache_dirs(&self) -> &CacheDirs {
        &self.cache_dirs
    }
}
