use crate::record::TypedRecord;
use crate::value::Value;
use crate::{GleanerError, Result};
use lru::LruCache;
use serde_json::Value as Json;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::encode::calculate_blurhash;

/// Key under which a descriptor's fingerprint is stored.
pub const BLURHASH_KEY: &str = "blurhash";

const CACHE_CAPACITY: usize = 1024;

/// Construction-time settings for [`BlurhashPipeline`].
#[derive(Debug, Clone)]
pub struct BlurhashConfig {
    /// Root directory the image downloader stores files under.
    pub images_store: PathBuf,
    /// Record field holding the downloaded image descriptors.
    pub source_field: String,
    /// Record field receiving the fingerprinted descriptors. May equal
    /// `source_field` to fingerprint in place.
    pub target_field: String,
    /// Horizontal fingerprint components.
    pub x_components: u32,
    /// Vertical fingerprint components.
    pub y_components: u32,
}

impl BlurhashConfig {
    /// Settings with the default 4×4 granularity.
    pub fn new(
        images_store: impl Into<PathBuf>,
        source_field: impl Into<String>,
        target_field: impl Into<String>,
    ) -> Self {
        Self {
            images_store: images_store.into(),
            source_field: source_field.into(),
            target_field: target_field.into(),
            x_components: 4,
            y_components: 4,
        }
    }

    /// Overrides the fingerprint granularity.
    pub fn components(mut self, x_components: u32, y_components: u32) -> Self {
        self.x_components = x_components;
        self.y_components = y_components;
        self
    }
}

/// Pipeline stage attaching BlurHash fingerprints to image descriptors.
///
/// For each descriptor in the source field, the stage resolves the
/// descriptor's store-relative `path`, computes the fingerprint, and
/// stores a copy of the descriptor with the hash under
/// [`BLURHASH_KEY`] in the target field. Results, including failed
/// computations, are memoized per `(path, x, y)` in a bounded LRU cache
/// owned by the instance; nothing persists across runs.
///
/// This stage never fails a record: unresolvable images pass through
/// untouched and computation failures attach an explicit null.
#[derive(Debug)]
pub struct BlurhashPipeline {
    images_store: PathBuf,
    source_field: String,
    target_field: String,
    x_components: u32,
    y_components: u32,
    cache: LruCache<(PathBuf, u32, u32), Option<String>>,
}

impl BlurhashPipeline {
    /// Validates the configuration and builds the stage.
    ///
    /// Fails with [`GleanerError::NotConfigured`] when the store root or
    /// a field name is empty, or a component count is zero. Construction
    /// errors disable the stage for the whole run, never per record.
    pub fn new(config: BlurhashConfig) -> Result<Self> {
        if config.images_store.as_os_str().is_empty() {
            return Err(GleanerError::NotConfigured("images_store is required".to_string()));
        }
        if config.source_field.is_empty() || config.target_field.is_empty() {
            return Err(GleanerError::NotConfigured(
                "source and target fields are required".to_string(),
            ));
        }
        if config.x_components == 0 || config.y_components == 0 {
            return Err(GleanerError::NotConfigured(
                "fingerprint components must be positive".to_string(),
            ));
        }

        let capacity = NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            images_store: config.images_store,
            source_field: config.source_field,
            target_field: config.target_field,
            x_components: config.x_components,
            y_components: config.y_components,
            cache: LruCache::new(capacity),
        })
    }

    /// Attaches fingerprints to every descriptor in the source field.
    ///
    /// Records whose schema does not declare the target field pass
    /// through untouched, as do records without downloaded images; a
    /// record with no images never gains the target field, so "no
    /// images" stays distinguishable from "none fingerprinted".
    pub fn process(&mut self, mut record: TypedRecord) -> TypedRecord {
        if !record.schema().has_field(&self.target_field) {
            debug!(
                "record type <{}> does not declare field <{}>, skipping",
                record.schema().name(),
                self.target_field
            );
            return record;
        }

        let descriptors: Vec<Value> = match record.get(&self.source_field) {
            Some(Value::List(items)) if !items.is_empty() => items.clone(),
            Some(single @ Value::Object(_)) => vec![single.clone()],
            _ => return record,
        };

        let processed: Vec<Value> =
            descriptors.iter().map(|descriptor| self.process_descriptor(descriptor)).collect();

        if let Err(err) = record.set(&self.target_field, Value::List(processed)) {
            warn!("unable to add field <{}> to the record: {err}", self.target_field);
        }

        record
    }

    /// Returns a copy of the descriptor with the fingerprint attached.
    ///
    /// The input descriptor is never mutated. Descriptors without a
    /// usable `path`, or whose file does not exist under the store, pass
    /// through unchanged.
    pub fn process_descriptor(&mut self, descriptor: &Value) -> Value {
        let Value::Object(fields) = descriptor else {
            return descriptor.clone();
        };

        let Some(relative) = fields.get("path").and_then(Json::as_str).filter(|p| !p.is_empty())
        else {
            return descriptor.clone();
        };

        let full_path = self.images_store.join(relative);
        if !full_path.is_file() {
            warn!("unable to locate image file <{}>", full_path.display());
            return descriptor.clone();
        }

        let blurhash = self.fingerprint(&full_path);

        let mut copy = fields.clone();
        let hash_json = match blurhash {
            Some(hash) => Json::String(hash),
            None => Json::Null,
        };
        copy.insert(BLURHASH_KEY.to_string(), hash_json);
        Value::Object(copy)
    }

    /// Cached fingerprint lookup keyed by full path and granularity.
    ///
    /// Failed computations are cached as `None` too, so a corrupt file
    /// is decoded at most once per run.
    fn fingerprint(&mut self, path: &Path) -> Option<String> {
        let key = (path.to_path_buf(), self.x_components, self.y_components);
        if let Some(cached) = self.cache.get(&key) {
            debug!("fingerprint cache hit for <{}>", path.display());
            return cached.clone();
        }

        let result = match calculate_blurhash(path, self.x_components, self.y_components) {
            Ok(hash) => {
                debug!("blurhash of <{}> is <{hash}>", path.display());
                Some(hash)
            }
            Err(err) => {
                warn!("unable to calculate blurhash for image <{}>: {err}", path.display());
                None
            }
        };

        self.cache.put(key, result.clone());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, Schema};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn page_schema() -> Arc<Schema> {
        Schema::builder("page")
            .field(FieldSpec::text("title"))
            .field(FieldSpec::list("images"))
            .field(FieldSpec::list("thumbnails"))
            .build()
    }

    fn bare_schema() -> Arc<Schema> {
        Schema::builder("bare").field(FieldSpec::text("title")).build()
    }

    fn write_image(dir: &TempDir, name: &str) {
        let mut img = image::RgbImage::new(48, 32);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = image::Rgb([(x * 5 % 256) as u8, (y * 7 % 256) as u8, 200]);
        }
        img.save(dir.path().join(name)).unwrap();
    }

    fn descriptor(path: &str) -> Value {
        Value::from_json(&serde_json::json!({"path": path, "checksum": "abc"}))
    }

    fn record_with_images(schema: Arc<Schema>, descriptors: Vec<Value>) -> TypedRecord {
        let mut record = TypedRecord::new(schema);
        record.set("images", Value::List(descriptors)).unwrap();
        record
    }

    fn pipeline(dir: &TempDir) -> BlurhashPipeline {
        BlurhashPipeline::new(BlurhashConfig::new(dir.path(), "images", "images")).unwrap()
    }

    #[test]
    fn test_rejects_empty_store() {
        let err = BlurhashPipeline::new(BlurhashConfig::new("", "images", "images")).unwrap_err();
        assert!(matches!(err, GleanerError::NotConfigured(_)));
    }

    #[test]
    fn test_rejects_empty_fields_and_zero_components() {
        let err =
            BlurhashPipeline::new(BlurhashConfig::new("/tmp/imgs", "", "images")).unwrap_err();
        assert!(matches!(err, GleanerError::NotConfigured(_)));

        let config = BlurhashConfig::new("/tmp/imgs", "images", "images").components(0, 4);
        assert!(matches!(
            BlurhashPipeline::new(config),
            Err(GleanerError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_attaches_fingerprint() {
        let dir = TempDir::new().unwrap();
        write_image(&dir, "a.png");

        let record = record_with_images(page_schema(), vec![descriptor("a.png")]);
        let record = pipeline(&dir).process(record);

        let images = record.get("images").and_then(Value::as_list).unwrap();
        let first = images[0].as_object().unwrap();
        assert!(first[BLURHASH_KEY].as_str().is_some_and(|hash| !hash.is_empty()));
        assert_eq!(first["path"], serde_json::json!("a.png"));
        assert_eq!(first["checksum"], serde_json::json!("abc"));
    }

    #[test]
    fn test_missing_file_passes_descriptor_through() {
        let dir = TempDir::new().unwrap();

        let input = descriptor("missing.jpg");
        let record = record_with_images(page_schema(), vec![input.clone()]);
        let record = pipeline(&dir).process(record);

        let images = record.get("images").and_then(Value::as_list).unwrap();
        assert_eq!(images[0], input);
        assert!(images[0].as_object().unwrap().get(BLURHASH_KEY).is_none());
    }

    #[test]
    fn test_descriptor_without_path_passes_through() {
        let dir = TempDir::new().unwrap();
        let input = Value::from_json(&serde_json::json!({"url": "https://example.com/a.jpg"}));

        let record = record_with_images(page_schema(), vec![input.clone()]);
        let record = pipeline(&dir).process(record);

        let images = record.get("images").and_then(Value::as_list).unwrap();
        assert_eq!(images[0], input);
    }

    #[test]
    fn test_source_descriptors_are_not_mutated() {
        let dir = TempDir::new().unwrap();
        write_image(&dir, "a.png");

        let input = descriptor("a.png");
        let mut record = TypedRecord::new(page_schema());
        record.set("images", Value::List(vec![input.clone()])).unwrap();

        let mut stage =
            BlurhashPipeline::new(BlurhashConfig::new(dir.path(), "images", "thumbnails"))
                .unwrap();
        let record = stage.process(record);

        // target got the augmented copies, source is untouched
        let sources = record.get("images").and_then(Value::as_list).unwrap();
        assert_eq!(sources[0], input);

        let thumbnails = record.get("thumbnails").and_then(Value::as_list).unwrap();
        assert!(thumbnails[0].as_object().unwrap().contains_key(BLURHASH_KEY));
    }

    #[test]
    fn test_undeclared_target_field_skips_record() {
        let dir = TempDir::new().unwrap();
        let record = TypedRecord::new(bare_schema());

        let mut stage =
            BlurhashPipeline::new(BlurhashConfig::new(dir.path(), "images", "images")).unwrap();
        let processed = stage.process(record);

        assert!(!processed.contains("title"));
        assert_eq!(processed.schema().name(), "bare");
    }

    #[test]
    fn test_record_without_images_gains_no_target() {
        let dir = TempDir::new().unwrap();
        let record = TypedRecord::new(page_schema());

        let processed = pipeline(&dir).process(record);
        assert!(!processed.contains("images"));
    }

    #[test]
    fn test_second_call_uses_cache_not_decode() {
        let dir = TempDir::new().unwrap();
        write_image(&dir, "a.png");

        let mut stage = pipeline(&dir);

        let record = record_with_images(page_schema(), vec![descriptor("a.png")]);
        let first = stage.process(record);
        let first_hash = first.get("images").and_then(Value::as_list).unwrap()[0]
            .as_object()
            .unwrap()[BLURHASH_KEY]
            .clone();

        // Overwrite with garbage: a recompute would now fail, so an
        // identical result proves the decode step did not run again.
        fs::write(dir.path().join("a.png"), b"garbage").unwrap();

        let record = record_with_images(page_schema(), vec![descriptor("a.png")]);
        let second = stage.process(record);
        let second_hash = second.get("images").and_then(Value::as_list).unwrap()[0]
            .as_object()
            .unwrap()[BLURHASH_KEY]
            .clone();

        assert!(first_hash.as_str().is_some());
        assert_eq!(first_hash, second_hash);
    }

    #[test]
    fn test_failed_computation_is_cached_as_null() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.png"), b"garbage").unwrap();

        let mut stage = pipeline(&dir);

        let record = record_with_images(page_schema(), vec![descriptor("broken.png")]);
        let first = stage.process(record);
        let images = first.get("images").and_then(Value::as_list).unwrap();
        assert!(images[0].as_object().unwrap()[BLURHASH_KEY].is_null());

        // Fix the file afterwards: the cached failure still wins this run.
        write_image(&dir, "broken.png");

        let record = record_with_images(page_schema(), vec![descriptor("broken.png")]);
        let second = stage.process(record);
        let images = second.get("images").and_then(Value::as_list).unwrap();
        assert!(images[0].as_object().unwrap()[BLURHASH_KEY].is_null());
    }

    #[test]
    fn test_cache_keyed_by_granularity() {
        let dir = TempDir::new().unwrap();
        write_image(&dir, "a.png");

        let mut coarse = BlurhashPipeline::new(
            BlurhashConfig::new(dir.path(), "images", "images").components(3, 3),
        )
        .unwrap();
        let mut fine = pipeline(&dir);

        let coarse_hash = coarse
            .process_descriptor(&descriptor("a.png"))
            .as_object()
            .unwrap()[BLURHASH_KEY]
            .clone();
        let fine_hash =
            fine.process_descriptor(&descriptor("a.png")).as_object().unwrap()[BLURHASH_KEY]
                .clone();

        assert_ne!(coarse_hash, fine_hash);
    }
}
