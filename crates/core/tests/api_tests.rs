//! Library API integration tests
use gleaner_core::*;
use serde_json::{Map, Value as Json, json};

fn raw(json: Json) -> Map<String, Json> {
    json.as_object().cloned().expect("fixture must be a JSON object")
}

fn minimal_article() -> std::sync::Arc<Schema> {
    Schema::builder("minimal")
        .field(FieldSpec::text("title").required())
        .field(
            FieldSpec::datetime("published_at")
                .required()
                .coerce(processors::coerce_date)
                .serializer(processors::serialize_date),
        )
        .build()
}

#[test]
fn test_parse_and_validate_complete_record() {
    let record = TypedRecord::parse(
        minimal_article(),
        &raw(json!({"title": "Hello", "published_at": "2021-01-01"})),
    )
    .expect("should parse");

    assert_eq!(record.get("title").and_then(Value::as_text), Some("Hello"));

    let published = record.get("published_at").and_then(Value::as_datetime).expect("parsed date");
    assert_eq!(published.to_rfc3339(), "2021-01-01T00:00:00+00:00");

    assert!(validate_required(&record).is_ok());
}

#[test]
fn test_validation_rejects_incomplete_record() {
    let record =
        TypedRecord::parse(minimal_article(), &raw(json!({"published_at": "2021-01-01"})))
            .expect("should parse");

    let err = validate_required(&record).expect_err("title is missing");
    match err {
        GleanerError::MissingRequiredFields { missing, .. } => {
            assert_eq!(missing, vec!["title"]);
        }
        other => panic!("expected MissingRequiredFields, got {other:?}"),
    }
}

#[test]
fn test_webpage_record_full_cycle() {
    let schema = webpage_schema();
    let mut loader = RecordLoader::new(std::sync::Arc::clone(&schema))
        .with_base_url(url::Url::parse("https://example.com/news/story.html").unwrap());

    loader.add_url("url_canonical", "/news/story.html").unwrap();
    loader.add_url("url_scraped", "https://example.com/news/story.html?utm=z").unwrap();
    loader.add_text("title_full", "  A very   long title ").unwrap();
    loader.add_text("title_short", "Short title").unwrap();
    loader.add_text("published_at", "2021-03-14T15:09:00Z").unwrap();
    loader.add_text("updated_at", "2021-03-15T00:00:00Z").unwrap();
    loader.add_text("scraped_at", "2021-03-16T08:00:00Z").unwrap();
    loader.add_text("author", "Ada Lovelace").unwrap();
    loader.add_text("author", "Ada Lovelace").unwrap();

    let record = loader.load().expect("should load");
    assert!(validate_required(&record).is_ok());

    assert_eq!(
        record.get("url_canonical").and_then(Value::as_text),
        Some("https://example.com/news/story.html")
    );
    assert_eq!(
        record.get("title_full").and_then(Value::as_text),
        Some("A very long title")
    );

    let exported = record.to_json();
    assert_eq!(exported["published_at"], json!("2021-03-14T15:09:00+00:00"));
    // duplicate authors collapse on output
    assert_eq!(exported["author"], json!(["Ada Lovelace"]));
}

#[cfg(feature = "blurhash")]
mod fingerprinting {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn images_schema() -> Arc<Schema> {
        Schema::builder("page")
            .field(FieldSpec::text("title"))
            .field(FieldSpec::list("images"))
            .build()
    }

    fn write_image(dir: &TempDir, name: &str) {
        let mut img = image::RgbImage::new(40, 40);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = image::Rgb([(x * 6 % 256) as u8, 80, (y * 6 % 256) as u8]);
        }
        img.save(dir.path().join(name)).unwrap();
    }

    fn record_with_image(schema: Arc<Schema>, path: &str) -> TypedRecord {
        let mut record = TypedRecord::new(schema);
        record
            .set("images", Value::from_json(&json!([{"path": path}])))
            .unwrap();
        record
    }

    #[test]
    fn test_existing_image_gets_fingerprint() {
        let dir = TempDir::new().unwrap();
        write_image(&dir, "a.jpg");

        let mut stage =
            BlurhashPipeline::new(BlurhashConfig::new(dir.path(), "images", "images")).unwrap();

        let record = stage.process(record_with_image(images_schema(), "a.jpg"));
        let images = record.get("images").and_then(Value::as_list).unwrap();
        let first = images[0].as_object().unwrap();

        assert!(first[BLURHASH_KEY].as_str().is_some_and(|hash| !hash.is_empty()));
        assert_eq!(first["path"], json!("a.jpg"));
    }

    #[test]
    fn test_missing_image_yields_no_fingerprint() {
        let dir = TempDir::new().unwrap();

        let mut stage =
            BlurhashPipeline::new(BlurhashConfig::new(dir.path(), "images", "images")).unwrap();

        let record = stage.process(record_with_image(images_schema(), "missing.jpg"));
        let images = record.get("images").and_then(Value::as_list).unwrap();
        let first = images[0].as_object().unwrap();

        assert!(first.get(BLURHASH_KEY).map(Json::is_null).unwrap_or(true));
        assert_eq!(first["path"], json!("missing.jpg"));
    }

    #[test]
    fn test_validated_record_through_both_stages() {
        let dir = TempDir::new().unwrap();
        write_image(&dir, "thumb.png");

        let schema = Schema::builder("page")
            .field(FieldSpec::text("title").required())
            .field(FieldSpec::list("images"))
            .build();

        let record = TypedRecord::parse(
            Arc::clone(&schema),
            &raw(json!({"title": "Hello", "images": [{"path": "thumb.png"}]})),
        )
        .unwrap();
        validate_required(&record).unwrap();

        let mut stage =
            BlurhashPipeline::new(BlurhashConfig::new(dir.path(), "images", "images")).unwrap();
        let record = stage.process(record);

        let images = record.get("images").and_then(Value::as_list).unwrap();
        assert!(images[0].as_object().unwrap()[BLURHASH_KEY].is_string());
    }
}
