//! Schemas for scraped webpage and article records.
//!
//! These are the concrete record types the crawler's pipelines operate
//! on: a webpage record carries the page's URLs, timestamps, and meta
//! information; an article record adds the extracted content and its
//! source. Field declarations follow the same conventions throughout:
//! URL fields validate down to absolute http(s) URLs, datetime fields
//! coerce from text and serialize as RFC 3339, and list/object fields
//! fall back to parsing JSON-encoded strings during bulk parse.

use crate::processors::{
    clear_list, coerce_date, coerce_geo, coerce_int, normalize_space, parse_json_list,
    parse_json_object, serialize_date, stringify, validate_http_url,
};
use crate::schema::{FieldSpec, Processor, Schema, SchemaBuilder};
use std::sync::Arc;

const TEXT_INPUT: &[Processor] = &[stringify, normalize_space];
const URL_INPUT: &[Processor] = &[stringify, normalize_space, validate_http_url];

fn url_field(name: &str) -> FieldSpec {
    FieldSpec::text(name).input(URL_INPUT)
}

fn url_list_field(name: &str) -> FieldSpec {
    FieldSpec::list(name).input(URL_INPUT).output(&[clear_list]).parser(parse_json_list)
}

fn datetime_field(name: &str) -> FieldSpec {
    FieldSpec::datetime(name)
        .required()
        .coerce(coerce_date)
        .input(TEXT_INPUT)
        .serializer(serialize_date)
}

fn text_field(name: &str) -> FieldSpec {
    FieldSpec::text(name).input(TEXT_INPUT)
}

fn json_list_field(name: &str) -> FieldSpec {
    FieldSpec::list(name).input(TEXT_INPUT).output(&[clear_list]).parser(parse_json_list)
}

fn json_object_field(name: &str) -> FieldSpec {
    FieldSpec::object(name).parser(parse_json_object)
}

fn webpage_fields(builder: SchemaBuilder) -> SchemaBuilder {
    builder
        .field(url_field("url_canonical").required())
        .field(url_field("url_mobile"))
        .field(url_field("url_amp"))
        .field(url_field("url_scraped").required())
        .field(url_list_field("url_alt"))
        .field(url_list_field("url_thumbnail"))
        .field(datetime_field("published_at"))
        .field(datetime_field("updated_at"))
        .field(datetime_field("scraped_at"))
        .field(text_field("title_full").required())
        .field(text_field("title_tag"))
        .field(text_field("title_short").required())
        .field(json_list_field("author"))
        .field(text_field("summary"))
        .field(json_list_field("category"))
        .field(json_list_field("keyword"))
        .field(json_list_field("section"))
        .field(json_list_field("country"))
        .field(json_list_field("language"))
        .field(FieldSpec::object("location").coerce(coerce_geo))
        .field(FieldSpec::text("full_html"))
        .field(json_object_field("meta_tags"))
        .field(json_object_field("parsely_info"))
}

/// Schema for records holding a scraped page's meta data.
pub fn webpage_schema() -> Arc<Schema> {
    webpage_fields(Schema::builder("webpage")).build()
}

/// Schema for records that also carry extracted main content.
pub fn article_schema() -> Arc<Schema> {
    webpage_fields(Schema::builder("article"))
        .field(FieldSpec::text("content"))
        .field(FieldSpec::text("content_html"))
        .field(json_object_field("article_info"))
        .field(text_field("source_name"))
        .field(json_list_field("source_category"))
        .field(url_field("source_url"))
        .field(FieldSpec::integer("source_ranking").coerce(coerce_int))
        .field(json_object_field("source_info"))
        .build()
}
