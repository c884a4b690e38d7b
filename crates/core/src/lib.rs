#[cfg(feature = "blurhash")]
pub mod blurhash;
pub mod error;
pub mod loader;
pub mod processors;
pub mod record;
pub mod schema;
pub mod validate;
pub mod value;
pub mod webpage;

#[cfg(feature = "blurhash")]
pub use blurhash::{BLURHASH_KEY, BlurhashConfig, BlurhashPipeline, calculate_blurhash};
pub use error::{GleanerError, Result};
pub use loader::RecordLoader;
#[doc(hidden)]
pub use processors::{collapse_whitespace, normalize_url, parse_date, parse_int, parse_url};
pub use record::TypedRecord;
pub use schema::{Coerce, FieldSpec, Parser, Processor, Schema, SchemaBuilder, Serializer};
pub use validate::{missing_required, validate_required};
pub use value::{FieldType, Value};
pub use webpage::{article_schema, webpage_schema};
