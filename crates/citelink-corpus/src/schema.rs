//! Arrow schema for the converted corpus table

use std::sync::{Arc, LazyLock};

use arrow::datatypes::{DataType, Field, Schema, TimeUnit};

/// `corpus.parquet` — one row per corpus citation record
pub fn corpus() -> &'static Arc<Schema> {
    static SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("publisher", DataType::Utf8, true),
            Field::new("journal", DataType::Utf8, true),
            Field::new("repository", DataType::Utf8, true),
            Field::new("publication", DataType::Utf8, false),
            Field::new("dataset", DataType::Utf8, false),
            Field::new("publication_is_doi", DataType::Boolean, false),
            Field::new("dataset_is_doi", DataType::Boolean, false),
            Field::new(
                "published_date",
                DataType::Timestamp(TimeUnit::Millisecond, None),
                true,
            ),
            Field::new("source", DataType::Utf8, false),
        ]))
    });
    &SCHEMA
}
