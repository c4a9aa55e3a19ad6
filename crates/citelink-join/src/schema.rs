//! Arrow schemas for the checkpoint tables written before the DuckDB stage

use std::sync::{Arc, LazyLock};

use arrow::datatypes::{DataType, Field, Schema};

/// `pair_facts.parquet` — one row per unique ordered (source, target) pair
pub fn pair_facts() -> &'static Arc<Schema> {
    static SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
        Arc::new(Schema::new(vec![
            Field::new("source", DataType::Utf8, false),
            Field::new("target", DataType::Utf8, false),
            Field::new("n_cites", DataType::UInt32, false),
            Field::new("n_references", DataType::UInt32, false),
            Field::new("n_is_supplemented_by", DataType::UInt32, false),
            Field::new("source_type", DataType::Utf8, true),
            Field::new("target_type", DataType::Utf8, true),
        ]))
    });
    &SCHEMA
}

/// `provenance.parquet` — one row per pair, first relation occurrence wins
pub fn provenance() -> &'static Arc<Schema> {
    static SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
        Arc::new(Schema::new(vec![
            Field::new("source", DataType::Utf8, false),
            Field::new("target", DataType::Utf8, false),
            Field::new("provenance", DataType::Utf8, true),
            Field::new("trust", DataType::Float64, true),
            Field::new("validated", DataType::Boolean, true),
        ]))
    });
    &SCHEMA
}
