//! Datastore type table with spreadsheet number formats.

use crate::schema::SpecField;
use crate::spec::{RecombinantError, RecombinantResult, SpecFieldType};

/// Known datastore types.
pub const TUP_DATASTORE_TYPES: [SpecFieldType; 10] = [
    SpecFieldType {
        datastore_type: "year",
        xl_format: "0",
    },
    SpecFieldType {
        datastore_type: "month",
        xl_format: "00",
    },
    SpecFieldType {
        datastore_type: "date",
        xl_format: "yyyy-mm-dd",
    },
    SpecFieldType {
        datastore_type: "timestamp",
        xl_format: "yyyy-mm-dd hh:mm:ss",
    },
    SpecFieldType {
        datastore_type: "int",
        xl_format: "0",
    },
    SpecFieldType {
        datastore_type: "numeric",
        xl_format: "General",
    },
    SpecFieldType {
        datastore_type: "money",
        xl_format: "$#,##0.00",
    },
    SpecFieldType {
        datastore_type: "text",
        xl_format: "@",
    },
    SpecFieldType {
        datastore_type: "_text",
        xl_format: "@",
    },
    SpecFieldType {
        datastore_type: "boolean",
        xl_format: "General",
    },
];

/// Find the type entry for a type name.
pub fn find_field_type(datastore_type: &str) -> Option<SpecFieldType> {
    TUP_DATASTORE_TYPES
        .iter()
        .copied()
        .find(|field_type| field_type.datastore_type == datastore_type)
}

/// Resolve the type entry of `field`, failing on unknown types.
pub fn derive_field_type(field: &SpecField) -> RecombinantResult<SpecFieldType> {
    find_field_type(&field.datastore_type).ok_or_else(|| RecombinantError::UnknownDatastoreType {
        datastore_id: field.datastore_id.clone(),
        datastore_type: field.datastore_type.clone(),
    })
}
