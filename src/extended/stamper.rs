//! Date stamping on write and envelope construction on read.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::firestore::api::{DocumentReference, DocumentSnapshot};
use crate::firestore::model::Timestamp;
use crate::firestore::value::{DocumentData, FirestoreValue};

use super::item::{Item, Metadata};

pub const CREATED_DATE_FIELD: &str = "createdDate";
pub const MODIFIED_DATE_FIELD: &str = "modifiedDate";

/// Sets `createdDate` unless the fields already carry one.
pub fn stamp_created(fields: &mut DocumentData, at: DateTime<Utc>) {
    fields
        .entry(CREATED_DATE_FIELD.to_string())
        .or_insert_with(|| FirestoreValue::from_timestamp(Timestamp::from_datetime(at)));
}

pub fn stamp_modified(fields: &mut DocumentData, at: DateTime<Utc>) {
    fields.insert(
        MODIFIED_DATE_FIELD.to_string(),
        FirestoreValue::from_timestamp(Timestamp::from_datetime(at)),
    );
}

/// Stamps both dates with the same instant.
pub fn stamp_dates(fields: &mut DocumentData, at: DateTime<Utc>) {
    stamp_created(fields, at);
    stamp_modified(fields, at);
}

/// Wraps stored fields, lifting timestamp date fields into the envelope.
pub(crate) fn envelope(
    reference: DocumentReference,
    mut fields: DocumentData,
    exists: bool,
    snapshot: Option<&DocumentSnapshot>,
) -> Item {
    let created_date = take_date(&mut fields, CREATED_DATE_FIELD);
    let modified_date = take_date(&mut fields, MODIFIED_DATE_FIELD);
    Item {
        data: fields,
        metadata: Metadata::new(reference, exists, snapshot.map(|s| *s.metadata())),
        created_date,
        modified_date,
        children: BTreeMap::new(),
    }
}

/// Item for a snapshot. Missing documents get empty data and `exists == false`.
pub(crate) fn from_snapshot(snapshot: DocumentSnapshot) -> Item {
    let reference = snapshot.reference();
    let exists = snapshot.exists();
    let fields = snapshot.data().cloned().unwrap_or_default();
    envelope(reference, fields, exists, Some(&snapshot))
}

/// Writes the envelope dates back as stored fields.
pub(crate) fn restore_dates<T>(item: &Item<T>, fields: &mut DocumentData) {
    if let Some(created) = item.created_date {
        fields.insert(
            CREATED_DATE_FIELD.to_string(),
            FirestoreValue::from_timestamp(Timestamp::from_datetime(created)),
        );
    }
    if let Some(modified) = item.modified_date {
        fields.insert(
            MODIFIED_DATE_FIELD.to_string(),
            FirestoreValue::from_timestamp(Timestamp::from_datetime(modified)),
        );
    }
}

// Only timestamps move; a user field of another type under the same name stays in the data.
fn take_date(fields: &mut DocumentData, name: &str) -> Option<DateTime<Utc>> {
    let date = fields.get(name)?.as_timestamp()?.to_datetime()?;
    fields.remove(name);
    Some(date)
}
