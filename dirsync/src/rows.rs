use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::error::SyncResult;

/// Reasons a raw directory record can fail flattening.
///
/// Failures are explicit values rather than caught exceptions so the pipeline
/// can count and report dropped records while continuing with the rest of the
/// batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    /// The record is not a JSON object.
    #[error("record is not a JSON object")]
    NotAnObject,
    /// The record has no usable `id`.
    ///
    /// `id` is the merge key; a row without one can never be upserted and is
    /// dropped instead of being loaded with a null key.
    #[error("record has no usable `id` field")]
    MissingId,
}

/// One flattened user row matching the destination table schema.
///
/// Every field except `id` and `active` is nullable. Serialization uses
/// camelCase so the encoded field names line up with the destination column
/// names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl UserRow {
    /// Flattens one raw SCIM resource into a [`UserRow`].
    ///
    /// The input is read defensively: records arrive from an external API and
    /// individual fields can be missing or have an unexpected shape without
    /// failing the whole batch. Only a record without a usable `id` is
    /// rejected.
    ///
    /// Field handling:
    /// - a missing or malformed `name` object leaves both name fields null;
    /// - only the first entry of `emails` is read; a missing, empty, or
    ///   non-array `emails` leaves the email null;
    /// - `active` defaults to `false` when absent, unlike the nullable fields;
    /// - timestamps are RFC 3339; unparsable values are treated as absent.
    pub fn from_resource(resource: &Value) -> Result<UserRow, RowError> {
        let record = resource.as_object().ok_or(RowError::NotAnObject)?;

        let id = record
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or(RowError::MissingId)?;

        let name = record.get("name");
        let email = record
            .get("emails")
            .and_then(Value::as_array)
            .and_then(|emails| emails.first())
            .and_then(|email| email.get("value"))
            .and_then(Value::as_str);
        let meta = record.get("meta");

        Ok(UserRow {
            id: id.to_string(),
            user_name: string_field(record.get("userName")),
            given_name: string_field(name.and_then(|name| name.get("givenName"))),
            family_name: string_field(name.and_then(|name| name.get("familyName"))),
            email: email.map(str::to_string),
            active: record
                .get("active")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            created: timestamp_field(meta.and_then(|meta| meta.get("created"))),
            last_modified: timestamp_field(meta.and_then(|meta| meta.get("lastModified"))),
        })
    }
}

fn string_field(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn timestamp_field(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// Encodes rows as newline-delimited JSON, one record per line.
///
/// Each row is serialized independently, matching the one-record-per-line
/// contract of the bulk load submission.
pub fn rows_to_ndjson(rows: &[UserRow]) -> SyncResult<String> {
    let mut lines = Vec::with_capacity(rows.len());
    for row in rows {
        lines.push(serde_json::to_string(row)?);
    }

    Ok(lines.join("\n"))
}
