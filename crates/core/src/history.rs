use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    Query,
    Insert,
    Update,
    Delete,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "Query",
            Self::Insert => "Insert",
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "Query" => Ok(Self::Query),
            "Insert" => Ok(Self::Insert),
            "Update" => Ok(Self::Update),
            "Delete" => Ok(Self::Delete),
            _ => Err(CoreError::InvalidData(format!("unknown action type: {s}"))),
        }
    }
}

/// Outcome of a single data-access attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionResult {
    Ok,
    /// Attempted, but the store reported zero affected rows.
    Failed,
    MissingId,
    UnknownId,
    /// Well-formed id with no matching row.
    ItemMissing,
    UnknownUri,
    UnknownType,
    MissingContent,
    ParseFailed,
}

impl ActionResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Failed => "Failed",
            Self::MissingId => "Missing_ID",
            Self::UnknownId => "Unknown_ID",
            Self::ItemMissing => "Item_Missing",
            Self::UnknownUri => "Unknown_URI",
            Self::UnknownType => "Unknown_Type",
            Self::MissingContent => "Missing_Content",
            Self::ParseFailed => "Parse_Failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "OK" => Ok(Self::Ok),
            "Failed" => Ok(Self::Failed),
            "Missing_ID" => Ok(Self::MissingId),
            "Unknown_ID" => Ok(Self::UnknownId),
            "Item_Missing" => Ok(Self::ItemMissing),
            "Unknown_URI" => Ok(Self::UnknownUri),
            "Unknown_Type" => Ok(Self::UnknownType),
            "Missing_Content" => Ok(Self::MissingContent),
            "Parse_Failed" => Ok(Self::ParseFailed),
            _ => Err(CoreError::InvalidData(format!("unknown action result: {s}"))),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the append-only audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStamp {
    /// Milliseconds since the Unix epoch; unique per row.
    pub timestamp: i64,
    pub action_type: ActionType,
    pub action_result: ActionResult,
    pub item_id: Option<String>,
    pub comments: Option<String>,
}

impl HistoryStamp {
    /// UTC rendering of the timestamp, `YYYY-MM-DD @ HH:mm:ss.SSS`.
    pub fn time(&self) -> String {
        match DateTime::<Utc>::from_timestamp_millis(self.timestamp) {
            Some(dt) => dt.format("%Y-%m-%d @ %H:%M:%S%.3f").to_string(),
            None => self.timestamp.to_string(),
        }
    }
}

impl fmt::Display for HistoryStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Action: {} @{{ {} }}, Result: {}",
            self.action_type.as_str(),
            self.time(),
            self.action_result
        )?;
        if let Some(id) = self.item_id.as_deref().filter(|s| !s.is_empty()) {
            write!(f, ", ID: {id}")?;
        }
        if let Some(comments) = self.comments.as_deref().filter(|s| !s.is_empty()) {
            write!(f, ", Comments: {comments}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_RESULTS: [ActionResult; 9] = [
        ActionResult::Ok,
        ActionResult::Failed,
        ActionResult::MissingId,
        ActionResult::UnknownId,
        ActionResult::ItemMissing,
        ActionResult::UnknownUri,
        ActionResult::UnknownType,
        ActionResult::MissingContent,
        ActionResult::ParseFailed,
    ];

    #[test]
    fn result_names_are_stable() {
        for result in ALL_RESULTS {
            assert_eq!(ActionResult::parse(result.as_str()).unwrap(), result);
        }
        assert_eq!(ActionResult::MissingId.as_str(), "Missing_ID");
        assert!(ActionResult::parse("Missing_Id").is_err());
    }

    #[test]
    fn display_formats_like_a_log_line() {
        let stamp = HistoryStamp {
            timestamp: 1_700_000_000_123,
            action_type: ActionType::Delete,
            action_result: ActionResult::ItemMissing,
            item_id: Some("a-b-c-d-e".into()),
            comments: None,
        };
        assert_eq!(
            stamp.to_string(),
            "Action: Delete @{ 2023-11-14 @ 22:13:20.123 }, Result: Item_Missing, ID: a-b-c-d-e"
        );
    }

    #[test]
    fn display_omits_empty_parts() {
        let stamp = HistoryStamp {
            timestamp: 0,
            action_type: ActionType::Query,
            action_result: ActionResult::Ok,
            item_id: Some(String::new()),
            comments: Some("AllAlbums".into()),
        };
        assert_eq!(
            stamp.to_string(),
            "Action: Query @{ 1970-01-01 @ 00:00:00.000 }, Result: OK, Comments: AllAlbums"
        );
    }
}
