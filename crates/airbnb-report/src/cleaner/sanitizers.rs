//! Categorical standardization.

use crate::error::{ReportError, Result};
use crate::types::RoomType;
use crate::utils::collapse_whitespace;
use std::collections::HashMap;

/// Map a raw room type onto the fixed set, ignoring case and extra spaces.
pub(crate) fn normalize_room_type(value: &str) -> Result<RoomType> {
    let collapsed = collapse_whitespace(value);
    RoomType::from_label(&collapsed).ok_or_else(|| {
        ReportError::validation("room_type", value, "not a known room type")
    })
}

/// First spelling seen for each place name, keyed case-insensitively.
///
/// "harlem" after "Harlem" becomes "Harlem"; mixed-case names such as
/// "SoHo" or "DUMBO" keep the form they first appeared in.
#[derive(Debug, Default)]
pub(crate) struct LabelBook {
    spellings: HashMap<String, String>,
}

impl LabelBook {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn canonical(&mut self, label: &str) -> String {
        self.spellings
            .entry(label.to_lowercase())
            .or_insert_with(|| label.to_string())
            .clone()
    }
}

/// Lowercased comparison key for a free-form categorical value.
pub(crate) fn comparison_key(value: &str) -> Option<String> {
    let collapsed = collapse_whitespace(value);
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.to_lowercase())
    }
}

/// Trimmed free text with internal whitespace collapsed.
pub(crate) fn clean_text(value: &str) -> Option<String> {
    let collapsed = collapse_whitespace(value);
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}
