use serde::{Deserialize, Serialize};

use crate::issues::StatusCategory;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub line_color: String,
    pub card_fill: String,
    pub card_border: String,
    pub card_text: String,
    pub group_fill: String,
    pub group_border: String,
    pub group_header: String,
    pub todo_color: String,
    pub in_progress_color: String,
    pub done_color: String,
    pub unknown_color: String,
    pub background: String,
}

impl Theme {
    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            line_color: "#7A8AA6".to_string(),
            card_fill: "#FFFFFF".to_string(),
            card_border: "#C7D2E5".to_string(),
            card_text: "#1C2430".to_string(),
            group_fill: "#F7FAFF".to_string(),
            group_border: "#D7E0F0".to_string(),
            group_header: "#EEF2F8".to_string(),
            todo_color: "#8993A4".to_string(),
            in_progress_color: "#0C66E4".to_string(),
            done_color: "#22A06B".to_string(),
            unknown_color: "#C1C7D0".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    /// Jira's stock palette.
    pub fn classic() -> Self {
        Self {
            font_family: "-apple-system, BlinkMacSystemFont, \"Segoe UI\", Roboto, sans-serif"
                .to_string(),
            font_size: 14.0,
            line_color: "#42526E".to_string(),
            card_fill: "#FFFFFF".to_string(),
            card_border: "#DFE1E6".to_string(),
            card_text: "#172B4D".to_string(),
            group_fill: "#F4F5F7".to_string(),
            group_border: "#C1C7D0".to_string(),
            group_header: "#EBECF0".to_string(),
            todo_color: "#42526E".to_string(),
            in_progress_color: "#0052CC".to_string(),
            done_color: "#00875A".to_string(),
            unknown_color: "#97A0AF".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn status_color(&self, status: StatusCategory) -> &str {
        match status {
            StatusCategory::ToDo => &self.todo_color,
            StatusCategory::InProgress => &self.in_progress_color,
            StatusCategory::Done => &self.done_color,
            StatusCategory::Unknown => &self.unknown_color,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::modern()
    }
}
