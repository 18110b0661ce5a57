use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A paper as handed over by the crawler. Read-only to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    /// Extracted body text. Absent when the PDF could not be fetched or parsed.
    #[serde(default)]
    pub full_text: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub published: Option<NaiveDate>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
}

impl Paper {
    /// Text the keyword scorer searches: title and abstract.
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.abstract_text)
    }

    /// Title cut to `max` chars for log lines.
    pub fn short_title(&self, max: usize) -> String {
        let mut short: String = self.title.chars().take(max).collect();
        if self.title.chars().count() > max {
            short.push_str("...");
        }
        short
    }
}
