use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{ChatMessage, Paper};

#[derive(Debug, Serialize)]
struct ExportedPaper<'a> {
    title: &'a str,
    authors: &'a [String],
    #[serde(rename = "abstract")]
    abstract_text: &'a str,
    published: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationExport<'a> {
    paper: ExportedPaper<'a>,
    conversation: &'a [ChatMessage],
    exported_at: DateTime<Utc>,
}

/// A downloadable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub contents: String,
}

pub fn filename(paper_id: &str, now: DateTime<Utc>) -> String {
    let safe_id: String = paper_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    format!("arxivchat_{}_{}.json", safe_id, now.format("%Y-%m-%d"))
}

pub fn conversation(
    paper: &Paper,
    messages: &[ChatMessage],
    now: DateTime<Utc>,
) -> Result<Artifact, serde_json::Error> {
    let export = ConversationExport {
        paper: ExportedPaper {
            title: &paper.title,
            authors: &paper.authors,
            abstract_text: &paper.abstract_text,
            published: paper.published,
        },
        conversation: messages,
        exported_at: now,
    };

    Ok(Artifact {
        filename: filename(&paper.id, now),
        contents: serde_json::to_string_pretty(&export)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::paper;
    use chrono::TimeZone;

    #[test]
    fn test_filename_uses_id_and_date() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(filename("2301.00001", now), "arxivchat_2301.00001_2024-03-09.json");
        assert_eq!(filename("hep-th/9901001", now), "arxivchat_hep-th_9901001_2024-03-09.json");
    }

    #[test]
    fn test_export_bundles_paper_messages_and_timestamp() {
        let now = Utc::now();
        let p = paper("2301.00001", "Deep Nets");
        let messages = vec![
            ChatMessage::user("What method did they use?", now),
            ChatMessage::assistant("They used **gradient descent**.", now),
        ];

        let artifact = conversation(&p, &messages, now).unwrap();
        let value: serde_json::Value = serde_json::from_str(&artifact.contents).unwrap();

        assert_eq!(value["paper"]["title"], "Deep Nets");
        assert_eq!(value["paper"]["abstract"], "We study things.");
        assert_eq!(value["conversation"].as_array().unwrap().len(), 2);
        assert_eq!(value["conversation"][0]["role"], "user");
        assert!(value["exportedAt"].is_string());
    }
}
