use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys the analysis payload must carry before it is handed back to the caller.
pub const REQUIRED_ANALYSIS_KEYS: [&str; 6] = [
    "summary",
    "key_points",
    "sentiment",
    "topics",
    "writing_style",
    "target_audience",
];

#[derive(Debug, Deserialize)]
pub struct AnalyzeForm {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

/// Title and body text pulled out of a page. An empty body means extraction failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub title: String,
    pub body: String,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// The model's JSON object, passed through untouched once every required key
/// has been seen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AnalysisResult(Map<String, Value>);

impl AnalysisResult {
    /// Accepts the payload only if it is an object holding all of
    /// [`REQUIRED_ANALYSIS_KEYS`]; otherwise returns the keys that are absent.
    pub fn from_value(value: Value) -> Result<Self, Vec<&'static str>> {
        let Value::Object(map) = value else {
            return Err(REQUIRED_ANALYSIS_KEYS.to_vec());
        };
        let missing: Vec<&'static str> = REQUIRED_ANALYSIS_KEYS
            .iter()
            .copied()
            .filter(|key| !map.contains_key(*key))
            .collect();
        if missing.is_empty() {
            Ok(Self(map))
        } else {
            Err(missing)
        }
    }

    pub fn summary(&self) -> Option<&str> {
        self.0.get("summary").and_then(Value::as_str)
    }

    pub fn key_points(&self) -> Vec<&str> {
        self.string_list("key_points")
    }

    pub fn topics(&self) -> Vec<&str> {
        self.string_list("topics")
    }

    fn string_list(&self, key: &str) -> Vec<&str> {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisFailure {
    pub error: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Success(AnalysisResult),
    Failure(AnalysisFailure),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete_payload() -> Value {
        json!({
            "summary": "A short piece about rivers.",
            "key_points": ["Rivers flow", "Fish swim"],
            "sentiment": "neutral, descriptive tone",
            "topics": ["rivers", "ecology"],
            "writing_style": "plain",
            "target_audience": "general readers",
            "extra": 1
        })
    }

    #[test]
    fn accepts_payload_with_all_required_keys() {
        let result = AnalysisResult::from_value(complete_payload()).unwrap();
        assert_eq!(result.summary(), Some("A short piece about rivers."));
        assert_eq!(result.key_points(), vec!["Rivers flow", "Fish swim"]);
        assert_eq!(result.topics(), vec!["rivers", "ecology"]);
    }

    #[test]
    fn serializes_back_to_the_original_object() {
        let payload = complete_payload();
        let result = AnalysisResult::from_value(payload.clone()).unwrap();
        assert_eq!(serde_json::to_value(&result).unwrap(), payload);
    }

    #[test]
    fn reports_missing_keys() {
        let mut payload = complete_payload();
        payload.as_object_mut().unwrap().remove("topics");
        payload.as_object_mut().unwrap().remove("sentiment");
        let missing = AnalysisResult::from_value(payload).unwrap_err();
        assert_eq!(missing, vec!["sentiment", "topics"]);
    }

    #[test]
    fn rejects_non_object_payload() {
        let missing = AnalysisResult::from_value(json!(["summary"])).unwrap_err();
        assert_eq!(missing.len(), REQUIRED_ANALYSIS_KEYS.len());
    }

    #[test]
    fn empty_body_marks_failed_extraction() {
        let result = ExtractionResult {
            title: "Title".into(),
            body: String::new(),
        };
        assert!(result.is_empty());
    }
}
