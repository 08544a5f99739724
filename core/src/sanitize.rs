use crate::error::InputError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

pub const MAX_FIELD_CHARS: usize = 5000;
pub const MAX_SCORE: u8 = 10;

lazy_static! {
    static ref SCRIPT_RE: Regex = Regex::new(r"(?is)<\s*script[^>]*>.*?<\s*/\s*script>").expect("valid regex");
    static ref TAG_RE: Regex = Regex::new(r"<[^>]+>").expect("valid regex");
}

/// Drops script blocks and remaining HTML tags, trims, and caps the length.
pub fn sanitize_text(text: &str) -> String {
    let text = SCRIPT_RE.replace_all(text, "");
    let text = TAG_RE.replace_all(&text, "");
    text.trim().chars().take(MAX_FIELD_CHARS).collect()
}

/// Non-string JSON values sanitize to the empty string.
pub fn sanitize_value(value: &Value) -> String {
    match value {
        Value::String(s) => sanitize_text(s),
        _ => String::new(),
    }
}

pub fn clamp_score(score: i64) -> u8 {
    score.clamp(0, MAX_SCORE as i64) as u8
}

/// Integers, truncated floats, booleans and integer strings are accepted; anything else scores 0.
pub fn parse_score(value: &Value) -> u8 {
    let raw = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        Value::Bool(b) => *b as i64,
        _ => 0,
    };
    clamp_score(raw)
}

/// Raw review submission as posted by clients.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewSubmission {
    #[serde(default)]
    pub author: Value,
    #[serde(default)]
    pub title: Value,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub score: Value,
    /// Optional `data:image/...;base64,` URI.
    #[serde(default)]
    pub image: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmission {
    pub author: String,
    pub title: String,
    pub content: String,
    pub score: u8,
    pub image: Option<String>,
}

impl ReviewSubmission {
    pub fn validate(&self) -> Result<ValidSubmission, InputError> {
        let author = sanitize_value(&self.author);
        let title = sanitize_value(&self.title);
        let content = sanitize_value(&self.content);

        let missing: Vec<&'static str> = [("author", &author), ("title", &title), ("content", &content)]
            .into_iter()
            .filter(|(_, v)| v.is_empty())
            .map(|(name, _)| name)
            .collect();
        if !missing.is_empty() {
            return Err(InputError::MissingFields(missing));
        }

        let image = match &self.image {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        };
        Ok(ValidSubmission { author, title, content, score: parse_score(&self.score), image })
    }
}
