use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A catalog product
///
/// Built once from a raw JSON record by [`Product::from_value`]; the rest of
/// the engine never sees the raw shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub category_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl Product {
    pub fn new(id: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            image: String::new(),
            image_url: String::new(),
            category_path: String::new(),
            brand: None,
            price: None,
        }
    }

    /// Normalize one raw catalog record.
    ///
    /// `position` is the record's position in its source and only feeds the
    /// synthetic `prod-<position>` id. Returns `None` for records without a
    /// title and without a description.
    pub fn from_value(position: usize, value: &Value) -> Option<Self> {
        let title = str_field(value, "title").map(decode_html_entities).unwrap_or_default();
        let description = str_field(value, "description")
            .map(decode_html_entities)
            .unwrap_or_default();
        if title.is_empty() && description.is_empty() {
            return None;
        }

        let id = id_field(value, "id").unwrap_or_else(|| format!("prod-{position}"));
        let image = str_field(value, "image").or_else(|| str_field(value, "image_url"));
        let image_url = str_field(value, "image_url").or_else(|| str_field(value, "image"));

        Some(Self {
            id,
            title,
            description,
            image: image.unwrap_or_default().to_string(),
            image_url: image_url.unwrap_or_default().to_string(),
            category_path: str_field(value, "category_path").unwrap_or_default().to_string(),
            brand: str_field(value, "brand").map(str::to_string),
            price: value.get("price").and_then(Value::as_f64),
        })
    }

    /// Text fed to the embedder
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Ids may arrive as strings or numbers.
pub(crate) fn id_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Decode the handful of HTML entities found in scraped product text.
///
/// `&amp;` goes first, so `&amp;lt;` decodes all the way to `<`.
pub fn decode_html_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}
