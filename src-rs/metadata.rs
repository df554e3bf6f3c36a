//! Region and resize metadata documents.
//!
//! Both documents travel between stages as JSON strings. Fields the stages
//! do not read (`zoom`, UI state, ...) are kept verbatim so that a document
//! survives a round trip through any stage.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::geometry::Corners;

/// Empty-object sentinel the host sends when nothing was selected.
pub const EMPTY_DOCUMENT: &str = "{}";

/// Border thickness used when a document does not carry one.
pub const DEFAULT_BORDER_WIDTH: u32 = 3;

/// Upper bound on a document's border thickness.
pub const MAX_BORDER_WIDTH: u32 = 1024;

/// True for an empty (or whitespace-only) string and for the `{}` sentinel.
pub fn is_blank_document(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed == EMPTY_DOCUMENT
}

fn parse_object(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::InvalidParameter {
            name: "metadata".to_string(),
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn value_to_f64(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Which side of the rectangle edge an outline is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderPosition {
    #[default]
    Inside,
    Outside,
}

/// Region document produced by the selection UI.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegionMetadata {
    fields: Map<String, Value>,
}

impl RegionMetadata {
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(Self {
            fields: parse_object(raw)?,
        })
    }

    /// Zero rectangle with `selected: false`, the selector's initial state.
    pub fn unselected() -> Self {
        let value = json!({
            "x1": 0, "y1": 0, "x2": 0, "y2": 0,
            "zoom": 1, "borderWidth": 0,
            "borderPosition": "inside", "selected": false
        });
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }

    /// All four corners, or `None` if any of them is absent.
    pub fn corners(&self) -> Option<Corners> {
        Some(Corners {
            x1: self.coord("x1")?,
            y1: self.coord("y1")?,
            x2: self.coord("x2")?,
            y2: self.coord("y2")?,
        })
    }

    /// Corners with absent fields read as 0.
    pub fn corners_or_zero(&self) -> Corners {
        Corners {
            x1: self.coord("x1").unwrap_or(0.0),
            y1: self.coord("y1").unwrap_or(0.0),
            x2: self.coord("x2").unwrap_or(0.0),
            y2: self.coord("y2").unwrap_or(0.0),
        }
    }

    pub fn display_scale_factor(&self) -> Option<f64> {
        value_to_f64(self.fields.get("displayScaleFactor"))
    }

    pub fn border_width(&self) -> u32 {
        value_to_f64(self.fields.get("borderWidth"))
            .filter(|w| w.is_finite())
            .map(|w| w.round().clamp(0.0, f64::from(MAX_BORDER_WIDTH)) as u32)
            .unwrap_or(DEFAULT_BORDER_WIDTH)
    }

    pub fn border_position(&self) -> BorderPosition {
        self.fields
            .get("borderPosition")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    pub fn is_selected(&self) -> bool {
        self.fields
            .get("selected")
            .and_then(Value::as_bool)
            .unwrap_or_else(|| self.corners().is_some())
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn to_json_string(&self) -> String {
        Value::Object(self.fields.clone()).to_string()
    }

    fn coord(&self, key: &str) -> Option<f64> {
        value_to_f64(self.fields.get(key))
    }
}

/// Record of a resize applied to a cropped region before generation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResizeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResizeRecord {
    /// Parses a resize document.
    ///
    /// Blank input, `{}` and `null` mean no resize happened and yield
    /// `Ok(None)`. Any other valid JSON counts as a resize record; known
    /// fields with unexpected types are kept in `extra`.
    pub fn parse(raw: &str) -> Result<Option<Self>> {
        if is_blank_document(raw) {
            return Ok(None);
        }
        let value: Value = serde_json::from_str(raw)?;
        let record = match value {
            Value::Null => return Ok(None),
            Value::Object(fields) if fields.is_empty() => return Ok(None),
            Value::Object(fields) => serde_json::from_value(Value::Object(fields.clone()))
                .unwrap_or(Self {
                    extra: fields,
                    ..Self::default()
                }),
            other => {
                let mut extra = Map::new();
                extra.insert("value".to_string(), other);
                Self {
                    extra,
                    ..Self::default()
                }
            }
        };
        Ok(Some(record))
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_documents() {
        assert!(is_blank_document(""));
        assert!(is_blank_document("   \n"));
        assert!(is_blank_document("{}"));
        assert!(is_blank_document(" {} "));
        assert!(!is_blank_document("{\"x1\": 1}"));
    }

    #[test]
    fn region_reads_corners_and_scale() {
        let meta = RegionMetadata::parse(
            r#"{"x1": 100, "y1": 120.5, "x2": "300", "y2": 10, "displayScaleFactor": 0.5}"#,
        )
        .unwrap();
        assert_eq!(
            meta.corners(),
            Some(Corners {
                x1: 100.0,
                y1: 120.5,
                x2: 300.0,
                y2: 10.0
            })
        );
        assert_eq!(meta.display_scale_factor(), Some(0.5));
    }

    #[test]
    fn region_missing_corner_is_none() {
        let meta = RegionMetadata::parse(r#"{"x1": 1, "y1": 2, "x2": 3}"#).unwrap();
        assert_eq!(meta.corners(), None);
        assert_eq!(
            meta.corners_or_zero(),
            Corners {
                x1: 1.0,
                y1: 2.0,
                x2: 3.0,
                y2: 0.0
            }
        );
    }

    #[test]
    fn region_null_corner_counts_as_missing() {
        let meta = RegionMetadata::parse(r#"{"x1": null, "y1": 2, "x2": 3, "y2": 4}"#).unwrap();
        assert_eq!(meta.corners(), None);
    }

    #[test]
    fn region_rejects_non_objects() {
        assert!(RegionMetadata::parse("[1, 2]").is_err());
        assert!(RegionMetadata::parse("not json").is_err());
    }

    #[test]
    fn region_passes_ui_fields_through() {
        let raw = r#"{"x1":1,"y1":2,"x2":3,"y2":4,"zoom":1.5,"borderWidth":6,"borderPosition":"outside","custom":[1,2]}"#;
        let meta = RegionMetadata::parse(raw).unwrap();
        let reparsed: Value = serde_json::from_str(&meta.to_json_string()).unwrap();
        let original: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(reparsed, original);
        assert_eq!(meta.border_width(), 6);
        assert_eq!(meta.border_position(), BorderPosition::Outside);
    }

    #[test]
    fn border_width_is_bounded() {
        let width = |raw: &str| RegionMetadata::parse(raw).unwrap().border_width();
        assert_eq!(width(r#"{"borderWidth":1e30}"#), MAX_BORDER_WIDTH);
        assert_eq!(width(r#"{"borderWidth":-5}"#), 0);
        assert_eq!(width(r#"{"borderWidth":"4.4"}"#), 4);
        assert_eq!(width(r#"{"borderWidth":"inf"}"#), DEFAULT_BORDER_WIDTH);
        assert_eq!(width(r#"{"borderWidth":"NaN"}"#), DEFAULT_BORDER_WIDTH);
        assert_eq!(width("{}"), DEFAULT_BORDER_WIDTH);
    }

    #[test]
    fn unselected_document_shape() {
        let meta = RegionMetadata::unselected();
        for key in [
            "x1",
            "y1",
            "x2",
            "y2",
            "zoom",
            "borderWidth",
            "borderPosition",
            "selected",
        ] {
            assert!(meta.fields().contains_key(key), "missing {key}");
        }
        assert!(!meta.is_selected());
        assert_eq!(meta.border_position(), BorderPosition::Inside);
    }

    #[test]
    fn resize_absent_forms() {
        assert_eq!(ResizeRecord::parse("").unwrap(), None);
        assert_eq!(ResizeRecord::parse("{}").unwrap(), None);
        assert_eq!(ResizeRecord::parse("null").unwrap(), None);
        assert_eq!(ResizeRecord::parse("{ }").unwrap(), None);
    }

    #[test]
    fn resize_reads_scales() {
        let record = ResizeRecord::parse(r#"{"scale_x":0.64,"scale_y":0.64}"#)
            .unwrap()
            .unwrap();
        assert_eq!(record.scale_x, Some(0.64));
        assert_eq!(record.scale_y, Some(0.64));
    }

    #[test]
    fn resize_keeps_unknown_shapes() {
        let record = ResizeRecord::parse(r#"{"factor":"2x","scale_x":"big"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(record.scale_x, None);
        assert_eq!(record.extra.get("factor"), Some(&json!("2x")));
    }

    #[test]
    fn resize_rejects_malformed_json() {
        assert!(ResizeRecord::parse("{scale_x:").is_err());
    }
}
