use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// A JSON:API document as returned by App Store Connect.
///
/// `data` is always present (null for empty bodies). Top-level members other
/// than the four modelled here are carried through untouched, as are modelled
/// members whose value does not have the JSON:API shape (e.g. `"included": null`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct ApiResponse {
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub included: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TryFrom<Value> for ApiResponse {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut extra) = value else {
            return Err("expected a JSON:API document object".to_string());
        };

        let data = extra.remove("data").unwrap_or(Value::Null);
        let included = take_member(&mut extra, "included", |value| match value {
            Value::Array(items) => Ok(items),
            other => Err(other),
        });
        let links = take_member(&mut extra, "links", |value| match value {
            Value::Object(links) => Ok(links),
            other => Err(other),
        });
        let meta = take_member(&mut extra, "meta", |value| match value {
            Value::Null => Err(Value::Null),
            other => Ok(other),
        });

        Ok(Self {
            data,
            included,
            links,
            meta,
            extra,
        })
    }
}

/// Removes `key` when `shape` accepts its value. A rejected value goes back
/// into `extra` unchanged.
fn take_member<T>(
    extra: &mut Map<String, Value>,
    key: &str,
    shape: impl FnOnce(Value) -> Result<T, Value>,
) -> Option<T> {
    let value = extra.remove(key)?;
    match shape(value) {
        Ok(member) => Some(member),
        Err(value) => {
            extra.insert(key.to_string(), value);
            None
        }
    }
}

impl ApiResponse {
    /// The response to a success with no body (e.g. 204 from a delete).
    pub fn empty() -> Self {
        Self::default()
    }

    /// `links.next`, when the page has a successor.
    pub fn next_link(&self) -> Option<&str> {
        self.links
            .as_ref()?
            .get("next")
            .and_then(Value::as_str)
            .filter(|link| !link.is_empty())
    }

    pub fn paging_total(&self) -> Option<u64> {
        self.meta.as_ref()?.pointer("/paging/total")?.as_u64()
    }

    /// Whether an aggregated result stopped at its page cap.
    pub fn is_truncated(&self) -> bool {
        self.meta
            .as_ref()
            .and_then(|meta| meta.pointer("/paging/truncated"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({ "data": Value::Null }))
    }
}
