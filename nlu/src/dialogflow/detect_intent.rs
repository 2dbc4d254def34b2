use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::payload;

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DetectIntentRequest<'a> {
    query_input: QueryInput<'a>,
}

#[derive(Serialize, Debug, Clone)]
struct QueryInput<'a> {
    text: TextInput<'a>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct TextInput<'a> {
    text: &'a str,
    language_code: &'a str,
}

impl<'a> DetectIntentRequest<'a> {
    pub(crate) fn new(text: &'a str, language_code: &'a str) -> Self {
        Self {
            query_input: QueryInput {
                text: TextInput {
                    text,
                    language_code,
                },
            },
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct DetectIntentResponse {
    #[serde(default)]
    pub response_id: Option<String>,
    #[serde(default)]
    pub query_result: Option<QueryResult>,
}

/// The `queryResult` object, shared by `detectIntent` responses and webhook
/// requests.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfillment_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fulfillment_messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct TextMessage {
    #[serde(default)]
    pub text: Vec<String>,
}

impl Message {
    pub fn text(segments: impl IntoIterator<Item = String>) -> Self {
        Self {
            text: Some(TextMessage {
                text: segments.into_iter().collect(),
            }),
            payload: None,
        }
    }

    pub fn payload(payload: Value) -> Self {
        Self {
            text: None,
            payload: Some(payload),
        }
    }
}

/// Flat view of a query result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub text: String,
    pub intent: String,
    pub payload: Option<Value>,
}

impl QueryResult {
    /// First non-empty text segment of the rich messages, then the legacy
    /// `fulfillmentText`, then the empty string.
    pub fn reply_text(&self) -> String {
        self.fulfillment_messages
            .iter()
            .filter_map(|message| message.text.as_ref())
            .flat_map(|text| text.text.iter())
            .find(|segment| !segment.is_empty())
            .or_else(|| self.fulfillment_text.as_ref().filter(|text| !text.is_empty()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn intent_name(&self) -> &str {
        self.intent
            .as_ref()
            .and_then(|intent| intent.display_name.as_deref())
            .unwrap_or_default()
    }

    /// First message payload that carries data, as a plain JSON object.
    pub fn first_payload(&self) -> Option<Value> {
        self.fulfillment_messages
            .iter()
            .filter_map(|message| message.payload.as_ref())
            .find_map(payload::normalize)
    }

    pub fn reply(&self) -> Reply {
        Reply {
            text: self.reply_text(),
            intent: self.intent_name().to_owned(),
            payload: self.first_payload(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn result(value: Value) -> QueryResult {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn rich_text_wins_over_legacy_text() {
        let both = result(json!({
            "fulfillmentText": "B",
            "fulfillmentMessages": [{ "text": { "text": ["A"] } }]
        }));
        assert_eq!(both.reply_text(), "A");

        let legacy_only = result(json!({ "fulfillmentText": "B" }));
        assert_eq!(legacy_only.reply_text(), "B");

        let neither = result(json!({}));
        assert_eq!(neither.reply_text(), "");
    }

    #[test]
    fn empty_segments_are_skipped() {
        let query = result(json!({
            "fulfillmentText": "legacy",
            "fulfillmentMessages": [
                { "payload": { "buttons": [] } },
                { "text": { "text": [""] } },
                { "text": { "text": ["", "second"] } }
            ]
        }));
        assert_eq!(query.reply_text(), "second");

        let blank = result(json!({
            "fulfillmentText": "",
            "fulfillmentMessages": [{ "text": { "text": [""] } }]
        }));
        assert_eq!(blank.reply_text(), "");
    }

    #[test]
    fn every_segment_of_a_message_is_searched_before_the_next_message() {
        let query = result(json!({
            "fulfillmentMessages": [
                { "text": { "text": ["", "second"] } },
                { "text": { "text": ["third"] } }
            ]
        }));

        assert_eq!(query.reply_text(), "second");
    }

    #[test]
    fn first_non_empty_payload_is_taken() {
        let query = result(json!({
            "fulfillmentMessages": [
                { "text": { "text": ["hi"] } },
                { "payload": {} },
                { "payload": { "buttons": [{ "title": "Docs", "payload": "Documentation" }] } },
                { "payload": { "other": true } }
            ]
        }));
        assert_eq!(
            query.first_payload(),
            Some(json!({ "buttons": [{ "title": "Docs", "payload": "Documentation" }] }))
        );
    }

    #[test]
    fn typed_payloads_are_flattened() {
        let query = result(json!({
            "fulfillmentMessages": [{
                "platform": "PLATFORM_UNSPECIFIED",
                "message": "payload",
                "payload": { "fields": {
                    "a": { "stringValue": "x", "kind": "stringValue" },
                    "b": { "numberValue": 5, "kind": "numberValue" }
                } }
            }]
        }));
        assert_eq!(query.first_payload(), Some(json!({ "a": "x", "b": 5 })));
    }

    #[test]
    fn reply_collects_text_intent_and_payload() {
        let query = result(json!({
            "fulfillmentText": "We offer...",
            "intent": { "displayName": "company_services" },
            "fulfillmentMessages": [
                { "payload": { "buttons": [{ "title": "AI / ML Solutions" }] } }
            ]
        }));

        assert_eq!(
            query.reply(),
            Reply {
                text: "We offer...".into(),
                intent: "company_services".into(),
                payload: Some(json!({ "buttons": [{ "title": "AI / ML Solutions" }] })),
            }
        );
    }

    #[test]
    fn missing_intent_is_empty() {
        assert_eq!(QueryResult::default().intent_name(), "");
        assert_eq!(result(json!({ "intent": {} })).intent_name(), "");
    }

    #[test]
    fn request_body_matches_the_rest_schema() {
        let body = serde_json::to_value(DetectIntentRequest::new("hello", "en-US")).unwrap();
        assert_eq!(
            body,
            json!({ "queryInput": { "text": { "text": "hello", "languageCode": "en-US" } } })
        );
    }
}
