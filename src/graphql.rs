use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Builds the `updateDiscussion` mutation.
///
/// Both inputs travel as variables so neither can alter the query text.
pub fn update_discussion_mutation(discussion_id: &str, body: &str) -> Value {
    serde_json::json!({
        "query": r#"
            mutation($discussionId: ID!, $body: String!) {
                updateDiscussion(input: { discussionId: $discussionId, body: $body }) {
                    discussion {
                        id
                    }
                }
            }
        "#,
        "variables": {
            "discussionId": discussion_id,
            "body": body,
        }
    })
}

#[derive(Debug, Deserialize)]
pub struct GraphQLError {
    pub message: String,
}

/// Envelope of a GraphQL response. GitHub reports query failures with a
/// 200 status and a populated `errors` array.
#[derive(Debug, Deserialize)]
pub struct GraphQLResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphQLError>,
}

impl GraphQLResponse {
    pub fn into_result(self) -> Result<Option<Value>> {
        if self.errors.is_empty() {
            return Ok(self.data);
        }

        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        Err(Error::GraphQl(messages.join("; ")))
    }
}
