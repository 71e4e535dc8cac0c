use tracing::{debug, info};

use crate::{
    agent::{
        AgentRuntime, Content, Memory, ModelClass, SOURCE, State, compose_context, string_to_uuid,
    },
    error::Result,
    events::{
        DiscussionCreatedEvent, IssuesOpenedEvent, WebhookEvent, display_name,
        require_installation,
    },
    types::{Forge, LabelDecision, render_labels},
};

/// Prompt used to triage a newly opened issue into a priority and a type.
pub const ISSUE_OPENED_TEMPLATE: &str = r#"
# Knowledge
Common type labels: bug, documentation, duplicate, enhancement, good first issue, help wanted, invalid, question, wontfix
Common priority labels: critical, blocking, high, medium, low
Triage practice: categorise the issue, check it can be reproduced, pick the labels that fit, prioritise by impact.

# Background
About {{agentName}}:
{{bio}}
{{lore}}

# Attachments
{{attachments}}

{{messageDirections}}

# Task: As a product manager, {{agentName}} triages the GitHub issue below by choosing one priority label and one type label.

## Issue Title
{{title}}

## Issue Body
{{body}}

# Available labels (label_name: label_description)

{{labels}}

# Response: reply with ONLY a JSON object holding the chosen priority and type, formatted like this:

```json
{ "priority": "high", "type": "bug" }
```
"#;

/// Body written into every newly created discussion.
pub const DISCUSSION_BODY: &str = "\
## Summary

This discussion collects proposals for the next milestone. Describe the problem a feature solves, \
who benefits from it and any constraints the implementation has to respect. Proposals with the \
most votes are scheduled first.

## Vote

| Feature | Description | Vote | Votes |
| ------- | ----------- | ---- | ----- |
| Create User | Add POST /user endpoint | [Click here](http://localhost:3000/sign-vote) | #################### (20) |
| Delete User | Add DELETE /user endpoint | [Click here](http://localhost:3000/sign-vote) | ############################## (30) |
";

/// Reacts to the webhook events the App subscribes to.
pub struct WebhookHandlers<F, R> {
    forge: F,
    agent: R,
}

impl<F: Forge, R: AgentRuntime> WebhookHandlers<F, R> {
    pub fn new(forge: F, agent: R) -> Self {
        Self { forge, agent }
    }

    pub fn agent(&self) -> &R {
        &self.agent
    }

    /// Routes a decoded delivery to its handler.
    pub async fn dispatch(&self, event: WebhookEvent) -> Result<()> {
        match event {
            WebhookEvent::IssueOpened(event) => {
                self.handle_issue_opened(&event).await?;
            }
            WebhookEvent::DiscussionCreated(event) => {
                self.handle_discussion_created(&event).await?;
            }
            ignored @ WebhookEvent::Ignored { .. } => {
                debug!(event = %ignored.name(), "ignoring webhook event");
            }
        }
        Ok(())
    }

    /// Asks the agent to triage a new issue and applies the chosen labels.
    ///
    /// Returns the labels that were applied, priority first. The label call
    /// is awaited, so a failure to apply them is reported like any other.
    pub async fn handle_issue_opened(&self, event: &IssuesOpenedEvent) -> Result<Vec<String>> {
        let installation_id = require_installation(event.installation.as_ref())?;
        let issue = &event.issue;
        let owner = event.owner.as_str();
        let repo = event.repo.as_str();

        let repo_labels = self.forge.get_labels(installation_id, owner, repo).await?;
        let labels = render_labels(&repo_labels);

        let room_id = string_to_uuid(format!("github-issue-{}-room", issue.id));
        let user_id = string_to_uuid(issue.user.id.to_string());
        let user_name = display_name(&issue.user);

        self.agent
            .ensure_connection(user_id, room_id, user_name, user_name, SOURCE)
            .await?;

        let agent_id = self.agent.agent_id();
        let message_id = string_to_uuid(format!("issues-opened-{}", issue.id));
        let body = issue.body.as_deref().unwrap_or_default();

        let content = Content {
            text: format!("{}\n{}", issue.title, body),
            source: Some(SOURCE.to_string()),
            url: Some(issue.url.to_string()),
            ..Content::default()
        };

        let memory = Memory::new(
            string_to_uuid(format!("{message_id}-{user_id}")),
            user_id,
            agent_id,
            room_id,
            content,
        );
        let memory = self.agent.add_embedding(memory).await?;
        self.agent.create_memory(&memory).await?;

        let mut extra = State::default();
        extra.insert("agentName", self.agent.agent_name());
        extra.insert("title", issue.title.as_str());
        extra.insert("body", body);
        extra.insert("labels", labels);

        let state = self.agent.compose_state(&memory, extra).await?;
        let context = compose_context(&state, ISSUE_OPENED_TEMPLATE);
        let response = self
            .agent
            .generate_response(&context, ModelClass::Large)
            .await?;

        let mut response_memory = Memory::new(
            string_to_uuid(format!("{message_id}-{agent_id}")),
            agent_id,
            agent_id,
            room_id,
            response.clone(),
        );
        response_memory.embedding = Some(self.agent.zero_embedding());
        self.agent.create_memory(&response_memory).await?;

        let state = self.agent.update_recent_message_state(state).await?;
        self.agent.evaluate(&memory, &state).await?;

        let issue_labels = LabelDecision::from_content(&response)?.labels();
        self.forge
            .add_labels(installation_id, owner, repo, issue.number, &issue_labels)
            .await?;

        info!(
            installation_id = %installation_id,
            %owner,
            %repo,
            issue = issue.number,
            labels = ?issue_labels,
            "triaged issue"
        );

        Ok(issue_labels)
    }

    /// Replaces the body of a new discussion with the voting template.
    pub async fn handle_discussion_created(&self, event: &DiscussionCreatedEvent) -> Result<()> {
        let installation_id = require_installation(event.installation.as_ref())?;
        let discussion = &event.discussion;

        self.forge
            .update_discussion_body(installation_id, &discussion.node_id, DISCUSSION_BODY)
            .await?;

        info!(
            installation_id = %installation_id,
            discussion = discussion.number,
            "discussion body replaced"
        );

        Ok(())
    }
}
