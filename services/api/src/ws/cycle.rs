//! Contains the logic for one reason/act turn of the coaching flow.

use crate::{
    models::{Turn, TurnRole},
    state::AppState,
    ws::session::speak,
};
use anyhow::{Context, Result};
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestToolMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionToolArgs, FunctionObjectArgs,
};
use axum::extract::ws::{Message, WebSocket};
use englishly_core::{
    Command,
    agent::CoachSession,
    llm_client::{LLMAction, LLMStreamEvent},
};
use futures_util::{StreamExt, stream::SplitSink};
use rmcp::{
    model::{CallToolRequestParam, RawContent},
    service::{RoleClient, RunningService},
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handles a single learner utterance, driving one reason/act turn.
///
/// This involves:
/// 1.  Constructing the prompt from the current stage's instructions, the
///     profile collected so far, and the conversation history.
/// 2.  Offering the LLM the current stage's advancement tool, and only that one.
/// 3.  Calling the LLM to decide on an action (speak or advance the stage).
/// 4.  If the tool is chosen, executing it and feeding the result back to the LLM.
/// 5.  Sending the final text back to the host runtime to be spoken.
///
/// Returns `Command::SessionComplete` once the feedback report has been
/// uploaded, so the session loop can say goodbye and close.
pub async fn handle_coach_cycle(
    state: &Arc<AppState>,
    history: &mut Vec<Turn>,
    session_arc: &Arc<tokio::sync::Mutex<CoachSession>>,
    mcp_client: &RunningService<RoleClient, ()>,
    user_text: &str,
    socket_tx: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
) -> Result<Command> {
    history.push(Turn::new(TurnRole::Learner, user_text));

    // Construct the system prompt from the current stage and profile.
    let current_session = session_arc.lock().await.clone();
    let stage = current_session.stage;
    let profile_json = serde_json::to_string_pretty(&current_session.profile)?;
    let system_prompt = format!(
        "{}\n\n# Current Context for This Turn\n\n**Stage:** {}\n\n**Learner profile so far:**\n```json\n{}\n```",
        stage.instructions(),
        stage,
        profile_json
    );

    // Build the full message history for the LLM.
    let mut messages: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt)
            .build()?
            .into(),
    ];
    for turn in history.iter() {
        match turn.role {
            TurnRole::Learner => messages.push(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(turn.content.clone())
                    .build()?
                    .into(),
            ),
            TurnRole::Coach => messages.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(turn.content.clone())
                    .build()?
                    .into(),
            ),
        };
    }

    // Offer only the current stage's advancement tool. Together with the
    // gating inside each tool, this keeps the stage pointer forward-only.
    let tools = mcp_client
        .list_all_tools()
        .await?
        .into_iter()
        .filter(|t| t.name.as_ref() == stage.tool_name())
        .map(|t| {
            Ok(ChatCompletionToolArgs::default()
                .function(
                    FunctionObjectArgs::default()
                        .name(t.name)
                        .description(t.description.unwrap_or_default())
                        .parameters(serde_json::to_value(&*t.input_schema)?)
                        .build()?,
                )
                .build()?)
        })
        .collect::<Result<Vec<_>>>()?;

    // Ask the LLM to decide on the next action.
    let action = state.llm_client.decide_action(messages.clone(), tools).await?;

    let mut full_response = String::new();
    match action {
        LLMAction::TextResponse(response_text) => {
            // If the LLM decides to just respond, use the provided text.
            full_response = response_text
        }
        LLMAction::ToolCall(tool_calls) => {
            // If the LLM decides to advance the stage, execute the tool.
            let mut tool_results = vec![];
            for call in &tool_calls {
                let result = mcp_client
                    .peer()
                    .call_tool(CallToolRequestParam {
                        name: call.function.name.clone().into(),
                        arguments: Some(serde_json::from_str(&call.function.arguments)?),
                    })
                    .await?;

                let annotated_content = result
                    .content
                    .context("Tool call returned no content")?
                    .pop()
                    .context("Content list was empty")?;
                let result_text = match annotated_content.raw {
                    RawContent::Text(text_content) => text_content.text,
                    _ => "{\"error\": \"Unexpected content type from tool\"}".to_string(),
                };
                tool_results.push(result_text);
            }

            // Append the tool calls and their results to the history.
            let mut history_with_tools = messages;
            history_with_tools.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .tool_calls(tool_calls.clone())
                    .build()?
                    .into(),
            );
            for (i, result) in tool_results.iter().enumerate() {
                history_with_tools.push(
                    ChatCompletionRequestToolMessageArgs::default()
                        .tool_call_id(tool_calls[i].id.clone())
                        .content(result.clone())
                        .build()?
                        .into(),
                );
            }

            // Call the LLM again with the tool results to get the spoken transition.
            let mut final_stream = state.llm_client.stream_after_tools(history_with_tools).await?;
            while let Some(event_result) = final_stream.next().await {
                if let Ok(LLMStreamEvent::TextChunk(chunk)) = event_result {
                    full_response.push_str(&chunk);
                }
            }
        }
    }

    if !full_response.is_empty() {
        history.push(Turn::new(TurnRole::Coach, full_response.clone()));
    }

    // Send the response to the host runtime to be spoken.
    {
        let mut sink = socket_tx.lock().await;
        speak(&mut sink, &full_response).await?;
    }

    // A successful `end_session` marks the session completed; report it so
    // the session loop can close.
    if session_arc.lock().await.completed {
        Ok(Command::SessionComplete(full_response))
    } else {
        Ok(Command::SpeakText(full_response))
    }
}
