//! MCP tool registry for Finn.
//!
//! Tools are registered explicitly at start-up into a name → handler table.

use super::protocol::{Tool, ToolCallResult};
use crate::error::{FinnError, Result};
use crate::library::Library;
use crate::search::{SearchQuery, SearchResultEnvelope};
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;

pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = ToolCallResult> + Send + 'a>>;

/// A tool implementation: library plus the call's arguments.
pub type ToolHandler = for<'a> fn(&'a Library, Value) -> ToolFuture<'a>;

struct RegisteredTool {
    definition: Tool,
    handler: ToolHandler,
}

/// Name → handler table of the tools this server exposes.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique.
    pub fn register(&mut self, definition: Tool, handler: ToolHandler) -> Result<()> {
        if self.tools.iter().any(|t| t.definition.name == definition.name) {
            return Err(FinnError::InvalidInput(format!(
                "Tool already registered: {}",
                definition.name
            )));
        }
        self.tools.push(RegisteredTool {
            definition,
            handler,
        });
        Ok(())
    }

    /// Tool definitions in registration order.
    pub fn definitions(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    /// Dispatch a call by tool name.
    pub async fn call(&self, library: &Library, name: &str, args: Value) -> ToolCallResult {
        match self.tools.iter().find(|t| t.definition.name == name) {
            Some(tool) => (tool.handler)(library, args).await,
            None => ToolCallResult::error(format!("Unknown tool: {}", name)),
        }
    }
}

/// The registry with every Finn tool.
pub fn default_registry() -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    registry.register(
        Tool {
            name: "search".to_string(),
            description: "Search indexed video transcripts. Tries exact keyword matching first, \
                then semantic search, then progressively wider rewrites of the query. \
                The response says which technique found the results."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "channels": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Only return videos from these channel IDs"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results",
                        "default": 10
                    },
                    "user_id": {
                        "type": "string",
                        "description": "User whose search history is used to re-rank results"
                    }
                },
                "required": ["query"]
            }),
        },
        search,
    )?;

    registry.register(
        Tool {
            name: "list_videos".to_string(),
            description: "List all indexed videos.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        list_videos,
    )?;

    registry.register(
        Tool {
            name: "get_video".to_string(),
            description: "Get the details and full transcript of an indexed video by its ID."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "video_id": {
                        "type": "string",
                        "description": "The video ID"
                    }
                },
                "required": ["video_id"]
            }),
        },
        get_video,
    )?;

    Ok(registry)
}

fn format_envelope(envelope: &SearchResultEnvelope) -> String {
    let mut output = format!("{}\n", envelope.explanation);

    for (i, result) in envelope.results.iter().enumerate() {
        output.push_str(&format!(
            "\n{}. **{}** (ID: {})\n   Channel: {}, published {}\n   Score: {:.2} [{}]\n",
            i + 1,
            result.title,
            result.id,
            result.channel,
            result.publish_date,
            result.score,
            serde_json::to_value(result.provenance)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default()
        ));
    }

    output
}

fn search(library: &Library, args: Value) -> ToolFuture<'_> {
    Box::pin(async move {
        let text = args.get("query").and_then(|v| v.as_str()).map(str::to_string);
        let channels: Vec<String> = args
            .get("channels")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|c| c.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        let limit = args.get("limit").and_then(|v| v.as_u64()).map(|l| l as usize);
        let user_id = args.get("user_id").and_then(|v| v.as_str()).map(str::to_string);

        let query = match SearchQuery::from_parts(text, channels, limit, user_id) {
            Ok(query) => query,
            Err(e) => return ToolCallResult::error(e.to_string()),
        };

        match library.search(&query).await {
            Ok(envelope) => ToolCallResult::text(format_envelope(&envelope)),
            Err(e) => ToolCallResult::error(format!("Search failed: {}", e)),
        }
    })
}

fn list_videos(library: &Library, _args: Value) -> ToolFuture<'_> {
    Box::pin(async move {
        match library.list().await {
            Ok(videos) if videos.is_empty() => {
                ToolCallResult::text("No videos indexed yet.".to_string())
            }
            Ok(videos) => {
                let mut output = format!("Indexed videos ({}):\n\n", videos.len());
                for video in &videos {
                    output.push_str(&format!(
                        "- **{}** (ID: {})\n  {}, {}, {} words{}\n",
                        video.title,
                        video.video_id,
                        video.channel_id,
                        video.publish_date,
                        video.word_count,
                        if video.has_embedding { ", embedded" } else { "" }
                    ));
                }
                ToolCallResult::text(output)
            }
            Err(e) => ToolCallResult::error(format!("Failed to list videos: {}", e)),
        }
    })
}

fn get_video(library: &Library, args: Value) -> ToolFuture<'_> {
    Box::pin(async move {
        let Some(video_id) = args.get("video_id").and_then(|v| v.as_str()) else {
            return ToolCallResult::error("Missing 'video_id' argument".to_string());
        };

        match library.get(video_id).await {
            Ok(video) => ToolCallResult::text(format!(
                "**{}**\n{}\nChannel: {}, published {}\n\n{}",
                video.title,
                video.url(),
                video.channel_name.as_deref().unwrap_or(&video.channel_id),
                video.publish_date,
                video.transcript
            )),
            Err(e) => ToolCallResult::error(e.to_string()),
        }
    })
}
