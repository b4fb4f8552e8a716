//! MCP tool contracts and handlers for the emotions journal.
//!
//! # Responsibility
//! - Declare each tool's argument contract (typed, unknown keys rejected)
//!   and the JSON Schema published through `tools/list`.
//! - Check argument presence, call the record store, and wrap the outcome in
//!   a `ToolResult` envelope.
//!
//! # Invariants
//! - Missing arguments are reported without touching the store.
//! - No business validation happens here; domain rules live in the store.
//! - Handlers never panic or propagate errors: every failure becomes an
//!   error envelope.

use emotions_core::{Emotion, EmotionFilter, EmotionRepository, Nummer, RepoError};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Display;

use crate::protocol::{ToolDefinition, ToolResult};

pub const TABLE_CREATED_MESSAGE: &str = "Table created successfully";
pub const EMOTION_DELETED_MESSAGE: &str = "Emotion deleted successfully";
pub const EMOTION_NOT_FOUND_MESSAGE: &str = "Emotion not found";

const USER_CONTEXT_REQUIRED: &str = "User context is required";
const EMOTION_REQUIRED: &str = "Emotion data is required";
const NUMMER_REQUIRED: &str = "Emotion number is required";
const LIMIT_REQUIRED: &str = "Limit is required";

// ---------------------------------------------------------------------------
// Argument contracts
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct InsertEmotionArgs {
    user_context: Option<String>,
    emotion: Option<Emotion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EmotionKeyArgs {
    user_context: Option<String>,
    #[serde(alias = "emotionId")]
    nummer: Option<Nummer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct UpdateEmotionArgs {
    user_context: Option<String>,
    #[serde(alias = "emotionId")]
    nummer: Option<Nummer>,
    emotion: Option<Emotion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct GetEmotionsArgs {
    user_context: Option<String>,
    filter: Option<EmotionFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RecentEmotionsArgs {
    user_context: Option<String>,
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
struct TableExistsPayload {
    exists: bool,
}

// ---------------------------------------------------------------------------
// tools/list
// ---------------------------------------------------------------------------

fn emotion_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "description": description,
        "properties": {
            "emotion": { "type": "string", "description": "Name of the emotion" },
            "datum": { "type": "string", "format": "date", "description": "Date (YYYY-MM-DD)" },
            "alter": { "type": "integer", "description": "Age when the emotion arose" },
            "quellenart": quellenart_schema(),
            "quelle": {
                "type": "string",
                "description": "Source person; required for adopted or inherited emotions"
            },
            "koerperteil": { "type": "string" },
            "auswirkungen": { "type": "string" },
            "bemerkungen": { "type": "string" }
        },
        "required": ["emotion"],
        "additionalProperties": false
    })
}

fn quellenart_schema() -> Value {
    let labels = emotions_core::Quellenart::ALL
        .iter()
        .map(|kind| kind.as_label())
        .collect::<Vec<_>>();
    json!({ "type": "string", "enum": labels })
}

fn user_context_schema() -> Value {
    json!({ "type": "string", "description": "User context the records belong to" })
}

fn nummer_schema(action: &str) -> Value {
    json!({
        "type": "integer",
        "minimum": 1,
        "description": format!("Per-user number of the emotion to {action}")
    })
}

/// Return all tool definitions for tools/list
pub fn list_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "tableExists",
            description: "Check if the emotions table exists",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        ToolDefinition {
            name: "createTable",
            description: "Create the emotions table in the database",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        ToolDefinition {
            name: "insertEmotion",
            description: "Insert a new emotion record; its number is assigned by the server",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "userContext": user_context_schema(),
                    "emotion": emotion_schema("Emotion data")
                },
                "required": ["userContext", "emotion"]
            }),
        },
        ToolDefinition {
            name: "deleteEmotion",
            description: "Delete an emotion by its number",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "userContext": user_context_schema(),
                    "nummer": nummer_schema("delete")
                },
                "required": ["userContext", "nummer"]
            }),
        },
        ToolDefinition {
            name: "getEmotion",
            description: "Get a specific emotion by its number",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "userContext": user_context_schema(),
                    "nummer": nummer_schema("retrieve")
                },
                "required": ["userContext", "nummer"]
            }),
        },
        ToolDefinition {
            name: "updateEmotion",
            description: "Update an existing emotion by its number",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "userContext": user_context_schema(),
                    "nummer": nummer_schema("update"),
                    "emotion": emotion_schema("Updated emotion data")
                },
                "required": ["userContext", "nummer", "emotion"]
            }),
        },
        ToolDefinition {
            name: "getEmotions",
            description: "Get emotions matching optional filters, ordered by number",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "userContext": user_context_schema(),
                    "filter": {
                        "type": "object",
                        "description": "Filter criteria; text fields match case-insensitive substrings",
                        "properties": {
                            "nummer": { "type": "integer" },
                            "emotion": { "type": "string" },
                            "datumVon": { "type": "string", "format": "date" },
                            "datumBis": { "type": "string", "format": "date" },
                            "alterVon": { "type": "integer" },
                            "alterBis": { "type": "integer" },
                            "quellenart": quellenart_schema(),
                            "quelle": { "type": "string" },
                            "koerperteil": { "type": "string" },
                            "auswirkungen": { "type": "string" },
                            "bemerkungen": { "type": "string" }
                        },
                        "additionalProperties": false
                    }
                },
                "required": ["userContext"]
            }),
        },
        ToolDefinition {
            name: "getRecentEmotions",
            description: "Get the most recently numbered emotions, newest first",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "userContext": user_context_schema(),
                    "limit": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Maximum number of records to return"
                    }
                },
                "required": ["userContext", "limit"]
            }),
        },
    ]
}

// ---------------------------------------------------------------------------
// tools/call
// ---------------------------------------------------------------------------

/// Routes tool calls to a record store.
pub struct ToolDispatcher<R> {
    repo: R,
}

impl<R: EmotionRepository> ToolDispatcher<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Dispatch a tool call to the appropriate handler
    pub fn call_tool(&self, name: &str, args: &Value) -> ToolResult {
        debug!("event=tool_call module=tools status=start tool={name}");
        let result = match name {
            "tableExists" => self.handle_table_exists(args),
            "createTable" => self.handle_create_table(args),
            "insertEmotion" => self.handle_insert(args),
            "deleteEmotion" => self.handle_delete(args),
            "getEmotion" | "getEmotionById" => self.handle_get(args),
            "updateEmotion" => self.handle_update(args),
            "getEmotions" => self.handle_list(args),
            "getRecentEmotions" => self.handle_recent(args),
            _ => failure(format!("Unknown tool: {name}")),
        };
        if result.is_error {
            warn!("event=tool_call module=tools status=error tool={name}");
        } else {
            debug!("event=tool_call module=tools status=ok tool={name}");
        }
        result
    }

    fn handle_table_exists(&self, args: &Value) -> ToolResult {
        if let Err(result) = parse_args::<NoArgs>("tableExists", args) {
            return result;
        }
        match self.repo.table_exists() {
            Ok(exists) => json_result(&TableExistsPayload { exists }),
            Err(err) => store_error(&err),
        }
    }

    fn handle_create_table(&self, args: &Value) -> ToolResult {
        if let Err(result) = parse_args::<NoArgs>("createTable", args) {
            return result;
        }
        match self.repo.create_table() {
            Ok(()) => ToolResult::text(TABLE_CREATED_MESSAGE),
            Err(err) => store_error(&err),
        }
    }

    fn handle_insert(&self, args: &Value) -> ToolResult {
        let args: InsertEmotionArgs = match parse_args("insertEmotion", args) {
            Ok(args) => args,
            Err(result) => return result,
        };
        let user_context = match required_user_context(args.user_context) {
            Ok(user_context) => user_context,
            Err(result) => return result,
        };
        let Some(emotion) = args.emotion else {
            return failure(EMOTION_REQUIRED);
        };

        match self.repo.insert_emotion(&user_context, &emotion) {
            Ok(record) => json_result(&record),
            Err(err) => store_error(&err),
        }
    }

    fn handle_delete(&self, args: &Value) -> ToolResult {
        let (user_context, nummer) = match parse_key_args("deleteEmotion", args) {
            Ok(key) => key,
            Err(result) => return result,
        };

        match self.repo.delete_emotion(&user_context, nummer) {
            Ok(true) => ToolResult::text(EMOTION_DELETED_MESSAGE),
            Ok(false) => failure(EMOTION_NOT_FOUND_MESSAGE),
            Err(err) => store_error(&err),
        }
    }

    fn handle_get(&self, args: &Value) -> ToolResult {
        let (user_context, nummer) = match parse_key_args("getEmotion", args) {
            Ok(key) => key,
            Err(result) => return result,
        };

        match self.repo.get_emotion(&user_context, nummer) {
            Ok(Some(record)) => json_result(&record),
            Ok(None) => failure(EMOTION_NOT_FOUND_MESSAGE),
            Err(err) => store_error(&err),
        }
    }

    fn handle_update(&self, args: &Value) -> ToolResult {
        let args: UpdateEmotionArgs = match parse_args("updateEmotion", args) {
            Ok(args) => args,
            Err(result) => return result,
        };
        let user_context = match required_user_context(args.user_context) {
            Ok(user_context) => user_context,
            Err(result) => return result,
        };
        let Some(nummer) = args.nummer else {
            return failure(NUMMER_REQUIRED);
        };
        let Some(emotion) = args.emotion else {
            return failure(EMOTION_REQUIRED);
        };

        match self.repo.update_emotion(&user_context, nummer, &emotion) {
            Ok(record) => json_result(&record),
            Err(RepoError::NotFound { .. }) => failure(EMOTION_NOT_FOUND_MESSAGE),
            Err(err) => store_error(&err),
        }
    }

    fn handle_list(&self, args: &Value) -> ToolResult {
        let args: GetEmotionsArgs = match parse_args("getEmotions", args) {
            Ok(args) => args,
            Err(result) => return result,
        };
        let user_context = match required_user_context(args.user_context) {
            Ok(user_context) => user_context,
            Err(result) => return result,
        };
        let filter = args.filter.unwrap_or_default();

        match self.repo.list_emotions(&user_context, &filter) {
            Ok(records) => json_result(&records),
            Err(err) => store_error(&err),
        }
    }

    fn handle_recent(&self, args: &Value) -> ToolResult {
        let args: RecentEmotionsArgs = match parse_args("getRecentEmotions", args) {
            Ok(args) => args,
            Err(result) => return result,
        };
        let user_context = match required_user_context(args.user_context) {
            Ok(user_context) => user_context,
            Err(result) => return result,
        };
        let Some(limit) = args.limit else {
            return failure(LIMIT_REQUIRED);
        };

        match self.repo.recent_emotions(&user_context, limit) {
            Ok(records) => json_result(&records),
            Err(err) => store_error(&err),
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: &Value) -> Result<T, ToolResult> {
    // Clients may omit `arguments` entirely for tools without parameters.
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args.clone()
    };
    serde_json::from_value(args)
        .map_err(|err| failure(format_args!("invalid arguments for {tool}: {err}")))
}

fn parse_key_args(tool: &str, args: &Value) -> Result<(String, Nummer), ToolResult> {
    let args: EmotionKeyArgs = parse_args(tool, args)?;
    let user_context = required_user_context(args.user_context)?;
    let nummer = args.nummer.ok_or_else(|| failure(NUMMER_REQUIRED))?;
    Ok((user_context, nummer))
}

fn required_user_context(user_context: Option<String>) -> Result<String, ToolResult> {
    match user_context {
        Some(user_context) if !user_context.is_empty() => Ok(user_context),
        _ => Err(failure(USER_CONTEXT_REQUIRED)),
    }
}

fn json_result<T: Serialize>(payload: &T) -> ToolResult {
    match serde_json::to_string(payload) {
        Ok(text) => ToolResult::text(text),
        Err(err) => failure(format_args!("failed to serialize result: {err}")),
    }
}

fn store_error(err: &RepoError) -> ToolResult {
    failure(err)
}

fn failure(message: impl Display) -> ToolResult {
    ToolResult::error(format!("Error: {message}"))
}
