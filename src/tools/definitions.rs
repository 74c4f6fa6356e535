//! Tool definitions advertised to the LLM
//!
//! The `{type:"function", function:{...}}` wire shape these serialize to
//! is the contract both provider families consume; the adapters wrap the
//! `parameters` blocks verbatim.

use serde_json::json;

use crate::provider::ToolDefinition;

/// Hard cap on UUIDs accepted by get_conversation_by_id, applied at the
/// dispatcher before any query runs.
pub const MAX_UUIDS_PER_LOOKUP: usize = 10;

/// Get all retrieval tool definitions
pub fn get_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "find_by_party".into(),
            description: "Returns the vCons for the named party. Supports identification of \
                          matching conversations by tel, mailto, and name."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "party": {
                        "type": "string",
                        "description": "The party to find. Supports tel, mailto, and name."
                    }
                },
                "required": ["party"]
            }),
        },
        ToolDefinition {
            name: "find_by_date_range".into(),
            description: "Returns the vCons where the created_at date is between the start and \
                          end dates. Bare dates cover the whole day on both ends."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "start_date": {
                        "type": "string",
                        "description": "The start date of the range, ISO 8601 format."
                    },
                    "end_date": {
                        "type": "string",
                        "description": "The end date of the range, ISO 8601 format."
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of UUIDs to return (default 100, capped at 1000)."
                    },
                    "offset": {
                        "type": "integer",
                        "description": "Number of matches to skip after sorting."
                    },
                    "sort": {
                        "type": "string",
                        "enum": ["newest", "oldest"],
                        "description": "Sort order by creation time (default newest)."
                    }
                },
                "required": ["start_date", "end_date"]
            }),
        },
        ToolDefinition {
            name: "get_conversation_by_id".into(),
            description: "Returns the full vCons with the matching uuids. At most 10 uuids are \
                          looked up per call."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "uuids": {
                        "description": "A uuid, or a list of up to 10 uuids, to fetch.",
                        "oneOf": [
                            {"type": "string"},
                            {"type": "array", "items": {"type": "string"}, "maxItems": MAX_UUIDS_PER_LOOKUP}
                        ]
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Truncate the returned record set to this many entries."
                    }
                },
                "required": ["uuids"]
            }),
        },
        ToolDefinition {
            name: "search_in_milvus".into(),
            description: "Search for conversation transcripts and summaries by meaning, using \
                          vector similarity."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "search_text": {
                        "type": "string",
                        "description": "Text to search for in the conversation index."
                    }
                },
                "required": ["search_text"]
            }),
        },
    ]
}
