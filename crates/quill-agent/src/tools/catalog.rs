//! The tool catalog — a closed, enumerable set of declared tools.
//!
//! One `ToolKind` variant per tool; adding a tool is a compile-time-checked
//! change and an unknown name is an explicit error case in the executor, not
//! a lookup miss. Pure data: names, descriptions, and parameter schemas.
//! This is the negotiated contract the model formats its requests against —
//! renaming a tool or a required parameter breaks in-flight conversations.

use quill_core::types::ToolDefinition;
use serde_json::{json, Value};

/// Every tool the model may invoke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolKind {
    ReadFile,
    WriteFile,
    AppendFile,
    SearchFiles,
    ListDirectory,
    FetchUrl,
    SendFile,
}

impl ToolKind {
    /// All declared tools, in catalog order.
    pub const ALL: [ToolKind; 7] = [
        ToolKind::ReadFile,
        ToolKind::WriteFile,
        ToolKind::AppendFile,
        ToolKind::SearchFiles,
        ToolKind::ListDirectory,
        ToolKind::FetchUrl,
        ToolKind::SendFile,
    ];

    /// Resolve a model-supplied name. `None` means the model asked for a
    /// tool that was never declared.
    pub fn from_name(name: &str) -> Option<ToolKind> {
        match name {
            "read_file" => Some(ToolKind::ReadFile),
            "write_file" => Some(ToolKind::WriteFile),
            "append_to_file" => Some(ToolKind::AppendFile),
            "search_files" => Some(ToolKind::SearchFiles),
            "list_directory" => Some(ToolKind::ListDirectory),
            "fetch_url" => Some(ToolKind::FetchUrl),
            "send_file" => Some(ToolKind::SendFile),
            _ => None,
        }
    }

    /// Wire name, as advertised to the model.
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::ReadFile => "read_file",
            ToolKind::WriteFile => "write_file",
            ToolKind::AppendFile => "append_to_file",
            ToolKind::SearchFiles => "search_files",
            ToolKind::ListDirectory => "list_directory",
            ToolKind::FetchUrl => "fetch_url",
            ToolKind::SendFile => "send_file",
        }
    }

    /// Natural-language description shown to the model.
    pub fn description(self) -> &'static str {
        match self {
            ToolKind::ReadFile => {
                "Read the contents of a file from the workspace. Use this to retrieve \
                 notes, documents, code, or any saved material."
            }
            ToolKind::WriteFile => {
                "Create or overwrite a file in the workspace. Parent directories are \
                 created automatically."
            }
            ToolKind::AppendFile => {
                "Append content to an existing workspace file (useful for inboxes, \
                 logs, running notes). Creates the file if it doesn't exist."
            }
            ToolKind::SearchFiles => {
                "Search workspace files by name or content. Returns matching paths \
                 with a short snippet around the first content match."
            }
            ToolKind::ListDirectory => {
                "List the files and subdirectories of a workspace directory."
            }
            ToolKind::FetchUrl => {
                "Fetch and extract content from a URL (YouTube transcripts, Reddit \
                 posts, articles, generic pages)."
            }
            ToolKind::SendFile => {
                "Send a workspace file to the user as an attachment. Use this for \
                 long documents or any file the user asks for."
            }
        }
    }

    /// JSON Schema for the tool's parameters.
    pub fn input_schema(self) -> Value {
        match self {
            ToolKind::ReadFile => json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path relative to the workspace root (e.g. 'state/goals.md')"
                    }
                },
                "required": ["path"]
            }),
            ToolKind::WriteFile => json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path relative to the workspace root"
                    },
                    "content": {
                        "type": "string",
                        "description": "The content to write"
                    }
                },
                "required": ["path", "content"]
            }),
            ToolKind::AppendFile => json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path relative to the workspace root"
                    },
                    "content": {
                        "type": "string",
                        "description": "The content to append"
                    }
                },
                "required": ["path", "content"]
            }),
            ToolKind::SearchFiles => json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query, matched against file names and content"
                    },
                    "file_pattern": {
                        "type": "string",
                        "description": "Optional glob to filter files (e.g. '*.md', 'content/**/*.md')",
                        "default": "**/*.md"
                    }
                },
                "required": ["query"]
            }),
            ToolKind::ListDirectory => json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Directory path relative to the workspace root",
                        "default": "."
                    }
                },
                "required": []
            }),
            ToolKind::FetchUrl => json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "The URL to fetch content from"
                    }
                },
                "required": ["url"]
            }),
            ToolKind::SendFile => json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path relative to the workspace root"
                    },
                    "caption": {
                        "type": "string",
                        "description": "Optional caption to include with the file",
                        "default": ""
                    }
                },
                "required": ["path"]
            }),
        }
    }

    /// Catalog entry sent to the model.
    pub fn definition(self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.input_schema())
    }
}

/// The full catalog, in declaration order.
pub fn catalog() -> Vec<ToolDefinition> {
    ToolKind::ALL.iter().map(|k| k.definition()).collect()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trips_for_every_tool() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(ToolKind::from_name("exec"), None);
        assert_eq!(ToolKind::from_name(""), None);
        assert_eq!(ToolKind::from_name("READ_FILE"), None);
    }

    #[test]
    fn catalog_matches_declared_order() {
        let binding = catalog();
        let names: Vec<&str> = binding.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "read_file",
                "write_file",
                "append_to_file",
                "search_files",
                "list_directory",
                "fetch_url",
                "send_file",
            ]
        );
    }

    #[test]
    fn schemas_are_objects_with_properties() {
        for def in catalog() {
            assert_eq!(def.input_schema["type"], "object");
            assert!(def.input_schema["properties"].is_object(), "{}", def.name);
            assert!(def.input_schema["required"].is_array(), "{}", def.name);
            assert!(!def.description.is_empty());
        }
    }

    #[test]
    fn required_parameters_are_declared() {
        let read = ToolKind::ReadFile.input_schema();
        assert_eq!(read["required"][0], "path");

        let write = ToolKind::WriteFile.input_schema();
        let required: Vec<&str> = write["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, vec!["path", "content"]);

        let send = ToolKind::SendFile.input_schema();
        assert_eq!(send["required"].as_array().unwrap().len(), 1);
    }
}
