//! Tool-call parsing: content-fallback detection (§4.4) and argument/name
//! repair (§4.5).

mod content_parser;
mod repair;

pub use content_parser::{parse_tool_calls_from_content, ContentParseResult, ParsedToolCall};
pub use repair::{repair_arguments, split_tool_names};
