//! Cactus Collector Common Library
//!
//! CLIとストレージ実装で共有される型と純粋ロジック

pub mod types;
pub mod error;
pub mod prompts;
pub mod parser;
pub mod ranking;
pub mod table;
pub mod link;

pub use types::{Extraction, Record, RecordPatch};
pub use error::{Error, Result};
pub use prompts::{EXTRACTION_PROMPT, SMOKE_TEST_PROMPT};
pub use parser::{extract_json, parse_extraction};
pub use ranking::{rank_models, ModelInfo, RankPolicy};
pub use table::{pad_row, COLUMNS, COLUMN_COUNT, HEADER_ROWS};
pub use link::{blob_file_name, repair_image_link, LinkBase};
