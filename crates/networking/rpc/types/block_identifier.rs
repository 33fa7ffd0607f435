use std::{fmt, str::FromStr};

use serde_json::Value;

/// Block selector accepted by the `debug_getRaw*` methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockIdentifier {
    Number(u64),
    Tag(BlockTag),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockTag {
    Earliest,
    Finalized,
    Safe,
    #[default]
    Latest,
    Pending,
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            BlockTag::Earliest => "earliest",
            BlockTag::Finalized => "finalized",
            BlockTag::Safe => "safe",
            BlockTag::Latest => "latest",
            BlockTag::Pending => "pending",
        };
        write!(f, "{tag}")
    }
}

impl fmt::Display for BlockIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockIdentifier::Number(number) => write!(f, "{number:#x}"),
            BlockIdentifier::Tag(tag) => write!(f, "{tag}"),
        }
    }
}

impl From<BlockIdentifier> for Value {
    fn from(value: BlockIdentifier) -> Self {
        Value::String(value.to_string())
    }
}

impl From<u64> for BlockIdentifier {
    fn from(value: u64) -> Self {
        BlockIdentifier::Number(value)
    }
}

/// Parses a decimal or `0x` prefixed block number, or one of the block tags
impl FromStr for BlockIdentifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = match s {
            "earliest" => BlockTag::Earliest,
            "finalized" => BlockTag::Finalized,
            "safe" => BlockTag::Safe,
            "latest" => BlockTag::Latest,
            "pending" => BlockTag::Pending,
            _ => {
                let number = match s.strip_prefix("0x") {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => s.parse(),
                };
                return number
                    .map(BlockIdentifier::Number)
                    .map_err(|_| format!("invalid block identifier: {s}"));
            }
        };
        Ok(BlockIdentifier::Tag(tag))
    }
}
