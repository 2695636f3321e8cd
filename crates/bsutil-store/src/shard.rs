use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Descriptor prefix written to the `SHARDING` file.
pub const SHARD_PREFIX: &str = "/repo/flatfs/shard/v1/";

/// Longest shard length accepted when parsing a descriptor.
pub const MAX_SHARD_LEN: usize = 16;

/// Function mapping a key to the name of the directory that holds it.
///
/// Short keys are padded with `_` so every shard name has exactly the
/// configured length. The descriptor format (`/repo/flatfs/shard/v1/<name>/<n>`)
/// matches flatfs stores created by other tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ShardFunc {
    /// The first `n` characters of the key.
    Prefix(usize),
    /// The last `n` characters of the key.
    Suffix(usize),
    /// The `n` characters preceding the last character of the key.
    NextToLast(usize),
}

impl ShardFunc {
    /// Default sharding for new stores.
    pub const DEFAULT: Self = Self::NextToLast(3);

    /// Name of the shard directory for `key`.
    pub fn shard_dir(&self, key: &str) -> String {
        match *self {
            Self::Prefix(n) => {
                let padded = format!("{key}{}", "_".repeat(n));
                padded[..n].to_string()
            }
            Self::Suffix(n) => {
                let padded = format!("{}{key}", "_".repeat(n));
                padded[padded.len() - n..].to_string()
            }
            Self::NextToLast(n) => {
                let padded = format!("{}{key}", "_".repeat(n + 1));
                let offset = padded.len() - n - 1;
                padded[offset..offset + n].to_string()
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Prefix(_) => "prefix",
            Self::Suffix(_) => "suffix",
            Self::NextToLast(_) => "next-to-last",
        }
    }

    /// Shard name length.
    pub fn width(&self) -> usize {
        match *self {
            Self::Prefix(n) | Self::Suffix(n) | Self::NextToLast(n) => n,
        }
    }

    /// Short form, e.g. `next-to-last/3`.
    pub fn short_form(&self) -> String {
        format!("{}/{}", self.name(), self.width())
    }

    /// Full descriptor as stored in the `SHARDING` file.
    pub fn descriptor(&self) -> String {
        format!("{SHARD_PREFIX}{}", self.short_form())
    }

    /// Parse either the full descriptor or the short form.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        let trimmed = s.trim();
        let short = trimmed.strip_prefix(SHARD_PREFIX).unwrap_or(trimmed);
        let invalid = || StoreError::InvalidShardFunc(trimmed.to_string());

        let (name, param) = short.split_once('/').ok_or_else(invalid)?;
        let n: usize = param.parse().map_err(|_| invalid())?;
        if n == 0 || n > MAX_SHARD_LEN {
            return Err(invalid());
        }
        match name {
            "prefix" => Ok(Self::Prefix(n)),
            "suffix" => Ok(Self::Suffix(n)),
            "next-to-last" => Ok(Self::NextToLast(n)),
            _ => Err(invalid()),
        }
    }
}

impl Default for ShardFunc {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ShardFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor())
    }
}

impl FromStr for ShardFunc {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ShardFunc {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShardFunc> for String {
    fn from(shard: ShardFunc) -> Self {
        shard.short_form()
    }
}
