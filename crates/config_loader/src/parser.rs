//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{BridgeBlueprint, ContractError};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
///
/// Errors name the `[section]` the failing span falls in.
pub fn parse_toml(content: &str) -> Result<BridgeBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| {
        let message = match e.span() {
            Some(span) => {
                let line = content
                    .get(..span.start)
                    .map_or(1, |head| head.matches('\n').count() + 1);
                let section = toml_section_at(content, span.start);
                format!(
                    "TOML parse error{} at line {line}: {}",
                    in_section(section),
                    e.message()
                )
            }
            None => format!("TOML parse error: {}", e.message()),
        };
        ContractError::ConfigParse {
            message,
            source: Some(Box::new(e)),
        }
    })
}

/// 解析 JSON 格式配置
///
/// Errors name the top-level key the failing position falls in.
pub fn parse_json(content: &str) -> Result<BridgeBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| {
        let section = line_col_offset(content, e.line(), e.column())
            .and_then(|offset| json_section_at(content, offset));
        ContractError::ConfigParse {
            message: format!("JSON parse error{}: {e}", in_section(section)),
            source: Some(Box::new(e)),
        }
    })
}

fn in_section(section: Option<&str>) -> String {
    section.map(|name| format!(" in [{name}]")).unwrap_or_default()
}

/// Last `[table]` header starting before `offset`
fn toml_section_at(content: &str, offset: usize) -> Option<&str> {
    let mut section = None;
    let mut line_start = 0;

    for line in content.split_inclusive('\n') {
        if line_start > offset {
            break;
        }
        let trimmed = line.trim();
        if let Some(header) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.split(']').next())
        {
            let header = header.trim_matches(|c: char| c == '[' || c.is_whitespace());
            let is_key = header
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '"' | ' '));
            // Lines of a multi-line array also start with `[`
            if !header.is_empty() && is_key {
                // `[discord.extra]` reports as `discord`
                section = header.split('.').next();
            }
        }
        line_start += line.len();
    }
    section
}

/// Byte offset of a 1-based line and column
fn line_col_offset(content: &str, line: usize, column: usize) -> Option<usize> {
    if line == 0 {
        return None;
    }
    let line_start: usize = content
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();
    Some((line_start + column.saturating_sub(1)).min(content.len()))
}

/// Top-level object key whose value encloses `offset`
fn json_section_at(content: &str, offset: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut string_start = 0;
    let mut last_string: Option<&str> = None;
    let mut section = None;

    for (idx, ch) in content.char_indices() {
        if idx >= offset {
            break;
        }
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => {
                    in_string = false;
                    last_string = Some(&content[string_start..idx]);
                }
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                string_start = idx + 1;
            }
            ':' if depth == 1 => section = last_string,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    section = None;
                }
            }
            ',' if depth == 1 => section = None,
            _ => {}
        }
    }
    section
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<BridgeBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}
