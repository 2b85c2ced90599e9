//! 从模型回复中定位 JSON 对象。
//!
//! 评测服务经常在 JSON 外包裹说明文字或 Markdown 代码块，
//! 这里按括号平衡扫描候选片段，只保留能解析为 JSON 对象的部分。

use serde_json::Value;

/// 返回 `text` 中所有可解析为 JSON 对象的片段，按出现顺序排列。
/// 外层片段解析成功后不再返回其内部嵌套的对象。
pub fn json_object_candidates(text: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find('{') {
        let start = cursor + offset;
        if let Some(len) = balanced_end(&text[start..]) {
            let candidate = &text[start..start + len];
            if matches!(serde_json::from_str::<Value>(candidate), Ok(Value::Object(_))) {
                candidates.push(candidate);
                cursor = start + len;
                continue;
            }
        }
        cursor = start + 1;
    }

    candidates
}

/// `text` 以 `{` 开头，返回与之配对的 `}` 之后的字节长度。
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}
