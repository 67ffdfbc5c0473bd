//! Best-effort repair of streamed tool-call argument fragments.

/// Return a renderable version of a tool-call argument fragment.
///
/// Valid JSON passes through untouched. A truncated JSON document is closed
/// (open string, dangling separator, unbalanced brackets) and returned if
/// the result parses. Anything else is returned verbatim.
#[must_use]
pub fn sanitize_args(raw: &str) -> String {
    if raw.trim().is_empty() || serde_json::from_str::<serde_json::Value>(raw).is_ok() {
        return raw.to_owned();
    }
    match repair_json(raw) {
        Some(repaired) if serde_json::from_str::<serde_json::Value>(&repaired).is_ok() => repaired,
        _ => raw.to_owned(),
    }
}

/// Close whatever a truncated JSON document left open.
///
/// Returns `None` when the input is structurally broken rather than merely
/// cut short (mismatched closers, no container at all).
fn repair_json(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }

    let mut open: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in trimmed.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => open.push('}'),
            '[' => open.push(']'),
            '}' | ']' => {
                if open.pop() != Some(ch) {
                    return None;
                }
            }
            _ => {}
        }
    }

    let mut repaired = trimmed.to_owned();
    if in_string {
        if escaped {
            repaired.pop();
        }
        repaired.push('"');
    }

    loop {
        let tail = repaired.trim_end();
        if let Some(stripped) = tail.strip_suffix(',') {
            repaired = stripped.to_owned();
        } else if tail.ends_with(':') {
            repaired = format!("{tail}null");
        } else {
            repaired.truncate(tail.len());
            break;
        }
    }

    while let Some(closer) = open.pop() {
        repaired.push(closer);
    }
    Some(repaired)
}
