//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values in a
/// single pass over the template; inserted values are never scanned again.
/// Unknown `{...}` spans are copied through unchanged.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let tail = &rest[open..];
    let value = tail[1..]
      .find('}')
      .and_then(|close| pairs.iter().find(|(k, _)| *k == &tail[1..1 + close]).map(|(_, v)| (close, v)));
    match value {
      Some((close, v)) => {
        out.push_str(v);
        rest = &tail[close + 2..];
      }
      None => {
        out.push('{');
        rest = &tail[1..];
      }
    }
  }
  out.push_str(rest);
  out
}

/// Remove a markdown code fence wrapped around oracle output.
///
/// A reply that starts with a fence loses its opening marker (plus language tag)
/// and its last closing marker. A reply that starts with `{` or `[` is bare JSON
/// and is only trimmed, even if string values contain backticks. Anything else is
/// prose around a fenced block, and the first such block is taken.
pub fn strip_code_fence(raw: &str) -> &str {
  let text = raw.trim();
  if let Some(after) = text.strip_prefix("```") {
    let body = skip_fence_tag(after);
    return match body.rfind("```") {
      Some(close) => body[..close].trim(),
      None => body.trim(),
    };
  }
  if text.starts_with('{') || text.starts_with('[') {
    return text;
  }

  let Some(open) = text.find("```") else {
    return text;
  };
  let body = skip_fence_tag(&text[open + 3..]);
  match body.find("```") {
    Some(close) => body[..close].trim(),
    None => body.trim(),
  }
}

// Language tag (`json`, `JSON`, ...) directly after an opening fence.
fn skip_fence_tag(after: &str) -> &str {
  let tag_len = after.chars().take_while(|c| c.is_ascii_alphanumeric()).count();
  &after[tag_len..]
}

/// Join a list for a prompt, or the explicit "none" marker when empty.
pub fn list_or_none(items: &[String], sep: &str) -> String {
  if items.is_empty() { "none".into() } else { items.join(sep) }
}

/// Log-safe truncation for large strings.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}
