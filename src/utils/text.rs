/// Cuts `value` to at most `max_bytes` on a char boundary, marking the cut.
pub fn truncate_for_log(value: &str, max_bytes: usize) -> String {
    if value.len() <= max_bytes {
        return value.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(+{} bytes)", &value[..end], value.len() - end)
}
