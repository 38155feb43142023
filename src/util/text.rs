/// Limit for response bodies kept on [`Error::Api`](crate::Error::Api).
pub(crate) const MAX_SNIPPET: usize = 4096;

pub(crate) fn truncate_snippet(body: &str, max_len: usize) -> String {
    if body.len() <= max_len {
        return body.to_string();
    }

    let mut cut = max_len;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }

    let mut out = String::with_capacity(cut + 3);
    out.push_str(&body[..cut]);
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_bodies_are_kept_verbatim() {
        assert_eq!(truncate_snippet("Forbidden", MAX_SNIPPET), "Forbidden");
        let body = "a".repeat(10);
        assert_eq!(truncate_snippet(&body, 10), body);
        assert_eq!(truncate_snippet(&body, 5), "aaaaa...");
    }

    #[test]
    fn truncates_on_char_boundary() {
        let body = "你好，世界".repeat(10);
        let out = truncate_snippet(&body, 5);
        assert_eq!(out, "你...");
    }
}
