#![forbid(unsafe_code)]

//! Character escaping shared by canonicalization and the element builder.
//!
//! Both follow the C14N rules, so markup produced by the builder is
//! already in canonical escaped form:
//! - Text: `&` `<` `>` and `\r`
//! - Attribute values: `&` `<` `"` `\t` `\n` and `\r`
//! - PI data: `\r`

/// Append `s` to `out`, escaped as text node content.
pub fn push_text(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
}

/// Append `s` to `out`, escaped as an attribute value.
pub fn push_attr(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
}

pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    push_text(&mut out, s);
    out
}

pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    push_attr(&mut out, s);
    out
}

/// Escape processing instruction data.
pub fn escape_pi(s: &str) -> String {
    s.replace('\r', "&#xD;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("plain"), "plain");
        assert_eq!(escape_text("a&b<c>d"), "a&amp;b&lt;c&gt;d");
        assert_eq!(escape_text("quote \" stays"), "quote \" stays");
        assert_eq!(escape_text("cr\r"), "cr&#xD;");
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr("x>y"), "x>y");
        assert_eq!(escape_attr("a&\"b"), "a&amp;&quot;b");
        assert_eq!(escape_attr("\t\n\r"), "&#x9;&#xA;&#xD;");
    }

    #[test]
    fn test_push_appends() {
        let mut out = String::from("<a>");
        push_text(&mut out, "1 < 2");
        assert_eq!(out, "<a>1 &lt; 2");
    }
}
