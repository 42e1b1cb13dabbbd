//! Extraction of `host:port` candidates from fetched proxy list pages.

use crate::proxy::ProxyAddress;

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

struct Patterns {
    line_break_tags: Regex,
    any_tag: Regex,
    blank_lines: Regex,
    host_space_port: Regex,
    host_colon_port: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        line_break_tags: Regex::new(r"(?i)<\s*/?\s*(?:p|br|li)\b[^>]*>").unwrap(),
        any_tag: Regex::new(r"<[^>]*>").unwrap(),
        blank_lines: Regex::new(r"(?:\r?\n){2,}").unwrap(),
        // The trailing group keeps `a.b\n1.2.3.4:80` from joining `a.b` with the `1`.
        host_space_port: Regex::new(
            r"([A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)+)\s+(\d{1,5})([^0-9A-Za-z.:-]|$)",
        )
        .unwrap(),
        host_colon_port: Regex::new(r"([A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)+):(\d{1,5})\b").unwrap(),
    })
}

/// Parse raw list content, plain text or HTML, into unique proxy addresses.
///
/// Entries written as `host port` are accepted as well as `host:port`. Ports
/// outside `1..=65535` are dropped. An empty set is a valid result.
pub fn parse_proxy_list(content: &str) -> HashSet<ProxyAddress> {
    let p = patterns();

    let text = p.line_break_tags.replace_all(content, "\n");
    let text = p.any_tag.replace_all(&text, "");
    let text = p.blank_lines.replace_all(&text, "\n");
    let text = p.host_space_port.replace_all(&text, "${1}:${2}\n${3}");

    p.host_colon_port
        .captures_iter(&text)
        .filter_map(|caps| {
            let port: u32 = caps[2].parse().ok()?;
            let port = u16::try_from(port).ok()?;
            ProxyAddress::new(&caps[1], port).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addrs(content: &str) -> Vec<String> {
        let mut out: Vec<String> = parse_proxy_list(content)
            .into_iter()
            .map(|a| a.to_string())
            .collect();
        out.sort();
        out
    }

    #[test]
    fn br_separated_and_space_separated() {
        assert_eq!(
            addrs("1.2.3.4:8080<br>proxy.example.com  3128"),
            vec!["1.2.3.4:8080", "proxy.example.com:3128"]
        );
    }

    #[test]
    fn plain_text_list_with_duplicates() {
        let content = "10.0.0.1:80\n10.0.0.2:8080\r\n\r\n10.0.0.1:80\n";
        assert_eq!(addrs(content), vec!["10.0.0.1:80", "10.0.0.2:8080"]);
    }

    #[test]
    fn html_list_items_and_paragraphs() {
        let content = r#"<html><body><UL><LI class="x">9.8.7.6:1080</li>
            <li><b>host-a.example.org</b>:8000</LI><P>11.22.33.44	3128</p><br/></ul>
            </body></html>"#;
        assert_eq!(
            addrs(content),
            vec!["11.22.33.44:3128", "9.8.7.6:1080", "host-a.example.org:8000"]
        );
    }

    #[test]
    fn table_cells_on_separate_lines() {
        assert_eq!(
            addrs("<table><tr><td>1.2.3.4</td>\n<td>8080</td></tr></table>"),
            vec!["1.2.3.4:8080"]
        );
        let content = "<table>\n<tr>\n<td>10.1.1.1</td>\n<td>3128</td>\n<td>US</td>\n</tr>\n\
                       <tr>\n<td>gate.example.net</td>\n<td>80</td>\n</tr>\n</table>";
        assert_eq!(addrs(content), vec!["10.1.1.1:3128", "gate.example.net:80"]);
    }

    #[test]
    fn hostname_line_does_not_swallow_next_address() {
        assert_eq!(addrs("see example.com\n1.2.3.4:80"), vec!["1.2.3.4:80"]);
    }

    #[test]
    fn out_of_range_ports_are_rejected() {
        let found = addrs("host:99999\n1.2.3.4:99999\n5.6.7.8:0\n1.2.3.4:123456\n9.9.9.9:65535");
        assert_eq!(found, vec!["9.9.9.9:65535"]);
    }

    #[test]
    fn no_candidates_is_empty_not_error() {
        assert!(parse_proxy_list("").is_empty());
        assert!(parse_proxy_list("<html><p>nothing to see</p></html>").is_empty());
    }
}
