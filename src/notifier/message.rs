/// Default character budget of one message
pub const MESSAGE_BUDGET: usize = 3500;

/// Render the notification text for `links`.
///
/// Lines are appended while the running length stays within `budget`
/// characters; the first line that would overflow is replaced by a
/// truncation notice. Returns `None` for an empty list.
pub fn compose_message<S: AsRef<str>>(links: &[S], budget: usize) -> Option<String> {
    if links.is_empty() {
        return None;
    }

    let mut message = format!("Found {} products:\n\n", links.len());
    let mut length = message.chars().count();

    for (i, link) in links.iter().enumerate() {
        let link = link.as_ref();
        let line = format!("{}\n", if link.is_empty() { "#" } else { link });
        let line_length = line.chars().count();

        if length + line_length > budget {
            tracing::info!("Message too long at product {}, truncating", i + 1);
            message.push_str(&truncation_notice(links.len() - i));
            break;
        }

        message.push_str(&line);
        length += line_length;
    }

    Some(message)
}

pub fn truncation_notice(omitted: usize) -> String {
    format!(
        "\n... ({} more products truncated due to message length limit)",
        omitted
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("https://www.wildberries.ru/catalog/{:09}/detail.aspx", i))
            .collect()
    }

    #[test]
    fn test_empty_list_has_no_message() {
        assert_eq!(compose_message::<String>(&[], MESSAGE_BUDGET), None);
    }

    #[test]
    fn test_short_list_lists_every_link() {
        let links = links(3);
        let message = compose_message(&links, MESSAGE_BUDGET).unwrap();
        assert!(message.starts_with("Found 3 products:\n\n"));
        for link in &links {
            assert!(message.contains(&format!("{}\n", link)));
        }
        assert!(!message.contains("truncated"));
    }

    #[test]
    fn test_long_list_is_truncated_within_budget() {
        let links = links(200);
        let message = compose_message(&links, MESSAGE_BUDGET).unwrap();

        let notice_start = message.find("\n... (").unwrap();
        assert!(notice_start <= MESSAGE_BUDGET);

        let listed = message.matches("detail.aspx").count();
        let omitted = 200 - listed;
        assert!(message.ends_with(&truncation_notice(omitted)));
        assert!(message.chars().count() <= MESSAGE_BUDGET + truncation_notice(omitted).len());
    }

    #[test]
    fn test_budget_counts_characters_not_bytes() {
        let links = vec!["ж".repeat(10)];
        // header (19 chars) + 11 chars fits exactly into 30
        let message = compose_message(&links, 30).unwrap();
        assert!(message.ends_with(&format!("{}\n", "ж".repeat(10))));

        let message = compose_message(&links, 29).unwrap();
        assert!(message.ends_with(&truncation_notice(1)));
    }

    #[test]
    fn test_empty_link_rendered_as_placeholder() {
        let message = compose_message(&[""], MESSAGE_BUDGET).unwrap();
        assert!(message.ends_with("#\n"));
    }
}
