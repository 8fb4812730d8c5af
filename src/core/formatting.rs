// Display formatting for user projections

use crate::models::AuthorProfile;

/// Upper-case the first letter of each space-separated word, lower-case the rest.
pub fn capitalize_name(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// first + last > first > last > username > "User"
pub fn display_name(author: Option<&AuthorProfile>) -> String {
    let Some(author) = author else {
        return "User".to_string();
    };

    match (non_empty(&author.first_name), non_empty(&author.last_name)) {
        (Some(first), Some(last)) => format!("{} {}", capitalize_name(first), capitalize_name(last)),
        (Some(first), None) => capitalize_name(first),
        (None, Some(last)) => capitalize_name(last),
        (None, None) => match non_empty(&author.username) {
            Some(username) => capitalize_name(username),
            None => "User".to_string(),
        },
    }
}

pub fn handle(author: Option<&AuthorProfile>) -> String {
    match author.and_then(|a| non_empty(&a.username)) {
        Some(username) => format!("@{}", username),
        None => "@user".to_string(),
    }
}

pub fn avatar_url(author: Option<&AuthorProfile>) -> String {
    author
        .and_then(|a| a.avatar_url.as_deref())
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .unwrap_or_default()
}
