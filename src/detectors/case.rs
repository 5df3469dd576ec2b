//! Identifier case conversion shared by the naming detectors and the fixer

/// userName -> user_name, HTTPServer -> http_server, getUserID -> get_user_id
///
/// Leading underscores are preserved.
pub fn to_snake_case(name: &str) -> String {
    let body = name.trim_start_matches('_');
    let prefix = &name[..name.len() - body.len()];

    let chars: Vec<char> = body.chars().collect();
    let mut result = String::with_capacity(body.len() + 4);

    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            // Separate when the previous char is lowercase/digit (userName),
            // or at the end of an acronym (HTTPServer -> http_server)
            let prev_is_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let is_acronym_end = i > 0
                && chars[i - 1].is_uppercase()
                && i + 1 < chars.len()
                && chars[i + 1].is_lowercase();

            if (prev_is_lower || is_acronym_end) && !result.ends_with('_') {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(*c);
        }
    }

    format!("{}{}", prefix, result)
}

/// user_profile -> UserProfile, userProfile -> UserProfile
///
/// Leading underscores are preserved.
pub fn to_pascal_case(name: &str) -> String {
    let body = name.trim_start_matches('_');
    let prefix = &name[..name.len() - body.len()];

    let mut result = String::with_capacity(body.len());
    for part in body.split('_').filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(chars.as_str());
        }
    }

    format!("{}{}", prefix, result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("userName"), "user_name");
        assert_eq!(to_snake_case("UserName"), "user_name");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("getUserID"), "get_user_id");
        assert_eq!(to_snake_case("user2Name"), "user2_name");
        assert_eq!(to_snake_case("_privateThing"), "_private_thing");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("user_Name"), "user_name");
    }

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("user_profile"), "UserProfile");
        assert_eq!(to_pascal_case("userProfile"), "UserProfile");
        assert_eq!(to_pascal_case("HTTP_server"), "HTTPServer");
        assert_eq!(to_pascal_case("_base_model"), "_BaseModel");
        assert_eq!(to_pascal_case("Already"), "Already");
    }
}
