use crate::models::{CATEGORIES, TECHNOLOGIES};

pub const COMMENT_MIN_LEN: usize = 5;
pub const COMMENT_MAX_LEN: usize = 500;

/// Slug is the public addressing key: lowercase ascii letters and
/// underscores only (`^[a-z_]+$`).
pub fn validate_slug(slug: &str) -> Result<(), String> {
    if slug.is_empty() {
        return Err("slug must not be empty".into());
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c == '_')
    {
        return Err("slug may only contain lowercase letters and underscores".into());
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), String> {
    let len = name.chars().count();
    if len == 0 || len > 80 {
        return Err("name must be 1-80 characters".into());
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), String> {
    let len = description.chars().count();
    if len == 0 || len > 2000 {
        return Err("description must be 1-2000 characters".into());
    }
    Ok(())
}

pub fn validate_url(url: &str) -> Result<(), String> {
    let len = url.chars().count();
    if !(10..=200).contains(&len) {
        return Err("URL must be 10-200 characters".into());
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err("URL must start with http:// or https://".into());
    }
    Ok(())
}

pub fn validate_category(category: &str) -> Result<(), String> {
    if !CATEGORIES.contains(&category) {
        return Err(format!("unknown category '{category}'"));
    }
    Ok(())
}

/// 1-10 technologies, each from the fixed vocabulary, no duplicates.
pub fn validate_built_with(built_with: &[String]) -> Result<(), String> {
    if built_with.is_empty() || built_with.len() > 10 {
        return Err("built_with must list 1-10 technologies".into());
    }
    for (i, tech) in built_with.iter().enumerate() {
        if !TECHNOLOGIES.contains(&tech.as_str()) {
            return Err(format!("unknown technology '{tech}'"));
        }
        if built_with[..i].contains(tech) {
            return Err(format!("duplicate technology '{tech}'"));
        }
    }
    Ok(())
}

pub fn validate_comment_body(body: &str) -> Result<(), String> {
    let len = body.chars().count();
    if !(COMMENT_MIN_LEN..=COMMENT_MAX_LEN).contains(&len) {
        return Err(format!(
            "comment must be {COMMENT_MIN_LEN}-{COMMENT_MAX_LEN} characters"
        ));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err("username must be 3-32 characters".into());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("password must be at least 8 characters".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_rejects_spaces_and_uppercase() {
        assert!(validate_slug("my app").is_err());
        assert!(validate_slug("MyApp").is_err());
        assert!(validate_slug("my-app").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn test_slug_accepts_lowercase_and_underscores() {
        assert!(validate_slug("my_app").is_ok());
        assert!(validate_slug("appdeck").is_ok());
    }

    #[test]
    fn test_comment_body_bounds() {
        assert!(validate_comment_body("hey!").is_err()); // 4 chars
        assert!(validate_comment_body("hey!!").is_ok()); // 5 chars
        assert!(validate_comment_body(&"x".repeat(500)).is_ok());
        assert!(validate_comment_body(&"x".repeat(501)).is_err());
    }

    #[test]
    fn test_url_rules() {
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("http://ab").is_err()); // below the 10-char minimum
        assert!(validate_url(&format!("https://{}.com", "x".repeat(200))).is_err());
    }

    #[test]
    fn test_built_with_rules() {
        let ok = vec!["rust".to_string(), "sqlite".to_string()];
        assert!(validate_built_with(&ok).is_ok());

        assert!(validate_built_with(&[]).is_err());
        assert!(validate_built_with(&vec!["rust".to_string(); 11]).is_err());
        assert!(validate_built_with(&["cobol".to_string()]).is_err());
        assert!(
            validate_built_with(&["rust".to_string(), "rust".to_string()]).is_err()
        );
    }

    #[test]
    fn test_category_allow_list() {
        assert!(validate_category("developer_tools").is_ok());
        assert!(validate_category("miscellany").is_err());
    }
}
