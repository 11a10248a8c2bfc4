//! Naming rules for filed screenshots.

use chrono::{DateTime, Utc};
use url::Url;

/// Directory names that say nothing about the project.
const GENERIC_DIRS: [&str; 8] = [
    "src", "app", "client", "server", "frontend", "backend", "build", "dist",
];

const MAX_DIR_NAME: usize = 50;
const MAX_FILE_NAME: usize = 100;

/// Strip a `data:image/<mime>;base64,` prefix, if any.
pub fn clean_base64(data: &str) -> &str {
    data.strip_prefix("data:image/")
        .and_then(|rest| rest.split_once(";base64,"))
        .filter(|(mime, _)| !mime.is_empty() && !mime.contains(';'))
        .map(|(_, payload)| payload)
        .unwrap_or(data)
}

fn is_unsafe(c: char) -> bool {
    c.is_whitespace() || "/\\?%*:|\"<>#&+=".contains(c)
}

/// Replace unsafe characters with `sep`, collapse runs and trim the ends.
fn replace_unsafe(name: &str, sep: char) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if is_unsafe(c) { sep } else { c };
        if c == sep && out.ends_with(sep) {
            continue;
        }
        out.push(c);
    }
    out.trim_matches(sep).to_string()
}

pub fn sanitize_directory_name(name: &str) -> String {
    replace_unsafe(name, '-')
        .to_lowercase()
        .chars()
        .take(MAX_DIR_NAME)
        .collect()
}

pub fn sanitize_filename(name: &str) -> String {
    replace_unsafe(name, '_').chars().take(MAX_FILE_NAME).collect()
}

fn path_segments(url: &Url) -> Vec<&str> {
    url.path().split('/').filter(|s| !s.is_empty()).collect()
}

fn first_segment_category(url: &Url) -> String {
    path_segments(url)
        .first()
        .map(|segment| sanitize_directory_name(segment))
        .unwrap_or_else(|| "home".to_string())
}

/// Sub-folder for a screenshot of `url`.
pub fn url_category(url: Option<&str>) -> String {
    let Some(raw) = url.filter(|u| !u.is_empty() && *u != "about:blank") else {
        return "general".to_string();
    };
    let Ok(parsed) = Url::parse(raw) else {
        return "uncategorized".to_string();
    };

    let host = parsed.host_str().unwrap_or_default();
    if host == "localhost" || host == "127.0.0.1" {
        first_segment_category(&parsed)
    } else if host.contains("staging") || host.contains("dev") {
        format!("staging/{}", first_segment_category(&parsed))
    } else {
        format!("production/{}", first_segment_category(&parsed))
    }
}

fn url_based_name(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return "page".to_string();
    };
    match path_segments(&parsed).as_slice() {
        [] => "homepage".to_string(),
        [only] => sanitize_filename(only),
        [.., prev, last] => sanitize_filename(&format!("{prev}-{last}")),
    }
}

/// `<timestamp>_<name>.png`, where the timestamp is ISO 8601 with `:` and `.`
/// replaced by `-`.
pub fn screenshot_filename(url: Option<&str>, custom: Option<&str>, now: DateTime<Utc>) -> String {
    let timestamp = now
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-");

    let name = match (custom.map(str::trim).filter(|c| !c.is_empty()), url) {
        (Some(custom), _) => sanitize_filename(custom),
        (None, Some(url)) => url_based_name(url),
        (None, None) => "screenshot".to_string(),
    };
    format!("{timestamp}_{name}.png")
}

/// Project name from a cwd basename, falling back to its parent when the
/// basename is generic.
pub fn project_from_dir(dir_name: &str, parent_name: Option<&str>) -> Option<String> {
    let is_generic = |name: &str| GENERIC_DIRS.contains(&name.to_lowercase().as_str());
    if !is_generic(dir_name) {
        return Some(dir_name.to_string()).filter(|n| !n.is_empty());
    }
    parent_name
        .filter(|p| !p.is_empty() && !is_generic(p))
        .map(str::to_string)
}

/// Repository name from a git remote URL.
pub fn repo_name_from_remote(remote: &str) -> Option<String> {
    let trimmed = remote.trim();
    let (_, tail) = trimmed.rsplit_once('/')?;
    let name = tail.strip_suffix(".git").unwrap_or(tail);
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap()
    }

    #[test]
    fn test_clean_base64() {
        assert_eq!(clean_base64("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(clean_base64("data:image/svg+xml;base64,PHN2"), "PHN2");
        assert_eq!(clean_base64("AAAA"), "AAAA");
        assert_eq!(clean_base64("data:text/plain;base64,AAAA"), "data:text/plain;base64,AAAA");
    }

    #[test]
    fn test_sanitize_directory_name() {
        assert_eq!(sanitize_directory_name("My Project: v2"), "my-project-v2");
        assert_eq!(sanitize_directory_name("--a//b--"), "a-b");
        assert_eq!(sanitize_directory_name(&"x".repeat(80)).len(), 50);
    }

    #[test]
    fn test_sanitize_filename_keeps_case() {
        assert_eq!(sanitize_filename("Login Page?"), "Login_Page");
        assert_eq!(sanitize_filename("a  b"), "a_b");
        assert_eq!(sanitize_filename(&"y".repeat(150)).len(), 100);
    }

    #[test]
    fn test_url_category() {
        assert_eq!(url_category(None), "general");
        assert_eq!(url_category(Some("about:blank")), "general");
        assert_eq!(url_category(Some("http://localhost:3000/")), "home");
        assert_eq!(url_category(Some("http://127.0.0.1:5173/Dashboard/x")), "dashboard");
        assert_eq!(
            url_category(Some("https://staging.example.com/cart")),
            "staging/cart"
        );
        assert_eq!(url_category(Some("https://dev.example.com/")), "staging/home");
        assert_eq!(
            url_category(Some("https://www.example.com/blog/post")),
            "production/blog"
        );
        assert_eq!(url_category(Some("not a url")), "uncategorized");
    }

    #[test]
    fn test_screenshot_filename() {
        let now = fixed_now();
        assert_eq!(
            screenshot_filename(None, None, now),
            "2025-03-04T05-06-07-000Z_screenshot.png"
        );
        assert_eq!(
            screenshot_filename(Some("http://localhost:3000/"), None, now),
            "2025-03-04T05-06-07-000Z_homepage.png"
        );
        assert_eq!(
            screenshot_filename(Some("http://localhost:3000/users/42/edit"), None, now),
            "2025-03-04T05-06-07-000Z_42-edit.png"
        );
        assert_eq!(
            screenshot_filename(Some("http://localhost/users"), Some("  checkout flow "), now),
            "2025-03-04T05-06-07-000Z_checkout_flow.png"
        );
        assert_eq!(
            screenshot_filename(Some("::"), None, now),
            "2025-03-04T05-06-07-000Z_page.png"
        );
    }

    #[test]
    fn test_project_from_dir() {
        assert_eq!(project_from_dir("shop", Some("work")), Some("shop".to_string()));
        assert_eq!(project_from_dir("frontend", Some("shop")), Some("shop".to_string()));
        assert_eq!(project_from_dir("src", Some("app")), None);
    }

    #[test]
    fn test_repo_name_from_remote() {
        assert_eq!(
            repo_name_from_remote("git@github.com:acme/shop.git\n"),
            Some("shop".to_string())
        );
        assert_eq!(
            repo_name_from_remote("https://github.com/acme/shop"),
            Some("shop".to_string())
        );
        assert_eq!(repo_name_from_remote("shop"), None);
    }
}
