mod macros;
mod once;

pub use macros::*;
pub use once::*;

use std::path::{Path, PathBuf, Component};

/// Convert spaces to hyphens. Remove characters that aren't alphanumerics,
/// underscores, or hyphens. Convert to lowercase. Also strip leading and
/// trailing whitespace.
pub fn slugify(string: &str) -> String {
    let mut output = String::with_capacity(string.len());

    let mut need_dash = false;
    for ch in string.chars() {
        for b in deunicode::deunicode_char(ch).unwrap_or("-").bytes() {
            match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => {
                    if need_dash {
                        output.push('-');
                        need_dash = false;
                    }

                    output.push(b.to_ascii_lowercase() as char);
                }
                _ => need_dash = !output.is_empty(),
            }
        }
    }

    output
}

/// Turns a slug or file name into a display title: separators become spaces
/// and the first letter is capitalized.
///
/// ```
/// use canopy::util::titleize;
///
/// assert_eq!(titleize("my-first_post"), "My first post");
/// assert_eq!(titleize("news"), "News");
/// assert_eq!(titleize("--"), "");
/// ```
pub fn titleize(slug: &str) -> String {
    let words: Vec<&str> = slug.split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .collect();

    let joined = words.join(" ");
    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Returns the path of `path` relative to `root`, or `None` if `path` does
/// not lie within `root`.
///
/// Both paths are normalized lexically first: `.` components are dropped and
/// `..` components pop their parent. A path that climbs out of `root`, or a
/// pair of paths where only one is absolute, has no common ancestor with
/// `root`.
///
/// ```
/// use std::path::Path;
/// use canopy::util::relative_path;
///
/// assert_eq!(relative_path("/site/blog/a.md", "/site"), Some("blog/a.md".into()));
/// assert_eq!(relative_path("/site/./blog/../news", "/site/"), Some("news".into()));
/// assert_eq!(relative_path("/site", "/site"), Some("".into()));
///
/// assert_eq!(relative_path("/elsewhere/a.md", "/site"), None);
/// assert_eq!(relative_path("/site/../x", "/site"), None);
/// assert_eq!(relative_path("site/a", "/site"), None);
/// assert!(relative_path(Path::new("a/b"), Path::new("a")).is_some());
/// ```
pub fn relative_path<P, R>(path: P, root: R) -> Option<PathBuf>
    where P: AsRef<Path>, R: AsRef<Path>
{
    fn normalize(path: &Path) -> Option<Vec<Component<'_>>> {
        let mut parts = vec![];
        for component in path.components() {
            match component {
                Component::CurDir => continue,
                Component::ParentDir => match parts.last() {
                    Some(Component::Normal(_)) => { parts.pop(); },
                    _ => return None,
                },
                c => parts.push(c),
            }
        }

        Some(parts)
    }

    let (path, root) = (path.as_ref(), root.as_ref());
    if path.has_root() != root.has_root() {
        return None;
    }

    let path = normalize(path)?;
    let root = normalize(root)?;
    if path.len() < root.len() || path[..root.len()] != root[..] {
        return None;
    }

    Some(path[root.len()..].iter().map(|c| c.as_os_str()).collect())
}

#[cfg(test)]
mod slug_tests {
    use crate::util::{slugify, titleize};

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Test String!!!1!1"), "my-test-string-1-1");
        assert_eq!(slugify("test\nit   now!"), "test-it-now");
        assert_eq!(slugify("  --test_-_cool- -  "), "test_-_cool");
        assert_eq!(slugify("Æúű--cool?"), "aeuu-cool");
        assert_eq!(slugify("You & Me"), "you-me");
    }

    #[test]
    fn test_slug_round_trips_to_title() {
        assert_eq!(titleize(&slugify("Hello, World")), "Hello world");
        assert_eq!(titleize("élan-vital"), "Élan vital");
    }
}
