//! Route classification.

use crate::Result;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// What kind of page a path is, as far as the gate is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Login and sign-up pages.
    PublicAuthPage,
    /// Requires a valid session.
    Protected,
    /// Anything else. Public.
    Unclassified,
}

impl RouteClass {
    pub fn as_str(self) -> &'static str {
        match self {
            RouteClass::PublicAuthPage => "public-auth-page",
            RouteClass::Protected => "protected",
            RouteClass::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for RouteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Route lists as configured. Compile with [`RouteTable::compile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouteRules {
    /// Paths under these prefixes skip the gate.
    pub excluded_prefixes: Vec<String>,
    /// Exact paths that skip the gate.
    pub excluded_exact: Vec<String>,
    /// File extensions (no dot) that skip the gate.
    pub excluded_extensions: Vec<String>,
    /// Exact login/sign-up paths.
    pub auth_pages: Vec<String>,
    /// Regexes for protected paths, tried in order.
    pub protected: Vec<String>,
}

impl Default for RouteRules {
    fn default() -> Self {
        Self {
            excluded_prefixes: vec![
                "/api/".to_string(),
                "/_next/".to_string(),
                "/static/".to_string(),
            ],
            excluded_exact: vec!["/favicon.ico".to_string()],
            excluded_extensions: ["ico", "png", "jpg", "jpeg", "svg", "gif", "webp"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            auth_pages: vec!["/login".to_string(), "/signup".to_string()],
            protected: vec!["^/dashboard(/.*)?$".to_string()],
        }
    }
}

/// Compiled, immutable route lists.
#[derive(Debug, Clone)]
pub struct RouteTable {
    excluded_prefixes: Vec<String>,
    excluded_exact: Vec<String>,
    excluded_extensions: Vec<String>,
    auth_pages: Vec<String>,
    protected: Vec<Regex>,
}

impl RouteTable {
    pub fn compile(rules: &RouteRules) -> Result<Self> {
        let protected = rules
            .protected
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            excluded_prefixes: rules.excluded_prefixes.clone(),
            excluded_exact: rules.excluded_exact.clone(),
            excluded_extensions: rules
                .excluded_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect(),
            auth_pages: rules.auth_pages.clone(),
            protected,
        })
    }

    /// Framework internals, API routes and static assets. These never reach
    /// classification.
    pub fn is_excluded(&self, path: &str) -> bool {
        let path = normalize_path(path);
        if self.excluded_exact.iter().any(|p| *p == path) {
            return true;
        }
        if self.excluded_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            return true;
        }
        extension(&path).is_some_and(|ext| self.excluded_extensions.iter().any(|e| e == ext))
    }

    /// Classify a (non-excluded) path. Auth pages are checked before
    /// protected patterns.
    pub fn classify(&self, path: &str) -> RouteClass {
        let path = normalize_path(path);
        if self.auth_pages.iter().any(|p| *p == path) {
            RouteClass::PublicAuthPage
        } else if self.protected.iter().any(|re| re.is_match(&path)) {
            RouteClass::Protected
        } else {
            RouteClass::Unclassified
        }
    }
}

/// Strip query and fragment, resolve `.` and `..` segments (RFC 3986
/// section 5.2.4, with `%2e` read as a dot) and make sure the path starts
/// with `/`. Everything the gate matches goes through here first.
pub fn normalize_path(raw: &str) -> Cow<'_, str> {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let path = &raw[..end];
    if path.starts_with('/') && !path.split('/').any(|s| is_dot(s) || is_dot_dot(s)) {
        return Cow::Borrowed(path);
    }

    let rest = path.strip_prefix('/').unwrap_or(path);
    let mut out: Vec<&str> = Vec::new();
    let mut segments = rest.split('/').peekable();
    while let Some(seg) = segments.next() {
        let last = segments.peek().is_none();
        if is_dot(seg) {
            if last {
                out.push("");
            }
        } else if is_dot_dot(seg) {
            out.pop();
            if last {
                out.push("");
            }
        } else {
            out.push(seg);
        }
    }
    Cow::Owned(format!("/{}", out.join("/")))
}

fn is_dot(seg: &str) -> bool {
    seg == "." || seg.eq_ignore_ascii_case("%2e")
}

fn is_dot_dot(seg: &str) -> bool {
    matches!(
        seg.to_ascii_lowercase().as_str(),
        ".." | ".%2e" | "%2e." | "%2e%2e"
    )
}

fn extension(path: &str) -> Option<&str> {
    let last = path.rsplit('/').next()?;
    let (stem, ext) = last.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::compile(&RouteRules::default()).unwrap()
    }

    #[test]
    fn exclusions() {
        let t = table();
        for p in [
            "/api/auth/login",
            "/_next/static/chunk.js",
            "/static/app.css",
            "/favicon.ico",
            "/images/logo.png",
            "/dashboard/hero.webp",
        ] {
            assert!(t.is_excluded(p), "{p}");
        }
        for p in ["/", "/api", "/dashboard", "/login", "/images/logo.PNG", "/.png"] {
            assert!(!t.is_excluded(p), "{p}");
        }
    }

    #[test]
    fn classification() {
        let t = table();
        assert_eq!(t.classify("/login"), RouteClass::PublicAuthPage);
        assert_eq!(t.classify("/signup"), RouteClass::PublicAuthPage);
        assert_eq!(t.classify("/dashboard"), RouteClass::Protected);
        assert_eq!(t.classify("/dashboard/"), RouteClass::Protected);
        assert_eq!(t.classify("/dashboard/leads"), RouteClass::Protected);
        assert_eq!(t.classify("/dashboardx"), RouteClass::Unclassified);
        assert_eq!(t.classify("/pricing"), RouteClass::Unclassified);
        assert_eq!(t.classify("/"), RouteClass::Unclassified);
        assert_eq!(t.classify("/login/"), RouteClass::Unclassified);
    }

    #[test]
    fn query_and_fragment_are_ignored() {
        let t = table();
        assert_eq!(t.classify("/login?redirect=%2Fdashboard"), RouteClass::PublicAuthPage);
        assert_eq!(t.classify("/dashboard#top"), RouteClass::Protected);
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("dashboard"), "/dashboard");
    }

    #[test]
    fn dot_segments_are_resolved() {
        for (raw, want) in [
            ("/api/../dashboard", "/dashboard"),
            ("/./dashboard", "/dashboard"),
            ("/static/../dashboard/leads", "/dashboard/leads"),
            ("/a/b/../../dashboard?x=1", "/dashboard"),
            ("/api/%2e%2e/dashboard", "/dashboard"),
            ("/api/%2E./dashboard", "/dashboard"),
            ("/../..", "/"),
            ("/dashboard/.", "/dashboard/"),
            ("/dashboard/leads/..", "/dashboard/"),
            ("dashboard/./leads", "/dashboard/leads"),
            ("/dashboard/", "/dashboard/"),
            ("/a..b/c.d", "/a..b/c.d"),
        ] {
            assert_eq!(normalize_path(raw), want, "{raw}");
        }
        assert!(matches!(normalize_path("/dashboard/leads"), Cow::Borrowed(_)));
    }

    #[test]
    fn traversal_cannot_reach_an_exclusion_or_dodge_a_pattern() {
        let t = table();
        for p in ["/api/../dashboard", "/static/../dashboard/leads", "/_next/../dashboard"] {
            assert!(!t.is_excluded(p), "{p}");
            assert_eq!(t.classify(p), RouteClass::Protected, "{p}");
        }
        assert_eq!(t.classify("/./dashboard"), RouteClass::Protected);
        assert_eq!(t.classify("/dashboard/../login"), RouteClass::PublicAuthPage);
        assert!(t.is_excluded("/dashboard/../api/leads"));
    }

    #[test]
    fn auth_page_wins_over_protected_pattern() {
        let rules = RouteRules {
            protected: vec!["^/.*$".to_string()],
            ..RouteRules::default()
        };
        let t = RouteTable::compile(&rules).unwrap();
        assert_eq!(t.classify("/login"), RouteClass::PublicAuthPage);
        assert_eq!(t.classify("/anything"), RouteClass::Protected);
    }

    #[test]
    fn bad_pattern_fails_to_compile() {
        let rules = RouteRules {
            protected: vec!["^/dashboard(".to_string()],
            ..RouteRules::default()
        };
        assert!(matches!(RouteTable::compile(&rules), Err(crate::Error::Pattern(_))));
    }
}
