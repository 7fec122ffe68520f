//! Finding a session token on an inbound request.

use std::fmt;

/// The parts of a request the gate reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestParts<'a> {
    pub path: &'a str,
    /// Raw `Cookie` header value.
    pub cookie_header: Option<&'a str>,
    /// Raw `Authorization` header value.
    pub authorization: Option<&'a str>,
}

impl<'a> RequestParts<'a> {
    pub fn new(path: &'a str) -> Self {
        Self {
            path,
            cookie_header: None,
            authorization: None,
        }
    }

    #[must_use]
    pub fn with_cookie_header(mut self, cookie_header: &'a str) -> Self {
        self.cookie_header = Some(cookie_header);
        self
    }

    #[must_use]
    pub fn with_authorization(mut self, authorization: &'a str) -> Self {
        self.authorization = Some(authorization);
        self
    }
}

/// Where a token was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenChannel {
    Cookie,
    BearerHeader,
}

impl TokenChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenChannel::Cookie => "cookie",
            TokenChannel::BearerHeader => "bearer",
        }
    }
}

impl fmt::Display for TokenChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate token and its channel. Not yet verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedToken<'a> {
    pub token: &'a str,
    pub channel: TokenChannel,
}

/// One way of pulling a token off a request.
pub trait TokenExtractor: Send + Sync {
    fn channel(&self) -> TokenChannel;

    /// Return a non-empty candidate, or `None`.
    fn extract<'a>(&self, req: &RequestParts<'a>) -> Option<&'a str>;
}

/// Reads a named cookie from the `Cookie` header.
#[derive(Debug, Clone)]
pub struct CookieExtractor {
    name: String,
}

impl CookieExtractor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TokenExtractor for CookieExtractor {
    fn channel(&self) -> TokenChannel {
        TokenChannel::Cookie
    }

    fn extract<'a>(&self, req: &RequestParts<'a>) -> Option<&'a str> {
        let header = req.cookie_header?;
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| k.trim() == self.name)
            .map(|(_, v)| v.trim().trim_matches('"'))
            .filter(|v| !v.is_empty())
    }
}

/// Reads `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Default)]
pub struct BearerExtractor;

impl TokenExtractor for BearerExtractor {
    fn channel(&self) -> TokenChannel {
        TokenChannel::BearerHeader
    }

    fn extract<'a>(&self, req: &RequestParts<'a>) -> Option<&'a str> {
        req.authorization?
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Tries extractors in order and stops at the first hit.
pub struct TokenLocator {
    extractors: Vec<Box<dyn TokenExtractor>>,
}

impl fmt::Debug for TokenLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels: Vec<_> = self.extractors.iter().map(|e| e.channel()).collect();
        f.debug_struct("TokenLocator")
            .field("channels", &channels)
            .finish()
    }
}

impl TokenLocator {
    /// Cookie `cookie_name` first, then the bearer header.
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self::with_extractors(vec![
            Box::new(CookieExtractor::new(cookie_name)),
            Box::new(BearerExtractor),
        ])
    }

    /// Header only. Used by API endpoints.
    pub fn bearer_only() -> Self {
        Self::with_extractors(vec![Box::new(BearerExtractor)])
    }

    pub fn with_extractors(extractors: Vec<Box<dyn TokenExtractor>>) -> Self {
        Self { extractors }
    }

    pub fn locate<'a>(&self, req: &RequestParts<'a>) -> Option<LocatedToken<'a>> {
        self.extractors.iter().find_map(|e| {
            e.extract(req).map(|token| LocatedToken {
                token,
                channel: e.channel(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_wins_over_header() {
        let locator = TokenLocator::new("auth_token");
        let req = RequestParts::new("/")
            .with_cookie_header("theme=dark; auth_token=from-cookie")
            .with_authorization("Bearer from-header");
        assert_eq!(
            locator.locate(&req),
            Some(LocatedToken {
                token: "from-cookie",
                channel: TokenChannel::Cookie
            })
        );
    }

    #[test]
    fn header_is_the_fallback() {
        let locator = TokenLocator::new("auth_token");
        let req = RequestParts::new("/")
            .with_cookie_header("theme=dark")
            .with_authorization("Bearer from-header");
        let found = locator.locate(&req).unwrap();
        assert_eq!(found.token, "from-header");
        assert_eq!(found.channel, TokenChannel::BearerHeader);
    }

    #[test]
    fn empty_cookie_falls_through_to_header() {
        let locator = TokenLocator::new("auth_token");
        let req = RequestParts::new("/")
            .with_cookie_header("auth_token=")
            .with_authorization("Bearer h");
        assert_eq!(locator.locate(&req).unwrap().channel, TokenChannel::BearerHeader);
    }

    #[test]
    fn cookie_name_must_match_exactly() {
        let locator = TokenLocator::new("auth_token");
        let req = RequestParts::new("/").with_cookie_header("xauth_token=a; auth_token_old=b");
        assert_eq!(locator.locate(&req), None);
    }

    #[test]
    fn non_bearer_headers_are_ignored() {
        let locator = TokenLocator::new("auth_token");
        for h in ["Basic dXNlcjpwYXNz", "Bearer", "Bearer    ", "bearer abc", "abc"] {
            let req = RequestParts::new("/").with_authorization(h);
            assert_eq!(locator.locate(&req), None, "{h}");
        }
    }

    #[test]
    fn bearer_only_ignores_cookie() {
        let locator = TokenLocator::bearer_only();
        let req = RequestParts::new("/api/auth/me").with_cookie_header("auth_token=c");
        assert_eq!(locator.locate(&req), None);
    }

    #[test]
    fn nothing_found() {
        assert_eq!(TokenLocator::new("auth_token").locate(&RequestParts::new("/")), None);
    }
}
