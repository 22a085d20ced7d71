//! URL canonicalization under a site-wide rewrite policy.
//!
//! Only URLs pointing at the exported site's own domain are rewritten; the
//! path, query and fragment are always carried over byte for byte. Applying
//! [`Canonicalizer::canonicalize`] twice yields the same string as applying
//! it once.

use serde::Deserialize;
use url::{Host, Url};

/// How links to the exported site are rewritten.
///
/// Each setting is tri-state: `None` leaves the URL as found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct UrlPolicy {
    /// `Some(true)` forces `https`, `Some(false)` forces `http`.
    #[serde(default)]
    pub https: Option<bool>,
    /// `Some(true)` keeps the site host (e.g. `www.`),
    /// `Some(false)` drops it in favour of the bare domain.
    #[serde(default)]
    pub www: Option<bool>,
}

/// Host context derived from the channel `<link>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteContext {
    host: String,
    domain: String,
}

impl SiteContext {
    /// Derive the context from an absolute site URL.
    ///
    /// Returns `None` when the URL has no DNS host (IP literals included).
    pub fn from_link(link: &str) -> Option<Self> {
        let parsed = Url::parse(link.trim()).ok()?;
        match parsed.host()? {
            Host::Domain(host) => Self::from_host(host),
            _ => None,
        }
    }

    /// The base domain is the host minus its leftmost label. Two-label hosts
    /// (`example.com`) are their own base domain.
    pub fn from_host(host: &str) -> Option<Self> {
        let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
        if host.is_empty() || !host.contains('.') {
            return None;
        }
        let labels: Vec<&str> = host.split('.').collect();
        let domain = if labels.len() >= 3 {
            labels[1..].join(".")
        } else {
            host.clone()
        };
        Some(Self { host, domain })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// True if `host` is the base domain or any subdomain of it.
    pub fn owns(&self, host: &str) -> bool {
        host == self.domain
            || host
                .strip_suffix(self.domain.as_str())
                .is_some_and(|rest| rest.ends_with('.'))
    }
}

/// Raw split of a URL string into its components without any normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlParts<'a> {
    pub scheme: Option<&'a str>,
    pub authority: Option<&'a str>,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub fragment: Option<&'a str>,
}

impl<'a> UrlParts<'a> {
    pub fn split(url: &'a str) -> Self {
        let (rest, fragment) = match url.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (url, None),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Some(query)),
            None => (rest, None),
        };
        let (scheme, authority, path) = match rest.find("://") {
            Some(i) if is_scheme(&rest[..i]) => {
                let after = &rest[i + 3..];
                // http(s) parsers also end the authority at a backslash.
                let end = after.find(['/', '\\']).unwrap_or(after.len());
                (Some(&rest[..i]), Some(&after[..end]), &after[end..])
            }
            _ => (None, None, rest),
        };
        Self {
            scheme,
            authority,
            path,
            query,
            fragment,
        }
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Rewrites links according to a [`UrlPolicy`] and the site's host context.
#[derive(Debug, Clone, Default)]
pub struct Canonicalizer {
    site: Option<SiteContext>,
    policy: UrlPolicy,
}

impl Canonicalizer {
    pub fn new(site: Option<SiteContext>, policy: UrlPolicy) -> Self {
        Self { site, policy }
    }

    pub fn site(&self) -> Option<&SiteContext> {
        self.site.as_ref()
    }

    pub fn policy(&self) -> UrlPolicy {
        self.policy
    }

    /// Canonicalize one URL.
    ///
    /// - `"#"` becomes `""`.
    /// - Relative URLs, non-http(s) schemes and hostless URLs pass through.
    /// - Without a site context every URL passes through.
    pub fn canonicalize(&self, url: &str) -> String {
        if url == "#" {
            return String::new();
        }
        self.rewrite(url).unwrap_or_else(|| url.to_string())
    }

    fn rewrite(&self, url: &str) -> Option<String> {
        let site = self.site.as_ref()?;
        let parsed = Url::parse(url).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        let host = match parsed.host()? {
            Host::Domain(host) => host,
            _ => return None,
        };
        if !site.owns(host) {
            return None;
        }

        let scheme = match self.policy.https {
            Some(true) => "https",
            Some(false) => "http",
            None => parsed.scheme(),
        };
        // other subdomains (cdn., media.) keep their host
        let new_host = if host == site.host || host == site.domain {
            match self.policy.www {
                Some(true) => site.host.as_str(),
                Some(false) => site.domain.as_str(),
                None => host,
            }
        } else {
            host
        };

        let parts = UrlParts::split(url);
        let authority = parts.authority?;
        let (userinfo, host_port) = match authority.rfind('@') {
            Some(i) => (&authority[..=i], &authority[i + 1..]),
            None => ("", authority),
        };
        let port = host_port.rfind(':').map(|i| &host_port[i..]).unwrap_or("");

        let mut out = format!("{}://{}{}{}{}", scheme, userinfo, new_host, port, parts.path);
        if let Some(query) = parts.query {
            out.push('?');
            out.push_str(query);
        }
        if let Some(fragment) = parts.fragment {
            out.push('#');
            out.push_str(fragment);
        }
        Some(out)
    }
}

/// Path component of a URL or relative reference, without query or fragment.
pub fn path_of(url: &str) -> &str {
    UrlParts::split(url).path
}
