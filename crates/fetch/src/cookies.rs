// ABOUTME: File-backed cookie jar in the Netscape/curl cookie-file format.
// ABOUTME: Implements reqwest's CookieStore so the transport can feed it every hop's Set-Cookie headers.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::Utc;
use cookie::Cookie;
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use tracing::{debug, warn};
use url::Url;

const FILE_HEADER: &str = "# Netscape HTTP Cookie File\n# This file was generated by syndic. Edit at your own risk.\n\n";
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredCookie {
    domain: String,
    include_subdomains: bool,
    path: String,
    secure: bool,
    http_only: bool,
    /// Epoch seconds; 0 for a session cookie.
    expires: i64,
    name: String,
    value: String,
}

impl StoredCookie {
    fn parse_line(line: &str) -> Option<StoredCookie> {
        let (line, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (rest, true),
            None => (line, false),
        };
        if line.trim().is_empty() || line.starts_with('#') {
            return None;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 7 {
            return None;
        }
        Some(StoredCookie {
            domain: fields[0].trim_start_matches('.').to_ascii_lowercase(),
            include_subdomains: fields[1].eq_ignore_ascii_case("TRUE"),
            path: fields[2].to_string(),
            secure: fields[3].eq_ignore_ascii_case("TRUE"),
            http_only,
            expires: fields[4].trim().parse().unwrap_or(0),
            name: fields[5].to_string(),
            value: fields[6..].join("\t"),
        })
    }

    fn to_line(&self) -> String {
        let domain = if self.include_subdomains {
            format!(".{}", self.domain)
        } else {
            self.domain.clone()
        };
        format!(
            "{}{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
            if self.http_only { HTTP_ONLY_PREFIX } else { "" },
            domain,
            bool_field(self.include_subdomains),
            self.path,
            bool_field(self.secure),
            self.expires,
            self.name,
            self.value
        )
    }

    fn is_expired(&self, now: i64) -> bool {
        self.expires != 0 && self.expires <= now
    }

    fn same_slot(&self, other: &StoredCookie) -> bool {
        self.domain == other.domain && self.path == other.path && self.name == other.name
    }

    fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let domain_ok = if self.include_subdomains {
            host == self.domain || host.ends_with(&format!(".{}", self.domain))
        } else {
            host == self.domain
        };
        if !domain_ok {
            return false;
        }
        if self.secure && url.scheme() != "https" {
            return false;
        }
        path_matches(url.path(), &self.path)
    }
}

fn bool_field(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// RFC 6265 path-match.
fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

/// RFC 6265 default-path: the request path up to its last `/`.
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

/// Cookies loaded from, and written back to, one cookie file.
///
/// A missing file is an empty jar. Two fetches sharing a path each load the
/// file, so the last one to save wins.
#[derive(Debug)]
pub struct CookieJar {
    path: PathBuf,
    cookies: RwLock<Vec<StoredCookie>>,
}

impl CookieJar {
    /// Reads the jar at `path`. Unreadable files are logged and treated as empty.
    pub fn load(path: impl AsRef<Path>) -> CookieJar {
        let path = path.as_ref().to_path_buf();
        let cookies = match fs::read_to_string(&path) {
            Ok(text) => {
                let now = Utc::now().timestamp();
                text.lines()
                    .filter_map(StoredCookie::parse_line)
                    .filter(|c| !c.is_expired(now))
                    .collect()
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read cookie jar");
                Vec::new()
            }
        };
        debug!(path = %path.display(), cookies = cookies.len(), "loaded cookie jar");
        CookieJar {
            path,
            cookies: RwLock::new(cookies),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.cookies.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes every unexpired cookie back to the jar's file.
    pub fn save(&self) -> io::Result<()> {
        let now = Utc::now().timestamp();
        let cookies = self
            .cookies
            .read()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "cookie jar lock poisoned"))?;

        let mut out = String::from(FILE_HEADER);
        for cookie in cookies.iter().filter(|c| !c.is_expired(now)) {
            out.push_str(&cookie.to_line());
        }

        let mut file = fs::File::create(&self.path)?;
        file.write_all(out.as_bytes())?;
        debug!(path = %self.path.display(), cookies = cookies.len(), "saved cookie jar");
        Ok(())
    }

    fn store(&self, raw: &str, url: &Url) {
        let parsed = match Cookie::parse(raw) {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "ignoring malformed set-cookie header");
                return;
            }
        };
        let Some(host) = url.host_str() else {
            return;
        };
        let host = host.to_ascii_lowercase();
        let now = Utc::now().timestamp();

        let (domain, include_subdomains) = match parsed.domain() {
            Some(d) if !d.is_empty() => {
                let d = d.trim_start_matches('.').to_ascii_lowercase();
                if host != d && !host.ends_with(&format!(".{}", d)) {
                    debug!(domain = %d, host = %host, "rejecting cookie for foreign domain");
                    return;
                }
                (d, true)
            }
            _ => (host, false),
        };

        let expires = if let Some(max_age) = parsed.max_age() {
            now + max_age.whole_seconds()
        } else if let Some(at) = parsed.expires_datetime() {
            at.unix_timestamp()
        } else {
            0
        };
        // Max-Age=0 and past dates delete.
        let expires = if expires != 0 && expires <= now { -1 } else { expires };

        let cookie = StoredCookie {
            domain,
            include_subdomains,
            path: parsed
                .path()
                .filter(|p| p.starts_with('/'))
                .map(str::to_string)
                .unwrap_or_else(|| default_path(url)),
            secure: parsed.secure().unwrap_or(false),
            http_only: parsed.http_only().unwrap_or(false),
            expires,
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
        };

        let Ok(mut cookies) = self.cookies.write() else {
            return;
        };
        cookies.retain(|c| !c.same_slot(&cookie));
        if cookie.expires != -1 {
            cookies.push(cookie);
        }
    }
}

impl CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        for header in cookie_headers {
            match header.to_str() {
                Ok(raw) => self.store(raw, url),
                Err(_) => debug!("ignoring non-ascii set-cookie header"),
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let now = Utc::now().timestamp();
        let cookies = self.cookies.read().ok()?;
        let mut matching: Vec<&StoredCookie> = cookies
            .iter()
            .filter(|c| !c.is_expired(now) && c.matches(url))
            .collect();
        if matching.is_empty() {
            return None;
        }
        // Longer paths first.
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        let header = matching
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&header).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn set(jar: &CookieJar, url: &str, headers: &[&'static str]) {
        let url = Url::parse(url).unwrap();
        let values: Vec<HeaderValue> = headers.iter().map(|h| HeaderValue::from_static(*h)).collect();
        jar.set_cookies(&mut values.iter(), &url);
    }

    fn cookies_for(jar: &CookieJar, url: &str) -> Option<String> {
        jar.cookies(&Url::parse(url).unwrap())
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[test]
    fn missing_file_is_empty_jar() {
        let dir = tempfile::tempdir().unwrap();
        let jar = CookieJar::load(dir.path().join("none.txt"));
        assert!(jar.is_empty());
    }

    #[test]
    fn host_only_and_domain_cookies() {
        let dir = tempfile::tempdir().unwrap();
        let jar = CookieJar::load(dir.path().join("jar.txt"));
        set(
            &jar,
            "https://feeds.example.com/a/rss",
            &["sid=1; Path=/", "pref=dark; Domain=example.com; Path=/", "deep=x"],
        );

        assert_eq!(
            cookies_for(&jar, "https://feeds.example.com/a/other").as_deref(),
            Some("deep=x; sid=1; pref=dark")
        );
        assert_eq!(
            cookies_for(&jar, "https://www.example.com/").as_deref(),
            Some("pref=dark")
        );
        assert_eq!(cookies_for(&jar, "https://example.org/"), None);
    }

    #[test]
    fn secure_cookies_need_https() {
        let dir = tempfile::tempdir().unwrap();
        let jar = CookieJar::load(dir.path().join("jar.txt"));
        set(&jar, "https://example.com/", &["token=t; Secure"]);
        assert_eq!(cookies_for(&jar, "http://example.com/"), None);
        assert!(cookies_for(&jar, "https://example.com/").is_some());
    }

    #[test]
    fn max_age_zero_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let jar = CookieJar::load(dir.path().join("jar.txt"));
        set(&jar, "http://example.com/", &["sid=1"]);
        set(&jar, "http://example.com/", &["sid=gone; Max-Age=0"]);
        assert!(jar.is_empty());
    }

    #[test]
    fn foreign_domain_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let jar = CookieJar::load(dir.path().join("jar.txt"));
        set(&jar, "http://example.com/", &["x=1; Domain=evil.test"]);
        assert!(jar.is_empty());
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jar.txt");
        let jar = CookieJar::load(&path);
        set(
            &jar,
            "https://example.com/feed",
            &["sid=abc; Path=/; HttpOnly; Max-Age=3600", "pref=1; Domain=example.com; Path=/"],
        );
        jar.save().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# Netscape HTTP Cookie File"));
        assert!(text.contains("#HttpOnly_example.com\tFALSE\t/\tFALSE\t"));
        assert!(text.contains(".example.com\tTRUE\t/\tFALSE\t0\tpref\t1"));

        let reloaded = CookieJar::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            cookies_for(&reloaded, "https://example.com/").as_deref(),
            Some("sid=abc; pref=1")
        );
    }

    #[test]
    fn reads_curl_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curl.txt");
        fs::write(
            &path,
            "# Netscape HTTP Cookie File\n\
             .example.net\tTRUE\t/\tFALSE\t0\ta\t1\n\
             example.net\tFALSE\t/x\tTRUE\t1\told\tgone\n\
             garbage line\n",
        )
        .unwrap();
        let jar = CookieJar::load(&path);
        assert_eq!(jar.len(), 1);
        assert_eq!(cookies_for(&jar, "http://sub.example.net/").as_deref(), Some("a=1"));
    }

    #[test]
    fn path_matching() {
        assert!(path_matches("/a/b", "/a"));
        assert!(path_matches("/a/b", "/a/"));
        assert!(path_matches("/a", "/a"));
        assert!(!path_matches("/ab", "/a"));
        assert_eq!(default_path(&Url::parse("http://h/a/b/c").unwrap()), "/a/b");
        assert_eq!(default_path(&Url::parse("http://h/c").unwrap()), "/");
    }
}
