//! Cookie-backed store
//!
//! Values are percent-encoded (same unreserved set as `encodeURIComponent`)
//! and written with `path=/; SameSite=Lax`. A cookie larger than the jar's
//! capacity is refused so the caller can fall back to LocalStorage.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::platform::{Clock, SystemClock};

use super::BackingStore;

/// Expiry used to delete a cookie
#[cfg(target_arch = "wasm32")]
const EPOCH_EXPIRES: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(b, b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')')
}

/// Percent-encode a cookie value
pub fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for &b in value.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

/// Reverse of [`encode_component`]; `None` on malformed escapes or bad UTF-8
pub fn decode_component(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = value.get(i + 1..i + 3)?;
            // from_str_radix would also take a sign
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Build a `document.cookie` assignment string
pub fn format_set_cookie(name: &str, value: &str, expires_at: Option<DateTime<Utc>>) -> String {
    let mut cookie = format!("{}={}; path=/; SameSite=Lax", name, encode_component(value));
    if let Some(expires) = expires_at {
        cookie.push_str(&format!(
            "; expires={}",
            expires.format("%a, %d %b %Y %H:%M:%S GMT")
        ));
    }
    cookie
}

/// Find and decode one cookie in a `name=value; name2=value2` header
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
        .and_then(decode_component)
}

#[derive(Debug)]
struct Cookie {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

struct JarInner {
    cookies: HashMap<String, Cookie>,
    capacity: usize,
    enabled: bool,
    writes: usize,
    clock: Rc<dyn Clock>,
}

/// In-memory cookie jar with the browser's size and expiry rules.
///
/// Used as the primary store on native builds and in tests. Clones share state.
#[derive(Clone)]
pub struct CookieJar {
    inner: Rc<RefCell<JarInner>>,
}

impl CookieJar {
    pub fn new(capacity: usize, clock: Rc<dyn Clock>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(JarInner {
                cookies: HashMap::new(),
                capacity,
                enabled: true,
                writes: 0,
                clock,
            })),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(capacity, Rc::new(SystemClock))
    }

    /// Simulate cookies being blocked
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.borrow_mut().enabled = enabled;
    }

    pub fn write_count(&self) -> usize {
        self.inner.borrow().writes
    }

    /// Whether a cookie is physically present, expired or not
    pub fn contains_raw(&self, key: &str) -> bool {
        self.inner.borrow().cookies.contains_key(key)
    }

    fn check_enabled(&self) -> Result<(), StoreError> {
        if self.inner.borrow().enabled {
            Ok(())
        } else {
            Err(StoreError::Disabled { store: "cookie" })
        }
    }
}

impl BackingStore for CookieJar {
    fn name(&self) -> &'static str {
        "cookie"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_enabled()?;
        let mut inner = self.inner.borrow_mut();
        let now = inner.clock.now();
        let expired = inner
            .cookies
            .get(key)
            .and_then(|c| c.expires_at)
            .is_some_and(|at| at <= now);
        if expired {
            inner.cookies.remove(key);
            return Ok(None);
        }
        Ok(inner.cookies.get(key).map(|c| c.value.clone()))
    }

    fn set(
        &self,
        key: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.check_enabled()?;
        let mut inner = self.inner.borrow_mut();
        let size = key.len() + 1 + encode_component(value).len();
        if size > inner.capacity {
            return Err(StoreError::CapacityExceeded {
                store: "cookie",
                size,
                capacity: inner.capacity,
            });
        }
        inner.cookies.insert(
            key.to_string(),
            Cookie {
                value: value.to_string(),
                expires_at,
            },
        );
        inner.writes += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check_enabled()?;
        self.inner.borrow_mut().cookies.remove(key);
        Ok(())
    }
}

/// The page's real `document.cookie`
#[cfg(target_arch = "wasm32")]
pub struct DocumentCookies {
    capacity: usize,
}

#[cfg(target_arch = "wasm32")]
impl DocumentCookies {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    fn document() -> Result<web_sys::HtmlDocument, StoreError> {
        use wasm_bindgen::JsCast;

        web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.dyn_into::<web_sys::HtmlDocument>().ok())
            .ok_or(StoreError::Unavailable { store: "cookie" })
    }

    fn header(doc: &web_sys::HtmlDocument) -> Result<String, StoreError> {
        doc.cookie().map_err(|_| StoreError::Disabled { store: "cookie" })
    }
}

#[cfg(target_arch = "wasm32")]
impl BackingStore for DocumentCookies {
    fn name(&self) -> &'static str {
        "cookie"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let doc = Self::document()?;
        Ok(find_cookie(&Self::header(&doc)?, key))
    }

    fn set(
        &self,
        key: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let size = key.len() + 1 + encode_component(value).len();
        if size > self.capacity {
            return Err(StoreError::CapacityExceeded {
                store: "cookie",
                size,
                capacity: self.capacity,
            });
        }
        let doc = Self::document()?;
        doc.set_cookie(&format_set_cookie(key, value, expires_at))
            .map_err(|_| StoreError::Disabled { store: "cookie" })?;

        // Browsers drop oversized or blocked cookies silently
        if find_cookie(&Self::header(&doc)?, key).as_deref() != Some(value) {
            return Err(StoreError::VerificationFailed {
                store: "cookie",
                key: key.to_string(),
            });
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let doc = Self::document()?;
        doc.set_cookie(&format!("{}=; expires={}; path=/", key, EPOCH_EXPIRES))
            .map_err(|_| StoreError::Disabled { store: "cookie" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ManualClock;

    fn clock() -> Rc<ManualClock> {
        let start = DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Rc::new(ManualClock::new(start))
    }

    #[test]
    fn test_encode_matches_encode_uri_component() {
        assert_eq!(encode_component(r#"{"a":"b c"}"#), "%7B%22a%22%3A%22b%20c%22%7D");
        assert_eq!(encode_component("México"), "M%C3%A9xico");
        assert_eq!(encode_component("a-b_c.d!e~f*g'h(i)"), "a-b_c.d!e~f*g'h(i)");
    }

    #[test]
    fn test_decode_reverses_encode() {
        let raw = r#"{"step_1":{"firstName":"José; Ana"}}"#;
        assert_eq!(decode_component(&encode_component(raw)).as_deref(), Some(raw));
        assert_eq!(decode_component("%ZZ"), None);
        assert_eq!(decode_component("%4"), None);
        assert_eq!(decode_component("%+1"), None);
        assert_eq!(decode_component("%-0"), None);
    }

    #[test]
    fn test_find_cookie_in_header() {
        let header = "theme=dark; visaFormData=%7B%7D; other=1";
        assert_eq!(find_cookie(header, "visaFormData").as_deref(), Some("{}"));
        assert_eq!(find_cookie(header, "visa"), None);
        assert_eq!(find_cookie(header, "missing"), None);
    }

    #[test]
    fn test_format_set_cookie() {
        let expires = DateTime::parse_from_rfc3339("2025-07-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let cookie = format_set_cookie("k", "a b", Some(expires));
        assert_eq!(
            cookie,
            "k=a%20b; path=/; SameSite=Lax; expires=Tue, 01 Jul 2025 00:00:00 GMT"
        );
    }

    #[test]
    fn test_jar_rejects_oversized_cookie() {
        let jar = CookieJar::new(32, clock());
        let big = "x".repeat(64);
        assert!(matches!(
            jar.set("k", &big, None),
            Err(StoreError::CapacityExceeded { .. })
        ));
        assert!(jar.set("k", "small", None).is_ok());
    }

    #[test]
    fn test_jar_expires_entries() {
        let clock = clock();
        let jar = CookieJar::new(4096, clock.clone());
        let expires = clock.now() + chrono::Duration::seconds(10);
        jar.set("k", "v", Some(expires)).unwrap();
        assert_eq!(jar.get("k").unwrap().as_deref(), Some("v"));

        clock.advance_ms(10_000);
        assert_eq!(jar.get("k").unwrap(), None);
        assert!(!jar.contains_raw("k"));
    }
}
