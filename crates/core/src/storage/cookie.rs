use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use cookie_store::CookieError;
use log::warn;
use regex::Regex;
use url::Url;

use crate::error::StorageError;

/// The process' ambient cookie string, e.g. a browser document's cookies.
///
/// Reading yields every visible cookie as `name=value` pairs joined by `"; "`.
/// Writing takes a single `name=value; Attr=...` assignment which is merged
/// into the existing cookies, or rejected with [StorageError::Cookie]. Neither
/// side is atomic with respect to other writers.
pub trait AmbientCookies: Send + Sync {
    fn cookie_string(&self) -> String;

    fn set_cookie(&self, assignment: &str) -> Result<(), StorageError>;
}

/// Backend reading and writing one cookie per key.
#[derive(Clone)]
pub struct CookieStorage {
    cookies: Arc<dyn AmbientCookies>,
    attributes: String,
    /// Compiled lookup pattern per key.
    matchers: Arc<Mutex<HashMap<String, Regex>>>,
}

impl CookieStorage {
    /// `attributes` is appended verbatim to every write, so it should start
    /// with a separator, e.g. `"; Path=/; Max-Age=31536000"`.
    pub fn new(cookies: Arc<dyn AmbientCookies>, attributes: impl Into<String>) -> Self {
        Self {
            cookies,
            attributes: attributes.into(),
            matchers: Arc::default(),
        }
    }

    pub fn attributes(&self) -> &str {
        &self.attributes
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        let mut matchers = self.matchers.lock().expect("lock poison");
        if !matchers.contains_key(key) {
            let pattern = format!(r"(?:^|;)\s*{}=([^;]*)", regex::escape(key));
            match Regex::new(&pattern) {
                Ok(matcher) => {
                    matchers.insert(key.to_owned(), matcher);
                }
                Err(e) => {
                    warn!("Unusable cookie key {key}: {e}");
                    return None;
                }
            }
        }
        let matcher = &matchers[key];

        let cookie_string = self.cookies.cookie_string();
        matcher
            .captures(&cookie_string)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str().to_owned())
    }

    /// Last write wins, there is no coordination with other cookie writers.
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.cookies
            .set_cookie(&format!("{key}={value}{}", self.attributes))
    }
}

/// An ambient cookie string kept in process, scoped to a single origin.
///
/// Assignments are interpreted the way a user agent would: attributes such
/// as `Max-Age` and `Expires` are honoured, so an assignment with
/// `Max-Age=0` deletes the cookie.
pub struct InMemoryCookies {
    origin: Url,
    store: Mutex<cookie_store::CookieStore>,
}

impl InMemoryCookies {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            store: Mutex::new(cookie_store::CookieStore::default()),
        }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }
}

impl AmbientCookies for InMemoryCookies {
    fn cookie_string(&self) -> String {
        let store = self.store.lock().expect("lock poison");
        store
            .get_request_values(&self.origin)
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn set_cookie(&self, assignment: &str) -> Result<(), StorageError> {
        let mut store = self.store.lock().expect("lock poison");
        match store.parse(assignment, &self.origin) {
            // expiring a cookie that was never set leaves nothing to delete
            Ok(_) | Err(CookieError::Expired) => Ok(()),
            Err(e) => Err(StorageError::Cookie {
                reason: format!("{e} ({})", self.origin),
            }),
        }
    }
}
