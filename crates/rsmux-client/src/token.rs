//! Bearer token sources.

use std::fmt;
use std::sync::Arc;

use crate::cell::ValueCell;

/// Where a bearer token comes from.
///
/// Sources are resolved on every dispatch, so a cell or supplier can hand out
/// refreshed credentials without rebuilding the client.
#[derive(Clone)]
pub enum TokenSource {
    Literal(String),
    Cell(ValueCell<String>),
    /// Called on each resolution. May return a literal or a cell; a supplier
    /// returning another supplier resolves to no token.
    Supplier(Arc<dyn Fn() -> TokenSource + Send + Sync>),
}

impl TokenSource {
    pub fn supplier(f: impl Fn() -> TokenSource + Send + Sync + 'static) -> Self {
        TokenSource::Supplier(Arc::new(f))
    }

    /// The current token, or `None` if the source is empty.
    pub fn resolve(&self) -> Option<String> {
        let token = match self {
            TokenSource::Supplier(supply) => match supply() {
                TokenSource::Supplier(_) => None,
                direct => direct.read(),
            },
            direct => direct.read(),
        };
        token.filter(|token| !token.is_empty())
    }

    fn read(&self) -> Option<String> {
        match self {
            TokenSource::Literal(token) => Some(token.clone()),
            TokenSource::Cell(cell) => Some(cell.get()),
            TokenSource::Supplier(_) => None,
        }
    }
}

/// Resolve an optional source.
pub fn resolve(source: Option<&TokenSource>) -> Option<String> {
    source.and_then(TokenSource::resolve)
}

/// Resolve the per-call source if given, else the default one.
pub fn resolve_effective(
    per_call: Option<&TokenSource>,
    default: Option<&TokenSource>,
) -> Option<String> {
    resolve(per_call.or(default))
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Literal(token) => f
                .debug_tuple("Literal")
                .field(&format_args!("<redacted:{} bytes>", token.len()))
                .finish(),
            TokenSource::Cell(cell) => f
                .debug_tuple("Cell")
                .field(&format_args!("<redacted:{} bytes>", cell.with(String::len)))
                .finish(),
            TokenSource::Supplier(_) => f.write_str("Supplier(..)"),
        }
    }
}

impl From<String> for TokenSource {
    fn from(token: String) -> Self {
        TokenSource::Literal(token)
    }
}

impl From<&str> for TokenSource {
    fn from(token: &str) -> Self {
        TokenSource::Literal(token.to_string())
    }
}

impl From<ValueCell<String>> for TokenSource {
    fn from(cell: ValueCell<String>) -> Self {
        TokenSource::Cell(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_literal_and_none() {
        assert_eq!(resolve(None), None);
        assert_eq!(
            resolve(Some(&TokenSource::from("abc"))),
            Some("abc".to_string())
        );
        assert_eq!(resolve(Some(&TokenSource::from(""))), None);
    }

    #[test]
    fn test_literal_resolution_is_idempotent() {
        let source = TokenSource::from("jwt");
        let once = source.resolve().unwrap();
        let twice = TokenSource::from(once.clone()).resolve().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_cell_reads_current_value() {
        let cell = ValueCell::new("first".to_string());
        let source = TokenSource::from(cell.clone());
        assert_eq!(source.resolve().as_deref(), Some("first"));
        cell.set("second".to_string());
        assert_eq!(source.resolve().as_deref(), Some("second"));
    }

    #[test]
    fn test_supplier_is_called_per_resolution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = TokenSource::supplier({
            let calls = Arc::clone(&calls);
            move || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                TokenSource::Literal(format!("token-{n}"))
            }
        });
        assert_eq!(source.resolve().as_deref(), Some("token-0"));
        assert_eq!(source.resolve().as_deref(), Some("token-1"));
    }

    #[test]
    fn test_supplier_of_cell() {
        let cell = ValueCell::new("from-cell".to_string());
        let source = TokenSource::supplier({
            let cell = cell.clone();
            move || TokenSource::Cell(cell.clone())
        });
        assert_eq!(source.resolve().as_deref(), Some("from-cell"));
    }

    #[test]
    fn test_nested_supplier_resolves_to_none() {
        let source = TokenSource::supplier(|| TokenSource::supplier(|| TokenSource::from("deep")));
        assert_eq!(source.resolve(), None);
    }

    #[test]
    fn test_per_call_overrides_default() {
        let default = TokenSource::from("default");
        let per_call = TokenSource::from("override");
        assert_eq!(
            resolve_effective(Some(&per_call), Some(&default)).as_deref(),
            Some("override")
        );
        assert_eq!(
            resolve_effective(None, Some(&default)).as_deref(),
            Some("default")
        );
        assert_eq!(resolve_effective(None, None), None);
    }

    #[test]
    fn test_debug_is_redacted() {
        let debug = format!("{:?}", TokenSource::from("secret"));
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted:6 bytes>"));
    }
}
