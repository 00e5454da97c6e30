//! Session registry: stable script-variable names for sessions.
//!
//! Every operation runs in a session, and the replay script needs a variable
//! for each one. The [`SessionRegistry`] derives that variable from the
//! session's display label the first time the session is seen, remembers it,
//! and appends the statements that recreate the session to the preamble.
//!
//! Name uniqueness is the registry's job. Two different sessions that derive
//! the same name are a [`LogError::NameCollision`]; the registry never
//! invents a disambiguating suffix, so the same labels always produce the
//! same outcome.

use std::collections::{BTreeMap, BTreeSet};

use retrace_model::session::{Session, SessionHandle};
use tracing::debug;

use crate::config::LogConfig;
use crate::statement::{method, Expr, Statement};
use crate::LogError;

/// Name used when a label has no usable characters at all.
pub const FALLBACK_SESSION_NAME: &str = "session";

// ---------------------------------------------------------------------------
// Name derivation
// ---------------------------------------------------------------------------

/// Derive a script-variable name from a session label.
///
/// Each whitespace-separated word is capitalised (first character upper
/// case, the rest lower case), then everything that is not an ASCII letter,
/// digit or underscore is dropped, leading digits are stripped, and the first
/// letter is lower-cased:
///
/// ```
/// use std::collections::BTreeSet;
/// use retrace_log::session::derive_name;
///
/// let used = BTreeSet::new();
/// assert_eq!(derive_name("Default Session", &used).unwrap(), "defaultSession");
/// assert_eq!(derive_name("3d polygon model", &used).unwrap(), "dPolygonModel");
/// ```
///
/// # Errors
///
/// Returns [`LogError::NameCollision`] if the derived name is in
/// `already_used`.
pub fn derive_name(label: &str, already_used: &BTreeSet<String>) -> Result<String, LogError> {
    let capitalised = label
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<String>();

    let compacted: String = capitalised
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let trimmed = compacted.trim_start_matches(|c: char| !(c.is_ascii_alphabetic() || c == '_'));

    let mut chars = trimmed.chars();
    let name = match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => FALLBACK_SESSION_NAME.to_owned(),
    };

    if already_used.contains(&name) {
        return Err(LogError::NameCollision {
            label: label.to_owned(),
            name,
        });
    }
    Ok(name)
}

// ---------------------------------------------------------------------------
// SessionRegistry
// ---------------------------------------------------------------------------

/// Maps session handles to unique variable names and owns the preamble.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    names: BTreeMap<SessionHandle, String>,
    used: BTreeSet<String>,
    preamble: Vec<Statement>,
    manager_var: String,
}

impl SessionRegistry {
    /// Create a registry whose preamble starts by creating the model manager.
    pub fn new(config: &LogConfig) -> Self {
        let preamble = vec![Statement::assign(
            &config.manager_var,
            Expr::function(method::CREATE_MANAGER, Vec::new()),
        )];
        Self {
            names: BTreeMap::new(),
            used: BTreeSet::new(),
            preamble,
            manager_var: config.manager_var.clone(),
        }
    }

    /// Return the variable name for `session`, registering it on first use.
    ///
    /// Registration appends two preamble statements:
    ///
    /// ```text
    /// <var> = <manager>.create_session('<kind>')
    /// <var>.set_name('<label>')
    /// ```
    ///
    /// # Errors
    ///
    /// [`LogError::NameCollision`] if the derived name belongs to another
    /// session or clashes with a name the log generates itself. A failed
    /// registration leaves the registry unchanged.
    pub fn register(&mut self, session: &Session, config: &LogConfig) -> Result<String, LogError> {
        if let Some(name) = self.names.get(&session.handle) {
            return Ok(name.clone());
        }

        let name = derive_name(&session.label, &self.used)?;
        if config.is_reserved(&name) {
            return Err(LogError::NameCollision {
                label: session.label.clone(),
                name,
            });
        }

        self.preamble.push(Statement::assign(
            &name,
            Expr::method(
                &self.manager_var,
                method::CREATE_SESSION,
                vec![Expr::str(&session.kind)],
            ),
        ));
        self.preamble.push(Statement::call(
            &name,
            method::SET_NAME,
            vec![Expr::str(&session.label)],
        ));
        self.used.insert(name.clone());
        self.names.insert(session.handle, name.clone());

        debug!(
            session = session.handle.0,
            label = %session.label,
            var = %name,
            "registered session"
        );
        Ok(name)
    }

    /// Variable name of an already-registered session.
    pub fn var_name(&self, handle: SessionHandle) -> Option<&str> {
        self.names.get(&handle).map(String::as_str)
    }

    /// Manager creation followed by one statement pair per session, in
    /// registration order.
    pub fn preamble(&self) -> &[Statement] {
        &self.preamble
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn used(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| (*n).to_owned()).collect()
    }

    #[test]
    fn derive_basic_labels() {
        let none = used(&[]);
        assert_eq!(derive_name("Default Session", &none).unwrap(), "defaultSession");
        assert_eq!(derive_name("default session", &none).unwrap(), "defaultSession");
        assert_eq!(derive_name("CGM", &none).unwrap(), "cgm");
        assert_eq!(derive_name("polygon-session #2", &none).unwrap(), "polygonsession2");
        assert_eq!(derive_name("my_session", &none).unwrap(), "my_session");
    }

    #[test]
    fn derive_strips_leading_digits() {
        let none = used(&[]);
        assert_eq!(derive_name("42 Things", &none).unwrap(), "things");
        assert_eq!(derive_name("_hidden", &none).unwrap(), "_hidden");
    }

    #[test]
    fn derive_falls_back_for_empty_labels() {
        let none = used(&[]);
        assert_eq!(derive_name("", &none).unwrap(), FALLBACK_SESSION_NAME);
        assert_eq!(derive_name("123 !!!", &none).unwrap(), FALLBACK_SESSION_NAME);
    }

    #[test]
    fn derive_rejects_used_names() {
        let taken = used(&["defaultSession"]);
        assert!(matches!(
            derive_name("DEFAULT SESSION", &taken),
            Err(LogError::NameCollision { ref name, .. }) if name == "defaultSession"
        ));
    }

    #[test]
    fn register_emits_preamble_once() {
        let config = LogConfig::default();
        let mut registry = SessionRegistry::new(&config);
        let session = Session::new(1, "cgm", "CGM Session");

        let first = registry.register(&session, &config).unwrap();
        let second = registry.register(&session, &config).unwrap();
        assert_eq!(first, "cgmSession");
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.var_name(session.handle), Some("cgmSession"));

        let preamble = registry.preamble();
        assert_eq!(preamble.len(), 3);
        assert_eq!(preamble[0].assigned_var(), Some("mgr"));
        assert_eq!(
            preamble[1],
            Statement::assign(
                "cgmSession",
                Expr::method("mgr", method::CREATE_SESSION, vec![Expr::str("cgm")])
            )
        );
        assert_eq!(
            preamble[2],
            Statement::call("cgmSession", method::SET_NAME, vec![Expr::str("CGM Session")])
        );
    }

    #[test]
    fn collision_between_sessions() {
        let config = LogConfig::default();
        let mut registry = SessionRegistry::new(&config);
        registry
            .register(&Session::new(1, "cgm", "Default Session"), &config)
            .unwrap();

        let err = registry
            .register(&Session::new(2, "cgm", "default session"), &config)
            .unwrap_err();
        assert!(matches!(err, LogError::NameCollision { .. }));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.preamble().len(), 3);
        assert_eq!(registry.var_name(SessionHandle(2)), None);
    }

    #[test]
    fn reserved_names_collide() {
        let config = LogConfig::default();
        let mut registry = SessionRegistry::new(&config);
        assert!(matches!(
            registry.register(&Session::new(1, "cgm", "mgr"), &config),
            Err(LogError::NameCollision { .. })
        ));
        assert!(matches!(
            registry.register(&Session::new(2, "cgm", "Op 3"), &config),
            Err(LogError::NameCollision { .. })
        ));
        assert!(registry.is_empty());
    }
}
