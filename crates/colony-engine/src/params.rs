//! Named, typed parameter registries and the `name = value` file format.
//!
//! Every configuration object that scripts, parameter files, or batch
//! sweeps can write implements [`ParameterStore`]: a registry mapping
//! case-insensitive names to a [`ParamKind`] and a current value. All
//! three writers go through [`ParameterStore::set_param_str`], so a value
//! in a batch sweep is parsed and validated exactly like the same value
//! loaded from a file.

use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

// ── ParamKind / ParamValue ─────────────────────────────────────────

/// The type of a registered parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// `true` / `false`.
    Bool,
    /// Signed integer.
    Int,
    /// Floating point.
    Float,
    /// Free text (paths, names). Not batchable.
    Text,
}

impl ParamKind {
    /// Whether batch sweeps may range over this kind.
    pub fn is_batchable(self) -> bool {
        !matches!(self, Self::Text)
    }

    /// Parse `raw` as a value of this kind.
    pub fn parse(self, raw: &str) -> Option<ParamValue> {
        let raw = raw.trim();
        match self {
            Self::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(ParamValue::Bool(true)),
                "false" | "0" => Some(ParamValue::Bool(false)),
                _ => None,
            },
            Self::Int => raw.parse().ok().map(ParamValue::Int),
            Self::Float => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(ParamValue::Float),
            Self::Text => Some(ParamValue::Text(raw.to_string())),
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// A typed parameter value.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    /// A boolean flag.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A float.
    Float(f64),
    /// Free text.
    Text(String),
}

impl ParamValue {
    /// The kind this value belongs to.
    pub fn kind(&self) -> ParamKind {
        match self {
            Self::Bool(_) => ParamKind::Bool,
            Self::Int(_) => ParamKind::Int,
            Self::Float(_) => ParamKind::Float,
            Self::Text(_) => ParamKind::Text,
        }
    }

    /// Numeric view: ints widen, bools are 0/1, text is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Int(i) => Some(*i as f64),
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

// ── ParamError ─────────────────────────────────────────────────────

/// Errors from a single parameter lookup or assignment.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamError {
    /// No parameter of this name is registered.
    Unknown {
        /// The name as given.
        name: String,
    },
    /// The value does not parse as the parameter's kind.
    TypeMismatch {
        /// The parameter name.
        name: String,
        /// The registered kind.
        expected: ParamKind,
        /// The raw text that failed to parse.
        raw: String,
    },
    /// The value parsed but is outside the parameter's domain.
    OutOfRange {
        /// The parameter name.
        name: String,
        /// Description of the valid domain.
        reason: String,
    },
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown { name } => write!(f, "unknown parameter '{name}'"),
            Self::TypeMismatch {
                name,
                expected,
                raw,
            } => write!(f, "parameter '{name}' expects {expected}, got '{raw}'"),
            Self::OutOfRange { name, reason } => {
                write!(f, "parameter '{name}' out of range: {reason}")
            }
        }
    }
}

impl Error for ParamError {}

// ── ParameterStore ─────────────────────────────────────────────────

/// Normalize a parameter name for lookup: trimmed, ASCII lowercase.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// A name -> typed value registry backing some configuration object.
///
/// Names are case-insensitive; implementations receive names already
/// passed through [`normalize_name`] from the provided methods but should
/// tolerate raw names in their own `kind_of`/`get_param`/`set_param`.
pub trait ParameterStore {
    /// Short label used in logs and errors ("global", "package").
    fn registry_name(&self) -> &str;

    /// Registered parameter names, in declaration order.
    fn names(&self) -> Vec<String>;

    /// The kind of `name`, or `None` if unregistered.
    fn kind_of(&self, name: &str) -> Option<ParamKind>;

    /// The current value of `name`.
    fn get_param(&self, name: &str) -> Option<ParamValue>;

    /// Assign a typed value. Implementations reject kinds other than the
    /// registered one and values outside the parameter's domain.
    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<(), ParamError>;

    /// Whether `set_param(name, value)` would succeed, without assigning.
    ///
    /// The default checks registration and kind only; stores with value
    /// domains override it and route `set_param` through it. Numeric
    /// domains must be intervals: batch sweeps check only the ends of a
    /// range.
    fn check_param(&self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
        let key = normalize_name(name);
        let kind = self
            .kind_of(&key)
            .ok_or_else(|| ParamError::Unknown { name: key.clone() })?;
        if value.kind() != kind {
            return Err(ParamError::TypeMismatch {
                name: key,
                expected: kind,
                raw: value.to_string(),
            });
        }
        Ok(())
    }

    /// Parse `raw` as the registered kind of `name` without assigning it.
    fn parse_param(&self, name: &str, raw: &str) -> Result<ParamValue, ParamError> {
        let key = normalize_name(name);
        let kind = self
            .kind_of(&key)
            .ok_or_else(|| ParamError::Unknown { name: key.clone() })?;
        kind.parse(raw).ok_or_else(|| ParamError::TypeMismatch {
            name: key,
            expected: kind,
            raw: raw.trim().to_string(),
        })
    }

    /// Parse and assign in one step. The path shared by parameter files,
    /// scripts, and batch sweeps.
    fn set_param_str(&mut self, name: &str, raw: &str) -> Result<(), ParamError> {
        let value = self.parse_param(name, raw)?;
        self.set_param(&normalize_name(name), value)
    }
}

// ── ParamTable ─────────────────────────────────────────────────────

/// A free-form [`ParameterStore`] whose kinds are fixed by the defaults
/// it was declared with. Simulation packages use one for their
/// package-specific parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamTable {
    label: String,
    values: IndexMap<String, ParamValue>,
}

impl ParamTable {
    /// An empty table with the given registry label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            values: IndexMap::new(),
        }
    }

    /// Declare `name` with its default value (builder style).
    pub fn with(mut self, name: &str, default: ParamValue) -> Self {
        self.declare(name, default);
        self
    }

    /// Declare `name` with its default value, replacing any prior
    /// declaration.
    pub fn declare(&mut self, name: &str, default: ParamValue) {
        self.values.insert(normalize_name(name), default);
    }

    /// Float value of `name`, if declared as a number.
    pub fn float(&self, name: &str) -> Option<f64> {
        self.values.get(&normalize_name(name))?.as_f64()
    }

    /// Bool value of `name`, if declared as a bool.
    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.values.get(&normalize_name(name))? {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Number of declared parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ParameterStore for ParamTable {
    fn registry_name(&self) -> &str {
        &self.label
    }

    fn names(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn kind_of(&self, name: &str) -> Option<ParamKind> {
        self.values.get(&normalize_name(name)).map(ParamValue::kind)
    }

    fn get_param(&self, name: &str) -> Option<ParamValue> {
        self.values.get(&normalize_name(name)).cloned()
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<(), ParamError> {
        let key = normalize_name(name);
        let slot = self
            .values
            .get_mut(&key)
            .ok_or_else(|| ParamError::Unknown { name: key.clone() })?;
        if slot.kind() != value.kind() {
            return Err(ParamError::TypeMismatch {
                name: key,
                expected: slot.kind(),
                raw: value.to_string(),
            });
        }
        *slot = value;
        Ok(())
    }
}

// ── Parameter files ────────────────────────────────────────────────

/// Errors loading a `name = value` parameter file.
///
/// Any error aborts the whole load; nothing from the file is applied.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamFileError {
    /// The file could not be read.
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying I/O error, rendered.
        reason: String,
    },
    /// A line is not of the form `name = value`.
    Syntax {
        /// 1-based line number.
        line: usize,
        /// The offending line.
        text: String,
    },
    /// A line names an unknown parameter or carries a bad value.
    Invalid {
        /// 1-based line number.
        line: usize,
        /// The underlying parameter error.
        source: ParamError,
    },
}

impl fmt::Display for ParamFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, reason } => {
                write!(f, "cannot read parameter file {}: {reason}", path.display())
            }
            Self::Syntax { line, text } => {
                write!(f, "line {line}: expected 'name = value', got '{text}'")
            }
            Self::Invalid { line, source } => write!(f, "line {line}: {source}"),
        }
    }
}

impl Error for ParamFileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Parse and type-check every assignment in `text` against `store`
/// without modifying it.
///
/// Blank lines and lines starting with `#` or `//` are skipped.
pub fn parse_param_text(
    text: &str,
    store: &dyn ParameterStore,
) -> Result<Vec<(String, ParamValue)>, ParamFileError> {
    let mut parsed = Vec::new();
    for (i, raw_line) in text.lines().enumerate() {
        let line = i + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
            continue;
        }
        let (name, value) = trimmed
            .split_once('=')
            .ok_or_else(|| ParamFileError::Syntax {
                line,
                text: trimmed.to_string(),
            })?;
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(ParamFileError::Syntax {
                line,
                text: trimmed.to_string(),
            });
        }
        let value = store
            .parse_param(&name, value)
            .map_err(|source| ParamFileError::Invalid { line, source })?;
        parsed.push((name, value));
    }
    Ok(parsed)
}

/// Apply every assignment in `text` to `store`, all or nothing.
///
/// Parsing finishes before anything is assigned. If an assignment is
/// still rejected (a domain check inside `set_param`), every earlier
/// assignment from this text is rolled back. Returns the number of
/// assignments applied.
pub fn apply_param_text(text: &str, store: &mut dyn ParameterStore) -> Result<usize, ParamFileError> {
    let parsed = parse_param_text(text, store)?;

    let mut undo: Vec<(String, ParamValue)> = Vec::with_capacity(parsed.len());
    for (index, (name, value)) in parsed.iter().enumerate() {
        let previous = store.get_param(name);
        if let Err(source) = store.set_param(name, value.clone()) {
            for (prev_name, prev_value) in undo.into_iter().rev() {
                // Restoring a value the store already held cannot fail.
                let _ = store.set_param(&prev_name, prev_value);
            }
            return Err(ParamFileError::Invalid {
                line: line_of_assignment(text, index),
                source,
            });
        }
        if let Some(previous) = previous {
            undo.push((name.clone(), previous));
        }
    }
    Ok(parsed.len())
}

/// 1-based line number of the `index`-th assignment in `text`.
fn line_of_assignment(text: &str, index: usize) -> usize {
    text.lines()
        .enumerate()
        .filter(|(_, l)| {
            let t = l.trim();
            !(t.is_empty() || t.starts_with('#') || t.starts_with("//"))
        })
        .nth(index)
        .map(|(i, _)| i + 1)
        .unwrap_or(0)
}

/// Read `path` and [`apply_param_text`] its contents to `store`.
pub fn load_param_file(path: &Path, store: &mut dyn ParameterStore) -> Result<usize, ParamFileError> {
    let text = std::fs::read_to_string(path).map_err(|e| ParamFileError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    apply_param_text(&text, store)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ParamTable {
        ParamTable::new("package")
            .with("deathRate", ParamValue::Float(0.0))
            .with("spawn", ParamValue::Bool(false))
            .with("maxSpawn", ParamValue::Int(3))
            .with("label", ParamValue::Text("none".into()))
    }

    /// Rejects any float above 1.0, to exercise rollback.
    struct Bounded(ParamTable);

    impl ParameterStore for Bounded {
        fn registry_name(&self) -> &str {
            self.0.registry_name()
        }
        fn names(&self) -> Vec<String> {
            self.0.names()
        }
        fn kind_of(&self, name: &str) -> Option<ParamKind> {
            self.0.kind_of(name)
        }
        fn get_param(&self, name: &str) -> Option<ParamValue> {
            self.0.get_param(name)
        }
        fn set_param(&mut self, name: &str, value: ParamValue) -> Result<(), ParamError> {
            self.check_param(name, &value)?;
            self.0.set_param(name, value)
        }
        fn check_param(&self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
            if matches!(value, ParamValue::Float(v) if *v > 1.0) {
                return Err(ParamError::OutOfRange {
                    name: name.to_string(),
                    reason: "must be <= 1".into(),
                });
            }
            self.0.check_param(name, value)
        }
    }

    #[test]
    fn names_are_case_insensitive() {
        let mut t = table();
        t.set_param_str("DEATHRATE", " 0.25 ").unwrap();
        assert_eq!(t.float("deathrate"), Some(0.25));
        assert_eq!(t.kind_of("DeathRate"), Some(ParamKind::Float));
    }

    #[test]
    fn type_mismatch_is_reported() {
        let mut t = table();
        assert_eq!(
            t.set_param_str("spawn", "maybe"),
            Err(ParamError::TypeMismatch {
                name: "spawn".into(),
                expected: ParamKind::Bool,
                raw: "maybe".into(),
            })
        );
        assert!(matches!(
            t.set_param_str("maxspawn", "2.5"),
            Err(ParamError::TypeMismatch { .. })
        ));
        assert!(matches!(
            t.set_param_str("nosuch", "1"),
            Err(ParamError::Unknown { .. })
        ));
    }

    #[test]
    fn check_param_leaves_store_untouched() {
        let t = table();
        assert_eq!(t.check_param("DeathRate", &ParamValue::Float(0.7)), Ok(()));
        assert!(matches!(
            t.check_param("spawn", &ParamValue::Int(1)),
            Err(ParamError::TypeMismatch { .. })
        ));
        assert!(matches!(
            t.check_param("nosuch", &ParamValue::Int(1)),
            Err(ParamError::Unknown { .. })
        ));
        assert_eq!(t, table());
    }

    #[test]
    fn file_text_applies_all_lines() {
        let mut t = table();
        let text = "# comment\n\ndeathrate = 0.5\n// other\nspawn = true\nmaxspawn=7\n";
        assert_eq!(apply_param_text(text, &mut t).unwrap(), 3);
        assert_eq!(t.float("deathrate"), Some(0.5));
        assert_eq!(t.flag("spawn"), Some(true));
        assert_eq!(t.get_param("maxspawn"), Some(ParamValue::Int(7)));
    }

    #[test]
    fn bad_line_aborts_without_partial_application() {
        let mut t = table();
        let text = "deathrate = 0.5\nspawn = true\nbogus = 1\n";
        assert_eq!(
            apply_param_text(text, &mut t),
            Err(ParamFileError::Invalid {
                line: 3,
                source: ParamError::Unknown {
                    name: "bogus".into()
                },
            })
        );
        assert_eq!(t, table());
    }

    #[test]
    fn syntax_error_carries_line_number() {
        let mut t = table();
        let err = apply_param_text("deathrate = 0.1\n\nspawn true\n", &mut t).unwrap_err();
        assert_eq!(
            err,
            ParamFileError::Syntax {
                line: 3,
                text: "spawn true".into()
            }
        );
        assert_eq!(t.float("deathrate"), Some(0.0));
    }

    #[test]
    fn domain_rejection_rolls_back_earlier_lines() {
        let mut b = Bounded(table());
        let text = "spawn = true\nmaxspawn = 9\n\ndeathrate = 2.0\n";
        let err = apply_param_text(text, &mut b).unwrap_err();
        assert!(matches!(
            err,
            ParamFileError::Invalid {
                line: 4,
                source: ParamError::OutOfRange { .. }
            }
        ));
        assert_eq!(b.0, table());
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut t = table();
        let err = load_param_file(Path::new("/definitely/not/here.txt"), &mut t).unwrap_err();
        assert!(matches!(err, ParamFileError::Io { .. }));
    }

    #[test]
    fn text_is_not_batchable() {
        assert!(!ParamKind::Text.is_batchable());
        assert!(ParamKind::Bool.is_batchable());
        assert_eq!(ParamKind::Float.parse("inf"), None);
    }
}
