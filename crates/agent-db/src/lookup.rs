use rusqlite::types::Value as SqlValue;
use std::fmt;

/// A single-field catalog search.
///
/// Text fields match when the stored column contains the value (case-sensitive).
/// `Year` matches the stored year exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Actor(String),
    Title(String),
    Director(String),
    Genre(String),
    Year(i64),
}

impl Lookup {
    /// Name of the searchable column this lookup targets.
    pub fn column(&self) -> &'static str {
        match self {
            Lookup::Actor(_) => "actors",
            Lookup::Title(_) => "name",
            Lookup::Director(_) => "director",
            Lookup::Genre(_) => "genre",
            Lookup::Year(_) => "year",
        }
    }

    /// Human-facing field name ("actor", "title", ...).
    pub fn field(&self) -> &'static str {
        match self {
            Lookup::Actor(_) => "actor",
            Lookup::Title(_) => "title",
            Lookup::Director(_) => "director",
            Lookup::Genre(_) => "genre",
            Lookup::Year(_) => "year",
        }
    }

    /// SQL for this lookup. Only the column name is spliced in, and it comes
    /// from a fixed set; the search value is always bound as `?1`.
    pub(crate) fn sql(&self) -> String {
        match self {
            Lookup::Year(_) => "SELECT json FROM movies WHERE year = ?1 ORDER BY id".to_string(),
            _ => format!(
                "SELECT json FROM movies WHERE instr({}, ?1) > 0 ORDER BY id",
                self.column()
            ),
        }
    }

    pub(crate) fn param(&self) -> SqlValue {
        match self {
            Lookup::Actor(v) | Lookup::Title(v) | Lookup::Director(v) | Lookup::Genre(v) => {
                SqlValue::Text(v.clone())
            }
            Lookup::Year(y) => SqlValue::Integer(*y),
        }
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Actor(v) | Lookup::Title(v) | Lookup::Director(v) | Lookup::Genre(v) => {
                write!(f, "{}={:?}", self.field(), v)
            }
            Lookup::Year(y) => write!(f, "year={}", y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_lookup_binds_value() {
        let lookup = Lookup::Actor("O'Brien".into());
        assert_eq!(lookup.column(), "actors");
        assert!(lookup.sql().contains("instr(actors, ?1)"));
        assert!(!lookup.sql().contains("O'Brien"));
        assert_eq!(lookup.param(), SqlValue::Text("O'Brien".into()));
    }

    #[test]
    fn test_year_lookup_is_exact() {
        let lookup = Lookup::Year(1994);
        assert!(lookup.sql().contains("year = ?1"));
        assert_eq!(lookup.param(), SqlValue::Integer(1994));
    }

    #[test]
    fn test_title_maps_to_name_column() {
        assert_eq!(Lookup::Title("Heat".into()).column(), "name");
        assert_eq!(Lookup::Title("Heat".into()).to_string(), "title=\"Heat\"");
    }
}
