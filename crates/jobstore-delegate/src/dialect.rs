//! Built-in dialects: identifiers, marshalling rules and the product
//! signature table used when no delegate is configured explicitly.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::conn::DatabaseMetadata;
use crate::marshal::{IntegerBooleanMarshaller, StandardMarshaller, TypeMarshaller};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dialect {
    Standard,
    PostgreSql,
    MsSql,
    Oracle,
    HsqlDb,
    Sybase,
    Db2v6,
    Db2v7,
    Db2v8,
    Sqlite,
}

impl Dialect {
    pub const ALL: [Dialect; 10] = [
        Dialect::Standard,
        Dialect::PostgreSql,
        Dialect::MsSql,
        Dialect::Oracle,
        Dialect::HsqlDb,
        Dialect::Sybase,
        Dialect::Db2v6,
        Dialect::Db2v7,
        Dialect::Db2v8,
        Dialect::Sqlite,
    ];

    /// Canonical identifier, as accepted in `store.driver_delegate`.
    pub fn identifier(&self) -> &'static str {
        match self {
            Dialect::Standard => "Standard",
            Dialect::PostgreSql => "PostgreSQL",
            Dialect::MsSql => "MSSQL",
            Dialect::Oracle => "Oracle",
            Dialect::HsqlDb => "HSQLDB",
            Dialect::Sybase => "Sybase",
            Dialect::Db2v6 => "DB2v6",
            Dialect::Db2v7 => "DB2v7",
            Dialect::Db2v8 => "DB2v8",
            Dialect::Sqlite => "SQLite",
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Dialect::Standard => &["StdJDBC", "Std"],
            Dialect::PostgreSql => &["Postgres"],
            Dialect::MsSql => &["SqlServer"],
            Dialect::Db2v8 => &["DB2"],
            _ => &[],
        }
    }

    pub fn marshaller(&self) -> Arc<dyn TypeMarshaller> {
        match self {
            Dialect::Db2v6 | Dialect::Db2v7 | Dialect::Db2v8 | Dialect::Sqlite => {
                Arc::new(IntegerBooleanMarshaller)
            }
            Dialect::Standard
            | Dialect::PostgreSql
            | Dialect::MsSql
            | Dialect::Oracle
            | Dialect::HsqlDb
            | Dialect::Sybase => Arc::new(StandardMarshaller),
        }
    }

    /// Look up a configured identifier.
    ///
    /// Case-insensitive; a trailing `Delegate` suffix and any `.` or `::`
    /// qualified path in front of the name are ignored, so
    /// `"db2v8"`, `"DB2v8Delegate"` and `"plugins::DB2v8"` all match.
    pub fn from_identifier(identifier: &str) -> Option<Dialect> {
        let wanted = normalize_identifier(identifier);
        if wanted.is_empty() {
            return None;
        }
        Dialect::ALL.into_iter().find(|d| {
            d.identifier().eq_ignore_ascii_case(&wanted)
                || d.aliases().iter().any(|a| a.eq_ignore_ascii_case(&wanted))
        })
    }

    /// Infer the dialect from a connection's product signature.
    ///
    /// Fails closed: products absent from the table return `None`.
    pub fn from_metadata(meta: &DatabaseMetadata) -> Option<Dialect> {
        let product = meta.product_name.trim();
        if starts_with_ignore_case(product, "DB2") {
            return match meta.major_version {
                None => Some(Dialect::Db2v8),
                Some(v) if v >= 8 => Some(Dialect::Db2v8),
                Some(7) => Some(Dialect::Db2v7),
                Some(6) => Some(Dialect::Db2v6),
                Some(_) => None,
            };
        }
        PRODUCT_SIGNATURES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(product))
            .map(|(_, dialect)| *dialect)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Exact product names (case-insensitive) and the dialect serving them.
/// DB2 products are matched by prefix and version in [`Dialect::from_metadata`].
pub const PRODUCT_SIGNATURES: &[(&str, Dialect)] = &[
    ("MySQL", Dialect::Standard),
    ("MariaDB", Dialect::Standard),
    ("H2", Dialect::Standard),
    ("Apache Derby", Dialect::Standard),
    ("PostgreSQL", Dialect::PostgreSql),
    ("Microsoft SQL Server", Dialect::MsSql),
    ("Oracle", Dialect::Oracle),
    ("HSQL Database Engine", Dialect::HsqlDb),
    ("Adaptive Server Enterprise", Dialect::Sybase),
    ("Sybase SQL Server", Dialect::Sybase),
    ("SQLite", Dialect::Sqlite),
];

/// Final path segment with any `Delegate` suffix removed.
pub(crate) fn normalize_identifier(identifier: &str) -> String {
    let trimmed = identifier.trim();
    let last = trimmed
        .rsplit(|c: char| c == '.' || c == ':')
        .next()
        .unwrap_or(trimmed);
    let lower = last.to_ascii_lowercase();
    match lower.strip_suffix("delegate") {
        Some(stem) if !stem.is_empty() => last[..stem.len()].to_string(),
        _ => last.to_string(),
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_resolve_case_insensitively() {
        assert_eq!(Dialect::from_identifier("DB2v8"), Some(Dialect::Db2v8));
        assert_eq!(Dialect::from_identifier("db2V8"), Some(Dialect::Db2v8));
        assert_eq!(Dialect::from_identifier("postgres"), Some(Dialect::PostgreSql));
        assert_eq!(Dialect::from_identifier("StdJDBC"), Some(Dialect::Standard));
    }

    #[test]
    fn qualified_and_suffixed_identifiers_resolve() {
        assert_eq!(Dialect::from_identifier("DB2v8Delegate"), Some(Dialect::Db2v8));
        assert_eq!(
            Dialect::from_identifier("com.example.store.DB2v7Delegate"),
            Some(Dialect::Db2v7)
        );
        assert_eq!(Dialect::from_identifier("plugins::MSSQL"), Some(Dialect::MsSql));
        assert_eq!(Dialect::from_identifier("StdJDBCDelegate"), Some(Dialect::Standard));
    }

    #[test]
    fn unknown_or_empty_identifiers_do_not_resolve() {
        assert_eq!(Dialect::from_identifier("Informix"), None);
        assert_eq!(Dialect::from_identifier(""), None);
        assert_eq!(Dialect::from_identifier("Delegate"), None);
        assert_eq!(Dialect::from_identifier("a.b."), None);
    }

    #[test]
    fn every_canonical_identifier_round_trips() {
        for d in Dialect::ALL {
            assert_eq!(Dialect::from_identifier(d.identifier()), Some(d));
        }
    }

    #[test]
    fn db2_family_and_sqlite_use_integer_booleans() {
        for d in Dialect::ALL {
            let expected = match d {
                Dialect::Db2v6 | Dialect::Db2v7 | Dialect::Db2v8 | Dialect::Sqlite => {
                    "integer_boolean"
                }
                _ => "standard",
            };
            assert_eq!(d.marshaller().name(), expected, "{d}");
        }
    }

    #[test]
    fn product_signatures_map_to_dialects() {
        let cases = [
            ("PostgreSQL", Dialect::PostgreSql),
            ("microsoft sql server", Dialect::MsSql),
            (" Oracle ", Dialect::Oracle),
            ("HSQL Database Engine", Dialect::HsqlDb),
            ("MySQL", Dialect::Standard),
            ("SQLite", Dialect::Sqlite),
            ("Adaptive Server Enterprise", Dialect::Sybase),
        ];
        for (product, dialect) in cases {
            let meta = DatabaseMetadata::new(product, "1.0");
            assert_eq!(Dialect::from_metadata(&meta), Some(dialect), "{product}");
        }
    }

    #[test]
    fn db2_version_selects_variant() {
        let meta = |major| DatabaseMetadata::new("DB2/LINUXX8664", "SQL11058").with_major_version(major);
        assert_eq!(Dialect::from_metadata(&meta(11)), Some(Dialect::Db2v8));
        assert_eq!(Dialect::from_metadata(&meta(8)), Some(Dialect::Db2v8));
        assert_eq!(Dialect::from_metadata(&meta(7)), Some(Dialect::Db2v7));
        assert_eq!(Dialect::from_metadata(&meta(6)), Some(Dialect::Db2v6));
        assert_eq!(Dialect::from_metadata(&meta(5)), None);
        let unknown = DatabaseMetadata::new("DB2 UDB for AS/400", "V7R4");
        assert_eq!(Dialect::from_metadata(&unknown), Some(Dialect::Db2v8));
    }

    #[test]
    fn unlisted_products_fail_closed() {
        for product in ["Informix Dynamic Server", "Firebird", "", "Postgre"] {
            assert_eq!(Dialect::from_metadata(&DatabaseMetadata::new(product, "1")), None);
        }
    }
}
