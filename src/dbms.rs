//! Database systems a shared document store can live in

use std::fmt;
use std::str::FromStr;

/// Supported database systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbmsType {
    MySql,
    Oracle,
    PostgreSql,
}

impl DbmsType {
    pub const ALL: [DbmsType; 3] = [DbmsType::MySql, DbmsType::Oracle, DbmsType::PostgreSql];

    pub fn display_name(&self) -> &'static str {
        match self {
            DbmsType::MySql => "MySQL",
            DbmsType::Oracle => "Oracle",
            DbmsType::PostgreSql => "PostgreSQL",
        }
    }

    /// JDBC driver class used by other clients of the same store
    pub fn driver_class_path(&self) -> &'static str {
        match self {
            DbmsType::MySql => "org.mariadb.jdbc.Driver",
            DbmsType::Oracle => "oracle.jdbc.driver.OracleDriver",
            DbmsType::PostgreSql => "org.postgresql.Driver",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            DbmsType::MySql => 3306,
            DbmsType::Oracle => 1521,
            DbmsType::PostgreSql => 5432,
        }
    }

    /// Connection URL for `database` on `host:port`
    pub fn url(&self, host: &str, port: u16, database: &str) -> String {
        match self {
            DbmsType::MySql => format!("jdbc:mariadb://{}:{}/{}", host, port, database),
            DbmsType::Oracle => format!("jdbc:oracle:thin:@{}:{}:{}", host, port, database),
            DbmsType::PostgreSql => format!("jdbc:postgresql://{}:{}/{}", host, port, database),
        }
    }

    /// Case-insensitive lookup by variant name ("mysql", "ORACLE", "PostgreSQL")
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "MYSQL" => Some(DbmsType::MySql),
            "ORACLE" => Some(DbmsType::Oracle),
            "POSTGRESQL" => Some(DbmsType::PostgreSql),
            _ => None,
        }
    }
}

impl fmt::Display for DbmsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown database system: {0}")]
pub struct UnknownDbmsType(pub String);

impl FromStr for DbmsType {
    type Err = UnknownDbmsType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownDbmsType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_case_insensitive() {
        assert_eq!(DbmsType::from_name("mysql"), Some(DbmsType::MySql));
        assert_eq!(DbmsType::from_name("Oracle"), Some(DbmsType::Oracle));
        assert_eq!(DbmsType::from_name("POSTGRESQL"), Some(DbmsType::PostgreSql));
        assert_eq!(DbmsType::from_name("sqlite"), None);
        assert_eq!(DbmsType::from_name(""), None);
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for dbms in DbmsType::ALL {
            assert_eq!(dbms.to_string().parse::<DbmsType>().unwrap(), dbms);
        }
        assert!("db2".parse::<DbmsType>().is_err());
    }

    #[test]
    fn test_urls_and_ports() {
        assert_eq!(
            DbmsType::MySql.url("localhost", DbmsType::MySql.default_port(), "refs"),
            "jdbc:mariadb://localhost:3306/refs"
        );
        assert_eq!(
            DbmsType::Oracle.url("db.local", 1521, "XE"),
            "jdbc:oracle:thin:@db.local:1521:XE"
        );
        assert_eq!(
            DbmsType::PostgreSql.url("pg", 5433, "lib"),
            "jdbc:postgresql://pg:5433/lib"
        );
        assert_eq!(DbmsType::PostgreSql.default_port(), 5432);
        assert_eq!(DbmsType::Oracle.driver_class_path(), "oracle.jdbc.driver.OracleDriver");
    }
}
