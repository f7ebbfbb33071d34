use std::fmt;

#[derive(Debug, Clone)]
pub enum LinkforgeError {
    CacheConnection(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Validation(String),
    PurgeFailed(String),
}

impl LinkforgeError {
    /// Stable error code, used in logs and operator-facing output.
    pub fn code(&self) -> &'static str {
        match self {
            LinkforgeError::CacheConnection(_) => "E001",
            LinkforgeError::DatabaseConfig(_) => "E002",
            LinkforgeError::DatabaseConnection(_) => "E003",
            LinkforgeError::DatabaseOperation(_) => "E004",
            LinkforgeError::Validation(_) => "E005",
            LinkforgeError::PurgeFailed(_) => "E006",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            LinkforgeError::CacheConnection(_) => "Cache Connection Error",
            LinkforgeError::DatabaseConfig(_) => "Database Configuration Error",
            LinkforgeError::DatabaseConnection(_) => "Database Connection Error",
            LinkforgeError::DatabaseOperation(_) => "Database Operation Error",
            LinkforgeError::Validation(_) => "Validation Error",
            LinkforgeError::PurgeFailed(_) => "Purge Job Failed",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            LinkforgeError::CacheConnection(msg) => msg,
            LinkforgeError::DatabaseConfig(msg) => msg,
            LinkforgeError::DatabaseConnection(msg) => msg,
            LinkforgeError::DatabaseOperation(msg) => msg,
            LinkforgeError::Validation(msg) => msg,
            LinkforgeError::PurgeFailed(msg) => msg,
        }
    }
}

impl fmt::Display for LinkforgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type(), self.message())
    }
}

impl std::error::Error for LinkforgeError {}

// 便捷的构造函数
impl LinkforgeError {
    pub fn cache_connection<T: Into<String>>(msg: T) -> Self {
        LinkforgeError::CacheConnection(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        LinkforgeError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        LinkforgeError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        LinkforgeError::DatabaseOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        LinkforgeError::Validation(msg.into())
    }

    pub fn purge_failed<T: Into<String>>(msg: T) -> Self {
        LinkforgeError::PurgeFailed(msg.into())
    }
}

impl From<sea_orm::DbErr> for LinkforgeError {
    fn from(err: sea_orm::DbErr) -> Self {
        LinkforgeError::DatabaseOperation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LinkforgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(LinkforgeError::cache_connection("x").code(), "E001");
        assert_eq!(LinkforgeError::database_config("x").code(), "E002");
        assert_eq!(LinkforgeError::database_connection("x").code(), "E003");
        assert_eq!(LinkforgeError::database_operation("x").code(), "E004");
        assert_eq!(LinkforgeError::validation("x").code(), "E005");
        assert_eq!(LinkforgeError::purge_failed("x").code(), "E006");
    }

    #[test]
    fn test_display_carries_type_and_message() {
        let err = LinkforgeError::validation("alphabet too short");
        assert!(err.to_string().contains("Validation Error"));
        assert!(err.to_string().contains("alphabet too short"));
    }

    #[test]
    fn test_db_errors_convert() {
        let err: LinkforgeError = sea_orm::DbErr::Custom("connection lost".to_string()).into();
        assert!(matches!(err, LinkforgeError::DatabaseOperation(_)));
        assert!(err.to_string().contains("connection lost"));
    }
}
