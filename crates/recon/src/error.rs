#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad view filter, empty marker list, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Entity kind name not in the catalogue.
    #[error("unknown entity kind: {0}")]
    UnknownEntity(String),
    /// A view references a column the report does not have.
    #[error("view '{view}': unknown column '{column}'")]
    UnknownColumn { view: String, column: String },
}
