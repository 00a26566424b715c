use legtrack_recon::EntityKind;

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("snapshot store: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("xlsx: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A stored row whose timestamp text does not parse.
    #[error("{entity}: row {id} has malformed timestamp '{value}'")]
    BadTimestamp { entity: String, id: i64, value: String },
    /// The operation does not apply to this entity kind's refresh mode.
    #[error("{kind}: {message}")]
    WrongRefresh { kind: EntityKind, message: String },
}
