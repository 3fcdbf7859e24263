/// Result type used at the application and presentation edges.
pub type Result<T> = anyhow::Result<T>;
