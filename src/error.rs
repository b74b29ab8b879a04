pub type ChartResult<T> = Result<T, ChartError>;

#[derive(thiserror::Error, Debug)]
pub enum ChartError {
    #[error("input read error: {0}")]
    InputRead(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("malformed timestamp: {0}")]
    MalformedTimestamp(String),

    #[error("insufficient data for interpolation: {0}")]
    InsufficientData(String),

    #[error("render sink error: {0}")]
    RenderSink(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChartError {
    pub fn input_read(msg: impl Into<String>) -> Self {
        Self::InputRead(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn malformed_timestamp(msg: impl Into<String>) -> Self {
        Self::MalformedTimestamp(msg.into())
    }

    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Self::InsufficientData(msg.into())
    }

    pub fn render_sink(msg: impl Into<String>) -> Self {
        Self::RenderSink(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            ChartError::input_read("x")
                .to_string()
                .contains("input read error:")
        );
        assert!(ChartError::schema("x").to_string().contains("schema error:"));
        assert!(
            ChartError::malformed_timestamp("x")
                .to_string()
                .contains("malformed timestamp:")
        );
        assert!(
            ChartError::insufficient_data("x")
                .to_string()
                .contains("insufficient data for interpolation:")
        );
        assert!(
            ChartError::render_sink("x")
                .to_string()
                .contains("render sink error:")
        );
        assert!(
            ChartError::validation("x")
                .to_string()
                .contains("validation error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ChartError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
