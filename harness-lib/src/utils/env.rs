use rama::error::{BoxError, ErrorContext as _, ErrorExt as _};

pub const fn project_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}

pub const fn network_service_identifier() -> &'static str {
    concat!("echo-harness/", env!("CARGO_PKG_VERSION"))
}

/// Read a required environment variable.
///
/// A missing, empty or non-unicode value is a configuration error.
pub fn required_var(name: &'static str) -> Result<String, BoxError> {
    let value = std::env::var(name)
        .context("read required environment variable")
        .context_field("name", name)?;

    let value = value.trim();
    if value.is_empty() {
        return Err(BoxError::from("required environment variable is empty")
            .context_field("name", name));
    }

    Ok(value.to_owned())
}
