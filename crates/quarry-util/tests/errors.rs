use quarry_util::errors::QuarryError;

#[test]
fn test_io_error_display() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err = QuarryError::from(io_err);
    assert!(err.to_string().contains("I/O error"), "got: {err}");
}

#[test]
fn test_config_error_display() {
    let err = QuarryError::Config {
        message: "bad syntax".to_string(),
    };
    assert_eq!(err.to_string(), "Configuration error: bad syntax");
}

#[test]
fn test_parse_error_display() {
    let err = QuarryError::parse("maven-metadata.xml", "unexpected EOF");
    assert_eq!(
        err.to_string(),
        "Failed to parse maven-metadata.xml: unexpected EOF"
    );
}

#[test]
fn test_network_error_display() {
    let err = QuarryError::Network {
        message: "timeout".to_string(),
    };
    assert_eq!(err.to_string(), "Network error: timeout");
}

#[test]
fn test_generic_error_display() {
    let err = QuarryError::Generic {
        message: "something broke".to_string(),
    };
    assert_eq!(err.to_string(), "something broke");
}

#[test]
fn test_io_error_from_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: QuarryError = io_err.into();
    assert!(matches!(err, QuarryError::Io(_)));
}
