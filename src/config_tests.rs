use crate::config::AssemblerConfig;
use crate::error::AssemblyError;
use crate::stream::Endian;

#[test]
fn test_defaults() {
    let config = AssemblerConfig::default();
    assert_eq!(config.base_address, 0);
    assert!(config.check_displacement_overflow);
    assert_eq!(config.endian, Endian::Little);
    assert!(!config.listing);
}

#[test]
fn test_empty_file_gives_defaults() {
    let config = AssemblerConfig::from_toml_str("").unwrap();
    assert_eq!(config, AssemblerConfig::default());
}

#[test]
fn test_full_file() {
    let config = AssemblerConfig::from_toml_str(
        r#"
        base_address = 0x00400000
        check_displacement_overflow = false
        endian = "big"
        listing = true
        "#,
    )
    .unwrap();
    assert_eq!(config.base_address, 0x0040_0000);
    assert!(!config.check_displacement_overflow);
    assert_eq!(config.endian, Endian::Big);
    assert!(config.listing);
}

#[test]
fn test_unknown_field_rejected() {
    let result = AssemblerConfig::from_toml_str("origin = 16\n");
    assert!(matches!(result, Err(AssemblyError::Config(_))));
}

#[test]
fn test_bad_endian_rejected() {
    let result = AssemblerConfig::from_toml_str("endian = \"middle\"\n");
    assert!(matches!(result, Err(AssemblyError::Config(_))));
}

#[test]
fn test_unaligned_base_rejected() {
    let result = AssemblerConfig::from_toml_str("base_address = 0x102\n");
    match result {
        Err(AssemblyError::Config(msg)) => assert!(msg.contains("0x00000102"), "{}", msg),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
fn test_load_missing_file() {
    let result = AssemblerConfig::load("/nonexistent/mipsasm.toml");
    assert!(matches!(result, Err(AssemblyError::Io(_))));
}
