use std::io::Write;
use trellis_expr::ExpressionMode;
use trellis_render::{RenderConfig, RenderError};
use trellis_schema::Breakpoint;

#[test]
fn defaults() {
    let config = RenderConfig::default();
    assert_eq!(config.expression_mode, ExpressionMode::Lenient);
    assert_eq!(config.max_depth, 64);
    assert_eq!(config.default_breakpoint, Breakpoint::Md);
    assert_eq!(config.expression_cache_size, 256);
}

#[test]
fn parses_render_table() {
    let config = RenderConfig::from_toml_str(
        r#"
[render]
expression_mode = "strict"
max_depth = 12
default_breakpoint = "2xl"
"#,
    )
    .unwrap();
    assert_eq!(config.expression_mode, ExpressionMode::Strict);
    assert_eq!(config.max_depth, 12);
    assert_eq!(config.default_breakpoint, Breakpoint::Xxl);
    assert_eq!(config.expression_cache_size, 256);
}

#[test]
fn missing_table_yields_defaults() {
    let config = RenderConfig::from_toml_str("[other]\nkey = 1\n").unwrap();
    assert_eq!(config, RenderConfig::default());
}

#[test]
fn unknown_mode_is_a_config_error() {
    let err = RenderConfig::from_toml_str("[render]\nexpression_mode = \"loud\"\n").unwrap_err();
    assert!(matches!(err, RenderError::Config(_)));
}

#[test]
fn load_from_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[render]\nmax_depth = 3").unwrap();

    let config = RenderConfig::load_from(file.path());
    assert_eq!(config.max_depth, 3);
}

#[test]
fn load_from_missing_file_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let config = RenderConfig::load_from(&dir.path().join("trellis.toml"));
    assert_eq!(config, RenderConfig::default());
}

#[test]
fn load_from_malformed_file_falls_back() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[render\nmax_depth = ").unwrap();

    let config = RenderConfig::load_from(file.path());
    assert_eq!(config, RenderConfig::default());
}
