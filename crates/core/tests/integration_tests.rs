//! Integration tests for paramgate-core
//!
//! These tests drive complete workflows through the public API: configuration
//! parsing, store construction, validation, and the interpolation and
//! environment projection of the results.

use std::io::Write;

use indexmap::IndexMap;
use paramgate_core::{
    command_definitions::{ArgsConfig, CommandDefinition, ParameterDefinition},
    constraints::{ConstraintError, FilesystemError, MemoryFileSystem, OsFileSystem},
    engine::{Engine, Outcome},
    error::Error,
    file_handling::{load_app_config, parse_app_config},
    input::Invocation,
    interpolation::EnvVar,
    store::Scope,
    value::Value,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::{NamedTempFile, TempDir};

fn command(yaml: &str) -> CommandDefinition {
    parse_app_config(yaml).unwrap().root
}

fn run<'a>(engine: &Engine, command: &'a CommandDefinition, argv: &[&str]) -> Outcome<'a> {
    engine.process_command(command, argv).unwrap()
}

fn error_of(engine: &Engine, command: &CommandDefinition, argv: &[&str]) -> Option<String> {
    run(engine, command, argv).error.map(|e| e.to_string())
}

#[test]
fn test_missing_required_names_parameter() {
    let command = command("name: c\nargs:\n  - name: target\n    required: true\n");
    let engine = Engine::new();

    assert_eq!(
        error_of(&engine, &command, &[]),
        Some("missing required argument: target".to_string())
    );
    assert_eq!(error_of(&engine, &command, &["x"]), None);
}

#[rstest]
#[case("6", true)]
#[case("5", false)]
#[case("4", false)]
#[case("5.5", true)]
fn test_greater_than_boundary(#[case] input: &str, #[case] passes: bool) {
    let command = command("name: c\nargs:\n  - name: n\n    type: number\n    constraints:\n      gt: 5\n");
    let outcome = run(&Engine::new(), &command, &[input]);
    assert_eq!(outcome.is_valid(), passes);
}

#[test]
fn test_number_round_trip() {
    let command = command("name: c\nargs:\n  - name: n\n    type: number\n");
    let engine = Engine::new();
    let params = run(&engine, &command, &["42"]).into_result().unwrap();

    assert_eq!(params.args.get_val("n"), Some(Value::Float(42.0)));
    assert_eq!(params.args.get_val("list[0]"), Some(Value::Float(42.0)));
    assert_eq!(params.interpolate("${args.n}"), "42");
}

#[rstest]
#[case(&["a.txt", "http://x"], Some("conflicts with"))]
#[case(&["a.txt", ""], None)]
#[case(&["", "http://x"], None)]
fn test_conflict_scenario(#[case] argv: &[&str], #[case] expected: Option<&str>) {
    let command = command(
        "name: c\nargs:\n  - name: file\n  - name: url\n    conflicts-with: [file]\n",
    );
    let error = error_of(&Engine::new(), &command, argv);
    match expected {
        Some(fragment) => assert!(error.unwrap().contains(fragment)),
        None => assert_eq!(error, None),
    }
}

#[rstest]
#[case(&["value", "x"], true)]
#[case(&["wrong", "x"], false)]
fn test_dependency_scenario(#[case] argv: &[&str], #[case] passes: bool) {
    let command = command(
        r#"
name: c
args:
  - name: dep
  - name: arg
    depends-on:
      - name: dep
        when:
          eq: value
"#,
    );
    assert_eq!(run(&Engine::new(), &command, argv).is_valid(), passes);
}

#[rstest]
#[case("abcd", true)]
#[case("ab", false)]
#[case("abcdef", false)]
#[case("123", false)]
fn test_string_constraint_scenario(#[case] input: &str, #[case] passes: bool) {
    let command = command(
        r#"
name: c
args:
  - name: value
    constraints:
      minLength: 3
      maxLength: 5
      pattern: "^[a-z]+$"
"#,
    );
    assert_eq!(run(&Engine::new(), &command, &[input]).is_valid(), passes);
}

#[test]
fn test_environment_projection() {
    let command = command("name: c\nargs:\n  - name: arg1\n");
    let engine = Engine::new();
    let params = run(&engine, &command, &["v1"]).into_result().unwrap();

    assert!(params.env_vars().contains(&EnvVar::new("ARGS_ARG1", "v1")));
    assert_eq!(
        params.args.env_vars(),
        vec![
            EnvVar::new("ARGS_ARG1", "v1"),
            EnvVar::new("ARGS_LIST_0", "v1"),
        ]
    );
}

#[test]
fn test_collaborator_contract_with_positional_only_input() {
    let args = ArgsConfig::new(vec![
        ParameterDefinition::new("name").required(),
        ParameterDefinition::new("count").of_type("int8"),
    ]);
    let engine = Engine::new();

    let outcome = engine
        .process("c", &args, &[], &Invocation::positional_only(&["n", "300"]))
        .unwrap();
    assert!(matches!(
        outcome.error,
        Some(Error::Conversion { ref name, .. }) if name == "count"
    ));
    assert_eq!(outcome.params.args.get_val("name"), Some(Value::from("n")));
    assert_eq!(outcome.params.args.get_val("count"), Some(Value::Int(0)));
}

#[test]
fn test_combinators_from_yaml() {
    let command = command(
        r#"
name: c
args:
  - name: port
    type: int
    constraints:
      or:
        - eq: 80
        - and:
            - gte: 1024
            - lte: 65535
      not:
        in: [8080]
"#,
    );
    let engine = Engine::new();

    assert!(run(&engine, &command, &["80"]).is_valid());
    assert!(run(&engine, &command, &["3000"]).is_valid());
    assert!(!run(&engine, &command, &["443"]).is_valid());
    assert!(!run(&engine, &command, &["8080"]).is_valid());
}

#[test]
fn test_nand_from_yaml() {
    let command = command(
        r#"
name: c
args:
  - name: word
    constraints:
      nand:
        - eq: root
        - eq: admin
"#,
    );
    let engine = Engine::new();

    assert!(run(&engine, &command, &["guest"]).is_valid());
    assert_eq!(
        error_of(&engine, &command, &["admin"]),
        Some(
            "Invalid argument `word`: Validation failed on `nand`: constraint 1 passed for value `admin`"
                .to_string()
        )
    );
}

#[test]
fn test_flags_and_scoped_dependencies() {
    let command = command(
        r#"
name: c
args:
  - name: output
    depends-on:
      - arg: flags.format
        when:
          in: [json, yaml]
flags:
  - name: format
    short: f
    default: text
  - name: quiet
    type: bool
    conflicts-with: [verbose]
  - name: verbose
    type: bool
    default: true
"#,
    );
    let engine = Engine::new();

    assert!(run(&engine, &command, &["out.json", "-f", "json"]).is_valid());
    assert!(matches!(
        run(&engine, &command, &["out.json"]).error,
        Some(Error::Dependency { scope: Scope::Args, .. })
    ));
    assert!(run(&engine, &command, &["--quiet", "-f=yaml"]).is_valid());
    assert_eq!(
        error_of(&engine, &command, &["--quiet", "--verbose", "-f=yaml"]),
        Some("flag quiet conflicts with verbose".to_string())
    );
}

#[test]
fn test_argument_count_rules_from_yaml() {
    let command = command(
        r#"
name: c
args:
  rules:
    - or:
        - no-args: true
        - exact-args: 2
"#,
    );
    let engine = Engine::new();

    assert!(run(&engine, &command, &[]).is_valid());
    assert!(run(&engine, &command, &["a", "b"]).is_valid());
    assert!(!run(&engine, &command, &["a"]).is_valid());
}

#[test]
fn test_typed_values_and_json_snapshot() {
    let command = command(
        r#"
name: c
args:
  - name: when
    type: date
  - name: timeout
    type: duration
flags:
  - name: retries
    type: uint8
    default: 3
"#,
    );
    let engine = Engine::new();
    let params = run(&engine, &command, &["2024-02-29", "1m30s"])
        .into_result()
        .unwrap();

    assert_eq!(
        params.to_json(),
        serde_json::json!({
            "args": {"list": ["2024-02-29", "1m30s"], "when": "2024-02-29", "timeout": "1m30s"},
            "flags": {"retries": 3},
        })
    );
    assert_eq!(
        params.interpolate("sleep ${args.timeout}; retry=${flags.retries}"),
        "sleep 1m30s; retry=3"
    );
}

#[test]
fn test_in_memory_filesystem_predicates() {
    let mut fs = MemoryFileSystem::new();
    fs.create_dir_all("/srv/data", 0o755);
    fs.write_file("/srv/data/notes.txt", "plain words\n", 0o644);
    fs.write_file("/srv/data/image.png", b"\x89PNG\r\n\x1a\n0000".to_vec(), 0o600);

    let command = command(
        r#"
name: c
args:
  - name: dir
    constraints:
      dir-exists: true
  - name: notes
    constraints:
      file-exists: true
      has-permissions: "0644"
      is-file-type: txt
  - name: image
    constraints:
      is-file-type: image/png
"#,
    );
    let engine = Engine::new().with_filesystem(fs);

    let valid = ["/srv/data", "/srv/data/notes.txt", "/srv/data/image.png"];
    assert!(run(&engine, &command, &valid).is_valid());

    let outcome = run(&engine, &command, &["/srv/data/notes.txt"]);
    assert!(matches!(
        outcome.error,
        Some(Error::Constraint {
            source: ConstraintError::Filesystem(FilesystemError::NotADirectory(_)),
            ..
        })
    ));

    let outcome = run(&engine, &command, &["/srv/data", "/srv/data/missing.txt"]);
    assert_eq!(
        outcome.error.map(|e| e.to_string()),
        Some("Invalid argument `notes`: File does not exist: /srv/data/missing.txt".to_string())
    );

    let outcome = run(
        &engine,
        &command,
        &["/srv/data", "/srv/data/notes.txt", "/srv/data/notes.txt"],
    );
    assert!(matches!(
        outcome.error,
        Some(Error::Constraint {
            source: ConstraintError::Filesystem(FilesystemError::ContentType { .. }),
            ..
        })
    ));
}

#[test]
fn test_real_filesystem_predicates() {
    let dir = TempDir::new().unwrap();
    let file_path = dir.path().join("config.json");
    std::fs::write(&file_path, "{\"key\": 1}").unwrap();

    let command = command(
        "name: c\nargs:\n  - name: path\n    constraints:\n      file-exists: true\n",
    );
    let engine = Engine::new().with_filesystem(OsFileSystem);

    assert!(run(&engine, &command, &[file_path.to_str().unwrap()]).is_valid());
    assert!(!run(&engine, &command, &[dir.path().to_str().unwrap()]).is_valid());
}

#[test]
fn test_load_and_process_from_file() {
    let yaml_content = r#"
name: tool
version: 0.3.0
commands:
  - name: serve
    args:
      - name: port
        type: uint16
        default: 8080
    flags:
      - name: host
        default: localhost
    start: serve --host ${flags.host} --port ${args.port}
"#;
    let mut temp_file = NamedTempFile::new().unwrap();
    write!(temp_file, "{}", yaml_content).unwrap();

    let engine = Engine::new();
    let config = load_app_config(temp_file.path().to_str().unwrap(), engine.registry()).unwrap();
    let (serve, consumed) = config.root.resolve(&["serve", "9000"]);
    assert_eq!(consumed, 1);

    let params = run(&engine, serve, &["9000", "--host", "0.0.0.0"])
        .into_result()
        .unwrap();
    assert_eq!(
        params.interpolate(serve.start.as_deref().unwrap()),
        "serve --host 0.0.0.0 --port 9000"
    );

    let params = run(&engine, serve, &[]).into_result().unwrap();
    assert_eq!(
        params.interpolate(serve.start.as_deref().unwrap()),
        "serve --host localhost --port 8080"
    );
}

#[test]
fn test_store_set_and_set_val_through_params() {
    let command = command("name: c\nargs:\n  - name: a\n  - name: b\n");
    let engine = Engine::new();
    let mut params = run(&engine, &command, &["1", "2"]).into_result().unwrap();

    params.args.set_val("a", "changed");
    assert_eq!(params.args.get_val("list[0]"), Some(Value::from("changed")));

    params.args.set_val("extra", 5_i64);
    params.set("cli.name", "tool");
    let vars: IndexMap<String, String> = params
        .env_vars()
        .into_iter()
        .map(|var| (var.name, var.value))
        .collect();
    assert_eq!(vars.get("ARGS_EXTRA").map(String::as_str), Some("5"));
    assert_eq!(vars.get("CLI_NAME").map(String::as_str), Some("tool"));
}
