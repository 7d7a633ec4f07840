use assert_cmd::Command;
use predicates::str::contains;
use tempfile::tempdir;

fn cli() -> Command {
    Command::cargo_bin("stock-allocator").unwrap()
}

#[test]
fn sample_then_run_produces_results() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("input");
    let output = dir.path().join("output");

    cli()
        .args(["sample", "--output"])
        .arg(&input)
        .args(["--seed", "3"])
        .assert()
        .success()
        .stdout(contains("Archivo de prueba escrito"));

    cli()
        .args(["run", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(contains("Asignación Flujo"))
        .stdout(contains("Total asignado por cliente"));

    assert!(output.join("asignacion_flujo.csv").is_file());
    assert!(output.join("minimos_asignacion.csv").is_file());
}

#[test]
fn policy_flag_overrides_config_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    let config = dir.path().join("allocator.toml");
    std::fs::write(&config, "policy = \"carried-flow\"\n").unwrap();

    cli().args(["sample", "--output"]).arg(&input).assert().success();

    cli()
        .args(["run", "--policy", "push-overflow", "--config"])
        .arg(&config)
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    assert!(output.join("asignacion_optima.csv").is_file());
    assert!(!output.join("asignacion_flujo.csv").exists());
}

#[test]
fn summary_prints_the_input_overview() {
    let dir = tempdir().unwrap();
    cli()
        .args(["sample", "--products", "3", "--months", "2", "--output"])
        .arg(dir.path())
        .assert()
        .success();

    cli()
        .args(["summary", "--input"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(contains("- Meses: 2"))
        .stdout(contains("- Clientes: 3"));
}

#[test]
fn missing_workbook_fails_with_the_cause() {
    let dir = tempdir().unwrap();
    cli()
        .args(["run", "--input"])
        .arg(dir.path().join("nowhere"))
        .arg("--output")
        .arg(dir.path().join("out"))
        .assert()
        .failure()
        .stderr(contains("Error al procesar el archivo"))
        .stderr(contains("Missing table 'Stock Disponible'"));
}
