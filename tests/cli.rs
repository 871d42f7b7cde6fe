use assert_cmd::Command;

#[test]
fn list_demos_prints_bundled_recipes() {
    let output = Command::cargo_bin("sous")
        .unwrap()
        .arg("--list-demos")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    assert!(text.lines().any(|l| l == "grilled-cheese"));
    assert!(text.lines().any(|l| l == "smash-burger"));
}

#[test]
fn unknown_demo_is_rejected() {
    Command::cargo_bin("sous")
        .unwrap()
        .args(["--demo", "no-such-dish"])
        .assert()
        .failure();
}

#[test]
fn recipe_and_demo_conflict() {
    Command::cargo_bin("sous")
        .unwrap()
        .args(["--demo", "grilled-cheese", "--recipe", "x.json"])
        .assert()
        .failure();
}

#[test]
fn forget_clears_selection_and_continues() {
    let output = Command::cargo_bin("sous")
        .unwrap()
        .args(["--forget", "--list-demos"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert!(String::from_utf8(output).unwrap().contains("grilled-cheese"));
}
