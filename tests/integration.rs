use std::{fs, path::PathBuf, process::Command};

fn run_bin(args: &[&str]) -> bool {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_herd"));

    let output = Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command");

    output.status.success()
}

fn check_bin(args: &[&str]) {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_herd"));

    let output = Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command");

    let stdout_str =
        std::str::from_utf8(&output.stdout).expect("failed to convert stdout to string");
    let stderr_str =
        std::str::from_utf8(&output.stderr).expect("failed to convert stderr to string");

    assert!(
        output.status.success(),
        "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
    );
}

fn create_test_dir(name: &str, config_contents: &str) -> PathBuf {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    fs::write(test_dir.join("config.toml"), config_contents)
        .expect("failed to write config file");

    test_dir
}

#[test]
fn basic_workflow() {
    let config_contents = String::new()
        + "[virus]\n"
        + "name = \"Ebola\"\n"
        + "mortality_rate = 0.5\n"
        + "transmission_prob = 0.7\n"
        + "\n"
        + "[population]\n"
        + "size = 100\n"
        + "vacc_percentage = 0.2\n"
        + "initial_infected = 5\n";
    let test_dir = create_test_dir("basic_workflow", &config_contents);
    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    check_bin(&["--sim-dir", test_dir_str, "create"]);
    check_bin(&["--sim-dir", test_dir_str, "create"]);

    let events = fs::read_to_string(test_dir.join("run-0000").join("events.log"))
        .expect("failed to read event log");
    let mut lines = events.lines();
    assert!(lines.next().is_some_and(|line| line.starts_with("# virus=Ebola")));
    assert_eq!(lines.next(), Some("step 0: 5 infected"));
    assert!(test_dir.join("run-0001").join("record.msgpack").is_file());

    check_bin(&["--sim-dir", test_dir_str, "replay", "--run-idx", "0"]);
    check_bin(&["--sim-dir", test_dir_str, "replay", "--run-idx", "1"]);

    let replay = fs::read_to_string(test_dir.join("run-0000").join("replay.log"))
        .expect("failed to read replay log");
    assert_eq!(events, replay);

    check_bin(&["--sim-dir", test_dir_str, "analyze"]);
    let results = fs::read_to_string(test_dir.join("results.json"))
        .expect("failed to read results");
    assert!(results.contains("\"n_runs\": 2"));

    check_bin(&["--sim-dir", test_dir_str, "clean"]);
    assert!(!test_dir.join("run-0000").exists());
    assert!(!test_dir.join("results.json").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn fixed_seed_reproduces_runs() {
    let config_contents = String::new()
        + "[virus]\n"
        + "name = \"Measles\"\n"
        + "mortality_rate = 0.3\n"
        + "transmission_prob = 0.4\n"
        + "\n"
        + "[population]\n"
        + "size = 200\n"
        + "vacc_percentage = 0.5\n"
        + "\n"
        + "[run]\n"
        + "seed = 42\n";
    let test_dir = create_test_dir("fixed_seed", &config_contents);
    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    check_bin(&["--sim-dir", test_dir_str, "create"]);
    check_bin(&["--sim-dir", test_dir_str, "create"]);

    let read_run = |run_dir: &str| {
        let dir = test_dir.join(run_dir);
        let events = fs::read(dir.join("events.log")).expect("failed to read event log");
        let record = fs::read(dir.join("record.msgpack")).expect("failed to read record");
        (events, record)
    };
    assert_eq!(read_run("run-0000"), read_run("run-0001"));

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn invalid_config_fails() {
    let config_contents = String::new()
        + "[virus]\n"
        + "name = \"Ebola\"\n"
        + "mortality_rate = 1.5\n"
        + "transmission_prob = 0.7\n"
        + "\n"
        + "[population]\n"
        + "size = 100\n"
        + "vacc_percentage = 0.2\n";
    let test_dir = create_test_dir("invalid_config", &config_contents);
    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    assert!(!run_bin(&["--sim-dir", test_dir_str, "create"]));
    assert!(!test_dir.join("run-0000").exists());

    fs::remove_dir_all(&test_dir).ok();
}
