// tests/local_solver.rs

//! Full runs through `cellfarm::run` with a shell script standing in for
//! the solver on the local machine.

#![cfg(unix)]

mod common;
use crate::common::with_timeout;

use std::fs;
use std::path::Path;

use clap::Parser;
use tempfile::tempdir;

use cellfarm::cli::CliArgs;

fn write_farm(dir: &Path) {
    let root = dir.join("cache");
    fs::write(
        dir.join("solver.sh"),
        format!(
            "#!/bin/sh\n\
             echo \"solving $1 $2 $3\"\n\
             mkdir -p '{root}/scores' '{root}/strats'\n\
             echo \"$1 $2 $3\" > '{root}/strats/'\"$1_$2_$3\".dat\n\
             echo \"$1 $2 $3\" > '{root}/scores/'\"$1_$2_$3\".dat\n",
            root = root.display()
        ),
    )
    .unwrap();
    fs::create_dir_all(dir.join("distributed")).unwrap();
    fs::write(dir.join("distributed/machines.txt"), "here\n").unwrap();
    fs::write(
        dir.join("Cellfarm.toml"),
        format!(
            r#"
[grid]
a_max = 0
b_max = 1

[store]
root = "cache"

[solver]
program = "sh"
subcommand = "{script}"

[control]
poll_interval_ms = 5
"#,
            script = dir.join("solver.sh").display()
        ),
    )
    .unwrap();
}

fn args(dir: &Path, extra: &[&str]) -> CliArgs {
    let config = dir.join("Cellfarm.toml");
    let mut argv = vec!["cellfarm", "--config", config.to_str().unwrap()];
    argv.extend_from_slice(extra);
    CliArgs::try_parse_from(argv).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn local_run_solves_every_cell() {
    let dir = tempdir().unwrap();
    write_farm(dir.path());

    with_timeout(cellfarm::run(args(dir.path(), &[]))).await.unwrap();

    // (0,1,0..=4), then (0,0,0..=2).
    let scores = dir.path().join("cache/scores");
    for (b, t_max) in [(1, 4), (0, 2)] {
        for t in 0..=t_max {
            assert!(scores.join(format!("0_{b}_{t}.dat")).is_file(), "0 {b} {t}");
        }
    }
    assert_eq!(fs::read_dir(&scores).unwrap().count(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_run_over_finished_store_dispatches_nothing() {
    let dir = tempdir().unwrap();
    write_farm(dir.path());
    with_timeout(cellfarm::run(args(dir.path(), &[]))).await.unwrap();

    // Break the solver: any dispatch would now fail to produce markers.
    fs::write(dir.path().join("solver.sh"), "#!/bin/sh\nexit 3\n").unwrap();
    with_timeout(cellfarm::run(args(dir.path(), &[]))).await.unwrap();

    assert_eq!(fs::read_dir(dir.path().join("cache/scores")).unwrap().count(), 8);
}

#[tokio::test]
async fn dry_run_touches_nothing() {
    let dir = tempdir().unwrap();
    write_farm(dir.path());

    cellfarm::run(args(dir.path(), &["--dry-run"])).await.unwrap();

    assert!(!dir.path().join("cache").exists());
}
