//! Integration tests for the `example run` command.
use elecplan::cli::RunOpts;
use elecplan::cli::example::handle_example_run_command;
use elecplan::settings::Settings;
use serde::Deserialize;
use tempfile::tempdir;

#[derive(Deserialize)]
struct ElectrificationRow {
    year: u32,
    target: Option<f64>,
    achieved_rate: f64,
    target_met: bool,
}

/// An integration test for the `example run` command.
///
/// Also checks that the electrification targets of the demo model are respected.
#[test]
fn test_handle_example_run_command() {
    unsafe { std::env::set_var("ELECPLAN_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let opts = RunOpts {
        output_dir: Some(tempdir.path().to_path_buf()),
        ..RunOpts::default()
    };
    handle_example_run_command("simple", &opts, Some(Settings::default())).unwrap();

    for scenario in ["baseline", "ambitious", "isolated"] {
        let file_path = tempdir.path().join(scenario).join("electrification.csv");
        let rows: Vec<ElectrificationRow> = csv::Reader::from_path(file_path)
            .unwrap()
            .into_deserialize()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            rows.iter().map(|row| row.year).collect::<Vec<_>>(),
            [2025, 2030]
        );

        let mut last_rate = 0.0;
        for row in rows {
            let target = row.target.unwrap();
            assert!(row.achieved_rate <= target + 1e-9);
            assert!(row.achieved_rate >= last_rate);
            assert!(row.target_met || row.achieved_rate < target);
            last_rate = row.achieved_rate;
        }
    }
}
