#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use instr_core::instrument::{Instrument, ParameterVariable};
use instr_core::mcrun::McrunExecutor;
use instr_core::run::{InstrumentRunner, MpiSetting, RunError, RunRequest};

const FAKE_MCRUN: &str = r#"#!/bin/sh
echo "$@" > "$(dirname "$0")/args.txt"
while [ "$#" -gt 0 ]; do
    if [ "$1" = "-d" ]; then
        shift
        folder="$1"
    fi
    shift
done
mkdir -p "$folder"
cat > "$folder/l_mon.dat" <<'DAT'
# type: array_1d(2)
# component: l_mon
# title: Wavelength monitor
# variables: L I I_err N
4.5 0.25 0.01 100
5.5 0.75 0.02 300
DAT
echo "Finally [guide_test: $folder]"
"#;

const FAILING_MCRUN: &str = "#!/bin/sh\necho 'compilation failed' >&2\nexit 3\n";

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write script");
    let mut permissions = fs::metadata(&path).expect("metadata").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).expect("chmod");
    path
}

fn instrument() -> Instrument {
    let mut instrument = Instrument::new("guide_test").with_source("guide_test.instr");
    instrument
        .add_parameter(ParameterVariable::new("wavelength").with_default(5.0))
        .expect("add");
    instrument
}

#[test]
fn executor_runs_process_and_loads_output_folder() {
    let bin = tempfile::tempdir().expect("bin dir");
    let out = tempfile::tempdir().expect("output dir");
    let script = write_script(bin.path(), "mcrun", FAKE_MCRUN);
    let executor = McrunExecutor::new(script, out.path());
    let instrument = instrument();
    let request = RunRequest::new(instrument.default_parameters(), 10_000)
        .with_mpi(MpiSetting::Processes(2));

    let data = executor
        .run_full_instrument(&instrument, &request)
        .expect("fake run succeeds");
    assert_eq!(data.folder.as_deref(), Some(out.path().join("interface").as_path()));
    let monitor = data.monitor("l_mon").expect("monitor loaded");
    assert_eq!(monitor.total_intensity(), 1.0);

    let args = fs::read_to_string(bin.path().join("args.txt")).expect("args recorded");
    let expected = format!(
        "-c -n 10000 --mpi=2 -d {} guide_test.instr wavelength=5",
        out.path().join("interface").display()
    );
    assert_eq!(args.trim(), expected);

    let second = executor
        .run_full_instrument(&instrument, &request)
        .expect("second run succeeds");
    assert_eq!(
        second.folder.as_deref(),
        Some(out.path().join("interface_0").as_path())
    );
}

#[test]
fn failing_process_reports_stderr() {
    let bin = tempfile::tempdir().expect("bin dir");
    let out = tempfile::tempdir().expect("output dir");
    let script = write_script(bin.path(), "mcrun", FAILING_MCRUN);
    let executor = McrunExecutor::new(script, out.path());
    let instrument = instrument();
    let request = RunRequest::new(instrument.default_parameters(), 10);

    match executor.run_full_instrument(&instrument, &request) {
        Err(RunError::ProcessFailed { stderr, .. }) => assert_eq!(stderr, "compilation failed"),
        other => panic!("expected process failure, got {other:?}"),
    }
}
