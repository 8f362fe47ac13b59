use crate::config::RunIdentity;
use crate::error::RunError;
use crate::recorder::RunEventLog;
use chrono::NaiveDateTime;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// `sub-<s>_ses-<s>_run-<r>_<YYYYmmddTHHMMSS>.tsv`; calendar time is used for naming only.
pub fn log_file_name(identity: &RunIdentity, stamp: NaiveDateTime) -> String {
    format!(
        "sub-{}_ses-{}_run-{}_{}.tsv",
        identity.subject,
        identity.session,
        identity.run,
        stamp.format("%Y%m%dT%H%M%S")
    )
}

pub fn log_path(identity: &RunIdentity, stamp: NaiveDateTime) -> PathBuf {
    identity.outdir.join(log_file_name(identity, stamp))
}

/// Write `log` as a tab-separated `Time, Event, Value` table.
pub fn write_run_log(path: &Path, log: &RunEventLog) -> Result<(), RunError> {
    let io_err = |source| RunError::Log {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    let mut out = BufWriter::new(File::create(path).map_err(io_err)?);
    writeln!(out, "Time\tEvent\tValue").map_err(io_err)?;
    for row in log.rows() {
        let time = row.time.map(|t| t.to_string()).unwrap_or_default();
        writeln!(out, "{}\t{}\t{}", time, row.kind, row.value).map_err(io_err)?;
    }
    out.flush().map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::EventRecorder;
    use chrono::NaiveDate;

    fn identity(dir: &Path) -> RunIdentity {
        RunIdentity {
            subject: "01".into(),
            session: "02".into(),
            run: "03".into(),
            outdir: dir.to_path_buf(),
        }
    }

    #[test]
    fn file_name_embeds_ids_and_stamp() {
        let stamp = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap();
        let name = log_file_name(&identity(Path::new("logs")), stamp);
        assert_eq!(name, "sub-01_ses-02_run-03_20240309T140507.tsv");
    }

    #[test]
    fn writes_header_rows_and_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.tsv");
        let mut rec = EventRecorder::new("6");
        rec.frame_onset(0.0, 0);
        rec.button_press(0.25, "1");
        let mut log = rec.merge(&[]);
        log.push_result("[RESULT] summary");

        write_run_log(&path, &log).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "Time\tEvent\tValue",
                "0\tframe_onset\t0",
                "0.25\tbutton_press\t1",
                "\tresult\t[RESULT] summary",
            ]
        );
    }
}
