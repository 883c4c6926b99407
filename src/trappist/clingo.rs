//! Wire back end: enumeration through an external `clingo` process.
//!
//! The process is started with `0 --heuristic=Domain --enum-mod=domRec` and the
//! problem-specific `--dom-mod` option, so that models are emitted in a
//! monotone (inclusion-directed) order and only the inclusion-extremal models
//! are recorded. The logic program is passed on standard input and models are
//! streamed back one line per answer set.

use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};

/// Run the given logic program through `clingo` and feed every model (a line of
/// space-separated atoms) to the callback. The callback can close the stream
/// early by returning `false`.
pub fn solve_with_clingo(
    binary: &str,
    program: &str,
    dom_mod: &str,
    on_model: &mut dyn FnMut(&str) -> bool,
) -> Result<(), String> {
    let mut child = Command::new(binary)
        .arg("0")
        .arg("--heuristic=Domain")
        .arg("--enum-mod=domRec")
        .arg(format!("--dom-mod={dom_mod}"))
        .arg("--verbose=0")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("Cannot start `{binary}`: {e}"))?;

    {
        let mut stdin = child
            .stdin
            .take()
            .ok_or("Cannot access solver input.".to_string())?;
        stdin
            .write_all(program.as_bytes())
            .map_err(|e| format!("Cannot write solver input: {e}"))?;
        // Dropping the handle closes the stream and starts the grounding.
    }

    let stdout = child
        .stdout
        .take()
        .ok_or("Cannot access solver output.".to_string())?;
    let reader = BufReader::new(stdout);

    // Models are printed as an `Answer: <n>` marker followed by one line of
    // atoms (possibly empty for the empty answer set).
    let mut interrupted = false;
    let mut expect_model = false;
    for line in reader.lines() {
        let line = line.map_err(|e| format!("Cannot read solver output: {e}"))?;
        let trimmed = line.trim();
        if expect_model {
            expect_model = false;
            if !on_model(trimmed) {
                interrupted = true;
                break;
            }
            continue;
        }
        if trimmed.starts_with("Answer:") {
            expect_model = true;
        }
    }

    if interrupted {
        // The consumer is done; close the search.
        let _ = child.kill();
        let _ = child.wait();
        return Ok(());
    }

    let status = child
        .wait()
        .map_err(|e| format!("Cannot wait for solver: {e}"))?;
    // Clingo exit codes are bit flags: 10 (SAT), 20 (UNSAT), 30 (SAT+exhausted).
    match status.code() {
        Some(10) | Some(20) | Some(30) => Ok(()),
        Some(code) => Err(format!("Solver failed with exit code {code}.")),
        None => Err("Solver was terminated by a signal.".to_string()),
    }
}
