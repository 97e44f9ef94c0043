//! jobs, fg, bg, wait, kill, disown - Job-control builtins.
//!
//! This interpreter runs one statement at a time on a single cooperative
//! thread (see `ExecutionEngine`), so a backgrounded pipeline has already
//! run to completion by the time `jobs`/`wait` observe it: there is no
//! live OS process behind a `Job` entry, only its recorded outcome. The
//! job table still honours bash's numbering, `%+`/`%-` bookkeeping, and
//! status transitions so scripts that inspect `jobs`/`$!`/`wait` see the
//! shape bash would produce.

use std::collections::HashMap;
use crate::interpreter::types::{InterpreterState, Job, JobStatus};

/// Result type for builtin commands
pub type BuiltinResult = (String, String, i32);

/// Register a job that has just finished running (background or
/// already-completed foreground-started job). Returns the assigned job number.
pub fn register_job(
    state: &mut InterpreterState,
    command_line: String,
    status: JobStatus,
    exit_code: Option<i32>,
    background: bool,
) -> u32 {
    let job_num = state.next_job_num;
    state.next_job_num += 1;

    let pgid = state.next_virtual_pid;
    state.next_virtual_pid += 1;

    if state.jobs.is_none() {
        state.jobs = Some(HashMap::new());
    }
    let jobs = state.jobs.as_mut().unwrap();
    jobs.insert(job_num, Job {
        job_num,
        pgid,
        pids: vec![pgid],
        command_line,
        status,
        exit_code,
        background,
    });

    state.previous_job = state.current_job;
    state.current_job = Some(job_num);
    state.last_background_pid = pgid;

    job_num
}

fn resolve_job_spec<'a>(state: &'a InterpreterState, spec: &str) -> Option<u32> {
    let jobs = state.jobs.as_ref()?;
    if let Some(rest) = spec.strip_prefix('%') {
        match rest {
            "" | "+" | "%" => return state.current_job,
            "-" => return state.previous_job,
            _ if rest.chars().all(|c| c.is_ascii_digit()) => {
                return rest.parse::<u32>().ok().filter(|n| jobs.contains_key(n));
            }
            _ => {
                // %name - prefix match against the command line
                return jobs.values()
                    .find(|j| j.command_line.starts_with(rest))
                    .map(|j| j.job_num);
            }
        }
    }
    spec.parse::<u32>().ok().filter(|n| jobs.contains_key(n))
}

fn status_word(job: &Job, current: Option<u32>, previous: Option<u32>) -> &'static str {
    let _ = (job, current, previous);
    match job.status {
        JobStatus::Running => "Running",
        JobStatus::Stopped => "Stopped",
        JobStatus::Done => if job.exit_code.unwrap_or(0) == 0 { "Done" } else { "Exit" },
    }
}

/// `jobs [-lprs] [jobspec ...]`
pub fn handle_jobs(state: &InterpreterState, args: &[String]) -> BuiltinResult {
    let mut show_pid = false;
    let mut only_running = false;
    let mut only_stopped = false;
    let mut specs: Vec<String> = Vec::new();

    for arg in args {
        match arg.as_str() {
            "-l" => show_pid = true,
            "-p" => show_pid = true,
            "-r" => only_running = true,
            "-s" => only_stopped = true,
            _ => specs.push(arg.clone()),
        }
    }

    let jobs = match &state.jobs {
        Some(j) if !j.is_empty() => j,
        _ => return (String::new(), String::new(), 0),
    };

    let mut nums: Vec<u32> = if specs.is_empty() {
        jobs.keys().copied().collect()
    } else {
        specs.iter().filter_map(|s| resolve_job_spec(state, s)).collect()
    };
    nums.sort();

    let mut stdout = String::new();
    for num in nums {
        let job = &jobs[&num];
        if only_running && job.status != JobStatus::Running {
            continue;
        }
        if only_stopped && job.status != JobStatus::Stopped {
            continue;
        }
        let marker = if Some(num) == state.current_job {
            '+'
        } else if Some(num) == state.previous_job {
            '-'
        } else {
            ' '
        };
        let status = status_word(job, state.current_job, state.previous_job);
        if show_pid {
            stdout.push_str(&format!("[{}]{} {}\t{}\t{}\n", num, marker, job.pgid, status, job.command_line));
        } else {
            stdout.push_str(&format!("[{}]{} {}\t{}\n", num, marker, status, job.command_line));
        }
    }
    (stdout, String::new(), 0)
}

/// `fg [jobspec]` - bring a job to the foreground. In this single-threaded
/// model the job already completed, so `fg` just reports it and yields its
/// recorded exit code.
pub fn handle_fg(state: &mut InterpreterState, args: &[String]) -> BuiltinResult {
    let spec = args.first().cloned().unwrap_or_else(|| "%+".to_string());
    let num = match resolve_job_spec(state, &spec) {
        Some(n) => n,
        None => return (String::new(), format!("bash: fg: {}: no such job\n", spec), 1),
    };

    let (command_line, exit_code) = {
        let jobs = state.jobs.as_mut().unwrap();
        let job = jobs.get_mut(&num).unwrap();
        job.status = JobStatus::Done;
        job.background = false;
        (job.command_line.clone(), job.exit_code.unwrap_or(0))
    };
    state.current_job = Some(num);

    (format!("{}\n", command_line), String::new(), exit_code)
}

/// `bg [jobspec]` - resume a stopped job in the background.
pub fn handle_bg(state: &mut InterpreterState, args: &[String]) -> BuiltinResult {
    let spec = args.first().cloned().unwrap_or_else(|| "%+".to_string());
    let num = match resolve_job_spec(state, &spec) {
        Some(n) => n,
        None => return (String::new(), format!("bash: bg: {}: no such job\n", spec), 1),
    };

    let command_line = {
        let jobs = state.jobs.as_mut().unwrap();
        let job = jobs.get_mut(&num).unwrap();
        job.status = JobStatus::Done;
        job.background = true;
        job.command_line.clone()
    };

    (format!("[{}]+ {} &\n", num, command_line), String::new(), 0)
}

/// `wait [-n] [-f] [jobspec|pid ...]` - wait for background jobs. Since
/// background jobs have already run to completion, this resolves
/// immediately to the recorded exit code(s).
pub fn handle_wait(state: &mut InterpreterState, args: &[String]) -> BuiltinResult {
    let mut specs: Vec<String> = Vec::new();
    for arg in args {
        if arg == "-n" || arg == "-f" || arg.starts_with("-") && arg != "-" {
            continue;
        }
        specs.push(arg.clone());
    }

    if specs.is_empty() {
        // Wait for all jobs; final exit code is 0 once the table is settled.
        if let Some(jobs) = state.jobs.as_mut() {
            for job in jobs.values_mut() {
                job.status = JobStatus::Done;
            }
        }
        return (String::new(), String::new(), 0);
    }

    let mut last_code = 0;
    for spec in &specs {
        // A bare pid (no leading %) refers to the virtual pgid recorded for a job.
        let num = resolve_job_spec(state, spec).or_else(|| {
            let pid: u32 = spec.parse().ok()?;
            state.jobs.as_ref()?.values().find(|j| j.pgid == pid).map(|j| j.job_num)
        });
        match num {
            Some(n) => {
                let jobs = state.jobs.as_mut().unwrap();
                let job = jobs.get_mut(&n).unwrap();
                job.status = JobStatus::Done;
                last_code = job.exit_code.unwrap_or(0);
            }
            None => {
                return (String::new(), format!("bash: wait: {}: no such job\n", spec), 127);
            }
        }
    }
    (String::new(), String::new(), last_code)
}

/// `disown [-ar] [jobspec ...]` - remove jobs from the job table without
/// signalling them.
pub fn handle_disown(state: &mut InterpreterState, args: &[String]) -> BuiltinResult {
    let mut all = false;
    let mut specs: Vec<String> = Vec::new();
    for arg in args {
        match arg.as_str() {
            "-a" => all = true,
            "-r" => {}
            _ => specs.push(arg.clone()),
        }
    }

    if all || specs.is_empty() {
        if let Some(jobs) = state.jobs.as_mut() {
            jobs.clear();
        }
        state.current_job = None;
        state.previous_job = None;
        return (String::new(), String::new(), 0);
    }

    let mut stderr = String::new();
    let mut exit_code = 0;
    for spec in &specs {
        match resolve_job_spec(state, spec) {
            Some(num) => {
                state.jobs.as_mut().unwrap().remove(&num);
                if state.current_job == Some(num) {
                    state.current_job = state.previous_job.take();
                }
            }
            None => {
                stderr.push_str(&format!("bash: disown: {}: no such job\n", spec));
                exit_code = 1;
            }
        }
    }
    (String::new(), stderr, exit_code)
}

/// `kill [-s sigspec|-sigspec] pid|jobspec ...` - deliver a logical signal.
/// With no real OS process behind a job, delivery is recorded as a status
/// transition: SIGSTOP/SIGTSTP stop the job, SIGCONT resumes it, anything
/// else marks it done.
pub fn handle_kill(state: &mut InterpreterState, args: &[String]) -> BuiltinResult {
    if args.is_empty() {
        return (String::new(), "bash: kill: usage: kill [-s sigspec | -signum] pid | jobspec ...\n".to_string(), 2);
    }

    if args[0] == "-l" {
        let names = [
            "HUP", "INT", "QUIT", "ILL", "TRAP", "ABRT", "BUS", "FPE", "KILL",
            "USR1", "SEGV", "USR2", "PIPE", "ALRM", "TERM",
        ];
        return (names.join(" ") + "\n", String::new(), 0);
    }

    let mut i = 0;
    let mut signal = "TERM".to_string();
    if args[i] == "-s" {
        i += 1;
        if i >= args.len() {
            return (String::new(), "bash: kill: -s: option requires an argument\n".to_string(), 2);
        }
        signal = args[i].trim_start_matches("SIG").to_uppercase();
        i += 1;
    } else if let Some(rest) = args[i].strip_prefix('-') {
        if !rest.is_empty() && rest != "-" {
            signal = rest.trim_start_matches("SIG").to_uppercase();
            i += 1;
        }
    }

    if i >= args.len() {
        return (String::new(), "bash: kill: usage: kill [-s sigspec | -signum] pid | jobspec ...\n".to_string(), 2);
    }

    let mut stderr = String::new();
    let mut exit_code = 0;
    for target in &args[i..] {
        let num = if let Some(n) = resolve_job_spec(state, target) {
            Some(n)
        } else if let Ok(pid) = target.parse::<u32>() {
            state.jobs.as_ref().and_then(|jobs| jobs.values().find(|j| j.pgid == pid).map(|j| j.job_num))
        } else {
            None
        };

        match num {
            Some(n) => {
                let jobs = state.jobs.as_mut().unwrap();
                let job = jobs.get_mut(&n).unwrap();
                match signal.as_str() {
                    "STOP" | "TSTP" => job.status = JobStatus::Stopped,
                    "CONT" => job.status = JobStatus::Running,
                    _ => {
                        job.status = JobStatus::Done;
                        job.exit_code = Some(128);
                    }
                }
            }
            None => {
                stderr.push_str(&format!("bash: kill: ({}) - no such process\n", target));
                exit_code = 1;
            }
        }
    }
    (String::new(), stderr, exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_list_job() {
        let mut state = InterpreterState::default();
        register_job(&mut state, "sleep 5".to_string(), JobStatus::Done, Some(0), true);
        let (stdout, _, code) = handle_jobs(&state, &[]);
        assert_eq!(code, 0);
        assert!(stdout.contains("sleep 5"));
        assert!(stdout.contains("Done"));
    }

    #[test]
    fn test_wait_no_jobs() {
        let mut state = InterpreterState::default();
        let (_, _, code) = handle_wait(&mut state, &[]);
        assert_eq!(code, 0);
    }

    #[test]
    fn test_wait_for_job_returns_exit_code() {
        let mut state = InterpreterState::default();
        let num = register_job(&mut state, "false".to_string(), JobStatus::Done, Some(1), true);
        let (_, _, code) = handle_wait(&mut state, &[format!("%{}", num)]);
        assert_eq!(code, 1);
    }

    #[test]
    fn test_disown_all() {
        let mut state = InterpreterState::default();
        register_job(&mut state, "sleep 5".to_string(), JobStatus::Done, Some(0), true);
        let (_, _, code) = handle_disown(&mut state, &["-a".to_string()]);
        assert_eq!(code, 0);
        assert!(state.jobs.unwrap().is_empty());
    }

    #[test]
    fn test_kill_unknown_job() {
        let mut state = InterpreterState::default();
        let (_, stderr, code) = handle_kill(&mut state, &["%1".to_string()]);
        assert_eq!(code, 1);
        assert!(stderr.contains("no such process"));
    }
}
