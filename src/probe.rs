//! Process table probe for the target application.

use sysinfo::System;

/// Returns true if any process in the current table matches `fragment`.
///
/// A process that exits mid-scan is simply absent from the snapshot, and an
/// unreadable table yields an empty one, so a missing observation reads as
/// "not running" rather than an error. The poll loop relies on this never
/// failing.
pub fn is_target_running(fragment: &str) -> bool {
    let sys = System::new_all();
    sys.processes()
        .values()
        .any(|process| name_matches(&process.name().to_string_lossy(), fragment))
}

/// Snapshot of `(pid, name)` pairs whose executable name matches `fragment`.
pub fn matching_processes(fragment: &str) -> Vec<(u32, String)> {
    let sys = System::new_all();
    sys.processes()
        .iter()
        .filter_map(|(pid, process)| {
            let name = process.name().to_string_lossy();
            name_matches(&name, fragment).then(|| (pid.as_u32(), name.into_owned()))
        })
        .collect()
}

/// Case-insensitive substring match against a process executable name.
///
/// A bare fragment like "douyin" matches both `Douyin` and `Douyin.exe`, so
/// the same target string works on platforms with and without the suffix.
pub fn name_matches(name: &str, fragment: &str) -> bool {
    name.to_lowercase().contains(&fragment.to_lowercase())
}
