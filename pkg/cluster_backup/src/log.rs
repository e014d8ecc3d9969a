//! Minimal leveled logging: the teacher's binaries (e.g.
//! `pkg/container/src/bin/cluster.rs`) report progress and errors with plain
//! `println!`/`eprintln!` rather than a structured-logging crate. This
//! module keeps that idiom but tags each line with a level and a
//! millisecond timestamp so multi-tick agent behavior is easier to follow
//! in a log stream.

#[macro_export]
macro_rules! log_info {
    ($now_ms:expr, $($arg:tt)*) => {
        println!("[{} INFO cluster_backup] {}", $now_ms, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($now_ms:expr, $($arg:tt)*) => {
        eprintln!("[{} WARN cluster_backup] {}", $now_ms, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($now_ms:expr, $($arg:tt)*) => {
        eprintln!("[{} ERROR cluster_backup] {}", $now_ms, format_args!($($arg)*))
    };
}
