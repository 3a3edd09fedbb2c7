use std::io::Write;

use log::{Level, LevelFilter};

/// Timestamped lines on stdout: `2023-05-04 10:15:00 Scanning [...]`.
///
/// `RUST_LOG` still overrides the level picked here.
pub fn setup_logging(debug: bool, verbosity: u8) {
    env_logger::Builder::new()
        .filter_level(level_for(debug, verbosity))
        .parse_default_env()
        .target(env_logger::Target::Stdout)
        .format(|buf, record| {
            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
            match record.level() {
                Level::Info => writeln!(buf, "{} {}", timestamp, record.args()),
                level => writeln!(buf, "{} {}: {}", timestamp, level, record.args()),
            }
        })
        .init();
}

/// `-vv` wins over `DEBUG`; either `DEBUG` or `-v` alone means debug.
fn level_for(debug: bool, verbosity: u8) -> LevelFilter {
    match verbosity {
        0 if !debug => LevelFilter::Info,
        0 | 1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(false, 0), LevelFilter::Info);
        assert_eq!(level_for(true, 0), LevelFilter::Debug);
        assert_eq!(level_for(false, 1), LevelFilter::Debug);
        assert_eq!(level_for(true, 1), LevelFilter::Debug);
        assert_eq!(level_for(false, 2), LevelFilter::Trace);
        assert_eq!(level_for(true, 2), LevelFilter::Trace);
    }
}
