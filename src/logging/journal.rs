use std::{env, io::stderr, os::fd::AsFd as _};

use log::Level;

/// Whether stderr is the stream systemd announced in `$JOURNAL_STREAM`
/// (`<device>:<inode>`, see `systemd.exec(5)`).
pub fn connected() -> bool {
    let Some(journal_stream) = env::var_os("JOURNAL_STREAM") else {
        return false;
    };
    rustix::fs::fstat(stderr().as_fd()).is_ok_and(|stat| {
        journal_stream.to_string_lossy() == format!("{}:{}", stat.st_dev, stat.st_ino)
    })
}

/// syslog priority understood by journald as line prefix.
pub fn priority(level: Level) -> u8 {
    match level {
        Level::Error => 3,
        Level::Warn => 4,
        Level::Info => 6,
        Level::Debug | Level::Trace => 7,
    }
}
