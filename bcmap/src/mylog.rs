// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

// Custom logger

use chrono::Local;
use log::LevelFilter;
use std::io::Write;

pub fn init_log(level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .try_init();
}
