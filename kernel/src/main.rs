//! `trapgen generate [OUT_DIR]`
//!
//! Runs the generator over the compiled-in registry and writes the four
//! artifacts into `OUT_DIR` (default `generated`).

use std::{env, process::ExitCode};

use log::{Log, Metadata, Record};
use trapgen::{
    codegen::{self, GenConfig, REGISTRY},
    logging::{default_level, Line},
};

mod cli;

use cli::{parse_args, write_all, USAGE};

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{}", Line::new(record));
        }
    }

    fn flush(&self) {}
}

fn main() -> ExitCode {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(default_level());
    }

    let Some(out_dir) = parse_args(env::args().skip(1)) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };

    let artifacts = match codegen::generate(REGISTRY, &GenConfig::default()) {
        Ok(artifacts) => artifacts,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = write_all(&out_dir, &artifacts) {
        log::error!("writing {}: {err}", out_dir.display());
        return ExitCode::FAILURE;
    }
    for artifact in artifacts.iter() {
        log::info!("wrote {}", out_dir.join(artifact.kind.file_name()).display());
    }
    ExitCode::SUCCESS
}
